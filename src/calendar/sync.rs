//! Calendar cache refresh
//!
//! Pulls the next two weeks of events through the `list-events` tool and
//! stores them as the calendar snapshot the context block reads.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::json;
use tracing::info;

use crate::calendar::decoder::decode;
use crate::context::{CalendarSnapshot, ContextStore};
use crate::core::{Result, StewardError, ToolCall};
use crate::tools::protocol::content_text;
use crate::tools::ToolConnectionManager;

pub const LIST_EVENTS_TOOL: &str = "list-events";
const LOOKAHEAD_DAYS: i64 = 14;

pub struct CalendarSync {
    tools: Arc<ToolConnectionManager>,
    store: Arc<dyn ContextStore>,
    calendar_id: String,
}

impl CalendarSync {
    pub fn new(tools: Arc<ToolConnectionManager>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            tools,
            store,
            calendar_id: "primary".to_string(),
        }
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    /// Fetch events in `[now, now + 14 days]` and replace the cached snapshot
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<CalendarSnapshot> {
        let call = ToolCall::new(
            "calendar-refresh",
            LIST_EVENTS_TOOL,
            json!({
                "calendarId": self.calendar_id,
                "timeMin": now.to_rfc3339_opts(SecondsFormat::Secs, true),
                "timeMax": (now + Duration::days(LOOKAHEAD_DAYS))
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        );

        let result = self.tools.invoke(&call).await;
        if let Some(error) = result.error {
            return Err(StewardError::tool(format!("{}: {}", LIST_EVENTS_TOOL, error)));
        }

        let snapshot = CalendarSnapshot {
            events: decode(&content_text(&result.payload)),
            fetched_at: now,
        };
        self.store.store_calendar(snapshot.clone()).await?;

        info!(events = snapshot.events.len(), "Calendar cache refreshed");
        Ok(snapshot)
    }
}
