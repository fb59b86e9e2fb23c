//! Renders the context block appended to the system prompt

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::calendar::EventRecord;
use crate::core::config::AgentConfig;
use crate::context::store::{ChatRecord, ContextStore};

pub struct ContextAssembler {
    store: Arc<dyn ContextStore>,
    location: Option<String>,
    history_limit: usize,
    calendar_max_age: Duration,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn ContextStore>, config: &AgentConfig) -> Self {
        Self {
            store,
            location: config.location.clone(),
            history_limit: config.history_limit,
            calendar_max_age: Duration::minutes(config.calendar_max_age_mins),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Markdown context block as of `now`.
    ///
    /// Store failures drop the affected section and are logged.
    pub async fn format_for_model(&self, now: DateTime<Utc>) -> String {
        let mut out = String::from("\n## Current Context\n");
        out.push_str(&format!(
            "- Current time: {}\n",
            now.format("%A, %B %d, %Y at %H:%M %Z")
        ));
        if let Some(location) = &self.location {
            out.push_str(&format!("- Location: {}\n", location));
        }

        match self.store.calendar().await {
            Ok(Some(snapshot)) if now - snapshot.fetched_at <= self.calendar_max_age => {
                if !snapshot.events.is_empty() {
                    out.push_str("\n## Upcoming Calendar Events\n");
                    for event in &snapshot.events {
                        out.push_str(&format_event(event));
                        out.push('\n');
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read calendar cache"),
        }

        match self.store.recent_chats(self.history_limit).await {
            Ok(chats) if !chats.is_empty() => {
                out.push_str("\n## Recent Conversation\n");
                for chat in &chats {
                    out.push_str(&format_chat(chat));
                    out.push('\n');
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read chat history"),
        }

        out
    }
}

fn format_event(event: &EventRecord) -> String {
    let title = if event.title.is_empty() {
        "Untitled"
    } else {
        &event.title
    };

    let mut line = format!("- {} on {}", title, to_24_hour(&event.start));
    if !event.end.is_empty() {
        line.push_str(&format!(" to {}", to_24_hour(&event.end)));
    }
    if !event.location.is_empty() {
        line.push_str(&format!(" at {}", event.location));
    }
    if !event.guests.is_empty() {
        line.push_str(&format!(" (guests: {})", event.guests.join(", ")));
    }
    line
}

fn format_chat(chat: &ChatRecord) -> String {
    format!("{}: {}", chat.role, chat.content.trim())
}

/// Rewrite `h:mm AM|PM` clock times as 24-hour `HH:mm`
fn to_24_hour(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let meridiem = tokens.get(i + 1).map(|t| t.trim_end_matches(','));
        let converted = match meridiem {
            Some(m @ ("AM" | "PM")) => convert_clock(tokens[i], m == "PM"),
            _ => None,
        };

        match converted {
            Some(clock) => {
                let suffix = if tokens[i + 1].ends_with(',') { "," } else { "" };
                out.push(format!("{}{}", clock, suffix));
                i += 2;
            }
            None => {
                out.push(tokens[i].to_string());
                i += 1;
            }
        }
    }

    out.join(" ")
}

fn convert_clock(token: &str, pm: bool) -> Option<String> {
    let (hour, minute) = token.split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    if !(1..=12).contains(&hour) || minute.len() != 2 || !minute.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    Some(format!("{:02}:{}", hour, minute))
}
