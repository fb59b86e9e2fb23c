//! Decoder for the calendar server's plain-text event listing
//!
//! Grammar, one block per event:
//!
//! ```text
//! 1. Event: Standup
//! Event ID: abc123
//! Start: Monday, March 3, 2025 09:00
//! End: Monday, March 3, 2025 09:15
//! View: https://calendar.example.com/event?eid=abc123
//! Location: Room 4
//! Guests: ana@example.com, bo@example.com
//! ```
//!
//! A block starts at a `<n>. Event:` line and runs until the next one. Field
//! lines may appear in any order; unknown lines are ignored. Missing fields
//! decode to an empty string (or an empty guest list).

use serde::{Deserialize, Serialize};

/// One decoded calendar event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub event_id: String,
    pub start: String,
    pub end: String,
    pub view_url: String,
    pub location: String,
    pub guests: Vec<String>,
}

/// Decode every event block in `raw`
pub fn decode(raw: &str) -> Vec<EventRecord> {
    let mut events = Vec::new();
    let mut current: Option<EventRecord> = None;

    for line in raw.lines().map(str::trim) {
        if let Some(title) = block_title(line) {
            events.extend(current.take());
            current = Some(EventRecord {
                title: title.to_string(),
                ..Default::default()
            });
            continue;
        }

        let Some(event) = current.as_mut() else {
            continue;
        };
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "Event ID" => event.event_id = value.to_string(),
            "Start" => event.start = value.to_string(),
            "End" => event.end = value.to_string(),
            "View" => event.view_url = value.to_string(),
            "Location" => event.location = value.to_string(),
            "Guests" => {
                event.guests = value
                    .split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            _ => {}
        }
    }

    events.extend(current);
    events
}

/// `"<digits>. Event: <title>"` -> title
fn block_title(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". Event:")?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}
