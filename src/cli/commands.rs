//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use chrono::Utc;

use crate::agent::Orchestrator;
use crate::calendar::CalendarSync;
use crate::core::Result;

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
}

/// Parse and handle special commands
pub async fn handle_command(
    input: &str,
    orchestrator: &Orchestrator,
    calendar: &CalendarSync,
) -> Result<CommandResult> {
    let input = input.trim();
    let cmd = input.to_lowercase();

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "status" => {
            let health = orchestrator.health().await;
            Ok(CommandResult::Handled(serde_json::to_string_pretty(&health)?))
        }

        "tools" => {
            orchestrator.ensure_booted().await;
            let catalogue = orchestrator.tools().tool_catalogue().await;
            if catalogue.is_empty() {
                Ok(CommandResult::Handled("No tools available.".to_string()))
            } else {
                Ok(CommandResult::Handled(format!("Available tools:\n{}", catalogue)))
            }
        }

        "calendar" => {
            orchestrator.ensure_booted().await;
            let output = match calendar.refresh(Utc::now()).await {
                Ok(snapshot) if snapshot.events.is_empty() => {
                    "Calendar refreshed: no upcoming events.".to_string()
                }
                Ok(snapshot) => {
                    let mut out = format!("Calendar refreshed ({} events):", snapshot.events.len());
                    for event in &snapshot.events {
                        out.push_str(&format!("\n  - {} ({})", event.title, event.start));
                    }
                    out
                }
                Err(e) => format!("Calendar refresh failed: {}", e),
            };
            Ok(CommandResult::Handled(output))
        }

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Steward Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Steward
  status           Show the tool layer status
  tools            List available tools
  calendar         Refresh the calendar cache

Anything else is sent to the assistant.
─────────────────────────────────────────────"#
        .to_string()
}
