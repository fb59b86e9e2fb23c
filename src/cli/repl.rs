//! Interactive REPL for Steward
//!
//! Provides the main user interaction loop. Progress of each turn is printed
//! as it happens.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{Orchestrator, ProgressEvent, ProgressSink};
use crate::calendar::CalendarSync;
use crate::cli::commands::{handle_command, CommandResult};
use crate::context::ContextStore;
use crate::core::{Config, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    orchestrator: Arc<Orchestrator>,
    calendar: CalendarSync,
    config: Config,
}

impl Repl {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn ContextStore>, config: Config) -> Self {
        let calendar = CalendarSync::new(Arc::clone(orchestrator.tools()), store);
        Self {
            orchestrator,
            calendar,
            config,
        }
    }

    /// Run the REPL
    pub async fn run(&self) -> Result<()> {
        self.print_banner();

        print!("Connecting tools...");
        io::stdout().flush()?;
        let health = self.orchestrator.health().await;
        match health.tool_layer.tools_count {
            Some(count) => println!(" {} tool(s) ready.\n", count),
            None => println!(" {}.\n", health.tool_layer.status),
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("You: ");
            io::stdout().flush()?;

            let input = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            };

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &self.orchestrator, &self.calendar).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(input)) => {
                    self.answer(&input).await;
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        self.orchestrator.shutdown().await;
        Ok(())
    }

    async fn answer(&self, input: &str) {
        let (sink, mut rx) = ProgressSink::channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(line) = progress_line(&event) {
                    println!("{}", line);
                }
            }
        });

        let reply = self.orchestrator.run_with_progress(input, &sink).await;
        drop(sink);
        let _ = printer.await;

        println!("\nAssistant:\n{}\n", reply.text);
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("Steward - tool-calling assistant");
        println!("Model:      {} ({})", self.config.llm.model, self.config.llm.base_url);
        println!(
            "Tools:      {}",
            if self.config.tools.enabled {
                self.config.tools.config_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!("Iterations: {}", self.config.agent.max_iterations);
        println!();
        println!("Commands: help, status, tools, calendar, exit");
        println!("─────────────────────────────────────────────");
    }
}

/// One console line per progress event
fn progress_line(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::Iteration { number, max } => Some(format!("[Iteration {}/{}]", number, max)),
        ProgressEvent::ToolStart { name, args } => Some(format!("  → {} {}", name, args)),
        ProgressEvent::ToolComplete {
            name,
            success: true,
            ..
        } => Some(format!("  ✓ {}", name)),
        ProgressEvent::ToolComplete { name, error, .. } => Some(format!(
            "  ✗ {}: {}",
            name,
            error.as_deref().unwrap_or("failed")
        )),
        ProgressEvent::Started | ProgressEvent::Complete(_) | ProgressEvent::Error(_) => None,
    }
}
