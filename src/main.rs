//! Steward - tool-calling assistant
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use steward::context::{ContextStore, JsonFileContextStore};
use steward::{server, Config, Orchestrator, Repl};
use tracing_subscriber::EnvFilter;

/// Steward - tool-calling assistant
#[derive(Parser, Debug)]
#[command(name = "steward")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model name sent to the chat-completions endpoint
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Disable tool execution
    #[arg(long)]
    no_tools: bool,

    /// Path to the tool server list (mcp.json)
    #[arg(long)]
    mcp_config: Option<PathBuf>,

    /// Maximum model round-trips per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Run the HTTP server
    #[arg(long, conflicts_with = "prompt")]
    serve: bool,

    /// Print the tool layer status as JSON and exit
    #[arg(long, conflicts_with_all = ["prompt", "serve"])]
    status: bool,

    /// Address to bind in server mode
    #[arg(long)]
    host: Option<String>,

    /// Port to bind in server mode
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }

    if args.debug {
        config.agent.debug = true;
    }

    if args.no_tools {
        config.tools.enabled = false;
    }

    if let Some(ref path) = args.mcp_config {
        config.tools.config_path = path.clone();
    }

    if let Some(max) = args.max_iterations {
        config.agent.max_iterations = max;
    }

    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(config.agent.debug);

    let store: Arc<dyn ContextStore> =
        Arc::new(JsonFileContextStore::new(JsonFileContextStore::default_path()));
    let orchestrator = Arc::new(Orchestrator::from_config(&config, Arc::clone(&store))?);

    if args.status {
        let health = orchestrator.health().await;
        println!("{}", serde_json::to_string_pretty(&health)?);
        orchestrator.shutdown().await;
        return Ok(());
    }

    if args.serve {
        server::serve(orchestrator, &config.server.addr()).await?;
        return Ok(());
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let reply = orchestrator.run(&prompt).await;
        println!("{}", reply.text);
        orchestrator.shutdown().await;
        return Ok(());
    }

    // Interactive REPL mode
    let repl = Repl::new(orchestrator, store, config);
    repl.run().await?;

    Ok(())
}
