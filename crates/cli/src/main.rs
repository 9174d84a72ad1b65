mod cli;
mod terminal;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use agentlink_core::Config;
use agentlink_tool_runtime::{default_registry, FileArtifactStore, ToolCall, ToolContext};

use crate::cli::{CliArgs, Command};
use crate::terminal::{StderrProgress, Terminal};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    agentlink_core::load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    match run(args, &terminal).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!(error = %e, "agentlink failed");
            terminal.print_error(&format!("{:#}", e))?;
            std::process::exit(1);
        }
    }
}

/// Runs one command. `Ok(false)` means the tool reported an error result.
async fn run(args: CliArgs, terminal: &Terminal) -> Result<bool> {
    let config = Config::for_profile(&args.profile);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let registry = default_registry(&config).context("failed to build tool registry")?;

    match args.command {
        Command::List => {
            let defs = registry.list().await;
            terminal.print_json(&serde_json::to_value(&defs)?)?;
        }
        Command::Describe { tool } => {
            let Some(t) = registry.get(&tool) else {
                bail!("unknown tool '{}' (available: {})", tool, registry.names().join(", "));
            };
            terminal.print_json(&serde_json::to_value(t.definition().await)?)?;
        }
        Command::Call {
            tool,
            input,
            session,
            request_id,
            artifact_dir,
            quiet,
        } => {
            let input: serde_json::Value =
                serde_json::from_str(&input).context("--input must be valid JSON")?;

            let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut context = ToolContext::new(request_id.clone());
            if let Some(session) = session {
                context = context.with_session(session);
            }
            if !quiet {
                context = context.with_progress(Arc::new(StderrProgress));
            }
            let artifact_dir = artifact_dir
                .map(std::path::PathBuf::from)
                .or_else(|| config.artifacts.dir.clone());
            if let Some(dir) = artifact_dir {
                info!(dir = %dir.display(), "persisting transcripts");
                context = context.with_artifacts(Arc::new(FileArtifactStore::new(dir)));
            }

            let call = ToolCall {
                id: request_id,
                name: tool,
                input,
            };
            let result = registry.invoke(&call, &context).await;
            terminal.print_result(&result.content, result.is_error)?;
            return Ok(!result.is_error);
        }
    }

    Ok(true)
}
