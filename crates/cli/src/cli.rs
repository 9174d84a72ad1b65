use clap::{Parser, Subcommand};

/// Invoke agentlink tools from a terminal.
///
/// Configuration comes from the environment (and `.env`), so the same
/// settings apply here as in any embedding host.
#[derive(Parser, Debug)]
#[command(name = "agentlink", about = "Run agent router and memory tools from the command line")]
pub struct CliArgs {
    /// Config profile; keys are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "AGENTLINK_PROFILE", default_value = "")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every tool definition as JSON
    List,

    /// Print one tool definition as JSON
    Describe {
        /// Tool name, e.g. agent_router or cognee_memory
        tool: String,
    },

    /// Invoke a tool and print its result
    Call {
        /// Tool name, e.g. agent_router or cognee_memory
        tool: String,

        /// Tool input as a JSON object
        #[arg(long, default_value = "{}")]
        input: String,

        /// Session id (scopes the default memory dataset)
        #[arg(long)]
        session: Option<String>,

        /// Request id for logs and transcripts (random when omitted)
        #[arg(long)]
        request_id: Option<String>,

        /// Directory for operation transcripts (overrides AGENTLINK_ARTIFACT_DIR)
        #[arg(long)]
        artifact_dir: Option<String>,

        /// Suppress progress lines on stderr
        #[arg(long)]
        quiet: bool,
    },
}
