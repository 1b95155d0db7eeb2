use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "voxtodo")]
#[command(about = "Voice-command to-do manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task through the command engine
    Add {
        text: String,
    },
    /// Show tasks in display order
    Show {
        #[arg(short, long)]
        sort: Option<String>,
    },
    /// Apply an action-list JSON batch from a file, or "-" for stdin
    Exec {
        file: String,

        /// Auto-confirm destructive and bulk actions
        #[arg(long)]
        yes: bool,
    },
    /// Send a transcript to the configured intent service and apply the result
    Say {
        transcript: String,

        /// Auto-confirm destructive and bulk actions
        #[arg(long)]
        yes: bool,
    },
    /// Revert the last change while the undo window is still open
    Undo,
    /// Manage the API server
    Serve {
        #[command(subcommand)]
        command: Option<ServeCommand>,

        /// Port to run the server on (defaults to the configured api_port)
        #[arg(short, long, global = true)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ServeCommand {
    /// Start the API server (default if no subcommand given)
    Start {
        #[arg(long, hide = true)]
        daemon: bool,
    },
    /// Stop the running API server
    Stop,
    /// Restart the API server
    Restart,
    /// Check if the API server is running
    Status,
}
