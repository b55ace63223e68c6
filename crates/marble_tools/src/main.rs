//! Marble Harness - Development Tools

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marble_tools::inspect::{self, ToolError};

#[derive(Parser)]
#[command(name = "marble-tools")]
#[command(about = "Development tools for marble diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the timeline a diagram parses to
    Parse {
        /// Marble diagram, e.g. "--a--b--|"
        diagram: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical form of a diagram
    Normalize {
        /// Marble diagram
        diagram: String,
    },
    /// Print a parsed subscription window
    Window {
        /// Subscription window diagram, e.g. "--^---!"
        diagram: String,
    },
}

fn execute(command: Commands) -> Result<String, ToolError> {
    match command {
        Commands::Parse { diagram, json: true } => inspect::timeline_json(&diagram),
        Commands::Parse { diagram, json: false } => {
            inspect::timeline(&diagram).map(|report| report.to_text())
        }
        Commands::Normalize { diagram } => inspect::normalize(&diagram),
        Commands::Window { diagram } => inspect::window(&diagram),
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}
