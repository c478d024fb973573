//! warpmeshd — the warpmesh node daemon.
//!
//! One binary for both sides of the mesh:
//! - `run` serves a node (resource sampling, local execution, placement)
//! - `probe` prints this machine's resource snapshot
//! - `submit` hands a task to a running node and prints its output
//!
//! # Usage
//!
//! ```text
//! warpmeshd run --config warpmesh.toml
//! warpmeshd submit --node 10.0.0.1:7700 --id job-1 --input "hello"
//! ```

mod node;
mod submit;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,warpmesh=debug";

#[derive(Parser)]
#[command(name = "warpmeshd", about = "warpmesh node daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a mesh node until Ctrl-C.
    Run {
        /// Path to warpmesh.toml.
        #[arg(long, short)]
        config: PathBuf,
    },

    /// Sample local resources once and print the snapshot as JSON.
    Probe {
        /// Take bandwidth and latency estimates from this config.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Submit a task to a node for placement and print its output.
    Submit {
        /// Address of the node to submit to.
        #[arg(long)]
        node: String,

        /// Task identifier.
        #[arg(long)]
        id: String,

        /// Task input, inline.
        #[arg(long, conflicts_with = "input_file", required_unless_present = "input_file")]
        input: Option<String>,

        /// Task input, read from a file.
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Give up waiting after this long (e.g. "60s", "2m").
        #[arg(long, default_value = "60s")]
        timeout: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config } => node::run(&config).await,
        Command::Probe { config } => node::probe(config.as_deref()),
        Command::Submit {
            node,
            id,
            input,
            input_file,
            timeout,
        } => {
            let input = match (input, input_file) {
                (Some(inline), _) => inline.into_bytes(),
                (None, Some(path)) => {
                    std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?
                }
                (None, None) => anyhow::bail!("either --input or --input-file is required"),
            };
            submit::run(&node, id, input, &timeout).await
        }
    }
}
