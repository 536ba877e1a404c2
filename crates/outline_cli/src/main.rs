//! Outline bootstrap entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging, and load the root outline.
//! - Run one tree operation and print the resulting outline.
//! - Surface a single user-visible notification when the root load fails.

use clap::{Parser, Subcommand};
use log::error;
use outline_core::{
    init_logging, init_stderr_logging, render_outline, Address, ClientConfig, HttpRemote, NodeId,
    OutlineRemote, OutlineTree,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const LOAD_FAILED_NOTICE: &str = "Failed to load the outline. Please try again.";

#[derive(Debug, Parser)]
#[command(name = "outline", version, about = "Browse and edit a remote outline")]
struct Cli {
    /// Server origin; overrides OUTLINE_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Root outline address; overrides OUTLINE_ROOT.
    #[arg(long)]
    root: Option<String>,
    /// trace|debug|info|warn|error; overrides OUTLINE_LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for log files; overrides OUTLINE_LOG_DIR.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the whole outline.
    Show,
    /// Add a child under the node at ADDRESS.
    Add { address: String },
    /// Rename the node at ADDRESS.
    Rename { address: String, label: String },
    /// Delete the node at ADDRESS and its subtree.
    Delete { address: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("outline: {err}");
            return ExitCode::from(2);
        }
    };
    let logging = match config.log_dir.as_deref() {
        Some(dir) => init_logging(config.log_level.as_str(), Some(dir)),
        None => init_stderr_logging(config.log_level.as_str()),
    };
    if let Err(err) = logging {
        eprintln!("outline: {err}");
        return ExitCode::from(2);
    }

    let remote = match HttpRemote::new(&config) {
        Ok(remote) => remote,
        Err(err) => {
            error!("event=bootstrap module=cli status=error stage=client error={err}");
            eprintln!("outline: {err}");
            return ExitCode::FAILURE;
        }
    };
    let Some(mut tree) = load_root(remote, config.root_address.as_str()).await else {
        return ExitCode::FAILURE;
    };

    match run(&mut tree, cli.command.unwrap_or(Command::Show)).await {
        Ok(()) => {
            print!("{}", render_outline(&tree));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=command module=cli status=error error={err}");
            eprintln!("outline: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Hydrates the root outline. On failure the error is logged and the user
/// sees only [`LOAD_FAILED_NOTICE`].
async fn load_root<R: OutlineRemote>(remote: R, root: &str) -> Option<OutlineTree<R>> {
    match OutlineTree::hydrate(remote, root).await {
        Ok(tree) => Some(tree),
        Err(err) => {
            error!("event=bootstrap module=cli status=error stage=load error={err}");
            eprintln!("{LOAD_FAILED_NOTICE}");
            None
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, Box<dyn Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(root) = &cli.root {
        config.root_address = root.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config.validate()?)
}

async fn run<R: OutlineRemote>(
    tree: &mut OutlineTree<R>,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Show => {}
        Command::Add { address } => {
            let parent = locate(tree, address)?;
            tree.create_child(parent).await?;
        }
        Command::Rename { address, label } => {
            let node = locate(tree, address)?;
            tree.rename(node, label.as_str()).await?;
        }
        Command::Delete { address } => {
            let node = locate(tree, address)?;
            tree.delete(node).await?;
        }
    }
    Ok(())
}

fn locate<R: OutlineRemote>(
    tree: &OutlineTree<R>,
    address: String,
) -> Result<NodeId, Box<dyn Error>> {
    let address = Address::from(address);
    tree.find_by_address(&address)
        .ok_or_else(|| format!("no outline node at {address}").into())
}
