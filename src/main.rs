use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod convert;
mod discover;
mod driver;
mod error;
mod state;

use config::JobConfig;
use driver::{AssumeYes, Confirm, StdinConfirm};

/// Convert catalog images to resized WebP and update db.json
#[derive(Debug, Parser)]
#[command(name = "webp-migrate", version, about)]
struct Cli {
    /// Directory holding the category folders and db.json
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Category folder to scan (repeatable); defaults to the built-in list
    #[arg(short, long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Do not snapshot db.json into database-backup/ before rewriting it
    #[arg(long)]
    no_snapshot: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "WEBP_MIGRATE_LOG", default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --log-level CLI arg
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    println!("🖼️  Image to WebP Converter with db.json Update");
    println!("{}", "=".repeat(50));

    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let mut config = JobConfig::new(root);
    if !cli.categories.is_empty() {
        config = config.with_categories(cli.categories);
    }
    if cli.no_snapshot {
        config.snapshot_dir = None;
    }
    tracing::debug!(?config, "starting migration");

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };

    let report = driver::run(&config, confirm.as_mut())?;
    tracing::debug!(?report, "run finished");

    Ok(())
}
