use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bson2sqlite::db::LoadSink;
use bson2sqlite::import::import_dump;
use bson2sqlite::metadata::Metadata;

/// Convert MongoDB BSON dump files with metadata.json to a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "bson2sqlite", version, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the BSON dump file
    #[clap(long, short, required = true)]
    bson: Option<PathBuf>,

    /// Path to the metadata.json file
    #[clap(long, short, required = true)]
    metadata: Option<PathBuf>,

    /// Output SQLite database file
    #[clap(long, short, default_value = "output.db")]
    output: PathBuf,

    /// Verbose output (-v for info, -vv for debug)
    #[clap(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the version number
    Version,
}

fn setup_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    std::env::set_var(
        "RUST_LOG",
        format!(
            "{},{}",
            default_level,
            std::env::var("RUST_LOG").unwrap_or_default()
        ),
    );
    let enable_color = std::env::var("NO_COLOR").is_err();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(enable_color)
        .init();
}

fn run(args: &Cli, bson_path: &Path, meta_path: &Path) -> Result<()> {
    tracing::info!(
        "Starting BSON to SQLite conversion: {} + {} -> {}",
        bson_path.display(),
        meta_path.display(),
        args.output.display()
    );

    let metadata = Metadata::load(meta_path)?;
    let collection = metadata.collection_name()?;
    let sink = LoadSink::open(&args.output, collection)?;

    tracing::debug!("Reading BSON file {}", bson_path.display());
    let data = std::fs::read(bson_path)
        .with_context(|| format!("failed to read BSON file {}", bson_path.display()))?;
    tracing::info!(
        "Read BSON dump of {}",
        humansize::format_size(data.len() as u64, humansize::BINARY)
    );

    let count = import_dump(&sink, &data);
    tracing::info!("Conversion completed successfully ({} documents)", count);
    Ok(())
}

fn main() {
    let args = Cli::parse();

    if let Some(Commands::Version) = args.command {
        println!("bson2sqlite version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    setup_logging(args.verbose);
    tracing::debug!("{:?}", args);

    let (Some(bson_path), Some(meta_path)) = (args.bson.as_deref(), args.metadata.as_deref())
    else {
        unreachable!("clap enforces --bson and --metadata");
    };

    if let Err(e) = run(&args, bson_path, meta_path) {
        tracing::error!("Conversion failed: {:#}", e);
        std::process::exit(1);
    }
}
