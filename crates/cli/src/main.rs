use anyhow::Context;
use bias_core::Config;
use bias_engine::BiasEngine;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

mod logger;

#[derive(Parser)]
#[command(name = "bias-detect")]
#[command(about = "Detect behavioral biases in a trade log", long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a CSV trade log and print the JSON report
    Analyze {
        /// Trade log CSV file
        file: PathBuf,
        /// JSON configuration file (missing fields use defaults)
        #[arg(short, long, env = "BIAS_CONFIG")]
        config: Option<PathBuf>,
        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
        /// Run detectors on the calling thread
        #[arg(long)]
        sequential: bool,
    },
    /// Print the default configuration as JSON
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::setup_logger(&cli.log_level);

    match cli.command {
        Commands::Analyze {
            file,
            config,
            pretty,
            sequential,
        } => analyze(&file, config.as_deref(), pretty, sequential),
        Commands::DefaultConfig => {
            let json = serde_json::to_string_pretty(&Config::default())?;
            println!("{json}");
            Ok(())
        }
    }
}

fn analyze(file: &Path, config: Option<&Path>, pretty: bool, sequential: bool) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if sequential {
        config.report.parallel_detectors = false;
    }

    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    bias_ingestion::ensure_csv_filename(name)?;

    let reader = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    info!(file = %file.display(), "analyzing trade log");
    let report = BiasEngine::new(config)
        .analyze_upload(BufReader::new(reader))
        .with_context(|| format!("analyzing {}", file.display()))?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}
