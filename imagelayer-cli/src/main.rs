//! ImageLayer CLI - Command-line interface
//!
//! Inspects imagery of any supported format and transcodes it to DDS.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use imagelayer::config::TranscodeConfig;
use imagelayer::logging::{default_log_file, init_logging};
use tracing::debug;

use commands::common::CompressionArg;
use error::CliError;

#[derive(Parser)]
#[command(name = "imagelayer")]
#[command(about = "Decode imagery and transcode it to DDS textures", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (INI). Defaults to ~/.config/imagelayer/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the log file. Defaults to the user cache directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print what an input decodes to
    Inspect {
        /// Input file
        input: PathBuf,

        /// Content type to declare (sniffed from the data when omitted)
        #[arg(long)]
        content_type: Option<String>,

        /// Width hint for headerless inputs
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Height hint for headerless inputs
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Write a PNG preview of a DDS input to this path
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Convert an input to a DDS file
    Transcode {
        /// Input file
        input: PathBuf,

        /// Output DDS file
        output: PathBuf,

        /// Content type to declare (sniffed from the data when omitted)
        #[arg(long)]
        content_type: Option<String>,

        /// Target compression (inferred from alpha and size when omitted)
        #[arg(long, value_enum)]
        compression: Option<CompressionArg>,
    },

    /// Encode an input on a background pool and stream the DDS out
    Stream {
        /// Input file
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Content type to declare (sniffed from the data when omitted)
        #[arg(long)]
        content_type: Option<String>,

        /// Number of encoder threads (shared pool when omitted)
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imagelayer")
        .join("config.ini")
}

fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("imagelayer")
}

fn main() {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    let _guard = match init_logging(&log_dir, default_log_file()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = match TranscodeConfig::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => CliError::from(e).exit(),
    };
    debug!(path = %config_path.display(), ?config, "Configuration loaded");

    let result = match cli.command {
        Commands::Inspect {
            input,
            content_type,
            width,
            height,
            preview,
        } => commands::inspect::run(commands::inspect::InspectArgs {
            config,
            input,
            content_type,
            dimensions: width.zip(height),
            preview,
        }),
        Commands::Transcode {
            input,
            output,
            content_type,
            compression,
        } => commands::transcode::run(config, input, output, content_type, compression),
        Commands::Stream {
            input,
            output,
            content_type,
            threads,
        } => commands::stream::run(config, input, output, content_type, threads),
    };

    if let Err(e) = result {
        e.exit();
    }
}
