//! CLI error handling with user-friendly messages.

use std::fmt;
use std::io;
use std::process;

use imagelayer::config::ConfigFileError;
use imagelayer::ImageError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Failed to open an input file
    FileRead { path: String, error: io::Error },
    /// Failed to write an output file
    FileWrite { path: String, error: io::Error },
    /// The input could not be read as an image
    Image(ImageError),
    /// The input was read but produced no image
    NoImage(String),
    /// Invalid argument combination
    Usage(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Image(ImageError::FormatUnknown(_)) => {
                eprintln!();
                eprintln!("The declared content type is not an image.");
                eprintln!("Omit --content-type to let the decoders sniff the data.");
            }
            CliError::NoImage(_) => {
                eprintln!();
                eprintln!("Run with RUST_LOG=debug for decoder details.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Image(e) => write!(f, "{}", e),
            CliError::NoImage(path) => write!(f, "No image could be read from '{}'", path),
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for CliError {
    fn from(e: ImageError) -> Self {
        CliError::Image(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}
