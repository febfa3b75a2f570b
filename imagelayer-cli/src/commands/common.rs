//! Common types and utilities shared across CLI commands.

use std::fs::File;
use std::path::Path;

use clap::ValueEnum;
use imagelayer::CompressionType;

use crate::error::CliError;

/// DDS compression selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompressionArg {
    /// DXT1/BC1 (opaque, 4:1)
    Dxt1,
    /// DXT5/BC3 (interpolated alpha, 4:1)
    Dxt5,
    /// Uncompressed 32-bit ARGB
    Argb,
    /// Uncompressed 32-bit RGB with unused byte
    Xrgb,
    /// Uncompressed 24-bit RGB
    Rgb,
}

impl From<CompressionArg> for CompressionType {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Dxt1 => CompressionType::Dxt1,
            CompressionArg::Dxt5 => CompressionType::Dxt5,
            CompressionArg::Argb => CompressionType::A8R8G8B8,
            CompressionArg::Xrgb => CompressionType::X8R8G8B8,
            CompressionArg::Rgb => CompressionType::R8G8B8,
        }
    }
}

/// Open an input file.
pub fn open_input(path: &Path) -> Result<(File, u64), CliError> {
    let file = File::open(path).map_err(|error| CliError::FileRead {
        path: path.display().to_string(),
        error,
    })?;
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, len))
}

/// Resolve the content type: explicit argument first, then the file
/// extension for formats that cannot be sniffed.
pub fn resolve_content_type(cli: Option<String>, path: &Path) -> Option<String> {
    cli.or_else(|| {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "dds" => Some("image/dds".to_string()),
            "bil" => Some("application/bil".to_string()),
            _ => None,
        }
    })
}

/// Format a byte count for display.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
