//! Transcode command - convert an input to a DDS file.

use std::fs;
use std::path::PathBuf;

use imagelayer::config::TranscodeConfig;
use imagelayer::{DecodeOptions, ImageFactory, ImageFormat, ImageMetrics};
use tracing::info;

use super::common::{format_size, open_input, resolve_content_type, CompressionArg};
use crate::error::CliError;

/// Run the transcode command.
pub fn run(
    config: TranscodeConfig,
    input: PathBuf,
    output: PathBuf,
    content_type: Option<String>,
    compression: Option<CompressionArg>,
) -> Result<(), CliError> {
    let factory = ImageFactory::new(config);
    let (mut file, len) = open_input(&input)?;
    let content_type = resolve_content_type(content_type, &input);

    let mut options = DecodeOptions::new().with_prefer_dds(true);
    if let Some(compression) = compression {
        options = options.with_compression(compression.into());
    }

    let mut metrics = ImageMetrics::new();
    let image = factory
        .read_image(
            &mut file,
            Some(len),
            content_type.as_deref(),
            &options,
            Some(&mut metrics),
        )?
        .ok_or_else(|| CliError::NoImage(input.display().to_string()))?;

    if image.format() != ImageFormat::Dds {
        return Err(CliError::Usage(format!(
            "'{}' decoded as {} and could not be converted to DDS",
            input.display(),
            image.format()
        )));
    }

    let bytes = image.raw_buffer()?;
    fs::write(&output, &bytes).map_err(|error| CliError::FileWrite {
        path: output.display().to_string(),
        error,
    })?;

    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = bytes.len(),
        "Transcoded to DDS"
    );
    println!(
        "{} -> {} ({}, {})",
        input.display(),
        output.display(),
        image.compression_type()?,
        format_size(bytes.len())
    );
    if let (Some(decode), Some(encode)) = (metrics.decode_time(), metrics.encode_time()) {
        println!("  decode {:.2?}, encode {:.2?}", decode, encode);
    }
    Ok(())
}
