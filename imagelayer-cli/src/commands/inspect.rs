//! Inspect command - show how an input decodes.

use std::path::{Path, PathBuf};

use imagelayer::config::TranscodeConfig;
use imagelayer::dds::{FOURCC_OFFSET, HEADER_SIZE};
use imagelayer::{DecodeOptions, Image, ImageFactory, ImageFormat, ImageMetrics};

use super::common::{format_size, open_input, resolve_content_type};
use crate::error::CliError;

/// Arguments of the inspect command.
pub struct InspectArgs {
    pub config: TranscodeConfig,
    pub input: PathBuf,
    pub content_type: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub preview: Option<PathBuf>,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let factory = ImageFactory::new(args.config);
    let (mut file, len) = open_input(&args.input)?;
    let content_type = resolve_content_type(args.content_type, &args.input);

    let mut options = DecodeOptions::new();
    if let Some((width, height)) = args.dimensions {
        options = options.with_dimensions(width, height);
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
        .ok_or_else(|| CliError::NoImage(args.input.display().to_string()))?;

    println!("{}", args.input.display());
    println!("  Format:      {}", image.format());
    match (image.width(), image.height()) {
        (Ok(width), Ok(height)) => println!("  Dimensions:  {}x{}", width, height),
        _ => println!("  Dimensions:  unknown"),
    }
    println!("  Compression: {}", image.compression_type()?);
    if let (ImageFormat::Dds, Ok(raw)) = (image.format(), image.raw_buffer()) {
        if let Some(tag) = raw.get(FOURCC_OFFSET..FOURCC_OFFSET + 4) {
            println!("  FourCC:      {}", String::from_utf8_lossy(tag));
        }
    }
    println!("  Size:        {}", format_size(image.size_in_bytes()?));
    println!("  Blank:       {}", image.is_blank()?);
    if let Some(decode) = metrics.decode_time() {
        println!("  Decoded in:  {:.2?}", decode);
    }

    if let Some(preview) = args.preview {
        write_preview(&factory, image.as_ref(), &preview)?;
        println!("  Preview:     {}", preview.display());
    }
    Ok(())
}

/// Decode a DDS surface back to pixels and save it as PNG.
fn write_preview(
    factory: &ImageFactory,
    image: &dyn Image,
    path: &Path,
) -> Result<(), CliError> {
    if image.format() != ImageFormat::Dds {
        return Err(CliError::Usage(
            "--preview is only available for DDS inputs".to_string(),
        ));
    }
    let (width, height) = (image.width()?, image.height()?);
    let raw = image.raw_buffer()?;
    let payload = raw.get(HEADER_SIZE..).unwrap_or_default();

    let rgba = factory
        .registry()
        .decode_dds(payload, image.compression_type()?, width, height)?
        .ok_or_else(|| {
            CliError::Usage(format!(
                "no decoder for {} surfaces",
                image.compression_type().map(|c| c.to_string()).unwrap_or_default()
            ))
        })?;

    let preview = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        CliError::Usage("decoded surface does not match its dimensions".to_string())
    })?;
    preview.save(path).map_err(|e| CliError::FileWrite {
        path: path.display().to_string(),
        error: std::io::Error::other(e),
    })
}
