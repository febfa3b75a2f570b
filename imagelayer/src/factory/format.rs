//! Content-type to image implementation table.

use std::fmt;

use crate::image::ImageError;

/// Which concrete image type handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Any container a registered raster reader understands.
    Generic,
    /// DirectDraw Surface, kept as-is.
    Dds,
    /// Headerless band-interleaved elevation samples.
    Terrain,
    /// Bytes fetched on demand from a stream provider.
    LazyStream,
}

const GENERIC_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

const DDS_TYPES: &[&str] = &["image/dds", "image/vnd-ms.dds", "image/x-dds"];

const TERRAIN_TYPES: &[&str] = &[
    "application/bil",
    "application/bil16",
    "application/bil32",
    "image/bil",
];

/// Types servers send instead of imagery, usually error documents.
const NON_IMAGE_TYPES: &[&str] = &["application/json", "application/xml", "application/vnd.ogc.se_xml"];

impl ImageFormat {
    /// Map a declared content type to an implementation.
    ///
    /// Parameters after `;` are ignored and matching is case-insensitive.
    /// Absent or unrecognised types fall back to [`ImageFormat::Generic`];
    /// textual types fail with [`ImageError::FormatUnknown`].
    pub fn resolve(content_type: Option<&str>) -> Result<Self, ImageError> {
        let Some(raw) = content_type else {
            return Ok(ImageFormat::Generic);
        };
        let mime = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime.is_empty() || GENERIC_TYPES.contains(&mime.as_str()) {
            Ok(ImageFormat::Generic)
        } else if DDS_TYPES.contains(&mime.as_str()) {
            Ok(ImageFormat::Dds)
        } else if TERRAIN_TYPES.contains(&mime.as_str()) {
            Ok(ImageFormat::Terrain)
        } else if mime.starts_with("text/") || NON_IMAGE_TYPES.contains(&mime.as_str()) {
            Err(ImageError::FormatUnknown(raw.to_string()))
        } else {
            Ok(ImageFormat::Generic)
        }
    }

    /// Whether images of this format can be re-encoded as DDS.
    pub fn can_convert_to_dds(&self) -> bool {
        matches!(self, ImageFormat::Generic)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Generic => "generic",
            ImageFormat::Dds => "dds",
            ImageFormat::Terrain => "terrain",
            ImageFormat::LazyStream => "lazy-stream",
        };
        f.write_str(name)
    }
}
