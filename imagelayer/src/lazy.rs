//! Images whose bytes are fetched on demand.

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::factory::ImageFormat;
use crate::image::{read_fully, CompressionType, Image, ImageError, ImageSource, Rect};

/// Opens a fresh stream for an opaque identifier.
pub trait StreamProvider: Send + Sync {
    fn open(&self, id: &str) -> Result<Box<dyn ImageSource>, ImageError>;
}

/// Serves identifiers as file names below a root directory.
///
/// Identifiers must be relative paths made only of normal components, so
/// `..`, absolute paths and prefixes are rejected.
#[derive(Debug, Clone)]
pub struct FileStreamProvider {
    root: PathBuf,
}

impl FileStreamProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StreamProvider for FileStreamProvider {
    fn open(&self, id: &str) -> Result<Box<dyn ImageSource>, ImageError> {
        let relative = Path::new(id);
        let contained = !id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(ImageError::InvalidConfig(format!(
                "stream id '{}' escapes the provider root",
                id
            )));
        }
        let file = File::open(self.root.join(relative))?;
        Ok(Box::new(file))
    }
}

/// An image that re-reads its provider every time its bytes are requested.
///
/// Nothing is cached, so dimensions and compression are only known through
/// hints.
pub struct LazyStreamImage {
    provider: Arc<dyn StreamProvider>,
    id: String,
    dimensions: Mutex<Option<(u32, u32)>>,
    compression: Mutex<Option<CompressionType>>,
    disposed: AtomicBool,
}

impl LazyStreamImage {
    pub fn new(provider: Arc<dyn StreamProvider>, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
            dimensions: Mutex::new(None),
            compression: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<(), ImageError> {
        if self.is_disposed() {
            Err(ImageError::Disposed)
        } else {
            Ok(())
        }
    }

    fn dimensions(&self) -> Result<(u32, u32), ImageError> {
        self.check()?;
        (*self.dimensions.lock()).ok_or(ImageError::Unsupported(
            "lazy stream dimensions are unknown until hinted",
        ))
    }
}

impl Image for LazyStreamImage {
    fn width(&self) -> Result<u32, ImageError> {
        Ok(self.dimensions()?.0)
    }

    fn height(&self) -> Result<u32, ImageError> {
        Ok(self.dimensions()?.1)
    }

    fn size_in_bytes(&self) -> Result<usize, ImageError> {
        Ok(self.raw_buffer()?.len())
    }

    fn is_blank(&self) -> Result<bool, ImageError> {
        Ok(self.raw_buffer()?.is_empty())
    }

    fn raw_buffer(&self) -> Result<Bytes, ImageError> {
        self.check()?;
        trace!(id = %self.id, "Opening lazy image stream");
        let mut source = self.provider.open(&self.id)?;
        Ok(read_fully(&mut source, None)?)
    }

    fn region_buffer(&self, _rect: &Rect) -> Result<Vec<u8>, ImageError> {
        self.check()?;
        Err(ImageError::Unsupported("region_buffer on a lazy stream image"))
    }

    fn compression_type(&self) -> Result<CompressionType, ImageError> {
        self.check()?;
        Ok(self.compression.lock().unwrap_or(CompressionType::Undefined))
    }

    fn set_dimension_hint(&self, width: u32, height: u32) {
        *self.dimensions.lock() = Some((width, height));
    }

    fn set_compression_hint(&self, compression: CompressionType) {
        *self.compression.lock() = Some(compression);
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn format(&self) -> ImageFormat {
        ImageFormat::LazyStream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        opens: AtomicUsize,
    }

    impl StreamProvider for Counting {
        fn open(&self, id: &str) -> Result<Box<dyn ImageSource>, ImageError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(id.as_bytes().to_vec())))
        }
    }

    #[test]
    fn test_reopens_on_every_read() {
        let provider = Arc::new(Counting {
            opens: AtomicUsize::new(0),
        });
        let image = LazyStreamImage::new(provider.clone(), "tile-42");
        assert_eq!(image.raw_buffer().unwrap().as_ref(), b"tile-42");
        assert_eq!(image.raw_buffer().unwrap().as_ref(), b"tile-42");
        assert_eq!(provider.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsupported_operations() {
        let image = LazyStreamImage::new(
            Arc::new(Counting {
                opens: AtomicUsize::new(0),
            }),
            "x",
        );
        assert!(matches!(
            image.region_buffer(&Rect::full(1, 1)),
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(
            image.set_raw_buffer(Bytes::new()),
            Err(ImageError::Unsupported(_))
        ));
        assert!(image.width().is_err());
        image.set_dimension_hint(256, 128);
        assert_eq!(image.height().unwrap(), 128);
    }

    #[test]
    fn test_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"payload").unwrap();
        let image = LazyStreamImage::new(Arc::new(FileStreamProvider::new(dir.path())), "a.bin");
        assert_eq!(image.size_in_bytes().unwrap(), 7);

        let missing = LazyStreamImage::new(Arc::new(FileStreamProvider::new(dir.path())), "b.bin");
        assert!(missing.raw_buffer().unwrap_err().is_io());
    }

    #[test]
    fn test_disposed() {
        let image = LazyStreamImage::new(Arc::new(FileStreamProvider::new("/")), "x");
        image.dispose();
        assert!(matches!(image.raw_buffer(), Err(ImageError::Disposed)));
        assert!(matches!(image.compression_type(), Err(ImageError::Disposed)));
        assert!(matches!(
            image.region_buffer(&Rect::full(1, 1)),
            Err(ImageError::Disposed)
        ));
        assert!(matches!(
            image.set_raw_buffer(Bytes::new()),
            Err(ImageError::Disposed)
        ));
    }

    #[test]
    fn test_file_provider_stays_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(root.join("nested")).unwrap();
        std::fs::write(root.join("nested").join("a.bin"), b"inside").unwrap();
        std::fs::write(dir.path().join("secret.bin"), b"outside").unwrap();

        let provider = FileStreamProvider::new(&root);
        assert!(provider.open("nested/a.bin").is_ok());
        for id in ["../secret.bin", "nested/../../secret.bin", "/etc/passwd", "", "./a.bin"] {
            assert!(
                matches!(provider.open(id), Err(ImageError::InvalidConfig(_))),
                "{} was accepted",
                id
            );
        }
    }
}
