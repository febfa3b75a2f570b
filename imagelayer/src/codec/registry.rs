//! Ordered, injectable codec registry.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::{
    BlockDecodeProvider, DdsDecodeProvider, DdsEncodeProvider, ImageCrateReader,
    IspcEncodeProvider, RasterReader, UncompressedEncodeProvider,
};
use crate::image::{CompressionType, ImageError};

static GLOBAL: OnceLock<Arc<CodecRegistry>> = OnceLock::new();

/// The codecs available to a factory, in the order they are tried.
#[derive(Default)]
pub struct CodecRegistry {
    readers: RwLock<Vec<Arc<dyn RasterReader>>>,
    encoders: RwLock<Vec<Arc<dyn DdsEncodeProvider>>>,
    decoders: RwLock<Vec<Arc<dyn DdsDecodeProvider>>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: Vec<String>| list.join(", ");
        f.debug_struct("CodecRegistry")
            .field(
                "readers",
                &names(self.readers.read().iter().map(|c| c.name().to_string()).collect()),
            )
            .field(
                "encoders",
                &names(self.encoders.read().iter().map(|c| c.name().to_string()).collect()),
            )
            .field(
                "decoders",
                &names(self.decoders.read().iter().map(|c| c.name().to_string()).collect()),
            )
            .finish()
    }
}

impl CodecRegistry {
    /// A registry with no codecs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in codecs.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.register_reader(Arc::new(ImageCrateReader));
        registry.register_encoder(Arc::new(IspcEncodeProvider::new()));
        registry.register_encoder(Arc::new(UncompressedEncodeProvider));
        registry.register_decoder(Arc::new(BlockDecodeProvider));
        registry
    }

    /// The process-wide registry, populated with defaults on first use.
    pub fn global() -> Arc<CodecRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| {
            let registry = Self::with_defaults();
            debug!(registry = ?registry, "Initialized codec registry");
            Arc::new(registry)
        }))
    }

    pub fn register_reader(&self, reader: Arc<dyn RasterReader>) {
        self.readers.write().push(reader);
    }

    pub fn register_encoder(&self, encoder: Arc<dyn DdsEncodeProvider>) {
        self.encoders.write().push(encoder);
    }

    pub fn register_decoder(&self, decoder: Arc<dyn DdsDecodeProvider>) {
        self.decoders.write().push(decoder);
    }

    /// Snapshot of the readers, in registration order.
    pub fn readers(&self) -> Vec<Arc<dyn RasterReader>> {
        self.readers.read().clone()
    }

    /// Snapshot of the encoders, in registration order.
    pub fn encoders(&self) -> Vec<Arc<dyn DdsEncodeProvider>> {
        self.encoders.read().clone()
    }

    /// Snapshot of the decoders, in registration order.
    pub fn decoders(&self) -> Vec<Arc<dyn DdsDecodeProvider>> {
        self.decoders.read().clone()
    }

    /// Decode a DDS surface to RGBA8 with the first decoder that handles
    /// `compression`.
    ///
    /// Failing decoders are logged and skipped. `Ok(None)` when none
    /// handled it; the last error when all that tried failed.
    pub fn decode_dds(
        &self,
        payload: &[u8],
        compression: CompressionType,
        width: u32,
        height: u32,
    ) -> Result<Option<Vec<u8>>, ImageError> {
        let mut last_error = None;
        for decoder in self.decoders() {
            match decoder.decode(payload, compression, width, height) {
                Ok(Some(rgba)) => return Ok(Some(rgba)),
                Ok(None) => {}
                Err(e) => {
                    debug!(decoder = decoder.name(), error = %e, "DDS decoder failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
