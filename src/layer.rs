//! Image layers and their decompression into tar streams.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, ScanError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Compression of a layer blob, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    None,
}

impl Compression {
    pub fn detect(blob: &[u8]) -> Self {
        if blob.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else if blob.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

#[derive(Debug, Clone)]
enum Content {
    Blob(Vec<u8>),
    Unavailable(String),
}

/// One filesystem layer of an image.
#[derive(Debug, Clone)]
pub struct Layer {
    pub digest: String,
    content: Content,
}

impl Layer {
    /// A layer whose (possibly compressed) tar blob was retrieved.
    pub fn from_blob(digest: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            digest: digest.into(),
            content: Content::Blob(blob),
        }
    }

    /// A layer the source listed but could not retrieve.
    pub fn unavailable(digest: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            content: Content::Unavailable(reason.into()),
        }
    }

    /// Opens the layer as a sequential tar stream.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::LayerUnavailable`] if the blob was never retrieved
    /// or its compression stream cannot be initialized.
    pub fn open(&self) -> Result<Archive<Box<dyn Read + '_>>> {
        let blob = match &self.content {
            Content::Blob(blob) => blob.as_slice(),
            Content::Unavailable(reason) => {
                return Err(ScanError::LayerUnavailable {
                    digest: self.digest.clone(),
                    reason: reason.clone(),
                })
            }
        };

        let reader: Box<dyn Read + '_> = match Compression::detect(blob) {
            Compression::Gzip => Box::new(GzDecoder::new(Cursor::new(blob))),
            Compression::Zstd => {
                let decoder = zstd::stream::Decoder::new(Cursor::new(blob))
                    .map_err(|e| self.unavailable_error(format!("zstd stream: {}", e)))?;
                Box::new(decoder)
            }
            Compression::None => Box::new(Cursor::new(blob)),
        };

        Ok(Archive::new(reader))
    }

    pub(crate) fn unavailable_error(&self, reason: impl Into<String>) -> ScanError {
        ScanError::LayerUnavailable {
            digest: self.digest.clone(),
            reason: reason.into(),
        }
    }
}
