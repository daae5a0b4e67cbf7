//! Compression of record payloads.
//!
//! The archive only records whether a payload is compressed and both of its
//! sizes; the algorithm itself is a `Codec` supplied by the caller.

use crate::error::{Error, Result};
use lz4::block::{compress, decompress, CompressionMode};
use std::convert::TryFrom;

pub trait Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompresses `data` that is expected to expand to `mem_size` bytes.
    fn decompress(&self, data: &[u8], mem_size: usize) -> Result<Vec<u8>>;
}

/// Compression level for `lz4` compression.
///
/// We need this level as the enum `lz4` crate provides is not `Clone` nor `Copy`.
#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Hash, Debug)]
pub enum CompressionLevel {
    Default,
    Fast(i32),
    High(i32),
}

impl From<CompressionLevel> for Option<CompressionMode> {
    fn from(level: CompressionLevel) -> Self {
        Some(match level {
            CompressionLevel::Default => CompressionMode::DEFAULT,
            CompressionLevel::Fast(t) => CompressionMode::FAST(t),
            CompressionLevel::High(t) => CompressionMode::HIGHCOMPRESSION(t),
        })
    }
}

/// Upper bound of how much a single lz4 block can expand.
const MAX_LZ4_RATIO: usize = 255;

/// `lz4` block compression without size prefix.
#[derive(Copy, Clone, Debug)]
pub struct Lz4Codec {
    level: CompressionLevel,
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Lz4Codec::new(CompressionLevel::High(12))
    }
}

impl Lz4Codec {
    pub fn new(level: CompressionLevel) -> Self {
        Lz4Codec { level }
    }
}

impl Codec for Lz4Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        compress(data, self.level.into(), false).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decompress(&self, data: &[u8], mem_size: usize) -> Result<Vec<u8>> {
        if mem_size > data.len().saturating_mul(MAX_LZ4_RATIO).saturating_add(16) {
            return Err(Error::Codec(format!(
                "{} bytes cannot expand to {} bytes",
                data.len(),
                mem_size
            )));
        }
        let size = i32::try_from(mem_size)
            .map_err(|_| Error::Codec(format!("{} bytes is too large for lz4", mem_size)))?;
        decompress(data, Some(size)).map_err(|e| Error::Codec(e.to_string()))
    }
}
