//! # Snapshot Checksum
//!
//! Runs an object's xfer function without producing bytes, folding what a
//! save would have written into a CRC32. Two peers with equal checksums
//! hold byte-identical state.

use crc32fast::Hasher;

use crate::error::XferResult;
use crate::xfer::{Xfer, XferMode};

/// Checksumming xfer.
#[derive(Default)]
pub struct XferCrc {
    hasher: Hasher,
    bytes: usize,
}

impl XferCrc {
    /// Creates a fresh checksum.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// CRC32 of everything visited so far.
    #[must_use]
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Number of bytes folded in.
    #[must_use]
    pub const fn byte_count(&self) -> usize {
        self.bytes
    }
}

impl Xfer for XferCrc {
    fn mode(&self) -> XferMode {
        XferMode::Crc
    }

    #[inline]
    fn xfer_bytes(&mut self, data: &mut [u8]) -> XferResult<()> {
        self.hasher.update(data);
        self.bytes += data.len();
        Ok(())
    }
}
