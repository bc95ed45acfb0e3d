//! # Snapshot Writer
//!
//! Appends fields to a growable buffer.

use crate::error::XferResult;
use crate::xfer::{Xfer, XferMode};

/// Saving xfer - writes every visited field into a byte buffer.
///
/// Reuse one writer across saves with [`XferSave::reset`] to keep the
/// allocation.
#[derive(Debug, Default)]
pub struct XferSave {
    buffer: Vec<u8>,
}

impl XferSave {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity) }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer and returns the data.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Xfer for XferSave {
    fn mode(&self) -> XferMode {
        XferMode::Save
    }

    #[inline]
    fn xfer_bytes(&mut self, data: &mut [u8]) -> XferResult<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }
}
