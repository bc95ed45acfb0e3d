//! # Snapshot Reader
//!
//! Overwrites fields from a borrowed buffer.

use crate::error::{XferError, XferResult};
use crate::xfer::{Xfer, XferMode};

/// Loading xfer - reads visited fields from a byte slice.
pub struct XferLoad<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> XferLoad<'a> {
    /// Creates a reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the read position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl Xfer for XferLoad<'_> {
    fn mode(&self) -> XferMode {
        XferMode::Load
    }

    #[inline]
    fn xfer_bytes(&mut self, data: &mut [u8]) -> XferResult<()> {
        let needed = data.len();
        if needed > self.remaining() {
            return Err(XferError::UnexpectedEof { needed, remaining: self.remaining() });
        }
        data.copy_from_slice(&self.buffer[self.position..self.position + needed]);
        self.position += needed;
        Ok(())
    }
}
