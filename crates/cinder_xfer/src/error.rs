//! # Xfer Error Types
//!
//! Every failure that aborts a snapshot load. These are data-integrity
//! errors: a load that returns one must not leave a partially rebuilt
//! object graph running.

use thiserror::Error;

/// Errors raised while moving a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XferError {
    /// The buffer ended in the middle of a field.
    #[error("unexpected end of snapshot data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the field required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// An object was written by a newer build than this one.
    #[error("unknown snapshot version {found} (this build understands up to {current})")]
    UnknownVersion {
        /// Version tag found in the data.
        found: u8,
        /// Highest version this build reads.
        current: u8,
    },

    /// A string does not fit the one-byte length prefix.
    #[error("string of {len} bytes exceeds the 255-byte limit")]
    StringTooLong {
        /// Length of the offending string.
        len: usize,
    },

    /// A string in the data is not valid UTF-8.
    #[error("snapshot string is not valid UTF-8")]
    InvalidString,

    /// An enum tag is outside the known range.
    #[error("invalid {kind} value {value}")]
    InvalidEnum {
        /// Name of the enum being read.
        kind: &'static str,
        /// The raw tag.
        value: u32,
    },

    /// An ID saved in the snapshot does not resolve after loading.
    #[error("{kind} {id} referenced by the snapshot was not found")]
    UnresolvedReference {
        /// What kind of object was referenced.
        kind: &'static str,
        /// The saved ID.
        id: u32,
    },

    /// A saved object names a template this build does not define.
    #[error("particle system template '{0}' not found")]
    MissingTemplate(String),

    /// No slot was left to rebuild a saved object.
    #[error("{kind} pool exhausted while loading")]
    PoolExhausted {
        /// What kind of object could not be allocated.
        kind: &'static str,
    },
}

impl XferError {
    /// Stable numeric failure code for logs and crash reports.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::UnexpectedEof { .. } => 1,
            Self::UnknownVersion { .. } => 2,
            Self::StringTooLong { .. } => 3,
            Self::InvalidString => 4,
            Self::InvalidEnum { .. } => 5,
            Self::UnresolvedReference { .. } => 6,
            Self::MissingTemplate(_) => 7,
            Self::PoolExhausted { .. } => 8,
        }
    }
}

/// Result type for xfer operations.
pub type XferResult<T> = Result<T, XferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            XferError::UnexpectedEof { needed: 4, remaining: 1 },
            XferError::UnknownVersion { found: 9, current: 1 },
            XferError::StringTooLong { len: 300 },
            XferError::InvalidString,
            XferError::InvalidEnum { kind: "priority", value: 99 },
            XferError::UnresolvedReference { kind: "particle system", id: 5 },
            XferError::MissingTemplate("Spark".into()),
            XferError::PoolExhausted { kind: "particle" },
        ];
        let mut codes: Vec<u32> = errors.iter().map(XferError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_message_names_the_template() {
        let err = XferError::MissingTemplate("Spark".into());
        assert!(err.to_string().contains("Spark"));
    }
}
