//! # CINDER Xfer
//!
//! Versioned binary snapshot protocol used for save games and state checksums.
//!
//! ## Design
//!
//! Every serializable type implements one function, `xfer_snapshot`, that
//! walks its fields in wire order. The [`Xfer`] implementation decides what
//! happens to each field:
//!
//! - [`XferSave`] appends the field's bytes to a buffer
//! - [`XferLoad`] overwrites the field from a buffer
//! - [`XferCrc`] folds the bytes a save would produce into a CRC32
//!
//! Because one function drives all three modes, save and load can never
//! disagree on field order.
//!
//! ## Wire Rules
//!
//! - Each object starts with a one-byte version tag
//! - Integers and floats are little-endian and fixed-width
//! - Strings are a `u8` length followed by the bytes (at most 255)
//! - New fields are appended behind `if version >= N`
//! - Removed fields stay on the wire as same-width placeholders
//!
//! ## Example
//!
//! ```rust
//! use cinder_xfer::{Xfer, XferLoad, XferResult, XferSave};
//!
//! fn xfer_pair(xfer: &mut dyn Xfer, a: &mut u32, b: &mut f32) -> XferResult<()> {
//!     let mut version = 1;
//!     xfer.xfer_version(&mut version, 1)?;
//!     xfer.xfer_u32(a)?;
//!     xfer.xfer_f32(b)
//! }
//!
//! let mut save = XferSave::new();
//! xfer_pair(&mut save, &mut 7, &mut 0.5).unwrap();
//!
//! let bytes = save.into_bytes();
//! let mut load = XferLoad::new(&bytes);
//! let (mut a, mut b) = (0, 0.0);
//! xfer_pair(&mut load, &mut a, &mut b).unwrap();
//! assert_eq!((a, b), (7, 0.5));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod crc;
pub mod error;
pub mod load;
pub mod save;
pub mod snapshot;
pub mod xfer;

pub use crc::XferCrc;
pub use error::{XferError, XferResult};
pub use load::XferLoad;
pub use save::XferSave;
pub use snapshot::Snapshot;
pub use xfer::{xfer_enum, Xfer, XferEnum, XferMode, XferVersion};
