//! # Snapshot Trait
//!
//! The three operations every persisted object provides.

use crate::crc::XferCrc;
use crate::error::XferResult;
use crate::xfer::Xfer;

/// A persisted object.
///
/// `F` is the fixup context handed to [`Snapshot::load_post_process`]. Objects
/// whose references are stored as IDs receive an ID resolution table through
/// it and bind their references once every object of the snapshot exists.
pub trait Snapshot<F: ?Sized = ()> {
    /// Folds the object's wire image into a checksum.
    fn crc_snapshot(&mut self, xfer: &mut XferCrc) -> XferResult<()> {
        self.xfer_snapshot(xfer)
    }

    /// Saves or loads the object, depending on the xfer's mode.
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()>;

    /// Resolves stored IDs into live references after a load.
    fn load_post_process(&mut self, fixup: &mut F) -> XferResult<()> {
        let _ = fixup;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{XferLoad, XferSave};

    #[derive(Default, Debug, PartialEq)]
    struct Counter {
        ticks: u32,
        label: String,
    }

    impl Snapshot for Counter {
        fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
            let mut version = 1;
            xfer.xfer_version(&mut version, 1)?;
            xfer.xfer_u32(&mut self.ticks)?;
            xfer.xfer_string(&mut self.label)
        }
    }

    #[test]
    fn test_round_trip_and_crc() {
        let mut original = Counter { ticks: 30, label: "burst".into() };

        let mut save = XferSave::new();
        original.xfer_snapshot(&mut save).unwrap();
        let bytes = save.into_bytes();

        let mut restored = Counter::default();
        restored.xfer_snapshot(&mut XferLoad::new(&bytes)).unwrap();
        restored.load_post_process(&mut ()).unwrap();
        assert_eq!(restored, original);

        let mut crc = XferCrc::new();
        original.crc_snapshot(&mut crc).unwrap();
        assert_eq!(crc.crc(), crc32fast::hash(&bytes));
    }
}
