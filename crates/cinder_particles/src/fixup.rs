//! Post-load reference resolution.
//!
//! Snapshots store system IDs. Once every system of a snapshot exists
//! again, the manager builds a [`SystemDirectory`] and each object swaps
//! its stored IDs for live handles through one of the fixup contexts.

use std::collections::HashMap;

use cinder_core::SlotPool;
use cinder_xfer::{XferError, XferResult};

use crate::ids::{ParticleHandle, ParticleSystemId, SystemHandle};
use crate::system::ParticleSystem;

/// ID to handle table of the systems alive after a load.
#[derive(Debug, Default)]
pub struct SystemDirectory {
    by_id: HashMap<ParticleSystemId, SystemHandle>,
}

impl SystemDirectory {
    /// Indexes the given systems.
    pub fn new(entries: impl IntoIterator<Item = (ParticleSystemId, SystemHandle)>) -> Self {
        Self { by_id: entries.into_iter().collect() }
    }

    /// Resolves a stored ID.
    ///
    /// [`ParticleSystemId::NONE`] resolves to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`XferError::UnresolvedReference`] if a non-null ID names no
    /// live system.
    pub fn resolve(&self, id: ParticleSystemId) -> XferResult<Option<SystemHandle>> {
        if id.is_none() {
            return Ok(None);
        }
        self.by_id
            .get(&id)
            .copied()
            .map(Some)
            .ok_or(XferError::UnresolvedReference { kind: "particle system", id: id.0 })
    }
}

/// Fixup context of a particle.
///
/// A particle that controls a system registers itself with that system
/// while resolving, so it needs the system pool and its own handle.
pub struct ParticleFixup<'a> {
    pub(crate) systems: &'a mut SlotPool<ParticleSystem>,
    pub(crate) directory: &'a SystemDirectory,
    pub(crate) particle: ParticleHandle,
}

/// Fixup context of a system.
pub struct SystemFixup<'a> {
    pub(crate) directory: &'a SystemDirectory,
}
