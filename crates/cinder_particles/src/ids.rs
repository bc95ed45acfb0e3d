//! Identifiers and handles.
//!
//! IDs are what the snapshot stores. Handles are runtime-only and are
//! resolved from IDs after a load.

use std::fmt;

use cinder_core::PoolHandle;

use crate::particle::Particle;
use crate::system::ParticleSystem;

/// Manager-assigned, monotonically increasing particle system ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleSystemId(pub u32);

impl ParticleSystemId {
    /// Reserved "no system" ID. Lookups with it always miss.
    pub const NONE: Self = Self(0);

    /// True for [`ParticleSystemId::NONE`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ParticleSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique particle ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u32);

/// ID of a drawable a system can follow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DrawableId(pub u32);

impl DrawableId {
    /// No drawable.
    pub const INVALID: Self = Self(0);

    /// True unless [`DrawableId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// ID of a game object a system can follow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// No object.
    pub const INVALID: Self = Self(0);

    /// True unless [`ObjectId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Handle to a live system in the manager.
pub type SystemHandle = PoolHandle<ParticleSystem>;

/// Handle to a live particle in the manager.
pub type ParticleHandle = PoolHandle<Particle>;
