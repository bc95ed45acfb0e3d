//! # Particle Priorities
//!
//! Every particle lives in exactly one priority bucket. When the particle
//! budget is exhausted, the oldest particles of the lowest buckets are
//! evicted first.

use std::fmt;
use std::str::FromStr;

use cinder_xfer::XferEnum;
use serde::{Deserialize, Serialize};

use crate::error::ParticleError;

/// Number of priority buckets, including [`ParticlePriority::Invalid`].
pub const NUM_PARTICLE_PRIORITIES: usize = 14;

/// Eviction priority class, lowest first.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ParticlePriority {
    /// Not a real bucket; never evicted, never selected.
    Invalid = 0,
    /// Weapon impact bursts.
    #[default]
    WeaponExplosion = 1,
    /// Ground scorch marks.
    Scorchmark = 2,
    /// Dust behind moving units.
    DustTrail = 3,
    /// Construction effects.
    Buildup = 4,
    /// Smoke behind flying debris.
    DebrisTrail = 5,
    /// Damage states on units.
    UnitDamageFx = 6,
    /// Unit death explosions.
    DeathExplosion = 7,
    /// Mostly-continuous ambient effects.
    SemiConstant = 8,
    /// Continuous ambient effects.
    Constant = 9,
    /// Projectile trails.
    WeaponTrail = 10,
    /// Area-of-effect fields.
    AreaEffect = 11,
    /// Gameplay-critical feedback.
    Critical = 12,
    /// Rendered regardless of budget.
    AlwaysRender = 13,
}

impl ParticlePriority {
    /// Lowest real bucket.
    pub const LOWEST: Self = Self::WeaponExplosion;

    /// Highest bucket.
    pub const HIGHEST: Self = Self::AlwaysRender;

    /// Every bucket in index order.
    pub const ALL: [Self; NUM_PARTICLE_PRIORITIES] = [
        Self::Invalid,
        Self::WeaponExplosion,
        Self::Scorchmark,
        Self::DustTrail,
        Self::Buildup,
        Self::DebrisTrail,
        Self::UnitDamageFx,
        Self::DeathExplosion,
        Self::SemiConstant,
        Self::Constant,
        Self::WeaponTrail,
        Self::AreaEffect,
        Self::Critical,
        Self::AlwaysRender,
    ];

    /// Bucket index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Priority for a bucket index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Definition-file name of the priority.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::WeaponExplosion => "WEAPON_EXPLOSION",
            Self::Scorchmark => "SCORCHMARK",
            Self::DustTrail => "DUST_TRAIL",
            Self::Buildup => "BUILDUP",
            Self::DebrisTrail => "DEBRIS_TRAIL",
            Self::UnitDamageFx => "UNIT_DAMAGE_FX",
            Self::DeathExplosion => "DEATH_EXPLOSION",
            Self::SemiConstant => "SEMI_CONSTANT",
            Self::Constant => "CONSTANT",
            Self::WeaponTrail => "WEAPON_TRAIL",
            Self::AreaEffect => "AREA_EFFECT",
            Self::Critical => "CRITICAL",
            Self::AlwaysRender => "ALWAYS_RENDER",
        }
    }
}

impl fmt::Display for ParticlePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParticlePriority {
    type Err = ParticleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParticleError::UnknownPriority(s.to_string()))
    }
}

impl XferEnum for ParticlePriority {
    const KIND: &'static str = "particle priority";

    fn to_wire(self) -> u32 {
        self as u32
    }

    fn from_wire(tag: u32) -> Option<Self> {
        Self::from_index(tag as usize)
    }
}
