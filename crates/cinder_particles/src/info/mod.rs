//! # Effect Parameters
//!
//! [`ParticleSystemInfo`] is the full parameter set of an effect, shared
//! by templates and the systems created from them. [`ParticleInfo`] is the
//! rolled-out parameter set a single particle is born with.
//!
//! ## Keyframes
//!
//! Alpha and color animate through up to [`MAX_KEYFRAMES`] keys. Key 0 is
//! the value at birth. A later key whose `frame` is zero terminates the
//! sequence; nothing after it is used.

mod particle_info;
mod system_info;

pub use particle_info::ParticleInfo;
pub use system_info::{
    EmissionVelocity, EmissionVolume, ParticleSystemInfo, ParticleType, ShaderType, WindMotion,
};

use cinder_core::{RandomVariable, RgbColor};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Keyframes per animated channel.
pub const MAX_KEYFRAMES: usize = 8;

/// A concrete alpha key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyframe {
    /// Alpha at the key.
    pub value: f32,
    /// Age in frames at which the key is reached.
    pub frame: u32,
}

/// An alpha key whose value is rolled per particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomKeyframe {
    /// Alpha range at the key.
    pub value: RandomVariable,
    /// Age in frames at which the key is reached.
    pub frame: u32,
}

/// A color key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbColorKeyframe {
    /// Color at the key.
    pub color: RgbColor,
    /// Age in frames at which the key is reached.
    pub frame: u32,
}

/// Reads a list of up to [`MAX_KEYFRAMES`] keys, padding the rest with
/// zero-frame sentinels.
pub(crate) fn padded_keyframes<'de, D, T>(deserializer: D) -> Result<[T; MAX_KEYFRAMES], D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default + Copy,
{
    let list = Vec::<T>::deserialize(deserializer)?;
    if list.len() > MAX_KEYFRAMES {
        return Err(D::Error::invalid_length(list.len(), &"at most 8 keyframes"));
    }
    let mut keys = [T::default(); MAX_KEYFRAMES];
    keys[..list.len()].copy_from_slice(&list);
    Ok(keys)
}

