//! Per-particle birth parameters.

use cinder_core::Coord3D;
use cinder_xfer::{Snapshot, Xfer, XferResult, XferVersion};

use super::{Keyframe, RgbColorKeyframe, MAX_KEYFRAMES};

/// Everything a particle is born with, already rolled from its system's
/// ranges.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleInfo {
    /// Initial velocity, world space.
    pub velocity: Coord3D,
    /// Initial position, world space.
    pub position: Coord3D,
    /// Emitter position at birth.
    pub emitter_position: Coord3D,
    /// Velocity multiplier applied every frame.
    pub velocity_damping: f32,
    /// Initial rotation about Z.
    pub angle_z: f32,
    /// Rotation per frame about Z.
    pub angular_rate_z: f32,
    /// Angular rate multiplier applied every frame.
    pub angular_damping: f32,
    /// Frames to live.
    pub lifetime: u32,
    /// Initial size.
    pub size: f32,
    /// Size change per frame.
    pub size_rate: f32,
    /// Size rate multiplier applied every frame.
    pub size_rate_damping: f32,
    /// Alpha keys. See the module docs for the sentinel rule.
    pub alpha_keys: [Keyframe; MAX_KEYFRAMES],
    /// Color keys.
    pub color_keys: [RgbColorKeyframe; MAX_KEYFRAMES],
    /// Amount added to every color channel each frame.
    pub color_scale: f32,
    /// Orient towards the emitter when drawn.
    pub is_particle_up_towards_emitter: bool,
    /// How strongly wind pushes this particle.
    pub wind_randomness: f32,
}

impl Default for ParticleInfo {
    fn default() -> Self {
        Self {
            velocity: Coord3D::ZERO,
            position: Coord3D::ZERO,
            emitter_position: Coord3D::ZERO,
            velocity_damping: 1.0,
            angle_z: 0.0,
            angular_rate_z: 0.0,
            angular_damping: 1.0,
            lifetime: 0,
            size: 1.0,
            size_rate: 0.0,
            size_rate_damping: 1.0,
            alpha_keys: [Keyframe::default(); MAX_KEYFRAMES],
            color_keys: [RgbColorKeyframe::default(); MAX_KEYFRAMES],
            color_scale: 0.0,
            is_particle_up_towards_emitter: false,
            wind_randomness: 1.0,
        }
    }
}

impl ParticleInfo {
    const CURRENT_VERSION: XferVersion = 1;
}

impl Snapshot for ParticleInfo {
    /// Layout, version 1: velocity, position, emitter position, velocity
    /// damping, two removed angle slots, angle Z, two removed angular rate
    /// slots, angular rate Z, angular damping, lifetime, size, size rate,
    /// size rate damping, alpha keys, color keys, color scale, up towards
    /// emitter, wind randomness.
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut version = Self::CURRENT_VERSION;
        xfer.xfer_version(&mut version, Self::CURRENT_VERSION)?;

        xfer.xfer_coord3d(&mut self.velocity)?;
        xfer.xfer_coord3d(&mut self.position)?;
        xfer.xfer_coord3d(&mut self.emitter_position)?;
        xfer.xfer_f32(&mut self.velocity_damping)?;

        xfer.xfer_dummy_f32()?;
        xfer.xfer_dummy_f32()?;
        xfer.xfer_f32(&mut self.angle_z)?;
        xfer.xfer_dummy_f32()?;
        xfer.xfer_dummy_f32()?;
        xfer.xfer_f32(&mut self.angular_rate_z)?;
        xfer.xfer_f32(&mut self.angular_damping)?;

        xfer.xfer_u32(&mut self.lifetime)?;
        xfer.xfer_f32(&mut self.size)?;
        xfer.xfer_f32(&mut self.size_rate)?;
        xfer.xfer_f32(&mut self.size_rate_damping)?;

        for key in &mut self.alpha_keys {
            xfer.xfer_f32(&mut key.value)?;
            xfer.xfer_u32(&mut key.frame)?;
        }
        for key in &mut self.color_keys {
            xfer.xfer_rgb_color(&mut key.color)?;
            xfer.xfer_u32(&mut key.frame)?;
        }
        xfer.xfer_f32(&mut self.color_scale)?;

        xfer.xfer_bool(&mut self.is_particle_up_towards_emitter)?;
        xfer.xfer_f32(&mut self.wind_randomness)
    }
}
