//! Effect parameter set shared by templates and systems.

use cinder_core::{Coord3D, RandomVariable, RgbColor};
use cinder_xfer::{xfer_enum, Snapshot, Xfer, XferEnum, XferError, XferResult, XferVersion};
use serde::{Deserialize, Serialize};

use super::{padded_keyframes, RandomKeyframe, RgbColorKeyframe, MAX_KEYFRAMES};
use crate::priority::ParticlePriority;

/// Blend mode used to draw the particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ShaderType {
    /// Unset.
    Invalid = 0,
    /// Additive blending.
    Additive = 1,
    /// Alpha blending.
    #[default]
    Alpha = 2,
    /// Alpha test, no blending.
    AlphaTest = 3,
    /// Multiplicative blending.
    Multiply = 4,
}

/// How each particle is visualized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ParticleType {
    /// Unset.
    Invalid = 0,
    /// Camera-facing textured quad.
    #[default]
    Particle = 1,
    /// A model per particle.
    Drawable = 2,
    /// A ribbon joining consecutive particles.
    Streak = 3,
    /// Layered quads faking volume.
    VolumeParticle = 4,
    /// Screen-space distortion.
    Smudge = 5,
}

/// How the system's wind direction moves over time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum WindMotion {
    /// Unset.
    None = 0,
    /// No wind.
    #[default]
    Unused = 1,
    /// Swings between a start and an end angle.
    PingPong = 2,
    /// Turns continuously.
    Circular = 3,
}

impl WindMotion {
    /// True when particles feel the wind.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::PingPong | Self::Circular)
    }
}

macro_rules! impl_wire_enum {
    ($ty:ty, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl XferEnum for $ty {
            const KIND: &'static str = $kind;

            fn to_wire(self) -> u32 {
                self as u32
            }

            fn from_wire(tag: u32) -> Option<Self> {
                [$(Self::$variant),+].into_iter().find(|v| *v as u32 == tag)
            }
        }
    };
}

impl_wire_enum!(ShaderType, "shader type", [Invalid, Additive, Alpha, AlphaTest, Multiply]);
impl_wire_enum!(
    ParticleType,
    "particle type",
    [Invalid, Particle, Drawable, Streak, VolumeParticle, Smudge]
);
impl_wire_enum!(WindMotion, "wind motion", [None, Unused, PingPong, Circular]);

/// Initial velocity model. Exactly one is active per system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmissionVelocity {
    /// Independent speed per axis.
    Ortho {
        /// X speed.
        #[serde(default)]
        x: RandomVariable,
        /// Y speed.
        #[serde(default)]
        y: RandomVariable,
        /// Z speed.
        #[serde(default)]
        z: RandomVariable,
    },
    /// Random direction on the unit sphere.
    Spherical {
        /// Speed along the direction.
        #[serde(default)]
        speed: RandomVariable,
    },
    /// Random direction on the upper hemisphere.
    Hemispherical {
        /// Speed along the direction.
        #[serde(default)]
        speed: RandomVariable,
    },
    /// Radial speed in the XY plane plus a speed along Z.
    Cylindrical {
        /// Speed away from the axis.
        #[serde(default)]
        radial: RandomVariable,
        /// Speed along the axis.
        #[serde(default)]
        normal: RandomVariable,
    },
    /// Away from the emitter center.
    Outward {
        /// Speed away from the center.
        #[serde(default)]
        speed: RandomVariable,
        /// Extra speed along Z.
        #[serde(default)]
        other_speed: RandomVariable,
    },
}

impl Default for EmissionVelocity {
    fn default() -> Self {
        Self::Ortho {
            x: RandomVariable::default(),
            y: RandomVariable::default(),
            z: RandomVariable::default(),
        }
    }
}

impl EmissionVelocity {
    fn tag(&self) -> u32 {
        match self {
            Self::Ortho { .. } => 1,
            Self::Spherical { .. } => 2,
            Self::Hemispherical { .. } => 3,
            Self::Cylindrical { .. } => 4,
            Self::Outward { .. } => 5,
        }
    }

    fn empty(tag: u32) -> Option<Self> {
        let zero = RandomVariable::default();
        Some(match tag {
            1 => Self::Ortho { x: zero, y: zero, z: zero },
            2 => Self::Spherical { speed: zero },
            3 => Self::Hemispherical { speed: zero },
            4 => Self::Cylindrical { radial: zero, normal: zero },
            5 => Self::Outward { speed: zero, other_speed: zero },
            _ => return None,
        })
    }

    /// Tag then the active variant's payload.
    fn xfer(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut tag = self.tag();
        xfer.xfer_u32(&mut tag)?;
        if xfer.is_loading() {
            *self = Self::empty(tag)
                .ok_or(XferError::InvalidEnum { kind: "emission velocity", value: tag })?;
        }
        match self {
            Self::Ortho { x, y, z } => {
                xfer.xfer_random_variable(x)?;
                xfer.xfer_random_variable(y)?;
                xfer.xfer_random_variable(z)
            }
            Self::Spherical { speed } | Self::Hemispherical { speed } => {
                xfer.xfer_random_variable(speed)
            }
            Self::Cylindrical { radial, normal } => {
                xfer.xfer_random_variable(radial)?;
                xfer.xfer_random_variable(normal)
            }
            Self::Outward { speed, other_speed } => {
                xfer.xfer_random_variable(speed)?;
                xfer.xfer_random_variable(other_speed)
            }
        }
    }
}

/// Region particles are born in, in the system's local space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmissionVolume {
    /// The emitter origin.
    #[default]
    Point,
    /// A segment.
    Line {
        /// First endpoint.
        #[serde(default)]
        start: Coord3D,
        /// Second endpoint.
        #[serde(default)]
        end: Coord3D,
    },
    /// An axis-aligned box centered on the origin.
    Box {
        /// Half extents.
        #[serde(default)]
        half_size: Coord3D,
    },
    /// A sphere centered on the origin.
    Sphere {
        /// Radius.
        #[serde(default)]
        radius: f32,
    },
    /// A Z-aligned cylinder centered on the origin.
    Cylinder {
        /// Radius.
        #[serde(default)]
        radius: f32,
        /// Length along Z.
        #[serde(default)]
        length: f32,
    },
}

impl EmissionVolume {
    fn tag(&self) -> u32 {
        match self {
            Self::Point => 1,
            Self::Line { .. } => 2,
            Self::Box { .. } => 3,
            Self::Sphere { .. } => 4,
            Self::Cylinder { .. } => 5,
        }
    }

    fn empty(tag: u32) -> Option<Self> {
        Some(match tag {
            1 => Self::Point,
            2 => Self::Line { start: Coord3D::ZERO, end: Coord3D::ZERO },
            3 => Self::Box { half_size: Coord3D::ZERO },
            4 => Self::Sphere { radius: 0.0 },
            5 => Self::Cylinder { radius: 0.0, length: 0.0 },
            _ => return None,
        })
    }

    fn xfer(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut tag = self.tag();
        xfer.xfer_u32(&mut tag)?;
        if xfer.is_loading() {
            *self = Self::empty(tag)
                .ok_or(XferError::InvalidEnum { kind: "emission volume", value: tag })?;
        }
        match self {
            Self::Point => Ok(()),
            Self::Line { start, end } => {
                xfer.xfer_coord3d(start)?;
                xfer.xfer_coord3d(end)
            }
            Self::Box { half_size } => xfer.xfer_coord3d(half_size),
            Self::Sphere { radius } => xfer.xfer_f32(radius),
            Self::Cylinder { radius, length } => {
                xfer.xfer_f32(radius)?;
                xfer.xfer_f32(length)
            }
        }
    }
}

/// The full parameter set of an effect.
///
/// Templates own one; every system created from a template gets a copy it
/// may modify. Unspecified fields of a definition keep these defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSystemInfo {
    /// Emit a single burst, then stop.
    pub is_one_shot: bool,
    /// Blend mode.
    pub shader_type: ShaderType,
    /// Visual representation.
    pub particle_type: ParticleType,
    /// Texture or model name.
    pub particle_type_name: String,

    /// Initial rotation about Z.
    pub angle_z: RandomVariable,
    /// Rotation per frame about Z.
    pub angular_rate_z: RandomVariable,
    /// Angular rate damping.
    pub angular_damping: RandomVariable,
    /// Velocity damping.
    pub velocity_damping: RandomVariable,

    /// Particle lifetime in frames.
    pub lifetime: RandomVariable,
    /// System lifetime in frames. Zero means the system runs forever.
    pub system_lifetime: u32,

    /// Initial particle size.
    pub start_size: RandomVariable,
    /// Growth of the start size per burst.
    pub start_size_rate: RandomVariable,
    /// Size change per frame.
    pub size_rate: RandomVariable,
    /// Size rate damping.
    pub size_rate_damping: RandomVariable,

    /// Alpha keys.
    #[serde(deserialize_with = "padded_keyframes")]
    pub alpha_keys: [RandomKeyframe; MAX_KEYFRAMES],
    /// Color keys.
    #[serde(deserialize_with = "padded_keyframes")]
    pub color_keys: [RgbColorKeyframe; MAX_KEYFRAMES],
    /// Amount added to every color channel each frame.
    pub color_scale: RandomVariable,

    /// Frames between bursts.
    pub burst_delay: RandomVariable,
    /// Particles per burst.
    pub burst_count: RandomVariable,
    /// Frames before the first burst.
    pub initial_delay: RandomVariable,

    /// Velocity added to every particle's motion each frame.
    pub drift_velocity: Coord3D,
    /// Downward acceleration.
    pub gravity: f32,

    /// Template spawned alongside and fed by this system.
    pub slave_system_name: String,
    /// Offset of slave particles from their master particle.
    pub slave_pos_offset: Coord3D,
    /// Template attached to every particle as a controlled system.
    pub attached_system_name: String,

    /// Initial velocity model.
    pub emission_velocity: EmissionVelocity,
    /// Eviction priority.
    pub priority: ParticlePriority,
    /// Birth region.
    pub emission_volume: EmissionVolume,
    /// Emit on the volume's surface only.
    pub is_emission_volume_hollow: bool,
    /// Particles lie flat on the ground.
    pub is_ground_aligned: bool,
    /// Particles are never born below the terrain.
    pub is_emit_above_ground_only: bool,
    /// Particles orient towards the emitter.
    pub is_particle_up_towards_emitter: bool,

    /// Wind motion mode.
    pub wind_motion: WindMotion,
    /// Current wind direction in radians.
    pub wind_angle: f32,
    /// Wind turn per frame.
    pub wind_angle_change: f32,
    /// Lower bound for rerolled wind turn rates.
    pub wind_angle_change_min: f32,
    /// Upper bound for rerolled wind turn rates.
    pub wind_angle_change_max: f32,
    /// Current ping-pong start angle.
    pub wind_ping_pong_start_angle: f32,
    /// Lower bound for ping-pong start angles.
    pub wind_ping_pong_start_angle_min: f32,
    /// Upper bound for ping-pong start angles.
    pub wind_ping_pong_start_angle_max: f32,
    /// Current ping-pong end angle.
    pub wind_ping_pong_end_angle: f32,
    /// Lower bound for ping-pong end angles.
    pub wind_ping_pong_end_angle_min: f32,
    /// Upper bound for ping-pong end angles.
    pub wind_ping_pong_end_angle_max: f32,
    /// Ping-pong direction.
    pub wind_moving_to_end_angle: bool,
}

impl Default for ParticleSystemInfo {
    fn default() -> Self {
        let mut alpha_keys = [RandomKeyframe::default(); MAX_KEYFRAMES];
        alpha_keys[0].value = RandomVariable::constant(1.0);
        let mut color_keys = [RgbColorKeyframe::default(); MAX_KEYFRAMES];
        color_keys[0].color = RgbColor::new(1.0, 1.0, 1.0);

        Self {
            is_one_shot: false,
            shader_type: ShaderType::default(),
            particle_type: ParticleType::default(),
            particle_type_name: String::new(),
            angle_z: RandomVariable::default(),
            angular_rate_z: RandomVariable::default(),
            angular_damping: RandomVariable::constant(1.0),
            velocity_damping: RandomVariable::constant(1.0),
            lifetime: RandomVariable::constant(30.0),
            system_lifetime: 0,
            start_size: RandomVariable::constant(1.0),
            start_size_rate: RandomVariable::default(),
            size_rate: RandomVariable::default(),
            size_rate_damping: RandomVariable::constant(1.0),
            alpha_keys,
            color_keys,
            color_scale: RandomVariable::default(),
            burst_delay: RandomVariable::default(),
            burst_count: RandomVariable::constant(1.0),
            initial_delay: RandomVariable::default(),
            drift_velocity: Coord3D::ZERO,
            gravity: 0.0,
            slave_system_name: String::new(),
            slave_pos_offset: Coord3D::ZERO,
            attached_system_name: String::new(),
            emission_velocity: EmissionVelocity::default(),
            priority: ParticlePriority::default(),
            emission_volume: EmissionVolume::default(),
            is_emission_volume_hollow: false,
            is_ground_aligned: false,
            is_emit_above_ground_only: false,
            is_particle_up_towards_emitter: false,
            wind_motion: WindMotion::default(),
            wind_angle: 0.0,
            wind_angle_change: 0.0,
            wind_angle_change_min: 0.0,
            wind_angle_change_max: 0.0,
            wind_ping_pong_start_angle: 0.0,
            wind_ping_pong_start_angle_min: 0.0,
            wind_ping_pong_start_angle_max: 0.0,
            wind_ping_pong_end_angle: 0.0,
            wind_ping_pong_end_angle_min: 0.0,
            wind_ping_pong_end_angle_max: 0.0,
            wind_moving_to_end_angle: true,
        }
    }
}

impl ParticleSystemInfo {
    const CURRENT_VERSION: XferVersion = 1;

    /// Particles of this effect count against the field particle budget.
    #[inline]
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.priority == ParticlePriority::AreaEffect && self.is_ground_aligned
    }
}

impl Snapshot for ParticleSystemInfo {
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut version = Self::CURRENT_VERSION;
        xfer.xfer_version(&mut version, Self::CURRENT_VERSION)?;

        xfer.xfer_bool(&mut self.is_one_shot)?;
        xfer_enum(xfer, &mut self.shader_type)?;
        xfer_enum(xfer, &mut self.particle_type)?;
        xfer.xfer_string(&mut self.particle_type_name)?;

        // X and Y rotation were removed; their slots stay on the wire
        let mut removed = RandomVariable::default();
        xfer.xfer_random_variable(&mut removed)?;
        xfer.xfer_random_variable(&mut removed)?;
        xfer.xfer_random_variable(&mut self.angle_z)?;
        xfer.xfer_random_variable(&mut removed)?;
        xfer.xfer_random_variable(&mut removed)?;
        xfer.xfer_random_variable(&mut self.angular_rate_z)?;
        xfer.xfer_random_variable(&mut self.angular_damping)?;
        xfer.xfer_random_variable(&mut self.velocity_damping)?;

        xfer.xfer_random_variable(&mut self.lifetime)?;
        xfer.xfer_u32(&mut self.system_lifetime)?;

        xfer.xfer_random_variable(&mut self.start_size)?;
        xfer.xfer_random_variable(&mut self.start_size_rate)?;
        xfer.xfer_random_variable(&mut self.size_rate)?;
        xfer.xfer_random_variable(&mut self.size_rate_damping)?;

        for key in &mut self.alpha_keys {
            xfer.xfer_random_variable(&mut key.value)?;
            xfer.xfer_u32(&mut key.frame)?;
        }
        for key in &mut self.color_keys {
            xfer.xfer_rgb_color(&mut key.color)?;
            xfer.xfer_u32(&mut key.frame)?;
        }
        xfer.xfer_random_variable(&mut self.color_scale)?;

        xfer.xfer_random_variable(&mut self.burst_delay)?;
        xfer.xfer_random_variable(&mut self.burst_count)?;
        xfer.xfer_random_variable(&mut self.initial_delay)?;

        xfer.xfer_coord3d(&mut self.drift_velocity)?;
        xfer.xfer_f32(&mut self.gravity)?;

        xfer.xfer_string(&mut self.slave_system_name)?;
        xfer.xfer_coord3d(&mut self.slave_pos_offset)?;
        xfer.xfer_string(&mut self.attached_system_name)?;

        self.emission_velocity.xfer(xfer)?;
        xfer_enum(xfer, &mut self.priority)?;
        self.emission_volume.xfer(xfer)?;

        xfer.xfer_bool(&mut self.is_emission_volume_hollow)?;
        xfer.xfer_bool(&mut self.is_ground_aligned)?;
        xfer.xfer_bool(&mut self.is_emit_above_ground_only)?;
        xfer.xfer_bool(&mut self.is_particle_up_towards_emitter)?;

        xfer_enum(xfer, &mut self.wind_motion)?;
        xfer.xfer_f32(&mut self.wind_angle)?;
        xfer.xfer_f32(&mut self.wind_angle_change)?;
        xfer.xfer_f32(&mut self.wind_angle_change_min)?;
        xfer.xfer_f32(&mut self.wind_angle_change_max)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_start_angle)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_start_angle_min)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_start_angle_max)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_end_angle)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_end_angle_min)?;
        xfer.xfer_f32(&mut self.wind_ping_pong_end_angle_max)?;
        xfer.xfer_bool(&mut self.wind_moving_to_end_angle)
    }
}
