//! # Particles
//!
//! A particle is one simulated point of an effect. It is owned by the
//! manager's particle pool, belongs to exactly one system and sits in
//! exactly one priority bucket. A particle may also control a system,
//! which then follows it around.

use cinder_core::{Coord3D, RgbColor};
use cinder_xfer::{Snapshot, Xfer, XferError, XferResult, XferVersion};

use crate::fixup::ParticleFixup;
use crate::ids::{ParticleHandle, ParticleId, ParticleSystemId, SystemHandle};
use crate::info::{ParticleInfo, MAX_KEYFRAMES};
use crate::priority::ParticlePriority;

/// Wind push per frame at full strength.
pub const WIND_FORCE: f32 = 2.0;

/// Distance from the emitter inside which wind pushes at full strength.
pub const WIND_FULL_FORCE_DISTANCE: f32 = 75.0;

/// Distance from the emitter beyond which wind no longer pushes.
pub const WIND_NO_FORCE_DISTANCE: f32 = 200.0;

/// The system a particle controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlLink {
    /// Controls nothing.
    #[default]
    None,
    /// Loaded from a snapshot, not yet resolved.
    Pending(ParticleSystemId),
    /// Live link.
    Bound {
        /// Stable ID of the controlled system.
        id: ParticleSystemId,
        /// Handle of the controlled system.
        system: SystemHandle,
    },
}

impl ControlLink {
    /// Stored form of the link.
    #[must_use]
    pub const fn id(self) -> ParticleSystemId {
        match self {
            Self::None => ParticleSystemId::NONE,
            Self::Pending(id) | Self::Bound { id, .. } => id,
        }
    }

    /// Live handle, once resolved.
    #[must_use]
    pub const fn system(self) -> Option<SystemHandle> {
        match self {
            Self::Bound { system, .. } => Some(system),
            _ => None,
        }
    }
}

/// A simulated particle.
#[derive(Clone, Debug)]
pub struct Particle {
    /// Birth parameters, advanced in place as the particle moves.
    info: ParticleInfo,
    id: ParticleId,
    system: SystemHandle,
    priority: ParticlePriority,
    is_field: bool,

    acceleration: Coord3D,
    last_position: Coord3D,
    lifetime_left: u32,
    create_timestamp: u32,

    alpha: f32,
    alpha_rate: f32,
    alpha_target_key: usize,
    color: RgbColor,
    color_rate: RgbColor,
    color_target_key: usize,

    is_culled: bool,
    control: ControlLink,

    // Intrusive list links, maintained by the manager
    pub(crate) system_prev: Option<ParticleHandle>,
    pub(crate) system_next: Option<ParticleHandle>,
    pub(crate) in_system_list: bool,
    pub(crate) priority_prev: Option<ParticleHandle>,
    pub(crate) priority_next: Option<ParticleHandle>,
    pub(crate) in_priority_list: bool,
}

impl Particle {
    const CURRENT_VERSION: XferVersion = 1;

    /// Creates a particle born at `frame`.
    ///
    /// Alpha and color start at key 0 and head for key 1.
    #[must_use]
    pub fn new(
        info: ParticleInfo,
        id: ParticleId,
        system: SystemHandle,
        priority: ParticlePriority,
        is_field: bool,
        frame: u32,
    ) -> Self {
        let mut particle = Self {
            lifetime_left: info.lifetime,
            last_position: info.position,
            alpha: info.alpha_keys[0].value,
            color: info.color_keys[0].color,
            info,
            id,
            system,
            priority,
            is_field,
            acceleration: Coord3D::ZERO,
            create_timestamp: frame,
            alpha_rate: 0.0,
            alpha_target_key: 1,
            color_rate: RgbColor::BLACK,
            color_target_key: 1,
            is_culled: false,
            control: ControlLink::None,
            system_prev: None,
            system_next: None,
            in_system_list: false,
            priority_prev: None,
            priority_next: None,
            in_priority_list: false,
        };
        particle.compute_alpha_rate();
        particle.compute_color_rate();
        particle
    }

    /// Sets the alpha rate towards the current target key.
    ///
    /// The rate is zero once the target is past the last key, is a
    /// zero-frame sentinel, or shares its frame with the previous key.
    pub fn compute_alpha_rate(&mut self) {
        let target = self.alpha_target_key;
        self.alpha_rate = 0.0;
        if target == 0 || target >= MAX_KEYFRAMES || self.info.alpha_keys[target].frame == 0 {
            return;
        }
        let from = self.info.alpha_keys[target - 1];
        let to = self.info.alpha_keys[target];
        let frames = to.frame.saturating_sub(from.frame);
        if frames > 0 {
            self.alpha_rate = (to.value - from.value) / frames as f32;
        }
    }

    /// Sets the color rate towards the current target key. Same rules as
    /// [`Particle::compute_alpha_rate`].
    pub fn compute_color_rate(&mut self) {
        let target = self.color_target_key;
        self.color_rate = RgbColor::BLACK;
        if target == 0 || target >= MAX_KEYFRAMES || self.info.color_keys[target].frame == 0 {
            return;
        }
        let from = self.info.color_keys[target - 1];
        let to = self.info.color_keys[target];
        let frames = to.frame.saturating_sub(from.frame);
        if frames > 0 {
            self.color_rate = (to.color - from.color) * (1.0 / frames as f32);
        }
    }

    /// Accumulates a force for the next update.
    #[inline]
    pub fn apply_force(&mut self, force: Coord3D) {
        self.acceleration += force;
    }

    /// Advances one frame.
    ///
    /// `wind` is the owning system's wind angle when wind is active.
    /// Returns `false` once the particle's lifetime is used up.
    pub fn update(&mut self, frame: u32, drift: Coord3D, wind: Option<f32>) -> bool {
        self.last_position = self.info.position;

        let info = &mut self.info;
        info.velocity += self.acceleration;
        info.velocity = info.velocity * info.velocity_damping;
        info.position += info.velocity + drift;

        info.angle_z += info.angular_rate_z;
        info.angular_rate_z *= info.angular_damping;

        info.size = (info.size + info.size_rate).max(0.0);
        info.size_rate *= info.size_rate_damping;

        if let Some(angle) = wind {
            self.apply_wind(angle);
        }

        let age = frame.saturating_sub(self.create_timestamp);
        self.advance_alpha(age);
        self.advance_color(age);

        self.acceleration = Coord3D::ZERO;

        self.lifetime_left = self.lifetime_left.saturating_sub(1);
        self.lifetime_left > 0
    }

    fn advance_alpha(&mut self, age: u32) {
        self.alpha += self.alpha_rate;
        let target = self.alpha_target_key;
        if target < MAX_KEYFRAMES {
            let key = self.info.alpha_keys[target];
            if key.frame != 0 && age >= key.frame {
                self.alpha = key.value;
                self.alpha_target_key += 1;
                self.compute_alpha_rate();
            }
        }
        self.alpha = self.alpha.clamp(0.0, 1.0);
    }

    fn advance_color(&mut self, age: u32) {
        self.color = self.color + self.color_rate;
        let target = self.color_target_key;
        if target < MAX_KEYFRAMES {
            let key = self.info.color_keys[target];
            if key.frame != 0 && age >= key.frame {
                self.color = key.color;
                self.color_target_key += 1;
                self.compute_color_rate();
            }
        }
        self.color = self.color.offset(self.info.color_scale);
    }

    fn apply_wind(&mut self, angle: f32) {
        let offset = self.info.position - self.info.emitter_position;
        let distance = (offset.x * offset.x + offset.y * offset.y).sqrt();
        let falloff = if distance <= WIND_FULL_FORCE_DISTANCE {
            1.0
        } else if distance >= WIND_NO_FORCE_DISTANCE {
            return;
        } else {
            1.0 - (distance - WIND_FULL_FORCE_DISTANCE)
                / (WIND_NO_FORCE_DISTANCE - WIND_FULL_FORCE_DISTANCE)
        };
        let strength = WIND_FORCE * self.info.wind_randomness * falloff;
        let (sin, cos) = angle.sin_cos();
        self.info.position.x += cos * strength;
        self.info.position.y += sin * strength;
    }

    /// Particle ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ParticleId {
        self.id
    }

    /// Owning system.
    #[inline]
    #[must_use]
    pub const fn system(&self) -> SystemHandle {
        self.system
    }

    /// Priority bucket.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> ParticlePriority {
        self.priority
    }

    /// Counts against the field particle budget.
    #[inline]
    #[must_use]
    pub const fn is_field(&self) -> bool {
        self.is_field
    }

    /// Current parameters (position, velocity, size and so on).
    #[inline]
    #[must_use]
    pub const fn info(&self) -> &ParticleInfo {
        &self.info
    }

    /// Current position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Coord3D {
        self.info.position
    }

    /// Position before the last update.
    #[inline]
    #[must_use]
    pub const fn last_position(&self) -> Coord3D {
        self.last_position
    }

    /// Pending acceleration.
    #[inline]
    #[must_use]
    pub const fn acceleration(&self) -> Coord3D {
        self.acceleration
    }

    /// Current opacity.
    #[inline]
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Opacity change per frame towards the target key.
    #[inline]
    #[must_use]
    pub const fn alpha_rate(&self) -> f32 {
        self.alpha_rate
    }

    /// Index of the alpha key being approached.
    #[inline]
    #[must_use]
    pub const fn alpha_target_key(&self) -> usize {
        self.alpha_target_key
    }

    /// Current color.
    #[inline]
    #[must_use]
    pub const fn color(&self) -> RgbColor {
        self.color
    }

    /// Color change per frame towards the target key.
    #[inline]
    #[must_use]
    pub const fn color_rate(&self) -> RgbColor {
        self.color_rate
    }

    /// Index of the color key being approached.
    #[inline]
    #[must_use]
    pub const fn color_target_key(&self) -> usize {
        self.color_target_key
    }

    /// Frames left to live.
    #[inline]
    #[must_use]
    pub const fn lifetime_left(&self) -> u32 {
        self.lifetime_left
    }

    /// Frame of birth.
    #[inline]
    #[must_use]
    pub const fn create_timestamp(&self) -> u32 {
        self.create_timestamp
    }

    /// Culled by the renderer this frame.
    #[inline]
    #[must_use]
    pub const fn is_culled(&self) -> bool {
        self.is_culled
    }

    /// Marks the particle culled, or visible again.
    pub fn set_culled(&mut self, culled: bool) {
        self.is_culled = culled;
    }

    /// Link to the controlled system.
    #[inline]
    #[must_use]
    pub const fn control(&self) -> ControlLink {
        self.control
    }

    /// Handle of the controlled system, once resolved.
    #[inline]
    #[must_use]
    pub const fn controlled_system(&self) -> Option<SystemHandle> {
        self.control.system()
    }

    pub(crate) fn set_control(&mut self, control: ControlLink) {
        self.control = control;
    }
}

impl<'a> Snapshot<ParticleFixup<'a>> for Particle {
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut version = Self::CURRENT_VERSION;
        xfer.xfer_version(&mut version, Self::CURRENT_VERSION)?;

        self.info.xfer_snapshot(xfer)?;
        xfer.xfer_u32(&mut self.id.0)?;
        xfer.xfer_coord3d(&mut self.acceleration)?;
        xfer.xfer_coord3d(&mut self.last_position)?;
        xfer.xfer_u32(&mut self.lifetime_left)?;
        xfer.xfer_u32(&mut self.create_timestamp)?;

        xfer.xfer_f32(&mut self.alpha)?;
        xfer.xfer_f32(&mut self.alpha_rate)?;
        let mut alpha_target = self.alpha_target_key as i32;
        xfer.xfer_i32(&mut alpha_target)?;
        xfer.xfer_rgb_color(&mut self.color)?;
        xfer.xfer_rgb_color(&mut self.color_rate)?;
        let mut color_target = self.color_target_key as i32;
        xfer.xfer_i32(&mut color_target)?;
        xfer.xfer_bool(&mut self.is_culled)?;

        let mut control_id = self.control.id();
        xfer.xfer_u32(&mut control_id.0)?;

        if xfer.is_loading() {
            self.alpha_target_key = key_index(alpha_target)?;
            self.color_target_key = key_index(color_target)?;
            self.control = if control_id.is_none() {
                ControlLink::None
            } else {
                ControlLink::Pending(control_id)
            };
        }
        Ok(())
    }

    /// Binds a pending control link and registers this particle as the
    /// controlled system's control particle.
    fn load_post_process(&mut self, fixup: &mut ParticleFixup<'a>) -> XferResult<()> {
        let ControlLink::Pending(id) = self.control else {
            return Ok(());
        };
        let Some(handle) = fixup.directory.resolve(id)? else {
            self.control = ControlLink::None;
            return Ok(());
        };
        let system = fixup
            .systems
            .get_mut(handle)
            .ok_or(XferError::UnresolvedReference { kind: "particle system", id: id.0 })?;
        system.set_control_particle(Some(fixup.particle));
        self.control = ControlLink::Bound { id, system: handle };
        Ok(())
    }
}

/// Target keys run from 1 up to one past the last key.
fn key_index(raw: i32) -> XferResult<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|k| *k <= MAX_KEYFRAMES)
        .ok_or(XferError::InvalidEnum { kind: "keyframe index", value: raw as u32 })
}
