//! # Particle Systems
//!
//! A system is a live emitter created from a template. It owns a copy of
//! the template's parameters, a transform (optionally following an object
//! or drawable), emission timers and links to its master, slave and
//! control particle.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──stop()──▶ Stopped ──destroy()──▶ Destroyed ──(manager)──▶ freed
//!    ▲                  │
//!    └─────start()──────┘
//! ```
//!
//! A system that is destroyed is never simulated again; the manager frees
//! it (and its particles) at the end of the frame. A stopped system is
//! destroyed automatically once its last particle dies.

use std::f32::consts::TAU;

use cinder_core::{Coord3D, GameRandom, Matrix3D};
use cinder_xfer::{Snapshot, Xfer, XferResult, XferVersion};

use crate::fixup::SystemFixup;
use crate::ids::{DrawableId, ObjectId, ParticleHandle, ParticleSystemId, SystemHandle};
use crate::info::{
    EmissionVelocity, EmissionVolume, Keyframe, ParticleInfo, ParticleSystemInfo, WindMotion,
    MAX_KEYFRAMES,
};
use crate::priority::ParticlePriority;
use crate::scene::SceneQuery;
use crate::template::TemplateId;

/// Share of the configured ping-pong turn rate used near either end.
const PING_PONG_MIN_RATE: f32 = 0.1;

/// A live particle emitter.
#[derive(Clone, Debug)]
pub struct ParticleSystem {
    info: ParticleSystemInfo,
    template: TemplateId,
    id: ParticleSystemId,

    attached_to_drawable: DrawableId,
    attached_to_object: ObjectId,
    local_transform: Matrix3D,
    is_local_identity: bool,
    transform: Matrix3D,
    is_identity: bool,

    burst_delay_left: u32,
    delay_left: u32,
    start_timestamp: u32,
    system_lifetime_left: u32,
    accumulated_size_bonus: f32,

    velocity_coeff: Coord3D,
    count_coeff: f32,
    delay_coeff: f32,
    size_coeff: f32,

    position: Coord3D,
    last_position: Coord3D,
    is_first_position: bool,

    slave: Option<SystemHandle>,
    slave_id: ParticleSystemId,
    master: Option<SystemHandle>,
    master_id: ParticleSystemId,
    control_particle: Option<ParticleHandle>,

    // Particle list, maintained by the manager
    pub(crate) first_particle: Option<ParticleHandle>,
    pub(crate) last_particle: Option<ParticleHandle>,
    pub(crate) particle_count: usize,

    is_stopped: bool,
    is_destroyed: bool,
    is_forever: bool,
    is_saveable: bool,
}

impl ParticleSystem {
    const CURRENT_VERSION: XferVersion = 1;

    /// Creates a system from a template's parameters.
    ///
    /// Rolls, in order, the ping-pong wind start angle, end angle and the
    /// current wind angle between them, then the initial delay.
    ///
    /// # Arguments
    ///
    /// * `template` - Template the parameters came from
    /// * `info` - Copy of the template's parameters
    /// * `id` - Manager-assigned ID
    /// * `frame` - Current frame, recorded as the start time
    /// * `rng` - Client random stream
    pub fn new(
        template: TemplateId,
        mut info: ParticleSystemInfo,
        id: ParticleSystemId,
        frame: u32,
        rng: &mut dyn GameRandom,
    ) -> Self {
        info.wind_ping_pong_start_angle =
            rng.real_in(info.wind_ping_pong_start_angle_min, info.wind_ping_pong_start_angle_max);
        info.wind_ping_pong_end_angle =
            rng.real_in(info.wind_ping_pong_end_angle_min, info.wind_ping_pong_end_angle_max);
        info.wind_angle = rng.real_in(info.wind_ping_pong_start_angle, info.wind_ping_pong_end_angle);

        let delay_left = info.initial_delay.frames(rng);
        let system_lifetime_left = info.system_lifetime;

        Self {
            template,
            id,
            attached_to_drawable: DrawableId::INVALID,
            attached_to_object: ObjectId::INVALID,
            local_transform: Matrix3D::IDENTITY,
            is_local_identity: true,
            transform: Matrix3D::IDENTITY,
            is_identity: true,
            burst_delay_left: 0,
            delay_left,
            start_timestamp: frame,
            system_lifetime_left,
            accumulated_size_bonus: 0.0,
            velocity_coeff: Coord3D::new(1.0, 1.0, 1.0),
            count_coeff: 1.0,
            delay_coeff: 1.0,
            size_coeff: 1.0,
            position: Coord3D::ZERO,
            last_position: Coord3D::ZERO,
            is_first_position: true,
            slave: None,
            slave_id: ParticleSystemId::NONE,
            master: None,
            master_id: ParticleSystemId::NONE,
            control_particle: None,
            first_particle: None,
            last_particle: None,
            particle_count: 0,
            is_stopped: false,
            is_destroyed: false,
            is_forever: system_lifetime_left == 0,
            is_saveable: true,
            info,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Resumes emission.
    pub fn start(&mut self) {
        if !self.is_destroyed {
            self.is_stopped = false;
        }
    }

    /// Halts emission. Live particles keep simulating.
    pub fn stop(&mut self) {
        self.is_stopped = true;
    }

    /// Requests removal. The manager frees the system at the end of the frame.
    pub fn destroy(&mut self) {
        self.is_stopped = true;
        self.is_destroyed = true;
    }

    /// Skips any remaining delay and bursts on the next update.
    pub fn trigger(&mut self) {
        self.delay_left = 0;
        self.burst_delay_left = 0;
        self.start();
    }

    /// Emission halted.
    #[inline]
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.is_stopped
    }

    /// Pending release by the manager.
    #[inline]
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.is_destroyed
    }

    /// Runs until explicitly stopped (configured lifetime of zero).
    #[inline]
    #[must_use]
    pub const fn is_forever(&self) -> bool {
        self.is_forever
    }

    /// Included in snapshots.
    #[inline]
    #[must_use]
    pub const fn is_saveable(&self) -> bool {
        self.is_saveable
    }

    /// Includes or excludes this system from snapshots.
    pub fn set_saveable(&mut self, saveable: bool) {
        self.is_saveable = saveable;
    }

    /// Stopped with no particles left. The manager destroys expired
    /// systems, forever systems included.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.is_stopped && self.particle_count == 0
    }

    // =========================================================================
    // Identity and parameters
    // =========================================================================

    /// Stable ID, unique per manager.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ParticleSystemId {
        self.id
    }

    /// Template this system was created from.
    #[inline]
    #[must_use]
    pub const fn template(&self) -> TemplateId {
        self.template
    }

    /// Emission parameters.
    #[inline]
    #[must_use]
    pub const fn info(&self) -> &ParticleSystemInfo {
        &self.info
    }

    /// Mutable emission parameters.
    pub fn info_mut(&mut self) -> &mut ParticleSystemInfo {
        &mut self.info
    }

    /// Budget bucket of every particle this system emits.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> ParticlePriority {
        self.info.priority
    }

    /// Number of live particles.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Frame the system was created on.
    #[inline]
    #[must_use]
    pub const fn start_timestamp(&self) -> u32 {
        self.start_timestamp
    }

    /// Frames until the system stops, for timed systems.
    #[inline]
    #[must_use]
    pub const fn system_lifetime_left(&self) -> u32 {
        self.system_lifetime_left
    }

    /// Frames until the first burst.
    #[inline]
    #[must_use]
    pub const fn delay_left(&self) -> u32 {
        self.delay_left
    }

    /// Frames until the next burst.
    #[inline]
    #[must_use]
    pub const fn burst_delay_left(&self) -> u32 {
        self.burst_delay_left
    }

    /// Current wind direction in radians.
    #[inline]
    #[must_use]
    pub const fn wind_angle(&self) -> f32 {
        self.info.wind_angle
    }

    // =========================================================================
    // Multipliers
    // =========================================================================

    /// Scales emitted velocities per axis.
    pub fn set_velocity_multiplier(&mut self, multiplier: Coord3D) {
        self.velocity_coeff = multiplier;
    }

    /// Scales the number of particles per burst.
    pub fn set_burst_count_multiplier(&mut self, multiplier: f32) {
        self.count_coeff = multiplier;
    }

    /// Scales the delay between bursts.
    pub fn set_burst_delay_multiplier(&mut self, multiplier: f32) {
        self.delay_coeff = multiplier;
    }

    /// Scales particle sizes and size rates.
    pub fn set_size_multiplier(&mut self, multiplier: f32) {
        self.size_coeff = multiplier;
    }

    /// Replaces the remaining initial delay.
    pub fn set_initial_delay(&mut self, frames: u32) {
        self.delay_left = frames;
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// World position, as of the last update or placement.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Coord3D {
        self.position
    }

    /// World position before the last update.
    #[inline]
    #[must_use]
    pub const fn last_position(&self) -> Coord3D {
        self.last_position
    }

    /// World transform.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &Matrix3D {
        &self.transform
    }

    /// Transform relative to the attachment, or to the world.
    #[inline]
    #[must_use]
    pub const fn local_transform(&self) -> &Matrix3D {
        &self.local_transform
    }

    /// Places the system. For attached systems this is an offset from the
    /// parent.
    pub fn set_position(&mut self, position: Coord3D) {
        self.local_transform.set_translation(position);
        self.is_local_identity = self.local_transform.is_identity();
        if !self.is_attached() {
            self.transform = self.local_transform;
            self.is_identity = self.is_local_identity;
            self.position = position;
        }
    }

    /// Replaces the local transform.
    pub fn set_local_transform(&mut self, transform: Matrix3D) {
        self.local_transform = transform;
        self.is_local_identity = transform.is_identity();
    }

    /// Rotates the local transform about X.
    pub fn rotate_local_transform_x(&mut self, angle: f32) {
        self.set_local_transform(self.local_transform.multiply(&Matrix3D::rotation_x(angle)));
    }

    /// Rotates the local transform about Y.
    pub fn rotate_local_transform_y(&mut self, angle: f32) {
        self.set_local_transform(self.local_transform.multiply(&Matrix3D::rotation_y(angle)));
    }

    /// Rotates the local transform about Z.
    pub fn rotate_local_transform_z(&mut self, angle: f32) {
        self.set_local_transform(self.local_transform.multiply(&Matrix3D::rotation_z(angle)));
    }

    /// Follows a game object. Replaces any drawable attachment.
    pub fn attach_to_object(&mut self, object: ObjectId) {
        self.attached_to_object = object;
        self.attached_to_drawable = DrawableId::INVALID;
    }

    /// Follows a drawable. Replaces any object attachment.
    pub fn attach_to_drawable(&mut self, drawable: DrawableId) {
        self.attached_to_drawable = drawable;
        self.attached_to_object = ObjectId::INVALID;
    }

    /// Followed object, or `ObjectId::INVALID`.
    #[inline]
    #[must_use]
    pub const fn attached_object(&self) -> ObjectId {
        self.attached_to_object
    }

    /// Followed drawable, or `DrawableId::INVALID`.
    #[inline]
    #[must_use]
    pub const fn attached_drawable(&self) -> DrawableId {
        self.attached_to_drawable
    }

    /// Follows an object or a drawable.
    #[inline]
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached_to_object.is_valid() || self.attached_to_drawable.is_valid()
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Master feeding this system, once resolved.
    #[inline]
    #[must_use]
    pub const fn master(&self) -> Option<SystemHandle> {
        self.master
    }

    /// Master ID, `NONE` when unlinked.
    #[inline]
    #[must_use]
    pub const fn master_id(&self) -> ParticleSystemId {
        self.master_id
    }

    /// Slave fed by this system, once resolved.
    #[inline]
    #[must_use]
    pub const fn slave(&self) -> Option<SystemHandle> {
        self.slave
    }

    /// Slave ID, `NONE` when unlinked.
    #[inline]
    #[must_use]
    pub const fn slave_id(&self) -> ParticleSystemId {
        self.slave_id
    }

    /// Emission of a slave is driven by its master.
    #[inline]
    #[must_use]
    pub const fn is_slave(&self) -> bool {
        !self.master_id.is_none()
    }

    /// Particle this system follows, if any.
    #[inline]
    #[must_use]
    pub const fn control_particle(&self) -> Option<ParticleHandle> {
        self.control_particle
    }

    pub(crate) fn set_slave_link(&mut self, slave: Option<SystemHandle>, id: ParticleSystemId) {
        self.slave = slave;
        self.slave_id = id;
    }

    pub(crate) fn set_master_link(&mut self, master: Option<SystemHandle>, id: ParticleSystemId) {
        self.master = master;
        self.master_id = id;
    }

    pub(crate) fn set_control_particle(&mut self, particle: Option<ParticleHandle>) {
        self.control_particle = particle;
    }

    // =========================================================================
    // Simulation steps, driven by the manager
    // =========================================================================

    /// Recomputes the world transform from the attachment.
    ///
    /// Returns `false` when the attached object or drawable no longer
    /// exists.
    pub(crate) fn update_transform(&mut self, scene: &dyn SceneQuery) -> bool {
        let parent = if self.attached_to_object.is_valid() {
            match scene.object_transform(self.attached_to_object) {
                Some(parent) => Some(parent),
                None => return false,
            }
        } else if self.attached_to_drawable.is_valid() {
            match scene.drawable_transform(self.attached_to_drawable) {
                Some(parent) => Some(parent),
                None => return false,
            }
        } else {
            None
        };

        self.transform = match parent {
            Some(parent) => parent.multiply(&self.local_transform),
            None => self.local_transform,
        };
        self.is_identity = self.transform.is_identity();

        let position = self.transform.translation();
        self.last_position = if self.is_first_position { position } else { self.position };
        self.is_first_position = false;
        self.position = position;
        true
    }

    /// Turns the wind direction one frame.
    pub(crate) fn update_wind_motion(&mut self, rng: &mut dyn GameRandom) {
        let info = &mut self.info;
        match info.wind_motion {
            WindMotion::PingPong => {
                if info.wind_angle_change == 0.0 {
                    info.wind_angle_change =
                        rng.real_in(info.wind_angle_change_min, info.wind_angle_change_max);
                }
                let start = info.wind_ping_pong_start_angle;
                let end = info.wind_ping_pong_end_angle;
                let half = (end - start) * 0.5;
                // Slow down towards either end of the swing
                let closeness = if half.abs() > f32::EPSILON {
                    ((info.wind_angle - (start + half)).abs() / half.abs()).min(1.0)
                } else {
                    1.0
                };
                let rate = info.wind_angle_change
                    * (PING_PONG_MIN_RATE + (1.0 - PING_PONG_MIN_RATE) * (1.0 - closeness));

                if info.wind_moving_to_end_angle {
                    info.wind_angle += rate;
                    if info.wind_angle >= end {
                        info.wind_angle = end;
                        info.wind_moving_to_end_angle = false;
                        info.wind_angle_change =
                            rng.real_in(info.wind_angle_change_min, info.wind_angle_change_max);
                        info.wind_ping_pong_start_angle = rng.real_in(
                            info.wind_ping_pong_start_angle_min,
                            info.wind_ping_pong_start_angle_max,
                        );
                    }
                } else {
                    info.wind_angle -= rate;
                    if info.wind_angle <= start {
                        info.wind_angle = start;
                        info.wind_moving_to_end_angle = true;
                        info.wind_angle_change =
                            rng.real_in(info.wind_angle_change_min, info.wind_angle_change_max);
                        info.wind_ping_pong_end_angle = rng.real_in(
                            info.wind_ping_pong_end_angle_min,
                            info.wind_ping_pong_end_angle_max,
                        );
                    }
                }
            }
            WindMotion::Circular => {
                if info.wind_angle_change == 0.0 {
                    info.wind_angle_change =
                        rng.real_in(info.wind_angle_change_min, info.wind_angle_change_max);
                }
                info.wind_angle = (info.wind_angle + info.wind_angle_change).rem_euclid(TAU);
            }
            WindMotion::None | WindMotion::Unused => {}
        }
    }

    /// Wind angle felt by this system's particles, if wind is active.
    #[must_use]
    pub fn active_wind(&self) -> Option<f32> {
        self.info.wind_motion.is_active().then_some(self.info.wind_angle)
    }

    /// Counts down delays and lifetime. Returns `true` when a burst is due.
    pub(crate) fn advance_timers(&mut self) -> bool {
        if self.is_stopped {
            return false;
        }
        if self.delay_left > 0 {
            self.delay_left -= 1;
            return false;
        }

        let burst_due = if self.burst_delay_left == 0 {
            true
        } else {
            self.burst_delay_left -= 1;
            false
        };

        if !self.is_forever {
            self.system_lifetime_left = self.system_lifetime_left.saturating_sub(1);
            if self.system_lifetime_left == 0 {
                self.stop();
            }
        }
        burst_due
    }

    /// Starts a burst: rolls its size and the delay to the next one.
    ///
    /// One-shot systems stop here.
    pub(crate) fn begin_burst(&mut self, rng: &mut dyn GameRandom) -> usize {
        let count = (self.info.burst_count.value(rng) * self.count_coeff).max(0.0) as usize;
        self.burst_delay_left = (self.info.burst_delay.value(rng) * self.delay_coeff).max(0.0) as u32;
        self.accumulated_size_bonus += self.info.start_size_rate.value(rng);
        if self.info.is_one_shot {
            self.stop();
        }
        count
    }

    /// Rolls the birth parameters of one particle.
    pub fn generate_particle_info(
        &self,
        rng: &mut dyn GameRandom,
        scene: &dyn SceneQuery,
    ) -> ParticleInfo {
        let info = &self.info;

        let local_position = self.emission_position(rng);
        let local_velocity = self.emission_velocity(local_position, rng);
        let velocity = self.transform.rotate_vector(local_velocity).scale(self.velocity_coeff);

        let mut position = self.transform.transform_point(local_position);
        if info.is_emit_above_ground_only {
            position.z = position.z.max(scene.ground_height(position.x, position.y));
        }

        let mut alpha_keys = [Keyframe::default(); MAX_KEYFRAMES];
        for (key, source) in alpha_keys.iter_mut().zip(&info.alpha_keys) {
            *key = Keyframe { value: source.value.value(rng), frame: source.frame };
        }

        ParticleInfo {
            velocity,
            position,
            emitter_position: self.position,
            velocity_damping: info.velocity_damping.value(rng),
            angle_z: info.angle_z.value(rng),
            angular_rate_z: info.angular_rate_z.value(rng),
            angular_damping: info.angular_damping.value(rng),
            lifetime: info.lifetime.frames(rng),
            size: (info.start_size.value(rng) + self.accumulated_size_bonus) * self.size_coeff,
            size_rate: info.size_rate.value(rng) * self.size_coeff,
            size_rate_damping: info.size_rate_damping.value(rng),
            alpha_keys,
            color_keys: info.color_keys,
            color_scale: info.color_scale.value(rng),
            is_particle_up_towards_emitter: info.is_particle_up_towards_emitter,
            wind_randomness: rng.real_in(0.7, 1.3),
        }
    }

    fn emission_position(&self, rng: &mut dyn GameRandom) -> Coord3D {
        let hollow = self.info.is_emission_volume_hollow;
        match self.info.emission_volume {
            EmissionVolume::Point => Coord3D::ZERO,
            EmissionVolume::Line { start, end } => start + (end - start) * rng.real_in(0.0, 1.0),
            EmissionVolume::Box { half_size: h } => {
                let mut p = Coord3D::new(
                    rng.real_in(-h.x, h.x),
                    rng.real_in(-h.y, h.y),
                    rng.real_in(-h.z, h.z),
                );
                if hollow {
                    let side = if rng.int_in(0, 1) == 0 { -1.0 } else { 1.0 };
                    match rng.int_in(0, 2) {
                        0 => p.x = h.x * side,
                        1 => p.y = h.y * side,
                        _ => p.z = h.z * side,
                    }
                }
                p
            }
            EmissionVolume::Sphere { radius } => {
                let r = if hollow { radius } else { rng.real_in(0.0, radius) };
                random_direction(rng, -1.0) * r
            }
            EmissionVolume::Cylinder { radius, length } => {
                let angle = rng.real_in(0.0, TAU);
                let r = if hollow { radius } else { rng.real_in(0.0, radius) };
                let half = length * 0.5;
                Coord3D::new(angle.cos() * r, angle.sin() * r, rng.real_in(-half, half))
            }
        }
    }

    fn emission_velocity(&self, local_position: Coord3D, rng: &mut dyn GameRandom) -> Coord3D {
        match self.info.emission_velocity {
            EmissionVelocity::Ortho { x, y, z } => {
                Coord3D::new(x.value(rng), y.value(rng), z.value(rng))
            }
            EmissionVelocity::Spherical { speed } => random_direction(rng, -1.0) * speed.value(rng),
            EmissionVelocity::Hemispherical { speed } => {
                random_direction(rng, 0.0) * speed.value(rng)
            }
            EmissionVelocity::Cylindrical { radial, normal } => {
                let angle = rng.real_in(0.0, TAU);
                let r = radial.value(rng);
                Coord3D::new(angle.cos() * r, angle.sin() * r, normal.value(rng))
            }
            EmissionVelocity::Outward { speed, other_speed } => {
                let mut direction = local_position.normalized();
                if direction == Coord3D::ZERO {
                    direction = random_direction(rng, -1.0);
                }
                direction * speed.value(rng) + Coord3D::new(0.0, 0.0, other_speed.value(rng))
            }
        }
    }
}

/// Uniform direction on the unit sphere with `z >= min_z`.
fn random_direction(rng: &mut dyn GameRandom, min_z: f32) -> Coord3D {
    let z = rng.real_in(min_z, 1.0);
    let angle = rng.real_in(0.0, TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Coord3D::new(angle.cos() * r, angle.sin() * r, z)
}

impl<'a> Snapshot<SystemFixup<'a>> for ParticleSystem {
    /// Saves the system's own state. Its particles are written separately
    /// by the manager, right after it.
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut version = Self::CURRENT_VERSION;
        xfer.xfer_version(&mut version, Self::CURRENT_VERSION)?;

        self.info.xfer_snapshot(xfer)?;
        xfer.xfer_u32(&mut self.id.0)?;
        xfer.xfer_u32(&mut self.attached_to_drawable.0)?;
        xfer.xfer_u32(&mut self.attached_to_object.0)?;

        xfer.xfer_bool(&mut self.is_local_identity)?;
        xfer.xfer_matrix3d(&mut self.local_transform)?;
        xfer.xfer_bool(&mut self.is_identity)?;
        xfer.xfer_matrix3d(&mut self.transform)?;

        xfer.xfer_u32(&mut self.burst_delay_left)?;
        xfer.xfer_u32(&mut self.delay_left)?;
        xfer.xfer_u32(&mut self.start_timestamp)?;
        xfer.xfer_u32(&mut self.system_lifetime_left)?;
        xfer.xfer_f32(&mut self.accumulated_size_bonus)?;

        xfer.xfer_coord3d(&mut self.velocity_coeff)?;
        xfer.xfer_f32(&mut self.count_coeff)?;
        xfer.xfer_f32(&mut self.delay_coeff)?;
        xfer.xfer_f32(&mut self.size_coeff)?;

        xfer.xfer_coord3d(&mut self.position)?;
        xfer.xfer_coord3d(&mut self.last_position)?;
        xfer.xfer_bool(&mut self.is_first_position)?;

        xfer.xfer_u32(&mut self.slave_id.0)?;
        xfer.xfer_u32(&mut self.master_id.0)?;

        xfer.xfer_bool(&mut self.is_stopped)?;
        xfer.xfer_bool(&mut self.is_forever)?;
        xfer.xfer_bool(&mut self.is_saveable)?;

        if xfer.is_loading() {
            self.slave = None;
            self.master = None;
            self.control_particle = None;
            self.is_destroyed = false;
        }
        Ok(())
    }

    fn load_post_process(&mut self, fixup: &mut SystemFixup<'a>) -> XferResult<()> {
        self.slave = fixup.directory.resolve(self.slave_id)?;
        self.master = fixup.directory.resolve(self.master_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EmptyScene;
    use cinder_core::{ChaChaRandom, RandomStream, RandomVariable};
    use cinder_xfer::{XferLoad, XferSave};

    fn rng() -> ChaChaRandom {
        ChaChaRandom::new(11, RandomStream::Client)
    }

    fn system(info: ParticleSystemInfo) -> ParticleSystem {
        ParticleSystem::new(TemplateId(0), info, ParticleSystemId(1), 0, &mut rng())
    }

    #[test]
    fn test_forever_iff_zero_lifetime() {
        assert!(system(ParticleSystemInfo::default()).is_forever());
        let timed = system(ParticleSystemInfo { system_lifetime: 3, ..ParticleSystemInfo::default() });
        assert!(!timed.is_forever());
        assert_eq!(timed.system_lifetime_left(), 3);
    }

    #[test]
    fn test_wind_rolls_within_bounds() {
        let info = ParticleSystemInfo {
            wind_motion: WindMotion::PingPong,
            wind_ping_pong_start_angle_min: 0.0,
            wind_ping_pong_start_angle_max: 0.785_398,
            wind_ping_pong_end_angle_min: 5.497_787,
            wind_ping_pong_end_angle_max: 6.283_185,
            ..ParticleSystemInfo::default()
        };
        for seed in 0..20 {
            let mut rng = ChaChaRandom::new(seed, RandomStream::Client);
            let s = ParticleSystem::new(TemplateId(0), info.clone(), ParticleSystemId(1), 0, &mut rng);
            let i = s.info();
            assert!((0.0..=0.785_398).contains(&i.wind_ping_pong_start_angle));
            assert!((5.497_787..=6.283_185).contains(&i.wind_ping_pong_end_angle));
            assert!(i.wind_angle >= i.wind_ping_pong_start_angle);
            assert!(i.wind_angle <= i.wind_ping_pong_end_angle);
        }
    }

    #[test]
    fn test_timers() {
        let mut s = system(ParticleSystemInfo {
            system_lifetime: 3,
            initial_delay: RandomVariable::constant(1.0),
            ..ParticleSystemInfo::default()
        });
        assert!(!s.advance_timers(), "initial delay");
        assert!(s.advance_timers());
        assert!(s.advance_timers());
        assert!(s.advance_timers());
        assert!(s.is_stopped());
        assert!(s.is_expired());
        assert!(!s.advance_timers());
    }

    #[test]
    fn test_one_shot_stops_after_burst() {
        let mut s = system(ParticleSystemInfo {
            is_one_shot: true,
            burst_count: RandomVariable::constant(6.0),
            ..ParticleSystemInfo::default()
        });
        s.set_burst_count_multiplier(0.5);
        assert!(s.advance_timers());
        assert_eq!(s.begin_burst(&mut rng()), 3);
        assert!(s.is_expired());
    }

    #[test]
    fn test_burst_delay() {
        let mut s = system(ParticleSystemInfo {
            burst_delay: RandomVariable::constant(2.0),
            ..ParticleSystemInfo::default()
        });
        assert!(s.advance_timers());
        s.begin_burst(&mut rng());
        assert!(!s.advance_timers());
        assert!(!s.advance_timers());
        assert!(s.advance_timers());
    }

    #[test]
    fn test_circular_wind_wraps() {
        let mut s = system(ParticleSystemInfo {
            wind_motion: WindMotion::Circular,
            wind_angle_change: 1.0,
            ..ParticleSystemInfo::default()
        });
        for _ in 0..10 {
            s.update_wind_motion(&mut rng());
            assert!((0.0..TAU).contains(&s.wind_angle()));
        }
    }

    #[test]
    fn test_ping_pong_turns_around() {
        let mut s = system(ParticleSystemInfo {
            wind_motion: WindMotion::PingPong,
            wind_angle_change: 0.5,
            wind_angle_change_min: 0.5,
            wind_angle_change_max: 0.5,
            wind_ping_pong_end_angle_min: 1.0,
            wind_ping_pong_end_angle_max: 1.0,
            ..ParticleSystemInfo::default()
        });
        let mut r = rng();
        for _ in 0..100 {
            s.update_wind_motion(&mut r);
            if !s.info().wind_moving_to_end_angle {
                break;
            }
        }
        assert!(!s.info().wind_moving_to_end_angle);
        assert_eq!(s.wind_angle(), 1.0);
    }

    #[test]
    fn test_ping_pong_moves_with_only_change_bounds() {
        let mut s = system(ParticleSystemInfo {
            wind_motion: WindMotion::PingPong,
            wind_angle_change_min: 0.1,
            wind_angle_change_max: 0.2,
            wind_ping_pong_start_angle_min: 0.0,
            wind_ping_pong_start_angle_max: 0.5,
            wind_ping_pong_end_angle_min: 5.0,
            wind_ping_pong_end_angle_max: 6.0,
            ..ParticleSystemInfo::default()
        });
        assert_eq!(s.info().wind_angle_change, 0.0);
        let before = s.wind_angle();

        let mut r = rng();
        s.update_wind_motion(&mut r);
        let change = s.info().wind_angle_change;
        assert!((0.1..=0.2).contains(&change), "change {change}");
        for _ in 0..10 {
            s.update_wind_motion(&mut r);
        }
        assert!((s.wind_angle() - before).abs() > f32::EPSILON);
    }

    #[test]
    fn test_emission_respects_volume_and_ground() {
        let mut s = system(ParticleSystemInfo {
            emission_volume: EmissionVolume::Sphere { radius: 2.0 },
            is_emission_volume_hollow: true,
            is_emit_above_ground_only: true,
            ..ParticleSystemInfo::default()
        });
        s.set_position(Coord3D::new(10.0, 0.0, 0.0));

        let mut r = rng();
        for _ in 0..50 {
            let p = s.generate_particle_info(&mut r, &EmptyScene);
            let offset = p.position - Coord3D::new(10.0, 0.0, p.position.z);
            assert!(p.position.z >= 0.0);
            assert!(offset.length() <= 2.0 + 1e-4);
            assert_eq!(p.emitter_position, Coord3D::new(10.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_lost_attachment() {
        let mut s = system(ParticleSystemInfo::default());
        assert!(s.update_transform(&EmptyScene));
        s.attach_to_object(ObjectId(5));
        assert!(!s.update_transform(&EmptyScene));
    }

    #[test]
    fn test_links_restore_as_ids() {
        let mut s = system(ParticleSystemInfo::default());
        s.set_slave_link(None, ParticleSystemId(7));
        s.set_master_link(None, ParticleSystemId(3));
        s.set_position(Coord3D::new(1.0, 2.0, 3.0));
        s.set_size_multiplier(2.0);

        let mut save = XferSave::new();
        s.xfer_snapshot(&mut save).unwrap();
        let bytes = save.into_bytes();

        let mut restored = system(ParticleSystemInfo::default());
        restored.xfer_snapshot(&mut XferLoad::new(&bytes)).unwrap();
        assert_eq!(restored.slave_id(), ParticleSystemId(7));
        assert_eq!(restored.master_id(), ParticleSystemId(3));
        assert_eq!(restored.position(), Coord3D::new(1.0, 2.0, 3.0));
        assert!(restored.slave().is_none());

        let directory = crate::fixup::SystemDirectory::default();
        let err = restored.load_post_process(&mut SystemFixup { directory: &directory }).unwrap_err();
        assert_eq!(err.code(), 6);
    }
}
