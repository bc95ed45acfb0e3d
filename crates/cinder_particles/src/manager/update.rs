//! The per-frame simulation step.

use cinder_core::Coord3D;
use tracing::{debug, trace};

use super::ParticleSystemManager;
use crate::ids::{ParticleHandle, SystemHandle};
use crate::scene::SceneQuery;

impl ParticleSystemManager {
    /// Advances every live system and particle by one frame.
    ///
    /// Systems update in creation order. Per system: follow the attachment,
    /// turn the wind, count down delays and lifetime, emit a burst if one
    /// is due, then move the particles. Systems destroyed during the frame
    /// are freed at its end together with their particles.
    pub fn update(&mut self, scene: &dyn SceneQuery) {
        self.frame = self.frame.wrapping_add(1);

        let handles = self.live_systems.clone();
        for handle in handles {
            self.update_system(handle, scene);
        }
        self.release_destroyed_systems();
    }

    fn update_system(&mut self, handle: SystemHandle, scene: &dyn SceneQuery) {
        let Some(system) = self.systems.get_mut(handle) else {
            return;
        };
        if system.is_destroyed() {
            return;
        }
        if !system.update_transform(scene) {
            debug!(id = %system.id(), "attachment lost, destroying particle system");
            system.destroy();
            return;
        }
        system.update_wind_motion(&mut self.random);

        let burst_due = system.advance_timers();
        if burst_due && !system.is_slave() {
            self.emit_burst(handle, scene);
        }

        self.update_particles(handle);

        if let Some(system) = self.systems.get_mut(handle) {
            if system.is_expired() && !system.is_destroyed() {
                system.destroy();
            }
        }
    }

    /// Emits one burst from `handle`. Each particle also feeds the system's
    /// slave with a particle at the master particle's position plus the
    /// slave offset.
    fn emit_burst(&mut self, handle: SystemHandle, scene: &dyn SceneQuery) {
        let Some(system) = self.systems.get_mut(handle) else {
            return;
        };
        let count = system.begin_burst(&mut self.random);
        let slave = system.slave();
        let slave_offset = system.info().slave_pos_offset;

        for _ in 0..count {
            let Some(system) = self.systems.get(handle) else {
                return;
            };
            let info = system.generate_particle_info(&mut self.random, scene);
            let position = info.position;
            if self.create_particle(handle, info, false).is_none() {
                trace!(?handle, "burst cut short by the particle budget");
                break;
            }

            let Some(slave) = slave else {
                continue;
            };
            let Some(slave_system) = self.systems.get(slave) else {
                continue;
            };
            if slave_system.is_stopped() {
                continue;
            }
            let mut slave_info = slave_system.generate_particle_info(&mut self.random, scene);
            slave_info.position = position + slave_offset;
            self.create_particle(slave, slave_info, false);
        }
    }

    fn update_particles(&mut self, handle: SystemHandle) {
        let Some(system) = self.systems.get(handle) else {
            return;
        };
        let gravity = Coord3D::new(0.0, 0.0, -system.info().gravity);
        let drift = system.info().drift_velocity;
        let wind = system.active_wind();
        let frame = self.frame;

        let mut cursor = system.first_particle;
        let mut dead: Vec<ParticleHandle> = Vec::new();
        let mut followers = Vec::new();
        while let Some(current) = cursor {
            let Some(particle) = self.particles.get_mut(current) else {
                break;
            };
            cursor = particle.system_next;

            particle.apply_force(gravity);
            if particle.update(frame, drift, wind) {
                if let Some(controlled) = particle.controlled_system() {
                    followers.push((controlled, particle.position()));
                }
            } else {
                dead.push(current);
            }
        }

        for (controlled, position) in followers {
            if let Some(system) = self.systems.get_mut(controlled) {
                system.set_position(position);
            }
        }
        for particle in dead {
            self.destroy_particle(particle);
        }
    }

    /// Frees every destroyed system. A freed master takes its slave down
    /// with it; that slave is freed in the same pass.
    fn release_destroyed_systems(&mut self) {
        loop {
            let next = self
                .live_systems
                .iter()
                .copied()
                .find(|h| self.systems.get(*h).map_or(true, |s| s.is_destroyed()));
            let Some(handle) = next else {
                break;
            };
            self.release_system(handle);
        }
    }

    fn release_system(&mut self, handle: SystemHandle) {
        let Some(system) = self.systems.get(handle) else {
            self.remove_particle_system(handle);
            return;
        };
        let id = system.id();
        let slave = system.slave();
        let control = system.control_particle();

        let particles: Vec<ParticleHandle> = self.particles_of(handle).map(|(h, _)| h).collect();
        for particle in particles {
            self.destroy_particle(particle);
        }

        if let Some(slave) = slave {
            self.remove_slave(handle);
            if let Some(slave) = self.systems.get_mut(slave) {
                slave.destroy();
            }
        }
        self.remove_master(handle);
        if let Some(particle) = control {
            self.detach_control_particle(particle);
        }

        self.remove_particle_system(handle);
        self.systems.free(handle);
        debug!(%id, "particle system freed");
    }
}

#[cfg(test)]
mod tests {
    use cinder_core::Matrix3D;

    use super::*;
    use crate::config::ManagerConfig;
    use crate::ids::{DrawableId, ObjectId};
    use crate::scene::EmptyScene;

    const DEFS: &str = r#"
        [[system]]
        name = "Puff"
        is_one_shot = true
        burst_count = { low = 3.0, high = 3.0, distribution = "CONSTANT" }
        lifetime = { low = 2.0, high = 2.0, distribution = "CONSTANT" }

        [[system]]
        name = "Stream"
        system_lifetime = 4
        lifetime = { low = 10.0, high = 10.0, distribution = "CONSTANT" }
        gravity = 1.0
        slave_system_name = "Trail"
        slave_pos_offset = { x = 0.0, y = 0.0, z = 5.0 }

        [[system]]
        name = "Trail"
        lifetime = { low = 10.0, high = 10.0, distribution = "CONSTANT" }
    "#;

    fn manager() -> ParticleSystemManager {
        let mut m = ParticleSystemManager::new(ManagerConfig::default()).unwrap();
        m.init(DEFS).unwrap();
        m
    }

    struct OneObject {
        at: Coord3D,
    }

    impl SceneQuery for OneObject {
        fn object_transform(&self, object: ObjectId) -> Option<Matrix3D> {
            (object == ObjectId(1)).then(|| Matrix3D::from_translation(self.at))
        }

        fn drawable_transform(&self, _drawable: DrawableId) -> Option<Matrix3D> {
            None
        }

        fn ground_height(&self, _x: f32, _y: f32) -> f32 {
            0.0
        }
    }

    #[test]
    fn test_one_shot_lifecycle() {
        let mut m = manager();
        let puff = m.create_particle_system_by_name("Puff", false).unwrap();

        m.update(&EmptyScene);
        assert_eq!(m.particle_count(), 3);
        assert!(m.system(puff).unwrap().is_stopped());

        m.update(&EmptyScene);
        // Particles of lifetime 2 die on their second update
        assert_eq!(m.particle_count(), 0);
        assert!(m.system(puff).is_none());
        assert_eq!(m.system_count(), 0);
    }

    #[test]
    fn test_stopped_forever_system_is_freed() {
        let mut m = manager();
        let trail = m.create_particle_system_by_name("Trail", false).unwrap();
        assert!(m.system(trail).unwrap().is_forever());

        m.update(&EmptyScene);
        assert_eq!(m.particle_count(), 1);
        m.system_mut(trail).unwrap().stop();

        for _ in 0..12 {
            m.update(&EmptyScene);
        }
        assert_eq!(m.particle_count(), 0);
        assert!(m.system(trail).is_none());
        assert_eq!(m.system_count(), 0);
    }

    #[test]
    fn test_slave_follows_master_emission() {
        let mut m = manager();
        let stream = m.create_particle_system_by_name("Stream", true).unwrap();
        let trail = m.system(stream).unwrap().slave().unwrap();

        m.update(&EmptyScene);
        assert_eq!(m.system(stream).unwrap().particle_count(), 1);
        assert_eq!(m.system(trail).unwrap().particle_count(), 1);

        let master_z = m.particles_of(stream).next().unwrap().1.position().z;
        let slave_z = m.particles_of(trail).next().unwrap().1.position().z;
        // Master particle already fell one frame; the slave was placed above
        // its birth point and fell nothing
        assert!((master_z - (-1.0)).abs() < 1e-5, "master at {master_z}");
        assert!((slave_z - 5.0).abs() < 1e-5, "slave at {slave_z}");
    }

    #[test]
    fn test_timed_system_expires_then_frees_slave() {
        let mut m = manager();
        let stream = m.create_particle_system_by_name("Stream", true).unwrap();
        let trail = m.system(stream).unwrap().slave().unwrap();

        for _ in 0..4 {
            m.update(&EmptyScene);
        }
        assert!(m.system(stream).unwrap().is_stopped());
        assert_eq!(m.system(stream).unwrap().particle_count(), 4);

        for _ in 0..10 {
            m.update(&EmptyScene);
        }
        assert!(m.system(stream).is_none());
        assert!(m.system(trail).is_none());
        assert_eq!(m.particle_count(), 0);
        assert_eq!(m.system_count(), 0);
    }

    #[test]
    fn test_lost_attachment_destroys() {
        let mut m = manager();
        let trail = m.create_particle_system_by_name("Trail", false).unwrap();
        m.system_mut(trail).unwrap().attach_to_object(ObjectId(1));

        let scene = OneObject { at: Coord3D::new(3.0, 4.0, 0.0) };
        m.update(&scene);
        assert_eq!(m.system(trail).unwrap().position(), Coord3D::new(3.0, 4.0, 0.0));

        m.update(&EmptyScene);
        assert!(m.system(trail).is_none());
    }

    #[test]
    fn test_control_particle_moves_system() {
        let mut m = manager();
        let trail = m.create_particle_system_by_name("Trail", false).unwrap();
        let follower = m.create_particle_system_by_name("Trail", false).unwrap();

        let mut info = crate::info::ParticleInfo { lifetime: 50, ..Default::default() };
        info.velocity = Coord3D::new(1.0, 0.0, 0.0);
        let particle = m.create_particle(trail, info, true).unwrap();
        assert!(m.attach_control_particle(particle, follower));

        m.update(&EmptyScene);
        let at = m.particle(particle).unwrap().position();
        assert_eq!(m.system(follower).unwrap().position(), at);
    }

    #[test]
    fn test_destroyed_master_releases_links() {
        let mut m = manager();
        let stream = m.create_particle_system_by_name("Stream", true).unwrap();
        let id = m.system(stream).unwrap().id();
        m.destroy_particle_system_by_id(id);
        m.update(&EmptyScene);
        assert_eq!(m.system_count(), 0);
        assert_eq!(m.find_particle_system(id), None);
    }
}
