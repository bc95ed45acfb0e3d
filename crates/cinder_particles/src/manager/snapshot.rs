//! Manager snapshots.
//!
//! Wire layout, version 1:
//!
//! ```text
//! u8   version
//! u32  unique system ID counter
//! u32  entry count (every live system, saved or not)
//! per entry:
//!   str  template name, empty for a system that is not saved
//!   ...  system snapshot           (non-empty name only)
//!   u32  particle count            (non-empty name only)
//!   ...  particle snapshots, oldest first
//! ```
//!
//! Links to systems that are not part of the snapshot are written as
//! [`ParticleSystemId::NONE`].

use std::collections::HashSet;

use cinder_xfer::{
    Snapshot, Xfer, XferCrc, XferError, XferLoad, XferResult, XferSave, XferVersion,
};
use tracing::{debug, error, info};

use super::ParticleSystemManager;
use crate::error::ParticleResult;
use crate::fixup::{ParticleFixup, SystemDirectory, SystemFixup};
use crate::ids::{ParticleHandle, ParticleSystemId, SystemHandle};
use crate::info::ParticleInfo;
use crate::particle::ControlLink;

const CURRENT_VERSION: XferVersion = 1;

impl ParticleSystemManager {
    /// Serializes every saveable live system and its particles.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ParticleError::Xfer`] if a field cannot be written,
    /// e.g. a string longer than 255 bytes.
    pub fn save_snapshot(&mut self) -> ParticleResult<Vec<u8>> {
        let mut save = XferSave::new();
        self.xfer_snapshot(&mut save)?;
        debug!(bytes = save.len(), systems = self.live_systems.len(), "particle snapshot saved");
        Ok(save.into_bytes())
    }

    /// Replaces all systems and particles with the content of `bytes`.
    ///
    /// Links are resolved once everything is loaded. On failure the manager
    /// is reset, so no partially rebuilt graph is left running.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ParticleError::Xfer`] for malformed data, a template
    /// this build does not define or a link that names no loaded system.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> ParticleResult<()> {
        let mut load = XferLoad::new(bytes);
        let result = self.xfer_snapshot(&mut load).and_then(|()| self.load_post_process(&mut ()));
        if let Err(err) = result {
            error!(code = err.code(), error = %err, "particle snapshot load failed");
            self.reset();
            return Err(err.into());
        }
        info!(
            systems = self.live_systems.len(),
            particles = self.particle_count,
            "particle snapshot loaded"
        );
        Ok(())
    }

    /// Checksum of the bytes [`ParticleSystemManager::save_snapshot`] would
    /// produce.
    ///
    /// # Errors
    ///
    /// Fails where saving would.
    pub fn crc(&mut self) -> XferResult<u32> {
        let mut crc = XferCrc::new();
        self.crc_snapshot(&mut crc)?;
        Ok(crc.crc())
    }

    fn save_systems(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let saved: HashSet<ParticleSystemId> = self
            .live_systems
            .iter()
            .filter_map(|h| self.systems.get(*h))
            .filter(|s| !s.is_destroyed() && s.is_saveable())
            .map(|s| s.id())
            .collect();

        let mut count = self.live_systems.len() as u32;
        xfer.xfer_u32(&mut count)?;

        for handle in self.live_systems.clone() {
            let Some(system) = self.systems.get_mut(handle) else {
                xfer.xfer_string(&mut String::new())?;
                continue;
            };
            if !saved.contains(&system.id()) {
                xfer.xfer_string(&mut String::new())?;
                continue;
            }

            let mut name = self
                .templates
                .get(system.template().index())
                .map(|t| t.name().to_string())
                .unwrap_or_default();
            xfer.xfer_string(&mut name)?;

            let (slave, slave_id) = (system.slave(), system.slave_id());
            let (master, master_id) = (system.master(), system.master_id());
            if !saved.contains(&slave_id) {
                system.set_slave_link(None, ParticleSystemId::NONE);
            }
            if !saved.contains(&master_id) {
                system.set_master_link(None, ParticleSystemId::NONE);
            }
            let result = system.xfer_snapshot(xfer);
            system.set_slave_link(slave, slave_id);
            system.set_master_link(master, master_id);
            result?;

            self.save_particles(xfer, handle, &saved)?;
        }
        Ok(())
    }

    fn save_particles(
        &mut self,
        xfer: &mut dyn Xfer,
        system: SystemHandle,
        saved: &HashSet<ParticleSystemId>,
    ) -> XferResult<()> {
        let handles: Vec<ParticleHandle> = self.particles_of(system).map(|(h, _)| h).collect();
        let mut count = handles.len() as u32;
        xfer.xfer_u32(&mut count)?;

        for handle in handles {
            let Some(particle) = self.particles.get_mut(handle) else {
                continue;
            };
            let control = particle.control();
            if !control.id().is_none() && !saved.contains(&control.id()) {
                particle.set_control(ControlLink::None);
            }
            let result = particle.xfer_snapshot(xfer);
            particle.set_control(control);
            result?;
        }
        Ok(())
    }

    fn load_systems(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut count = 0u32;
        xfer.xfer_u32(&mut count)?;

        let mut last_particle_id = 0;
        for _ in 0..count {
            let mut name = String::new();
            xfer.xfer_string(&mut name)?;
            if name.is_empty() {
                continue;
            }

            let template =
                self.find_template(&name).ok_or_else(|| XferError::MissingTemplate(name.clone()))?;
            let handle = self
                .create_system_chain(template, false, 0)
                .ok_or(XferError::PoolExhausted { kind: "particle system" })?;
            self.systems
                .get_mut(handle)
                .ok_or(XferError::PoolExhausted { kind: "particle system" })?
                .xfer_snapshot(xfer)?;

            let mut particle_count = 0u32;
            xfer.xfer_u32(&mut particle_count)?;
            for _ in 0..particle_count {
                let particle = self
                    .spawn_particle(handle, ParticleInfo::default(), true, false)
                    .and_then(|h| self.particles.get_mut(h))
                    .ok_or(XferError::PoolExhausted { kind: "particle" })?;
                particle.xfer_snapshot(xfer)?;
                last_particle_id = last_particle_id.max(particle.id().0);
            }
        }
        self.next_particle_id = self.next_particle_id.max(last_particle_id);
        Ok(())
    }
}

impl Snapshot for ParticleSystemManager {
    fn xfer_snapshot(&mut self, xfer: &mut dyn Xfer) -> XferResult<()> {
        let mut version = CURRENT_VERSION;
        xfer.xfer_version(&mut version, CURRENT_VERSION)?;

        if xfer.is_loading() {
            self.reset();
        }
        let mut unique_system_id = self.unique_system_id;
        xfer.xfer_u32(&mut unique_system_id)?;

        if xfer.is_loading() {
            self.load_systems(xfer)?;
            self.unique_system_id = self.unique_system_id.max(unique_system_id);
            Ok(())
        } else {
            self.save_systems(xfer)
        }
    }

    /// Swaps the stored system IDs of every system and particle for live
    /// handles.
    fn load_post_process(&mut self, _fixup: &mut ()) -> XferResult<()> {
        let directory = SystemDirectory::new(
            self.live_systems
                .iter()
                .filter_map(|h| self.systems.get(*h).map(|s| (s.id(), *h))),
        );

        let mut system_fixup = SystemFixup { directory: &directory };
        for handle in &self.live_systems {
            if let Some(system) = self.systems.get_mut(*handle) {
                system.load_post_process(&mut system_fixup)?;
            }
        }

        let particles: Vec<ParticleHandle> = self.particles.iter().map(|(h, _)| h).collect();
        for handle in particles {
            let Some(particle) = self.particles.get_mut(handle) else {
                continue;
            };
            let mut fixup =
                ParticleFixup { systems: &mut self.systems, directory: &directory, particle: handle };
            particle.load_post_process(&mut fixup)?;
        }
        Ok(())
    }
}
