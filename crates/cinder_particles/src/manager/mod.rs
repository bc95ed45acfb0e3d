//! # Particle System Manager
//!
//! Owns every template, system and particle of a game session.
//!
//! ## Ownership
//!
//! Systems and particles live in fixed-size slot pools and refer to each
//! other through generational handles:
//!
//! ```text
//! live_systems: [S1, S2, S3]          (creation order)
//!
//! S1 ── first/last ──▶ P1 ⇄ P2 ⇄ P4   (system list, oldest first)
//!
//! priority bucket CONSTANT:  P1 ⇄ P4  (priority list, oldest first)
//! priority bucket CRITICAL:  P2
//! ```
//!
//! Every particle is in its system's list and in exactly one priority
//! bucket. Eviction pops the head of the lowest non-empty bucket.

mod lists;
mod snapshot;
mod update;

use std::collections::HashMap;
use std::path::Path;

use cinder_core::{ChaChaRandom, RandomStream, SlotPool};
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::definitions::parse_definitions;
use crate::error::{ParticleError, ParticleResult};
use crate::ids::{ObjectId, ParticleHandle, ParticleSystemId, SystemHandle};
use crate::particle::Particle;
use crate::priority::NUM_PARTICLE_PRIORITIES;
use crate::system::ParticleSystem;
use crate::template::{ParticleSystemTemplate, TemplateId};

/// Deepest master/slave chain created for one system.
pub const MAX_SLAVE_CHAIN_DEPTH: usize = 8;

/// ID handed out after `last`. Wraps past `u32::MAX` to 1, since zero is
/// the reserved `NONE`.
const fn id_after(last: u32) -> u32 {
    match last.checked_add(1) {
        Some(next) => next,
        None => 1,
    }
}

/// Owner of all particle state.
pub struct ParticleSystemManager {
    config: ManagerConfig,

    templates: Vec<ParticleSystemTemplate>,
    template_index: HashMap<String, TemplateId>,

    systems: SlotPool<ParticleSystem>,
    /// Live systems in creation order.
    live_systems: Vec<SystemHandle>,
    particles: SlotPool<Particle>,
    priority_heads: [Option<ParticleHandle>; NUM_PARTICLE_PRIORITIES],
    priority_tails: [Option<ParticleHandle>; NUM_PARTICLE_PRIORITIES],

    /// Last ID handed out. Zero is never assigned.
    unique_system_id: u32,
    next_particle_id: u32,
    particle_count: usize,
    field_particle_count: usize,
    frame: u32,

    random: ChaChaRandom,
}

impl ParticleSystemManager {
    /// Creates an empty manager.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::InvalidConfig`] if the limits don't fit the
    /// pools.
    pub fn new(config: ManagerConfig) -> ParticleResult<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: ManagerConfig) -> Self {
        info!(
            max_particles = config.max_particle_count,
            max_field_particles = config.max_field_particle_count,
            min_priority = %config.min_dynamic_priority,
            "particle system manager created"
        );
        Self {
            systems: SlotPool::new(config.system_pool_size),
            particles: SlotPool::new(config.particle_pool_size),
            random: ChaChaRandom::new(config.client_seed, RandomStream::Client),
            templates: Vec::new(),
            template_index: HashMap::new(),
            live_systems: Vec::new(),
            priority_heads: [None; NUM_PARTICLE_PRIORITIES],
            priority_tails: [None; NUM_PARTICLE_PRIORITIES],
            unique_system_id: 0,
            next_particle_id: 0,
            particle_count: 0,
            field_particle_count: 0,
            frame: 0,
            config,
        }
    }

    /// Registers the effects of a definition document.
    ///
    /// Definitions whose name is already registered update that template.
    /// Returns the number of definitions read.
    ///
    /// # Errors
    ///
    /// Returns a definition error; no template is touched in that case.
    pub fn init(&mut self, definitions: &str) -> ParticleResult<usize> {
        let definitions = parse_definitions(definitions)?;
        let count = definitions.len();
        for def in definitions {
            let id = self.new_template(&def.name);
            if let Some(template) = self.templates.get_mut(id.index()) {
                *template.info_mut() = def.info;
            }
        }
        info!(definitions = count, templates = self.templates.len(), "particle definitions loaded");
        Ok(count)
    }

    /// Reads a definition file and registers its effects.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::Definitions`] if the file cannot be read,
    /// or any error of [`ParticleSystemManager::init`].
    pub fn init_from_file(&mut self, path: impl AsRef<Path>) -> ParticleResult<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ParticleError::Definitions(format!("{}: {e}", path.display())))?;
        self.init(&text)
    }

    /// Destroys every system and particle and clears all counters.
    ///
    /// Templates, the frame clock and the random stream are kept.
    pub fn reset(&mut self) {
        self.systems.clear();
        self.particles.clear();
        self.live_systems.clear();
        self.priority_heads = [None; NUM_PARTICLE_PRIORITIES];
        self.priority_tails = [None; NUM_PARTICLE_PRIORITIES];
        self.unique_system_id = 0;
        self.next_particle_id = 0;
        self.particle_count = 0;
        self.field_particle_count = 0;
        debug!("particle system manager reset");
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Looks a template up by name.
    #[must_use]
    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.template_index.get(name).copied()
    }

    /// Returns the template named `name`, creating it with default
    /// parameters first if needed.
    pub fn new_template(&mut self, name: &str) -> TemplateId {
        if let Some(id) = self.template_index.get(name) {
            return *id;
        }
        let id = TemplateId(self.templates.len() as u32);
        self.templates.push(ParticleSystemTemplate::new(name));
        self.template_index.insert(name.to_string(), id);
        id
    }

    /// Returns the `parent_index`-th template, in registration order, whose
    /// slave is the template named `name`.
    ///
    /// Empty names and out-of-range indices miss.
    #[must_use]
    pub fn find_parent_template(&self, name: &str, parent_index: usize) -> Option<TemplateId> {
        if name.is_empty() {
            return None;
        }
        self.templates()
            .filter(|(_, t)| t.info().slave_system_name == name)
            .nth(parent_index)
            .map(|(id, _)| id)
    }

    /// Template by ID.
    #[must_use]
    pub fn template(&self, id: TemplateId) -> Option<&ParticleSystemTemplate> {
        self.templates.get(id.index())
    }

    /// Mutable template by ID.
    pub fn template_mut(&mut self, id: TemplateId) -> Option<&mut ParticleSystemTemplate> {
        self.templates.get_mut(id.index())
    }

    /// All templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = (TemplateId, &ParticleSystemTemplate)> {
        self.templates.iter().enumerate().map(|(i, t)| (TemplateId(i as u32), t))
    }

    /// Number of registered templates.
    #[inline]
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Creates a system from a template.
    ///
    /// Returns `None` for a missing template or a full system pool; no
    /// state changes in that case. With `create_slaves`, the template's
    /// slave chain is created and linked as well.
    pub fn create_particle_system(
        &mut self,
        template: Option<TemplateId>,
        create_slaves: bool,
    ) -> Option<SystemHandle> {
        self.create_system_chain(template?, create_slaves, 0)
    }

    /// Creates a system from the template named `name`.
    pub fn create_particle_system_by_name(
        &mut self,
        name: &str,
        create_slaves: bool,
    ) -> Option<SystemHandle> {
        self.create_particle_system(self.find_template(name), create_slaves)
    }

    /// Creates a system from `template`'s slave template, if it has one.
    pub fn create_slave_system(
        &mut self,
        template: TemplateId,
        create_slaves: bool,
    ) -> Option<SystemHandle> {
        self.create_slave_chain(template, create_slaves, 1)
    }

    fn create_slave_chain(
        &mut self,
        template: TemplateId,
        create_slaves: bool,
        depth: usize,
    ) -> Option<SystemHandle> {
        let index = &self.template_index;
        let slave = self
            .templates
            .get(template.index())?
            .slave_template(|name| index.get(name).copied())?;
        self.create_system_chain(slave, create_slaves, depth)
    }

    fn create_system_chain(
        &mut self,
        template: TemplateId,
        create_slaves: bool,
        depth: usize,
    ) -> Option<SystemHandle> {
        let source = self.templates.get(template.index())?;
        if self.systems.free_count() == 0 {
            warn!(template = source.name(), "particle system pool exhausted");
            return None;
        }

        self.unique_system_id = id_after(self.unique_system_id);
        let id = ParticleSystemId(self.unique_system_id);
        let has_slave = !source.info().slave_system_name.is_empty();
        let system =
            ParticleSystem::new(template, source.info().clone(), id, self.frame, &mut self.random);
        let handle = self.systems.allocate(system)?;
        debug!(%id, template = source.name(), "particle system created");
        self.add_particle_system(handle);

        if create_slaves && has_slave {
            if depth + 1 >= MAX_SLAVE_CHAIN_DEPTH {
                warn!(%id, depth, "slave chain too deep, not creating more slaves");
            } else if let Some(slave) = self.create_slave_chain(template, create_slaves, depth + 1) {
                self.link_master_slave(handle, slave);
            }
        }
        Some(handle)
    }

    /// Finds a live system by ID. Linear in the number of live systems.
    #[must_use]
    pub fn find_particle_system(&self, id: ParticleSystemId) -> Option<SystemHandle> {
        if id.is_none() {
            return None;
        }
        self.live_systems
            .iter()
            .copied()
            .find(|h| self.systems.get(*h).is_some_and(|s| s.id() == id))
    }

    /// Requests destruction of the system with `id`.
    pub fn destroy_particle_system_by_id(&mut self, id: ParticleSystemId) {
        if let Some(handle) = self.find_particle_system(id) {
            if let Some(system) = self.systems.get_mut(handle) {
                system.destroy();
            }
        }
    }

    /// Requests destruction of every system following `object`.
    pub fn destroy_attached_systems(&mut self, object: ObjectId) {
        if !object.is_valid() {
            return;
        }
        for handle in &self.live_systems {
            if let Some(system) = self.systems.get_mut(*handle) {
                if system.attached_object() == object {
                    system.destroy();
                }
            }
        }
    }

    /// System behind a handle, if it is still live.
    #[must_use]
    pub fn system(&self, handle: SystemHandle) -> Option<&ParticleSystem> {
        self.systems.get(handle)
    }

    /// Mutable system behind a handle.
    pub fn system_mut(&mut self, handle: SystemHandle) -> Option<&mut ParticleSystem> {
        self.systems.get_mut(handle)
    }

    /// Live systems in creation order, including ones pending destruction.
    pub fn live_systems(&self) -> impl Iterator<Item = SystemHandle> + '_ {
        self.live_systems.iter().copied()
    }

    /// Number of live systems.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.live_systems.len()
    }

    // =========================================================================
    // Particles
    // =========================================================================

    /// Particle behind a handle, if it is still alive.
    #[must_use]
    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.particles.get(handle)
    }

    /// Particles of a system, oldest first.
    pub fn particles_of(
        &self,
        system: SystemHandle,
    ) -> impl Iterator<Item = (ParticleHandle, &Particle)> + '_ {
        let mut cursor = self.systems.get(system).and_then(|s| s.first_particle);
        std::iter::from_fn(move || {
            let handle = cursor?;
            let particle = self.particles.get(handle)?;
            cursor = particle.system_next;
            Some((handle, particle))
        })
    }

    /// Live particles.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Live particles counting against the field budget.
    #[inline]
    #[must_use]
    pub const fn field_particle_count(&self) -> usize {
        self.field_particle_count
    }

    // =========================================================================
    // Misc
    // =========================================================================

    /// Current frame. Particle ages are measured against it.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u32 {
        self.frame
    }

    /// Moves the frame clock, e.g. to the game frame a snapshot was taken at.
    pub fn set_frame(&mut self, frame: u32) {
        self.frame = frame;
    }

    /// Settings the manager was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

impl Default for ParticleSystemManager {
    fn default() -> Self {
        Self::with_valid_config(ManagerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &str = r#"
        [[system]]
        name = "Fire"
        slave_system_name = "Smoke"

        [[system]]
        name = "Smoke"
        priority = "CONSTANT"
    "#;

    fn manager() -> ParticleSystemManager {
        let mut m = ParticleSystemManager::default();
        m.init(DEFS).unwrap();
        m
    }

    #[test]
    fn test_new_template_is_idempotent() {
        let mut m = ParticleSystemManager::default();
        let a = m.new_template("Spark");
        let b = m.new_template("Spark");
        assert_eq!(a, b);
        assert_eq!(m.template_count(), 1);
        assert_eq!(m.find_template("Spark"), Some(a));
        assert_eq!(m.find_template("Nope"), None);
    }

    #[test]
    fn test_find_parent_template() {
        let m = manager();
        assert_eq!(m.find_parent_template("Smoke", 0), m.find_template("Fire"));
        assert_eq!(m.find_parent_template("Smoke", 1), None);
        assert_eq!(m.find_parent_template("Fire", 0), None);
        assert_eq!(m.find_parent_template("", 0), None);
    }

    #[test]
    fn test_create_missing_template() {
        let mut m = manager();
        assert!(m.create_particle_system(m.find_template("Nope"), true).is_none());
        assert_eq!(m.system_count(), 0);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut m = manager();
        let smoke = m.find_template("Smoke");
        let a = m.create_particle_system(smoke, false).unwrap();
        let b = m.create_particle_system(smoke, false).unwrap();
        let (ia, ib) = (m.system(a).unwrap().id(), m.system(b).unwrap().id());
        assert_eq!(ia, ParticleSystemId(1));
        assert_eq!(ib, ParticleSystemId(2));
        assert_eq!(m.find_particle_system(ib), Some(b));
        assert_eq!(m.find_particle_system(ParticleSystemId::NONE), None);
    }

    #[test]
    fn test_id_counters_wrap_past_none() {
        let mut m = manager();
        m.unique_system_id = u32::MAX;
        m.next_particle_id = u32::MAX;

        let smoke = m.create_particle_system_by_name("Smoke", false).unwrap();
        assert_eq!(m.system(smoke).unwrap().id(), ParticleSystemId(1));

        let info = crate::info::ParticleInfo::default();
        let particle = m.create_particle(smoke, info, true).unwrap();
        assert_eq!(m.particle(particle).unwrap().id(), crate::ids::ParticleId(1));
    }

    #[test]
    fn test_create_with_slaves_links_both_sides() {
        let mut m = manager();
        let fire = m.create_particle_system_by_name("Fire", true).unwrap();
        assert_eq!(m.system_count(), 2);

        let slave = m.system(fire).unwrap().slave().unwrap();
        let smoke = m.system(slave).unwrap();
        assert_eq!(smoke.master(), Some(fire));
        assert_eq!(smoke.master_id(), m.system(fire).unwrap().id());
        assert_eq!(m.system(fire).unwrap().slave_id(), smoke.id());
    }

    #[test]
    fn test_self_slaving_chain_is_bounded() {
        let mut m = ParticleSystemManager::default();
        m.init("[[system]]\nname = \"Loop\"\nslave_system_name = \"Loop\"\n").unwrap();
        m.create_particle_system_by_name("Loop", true).unwrap();
        assert_eq!(m.system_count(), MAX_SLAVE_CHAIN_DEPTH);
    }

    #[test]
    fn test_destroy_attached_systems() {
        let mut m = manager();
        let a = m.create_particle_system_by_name("Smoke", false).unwrap();
        let b = m.create_particle_system_by_name("Smoke", false).unwrap();
        m.system_mut(a).unwrap().attach_to_object(ObjectId(4));
        m.destroy_attached_systems(ObjectId(4));
        assert!(m.system(a).unwrap().is_destroyed());
        assert!(!m.system(b).unwrap().is_destroyed());
    }

    #[test]
    fn test_reset_keeps_templates() {
        let mut m = manager();
        m.create_particle_system_by_name("Fire", true).unwrap();
        m.reset();
        assert_eq!(m.system_count(), 0);
        assert_eq!(m.particle_count(), 0);
        assert_eq!(m.template_count(), 2);
        let again = m.create_particle_system_by_name("Smoke", false).unwrap();
        assert_eq!(m.system(again).unwrap().id(), ParticleSystemId(1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ManagerConfig { particle_pool_size: 0, ..ManagerConfig::default() };
        assert!(ParticleSystemManager::new(config).is_err());
    }
}
