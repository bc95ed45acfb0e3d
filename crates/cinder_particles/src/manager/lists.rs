//! Particle bookkeeping: intrusive lists, budgets, eviction and links.

use tracing::{trace, warn};

use super::{id_after, ParticleSystemManager};
use crate::ids::{ParticleHandle, ParticleId, ParticleSystemId, SystemHandle};
use crate::info::ParticleInfo;
use crate::particle::{ControlLink, Particle};
use crate::priority::ParticlePriority;
use crate::system::ParticleSystem;

impl ParticleSystemManager {
    // =========================================================================
    // Priority buckets
    // =========================================================================

    /// Appends a particle to the tail of its priority bucket.
    ///
    /// No-op if it is already in a bucket.
    pub fn add_particle(&mut self, handle: ParticleHandle) {
        let Some(particle) = self.particles.get_mut(handle) else {
            return;
        };
        if particle.in_priority_list {
            return;
        }
        let bucket = particle.priority().index();
        let tail = self.priority_tails[bucket];
        particle.priority_prev = tail;
        particle.priority_next = None;
        particle.in_priority_list = true;
        let is_field = particle.is_field();

        match tail.and_then(|t| self.particles.get_mut(t)) {
            Some(prev) => prev.priority_next = Some(handle),
            None => self.priority_heads[bucket] = Some(handle),
        }
        self.priority_tails[bucket] = Some(handle);

        self.particle_count += 1;
        if is_field {
            self.field_particle_count += 1;
        }
    }

    /// Unlinks a particle from its priority bucket.
    ///
    /// No-op if it is not in a bucket.
    pub fn remove_particle(&mut self, handle: ParticleHandle) {
        let Some(particle) = self.particles.get_mut(handle) else {
            return;
        };
        if !particle.in_priority_list {
            return;
        }
        let bucket = particle.priority().index();
        let (prev, next) = (particle.priority_prev.take(), particle.priority_next.take());
        particle.in_priority_list = false;
        let is_field = particle.is_field();

        match prev.and_then(|p| self.particles.get_mut(p)) {
            Some(p) => p.priority_next = next,
            None => self.priority_heads[bucket] = next,
        }
        match next.and_then(|n| self.particles.get_mut(n)) {
            Some(n) => n.priority_prev = prev,
            None => self.priority_tails[bucket] = prev,
        }

        self.particle_count -= 1;
        if is_field {
            self.field_particle_count -= 1;
        }
    }

    /// Particles of one bucket, oldest first.
    pub fn priority_bucket(
        &self,
        priority: ParticlePriority,
    ) -> impl Iterator<Item = ParticleHandle> + '_ {
        let mut cursor = self.priority_heads[priority.index()];
        std::iter::from_fn(move || {
            let handle = cursor?;
            cursor = self.particles.get(handle)?.priority_next;
            Some(handle)
        })
    }

    /// Evicts up to `count` particles, oldest first, from the buckets
    /// strictly below `priority_cap`, lowest bucket first.
    ///
    /// Returns how many were actually removed.
    pub fn remove_oldest_particles(&mut self, count: usize, priority_cap: ParticlePriority) -> usize {
        let mut removed = 0;
        while removed < count {
            let victim = (ParticlePriority::LOWEST.index()..priority_cap.index())
                .find_map(|bucket| self.priority_heads[bucket]);
            let Some(victim) = victim else {
                break;
            };
            self.destroy_particle(victim);
            removed += 1;
        }
        if removed > 0 {
            trace!(removed, cap = %priority_cap, "evicted particles");
        }
        removed
    }

    // =========================================================================
    // System particle lists
    // =========================================================================

    fn link_into_system(&mut self, system: SystemHandle, handle: ParticleHandle) {
        let Some(owner) = self.systems.get_mut(system) else {
            return;
        };
        let tail = owner.last_particle;
        owner.last_particle = Some(handle);
        if owner.first_particle.is_none() {
            owner.first_particle = Some(handle);
        }
        owner.particle_count += 1;

        if let Some(prev) = tail.and_then(|t| self.particles.get_mut(t)) {
            prev.system_next = Some(handle);
        }
        if let Some(particle) = self.particles.get_mut(handle) {
            particle.system_prev = tail;
            particle.system_next = None;
            particle.in_system_list = true;
        }
    }

    fn unlink_from_system(&mut self, handle: ParticleHandle) {
        let Some(particle) = self.particles.get_mut(handle) else {
            return;
        };
        if !particle.in_system_list {
            return;
        }
        let system = particle.system();
        let (prev, next) = (particle.system_prev.take(), particle.system_next.take());
        particle.in_system_list = false;

        if let Some(p) = prev.and_then(|p| self.particles.get_mut(p)) {
            p.system_next = next;
        }
        if let Some(n) = next.and_then(|n| self.particles.get_mut(n)) {
            n.system_prev = prev;
        }
        if let Some(owner) = self.systems.get_mut(system) {
            if prev.is_none() {
                owner.first_particle = next;
            }
            if next.is_none() {
                owner.last_particle = prev;
            }
            owner.particle_count -= 1;
        }
    }

    // =========================================================================
    // Creation and destruction
    // =========================================================================

    /// Creates a particle in `system`.
    ///
    /// Unless `force` is set the particle must fit the budgets: it is refused
    /// below the minimum dynamic priority, refused when a field particle
    /// would exceed the field cap, and when the particle cap is reached
    /// older particles of strictly lower priority are evicted to make room.
    /// If the system's template attaches a system to each particle, that
    /// system is created and controlled by the new particle.
    pub fn create_particle(
        &mut self,
        system: SystemHandle,
        info: ParticleInfo,
        force: bool,
    ) -> Option<ParticleHandle> {
        self.spawn_particle(system, info, force, true)
    }

    /// [`ParticleSystemManager::create_particle`], optionally without the
    /// attached system. Loading restores control links from the snapshot.
    pub(super) fn spawn_particle(
        &mut self,
        system: SystemHandle,
        info: ParticleInfo,
        force: bool,
        with_attached: bool,
    ) -> Option<ParticleHandle> {
        let owner = self.systems.get(system)?;
        if owner.is_destroyed() {
            return None;
        }
        let priority = owner.priority();
        let is_field = owner.info().is_field();
        let attached = owner.info().attached_system_name.clone();

        if !force {
            if priority < self.config.min_dynamic_priority {
                return None;
            }
            if is_field && self.field_particle_count >= self.config.max_field_particle_count {
                return None;
            }
            if self.particle_count >= self.config.max_particle_count {
                let excess = self.particle_count + 1 - self.config.max_particle_count;
                if self.remove_oldest_particles(excess, priority) < excess {
                    return None;
                }
            }
        }

        // Eviction may have torn the owner down with a controlling particle
        if self.systems.get(system).map_or(true, |s| s.is_destroyed()) {
            return None;
        }

        let id = ParticleId(id_after(self.next_particle_id));
        let particle = Particle::new(info, id, system, priority, is_field, self.frame);
        let Some(handle) = self.particles.allocate(particle) else {
            warn!(system = ?system, "particle pool exhausted");
            return None;
        };
        self.next_particle_id = id.0;
        self.link_into_system(system, handle);
        self.add_particle(handle);

        if with_attached && !attached.is_empty() {
            let template = self.find_template(&attached);
            if let Some(controlled) = self.create_particle_system(template, true) {
                self.attach_control_particle(handle, controlled);
            }
        }
        Some(handle)
    }

    /// Removes a particle from every list and frees it.
    ///
    /// A system the particle controlled is destroyed with it.
    pub fn destroy_particle(&mut self, handle: ParticleHandle) -> bool {
        let Some(particle) = self.particles.get(handle) else {
            return false;
        };
        let control = particle.control();

        self.remove_particle(handle);
        self.unlink_from_system(handle);
        if let Some(controlled) = control.system().and_then(|s| self.systems.get_mut(s)) {
            if controlled.control_particle() == Some(handle) {
                controlled.set_control_particle(None);
            }
            controlled.destroy();
        }
        self.particles.free(handle).is_some()
    }

    // =========================================================================
    // System registry
    // =========================================================================

    /// Appends a system to the live list. No-op if already present.
    pub fn add_particle_system(&mut self, handle: SystemHandle) {
        if !self.live_systems.contains(&handle) {
            self.live_systems.push(handle);
        }
    }

    /// Removes a system from the live list. No-op if absent.
    pub fn remove_particle_system(&mut self, handle: SystemHandle) {
        if let Some(pos) = self.live_systems.iter().position(|h| *h == handle) {
            self.live_systems.remove(pos);
        }
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Makes `slave` the slave of `master`, replacing either side's previous
    /// partner. Returns `false` if either handle is stale, they are equal, or
    /// `slave` already feeds `master` through its chain of slaves.
    pub fn link_master_slave(&mut self, master: SystemHandle, slave: SystemHandle) -> bool {
        if master == slave
            || !self.systems.contains(master)
            || !self.systems.contains(slave)
            || self.is_upstream(slave, master)
        {
            warn!(?master, ?slave, "refusing master/slave link");
            return false;
        }
        self.remove_slave(master);
        self.remove_master(slave);

        let Some((m, s)) = self.systems.get_pair_mut(master, slave) else {
            return false;
        };
        m.set_slave_link(Some(slave), s.id());
        s.set_master_link(Some(master), m.id());
        true
    }

    /// True when `ancestor` is reached by walking masters up from `system`.
    fn is_upstream(&self, ancestor: SystemHandle, system: SystemHandle) -> bool {
        let mut current = self.systems.get(system).and_then(ParticleSystem::master);
        // At most one step per live system
        for _ in 0..self.live_systems.len() {
            let Some(handle) = current else {
                return false;
            };
            if handle == ancestor {
                return true;
            }
            current = self.systems.get(handle).and_then(ParticleSystem::master);
        }
        false
    }

    /// Clears a system's master link, and the master's slave link to it.
    pub fn remove_master(&mut self, system: SystemHandle) {
        let Some(this) = self.systems.get_mut(system) else {
            return;
        };
        let master = this.master();
        this.set_master_link(None, ParticleSystemId::NONE);

        if let Some(other) = master.and_then(|m| self.systems.get_mut(m)) {
            if other.slave() == Some(system) {
                other.set_slave_link(None, ParticleSystemId::NONE);
            }
        }
    }

    /// Clears a system's slave link, and the slave's master link to it.
    pub fn remove_slave(&mut self, system: SystemHandle) {
        let Some(this) = self.systems.get_mut(system) else {
            return;
        };
        let slave = this.slave();
        this.set_slave_link(None, ParticleSystemId::NONE);

        if let Some(other) = slave.and_then(|s| self.systems.get_mut(s)) {
            if other.master() == Some(system) {
                other.set_master_link(None, ParticleSystemId::NONE);
            }
        }
    }

    /// Makes `particle` drive `system`'s position. Previous control links of
    /// either side are cleared.
    pub fn attach_control_particle(&mut self, particle: ParticleHandle, system: SystemHandle) -> bool {
        if !self.particles.contains(particle) || !self.systems.contains(system) {
            return false;
        }
        self.detach_control_particle(particle);
        if let Some(previous) = self.systems.get(system).and_then(|s| s.control_particle()) {
            if let Some(p) = self.particles.get_mut(previous) {
                p.set_control(ControlLink::None);
            }
        }

        let Some(controlled) = self.systems.get_mut(system) else {
            return false;
        };
        controlled.set_control_particle(Some(particle));
        let id = controlled.id();
        if let Some(p) = self.particles.get_mut(particle) {
            p.set_control(ControlLink::Bound { id, system });
        }
        true
    }

    /// Releases the system `particle` controls, if any. The system keeps
    /// running where it is.
    pub fn detach_control_particle(&mut self, particle: ParticleHandle) {
        let Some(p) = self.particles.get_mut(particle) else {
            return;
        };
        let control = p.control();
        p.set_control(ControlLink::None);
        if let Some(system) = control.system().and_then(|s| self.systems.get_mut(s)) {
            if system.control_particle() == Some(particle) {
                system.set_control_particle(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerConfig;

    const DEFS: &str = r#"
        [[system]]
        name = "Low"
        priority = "WEAPON_EXPLOSION"

        [[system]]
        name = "Mid"
        priority = "CONSTANT"

        [[system]]
        name = "High"
        priority = "CRITICAL"

        [[system]]
        name = "Field"
        priority = "AREA_EFFECT"
        is_ground_aligned = true

        [[system]]
        name = "Rocket"
        priority = "WEAPON_TRAIL"
        attached_system_name = "Mid"
    "#;

    fn manager(max: usize) -> ParticleSystemManager {
        let config = ManagerConfig {
            max_particle_count: max,
            max_field_particle_count: 2.min(max),
            ..ManagerConfig::default()
        };
        let mut m = ParticleSystemManager::new(config).unwrap();
        m.init(DEFS).unwrap();
        m
    }

    fn info() -> ParticleInfo {
        ParticleInfo { lifetime: 100, ..ParticleInfo::default() }
    }

    fn spawn(m: &mut ParticleSystemManager, name: &str, n: usize) -> (SystemHandle, Vec<ParticleHandle>) {
        let system = m.create_particle_system_by_name(name, false).unwrap();
        let particles = (0..n).filter_map(|_| m.create_particle(system, info(), false)).collect();
        (system, particles)
    }

    #[test]
    fn test_counts_track_lists() {
        let mut m = manager(100);
        let (system, particles) = spawn(&mut m, "Mid", 3);
        assert_eq!(m.particle_count(), 3);
        assert_eq!(m.system(system).unwrap().particle_count(), 3);
        let order: Vec<_> = m.particles_of(system).map(|(h, _)| h).collect();
        assert_eq!(order, particles);
        assert_eq!(m.priority_bucket(ParticlePriority::Constant).collect::<Vec<_>>(), particles);

        assert!(m.destroy_particle(particles[1]));
        assert!(!m.destroy_particle(particles[1]));
        assert_eq!(m.particle_count(), 2);
        let order: Vec<_> = m.particles_of(system).map(|(h, _)| h).collect();
        assert_eq!(order, vec![particles[0], particles[2]]);
    }

    #[test]
    fn test_add_remove_particle_idempotent() {
        let mut m = manager(100);
        let (_, particles) = spawn(&mut m, "Mid", 1);
        m.add_particle(particles[0]);
        assert_eq!(m.particle_count(), 1);
        m.remove_particle(particles[0]);
        m.remove_particle(particles[0]);
        assert_eq!(m.particle_count(), 0);
        assert_eq!(m.priority_bucket(ParticlePriority::Constant).count(), 0);
    }

    #[test]
    fn test_eviction_lowest_oldest_first() {
        let mut m = manager(100);
        let (_, low) = spawn(&mut m, "Low", 2);
        let (_, mid) = spawn(&mut m, "Mid", 2);
        let (_, high) = spawn(&mut m, "High", 1);

        assert_eq!(m.remove_oldest_particles(3, ParticlePriority::Critical), 3);
        assert!(m.particle(low[0]).is_none());
        assert!(m.particle(low[1]).is_none());
        assert!(m.particle(mid[0]).is_none());
        assert!(m.particle(mid[1]).is_some());

        // Nothing left below the cap
        assert_eq!(m.remove_oldest_particles(5, ParticlePriority::Critical), 1);
        assert!(m.particle(high[0]).is_some());
        assert_eq!(m.particle_count(), 1);
    }

    #[test]
    fn test_budget_evicts_lower_priority() {
        let mut m = manager(4);
        let (_, low) = spawn(&mut m, "Low", 4);
        let (_, high) = spawn(&mut m, "High", 2);
        assert_eq!(high.len(), 2);
        assert_eq!(m.particle_count(), 4);
        assert!(m.particle(low[0]).is_none());
        assert!(m.particle(low[1]).is_none());
        assert!(m.particle(low[2]).is_some());
    }

    #[test]
    fn test_budget_refuses_without_victims() {
        let mut m = manager(2);
        spawn(&mut m, "High", 2);
        let (_, refused) = spawn(&mut m, "Low", 1);
        assert!(refused.is_empty());
        // Same priority never evicts itself
        let (_, refused) = spawn(&mut m, "High", 1);
        assert!(refused.is_empty());
        assert_eq!(m.particle_count(), 2);
    }

    #[test]
    fn test_forced_creation_ignores_budget() {
        let mut m = manager(1);
        let system = m.create_particle_system_by_name("Low", false).unwrap();
        m.create_particle(system, info(), true).unwrap();
        m.create_particle(system, info(), true).unwrap();
        assert_eq!(m.particle_count(), 2);
    }

    #[test]
    fn test_min_dynamic_priority() {
        let config = ManagerConfig {
            min_dynamic_priority: ParticlePriority::Constant,
            ..ManagerConfig::default()
        };
        let mut m = ParticleSystemManager::new(config).unwrap();
        m.init(DEFS).unwrap();
        assert!(spawn(&mut m, "Low", 1).1.is_empty());
        assert_eq!(spawn(&mut m, "Mid", 1).1.len(), 1);
    }

    #[test]
    fn test_field_cap() {
        let mut m = manager(100);
        let (_, field) = spawn(&mut m, "Field", 5);
        assert_eq!(field.len(), 2);
        assert_eq!(m.field_particle_count(), 2);
        m.destroy_particle(field[0]);
        assert_eq!(m.field_particle_count(), 1);
    }

    #[test]
    fn test_attached_system_is_controlled() {
        let mut m = manager(100);
        let (_, rockets) = spawn(&mut m, "Rocket", 1);
        let controlled = m.particle(rockets[0]).unwrap().controlled_system().unwrap();
        assert_eq!(m.system(controlled).unwrap().control_particle(), Some(rockets[0]));

        m.destroy_particle(rockets[0]);
        let system = m.system(controlled).unwrap();
        assert!(system.is_destroyed());
        assert_eq!(system.control_particle(), None);
    }

    #[test]
    fn test_link_and_unlink_are_symmetric() {
        let mut m = manager(100);
        let a = m.create_particle_system_by_name("Mid", false).unwrap();
        let b = m.create_particle_system_by_name("Mid", false).unwrap();
        let c = m.create_particle_system_by_name("Mid", false).unwrap();

        assert!(m.link_master_slave(a, b));
        assert!(!m.link_master_slave(a, a));
        // Relinking a to c frees b
        assert!(m.link_master_slave(a, c));
        assert_eq!(m.system(b).unwrap().master(), None);
        assert_eq!(m.system(b).unwrap().master_id(), ParticleSystemId::NONE);
        assert_eq!(m.system(c).unwrap().master(), Some(a));

        m.remove_master(c);
        assert_eq!(m.system(a).unwrap().slave(), None);
        assert_eq!(m.system(a).unwrap().slave_id(), ParticleSystemId::NONE);
        // Nothing to clear
        m.remove_slave(a);
    }

    #[test]
    fn test_link_refuses_cycles() {
        let mut m = manager(100);
        let a = m.create_particle_system_by_name("Mid", false).unwrap();
        let b = m.create_particle_system_by_name("Mid", false).unwrap();
        let c = m.create_particle_system_by_name("Mid", false).unwrap();

        assert!(m.link_master_slave(a, b));
        assert!(!m.link_master_slave(b, a));
        assert!(m.link_master_slave(b, c));
        assert!(!m.link_master_slave(c, a));

        // The refused links left the chain a -> b -> c intact
        assert!(!m.system(a).unwrap().is_slave());
        assert_eq!(m.system(a).unwrap().slave(), Some(b));
        assert_eq!(m.system(b).unwrap().slave(), Some(c));
        assert_eq!(m.system(c).unwrap().slave(), None);
    }

    #[test]
    fn test_pool_exhaustion_keeps_particle_id() {
        let config = ManagerConfig {
            max_particle_count: 2,
            max_field_particle_count: 0,
            particle_pool_size: 2,
            ..ManagerConfig::default()
        };
        let mut m = ParticleSystemManager::new(config).unwrap();
        m.init(DEFS).unwrap();
        let system = m.create_particle_system_by_name("Mid", false).unwrap();

        let first = m.create_particle(system, info(), true).unwrap();
        m.create_particle(system, info(), true).unwrap();
        assert!(m.create_particle(system, info(), true).is_none());
        assert_eq!(m.next_particle_id, 2);

        m.destroy_particle(first);
        let next = m.create_particle(system, info(), true).unwrap();
        assert_eq!(m.particle(next).unwrap().id(), ParticleId(3));
    }

    #[test]
    fn test_live_list_add_remove() {
        let mut m = manager(100);
        let a = m.create_particle_system_by_name("Mid", false).unwrap();
        m.add_particle_system(a);
        assert_eq!(m.system_count(), 1);
        m.remove_particle_system(a);
        m.remove_particle_system(a);
        assert_eq!(m.system_count(), 0);
    }
}
