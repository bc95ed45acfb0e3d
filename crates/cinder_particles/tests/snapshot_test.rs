//! # Snapshot Integration Tests
//!
//! Saves a populated manager and loads it into a fresh one with the same
//! definitions.

use cinder_particles::{
    ControlLink, EmptyScene, ParticleInfo, ParticleSystemManager, SystemHandle,
};

const DEFS: &str = r#"
    [[system]]
    name = "Fire"
    slave_system_name = "Smoke"
    lifetime = { low = 60.0, high = 60.0, distribution = "CONSTANT" }
    burst_count = { low = 2.0, high = 2.0, distribution = "CONSTANT" }
    gravity = 0.5

    [[system]]
    name = "Smoke"
    priority = "CONSTANT"
    lifetime = { low = 60.0, high = 60.0, distribution = "CONSTANT" }

    [[system]]
    name = "Ember"
    lifetime = { low = 60.0, high = 60.0, distribution = "CONSTANT" }
"#;

fn manager() -> ParticleSystemManager {
    let mut m = ParticleSystemManager::default();
    m.init(DEFS).unwrap();
    m
}

fn run(m: &mut ParticleSystemManager, frames: usize) {
    for _ in 0..frames {
        m.update(&EmptyScene);
    }
}

fn round_trip(m: &mut ParticleSystemManager) -> ParticleSystemManager {
    let bytes = m.save_snapshot().unwrap();
    let mut loaded = manager();
    loaded.load_snapshot(&bytes).unwrap();
    loaded
}

/// Test: only systems that are live and saveable come back, unchanged.
#[test]
fn test_round_trip_keeps_only_saveable_live_systems() {
    let mut m = manager();
    let s1 = m.create_particle_system_by_name("Ember", false).unwrap();
    let s2 = m.create_particle_system_by_name("Ember", false).unwrap();
    let s3 = m.create_particle_system_by_name("Ember", false).unwrap();
    run(&mut m, 5);

    m.system_mut(s2).unwrap().set_saveable(false);
    m.system_mut(s3).unwrap().destroy();

    let before = m.system(s1).unwrap().clone();
    let particles_before: Vec<ParticleInfo> =
        m.particles_of(s1).map(|(_, p)| p.info().clone()).collect();
    assert_eq!(particles_before.len(), 5);

    let loaded = round_trip(&mut m);
    assert_eq!(loaded.system_count(), 1);
    let restored = loaded.find_particle_system(before.id()).unwrap();
    let after = loaded.system(restored).unwrap();

    assert_eq!(after.info(), before.info());
    assert_eq!(after.position(), before.position());
    assert_eq!(after.start_timestamp(), before.start_timestamp());
    assert_eq!(after.burst_delay_left(), before.burst_delay_left());
    assert_eq!(after.system_lifetime_left(), before.system_lifetime_left());
    assert_eq!(after.is_stopped(), before.is_stopped());

    let particles_after: Vec<ParticleInfo> =
        loaded.particles_of(restored).map(|(_, p)| p.info().clone()).collect();
    assert_eq!(particles_after, particles_before);
    assert_eq!(loaded.particle_count(), 5);
}

/// Test: a saved control link is bound on both sides after loading.
#[test]
fn test_control_particle_fixup() {
    let mut m = manager();
    let owner = m.create_particle_system_by_name("Ember", false).unwrap();
    let follower = m.create_particle_system_by_name("Ember", false).unwrap();
    m.system_mut(follower).unwrap().stop();
    let follower_id = m.system(follower).unwrap().id();

    let info = ParticleInfo { lifetime: 60, ..ParticleInfo::default() };
    let particle = m.create_particle(owner, info, true).unwrap();
    assert!(m.attach_control_particle(particle, follower));

    let loaded = round_trip(&mut m);
    let follower = loaded.find_particle_system(follower_id).unwrap();
    let owner = loaded.live_systems().find(|h| *h != follower).unwrap();
    let (particle, p) = loaded.particles_of(owner).next().unwrap();

    assert_eq!(p.control(), ControlLink::Bound { id: follower_id, system: follower });
    assert_eq!(loaded.system(follower).unwrap().control_particle(), Some(particle));
}

/// Test: control of a system that is not saved is dropped, not left dangling.
#[test]
fn test_control_of_unsaved_system_is_dropped() {
    let mut m = manager();
    let owner = m.create_particle_system_by_name("Ember", false).unwrap();
    let follower = m.create_particle_system_by_name("Ember", false).unwrap();
    m.system_mut(follower).unwrap().set_saveable(false);

    let particle = m.create_particle(owner, ParticleInfo::default(), true).unwrap();
    assert!(m.attach_control_particle(particle, follower));

    let loaded = round_trip(&mut m);
    assert_eq!(loaded.system_count(), 1);
    let owner = loaded.live_systems().next().unwrap();
    let (_, p) = loaded.particles_of(owner).next().unwrap();
    assert_eq!(p.control(), ControlLink::None);

    // The live link is untouched by saving
    assert_eq!(m.particle(particle).unwrap().controlled_system(), Some(follower));
}

/// Test: a snapshot naming an unknown template fails with its code and
/// leaves nothing behind.
#[test]
fn test_missing_template_is_fatal() {
    let mut source = manager();
    source.init("[[system]]\nname = \"Ghost\"\n").unwrap();
    source.create_particle_system_by_name("Ember", false).unwrap();
    source.create_particle_system_by_name("Ghost", false).unwrap();
    run(&mut source, 2);
    let bytes = source.save_snapshot().unwrap();

    let mut target = manager();
    target.create_particle_system_by_name("Fire", true).unwrap();
    let err = target.load_snapshot(&bytes).unwrap_err();

    assert_eq!(err.code(), 7);
    assert!(err.to_string().contains("Ghost"));
    assert_eq!(target.system_count(), 0);
    assert_eq!(target.particle_count(), 0);
}

/// Test: a control link naming a system that was never saved fails the load
/// and leaves nothing behind.
#[test]
fn test_unknown_control_id_is_fatal() {
    let mut m = manager();
    let owner = m.create_particle_system_by_name("Ember", false).unwrap();
    let follower = m.create_particle_system_by_name("Ember", false).unwrap();
    let particle = m.create_particle(owner, ParticleInfo::default(), true).unwrap();

    assert!(m.attach_control_particle(particle, follower));
    let mut linked = m.save_snapshot().unwrap();
    m.detach_control_particle(particle);
    let unlinked = m.save_snapshot().unwrap();

    // The streams differ only in the stored control ID
    assert_eq!(linked.len(), unlinked.len());
    let diff: Vec<usize> = (0..linked.len()).filter(|i| linked[*i] != unlinked[*i]).collect();
    assert_eq!(diff.len(), 1);
    linked[diff[0]] = 99;

    let mut target = manager();
    target.create_particle_system_by_name("Fire", true).unwrap();
    let err = target.load_snapshot(&linked).unwrap_err();

    assert_eq!(err.code(), 6);
    assert_eq!(target.system_count(), 0);
    assert_eq!(target.particle_count(), 0);
}

/// Test: a loaded manager checksums identically to the one that saved it.
#[test]
fn test_crc_equal_after_load() {
    let mut m = manager();
    m.create_particle_system_by_name("Fire", true).unwrap();
    m.create_particle_system_by_name("Ember", false).unwrap();
    run(&mut m, 7);

    let mut loaded = round_trip(&mut m);
    assert_eq!(m.crc().unwrap(), loaded.crc().unwrap());
    assert_eq!(m.save_snapshot().unwrap(), loaded.save_snapshot().unwrap());
}

/// Test: master/slave links are symmetric after loading and unlink on both
/// sides.
#[test]
fn test_master_slave_symmetry_after_load() {
    let mut m = manager();
    m.create_particle_system_by_name("Fire", true).unwrap();
    m.create_particle_system_by_name("Fire", true).unwrap();
    run(&mut m, 3);

    let mut loaded = round_trip(&mut m);
    assert_eq!(loaded.system_count(), 4);

    let handles: Vec<SystemHandle> = loaded.live_systems().collect();
    let mut masters = Vec::new();
    for a in &handles {
        let system = loaded.system(*a).unwrap();
        if let Some(b) = system.slave() {
            let slave = loaded.system(b).unwrap();
            assert_eq!(slave.master(), Some(*a));
            assert_eq!(slave.master_id(), system.id());
            assert_eq!(system.slave_id(), slave.id());
            masters.push((*a, b));
        }
    }
    assert_eq!(masters.len(), 2);

    let (master, slave) = masters[0];
    loaded.remove_master(slave);
    assert_eq!(loaded.system(master).unwrap().slave(), None);
    assert_eq!(loaded.system(slave).unwrap().master(), None);
    assert!(loaded.system(slave).unwrap().master_id().is_none());
    assert!(loaded.system(master).unwrap().slave_id().is_none());
}

/// Test: the loaded graph keeps simulating.
#[test]
fn test_loaded_manager_keeps_running() {
    let mut m = manager();
    let fire = m.create_particle_system_by_name("Fire", true).unwrap();
    let fire_id = m.system(fire).unwrap().id();
    run(&mut m, 2);

    let mut loaded = round_trip(&mut m);
    run(&mut m, 3);
    run(&mut loaded, 3);
    assert_eq!(loaded.particle_count(), m.particle_count());

    loaded.destroy_particle_system_by_id(fire_id);
    run(&mut loaded, 1);
    assert_eq!(loaded.system_count(), 0);
    assert_eq!(loaded.particle_count(), 0);
}
