//! # CINDER Particles
//!
//! Particle simulation and lifecycle for a frame-stepped game world.
//!
//! ## Model
//!
//! - A [`ParticleSystemTemplate`] is a named, immutable effect definition
//! - A [`ParticleSystem`] is a live emitter created from a template
//! - A [`Particle`] is one simulated point owned by a system
//!
//! The [`ParticleSystemManager`] owns all three. Systems may chain to a
//! slave system fed by their emissions, and a particle may control a
//! system that then follows it.
//!
//! ## Budgets
//!
//! Every particle carries its system's [`ParticlePriority`]. When the
//! particle cap is reached, the oldest particles of the lowest priority
//! below the newcomer's are evicted first:
//!
//! ```text
//! WEAPON_EXPLOSION ... CONSTANT ... ALWAYS_RENDER
//!  ^ evicted first                   ^ evicted last
//! ```
//!
//! ## Snapshots
//!
//! [`ParticleSystemManager::save_snapshot`] writes the saveable part of the
//! graph through `cinder_xfer`. Loading rebuilds systems from their
//! template names and then resolves stored system IDs into live handles.
//!
//! ## Example
//!
//! ```rust
//! use cinder_particles::{EmptyScene, ParticleSystemManager};
//!
//! let mut manager = ParticleSystemManager::default();
//! manager.init("[[system]]\nname = \"Spark\"\n").unwrap();
//!
//! let spark = manager.create_particle_system_by_name("Spark", true).unwrap();
//! manager.update(&EmptyScene);
//! assert_eq!(manager.system(spark).unwrap().particle_count(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod definitions;
pub mod error;
pub mod fixup;
pub mod ids;
pub mod info;
pub mod manager;
pub mod particle;
pub mod priority;
pub mod scene;
pub mod system;
pub mod template;

pub use config::ManagerConfig;
pub use definitions::{parse_definitions, EffectDefinition};
pub use error::{ParticleError, ParticleResult};
pub use fixup::{ParticleFixup, SystemDirectory, SystemFixup};
pub use ids::{DrawableId, ObjectId, ParticleHandle, ParticleId, ParticleSystemId, SystemHandle};
pub use info::{
    EmissionVelocity, EmissionVolume, Keyframe, ParticleInfo, ParticleSystemInfo, ParticleType,
    RandomKeyframe, RgbColorKeyframe, ShaderType, WindMotion, MAX_KEYFRAMES,
};
pub use manager::{ParticleSystemManager, MAX_SLAVE_CHAIN_DEPTH};
pub use particle::{ControlLink, Particle};
pub use priority::{ParticlePriority, NUM_PARTICLE_PRIORITIES};
pub use scene::{EmptyScene, SceneQuery};
pub use system::ParticleSystem;
pub use template::{ParticleSystemTemplate, TemplateId};
