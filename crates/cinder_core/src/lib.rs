//! # CINDER Core
//!
//! Shared foundations for the particle engine:
//! - Math types with a stable `#[repr(C)]` layout
//! - Random-number interfaces with separated logic and client streams
//! - Generational slot pools for objects that are created and retired every frame
//!
//! ## Architecture Rules
//!
//! 1. **Pools are sized once** - capacity is fixed at construction
//! 2. **Stale handles are harmless** - a freed slot bumps its generation
//! 3. **Visual randomness is isolated** - the client stream never advances the logic stream

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod math;
pub mod memory;
pub mod random;

pub use math::{Coord3D, Matrix3D, RgbColor};
pub use memory::{PoolHandle, SlotPool};
pub use random::{ChaChaRandom, Distribution, GameRandom, RandomStream, RandomVariable};
