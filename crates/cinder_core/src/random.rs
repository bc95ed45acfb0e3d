//! # Random Streams
//!
//! The engine keeps two independent random streams:
//!
//! - **Logic**: advances identically on every peer and in replays. Anything that
//!   changes the simulation outcome must draw from it.
//! - **Client**: purely visual. Particle effects draw from it freely, so the
//!   number of particles a machine renders can never desynchronize a match.
//!
//! Both are ChaCha8 generators. For a given seed the two streams are selected
//! with `set_stream`, so they share the seed but never share output.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Source of uniformly distributed numbers consumed by the simulation crates.
pub trait GameRandom {
    /// Uniform real in `[low, high]`. Returns `low` when the range is empty.
    fn real_in(&mut self, low: f32, high: f32) -> f32;

    /// Uniform integer in `[low, high]`. Returns `low` when the range is empty.
    fn int_in(&mut self, low: i32, high: i32) -> i32;
}

/// Which of the two engine streams a generator belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum RandomStream {
    /// Gameplay-deterministic stream.
    Logic = 0,
    /// Visual-only stream.
    Client = 1,
}

/// ChaCha8-backed implementation of [`GameRandom`].
#[derive(Clone, Debug)]
pub struct ChaChaRandom {
    rng: ChaCha8Rng,
    stream: RandomStream,
    seed: u64,
}

impl ChaChaRandom {
    /// Creates a generator for `stream`, seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64, stream: RandomStream) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream as u64);
        Self { rng, stream, seed }
    }

    /// Restarts the stream from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed, self.stream);
    }

    /// The stream this generator draws from.
    #[must_use]
    pub const fn stream(&self) -> RandomStream {
        self.stream
    }

    /// The seed the stream was last started from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl GameRandom for ChaChaRandom {
    fn real_in(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn int_in(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Shape of a [`RandomVariable`]'s distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum Distribution {
    /// Always `low`.
    Constant = 0,
    /// Flat between `low` and `high`.
    #[default]
    Uniform = 1,
    /// Bell curve centered on the midpoint, clamped to the range.
    Gaussian = 2,
    /// Peak at the midpoint.
    Triangular = 3,
    /// Values cluster near `low`.
    LowBias = 4,
    /// Values cluster near `high`.
    HighBias = 5,
}

impl Distribution {
    /// Converts from the wire representation.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Constant),
            1 => Some(Self::Uniform),
            2 => Some(Self::Gaussian),
            3 => Some(Self::Triangular),
            4 => Some(Self::LowBias),
            5 => Some(Self::HighBias),
            _ => None,
        }
    }
}

/// A configured range that is rolled into a concrete value per use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomVariable {
    /// Lower bound.
    pub low: f32,
    /// Upper bound.
    pub high: f32,
    /// How values are spread between the bounds.
    pub distribution: Distribution,
}

impl RandomVariable {
    /// Creates a variable with an explicit distribution.
    #[must_use]
    pub const fn new(low: f32, high: f32, distribution: Distribution) -> Self {
        Self { low, high, distribution }
    }

    /// A variable that always yields `value`.
    #[must_use]
    pub const fn constant(value: f32) -> Self {
        Self::new(value, value, Distribution::Constant)
    }

    /// A flat range.
    #[must_use]
    pub const fn uniform(low: f32, high: f32) -> Self {
        Self::new(low, high, Distribution::Uniform)
    }

    /// Rolls a value.
    pub fn value(&self, rng: &mut dyn GameRandom) -> f32 {
        let (low, high) = (self.low, self.high);
        if self.distribution == Distribution::Constant || high <= low {
            return low;
        }
        let span = high - low;
        match self.distribution {
            Distribution::Constant => low,
            Distribution::Uniform => rng.real_in(low, high),
            Distribution::Triangular => {
                let a = rng.real_in(0.0, 1.0);
                let b = rng.real_in(0.0, 1.0);
                low + span * (a + b) * 0.5
            }
            Distribution::LowBias => {
                let u = rng.real_in(0.0, 1.0);
                low + span * u * u
            }
            Distribution::HighBias => {
                let u = rng.real_in(0.0, 1.0);
                high - span * u * u
            }
            Distribution::Gaussian => {
                // Box-Muller, sigma chosen so +/-3 sigma spans the range
                let u1 = rng.real_in(f32::EPSILON, 1.0);
                let u2 = rng.real_in(0.0, 1.0);
                let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
                let mean = low + span * 0.5;
                (mean + z * span / 6.0).clamp(low, high)
            }
        }
    }

    /// Rolls a value and truncates it to a frame count.
    pub fn frames(&self, rng: &mut dyn GameRandom) -> u32 {
        self.value(rng).max(0.0) as u32
    }
}
