//! # Memory Management
//!
//! Pre-allocated slot pools for objects that churn every frame.
//!
//! ## Design Philosophy
//!
//! Storage is allocated once when the owning manager is built. During play:
//! - Allocation and release are O(1) free-list operations
//! - Handles carry a generation, so a handle to a retired object never
//!   aliases whatever reuses its slot

mod pool;

pub use pool::{PoolHandle, SlotPool};
