//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform determinism:
//! seeded randomness only, no system time, no hidden state.

pub mod rng;
pub mod vec2;

// Re-export core types
pub use rng::{derive_round_seed, DeterministicRng};
pub use vec2::{normalize_angle_tau, Vec2};
