//! Game Events
//!
//! Notifications produced by round bookkeeping, drained by the caller as
//! plain values. Renderers and HUDs consume these instead of registering
//! callbacks, which keeps the core synchronously testable.

use serde::{Deserialize, Serialize};

use crate::game::scoring::{Ring, ScoreResult};

/// Something the round state machine wants observers to know about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A fresh round began
    RoundStarted {
        /// Darts available this round
        max_darts: u8,
    },

    /// A dart landed and was scored
    DartLanded {
        /// 1-based position of this dart within the round
        dart_index: u8,
        /// Display label, e.g. "T20"
        label: String,
        /// Points awarded
        points: u32,
        /// Ring the dart landed in
        ring: Ring,
        /// Score multiplier
        mult: u8,
        /// Wedge face value (None for bulls/miss)
        wedge: Option<u8>,
        /// Round total after this dart
        new_total: u32,
    },

    /// The round reached its dart limit (or was ended explicitly)
    RoundCompleted {
        /// Final round score
        total_score: u32,
        /// Darts actually thrown
        darts_thrown: u8,
    },
}

impl GameEvent {
    /// Create a dart-landed event from a classified throw.
    pub fn dart_landed(dart_index: u8, result: &ScoreResult, new_total: u32) -> Self {
        Self::DartLanded {
            dart_index,
            label: result.label.clone(),
            points: result.points,
            ring: result.ring,
            mult: result.mult,
            wedge: result.wedge,
            new_total,
        }
    }
}
