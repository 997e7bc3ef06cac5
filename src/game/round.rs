//! Round Bookkeeping
//!
//! Sequences the throws of a single round: Inactive until `reset_round`,
//! Active while darts remain, Complete once the dart limit is reached.
//! Throws registered outside the Active phase are no-ops observable only
//! through state - the caller contract, not this type, prevents them.

use serde::{Deserialize, Serialize};

use crate::game::events::GameEvent;
use crate::game::scoring::{Ring, ScoreResult};

/// Round tuning, resolved once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Darts per round
    pub max_darts: u8,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self { max_darts: 10 }
    }
}

/// Lifecycle phase of the round state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round in progress
    #[default]
    Inactive,
    /// Throws are being accepted
    Active,
    /// Dart limit reached; frozen until the next reset
    Complete,
}

/// One recorded throw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrowRecord {
    /// Display label, e.g. "T20"
    pub label: String,
    /// Points awarded
    pub points: u32,
    /// Ring the dart landed in
    pub ring: Ring,
    /// Score multiplier
    pub mult: u8,
    /// Wedge face value (None for bulls/miss)
    pub wedge: Option<u8>,
}

impl From<&ScoreResult> for ThrowRecord {
    fn from(result: &ScoreResult) -> Self {
        Self {
            label: result.label.clone(),
            points: result.points,
            ring: result.ring,
            mult: result.mult,
            wedge: result.wedge,
        }
    }
}

/// Finalized round results, handed to the caller for submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Sum of all throw points
    pub total_score: u32,
    /// Every throw in order
    pub throws: Vec<ThrowRecord>,
}

/// Tracks throws, score and history for the round in progress.
#[derive(Clone, Debug, Default)]
pub struct RoundManager {
    config: RoundConfig,
    phase: RoundPhase,
    darts_thrown: u8,
    total_score: u32,
    history: Vec<ThrowRecord>,
    summary: Option<RoundSummary>,
    pending_events: Vec<GameEvent>,
}

impl RoundManager {
    /// Create a manager with the given tuning.
    pub fn new(config: RoundConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Darts thrown so far this round.
    pub fn darts_thrown(&self) -> u8 {
        self.darts_thrown
    }

    /// Accumulated score this round.
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    /// Throws recorded this round, in order.
    pub fn history(&self) -> &[ThrowRecord] {
        &self.history
    }

    /// Darts remaining before the round completes.
    pub fn darts_remaining(&self) -> u8 {
        self.config.max_darts.saturating_sub(self.darts_thrown)
    }

    /// Begin a fresh round. Always a hard reset, valid from any phase.
    pub fn reset_round(&mut self) {
        self.phase = RoundPhase::Active;
        self.darts_thrown = 0;
        self.total_score = 0;
        self.history.clear();
        self.summary = None;
        self.pending_events.clear();
        self.pending_events.push(GameEvent::RoundStarted {
            max_darts: self.config.max_darts,
        });
    }

    /// Record a classified throw.
    ///
    /// Only valid while Active; anywhere else the call is a no-op. Reaching
    /// the dart limit completes the round as a side effect.
    pub fn register_throw(&mut self, result: &ScoreResult) {
        if self.phase != RoundPhase::Active {
            return;
        }

        self.darts_thrown += 1;
        self.total_score += result.points;
        self.history.push(ThrowRecord::from(result));
        self.pending_events
            .push(GameEvent::dart_landed(self.darts_thrown, result, self.total_score));

        if self.darts_thrown >= self.config.max_darts {
            self.end_round();
        }
    }

    /// Complete the round, freezing its summary. Idempotent: repeated calls
    /// before the next reset return the same summary.
    pub fn end_round(&mut self) -> RoundSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let summary = RoundSummary {
            total_score: self.total_score,
            throws: self.history.clone(),
        };
        self.phase = RoundPhase::Complete;
        self.summary = Some(summary.clone());
        self.pending_events.push(GameEvent::RoundCompleted {
            total_score: self.total_score,
            darts_thrown: self.darts_thrown,
        });
        summary
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

// =============================================================================
// TESTS
// =============================================================================
