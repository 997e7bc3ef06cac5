//! Aim Reticle
//!
//! Hold-to-release aim state machine. While roaming, the reticle center
//! drifts along a deterministic quasi-periodic path; during a hold the
//! radius shrinks toward `min_radius`, and the release samples a landing
//! point uniformly over the current disc. One controller instance per
//! board - no module-level singletons.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;

/// Largest frame delta fed to [`AimController::update`]. Covers frame
/// hitches and tab suspension without letting the roam path teleport.
pub const MAX_FRAME_DT: f32 = 0.25;

// Roam path harmonics. Two incommensurate frequencies per axis keep the
// drift from visibly repeating within a round.
const ROAM_X: [(f32, f32, f32); 2] = [(0.62, 0.9, 0.0), (0.38, 2.3, 1.7)];
const ROAM_Y: [(f32, f32, f32); 2] = [(0.58, 1.3, 0.0), (0.42, 2.9, 0.5)];

/// Reticle tuning, resolved once per board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AimConfig {
    /// Smallest reticle radius (full hold), world units
    pub min_radius: f32,
    /// Largest reticle radius (roaming / hold start), world units
    pub max_radius: f32,
    /// Seconds of holding to shrink from max to min radius
    pub shrink_time: f32,
    /// Roam drift amplitude as a fraction of `board_radius`
    pub roam_amplitude: f32,
    /// Gap kept between the reticle edge and the board edge, world units
    pub edge_margin: f32,
    /// World-unit board radius the reticle roams within
    pub board_radius: f32,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            min_radius: 0.035,
            max_radius: 0.30,
            shrink_time: 1.4,
            roam_amplitude: 0.55,
            edge_margin: 0.02,
            board_radius: 1.0,
        }
    }
}

/// Mutable reticle state. One live reticle per board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AimState {
    /// Is the reticle active at all
    pub enabled: bool,
    /// Is a hold gesture in progress
    pub holding: bool,
    /// Seconds the current hold has lasted
    pub hold_time: f32,
    /// Reticle center, board-local units
    pub center: Vec2,
    /// Current reticle radius, between min and max
    pub radius: f32,
    /// Roaming-motion clock, seconds
    pub time: f32,
}

/// What a completed hold gesture produced.
///
/// `hit` lies within `radius` of `center` but is not necessarily inside the
/// board - scoring decides what the landing is worth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitSample {
    /// Reticle center at release
    pub center: Vec2,
    /// Reticle radius at release (after shrink)
    pub radius: f32,
    /// Sampled landing coordinate, board-local units
    pub hit: Vec2,
}

/// Owns reticle position and radius over time and samples release hits.
///
/// Illegal transitions (`begin_hold` while holding, release while not
/// holding) are no-ops observable only through state - nothing here panics
/// or returns an error.
#[derive(Clone, Debug)]
pub struct AimController {
    config: AimConfig,
    state: AimState,
    rng: DeterministicRng,
}

impl AimController {
    /// Create a controller for one board.
    ///
    /// The seed fixes the release-sampling sequence; derive it per round
    /// (see [`crate::core::rng::derive_round_seed`]) for reproducible rounds.
    pub fn new(config: AimConfig, seed: u64) -> Self {
        Self {
            config,
            state: AimState {
                enabled: true,
                holding: false,
                hold_time: 0.0,
                center: Vec2::ZERO,
                radius: config.max_radius,
                time: 0.0,
            },
            rng: DeterministicRng::new(seed),
        }
    }

    /// Current reticle state (read-only).
    pub fn state(&self) -> &AimState {
        &self.state
    }

    /// Reticle tuning this controller was built with.
    pub fn config(&self) -> &AimConfig {
        &self.config
    }

    /// Toggle reticle activity. Disabling during a hold abandons it and
    /// restores roaming defaults.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled && self.state.holding {
            self.reset_to_roaming();
        }
        self.state.enabled = enabled;
    }

    /// Start a hold gesture. No-op while disabled or already holding.
    pub fn begin_hold(&mut self) {
        if !self.state.enabled || self.state.holding {
            return;
        }
        self.state.holding = true;
        self.state.hold_time = 0.0;
        self.state.radius = self.config.max_radius;
    }

    /// Abort the current hold without sampling. No-op when not holding.
    pub fn cancel_hold(&mut self) {
        if self.state.holding {
            self.reset_to_roaming();
        }
    }

    /// Advance the reticle by one frame.
    ///
    /// The delta is clamped to `[0, MAX_FRAME_DT]`; callers are expected to
    /// clamp too, but a hitched frame must not destabilize the reticle.
    pub fn update(&mut self, dt: f32) {
        if !self.state.enabled {
            return;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        self.state.time += dt;

        if self.state.holding {
            self.state.hold_time += dt;
            self.state.radius = self.shrunk_radius(self.state.hold_time);
            // Center stays wherever the roam left it - no drift mid-hold
        } else {
            self.state.radius = self.config.max_radius;
            self.state.center = self.roam_center(self.state.time);
        }
    }

    /// Finish a hold: sample a landing point uniformly over the current
    /// disc and restore roaming defaults.
    ///
    /// Returns `None` when no hold is in progress (caller should guard via
    /// `state().holding`, but the call is harmless).
    pub fn release_and_sample_hit(&mut self) -> Option<HitSample> {
        if !self.state.holding {
            return None;
        }

        let center = self.state.center;
        let radius = self.state.radius;
        let hit = self.rng.sample_in_disk(center, radius);

        self.reset_to_roaming();

        Some(HitSample { center, radius, hit })
    }

    /// Interpolated radius after `hold_time` seconds of holding.
    fn shrunk_radius(&self, hold_time: f32) -> f32 {
        if self.config.shrink_time <= 0.0 {
            return self.config.min_radius;
        }
        let progress = (hold_time / self.config.shrink_time).clamp(0.0, 1.0);
        self.config.max_radius + (self.config.min_radius - self.config.max_radius) * progress
    }

    /// Roam position at a given clock value, clamped so the whole reticle
    /// stays inside the board: `|center| + radius <= board_radius - margin`.
    fn roam_center(&self, t: f32) -> Vec2 {
        let amp = self.config.roam_amplitude * self.config.board_radius;

        let mut x = 0.0;
        for (weight, freq, phase) in ROAM_X {
            x += weight * (freq * t + phase).sin();
        }
        let mut y = 0.0;
        for (weight, freq, phase) in ROAM_Y {
            y += weight * (freq * t + phase).cos();
        }

        let center = Vec2::new(amp * x, amp * y);
        let max_dist =
            (self.config.board_radius - self.config.edge_margin - self.state.radius).max(0.0);
        if center.length_squared() > max_dist * max_dist {
            center.normalize().scale(max_dist)
        } else {
            center
        }
    }

    fn reset_to_roaming(&mut self) {
        self.state.holding = false;
        self.state.hold_time = 0.0;
        self.state.radius = self.config.max_radius;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AimController {
        AimController::new(AimConfig::default(), 42)
    }

    fn step(ctrl: &mut AimController, total: f32, dt: f32) {
        let steps = (total / dt).round() as usize;
        for _ in 0..steps {
            ctrl.update(dt);
        }
    }

    #[test]
    fn test_begin_hold_sets_hold_state() {
        let mut ctrl = controller();
        ctrl.begin_hold();
        assert!(ctrl.state().holding);
        assert_eq!(ctrl.state().hold_time, 0.0);
        assert_eq!(ctrl.state().radius, ctrl.config().max_radius);
    }

    #[test]
    fn test_begin_hold_ignored_while_disabled() {
        let mut ctrl = controller();
        ctrl.set_enabled(false);
        ctrl.begin_hold();
        assert!(!ctrl.state().holding);
    }

    #[test]
    fn test_begin_hold_ignored_while_holding() {
        let mut ctrl = controller();
        ctrl.begin_hold();
        step(&mut ctrl, 0.5, 1.0 / 60.0);
        let elapsed = ctrl.state().hold_time;
        assert!(elapsed > 0.4);

        // Second begin_hold must not restart the shrink
        ctrl.begin_hold();
        assert_eq!(ctrl.state().hold_time, elapsed);
    }

    #[test]
    fn test_radius_shrinks_linearly_and_clamps() {
        let mut ctrl = controller();
        let config = *ctrl.config();
        ctrl.begin_hold();

        step(&mut ctrl, config.shrink_time / 2.0, 1.0 / 120.0);
        let expected_mid = (config.max_radius + config.min_radius) / 2.0;
        assert!(
            (ctrl.state().radius - expected_mid).abs() < 0.01,
            "radius {} should be near midpoint {}",
            ctrl.state().radius,
            expected_mid
        );

        // Keep holding well past shrink_time: clamped at min
        step(&mut ctrl, config.shrink_time * 2.0, 1.0 / 120.0);
        assert_eq!(ctrl.state().radius, config.min_radius);
    }

    #[test]
    fn test_disable_mid_hold_resets_to_roaming() {
        let mut ctrl = controller();
        ctrl.begin_hold();
        step(&mut ctrl, 1.0, 1.0 / 60.0);
        assert!(ctrl.state().radius < ctrl.config().max_radius);

        ctrl.set_enabled(false);
        assert!(!ctrl.state().holding);
        assert_eq!(ctrl.state().radius, ctrl.config().max_radius);
    }

    #[test]
    fn test_cancel_hold_resets_without_sampling() {
        let mut ctrl = controller();
        ctrl.begin_hold();
        step(&mut ctrl, 0.7, 1.0 / 60.0);
        ctrl.cancel_hold();
        assert!(!ctrl.state().holding);
        assert_eq!(ctrl.state().hold_time, 0.0);
        assert_eq!(ctrl.state().radius, ctrl.config().max_radius);
    }

    #[test]
    fn test_release_without_hold_is_none() {
        let mut ctrl = controller();
        assert!(ctrl.release_and_sample_hit().is_none());
    }

    #[test]
    fn test_release_samples_within_disc_and_resets() {
        let mut ctrl = controller();
        step(&mut ctrl, 1.0, 1.0 / 60.0);
        ctrl.begin_hold();
        step(&mut ctrl, 0.8, 1.0 / 60.0);

        let sample = ctrl.release_and_sample_hit().expect("holding");
        let dist_sq = sample.hit.distance_squared(sample.center);
        assert!(dist_sq <= sample.radius * sample.radius + 1e-6);
        assert!(sample.radius < ctrl.config().max_radius);

        assert!(!ctrl.state().holding);
        assert_eq!(ctrl.state().radius, ctrl.config().max_radius);
        assert!(ctrl.release_and_sample_hit().is_none());
    }

    #[test]
    fn test_center_frozen_while_holding() {
        let mut ctrl = controller();
        step(&mut ctrl, 2.0, 1.0 / 60.0);
        ctrl.begin_hold();
        let frozen = ctrl.state().center;
        step(&mut ctrl, 1.0, 1.0 / 60.0);
        assert_eq!(ctrl.state().center, frozen);
    }

    #[test]
    fn test_roam_stays_inside_board() {
        let mut ctrl = controller();
        let config = *ctrl.config();
        let limit = config.board_radius - config.edge_margin;

        for i in 0..5000 {
            // Vary the step so the path gets probed off the 60Hz grid
            let dt = 1.0 / 60.0 + (i % 7) as f32 * 0.003;
            ctrl.update(dt);
            let reach = ctrl.state().center.length() + ctrl.state().radius;
            assert!(
                reach <= limit + 1e-4,
                "reticle reach {} exceeds board at t={}",
                reach,
                ctrl.state().time
            );
        }
    }

    #[test]
    fn test_time_frozen_while_disabled() {
        let mut ctrl = controller();
        step(&mut ctrl, 1.0, 1.0 / 60.0);
        let t = ctrl.state().time;

        ctrl.set_enabled(false);
        step(&mut ctrl, 1.0, 1.0 / 60.0);
        assert_eq!(ctrl.state().time, t);
    }

    #[test]
    fn test_bad_deltas_are_harmless() {
        let mut ctrl = controller();
        ctrl.update(-5.0);
        assert_eq!(ctrl.state().time, 0.0);

        ctrl.update(f32::NAN);
        assert_eq!(ctrl.state().time, 0.0);

        // A huge hitch advances by at most the frame cap
        ctrl.update(100.0);
        assert_eq!(ctrl.state().time, MAX_FRAME_DT);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let mut a = AimController::new(AimConfig::default(), 777);
        let mut b = AimController::new(AimConfig::default(), 777);

        for _ in 0..3 {
            for ctrl in [&mut a, &mut b] {
                step(ctrl, 0.5, 1.0 / 60.0);
                ctrl.begin_hold();
                step(ctrl, 0.9, 1.0 / 60.0);
            }
            let ha = a.release_and_sample_hit().unwrap();
            let hb = b.release_and_sample_hit().unwrap();
            assert_eq!(ha, hb);
        }
    }
}
