//! Board Configuration
//!
//! Typed dartboard geometry with explicit defaults, resolved once at
//! construction and validated eagerly. Ring radii are normalized fractions of
//! `board_radius`, so the same config classifies boards of any world size.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of angular wedges on a standard board.
pub const SEGMENTS: usize = 20;

/// Face values in standard clockwise order, starting from the top wedge.
pub const STANDARD_NUMBERS: [u8; SEGMENTS] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

/// Which way wedge indices advance from `start_angle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Index increases clockwise (standard board)
    Cw,
    /// Index increases counter-clockwise
    Ccw,
}

/// Normalized ring radii (fractions of `board_radius`).
///
/// Must satisfy `dbull_outer < bull_outer < triple_inner < triple_outer <
/// double_inner <= double_outer = outer`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingRatios {
    /// Playable edge of the board
    pub outer: f32,
    /// Inner edge of the double band
    pub double_inner: f32,
    /// Outer edge of the double band
    pub double_outer: f32,
    /// Inner edge of the triple band
    pub triple_inner: f32,
    /// Outer edge of the triple band
    pub triple_outer: f32,
    /// Outer edge of the single bull
    pub bull_outer: f32,
    /// Outer edge of the double bull
    pub dbull_outer: f32,
}

impl Default for RingRatios {
    fn default() -> Self {
        // Regulation board wire positions scaled by the 170mm playable radius
        Self {
            outer: 1.0,
            double_inner: 0.953,
            double_outer: 1.0,
            triple_inner: 0.582,
            triple_outer: 0.629,
            bull_outer: 0.0935,
            dbull_outer: 0.0374,
        }
    }
}

/// Immutable per-board configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Center angle of wedge index 0 (radians, math convention:
    /// 0 = +x axis, increasing counter-clockwise)
    pub start_angle: f32,
    /// Which way wedge indices advance from `start_angle`
    pub direction: Direction,
    /// Additional rotation applied before classification (radians)
    pub angle_offset: f32,
    /// Face value of each wedge index; each of 1..=20 exactly once
    pub numbers: [u8; SEGMENTS],
    /// Normalized ring band edges
    pub ring_ratios: RingRatios,
    /// Normalized tolerance added to band edges (>= 0)
    pub ring_eps_n: f32,
    /// Points for the single bull
    pub bull_points: u32,
    /// Points for the double bull
    pub dbull_points: u32,
    /// World-unit radius used to normalize hit coordinates
    pub board_radius: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            // Wedge 0 carries the 20, centered at the top of the board
            start_angle: std::f32::consts::FRAC_PI_2,
            direction: Direction::Cw,
            angle_offset: 0.0,
            numbers: STANDARD_NUMBERS,
            ring_ratios: RingRatios::default(),
            ring_eps_n: 0.006,
            bull_points: 25,
            dbull_points: 50,
            board_radius: 1.0,
        }
    }
}

impl BoardConfig {
    /// Angular width of one wedge (radians).
    #[inline]
    pub fn wedge_angle(&self) -> f32 {
        std::f32::consts::TAU / SEGMENTS as f32
    }

    /// Validate the configuration, collecting every problem found.
    ///
    /// Classification itself never fails (it degrades to MISS); this is for
    /// callers that want human-readable errors at board construction time.
    pub fn validate(&self) -> Result<(), BoardConfigError> {
        let mut problems = Vec::new();

        // numbers must be a permutation of 1..=20
        let mut seen = [false; SEGMENTS];
        for &n in &self.numbers {
            if !(1..=SEGMENTS as u8).contains(&n) {
                problems.push(format!("wedge value {} outside 1..=20", n));
            } else if seen[(n - 1) as usize] {
                problems.push(format!("wedge value {} appears more than once", n));
            } else {
                seen[(n - 1) as usize] = true;
            }
        }

        let r = &self.ring_ratios;
        let ratios = [
            ("outer", r.outer),
            ("double_inner", r.double_inner),
            ("double_outer", r.double_outer),
            ("triple_inner", r.triple_inner),
            ("triple_outer", r.triple_outer),
            ("bull_outer", r.bull_outer),
            ("dbull_outer", r.dbull_outer),
        ];
        let mut ratios_numeric = true;
        for (name, value) in ratios {
            if !value.is_finite() || value <= 0.0 {
                problems.push(format!("ring ratio {} = {} is not a positive number", name, value));
                ratios_numeric = false;
            }
        }

        if ratios_numeric {
            let ordered = r.dbull_outer < r.bull_outer
                && r.bull_outer < r.triple_inner
                && r.triple_inner < r.triple_outer
                && r.triple_outer < r.double_inner
                && r.double_inner <= r.double_outer;
            if !ordered {
                problems.push(
                    "ring ratios must satisfy dbull < bull < triple_inner < triple_outer \
                     < double_inner <= double_outer"
                        .to_string(),
                );
            }
            if (r.double_outer - r.outer).abs() > 1e-6 {
                problems.push(format!(
                    "double_outer ({}) must coincide with outer ({})",
                    r.double_outer, r.outer
                ));
            }
        }

        if !self.ring_eps_n.is_finite() || self.ring_eps_n < 0.0 {
            problems.push(format!("ring_eps_n = {} must be >= 0", self.ring_eps_n));
        }
        if !self.start_angle.is_finite() {
            problems.push("start_angle is not a number".to_string());
        }
        if !self.angle_offset.is_finite() {
            problems.push("angle_offset is not a number".to_string());
        }
        if !self.board_radius.is_finite() || self.board_radius <= 0.0 {
            problems.push(format!(
                "board_radius = {} must be a positive number",
                self.board_radius
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(BoardConfigError { problems })
        }
    }

    /// Cheap check used by the scoring path: can this config classify a hit
    /// at all? Board radius is deliberately excluded - an invalid radius only
    /// disables normalization, it does not void classification.
    pub(crate) fn is_classifiable(&self) -> bool {
        let r = &self.ring_ratios;
        r.outer.is_finite()
            && r.double_inner.is_finite()
            && r.double_outer.is_finite()
            && r.triple_inner.is_finite()
            && r.triple_outer.is_finite()
            && r.bull_outer.is_finite()
            && r.dbull_outer.is_finite()
            && self.ring_eps_n.is_finite()
            && self.ring_eps_n >= 0.0
            && self.start_angle.is_finite()
            && self.angle_offset.is_finite()
    }
}

/// All problems found while validating a [`BoardConfig`].
#[derive(Debug, Clone, Error)]
#[error("invalid board configuration: {}", problems.join("; "))]
pub struct BoardConfigError {
    /// Human-readable description of each defect
    pub problems: Vec<String>,
}

// =============================================================================
// TESTS
// =============================================================================
