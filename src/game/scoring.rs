//! Hit Classification
//!
//! Pure, deterministic mapping from a board-local coordinate to a score.
//! No side effects and no hidden state: the same `(x, y, config)` always
//! produces the same [`ScoreResult`]. Malformed configs degrade to a MISS
//! result - this path never returns an error and never panics.

use serde::{Deserialize, Serialize};

use crate::core::vec2::normalize_angle_tau;
use crate::game::board::{BoardConfig, Direction, SEGMENTS};

/// Radial band a hit landed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ring {
    /// Outside the playable board
    Miss,
    /// Inner bullseye
    Dbull,
    /// Outer bullseye
    Sbull,
    /// Double band (outer rim)
    Double,
    /// Triple band
    Triple,
    /// Plain single area
    Single,
}

impl Ring {
    /// Score multiplier for this ring (bulls and misses score specially).
    #[inline]
    pub fn multiplier(self) -> u8 {
        match self {
            Ring::Miss | Ring::Dbull | Ring::Sbull => 0,
            Ring::Single => 1,
            Ring::Double => 2,
            Ring::Triple => 3,
        }
    }

    /// Canonical label fragment for this ring.
    pub fn as_str(self) -> &'static str {
        match self {
            Ring::Miss => "MISS",
            Ring::Dbull => "DBULL",
            Ring::Sbull => "SBULL",
            Ring::Double => "DOUBLE",
            Ring::Triple => "TRIPLE",
            Ring::Single => "SINGLE",
        }
    }
}

/// Classified result of a single throw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Points awarded for this hit
    pub points: u32,
    /// Display label such as "T20", "DBULL", "MISS"
    pub label: String,
    /// Face value of the wedge hit (None for bulls/miss)
    pub wedge: Option<u8>,
    /// Wedge index 0..=19 (None for bulls/miss)
    pub wedge_index: Option<u8>,
    /// Score multiplier: 0, 1, 2 or 3
    pub mult: u8,
    /// Radial band
    pub ring: Ring,
    /// Board-frame hit angle after offset, normalized [0, 2π) (0 for bulls/miss)
    pub angle: f32,
    /// Raw hit radius in world units
    pub radius: f32,
    /// Hit radius normalized by board radius
    pub r_norm: f32,
}

impl ScoreResult {
    fn miss(radius: f32, r_norm: f32) -> Self {
        Self {
            points: 0,
            label: "MISS".to_string(),
            wedge: None,
            wedge_index: None,
            mult: 0,
            ring: Ring::Miss,
            angle: 0.0,
            radius,
            r_norm,
        }
    }

    fn bull(ring: Ring, points: u32, radius: f32, r_norm: f32) -> Self {
        Self {
            points,
            label: ring.as_str().to_string(),
            wedge: None,
            wedge_index: None,
            mult: 0,
            ring,
            angle: 0.0,
            radius,
            r_norm,
        }
    }
}

/// Wedge index for a board angle, rounding to the nearest wedge center.
///
/// `theta` is the raw hit angle (math convention); the config's
/// `angle_offset`, `start_angle` and `direction` are applied here. A hit
/// exactly on a wedge boundary resolves to whichever wedge's center it is
/// closer to, and `theta == start_angle` (with zero offset) is always
/// index 0 in either direction.
pub fn wedge_index_from_angle(theta: f32, config: &BoardConfig) -> usize {
    let theta_adj = normalize_angle_tau(theta + config.angle_offset);
    let delta = match config.direction {
        Direction::Cw => normalize_angle_tau(config.start_angle - theta_adj),
        Direction::Ccw => normalize_angle_tau(theta_adj - config.start_angle),
    };
    let wedge = config.wedge_angle();
    (((delta + wedge / 2.0) / wedge).floor() as usize) % SEGMENTS
}

/// Classify a board-local hit coordinate into a [`ScoreResult`].
///
/// Ring bands are checked in fixed precedence order - miss, double bull,
/// single bull, double, triple, single - with the config's tolerance added
/// to each band edge. Bands may overlap by up to the tolerance, so the order
/// IS the tie-break policy: a hit within tolerance of both the outer rim and
/// the double band resolves as a double, not a miss.
pub fn score_from_board_xy(x: f32, y: f32, config: &BoardConfig) -> ScoreResult {
    if !x.is_finite() || !y.is_finite() || !config.is_classifiable() {
        return ScoreResult::miss(0.0, 0.0);
    }

    let radius = (x * x + y * y).sqrt();
    let r_norm = if config.board_radius.is_finite() && config.board_radius > 0.0 {
        radius / config.board_radius
    } else {
        radius
    };

    let ratios = &config.ring_ratios;
    let eps = config.ring_eps_n;

    if r_norm > ratios.outer + eps {
        return ScoreResult::miss(radius, r_norm);
    }
    if r_norm <= ratios.dbull_outer + eps {
        return ScoreResult::bull(Ring::Dbull, config.dbull_points, radius, r_norm);
    }
    if r_norm <= ratios.bull_outer + eps {
        return ScoreResult::bull(Ring::Sbull, config.bull_points, radius, r_norm);
    }

    let ring = if r_norm >= ratios.double_inner - eps && r_norm <= ratios.double_outer + eps {
        Ring::Double
    } else if r_norm >= ratios.triple_inner - eps && r_norm <= ratios.triple_outer + eps {
        Ring::Triple
    } else {
        Ring::Single
    };

    let theta = y.atan2(x);
    let theta_adj = normalize_angle_tau(theta + config.angle_offset);
    let index = wedge_index_from_angle(theta, config);
    let wedge = config.numbers[index];
    let mult = ring.multiplier();
    let points = u32::from(wedge) * u32::from(mult);

    let prefix = match mult {
        1 => "S",
        2 => "D",
        _ => "T",
    };

    ScoreResult {
        points,
        label: format!("{}{}", prefix, wedge),
        wedge: Some(wedge),
        wedge_index: Some(index as u8),
        mult,
        ring,
        angle: theta_adj,
        radius,
        r_norm,
    }
}

/// One-line HUD string for a classified hit, e.g. `"T20 (+60)"`.
pub fn format_hit_for_hud(result: &ScoreResult) -> String {
    format!("{} (+{})", result.label, result.points)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn at_angle(r_norm: f32, theta: f32, config: &BoardConfig) -> ScoreResult {
        let r = r_norm * config.board_radius;
        score_from_board_xy(r * theta.cos(), r * theta.sin(), config)
    }

    #[test]
    fn test_center_is_double_bull() {
        let config = BoardConfig::default();
        let result = score_from_board_xy(0.0, 0.0, &config);
        assert_eq!(result.ring, Ring::Dbull);
        assert_eq!(result.points, 50);
        assert_eq!(result.label, "DBULL");
        assert_eq!(result.wedge, None);
        assert_eq!(result.mult, 0);
        assert_eq!(result.angle, 0.0);
    }

    #[test]
    fn test_single_bull_band() {
        let config = BoardConfig::default();
        let result = at_angle(0.07, 1.0, &config);
        assert_eq!(result.ring, Ring::Sbull);
        assert_eq!(result.points, 25);
        assert_eq!(result.label, "SBULL");
    }

    #[test]
    fn test_top_wedge_rings() {
        let config = BoardConfig::default();

        // Wedge 0 carries the 20 and is centered at +y
        let single = at_angle(0.3, FRAC_PI_2, &config);
        assert_eq!(single.ring, Ring::Single);
        assert_eq!(single.label, "S20");
        assert_eq!(single.points, 20);

        let triple = at_angle(0.6, FRAC_PI_2, &config);
        assert_eq!(triple.ring, Ring::Triple);
        assert_eq!(triple.label, "T20");
        assert_eq!(triple.points, 60);
        assert_eq!(triple.mult, 3);

        let double = at_angle(0.98, FRAC_PI_2, &config);
        assert_eq!(double.ring, Ring::Double);
        assert_eq!(double.label, "D20");
        assert_eq!(double.points, 40);
    }

    #[test]
    fn test_miss_beyond_rim() {
        let config = BoardConfig::default();
        let result = at_angle(1.2, 0.3, &config);
        assert_eq!(result.ring, Ring::Miss);
        assert_eq!(result.points, 0);
        assert_eq!(result.wedge, None);
        assert!((result.r_norm - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_rim_tolerance_resolves_as_double() {
        // Within eps of both the rim and the double band: precedence says
        // double, not miss.
        let config = BoardConfig::default();
        let r_norm = config.ring_ratios.outer + config.ring_eps_n * 0.8;
        let result = at_angle(r_norm, FRAC_PI_2, &config);
        assert_eq!(result.ring, Ring::Double);
        assert_eq!(result.label, "D20");
    }

    #[test]
    fn test_clockwise_neighbors_of_twenty() {
        let config = BoardConfig::default();
        let w = config.wedge_angle();

        // One wedge clockwise of the 20 sits the 1
        let cw = at_angle(0.3, FRAC_PI_2 - w, &config);
        assert_eq!(cw.label, "S1");

        // One wedge counter-clockwise sits the 5
        let ccw = at_angle(0.3, FRAC_PI_2 + w, &config);
        assert_eq!(ccw.label, "S5");
    }

    #[test]
    fn test_wedge_index_at_start_angle_is_zero() {
        let mut config = BoardConfig::default();
        assert_eq!(wedge_index_from_angle(config.start_angle, &config), 0);

        config.direction = Direction::Ccw;
        assert_eq!(wedge_index_from_angle(config.start_angle, &config), 0);
    }

    #[test]
    fn test_wedge_boundary_rounds_to_nearest_center() {
        let config = BoardConfig::default();
        let w = config.wedge_angle();

        // 0.4 wedge widths off center: still wedge 0
        let near = wedge_index_from_angle(config.start_angle - 0.4 * w, &config);
        assert_eq!(near, 0);

        // 0.6 wedge widths off center: clockwise neighbor
        let next = wedge_index_from_angle(config.start_angle - 0.6 * w, &config);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_angle_offset_shifts_wedges() {
        let mut config = BoardConfig::default();
        let w = config.wedge_angle();
        config.angle_offset = w;

        // Rotating hits counter-clockwise by one wedge makes a hit at the
        // old wedge-0 center land one wedge counter-clockwise of it.
        let index = wedge_index_from_angle(config.start_angle, &config);
        assert_eq!(index, SEGMENTS - 1);
    }

    #[test]
    fn test_ccw_direction_reverses_order() {
        let mut config = BoardConfig::default();
        config.direction = Direction::Ccw;
        let w = config.wedge_angle();

        let index = wedge_index_from_angle(config.start_angle + w, &config);
        assert_eq!(index, 1);
    }

    #[test]
    fn test_non_finite_input_is_miss() {
        let config = BoardConfig::default();
        for (x, y) in [(f32::NAN, 0.0), (0.1, f32::INFINITY), (f32::NEG_INFINITY, f32::NAN)] {
            let result = score_from_board_xy(x, y, &config);
            assert_eq!(result.ring, Ring::Miss);
            assert_eq!(result.points, 0);
        }
    }

    #[test]
    fn test_degraded_config_is_miss() {
        let mut config = BoardConfig::default();
        config.ring_ratios.triple_inner = f32::NAN;
        let result = score_from_board_xy(0.0, 0.0, &config);
        assert_eq!(result.ring, Ring::Miss);
        assert_eq!(result.points, 0);
    }

    #[test]
    fn test_invalid_board_radius_skips_normalization() {
        let mut config = BoardConfig::default();
        config.board_radius = f32::NAN;
        // Raw radius 0.6 falls in the triple band un-normalized
        let result = score_from_board_xy(0.0, 0.6, &config);
        assert_eq!(result.ring, Ring::Triple);
        assert!((result.r_norm - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_hud_formatting() {
        let config = BoardConfig::default();
        let triple = at_angle(0.6, FRAC_PI_2, &config);
        assert_eq!(format_hit_for_hud(&triple), "T20 (+60)");

        let miss = at_angle(2.0, 0.0, &config);
        assert_eq!(format_hit_for_hud(&miss), "MISS (+0)");

        let bull = score_from_board_xy(0.0, 0.0, &config);
        assert_eq!(format_hit_for_hud(&bull), "DBULL (+50)");
    }

    proptest! {
        #[test]
        fn prop_wedge_always_in_face_values(x in -2.0f32..2.0, y in -2.0f32..2.0) {
            let config = BoardConfig::default();
            let result = score_from_board_xy(x, y, &config);
            if let Some(wedge) = result.wedge {
                prop_assert!((1..=20).contains(&wedge));
                prop_assert_eq!(result.points, u32::from(wedge) * u32::from(result.mult));
                prop_assert!(result.wedge_index.unwrap() < 20);
            } else {
                prop_assert_eq!(result.mult, 0);
            }
            prop_assert!(matches!(result.mult, 0 | 1 | 2 | 3));
        }

        #[test]
        fn prop_inner_bull_always_dbull(theta in 0.0f32..std::f32::consts::TAU) {
            let config = BoardConfig::default();
            // Anywhere strictly inside the inner bull
            let r = config.ring_ratios.dbull_outer * 0.99 * config.board_radius;
            let result = score_from_board_xy(r * theta.cos(), r * theta.sin(), &config);
            prop_assert_eq!(result.ring, Ring::Dbull);
            prop_assert_eq!(result.points, config.dbull_points);
        }

        #[test]
        fn prop_total_for_arbitrary_floats(x in proptest::num::f32::ANY, y in proptest::num::f32::ANY) {
            let config = BoardConfig::default();
            // Must classify (possibly as MISS) without panicking
            let result = score_from_board_xy(x, y, &config);
            prop_assert!(matches!(result.mult, 0 | 1 | 2 | 3));
        }
    }
}
