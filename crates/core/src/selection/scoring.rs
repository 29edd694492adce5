//! Point bands and survivor-relative normalisation for candidate scoring.
//!
//! Gearbox scores weigh capacity margin 40, ratio closeness 30,
//! cost-effectiveness 20 and thrust 10. Coupling scores weigh torque margin 25,
//! recommendation 30, speed margin 15, price 20 and weight 10. Totals are
//! rounded and clamped to 0..=100.

use crate::domain::coupling::RecommendationMatch;
use crate::domain::selection::{CouplingScoreBreakdown, GearboxScoreBreakdown};
use crate::selection::filter::CandidateMetrics;

pub const COST_EFFECTIVENESS_WEIGHT: f64 = 20.0;
pub const THRUST_WEIGHT: f64 = 10.0;
pub const COUPLING_PRICE_WEIGHT: f64 = 20.0;
pub const COUPLING_WEIGHT_WEIGHT: f64 = 10.0;

/// Peak at 5–20 %; tight margins beat oversizing; undersized scores lowest.
pub fn capacity_margin_points(margin_pct: f64) -> f64 {
    if margin_pct < 0.0 {
        10.0
    } else if margin_pct < 5.0 {
        30.0
    } else if margin_pct <= 20.0 {
        40.0
    } else if margin_pct <= 35.0 {
        35.0
    } else if margin_pct <= 70.0 {
        25.0
    } else {
        15.0
    }
}

pub fn ratio_points(deviation_pct: f64) -> f64 {
    if deviation_pct < 3.0 {
        30.0
    } else if deviation_pct < 8.0 {
        24.0
    } else if deviation_pct < 13.0 {
        18.0
    } else if deviation_pct < 18.0 {
        12.0
    } else if deviation_pct <= 25.0 {
        6.0
    } else {
        0.0
    }
}

pub fn thrust_points(thrust_satisfied: bool) -> f64 {
    if thrust_satisfied {
        THRUST_WEIGHT
    } else {
        0.0
    }
}

pub fn torque_margin_points(margin_pct: f64) -> f64 {
    if (10.0..=30.0).contains(&margin_pct) {
        25.0
    } else if margin_pct > 30.0 && margin_pct <= 50.0 {
        20.0
    } else if margin_pct > 50.0 {
        15.0
    } else if (5.0..10.0).contains(&margin_pct) {
        18.0
    } else if (0.0..5.0).contains(&margin_pct) {
        10.0
    } else {
        0.0
    }
}

pub fn recommendation_points(recommendation: RecommendationMatch) -> f64 {
    match recommendation {
        RecommendationMatch::Exact => 30.0,
        RecommendationMatch::Prefix => 20.0,
        RecommendationMatch::None => 5.0,
    }
}

/// Unknown maximum speed earns nothing.
pub fn speed_margin_points(margin_pct: Option<f64>) -> f64 {
    match margin_pct {
        Some(margin) if (0.0..=20.0).contains(&margin) => 15.0,
        Some(margin) if margin > 20.0 && margin <= 50.0 => 12.0,
        Some(margin) if margin > 50.0 => 8.0,
        _ => 0.0,
    }
}

/// Min-max normalisation where lower values earn more points.
///
/// Entries without positive data score zero. When every entry with data holds
/// the same value (including a single survivor) each earns the full weight.
pub fn normalize_lower_is_better(values: &[Option<f64>], weight: f64) -> Vec<f64> {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|value| value.is_finite() && *value > 0.0)
        .collect();
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    values
        .iter()
        .map(|value| match value {
            Some(value) if value.is_finite() && *value > 0.0 => {
                if max > min {
                    weight * (max - value) / (max - min)
                } else {
                    weight
                }
            }
            _ => 0.0,
        })
        .collect()
}

pub fn total_score(points: f64) -> u8 {
    points.round().clamp(0.0, 100.0) as u8
}

/// Scores one gearbox; `cost_points` comes from normalising across the survivor set.
pub fn gearbox_breakdown(metrics: &CandidateMetrics, cost_points: f64) -> GearboxScoreBreakdown {
    GearboxScoreBreakdown {
        capacity_margin: capacity_margin_points(metrics.capacity_margin_pct),
        ratio_match: ratio_points(metrics.ratio_deviation_pct),
        cost_effectiveness: cost_points,
        thrust_match: thrust_points(metrics.thrust_satisfied),
    }
}

pub fn coupling_breakdown(
    torque_margin_pct: f64,
    recommendation: RecommendationMatch,
    speed_margin_pct: Option<f64>,
    price_points: f64,
    weight_points: f64,
) -> CouplingScoreBreakdown {
    CouplingScoreBreakdown {
        torque_margin: torque_margin_points(torque_margin_pct),
        recommendation: recommendation_points(recommendation),
        speed_margin: speed_margin_points(speed_margin_pct),
        price: price_points,
        weight: weight_points,
    }
}
