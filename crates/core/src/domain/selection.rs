use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::coupling::{
    CouplingRecommendation, CouplingRecord, RecommendationMatch, TorqueSource,
};
use crate::domain::gearbox::GearboxRecord;
use crate::domain::pump::PumpRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Satisfies every hard constraint.
    Hard,
    /// Fails a hard constraint but stays inside the extended tolerance band.
    Near,
    /// Fails beyond tolerance; only reported by single-candidate evaluation.
    Excluded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    SpeedOutOfRange,
    RatioOutOfRange,
    InsufficientCapacity,
    ExcessiveCapacityMargin,
    InsufficientThrust,
    MissingThrustData,
    MalformedRecord,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeedOutOfRange => "input speed out of range",
            Self::RatioOutOfRange => "ratio out of range",
            Self::InsufficientCapacity => "insufficient capacity",
            Self::ExcessiveCapacityMargin => "excessive capacity margin",
            Self::InsufficientThrust => "insufficient thrust",
            Self::MissingThrustData => "missing thrust data",
            Self::MalformedRecord => "malformed record",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of records that did not make the hard-match set, by first failing constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionStatistics {
    pub speed_out_of_range: usize,
    pub ratio_out_of_range: usize,
    pub insufficient_capacity: usize,
    pub excessive_capacity_margin: usize,
    pub insufficient_thrust: usize,
    pub missing_thrust_data: usize,
    pub malformed_record: usize,
}

impl RejectionStatistics {
    pub fn record(&mut self, reason: RejectionReason) {
        *self.slot(reason) += 1;
    }

    pub fn count(&self, reason: RejectionReason) -> usize {
        match reason {
            RejectionReason::SpeedOutOfRange => self.speed_out_of_range,
            RejectionReason::RatioOutOfRange => self.ratio_out_of_range,
            RejectionReason::InsufficientCapacity => self.insufficient_capacity,
            RejectionReason::ExcessiveCapacityMargin => self.excessive_capacity_margin,
            RejectionReason::InsufficientThrust => self.insufficient_thrust,
            RejectionReason::MissingThrustData => self.missing_thrust_data,
            RejectionReason::MalformedRecord => self.malformed_record,
        }
    }

    pub fn total(&self) -> usize {
        self.speed_out_of_range
            + self.ratio_out_of_range
            + self.insufficient_capacity
            + self.excessive_capacity_margin
            + self.insufficient_thrust
            + self.missing_thrust_data
            + self.malformed_record
    }

    pub fn merge(&mut self, other: &RejectionStatistics) {
        self.speed_out_of_range += other.speed_out_of_range;
        self.ratio_out_of_range += other.ratio_out_of_range;
        self.insufficient_capacity += other.insufficient_capacity;
        self.excessive_capacity_margin += other.excessive_capacity_margin;
        self.insufficient_thrust += other.insufficient_thrust;
        self.missing_thrust_data += other.missing_thrust_data;
        self.malformed_record += other.malformed_record;
    }

    /// Human-readable breakdown of the non-zero categories, e.g. `ratio out of range: 3`.
    pub fn summary(&self) -> String {
        const ORDER: [RejectionReason; 7] = [
            RejectionReason::SpeedOutOfRange,
            RejectionReason::RatioOutOfRange,
            RejectionReason::InsufficientCapacity,
            RejectionReason::ExcessiveCapacityMargin,
            RejectionReason::InsufficientThrust,
            RejectionReason::MissingThrustData,
            RejectionReason::MalformedRecord,
        ];
        ORDER
            .iter()
            .filter(|reason| self.count(**reason) > 0)
            .map(|reason| format!("{reason}: {}", self.count(*reason)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn slot(&mut self, reason: RejectionReason) -> &mut usize {
        match reason {
            RejectionReason::SpeedOutOfRange => &mut self.speed_out_of_range,
            RejectionReason::RatioOutOfRange => &mut self.ratio_out_of_range,
            RejectionReason::InsufficientCapacity => &mut self.insufficient_capacity,
            RejectionReason::ExcessiveCapacityMargin => &mut self.excessive_capacity_margin,
            RejectionReason::InsufficientThrust => &mut self.insufficient_thrust,
            RejectionReason::MissingThrustData => &mut self.missing_thrust_data,
            RejectionReason::MalformedRecord => &mut self.malformed_record,
        }
    }
}

/// Points awarded per gearbox criterion (weights 40 / 30 / 20 / 10).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GearboxScoreBreakdown {
    pub capacity_margin: f64,
    pub ratio_match: f64,
    pub cost_effectiveness: f64,
    pub thrust_match: f64,
}

impl GearboxScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.capacity_margin + self.ratio_match + self.cost_effectiveness + self.thrust_match
    }
}

/// A gearbox record augmented with its selection metrics and score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: GearboxRecord,
    /// Family the record came from; set by the cross-series run and by family selection.
    pub family: Option<String>,
    pub selected_ratio: f64,
    pub selected_capacity: f64,
    pub required_capacity: f64,
    pub capacity_margin_pct: f64,
    pub ratio_deviation_pct: f64,
    pub thrust_satisfied: bool,
    pub score: u8,
    pub breakdown: GearboxScoreBreakdown,
    pub match_kind: MatchKind,
    pub rejection_reason: Option<RejectionReason>,
    pub factory_price: Option<Decimal>,
}

impl ScoredCandidate {
    pub fn model(&self) -> &str {
        &self.record.model
    }

    pub fn is_near_match(&self) -> bool {
        self.match_kind == MatchKind::Near
    }
}

/// Points awarded per coupling criterion (weights 25 / 30 / 15 / 20 / 10).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CouplingScoreBreakdown {
    pub torque_margin: f64,
    pub recommendation: f64,
    pub speed_margin: f64,
    pub price: f64,
    pub weight: f64,
}

impl CouplingScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.torque_margin + self.recommendation + self.speed_margin + self.price + self.weight
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCoupling {
    pub record: CouplingRecord,
    pub torque_knm: f64,
    pub torque_source: TorqueSource,
    pub max_speed_rpm: Option<f64>,
    pub torque_margin_pct: f64,
    pub speed_margin_pct: Option<f64>,
    pub recommendation_match: RecommendationMatch,
    pub score: u8,
    pub breakdown: CouplingScoreBreakdown,
    pub factory_price: Option<Decimal>,
    pub market_price: Option<Decimal>,
}

impl ScoredCoupling {
    pub fn model(&self) -> &str {
        &self.record.model
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingRejections {
    pub unresolved_torque: usize,
    pub insufficient_torque: usize,
    pub insufficient_speed: usize,
    pub missing_cover: usize,
}

impl CouplingRejections {
    pub fn total(&self) -> usize {
        self.unresolved_torque
            + self.insufficient_torque
            + self.insufficient_speed
            + self.missing_cover
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingSelection {
    pub gearbox_model: String,
    pub required_torque_knm: f64,
    pub work_factor: f64,
    pub temperature_factor: f64,
    pub recommendation: CouplingRecommendation,
    pub best: Option<ScoredCoupling>,
    pub ranked: Vec<ScoredCoupling>,
    /// Models excluded because no resolver could establish their rated torque.
    pub unresolved_models: Vec<String>,
    pub rejections: CouplingRejections,
    pub warnings: Vec<String>,
    pub message: String,
}

impl CouplingSelection {
    pub fn is_success(&self) -> bool {
        self.best.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpMatch {
    /// The compatibility reference named this pump.
    Recommended,
    /// No recommendation resolved; first pump with a plausible flow.
    FlowFallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PumpSelection {
    pub gearbox_model: String,
    pub recommended_model: Option<String>,
    pub pump: Option<PumpRecord>,
    pub match_kind: Option<PumpMatch>,
    pub factory_price: Option<Decimal>,
    pub warnings: Vec<String>,
    pub message: String,
}

impl PumpSelection {
    pub fn is_success(&self) -> bool {
        self.pump.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// At least one hard match.
    Success,
    /// No hard match, at least one near match.
    Degraded,
    /// Neither.
    Empty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub success: bool,
    pub outcome: SelectionOutcome,
    /// Family searched, or `None` for a cross-series run.
    pub family: Option<String>,
    pub message: String,
    pub best_candidate: Option<ScoredCandidate>,
    pub ranked_candidates: Vec<ScoredCandidate>,
    pub coupling: Option<CouplingSelection>,
    pub pump: Option<PumpSelection>,
    pub engine_torque_nm: f64,
    pub required_capacity: f64,
    pub warnings: Vec<String>,
    pub rejection_statistics: RejectionStatistics,
    /// Rejection statistics keyed by family name.
    pub family_statistics: BTreeMap<String, RejectionStatistics>,
}

impl SelectionResult {
    /// All warnings joined into one advisory line.
    pub fn warning(&self) -> Option<String> {
        (!self.warnings.is_empty()).then(|| self.warnings.join("; "))
    }
}
