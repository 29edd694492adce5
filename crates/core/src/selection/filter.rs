//! Hard-constraint filtering of one gearbox family.
//!
//! Every record is assessed independently and ends in exactly one state:
//! a hard match, a near match (failed a constraint inside the extended band),
//! or excluded. Each record that is not a hard match tallies one rejection
//! category, so the statistics always sum to the number of rejected records.

use crate::domain::gearbox::GearboxRecord;
use crate::domain::requirements::RequirementSet;
use crate::domain::selection::{RejectionReason, RejectionStatistics};
use crate::selection::Tolerances;

/// Figures derived for a record at its selected ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateMetrics {
    pub ratio_index: usize,
    pub selected_ratio: f64,
    pub selected_capacity: f64,
    pub ratio_deviation_pct: f64,
    pub capacity_margin_pct: f64,
    pub thrust_satisfied: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssessmentStatus {
    Hard,
    Near(RejectionReason),
    Excluded(RejectionReason),
}

impl AssessmentStatus {
    pub fn reason(&self) -> Option<RejectionReason> {
        match self {
            Self::Hard => None,
            Self::Near(reason) | Self::Excluded(reason) => Some(*reason),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assessment<'a> {
    pub record: &'a GearboxRecord,
    pub status: AssessmentStatus,
    /// `None` when the record has no usable ratio or capacity.
    pub metrics: Option<CandidateMetrics>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct FamilyFilter<'a> {
    pub assessments: Vec<Assessment<'a>>,
    pub statistics: RejectionStatistics,
}

impl<'a> FamilyFilter<'a> {
    pub fn hard_matches(&self) -> impl Iterator<Item = &Assessment<'a>> {
        self.assessments.iter().filter(|assessment| assessment.status == AssessmentStatus::Hard)
    }

    pub fn near_matches(&self) -> impl Iterator<Item = &Assessment<'a>> {
        self.assessments
            .iter()
            .filter(|assessment| matches!(assessment.status, AssessmentStatus::Near(_)))
    }

    pub fn hard_match_count(&self) -> usize {
        self.hard_matches().count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.assessments.iter().flat_map(|assessment| assessment.warnings.iter())
    }
}

pub fn filter_family<'a>(
    records: &'a [GearboxRecord],
    requirements: &RequirementSet,
    tolerances: &Tolerances,
) -> FamilyFilter<'a> {
    let mut filter = FamilyFilter::default();

    for record in records {
        let assessment = assess(record, requirements, tolerances);
        if let Some(reason) = assessment.status.reason() {
            tracing::debug!(
                event_name = "selection.record.rejected",
                model = %record.model,
                reason = %reason,
                near = matches!(assessment.status, AssessmentStatus::Near(_)),
                "gearbox did not pass every hard constraint"
            );
            filter.statistics.record(reason);
        }
        filter.assessments.push(assessment);
    }

    filter
}

/// Runs every constraint in order; the first exclusion wins, otherwise the first near miss.
pub fn assess<'a>(
    record: &'a GearboxRecord,
    requirements: &RequirementSet,
    tolerances: &Tolerances,
) -> Assessment<'a> {
    let mut verdict = Verdict::default();
    let mut warnings = Vec::new();

    match record.input_speed_range {
        Some(range) if !range.contains(requirements.input_speed_rpm) => {
            verdict.exclude(RejectionReason::SpeedOutOfRange);
        }
        Some(_) => {}
        None => {
            malformed(record, "input speed range missing or malformed; speed check skipped");
            warnings.push(format!(
                "{}: input speed range unavailable, speed check skipped",
                record.model
            ));
        }
    }

    let closest = closest_ratio(record, requirements.target_ratio);
    let Some((ratio_index, selected_ratio, deviation)) = closest else {
        malformed(record, "no usable reduction ratio");
        verdict.exclude(RejectionReason::MalformedRecord);
        return verdict.into_assessment(record, None, warnings);
    };

    if deviation > tolerances.ratio_near_tolerance {
        verdict.exclude(RejectionReason::RatioOutOfRange);
    } else if deviation > tolerances.ratio_tolerance {
        verdict.near(RejectionReason::RatioOutOfRange);
    }

    let aligned = record.has_aligned_capacity();
    if !aligned {
        malformed(record, "ratio and transfer capacity lists differ in length");
        warnings.push(format!(
            "{}: ratio and capacity data are misaligned, using best-effort capacity",
            record.model
        ));
    }
    let usable = |capacity: &f64| capacity.is_finite() && *capacity > 0.0;
    let capacity = match record.transfer_capacity.get(ratio_index).copied().filter(usable) {
        Some(capacity) => Some(capacity),
        None => {
            if aligned {
                malformed(record, "transfer capacity at the selected ratio is unusable");
                warnings.push(format!(
                    "{}: capacity at ratio {selected_ratio} is unusable, \
                     using the first capacity entry",
                    record.model
                ));
            }
            record.transfer_capacity.first().copied().filter(usable)
        }
    };
    let Some(selected_capacity) = capacity else {
        malformed(record, "no usable transfer capacity");
        verdict.exclude(RejectionReason::MalformedRecord);
        return verdict.into_assessment(record, None, warnings);
    };

    let required = requirements.required_capacity();
    if selected_capacity < required {
        if selected_capacity >= tolerances.capacity_near_floor * required {
            verdict.near(RejectionReason::InsufficientCapacity);
        } else {
            verdict.exclude(RejectionReason::InsufficientCapacity);
        }
    }

    let capacity_margin_pct = (selected_capacity / required - 1.0) * 100.0;
    if capacity_margin_pct > tolerances.max_capacity_margin_pct {
        let near_limit =
            tolerances.max_capacity_margin_pct * tolerances.capacity_margin_near_factor;
        if capacity_margin_pct <= near_limit {
            verdict.near(RejectionReason::ExcessiveCapacityMargin);
        } else {
            verdict.exclude(RejectionReason::ExcessiveCapacityMargin);
        }
    }

    let rated_thrust = record.thrust_kn.filter(|thrust| thrust.is_finite() && *thrust > 0.0);
    let thrust_satisfied = match requirements.thrust_demand() {
        None => true,
        Some(demand) => match rated_thrust {
            None => {
                verdict.exclude(RejectionReason::MissingThrustData);
                false
            }
            Some(thrust) if thrust >= demand => true,
            Some(thrust) => {
                if thrust >= tolerances.thrust_near_floor * demand {
                    verdict.near(RejectionReason::InsufficientThrust);
                } else {
                    verdict.exclude(RejectionReason::InsufficientThrust);
                }
                false
            }
        },
    };

    let metrics = CandidateMetrics {
        ratio_index,
        selected_ratio,
        selected_capacity,
        ratio_deviation_pct: deviation * 100.0,
        capacity_margin_pct,
        thrust_satisfied,
    };
    verdict.into_assessment(record, Some(metrics), warnings)
}

/// Index, value and relative deviation of the usable ratio closest to the target.
fn closest_ratio(record: &GearboxRecord, target: f64) -> Option<(usize, f64, f64)> {
    record
        .ratios
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, ratio)| ratio.is_finite() && *ratio > 0.0)
        .map(|(index, ratio)| (index, ratio, (ratio - target).abs() / target))
        .fold(None, |best: Option<(usize, f64, f64)>, current| match best {
            Some(best) if best.2 <= current.2 => Some(best),
            _ => Some(current),
        })
}

fn malformed(record: &GearboxRecord, detail: &str) {
    tracing::warn!(
        event_name = "selection.record.malformed",
        model = %record.model,
        detail,
        "malformed gearbox record"
    );
}

#[derive(Default)]
struct Verdict {
    excluded: Option<RejectionReason>,
    near: Option<RejectionReason>,
}

impl Verdict {
    fn exclude(&mut self, reason: RejectionReason) {
        self.excluded.get_or_insert(reason);
    }

    fn near(&mut self, reason: RejectionReason) {
        self.near.get_or_insert(reason);
    }

    fn into_assessment<'a>(
        self,
        record: &'a GearboxRecord,
        metrics: Option<CandidateMetrics>,
        warnings: Vec<String>,
    ) -> Assessment<'a> {
        let status = match (self.excluded, self.near) {
            (Some(reason), _) => AssessmentStatus::Excluded(reason),
            (None, Some(reason)) => AssessmentStatus::Near(reason),
            (None, None) => AssessmentStatus::Hard,
        };
        Assessment { record, status, metrics, warnings }
    }
}
