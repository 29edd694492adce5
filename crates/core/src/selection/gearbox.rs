use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;

use crate::catalog::AccessoryCatalogs;
use crate::domain::gearbox::{GearboxRecord, ProductFamily};
use crate::domain::requirements::RequirementSet;
use crate::domain::selection::{
    CouplingSelection, GearboxScoreBreakdown, MatchKind, PumpSelection, RejectionStatistics,
    ScoredCandidate, SelectionOutcome, SelectionResult,
};
use crate::errors::DomainError;
use crate::pricing::PriceSource;
use crate::reference::CompatibilityReference;
use crate::selection::filter::{self, Assessment, AssessmentStatus, FamilyFilter};
use crate::selection::ranking::Ranking;
use crate::selection::scoring::{self, COST_EFFECTIVENESS_WEIGHT};
use crate::selection::Tolerances;
use crate::units::TorqueNormalizer;

/// Borrowed collaborators for one selection call.
pub struct SelectionEngine<'a> {
    pub tolerances: &'a Tolerances,
    pub reference: &'a dyn CompatibilityReference,
    pub pricing: &'a dyn PriceSource,
    pub normalizer: &'a TorqueNormalizer,
}

/// Ranked outcome of one family before accessory selection.
#[derive(Clone, Debug, PartialEq)]
pub struct FamilyRun {
    pub family: String,
    pub outcome: SelectionOutcome,
    /// Hard matches when there are any, otherwise near matches.
    pub ranked: Vec<ScoredCandidate>,
    pub statistics: RejectionStatistics,
    pub warnings: Vec<String>,
}

impl SelectionEngine<'_> {
    pub fn select_from_family(
        &self,
        requirements: &RequirementSet,
        family: &ProductFamily,
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError> {
        requirements.validate()?;
        if family.is_empty() {
            return Err(DomainError::invalid(
                "family",
                format!("catalog family `{}` has no records", family.name),
            ));
        }

        let run = self.run_family(requirements, family);
        let mut warnings = run.warnings.clone();
        let message = family_message(&run);

        let (coupling, pump) = match run.ranked.first() {
            Some(best) => {
                warnings.extend(best_candidate_warnings(best, self.tolerances));
                let (coupling, pump) = self.select_accessories(best, requirements, accessories);
                (Some(coupling), Some(pump))
            }
            None => (None, None),
        };

        Ok(SelectionResult {
            success: run.outcome == SelectionOutcome::Success,
            outcome: run.outcome,
            family: Some(run.family.clone()),
            message,
            best_candidate: run.ranked.first().cloned(),
            engine_torque_nm: requirements.engine_torque_nm(),
            required_capacity: requirements.required_capacity(),
            warnings,
            rejection_statistics: run.statistics.clone(),
            family_statistics: BTreeMap::from([(run.family, run.statistics)]),
            ranked_candidates: run.ranked,
            coupling,
            pump,
        })
    }

    /// Filter, score and rank one family. Inputs are assumed validated.
    pub fn run_family(&self, requirements: &RequirementSet, family: &ProductFamily) -> FamilyRun {
        let filtered = filter::filter_family(&family.records, requirements, self.tolerances);
        let hard: Vec<&Assessment<'_>> = filtered.hard_matches().collect();

        let (outcome, pool, match_kind) = if !hard.is_empty() {
            (SelectionOutcome::Success, hard, MatchKind::Hard)
        } else {
            let near: Vec<&Assessment<'_>> = filtered.near_matches().collect();
            let outcome =
                if near.is_empty() { SelectionOutcome::Empty } else { SelectionOutcome::Degraded };
            (outcome, near, MatchKind::Near)
        };

        let scored = self.score_pool(&pool, requirements, Some(&family.name), match_kind);
        let ranked = Ranking::rank(scored, self.tolerances.ideal_capacity_margin_pct).into_vec();

        let mut warnings: Vec<String> = filtered.warnings().cloned().collect();
        if outcome == SelectionOutcome::Degraded {
            warnings.push(degraded_warning(&family.name, ranked.len(), &filtered));
        }

        tracing::info!(
            event_name = "selection.family.completed",
            family = %family.name,
            outcome = ?outcome,
            records = family.records.len(),
            candidates = ranked.len(),
            rejected = filtered.statistics.total(),
            best = ranked.first().map(|candidate| candidate.model()).unwrap_or("-"),
            "gearbox family evaluated"
        );

        FamilyRun {
            family: family.name.clone(),
            outcome,
            ranked,
            statistics: filtered.statistics,
            warnings,
        }
    }

    pub fn evaluate_single_candidate(
        &self,
        candidate: &GearboxRecord,
        requirements: &RequirementSet,
    ) -> Result<ScoredCandidate, DomainError> {
        requirements.validate()?;

        let assessment = filter::assess(candidate, requirements, self.tolerances);
        let match_kind = match assessment.status {
            AssessmentStatus::Hard => MatchKind::Hard,
            AssessmentStatus::Near(_) => MatchKind::Near,
            AssessmentStatus::Excluded(_) => MatchKind::Excluded,
        };
        self.score_pool(&[&assessment], requirements, None, match_kind)
            .pop()
            .ok_or_else(|| {
                let message = format!("no score produced for {}", candidate.model);
                DomainError::InvariantViolation(message)
            })
    }

    pub fn select_accessories(
        &self,
        best: &ScoredCandidate,
        requirements: &RequirementSet,
        accessories: AccessoryCatalogs<'_>,
    ) -> (CouplingSelection, PumpSelection) {
        let coupling = self.select_coupling(best.model(), requirements, accessories.couplings);
        let pump = self.select_pump(best.model(), accessories.pumps);
        (coupling, pump)
    }

    fn score_pool(
        &self,
        pool: &[&Assessment<'_>],
        requirements: &RequirementSet,
        family: Option<&str>,
        match_kind: MatchKind,
    ) -> Vec<ScoredCandidate> {
        let prices: Vec<_> = pool
            .iter()
            .map(|assessment| self.pricing.factory_price(&assessment.record.pricing))
            .collect();
        let cost_per_capacity: Vec<Option<f64>> = pool
            .iter()
            .zip(&prices)
            .map(|(assessment, price)| {
                let metrics = assessment.metrics?;
                let price = price.and_then(|price| price.to_f64())?;
                Some(price / metrics.selected_capacity)
            })
            .collect();
        let cost_points =
            scoring::normalize_lower_is_better(&cost_per_capacity, COST_EFFECTIVENESS_WEIGHT);

        pool.iter()
            .zip(prices)
            .zip(cost_points)
            .map(|((assessment, factory_price), cost_points)| {
                let record = assessment.record.clone();
                let rejection_reason = assessment.status.reason();
                let family = family.map(str::to_string);
                let required_capacity = requirements.required_capacity();

                match assessment.metrics {
                    Some(metrics) => {
                        let breakdown = scoring::gearbox_breakdown(&metrics, cost_points);
                        ScoredCandidate {
                            record,
                            family,
                            selected_ratio: metrics.selected_ratio,
                            selected_capacity: metrics.selected_capacity,
                            required_capacity,
                            capacity_margin_pct: metrics.capacity_margin_pct,
                            ratio_deviation_pct: metrics.ratio_deviation_pct,
                            thrust_satisfied: metrics.thrust_satisfied,
                            score: scoring::total_score(breakdown.total()),
                            breakdown,
                            match_kind,
                            rejection_reason,
                            factory_price,
                        }
                    }
                    None => ScoredCandidate {
                        record,
                        family,
                        selected_ratio: 0.0,
                        selected_capacity: 0.0,
                        required_capacity,
                        capacity_margin_pct: -100.0,
                        ratio_deviation_pct: 100.0,
                        thrust_satisfied: false,
                        score: 0,
                        breakdown: GearboxScoreBreakdown::default(),
                        match_kind,
                        rejection_reason,
                        factory_price,
                    },
                }
            })
            .collect()
    }
}

fn family_message(run: &FamilyRun) -> String {
    match (run.outcome, run.ranked.first()) {
        (SelectionOutcome::Success, Some(best)) => format!(
            "found {} matching gearbox(es) in family {}; best {} (score {})",
            run.ranked.len(),
            run.family,
            best.model(),
            best.score
        ),
        (SelectionOutcome::Degraded, Some(best)) => format!(
            "no gearbox in family {} meets every requirement; best near match {} (score {})",
            run.family,
            best.model(),
            best.score
        ),
        _ => {
            let summary = run.statistics.summary();
            if summary.is_empty() {
                format!("no suitable gearbox in family {}", run.family)
            } else {
                format!("no suitable gearbox in family {} ({summary})", run.family)
            }
        }
    }
}

fn degraded_warning(family: &str, near_matches: usize, filtered: &FamilyFilter<'_>) -> String {
    format!(
        "family {family}: no hard match, showing {near_matches} near match(es); rejections: {}",
        filtered.statistics.summary()
    )
}

pub(crate) fn best_candidate_warnings(
    best: &ScoredCandidate,
    tolerances: &Tolerances,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if best.capacity_margin_pct < 5.0 {
        warnings.push(format!(
            "{}: capacity margin {:.1}% is below 5%, little reserve for overload",
            best.model(),
            best.capacity_margin_pct
        ));
    } else if best.capacity_margin_pct > tolerances.high_margin_notice_pct {
        warnings.push(format!(
            "{}: capacity margin {:.1}% is above {}%, the gearbox is oversized",
            best.model(),
            best.capacity_margin_pct,
            tolerances.high_margin_notice_pct
        ));
    }
    if !best.thrust_satisfied {
        warnings.push(format!("{}: rated thrust does not meet the requirement", best.model()));
    }
    if let Some(reason) = best.rejection_reason {
        warnings.push(format!("{}: recommended as a near match ({reason})", best.model()));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::catalog::AccessoryCatalogs;
    use crate::domain::gearbox::{GearboxRecord, ProductFamily};
    use crate::domain::pricing::PriceFields;
    use crate::domain::requirements::RequirementSet;
    use crate::domain::selection::{MatchKind, RejectionReason, SelectionOutcome, SelectionResult};
    use crate::errors::DomainError;
    use crate::pricing::CatalogPriceSource;
    use crate::reference::ReferenceTables;
    use crate::selection::{DeterministicSelectionRuntime, SelectionRuntime, Tolerances};

    fn requirements() -> RequirementSet {
        RequirementSet::new(1000.0, 1500.0, 3.0)
    }

    fn priced(record: GearboxRecord, base: i64) -> GearboxRecord {
        record.with_pricing(PriceFields::with_base_price(Decimal::new(base, 0)))
    }

    fn select(runtime: &impl SelectionRuntime, family: &ProductFamily) -> SelectionResult {
        runtime.select_from_family(&requirements(), family, AccessoryCatalogs::default()).unwrap()
    }

    #[test]
    fn oversized_pick_carries_a_margin_notice() {
        let tolerances = Tolerances { max_capacity_margin_pct: 100.0, ..Tolerances::default() };
        let runtime = DeterministicSelectionRuntime::new(
            tolerances,
            ReferenceTables::default(),
            CatalogPriceSource::default(),
        );
        // 1.2 against 0.667 required is an 80 % margin
        let family = ProductFamily::new(
            "HC",
            vec![GearboxRecord::new("HC1200", vec![3.0], vec![1.2])],
        );

        let result = select(&runtime, &family);

        assert!(result.success);
        assert!(result.warnings.iter().any(|warning| warning.contains("80.0% is above 70%")));
    }

    #[test]
    fn exact_ratio_candidate_scores_full_capacity_points() {
        let runtime = DeterministicSelectionRuntime::default();
        let family = ProductFamily::new(
            "HC",
            vec![priced(GearboxRecord::new("HC1000", vec![3.0], vec![0.75]), 52_000)],
        );

        let result = select(&runtime, &family);

        assert!(result.success);
        let best = result.best_candidate.unwrap();
        assert!((result.required_capacity - 0.6667).abs() < 1e-4);
        assert!((best.capacity_margin_pct - 12.5).abs() < 1e-9);
        assert_eq!(best.breakdown.capacity_margin, 40.0);
        assert_eq!(best.breakdown.ratio_match, 30.0);
        assert_eq!(best.score, 100);
        assert_eq!(best.family.as_deref(), Some("HC"));
    }

    #[test]
    fn cheaper_capacity_wins_the_cost_criterion() {
        let runtime = DeterministicSelectionRuntime::default();
        let family = ProductFamily::new(
            "HC",
            vec![
                priced(GearboxRecord::new("DEAR", vec![3.0], vec![0.75]), 90_000),
                priced(GearboxRecord::new("CHEAP", vec![3.0], vec![0.75]), 40_000),
            ],
        );

        let result = select(&runtime, &family);

        let order: Vec<_> =
            result.ranked_candidates.iter().map(|candidate| candidate.model()).collect();
        assert_eq!(order, vec!["CHEAP", "DEAR"]);
        assert_eq!(result.ranked_candidates[0].breakdown.cost_effectiveness, 20.0);
        assert_eq!(result.ranked_candidates[1].breakdown.cost_effectiveness, 0.0);
    }

    #[test]
    fn no_hard_match_degrades_to_ranked_near_matches() {
        let runtime = DeterministicSelectionRuntime::default();
        let records = vec![
            GearboxRecord::new("R39", vec![3.9], vec![0.75]),
            GearboxRecord::new("R385", vec![3.85], vec![0.75]),
            GearboxRecord::new("WEAK", vec![3.0], vec![0.2]),
            GearboxRecord::new("SLOW", vec![3.0], vec![0.75]).with_speed_range(500.0, 1000.0),
        ];
        let family = ProductFamily::new("GW", records);

        let result = select(&runtime, &family);

        assert!(!result.success);
        assert_eq!(result.outcome, SelectionOutcome::Degraded);
        assert_eq!(result.ranked_candidates.len(), 2);
        assert!(result.ranked_candidates.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert!(result
            .ranked_candidates
            .iter()
            .all(|candidate| candidate.match_kind == MatchKind::Near
                && candidate.rejection_reason == Some(RejectionReason::RatioOutOfRange)));
        assert_eq!(result.rejection_statistics.total(), 4);
        assert!(result.warning().is_some());
        assert!(result.coupling.is_some());
    }

    #[test]
    fn nothing_usable_is_an_empty_outcome_not_an_error() {
        let runtime = DeterministicSelectionRuntime::default();
        let family = ProductFamily::new(
            "DT",
            vec![GearboxRecord::new("DT900", vec![9.0], vec![0.1])],
        );

        let result = select(&runtime, &family);

        assert_eq!(result.outcome, SelectionOutcome::Empty);
        assert!(result.best_candidate.is_none());
        assert!(result.coupling.is_none());
        assert!(result.message.contains("ratio out of range: 1"));
    }

    #[test]
    fn invalid_requirements_and_empty_family_fail_fast() {
        let runtime = DeterministicSelectionRuntime::default();
        let family = ProductFamily::new(
            "HC",
            vec![GearboxRecord::new("HC1000", vec![3.0], vec![0.75])],
        );

        let error = runtime
            .select_from_family(
                &RequirementSet::new(-5.0, 1500.0, 3.0),
                &family,
                AccessoryCatalogs::default(),
            )
            .unwrap_err();
        assert!(matches!(error, DomainError::InvalidInput { field: "power_kw", .. }));

        let empty = ProductFamily::new("HC", Vec::new());
        let error = runtime
            .select_from_family(&requirements(), &empty, AccessoryCatalogs::default())
            .unwrap_err();
        assert!(matches!(error, DomainError::InvalidInput { field: "family", .. }));
    }

    #[test]
    fn single_candidate_evaluation_reports_rejection() {
        let runtime = DeterministicSelectionRuntime::default();

        let record = GearboxRecord::new("HC1000", vec![3.0], vec![0.75]);
        let hard = runtime.evaluate_single_candidate(&record, &requirements()).unwrap();
        assert_eq!(hard.match_kind, MatchKind::Hard);
        assert_eq!(hard.rejection_reason, None);

        let record = GearboxRecord::new("HC1000", vec![4.2], vec![0.75]);
        let far = runtime.evaluate_single_candidate(&record, &requirements()).unwrap();
        assert_eq!(far.match_kind, MatchKind::Excluded);
        assert_eq!(far.rejection_reason, Some(RejectionReason::RatioOutOfRange));
        assert_eq!(far.breakdown.ratio_match, 0.0);

        let record = GearboxRecord::new("X", Vec::new(), Vec::new());
        let broken = runtime.evaluate_single_candidate(&record, &requirements()).unwrap();
        assert_eq!(broken.score, 0);
        assert_eq!(broken.rejection_reason, Some(RejectionReason::MalformedRecord));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let runtime = DeterministicSelectionRuntime::default();
        let family = ProductFamily::new(
            "HC",
            vec![
                priced(GearboxRecord::new("A", vec![2.8, 3.1], vec![0.7, 0.8]), 30_000),
                priced(GearboxRecord::new("B", vec![3.0], vec![0.9]), 35_000),
                GearboxRecord::new("C", vec![3.3], vec![0.72]),
            ],
        );

        let first = select(&runtime, &family);
        let second = select(&runtime, &family);
        assert_eq!(first, second);
    }
}
