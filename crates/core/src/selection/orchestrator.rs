//! Cross-series selection: every family is filtered and scored on its own, near
//! matches are discounted, and the merged pool is re-ranked with every hard match
//! ahead of every near match before accessories are chosen once for the winner.

use std::collections::BTreeMap;

use crate::catalog::AccessoryCatalogs;
use crate::domain::gearbox::ProductFamily;
use crate::domain::requirements::RequirementSet;
use crate::domain::selection::{
    MatchKind, RejectionStatistics, ScoredCandidate, SelectionOutcome, SelectionResult,
};
use crate::errors::DomainError;
use crate::selection::gearbox::{best_candidate_warnings, SelectionEngine};
use crate::selection::ranking::Ranking;
use crate::selection::scoring;
use crate::selection::Tolerances;

pub fn auto_select(
    engine: &SelectionEngine<'_>,
    requirements: &RequirementSet,
    families: &[ProductFamily],
    accessories: AccessoryCatalogs<'_>,
) -> Result<SelectionResult, DomainError> {
    requirements.validate()?;

    let searchable: Vec<&ProductFamily> =
        families.iter().filter(|family| !family.is_empty()).collect();
    if searchable.is_empty() {
        return Err(DomainError::invalid(
            "families",
            "no catalog family contains any gearbox records",
        ));
    }

    let mut pool: Vec<ScoredCandidate> = Vec::new();
    let mut rejection_statistics = RejectionStatistics::default();
    let mut family_statistics = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut any_hard = false;

    let penalty = engine.tolerances.near_match_penalty;
    for family in searchable {
        let run = engine.run_family(requirements, family);
        any_hard |= run.outcome == SelectionOutcome::Success;
        rejection_statistics.merge(&run.statistics);
        family_statistics.insert(run.family.clone(), run.statistics);
        warnings.extend(run.warnings);

        pool.extend(run.ranked.into_iter().map(|mut candidate| {
            if candidate.match_kind == MatchKind::Near {
                candidate.score = scoring::total_score(f64::from(candidate.score) * penalty);
            }
            candidate
        }));
    }

    // Hard matches lead the merged pool whatever the discounted near scores are.
    let (hard, near): (Vec<_>, Vec<_>) =
        pool.into_iter().partition(|candidate| candidate.match_kind == MatchKind::Hard);
    let ideal_margin_pct = engine.tolerances.ideal_capacity_margin_pct;
    let mut ranked = Ranking::rank(hard, ideal_margin_pct).into_vec();
    ranked.extend(Ranking::rank(near, ideal_margin_pct).into_vec());
    let outcome = match (any_hard, ranked.is_empty()) {
        (true, _) => SelectionOutcome::Success,
        (false, false) => SelectionOutcome::Degraded,
        (false, true) => SelectionOutcome::Empty,
    };

    let (coupling, pump) = match ranked.first() {
        Some(best) => {
            warnings.extend(best_candidate_warnings(best, engine.tolerances));
            warnings.extend(family_suitability_warnings(best, requirements, engine.tolerances));
            let (coupling, pump) = engine.select_accessories(best, requirements, accessories);
            (Some(coupling), Some(pump))
        }
        None => (None, None),
    };

    let message = match (outcome, ranked.first()) {
        (SelectionOutcome::Success, Some(best)) => format!(
            "selected {} from family {} (score {}) out of {} candidate(s) across {} families",
            best.model(),
            best.family.as_deref().unwrap_or("-"),
            best.score,
            ranked.len(),
            family_statistics.len()
        ),
        (SelectionOutcome::Degraded, Some(best)) => {
            warnings.push(format!(
                "no family has a gearbox meeting every requirement; {} is the best near match",
                best.model()
            ));
            format!(
                "no exact match in any family; best near match {} from family {} (score {})",
                best.model(),
                best.family.as_deref().unwrap_or("-"),
                best.score
            )
        }
        _ => consolidated_failure(&family_statistics),
    };

    tracing::info!(
        event_name = "selection.orchestrator.completed",
        outcome = ?outcome,
        families = family_statistics.len(),
        candidates = ranked.len(),
        rejected = rejection_statistics.total(),
        best = ranked.first().map(|candidate| candidate.model()).unwrap_or("-"),
        "cross-series selection finished"
    );

    Ok(SelectionResult {
        success: outcome == SelectionOutcome::Success,
        outcome,
        family: None,
        message,
        best_candidate: ranked.first().cloned(),
        ranked_candidates: ranked,
        coupling,
        pump,
        engine_torque_nm: requirements.engine_torque_nm(),
        required_capacity: requirements.required_capacity(),
        warnings,
        rejection_statistics,
        family_statistics,
    })
}

/// Notices when the winning series is unusual for the duty point.
fn family_suitability_warnings(
    best: &ScoredCandidate,
    requirements: &RequirementSet,
    tolerances: &Tolerances,
) -> Vec<String> {
    let family = best.family.as_deref().unwrap_or_default();
    let mut warnings = Vec::new();
    if family.eq_ignore_ascii_case("GW") && requirements.power_kw < tolerances.gw_min_power_kw {
        warnings.push(format!(
            "{}: GW series picked for a low power of {} kW, confirm it suits the application",
            best.model(),
            requirements.power_kw
        ));
    }
    if family.eq_ignore_ascii_case("HCM")
        && requirements.input_speed_rpm < tolerances.hcm_min_speed_rpm
    {
        warnings.push(format!(
            "{}: high-speed HCM series picked for a low input speed of {} rpm, \
             confirm it suits the application",
            best.model(),
            requirements.input_speed_rpm
        ));
    }
    warnings
}

fn consolidated_failure(family_statistics: &BTreeMap<String, RejectionStatistics>) -> String {
    let details: Vec<String> = family_statistics
        .iter()
        .map(|(family, statistics)| {
            let summary = statistics.summary();
            if summary.is_empty() {
                family.clone()
            } else {
                format!("{family} ({summary})")
            }
        })
        .collect();
    format!("no suitable gearbox in any family: {}", details.join(", "))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::catalog::AccessoryCatalogs;
    use crate::domain::coupling::{CouplingRecommendation, CouplingRecord};
    use crate::domain::gearbox::{GearboxRecord, ProductFamily};
    use crate::domain::pump::PumpRecord;
    use crate::domain::requirements::{DutyClass, RequirementSet};
    use crate::domain::selection::{MatchKind, SelectionOutcome, SelectionResult};
    use crate::errors::DomainError;
    use crate::pricing::CatalogPriceSource;
    use crate::reference::{CompatibilityReference, CouplingSpecification, ReferenceTables};
    use crate::selection::scoring::total_score;
    use crate::selection::{DeterministicSelectionRuntime, SelectionRuntime, Tolerances};

    #[derive(Default)]
    struct CountingReference {
        tables: ReferenceTables,
        coupling_lookups: AtomicUsize,
        pump_lookups: AtomicUsize,
    }

    impl CompatibilityReference for CountingReference {
        fn work_factor(&self, duty_class: DutyClass) -> f64 {
            self.tables.work_factor(duty_class)
        }

        fn temperature_factor(&self, ambient_temperature_c: f64) -> f64 {
            self.tables.temperature_factor(ambient_temperature_c)
        }

        fn recommended_coupling(
            &self,
            gearbox_model: &str,
            requires_cover: bool,
        ) -> CouplingRecommendation {
            self.coupling_lookups.fetch_add(1, Ordering::SeqCst);
            self.tables.recommended_coupling(gearbox_model, requires_cover)
        }

        fn coupling_specification(&self, coupling_model: &str) -> Option<CouplingSpecification> {
            self.tables.coupling_specification(coupling_model)
        }

        fn recommended_pump(&self, gearbox_model: &str) -> Option<String> {
            self.pump_lookups.fetch_add(1, Ordering::SeqCst);
            self.tables.recommended_pump(gearbox_model)
        }
    }

    fn requirements() -> RequirementSet {
        RequirementSet::new(1000.0, 1500.0, 3.0)
    }

    fn select_gearbox_only(
        runtime: &impl SelectionRuntime,
        requirements: &RequirementSet,
        families: &[ProductFamily],
    ) -> SelectionResult {
        runtime
            .auto_select_across_families(requirements, families, AccessoryCatalogs::default())
            .unwrap()
    }

    #[test]
    fn best_family_wins_and_accessories_run_once() {
        let runtime = DeterministicSelectionRuntime::new(
            Tolerances::default(),
            CountingReference::default(),
            CatalogPriceSource::default(),
        );
        let families = vec![
            ProductFamily::new("GW", vec![GearboxRecord::new("GWC45.49", vec![2.9], vec![0.78])]),
            ProductFamily::new("HC", vec![GearboxRecord::new("HC2000", vec![3.0], vec![0.75])]),
        ];
        let couplings = vec![CouplingRecord::new("HGTHB12.5"), CouplingRecord::new("HGTHB16")];
        let pumps = vec![PumpRecord::new("2CY24.8/2.5D").with_flow(24.8)];
        let accessories = AccessoryCatalogs { couplings: &couplings, pumps: &pumps };

        let result =
            runtime.auto_select_across_families(&requirements(), &families, accessories).unwrap();

        assert!(result.success);
        assert_eq!(result.family, None);
        let best = result.best_candidate.as_ref().unwrap();
        assert_eq!(best.model(), "HC2000");
        assert_eq!(best.family.as_deref(), Some("HC"));
        assert_eq!(best.score, 80);
        assert_eq!(result.ranked_candidates[1].family.as_deref(), Some("GW"));
        assert_eq!(result.ranked_candidates[1].score, 74);

        let coupling = result.coupling.as_ref().unwrap();
        assert_eq!(coupling.gearbox_model, "HC2000");
        assert_eq!(coupling.best.as_ref().map(|coupling| coupling.model()), Some("HGTHB12.5"));
        assert!(result.pump.as_ref().unwrap().is_success());
        assert_eq!(runtime.reference().coupling_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.reference().pump_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn near_matches_are_discounted_in_the_merged_pool() {
        let runtime = DeterministicSelectionRuntime::default();
        let families = vec![
            // capacity 0.62 of 0.667 required: near match scoring 50 before the discount
            ProductFamily::new("A", vec![GearboxRecord::new("A-NEAR", vec![3.0], vec![0.62])]),
            ProductFamily::new("B", vec![GearboxRecord::new("B-HARD", vec![3.45], vec![0.75])]),
        ];

        let result = select_gearbox_only(&runtime, &requirements(), &families);

        assert_eq!(result.outcome, SelectionOutcome::Success);
        let order: Vec<_> =
            result.ranked_candidates.iter().map(|candidate| candidate.model()).collect();
        assert_eq!(order, vec!["B-HARD", "A-NEAR"]);
        let near = &result.ranked_candidates[1];
        assert_eq!(near.match_kind, MatchKind::Near);
        assert_eq!(near.score, total_score(50.0 * 0.85));
        assert_eq!(result.family_statistics["A"].total(), 1);
        assert_eq!(result.family_statistics["B"].total(), 0);
    }

    #[test]
    fn hard_match_outranks_a_higher_scoring_near_match() {
        let runtime = DeterministicSelectionRuntime::default();
        let requirements = requirements().with_thrust(100.0);
        let families = vec![
            // exact ratio and ideal margin but 90 kN against 100 kN: near match
            ProductFamily::new(
                "A",
                vec![GearboxRecord::new("A-NEAR", vec![3.0], vec![0.75]).with_thrust(90.0)],
            ),
            ProductFamily::new(
                "B",
                vec![GearboxRecord::new("B-HARD", vec![3.6], vec![0.95]).with_thrust(120.0)],
            ),
        ];

        let result = select_gearbox_only(&runtime, &requirements, &families);

        assert_eq!(result.outcome, SelectionOutcome::Success);
        let best = result.best_candidate.as_ref().unwrap();
        assert_eq!(best.model(), "B-HARD");
        assert_eq!(best.match_kind, MatchKind::Hard);
        assert!(best.thrust_satisfied);

        let near = &result.ranked_candidates[1];
        assert_eq!(near.model(), "A-NEAR");
        assert!(near.score > best.score);
    }

    #[test]
    fn low_power_gw_pick_carries_a_suitability_notice() {
        let runtime = DeterministicSelectionRuntime::default();
        let requirements = RequirementSet::new(100.0, 1500.0, 3.0);
        let record = GearboxRecord::new("GWC28.30", vec![3.0], vec![0.075]);
        let families = vec![ProductFamily::new("GW", vec![record])];

        let result = select_gearbox_only(&runtime, &requirements, &families);

        assert!(result.success);
        assert!(result
            .warnings
            .iter()
            .any(|warning| warning.contains("GW series picked for a low power")));
    }

    #[test]
    fn low_speed_hcm_pick_carries_a_suitability_notice() {
        let runtime = DeterministicSelectionRuntime::default();
        let slow = RequirementSet::new(1000.0, 800.0, 3.0);
        let record = GearboxRecord::new("HCM1250", vec![3.0], vec![1.4]);
        let families = vec![ProductFamily::new("HCM", vec![record])];

        let result = select_gearbox_only(&runtime, &slow, &families);
        assert!(result.success);
        assert!(result.warnings.iter().any(|warning| warning.contains("high-speed HCM series")));

        let fast = RequirementSet::new(1000.0, 1500.0, 3.0);
        let record = GearboxRecord::new("HCM1250", vec![3.0], vec![0.75]);
        let families = vec![ProductFamily::new("HCM", vec![record])];
        let result = select_gearbox_only(&runtime, &fast, &families);
        assert!(!result.warnings.iter().any(|warning| warning.contains("HCM series")));
    }

    #[test]
    fn degraded_run_merges_statistics_from_every_family() {
        let runtime = DeterministicSelectionRuntime::default();
        let families = vec![
            ProductFamily::new(
                "HC",
                vec![
                    GearboxRecord::new("HC-NEAR", vec![3.9], vec![0.75]),
                    GearboxRecord::new("HC-WEAK", vec![3.0], vec![0.1]),
                ],
            ),
            ProductFamily::new("DT", vec![GearboxRecord::new("DT-FAR", vec![9.0], vec![0.75])]),
            ProductFamily::new("EMPTY", Vec::new()),
        ];

        let result = select_gearbox_only(&runtime, &requirements(), &families);

        assert_eq!(result.outcome, SelectionOutcome::Degraded);
        assert!(!result.success);
        assert_eq!(
            result.best_candidate.as_ref().map(|candidate| candidate.model()),
            Some("HC-NEAR"),
        );
        assert_eq!(result.rejection_statistics.total(), 3);
        assert_eq!(
            result.rejection_statistics.total(),
            result.family_statistics.values().map(|statistics| statistics.total()).sum::<usize>()
        );
        assert!(!result.family_statistics.contains_key("EMPTY"));
        assert!(result.warning().is_some());
    }

    #[test]
    fn nothing_anywhere_yields_consolidated_message() {
        let runtime = DeterministicSelectionRuntime::default();
        let families = vec![
            ProductFamily::new("HC", vec![GearboxRecord::new("HC-FAR", vec![9.0], vec![0.75])]),
            ProductFamily::new("GW", vec![GearboxRecord::new("GW-WEAK", vec![3.0], vec![0.1])]),
        ];

        let result = select_gearbox_only(&runtime, &requirements(), &families);

        assert_eq!(result.outcome, SelectionOutcome::Empty);
        assert!(result.best_candidate.is_none());
        assert!(result.coupling.is_none() && result.pump.is_none());
        assert!(result.message.contains("GW (insufficient capacity: 1)"));
        assert!(result.message.contains("HC (ratio out of range: 1)"));
    }

    #[test]
    fn only_empty_families_is_an_input_error() {
        let runtime = DeterministicSelectionRuntime::default();
        let families = vec![ProductFamily::new("HC", Vec::new())];

        let error = runtime
            .auto_select_across_families(&requirements(), &families, AccessoryCatalogs::default())
            .unwrap_err();

        assert!(matches!(error, DomainError::InvalidInput { field: "families", .. }));
    }
}
