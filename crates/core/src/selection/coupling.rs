use rust_decimal::prelude::ToPrimitive;

use crate::domain::coupling::{
    CouplingRecommendation, CouplingRecord, RecommendationMatch, TorqueSource,
};
use crate::domain::requirements::RequirementSet;
use crate::domain::selection::{CouplingRejections, CouplingSelection, ScoredCoupling};
use crate::selection::gearbox::SelectionEngine;
use crate::selection::ranking::Ranking;
use crate::selection::scoring::{self, COUPLING_PRICE_WEIGHT, COUPLING_WEIGHT_WEIGHT};
use crate::units::TorqueResolution;

/// Torque margin preferred when coupling scores tie.
pub const IDEAL_TORQUE_MARGIN_PCT: f64 = 15.0;

struct Survivor<'r> {
    record: &'r CouplingRecord,
    torque_knm: f64,
    torque_source: TorqueSource,
    max_speed_rpm: Option<f64>,
}

impl SelectionEngine<'_> {
    /// Required torque is engine torque × work factor × temperature factor, in kN·m.
    pub fn select_coupling(
        &self,
        gearbox_model: &str,
        requirements: &RequirementSet,
        couplings: &[CouplingRecord],
    ) -> CouplingSelection {
        let options = &requirements.options;
        let work_factor = self.reference.work_factor(options.duty_class);
        let temperature_factor = self.reference.temperature_factor(options.ambient_temperature_c);
        let required_torque_knm =
            requirements.engine_torque_nm() * work_factor * temperature_factor / 1000.0;
        let recommendation =
            self.reference.recommended_coupling(gearbox_model, options.requires_cover);

        let mut rejections = CouplingRejections::default();
        let mut unresolved_models = Vec::new();
        let mut survivors = Vec::new();

        for record in couplings {
            let TorqueResolution::Resolved { torque_knm, source: torque_source } =
                self.normalizer.resolve(record, self.reference)
            else {
                tracing::warn!(
                    event_name = "selection.coupling.unresolved_torque",
                    model = %record.model,
                    "coupling torque could not be resolved; excluded"
                );
                rejections.unresolved_torque += 1;
                unresolved_models.push(record.model.clone());
                continue;
            };

            if torque_knm < required_torque_knm {
                rejections.insufficient_torque += 1;
                continue;
            }

            let max_speed_rpm = self.normalizer.max_speed_rpm(record, self.reference);
            if max_speed_rpm.is_some_and(|speed| speed < requirements.input_speed_rpm) {
                rejections.insufficient_speed += 1;
                continue;
            }

            if options.requires_cover && !record.is_cover_variant() {
                rejections.missing_cover += 1;
                continue;
            }

            survivors.push(Survivor { record, torque_knm, torque_source, max_speed_rpm });
        }

        let prices: Vec<_> = survivors
            .iter()
            .map(|survivor| self.pricing.resolve(&survivor.record.pricing))
            .collect();
        let factory_prices: Vec<Option<f64>> = prices
            .iter()
            .map(|price| price.factory_price.and_then(|value| value.to_f64()))
            .collect();
        let weights: Vec<Option<f64>> =
            survivors.iter().map(|survivor| survivor.record.weight_kg).collect();
        let price_points =
            scoring::normalize_lower_is_better(&factory_prices, COUPLING_PRICE_WEIGHT);
        let weight_points = scoring::normalize_lower_is_better(&weights, COUPLING_WEIGHT_WEIGHT);

        let scored: Vec<ScoredCoupling> = survivors
            .into_iter()
            .zip(prices)
            .zip(price_points.into_iter().zip(weight_points))
            .map(|((survivor, price), (price_points, weight_points))| {
                let torque_margin_pct = (survivor.torque_knm / required_torque_knm - 1.0) * 100.0;
                let speed_margin_pct = survivor
                    .max_speed_rpm
                    .map(|speed| (speed / requirements.input_speed_rpm - 1.0) * 100.0);
                let recommendation_match = recommendation.classify(&survivor.record.model);
                let breakdown = scoring::coupling_breakdown(
                    torque_margin_pct,
                    recommendation_match,
                    speed_margin_pct,
                    price_points,
                    weight_points,
                );
                ScoredCoupling {
                    record: survivor.record.clone(),
                    torque_knm: survivor.torque_knm,
                    torque_source: survivor.torque_source,
                    max_speed_rpm: survivor.max_speed_rpm,
                    torque_margin_pct,
                    speed_margin_pct,
                    recommendation_match,
                    score: scoring::total_score(breakdown.total()),
                    breakdown,
                    factory_price: price.factory_price,
                    market_price: price.market_price,
                }
            })
            .collect();

        let ranked = Ranking::rank(scored, IDEAL_TORQUE_MARGIN_PCT).into_vec();
        let best = ranked.first().cloned();

        let mut warnings = Vec::new();
        if !unresolved_models.is_empty() {
            warnings.push(format!(
                "{} coupling(s) excluded because their rated torque could not be resolved: {}",
                unresolved_models.len(),
                unresolved_models.join(", ")
            ));
        }
        if let Some(best) = &best {
            warnings.extend(top_pick_warnings(best, &recommendation));
        }

        let message = match &best {
            Some(best) => format!(
                "selected coupling {} (score {}) for gearbox {gearbox_model}; \
                 required torque {required_torque_knm:.2} kN·m",
                best.model(),
                best.score
            ),
            None if options.requires_cover && rejections.missing_cover > 0 => format!(
                "no cover-variant coupling meets the required torque \
                 {required_torque_knm:.2} kN·m for gearbox {gearbox_model}"
            ),
            None => format!(
                "no coupling meets the required torque {required_torque_knm:.2} kN·m \
                 at {:.0} rpm for gearbox {gearbox_model}",
                requirements.input_speed_rpm
            ),
        };

        CouplingSelection {
            gearbox_model: gearbox_model.to_string(),
            required_torque_knm,
            work_factor,
            temperature_factor,
            recommendation,
            best,
            ranked,
            unresolved_models,
            rejections,
            warnings,
            message,
        }
    }
}

fn top_pick_warnings(
    best: &ScoredCoupling,
    recommendation: &CouplingRecommendation,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let model = best.model();
    let margin = best.torque_margin_pct;

    if margin < 5.0 {
        warnings.push(format!("coupling {model}: torque margin {margin:.1}% is very low (<5%)"));
    } else if margin < 10.0 {
        warnings.push(format!("coupling {model}: torque margin {margin:.1}% is low (<10%)"));
    } else if margin > 50.0 {
        warnings.push(format!(
            "coupling {model}: torque margin {margin:.1}% is high (>50%), possibly oversized"
        ));
    }

    if best.score < 60 {
        warnings.push(format!("coupling {model}: overall score {} is below 60", best.score));
    }

    match (best.recommendation_match, &recommendation.specific, &recommendation.prefix) {
        (RecommendationMatch::Exact, _, _) => {}
        (_, Some(specific), _) => {
            warnings
                .push(format!("coupling {model} differs from the recommended model {specific}"));
        }
        (RecommendationMatch::None, None, Some(prefix)) => {
            warnings.push(format!("coupling {model} is outside the recommended {prefix} series"));
        }
        _ => {}
    }

    warnings
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;

    use crate::domain::coupling::{CouplingRecord, RecommendationMatch, TorqueSource, TorqueUnit};
    use crate::domain::pricing::PriceFields;
    use crate::domain::requirements::{DutyClass, RequirementSet, SelectionOptions};
    use crate::pricing::CatalogPriceSource;
    use crate::reference::{CompatibilityReference, ReferenceTables};
    use crate::selection::gearbox::SelectionEngine;
    use crate::selection::Tolerances;
    use crate::units::TorqueNormalizer;

    fn select(
        reference: &dyn CompatibilityReference,
        gearbox: &str,
        requirements: &RequirementSet,
        couplings: &[CouplingRecord],
    ) -> crate::domain::selection::CouplingSelection {
        let tolerances = Tolerances::default();
        let pricing = CatalogPriceSource::default();
        let normalizer = TorqueNormalizer::default();
        let engine = SelectionEngine {
            tolerances: &tolerances,
            reference,
            pricing: &pricing,
            normalizer: &normalizer,
        };
        engine.select_coupling(gearbox, requirements, couplings)
    }

    fn catalog() -> Vec<CouplingRecord> {
        vec![
            CouplingRecord::new("HGTHB10"),
            CouplingRecord::new("HGTHB12.5"),
            CouplingRecord::new("HGTHB16"),
            CouplingRecord::new("HGT3020"),
        ]
    }

    #[test]
    fn sizes_coupling_from_engine_torque_and_factors() {
        let requirements = RequirementSet::new(1000.0, 1500.0, 3.0);
        let selection = select(&ReferenceTables::default(), "HC2000", &requirements, &catalog());

        // 6366.7 N·m × 1.8 × 1.0
        assert!((selection.required_torque_knm - 11.46).abs() < 0.01);
        assert_eq!(selection.work_factor, 1.8);
        assert_eq!(selection.temperature_factor, 1.0);
        assert_eq!(selection.rejections.insufficient_torque, 1);

        let best = selection.best.as_ref().unwrap();
        assert_eq!(best.model(), "HGTHB12.5");
        assert_eq!(best.recommendation_match, RecommendationMatch::Exact);
        assert_eq!(best.torque_source, TorqueSource::SpecificationTable);
        assert_eq!(best.score, 60);

        let order: Vec<_> = selection.ranked.iter().map(|coupling| coupling.model()).collect();
        assert_eq!(order, vec!["HGTHB12.5", "HGTHB16", "HGT3020"]);
        assert!(selection.warnings.iter().any(|warning| warning.contains("is low (<10%)")));
    }

    #[test]
    fn cover_requirement_restricts_to_cover_variants() {
        let options = SelectionOptions {
            duty_class: DutyClass::VeryLowVariation,
            requires_cover: true,
            ..SelectionOptions::default()
        };
        let requirements = RequirementSet::new(500.0, 1500.0, 3.0).with_options(options);
        let couplings = vec![CouplingRecord::new("HGTHB5"), CouplingRecord::new("HGTHJB5")];

        let selection = select(&ReferenceTables::default(), "HC1000", &requirements, &couplings);

        assert_eq!(selection.recommendation.specific.as_deref(), Some("HGTHJB5"));
        assert_eq!(selection.rejections.missing_cover, 1);
        let best = selection.best.unwrap();
        assert_eq!(best.model(), "HGTHJB5");
        assert_eq!(best.recommendation_match, RecommendationMatch::Exact);
    }

    #[test]
    fn unresolved_torque_is_excluded_and_listed() {
        let requirements = RequirementSet::new(200.0, 1500.0, 3.0);
        let couplings = vec![
            CouplingRecord::new("LM-450"),
            CouplingRecord::new("XC-20").with_torque(20.0, Some(TorqueUnit::KilonewtonMetre)),
        ];

        let selection = select(&ReferenceTables::default(), "HC300", &requirements, &couplings);

        assert_eq!(selection.unresolved_models, vec!["LM-450".to_string()]);
        assert_eq!(selection.rejections.unresolved_torque, 1);
        let best = selection.best.unwrap();
        assert_eq!(best.model(), "XC-20");
        assert_eq!(best.max_speed_rpm, None);
        assert_eq!(best.breakdown.speed_margin, 0.0);
    }

    #[test]
    fn cheaper_and_lighter_couplings_earn_normalised_points() {
        let requirements = RequirementSet::new(200.0, 1500.0, 3.0);
        let couplings = vec![
            CouplingRecord::new("XC-A")
                .with_torque(5.0, Some(TorqueUnit::KilonewtonMetre))
                .with_weight(100.0)
                .with_pricing(PriceFields::with_base_price(Decimal::new(10_000, 0))),
            CouplingRecord::new("XC-B")
                .with_torque(5.0, Some(TorqueUnit::KilonewtonMetre))
                .with_weight(50.0)
                .with_pricing(PriceFields::with_base_price(Decimal::new(20_000, 0))),
        ];

        let selection = select(&ReferenceTables::default(), "ZZ1", &requirements, &couplings);

        let a = selection.ranked.iter().find(|coupling| coupling.model() == "XC-A").unwrap();
        let b = selection.ranked.iter().find(|coupling| coupling.model() == "XC-B").unwrap();
        assert_eq!((a.breakdown.price, a.breakdown.weight), (20.0, 0.0));
        assert_eq!((b.breakdown.price, b.breakdown.weight), (0.0, 10.0));
        assert_eq!(a.factory_price, Some(Decimal::new(9_000, 0)));
    }

    #[test]
    fn reference_tables_can_be_substituted() {
        struct Harsh {
            inner: ReferenceTables,
            lookups: AtomicUsize,
        }

        impl CompatibilityReference for Harsh {
            fn work_factor(&self, _duty_class: DutyClass) -> f64 {
                3.0
            }
            fn temperature_factor(&self, ambient: f64) -> f64 {
                self.inner.temperature_factor(ambient)
            }
            fn recommended_coupling(
                &self,
                gearbox_model: &str,
                requires_cover: bool,
            ) -> crate::domain::coupling::CouplingRecommendation {
                self.lookups.fetch_add(1, Ordering::SeqCst);
                self.inner.recommended_coupling(gearbox_model, requires_cover)
            }
            fn coupling_specification(
                &self,
                model: &str,
            ) -> Option<crate::reference::CouplingSpecification> {
                self.inner.coupling_specification(model)
            }
            fn recommended_pump(&self, gearbox_model: &str) -> Option<String> {
                self.inner.recommended_pump(gearbox_model)
            }
        }

        let reference = Harsh { inner: ReferenceTables::default(), lookups: AtomicUsize::new(0) };
        let requirements = RequirementSet::new(1000.0, 1500.0, 3.0);
        let selection = select(&reference, "HC2000", &requirements, &catalog());

        assert_eq!(selection.work_factor, 3.0);
        assert_eq!(selection.rejections.insufficient_torque, 3);
        assert_eq!(selection.best.unwrap().model(), "HGT3020");
        assert_eq!(reference.lookups.load(Ordering::SeqCst), 1);
    }
}
