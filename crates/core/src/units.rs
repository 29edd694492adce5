//! Canonicalisation of coupling torque ratings to kN·m.
//!
//! Catalog torque values arrive in either kN·m or N·m, sometimes untagged and
//! sometimes absent altogether. [`TorqueNormalizer`] runs an ordered list of
//! [`TorqueResolver`]s and keeps the first one that produces a positive value.
//! When none does, the record is reported as unresolved and never guessed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::coupling::{CouplingRecord, TorqueSource};
use crate::reference::CompatibilityReference;

/// Untagged torque values above this are taken to be N·m.
pub const UNTAGGED_NEWTON_METRE_THRESHOLD: f64 = 500.0;

static SERIES_TWENTY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HGT(\d+)20").expect("series-20 torque pattern compiles"));
static HIGH_ELASTIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"HGTH[A-Z](\d+(?:\.\d+)?)").expect("high-elastic torque pattern compiles")
});
static GENERIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)HGT[HTJBQ]*(\d+(?:\.\d+)?)").expect("generic torque pattern compiles")
});

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TorqueResolution {
    Resolved { torque_knm: f64, source: TorqueSource },
    Unresolved,
}

impl TorqueResolution {
    pub fn torque_knm(&self) -> Option<f64> {
        match self {
            Self::Resolved { torque_knm, .. } => Some(*torque_knm),
            Self::Unresolved => None,
        }
    }
}

pub trait TorqueResolver: Send + Sync {
    fn source(&self) -> TorqueSource;

    /// Returns a candidate torque in kN·m, or `None` to defer to the next resolver.
    fn resolve(
        &self,
        record: &CouplingRecord,
        reference: &dyn CompatibilityReference,
    ) -> Option<f64>;
}

/// Rated torque published in the coupling specification table.
pub struct SpecificationTableResolver;

impl TorqueResolver for SpecificationTableResolver {
    fn source(&self) -> TorqueSource {
        TorqueSource::SpecificationTable
    }

    fn resolve(
        &self,
        record: &CouplingRecord,
        reference: &dyn CompatibilityReference,
    ) -> Option<f64> {
        reference.coupling_specification(&record.model).map(|spec| spec.rated_torque_knm)
    }
}

/// The record's own torque field, converted by unit tag or by magnitude when untagged.
pub struct TorqueFieldResolver {
    pub untagged_threshold: f64,
}

impl Default for TorqueFieldResolver {
    fn default() -> Self {
        Self { untagged_threshold: UNTAGGED_NEWTON_METRE_THRESHOLD }
    }
}

impl TorqueResolver for TorqueFieldResolver {
    fn source(&self) -> TorqueSource {
        TorqueSource::TorqueField
    }

    fn resolve(
        &self,
        record: &CouplingRecord,
        _reference: &dyn CompatibilityReference,
    ) -> Option<f64> {
        let value = record.torque.filter(|value| value.is_finite() && *value > 0.0)?;
        Some(match record.torque_unit {
            Some(unit) => unit.to_knm(value),
            None if value > self.untagged_threshold => value / 1000.0,
            None => value,
        })
    }
}

/// Secondary input-torque field, always recorded in N·m.
pub struct InputTorqueResolver;

impl TorqueResolver for InputTorqueResolver {
    fn source(&self) -> TorqueSource {
        TorqueSource::InputTorqueField
    }

    fn resolve(
        &self,
        record: &CouplingRecord,
        _reference: &dyn CompatibilityReference,
    ) -> Option<f64> {
        record
            .input_torque_nm
            .filter(|value| value.is_finite() && *value > 0.0)
            .map(|value| value / 1000.0)
    }
}

/// Numeric token embedded in the model identifier (`HGT1020`, `HGTHB12.5`, `HGTQ8`).
pub struct ModelIdentifierResolver;

impl ModelIdentifierResolver {
    fn capture(pattern: &Regex, model: &str) -> Option<f64> {
        pattern
            .captures(model)
            .and_then(|captures| captures.get(1))
            .and_then(|token| token.as_str().parse::<f64>().ok())
            .filter(|value| *value > 0.0)
    }
}

impl TorqueResolver for ModelIdentifierResolver {
    fn source(&self) -> TorqueSource {
        TorqueSource::ModelIdentifier
    }

    fn resolve(
        &self,
        record: &CouplingRecord,
        _reference: &dyn CompatibilityReference,
    ) -> Option<f64> {
        let model = record.model.trim();
        [&*SERIES_TWENTY_PATTERN, &*HIGH_ELASTIC_PATTERN, &*GENERIC_PATTERN]
            .into_iter()
            .find_map(|pattern| Self::capture(pattern, model))
    }
}

pub struct TorqueNormalizer {
    resolvers: Vec<Box<dyn TorqueResolver>>,
}

impl TorqueNormalizer {
    pub fn new(resolvers: Vec<Box<dyn TorqueResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn resolve(
        &self,
        record: &CouplingRecord,
        reference: &dyn CompatibilityReference,
    ) -> TorqueResolution {
        self.resolvers
            .iter()
            .find_map(|resolver| {
                resolver
                    .resolve(record, reference)
                    .filter(|torque| torque.is_finite() && *torque > 0.0)
                    .map(|torque_knm| TorqueResolution::Resolved {
                        torque_knm,
                        source: resolver.source(),
                    })
            })
            .unwrap_or(TorqueResolution::Unresolved)
    }

    /// Maximum speed from the record, else from the specification table.
    pub fn max_speed_rpm(
        &self,
        record: &CouplingRecord,
        reference: &dyn CompatibilityReference,
    ) -> Option<f64> {
        record.max_speed_rpm.filter(|speed| speed.is_finite() && *speed > 0.0).or_else(|| {
            reference.coupling_specification(&record.model).map(|spec| spec.max_speed_rpm)
        })
    }
}

impl Default for TorqueNormalizer {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SpecificationTableResolver),
            Box::new(TorqueFieldResolver::default()),
            Box::new(InputTorqueResolver),
            Box::new(ModelIdentifierResolver),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::{TorqueNormalizer, TorqueResolution};
    use crate::domain::coupling::{CouplingRecord, TorqueSource, TorqueUnit};
    use crate::reference::ReferenceTables;

    fn resolve(record: &CouplingRecord) -> TorqueResolution {
        TorqueNormalizer::default().resolve(record, &ReferenceTables::default())
    }

    #[test]
    fn untagged_large_value_is_read_as_newton_metres() {
        let record = CouplingRecord::new("XC-CUSTOM").with_torque(8600.0, None);

        assert_eq!(
            resolve(&record),
            TorqueResolution::Resolved { torque_knm: 8.6, source: TorqueSource::TorqueField }
        );
    }

    #[test]
    fn specification_table_wins_over_record_field() {
        let record =
            CouplingRecord::new("HGTHB10").with_torque(4.0, Some(TorqueUnit::KilonewtonMetre));

        assert_eq!(
            resolve(&record),
            TorqueResolution::Resolved {
                torque_knm: 10.0,
                source: TorqueSource::SpecificationTable
            }
        );
    }

    #[test]
    fn tagged_canonical_values_are_unchanged() {
        for value in [0.8, 3.2, 12.5, 600.0] {
            let record =
                CouplingRecord::new("XC").with_torque(value, Some(TorqueUnit::KilonewtonMetre));
            let first = resolve(&record).torque_knm().unwrap();
            assert_eq!(first, value);

            let again =
                CouplingRecord::new("XC").with_torque(first, Some(TorqueUnit::KilonewtonMetre));
            assert_eq!(resolve(&again).torque_knm(), Some(first));
        }
    }

    #[test]
    fn falls_back_to_input_torque_then_model_identifier() {
        let mut record = CouplingRecord::new("XC");
        record.input_torque_nm = Some(2500.0);
        assert_eq!(
            resolve(&record),
            TorqueResolution::Resolved { torque_knm: 2.5, source: TorqueSource::InputTorqueField }
        );

        let models = [("HGT1620", 16.0), ("HGTHB20", 20.0), ("HGTQ8", 8.0), ("hgtjb7.5", 7.5)];
        for (model, expected) in models {
            assert_eq!(
                resolve(&CouplingRecord::new(model)).torque_knm(),
                Some(expected),
                "{model}",
            );
        }
    }

    #[test]
    fn unknown_model_without_data_is_unresolved() {
        let record = CouplingRecord::new("LM-450").with_torque(-3.0, None);
        assert_eq!(resolve(&record), TorqueResolution::Unresolved);
    }

    #[test]
    fn max_speed_falls_back_to_specification() {
        let normalizer = TorqueNormalizer::default();
        let tables = ReferenceTables::default();

        assert_eq!(normalizer.max_speed_rpm(&CouplingRecord::new("HGTHB8"), &tables), Some(2800.0));
        assert_eq!(
            normalizer.max_speed_rpm(
                &CouplingRecord::new("HGTHB8").with_max_speed(2600.0),
                &tables,
            ),
            Some(2600.0)
        );
        assert_eq!(normalizer.max_speed_rpm(&CouplingRecord::new("XC"), &tables), None);
    }
}
