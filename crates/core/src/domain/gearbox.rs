use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceFields;

/// Supported input speed window of a gearbox, in rpm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min_rpm: f64,
    pub max_rpm: f64,
}

impl SpeedRange {
    /// Builds a range only when both bounds are finite, non-negative and ordered.
    pub fn new(min_rpm: f64, max_rpm: f64) -> Option<Self> {
        let valid =
            min_rpm.is_finite() && max_rpm.is_finite() && min_rpm >= 0.0 && min_rpm <= max_rpm;
        valid.then_some(Self { min_rpm, max_rpm })
    }

    pub fn contains(&self, rpm: f64) -> bool {
        rpm >= self.min_rpm && rpm <= self.max_rpm
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GearboxRecord {
    pub model: String,
    /// `None` when the source range was absent or malformed; the speed check is skipped.
    pub input_speed_range: Option<SpeedRange>,
    pub ratios: Vec<f64>,
    /// kW per input rpm, aligned with `ratios`.
    pub transfer_capacity: Vec<f64>,
    pub thrust_kn: Option<f64>,
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub pricing: PriceFields,
}

impl GearboxRecord {
    pub fn new(model: impl Into<String>, ratios: Vec<f64>, transfer_capacity: Vec<f64>) -> Self {
        Self {
            model: model.into(),
            input_speed_range: None,
            ratios,
            transfer_capacity,
            thrust_kn: None,
            weight_kg: None,
            pricing: PriceFields::default(),
        }
    }

    pub fn with_speed_range(mut self, min_rpm: f64, max_rpm: f64) -> Self {
        self.input_speed_range = SpeedRange::new(min_rpm, max_rpm);
        self
    }

    pub fn with_thrust(mut self, thrust_kn: f64) -> Self {
        self.thrust_kn = Some(thrust_kn);
        self
    }

    pub fn with_pricing(mut self, pricing: PriceFields) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn has_aligned_capacity(&self) -> bool {
        self.ratios.len() == self.transfer_capacity.len()
    }
}

/// One independently searchable gearbox catalog ("series").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub name: String,
    pub records: Vec<GearboxRecord>,
}

impl ProductFamily {
    pub fn new(name: impl Into<String>, records: Vec<GearboxRecord>) -> Self {
        Self { name: name.into(), records }
    }

    pub fn find(&self, model: &str) -> Option<&GearboxRecord> {
        self.records.iter().find(|record| record.model == model)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
