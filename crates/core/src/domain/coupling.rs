use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceFields;

/// Unit a legacy torque value was recorded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorqueUnit {
    KilonewtonMetre,
    NewtonMetre,
}

impl TorqueUnit {
    /// Recognises the spellings found in catalog sources; anything else is untagged.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|ch| !matches!(ch, '·' | '.' | ' ' | '*' | '-'))
            .collect();
        match normalized.as_str() {
            "knm" => Some(Self::KilonewtonMetre),
            "nm" => Some(Self::NewtonMetre),
            _ => None,
        }
    }

    pub fn to_knm(&self, value: f64) -> f64 {
        match self {
            Self::KilonewtonMetre => value,
            Self::NewtonMetre => value / 1000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingRecord {
    pub model: String,
    /// Rated torque as recorded; see `units::TorqueNormalizer` for the canonical value.
    pub torque: Option<f64>,
    pub torque_unit: Option<TorqueUnit>,
    /// Secondary torque field, recorded in N·m.
    pub input_torque_nm: Option<f64>,
    pub max_torque_knm: Option<f64>,
    pub max_speed_rpm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub has_cover: Option<bool>,
    #[serde(default)]
    pub pricing: PriceFields,
}

impl CouplingRecord {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            torque: None,
            torque_unit: None,
            input_torque_nm: None,
            max_torque_knm: None,
            max_speed_rpm: None,
            weight_kg: None,
            has_cover: None,
            pricing: PriceFields::default(),
        }
    }

    pub fn with_torque(mut self, torque: f64, unit: Option<TorqueUnit>) -> Self {
        self.torque = Some(torque);
        self.torque_unit = unit;
        self
    }

    pub fn with_max_speed(mut self, max_speed_rpm: f64) -> Self {
        self.max_speed_rpm = Some(max_speed_rpm);
        self
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    pub fn with_pricing(mut self, pricing: PriceFields) -> Self {
        self.pricing = pricing;
        self
    }

    /// Cover variants are flagged explicitly or follow the `J`/`-ZB` naming convention.
    pub fn is_cover_variant(&self) -> bool {
        self.has_cover == Some(true) || self.model.contains('J') || self.model.ends_with("-ZB")
    }
}

/// Coupling the compatibility reference suggests for a gearbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingRecommendation {
    pub specific: Option<String>,
    pub prefix: Option<String>,
}

impl CouplingRecommendation {
    pub fn classify(&self, model: &str) -> RecommendationMatch {
        if self.specific.as_deref() == Some(model) {
            RecommendationMatch::Exact
        } else if self.prefix.as_deref().is_some_and(|prefix| model.starts_with(prefix)) {
            RecommendationMatch::Prefix
        } else {
            RecommendationMatch::None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMatch {
    Exact,
    Prefix,
    None,
}

/// Which resolver produced a coupling's canonical torque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorqueSource {
    SpecificationTable,
    TorqueField,
    InputTorqueField,
    ModelIdentifier,
}
