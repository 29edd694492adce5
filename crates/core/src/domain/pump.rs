use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceFields;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PumpRecord {
    pub model: String,
    pub flow: Option<f64>,
    pub pressure: Option<f64>,
    pub motor_power_kw: Option<f64>,
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub pricing: PriceFields,
}

impl PumpRecord {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            flow: None,
            pressure: None,
            motor_power_kw: None,
            weight_kg: None,
            pricing: PriceFields::default(),
        }
    }

    pub fn with_flow(mut self, flow: f64) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Upper-cased model with whitespace and hyphens removed, for tolerant lookups.
    pub fn normalized_model(&self) -> String {
        normalize_pump_model(&self.model)
    }
}

pub fn normalize_pump_model(model: &str) -> String {
    model
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-')
        .collect::<String>()
        .to_ascii_uppercase()
}
