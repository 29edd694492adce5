use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::coupling::CouplingRecommendation;
use crate::domain::requirements::DutyClass;
use crate::errors::ApplicationError;

/// Rated data for a coupling model as published by the supplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingSpecification {
    pub rated_torque_knm: f64,
    pub max_torque_knm: f64,
    pub max_speed_rpm: f64,
}

/// Read-only lookup tables consulted by the accessory selectors.
pub trait CompatibilityReference: Send + Sync {
    fn work_factor(&self, duty_class: DutyClass) -> f64;
    fn temperature_factor(&self, ambient_temperature_c: f64) -> f64;
    fn recommended_coupling(
        &self,
        gearbox_model: &str,
        requires_cover: bool,
    ) -> CouplingRecommendation;
    fn coupling_specification(&self, coupling_model: &str) -> Option<CouplingSpecification>;
    fn recommended_pump(&self, gearbox_model: &str) -> Option<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBucket {
    /// Inclusive upper bound in °C.
    pub up_to_c: f64,
    pub factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub work_factors: BTreeMap<DutyClass, f64>,
    pub default_work_factor: f64,
    /// Ascending by `up_to_c`.
    pub temperature_buckets: Vec<TemperatureBucket>,
    pub overheat_factor: f64,
    pub coupling_by_gearbox: BTreeMap<String, String>,
    pub coupling_prefix_by_gearbox: BTreeMap<String, String>,
    pub default_coupling_prefix: String,
    pub cover_variants: BTreeMap<String, String>,
    pub coupling_specifications: BTreeMap<String, CouplingSpecification>,
    pub pump_by_gearbox: BTreeMap<String, String>,
}

impl ReferenceTables {
    pub fn from_json_str(raw: &str) -> Result<Self, ApplicationError> {
        serde_json::from_str(raw).map_err(|error| {
            ApplicationError::Catalog(format!("invalid reference tables: {error}"))
        })
    }

    pub fn load(path: &Path) -> Result<Self, ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            let message = format!("failed to read reference tables {}: {error}", path.display());
            ApplicationError::Catalog(message)
        })?;
        Self::from_json_str(&raw)
    }
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self {
            work_factors: DutyClass::ALL.into_iter().zip(WORK_FACTORS).collect(),
            default_work_factor: 1.8,
            temperature_buckets: vec![
                TemperatureBucket { up_to_c: 60.0, factor: 1.0 },
                TemperatureBucket { up_to_c: 80.0, factor: 1.2 },
                TemperatureBucket { up_to_c: 100.0, factor: 1.4 },
            ],
            overheat_factor: 1.6,
            coupling_by_gearbox: owned_map(COUPLING_BY_GEARBOX),
            coupling_prefix_by_gearbox: owned_map(COUPLING_PREFIX_BY_GEARBOX),
            default_coupling_prefix: "HGT".to_string(),
            cover_variants: owned_map(&[("HGTHB5", "HGTHJB5"), ("HGTHB6.3A", "HGTHJB6.3A")]),
            coupling_specifications: COUPLING_SPECIFICATIONS
                .iter()
                .map(|(model, rated, max, speed)| {
                    (
                        (*model).to_string(),
                        CouplingSpecification {
                            rated_torque_knm: *rated,
                            max_torque_knm: *max,
                            max_speed_rpm: *speed,
                        },
                    )
                })
                .collect(),
            pump_by_gearbox: owned_map(PUMP_BY_GEARBOX),
        }
    }
}

impl CompatibilityReference for ReferenceTables {
    fn work_factor(&self, duty_class: DutyClass) -> f64 {
        self.work_factors.get(&duty_class).copied().unwrap_or(self.default_work_factor)
    }

    fn temperature_factor(&self, ambient_temperature_c: f64) -> f64 {
        self.temperature_buckets
            .iter()
            .find(|bucket| ambient_temperature_c <= bucket.up_to_c)
            .map_or(self.overheat_factor, |bucket| bucket.factor)
    }

    fn recommended_coupling(
        &self,
        gearbox_model: &str,
        requires_cover: bool,
    ) -> CouplingRecommendation {
        let Some(specific) = self.coupling_by_gearbox.get(gearbox_model) else {
            let prefix = longest_prefix_match(&self.coupling_prefix_by_gearbox, gearbox_model)
                .unwrap_or(&self.default_coupling_prefix);
            return CouplingRecommendation { specific: None, prefix: Some(prefix.clone()) };
        };

        let specific = match self.cover_variants.get(specific) {
            Some(covered) if requires_cover => covered.clone(),
            _ => specific.clone(),
        };
        let prefix: String = specific.chars().take_while(|ch| ch.is_ascii_uppercase()).collect();

        CouplingRecommendation {
            prefix: (!prefix.is_empty()).then_some(prefix),
            specific: Some(specific),
        }
    }

    fn coupling_specification(&self, coupling_model: &str) -> Option<CouplingSpecification> {
        self.coupling_specifications.get(coupling_model).copied()
    }

    fn recommended_pump(&self, gearbox_model: &str) -> Option<String> {
        if gearbox_model.is_empty() {
            return None;
        }
        self.pump_by_gearbox
            .get(gearbox_model)
            .or_else(|| longest_prefix_match(&self.pump_by_gearbox, gearbox_model))
            .cloned()
    }
}

fn longest_prefix_match<'a>(
    table: &'a BTreeMap<String, String>,
    model: &str,
) -> Option<&'a String> {
    table
        .iter()
        .filter(|(prefix, _)| !prefix.is_empty() && model.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, value)| value)
}

fn owned_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

const WORK_FACTORS: [f64; 5] = [1.2, 1.5, 1.8, 2.2, 2.5];

const COUPLING_BY_GEARBOX: &[(&str, &str)] = &[
    ("300", "HGTHT4"),
    ("D300A", "HGTHT4"),
    ("J300", "HGTHT4"),
    ("T300", "HGTHT4"),
    ("HC300", "HGTHT4"),
    ("HCD300", "HGTHT4"),
    ("HCT300", "HGTHT4"),
    ("HC400", "HGTHT4.5"),
    ("HCD400", "HGTHT4.5"),
    ("HCT400", "HGTHT5"),
    ("HCT400A", "HGTHT5"),
    ("HC600A", "HGTHT6.3A"),
    ("HCD600A", "HGTHT6.3A"),
    ("HCT600A", "HGTHT6.3A"),
    ("HCD800", "HGTHT8.6"),
    ("HCT800", "HGTHT8.6"),
    ("HCT800/1", "HGTHT8.6"),
    ("HCT800/2", "HGTHT8.6"),
    ("HCT800/3", "HGTHT8.6"),
    ("HC1000", "HGTHB5"),
    ("HCD1000", "HGTHB5"),
    ("HC1200", "HGHQT1210IW"),
    ("HC1200/1", "HGTHB6.3A"),
    ("HCT1200", "HGHQT1210IW"),
    ("HCT1200/1", "HGTHB6.3A"),
    ("HC1400", "HGTHB8"),
    ("HCD1400", "HGTHB8"),
    ("HCT1400", "HGTHB8"),
    ("HC1600", "HGTHB10"),
    ("HCD1600", "HGTHB10"),
    ("HCT1600", "HGTHB10"),
    ("HC2000", "HGTHB12.5"),
    ("HCD2000", "HGTHB12.5"),
    ("HCT2000", "HGTHB12.5"),
    ("HC2700", "HGTHB16"),
    ("HCD2700", "HGTHB16"),
    ("T2700", "HGT3020"),
    ("GWC28.30", "HGT2520"),
    ("GWC30.32", "HGT3020"),
    ("GWC36.39", "HGT4020"),
    ("GWC45.49", "HGT6320"),
    ("GWC52.59", "HGT8020"),
    ("GWC60.66", "HGT10020"),
    ("GWC70.76", "HGT16020"),
    ("HCM70", "HGTHB3.2"),
    ("HCM160", "HGTHB3.2"),
    ("HCM250", "HGTHB5"),
    ("HCM435", "HGTHB6.3"),
    ("HCM600", "HGT1020"),
    ("HCM1250", "HGT1620"),
    ("HCM1600", "HGT2020"),
    ("DT180", "HGTHB3.2"),
    ("DT240", "HGTHB5"),
    ("DT580", "HGTHB6.3"),
    ("DT770", "HGT1020"),
    ("DT900", "HGT1220"),
    ("DT1400", "HGT1620"),
    ("DT1500", "HGT2020"),
];

const COUPLING_PREFIX_BY_GEARBOX: &[(&str, &str)] = &[
    ("300", "HGTHT4"),
    ("D300A", "HGTHT4"),
    ("J300", "HGTHT4"),
    ("T300", "HGTHT4"),
    ("HC300", "HGTHT4"),
    ("HCD300", "HGTHT4"),
    ("HCT300", "HGTHT4"),
    ("HC400", "HGTHT4.5"),
    ("HCD400", "HGTHT4.5"),
    ("HCT400", "HGTHT5"),
    ("HCT400A", "HGTHT5"),
    ("HC600", "HGTHT6.3A"),
    ("HCD600", "HGTHT6.3A"),
    ("HCT600", "HGTHT6.3A"),
    ("HCD800", "HGTHT8.6"),
    ("HCT800", "HGTHT8.6"),
    ("HC1000", "HGTHB5"),
    ("HCD1000", "HGTHB5"),
    ("HC1200", "HGHQT1210IW"),
    ("HC1200/1", "HGTHB6.3A"),
    ("HCT1200", "HGHQT1210IW"),
    ("HCT1200/1", "HGTHB6.3A"),
    ("HC1400", "HGTHB8"),
    ("HCD1400", "HGTHB8"),
    ("HCT1400", "HGTHB8"),
    ("HC1600", "HGTHB10"),
    ("HCD1600", "HGTHB10"),
    ("HCT1600", "HGTHB10"),
    ("HC2000", "HGTHB12.5"),
    ("HCD2000", "HGTHB12.5"),
    ("HCT2000", "HGTHB12.5"),
    ("HC2700", "HGTHB16"),
    ("HCD2700", "HGTHB16"),
    ("HCT2700", "HGT3020"),
    ("GWC28", "HGT"),
    ("GWC30", "HGT"),
    ("GWC36", "HGT"),
    ("GWC45", "HGT"),
    ("GWC52", "HGT"),
    ("GWC60", "HGT"),
    ("GWC70", "HGT"),
    ("HCM70", "HGTHB"),
    ("HCM160", "HGTHB"),
    ("HCM250", "HGTHB"),
    ("HCM435", "HGTHB"),
    ("HCM600", "HGT"),
    ("HCM1250", "HGT"),
    ("HCM1600", "HGT"),
    ("DT180", "HGTHB"),
    ("DT240", "HGTHB"),
    ("DT580", "HGTHB"),
    ("DT770", "HGT"),
    ("DT900", "HGT"),
    ("DT1400", "HGT"),
    ("DT1500", "HGT"),
];

/// (model, rated kN·m, max kN·m, max rpm)
const COUPLING_SPECIFICATIONS: &[(&str, f64, f64, f64)] = &[
    ("HGTHT4", 4.0, 10.0, 2400.0),
    ("HGTHT4.5", 4.5, 12.0, 2400.0),
    ("HGTHT5", 5.0, 12.5, 2400.0),
    ("HGTHT6.3A", 6.3, 18.0, 2400.0),
    ("HGTHT8.6", 8.6, 21.5, 2000.0),
    ("HGTHB5", 5.0, 12.5, 3000.0),
    ("HGHQT1210IW", 12.0, 30.0, 1800.0),
    ("HGTHB6.3A", 6.3, 15.75, 3000.0),
    ("HGTHB8", 8.0, 20.0, 2800.0),
    ("HGTHB10", 10.0, 25.0, 2500.0),
    ("HGTHB12.5", 12.5, 31.25, 2200.0),
    ("HGTHB16", 16.0, 40.0, 2000.0),
    ("HGT3020", 31.5, 78.75, 1800.0),
    ("HGTHJB5", 5.0, 12.5, 3000.0),
    ("HGTHJB6.3A", 6.3, 15.75, 3000.0),
];

const PUMP_BY_GEARBOX: &[(&str, &str)] = &[
    ("300", "2CY7.5/2.5D"),
    ("D300A", "2CY7.5/2.5D"),
    ("J300", "2CY7.5/2.5D"),
    ("T300", "2CY7.5/2.5D"),
    ("HC300", "2CY7.5/2.5D"),
    ("HCD300", "2CY7.5/2.5D"),
    ("HCT300", "2CY7.5/2.5D"),
    ("HC400", "2CY7.5/2.5D"),
    ("HCD400", "2CY7.5/2.5D"),
    ("HCT400", "2CY7.5/2.5D"),
    ("HCT400A", "2CY7.5/2.5D"),
    ("HC600A", "2CY14.2/2.5D"),
    ("HCD600A", "2CY14.2/2.5D"),
    ("HCT600A", "2CY14.2/2.5D"),
    ("HCD800", "2CY14.2/2.5D"),
    ("HCT800", "2CY14.2/2.5D"),
    ("HCT800/1", "2CY14.2/2.5D"),
    ("HCT800/2", "2CY14.2/2.5D"),
    ("HCT800/3", "2CY14.2/2.5D"),
    ("HC1000", "2CY14.2/2.5D"),
    ("HCD1000", "2CY14.2/2.5D"),
    ("HC1200", "2CY19.2/2.5D"),
    ("HC1200/1", "2CY19.2/2.5D"),
    ("HCT1200", "2CY19.2/2.5D"),
    ("HCT1200/1", "2CY19.2/2.5D"),
    ("HC1400", "2CY19.2/2.5D"),
    ("HCD1400", "2CY19.2/2.5D"),
    ("HCT1400", "2CY19.2/2.5D"),
    ("HC1600", "2CY19.2/2.5D"),
    ("HCD1600", "2CY19.2/2.5D"),
    ("HCT1600", "2CY19.2/2.5D"),
    ("HC2000", "2CY24.8/2.5D"),
    ("HCD2000", "2CY24.8/2.5D"),
    ("HCT2000", "2CY24.8/2.5D"),
    ("HC2700", "2CY34.5/2.5D"),
    ("HCD2700", "2CY34.5/2.5D"),
    ("T2700", "2CY34.5/2.5D"),
    ("GWC28.30", "2CY14.2/2.5D"),
    ("GWC30.32", "2CY19.2/2.5D"),
    ("GWC36.39", "2CY19.2/2.5D"),
    ("GWC45.49", "2CY24.8/2.5D"),
    ("GWC52.59", "2CY34.5/2.5D"),
    ("GWC60.66", "2CY34.5/2.5D"),
    ("GWC70.76", "2CY48.2/2.5D"),
    ("HCM70", "2CY7.5/2.5D"),
    ("HCM160", "2CY7.5/2.5D"),
    ("HCM250", "2CY7.5/2.5D"),
    ("HCM435", "2CY14.2/2.5D"),
    ("HCM600", "2CY14.2/2.5D"),
    ("HCM1250", "2CY19.2/2.5D"),
    ("HCM1600", "2CY24.8/2.5D"),
    ("DT180", "2CY7.5/2.5D"),
    ("DT240", "2CY7.5/2.5D"),
    ("DT580", "2CY14.2/2.5D"),
    ("DT770", "2CY14.2/2.5D"),
    ("DT900", "2CY19.2/2.5D"),
    ("DT1400", "2CY24.8/2.5D"),
    ("DT1500", "2CY24.8/2.5D"),
];
