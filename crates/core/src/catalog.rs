//! Ingestion boundary for the legacy catalog document.
//!
//! Source data mixes numbers and numeric strings, spells torque units several
//! ways and occasionally omits fields. Everything is normalised here so the
//! selectors only ever see typed records.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::coupling::{CouplingRecord, TorqueUnit};
use crate::domain::gearbox::{GearboxRecord, ProductFamily, SpeedRange};
use crate::domain::pricing::PriceFields;
use crate::domain::pump::PumpRecord;
use crate::errors::ApplicationError;

const FAMILY_SUFFIX: &str = "Gearboxes";
const COUPLINGS_KEY: &str = "flexibleCouplings";
const PUMPS_KEY: &str = "standbyPumps";

pub trait CatalogProvider: Send + Sync {
    fn families(&self) -> &[ProductFamily];
    fn couplings(&self) -> &[CouplingRecord];
    fn pumps(&self) -> &[PumpRecord];

    fn family(&self, name: &str) -> Option<&ProductFamily> {
        self.families().iter().find(|family| family.name.eq_ignore_ascii_case(name))
    }

    fn accessories(&self) -> AccessoryCatalogs<'_> {
        AccessoryCatalogs { couplings: self.couplings(), pumps: self.pumps() }
    }
}

/// Borrowed coupling and pump collections handed to the accessory selectors.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessoryCatalogs<'a> {
    pub couplings: &'a [CouplingRecord],
    pub pumps: &'a [PumpRecord],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub families: Vec<ProductFamily>,
    pub couplings: Vec<CouplingRecord>,
    pub pumps: Vec<PumpRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub collection: String,
    pub index: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub families: usize,
    pub gearboxes: usize,
    pub couplings: usize,
    pub pumps: usize,
    pub dropped: Vec<DroppedRecord>,
    /// Models whose speed range was present but unusable.
    pub malformed_speed_ranges: Vec<String>,
    pub ignored_keys: Vec<String>,
}

impl IngestReport {
    fn drop_record(&mut self, collection: &str, index: usize, reason: impl Into<String>) {
        self.dropped.push(DroppedRecord {
            collection: collection.to_string(),
            index,
            reason: reason.into(),
        });
    }
}

impl Catalog {
    pub fn new(
        families: Vec<ProductFamily>,
        couplings: Vec<CouplingRecord>,
        pumps: Vec<PumpRecord>,
    ) -> Self {
        Self { families, couplings, pumps }
    }

    pub fn load(path: &Path) -> Result<(Self, IngestReport), ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ApplicationError::Catalog(format!("failed to read catalog {}: {error}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<(Self, IngestReport), ApplicationError> {
        let document: Value = serde_json::from_str(raw).map_err(|error| {
            ApplicationError::Catalog(format!("catalog is not valid JSON: {error}"))
        })?;
        let Value::Object(document) = document else {
            return Err(ApplicationError::Catalog("catalog root must be a JSON object".to_string()));
        };

        let mut report = IngestReport::default();
        let mut catalog = Catalog::default();

        for (key, value) in &document {
            if key == COUPLINGS_KEY {
                catalog.couplings = ingest_collection(key, value, &mut report, coupling_from_value);
            } else if key == PUMPS_KEY {
                catalog.pumps = ingest_collection(key, value, &mut report, pump_from_value);
            } else if let Some(prefix) =
                key.strip_suffix(FAMILY_SUFFIX).filter(|prefix| !prefix.is_empty())
            {
                let records = ingest_collection(key, value, &mut report, gearbox_from_value);
                catalog.families.push(ProductFamily::new(prefix.to_ascii_uppercase(), records));
            } else {
                report.ignored_keys.push(key.clone());
            }
        }

        report.families = catalog.families.len();
        report.gearboxes = catalog.families.iter().map(|family| family.records.len()).sum();
        report.couplings = catalog.couplings.len();
        report.pumps = catalog.pumps.len();

        for dropped in &report.dropped {
            tracing::warn!(
                event_name = "catalog.record.dropped",
                collection = %dropped.collection,
                index = dropped.index,
                reason = %dropped.reason,
                "catalog record dropped at ingestion"
            );
        }

        Ok((catalog, report))
    }
}

impl CatalogProvider for Catalog {
    fn families(&self) -> &[ProductFamily] {
        &self.families
    }

    fn couplings(&self) -> &[CouplingRecord] {
        &self.couplings
    }

    fn pumps(&self) -> &[PumpRecord] {
        &self.pumps
    }
}

type RecordParser<T> = fn(&Map<String, Value>, String, &mut IngestReport) -> T;

fn ingest_collection<T>(
    key: &str,
    value: &Value,
    report: &mut IngestReport,
    parse: RecordParser<T>,
) -> Vec<T> {
    let Some(items) = value.as_array() else {
        report.drop_record(key, 0, "collection is not an array");
        return Vec::new();
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            report.drop_record(key, index, "record is not an object");
            continue;
        };
        match model_of(object) {
            Some(model) => records.push(parse(object, model, report)),
            None => report.drop_record(key, index, "record has no model"),
        }
    }
    records
}

fn gearbox_from_value(
    object: &Map<String, Value>,
    model: String,
    report: &mut IngestReport,
) -> GearboxRecord {
    let input_speed_range = match object.get("inputSpeedRange") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let range = speed_range(raw);
            if range.is_none() {
                report.malformed_speed_ranges.push(model.clone());
            }
            range
        }
    };

    GearboxRecord {
        input_speed_range,
        ratios: number_list(object.get("ratios")),
        transfer_capacity: number_list(object.get("transferCapacity")),
        thrust_kn: number(object.get("thrust")),
        weight_kg: number(object.get("weight")),
        pricing: price_fields(object),
        model,
    }
}

fn coupling_from_value(
    object: &Map<String, Value>,
    model: String,
    _report: &mut IngestReport,
) -> CouplingRecord {
    CouplingRecord {
        torque: number(object.get("torque")),
        torque_unit: object
            .get("torqueUnit")
            .and_then(Value::as_str)
            .and_then(TorqueUnit::parse_tag),
        input_torque_nm: number(object.get("inputTorque")),
        max_torque_knm: number(object.get("maxTorque")),
        max_speed_rpm: number(object.get("maxSpeed")),
        weight_kg: number(object.get("weight")),
        has_cover: object.get("hasCover").and_then(Value::as_bool),
        pricing: price_fields(object),
        model,
    }
}

fn pump_from_value(
    object: &Map<String, Value>,
    model: String,
    _report: &mut IngestReport,
) -> PumpRecord {
    PumpRecord {
        flow: number(object.get("flow")),
        pressure: number(object.get("pressure")),
        motor_power_kw: number(object.get("motorPower")),
        weight_kg: number(object.get("weight")),
        pricing: price_fields(object),
        model,
    }
}

fn model_of(object: &Map<String, Value>) -> Option<String> {
    match object.get("model")? {
        Value::String(model) => Some(model.trim().to_string()).filter(|model| !model.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn price_fields(object: &Map<String, Value>) -> PriceFields {
    PriceFields {
        base_price: decimal(object.get("basePrice")).or_else(|| decimal(object.get("price"))),
        discount_rate: decimal(object.get("discountRate")),
        factory_price: decimal(object.get("factoryPrice")),
        market_price: decimal(object.get("marketPrice")),
    }
}

fn speed_range(raw: &Value) -> Option<SpeedRange> {
    match raw.as_array()?.as_slice() {
        [min, max] => SpeedRange::new(number(Some(min))?, number(Some(max))?),
        _ => None,
    }
}

/// Numbers, numeric strings and singletons are accepted; unreadable entries become 0 so
/// positions stay aligned and the filter falls back to the first usable entry.
fn number_list(raw: Option<&Value>) -> Vec<f64> {
    match raw {
        Some(Value::Array(items)) => {
            items.iter().map(|item| number(Some(item)).unwrap_or(0.0)).collect()
        }
        Some(single) => number(Some(single)).into_iter().collect(),
        None => Vec::new(),
    }
}

fn number(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn decimal(raw: Option<&Value>) -> Option<Decimal> {
    match raw? {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Catalog, CatalogProvider};
    use crate::domain::coupling::TorqueUnit;

    const DOCUMENT: &str = r#"{
        "hcGearboxes": [
            {"model": "HC1000", "inputSpeedRange": [1000, 2100], "ratios": [2.0, 3.0],
             "transferCapacity": [0.74, "0.70"], "thrust": "100", "price": 52000,
             "discountRate": 0.12},
            {"model": "HC400", "inputSpeedRange": [2100], "ratios": [1.5], "transferCapacity": 0.3},
            {"ratios": [2.0]}
        ],
        "gwGearboxes": [],
        "flexibleCouplings": [
            {"model": "HGTHB5", "torque": "5", "torqueUnit": "kN·m", "maxSpeed": 3000,
             "basePrice": 21000}
        ],
        "standbyPumps": [{"model": "2CY7.5/2.5D", "flow": 7.5}],
        "updatedAt": "2024-07-29"
    }"#;

    #[test]
    fn ingests_families_and_accessories_leniently() {
        let (catalog, report) = Catalog::from_json_str(DOCUMENT).unwrap();

        let hc = catalog.family("hc").unwrap();
        assert_eq!(hc.records.len(), 2);
        let hc1000 = hc.find("HC1000").unwrap();
        assert_eq!(hc1000.transfer_capacity, vec![0.74, 0.70]);
        assert_eq!(hc1000.thrust_kn, Some(100.0));
        assert_eq!(hc1000.pricing.base_price, Some(Decimal::new(52_000, 0)));
        assert_eq!(hc1000.pricing.discount_rate, Some(Decimal::new(12, 2)));

        let hc400 = hc.find("HC400").unwrap();
        assert_eq!(hc400.input_speed_range, None);
        assert_eq!(hc400.transfer_capacity, vec![0.3]);

        assert!(catalog.family("GW").is_some_and(|family| family.is_empty()));
        assert_eq!(catalog.couplings()[0].torque_unit, Some(TorqueUnit::KilonewtonMetre));
        assert_eq!(catalog.pumps()[0].flow, Some(7.5));

        assert_eq!(report.families, 2);
        assert_eq!(report.gearboxes, 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].collection, "hcGearboxes");
        assert_eq!(report.malformed_speed_ranges, vec!["HC400".to_string()]);
        assert_eq!(report.ignored_keys, vec!["updatedAt".to_string()]);
    }

    #[test]
    fn unreadable_list_entries_keep_their_position() {
        let document = r#"{"hcGearboxes": [
            {"model": "HC1000", "ratios": [2.0, 3.0], "transferCapacity": [0.75, "n/a"]}
        ]}"#;
        let (catalog, _) = Catalog::from_json_str(document).unwrap();

        let record = catalog.family("HC").and_then(|family| family.find("HC1000")).unwrap();
        assert_eq!(record.ratios, vec![2.0, 3.0]);
        assert_eq!(record.transfer_capacity, vec![0.75, 0.0]);
        assert!(record.has_aligned_capacity());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(Catalog::from_json_str("[1, 2]").is_err());
        assert!(Catalog::from_json_str("{not json").is_err());
    }
}
