use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price fields carried by every catalog record. Read-only to the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFields {
    pub base_price: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub factory_price: Option<Decimal>,
    pub market_price: Option<Decimal>,
}

impl PriceFields {
    pub fn with_base_price(base_price: Decimal) -> Self {
        Self { base_price: Some(base_price), ..Self::default() }
    }
}
