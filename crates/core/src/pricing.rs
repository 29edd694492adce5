use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceFields;

/// Resolved price view of one catalog record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub list_price: Option<Decimal>,
    pub factory_price: Option<Decimal>,
    pub market_price: Option<Decimal>,
}

pub trait PriceSource: Send + Sync {
    fn resolve(&self, fields: &PriceFields) -> ResolvedPrice;

    fn factory_price(&self, fields: &PriceFields) -> Option<Decimal> {
        self.resolve(fields).factory_price
    }
}

/// Derives missing factory and market prices from the list price the way the catalog does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPriceSource {
    pub default_discount_rate: Decimal,
    pub market_multiplier: Decimal,
}

impl Default for CatalogPriceSource {
    fn default() -> Self {
        Self { default_discount_rate: Decimal::new(10, 2), market_multiplier: Decimal::new(11, 1) }
    }
}

impl CatalogPriceSource {
    fn discount_rate(&self, fields: &PriceFields) -> Decimal {
        fields
            .discount_rate
            .filter(|rate| *rate >= Decimal::ZERO && *rate <= Decimal::ONE)
            .unwrap_or(self.default_discount_rate)
    }
}

impl PriceSource for CatalogPriceSource {
    fn resolve(&self, fields: &PriceFields) -> ResolvedPrice {
        let list_price = fields.base_price.filter(|price| *price > Decimal::ZERO);

        let factory_price = fields.factory_price.filter(|price| *price > Decimal::ZERO).or_else(|| {
            let rate = self.discount_rate(fields);
            list_price.map(|base| round_currency(base * (Decimal::ONE - rate)))
        });

        let market_price = fields
            .market_price
            .filter(|price| *price > Decimal::ZERO)
            .or_else(|| {
                factory_price.map(|factory| round_currency(factory * self.market_multiplier))
            });

        ResolvedPrice { list_price, factory_price, market_price }
    }
}

fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
