use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::selection::{ScoredCandidate, ScoredCoupling};

/// What the ranker needs to order a scored item.
pub trait Rankable {
    fn score(&self) -> u8;
    /// Margin in percent compared against the ideal margin on score ties.
    fn margin_pct(&self) -> f64;
    fn factory_price(&self) -> Option<Decimal>;
}

impl Rankable for ScoredCandidate {
    fn score(&self) -> u8 {
        self.score
    }

    fn margin_pct(&self) -> f64 {
        self.capacity_margin_pct
    }

    fn factory_price(&self) -> Option<Decimal> {
        self.factory_price
    }
}

impl Rankable for ScoredCoupling {
    fn score(&self) -> u8 {
        self.score
    }

    fn margin_pct(&self) -> f64 {
        self.torque_margin_pct
    }

    fn factory_price(&self) -> Option<Decimal> {
        self.factory_price
    }
}

/// Score descending, then distance from the ideal margin, then factory price
/// ascending with unpriced items last.
pub fn compare<T: Rankable>(left: &T, right: &T, ideal_margin_pct: f64) -> Ordering {
    right
        .score()
        .cmp(&left.score())
        .then_with(|| {
            let left_distance = (left.margin_pct() - ideal_margin_pct).abs();
            let right_distance = (right.margin_pct() - ideal_margin_pct).abs();
            left_distance.total_cmp(&right_distance)
        })
        .then_with(|| match (left.factory_price(), right.factory_price()) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Candidates in ranked order; equal items keep their input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ranking<T> {
    ordered: Vec<T>,
}

impl<T: Rankable> Ranking<T> {
    pub fn rank(mut items: Vec<T>, ideal_margin_pct: f64) -> Self {
        items.sort_by(|left, right| compare(left, right, ideal_margin_pct));
        Self { ordered: items }
    }
}

impl<T> Ranking<T> {
    pub fn best(&self) -> Option<&T> {
        self.ordered.first()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.ordered
    }
}
