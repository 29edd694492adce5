pub mod coupling;
pub mod filter;
pub mod gearbox;
pub mod orchestrator;
pub mod pump;
pub mod ranking;
pub mod scoring;

use serde::{Deserialize, Serialize};

use crate::catalog::AccessoryCatalogs;
use crate::domain::gearbox::{GearboxRecord, ProductFamily};
use crate::domain::requirements::RequirementSet;
use crate::domain::selection::{ScoredCandidate, SelectionResult};
use crate::errors::DomainError;
use crate::pricing::{CatalogPriceSource, PriceSource};
use crate::reference::{CompatibilityReference, ReferenceTables};
use crate::units::TorqueNormalizer;

/// Empirical thresholds of the matching rules, kept overridable from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Largest relative ratio deviation for a hard match (0.25 = 25 %).
    pub ratio_tolerance: f64,
    /// Largest relative ratio deviation kept as a near match.
    pub ratio_near_tolerance: f64,
    /// Fraction of required capacity still kept as a near match.
    pub capacity_near_floor: f64,
    pub max_capacity_margin_pct: f64,
    /// Multiplier on `max_capacity_margin_pct` bounding near matches.
    pub capacity_margin_near_factor: f64,
    pub thrust_near_floor: f64,
    /// Score multiplier applied to near matches in the cross-series pool.
    pub near_match_penalty: f64,
    /// Capacity margin the ranker prefers when scores tie.
    pub ideal_capacity_margin_pct: f64,
    pub pump_fallback_min_flow: f64,
    /// Capacity margin above which the recommended gearbox gets an oversizing notice.
    pub high_margin_notice_pct: f64,
    /// Below this input power a cross-series GW pick gets a suitability notice.
    pub gw_min_power_kw: f64,
    /// Below this input speed a cross-series HCM pick gets a suitability notice.
    pub hcm_min_speed_rpm: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            ratio_tolerance: 0.25,
            ratio_near_tolerance: 0.35,
            capacity_near_floor: 0.85,
            max_capacity_margin_pct: 50.0,
            capacity_margin_near_factor: 1.3,
            thrust_near_floor: 0.80,
            near_match_penalty: 0.85,
            ideal_capacity_margin_pct: 15.0,
            pump_fallback_min_flow: 5.0,
            high_margin_notice_pct: 70.0,
            gw_min_power_kw: 150.0,
            hcm_min_speed_rpm: 1000.0,
        }
    }
}

pub trait SelectionRuntime: Send + Sync {
    fn select_from_family(
        &self,
        requirements: &RequirementSet,
        family: &ProductFamily,
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError>;

    fn auto_select_across_families(
        &self,
        requirements: &RequirementSet,
        families: &[ProductFamily],
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError>;

    fn evaluate_single_candidate(
        &self,
        candidate: &GearboxRecord,
        requirements: &RequirementSet,
    ) -> Result<ScoredCandidate, DomainError>;
}

pub struct DeterministicSelectionRuntime<R, P> {
    tolerances: Tolerances,
    reference: R,
    pricing: P,
    normalizer: TorqueNormalizer,
}

impl<R, P> DeterministicSelectionRuntime<R, P> {
    pub fn new(tolerances: Tolerances, reference: R, pricing: P) -> Self {
        Self { tolerances, reference, pricing, normalizer: TorqueNormalizer::default() }
    }

    pub fn with_normalizer(mut self, normalizer: TorqueNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }
}

impl Default for DeterministicSelectionRuntime<ReferenceTables, CatalogPriceSource> {
    fn default() -> Self {
        Self::new(Tolerances::default(), ReferenceTables::default(), CatalogPriceSource::default())
    }
}

impl<R, P> DeterministicSelectionRuntime<R, P>
where
    R: CompatibilityReference,
    P: PriceSource,
{
    fn engine(&self) -> gearbox::SelectionEngine<'_> {
        gearbox::SelectionEngine {
            tolerances: &self.tolerances,
            reference: &self.reference,
            pricing: &self.pricing,
            normalizer: &self.normalizer,
        }
    }

    /// Awaitable form of [`SelectionRuntime::auto_select_across_families`]; runs the same
    /// single in-memory pass without spawning sub-tasks.
    pub async fn auto_select_across_families_async(
        &self,
        requirements: &RequirementSet,
        families: &[ProductFamily],
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError> {
        orchestrator::auto_select(&self.engine(), requirements, families, accessories)
    }
}

impl<R, P> SelectionRuntime for DeterministicSelectionRuntime<R, P>
where
    R: CompatibilityReference,
    P: PriceSource,
{
    fn select_from_family(
        &self,
        requirements: &RequirementSet,
        family: &ProductFamily,
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError> {
        self.engine().select_from_family(requirements, family, accessories)
    }

    fn auto_select_across_families(
        &self,
        requirements: &RequirementSet,
        families: &[ProductFamily],
        accessories: AccessoryCatalogs<'_>,
    ) -> Result<SelectionResult, DomainError> {
        orchestrator::auto_select(&self.engine(), requirements, families, accessories)
    }

    fn evaluate_single_candidate(
        &self,
        candidate: &GearboxRecord,
        requirements: &RequirementSet,
    ) -> Result<ScoredCandidate, DomainError> {
        self.engine().evaluate_single_candidate(candidate, requirements)
    }
}
