pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod reference;
pub mod selection;
pub mod units;

pub use catalog::{AccessoryCatalogs, Catalog, CatalogProvider, IngestReport};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::coupling::{CouplingRecord, TorqueSource, TorqueUnit};
pub use domain::gearbox::{GearboxRecord, ProductFamily};
pub use domain::pump::PumpRecord;
pub use domain::requirements::{DutyClass, RequirementSet, SelectionOptions};
pub use domain::selection::{
    CouplingSelection, MatchKind, PumpSelection, RejectionReason, RejectionStatistics,
    ScoredCandidate, ScoredCoupling, SelectionOutcome, SelectionResult,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{CatalogPriceSource, PriceSource};
pub use reference::{CompatibilityReference, ReferenceTables};
pub use selection::{DeterministicSelectionRuntime, SelectionRuntime, Tolerances};
pub use units::{TorqueNormalizer, TorqueResolution};
