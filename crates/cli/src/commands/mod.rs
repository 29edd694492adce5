pub mod config;
pub mod doctor;
pub mod evaluate;
pub mod select;

use std::path::Path;

use gearmatch_core::catalog::{Catalog, IngestReport};
use gearmatch_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use gearmatch_core::errors::ApplicationError;
use gearmatch_core::pricing::CatalogPriceSource;
use gearmatch_core::reference::ReferenceTables;
use gearmatch_core::selection::DeterministicSelectionRuntime;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;
pub const EXIT_INPUT: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<T: Serialize> {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl CommandResult {
    pub fn success<T: Serialize>(command: &str, message: impl Into<String>, data: T) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            hint: None,
            correlation_id: None,
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    /// Maps an application failure to its class and exit code, with a user-safe hint.
    pub fn failure(command: &str, error: ApplicationError) -> Self {
        let (error_class, exit_code) = match &error {
            ApplicationError::Domain(_) => ("invalid_input", EXIT_INPUT),
            ApplicationError::Catalog(_) => ("catalog_load", EXIT_CATALOG),
            ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
        };
        let message = error.to_string();
        let interface = error.into_interface(format!("{command}-{}", std::process::id()));

        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            error_class,
            correlation_id = interface.correlation_id(),
            error = %interface,
            "command failed"
        );

        let payload: CommandOutcome<()> = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message,
            hint: Some(interface.user_message().to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload<T: Serialize>(payload: &CommandOutcome<T>) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            payload.command,
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Configuration, catalog and reference data a selection command runs against.
pub struct SelectionContext {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub ingest: IngestReport,
    pub runtime: DeterministicSelectionRuntime<ReferenceTables, CatalogPriceSource>,
}

pub fn load_config(
    command: &str,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, CommandResult> {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: false,
        overrides,
    };
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(command, ApplicationError::Configuration(error.to_string()))
    })
}

pub fn load_reference(config: &AppConfig) -> Result<ReferenceTables, ApplicationError> {
    match &config.catalog.reference_path {
        Some(path) => ReferenceTables::load(path),
        None => Ok(ReferenceTables::default()),
    }
}

pub fn prepare(
    command: &str,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<SelectionContext, CommandResult> {
    let config = load_config(command, config_path, overrides)?;

    let fail = |error| CommandResult::failure(command, error);
    let (catalog, ingest) = Catalog::load(&config.catalog.path).map_err(fail)?;
    let reference = load_reference(&config).map_err(fail)?;

    tracing::debug!(
        event_name = "cli.catalog.loaded",
        path = %config.catalog.path.display(),
        families = ingest.families,
        gearboxes = ingest.gearboxes,
        couplings = ingest.couplings,
        pumps = ingest.pumps,
        dropped = ingest.dropped.len(),
        "catalog loaded"
    );

    let runtime = DeterministicSelectionRuntime::new(
        config.selection.tolerances.clone(),
        reference,
        CatalogPriceSource::default(),
    );

    Ok(SelectionContext { config, catalog, ingest, runtime })
}
