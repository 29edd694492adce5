use std::path::{Path, PathBuf};

use clap::Args;
use gearmatch_core::catalog::CatalogProvider;
use gearmatch_core::config::ConfigOverrides;
use gearmatch_core::domain::requirements::{DutyClass, RequirementSet};
use gearmatch_core::errors::DomainError;
use gearmatch_core::selection::SelectionRuntime;

use super::{prepare, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct SelectArgs {
    #[arg(long, help = "Input power in kW")]
    pub power: f64,
    #[arg(long, help = "Input speed in rpm")]
    pub speed: f64,
    #[arg(long, help = "Target reduction ratio")]
    pub ratio: f64,
    #[arg(long, help = "Required thrust in kN")]
    pub thrust: Option<f64>,
    #[arg(long, help = "Duty class I..V (or very_low|low|moderate|high|very_high)")]
    pub duty: Option<DutyClass>,
    #[arg(long, help = "Ambient temperature in degrees Celsius")]
    pub temperature: Option<f64>,
    #[arg(long, help = "Require a coupling with a protective cover")]
    pub cover: bool,
    #[arg(long, help = "Restrict the search to one gearbox family")]
    pub family: Option<String>,
    #[arg(long, help = "Catalog JSON path, overriding configuration")]
    pub catalog: Option<PathBuf>,
    #[arg(long, help = "Application note carried with the requirements")]
    pub application: Option<String>,
}

impl SelectArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            catalog_path: self.catalog.clone(),
            duty_class: self.duty,
            ambient_temperature_c: self.temperature,
            requires_cover: self.cover.then_some(true),
            ..ConfigOverrides::default()
        }
    }
}

pub fn run(config_path: Option<&Path>, args: &SelectArgs) -> CommandResult {
    let context = match prepare("select", config_path, args.overrides()) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let mut options = context.config.selection.options();
    options.application = args.application.clone();
    let mut requirements =
        RequirementSet::new(args.power, args.speed, args.ratio).with_options(options);
    if let Some(thrust) = args.thrust {
        requirements = requirements.with_thrust(thrust);
    }

    let accessories = context.catalog.accessories();
    let outcome = match args.family.as_deref() {
        Some(name) => {
            let Some(family) = context.catalog.family(name) else {
                let error = DomainError::invalid(
                    "family",
                    format!("unknown gearbox family `{name}`"),
                );
                return CommandResult::failure("select", error.into());
            };
            context.runtime.select_from_family(&requirements, family, accessories)
        }
        None => context.runtime.auto_select_across_families(
            &requirements,
            context.catalog.families(),
            accessories,
        ),
    };

    match outcome {
        Ok(mut result) => {
            let max_ranked = context.config.selection.max_ranked;
            if max_ranked > 0 {
                result.ranked_candidates.truncate(max_ranked);
            }
            tracing::info!(
                event_name = "cli.select.completed",
                outcome = ?result.outcome,
                best = result
                    .best_candidate
                    .as_ref()
                    .map(|candidate| candidate.model())
                    .unwrap_or("-"),
                "selection finished"
            );
            let message = result.message.clone();
            CommandResult::success("select", message, result)
        }
        Err(error) => CommandResult::failure("select", error.into()),
    }
}
