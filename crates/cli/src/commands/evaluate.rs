use std::path::{Path, PathBuf};

use clap::Args;
use gearmatch_core::catalog::CatalogProvider;
use gearmatch_core::config::ConfigOverrides;
use gearmatch_core::domain::requirements::RequirementSet;
use gearmatch_core::errors::DomainError;
use gearmatch_core::selection::SelectionRuntime;

use super::{prepare, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct EvaluateArgs {
    #[arg(long, help = "Gearbox family holding the model")]
    pub family: String,
    #[arg(long, help = "Gearbox model to evaluate")]
    pub model: String,
    #[arg(long, help = "Input power in kW")]
    pub power: f64,
    #[arg(long, help = "Input speed in rpm")]
    pub speed: f64,
    #[arg(long, help = "Target reduction ratio")]
    pub ratio: f64,
    #[arg(long, help = "Required thrust in kN")]
    pub thrust: Option<f64>,
    #[arg(long, help = "Catalog JSON path, overriding configuration")]
    pub catalog: Option<PathBuf>,
}

pub fn run(config_path: Option<&Path>, args: &EvaluateArgs) -> CommandResult {
    let overrides =
        ConfigOverrides { catalog_path: args.catalog.clone(), ..ConfigOverrides::default() };
    let context = match prepare("evaluate", config_path, overrides) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let record = context.catalog.family(&args.family).and_then(|family| family.find(&args.model));
    let Some(record) = record else {
        let error = DomainError::invalid(
            "model",
            format!("model `{}` not found in family `{}`", args.model, args.family),
        );
        return CommandResult::failure("evaluate", error.into());
    };

    let mut requirements = RequirementSet::new(args.power, args.speed, args.ratio)
        .with_options(context.config.selection.options());
    if let Some(thrust) = args.thrust {
        requirements = requirements.with_thrust(thrust);
    }

    match context.runtime.evaluate_single_candidate(record, &requirements) {
        Ok(candidate) => {
            let message = match candidate.rejection_reason {
                Some(reason) => format!(
                    "{} scores {} ({:?}: {reason})",
                    candidate.model(),
                    candidate.score,
                    candidate.match_kind
                ),
                None => {
                    format!(
                        "{} scores {} and meets every requirement",
                        candidate.model(),
                        candidate.score,
                    )
                }
            };
            CommandResult::success("evaluate", message, candidate)
        }
        Err(error) => CommandResult::failure("evaluate", error.into()),
    }
}
