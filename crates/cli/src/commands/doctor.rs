use std::path::Path;

use gearmatch_core::catalog::Catalog;
use gearmatch_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use serde::Serialize;

use super::{load_reference, CommandResult, EXIT_CATALOG, EXIT_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<&Path>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: false,
        overrides: ConfigOverrides::default(),
    };

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_reference(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_load", "reference_tables"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match Catalog::load(&config.catalog.path) {
        Ok((_, report)) if report.gearboxes == 0 => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: format!(
                "catalog `{}` contains no gearbox records",
                config.catalog.path.display()
            ),
        },
        Ok((_, report)) => {
            let mut details = format!(
                "{} families, {} gearboxes, {} couplings, {} pumps from `{}`",
                report.families,
                report.gearboxes,
                report.couplings,
                report.pumps,
                config.catalog.path.display()
            );
            if !report.dropped.is_empty() {
                details.push_str(&format!("; {} record(s) dropped", report.dropped.len()));
            }
            if !report.malformed_speed_ranges.is_empty() {
                let malformed = report.malformed_speed_ranges.len();
                details.push_str(&format!("; {malformed} malformed speed range(s)"));
            }
            DoctorCheck { name: "catalog_load", status: CheckStatus::Pass, details }
        }
        Err(error) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_reference(config: &AppConfig) -> DoctorCheck {
    match load_reference(config) {
        Ok(tables) => DoctorCheck {
            name: "reference_tables",
            status: CheckStatus::Pass,
            details: format!(
                "{} coupling recommendations, {} coupling specifications, \
                 {} pump recommendations ({})",
                tables.coupling_by_gearbox.len(),
                tables.coupling_specifications.len(),
                tables.pump_by_gearbox.len(),
                if config.catalog.reference_path.is_some() { "file" } else { "built-in" }
            ),
        },
        Err(error) => DoctorCheck {
            name: "reference_tables",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn exit_code(report: &DoctorReport) -> u8 {
    match report.checks.iter().find(|check| check.status == CheckStatus::Fail) {
        Some(check) if check.name == "config_validation" => EXIT_CONFIG,
        Some(_) => EXIT_CATALOG,
        None => 0,
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
