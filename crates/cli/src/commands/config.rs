use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use gearmatch_core::config::{resolve_config_path, AppConfig, ConfigOverrides};
use toml::Value;

use super::{load_config, CommandResult};

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match load_config("config", config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = resolve_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "catalog.path",
        &config.catalog.path.display().to_string(),
        source("catalog.path", &["GEARMATCH_CATALOG_PATH"]),
    ));
    lines.push(render_line(
        "catalog.reference_path",
        &config
            .catalog
            .reference_path
            .as_ref()
            .map_or_else(|| "<built-in tables>".to_string(), |path| path.display().to_string()),
        source("catalog.reference_path", &["GEARMATCH_REFERENCE_PATH"]),
    ));

    for (key, value) in selection_values(&config) {
        let key_path = format!("selection.{key}");
        let env_key = format!("GEARMATCH_SELECTION_{}", key.to_ascii_uppercase());
        lines.push(render_line(&key_path, &value, source(&key_path, &[env_key.as_str()])));
    }

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["GEARMATCH_LOGGING_LEVEL", "GEARMATCH_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["GEARMATCH_LOGGING_FORMAT", "GEARMATCH_LOG_FORMAT"]),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn selection_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    let selection = &config.selection;
    let tolerances = &selection.tolerances;
    vec![
        ("duty_class", selection.duty_class.roman().to_string()),
        ("ambient_temperature_c", selection.ambient_temperature_c.to_string()),
        ("requires_cover", selection.requires_cover.to_string()),
        ("max_ranked", selection.max_ranked.to_string()),
        ("ratio_tolerance", tolerances.ratio_tolerance.to_string()),
        ("ratio_near_tolerance", tolerances.ratio_near_tolerance.to_string()),
        ("capacity_near_floor", tolerances.capacity_near_floor.to_string()),
        ("max_capacity_margin_pct", tolerances.max_capacity_margin_pct.to_string()),
        ("capacity_margin_near_factor", tolerances.capacity_margin_near_factor.to_string()),
        ("thrust_near_floor", tolerances.thrust_near_floor.to_string()),
        ("near_match_penalty", tolerances.near_match_penalty.to_string()),
        ("ideal_capacity_margin_pct", tolerances.ideal_capacity_margin_pct.to_string()),
        ("pump_fallback_min_flow", tolerances.pump_fallback_min_flow.to_string()),
        ("high_margin_notice_pct", tolerances.high_margin_notice_pct.to_string()),
        ("gw_min_power_kw", tolerances.gw_min_power_kw.to_string()),
        ("hcm_min_speed_rpm", tolerances.hcm_min_speed_rpm.to_string()),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
