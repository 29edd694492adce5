use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::requirements::{DutyClass, SelectionOptions};
use crate::selection::Tolerances;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["gearmatch.toml", "config/gearmatch.toml"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub selection: SelectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
    /// Replaces the built-in compatibility tables when set.
    pub reference_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionConfig {
    pub duty_class: DutyClass,
    pub ambient_temperature_c: f64,
    pub requires_cover: bool,
    /// Upper bound on ranked candidates printed by the CLI; 0 prints all.
    pub max_ranked: usize,
    pub tolerances: Tolerances,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub reference_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub duty_class: Option<DutyClass>,
    pub ambient_temperature_c: Option<f64>,
    pub requires_cover: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let options = SelectionOptions::default();
        Self {
            catalog: CatalogConfig {
                path: PathBuf::from("data/catalog.json"),
                reference_path: None,
            },
            selection: SelectionConfig {
                duty_class: options.duty_class,
                ambient_temperature_c: options.ambient_temperature_c,
                requires_cover: options.requires_cover,
                max_ranked: 10,
                tolerances: Tolerances::default(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SelectionConfig {
    /// Per-run options seeded from configured defaults.
    pub fn options(&self) -> SelectionOptions {
        SelectionOptions {
            duty_class: self.duty_class,
            ambient_temperature_c: self.ambient_temperature_c,
            requires_cover: self.requires_cover,
            application: None,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
            if let Some(reference_path) = catalog.reference_path {
                self.catalog.reference_path = Some(reference_path);
            }
        }

        if let Some(selection) = patch.selection {
            if let Some(duty_class) = selection.duty_class {
                self.selection.duty_class = duty_class;
            }
            if let Some(ambient_temperature_c) = selection.ambient_temperature_c {
                self.selection.ambient_temperature_c = ambient_temperature_c;
            }
            if let Some(requires_cover) = selection.requires_cover {
                self.selection.requires_cover = requires_cover;
            }
            if let Some(max_ranked) = selection.max_ranked {
                self.selection.max_ranked = max_ranked;
            }
            let tolerances = &mut self.selection.tolerances;
            patch_f64(&mut tolerances.ratio_tolerance, selection.ratio_tolerance);
            patch_f64(&mut tolerances.ratio_near_tolerance, selection.ratio_near_tolerance);
            patch_f64(&mut tolerances.capacity_near_floor, selection.capacity_near_floor);
            patch_f64(&mut tolerances.max_capacity_margin_pct, selection.max_capacity_margin_pct);
            patch_f64(
                &mut tolerances.capacity_margin_near_factor,
                selection.capacity_margin_near_factor,
            );
            patch_f64(&mut tolerances.thrust_near_floor, selection.thrust_near_floor);
            patch_f64(&mut tolerances.near_match_penalty, selection.near_match_penalty);
            patch_f64(
                &mut tolerances.ideal_capacity_margin_pct,
                selection.ideal_capacity_margin_pct,
            );
            patch_f64(&mut tolerances.pump_fallback_min_flow, selection.pump_fallback_min_flow);
            patch_f64(&mut tolerances.high_margin_notice_pct, selection.high_margin_notice_pct);
            patch_f64(&mut tolerances.gw_min_power_kw, selection.gw_min_power_kw);
            patch_f64(&mut tolerances.hcm_min_speed_rpm, selection.hcm_min_speed_rpm);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GEARMATCH_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("GEARMATCH_REFERENCE_PATH") {
            self.catalog.reference_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("GEARMATCH_SELECTION_DUTY_CLASS") {
            self.selection.duty_class = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "GEARMATCH_SELECTION_DUTY_CLASS".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("GEARMATCH_SELECTION_AMBIENT_TEMPERATURE_C") {
            self.selection.ambient_temperature_c =
                parse_f64("GEARMATCH_SELECTION_AMBIENT_TEMPERATURE_C", &value)?;
        }
        if let Some(value) = read_env("GEARMATCH_SELECTION_REQUIRES_COVER") {
            self.selection.requires_cover =
                parse_bool("GEARMATCH_SELECTION_REQUIRES_COVER", &value)?;
        }
        if let Some(value) = read_env("GEARMATCH_SELECTION_MAX_RANKED") {
            self.selection.max_ranked = parse_usize("GEARMATCH_SELECTION_MAX_RANKED", &value)?;
        }

        let tolerances = &mut self.selection.tolerances;
        let tolerance_vars: [(&str, &mut f64); 12] = [
            ("GEARMATCH_SELECTION_RATIO_TOLERANCE", &mut tolerances.ratio_tolerance),
            ("GEARMATCH_SELECTION_RATIO_NEAR_TOLERANCE", &mut tolerances.ratio_near_tolerance),
            ("GEARMATCH_SELECTION_CAPACITY_NEAR_FLOOR", &mut tolerances.capacity_near_floor),
            (
                "GEARMATCH_SELECTION_MAX_CAPACITY_MARGIN_PCT",
                &mut tolerances.max_capacity_margin_pct,
            ),
            (
                "GEARMATCH_SELECTION_CAPACITY_MARGIN_NEAR_FACTOR",
                &mut tolerances.capacity_margin_near_factor,
            ),
            ("GEARMATCH_SELECTION_THRUST_NEAR_FLOOR", &mut tolerances.thrust_near_floor),
            ("GEARMATCH_SELECTION_NEAR_MATCH_PENALTY", &mut tolerances.near_match_penalty),
            (
                "GEARMATCH_SELECTION_IDEAL_CAPACITY_MARGIN_PCT",
                &mut tolerances.ideal_capacity_margin_pct,
            ),
            ("GEARMATCH_SELECTION_PUMP_FALLBACK_MIN_FLOW", &mut tolerances.pump_fallback_min_flow),
            ("GEARMATCH_SELECTION_HIGH_MARGIN_NOTICE_PCT", &mut tolerances.high_margin_notice_pct),
            ("GEARMATCH_SELECTION_GW_MIN_POWER_KW", &mut tolerances.gw_min_power_kw),
            ("GEARMATCH_SELECTION_HCM_MIN_SPEED_RPM", &mut tolerances.hcm_min_speed_rpm),
        ];
        for (key, slot) in tolerance_vars {
            if let Some(value) = read_env(key) {
                *slot = parse_f64(key, &value)?;
            }
        }

        let log_level =
            read_env("GEARMATCH_LOGGING_LEVEL").or_else(|| read_env("GEARMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GEARMATCH_LOGGING_FORMAT").or_else(|| read_env("GEARMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = catalog_path;
        }
        if let Some(reference_path) = overrides.reference_path {
            self.catalog.reference_path = Some(reference_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(duty_class) = overrides.duty_class {
            self.selection.duty_class = duty_class;
        }
        if let Some(ambient_temperature_c) = overrides.ambient_temperature_c {
            self.selection.ambient_temperature_c = ambient_temperature_c;
        }
        if let Some(requires_cover) = overrides.requires_cover {
            self.selection.requires_cover = requires_cover;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_selection(&self.selection)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "catalog.path must not be empty (set it in gearmatch.toml or GEARMATCH_CATALOG_PATH)"
                .to_string(),
        ));
    }
    if catalog.reference_path.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
        return Err(ConfigError::Validation(
            "catalog.reference_path must not be empty when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_selection(selection: &SelectionConfig) -> Result<(), ConfigError> {
    if !selection.ambient_temperature_c.is_finite() {
        return Err(ConfigError::Validation(
            "selection.ambient_temperature_c must be a finite number".to_string(),
        ));
    }

    let tolerances = &selection.tolerances;
    if !(tolerances.ratio_tolerance > 0.0
        && tolerances.ratio_tolerance <= tolerances.ratio_near_tolerance)
    {
        return Err(ConfigError::Validation(
            "selection tolerances must satisfy 0 < ratio_tolerance <= ratio_near_tolerance"
                .to_string(),
        ));
    }

    for (key, value) in [
        ("capacity_near_floor", tolerances.capacity_near_floor),
        ("thrust_near_floor", tolerances.thrust_near_floor),
        ("near_match_penalty", tolerances.near_match_penalty),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::Validation(format!("selection.{key} must be in range (0, 1]")));
        }
    }

    if !(tolerances.max_capacity_margin_pct > 0.0 && tolerances.max_capacity_margin_pct.is_finite())
    {
        return Err(ConfigError::Validation(
            "selection.max_capacity_margin_pct must be greater than zero".to_string(),
        ));
    }
    if !(tolerances.capacity_margin_near_factor >= 1.0
        && tolerances.capacity_margin_near_factor.is_finite())
    {
        return Err(ConfigError::Validation(
            "selection.capacity_margin_near_factor must be at least 1.0".to_string(),
        ));
    }
    if !(tolerances.ideal_capacity_margin_pct >= 0.0
        && tolerances.ideal_capacity_margin_pct.is_finite())
    {
        return Err(ConfigError::Validation(
            "selection.ideal_capacity_margin_pct must not be negative".to_string(),
        ));
    }
    for (key, value) in [
        ("pump_fallback_min_flow", tolerances.pump_fallback_min_flow),
        ("high_margin_notice_pct", tolerances.high_margin_notice_pct),
        ("gw_min_power_kw", tolerances.gw_min_power_kw),
        ("hcm_min_speed_rpm", tolerances.hcm_min_speed_rpm),
    ] {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ConfigError::Validation(format!("selection.{key} must not be negative")));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn patch_f64(slot: &mut f64, value: Option<f64>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .trim()
        .parse::<bool>()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    selection: Option<SelectionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
    reference_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectionPatch {
    duty_class: Option<DutyClass>,
    ambient_temperature_c: Option<f64>,
    requires_cover: Option<bool>,
    max_ranked: Option<usize>,
    ratio_tolerance: Option<f64>,
    ratio_near_tolerance: Option<f64>,
    capacity_near_floor: Option<f64>,
    max_capacity_margin_pct: Option<f64>,
    capacity_margin_near_factor: Option<f64>,
    thrust_near_floor: Option<f64>,
    near_match_penalty: Option<f64>,
    ideal_capacity_margin_pct: Option<f64>,
    pump_fallback_min_flow: Option<f64>,
    high_margin_notice_pct: Option<f64>,
    gw_min_power_kw: Option<f64>,
    hcm_min_speed_rpm: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::requirements::DutyClass;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_GEARMATCH_DATA_DIR", "/srv/gearmatch");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("gearmatch.toml");
            fs::write(
                &path,
                r#"
[catalog]
path = "${TEST_GEARMATCH_DATA_DIR}/catalog.json"
reference_path = "${TEST_GEARMATCH_DATA_DIR}/reference.json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
            let config =
                AppConfig::load(options).map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.path == PathBuf::from("/srv/gearmatch/catalog.json"),
                "catalog path should be interpolated from environment",
            )?;
            let expected_reference = PathBuf::from("/srv/gearmatch/reference.json");
            ensure(
                config.catalog.reference_path == Some(expected_reference),
                "reference path should be interpolated from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_GEARMATCH_DATA_DIR"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEARMATCH_LOG_LEVEL", "warn");
        env::set_var("GEARMATCH_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["GEARMATCH_LOG_LEVEL", "GEARMATCH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEARMATCH_CATALOG_PATH", "from-env.json");
        env::set_var("GEARMATCH_SELECTION_RATIO_NEAR_TOLERANCE", "0.4");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("gearmatch.toml");
            fs::write(
                &path,
                r#"
[catalog]
path = "from-file.json"

[selection]
duty_class = "high_variation"
ratio_tolerance = 0.2
ratio_near_tolerance = 0.3

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    duty_class: Some(DutyClass::LowVariation),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.path == PathBuf::from("from-env.json"),
                "env catalog path should win over file",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.selection.duty_class == DutyClass::LowVariation,
                "override duty class should win",
            )?;
            ensure(
                config.selection.tolerances.ratio_tolerance == 0.2,
                "file ratio tolerance should apply",
            )?;
            ensure(
                config.selection.tolerances.ratio_near_tolerance == 0.4,
                "env near tolerance should win over file",
            )?;
            ensure(
                config.selection.tolerances.capacity_near_floor == 0.85,
                "untouched tolerance keeps default",
            )?;
            Ok(())
        })();

        clear_vars(&["GEARMATCH_CATALOG_PATH", "GEARMATCH_SELECTION_RATIO_NEAR_TOLERANCE"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEARMATCH_SELECTION_RATIO_TOLERANCE", "0.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("ratio_tolerance")
            );
            ensure(has_message, "validation failure should mention ratio_tolerance")
        })();

        clear_vars(&["GEARMATCH_SELECTION_RATIO_TOLERANCE"]);
        result
    }

    #[test]
    fn notice_thresholds_load_from_file_and_reject_negatives() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEARMATCH_SELECTION_HCM_MIN_SPEED_RPM", "-1");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("gearmatch.toml");
            fs::write(
                &path,
                "[selection]\ngw_min_power_kw = 200.0\nhigh_margin_notice_pct = 60.0\n",
            )
                .map_err(|err| err.to_string())?;

            let error = match AppConfig::load(LoadOptions {
                config_path: Some(path.clone()),
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("negative hcm_min_speed_rpm should fail validation".to_string())
                }
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message) if message.contains("hcm_min_speed_rpm"),
                ),
                "validation failure should name hcm_min_speed_rpm",
            )?;

            clear_vars(&["GEARMATCH_SELECTION_HCM_MIN_SPEED_RPM"]);
            let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
            let config =
                AppConfig::load(options).map_err(|err| format!("config load failed: {err}"))?;
            let tolerances = &config.selection.tolerances;
            ensure(tolerances.gw_min_power_kw == 200.0, "file gw_min_power_kw should apply")?;
            ensure(
                tolerances.high_margin_notice_pct == 60.0,
                "file high_margin_notice_pct should apply",
            )?;
            ensure(tolerances.hcm_min_speed_rpm == 1000.0, "hcm_min_speed_rpm keeps its default")?;
            Ok(())
        })();

        clear_vars(&["GEARMATCH_SELECTION_HCM_MIN_SPEED_RPM"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEARMATCH_SELECTION_DUTY_CLASS", "catastrophic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "GEARMATCH_SELECTION_DUTY_CLASS"
                ),
                "invalid duty class should name the env var",
            )
        })();

        clear_vars(&["GEARMATCH_SELECTION_DUTY_CLASS"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let error = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(error, Err(ConfigError::MissingConfigFile(_))),
            "missing file should be reported",
        )
    }
}
