use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Torque-variability severity of the driven application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyClass {
    /// Class I: torque varies very little.
    VeryLowVariation,
    /// Class II: small torque variation.
    LowVariation,
    /// Class III: moderate torque variation.
    #[default]
    ModerateVariation,
    /// Class IV: large torque variation.
    HighVariation,
    /// Class V: very large torque variation.
    VeryHighVariation,
}

impl DutyClass {
    pub const ALL: [DutyClass; 5] = [
        Self::VeryLowVariation,
        Self::LowVariation,
        Self::ModerateVariation,
        Self::HighVariation,
        Self::VeryHighVariation,
    ];

    pub fn roman(&self) -> &'static str {
        match self {
            Self::VeryLowVariation => "I",
            Self::LowVariation => "II",
            Self::ModerateVariation => "III",
            Self::HighVariation => "IV",
            Self::VeryHighVariation => "V",
        }
    }
}

impl std::str::FromStr for DutyClass {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "i" | "1" | "very_low" | "very_low_variation" => Ok(Self::VeryLowVariation),
            "ii" | "2" | "low" | "low_variation" => Ok(Self::LowVariation),
            "iii" | "3" | "moderate" | "moderate_variation" => Ok(Self::ModerateVariation),
            "iv" | "4" | "high" | "high_variation" => Ok(Self::HighVariation),
            "v" | "5" | "very_high" | "very_high_variation" => Ok(Self::VeryHighVariation),
            other => Err(DomainError::invalid(
                "duty_class",
                format!(
                    "unsupported duty class `{other}` \
                     (expected I..V or very_low|low|moderate|high|very_high)"
                ),
            )),
        }
    }
}

/// Accessory preferences applied to one selection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionOptions {
    pub duty_class: DutyClass,
    pub ambient_temperature_c: f64,
    pub requires_cover: bool,
    pub application: Option<String>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            duty_class: DutyClass::default(),
            ambient_temperature_c: 30.0,
            requires_cover: false,
            application: None,
        }
    }
}

/// Operating requirements for one selection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequirementSet {
    pub power_kw: f64,
    pub input_speed_rpm: f64,
    pub target_ratio: f64,
    pub thrust_kn: Option<f64>,
    #[serde(default)]
    pub options: SelectionOptions,
}

impl RequirementSet {
    pub fn new(power_kw: f64, input_speed_rpm: f64, target_ratio: f64) -> Self {
        Self {
            power_kw,
            input_speed_rpm,
            target_ratio,
            thrust_kn: None,
            options: SelectionOptions::default(),
        }
    }

    pub fn with_thrust(mut self, thrust_kn: f64) -> Self {
        self.thrust_kn = Some(thrust_kn);
        self
    }

    pub fn with_options(mut self, options: SelectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Transfer capacity the gearbox must carry, in kW per input rpm.
    pub fn required_capacity(&self) -> f64 {
        self.power_kw / self.input_speed_rpm
    }

    /// Engine output torque in N·m.
    pub fn engine_torque_nm(&self) -> f64 {
        self.power_kw * 9550.0 / self.input_speed_rpm
    }

    /// Thrust demand when one is actually specified.
    pub fn thrust_demand(&self) -> Option<f64> {
        self.thrust_kn.filter(|thrust| *thrust > 0.0)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        positive("power_kw", self.power_kw)?;
        positive("input_speed_rpm", self.input_speed_rpm)?;
        positive("target_ratio", self.target_ratio)?;

        if let Some(thrust) = self.thrust_kn {
            if !thrust.is_finite() || thrust < 0.0 {
                return Err(DomainError::invalid("thrust_kn", "must be a non-negative number"));
            }
        }

        if !self.options.ambient_temperature_c.is_finite() {
            return Err(DomainError::invalid("ambient_temperature_c", "must be a finite number"));
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), DomainError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DomainError::invalid(field, format!("must be greater than zero (got {value})")))
    }
}
