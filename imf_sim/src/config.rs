use crate::engine::{max_sigma, SimulationEngine, TRIAL_DURATION_S};
use crate::error::{invalid, Result};
use crate::scenario::{Material, ScenarioParameters};
use crate::world::Container;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest external step the engine accepts (s): one frame at 30 Hz.
pub const MAX_DT: f64 = 1.0 / 30.0;

/// Configuration for a headless evaporation trial
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrialConfig {
    #[serde(default)]
    pub container: ContainerConfig,
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ContainerConfig {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_true")]
    pub gravity: bool,
    #[serde(default = "default_true")]
    pub heating: bool,
}

/// Where the scenario parameters come from
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ScenarioConfig {
    /// One of the named materials
    #[serde(rename = "preset")]
    Preset { material: Material },
    /// Interpolated between the weak and strong endpoints
    #[serde(rename = "playground")]
    Playground { imf_strength: f64 },
    /// Fully specified parameter set
    #[serde(rename = "custom")]
    Custom { params: ScenarioParameters },
}

/// Optional adjustments applied on top of the scenario
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Overrides {
    pub particle_count: Option<usize>,
    pub heat_intensity: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Random seed; drawn from entropy when absent
    pub seed: Option<u64>,
}

fn default_width() -> f64 {
    480.0
}
fn default_height() -> f64 {
    320.0
}
fn default_true() -> bool {
    true
}
fn default_dt() -> f64 {
    1.0 / 30.0
}
fn default_duration() -> f64 {
    TRIAL_DURATION_S
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            width: default_width(),
            height: default_height(),
            gravity: true,
            heating: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            dt: default_dt(),
            duration: default_duration(),
            seed: None,
        }
    }
}

impl TrialConfig {
    pub fn preset(material: Material) -> Self {
        TrialConfig {
            container: ContainerConfig::default(),
            scenario: ScenarioConfig::Preset { material },
            overrides: Overrides::default(),
            run: RunConfig::default(),
        }
    }

    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: TrialConfig = serde_yml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn container(&self) -> Container {
        Container {
            width: self.container.width,
            height: self.container.height,
            gravity_on: self.container.gravity,
            heating_on: self.container.heating,
        }
    }

    /// Scenario parameters with the overrides applied.
    pub fn scenario_parameters(&self) -> ScenarioParameters {
        let mut params = match &self.scenario {
            ScenarioConfig::Preset { material } => material.parameters(),
            ScenarioConfig::Playground { imf_strength } => {
                ScenarioParameters::from_imf_strength(*imf_strength)
            }
            ScenarioConfig::Custom { params } => params.clone(),
        };
        if let Some(n) = self.overrides.particle_count {
            params.particle_count = n;
        }
        if let Some(intensity) = self.overrides.heat_intensity {
            params.heat_intensity = intensity;
        }
        params
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let dt = self.run.dt;
        if !dt.is_finite() || dt <= 0.0 || dt > MAX_DT {
            return invalid(format!("time step must be within (0, {:.4}], got {}", MAX_DT, dt));
        }
        let duration = self.run.duration;
        if !duration.is_finite() || duration <= 0.0 || duration > TRIAL_DURATION_S {
            return invalid(format!(
                "duration must be within (0, {}], got {}",
                TRIAL_DURATION_S, duration
            ));
        }
        if let ScenarioConfig::Playground { imf_strength } = self.scenario {
            if !(0.0..=1.0).contains(&imf_strength) {
                return invalid(format!("imf_strength must be within [0, 1], got {}", imf_strength));
            }
        }

        self.container().validate()?;
        self.scenario_parameters().validate(max_sigma())
    }

    /// Explicit seed if configured, fresh entropy otherwise.
    pub fn seed(&self) -> u64 {
        self.run.seed.unwrap_or_else(rand::random)
    }

    pub fn build_engine(&self) -> Result<SimulationEngine> {
        self.validate()?;
        SimulationEngine::new(self.container(), self.scenario_parameters(), self.seed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_validation() {
        let mut config = TrialConfig::preset(Material::Water);
        assert!(config.validate().is_ok());

        config.run.dt = 0.05;
        assert!(config.validate().is_err());
        config.run.dt = 1.0 / 60.0;

        config.run.duration = 45.0;
        assert!(config.validate().is_err());
        config.run.duration = 10.0;

        config.overrides.particle_count = Some(0);
        assert!(config.validate().is_err());
        config.overrides.particle_count = Some(500);
        assert!(config.validate().is_ok());

        config.scenario = ScenarioConfig::Playground { imf_strength: 1.5 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets_validate_with_default_run() {
        for material in Material::ALL {
            let config = TrialConfig::preset(material);
            assert!(config.validate().is_ok(), "{} rejected", material);
        }
        let mut config = TrialConfig::preset(Material::Water);
        config.run.dt = MAX_DT;
        assert!(config.validate().is_ok());
        config.run.dt = MAX_DT + 1e-6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
scenario:
  type: playground
  imf_strength: 0.25
overrides:
  particle_count: 120
run:
  dt: 0.02
  seed: 42
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = TrialConfig::from_file(file.path()).unwrap();
        assert_eq!(config.container, ContainerConfig::default());
        assert_eq!(config.run.duration, TRIAL_DURATION_S);
        assert_eq!(config.seed(), 42);

        let params = config.scenario_parameters();
        assert_eq!(params.particle_count, 120);
        assert!(params.viscosity > 0.3 && params.viscosity < 2.0);

        let engine = config.build_engine().unwrap();
        assert_eq!(engine.len(), 120);
        assert_eq!(engine.seed(), 42);
    }

    #[test]
    fn test_file_roundtrip() {
        let mut config = TrialConfig::preset(Material::Honey);
        config.container.heating = false;
        config.run.seed = Some(7);

        let file = NamedTempFile::new().unwrap();
        config.to_file(file.path()).unwrap();
        let loaded = TrialConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.container().heating_on);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"scenario: [not, a, scenario]").unwrap();
        assert!(TrialConfig::from_file(file.path()).is_err());
        assert!(TrialConfig::from_file("/nonexistent/trial.yaml").is_err());
    }
}
