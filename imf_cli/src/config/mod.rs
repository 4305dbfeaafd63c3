//! Configuration management for evaporation trials
//!
//! The library's [`TrialConfig`] is loaded from YAML and then adjusted by the
//! command-line overrides.

mod args;

pub use args::Args;

use color_eyre::eyre::{eyre, Result, WrapErr};
use imf_sim::config::ScenarioConfig;
use imf_sim::{Material, TrialConfig};
use tracing::info;

/// Load the trial configuration and apply command-line overrides
pub fn load_config(args: &Args) -> Result<TrialConfig> {
    let mut config = match &args.config_file {
        Some(path) => {
            info!("Reading configuration from: {}", path);
            TrialConfig::from_file(path)
                .wrap_err_with(|| format!("Unable to load configuration file: {}", path))?
        }
        None => {
            info!("No configuration file given, using the water preset");
            TrialConfig::preset(Material::Water)
        }
    };
    apply_overrides(&mut config, args)?;
    config.validate().wrap_err("Invalid trial configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut TrialConfig, args: &Args) -> Result<()> {
    if let Some(name) = &args.material {
        let material = Material::parse(name).ok_or_else(|| eyre!("Unknown material: {}", name))?;
        info!("Overriding scenario with preset: {}", material);
        config.scenario = ScenarioConfig::Preset { material };
    }
    if let Some(s) = args.imf_strength {
        info!("Overriding scenario with playground strength: {}", s);
        config.scenario = ScenarioConfig::Playground { imf_strength: s };
    }
    if let Some(n) = args.particles {
        info!("Overriding particle count with: {}", n);
        config.overrides.particle_count = Some(n);
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(duration) = args.duration {
        config.run.duration = duration;
    }
    if let Some(dt) = args.dt {
        config.run.dt = dt;
    }
    if args.no_heating {
        config.container.heating = false;
    }
    if args.no_gravity {
        config.container.gravity = false;
    }
    Ok(())
}
