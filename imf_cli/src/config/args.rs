//! Command-line argument parsing for evaporation trials

use clap::Parser;

/// Headless evaporation trial with optional YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file (default: water preset)
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Override random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override simulated duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Override external time step in seconds
    #[arg(long)]
    pub dt: Option<f64>,

    /// Use a named material preset (hexane, ethanol, water, honey)
    #[arg(short, long)]
    pub material: Option<String>,

    /// Use the playground interpolation at this IMF strength in [0, 1]
    #[arg(long, conflicts_with = "material")]
    pub imf_strength: Option<f64>,

    /// Override particle count
    #[arg(short = 'n', long)]
    pub particles: Option<usize>,

    /// Switch the heating strip off
    #[arg(long)]
    pub no_heating: bool,

    /// Switch gravity off
    #[arg(long)]
    pub no_gravity: bool,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write the (t, gas, escaped) history to this JSON file
    #[arg(long)]
    pub history_out: Option<String>,

    /// Run every preset with the same seed and compare escape fractions
    #[arg(long)]
    pub compare: bool,
}
