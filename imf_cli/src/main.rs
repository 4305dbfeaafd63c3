//! Evaporation Trial Command-Line Interface
//!
//! Runs the intermolecular-force simulation headless from a YAML
//! configuration and reports how much of the liquid escaped.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use imf_sim::config::ScenarioConfig;
use imf_sim::{HistorySample, Material, PhaseState, StateChange, TrialConfig, TrialObserver, TrialSummary};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

mod config;
mod io;

use config::{load_config, Args};
use io::{print_comparison, print_summary, setup_output, write_history};

/// Interval between progress lines (simulated seconds)
const REPORT_INTERVAL_S: f64 = 5.0;

/// Counts evaporations and condensations as they happen
#[derive(Default)]
struct TransitionTally {
    evaporations: usize,
    condensations: usize,
}

struct SharedTally(Rc<RefCell<TransitionTally>>);

impl TrialObserver for SharedTally {
    fn on_state_change(&mut self, change: &StateChange) {
        let mut tally = self.0.borrow_mut();
        match change.to {
            PhaseState::Gas => tally.evaporations += 1,
            PhaseState::Liquid => tally.condensations += 1,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_output(args.output.as_ref());

    let config = load_config(&args)?;
    info!("Configuration loaded:\n{:?}", config);

    if args.compare {
        run_comparison(&config)
    } else {
        run_single_trial(&config, &args)
    }
}

/// Run one trial and return its summary with the transition tally
fn run_trial(
    config: &TrialConfig,
    seed: u64,
) -> Result<(TrialSummary, TransitionTally, Vec<HistorySample>)> {
    let mut config = config.clone();
    config.run.seed = Some(seed);
    let mut engine = config.build_engine().wrap_err("Failed to build simulation engine")?;

    let tally = Rc::new(RefCell::new(TransitionTally::default()));
    engine.subscribe(Box::new(SharedTally(tally.clone())));

    info!(
        "\nStarting trial '{}' with {} particles (seed {})",
        engine.params().name,
        engine.len(),
        seed
    );
    let mut next_report = REPORT_INTERVAL_S;
    while engine.elapsed() < config.run.duration - 1e-9 && !engine.is_finished() {
        engine.step(config.run.dt);
        if engine.elapsed() >= next_report {
            info!(
                "  t = {:>6.2} s  gas = {:>4}  escaped = {:>4}  <KE> = {:.3}",
                engine.elapsed(),
                engine.gas_count(),
                engine.escaped_count(),
                engine.mean_kinetic_energy()
            );
            next_report += REPORT_INTERVAL_S;
        }
    }

    let history = engine.history().iter().cloned().collect();
    let tally = tally.replace(TransitionTally::default());
    Ok((engine.summary(), tally, history))
}

fn run_single_trial(config: &TrialConfig, args: &Args) -> Result<()> {
    let seed = config.seed();
    let (summary, tally, history) = run_trial(config, seed)?;

    let mut stdout = std::io::stdout();
    print_summary(&mut stdout, &summary, (tally.evaporations, tally.condensations))?;

    if let Some(path) = &args.history_out {
        write_history(path, &history)?;
    }
    Ok(())
}

fn run_comparison(config: &TrialConfig) -> Result<()> {
    let seed = config.seed();
    let mut summaries = Vec::with_capacity(Material::ALL.len());
    for material in Material::ALL {
        let mut trial = config.clone();
        trial.scenario = ScenarioConfig::Preset { material };
        let (summary, _, _) = run_trial(&trial, seed)?;
        summaries.push(summary);
    }

    let mut stdout = std::io::stdout();
    print_comparison(&mut stdout, seed, &summaries)?;
    Ok(())
}
