//! Output formatting and logging utilities

use color_eyre::eyre::{Result, WrapErr};
use imf_sim::{HistorySample, TrialSummary};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let total_seconds = StdSystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(_) => eprintln!("Could not create output file: {}", path),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

/// Print the outcome of a single trial
pub fn print_summary<W: Write>(writer: &mut W, summary: &TrialSummary, transitions: (usize, usize)) -> Result<()> {
    writeln!(writer, "Trial summary for '{}':", summary.scenario)?;
    writeln!(writer, "  Simulated time:   {:.2} s", summary.elapsed_s)?;
    writeln!(writer, "  Particles seen:   {}", summary.total_seen)?;
    writeln!(writer, "  Escaped:          {}", summary.escaped_count)?;
    writeln!(writer, "  Escaped fraction: {:.4}", summary.escaped_fraction())?;
    writeln!(writer, "  Gas at end:       {}", summary.gas_count)?;
    writeln!(writer, "  Evaporations:     {}", transitions.0)?;
    writeln!(writer, "  Condensations:    {}", transitions.1)?;
    Ok(())
}

/// Print one row per scenario, ordered as given
pub fn print_comparison<W: Write>(writer: &mut W, seed: u64, summaries: &[TrialSummary]) -> Result<()> {
    writeln!(writer, "Escape comparison (seed {}):", seed)?;
    writeln!(writer, "  {:<20} {:>8} {:>8} {:>10}", "scenario", "escaped", "seen", "fraction")?;
    for s in summaries {
        writeln!(
            writer,
            "  {:<20} {:>8} {:>8} {:>10.4}",
            s.scenario,
            s.escaped_count,
            s.total_seen,
            s.escaped_fraction()
        )?;
    }
    Ok(())
}

/// Dump the history samples as pretty JSON
pub fn write_history(path: &str, history: &[HistorySample]) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("Unable to create history file: {}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, history).wrap_err("Failed to serialize history")?;
    writer.flush()?;
    info!("History ({} samples) written to: {}", history.len(), path);
    Ok(())
}
