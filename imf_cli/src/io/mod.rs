//! Input/Output operations for evaporation trials
//!
//! This module handles logging setup, report tables and the history dump.

mod output;

pub use output::{print_comparison, print_summary, setup_output, write_history};
