//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Schema v1 column header for CSV telemetry export.
const HEADER: &str = "timestamp,timestep_hours,demand_kw,renewable_kw,diesel_kw,\
                       battery_kw,grid_kw,unbalanced_kw,battery_soc_kwh,battery_soc_pct,\
                       diesel_usage_lph,grid_cost,diesel_strategy";

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step using the schema v1
/// column layout. Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            format!("{:.4}", r.timestep_hours),
            format!("{:.4}", r.demand_kw),
            format!("{:.4}", r.renewable_generation_kw),
            format!("{:.4}", r.diesel_generation_kw),
            format!("{:.4}", r.battery_power_kw),
            format!("{:.4}", r.grid_power_kw),
            format!("{:.4}", r.unbalanced_kw),
            format!("{:.4}", r.battery_soc_kwh),
            format!("{:.2}", r.battery_soc_pct()),
            format!("{:.4}", r.diesel_usage_lph),
            format!("{:.4}", r.grid_cost),
            r.diesel_strategy.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
