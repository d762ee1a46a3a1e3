//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Retail diesel price ($/L).
pub const DIESEL_PRICE_PER_L: f64 = 1.20;
/// Emission factor of burnt diesel (kg CO2 per litre).
pub const DIESEL_CO2_KG_PER_L: f64 = 2.68;
/// Emission factor of imported grid energy (kg CO2 per kWh).
pub const GRID_CO2_KG_PER_KWH: f64 = 0.43;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `&[StepResult]` so reported figures always agree
/// with the step records. Each step is weighted by its own `timestep_hours`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Number of steps aggregated.
    pub steps: usize,
    /// Simulated duration (h).
    pub duration_hours: f64,
    /// Energy demanded (kWh).
    pub demand_kwh: f64,
    /// Wind plus solar energy produced (kWh).
    pub renewable_generation_kwh: f64,
    /// Diesel energy produced (kWh).
    pub diesel_generation_kwh: f64,
    /// Share of demand met by renewables (0..=1, may exceed 1 with export).
    pub renewable_fraction: f64,
    /// Diesel burnt (L).
    pub diesel_usage_l: f64,
    /// Fuel bill ($).
    pub diesel_cost: f64,
    /// Energy imported from the grid (kWh).
    pub grid_import_kwh: f64,
    /// Energy exported to the grid (kWh).
    pub grid_export_kwh: f64,
    /// Net grid bill ($; negative is revenue).
    pub grid_cost: f64,
    /// `grid_cost + diesel_cost` ($).
    pub total_cost: f64,
    /// Diesel and grid-import emissions (kg CO2).
    pub co2_emissions_kg: f64,
    /// Peak grid import power (kW, positive).
    pub peak_import_kw: f64,
    /// Peak grid export power (kW, positive magnitude).
    pub peak_export_kw: f64,
    /// Total battery energy throughput (kWh, sum of |power| * dt).
    pub battery_throughput_kwh: f64,
    /// Energy no grid connection could take (kWh, sum of |unbalanced| * dt).
    pub unbalanced_kwh: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    pub fn from_results(results: &[StepResult]) -> Self {
        let mut kpi = Self {
            steps: results.len(),
            ..Self::default()
        };

        for r in results {
            let h = r.timestep_hours;
            kpi.duration_hours += h;
            kpi.demand_kwh += r.demand_kw * h;
            kpi.renewable_generation_kwh += r.renewable_generation_kw * h;
            kpi.diesel_generation_kwh += r.diesel_generation_kw * h;
            kpi.diesel_usage_l += r.diesel_usage_lph * h;
            kpi.grid_cost += r.grid_cost;

            if r.grid_power_kw > 0.0 {
                kpi.grid_import_kwh += r.grid_power_kw * h;
            } else {
                kpi.grid_export_kwh += -r.grid_power_kw * h;
            }
            kpi.peak_import_kw = kpi.peak_import_kw.max(r.grid_power_kw);
            kpi.peak_export_kw = kpi.peak_export_kw.max(-r.grid_power_kw);

            kpi.battery_throughput_kwh += r.battery_power_kw.abs() * h;
            kpi.unbalanced_kwh += r.unbalanced_kw.abs() * h;
        }

        kpi.renewable_fraction = if kpi.demand_kwh > 0.0 {
            kpi.renewable_generation_kwh / kpi.demand_kwh
        } else {
            0.0
        };
        kpi.diesel_cost = kpi.diesel_usage_l * DIESEL_PRICE_PER_L;
        kpi.total_cost = kpi.grid_cost + kpi.diesel_cost;
        kpi.co2_emissions_kg =
            kpi.diesel_usage_l * DIESEL_CO2_KG_PER_L + kpi.grid_import_kwh * GRID_CO2_KG_PER_KWH;
        kpi
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Duration:              {} steps ({:.1} h)",
            self.steps, self.duration_hours
        )?;
        writeln!(f, "Demand:                {:.1} kWh", self.demand_kwh)?;
        writeln!(
            f,
            "Renewable generation:  {:.1} kWh ({:.1}% of demand)",
            self.renewable_generation_kwh,
            self.renewable_fraction * 100.0
        )?;
        writeln!(
            f,
            "Diesel:                {:.1} kWh, {:.1} L (${:.2})",
            self.diesel_generation_kwh, self.diesel_usage_l, self.diesel_cost
        )?;
        writeln!(
            f,
            "Grid:                  +{:.1} / -{:.1} kWh (${:.2})",
            self.grid_import_kwh, self.grid_export_kwh, self.grid_cost
        )?;
        writeln!(f, "Peak import:           {:.2} kW", self.peak_import_kw)?;
        writeln!(f, "Peak export:           {:.2} kW", self.peak_export_kw)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh",
            self.battery_throughput_kwh
        )?;
        if self.unbalanced_kwh > 0.0 {
            writeln!(f, "Unbalanced energy:     {:.2} kWh", self.unbalanced_kwh)?;
        }
        writeln!(f, "CO2 emissions:         {:.1} kg", self.co2_emissions_kg)?;
        write!(f, "Total cost:            ${:.2}", self.total_cost)
    }
}
