//! Color constants and auto-scaling helpers for the TUI.

use ratatui::style::Color;

/// Demand line color.
pub const DEMAND_COLOR: Color = Color::White;
/// Wind plus solar line color.
pub const RENEWABLE_COLOR: Color = Color::Green;
/// Grid flow line color.
pub const GRID_COLOR: Color = Color::Cyan;
/// Diesel line color.
pub const DIESEL_COLOR: Color = Color::Red;
/// SOC gauge color when high (>= 50%).
pub const SOC_HIGH: Color = Color::Green;
/// SOC gauge color when medium (>= 30%, the battery-charging threshold).
pub const SOC_MID: Color = Color::Yellow;
/// SOC gauge color when low (< 30%).
pub const SOC_LOW: Color = Color::Red;
/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Strategy badge color.
pub const STRATEGY_FG: Color = Color::Magenta;
/// Error text color.
pub const ERROR_FG: Color = Color::Red;

/// Returns a color based on the state of charge in percent.
pub fn soc_color(soc_pct: f64) -> Color {
    if soc_pct >= 50.0 {
        SOC_HIGH
    } else if soc_pct >= 30.0 {
        SOC_MID
    } else {
        SOC_LOW
    }
}

/// Computes Y-axis bounds over every series with 10% padding.
pub fn auto_bounds_y(series: &[&[(f64, f64)]]) -> [f64; 2] {
    let all = series.iter().flat_map(|s| s.iter()).map(|&(_, y)| y);
    let min = all.clone().fold(f64::INFINITY, f64::min);
    let max = all.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [-1.0, 1.0];
    }
    let range = (max - min).max(0.1);
    let pad = range * 0.1;
    [min - pad, max + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_series() {
        let a = [(0.0, -5.0), (1.0, 2.0)];
        let b = [(0.0, 10.0)];
        let [lo, hi] = auto_bounds_y(&[&a, &b]);
        assert!(lo < -5.0 && hi > 10.0);
        assert_eq!(auto_bounds_y(&[]), [-1.0, 1.0]);
    }

    #[test]
    fn soc_colors_follow_thresholds() {
        assert_eq!(soc_color(80.0), SOC_HIGH);
        assert_eq!(soc_color(30.0), SOC_MID);
        assert_eq!(soc_color(29.9), SOC_LOW);
    }
}
