//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, Paragraph};

use super::runtime::App;
use super::style;
use crate::sim::types::StepResult;

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(10),   // chart
            Constraint::Length(3), // SOC gauge
            Constraint::Length(5), // status panel
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_chart(frame, app, chunks[1]);
    render_soc_gauge(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_footer(frame, chunks[4]);
}

/// Header bar: preset name, step progress, speed, strategy, run state.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (state_icon, state_label) = if app.is_finished() {
        ("■", "DONE")
    } else if app.paused {
        ("‖", "PAUSED")
    } else {
        ("▶", "RUNNING")
    };

    let header = Line::from(vec![
        Span::styled(
            " MICROGRID ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            &app.preset_name,
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ step {}/{} │ {}ms │ ",
            app.step_index(),
            app.total_steps(),
            app.tick_interval_ms(),
        )),
        Span::styled(
            app.strategy().as_str(),
            Style::default().fg(style::STRATEGY_FG),
        ),
        Span::raw(format!(" │ {state_icon} {state_label} ")),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn series(app: &App, first: usize, value: impl Fn(&StepResult) -> f64) -> Vec<(f64, f64)> {
    app.history
        .iter()
        .enumerate()
        .map(|(i, r)| ((first + i) as f64, value(r)))
        .collect()
}

/// Demand, renewable output, diesel, and grid flow over the rolling window.
fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let first = app.step_index().saturating_sub(app.history.len());
    let demand = series(app, first, |r| r.demand_kw);
    let renewable = series(app, first, |r| r.renewable_generation_kw);
    let diesel = series(app, first, |r| r.diesel_generation_kw);
    let grid = series(app, first, |r| r.grid_power_kw);

    let y_bounds = style::auto_bounds_y(&[&demand[..], &renewable[..], &diesel[..], &grid[..]]);
    let x_lo = demand.first().map_or(0.0, |p| p.0);
    let x_hi = demand.last().map_or(1.0, |p| p.0).max(x_lo + 1.0);

    let datasets = vec![
        Dataset::default()
            .name("Demand")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::DEMAND_COLOR))
            .data(&demand),
        Dataset::default()
            .name("Renewable")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::RENEWABLE_COLOR))
            .data(&renewable),
        Dataset::default()
            .name("Diesel")
            .marker(symbols::Marker::Dot)
            .style(Style::default().fg(style::DIESEL_COLOR))
            .data(&diesel),
        Dataset::default()
            .name("Grid")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::GRID_COLOR))
            .data(&grid),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(" Bus Flows (kW, + = supply) ")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("step")
                .bounds([x_lo, x_hi])
                .labels(vec![format!("{}", x_lo as u64), format!("{}", x_hi as u64)]),
        )
        .y_axis(
            Axis::default()
                .title("kW")
                .bounds(y_bounds)
                .labels(vec![
                    format!("{:.1}", y_bounds[0]),
                    format!("{:.1}", y_bounds[1]),
                ]),
        );

    frame.render_widget(chart, area);
}

/// Fleet-average SOC gauge.
fn render_soc_gauge(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title(" Fleet SOC ").borders(Borders::ALL);
    if !app.has_storage() {
        frame.render_widget(Paragraph::new("  no batteries").block(block), area);
        return;
    }
    let soc = app.soc_pct();
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(style::soc_color(soc)))
        .ratio((soc / 100.0).clamp(0.0, 1.0))
        .label(format!("{soc:.0}%"));
    frame.render_widget(gauge, area);
}

/// Status panel showing the latest step.
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = if let Some(r) = app.last_result() {
        vec![
            Line::from(format!(
                "  {}  demand={:>8.2}  renew={:>8.2}  diesel={:>8.2}",
                r.timestamp.format("%Y-%m-%d %H:%M"),
                r.demand_kw,
                r.renewable_generation_kw,
                r.diesel_generation_kw,
            )),
            Line::from(format!(
                "  battery={:>8.2}  grid={:>8.2}  unbalanced={:>8.2}",
                r.battery_power_kw, r.grid_power_kw, r.unbalanced_kw,
            )),
            Line::from(format!(
                "  fuel={:.2} L/h  grid cost=${:.2}",
                r.diesel_usage_lph, r.grid_cost,
            )),
        ]
    } else {
        vec![Line::from("  Waiting for first step...")]
    };
    if let Some(err) = &app.last_error {
        lines.truncate(2);
        lines.push(Line::from(Span::styled(
            format!("  error: {err}"),
            Style::default().fg(style::ERROR_FG),
        )));
    }

    let block = Block::default().title(" Status ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  Space:Pause  n:Step  +/-:Speed  1/2/3:Preset  s:Strategy  r:Restart",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
