//! Microgrid simulator entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::environment::WeatherGenerator;
use microgrid_sim::io::export::export_csv;
use microgrid_sim::sim::analysis::{AnalysisOptions, analyze_renewables};
use microgrid_sim::sim::kpi::KpiReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    days_override: Option<usize>,
    strategy_override: Option<String>,
    telemetry_out: Option<String>,
    analyze: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
    #[cfg(feature = "tui")]
    tui: bool,
}

fn print_help() {
    eprintln!("microgrid-sim: microgrid dispatch simulator");
    eprintln!();
    eprintln!("Usage: microgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --days <n>               Override the number of simulated days");
    eprintln!("  --strategy <tag>         Override the diesel strategy");
    eprintln!("  --telemetry-out <path>   Export step results to CSV");
    eprintln!("  --analyze                Compare the fleet with and without renewables");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after simulation");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    #[cfg(feature = "tui")]
    eprintln!("  --tui                    Run the simulation in a live terminal UI");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following flag `args[*i]`, or exits with an error.
fn flag_value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {} requires {what}", args[*i - 1]);
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str, kind: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{value}\" is not a valid {kind}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        days_override: None,
        strategy_override: None,
        telemetry_out: None,
        analyze: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
        #[cfg(feature = "tui")]
        tui: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(flag_value(&args, &mut i, "a path argument").to_string());
            }
            "--preset" => {
                cli.preset = Some(flag_value(&args, &mut i, "a name argument").to_string());
            }
            "--seed" => {
                let v = flag_value(&args, &mut i, "a u64 argument");
                cli.seed_override = Some(parse_number("--seed", v, "u64"));
            }
            "--days" => {
                let v = flag_value(&args, &mut i, "a day count");
                cli.days_override = Some(parse_number("--days", v, "day count"));
            }
            "--strategy" => {
                cli.strategy_override =
                    Some(flag_value(&args, &mut i, "a strategy tag").to_string());
            }
            "--telemetry-out" => {
                cli.telemetry_out = Some(flag_value(&args, &mut i, "a path argument").to_string());
            }
            "--analyze" => cli.analyze = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                let v = flag_value(&args, &mut i, "a u16 argument");
                cli.port = parse_number("--port", v, "u16");
            }
            #[cfg(feature = "tui")]
            "--tui" => cli.tui = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then the baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(days) = cli.days_override {
        scenario.simulation.days = days;
    }
    if let Some(ref strategy) = cli.strategy_override {
        scenario.simulation.strategy.clone_from(strategy);
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

fn run_analysis(scenario: &ScenarioConfig) {
    let s = &scenario.simulation;
    let fleet = scenario.build_fleet().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    let weather = WeatherGenerator::new(s.start_time, s.seed);
    let options = AnalysisOptions {
        duration_days: s.days,
        total_daily_kwh: s.total_daily_kwh,
        demand_noise: s.demand_noise,
        seed: s.seed,
        exclude_device: None,
    };
    let report = analyze_renewables(&fleet, &weather, &options).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("=== With renewables ===\n{}\n", report.with_renewables);
    println!("=== Without renewables ===\n{}\n", report.without_renewables);
    let sv = &report.savings;
    println!(
        "Savings: ${:.2} ({:.1}%), {:.1} kg CO2 ({:.1}%)",
        sv.cost_saved, sv.cost_saving_percent, sv.co2_saved_kg, sv.co2_saving_percent
    );
}

fn main() {
    let cli = parse_args();

    // the TUI owns the terminal, so it runs without a log subscriber
    #[cfg(feature = "tui")]
    let tui = cli.tui;
    #[cfg(not(feature = "tui"))]
    let tui = false;
    if !tui {
        init_logging();
    }

    let scenario = load_scenario(&cli);
    let label = cli
        .preset
        .clone()
        .or_else(|| cli.scenario_path.clone())
        .unwrap_or_else(|| "baseline".to_string());

    #[cfg(feature = "tui")]
    if cli.tui {
        if let Err(e) = microgrid_sim::tui::run(&label, &scenario) {
            eprintln!("error: TUI failed: {e}");
            process::exit(1);
        }
        return;
    }

    if cli.analyze {
        run_analysis(&scenario);
        return;
    }

    let mut engine = scenario.build_engine().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    tracing::info!(
        scenario = %label,
        devices = engine.fleet().len(),
        steps = engine.config().total_steps(),
        "starting run"
    );
    let results = engine.run().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    for r in &results {
        println!("{r}");
    }

    let kpi = KpiReport::from_results(&results);
    println!("\n{kpi}");

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = microgrid_sim::api::AppState::from_config(&scenario).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(microgrid_sim::api::serve(Arc::new(state), addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
