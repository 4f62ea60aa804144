use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rocket_trajectory::io::{self, FlightReport, FlightSummary, Scenario};
use rocket_trajectory::sim::{simulate, FlightDataBranch, FlightDataType, SimulationOptions};
use rocket_trajectory::vehicle::presets;

/// Multi-stage model rocket flight simulator
#[derive(Parser, Debug)]
#[command(name = "rocket-trajectory")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file with rocket, motors and options
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Built-in rocket used when no scenario is given
    #[arg(short, long, value_enum, default_value_t = Preset::Sparrow)]
    preset: Preset,

    /// Deactivate a stage by index; may be repeated
    #[arg(long = "disable-stage")]
    disable_stages: Vec<usize>,

    /// Write each branch's time series as CSV into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Write the flight summary as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// More logging; repeat for debug and trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    /// Single-stage sport rocket on a C motor
    Sparrow,
    /// Two-stage variant with a booster
    SparrowDuo,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut scenario = match &cli.scenario {
        Some(path) => {
            Scenario::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            let rocket = match cli.preset {
                Preset::Sparrow => presets::sparrow(),
                Preset::SparrowDuo => presets::sparrow_duo(),
            };
            Scenario {
                rocket,
                motors: presets::motors(),
                options: SimulationOptions::default(),
                inactive_stages: vec![],
            }
        }
    };
    scenario.inactive_stages.extend(&cli.disable_stages);
    let config = scenario.configuration();

    info!(rocket = %scenario.rocket.name, "running simulation");
    let data = simulate(&scenario.rocket, &config, &scenario.motors, &scenario.options)?;
    let report = FlightReport::new(&scenario.rocket, &data);

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  ROCKET FLIGHT SIMULATION: {}", scenario.rocket.name);
    println!("====================================================================");

    for (branch, summary) in data.branches.iter().zip(&report.branches) {
        print_branch(branch, summary);
    }

    if !report.warnings.is_empty() {
        println!("  Warnings");
        println!("  ──────────────────────────────────────────────────────────────────");
        for w in &report.warnings {
            println!("  - {w}");
        }
        println!();
    }
    println!("====================================================================");
    println!();

    // -----------------------------------------------------------------------
    // Output files
    // -----------------------------------------------------------------------
    if let Some(dir) = &cli.csv_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for branch in &data.branches {
            let path = dir.join(io::branch_file_name(branch));
            io::write_branch_file(&path, branch)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote branch data");
        }
    }
    if let Some(path) = &cli.json {
        io::write_summary_file(path, &report)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote summary");
    }

    Ok(())
}

fn print_branch(branch: &FlightDataBranch, summary: &FlightSummary) {
    println!();
    println!("  Branch: {}", branch.name());
    println!("  ──────────────────────────────────────────────────────────────────");
    for event in branch.events() {
        println!("  {event}");
    }
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Max altitude:  {:>8.1} m", summary.apogee_m);
    println!(
        "  Max velocity:  {:>8.1} m/s (Mach {:.2})",
        summary.max_velocity_ms, summary.max_mach
    );
    if let Some(t) = summary.apogee_time_s {
        println!("  Apogee time:   {:>8.2} s", t);
    }
    if let Some(v) = summary.rod_clearance_velocity_ms {
        println!("  Off the rod:   {:>8.1} m/s", v);
    }
    if let Some(v) = summary.deployment_velocity_ms {
        println!("  Deployment:    {:>8.1} m/s", v);
    }
    if let Some(v) = summary.ground_hit_velocity_ms {
        println!("  Ground hit:    {:>8.1} m/s", v);
    }
    println!("  Flight time:   {:>8.1} s", summary.flight_time_s);
    if let Some(cause) = &summary.abort {
        println!("  ABORTED:       {cause}");
    }
    println!();

    // -----------------------------------------------------------------------
    // Trajectory table (sampled)
    // -----------------------------------------------------------------------
    let (Some(time), Some(alt), Some(vel)) = (
        branch.get(FlightDataType::Time),
        branch.get(FlightDataType::Altitude),
        branch.get(FlightDataType::TotalVelocity),
    ) else {
        return;
    };
    let mach = branch.get(FlightDataType::Mach);
    let mass = branch.get(FlightDataType::Mass);

    println!(
        "  {:>7}  {:>9}  {:>9}  {:>8}  {:>8}",
        "t (s)", "alt (m)", "vel (m/s)", "Mach", "mass(g)"
    );
    println!("  {}", "─".repeat(50));
    let sample_interval = (time.len() / 30).max(1);
    for i in (0..time.len()).filter(|&i| i % sample_interval == 0 || i + 1 == time.len()) {
        println!(
            "  {:>7.2}  {:>9.1}  {:>9.1}  {:>8.3}  {:>8.1}",
            time[i],
            alt[i],
            vel[i],
            mach.map_or(f64::NAN, |m| m[i]),
            mass.map_or(f64::NAN, |m| m[i] * 1000.0),
        );
    }
    println!();
}
