use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info};

use wifi_interference_sim::common::scene::load_scene;
use wifi_interference_sim::control::SimulatorConfig;
use wifi_interference_sim::simulation::error_model::ErrorRateModel;
use wifi_interference_sim::simulation::error_model::curves::{CurveSettings, write_frame_success_curves};
use wifi_interference_sim::simulation::network::{SceneReport, run_scene};

#[derive(Parser, Debug)]
#[command(name = "wifi-interference-sim", author, version, about = "802.11 interference and packet error model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write NIST and YANS frame success rate curves as gnuplot scripts
    Curves {
        /// Frame size in bytes
        #[arg(long = "frame-size", default_value = "2000")]
        frame_size: u32,
        /// Directory for the .plt files
        #[arg(long = "output-dir", default_value = ".")]
        output_dir: PathBuf,
        /// SNR step in dB
        #[arg(long = "step-db", default_value = "0.01")]
        step_db: f64,
    },
    /// Replay a JSON scene and print per-link statistics
    Scene {
        /// Scene JSON file
        scene: PathBuf,
        /// TOML config; defaults to config.toml next to the scene, if present
        #[arg(long = "config")]
        config: Option<PathBuf>,
    },
}

fn write_curves(frame_size: u32, output_dir: PathBuf, step_db: f64) -> anyhow::Result<()> {
    if !(step_db > 0.0) {
        anyhow::bail!("--step-db must be positive, got {}", step_db);
    }
    let settings = CurveSettings {
        frame_size_bytes: frame_size,
        step_db,
        ..CurveSettings::default()
    };
    for (description, model) in [
        ("yans-frame-success-rate", ErrorRateModel::yans()),
        ("nist-frame-success-rate", ErrorRateModel::nist()),
    ] {
        let path = output_dir.join(format!("{}.plt", description));
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_frame_success_curves(&model, description, &settings, &mut out)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        out.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn load_config(scene: &Path, config: Option<PathBuf>) -> anyhow::Result<SimulatorConfig> {
    match config {
        Some(path) => SimulatorConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let path = SimulatorConfig::config_path_from_scene(scene);
            if path.exists() {
                info!("Using config {}", path.display());
                SimulatorConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
            } else {
                info!("No config.toml next to the scene, using defaults");
                Ok(SimulatorConfig::default())
            }
        }
    }
}

fn print_report(report: &SceneReport) {
    println!(
        "ranges: carrier sense {:.1} m, reception {:.1} m, attenuation {:.1} m",
        report.ranges.carrier_sense, report.ranges.reception, report.ranges.attenuation
    );
    println!("frames sent: {}, rejected: {}", report.sent, report.rejected);
    println!("{:>8} {:>8} {:>8} {:>10} {:>10}", "sender", "receiver", "frames", "delivered", "mean PER");
    for ((sender, receiver), stats) in &report.links {
        println!(
            "{:>8} {:>8} {:>8} {:>10} {:>10.6}",
            sender,
            receiver,
            stats.frames,
            stats.delivered,
            stats.mean_per()
        );
    }
    println!("{:>8} {:>14} {:>14}", "node", "busy notices", "busy total");
    for node in &report.nodes {
        println!(
            "{:>8} {:>14} {:>14?}",
            node.node_id, node.medium.notifications, node.medium.busy_total
        );
    }
}

fn main() -> anyhow::Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("wifi_interference_sim"), LevelFilter::Debug)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Curves {
            frame_size,
            output_dir,
            step_db,
        } => write_curves(frame_size, output_dir, step_db),
        Command::Scene { scene, config } => {
            let config = load_config(&scene, config)?;
            let loaded = load_scene(&scene).with_context(|| format!("Failed to load scene {}", scene.display()))?;
            let report = run_scene(&loaded, &config)?;
            print_report(&report);
            Ok(())
        }
    }
}
