/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use doorgate::config::DoorgateConfig;
use doorgate::scenario;
use doorgate::supervisor::{shutdown_signal, Session, TaskEnd};

// ── CLI argument definition ───────────────────────────────────────────────────

/// doorgate – open a simulated door with a closed fist and a voice command.
///
/// Example:
///   doorgate --scenario demos/fist_then_command.yaml --auto-close-secs 3
#[derive(Debug, Parser)]
#[command(
    name = "doorgate",
    about = "Gesture + voice gated door coordinator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Path to the YAML scenario that drives the camera, landmark model,
    /// microphone and speech engine.
    #[arg(short = 's', long = "scenario")]
    scenario: PathBuf,

    /// Override door.auto_close_secs.
    #[arg(short = 'a', long = "auto-close-secs")]
    auto_close_secs: Option<f64>,

    /// Override speech.phrase.
    #[arg(short = 'p', long = "phrase")]
    phrase: Option<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config = ?cli.config,
        scenario = %cli.scenario.display(),
        auto_close_secs = ?cli.auto_close_secs,
        phrase = ?cli.phrase,
        "doorgate starting up..."
    );

    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => match DoorgateConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using default settings");
            DoorgateConfig::default()
        }
    };

    if let Some(secs) = cli.auto_close_secs {
        config.door.auto_close_secs = secs;
    }
    if let Some(phrase) = cli.phrase {
        config.speech.phrase = phrase;
    }
    if let Err(e) = config.validate() {
        error!("{:#}", e);
        process::exit(1);
    }

    info!(
        auto_close_secs = config.door.auto_close_secs,
        phrase = %config.speech.phrase,
        min_extended = config.gesture.min_extended_fingers,
        sample_rate = config.speech.sample_rate,
        camera = config.camera.index,
        "Configuration"
    );

    // ── Devices ───────────────────────────────────────────────────────────────
    let collaborators = match scenario::open_devices(&cli.scenario, &config) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    // ── Run ───────────────────────────────────────────────────────────────────
    let report = match Session::new(config).run(collaborators, shutdown_signal()).await {
        Ok(report) => report,
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };

    if let TaskEnd::Failed(_) | TaskEnd::Aborted(_) = report.vision {
        process::exit(1);
    }
}
