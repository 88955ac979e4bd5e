mod app;
mod audio;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use eframe::{NativeOptions, egui};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::SpecEnvApp;
use specenv::FftSize;
use specenv::config::{AppConfig, MAX_ANALYSIS_RATE_HZ, MIN_ANALYSIS_RATE_HZ};

#[derive(Parser)]
#[command(name = "specenv")]
#[command(about = "Three-band spectral envelope follower", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis window length (256, 512, 1024 or 2048)
    #[arg(long)]
    fft_size: Option<usize>,

    /// Target analysis passes per second
    #[arg(long)]
    analysis_rate: Option<f32>,

    /// Input device name
    #[arg(short, long)]
    device: Option<String>,

    /// Print the available input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn load_config(cli: &Cli) -> specenv::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    if let Some(len) = cli.fft_size {
        config.fft_size = FftSize::from_len(len)?.len();
    }
    if let Some(rate) = cli.analysis_rate {
        config.analysis_rate_hz = rate.clamp(MIN_ANALYSIS_RATE_HZ, MAX_ANALYSIS_RATE_HZ);
    }
    if cli.device.is_some() {
        config.input_device = cli.device.clone();
    }

    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("specenv=info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        let host = cpal::default_host();
        for name in audio::devices::input_device_names(&host) {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        fft_size = config.fft_size,
        analysis_rate_hz = config.analysis_rate_hz,
        "starting"
    );

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    match eframe::run_native(
        "Spectral Envelope Follower",
        options,
        Box::new(|cc| Ok(Box::new(SpecEnvApp::new(cc, config)))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to start application: {}", e);
            ExitCode::FAILURE
        }
    }
}
