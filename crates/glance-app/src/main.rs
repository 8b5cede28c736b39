use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use glance_engine::{EngineOptions, LiveOcrEngine};
use glance_profiles::{ProfileStore, settings_file};
use glance_types::ScreenSize;

mod controller;
mod events;
mod io;
mod sim;

use self::controller::AppController;
use self::sim::{SimScreen, Speech};

/// Live screen OCR announcer with per-application profiles, driven from
/// stdin against a simulated desktop.
#[derive(Parser)]
#[command(name = "glance")]
struct Cli {
    /// Directory holding settings.json and the profiles/ store.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Simulated screen size, as WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720")]
    screen: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if atty::is(atty::Stream::Stderr) {
        builder.init();
    } else {
        builder.json().init();
    }
}

fn parse_screen(spec: &str) -> Result<ScreenSize> {
    let Some((width, height)) = spec.split_once('x') else {
        bail!("screen size must look like 1280x720, got {spec:?}");
    };
    let width = width.parse().context("bad screen width")?;
    let height = height.parse().context("bad screen height")?;
    Ok(ScreenSize::new(width, height))
}

fn config_dir(cli: &Cli) -> PathBuf {
    cli.config_dir
        .clone()
        .or_else(|| std::env::var_os("GLANCE_CONFIG_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("glance-data"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let screen = parse_screen(&cli.screen)?;
    let config_dir = config_dir(&cli);
    tracing::info!(dir = %config_dir.display(), ?screen, "starting");

    let settings_path = config_dir.join("settings.json");
    let settings = settings_file::load_settings(&settings_path);
    let store = ProfileStore::open(config_dir.join("profiles"));

    let sim = SimScreen::new(screen);
    let engine = LiveOcrEngine::new(
        settings,
        settings_path,
        store,
        sim.clone(),
        sim.clone(),
        sim.clone(),
        Arc::new(Speech),
        EngineOptions::default(),
    );

    println!("glance ready; type \"help\" for commands");

    let controller = AppController::new();
    let mut tasks = controller.spawn_tasks(engine.clone(), sim);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
        result = tasks.join_next() => {
            match result {
                Some(Ok(Ok(()))) => tracing::info!("front end finished"),
                Some(Ok(Err(error))) => tracing::error!(%error, "front end task failed"),
                Some(Err(error)) => tracing::error!(%error, "front end task panicked"),
                None => {}
            }
        }
    }

    controller.shutdown();
    engine.shutdown().await;
    tasks.shutdown().await;
    Ok(())
}
