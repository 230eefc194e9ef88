use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use packtally::{
    audio::ToneEngine, db::Database, history::HistoryBrowser, intake::IntakeController,
    settings::SettingsStore, shell::Shell,
};

/// Package-scanning tally: one 44-digit NFe key per physical package.
#[derive(Debug, Parser)]
#[command(name = "packtally", version, about)]
struct Cli {
    /// Directory for the database and settings (defaults to
    /// ~/.local/share/packtally).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory where exported reports are written (defaults to the current
    /// directory).
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Disable audible scan feedback.
    #[arg(long)]
    mute: bool,
}

fn default_data_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").context("HOME is not set; pass --data-dir")?;
    Ok(PathBuf::from(home).join(".local/share/packtally"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    log::info!("packtally starting up...");

    let database = Database::new(data_dir.join("packtally.sqlite3"))?;
    let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
    let tones = if cli.mute {
        ToneEngine::muted()
    } else {
        ToneEngine::new()
    };

    let intake = IntakeController::new(database.clone(), settings, tones);
    intake.reload(None).await?;
    intake.spawn_change_listener();

    let history = HistoryBrowser::new(database);
    let export_dir = cli.export_dir.unwrap_or_else(|| PathBuf::from("."));

    Shell::new(intake, history, export_dir).run().await
}
