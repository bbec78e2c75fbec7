use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use glimpse_config::Config;
use glimpse_core::{HttpBackends, Session};
use glimpse_types::{CaptureRegion, WindowGeometry};
use tracing_subscriber::EnvFilter;

use crate::controller::HostOptions;
use crate::history::JsonHistoryStore;
use crate::profile::{AppDirs, ProfileStore};

mod controller;
mod history;
mod hotkey;
mod profile;

/// Capture a screen region, recognize its text and translate it
#[derive(Parser, Debug)]
#[command(name = "glimpse", version, about, long_about = None)]
struct Args {
    /// Screen region to capture as `top,left,width,height`
    #[arg(long, value_parser = parse_region, default_value = "0,0,800,200")]
    region: CaptureRegion,

    /// Start in live mode
    #[arg(long)]
    live: bool,

    /// Live mode interval in milliseconds (defaults to the profile's interval)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Global hotkey that triggers a capture
    #[arg(long, default_value = "ctrl+shift+KeyG")]
    hotkey: String,

    /// Disable the global hotkey
    #[arg(long)]
    no_hotkey: bool,

    /// Settings profile to load and save
    #[arg(long, default_value = "main")]
    profile: String,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn parse_region(value: &str) -> Result<CaptureRegion, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region '{value}': {e}"))?;
    let &[top, left, width, height] = parts.as_slice() else {
        return Err(format!(
            "invalid region '{value}': expected top,left,width,height"
        ));
    };
    let region = CaptureRegion::new(top, left, width, height);
    if !region.is_valid() {
        return Err(format!("invalid region '{value}': empty area"));
    }
    Ok(region)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = Config::new();
    let dirs = AppDirs::locate()?;
    let profiles = ProfileStore::new(&dirs.config_dir);
    config.settings = profiles.load(&args.profile)?;
    let resume_live = args.live || config.settings.live_mode;

    let history = Arc::new(JsonHistoryStore::new(
        dirs.history_file(),
        config.history_limit,
    ));
    let backends =
        Arc::new(HttpBackends::new(config.network.clone()).context("Failed to build HTTP client")?);

    let settings = glimpse_config::SettingsState::new(config.settings.clone());
    let geometry = WindowGeometry::from_screen_region(args.region);
    let (session, handle, events) = Session::new(&config, settings, geometry, backends, history);

    tracing::info!("[APP] Capturing {}", args.region);
    let options = HostOptions {
        live: resume_live,
        interval_ms: args.interval_ms,
        hotkey: (!args.no_hotkey).then_some(args.hotkey),
    };
    let final_settings = controller::run(session, handle, events, options).await?;

    profiles.save(&args.profile, &final_settings)?;
    tracing::info!("[APP] Exiting");
    Ok(())
}

#[cfg(test)]
mod tests;
