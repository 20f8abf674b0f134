//! Goal Watcher Service
//!
//! Polls the NHL scoreboard for one team and, when it scores, switches the
//! configured Govee lights into a celebration scene while the goal song plays,
//! then puts every light back the way it was.
//!
//! Usage: `goal_watcher [watch | celebrate | devices | scenes <SKU> <DEVICE_ID>]`

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use goal_watcher_rust::audio::build_audio_cue;
use goal_watcher_rust::scheduler::{Clock, SystemClock};
use goal_watcher_rust::{
    CelebrationOrchestrator, GoalService, GoalWatcherConfig, LoopTimings, ScoreWatcher,
};
use goalhorn_rust_core::clients::{GoveeClient, NhlClient};
use goalhorn_rust_core::{DeviceController, ScoreboardProvider};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

enum Mode {
    Watch,
    Celebrate,
    Devices,
    Scenes { sku: String, device: String },
}

fn parse_mode(args: &[String]) -> Result<Mode> {
    match args.first().map(String::as_str) {
        None | Some("watch") => Ok(Mode::Watch),
        Some("celebrate") => Ok(Mode::Celebrate),
        Some("devices") => Ok(Mode::Devices),
        Some("scenes") => match (args.get(1), args.get(2)) {
            (Some(sku), Some(device)) => Ok(Mode::Scenes {
                sku: sku.clone(),
                device: device.clone(),
            }),
            _ => bail!("usage: goal_watcher scenes <SKU> <DEVICE_ID>"),
        },
        Some(other) => bail!(
            "unknown command '{other}' (expected watch | celebrate | devices | scenes)"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = parse_mode(&args)?;
    let config = GoalWatcherConfig::from_env().context("Failed to load configuration")?;

    let govee = GoveeClient::new(
        config.govee_base_url.clone(),
        config.govee_api_key.clone(),
        config.http_timeout,
    );

    match mode {
        Mode::Devices => {
            let devices = govee.list_devices().await.context("Failed to list devices")?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
            Ok(())
        }
        Mode::Scenes { sku, device } => {
            let scenes = govee
                .diy_scenes(&sku, &device)
                .await
                .context("Failed to query DIY scenes")?;
            println!("{}", serde_json::to_string_pretty(&scenes)?);
            Ok(())
        }
        Mode::Celebrate => {
            config.ensure_devices()?;
            let orchestrator = build_orchestrator(&config, Arc::new(govee), Arc::new(SystemClock))?;
            let report = orchestrator.run(&config.devices).await;
            info!("Manual celebration finished, clean={}", report.is_clean());
            Ok(())
        }
        Mode::Watch => {
            config.ensure_devices()?;
            info!("Starting Goal Watcher for {}...", config.team_abbrev);

            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let nhl: Arc<dyn ScoreboardProvider> = Arc::new(NhlClient::with_config(
                config.nhl_base_url.clone(),
                config.http_timeout,
                config.nhl_circuit_breaker.clone(),
            ));

            let watcher = ScoreWatcher::new(nhl, clock.clone(), config.team_abbrev.clone());
            let orchestrator = build_orchestrator(&config, Arc::new(govee), clock.clone())?;
            let mut service = GoalService::new(
                watcher,
                orchestrator,
                clock,
                config.devices.clone(),
                LoopTimings {
                    poll_interval: config.poll_interval,
                    pre_roll_delay: config.pre_roll_delay,
                },
            );

            service.run().await;
            Ok(())
        }
    }
}

fn build_orchestrator(
    config: &GoalWatcherConfig,
    controller: Arc<dyn DeviceController>,
    clock: Arc<dyn Clock>,
) -> Result<CelebrationOrchestrator> {
    Ok(CelebrationOrchestrator::new(
        controller,
        build_audio_cue(config)?,
        clock,
        config.hold_duration,
        config.audio_join_timeout,
    ))
}
