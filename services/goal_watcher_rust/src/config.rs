//! Configuration loading for the goal watcher
//!
//! Everything comes from environment variables (a `.env` file is honored):
//! - Govee API key and tracked team
//! - Device list with the scene each device plays
//! - Poll interval, pre-roll delay, hold duration
//! - Audio backend and asset
//! - HTTP timeout and scoreboard circuit breaker settings

use anyhow::{anyhow, bail, Context, Result};
use goalhorn_rust_core::circuit_breaker::ApiCircuitBreakerConfig;
use goalhorn_rust_core::clients::{GOVEE_API_BASE, NHL_API_BASE};
use goalhorn_rust_core::models::Device;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TEAM_ABBREV: &str = "COL";

/// Default seconds between scoreboard checks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default delay between detecting a goal and starting the celebration.
/// Lets the broadcast catch up with the scoreboard feed.
pub const DEFAULT_PRE_ROLL_DELAY_SECS: u64 = 30;

/// Default seconds the scene stays on before devices are restored
pub const DEFAULT_HOLD_DURATION_SECS: u64 = 50;

pub const DEFAULT_AUDIO_FILE: &str = "avs_goal_song.wav";

pub const DEFAULT_AUDIO_COMMAND: &str = "aplay";

pub const DEFAULT_AUDIO_JOIN_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// How the goal song is played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBackend {
    /// Spawn an external player process (`aplay`, `afplay`, `mpg123`, ...)
    Command,
    /// Decode and play in-process (requires the `rodio` feature)
    Rodio,
    None,
}

impl AudioBackend {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "command" | "cmd" => Ok(Self::Command),
            "rodio" => Ok(Self::Rodio),
            "none" | "off" | "silent" => Ok(Self::None),
            other => Err(anyhow!(
                "Invalid AUDIO_BACKEND: {other} (expected command|rodio|none)"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Rodio => "rodio",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoalWatcherConfig {
    pub govee_api_key: String,
    pub govee_base_url: String,
    pub nhl_base_url: String,

    pub team_abbrev: String,
    pub devices: Vec<Device>,

    pub poll_interval: Duration,
    pub pre_roll_delay: Duration,
    pub hold_duration: Duration,

    pub audio_backend: AudioBackend,
    pub audio_file: PathBuf,
    pub audio_command: String,
    pub audio_join_timeout: Duration,

    pub http_timeout: Duration,
    pub nhl_circuit_breaker: ApiCircuitBreakerConfig,
}

impl GoalWatcherConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let govee_api_key = lookup("GOVEE_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .context("GOVEE_API_KEY must be set")?;

        let team_abbrev = lookup("TEAM_ABBREV")
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TEAM_ABBREV.to_string());

        let devices = match lookup("GOAL_DEVICES") {
            Some(raw) => parse_devices(&raw).context("GOAL_DEVICES")?,
            None => Vec::new(),
        };

        let poll_interval = secs(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval.is_zero() {
            bail!("POLL_INTERVAL_SECS must be > 0");
        }

        let audio_backend = match lookup("AUDIO_BACKEND") {
            Some(raw) => AudioBackend::parse(&raw)?,
            None => AudioBackend::Command,
        };

        Ok(Self {
            govee_api_key,
            govee_base_url: lookup("GOVEE_API_BASE_URL")
                .unwrap_or_else(|| GOVEE_API_BASE.to_string()),
            nhl_base_url: lookup("NHL_API_BASE_URL").unwrap_or_else(|| NHL_API_BASE.to_string()),
            team_abbrev,
            devices,
            poll_interval,
            pre_roll_delay: secs(&lookup, "PRE_ROLL_DELAY_SECS", DEFAULT_PRE_ROLL_DELAY_SECS)?,
            hold_duration: secs(&lookup, "HOLD_DURATION_SECS", DEFAULT_HOLD_DURATION_SECS)?,
            audio_backend,
            audio_file: lookup("AUDIO_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_FILE)),
            audio_command: lookup("AUDIO_COMMAND")
                .unwrap_or_else(|| DEFAULT_AUDIO_COMMAND.to_string()),
            audio_join_timeout: secs(
                &lookup,
                "AUDIO_JOIN_TIMEOUT_SECS",
                DEFAULT_AUDIO_JOIN_TIMEOUT_SECS,
            )?,
            http_timeout: secs(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            nhl_circuit_breaker: circuit_breaker_config(&lookup, "NHL", 5, 30)?,
        })
    }

    /// Watching and celebrating need at least one device to light up
    pub fn ensure_devices(&self) -> Result<()> {
        if self.devices.is_empty() {
            bail!("GOAL_DEVICES must list at least one device");
        }
        Ok(())
    }
}

/// Parse the device list, a JSON array of
/// `{"model_sku", "device_id", "scene_value", "scene_instance"?}` objects.
pub fn parse_devices(raw: &str) -> Result<Vec<Device>> {
    let devices: Vec<Device> = serde_json::from_str(raw)
        .context("expected a JSON array of {model_sku, device_id, scene_value}")?;

    for (i, device) in devices.iter().enumerate() {
        if device.model_sku.trim().is_empty() || device.device_id.trim().is_empty() {
            bail!("device #{i} needs a model_sku and a device_id");
        }
        if device.scene_value.is_null() {
            bail!("device {} has no scene_value", device.device_id);
        }
    }
    Ok(devices)
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("Invalid {key}: {raw} (expected whole seconds)")),
        None => Ok(Duration::from_secs(default)),
    }
}

fn circuit_breaker_config<F>(
    lookup: &F,
    prefix: &str,
    default_threshold: u32,
    default_recovery_secs: u64,
) -> Result<ApiCircuitBreakerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let threshold_key = format!("{prefix}_CB_FAILURE_THRESHOLD");
    let failure_threshold = match lookup(&threshold_key) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid {threshold_key}: {raw} (expected integer)"))?,
        None => default_threshold,
    };
    if failure_threshold == 0 {
        bail!("{threshold_key} must be > 0");
    }

    Ok(ApiCircuitBreakerConfig {
        failure_threshold,
        recovery_timeout: secs(
            lookup,
            &format!("{prefix}_CB_RECOVERY_TIMEOUT_SECS"),
            default_recovery_secs,
        )?,
        success_threshold: 1,
    })
}
