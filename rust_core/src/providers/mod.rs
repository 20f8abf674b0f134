//! Provider abstractions over the external APIs
//!
//! The watcher service only talks to these traits, so the scoreboard and the
//! light API can be swapped for in-memory fakes in tests.

use crate::error::ApiResult;
use crate::models::{CapabilityState, Device, DeviceStateSnapshot, GameScoreObservation};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod govee;
pub mod nhl;

/// Source of live scores for one team
#[async_trait]
pub trait ScoreboardProvider: Send + Sync {
    /// The team's game on `date` and its current score.
    ///
    /// `Ok(None)` means the team is not playing that day (or the payload has
    /// no matching section). Transport and HTTP errors are `Err`.
    async fn team_game(
        &self,
        team_abbrev: &str,
        date: NaiveDate,
    ) -> ApiResult<Option<GameScoreObservation>>;

    /// Provider name for logging and debugging
    fn provider_name(&self) -> &str;
}

/// Read and write access to smart-light devices
#[async_trait]
pub trait DeviceController: Send + Sync {
    async fn device_state(&self, device: &Device) -> ApiResult<DeviceStateSnapshot>;

    async fn set_scene(&self, device: &Device) -> ApiResult<()>;

    async fn set_capability(&self, device: &Device, capability: &CapabilityState) -> ApiResult<()>;
}
