//! Goalhorn Core - shared clients and model for the goal-light services.
//!
//! This crate provides:
//! - NHL scoreboard client and team-game lookup
//! - Govee smart-light client (state snapshot, scene and capability control)
//! - Provider traits the services are written against
//! - Circuit breaker for external API resilience

pub mod circuit_breaker;
pub mod clients;
pub mod error;
pub mod models;
pub mod providers;

pub use error::{ApiError, ApiResult};
pub use models::{
    CapabilityState, Device, DeviceStateSnapshot, DeviceSummary, DiyScene, GameScoreObservation,
};
pub use providers::{DeviceController, ScoreboardProvider};
