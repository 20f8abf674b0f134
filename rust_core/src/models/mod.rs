//! Shared data model for the goalhorn services.
//!
//! Contains:
//! - Smart-light device identity and captured capability state
//! - Scoreboard observations for the tracked team
//! - Informational listings (registered devices, DIY scenes)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capability type reported by every device that can never be written back.
pub const ONLINE_CAPABILITY: &str = "devices.capabilities.online";

/// Capability type used to switch a device into a dynamic scene.
pub const DYNAMIC_SCENE_CAPABILITY: &str = "devices.capabilities.dynamic_scene";

/// Default instance for user-authored scenes.
pub const DEFAULT_SCENE_INSTANCE: &str = "diyScene";

fn default_scene_instance() -> String {
    DEFAULT_SCENE_INSTANCE.to_string()
}

// ============================================================================
// Devices
// ============================================================================

/// A configured smart-light device and the scene it plays on a goal.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub model_sku: String,
    pub device_id: String,
    /// Opaque, model-specific scene identifier (usually numeric)
    pub scene_value: Value,
    #[serde(default = "default_scene_instance")]
    pub scene_instance: String,
}

impl Device {
    pub fn new(model_sku: impl Into<String>, device_id: impl Into<String>, scene_value: Value) -> Self {
        Self {
            model_sku: model_sku.into(),
            device_id: device_id.into(),
            scene_value,
            scene_instance: default_scene_instance(),
        }
    }
}

/// One captured `(type, instance, value)` triple of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityState {
    pub capability_type: String,
    pub instance: String,
    pub value: Value,
}

impl CapabilityState {
    pub fn new(capability_type: impl Into<String>, instance: impl Into<String>, value: Value) -> Self {
        Self {
            capability_type: capability_type.into(),
            instance: instance.into(),
            value,
        }
    }

    /// Whether this value can be written back after a scene override.
    ///
    /// The online flag is read-only, and empty values carry nothing to restore.
    pub fn is_restorable(&self) -> bool {
        if self.capability_type == ONLINE_CAPABILITY {
            return false;
        }
        !matches!(&self.value, Value::Null) && self.value.as_str() != Some("")
    }
}

/// Capability values of one device captured before an override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStateSnapshot {
    pub model_sku: String,
    pub device_id: String,
    pub capabilities: Vec<CapabilityState>,
}

impl DeviceStateSnapshot {
    /// Capabilities to write back, in captured order
    pub fn restorable_capabilities(&self) -> impl Iterator<Item = &CapabilityState> {
        self.capabilities.iter().filter(|c| c.is_restorable())
    }
}

/// A device registered on the account, as returned by the device listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub sku: String,
    pub device: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<Value>,
}

/// A user-authored scene available on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiyScene {
    pub name: String,
    pub value: Value,
}

// ============================================================================
// Scoreboard
// ============================================================================

/// Latest game id and score of the tracked team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScoreObservation {
    pub game_id: String,
    pub score: u32,
}

impl GameScoreObservation {
    pub fn new(game_id: impl Into<String>, score: u32) -> Self {
        Self {
            game_id: game_id.into(),
            score,
        }
    }
}
