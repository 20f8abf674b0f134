//! Govee OpenAPI client for smart-light state and control.
//!
//! Every call carries the account's API key header. POST bodies are wrapped
//! in a `{requestId, payload}` envelope with a fresh UUID per request.
//!
//! No circuit breaker here: every scene and restore command of a celebration
//! is sent even after earlier ones failed. The request timeout bounds each call.

use crate::error::{ApiError, ApiResult};
use crate::models::{
    CapabilityState, Device, DeviceStateSnapshot, DeviceSummary, DiyScene,
    DYNAMIC_SCENE_CAPABILITY,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub const GOVEE_API_BASE: &str = "https://openapi.api.govee.com/router/api/v1";

pub const API_KEY_HEADER: &str = "Govee-API-Key";

const API_NAME: &str = "govee";

#[derive(Clone)]
pub struct GoveeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GoveeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoveeClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &!self.api_key.is_empty())
            .finish()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<P> {
    request_id: String,
    payload: P,
}

impl<P> Envelope<P> {
    fn new(payload: P) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            payload,
        }
    }
}

#[derive(Debug, Serialize)]
struct DeviceRef<'a> {
    sku: &'a str,
    device: &'a str,
}

#[derive(Debug, Serialize)]
struct ControlPayload<'a> {
    sku: &'a str,
    device: &'a str,
    capability: ControlCapability<'a>,
}

#[derive(Debug, Serialize)]
struct ControlCapability<'a> {
    #[serde(rename = "type")]
    capability_type: &'a str,
    instance: &'a str,
    value: &'a Value,
}

#[derive(Debug, Deserialize)]
struct PayloadResponse<P> {
    payload: P,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    data: Vec<DeviceSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct StatePayload {
    #[serde(default)]
    capabilities: Vec<WireCapability>,
}

#[derive(Debug, Deserialize)]
struct WireCapability {
    #[serde(rename = "type")]
    capability_type: String,
    #[serde(default)]
    instance: String,
    #[serde(default)]
    state: Option<WireState>,
}

#[derive(Debug, Deserialize)]
struct WireState {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ScenesPayload {
    #[serde(default)]
    capabilities: Vec<SceneCapability>,
}

#[derive(Debug, Deserialize)]
struct SceneCapability {
    #[serde(default)]
    parameters: Option<SceneParameters>,
}

#[derive(Debug, Deserialize)]
struct SceneParameters {
    #[serde(default)]
    options: Vec<DiyScene>,
}

// ============================================================================
// Client
// ============================================================================

impl GoveeClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// List devices registered on the account
    pub async fn list_devices(&self) -> ApiResult<Vec<DeviceSummary>> {
        let url = format!("{}/user/devices", self.base_url);
        let resp: DevicesResponse = self.send_json(self.client.get(&url)).await?;
        Ok(resp.data)
    }

    /// Capture the current capability values of a device
    pub async fn device_state(&self, sku: &str, device: &str) -> ApiResult<DeviceStateSnapshot> {
        let url = format!("{}/device/state", self.base_url);
        let body = Envelope::new(DeviceRef { sku, device });

        let resp: PayloadResponse<StatePayload> =
            self.send_json(self.client.post(&url).json(&body)).await?;

        let capabilities = resp
            .payload
            .capabilities
            .into_iter()
            .map(|c| CapabilityState {
                capability_type: c.capability_type,
                instance: c.instance,
                value: c.state.map(|s| s.value).unwrap_or(Value::Null),
            })
            .collect();

        Ok(DeviceStateSnapshot {
            model_sku: sku.to_string(),
            device_id: device.to_string(),
            capabilities,
        })
    }

    /// Write a single capability value. 200 means the command was accepted.
    pub async fn control(
        &self,
        sku: &str,
        device: &str,
        capability_type: &str,
        instance: &str,
        value: &Value,
    ) -> ApiResult<()> {
        let url = format!("{}/device/control", self.base_url);
        let body = Envelope::new(ControlPayload {
            sku,
            device,
            capability: ControlCapability {
                capability_type,
                instance,
                value,
            },
        });

        debug!("Govee control {} {} {}={}", sku, device, instance, value);
        self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    /// Switch a device into its configured celebration scene
    pub async fn set_scene(&self, device: &Device) -> ApiResult<()> {
        self.control(
            &device.model_sku,
            &device.device_id,
            DYNAMIC_SCENE_CAPABILITY,
            &device.scene_instance,
            &device.scene_value,
        )
        .await
    }

    /// Write back one captured capability value
    pub async fn set_capability(&self, device: &Device, capability: &CapabilityState) -> ApiResult<()> {
        self.control(
            &device.model_sku,
            &device.device_id,
            &capability.capability_type,
            &capability.instance,
            &capability.value,
        )
        .await
    }

    /// List the user-authored scenes available on a device
    pub async fn diy_scenes(&self, sku: &str, device: &str) -> ApiResult<Vec<DiyScene>> {
        let url = format!("{}/device/diy-scenes", self.base_url);
        let body = Envelope::new(DeviceRef { sku, device });

        let resp: PayloadResponse<ScenesPayload> =
            self.send_json(self.client.post(&url).json(&body)).await?;

        Ok(resp
            .payload
            .capabilities
            .into_iter()
            .filter_map(|c| c.parameters)
            .flat_map(|p| p.options)
            .collect())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            api: API_NAME,
            message: e.to_string(),
        })
    }

    /// Send with the auth header, returning the body text
    async fn send(&self, request: RequestBuilder) -> ApiResult<String> {
        let resp = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Http { api: API_NAME, source })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| ApiError::Http { api: API_NAME, source })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                api: API_NAME,
                status,
                body,
            });
        }
        Ok(body)
    }
}
