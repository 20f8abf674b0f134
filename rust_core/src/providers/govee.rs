use super::DeviceController;
use crate::clients::govee::GoveeClient;
use crate::error::ApiResult;
use crate::models::{CapabilityState, Device, DeviceStateSnapshot};
use async_trait::async_trait;

#[async_trait]
impl DeviceController for GoveeClient {
    async fn device_state(&self, device: &Device) -> ApiResult<DeviceStateSnapshot> {
        GoveeClient::device_state(self, &device.model_sku, &device.device_id).await
    }

    async fn set_scene(&self, device: &Device) -> ApiResult<()> {
        GoveeClient::set_scene(self, device).await
    }

    async fn set_capability(&self, device: &Device, capability: &CapabilityState) -> ApiResult<()> {
        GoveeClient::set_capability(self, device, capability).await
    }
}
