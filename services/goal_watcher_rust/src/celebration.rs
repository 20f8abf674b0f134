//! Goal celebration: temporary scene override with state restore
//!
//! Sequence per run:
//! 1. Snapshot every device (failures are skipped for restore only)
//! 2. Start the goal song on its own task
//! 3. Set the celebration scene on every configured device
//! 4. Hold
//! 5. Write back each snapshotted device's restorable capabilities
//! 6. Join the audio task
//!
//! Device errors never abort the run; every step's result is recorded in the
//! returned [`CelebrationReport`].

use crate::audio::{AudioCompletion, AudioCue, AudioTask};
use crate::scheduler::{format_wait, Clock};
use goalhorn_rust_core::models::{Device, DeviceStateSnapshot};
use goalhorn_rust_core::DeviceController;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    Failed(String),
    Skipped,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok)
    }
}

/// Restore result for one captured capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRestore {
    pub capability_type: String,
    pub instance: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub device_id: String,
    pub model_sku: String,
    pub snapshot: StepOutcome,
    pub scene: StepOutcome,
    /// Empty when the snapshot failed
    pub restored: Vec<CapabilityRestore>,
}

impl DeviceReport {
    fn new(device: &Device) -> Self {
        Self {
            device_id: device.device_id.clone(),
            model_sku: device.model_sku.clone(),
            snapshot: StepOutcome::Skipped,
            scene: StepOutcome::Skipped,
            restored: Vec::new(),
        }
    }

    pub fn restore_failures(&self) -> usize {
        self.restored.iter().filter(|r| !r.outcome.is_ok()).count()
    }
}

#[derive(Debug, Clone)]
pub struct CelebrationReport {
    pub devices: Vec<DeviceReport>,
    pub audio: AudioCompletion,
    pub elapsed: Duration,
}

impl CelebrationReport {
    /// True when every snapshot, scene and restore call succeeded
    pub fn is_clean(&self) -> bool {
        self.devices.iter().all(|d| {
            d.snapshot.is_ok() && d.scene.is_ok() && d.restore_failures() == 0
        })
    }

    pub fn scenes_applied(&self) -> usize {
        self.devices.iter().filter(|d| d.scene.is_ok()).count()
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }
}

pub struct CelebrationOrchestrator {
    controller: Arc<dyn DeviceController>,
    audio: Arc<dyn AudioCue>,
    clock: Arc<dyn Clock>,
    hold_duration: Duration,
    audio_join_timeout: Duration,
}

impl CelebrationOrchestrator {
    pub fn new(
        controller: Arc<dyn DeviceController>,
        audio: Arc<dyn AudioCue>,
        clock: Arc<dyn Clock>,
        hold_duration: Duration,
        audio_join_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            audio,
            clock,
            hold_duration,
            audio_join_timeout,
        }
    }

    pub async fn run(&self, devices: &[Device]) -> CelebrationReport {
        let started = Instant::now();
        let mut reports: Vec<DeviceReport> = devices.iter().map(DeviceReport::new).collect();

        // 1. Snapshot
        let mut snapshots: Vec<(usize, DeviceStateSnapshot)> = Vec::with_capacity(devices.len());
        for (idx, device) in devices.iter().enumerate() {
            match self.controller.device_state(device).await {
                Ok(snapshot) => {
                    reports[idx].snapshot = StepOutcome::Ok;
                    snapshots.push((idx, snapshot));
                }
                Err(e) => {
                    warn!(
                        "Failed to snapshot {} ({}); it will not be restored: {}",
                        device.device_id, device.model_sku, e
                    );
                    reports[idx].snapshot = StepOutcome::Failed(e.to_string());
                }
            }
        }

        // 2. Audio
        let audio_task = AudioTask::spawn(self.audio.clone());

        // 3. Scene on every configured device, snapshot or not
        for (idx, device) in devices.iter().enumerate() {
            reports[idx].scene = match self.controller.set_scene(device).await {
                Ok(()) => {
                    info!(
                        "Scene {} set on {} ({})",
                        device.scene_value, device.device_id, device.model_sku
                    );
                    StepOutcome::Ok
                }
                Err(e) => {
                    warn!("Failed to set scene on {}: {}", device.device_id, e);
                    StepOutcome::Failed(e.to_string())
                }
            };
        }

        // 4. Hold
        info!("Holding celebration for {}", format_wait(self.hold_duration));
        self.clock.sleep(self.hold_duration).await;

        // 5. Restore
        for (idx, snapshot) in &snapshots {
            let device = &devices[*idx];
            for capability in snapshot.restorable_capabilities() {
                let outcome = match self.controller.set_capability(device, capability).await {
                    Ok(()) => StepOutcome::Ok,
                    Err(e) => {
                        warn!(
                            "Failed to restore {} on {}: {}",
                            capability.instance, device.device_id, e
                        );
                        StepOutcome::Failed(e.to_string())
                    }
                };
                reports[*idx].restored.push(CapabilityRestore {
                    capability_type: capability.capability_type.clone(),
                    instance: capability.instance.clone(),
                    outcome,
                });
            }
        }

        // 6. Join audio
        let audio = audio_task
            .join(self.clock.as_ref(), self.audio_join_timeout)
            .await;
        match &audio {
            AudioCompletion::Finished => {}
            AudioCompletion::TimedOut => warn!(
                "Audio still playing after {}; cancelled",
                format_wait(self.audio_join_timeout)
            ),
            other => warn!("Audio cue did not complete: {:?}", other),
        }

        let report = CelebrationReport {
            devices: reports,
            audio,
            elapsed: started.elapsed(),
        };
        info!(
            "Celebration done: {}/{} scenes, {} snapshots restored, clean={}",
            report.scenes_applied(),
            devices.len(),
            snapshots.len(),
            report.is_clean()
        );
        report
    }
}
