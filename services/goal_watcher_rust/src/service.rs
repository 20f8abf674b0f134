//! Main polling loop
//!
//! Two phases: idle polling and celebrating. A celebration always runs to
//! completion before the next poll, so celebrations never overlap.

use crate::celebration::{CelebrationOrchestrator, CelebrationReport};
use crate::scheduler::{format_wait, Clock};
use crate::watcher::{PollOutcome, ScoreWatcher, WatcherState};
use goalhorn_rust_core::models::Device;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    IdlePolling,
    Celebrating,
}

impl ServicePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdlePolling => "idle_polling",
            Self::Celebrating => "celebrating",
        }
    }
}

/// What one poll cycle did
#[derive(Debug, Clone)]
pub enum CycleReport {
    /// Scoreboard could not be fetched; state untouched, retried next cycle
    FetchFailed(String),
    Observed(PollOutcome),
    Celebrated {
        outcome: PollOutcome,
        report: CelebrationReport,
    },
}

impl CycleReport {
    pub fn celebrated(&self) -> bool {
        matches!(self, CycleReport::Celebrated { .. })
    }
}

#[derive(Debug, Clone)]
pub struct LoopTimings {
    pub poll_interval: Duration,
    /// Wait between detecting a goal and lighting up
    pub pre_roll_delay: Duration,
}

pub struct GoalService {
    watcher: ScoreWatcher,
    orchestrator: CelebrationOrchestrator,
    clock: Arc<dyn Clock>,
    devices: Vec<Device>,
    timings: LoopTimings,
    state: WatcherState,
    phase: ServicePhase,
    celebrations: u64,
}

impl GoalService {
    pub fn new(
        watcher: ScoreWatcher,
        orchestrator: CelebrationOrchestrator,
        clock: Arc<dyn Clock>,
        devices: Vec<Device>,
        timings: LoopTimings,
    ) -> Self {
        Self {
            watcher,
            orchestrator,
            clock,
            devices,
            timings,
            state: WatcherState::new(),
            phase: ServicePhase::IdlePolling,
            celebrations: 0,
        }
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn phase(&self) -> ServicePhase {
        self.phase
    }

    pub fn celebrations(&self) -> u64 {
        self.celebrations
    }

    /// Poll once, update tracking, and celebrate if a goal was scored
    pub async fn run_cycle(&mut self) -> CycleReport {
        let observation = match self.watcher.poll().await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Scoreboard fetch failed: {}", e);
                return CycleReport::FetchFailed(e.to_string());
            }
        };

        let (next, outcome) = self.state.observe(observation.as_ref());
        self.state = next;

        match &outcome {
            PollOutcome::NoGame => {
                debug!("No current game found for {}", self.watcher.team_abbrev());
            }
            PollOutcome::Baseline {
                game_id,
                score,
                new_game,
            } => {
                if *new_game {
                    info!("New game detected ({}), resetting score tracking", game_id);
                }
                info!("Tracking game {} from score {}", game_id, score);
            }
            PollOutcome::Unchanged { .. } => {}
            PollOutcome::Corrected {
                game_id,
                previous,
                current,
            } => {
                warn!(
                    "Score for game {} went down {} -> {}; using {} as baseline",
                    game_id, previous, current, current
                );
            }
            PollOutcome::Goal {
                game_id,
                previous,
                current,
            } => {
                info!(
                    "GOAL! {} game {}: {} -> {}",
                    self.watcher.team_abbrev(),
                    game_id,
                    previous,
                    current
                );
            }
        }

        if outcome.is_goal() {
            let report = self.celebrate().await;
            return CycleReport::Celebrated { outcome, report };
        }
        CycleReport::Observed(outcome)
    }

    /// Wait out the pre-roll, then run the celebration to completion
    pub async fn celebrate(&mut self) -> CelebrationReport {
        self.phase = ServicePhase::Celebrating;

        if !self.timings.pre_roll_delay.is_zero() {
            info!("Celebrating in {}", format_wait(self.timings.pre_roll_delay));
            self.clock.sleep(self.timings.pre_roll_delay).await;
        }

        let report = self.orchestrator.run(&self.devices).await;
        self.celebrations += 1;
        self.phase = ServicePhase::IdlePolling;
        report
    }

    /// Poll forever. Errors are logged by `run_cycle` and never end the loop.
    pub async fn run(&mut self) {
        info!(
            "Watching {} every {} with {} device(s)",
            self.watcher.team_abbrev(),
            format_wait(self.timings.poll_interval),
            self.devices.len()
        );

        loop {
            self.run_cycle().await;
            self.clock.sleep(self.timings.poll_interval).await;
        }
    }
}
