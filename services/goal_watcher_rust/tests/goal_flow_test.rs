//! End-to-end tests for the watcher loop
//!
//! The scoreboard, light API and clock are in-memory fakes, so these run
//! without network access and without real waits.

use async_trait::async_trait;
use chrono::NaiveDate;
use goal_watcher_rust::audio::SilentAudio;
use goal_watcher_rust::scheduler::Clock;
use goal_watcher_rust::{
    CelebrationOrchestrator, CycleReport, GoalService, LoopTimings, PollOutcome, ScoreWatcher,
    ServicePhase, WatcherState,
};
use goalhorn_rust_core::models::{CapabilityState, Device, DeviceStateSnapshot};
use goalhorn_rust_core::{
    ApiError, ApiResult, DeviceController, GameScoreObservation, ScoreboardProvider,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_secs(5);
const PRE_ROLL: Duration = Duration::from_secs(30);
const HOLD: Duration = Duration::from_secs(50);

/// Poll result scripted for one cycle
enum Reading {
    Game(&'static str, u32),
    NoGame,
    Down,
}

struct ScriptedScoreboard {
    readings: Mutex<VecDeque<Reading>>,
    requested: Mutex<Vec<(String, NaiveDate)>>,
}

impl ScriptedScoreboard {
    fn new(readings: Vec<Reading>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScoreboardProvider for ScriptedScoreboard {
    async fn team_game(
        &self,
        team_abbrev: &str,
        date: NaiveDate,
    ) -> ApiResult<Option<GameScoreObservation>> {
        self.requested.lock().push((team_abbrev.to_string(), date));
        match self.readings.lock().pop_front() {
            Some(Reading::Game(id, score)) => Ok(Some(GameScoreObservation::new(id, score))),
            Some(Reading::NoGame) | None => Ok(None),
            Some(Reading::Down) => Err(ApiError::CircuitOpen { api: "nhl" }),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct CountingLights {
    scenes: Mutex<Vec<String>>,
    restores: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DeviceController for CountingLights {
    async fn device_state(&self, device: &Device) -> ApiResult<DeviceStateSnapshot> {
        Ok(DeviceStateSnapshot {
            model_sku: device.model_sku.clone(),
            device_id: device.device_id.clone(),
            capabilities: vec![
                CapabilityState::new("devices.capabilities.online", "online", json!(true)),
                CapabilityState::new("devices.capabilities.on_off", "powerSwitch", json!(1)),
                CapabilityState::new("devices.capabilities.color_setting", "colorRgb", json!(255)),
            ],
        })
    }

    async fn set_scene(&self, device: &Device) -> ApiResult<()> {
        self.scenes.lock().push(device.device_id.clone());
        Ok(())
    }

    async fn set_capability(&self, device: &Device, capability: &CapabilityState) -> ApiResult<()> {
        self.restores
            .lock()
            .push((device.device_id.clone(), capability.instance.clone()));
        Ok(())
    }
}

struct FakeClock {
    today: NaiveDate,
    sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        tokio::task::yield_now().await;
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

struct Harness {
    service: GoalService,
    scoreboard: Arc<ScriptedScoreboard>,
    lights: Arc<CountingLights>,
    clock: Arc<FakeClock>,
}

fn harness(readings: Vec<Reading>) -> Harness {
    let scoreboard = Arc::new(ScriptedScoreboard::new(readings));
    let lights = Arc::new(CountingLights::default());
    let clock = Arc::new(FakeClock {
        today: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        sleeps: Mutex::new(Vec::new()),
    });

    let devices = vec![
        Device::new("H6199", "lamp", json!(3853)),
        Device::new("H617A", "strip", json!(8216681)),
    ];

    let watcher = ScoreWatcher::new(scoreboard.clone(), clock.clone(), "COL");
    let orchestrator = CelebrationOrchestrator::new(
        lights.clone(),
        Arc::new(SilentAudio),
        clock.clone(),
        HOLD,
        Duration::from_secs(5),
    );
    let service = GoalService::new(
        watcher,
        orchestrator,
        clock.clone(),
        devices,
        LoopTimings {
            poll_interval: POLL,
            pre_roll_delay: PRE_ROLL,
        },
    );

    Harness {
        service,
        scoreboard,
        lights,
        clock,
    }
}

async fn run_cycles(h: &mut Harness, n: usize) -> Vec<CycleReport> {
    let mut reports = Vec::with_capacity(n);
    for _ in 0..n {
        reports.push(h.service.run_cycle().await);
        assert_eq!(h.service.phase(), ServicePhase::IdlePolling);
    }
    reports
}

fn celebrated_at(reports: &[CycleReport]) -> Vec<usize> {
    reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.celebrated())
        .map(|(i, _)| i)
        .collect()
}

#[tokio::test]
async fn test_first_goal_after_scoreless_start() {
    let mut h = harness(vec![
        Reading::Game("gameA", 0),
        Reading::Game("gameA", 0),
        Reading::Game("gameA", 1),
    ]);

    let reports = run_cycles(&mut h, 3).await;

    assert_eq!(celebrated_at(&reports), vec![2]);
    assert_eq!(h.service.celebrations(), 1);
    assert_eq!(h.service.state().last_score, Some(1));

    // Every device got exactly one scene; online was never restored
    assert_eq!(*h.lights.scenes.lock(), vec!["lamp", "strip"]);
    let restores = h.lights.restores.lock().clone();
    assert_eq!(restores.len(), 4);
    assert!(restores.iter().all(|(_, instance)| instance != "online"));

    // Pre-roll then hold, nothing else slept inside run_cycle
    assert_eq!(*h.clock.sleeps.lock(), vec![PRE_ROLL, HOLD]);
}

#[tokio::test]
async fn test_game_change_rebaselines() {
    let mut h = harness(vec![
        Reading::Game("gameA", 2),
        Reading::Game("gameB", 0),
        Reading::Game("gameB", 1),
    ]);

    let reports = run_cycles(&mut h, 3).await;

    assert_eq!(celebrated_at(&reports), vec![2]);
    match &reports[1] {
        CycleReport::Observed(PollOutcome::Baseline { game_id, new_game, .. }) => {
            assert_eq!(game_id, "gameB");
            assert!(*new_game);
        }
        other => panic!("expected new-game baseline, got {other:?}"),
    }
    match &reports[2] {
        CycleReport::Celebrated { outcome, report } => {
            assert!(outcome.is_goal());
            assert!(report.is_clean());
            assert_eq!(report.scenes_applied(), 2);
        }
        other => panic!("expected celebration, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_game_today_leaves_state_unchanged() {
    let mut h = harness(vec![Reading::NoGame]);

    let reports = run_cycles(&mut h, 1).await;

    assert!(matches!(reports[0], CycleReport::Observed(PollOutcome::NoGame)));
    assert_eq!(*h.service.state(), WatcherState::default());
    assert!(h.lights.scenes.lock().is_empty());
    assert!(h.clock.sleeps.lock().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_not_fatal() {
    let mut h = harness(vec![
        Reading::Game("gameA", 1),
        Reading::Down,
        Reading::Down,
        Reading::Game("gameA", 2),
    ]);

    let reports = run_cycles(&mut h, 4).await;

    assert!(matches!(reports[1], CycleReport::FetchFailed(_)));
    assert!(matches!(reports[2], CycleReport::FetchFailed(_)));
    // Tracking survived the outage, so the goal during it is still caught
    assert_eq!(celebrated_at(&reports), vec![3]);
}

#[tokio::test]
async fn test_repeats_and_corrections_never_celebrate() {
    let mut h = harness(vec![
        Reading::Game("gameA", 3),
        Reading::Game("gameA", 3),
        Reading::Game("gameA", 2),
        Reading::Game("gameA", 2),
        Reading::NoGame,
        Reading::Game("gameA", 2),
    ]);

    let reports = run_cycles(&mut h, 6).await;

    assert!(celebrated_at(&reports).is_empty());
    assert!(h.lights.scenes.lock().is_empty());
    assert_eq!(h.service.state().last_score, Some(2));
}

#[tokio::test]
async fn test_one_celebration_per_goal_over_a_game() {
    let mut h = harness(vec![
        Reading::Game("gameA", 0),
        Reading::Game("gameA", 1),
        Reading::Game("gameA", 1),
        Reading::Game("gameA", 2),
        Reading::Game("gameA", 4),
        Reading::Game("gameA", 4),
    ]);

    let reports = run_cycles(&mut h, 6).await;

    assert_eq!(celebrated_at(&reports), vec![1, 3, 4]);
    assert_eq!(h.service.celebrations(), 3);
    assert_eq!(h.lights.scenes.lock().len(), 6);
}

#[tokio::test]
async fn test_watcher_queries_tracked_team_for_today() {
    let mut h = harness(vec![Reading::NoGame]);
    run_cycles(&mut h, 1).await;

    let requested = h.scoreboard.requested.lock().clone();
    assert_eq!(
        requested,
        vec![("COL".to_string(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())]
    );
}
