//! goal_watcher_rust - lights and sound when the tracked team scores

pub mod audio;
pub mod celebration;
pub mod config;
pub mod scheduler;
pub mod service;
pub mod watcher;

pub use celebration::{CelebrationOrchestrator, CelebrationReport, StepOutcome};
pub use config::GoalWatcherConfig;
pub use service::{CycleReport, GoalService, LoopTimings, ServicePhase};
pub use watcher::{PollOutcome, ScoreWatcher, WatcherState};
