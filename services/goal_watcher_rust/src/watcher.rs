//! Score watching and goal detection
//!
//! [`WatcherState`] is a plain value threaded through every poll:
//! `observe` takes the previous state and the new observation and returns the
//! next state plus what happened. The network side lives in [`ScoreWatcher`].

use crate::scheduler::Clock;
use goalhorn_rust_core::{ApiResult, GameScoreObservation, ScoreboardProvider};
use std::sync::Arc;
use tracing::debug;

/// What the watcher remembers between polls. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    pub last_game_id: Option<String>,
    pub last_score: Option<u32>,
}

/// Result of feeding one poll into the detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Team is not playing today; state untouched
    NoGame,
    /// First score seen for this game (startup or new game); never celebrated
    Baseline {
        game_id: String,
        score: u32,
        new_game: bool,
    },
    Unchanged { game_id: String, score: u32 },
    /// Upstream lowered the score (review, data fix); the lower score becomes the baseline
    Corrected {
        game_id: String,
        previous: u32,
        current: u32,
    },
    Goal {
        game_id: String,
        previous: u32,
        current: u32,
    },
}

impl PollOutcome {
    pub fn is_goal(&self) -> bool {
        matches!(self, PollOutcome::Goal { .. })
    }
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one poll result.
    ///
    /// - A different game id drops the remembered score (the id itself is
    ///   replaced after the comparison).
    /// - With no remembered score the observation becomes the baseline.
    /// - A strictly higher score is a goal.
    /// - An equal score changes nothing; a lower one re-baselines.
    pub fn observe(&self, observation: Option<&GameScoreObservation>) -> (WatcherState, PollOutcome) {
        let Some(obs) = observation else {
            return (self.clone(), PollOutcome::NoGame);
        };

        let new_game = self
            .last_game_id
            .as_deref()
            .is_some_and(|last| last != obs.game_id);
        let last_score = if new_game { None } else { self.last_score };

        let outcome = match last_score {
            None => PollOutcome::Baseline {
                game_id: obs.game_id.clone(),
                score: obs.score,
                new_game,
            },
            Some(previous) if obs.score > previous => PollOutcome::Goal {
                game_id: obs.game_id.clone(),
                previous,
                current: obs.score,
            },
            Some(previous) if obs.score < previous => PollOutcome::Corrected {
                game_id: obs.game_id.clone(),
                previous,
                current: obs.score,
            },
            Some(_) => PollOutcome::Unchanged {
                game_id: obs.game_id.clone(),
                score: obs.score,
            },
        };

        let next = WatcherState {
            last_game_id: Some(obs.game_id.clone()),
            last_score: Some(obs.score),
        };
        (next, outcome)
    }
}

/// Polls the scoreboard for one team's game today
#[derive(Clone)]
pub struct ScoreWatcher {
    provider: Arc<dyn ScoreboardProvider>,
    clock: Arc<dyn Clock>,
    team_abbrev: String,
}

impl ScoreWatcher {
    pub fn new(
        provider: Arc<dyn ScoreboardProvider>,
        clock: Arc<dyn Clock>,
        team_abbrev: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            clock,
            team_abbrev: team_abbrev.into(),
        }
    }

    pub fn team_abbrev(&self) -> &str {
        &self.team_abbrev
    }

    /// Fetch today's game and score for the tracked team.
    ///
    /// `Ok(None)` is a normal outcome: no game today.
    pub async fn poll(&self) -> ApiResult<Option<GameScoreObservation>> {
        let today = self.clock.today();
        let observation = self.provider.team_game(&self.team_abbrev, today).await?;
        debug!(
            "{} poll for {} on {}: {:?}",
            self.provider.provider_name(),
            self.team_abbrev,
            today,
            observation
        );
        Ok(observation)
    }
}
