use crate::circuit_breaker::{ApiCircuitBreaker, ApiCircuitBreakerConfig, ApiCircuitState};
use crate::error::{ApiError, ApiResult};
use crate::models::GameScoreObservation;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const NHL_API_BASE: &str = "https://api-web.nhle.com/v1";

const API_NAME: &str = "nhl";

#[derive(Clone)]
pub struct NhlClient {
    client: Client,
    base_url: String,
    circuit_breaker: Arc<ApiCircuitBreaker>,
}

impl std::fmt::Debug for NhlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NhlClient")
            .field("base_url", &self.base_url)
            .field("circuit_breaker_state", &self.circuit_breaker.state())
            .finish()
    }
}

/// Scoreboard payload: games grouped by local date.
///
/// Sections and games that do not decode are dropped one by one, so a bad
/// entry on another date cannot hide the tracked game.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub games_by_date: Vec<GameDay>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameDay {
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "lenient")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub games: Vec<ScoreboardGame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardGame {
    #[serde(default, deserialize_with = "game_id_as_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub away_team: TeamLine,
    #[serde(default, deserialize_with = "lenient")]
    pub home_team: TeamLine,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamLine {
    #[serde(default, deserialize_with = "lenient")]
    pub abbrev: String,
    /// Absent before puck drop
    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<u32>,
}

impl ScoreboardGame {
    /// The tracked team's side of this game, if it plays in it
    pub fn team_line(&self, team_abbrev: &str) -> Option<&TeamLine> {
        if self.away_team.abbrev.eq_ignore_ascii_case(team_abbrev) {
            Some(&self.away_team)
        } else if self.home_team.abbrev.eq_ignore_ascii_case(team_abbrev) {
            Some(&self.home_team)
        } else {
            None
        }
    }
}

impl Scoreboard {
    /// Find the tracked team's game on `date` and report its score.
    ///
    /// Returns `None` when no date section matches or the team is not playing
    /// that day. A missing score is reported as 0.
    pub fn find_team_game(&self, date: NaiveDate, team_abbrev: &str) -> Option<GameScoreObservation> {
        let date_str = date.format("%Y-%m-%d").to_string();

        self.games_by_date
            .iter()
            .filter(|day| day.date == date_str)
            .flat_map(|day| day.games.iter())
            .find_map(|game| {
                game.team_line(team_abbrev).map(|line| GameScoreObservation {
                    game_id: game.id.clone(),
                    score: line.score.unwrap_or(0),
                })
            })
    }
}

/// Game ids come back as JSON numbers; older payloads used strings.
fn game_id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected game id: {}",
            other
        ))),
    }
}

/// Null or wrongly typed values fall back to the default
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Keep the entries that decode; anything but an array is empty
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl NhlClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_config(base_url, timeout, ApiCircuitBreakerConfig::default())
    }

    /// Create with custom circuit breaker configuration
    pub fn with_config(
        base_url: impl Into<String>,
        timeout: Duration,
        config: ApiCircuitBreakerConfig,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            circuit_breaker: Arc::new(ApiCircuitBreaker::new(API_NAME, config)),
        }
    }

    pub fn circuit_state(&self) -> ApiCircuitState {
        self.circuit_breaker.state()
    }

    /// Fetch the current scoreboard around `team_abbrev`'s schedule
    pub async fn scoreboard(&self, team_abbrev: &str) -> ApiResult<Scoreboard> {
        let url = format!("{}/scoreboard/{}/now", self.base_url, team_abbrev);
        self.circuit_breaker
            .call(self.fetch_scoreboard_internal(&url))
            .await
    }

    async fn fetch_scoreboard_internal(&self, url: &str) -> ApiResult<Scoreboard> {
        let resp = self
            .client
            .get(url)
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

        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            api: API_NAME,
            message: e.to_string(),
        })
    }
}
