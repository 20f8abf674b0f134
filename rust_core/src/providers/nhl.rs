use super::ScoreboardProvider;
use crate::clients::nhl::NhlClient;
use crate::error::ApiResult;
use crate::models::GameScoreObservation;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

#[async_trait]
impl ScoreboardProvider for NhlClient {
    async fn team_game(
        &self,
        team_abbrev: &str,
        date: NaiveDate,
    ) -> ApiResult<Option<GameScoreObservation>> {
        let board = self.scoreboard(team_abbrev).await?;
        debug!(
            "NHL scoreboard for {}: {} date sections",
            team_abbrev,
            board.games_by_date.len()
        );
        Ok(board.find_team_game(date, team_abbrev))
    }

    fn provider_name(&self) -> &str {
        "nhl"
    }
}
