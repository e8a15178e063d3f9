use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::analysis::AnalysisMode;
use crate::db::{
    helpers::{invalid_column, join_episode_ids, parse_uuid, split_episode_ids},
    models::{AnalyzerAction, SeasonAction, SegmentType},
    Database,
};

fn row_to_season_action(row: &Row) -> Result<SeasonAction, rusqlite::Error> {
    let season_id: String = row.get("season_id")?;
    let segment_type: i64 = row.get("segment_type")?;
    let action: i64 = row.get("action")?;
    let episode_ids: String = row.get("episode_ids")?;

    Ok(SeasonAction {
        season_id: parse_uuid(&season_id, "season_id").map_err(invalid_column)?,
        segment_type: AnalysisMode::from_i64(segment_type).map_err(invalid_column)?,
        action: AnalyzerAction::from_i64(action).map_err(invalid_column)?,
        episode_ids: split_episode_ids(&episode_ids).map_err(invalid_column)?,
    })
}

impl Database {
    pub async fn upsert_season_action(&self, record: &SeasonAction) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO season_actions (season_id, segment_type, action, episode_ids)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(season_id, segment_type) DO UPDATE SET
                     action = excluded.action,
                     episode_ids = excluded.episode_ids",
                params![
                    record.season_id.to_string(),
                    record.segment_type.as_i64(),
                    record.action.as_i64(),
                    join_episode_ids(&record.episode_ids),
                ],
            )
            .with_context(|| format!("failed to upsert season action for {}", record.season_id))?;
            Ok(())
        })
        .await
    }

    pub async fn get_season_action(
        &self,
        season_id: Uuid,
        segment_type: SegmentType,
    ) -> Result<Option<SeasonAction>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT season_id, segment_type, action, episode_ids
                 FROM season_actions
                 WHERE season_id = ?1 AND segment_type = ?2",
            )?;

            let record = stmt
                .query_row(
                    params![season_id.to_string(), segment_type.as_i64()],
                    row_to_season_action,
                )
                .optional()?;

            Ok(record)
        })
        .await
    }

    /// Effective action for a season and type; seasons without a record use
    /// automatic detection.
    pub async fn season_action_or_default(
        &self,
        season_id: Uuid,
        segment_type: SegmentType,
    ) -> Result<AnalyzerAction> {
        Ok(self
            .get_season_action(season_id, segment_type)
            .await?
            .map(|record| record.action)
            .unwrap_or_default())
    }

    pub async fn get_season_actions(&self, season_id: Uuid) -> Result<Vec<SeasonAction>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT season_id, segment_type, action, episode_ids
                 FROM season_actions
                 WHERE season_id = ?1
                 ORDER BY segment_type ASC",
            )?;

            let records = stmt
                .query_map(params![season_id.to_string()], row_to_season_action)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(records)
        })
        .await
    }
}
