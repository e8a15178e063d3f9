use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::analysis::AnalysisMode;
use crate::db::{
    helpers::{invalid_column, parse_uuid},
    models::{Segment, SegmentType},
    Database,
};

fn row_to_segment(row: &Row) -> Result<Segment, rusqlite::Error> {
    let item_id: String = row.get("item_id")?;
    let segment_type: i64 = row.get("segment_type")?;

    Ok(Segment {
        item_id: parse_uuid(&item_id, "item_id").map_err(invalid_column)?,
        segment_type: AnalysisMode::from_i64(segment_type).map_err(invalid_column)?,
        start: row.get("start")?,
        end: row.get("end")?,
    })
}

const UPSERT_SEGMENT: &str = "INSERT INTO segments (item_id, segment_type, \"start\", \"end\")
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(item_id, segment_type) DO UPDATE SET
         \"start\" = excluded.\"start\",
         \"end\" = excluded.\"end\"";

impl Database {
    /// Insert or overwrite the segment for `(item_id, segment_type)`.
    pub async fn upsert_segment(&self, segment: &Segment) -> Result<()> {
        segment.validate()?;
        let record = segment.clone();
        self.execute(move |conn| {
            conn.execute(
                UPSERT_SEGMENT,
                params![
                    record.item_id.to_string(),
                    record.segment_type.as_i64(),
                    record.start,
                    record.end,
                ],
            )
            .with_context(|| format!("failed to upsert segment for {}", record.item_id))?;
            Ok(())
        })
        .await
    }

    /// Batch variant of [`upsert_segment`](Self::upsert_segment); all rows
    /// land in one transaction or none do.
    pub async fn upsert_segments(&self, segments: &[Segment]) -> Result<()> {
        for segment in segments {
            segment.validate()?;
        }

        let segments = segments.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            for segment in &segments {
                tx.execute(
                    UPSERT_SEGMENT,
                    params![
                        segment.item_id.to_string(),
                        segment.segment_type.as_i64(),
                        segment.start,
                        segment.end,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_segment(
        &self,
        item_id: Uuid,
        segment_type: SegmentType,
    ) -> Result<Option<Segment>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, segment_type, \"start\", \"end\"
                 FROM segments
                 WHERE item_id = ?1 AND segment_type = ?2",
            )?;

            let segment = stmt
                .query_row(
                    params![item_id.to_string(), segment_type.as_i64()],
                    row_to_segment,
                )
                .optional()?;

            Ok(segment)
        })
        .await
    }

    /// All segments stored for one item, introduction first.
    pub async fn get_segments_for_item(&self, item_id: Uuid) -> Result<Vec<Segment>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, segment_type, \"start\", \"end\"
                 FROM segments
                 WHERE item_id = ?1
                 ORDER BY segment_type ASC",
            )?;

            let segments = stmt
                .query_map(params![item_id.to_string()], row_to_segment)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(segments)
        })
        .await
    }
}
