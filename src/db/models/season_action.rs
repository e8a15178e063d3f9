use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::segment::SegmentType;

/// Per-season override of how segments are found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AnalyzerAction {
    /// Use automatic detection.
    #[default]
    Default,
    /// Only use chapter markers.
    Chapter,
    /// Only use audio fingerprint matching.
    Chromaprint,
    /// Only use black frame detection.
    BlackFrame,
    /// Skip analysis for this season.
    None,
}

impl AnalyzerAction {
    pub fn as_i64(&self) -> i64 {
        match self {
            AnalyzerAction::Default => 0,
            AnalyzerAction::Chapter => 1,
            AnalyzerAction::Chromaprint => 2,
            AnalyzerAction::BlackFrame => 3,
            AnalyzerAction::None => 4,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(AnalyzerAction::Default),
            1 => Ok(AnalyzerAction::Chapter),
            2 => Ok(AnalyzerAction::Chromaprint),
            3 => Ok(AnalyzerAction::BlackFrame),
            4 => Ok(AnalyzerAction::None),
            other => Err(anyhow!("unknown analyzer action {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonAction {
    pub season_id: Uuid,
    pub segment_type: SegmentType,
    pub action: AnalyzerAction,
    /// Episodes the record was derived from, in analysis order.
    pub episode_ids: Vec<Uuid>,
}

impl SeasonAction {
    pub fn new(season_id: Uuid, segment_type: SegmentType, episode_ids: Vec<Uuid>) -> Self {
        Self {
            season_id,
            segment_type,
            action: AnalyzerAction::Default,
            episode_ids,
        }
    }

    pub fn with_action(mut self, action: AnalyzerAction) -> Self {
        self.action = action;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_round_trip() {
        for action in [
            AnalyzerAction::Default,
            AnalyzerAction::Chapter,
            AnalyzerAction::Chromaprint,
            AnalyzerAction::BlackFrame,
            AnalyzerAction::None,
        ] {
            assert_eq!(AnalyzerAction::from_i64(action.as_i64()).unwrap(), action);
        }
        assert!(AnalyzerAction::from_i64(9).is_err());
        assert_eq!(AnalyzerAction::default().as_i64(), 0);
    }
}
