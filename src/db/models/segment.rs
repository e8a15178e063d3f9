use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisMode;

/// Persisted segment type; the same variants drive analysis modes.
pub type SegmentType = AnalysisMode;

/// Detected time range, in seconds, of a recurring segment in one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub item_id: Uuid,
    pub segment_type: SegmentType,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(item_id: Uuid, segment_type: SegmentType, start: f64, end: f64) -> Result<Self> {
        let segment = Self {
            item_id,
            segment_type,
            start,
            end,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Row as written before any detection: both bounds at zero.
    pub fn empty(item_id: Uuid, segment_type: SegmentType) -> Self {
        Self {
            item_id,
            segment_type,
            start: 0.0,
            end: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether something was actually detected.
    pub fn is_valid(&self) -> bool {
        self.end > 0.0 && self.start <= self.end
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            bail!(
                "segment {} ({}) has non-finite bounds",
                self.item_id,
                self.segment_type.as_str()
            );
        }
        if self.start > self.end {
            bail!(
                "segment {} ({}) starts at {} after it ends at {}",
                self.item_id,
                self.segment_type.as_str(),
                self.start,
                self.end
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(Segment::new(Uuid::new_v4(), SegmentType::Introduction, 30.0, 10.0).is_err());
        assert!(Segment::new(Uuid::new_v4(), SegmentType::Credits, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn empty_segment_is_not_valid() {
        let empty = Segment::empty(Uuid::new_v4(), SegmentType::Credits);
        assert!(!empty.is_valid());
        assert_eq!(empty.duration(), 0.0);

        let intro = Segment::new(Uuid::new_v4(), SegmentType::Introduction, 12.5, 42.5).unwrap();
        assert!(intro.is_valid());
        assert_eq!(intro.duration(), 30.0);
    }
}
