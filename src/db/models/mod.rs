pub mod season_action;
pub mod segment;

pub use season_action::{AnalyzerAction, SeasonAction};
pub use segment::{Segment, SegmentType};
