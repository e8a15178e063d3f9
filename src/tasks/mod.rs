pub mod detect_segments;

pub use detect_segments::{DetectSegmentsTask, TaskOutcome, TaskTrigger};
