//! Sticky diagnostic warnings surfaced in the support report.
//!
//! Analysis workers raise flags from many tasks at once; bits are only ever
//! OR-ed in and stay set until [`WarningFlags::clear`] is called.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PluginWarning {
    /// The skip button could not be injected into the web client.
    UnableToAddSkipButton,
    /// Chromaprint failed to fingerprint at least one media file.
    InvalidChromaprintFingerprint,
    /// The installed ffmpeg build lacks the filters analysis relies on.
    IncompatibleFFmpegBuild,
}

impl PluginWarning {
    /// Every flag in ascending bit order.
    pub const ALL: [PluginWarning; 3] = [
        PluginWarning::UnableToAddSkipButton,
        PluginWarning::InvalidChromaprintFingerprint,
        PluginWarning::IncompatibleFFmpegBuild,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            PluginWarning::UnableToAddSkipButton => 1,
            PluginWarning::InvalidChromaprintFingerprint => 2,
            PluginWarning::IncompatibleFFmpegBuild => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginWarning::UnableToAddSkipButton => "UnableToAddSkipButton",
            PluginWarning::InvalidChromaprintFingerprint => "InvalidChromaprintFingerprint",
            PluginWarning::IncompatibleFFmpegBuild => "IncompatibleFFmpegBuild",
        }
    }
}

#[derive(Debug, Default)]
pub struct WarningFlags {
    bits: AtomicU32,
}

impl WarningFlags {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    pub fn set_flag(&self, flag: PluginWarning) {
        self.bits.fetch_or(flag.bit(), Ordering::AcqRel);
    }

    pub fn clear(&self) {
        self.bits.store(0, Ordering::Release);
    }

    pub fn contains(&self, flag: PluginWarning) -> bool {
        self.bits() & flag.bit() != 0
    }

    pub fn bits(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    pub fn active(&self) -> Vec<PluginWarning> {
        let bits = self.bits();
        PluginWarning::ALL
            .into_iter()
            .filter(|flag| bits & flag.bit() != 0)
            .collect()
    }

    /// Set flags joined with `", "` in ascending bit order, or `"None"`.
    pub fn get_warnings(&self) -> String {
        let active = self.active();
        if active.is_empty() {
            return "None".to_string();
        }

        active
            .iter()
            .map(PluginWarning::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

static WARNINGS: WarningFlags = WarningFlags::new();

/// Process-wide flags shared by every analysis worker.
pub fn global() -> &'static WarningFlags {
    &WARNINGS
}
