use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::analysis::AnalysisMode;

/// How long the library must stay quiet before an automatic run starts.
pub const DEBOUNCE_DELAY: Duration = Duration::from_secs(20);
/// Upper bound on waiting for an automatic run to acknowledge cancellation.
pub const CANCEL_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionSettings {
    pub auto_detect_intros: bool,
    pub auto_detect_credits: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            auto_detect_intros: true,
            auto_detect_credits: true,
        }
    }
}

impl DetectionSettings {
    pub fn any_enabled(&self) -> bool {
        self.auto_detect_intros || self.auto_detect_credits
    }

    pub fn enabled_modes(&self) -> Vec<AnalysisMode> {
        let mut modes = Vec::with_capacity(2);
        if self.auto_detect_intros {
            modes.push(AnalysisMode::Introduction);
        }
        if self.auto_detect_credits {
            modes.push(AnalysisMode::Credits);
        }
        modes
    }
}

/// Timings shared by the automatic trigger and the scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub debounce: Duration,
    pub cancel_wait: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            cancel_wait: CANCEL_WAIT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PluginSettings {
    detection: DetectionSettings,
}

#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<PluginSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Settings at {} are unreadable ({err}); using defaults",
                    path.display()
                );
                PluginSettings::default()
            })
        } else {
            PluginSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Settings that live only in memory; used by tests and embedders
    /// that manage configuration themselves.
    pub fn in_memory(detection: DetectionSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(PluginSettings { detection }),
        }
    }

    pub fn detection(&self) -> DetectionSettings {
        self.read().detection.clone()
    }

    pub fn update_detection(&self, settings: DetectionSettings) -> Result<()> {
        let mut guard = self.write();
        guard.detection = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let data: PluginSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &PluginSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, PluginSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PluginSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
