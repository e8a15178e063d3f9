//! Plain-text support report, the only place warnings surface.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    orchestrator::{AutoTrigger, RunState, TriggerPhase},
    settings::SettingsStore,
    tasks::DetectSegmentsTask,
    warnings::WarningFlags,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    pub warnings: String,
    pub automatic_phase: TriggerPhase,
    pub automatic_state: RunState,
    pub follow_up_pending: bool,
    pub automatic_episodes: usize,
    pub automatic_folders: usize,
    pub scheduled_episodes: usize,
    pub scheduled_folders: usize,
    pub gate_available: bool,
    pub scheduled_waiting: usize,
    pub enabled_modes: Vec<&'static str>,
}

impl DiagnosticsSnapshot {
    pub async fn collect(
        trigger: &AutoTrigger,
        task: &DetectSegmentsTask,
        settings: &SettingsStore,
        warnings: &WarningFlags,
    ) -> Self {
        let automatic = trigger.snapshot().await;
        let gate = trigger.gate();

        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            warnings: warnings.get_warnings(),
            automatic_phase: automatic.phase,
            automatic_state: automatic.run_state,
            follow_up_pending: automatic.follow_up_pending,
            automatic_episodes: automatic.pending_episodes,
            automatic_folders: automatic.pending_folders,
            scheduled_episodes: task.queue().episode_count(),
            scheduled_folders: task.queue().path_restrictions().len(),
            gate_available: gate.is_available(),
            scheduled_waiting: gate.pending_scheduled(),
            enabled_modes: settings
                .detection()
                .enabled_modes()
                .iter()
                .map(|mode| mode.as_str())
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let modes = if self.enabled_modes.is_empty() {
            "None".to_string()
        } else {
            self.enabled_modes.join(", ")
        };

        let mut report = String::new();
        let _ = writeln!(report, "Intro Skipper diagnostics (v{})", self.version);
        let _ = writeln!(report, "Generated: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(report, "Warnings: {}", self.warnings);
        let _ = writeln!(report, "Enabled modes: {modes}");
        let _ = writeln!(
            report,
            "Automatic analysis: {} ({:?}){}",
            self.automatic_state.as_str(),
            self.automatic_phase,
            if self.follow_up_pending {
                ", follow-up pending"
            } else {
                ""
            }
        );
        let _ = writeln!(
            report,
            "Automatic queue: {} episode(s), {} folder(s)",
            self.automatic_episodes, self.automatic_folders
        );
        let _ = writeln!(
            report,
            "Scheduled queue: {} episode(s), {} folder(s)",
            self.scheduled_episodes, self.scheduled_folders
        );
        let _ = writeln!(
            report,
            "Gate: {}, {} scheduled run(s) waiting",
            if self.gate_available { "free" } else { "held" },
            self.scheduled_waiting
        );
        report
    }
}

pub async fn build_report(
    trigger: &AutoTrigger,
    task: &DetectSegmentsTask,
    settings: &SettingsStore,
    warnings: &WarningFlags,
) -> String {
    DiagnosticsSnapshot::collect(trigger, task, settings, warnings)
        .await
        .render()
}
