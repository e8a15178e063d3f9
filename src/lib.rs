pub mod analysis;
pub mod db;
pub mod diagnostics;
pub mod library;
pub mod orchestrator;
pub mod queue;
pub mod settings;
pub mod tasks;
mod utils;
pub mod warnings;

#[cfg(test)]
mod test_support;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

use analysis::AnalyzerPipeline;
use db::Database;
use library::LibraryEventSource;
use orchestrator::{AutoTrigger, Entrypoint, RunGate};
use settings::{SettingsStore, TriggerConfig};
use tasks::DetectSegmentsTask;
use warnings::WarningFlags;

pub use utils::init_logging;

const ENABLE_LOGS: bool = true;

pub const DATABASE_FILE: &str = "introskipper.db";
pub const SETTINGS_FILE: &str = "settings.json";

/// One per process: owns the database, settings, the run gate shared by
/// both axes and the library subscription.
pub struct Plugin {
    db: Database,
    settings: Arc<SettingsStore>,
    task: DetectSegmentsTask,
    entrypoint: Entrypoint,
}

impl Plugin {
    pub fn start<F>(
        data_dir: impl AsRef<Path>,
        pipeline_factory: F,
        events: &dyn LibraryEventSource,
    ) -> Result<Self>
    where
        F: FnOnce(Database) -> Arc<dyn AnalyzerPipeline>,
    {
        Self::start_with_config(data_dir, TriggerConfig::default(), pipeline_factory, events)
    }

    pub fn start_with_config<F>(
        data_dir: impl AsRef<Path>,
        config: TriggerConfig,
        pipeline_factory: F,
        events: &dyn LibraryEventSource,
    ) -> Result<Self>
    where
        F: FnOnce(Database) -> Arc<dyn AnalyzerPipeline>,
    {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
        let pipeline = pipeline_factory(db.clone());

        let gate = RunGate::new();
        let trigger = AutoTrigger::new(
            Arc::clone(&pipeline),
            Arc::clone(&settings),
            gate.clone(),
            config,
        );
        let task = DetectSegmentsTask::new(pipeline, gate, trigger.clone(), config);

        let mut entrypoint = Entrypoint::new(trigger);
        entrypoint.start(events)?;

        log_info!("Intro Skipper started with data in {}", data_dir.display());

        Ok(Self {
            db,
            settings,
            task,
            entrypoint,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn task(&self) -> &DetectSegmentsTask {
        &self.task
    }

    pub fn trigger(&self) -> &AutoTrigger {
        self.entrypoint.trigger()
    }

    pub fn warnings(&self) -> &'static WarningFlags {
        warnings::global()
    }

    pub async fn diagnostics(&self) -> String {
        diagnostics::build_report(self.trigger(), &self.task, &self.settings, self.warnings()).await
    }

    /// Unsubscribe from the library and stand the automatic axis down.
    pub async fn shutdown(mut self) -> Result<()> {
        self.entrypoint.stop().await?;
        log_info!("Intro Skipper stopped");
        Ok(())
    }
}
