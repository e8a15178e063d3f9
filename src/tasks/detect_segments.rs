use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::{AnalysisMode, AnalyzerPipeline, Progress, QueuedEpisode, RunAxis},
    library::LibraryItem,
    orchestrator::{AutoTrigger, RunGate},
    queue::PendingQueue,
    settings::TriggerConfig,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// When the host scheduler should run a task by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskTrigger {
    Daily { time_of_day: NaiveTime },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Cancelled,
}

/// Manually or scheduler-triggered detection over the whole library, or
/// over whatever was explicitly queued for it.
#[derive(Clone)]
pub struct DetectSegmentsTask {
    queue: Arc<PendingQueue>,
    gate: RunGate,
    trigger: AutoTrigger,
    pipeline: Arc<dyn AnalyzerPipeline>,
    config: TriggerConfig,
}

impl DetectSegmentsTask {
    pub const NAME: &'static str = "Detect and Analyze Media Segments";
    pub const CATEGORY: &'static str = "Intro Skipper";
    pub const DESCRIPTION: &'static str =
        "Analyzes media to determine the timestamp and length of intros and credits.";
    pub const KEY: &'static str = "IntroSkipperDetectSegmentsTask";

    pub fn new(
        pipeline: Arc<dyn AnalyzerPipeline>,
        gate: RunGate,
        trigger: AutoTrigger,
        config: TriggerConfig,
    ) -> Self {
        Self {
            queue: Arc::new(PendingQueue::new(RunAxis::Scheduled)),
            gate,
            trigger,
            pipeline,
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn category(&self) -> &'static str {
        Self::CATEGORY
    }

    pub fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    pub fn key(&self) -> &'static str {
        Self::KEY
    }

    /// Once a day at midnight, local time.
    pub fn default_triggers(&self) -> Vec<TaskTrigger> {
        vec![TaskTrigger::Daily {
            time_of_day: NaiveTime::MIN,
        }]
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// Narrow the next execution to this episode. Returns false for items
    /// that are not analyzable or are already queued.
    pub fn enqueue(&self, item: &LibraryItem) -> bool {
        QueuedEpisode::from_item(item)
            .map(|episode| self.queue.queue_episode(episode))
            .unwrap_or(false)
    }

    pub async fn execute(&self, progress: Progress, cancel: CancellationToken) -> Result<TaskOutcome> {
        // Registered before looking at the automatic axis so a timer firing
        // in between stands down instead of starting.
        let _intent = self.gate.announce_scheduled();
        log_info!("Scheduled segment detection starting");

        if self.trigger.run_state().await.is_active() {
            log_info!("Automatic analysis is running; cancelling it first");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TaskOutcome::Cancelled),
                _ = self.trigger.request_cancel_and_wait(self.config.cancel_wait) => {}
            }
        }

        let Some(permit) = self.gate.acquire_scheduled(&cancel).await? else {
            log_info!("Scheduled segment detection cancelled while waiting for the gate");
            return Ok(TaskOutcome::Cancelled);
        };

        let batch = self.queue.begin_run(AnalysisMode::ALL.to_vec());
        let run_id = batch.run_id;
        log_info!(
            "Scheduled run {} analyzing {} queued episode(s) ({:?})",
            run_id,
            batch.episodes.len(),
            batch.scope()
        );

        let result = self
            .pipeline
            .analyze(batch, progress.clone(), cancel.clone())
            .await;
        self.queue.complete_run();
        drop(permit);

        if let Err(err) = result {
            log_warn!("Scheduled run {run_id} failed: {err:?}");
            return Err(err);
        }

        if cancel.is_cancelled() {
            log_info!("Scheduled run {run_id} cancelled");
            return Ok(TaskOutcome::Cancelled);
        }

        progress.report(1.0);
        log_info!("Scheduled run {run_id} finished");
        Ok(TaskOutcome::Completed)
    }
}
