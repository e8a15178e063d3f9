//! Debounced automatic analysis driven by library change events.
//!
//! Events collapse into one run once the library has been quiet for the
//! debounce period. Events seen while a run is active are queued on the
//! live queue and guarantee exactly one follow-up run.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::{AnalyzerPipeline, Progress, QueuedEpisode, RunAxis},
    library::{LibraryEvent, LibraryItem, TaskCompletion},
    queue::PendingQueue,
    settings::{SettingsStore, TriggerConfig},
};

use super::{
    gate::RunGate,
    state::{ActiveRun, RunState, TriggerPhase, TriggerState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// What an incoming event did to the automatic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not relevant, or detection is switched off.
    Ignored,
    /// Added to the live queue of the active run; a follow-up is pending.
    Queued,
    /// Debounce timer (re)armed.
    Armed,
    /// Recorded, but the gate is busy so no timer was armed.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    NotRunning,
    /// The run signalled completion within the bound.
    Completed,
    /// The bound elapsed first; the caller proceeds anyway.
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSnapshot {
    pub phase: TriggerPhase,
    pub run_state: RunState,
    pub follow_up_pending: bool,
    pub pending_episodes: usize,
    pub pending_folders: usize,
}

#[derive(Clone)]
pub struct AutoTrigger {
    state: Arc<Mutex<TriggerState>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    queue: Arc<PendingQueue>,
    gate: RunGate,
    pipeline: Arc<dyn AnalyzerPipeline>,
    settings: Arc<SettingsStore>,
    config: TriggerConfig,
}

impl std::fmt::Debug for AutoTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoTrigger")
            .field("queue", &self.queue)
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AutoTrigger {
    pub fn new(
        pipeline: Arc<dyn AnalyzerPipeline>,
        settings: Arc<SettingsStore>,
        gate: RunGate,
        config: TriggerConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TriggerState::new())),
            timer: Arc::new(Mutex::new(None)),
            queue: Arc::new(PendingQueue::new(RunAxis::Automatic)),
            gate,
            pipeline,
            settings,
            config,
        }
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    pub async fn run_state(&self) -> RunState {
        self.state.lock().await.run_state()
    }

    pub async fn phase(&self) -> TriggerPhase {
        self.state.lock().await.phase()
    }

    pub async fn snapshot(&self) -> TriggerSnapshot {
        let state = self.state.lock().await;
        TriggerSnapshot {
            phase: state.phase(),
            run_state: state.run_state(),
            follow_up_pending: state.run_again_pending(),
            pending_episodes: self.queue.episode_count(),
            pending_folders: self.queue.path_restrictions().len(),
        }
    }

    pub async fn handle_event(&self, event: &LibraryEvent) -> EventOutcome {
        match event {
            LibraryEvent::ItemAdded(item) | LibraryEvent::ItemUpdated(item) => {
                self.on_item_changed(item).await
            }
            LibraryEvent::TaskCompleted(completion) => self.on_task_completed(completion).await,
        }
    }

    /// Item added or modified in the library.
    pub async fn on_item_changed(&self, item: &LibraryItem) -> EventOutcome {
        if !self.settings.detection().any_enabled() {
            return EventOutcome::Ignored;
        }

        let Some(episode) = QueuedEpisode::from_item(item) else {
            return EventOutcome::Ignored;
        };

        let mut state = self.state.lock().await;
        if state.is_stopped() {
            return EventOutcome::Ignored;
        }
        if state.phase() == TriggerPhase::Running {
            if self.queue.queue_episode(episode) {
                log_debug!("Queued {} on the active automatic run", item.path.display());
            }
            state.request_follow_up();
            return EventOutcome::Queued;
        }

        self.queue.restrict_path(item.containing_folder());
        self.arm_locked(&mut state).await
    }

    /// Host task finished; only a completed library refresh matters.
    pub async fn on_task_completed(&self, completion: &TaskCompletion) -> EventOutcome {
        if !self.settings.detection().any_enabled() || !completion.is_library_refresh() {
            return EventOutcome::Ignored;
        }

        let mut state = self.state.lock().await;
        if state.is_stopped() || state.phase() == TriggerPhase::Running {
            // A refresh finishing mid-run is the scan that produced the run.
            return EventOutcome::Ignored;
        }

        self.arm_locked(&mut state).await
    }

    /// Request cancellation of the active run and wait for it to finish,
    /// giving up after `wait`.
    pub async fn request_cancel_and_wait(&self, wait: Duration) -> CancelOutcome {
        let (run_id, mut done) = {
            let state = self.state.lock().await;
            let Some(run) = state.active() else {
                return CancelOutcome::NotRunning;
            };
            if !run.token.is_cancelled() {
                log_info!("Cancelling automatic run {}", run.run_id);
                run.token.cancel();
            }
            (run.run_id, run.done.clone())
        };

        let finished = time::timeout(wait, async {
            if done.wait_for(|finished| *finished).await.is_err() {
                log_debug!("Automatic run {run_id} dropped its completion channel");
            }
        })
        .await;

        match finished {
            Ok(()) => CancelOutcome::Completed,
            Err(_) => {
                log_warn!(
                    "Automatic run {} did not acknowledge cancellation within {}s; proceeding",
                    run_id,
                    wait.as_secs()
                );
                CancelOutcome::TimedOut
            }
        }
    }

    /// Disarm any pending timer, cancel the active run and drop the folder
    /// backlog. The trigger stays inert afterwards: a run finishing after
    /// this point never arms a follow-up.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            state.stop();
            if let Some(handle) = self.timer.lock().await.take() {
                handle.abort();
            }
        }

        self.request_cancel_and_wait(self.config.cancel_wait).await;
        self.queue.clear_path_restrictions();
    }

    async fn arm_locked(&self, state: &mut TriggerState) -> EventOutcome {
        if state.is_stopped() {
            return EventOutcome::Ignored;
        }
        if !self.gate.is_open_for_automatic() {
            log_info!("Analysis gate is busy; automatic analysis deferred until the next change");
            return EventOutcome::Deferred;
        }

        let generation = state.arm();
        let handle = self.spawn_timer(generation);
        if let Some(previous) = self.timer.lock().await.replace(handle) {
            previous.abort();
        }

        log_info!(
            "Media library changed, analysis will start in {}s",
            self.config.debounce.as_secs()
        );
        EventOutcome::Armed
    }

    fn spawn_timer(&self, generation: u64) -> JoinHandle<()> {
        let this = self.clone();
        let delay = self.config.debounce;
        tokio::spawn(async move {
            time::sleep(delay).await;
            this.fire(generation).await;
        })
    }

    async fn fire(self, generation: u64) {
        let (token, done_tx, permit, batch) = {
            let mut state = self.state.lock().await;
            if !state.is_current_timer(generation) {
                log_debug!("Ignoring superseded debounce timer {generation}");
                return;
            }
            // Detach our own handle so later re-arms never abort this task.
            self.timer.lock().await.take();

            let modes = self.settings.detection().enabled_modes();
            if modes.is_empty() {
                log_info!("Automatic detection was disabled before the timer fired");
                state.disarm();
                return;
            }

            let Some(permit) = self.gate.try_acquire_automatic() else {
                log_info!("Scheduled analysis holds the gate; automatic run deferred");
                state.disarm();
                return;
            };

            let token = CancellationToken::new();
            let (done_tx, done_rx) = watch::channel(false);
            let batch = self.queue.begin_run(modes);
            state.begin_run(ActiveRun {
                run_id: batch.run_id,
                token: token.clone(),
                done: done_rx,
            });
            (token, done_tx, permit, batch)
        };

        let run_id = batch.run_id;
        log_info!(
            "Timer elapsed, starting automatic run {} ({}) over {} folder(s) and {} episode(s)",
            run_id,
            batch
                .modes
                .iter()
                .map(|mode| mode.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            batch.path_restrictions.len(),
            batch.episodes.len()
        );

        let pipeline = Arc::clone(&self.pipeline);
        let cancel = token.clone();
        let outcome = tokio::spawn(async move {
            pipeline.analyze(batch, Progress::discard(), cancel).await
        })
        .await;

        match outcome {
            Ok(Ok(())) if token.is_cancelled() => log_info!("Automatic run {run_id} cancelled"),
            Ok(Ok(())) => log_info!("Automatic run {run_id} finished"),
            Ok(Err(err)) => log_error!("Automatic run {run_id} failed: {err:?}"),
            Err(join_err) => log_error!("Automatic run {run_id} aborted: {join_err}"),
        }

        let mut state = self.state.lock().await;
        self.queue.complete_run();
        let run_again = state.finish_run();
        let _ = done_tx.send(true);
        drop(permit);

        if run_again {
            if self.queue.episode_count() > 0 {
                log_info!("Analysis ended, but new episodes arrived meanwhile; analyzing again");
                self.arm_locked(&mut state).await;
            } else {
                log_debug!("Late arrivals were already folded into run {run_id}");
            }
        }
    }
}
