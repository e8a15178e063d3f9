use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Debounce machine phase of the automatic axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TriggerPhase {
    #[default]
    Idle,
    /// Debounce timer pending.
    Armed,
    Running,
}

/// Externally visible state of the automatic axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Running,
    /// Running with cancellation requested on the active token.
    Cancelling,
}

impl RunState {
    pub fn is_active(&self) -> bool {
        !matches!(self, RunState::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
            RunState::Cancelling => "Cancelling",
        }
    }
}

/// The run currently in flight: its token and its own completion channel.
#[derive(Debug, Clone)]
pub struct ActiveRun {
    pub run_id: Uuid,
    pub token: CancellationToken,
    pub done: watch::Receiver<bool>,
}

#[derive(Debug, Default)]
pub struct TriggerState {
    phase: TriggerPhase,
    run_again: bool,
    /// Bumped on every arm so a superseded timer can recognise itself.
    generation: u64,
    active: Option<ActiveRun>,
    /// Set once by shutdown; nothing arms or follows up afterwards.
    stopped: bool,
}

impl TriggerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TriggerPhase {
        self.phase
    }

    pub fn run_state(&self) -> RunState {
        match &self.active {
            None => RunState::Idle,
            Some(run) if run.token.is_cancelled() => RunState::Cancelling,
            Some(_) => RunState::Running,
        }
    }

    pub fn active(&self) -> Option<&ActiveRun> {
        self.active.as_ref()
    }

    pub fn run_again_pending(&self) -> bool {
        self.run_again
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Terminal: disarm, drop any pending follow-up and refuse later arming.
    /// An in-flight run keeps its `Running` phase until it finishes.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.run_again = false;
        self.disarm();
    }

    /// Idle/Armed -> Armed. Returns the generation the new timer must carry.
    pub fn arm(&mut self) -> u64 {
        debug_assert!(self.phase != TriggerPhase::Running);
        debug_assert!(!self.stopped, "arming a stopped trigger");
        self.phase = TriggerPhase::Armed;
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Armed -> Idle without running.
    pub fn disarm(&mut self) {
        if self.phase == TriggerPhase::Armed {
            self.phase = TriggerPhase::Idle;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Whether a timer of `generation` is still the one that should fire.
    pub fn is_current_timer(&self, generation: u64) -> bool {
        self.phase == TriggerPhase::Armed && self.generation == generation
    }

    /// Armed -> Running with a freshly allocated token.
    pub fn begin_run(&mut self, run: ActiveRun) {
        debug_assert!(self.active.is_none(), "two live automatic runs");
        self.phase = TriggerPhase::Running;
        self.run_again = false;
        self.active = Some(run);
    }

    /// Note an event observed while running; decided at completion.
    pub fn request_follow_up(&mut self) {
        if self.phase == TriggerPhase::Running && !self.stopped {
            self.run_again = true;
        }
    }

    /// Running -> Idle. Returns whether a follow-up run should be armed.
    pub fn finish_run(&mut self) -> bool {
        self.phase = TriggerPhase::Idle;
        self.active = None;
        std::mem::take(&mut self.run_again) && !self.stopped
    }
}
