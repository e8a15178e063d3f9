pub mod auto_trigger;
pub mod entrypoint;
pub mod gate;
pub mod state;

pub use auto_trigger::{AutoTrigger, CancelOutcome, EventOutcome, TriggerSnapshot};
pub use entrypoint::Entrypoint;
pub use gate::{GatePermit, RunGate, ScheduledIntent};
pub use state::{RunState, TriggerPhase};
