//! Single-permit gate serializing whole analysis runs across both axes.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::analysis::RunAxis;

#[derive(Debug, Clone)]
pub struct RunGate {
    permits: Arc<Semaphore>,
    scheduled_intents: Arc<AtomicUsize>,
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            scheduled_intents: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Nobody is running right now.
    pub fn is_available(&self) -> bool {
        self.permits.available_permits() > 0
    }

    /// Free and no scheduled run is waiting for it.
    pub fn is_open_for_automatic(&self) -> bool {
        self.is_available() && self.pending_scheduled() == 0
    }

    pub fn pending_scheduled(&self) -> usize {
        self.scheduled_intents.load(Ordering::SeqCst)
    }

    /// Register that a scheduled run wants the gate. While any intent is
    /// alive the automatic axis will not start a new run.
    pub fn announce_scheduled(&self) -> ScheduledIntent {
        self.scheduled_intents.fetch_add(1, Ordering::SeqCst);
        ScheduledIntent {
            intents: Arc::clone(&self.scheduled_intents),
        }
    }

    /// Non-blocking acquisition for the automatic axis; yields to any
    /// announced scheduled run.
    pub fn try_acquire_automatic(&self) -> Option<GatePermit> {
        if self.pending_scheduled() > 0 {
            return None;
        }

        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| GatePermit {
                _permit: permit,
                axis: RunAxis::Automatic,
            })
    }

    /// Wait for the gate on behalf of a scheduled run. `Ok(None)` means the
    /// caller cancelled while waiting.
    pub async fn acquire_scheduled(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<GatePermit>> {
        let permits = Arc::clone(&self.permits);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            permit = permits.acquire_owned() => {
                let permit = permit.map_err(|err| anyhow!("run gate closed: {err}"))?;
                Ok(Some(GatePermit {
                    _permit: permit,
                    axis: RunAxis::Scheduled,
                }))
            }
        }
    }
}

/// Held for the whole duration of a run; dropping it releases the gate.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    axis: RunAxis,
}

impl GatePermit {
    pub fn axis(&self) -> RunAxis {
        self.axis
    }
}

#[derive(Debug)]
pub struct ScheduledIntent {
    intents: Arc<AtomicUsize>,
}

impl Drop for ScheduledIntent {
    fn drop(&mut self) {
        self.intents.fetch_sub(1, Ordering::SeqCst);
    }
}
