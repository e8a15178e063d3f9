use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::library::{LibraryEvent, LibraryEventSource};

use super::auto_trigger::AutoTrigger;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Owns the library subscription for the lifetime of the plugin.
pub struct Entrypoint {
    trigger: AutoTrigger,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Entrypoint {
    pub fn new(trigger: AutoTrigger) -> Self {
        Self {
            trigger,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn trigger(&self) -> &AutoTrigger {
        &self.trigger
    }

    pub fn is_listening(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Subscribe to `source` and start dispatching its events.
    pub fn start(&mut self, source: &dyn LibraryEventSource) -> Result<()> {
        if self.handle.is_some() {
            bail!("library listener already running");
        }

        let cancel_token = CancellationToken::new();
        let receiver = source.subscribe();
        let handle = tokio::spawn(listen(
            self.trigger.clone(),
            receiver,
            cancel_token.clone(),
        ));

        log_info!("Subscribed to library change notifications");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Unsubscribe, then stand the automatic axis down.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("library listener task failed to join")?;
        }

        self.trigger.shutdown().await;
        log_info!("Library listener stopped");
        Ok(())
    }
}

async fn listen(
    trigger: AutoTrigger,
    mut receiver: broadcast::Receiver<LibraryEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = receiver.recv() => event,
        };

        match event {
            Ok(event) => {
                let outcome = trigger.handle_event(&event).await;
                log_debug!("Library event handled: {outcome:?}");
            }
            Err(RecvError::Lagged(skipped)) => {
                log_warn!("Library listener lagged; {skipped} notification(s) dropped");
            }
            Err(RecvError::Closed) => {
                log_info!("Library notification source closed");
                break;
            }
        }
    }
}
