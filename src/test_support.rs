//! Fakes and fixtures shared by the orchestration tests.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    analysis::{AnalysisBatch, AnalyzerPipeline, Progress},
    library::{ItemKind, LibraryItem, LocationType},
};

/// Pipeline that records every batch and can be told to block, fail or
/// panic. Shared between both axes, it also counts overlapping runs.
#[derive(Default)]
pub struct ScriptedPipeline {
    batches: Mutex<Vec<AnalysisBatch>>,
    events: Mutex<Vec<String>>,
    executing: AtomicUsize,
    max_executing: AtomicUsize,
    hold: Option<Arc<Semaphore>>,
    honor_cancel: bool,
    fail: AtomicBool,
    panic: AtomicBool,
}

impl ScriptedPipeline {
    /// Returns as soon as it is called.
    pub fn instant() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blocks each run until a permit is added to the returned semaphore,
    /// or until cancelled when `honor_cancel` is set.
    pub fn blocking(honor_cancel: bool) -> (Arc<Self>, Arc<Semaphore>) {
        let hold = Arc::new(Semaphore::new(0));
        let pipeline = Self {
            hold: Some(Arc::clone(&hold)),
            honor_cancel,
            ..Self::default()
        };
        (Arc::new(pipeline), hold)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_panic(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    pub fn runs(&self) -> Vec<AnalysisBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// "start <axis>" / "end <axis>" in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn executing(&self) -> usize {
        self.executing.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_executing.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl AnalyzerPipeline for ScriptedPipeline {
    async fn analyze(
        &self,
        batch: AnalysisBatch,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()> {
        let now = self.executing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_executing.fetch_max(now, Ordering::SeqCst);

        let axis = batch.axis.as_str();
        self.record(format!("start {axis}"));
        self.batches.lock().unwrap().push(batch);

        if let Some(hold) = &self.hold {
            if self.honor_cancel {
                tokio::select! {
                    permit = hold.acquire() => {
                        if let Ok(permit) = permit {
                            permit.forget();
                        }
                    }
                    _ = cancel.cancelled() => {}
                }
            } else if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }

        progress.report(0.5);
        self.executing.fetch_sub(1, Ordering::SeqCst);
        self.record(format!("end {axis}"));

        if self.panic.load(Ordering::SeqCst) {
            panic!("scripted pipeline panic");
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("scripted pipeline failure");
        }
        Ok(())
    }
}

/// A physical episode file named `name` inside `folder`.
pub fn episode_item(folder: &str, name: &str) -> LibraryItem {
    LibraryItem {
        id: Uuid::new_v4(),
        kind: ItemKind::Episode,
        location: LocationType::FileSystem,
        path: PathBuf::from(folder).join(format!("{name}.mkv")),
        season_id: None,
        series_name: Some("Show".into()),
        season_number: Some(1),
        name: name.into(),
    }
}
