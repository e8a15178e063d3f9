//! Deduplicated backlog of work for one run axis.
//!
//! Two kinds of entries accumulate here between runs: episodes queued
//! directly (arrivals while a run is active, or manual requests) and the
//! folders touched since the last run, which narrow the next pass. A run
//! takes a snapshot at start and calls [`PendingQueue::complete_run`] on
//! every exit path.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use uuid::Uuid;

use crate::analysis::{AnalysisBatch, AnalysisMode, QueuedEpisode, RunAxis};

#[derive(Debug, Default)]
struct QueueState {
    episodes: Vec<QueuedEpisode>,
    seen: HashSet<Uuid>,
    path_restrictions: BTreeSet<PathBuf>,
}

#[derive(Debug)]
pub struct PendingQueue {
    axis: RunAxis,
    state: Mutex<QueueState>,
}

impl PendingQueue {
    pub fn new(axis: RunAxis) -> Self {
        Self {
            axis,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn axis(&self) -> RunAxis {
        self.axis
    }

    /// Returns `false` when the episode was already waiting.
    pub fn queue_episode(&self, episode: QueuedEpisode) -> bool {
        let mut state = self.lock();
        if !state.seen.insert(episode.episode_id) {
            return false;
        }
        state.episodes.push(episode);
        true
    }

    /// Returns `false` when the folder was already recorded.
    pub fn restrict_path(&self, folder: &Path) -> bool {
        self.lock().path_restrictions.insert(folder.to_path_buf())
    }

    pub fn path_restrictions(&self) -> Vec<PathBuf> {
        self.lock().path_restrictions.iter().cloned().collect()
    }

    pub fn clear_path_restrictions(&self) {
        self.lock().path_restrictions.clear();
    }

    pub fn episode_count(&self) -> usize {
        self.lock().episodes.len()
    }

    pub fn contains_episode(&self, episode_id: Uuid) -> bool {
        self.lock().seen.contains(&episode_id)
    }

    pub fn is_empty(&self) -> bool {
        let state = self.lock();
        state.episodes.is_empty() && state.path_restrictions.is_empty()
    }

    /// Snapshot for a new run: queued episodes are moved into the batch,
    /// folders are copied and stay recorded until the run completes.
    pub fn begin_run(&self, modes: Vec<AnalysisMode>) -> AnalysisBatch {
        let mut state = self.lock();
        state.seen.clear();
        AnalysisBatch {
            run_id: Uuid::new_v4(),
            axis: self.axis,
            modes,
            episodes: std::mem::take(&mut state.episodes),
            path_restrictions: state.path_restrictions.iter().cloned().collect(),
        }
    }

    /// Pull episodes that arrived after the run started. Pipelines may call
    /// this between seasons to fold late arrivals into the current pass.
    pub fn take_late_arrivals(&self) -> Vec<QueuedEpisode> {
        let mut state = self.lock();
        state.seen.clear();
        std::mem::take(&mut state.episodes)
    }

    /// End of a run, whatever its outcome. Folders are always dropped;
    /// episodes queued after [`begin_run`](Self::begin_run) are kept for the
    /// follow-up run.
    pub fn complete_run(&self) {
        self.clear_path_restrictions();
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.episodes.clear();
        state.seen.clear();
        state.path_restrictions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
