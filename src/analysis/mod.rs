//! Contract between the orchestrator and the analyzer pipeline.
//!
//! Decoding, fingerprinting and matching all live behind
//! [`AnalyzerPipeline`]; this layer only decides *when* it runs and *what*
//! it is handed.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::library::LibraryItem;

/// Kind of recurring segment. Doubles as the persisted segment type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnalysisMode {
    Introduction,
    Credits,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 2] = [AnalysisMode::Introduction, AnalysisMode::Credits];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Introduction => "Introduction",
            AnalysisMode::Credits => "Credits",
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            AnalysisMode::Introduction => 0,
            AnalysisMode::Credits => 1,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(AnalysisMode::Introduction),
            1 => Ok(AnalysisMode::Credits),
            other => Err(anyhow!("unknown segment type {other}")),
        }
    }
}

/// Which producer of work a run belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunAxis {
    Automatic,
    Scheduled,
}

impl RunAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunAxis::Automatic => "automatic",
            RunAxis::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEpisode {
    pub episode_id: Uuid,
    pub season_id: Option<Uuid>,
    pub series_name: Option<String>,
    pub season_number: Option<i32>,
    pub name: String,
    pub path: PathBuf,
}

impl QueuedEpisode {
    /// `None` unless the item is a non-virtual episode.
    pub fn from_item(item: &LibraryItem) -> Option<Self> {
        if !item.is_analyzable_episode() {
            return None;
        }

        Some(Self {
            episode_id: item.id,
            season_id: item.season_id,
            series_name: item.series_name.clone(),
            season_number: item.season_number,
            name: item.name.clone(),
            path: item.path.clone(),
        })
    }
}

/// What a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchScope {
    /// Nothing was queued; analyze every episode in the library.
    Library,
    /// Only the queued episodes and the episodes under the queued folders.
    Restricted,
}

#[derive(Debug, Clone)]
pub struct AnalysisBatch {
    pub run_id: Uuid,
    pub axis: RunAxis,
    pub modes: Vec<AnalysisMode>,
    pub episodes: Vec<QueuedEpisode>,
    pub path_restrictions: Vec<PathBuf>,
}

impl AnalysisBatch {
    pub fn scope(&self) -> BatchScope {
        if self.episodes.is_empty() && self.path_restrictions.is_empty() {
            BatchScope::Library
        } else {
            BatchScope::Restricted
        }
    }

    /// Queued episodes grouped by season, each group in queue order.
    /// Episodes without a season share the `None` group.
    pub fn seasons(&self) -> BTreeMap<Option<Uuid>, Vec<&QueuedEpisode>> {
        let mut grouped: BTreeMap<Option<Uuid>, Vec<&QueuedEpisode>> = BTreeMap::new();
        for episode in &self.episodes {
            grouped.entry(episode.season_id).or_default().push(episode);
        }
        grouped
    }
}

/// Fractional progress reporter clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct Progress {
    tx: Option<Arc<watch::Sender<f64>>>,
}

impl Progress {
    pub fn channel() -> (Self, watch::Receiver<f64>) {
        let (tx, rx) = watch::channel(0.0);
        (Self { tx: Some(Arc::new(tx)) }, rx)
    }

    /// Reporter whose updates go nowhere; automatic runs have no observer.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        if let Some(tx) = &self.tx {
            tx.send_replace(fraction.clamp(0.0, 1.0));
        }
    }
}

/// Decodes, fingerprints and matches a batch of episodes, persisting
/// segments and raising warning flags as side effects.
///
/// Implementations are expected to check `cancel` between items; the
/// orchestrator cannot stop work that ignores it.
#[async_trait]
pub trait AnalyzerPipeline: Send + Sync {
    async fn analyze(
        &self,
        batch: AnalysisBatch,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ItemKind, LocationType};

    fn queued(season: Option<Uuid>, name: &str) -> QueuedEpisode {
        QueuedEpisode {
            episode_id: Uuid::new_v4(),
            season_id: season,
            series_name: None,
            season_number: None,
            name: name.into(),
            path: PathBuf::from(format!("/tv/{name}.mkv")),
        }
    }

    fn batch(episodes: Vec<QueuedEpisode>, paths: Vec<PathBuf>) -> AnalysisBatch {
        AnalysisBatch {
            run_id: Uuid::new_v4(),
            axis: RunAxis::Automatic,
            modes: AnalysisMode::ALL.to_vec(),
            episodes,
            path_restrictions: paths,
        }
    }

    #[test]
    fn mode_codes_are_stable() {
        for mode in AnalysisMode::ALL {
            assert_eq!(AnalysisMode::from_i64(mode.as_i64()).unwrap(), mode);
        }
        assert!(AnalysisMode::from_i64(7).is_err());
    }

    #[test]
    fn virtual_items_never_become_queued_episodes() {
        let item = LibraryItem {
            id: Uuid::new_v4(),
            kind: ItemKind::Episode,
            location: LocationType::Virtual,
            path: PathBuf::from("/tv/missing.mkv"),
            season_id: None,
            series_name: None,
            season_number: None,
            name: "missing".into(),
        };
        assert!(QueuedEpisode::from_item(&item).is_none());
    }

    #[test]
    fn empty_batch_covers_whole_library() {
        assert_eq!(batch(vec![], vec![]).scope(), BatchScope::Library);
        assert_eq!(
            batch(vec![], vec![PathBuf::from("/tv/Show")]).scope(),
            BatchScope::Restricted
        );
    }

    #[test]
    fn seasons_keep_queue_order() {
        let season = Uuid::new_v4();
        let b = batch(
            vec![
                queued(Some(season), "e02"),
                queued(None, "special"),
                queued(Some(season), "e01"),
            ],
            vec![],
        );

        let grouped = b.seasons();
        let names: Vec<_> = grouped[&Some(season)].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["e02", "e01"]);
        assert_eq!(grouped[&None].len(), 1);
    }

    #[test]
    fn progress_is_clamped() {
        let (progress, rx) = Progress::channel();
        progress.report(1.7);
        assert_eq!(*rx.borrow(), 1.0);
        progress.report(-0.2);
        assert_eq!(*rx.borrow(), 0.0);
        progress.report(f64::NAN);
        assert_eq!(*rx.borrow(), 0.0);

        Progress::discard().report(0.5);
    }
}
