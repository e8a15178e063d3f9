//! Shapes of the media library collaborator: items, change events and the
//! subscription seam the orchestrator listens on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Key of the host task whose completion prompts an automatic pass.
pub const REFRESH_LIBRARY_TASK_KEY: &str = "RefreshLibrary";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemKind {
    Episode,
    Season,
    Series,
    Movie,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationType {
    FileSystem,
    Remote,
    /// Placeholder for media the library knows about but has no file for.
    Virtual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub location: LocationType,
    pub path: PathBuf,
    pub season_id: Option<Uuid>,
    pub series_name: Option<String>,
    pub season_number: Option<i32>,
    pub name: String,
}

impl LibraryItem {
    pub fn is_virtual(&self) -> bool {
        self.location == LocationType::Virtual
    }

    /// Non-virtual episodes are the only items analysis cares about.
    pub fn is_analyzable_episode(&self) -> bool {
        self.kind == ItemKind::Episode && !self.is_virtual()
    }

    pub fn containing_folder(&self) -> &Path {
        self.path.parent().unwrap_or(self.path.as_path())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskCompletionStatus {
    Completed,
    Failed,
    Cancelled,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub key: String,
    pub status: TaskCompletionStatus,
}

impl TaskCompletion {
    pub fn is_library_refresh(&self) -> bool {
        self.key == REFRESH_LIBRARY_TASK_KEY && self.status == TaskCompletionStatus::Completed
    }
}

#[derive(Debug, Clone)]
pub enum LibraryEvent {
    ItemAdded(LibraryItem),
    ItemUpdated(LibraryItem),
    TaskCompleted(TaskCompletion),
}

/// Host side of library change notifications.
///
/// Each call hands out an independent receiver; dropping it unsubscribes.
pub trait LibraryEventSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<LibraryEvent>;
}

impl LibraryEventSource for broadcast::Sender<LibraryEvent> {
    fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        broadcast::Sender::subscribe(self)
    }
}
