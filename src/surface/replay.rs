//! Dry-run surface that replays a recorded feed snapshot.
//!
//! Items come from a JSON array on disk. A fixed-size window of them is
//! "visible" at a time and `advance` slides the window forward. Nothing is
//! ever posted: submissions and engagement are logged and kept in memory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{ActionKind, FeedSurface, Item, MonitorTarget, Submission};
use crate::error::{self, ConfigError, SurfaceError};

/// Entries visible at once.
const DEFAULT_WINDOW: usize = 5;

/// A submission the replay surface accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub item_id: String,
    pub kind: ActionKind,
    pub text: String,
    pub typing_time: Duration,
}

#[derive(Debug, Default)]
struct ReplayState {
    cursor: usize,
    submissions: Vec<RecordedSubmission>,
    favorites: Vec<String>,
    boosts: Vec<String>,
    target: Option<MonitorTarget>,
}

pub struct ReplaySurface {
    items: Vec<Item>,
    window: usize,
    state: Mutex<ReplayState>,
}

impl ReplaySurface {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            window: DEFAULT_WINDOW,
            state: Mutex::new(ReplayState::default()),
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Load a snapshot from a JSON array of items.
    pub async fn from_file(path: &Path) -> error::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::from)?;
        let items: Vec<Item> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
                key: "FEED_REPLAY_FILE".to_string(),
                message: format!("{}: {e}", path.display()),
            })?;
        info!(path = %path.display(), count = items.len(), "Loaded replay feed");
        Ok(Self::new(items))
    }

    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().await.submissions.clone()
    }

    pub async fn favorites(&self) -> Vec<String> {
        self.state.lock().await.favorites.clone()
    }

    pub async fn boosts(&self) -> Vec<String> {
        self.state.lock().await.boosts.clone()
    }

    pub async fn current_target(&self) -> Option<MonitorTarget> {
        self.state.lock().await.target.clone()
    }
}

#[async_trait]
impl FeedSurface for ReplaySurface {
    fn name(&self) -> &str {
        "replay"
    }

    async fn visible_items(&self) -> Result<Vec<Item>, SurfaceError> {
        let state = self.state.lock().await;
        let start = state.cursor.min(self.items.len());
        let end = (start + self.window).min(self.items.len());
        Ok(self.items[start..end].to_vec())
    }

    async fn submit(&self, submission: &Submission) -> Result<(), SurfaceError> {
        let typing_time: Duration = submission.keystroke_plan.iter().sum();
        info!(
            item = %submission.item_id,
            kind = submission.kind.label(),
            typing_ms = typing_time.as_millis() as u64,
            text = %submission.text,
            "[dry-run] submission"
        );
        self.state.lock().await.submissions.push(RecordedSubmission {
            item_id: submission.item_id.clone(),
            kind: submission.kind,
            text: submission.text.clone(),
            typing_time,
        });
        Ok(())
    }

    async fn favorite(&self, item_id: &str) -> Result<(), SurfaceError> {
        info!(item = %item_id, "[dry-run] favorite");
        self.state.lock().await.favorites.push(item_id.to_string());
        Ok(())
    }

    async fn boost(&self, item_id: &str) -> Result<(), SurfaceError> {
        info!(item = %item_id, "[dry-run] boost");
        self.state.lock().await.boosts.push(item_id.to_string());
        Ok(())
    }

    async fn advance(&self, steps: u32) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().await;
        state.cursor = (state.cursor + steps as usize).min(self.items.len());
        Ok(())
    }

    async fn navigate(&self, target: &MonitorTarget) -> Result<(), SurfaceError> {
        info!(target = %target.describe(), "[dry-run] navigate");
        let mut state = self.state.lock().await;
        state.cursor = 0;
        state.target = Some(target.clone());
        Ok(())
    }

    async fn dismiss_composer(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}
