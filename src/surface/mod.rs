//! Boundary to the external automation surface.
//!
//! The surface is pure I/O: it reports what is on screen and performs
//! submissions. Deciding what to do with an item lives in the orchestrator.

pub mod replay;

pub use replay::ReplaySurface;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;

/// How long a submission may take to be confirmed.
pub const CONFIRM_WITHIN: Duration = Duration::from_secs(10);

/// Snapshot of one feed entry as read from the surface.
///
/// `id` and `text` are optional because the surface may fail to read
/// them (stale or partially rendered entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub is_own: bool,
    #[serde(default)]
    pub is_reply: bool,
}

impl Item {
    /// A fully-read entry from another author.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: Some(text.into()),
            is_own: false,
            is_reply: false,
        }
    }

    /// Whether the monitor should consider this entry at all.
    pub fn is_candidate(&self) -> bool {
        !self.is_own && !self.is_reply
    }
}

/// The two interactive actions performed on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Post a reply under the item.
    Respond,
    /// Re-share the item with a comment.
    Requote,
}

impl ActionKind {
    pub const ALL: [ActionKind; 2] = [ActionKind::Respond, ActionKind::Requote];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Respond => "respond",
            Self::Requote => "requote",
        }
    }
}

/// What the monitor watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTarget {
    Home,
    Community { url: String },
    Keyword { keyword: String },
}

impl MonitorTarget {
    /// Eligibility filter implied by the target.
    pub fn filter_keyword(&self) -> Option<&str> {
        match self {
            Self::Keyword { keyword } => Some(keyword),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Home => "home feed".to_string(),
            Self::Community { url } => format!("community ({url})"),
            Self::Keyword { keyword } => format!("search results for '{keyword}'"),
        }
    }
}

/// One interactive submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub item_id: String,
    pub kind: ActionKind,
    pub text: String,
    /// Per-character delays the driver should pace input with.
    pub keystroke_plan: Vec<Duration>,
    /// Bound on waiting for the input affordance to close.
    pub confirm_within: Duration,
}

/// Automation surface operations. All calls block the engine's single
/// thread of control for their duration.
#[async_trait]
pub trait FeedSurface: Send + Sync {
    /// Surface name for logs.
    fn name(&self) -> &str;

    /// Entries currently visible, in on-screen order.
    async fn visible_items(&self) -> Result<Vec<Item>, SurfaceError>;

    /// Perform a submission and confirm it within `confirm_within`.
    /// A missing confirmation is reported as `SurfaceError::ConfirmTimeout`.
    async fn submit(&self, submission: &Submission) -> Result<(), SurfaceError>;

    async fn favorite(&self, item_id: &str) -> Result<(), SurfaceError>;

    async fn boost(&self, item_id: &str) -> Result<(), SurfaceError>;

    /// Scroll-equivalent feed advancement by `steps`.
    async fn advance(&self, steps: u32) -> Result<(), SurfaceError>;

    async fn navigate(&self, target: &MonitorTarget) -> Result<(), SurfaceError>;

    /// Close any half-open composer after a failed submission.
    async fn dismiss_composer(&self) -> Result<(), SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_excludes_own_and_replies() {
        let mut item = Item::new("1", "hello");
        assert!(item.is_candidate());
        item.is_reply = true;
        assert!(!item.is_candidate());
        item.is_reply = false;
        item.is_own = true;
        assert!(!item.is_candidate());
    }

    #[test]
    fn only_keyword_target_filters() {
        assert_eq!(MonitorTarget::Home.filter_keyword(), None);
        assert_eq!(
            MonitorTarget::Community { url: "u".into() }.filter_keyword(),
            None
        );
        assert_eq!(
            MonitorTarget::Keyword { keyword: "rust".into() }.filter_keyword(),
            Some("rust")
        );
    }

    #[test]
    fn item_deserialises_with_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": "x", "text": "hi"}"#).unwrap();
        assert_eq!(item, Item::new("x", "hi"));

        let raw = r#"{"id": null, "text": null, "is_reply": true}"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert!(item.id.is_none());
        assert!(item.is_reply);
    }
}
