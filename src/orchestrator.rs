//! Per-item action state machine.
//!
//! Fetched → Eligible/Ineligible → Composed → PrimaryDone →
//! SecondaryAttempted → Recorded.
//!
//! The two actions run in a random order chosen per item. The first one
//! decides whether the item counts as done: if it fails, the second is
//! never attempted. The second one's outcome does not change that.

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::composer::ResponseComposer;
use crate::error::SurfaceError;
use crate::stop::StopSignal;
use crate::surface::{ActionKind, CONFIRM_WITHIN, FeedSurface, Item, Submission};
use crate::timing::TimingModel;

/// Result of one interactive action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    /// Failed before anything was submitted.
    PrepFailed,
    /// Submitted but never confirmed.
    PostFailed,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Furthest state an item reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ItemStage {
    Fetched,
    Ineligible,
    Eligible,
    Composed,
    PrimaryDone,
    SecondaryAttempted,
    Recorded,
}

/// Probabilities for best-effort engagement after a successful respond.
#[derive(Debug, Clone, Copy)]
pub struct EngagementOdds {
    pub favorite: f64,
    pub boost: f64,
}

impl Default for EngagementOdds {
    fn default() -> Self {
        Self {
            favorite: 0.8,
            boost: 0.5,
        }
    }
}

/// Engagement actions that went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub favorited: bool,
    pub boosted: bool,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_id: Option<String>,
    pub stage: ItemStage,
    /// Action order, once chosen.
    pub order: Option<[ActionKind; 2]>,
    pub primary: ActionOutcome,
    pub secondary: Option<ActionOutcome>,
    pub engagement: Engagement,
}

impl ItemReport {
    fn prep_failed(item_id: Option<String>, stage: ItemStage) -> Self {
        Self {
            item_id,
            stage,
            order: None,
            primary: ActionOutcome::PrepFailed,
            secondary: None,
            engagement: Engagement::default(),
        }
    }

    /// Whether the item id belongs in the processed set.
    ///
    /// Items that could not even be read are left out so a later cycle
    /// can pick them up again.
    pub fn should_record(&self) -> bool {
        self.item_id.is_some() && self.stage != ItemStage::Fetched
    }

    /// Whether the primary action succeeded.
    pub fn completed(&self) -> bool {
        self.primary.is_success()
    }
}

/// Outcome of a single action plus how far it got.
struct ActionResult {
    outcome: ActionOutcome,
    composed: bool,
    engagement: Engagement,
}

/// Drives one item through its actions.
pub struct ActionOrchestrator {
    composer: ResponseComposer,
    timing: TimingModel,
    rng: StdRng,
    filter_keyword: Option<String>,
    odds: EngagementOdds,
    confirm_within: Duration,
    stop: StopSignal,
}

impl ActionOrchestrator {
    pub fn new(
        composer: ResponseComposer,
        timing: TimingModel,
        rng: StdRng,
        stop: StopSignal,
    ) -> Self {
        Self {
            composer,
            timing,
            rng,
            filter_keyword: None,
            odds: EngagementOdds::default(),
            confirm_within: CONFIRM_WITHIN,
            stop,
        }
    }

    /// Only act on items whose text contains `keyword` (case-insensitive).
    pub fn with_filter_keyword(mut self, keyword: Option<String>) -> Self {
        self.filter_keyword = keyword.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_engagement_odds(mut self, odds: EngagementOdds) -> Self {
        self.odds = odds;
        self
    }

    pub fn timing_mut(&mut self) -> &mut TimingModel {
        &mut self.timing
    }

    pub fn composer(&self) -> &ResponseComposer {
        &self.composer
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    fn is_eligible(&self, text: &str) -> bool {
        match &self.filter_keyword {
            Some(keyword) => text.to_lowercase().contains(&keyword.to_lowercase()),
            None => true,
        }
    }

    /// Run the full state machine for `item`.
    pub async fn process(&mut self, surface: &dyn FeedSurface, item: &Item) -> ItemReport {
        let (id, text) = match (&item.id, &item.text) {
            (Some(id), Some(text)) => (id.clone(), text.clone()),
            _ => {
                debug!(id = ?item.id, "Item could not be read; leaving for a later cycle");
                return ItemReport::prep_failed(item.id.clone(), ItemStage::Fetched);
            }
        };

        if !self.is_eligible(&text) {
            debug!(id = %id, "Item does not contain the filter keyword");
            return ItemReport::prep_failed(Some(id), ItemStage::Ineligible);
        }

        let mut order = ActionKind::ALL;
        order.shuffle(&mut self.rng);
        let [first, second] = order;
        info!(id = %id, first = first.label(), second = second.label(), "Processing item");

        let primary = self.perform(surface, &id, &text, first).await;
        let mut report = ItemReport {
            item_id: Some(id.clone()),
            stage: if primary.composed {
                ItemStage::Composed
            } else {
                ItemStage::Eligible
            },
            order: Some(order),
            primary: primary.outcome,
            secondary: None,
            engagement: primary.engagement,
        };

        if !primary.outcome.is_success() {
            warn!(
                id = %id,
                action = first.label(),
                outcome = ?primary.outcome,
                "Primary action failed; skipping item"
            );
            return report;
        }
        report.stage = ItemStage::PrimaryDone;

        let pause = self.timing.action_pause();
        debug!(pause_ms = pause.as_millis() as u64, "Pausing before secondary action");
        tokio::time::sleep(pause).await;

        let secondary = self.perform(surface, &id, &text, second).await;
        if !secondary.outcome.is_success() {
            debug!(
                id = %id,
                action = second.label(),
                outcome = ?secondary.outcome,
                "Secondary action failed; item still counts as done"
            );
        }
        report.secondary = Some(secondary.outcome);
        report.engagement.favorited |= secondary.engagement.favorited;
        report.engagement.boosted |= secondary.engagement.boosted;
        report.stage = ItemStage::SecondaryAttempted;

        info!(id = %id, "Item cycle complete");
        report
    }

    /// Compose and submit one action.
    async fn perform(
        &mut self,
        surface: &dyn FeedSurface,
        id: &str,
        text: &str,
        kind: ActionKind,
    ) -> ActionResult {
        if kind == ActionKind::Respond {
            let reading = self.timing.reading(text);
            tokio::time::sleep(reading).await;
        }

        let Some(response) = self.composer.compose(text, kind).await else {
            return ActionResult {
                outcome: ActionOutcome::PrepFailed,
                composed: false,
                engagement: Engagement::default(),
            };
        };

        let submission = Submission {
            item_id: id.to_string(),
            kind,
            keystroke_plan: self.timing.keystroke_plan(&response.text),
            text: response.text,
            confirm_within: self.confirm_within,
        };

        let outcome = match surface.submit(&submission).await {
            Ok(()) => {
                info!(id = %id, action = kind.label(), "Submission confirmed");
                ActionOutcome::Success
            }
            Err(e) => {
                let outcome = match e {
                    SurfaceError::ConfirmTimeout { .. } => ActionOutcome::PostFailed,
                    _ => ActionOutcome::PrepFailed,
                };
                warn!(id = %id, action = kind.label(), error = %e, "Submission failed");
                if let Err(e) = surface.dismiss_composer().await {
                    debug!(error = %e, "Could not dismiss composer");
                }
                outcome
            }
        };

        let engagement = if outcome.is_success() && kind == ActionKind::Respond {
            self.engage(surface, id).await
        } else {
            Engagement::default()
        };

        ActionResult {
            outcome,
            composed: true,
            engagement,
        }
    }

    /// Best-effort favorite/boost. Failures are swallowed.
    async fn engage(&mut self, surface: &dyn FeedSurface, id: &str) -> Engagement {
        let mut engagement = Engagement::default();
        if self.rng.gen_bool(self.odds.favorite.clamp(0.0, 1.0)) {
            match surface.favorite(id).await {
                Ok(()) => engagement.favorited = true,
                Err(e) => debug!(id = %id, error = %e, "Favorite failed"),
            }
        }
        if self.rng.gen_bool(self.odds.boost.clamp(0.0, 1.0)) {
            match surface.boost(id).await {
                Ok(()) => engagement.boosted = true,
                Err(e) => debug!(id = %id, error = %e, "Boost failed"),
            }
        }
        engagement
    }
}
