//! The feed monitor loop.
//!
//! One pass per cycle over the visible items: skip what was already
//! handled, hand the rest to the orchestrator, persist the processed set,
//! then advance the feed and wait. Cycle-level failures are logged and
//! followed by a recovery advancement; the loop only exits when the stop
//! signal is raised (or a configured cycle limit is reached).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::dedup::{DEFAULT_RETENTION, DedupStore, ProcessedSet};
use crate::error::MonitorError;
use crate::orchestrator::{ActionOrchestrator, ItemStage};
use crate::stop::StopSignal;
use crate::surface::{FeedSurface, MonitorTarget};

/// Base wait between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Advancement after a failed cycle.
pub const RECOVERY_ADVANCE: u32 = 10;

/// Idle advancement grows with consecutive empty cycles, up to this cap.
const IDLE_ADVANCE_BASE: u32 = 5;
const IDLE_ADVANCE_CAP: u32 = 15;

/// Steps to advance after `idle` consecutive cycles without new items.
pub fn idle_advance(idle: u32) -> u32 {
    IDLE_ADVANCE_BASE.saturating_add(idle).min(IDLE_ADVANCE_CAP)
}

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub retention: usize,
    /// Stop after this many cycles. `None` runs until stopped.
    pub max_cycles: Option<u64>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retention: DEFAULT_RETENTION,
            max_cycles: None,
        }
    }
}

/// Totals reported when the loop exits.
#[derive(Debug, Clone)]
pub struct MonitorSummary {
    pub cycles: u64,
    /// Items recorded as processed during this run.
    pub items_processed: u64,
    /// Cycle failures and failed saves.
    pub errors: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of one successful cycle.
#[derive(Debug, Default)]
struct CycleOutcome {
    recorded: usize,
}

pub struct FeedMonitorLoop {
    orchestrator: ActionOrchestrator,
    surface: Arc<dyn FeedSurface>,
    store: Box<dyn DedupStore>,
    target: MonitorTarget,
    settings: MonitorSettings,
    stop: StopSignal,
}

impl FeedMonitorLoop {
    pub fn new(
        orchestrator: ActionOrchestrator,
        surface: Arc<dyn FeedSurface>,
        store: Box<dyn DedupStore>,
        target: MonitorTarget,
        stop: StopSignal,
    ) -> Self {
        Self {
            orchestrator,
            surface,
            store,
            target,
            settings: MonitorSettings::default(),
            stop,
        }
    }

    pub fn with_settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run until the stop signal is raised.
    pub async fn run(mut self) -> MonitorSummary {
        let started_at = Utc::now();
        let mut processed = self.store.load().await;
        let mut summary = MonitorSummary {
            cycles: 0,
            items_processed: 0,
            errors: 0,
            started_at,
            finished_at: started_at,
        };

        info!(
            surface = self.surface.name(),
            target = %self.target.describe(),
            keywords = ?self.orchestrator.composer().keywords(),
            credentials = self.orchestrator.composer().client().pool().len(),
            already_processed = processed.len(),
            "Starting feed monitor"
        );

        if let Err(e) = self.surface.navigate(&self.target).await {
            warn!(error = %e, "Navigation failed; monitoring current view");
        }

        let mut idle: u32 = 0;
        while !self.stop.is_stopped() {
            if self
                .settings
                .max_cycles
                .is_some_and(|max| summary.cycles >= max)
            {
                info!(cycles = summary.cycles, "Cycle limit reached");
                break;
            }
            summary.cycles += 1;

            match self.run_cycle(&mut processed).await {
                Ok(outcome) => {
                    summary.items_processed += outcome.recorded as u64;
                    if outcome.recorded > 0 {
                        idle = 0;
                        if !self.persist(&processed).await {
                            summary.errors += 1;
                        }
                    } else if !self.stop.is_stopped() {
                        idle = idle.saturating_add(1);
                        let steps = idle_advance(idle);
                        debug!(idle, steps, "No new items; advancing feed");
                        if let Err(e) = self.surface.advance(steps).await {
                            let e = MonitorError::Advance(e);
                            warn!(error = %e, "Idle advancement failed");
                            summary.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!(cycle = summary.cycles, error = %e, "Cycle failed; recovering");
                    if let Err(e) = self.surface.advance(RECOVERY_ADVANCE).await {
                        debug!(error = %e, "Recovery advancement failed");
                    }
                }
            }

            let evicted = processed.truncate_to(self.settings.retention);
            if evicted > 0 {
                debug!(evicted, retained = processed.len(), "Trimmed processed ids");
                if !self.persist(&processed).await {
                    summary.errors += 1;
                }
            }

            if self.stop.is_stopped() {
                break;
            }
            let wait = self
                .orchestrator
                .timing_mut()
                .poll_interval(self.settings.poll_interval);
            tokio::time::sleep(wait).await;
        }

        if !self.persist(&processed).await {
            summary.errors += 1;
        }
        summary.finished_at = Utc::now();
        info!(
            cycles = summary.cycles,
            items = summary.items_processed,
            errors = summary.errors,
            "Feed monitor stopped"
        );
        summary
    }

    async fn run_cycle(
        &mut self,
        processed: &mut ProcessedSet,
    ) -> Result<CycleOutcome, MonitorError> {
        let items = self
            .surface
            .visible_items()
            .await
            .map_err(MonitorError::Collect)?;

        let mut outcome = CycleOutcome::default();
        for item in items {
            if self.stop.is_stopped() {
                break;
            }
            if !item.is_candidate() {
                continue;
            }
            let Some(id) = item.id.as_deref() else {
                debug!("Skipping item without a stable id");
                continue;
            };
            if processed.contains(id) {
                continue;
            }

            let mut report = self.orchestrator.process(self.surface.as_ref(), &item).await;
            // Unreadable items stay unrecorded and do not count as new, so
            // an idle feed still advances past them.
            if report.should_record()
                && let Some(id) = report.item_id.clone()
            {
                processed.insert(id);
                report.stage = ItemStage::Recorded;
                outcome.recorded += 1;
            }
            debug!(
                id = ?report.item_id,
                stage = ?report.stage,
                primary = ?report.primary,
                "Item finished"
            );

            if report.completed() && !self.stop.is_stopped() {
                let cooldown = self.orchestrator.timing_mut().item_cooldown();
                debug!(cooldown_secs = cooldown.as_secs_f64(), "Cooling down after item");
                tokio::time::sleep(cooldown).await;
            }
        }
        Ok(outcome)
    }

    /// Save the processed set. Returns `false` on failure.
    async fn persist(&self, processed: &ProcessedSet) -> bool {
        match self.store.save(processed).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to save processed ids");
                false
            }
        }
    }
}
