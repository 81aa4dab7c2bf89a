//! Reconciliation loop — one pass over the batch.
//!
//! Per entity: Fetching -> Comparing -> (Notifying) -> Persisting -> Done.
//! A failure anywhere is recorded on that entity's report and the loop moves
//! on; nothing here aborts the batch.

use chrono::{FixedOffset, Offset, Utc};
use futures::StreamExt;
use railwatch_core::config::WatchConfig;
use railwatch_core::error::{DispatchError, WatchError};
use railwatch_core::traits::{StateStore, StatusFetcher};
use railwatch_core::types::{
    CacheKey, NotificationMessage, PersistedState, StatusSnapshot, TrackedEntity,
};

use crate::detect::ChangeDetector;
use crate::dispatch::{DispatchResult, Dispatcher};
use crate::notify::NotifyRouter;

const CHECKED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where an entity is (or stopped) in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Comparing,
    Notifying,
    Persisting,
    Done,
    Failed,
}

/// What the pass concluded for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    FetchFailed,
    Unchanged,
    /// Change detected and every channel attempt succeeded.
    Notified,
    /// Change detected but routing failed, a channel attempt failed, or no
    /// channel made an attempt.
    NotifyFailed,
    /// Change detected during a dry run; nothing was sent.
    WouldNotify,
}

/// Result of one entity's pass.
#[derive(Debug)]
pub struct EntityReport {
    pub index: usize,
    pub identifier: String,
    pub cache_key: CacheKey,
    /// `Done` or `Failed`.
    pub stage: Stage,
    /// Stage that failed, when `stage == Failed`.
    pub failed_at: Option<Stage>,
    pub outcome: Outcome,
    pub dispatch: Option<DispatchResult>,
    pub persisted: bool,
    pub errors: Vec<WatchError>,
}

impl EntityReport {
    fn new(index: usize, entity: &TrackedEntity) -> Self {
        Self {
            index,
            identifier: entity.identifier.clone(),
            cache_key: entity.cache_key.clone(),
            stage: Stage::Fetching,
            failed_at: None,
            outcome: Outcome::FetchFailed,
            dispatch: None,
            persisted: false,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, err: WatchError) {
        self.failed_at = Some(self.stage);
        self.stage = Stage::Failed;
        self.errors.push(err);
    }

    pub fn is_failed(&self) -> bool {
        self.stage == Stage::Failed
    }
}

/// All entity reports of a pass, in batch order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entities: Vec<EntityReport>,
}

impl BatchReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entities.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Entities that did not reach `Done` (fetch or persist failed).
    pub fn failed(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities.iter().filter(|e| e.is_failed())
    }

    pub fn has_hard_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Every recorded error with the entity it belongs to.
    pub fn errors(&self) -> impl Iterator<Item = (&EntityReport, &WatchError)> {
        self.entities
            .iter()
            .flat_map(|e| e.errors.iter().map(move |err| (e, err)))
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "📋 Batch done: {} entities, {} notified, {} would notify, {} unchanged, {} notify failed, {} fetch failed, {} failed",
            self.entities.len(),
            self.count(Outcome::Notified),
            self.count(Outcome::WouldNotify),
            self.count(Outcome::Unchanged),
            self.count(Outcome::NotifyFailed),
            self.count(Outcome::FetchFailed),
            self.failed().count(),
        );
        for (entity, err) in self.errors() {
            tracing::warn!("⚠️ [{}] {}", entity.identifier, err);
        }
    }
}

/// Orchestrates fetch → compare → notify → persist across a batch.
pub struct ReconciliationLoop {
    fetcher: Box<dyn StatusFetcher>,
    store: Box<dyn StateStore>,
    detector: ChangeDetector,
    router: NotifyRouter,
    dispatcher: Dispatcher,
    concurrency: usize,
    utc_offset: FixedOffset,
    dry_run: bool,
}

impl ReconciliationLoop {
    pub fn new(
        fetcher: Box<dyn StatusFetcher>,
        store: Box<dyn StateStore>,
        detector: ChangeDetector,
        router: NotifyRouter,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            fetcher,
            store,
            detector,
            router,
            dispatcher,
            concurrency: 1,
            utc_offset: Utc.fix(),
            dry_run: false,
        }
    }

    /// Wire the loop from validated config plus the chosen fetcher and store.
    pub fn from_config(
        config: &WatchConfig,
        fetcher: Box<dyn StatusFetcher>,
        store: Box<dyn StateStore>,
    ) -> Self {
        Self::new(
            fetcher,
            store,
            ChangeDetector::new(config.detection.mode),
            NotifyRouter::from_config(config),
            Dispatcher::from_config(&config.notify),
        )
        .with_concurrency(config.concurrency)
        .with_utc_offset(config.utc_offset())
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Fetch and compare only: nothing is sent and nothing is persisted.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process the whole batch. With `concurrency > 1` distinct entities run
    /// at the same time; reports still come back in batch order.
    pub async fn run(&self, batch: &[TrackedEntity]) -> BatchReport {
        tracing::info!(
            "🚆 Checking {} reservations via {} (concurrency {}{})",
            batch.len(),
            self.fetcher.name(),
            self.concurrency,
            if self.dry_run { ", dry run" } else { "" }
        );
        let batch_size = batch.len();
        let entities = futures::stream::iter(batch.iter().enumerate())
            .map(|(index, entity)| self.process(index, batch_size, entity))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        BatchReport { entities }
    }

    async fn process(&self, index: usize, batch_size: usize, entity: &TrackedEntity) -> EntityReport {
        let mut report = EntityReport::new(index, entity);

        let snapshot = match self.fetcher.fetch(entity).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("⚠️ Fetch failed for {}: {e}", entity.identifier);
                report.fail(e.into());
                return report;
            }
        };

        report.stage = Stage::Comparing;
        let previous = self.store.load(&entity.cache_key).unwrap_or_else(|e| {
            tracing::warn!(
                "⚠️ Could not read state for {}, treating as new: {e}",
                entity.identifier
            );
            PersistedState::default()
        });
        let changed = self.detector.should_notify(&previous, &snapshot);

        if !changed {
            tracing::info!("💤 {} unchanged", entity.identifier);
            report.outcome = Outcome::Unchanged;
        } else if self.dry_run {
            tracing::info!("🔍 {} changed (dry run, not sending)", entity.identifier);
            report.outcome = Outcome::WouldNotify;
        } else {
            report.stage = Stage::Notifying;
            tracing::info!("🔔 Status changed for {}, sending notification", entity.identifier);
            self.notify(&mut report, batch_size, &snapshot).await;
        }

        if self.dry_run {
            report.stage = Stage::Done;
            return report;
        }

        report.stage = Stage::Persisting;
        let state = PersistedState {
            fingerprint: snapshot.fingerprint().render(),
            cache_time: snapshot.cache_time.clone(),
            checked_at: Utc::now()
                .with_timezone(&self.utc_offset)
                .format(CHECKED_AT_FORMAT)
                .to_string(),
        };
        match self.store.save(&entity.cache_key, &state) {
            Ok(()) => {
                report.persisted = true;
                report.stage = Stage::Done;
                tracing::info!("✅ Processed {}", entity.identifier);
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not save state for {}: {e}", entity.identifier);
                report.fail(e.into());
            }
        }
        report
    }

    async fn notify(&self, report: &mut EntityReport, batch_size: usize, snapshot: &StatusSnapshot) {
        let target = match self.router.resolve(report.index, batch_size) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("⚠️ No route for {}: {e}", report.identifier);
                report.outcome = Outcome::NotifyFailed;
                report.errors.push(e.into());
                return;
            }
        };

        let message = NotificationMessage::render(snapshot, &snapshot.fingerprint());
        let result = self.dispatcher.dispatch(&target, &message).await;
        if result.attempted() == 0 {
            tracing::warn!("⚠️ Nothing sent for {}: no channel applies", report.identifier);
            report
                .errors
                .push(DispatchError::NothingSent { uri: target.uri.clone() }.into());
        }
        report
            .errors
            .extend(result.failures().cloned().map(WatchError::from));
        report.outcome = if result.all_succeeded() {
            Outcome::Notified
        } else {
            Outcome::NotifyFailed
        };
        report.dispatch = Some(result);
    }
}
