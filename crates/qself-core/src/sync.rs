use anyhow::{anyhow, Context, Result};
use qself_models::{Reading, Tweet};
use qself_sources::RecordSource;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::dedup::unique_by_key;
use crate::reconcile::{merge_readings, merge_tweets_with, DEFAULT_NOISE_THRESHOLD};
use crate::record::RecordId;
use crate::snapshot::SnapshotFile;

/// A remote source paired with the snapshot file it is merged into.
pub struct SyncTarget<R: Send> {
    source: Box<dyn RecordSource<Record = R>>,
    snapshot: SnapshotFile,
}

impl<R: Send> SyncTarget<R> {
    pub fn new(source: Box<dyn RecordSource<Record = R>>, snapshot: SnapshotFile) -> Self {
        Self { source, snapshot }
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    pub fn snapshot(&self) -> &SnapshotFile {
        &self.snapshot
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOptions {
    /// Counter drift below this keeps the stored tweet
    pub noise_threshold: u32,
    /// Fetch and merge but leave snapshots untouched
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            dry_run: false,
        }
    }
}

/// Outcome of syncing one record kind.
#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    pub kind: &'static str,
    pub source: String,
    pub path: PathBuf,
    pub fetched: usize,
    /// Fetched records dropped because their ID repeated within the batch
    pub duplicates: usize,
    pub stored: usize,
    /// Stored records whose ID did not come back from the source
    pub missing_upstream: usize,
    pub total: usize,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub readings: Option<KindReport>,
    pub tweets: Option<KindReport>,
    pub duration: Duration,
    pub dry_run: bool,
}

impl SyncResult {
    pub fn reports(&self) -> impl Iterator<Item = &KindReport> {
        self.readings.iter().chain(self.tweets.iter())
    }
}

/// Per-kind snapshot access and merge policy.
trait SnapshotRecord: RecordId + Sized + Send + Sync {
    const KIND: &'static str;

    fn load(snapshot: &SnapshotFile) -> Result<Option<Vec<Self>>>;
    fn save(snapshot: &SnapshotFile, records: &[Self]) -> Result<()>;
    fn merge(fresh: Vec<Self>, stored: Vec<Self>, options: &SyncOptions) -> Vec<Self>;

    /// Whether stored records absent from a fetch are removed by `merge`.
    fn propagates_deletions() -> bool;
}

impl SnapshotRecord for Reading {
    const KIND: &'static str = "readings";

    fn load(snapshot: &SnapshotFile) -> Result<Option<Vec<Self>>> {
        snapshot.load_readings()
    }

    fn save(snapshot: &SnapshotFile, records: &[Self]) -> Result<()> {
        snapshot.save_readings(records)
    }

    fn merge(fresh: Vec<Self>, stored: Vec<Self>, _options: &SyncOptions) -> Vec<Self> {
        merge_readings(fresh, stored)
    }

    fn propagates_deletions() -> bool {
        true
    }
}

impl SnapshotRecord for Tweet {
    const KIND: &'static str = "tweets";

    fn load(snapshot: &SnapshotFile) -> Result<Option<Vec<Self>>> {
        snapshot.load_tweets()
    }

    fn save(snapshot: &SnapshotFile, records: &[Self]) -> Result<()> {
        snapshot.save_tweets(records)
    }

    fn merge(fresh: Vec<Self>, stored: Vec<Self>, options: &SyncOptions) -> Vec<Self> {
        merge_tweets_with(fresh, stored, options.noise_threshold)
    }

    fn propagates_deletions() -> bool {
        false
    }
}

/// Fetches each configured record kind, merges it into its snapshot, and
/// writes the result back.
#[derive(Default)]
pub struct SyncOrchestrator {
    readings: Option<SyncTarget<Reading>>,
    tweets: Option<SyncTarget<Tweet>>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            readings: None,
            tweets: None,
            options,
        }
    }

    pub fn with_readings(mut self, source: Box<dyn RecordSource<Record = Reading>>, snapshot: SnapshotFile) -> Self {
        self.readings = Some(SyncTarget::new(source, snapshot));
        self
    }

    pub fn with_tweets(mut self, source: Box<dyn RecordSource<Record = Tweet>>, snapshot: SnapshotFile) -> Self {
        self.tweets = Some(SyncTarget::new(source, snapshot));
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn has_targets(&self) -> bool {
        self.readings.is_some() || self.tweets.is_some()
    }

    pub fn enabled_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.readings.is_some() {
            kinds.push(Reading::KIND);
        }
        if self.tweets.is_some() {
            kinds.push(Tweet::KIND);
        }
        kinds
    }

    pub async fn sync_readings(&self) -> Result<KindReport> {
        let target = self
            .readings
            .as_ref()
            .ok_or_else(|| anyhow!("Goodreads is not configured"))?;
        self.sync_target(target).await
    }

    pub async fn sync_tweets(&self) -> Result<KindReport> {
        let target = self
            .tweets
            .as_ref()
            .ok_or_else(|| anyhow!("Twitter is not configured"))?;
        self.sync_target(target).await
    }

    /// Sync every configured kind concurrently. Both run to completion even
    /// when one fails; the first error (readings before tweets) is returned.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncResult> {
        let start = Instant::now();

        info!(
            operation = "sync_start",
            kinds = ?self.enabled_kinds(),
            dry_run = self.options.dry_run,
            "Starting sync"
        );

        let readings = async {
            match &self.readings {
                Some(target) => self.sync_target(target).await.map(Some),
                None => Ok(None),
            }
        };
        let tweets = async {
            match &self.tweets {
                Some(target) => self.sync_target(target).await.map(Some),
                None => Ok(None),
            }
        };

        let (readings, tweets) = futures::join!(readings, tweets);

        for (kind, outcome) in [(Reading::KIND, readings.as_ref().err()), (Tweet::KIND, tweets.as_ref().err())] {
            if let Some(e) = outcome {
                error!(operation = "sync", kind = kind, status = "error", error = %e, "Failed to sync {}", kind);
            }
        }

        let result = SyncResult {
            readings: readings?,
            tweets: tweets?,
            duration: start.elapsed(),
            dry_run: self.options.dry_run,
        };

        info!(
            operation = "sync_complete",
            duration_ms = result.duration.as_millis() as u64,
            "Sync complete"
        );

        Ok(result)
    }

    async fn sync_target<R>(&self, target: &SyncTarget<R>) -> Result<KindReport>
    where
        R: SnapshotRecord,
    {
        let kind = R::KIND;
        let source = target.source_name().to_string();

        let fresh = target
            .source
            .fetch()
            .await
            .with_context(|| format!("Failed to fetch {} from {}", kind, source))?;
        let fetched = fresh.len();

        let fresh = unique_by_key(fresh, RecordId::record_id);
        let duplicates = fetched - fresh.len();
        if duplicates > 0 {
            warn!(
                operation = "fetch",
                kind = kind,
                source = %source,
                duplicates = duplicates,
                "Source returned {} duplicate {}; keeping the first of each",
                duplicates,
                kind
            );
        }

        let stored = R::load(&target.snapshot)?.unwrap_or_default();

        let fresh_ids: HashSet<i64> = fresh.iter().map(RecordId::record_id).collect();
        let missing_upstream = stored
            .iter()
            .filter(|record| !fresh_ids.contains(&record.record_id()))
            .count();
        if missing_upstream > 0 {
            if R::propagates_deletions() {
                warn!(
                    operation = "merge",
                    kind = kind,
                    dropped = missing_upstream,
                    "Dropping {} stored {} not returned by {}; assuming they were deleted upstream",
                    missing_upstream,
                    kind,
                    source
                );
            } else {
                debug!("Retaining {} stored {} not returned by {}", missing_upstream, kind, source);
            }
        }

        let stored_count = stored.len();
        let merged = R::merge(fresh, stored, &self.options);

        info!(
            operation = "merge",
            kind = kind,
            source = %source,
            fetched = fetched,
            stored = stored_count,
            total = merged.len(),
            "Merged {} {}",
            merged.len(),
            kind
        );

        let saved = if self.options.dry_run {
            info!(
                "Dry run; not writing {} {} to {}",
                merged.len(),
                kind,
                target.snapshot.path().display()
            );
            false
        } else {
            R::save(&target.snapshot, &merged)?;
            true
        };

        Ok(KindReport {
            kind,
            source,
            path: target.snapshot.path().to_path_buf(),
            fetched,
            duplicates,
            stored: stored_count,
            missing_upstream,
            total: merged.len(),
            saved,
        })
    }
}
