pub mod dedup;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod sync;

pub use dedup::{keep_only_present_in, reverse, unique_by_key};
pub use reconcile::{
    flip_duplicates_on_trivial_changes, merge_readings, merge_tweets, merge_tweets_with, tweet_preference,
    Preference, DEFAULT_NOISE_THRESHOLD,
};
pub use record::RecordId;
pub use snapshot::SnapshotFile;
pub use sync::{KindReport, SyncOptions, SyncOrchestrator, SyncResult, SyncTarget};
