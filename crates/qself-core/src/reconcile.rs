// Merging a freshly fetched batch into the stored snapshot

use qself_models::{Reading, Tweet};
use tracing::debug;

use crate::dedup::{keep_only_present_in, reverse, unique_by_key};
use crate::record::RecordId;

/// Counter drift (favorites or retweets) smaller than this is treated as
/// noise by the anti-churn pass.
pub const DEFAULT_NOISE_THRESHOLD: u32 = 3;

/// Which of two versions of the same tweet should be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Fresh,
    Stored,
}

/// Merge fresh readings with the stored snapshot.
///
/// The Goodreads shelf is enumerated completely on every fetch, so a stored
/// reading that is missing from `fresh` was deleted upstream and is dropped.
/// Where both batches hold a review, the fresh one wins. The result is
/// ordered newest review first.
pub fn merge_readings(fresh: Vec<Reading>, stored: Vec<Reading>) -> Vec<Reading> {
    let stored = keep_only_present_in(stored, &fresh, RecordId::record_id, RecordId::record_id);

    let mut merged = fresh;
    merged.extend(stored);

    // Stable, so fresh stays ahead of stored for equal IDs
    merged.sort_by_key(RecordId::record_id);

    let mut merged = unique_by_key(merged, RecordId::record_id);
    reverse(&mut merged);
    merged
}

/// Merge fresh tweets with the stored snapshot using
/// [`DEFAULT_NOISE_THRESHOLD`].
pub fn merge_tweets(fresh: Vec<Tweet>, stored: Vec<Tweet>) -> Vec<Tweet> {
    merge_tweets_with(fresh, stored, DEFAULT_NOISE_THRESHOLD)
}

/// Merge fresh tweets with the stored snapshot.
///
/// The timeline API only reaches back a limited distance, so stored tweets
/// absent from `fresh` are kept. Fresh versions normally win, except when
/// the only difference is counter drift below `threshold`, which would
/// otherwise rewrite the snapshot on every run.
pub fn merge_tweets_with(fresh: Vec<Tweet>, stored: Vec<Tweet>, threshold: u32) -> Vec<Tweet> {
    let mut merged = fresh;
    merged.extend(stored);

    merged.sort_by_key(RecordId::record_id);

    let flipped = flip_duplicates_on_trivial_changes(&mut merged, threshold);
    if flipped > 0 {
        debug!("Kept {} stored tweets over trivially changed fresh copies", flipped);
    }

    let mut merged = unique_by_key(merged, RecordId::record_id);
    reverse(&mut merged);
    merged
}

/// Decide between a fresh and a stored version of the same tweet.
pub fn tweet_preference(fresh: &Tweet, stored: &Tweet, threshold: u32) -> Preference {
    if fresh.text != stored.text {
        return Preference::Fresh;
    }

    if fresh.entities != stored.entities {
        return Preference::Fresh;
    }

    let favorite_drift = fresh.favorite_count.abs_diff(stored.favorite_count);
    let retweet_drift = fresh.retweet_count.abs_diff(stored.retweet_count);

    if favorite_drift < threshold && retweet_drift < threshold {
        Preference::Stored
    } else {
        Preference::Fresh
    }
}

/// Walk an ID-sorted slice where a fresh tweet directly precedes its stored
/// duplicate, and swap the pair when the stored version should win. A
/// following first-occurrence dedup then keeps the preferred copy.
///
/// Only adjacent pairs are inspected. Returns the number of swaps.
pub fn flip_duplicates_on_trivial_changes(tweets: &mut [Tweet], threshold: u32) -> usize {
    let mut swapped = 0;

    for i in 1..tweets.len() {
        let (fresh, stored) = (&tweets[i - 1], &tweets[i]);
        if fresh.id != stored.id {
            continue;
        }

        if tweet_preference(fresh, stored, threshold) == Preference::Stored {
            tweets.swap(i - 1, i);
            swapped += 1;
        }
    }

    swapped
}

#[cfg(test)]
mod tests;
