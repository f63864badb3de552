use super::*;
use qself_models::{TweetEntities, TweetEntitiesMedia};

fn reading(review_id: i64, review: &str) -> Reading {
    Reading {
        review_id,
        review: review.to_string(),
        ..Default::default()
    }
}

fn tweet(id: i64, text: &str) -> Tweet {
    Tweet {
        id,
        text: text.to_string(),
        ..Default::default()
    }
}

fn tweet_with_counts(id: i64, text: &str, favorites: u32, retweets: u32) -> Tweet {
    Tweet {
        favorite_count: favorites,
        retweet_count: retweets,
        ..tweet(id, text)
    }
}

fn with_media(mut tweet: Tweet, url: &str) -> Tweet {
    tweet.entities = Some(TweetEntities {
        medias: vec![TweetEntitiesMedia {
            url: url.to_string(),
            ..Default::default()
        }],
        ..Default::default()
    });
    tweet
}

fn ids<T: RecordId>(records: &[T]) -> Vec<i64> {
    records.iter().map(RecordId::record_id).collect()
}

#[test]
fn test_merge_readings_prefers_fresh() {
    let fresh = vec![
        reading(125, "fresh 125"),
        reading(124, "fresh 124"),
        reading(123, "fresh 123"),
        reading(122, "fresh 122"),
    ];
    let stored = vec![reading(124, "stored 124"), reading(123, "stored 123")];

    assert_eq!(merge_readings(fresh.clone(), stored), fresh);
}

#[test]
fn test_merge_readings_drops_deleted() {
    let fresh = vec![reading(125, ""), reading(123, "")];
    let stored = vec![reading(125, ""), reading(124, ""), reading(123, "")];

    assert_eq!(ids(&merge_readings(fresh, stored)), vec![125, 123]);
}

#[test]
fn test_merge_readings_updates_payload() {
    let merged = merge_readings(vec![reading(125, "new")], vec![reading(125, "old")]);
    assert_eq!(merged, vec![reading(125, "new")]);
}

#[test]
fn test_merge_readings_sorts_descending() {
    let fresh = vec![reading(1, ""), reading(3, ""), reading(2, "")];
    assert_eq!(ids(&merge_readings(fresh, vec![])), vec![3, 2, 1]);
}

#[test]
fn test_merge_readings_empty_fresh_drops_everything() {
    let stored = vec![reading(2, ""), reading(1, "")];
    assert!(merge_readings(vec![], stored).is_empty());
}

#[test]
fn test_merge_tweets_keeps_old() {
    let fresh = vec![tweet(125, "fresh 125"), tweet(124, "fresh 124"), tweet(122, "fresh 122")];
    let stored = vec![tweet(124, "stored 124"), tweet(123, "stored 123"), tweet(121, "stored 121")];

    assert_eq!(
        merge_tweets(fresh, stored),
        vec![
            tweet(125, "fresh 125"),
            tweet(124, "fresh 124"),
            tweet(123, "stored 123"),
            tweet(122, "fresh 122"),
            tweet(121, "stored 121"),
        ]
    );
}

#[test]
fn test_merge_tweets_prefers_fresh_on_large_increase() {
    let fresh = vec![tweet(125, "a"), tweet_with_counts(124, "same", 10, 10)];
    let stored = vec![tweet_with_counts(124, "same", 2, 2), tweet(123, "c")];

    assert_eq!(
        merge_tweets(fresh, stored),
        vec![tweet(125, "a"), tweet_with_counts(124, "same", 10, 10), tweet(123, "c")]
    );
}

#[test]
fn test_merge_tweets_prefers_fresh_on_large_decrease() {
    let fresh = vec![tweet(125, "a"), tweet_with_counts(124, "same", 2, 2)];
    let stored = vec![tweet_with_counts(124, "same", 10, 10), tweet(123, "c")];

    assert_eq!(
        merge_tweets(fresh, stored),
        vec![tweet(125, "a"), tweet_with_counts(124, "same", 2, 2), tweet(123, "c")]
    );
}

#[test]
fn test_merge_tweets_prefers_stored_on_trivial_change() {
    let fresh = vec![tweet(125, "a"), tweet_with_counts(124, "same", 4, 4)];
    let stored = vec![tweet_with_counts(124, "same", 2, 2), tweet(123, "c")];

    assert_eq!(
        merge_tweets(fresh, stored),
        vec![tweet(125, "a"), tweet_with_counts(124, "same", 2, 2), tweet(123, "c")]
    );
}

#[test]
fn test_merge_tweets_prefers_fresh_when_entities_differ() {
    let fresh = vec![
        tweet(125, "a"),
        with_media(tweet_with_counts(124, "same", 4, 4), "https://foo.com"),
    ];
    let stored = vec![
        with_media(tweet_with_counts(124, "same", 2, 2), "https://bar.com"),
        tweet(123, "c"),
    ];

    let merged = merge_tweets(fresh, stored);
    assert_eq!(merged[1], with_media(tweet_with_counts(124, "same", 4, 4), "https://foo.com"));
}

#[test]
fn test_merge_tweets_prefers_fresh_when_text_differs() {
    let fresh = vec![tweet_with_counts(124, "edited", 3, 3)];
    let stored = vec![tweet_with_counts(124, "original", 3, 3)];

    assert_eq!(merge_tweets(fresh, stored), vec![tweet_with_counts(124, "edited", 3, 3)]);
}

#[test]
fn test_merge_tweets_is_idempotent() {
    let fresh = vec![tweet(125, "a"), tweet_with_counts(124, "same", 4, 4)];
    let stored = vec![tweet_with_counts(124, "same", 2, 2), tweet(123, "c")];

    let merged = merge_tweets(fresh, stored);
    assert_eq!(merge_tweets(merged.clone(), vec![]), merged);
    assert_eq!(merge_tweets(merged.clone(), merged.clone()), merged);
}

#[test]
fn test_merge_tweets_with_custom_threshold() {
    let fresh = vec![tweet_with_counts(124, "same", 9, 0)];
    let stored = vec![tweet_with_counts(124, "same", 2, 0)];

    assert_eq!(
        merge_tweets_with(fresh.clone(), stored.clone(), 10),
        stored
    );
    assert_eq!(merge_tweets_with(fresh.clone(), stored, DEFAULT_NOISE_THRESHOLD), fresh);
}

#[test]
fn test_tweet_preference() {
    let stored = tweet_with_counts(1, "x", 10, 10);

    assert_eq!(
        tweet_preference(&tweet_with_counts(1, "x", 12, 8), &stored, 3),
        Preference::Stored
    );
    // Drift equal to the threshold is not noise
    assert_eq!(
        tweet_preference(&tweet_with_counts(1, "x", 13, 10), &stored, 3),
        Preference::Fresh
    );
    // Both counters have to be quiet
    assert_eq!(
        tweet_preference(&tweet_with_counts(1, "x", 10, 20), &stored, 3),
        Preference::Fresh
    );
    assert_eq!(
        tweet_preference(&tweet_with_counts(1, "y", 10, 10), &stored, 3),
        Preference::Fresh
    );
}

#[test]
fn test_tweet_preference_identical_prefers_stored() {
    let t = tweet_with_counts(1, "x", 5, 5);
    assert_eq!(tweet_preference(&t, &t.clone(), DEFAULT_NOISE_THRESHOLD), Preference::Stored);
}

#[test]
fn test_flip_duplicates_only_touches_neighbours() {
    let mut tweets = vec![
        tweet_with_counts(1, "x", 4, 4),
        tweet_with_counts(1, "x", 2, 2),
        tweet_with_counts(2, "y", 9, 9),
        tweet_with_counts(3, "y", 9, 9),
    ];

    let swapped = flip_duplicates_on_trivial_changes(&mut tweets, DEFAULT_NOISE_THRESHOLD);
    assert_eq!(swapped, 1);
    assert_eq!(tweets[0], tweet_with_counts(1, "x", 2, 2));
    assert_eq!(tweets[1], tweet_with_counts(1, "x", 4, 4));
    assert_eq!(ids(&tweets[2..]), vec![2, 3]);
}

#[test]
fn test_flip_duplicates_empty() {
    let mut tweets: Vec<Tweet> = vec![];
    assert_eq!(flip_duplicates_on_trivial_changes(&mut tweets, DEFAULT_NOISE_THRESHOLD), 0);
}
