use anyhow::{Context, Result};
use qself_models::{Reading, ReadingDb, Tweet, TweetDb};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A TOML snapshot of one record kind on disk.
///
/// A missing file means there is nothing stored yet. A file that exists but
/// cannot be read or decoded is an error: the snapshot is the user's data and
/// is never deleted or overwritten with an empty set.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load_readings(&self) -> Result<Option<Vec<Reading>>> {
        Ok(self.load::<ReadingDb>("readings")?.map(|db| db.readings))
    }

    pub fn save_readings(&self, readings: &[Reading]) -> Result<()> {
        let db = ReadingDb {
            readings: readings.to_vec(),
        };
        self.save("readings", &db, readings.len())
    }

    pub fn load_tweets(&self) -> Result<Option<Vec<Tweet>>> {
        Ok(self.load::<TweetDb>("tweets")?.map(|db| db.tweets))
    }

    pub fn save_tweets(&self, tweets: &[Tweet]) -> Result<()> {
        let db = TweetDb {
            tweets: tweets.to_vec(),
        };
        self.save("tweets", &db, tweets.len())
    }

    fn load<T>(&self, kind: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        if !self.path.exists() {
            info!("No {} snapshot at {}; starting fresh", kind, self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {} snapshot {}", kind, self.path.display()))?;
        let db = toml::from_str(&content)
            .with_context(|| format!("Failed to decode {} snapshot {}", kind, self.path.display()))?;

        debug!("Loaded {} snapshot from {}", kind, self.path.display());
        Ok(Some(db))
    }

    fn save<T>(&self, kind: &str, db: &T, count: usize) -> Result<()>
    where
        T: Serialize,
    {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
                parent
            }
            None => Path::new("."),
        };

        let content = toml::to_string_pretty(db)
            .with_context(|| format!("Failed to encode {} snapshot", kind))?;

        // Written beside the target and renamed over it, so a crash never
        // leaves a half-written snapshot behind.
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write {} snapshot {}", kind, self.path.display()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush {} snapshot {}", kind, self.path.display()))?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to replace {} snapshot {}", kind, self.path.display()))?;

        info!("Saved {} {} to {}", count, kind, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use qself_models::{ReadingAuthor, TweetEntities, TweetEntitiesUrl, TweetReply};
    use tempfile::TempDir;

    fn sample_reading() -> Reading {
        Reading {
            authors: vec![ReadingAuthor {
                id: 7,
                name: "Ursula K. Le Guin".to_string(),
            }],
            id: 13651,
            isbn: "0441478123".to_string(),
            isbn13: "9780441478125".to_string(),
            num_pages: 304,
            published_year: 1969,
            read_at: Some(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap()),
            rating: 5,
            review: "Line one\nLine two".to_string(),
            review_id: 2800000001,
            title: "The Left Hand of Darkness".to_string(),
        }
    }

    fn sample_tweet() -> Tweet {
        Tweet {
            created_at: Some(Utc.with_ymd_and_hms(2020, 8, 30, 12, 0, 0).unwrap()),
            entities: Some(TweetEntities {
                urls: vec![TweetEntitiesUrl {
                    display_url: "example.com".to_string(),
                    expanded_url: "https://example.com".to_string(),
                    url: "https://t.co/x".to_string(),
                }],
                ..Default::default()
            }),
            favorite_count: 3,
            id: 1300000000000000001,
            reply: Some(TweetReply {
                status_id: 1299999999999999999,
                user: "friend".to_string(),
                user_id: 99,
            }),
            retweet: None,
            retweet_count: 0,
            text: "hello \"world\"".to_string(),
        }
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let temp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(temp.path().join("readings.toml"));
        assert!(snapshot.load_readings().unwrap().is_none());
        assert!(snapshot.load_tweets().unwrap().is_none());
    }

    #[test]
    fn test_readings_persist() {
        let temp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(temp.path().join("nested/data/readings.toml"));

        snapshot.save_readings(&[sample_reading()]).unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.load_readings().unwrap(), Some(vec![sample_reading()]));
    }

    #[test]
    fn test_tweets_persist() {
        let temp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(temp.path().join("tweets.toml"));

        snapshot.save_tweets(&[sample_tweet()]).unwrap();
        assert_eq!(snapshot.load_tweets().unwrap(), Some(vec![sample_tweet()]));
    }

    #[test]
    fn test_empty_snapshot_persists() {
        let temp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(temp.path().join("tweets.toml"));

        snapshot.save_tweets(&[]).unwrap();
        assert_eq!(snapshot.load_tweets().unwrap(), Some(vec![]));
    }

    #[test]
    fn test_save_replaces_existing_snapshot_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tweets.toml");
        let snapshot = SnapshotFile::new(&path);

        let mut older = sample_tweet();
        older.text = "older".to_string();
        snapshot.save_tweets(&[older, sample_tweet()]).unwrap();
        snapshot.save_tweets(&[sample_tweet()]).unwrap();

        assert_eq!(snapshot.load_tweets().unwrap(), Some(vec![sample_tweet()]));

        // No temporary files are left next to the snapshot
        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("tweets.toml")]);
    }

    #[test]
    fn test_corrupt_snapshot_is_error_and_kept() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("readings.toml");
        std::fs::write(&path, "readings = 'not a list'").unwrap();

        let snapshot = SnapshotFile::new(&path);
        assert!(snapshot.load_readings().is_err());
        assert!(path.exists());
    }
}
