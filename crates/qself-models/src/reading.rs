use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single book from the read shelf, as persisted to the readings snapshot.
///
/// Identity is `review_id`; `id` is the book's identifier and may repeat if
/// the same book was read (and reviewed) more than once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    #[serde(default)]
    pub authors: Vec<ReadingAuthor>,
    pub id: i64, // Book ID
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub isbn13: String,
    #[serde(default)]
    pub num_pages: u32,
    #[serde(default)]
    pub published_year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    pub review_id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingAuthor {
    pub id: i64,
    pub name: String,
}

/// Root document of the readings snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReadingDb {
    #[serde(default)]
    pub readings: Vec<Reading>,
}
