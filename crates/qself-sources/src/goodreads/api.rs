use chrono::{DateTime, Utc};
use qself_models::{Reading, ReadingAuthor};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

use super::sanitize::sanitize_review;
use crate::SourceError;

/// Format Goodreads uses for `read_at`, e.g. `Tue Mar 14 10:00:00 -0700 2017`.
pub const GOODREADS_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Root document of a `review/list` response.
///
/// Numeric fields are kept as strings here: Goodreads emits empty elements
/// for unknown values, and those decode to zero rather than failing the page.
#[derive(Debug, Deserialize)]
#[serde(rename = "GoodreadsResponse")]
pub struct ApiReviewsRoot {
    #[serde(default)]
    pub reviews: ApiReviews,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiReviews {
    #[serde(rename = "review", default)]
    pub items: Vec<ApiReview>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReview {
    pub id: String,
    #[serde(default)]
    pub body: String,
    pub book: ApiBook,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub read_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiBook {
    #[serde(default)]
    pub authors: ApiBookAuthors,
    pub id: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub isbn13: String,
    #[serde(default)]
    pub num_pages: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiBookAuthors {
    #[serde(rename = "author", default)]
    pub items: Vec<ApiBookAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct ApiBookAuthor {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Decode one page of reviews. An empty `reviews` element means the page is
/// past the end of the shelf.
pub fn parse_reviews_page(xml: &str) -> Result<Vec<ApiReview>, SourceError> {
    let root: ApiReviewsRoot = quick_xml::de::from_str(xml)?;
    Ok(root.reviews.items)
}

impl ApiReview {
    pub fn into_reading(self) -> Result<Reading, SourceError> {
        let read_at = parse_read_at(&self.read_at, &self.book.title)?;

        let authors = self
            .book
            .authors
            .items
            .into_iter()
            .map(|author| {
                Ok(ReadingAuthor {
                    id: parse_id("author id", &author.id)?,
                    name: author.name.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        Ok(Reading {
            authors,
            id: parse_id("book id", &self.book.id)?,
            isbn: self.book.isbn.trim().to_string(),
            isbn13: self.book.isbn13.trim().to_string(),
            num_pages: parse_or_default(&self.book.num_pages),
            published_year: parse_or_default(&self.book.published),
            read_at,
            rating: parse_or_default(&self.rating),
            review: sanitize_review(&self.body),
            review_id: parse_id("review id", &self.id)?,
            title: self.book.title.trim().to_string(),
        })
    }
}

fn parse_read_at(value: &str, title: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
    let value = value.trim();
    if value.is_empty() {
        warn!("No read at time for book: {}", title);
        return Ok(None);
    }

    DateTime::parse_from_str(value, GOODREADS_TIME_FORMAT)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| SourceError::Timestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, SourceError> {
    value.trim().parse().map_err(|_| SourceError::InvalidId {
        field,
        value: value.to_string(),
    })
}

fn parse_or_default<T: FromStr + Default>(value: &str) -> T {
    let value = value.trim();
    if value.is_empty() {
        return T::default();
    }
    value.parse().unwrap_or_else(|_| {
        debug!("Ignoring unparseable numeric value from Goodreads: {:?}", value);
        T::default()
    })
}
