use async_trait::async_trait;
use futures::future::try_join_all;
use qself_config::{CredentialStore, GoodreadsConfig};
use qself_models::Reading;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::api::{self, ApiReview};
use crate::{RecordSource, SourceError};

/// Fetches the user's "read" shelf from the Goodreads review list API.
#[derive(Clone)]
pub struct GoodreadsClient {
    client: Client,
    base_url: String,
    user_id: String,
    key: String,
    per_page: u32,
    segments: u32,
}

impl GoodreadsClient {
    pub fn new(user_id: String, key: String) -> Self {
        Self::with_config(&GoodreadsConfig::new(user_id), key)
    }

    pub fn with_config(config: &GoodreadsConfig, key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            key,
            per_page: config.per_page.max(1),
            segments: config.segments.max(1),
        }
    }

    pub fn from_config(config: &GoodreadsConfig, credentials: &CredentialStore) -> Result<Self, SourceError> {
        let key = credentials
            .get_goodreads_key()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SourceError::config("Goodreads key is not configured (set GOODREADS_KEY or run `qself config credentials`)"))?;
        Ok(Self::with_config(config, key.clone()))
    }

    /// Fetch a single page of the read shelf.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<ApiReview>, SourceError> {
        let url = format!("{}/review/list/{}.xml", self.base_url, self.user_id);
        let page = page.to_string();
        let per_page = self.per_page.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.key.as_str()),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
                ("shelf", "read"),
                ("sort", "date_read"),
                ("v", "2"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Api {
                service: "goodreads",
                status: status.as_u16(),
                body,
            });
        }

        api::parse_reviews_page(&body)
    }

    /// Fetch every reading on the shelf.
    ///
    /// The API is slow, so pages are striped across `segments` workers:
    /// worker `n` requests pages `n`, `n + segments`, and so on. The first
    /// empty page any worker sees lowers the shared end marker so the others
    /// stop without requesting pages past it.
    pub async fn fetch_readings(&self) -> Result<Vec<Reading>, SourceError> {
        let known_end_page = Mutex::new(None);

        let segments = (1..=self.segments).map(|segment| self.fetch_segment(segment, &known_end_page));
        let readings: Vec<Reading> = try_join_all(segments).await?.into_iter().flatten().collect();

        info!("(goodreads) Fetched {} readings", readings.len());
        Ok(readings)
    }

    async fn fetch_segment(
        &self,
        segment: u32,
        known_end_page: &Mutex<Option<u32>>,
    ) -> Result<Vec<Reading>, SourceError> {
        let mut readings = Vec::new();
        let mut page = segment;

        loop {
            if let Some(end) = *known_end_page.lock().await {
                if page >= end {
                    debug!(
                        "(goodreads) (segment {}) Page {} beyond known end of {}; stopping",
                        segment, page, end
                    );
                    break;
                }
            }

            info!(
                "(goodreads) (segment {}) Paging; num readings accumulated: {}, page: {}",
                segment,
                readings.len(),
                page
            );

            let reviews = self.fetch_page(page).await?;

            if reviews.is_empty() {
                let mut end = known_end_page.lock().await;
                if end.map_or(true, |known| page < known) {
                    debug!(
                        "(goodreads) (segment {}) Setting known end page: {} (previously {:?})",
                        segment, page, *end
                    );
                    *end = Some(page);
                }
                break;
            }

            for review in reviews {
                readings.push(review.into_reading()?);
            }

            page += self.segments;
        }

        Ok(readings)
    }
}

#[async_trait]
impl RecordSource for GoodreadsClient {
    type Record = Reading;

    fn source_name(&self) -> &str {
        "goodreads"
    }

    async fn fetch(&self) -> Result<Vec<Reading>, SourceError> {
        self.fetch_readings().await
    }
}
