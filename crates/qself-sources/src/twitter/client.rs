use async_trait::async_trait;
use qself_config::{CredentialStore, TwitterConfig};
use qself_models::Tweet;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::api::{self, ApiTimelinePage, ApiUserResponse};
use crate::{RecordSource, SourceError};

const TWEET_FIELDS: &str = "created_at,public_metrics,entities,referenced_tweets,in_reply_to_user_id,attachments,author_id";
const EXPANSIONS: &str = "attachments.media_keys,referenced_tweets.id,referenced_tweets.id.author_id,in_reply_to_user_id";
const MEDIA_FIELDS: &str = "type,url,preview_image_url";

/// Fetches a user's timeline from the Twitter v2 API using an app bearer
/// token.
#[derive(Clone)]
pub struct TwitterClient {
    client: Client,
    base_url: String,
    user: String,
    bearer_token: String,
    page_size: u32,
}

impl TwitterClient {
    pub fn new(user: String, bearer_token: String) -> Self {
        Self::with_config(&TwitterConfig::new(user), bearer_token)
    }

    pub fn with_config(config: &TwitterConfig, bearer_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            bearer_token,
            page_size: config.page_size.clamp(5, 100),
        }
    }

    pub fn from_config(config: &TwitterConfig, credentials: &CredentialStore) -> Result<Self, SourceError> {
        let token = credentials
            .get_twitter_bearer_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SourceError::config(
                    "Twitter bearer token is not configured (set TWITTER_BEARER_TOKEN or run `qself config credentials`)",
                )
            })?;
        Ok(Self::with_config(config, token.clone()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Api {
                service: "twitter",
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve the configured screen name to a numeric user ID.
    pub async fn lookup_user_id(&self) -> Result<String, SourceError> {
        let url = format!(
            "{}/2/users/by/username/{}",
            self.base_url,
            urlencoding::encode(&self.user)
        );
        let response: ApiUserResponse = self.get_json(&url, &[]).await?;
        debug!("(twitter) Resolved @{} to user {}", response.data.username, response.data.id);
        Ok(response.data.id)
    }

    /// Fetch one page of the user's timeline, continuing from
    /// `pagination_token` when given.
    pub async fn fetch_page(
        &self,
        user_id: &str,
        pagination_token: Option<&str>,
    ) -> Result<ApiTimelinePage, SourceError> {
        let url = format!("{}/2/users/{}/tweets", self.base_url, user_id);
        let max_results = self.page_size.to_string();

        let mut query = vec![
            ("max_results", max_results.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", EXPANSIONS),
            ("media.fields", MEDIA_FIELDS),
        ];
        if let Some(token) = pagination_token {
            query.push(("pagination_token", token));
        }

        self.get_json(&url, &query).await
    }

    /// Walk the timeline newest first until the API stops handing out
    /// pagination tokens.
    pub async fn fetch_tweets(&self) -> Result<Vec<Tweet>, SourceError> {
        let user_id = self.lookup_user_id().await?;
        let mut tweets = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            info!(
                "(twitter) Paging; num tweets accumulated: {}, next token: {:?}",
                tweets.len(),
                pagination_token
            );

            let page = self.fetch_page(&user_id, pagination_token.as_deref()).await?;
            if page.data.is_empty() {
                break;
            }

            for tweet in &page.data {
                tweets.push(api::tweet_from_api(tweet, &page.includes)?);
            }

            match page.meta.next_token {
                Some(token) => pagination_token = Some(token),
                None => break,
            }
        }

        info!("(twitter) Fetched {} tweets", tweets.len());
        Ok(tweets)
    }
}

#[async_trait]
impl RecordSource for TwitterClient {
    type Record = Tweet;

    fn source_name(&self) -> &str {
        "twitter"
    }

    async fn fetch(&self) -> Result<Vec<Tweet>, SourceError> {
        self.fetch_tweets().await
    }
}
