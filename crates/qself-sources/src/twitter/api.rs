use chrono::{DateTime, Utc};
use qself_models::{
    Tweet, TweetEntities, TweetEntitiesMedia, TweetEntitiesUrl, TweetEntitiesUserMention, TweetReply,
    TweetRetweet,
};
use serde::Deserialize;

use crate::SourceError;

#[derive(Debug, Deserialize)]
pub struct ApiUserResponse {
    pub data: ApiUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

/// One page of `GET /2/users/:id/tweets`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiTimelinePage {
    #[serde(default)]
    pub data: Vec<ApiTweet>,
    #[serde(default)]
    pub includes: ApiIncludes,
    #[serde(default)]
    pub meta: ApiMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiMeta {
    pub next_token: Option<String>,
    #[serde(default)]
    pub result_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub created_at: Option<String>,
    pub author_id: Option<String>,
    pub public_metrics: Option<ApiPublicMetrics>,
    pub entities: Option<ApiEntities>,
    #[serde(default)]
    pub referenced_tweets: Vec<ApiReferencedTweet>,
    pub in_reply_to_user_id: Option<String>,
    pub attachments: Option<ApiAttachments>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPublicMetrics {
    #[serde(default)]
    pub retweet_count: u32,
    #[serde(default)]
    pub like_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEntities {
    #[serde(default)]
    pub urls: Vec<ApiUrl>,
    #[serde(default)]
    pub mentions: Vec<ApiMention>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUrl {
    pub url: String,
    #[serde(default)]
    pub expanded_url: String,
    #[serde(default)]
    pub display_url: String,
    /// Set when the link is the t.co wrapper of attached media
    pub media_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMention {
    pub username: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAttachments {
    #[serde(default)]
    pub media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiIncludes {
    #[serde(default)]
    pub media: Vec<ApiMedia>,
    #[serde(default)]
    pub users: Vec<ApiUser>,
    #[serde(default)]
    pub tweets: Vec<ApiTweet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMedia {
    pub media_key: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: Option<String>,
    pub preview_image_url: Option<String>,
}

impl ApiIncludes {
    fn username(&self, user_id: &str) -> String {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn tweet(&self, tweet_id: &str) -> Option<&ApiTweet> {
        self.tweets.iter().find(|t| t.id == tweet_id)
    }

    fn media(&self, media_key: &str) -> Option<&ApiMedia> {
        self.media.iter().find(|m| m.media_key == media_key)
    }
}

/// Twitter escapes `<`, `>` and `&` in tweet bodies.
pub fn sanitize_tweet_text(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Convert a timeline entry into a snapshot tweet, resolving media,
/// reply and retweet references through the page's `includes`.
pub fn tweet_from_api(tweet: &ApiTweet, includes: &ApiIncludes) -> Result<Tweet, SourceError> {
    let created_at = tweet
        .created_at
        .as_deref()
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| SourceError::Timestamp {
                    value: value.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()?;

    let metrics = tweet.public_metrics.clone().unwrap_or_default();

    Ok(Tweet {
        created_at,
        entities: entities_from_api(tweet, includes)?,
        favorite_count: metrics.like_count,
        id: parse_id("tweet id", &tweet.id)?,
        reply: reply_from_api(tweet, includes)?,
        retweet: retweet_from_api(tweet, includes)?,
        retweet_count: metrics.retweet_count,
        text: sanitize_tweet_text(&tweet.text),
    })
}

fn entities_from_api(tweet: &ApiTweet, includes: &ApiIncludes) -> Result<Option<TweetEntities>, SourceError> {
    let mut entities = TweetEntities::default();

    if let Some(attachments) = &tweet.attachments {
        for media in attachments.media_keys.iter().filter_map(|key| includes.media(key)) {
            entities.medias.push(TweetEntitiesMedia {
                id: media_id_from_key(&media.media_key)?,
                media_type: media.media_type.clone(),
                url: media
                    .url
                    .clone()
                    .or_else(|| media.preview_image_url.clone())
                    .unwrap_or_default(),
            });
        }
    }

    if let Some(api_entities) = &tweet.entities {
        for url in api_entities.urls.iter().filter(|u| u.media_key.is_none()) {
            entities.urls.push(TweetEntitiesUrl {
                display_url: url.display_url.clone(),
                expanded_url: url.expanded_url.clone(),
                url: url.url.clone(),
            });
        }

        for mention in &api_entities.mentions {
            entities.user_mentions.push(TweetEntitiesUserMention {
                user: mention.username.clone(),
                user_id: match &mention.id {
                    Some(id) => parse_id("user id", id)?,
                    None => 0,
                },
            });
        }
    }

    Ok((!entities.is_empty()).then_some(entities))
}

fn reply_from_api(tweet: &ApiTweet, includes: &ApiIncludes) -> Result<Option<TweetReply>, SourceError> {
    let Some(replied_to) = tweet.referenced_tweets.iter().find(|r| r.kind == "replied_to") else {
        return Ok(None);
    };

    let user_id = tweet.in_reply_to_user_id.clone().unwrap_or_default();
    Ok(Some(TweetReply {
        status_id: parse_id("tweet id", &replied_to.id)?,
        user: includes.username(&user_id),
        user_id: if user_id.is_empty() { 0 } else { parse_id("user id", &user_id)? },
    }))
}

fn retweet_from_api(tweet: &ApiTweet, includes: &ApiIncludes) -> Result<Option<TweetRetweet>, SourceError> {
    let Some(retweeted) = tweet.referenced_tweets.iter().find(|r| r.kind == "retweeted") else {
        return Ok(None);
    };

    let author_id = includes
        .tweet(&retweeted.id)
        .and_then(|t| t.author_id.clone())
        .unwrap_or_default();

    Ok(Some(TweetRetweet {
        status_id: parse_id("tweet id", &retweeted.id)?,
        user: includes.username(&author_id),
        user_id: if author_id.is_empty() { 0 } else { parse_id("user id", &author_id)? },
    }))
}

/// Media keys look like `3_1234567890`; the part after the underscore is the
/// media ID.
fn media_id_from_key(media_key: &str) -> Result<i64, SourceError> {
    let id = media_key.rsplit('_').next().unwrap_or(media_key);
    parse_id("media key", id).map_err(|_| SourceError::InvalidId {
        field: "media key",
        value: media_key.to_string(),
    })
}

pub(crate) fn parse_id(field: &'static str, value: &str) -> Result<i64, SourceError> {
    value.trim().parse().map_err(|_| SourceError::InvalidId {
        field,
        value: value.to_string(),
    })
}
