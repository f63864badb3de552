use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single post from the user's timeline, as persisted to the tweets snapshot.
///
/// `favorite_count` and `retweet_count` drift over time even for old posts;
/// everything else is treated as content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tweet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<TweetEntities>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub favorite_count: u32,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<TweetReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweet: Option<TweetRetweet>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retweet_count: u32,
    #[serde(default)]
    pub text: String,
}

/// Multimedia and link entries attached to a tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetEntities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medias: Vec<TweetEntitiesMedia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<TweetEntitiesUrl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_mentions: Vec<TweetEntitiesUserMention>,
}

impl TweetEntities {
    pub fn is_empty(&self) -> bool {
        self.medias.is_empty() && self.urls.is_empty() && self.user_mentions.is_empty()
    }
}

/// An image or video stored in a tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetEntitiesMedia {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetEntitiesUrl {
    pub display_url: String,
    pub expanded_url: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetEntitiesUserMention {
    pub user: String,
    pub user_id: i64,
}

/// Populated when the tweet is a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetReply {
    pub status_id: i64,
    pub user: String,
    pub user_id: i64,
}

/// Populated when the tweet is a retweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetRetweet {
    pub status_id: i64,
    pub user: String,
    pub user_id: i64,
}

/// Root document of the tweets snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TweetDb {
    #[serde(default)]
    pub tweets: Vec<Tweet>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_db_toml_omits_empty_fields() {
        let db = TweetDb {
            tweets: vec![Tweet {
                id: 124,
                text: "hello".to_string(),
                ..Tweet::default()
            }],
        };

        let content = toml::to_string_pretty(&db).unwrap();
        assert!(content.contains("id = 124"));
        assert!(!content.contains("favorite_count"));
        assert!(!content.contains("entities"));

        let loaded: TweetDb = toml::from_str(&content).unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn test_tweet_entities_is_empty() {
        let mut entities = TweetEntities::default();
        assert!(entities.is_empty());
        entities.user_mentions.push(TweetEntitiesUserMention {
            user: "brandur".to_string(),
            user_id: 1,
        });
        assert!(!entities.is_empty());
    }
}
