pub mod reading;
pub mod tweet;

pub use reading::{Reading, ReadingAuthor, ReadingDb};
pub use tweet::{
    Tweet, TweetDb, TweetEntities, TweetEntitiesMedia, TweetEntitiesUrl, TweetEntitiesUserMention,
    TweetReply, TweetRetweet,
};
