pub mod api;
pub mod client;

pub use api::sanitize_tweet_text;
pub use client::TwitterClient;
