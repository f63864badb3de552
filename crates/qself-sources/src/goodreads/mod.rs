pub mod api;
pub mod client;
pub mod sanitize;

pub use client::GoodreadsClient;
pub use sanitize::sanitize_review;
