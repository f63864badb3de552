pub mod error;
pub mod goodreads;
pub mod traits;
pub mod twitter;

pub use error::SourceError;
pub use goodreads::GoodreadsClient;
pub use traits::RecordSource;
pub use twitter::TwitterClient;
