use qself_models::{Reading, Tweet};

/// Records with an integer identity that is stable across fetches. Two
/// records with the same ID are the same entity seen at different times.
pub trait RecordId {
    fn record_id(&self) -> i64;
}

impl RecordId for Reading {
    fn record_id(&self) -> i64 {
        self.review_id
    }
}

impl RecordId for Tweet {
    fn record_id(&self) -> i64 {
        self.id
    }
}
