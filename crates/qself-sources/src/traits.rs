use async_trait::async_trait;

use crate::SourceError;

/// A remote service that can enumerate one kind of record for the user.
///
/// Implementations return a batch with unique identifiers. Ordering is not
/// significant; the reconciliation step imposes its own.
#[async_trait]
pub trait RecordSource: Send + Sync {
    type Record: Send;

    fn source_name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Self::Record>, SourceError>;
}
