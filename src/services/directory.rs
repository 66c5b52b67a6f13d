//! Trait for resolving which stations a run should poll.

use crate::error::DirectoryError;
use crate::model::Station;

/// Source of the station list for a monitoring group.
#[async_trait::async_trait]
pub trait StationDirectory: Send + Sync {
    /// Returns station identifiers in the order the upstream lists them.
    async fn list_stations(&self) -> Result<Vec<Station>, DirectoryError>;
}

#[async_trait::async_trait]
impl<T: StationDirectory + ?Sized> StationDirectory for &T {
    async fn list_stations(&self) -> Result<Vec<Station>, DirectoryError> {
        (**self).list_stations().await
    }
}
