//! Publishing port
//!
//! A publisher creates or updates the durable location for one artifact and
//! reports its address. Implementations live in `infrastructure::publish`.

pub mod errors;
pub mod types;

pub use errors::PublishError;
pub use types::*;

use async_trait::async_trait;

/// Creates or updates the location named by a destination key
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `artifact` at `destination`.
    ///
    /// Idempotent by key: publishing again replaces the previous content and
    /// returns the same location.
    async fn publish(
        &self,
        artifact: &PublishArtifact,
        destination: &DestinationKey,
    ) -> Result<RepoLocation, PublishError>;
}
