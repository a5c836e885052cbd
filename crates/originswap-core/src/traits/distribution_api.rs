// # Distribution API Trait
//
// Defines the interface for the three remote exchanges a swap needs.
//
// ## Implementations
//
// - CloudFront: `originswap-provider-cloudfront` crate (SDK document model)
// - In-memory: [`crate::memory::MemoryDistributionApi`] (raw XML document)
//
// ## Usage
//
// ```rust,ignore
// use originswap_core::{DistributionApi, OriginDocument, VersionedConfig};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* DistributionApi implementation */;
//
//     let VersionedConfig { mut config, etag } = api.get_config("E1ABCDEF").await?;
//     config.set_origin_path(0, "/v2")?;
//     api.update_config("E1ABCDEF", &config, &etag).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::document::{DistributionConfig, VersionToken};
use crate::invalidation::InvalidationRequest;
use crate::traits::OriginDocument;

/// A configuration together with the version token it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedConfig<C = DistributionConfig> {
    /// The configuration document
    pub config: C,
    /// Token to present on the conditional write
    pub etag: VersionToken,
}

/// Result of an accepted configuration write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Version token of the newly stored configuration
    pub etag: VersionToken,
    /// HTTP status of the write response
    pub http_status: u16,
}

/// Acknowledgement of an invalidation request
///
/// This is "request accepted", not "content invalidated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Remote identifier of the invalidation
    pub invalidation_id: String,
    /// Status reported at creation time (typically `InProgress`)
    pub status: String,
    /// HTTP status of the create response
    pub http_status: u16,
}

/// Trait for distribution API implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// Each method performs exactly one remote exchange:
/// - No retry or backoff. Errors go straight back to the caller
/// - No caching of documents or tokens between calls
/// - No spawned tasks
///
/// The version precondition on [`DistributionApi::update_config`] is the only
/// mechanism protecting against concurrent writers, so implementations must
/// never drop or weaken it.
#[async_trait]
pub trait DistributionApi: Send + Sync {
    /// Document model the backend reads and writes
    type Config: OriginDocument;

    /// Fetch the current configuration and its version token
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: the distribution does not exist
    /// - `Error::TransientNetwork`: transport failure
    async fn get_config(
        &self,
        distribution_id: &str,
    ) -> Result<VersionedConfig<Self::Config>, crate::Error>;

    /// Store `config`, conditioned on the remote still holding `if_match`
    ///
    /// # Errors
    ///
    /// - `Error::VersionConflict`: the remote version differs from `if_match`
    /// - `Error::NotFound`: the distribution does not exist
    /// - `Error::TransientNetwork`: transport failure
    async fn update_config(
        &self,
        distribution_id: &str,
        config: &Self::Config,
        if_match: &VersionToken,
    ) -> Result<UpdateResult, crate::Error>;

    /// Submit an invalidation request
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: the distribution does not exist
    /// - `Error::TransientNetwork`: transport failure
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationResult, crate::Error>;

    /// Get the API name (for logging/debugging)
    fn api_name(&self) -> &'static str;
}
