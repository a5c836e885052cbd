//! Read-modify-write of a single origin path
//!
//! ## Protocol
//!
//! ```text
//! get_config ──► check index ──► rewrite OriginPath ──► update_config(If-Match: etag)
//!     │               │                                        │
//!  NotFound     IndexOutOfRange                         VersionConflict
//! ```
//!
//! The version token observed on read is the one presented on write. A
//! conflict means another writer got there first; it is returned as-is and
//! never retried here.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::{DistributionApi, OriginDocument, UpdateResult, VersionedConfig};

/// Outcome of a successful origin mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Origin path before the write
    pub previous_path: String,
    /// Origin path now stored remotely
    pub new_path: String,
    /// Write acknowledgement
    pub update: UpdateResult,
}

/// Mutates one origin's path under optimistic concurrency control
pub struct ConfigMutator<'a, A: DistributionApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: DistributionApi + ?Sized> ConfigMutator<'a, A> {
    /// Create a mutator over a distribution API
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Set `OriginList[origin_index].OriginPath = new_path` on a distribution
    ///
    /// Performs exactly one read and, if the index is valid, exactly one
    /// conditional write. Nothing but the targeted origin path changes.
    ///
    /// # Errors
    ///
    /// - `Error::Validation`: empty distribution id or path (no remote call made)
    /// - `Error::NotFound`: unknown distribution
    /// - `Error::IndexOutOfRange`: no origin at `origin_index` (no write made)
    /// - `Error::VersionConflict`: the config changed between read and write
    /// - `Error::TransientNetwork`: transport failure on read or write
    pub async fn mutate_origin(
        &self,
        distribution_id: &str,
        origin_index: usize,
        new_path: &str,
    ) -> Result<MutationOutcome> {
        let mut problems = Vec::new();
        if distribution_id.is_empty() {
            problems.push("AWS_DISTRIBUTION_ID is required".to_string());
        }
        if new_path.is_empty() {
            problems.push("ORIGIN_PATH is required".to_string());
        }
        if !problems.is_empty() {
            return Err(Error::validation(problems));
        }

        let VersionedConfig { mut config, etag } = self.api.get_config(distribution_id).await?;
        debug!(
            "Fetched config for {} via {} (etag {}, {} origin(s))",
            distribution_id,
            self.api.api_name(),
            etag,
            config.origin_count()
        );

        if origin_index >= config.origin_count() {
            return Err(Error::index_out_of_range(origin_index, config.origin_count()));
        }

        let previous_path = config.set_origin_path(origin_index, new_path)?;
        debug!("Current OriginPath: {}", previous_path);
        debug!("New OriginPath: {}", new_path);

        info!("Updating Distribution OriginPath of index {}...", origin_index);
        let update = self.api.update_config(distribution_id, &config, &etag).await?;
        debug!(
            "Update Distribution response statusCode: {} (new etag {})",
            update.http_status, update.etag
        );

        Ok(MutationOutcome {
            previous_path,
            new_path: new_path.to_string(),
            update,
        })
    }
}
