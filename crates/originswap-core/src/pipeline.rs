//! The two-step origin swap pipeline
//!
//! ## Flow
//!
//! ```text
//! ┌───────────────┐  ok   ┌───────────────────────┐  ok
//! │ ConfigMutator │──────►│ InvalidationRequester │──────► SwapReport
//! └───────────────┘       └───────────────────────┘
//!         │ err                       │ err
//!         ▼                           ▼
//! SwapError::Mutation       SwapError::Invalidation
//! (nothing changed)         (updated, not yet invalidated)
//! ```
//!
//! Steps run strictly in order, each remote call awaited before the next.
//! A failed mutation never reaches the invalidation step, and a failed
//! invalidation is not compensated: the distribution stays updated.
//!
//! Failures are returned, not logged. Reporting them is up to the caller.

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::config::SwapConfig;
use crate::error::{Error, Result};
use crate::invalidation::InvalidationRequester;
use crate::mutator::{ConfigMutator, MutationOutcome};
use crate::traits::{DistributionApi, InvalidationResult};

/// Pipeline step, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStep {
    /// Read, validate, mutate and conditionally write the config
    Mutation,
    /// Request the full cache invalidation
    Invalidation,
}

impl fmt::Display for SwapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStep::Mutation => f.write_str("origin update"),
            SwapStep::Invalidation => f.write_str("cache invalidation"),
        }
    }
}

/// Failure of a pipeline run, tagged with the step that failed
#[derive(Error, Debug)]
pub enum SwapError {
    /// The configuration was not changed (or the write was rejected)
    #[error(transparent)]
    Mutation(Error),

    /// The configuration was updated but the invalidation request failed
    #[error(
        "origin path updated to {} (etag {}) but invalidation failed: {source}",
        .outcome.new_path,
        .outcome.update.etag
    )]
    Invalidation {
        /// The mutation that did go through
        outcome: MutationOutcome,
        /// Why the invalidation failed
        #[source]
        source: Error,
    },
}

impl SwapError {
    /// The step that failed
    pub fn step(&self) -> SwapStep {
        match self {
            SwapError::Mutation(_) => SwapStep::Mutation,
            SwapError::Invalidation { .. } => SwapStep::Invalidation,
        }
    }

    /// The underlying error
    pub fn error(&self) -> &Error {
        match self {
            SwapError::Mutation(err) => err,
            SwapError::Invalidation { source, .. } => source,
        }
    }

    /// Whether the remote configuration was changed before the failure
    pub fn is_partial(&self) -> bool {
        matches!(self, SwapError::Invalidation { .. })
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReport {
    /// Target distribution
    pub distribution_id: String,
    /// Mutated origin index
    pub origin_index: usize,
    /// Result of the configuration write
    pub mutation: MutationOutcome,
    /// Acknowledgement of the invalidation request
    pub invalidation: InvalidationResult,
}

/// Runs one origin swap against a distribution API
///
/// ## Lifecycle
///
/// 1. Create with [`OriginSwap::new()`] (validates the configuration)
/// 2. Call [`OriginSwap::run()`] once per swap
pub struct OriginSwap<A: DistributionApi> {
    /// Remote backend
    api: A,

    /// What to swap
    config: SwapConfig,
}

impl<A: DistributionApi> OriginSwap<A> {
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the configuration is incomplete.
    pub fn new(api: A, config: SwapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { api, config })
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// The backend this pipeline runs against
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run the swap: mutate the origin, then request a full invalidation
    ///
    /// # Returns
    ///
    /// - `Ok(SwapReport)`: both steps succeeded
    /// - `Err(SwapError::Mutation)`: nothing was changed remotely
    /// - `Err(SwapError::Invalidation)`: updated but not yet invalidated
    pub async fn run(&self) -> std::result::Result<SwapReport, SwapError> {
        let SwapConfig {
            distribution_id,
            origin_path,
            origin_index,
            ..
        } = &self.config;

        let outcome = ConfigMutator::new(&self.api)
            .mutate_origin(distribution_id, *origin_index, origin_path)
            .await
            .map_err(SwapError::Mutation)?;

        info!(
            "Origin {} of {} switched from '{}' to '{}'",
            origin_index, distribution_id, outcome.previous_path, outcome.new_path
        );

        let invalidation = match InvalidationRequester::new(&self.api)
            .request_full_invalidation(distribution_id)
            .await
        {
            Ok(result) => result,
            Err(source) => return Err(SwapError::Invalidation { outcome, source }),
        };

        info!("End of the job..");
        Ok(SwapReport {
            distribution_id: distribution_id.clone(),
            origin_index: *origin_index,
            mutation: outcome,
            invalidation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VersionToken;
    use crate::memory::MemoryDistributionApi;
    use crate::traits::UpdateResult;

    #[test]
    fn new_rejects_invalid_config() {
        let result = OriginSwap::new(MemoryDistributionApi::new(), SwapConfig::new("", "/v2"));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn swap_error_reports_step() {
        let mutation = SwapError::Mutation(Error::version_conflict("stale"));
        assert_eq!(mutation.step(), SwapStep::Mutation);
        assert!(!mutation.is_partial());
        assert_eq!(mutation.to_string(), "Version conflict: stale");

        let partial = SwapError::Invalidation {
            outcome: MutationOutcome {
                previous_path: "/v1".to_string(),
                new_path: "/v2".to_string(),
                update: UpdateResult {
                    etag: VersionToken::new("E2"),
                    http_status: 200,
                },
            },
            source: Error::transient("connection reset"),
        };
        assert_eq!(partial.step(), SwapStep::Invalidation);
        assert!(partial.is_partial());
        assert!(matches!(partial.error(), Error::TransientNetwork(_)));
        assert_eq!(
            partial.to_string(),
            "origin path updated to /v2 (etag E2) but invalidation failed: \
             Transient network error: connection reset"
        );
    }
}
