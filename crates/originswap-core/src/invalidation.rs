//! Full-distribution cache invalidation
//!
//! After a successful configuration write, edge caches still hold content
//! fetched from the old origin path. [`InvalidationRequester`] asks the remote
//! to treat everything (`/*`) as stale. It is fire-and-forget: the result
//! acknowledges the request, it does not mean the edges are already clean.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::traits::{DistributionApi, InvalidationResult};

/// Path pattern covering every object in a distribution
pub const ALL_PATHS: &str = "/*";

/// Last timestamp handed out, in nanoseconds since the epoch
static LAST_ISSUED_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Caller-supplied unique value the remote uses to deduplicate submissions
///
/// Generated from the current UTC time at nanosecond resolution. Within one
/// process the generator is strictly monotonic, so two references generated
/// back to back never collide even when the clock has not advanced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerReference(String);

impl CallerReference {
    /// Generate a fresh reference from the current time
    pub fn generate() -> Self {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX - 1);
        let next = |last: i64| if now > last { now } else { last + 1 };

        let previous = LAST_ISSUED_NANOS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)))
            .unwrap_or_else(|last| last);
        let issued = next(previous);

        Self(
            DateTime::<Utc>::from_timestamp_nanos(issued)
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        )
    }

    /// Use a specific value (e.g. to resubmit an earlier request)
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw reference value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-shot invalidation request
///
/// Built fresh for every run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    /// Target distribution
    pub distribution_id: String,
    /// Path patterns to invalidate
    pub paths: Vec<String>,
    /// Deduplication token
    pub caller_reference: CallerReference,
}

impl InvalidationRequest {
    /// Build a request invalidating every path (`/*`) of a distribution
    pub fn full(distribution_id: impl Into<String>) -> Self {
        Self {
            distribution_id: distribution_id.into(),
            paths: vec![ALL_PATHS.to_string()],
            caller_reference: CallerReference::generate(),
        }
    }

    /// Number of path patterns (the wire format's `Quantity`)
    pub fn quantity(&self) -> usize {
        self.paths.len()
    }
}

/// Issues the post-swap cache invalidation
pub struct InvalidationRequester<'a, A: DistributionApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: DistributionApi + ?Sized> InvalidationRequester<'a, A> {
    /// Create a requester over a distribution API
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Request invalidation of every cached object of a distribution
    ///
    /// Must only be called after the configuration write succeeded. Makes
    /// exactly one remote call and does not wait for completion.
    ///
    /// # Errors
    ///
    /// - `Error::TransientNetwork`: transport failure
    /// - `Error::NotFound`: the distribution does not exist
    pub async fn request_full_invalidation(
        &self,
        distribution_id: &str,
    ) -> Result<InvalidationResult> {
        let request = InvalidationRequest::full(distribution_id);

        info!("Requesting distribution invalidation...");
        debug!(
            "Invalidation paths {:?} (caller reference {})",
            request.paths, request.caller_reference
        );

        let result = self.api.create_invalidation(&request).await?;

        debug!(
            "Invalidation response statusCode: {} (id: {}, status: {})",
            result.http_status, result.invalidation_id, result.status
        );
        Ok(result)
    }
}
