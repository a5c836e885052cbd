// # Memory Distribution API
//
// In-memory implementation of DistributionApi.
//
// ## Purpose
//
// Behaves like the remote service as far as the swap protocol can observe:
// - Every accepted write produces a fresh version token
// - A write presenting any other token is rejected with `VersionConflict`
// - Unknown distributions give `NotFound`
// - Invalidations are recorded, and resubmitting a caller reference returns
//   the invalidation it created the first time
//
// ## When to Use
//
// - Tests of the swap pipeline
// - Embedding the library without network access
// - Dry runs against a captured config document

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::document::{DistributionConfig, VersionToken};
use crate::invalidation::InvalidationRequest;
use crate::traits::{DistributionApi, InvalidationResult, UpdateResult, VersionedConfig};

#[derive(Debug)]
struct StoredDistribution {
    config: DistributionConfig,
    etag: VersionToken,
    invalidations: Vec<(InvalidationRequest, InvalidationResult)>,
}

#[derive(Debug, Default)]
struct Store {
    distributions: HashMap<String, StoredDistribution>,
    next_version: u64,
    next_invalidation: u64,
}

impl Store {
    fn next_etag(&mut self) -> VersionToken {
        self.next_version += 1;
        VersionToken::new(format!("E{:012X}", self.next_version))
    }
}

/// In-memory, versioned distribution API
///
/// Cloning shares the underlying store and call counters.
///
/// # Example
///
/// ```rust,no_run
/// use originswap_core::{DistributionApi, MemoryDistributionApi};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = MemoryDistributionApi::new();
///     api.insert(
///         "E1ABC",
///         "<DistributionConfig><Origins><Items><Origin>\
///          <OriginPath>/v1</OriginPath></Origin></Items></Origins></DistributionConfig>",
///     )
///     .await?;
///
///     let current = api.get_config("E1ABC").await?;
///     assert_eq!(current.config.origin_path(0), Some("/v1"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDistributionApi {
    inner: Arc<RwLock<Store>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    invalidation_calls: Arc<AtomicUsize>,
}

impl MemoryDistributionApi {
    /// Create an empty API
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a distribution, returning its version token
    pub async fn insert(
        &self,
        distribution_id: impl Into<String>,
        xml: impl Into<String>,
    ) -> Result<VersionToken, Error> {
        let config = DistributionConfig::from_xml(xml)?;
        let mut store = self.inner.write().await;
        let etag = store.next_etag();
        store.distributions.insert(
            distribution_id.into(),
            StoredDistribution {
                config,
                etag: etag.clone(),
                invalidations: Vec::new(),
            },
        );
        Ok(etag)
    }

    /// Current stored configuration of a distribution
    pub async fn config(&self, distribution_id: &str) -> Option<DistributionConfig> {
        let store = self.inner.read().await;
        store
            .distributions
            .get(distribution_id)
            .map(|d| d.config.clone())
    }

    /// Current version token of a distribution
    pub async fn etag(&self, distribution_id: &str) -> Option<VersionToken> {
        let store = self.inner.read().await;
        store
            .distributions
            .get(distribution_id)
            .map(|d| d.etag.clone())
    }

    /// Invalidation requests accepted for a distribution, oldest first
    pub async fn invalidations(&self, distribution_id: &str) -> Vec<InvalidationRequest> {
        let store = self.inner.read().await;
        store
            .distributions
            .get(distribution_id)
            .map(|d| d.invalidations.iter().map(|(req, _)| req.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of `get_config` calls made
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `update_config` calls made, accepted or not
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `create_invalidation` calls made, accepted or not
    pub fn invalidation_count(&self) -> usize {
        self.invalidation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistributionApi for MemoryDistributionApi {
    type Config = DistributionConfig;

    async fn get_config(&self, distribution_id: &str) -> Result<VersionedConfig, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let store = self.inner.read().await;
        let stored = store
            .distributions
            .get(distribution_id)
            .ok_or_else(|| Error::not_found(distribution_id))?;

        Ok(VersionedConfig {
            config: stored.config.clone(),
            etag: stored.etag.clone(),
        })
    }

    async fn update_config(
        &self,
        distribution_id: &str,
        config: &DistributionConfig,
        if_match: &VersionToken,
    ) -> Result<UpdateResult, Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut store = self.inner.write().await;
        let etag = store.next_etag();
        let stored = store
            .distributions
            .get_mut(distribution_id)
            .ok_or_else(|| Error::not_found(distribution_id))?;

        if stored.etag != *if_match {
            return Err(Error::version_conflict(format!(
                "If-Match {} does not match current version {} of {}",
                if_match, stored.etag, distribution_id
            )));
        }

        stored.config = config.clone();
        stored.etag = etag.clone();
        Ok(UpdateResult {
            etag,
            http_status: 200,
        })
    }

    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationResult, Error> {
        self.invalidation_calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.inner.write().await;
        store.next_invalidation += 1;
        let invalidation_id = format!("I{:012X}", store.next_invalidation);

        let stored = store
            .distributions
            .get_mut(&request.distribution_id)
            .ok_or_else(|| Error::not_found(request.distribution_id.as_str()))?;

        if let Some((_, existing)) = stored
            .invalidations
            .iter()
            .find(|(req, _)| req.caller_reference == request.caller_reference)
        {
            return Ok(existing.clone());
        }

        let result = InvalidationResult {
            invalidation_id,
            status: "InProgress".to_string(),
            http_status: 201,
        };
        stored.invalidations.push((request.clone(), result.clone()));
        Ok(result)
    }

    fn api_name(&self) -> &'static str {
        "memory"
    }
}
