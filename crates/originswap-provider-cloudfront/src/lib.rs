// # CloudFront Distribution API
//
// This crate provides the Amazon CloudFront implementation of
// `DistributionApi` for originswap, on top of the AWS SDK for Rust.
//
// ## Behavior
//
// - ✅ One SDK operation per trait call (GetDistributionConfig,
//   UpdateDistribution, CreateInvalidation)
// - ✅ `If-Match` precondition on every config write
// - ✅ Typed error mapping (PreconditionFailed, InvalidIfMatchVersion,
//   NoSuchDistribution, AccessDenied), status-based fallback otherwise
// - ✅ Operation timeout configured (30 seconds)
// - ✅ Credentials from the default provider chain (environment, profile,
//   web identity, container and instance roles)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (SDK retries are disabled; a conflict or failure ends the run)
// - ❌ NO polling for invalidation completion
//
// ## Document Model
//
// The config is handled as the SDK's typed `DistributionConfig` wrapped in
// [`CloudFrontConfig`]. Only `Origins.Items[i].OriginPath` is ever changed;
// every other member is sent back exactly as it was deserialized.
//
// ## Security Requirements
//
// - Credentials are resolved and held by the SDK; this crate never sees them

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_cloudfront::config::http::HttpResponse;
use aws_sdk_cloudfront::config::retry::RetryConfig;
use aws_sdk_cloudfront::config::timeout::TimeoutConfig;
use aws_sdk_cloudfront::config::Region;
use aws_sdk_cloudfront::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudfront::operation::create_invalidation::CreateInvalidationError;
use aws_sdk_cloudfront::operation::get_distribution_config::GetDistributionConfigError;
use aws_sdk_cloudfront::operation::update_distribution::UpdateDistributionError;
use aws_sdk_cloudfront::types::{DistributionConfig, InvalidationBatch, Paths};
use aws_sdk_cloudfront::Client;
use originswap_core::document::VersionToken;
use originswap_core::invalidation::InvalidationRequest;
use originswap_core::traits::{
    DistributionApi, InvalidationResult, OriginDocument, UpdateResult, VersionedConfig,
};
use originswap_core::{Error, Result};

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudfront";

/// Default operation timeout (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Status CloudFront answers a successful config write with
const UPDATED_STATUS: u16 = 200;

/// Status CloudFront answers a created invalidation with
const CREATED_STATUS: u16 = 201;

/// A CloudFront distribution config as modelled by the SDK
#[derive(Debug, Clone, PartialEq)]
pub struct CloudFrontConfig(DistributionConfig);

impl CloudFrontConfig {
    /// Wrap an SDK config
    pub fn new(config: DistributionConfig) -> Self {
        Self(config)
    }

    /// The underlying SDK config
    pub fn as_sdk(&self) -> &DistributionConfig {
        &self.0
    }

    /// Unwrap into the SDK config
    pub fn into_sdk(self) -> DistributionConfig {
        self.0
    }
}

impl From<DistributionConfig> for CloudFrontConfig {
    fn from(config: DistributionConfig) -> Self {
        Self(config)
    }
}

impl OriginDocument for CloudFrontConfig {
    fn origin_count(&self) -> usize {
        self.0.origins().map_or(0, |origins| origins.items().len())
    }

    fn origin_path(&self, index: usize) -> Option<&str> {
        self.0
            .origins()?
            .items()
            .get(index)
            .map(|origin| origin.origin_path().unwrap_or(""))
    }

    fn set_origin_path(&mut self, index: usize, new_path: &str) -> Result<String> {
        let len = self.origin_count();
        let origin = self
            .0
            .origins
            .as_mut()
            .and_then(|origins| origins.items.get_mut(index))
            .ok_or_else(|| Error::index_out_of_range(index, len))?;

        Ok(origin
            .origin_path
            .replace(new_path.to_string())
            .unwrap_or_default())
    }
}

/// CloudFront distribution API
///
/// Stateless and single-shot: nothing is cached between calls and no call
/// is retried.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform the GetDistributionConfig call
/// - Log the intended UpdateDistribution and CreateInvalidation
/// - **NOT** change the distribution or create an invalidation
///
/// Results returned in dry-run mode carry `http_status` 0.
#[derive(Clone)]
pub struct CloudFrontProvider {
    /// SDK client
    client: Client,

    /// Dry-run mode: if true, read but skip the writes
    dry_run: bool,
}

impl fmt::Debug for CloudFrontProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudFrontProvider")
            .field("region", &self.client.config().region())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudFrontProvider {
    /// Create a provider from a loaded SDK configuration
    ///
    /// `region` overrides the region of `sdk_config`. CloudFront is a global
    /// service; the region only selects the partition (global or China).
    pub fn new(sdk_config: &aws_config::SdkConfig, region: &str, dry_run: bool) -> Self {
        let timeout = TimeoutConfig::builder()
            .operation_timeout(DEFAULT_OPERATION_TIMEOUT)
            .build();

        let builder = aws_sdk_cloudfront::config::Builder::from(sdk_config)
            .region(Region::new(region.to_string()))
            .timeout_config(timeout)
            .retry_config(RetryConfig::disabled());

        Self::from_client(Client::from_conf(builder.build()), dry_run)
    }

    /// Load the SDK configuration from the environment and create a provider
    ///
    /// Credentials come from the default provider chain. Nothing is resolved
    /// until the first request.
    pub async fn from_env(region: &str, dry_run: bool) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(&sdk_config, region, dry_run)
    }

    /// Create a provider from an existing client
    pub fn from_client(client: Client, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl DistributionApi for CloudFrontProvider {
    type Config = CloudFrontConfig;

    /// Fetch the distribution config and its ETag
    async fn get_config(&self, distribution_id: &str) -> Result<VersionedConfig<CloudFrontConfig>> {
        let output = self
            .client
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, distribution_id, known_read_error))?;

        let etag = output
            .e_tag()
            .filter(|etag| !etag.is_empty())
            .map(VersionToken::new)
            .ok_or_else(|| Error::provider(PROVIDER, "Invalid response: ETag is missing"))?;
        let config = output.distribution_config().cloned().ok_or_else(|| {
            Error::malformed(format!("{}: response has no DistributionConfig", distribution_id))
        })?;

        Ok(VersionedConfig {
            config: CloudFrontConfig(config),
            etag,
        })
    }

    /// Store the config, conditioned on `if_match`
    async fn update_config(
        &self,
        distribution_id: &str,
        config: &CloudFrontConfig,
        if_match: &VersionToken,
    ) -> Result<UpdateResult> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would update distribution {} with If-Match {} ({} origin(s))",
                distribution_id,
                if_match,
                config.origin_count()
            );
            return Ok(UpdateResult {
                etag: if_match.clone(),
                http_status: 0,
            });
        }

        let output = self
            .client
            .update_distribution()
            .id(distribution_id)
            .if_match(if_match.as_str())
            .distribution_config(config.0.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, distribution_id, known_update_error))?;

        let etag = output
            .e_tag()
            .filter(|etag| !etag.is_empty())
            .map(VersionToken::new)
            .ok_or_else(|| Error::provider(PROVIDER, "Invalid response: ETag is missing"))?;
        tracing::debug!("Distribution {} now at version {}", distribution_id, etag);

        Ok(UpdateResult {
            etag,
            http_status: UPDATED_STATUS,
        })
    }

    /// Create an invalidation
    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationResult> {
        let batch = invalidation_batch(request)?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would invalidate {:?} on {} (caller reference {})",
                request.paths,
                request.distribution_id,
                request.caller_reference
            );
            return Ok(InvalidationResult {
                invalidation_id: "DRY-RUN".to_string(),
                status: "Skipped".to_string(),
                http_status: 0,
            });
        }

        let output = self
            .client
            .create_invalidation()
            .distribution_id(&request.distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &request.distribution_id, known_invalidation_error))?;

        let invalidation = output.invalidation().ok_or_else(|| {
            Error::provider(PROVIDER, "Invalid response format: Invalidation is missing")
        })?;

        Ok(InvalidationResult {
            invalidation_id: invalidation.id().to_string(),
            status: invalidation.status().to_string(),
            http_status: CREATED_STATUS,
        })
    }

    fn api_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Build the SDK invalidation batch for a request
fn invalidation_batch(request: &InvalidationRequest) -> Result<InvalidationBatch> {
    let quantity = i32::try_from(request.quantity())
        .map_err(|_| Error::provider(PROVIDER, "Too many invalidation paths"))?;
    let paths = Paths::builder()
        .quantity(quantity)
        .set_items(Some(request.paths.clone()))
        .build()
        .map_err(|e| Error::provider(PROVIDER, format!("Invalid invalidation paths: {}", e)))?;

    InvalidationBatch::builder()
        .paths(paths)
        .caller_reference(request.caller_reference.as_str())
        .build()
        .map_err(|e| Error::provider(PROVIDER, format!("Invalid invalidation batch: {}", e)))
}

/// Modeled service errors with a fixed meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownError {
    VersionConflict,
    NotFound,
    AccessDenied,
}

fn known_read_error(err: &GetDistributionConfigError) -> Option<KnownError> {
    match err {
        GetDistributionConfigError::NoSuchDistribution(_) => Some(KnownError::NotFound),
        GetDistributionConfigError::AccessDenied(_) => Some(KnownError::AccessDenied),
        _ => None,
    }
}

fn known_update_error(err: &UpdateDistributionError) -> Option<KnownError> {
    match err {
        UpdateDistributionError::PreconditionFailed(_)
        | UpdateDistributionError::InvalidIfMatchVersion(_) => Some(KnownError::VersionConflict),
        UpdateDistributionError::NoSuchDistribution(_) => Some(KnownError::NotFound),
        UpdateDistributionError::AccessDenied(_) => Some(KnownError::AccessDenied),
        _ => None,
    }
}

fn known_invalidation_error(err: &CreateInvalidationError) -> Option<KnownError> {
    match err {
        CreateInvalidationError::NoSuchDistribution(_) => Some(KnownError::NotFound),
        CreateInvalidationError::AccessDenied(_) => Some(KnownError::AccessDenied),
        _ => None,
    }
}

/// Map an SDK failure to the error taxonomy
///
/// Modeled service errors are classified by variant; anything else falls back
/// to the HTTP status and error code.
fn map_sdk_error<E>(
    err: SdkError<E, HttpResponse>,
    distribution_id: &str,
    known: fn(&E) -> Option<KnownError>,
) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let source = service_err.err();
            let status = service_err.raw().status().as_u16();
            let message = source
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(source).to_string());

            match known(source) {
                Some(kind) => known_error(kind, status, &message, distribution_id),
                None => map_error_response(
                    status,
                    source.code().unwrap_or_default(),
                    &message,
                    distribution_id,
                ),
            }
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            Error::transient(format!("CloudFront request failed: {}", DisplayErrorContext(&err)))
        }
        _ => Error::provider(PROVIDER, DisplayErrorContext(&err).to_string()),
    }
}

fn known_error(kind: KnownError, status: u16, message: &str, distribution_id: &str) -> Error {
    match kind {
        KnownError::VersionConflict => Error::version_conflict(format!(
            "{} changed since it was read: {} (status {})",
            distribution_id, message, status
        )),
        KnownError::NotFound => {
            Error::not_found(format!("{}: {} (status {})", distribution_id, message, status))
        }
        KnownError::AccessDenied => Error::auth(format!(
            "Invalid credentials or insufficient permissions: {} (status {})",
            message, status
        )),
    }
}

/// Map an unmodeled error response by status and AWS error code
fn map_error_response(status: u16, code: &str, message: &str, distribution_id: &str) -> Error {
    match (status, code) {
        (412, _) | (_, "PreconditionFailed") | (_, "InvalidIfMatchVersion") => {
            known_error(KnownError::VersionConflict, status, message, distribution_id)
        }
        (404, _) | (_, "NoSuchDistribution") => {
            known_error(KnownError::NotFound, status, message, distribution_id)
        }
        (401 | 403, _)
        | (_, "AccessDenied")
        | (_, "InvalidClientTokenId")
        | (_, "SignatureDoesNotMatch")
        | (_, "ExpiredToken") => known_error(KnownError::AccessDenied, status, message, distribution_id),
        (429, _) | (500..=599, _) | (_, "Throttling") => Error::transient(format!(
            "CloudFront unavailable or throttling: {} (status {})",
            message, status
        )),
        _ => Error::provider(
            PROVIDER,
            format!("Request failed: {} {} - {}", status, code, message),
        ),
    }
}
