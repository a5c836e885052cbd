//! Test doubles and common utilities for pipeline contract tests
//!
//! [`ScriptedApi`] wraps a [`MemoryDistributionApi`] so tests can record the
//! order of remote calls, inject a failure into one of them, and hold reads at
//! a barrier to force concurrent runs onto the same version token.

#![allow(dead_code)]

use async_trait::async_trait;
use originswap_core::document::{DistributionConfig, VersionToken};
use originswap_core::error::{Error, Result};
use originswap_core::invalidation::InvalidationRequest;
use originswap_core::traits::{
    DistributionApi, InvalidationResult, UpdateResult, VersionedConfig,
};
use originswap_core::MemoryDistributionApi;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Distribution id used throughout the tests
pub const DIST_ID: &str = "E2EXAMPLE1234";

/// Build a DistributionConfig document with one origin per path
pub fn config_xml(paths: &[&str]) -> String {
    let mut items = String::new();
    for (i, path) in paths.iter().enumerate() {
        items.push_str(&format!(
            "      <Origin>\n\
             \x20       <Id>origin-{i}</Id>\n\
             \x20       <DomainName>bucket-{i}.s3.amazonaws.com</DomainName>\n\
             \x20       <OriginPath>{path}</OriginPath>\n\
             \x20       <CustomHeaders><Quantity>0</Quantity></CustomHeaders>\n\
             \x20       <S3OriginConfig><OriginAccessIdentity></OriginAccessIdentity></S3OriginConfig>\n\
             \x20     </Origin>\n"
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <DistributionConfig xmlns=\"http://cloudfront.amazonaws.com/doc/2020-05-31/\">\n\
         \x20 <CallerReference>site-deploy</CallerReference>\n\
         \x20 <Origins>\n\
         \x20   <Quantity>{}</Quantity>\n\
         \x20   <Items>\n\
         {items}\
         \x20   </Items>\n\
         \x20 </Origins>\n\
         \x20 <DefaultCacheBehavior><TargetOriginId>origin-0</TargetOriginId></DefaultCacheBehavior>\n\
         \x20 <Comment>deploys &amp; previews</Comment>\n\
         \x20 <Enabled>true</Enabled>\n\
         </DistributionConfig>",
        paths.len()
    )
}

/// Create a memory API holding one distribution with the given origin paths
pub async fn api_with_origins(paths: &[&str]) -> MemoryDistributionApi {
    let api = MemoryDistributionApi::new();
    api.insert(DIST_ID, config_xml(paths))
        .await
        .expect("test document parses");
    api
}

/// A remote call observed by [`ScriptedApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    GetConfig,
    UpdateConfig,
    CreateInvalidation,
}

/// A DistributionApi wrapper that records calls and injects faults
#[derive(Clone)]
pub struct ScriptedApi {
    inner: MemoryDistributionApi,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on: Option<Call>,
    read_barrier: Option<Arc<Barrier>>,
}

impl ScriptedApi {
    pub fn new(inner: MemoryDistributionApi) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            read_barrier: None,
        }
    }

    /// Fail the given call with a transport error (without reaching the store)
    pub fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Wait at `barrier` after every successful read
    pub fn with_read_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.read_barrier = Some(barrier);
        self
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(call) {
            return Err(Error::transient(format!("injected failure on {:?}", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl DistributionApi for ScriptedApi {
    type Config = DistributionConfig;

    async fn get_config(&self, distribution_id: &str) -> Result<VersionedConfig> {
        self.record(Call::GetConfig)?;
        let config = self.inner.get_config(distribution_id).await?;
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(config)
    }

    async fn update_config(
        &self,
        distribution_id: &str,
        config: &DistributionConfig,
        if_match: &VersionToken,
    ) -> Result<UpdateResult> {
        self.record(Call::UpdateConfig)?;
        self.inner.update_config(distribution_id, config, if_match).await
    }

    async fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationResult> {
        self.record(Call::CreateInvalidation)?;
        self.inner.create_invalidation(request).await
    }

    fn api_name(&self) -> &'static str {
        "scripted"
    }
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged at the given level
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().any(|word| word == level))
            .map(str::to_string)
            .collect()
    }

    /// A subscriber that writes every event into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || sink.clone())
            .finish()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
