//! Minimal embedding example for originswap-core
//!
//! Runs a swap against the in-memory distribution API, then shows what a
//! competing writer holding a stale version token gets back.

use originswap_core::{
    DistributionApi, Error, MemoryDistributionApi, OriginSwap, Result, SwapConfig, SwapError,
};

const DISTRIBUTION_ID: &str = "E1EMBEDDED0001";

const INITIAL_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DistributionConfig xmlns="http://cloudfront.amazonaws.com/doc/2020-05-31/">
  <CallerReference>embedded-site</CallerReference>
  <Origins>
    <Quantity>2</Quantity>
    <Items>
      <Origin>
        <Id>site</Id>
        <DomainName>site-bucket.s3.amazonaws.com</DomainName>
        <OriginPath>/releases/v1</OriginPath>
      </Origin>
      <Origin>
        <Id>assets</Id>
        <DomainName>assets-bucket.s3.amazonaws.com</DomainName>
        <OriginPath>/static</OriginPath>
      </Origin>
    </Items>
  </Origins>
  <Comment>embedded example</Comment>
  <Enabled>true</Enabled>
</DistributionConfig>"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded originswap-core Example ===\n");

    let api = MemoryDistributionApi::new();
    let etag = api.insert(DISTRIBUTION_ID, INITIAL_CONFIG).await?;
    println!("Seeded {} at version {}", DISTRIBUTION_ID, etag);

    // A second reader observes the same version before the swap
    let stale = api.get_config(DISTRIBUTION_ID).await?;

    // The swap itself: origin 0 moves to the new release
    let swap = OriginSwap::new(
        api.clone(),
        SwapConfig::new(DISTRIBUTION_ID, "/releases/v2"),
    )?;

    match swap.run().await {
        Ok(report) => println!(
            "Swapped '{}' -> '{}' (invalidation {})",
            report.mutation.previous_path,
            report.mutation.new_path,
            report.invalidation.invalidation_id
        ),
        Err(SwapError::Invalidation { outcome, source }) => {
            println!("Updated to '{}' but not invalidated: {}", outcome.new_path, source);
        }
        Err(SwapError::Mutation(e)) => return Err(e),
    }

    // The competing writer presents its stale token and loses
    let mut competing = stale.config;
    competing.set_origin_path(0, "/releases/hotfix")?;
    match api
        .update_config(DISTRIBUTION_ID, &competing, &stale.etag)
        .await
    {
        Err(Error::VersionConflict(msg)) => println!("Competing write rejected: {}", msg),
        Err(e) => return Err(e),
        Ok(_) => println!("Competing write unexpectedly accepted"),
    }

    if let Some(config) = api.config(DISTRIBUTION_ID).await {
        for (i, origin) in config.origins().iter().enumerate() {
            println!(
                "Origin {} ({}): {}",
                i,
                origin.id.as_deref().unwrap_or("-"),
                origin.origin_path
            );
        }
    }
    println!(
        "Calls: {} read(s), {} write(s), {} invalidation(s)",
        api.read_count(),
        api.write_count(),
        api.invalidation_count()
    );

    Ok(())
}
