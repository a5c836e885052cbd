//! Core traits for the origin swap system
//!
//! This module defines the abstract interface that every remote backend must
//! follow.
//!
//! - [`DistributionApi`]: Read, conditionally write and invalidate a distribution
//! - [`OriginDocument`]: The origin list inside a configuration document

pub mod distribution_api;
pub mod origin_document;

pub use distribution_api::{DistributionApi, InvalidationResult, UpdateResult, VersionedConfig};
pub use origin_document::OriginDocument;
