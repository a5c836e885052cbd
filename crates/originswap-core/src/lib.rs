// # originswap-core
//
// Core library for swapping the origin path of a CloudFront distribution.
//
// ## Architecture Overview
//
// A run is a strict two-step pipeline against a versioned remote resource:
// - **DistributionApi**: Trait for the three remote exchanges (read config,
//   conditional write, create invalidation), generic over its document model
// - **OriginDocument**: Trait for the origin list inside a config document
// - **ConfigMutator**: Read-modify-write of one origin's path under an
//   `If-Match` version precondition
// - **InvalidationRequester**: Fire-and-forget `/*` invalidation with a unique
//   caller reference
// - **OriginSwap**: Runs the two steps in order and reports which step failed
// - **MemoryDistributionApi**: In-process versioned store (tests, embedding)
//
// ## Design Principles
//
// 1. **Explicit configuration**: Components receive a `SwapConfig`; nothing in
//    this crate reads the environment
// 2. **Single-shot**: One read, one write, one invalidation. No retry loops
// 3. **Remote-owned concurrency**: The version token is the only guard against
//    concurrent writers
// 4. **Library-first**: The binary is a thin wrapper over this crate

pub mod config;
pub mod document;
pub mod error;
pub mod invalidation;
pub mod memory;
pub mod mutator;
pub mod pipeline;
pub mod traits;

// Re-export core types for convenience
pub use config::{SwapConfig, SwapInputs};
pub use document::{DistributionConfig, VersionToken};
pub use error::{Error, Result};
pub use invalidation::{CallerReference, InvalidationRequest, InvalidationRequester};
pub use memory::MemoryDistributionApi;
pub use mutator::{ConfigMutator, MutationOutcome};
pub use pipeline::{OriginSwap, SwapError, SwapReport, SwapStep};
pub use traits::{
    DistributionApi, InvalidationResult, OriginDocument, UpdateResult, VersionedConfig,
};
