// # Origin Document Trait
//
// The part of a distribution configuration the swap touches: the ordered
// origin list and each origin's path. Everything else in the document is
// carried through unchanged by the implementation.
//
// ## Implementations
//
// - Raw XML document: [`crate::document::DistributionConfig`]
// - CloudFront SDK model: `originswap-provider-cloudfront` crate

use std::fmt;

use crate::error::Result;

/// A configuration document with an ordered list of origins
pub trait OriginDocument: Clone + fmt::Debug + Send + Sync + 'static {
    /// Number of origin entries
    fn origin_count(&self) -> usize;

    /// The origin path at `index`, if that origin exists
    ///
    /// An origin without a path reads as the empty path.
    fn origin_path(&self, index: usize) -> Option<&str>;

    /// Replace the origin path at `index`, returning the previous value
    ///
    /// # Errors
    ///
    /// - `Error::IndexOutOfRange` if `index` is not in `[0, origin_count())`
    fn set_origin_path(&mut self, index: usize, new_path: &str) -> Result<String>;
}
