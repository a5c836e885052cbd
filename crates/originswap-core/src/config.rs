//! Configuration types for the origin swap system
//!
//! [`SwapInputs`] holds the raw, possibly-missing values a front end collected
//! (environment, CLI, action inputs). [`SwapInputs::resolve`] validates them
//! all at once and produces the [`SwapConfig`] the components run with.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Region used when none is given
pub const DEFAULT_REGION: &str = "us-east-1";

/// Validated configuration for one swap run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Target distribution identifier
    pub distribution_id: String,

    /// Origin path to install
    pub origin_path: String,

    /// Which origin entry to mutate
    #[serde(default)]
    pub origin_index: usize,

    /// Remote service region
    #[serde(default = "default_region")]
    pub region: String,
}

impl SwapConfig {
    /// Create a configuration for origin 0 in the default region
    pub fn new(distribution_id: impl Into<String>, origin_path: impl Into<String>) -> Self {
        Self {
            distribution_id: distribution_id.into(),
            origin_path: origin_path.into(),
            origin_index: 0,
            region: default_region(),
        }
    }

    /// Set the origin index
    pub fn with_origin_index(mut self, origin_index: usize) -> Self {
        self.origin_index = origin_index;
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Validate the configuration
    ///
    /// All problems are collected into a single `Error::Validation`.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.distribution_id.trim().is_empty() {
            problems.push("AWS_DISTRIBUTION_ID is required".to_string());
        }
        if self.origin_path.is_empty() {
            problems.push("ORIGIN_PATH is required".to_string());
        }
        if self.region.trim().is_empty() {
            problems.push("AWS_REGION cannot be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(problems))
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Raw inputs as collected by a front end
///
/// Empty strings are treated the same as missing values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInputs {
    /// Distribution identifier (required)
    pub distribution_id: Option<String>,

    /// Explicitly configured origin path
    pub origin_path: Option<String>,

    /// Computed folder path; wins over `origin_path` when present
    pub folder_path: Option<String>,

    /// Origin index as text (defaults to 0)
    pub origin_index: Option<String>,

    /// Region (defaults to `us-east-1`)
    pub region: Option<String>,
}

impl SwapInputs {
    /// Validate every input and build a [`SwapConfig`]
    ///
    /// # Errors
    ///
    /// Returns one `Error::Validation` listing every problem found, so a
    /// caller sees all missing inputs in a single message.
    pub fn resolve(&self) -> Result<SwapConfig> {
        let mut problems = Vec::new();

        let distribution_id = present(&self.distribution_id);
        if distribution_id.is_none() {
            problems.push("AWS_DISTRIBUTION_ID is required".to_string());
        }

        let origin_path = present(&self.folder_path).or_else(|| present(&self.origin_path));
        if origin_path.is_none() {
            problems.push("ORIGIN_PATH is required".to_string());
        }

        let origin_index = match present(&self.origin_index) {
            None => Some(0),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(index) => Some(index),
                Err(_) => {
                    problems.push(format!(
                        "ORIGIN_PATH_INDEX must be a non-negative integer. Got: {}",
                        raw
                    ));
                    None
                }
            },
        };

        let region = present(&self.region).unwrap_or(DEFAULT_REGION);

        match (distribution_id, origin_path, origin_index) {
            (Some(distribution_id), Some(origin_path), Some(origin_index)) if problems.is_empty() => {
                tracing::debug!(
                    "Resolved origin path {} from {}",
                    origin_path,
                    if present(&self.folder_path).is_some() {
                        "FOLDER_PATH"
                    } else {
                        "ORIGIN_PATH"
                    }
                );
                Ok(SwapConfig {
                    distribution_id: distribution_id.trim().to_string(),
                    origin_path: origin_path.to_string(),
                    origin_index,
                    region: region.trim().to_string(),
                })
            }
            _ => Err(Error::validation(problems)),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(distribution_id: &str, origin_path: &str) -> SwapInputs {
        SwapInputs {
            distribution_id: Some(distribution_id.to_string()),
            origin_path: Some(origin_path.to_string()),
            ..SwapInputs::default()
        }
    }

    #[test]
    fn explicit_path_with_defaults() {
        let config = inputs("E1ABC", "/v2").resolve().unwrap();

        assert_eq!(config, SwapConfig::new("E1ABC", "/v2"));
        assert_eq!(config.origin_index, 0);
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn folder_path_wins_over_explicit_path() {
        let mut raw = inputs("E1ABC", "/v2");
        raw.folder_path = Some("/builds/42".to_string());

        let config = raw.resolve().unwrap();
        assert_eq!(config.origin_path, "/builds/42");
    }

    #[test]
    fn folder_path_alone_is_enough() {
        let raw = SwapInputs {
            distribution_id: Some("E1ABC".to_string()),
            folder_path: Some("/builds/42".to_string()),
            ..SwapInputs::default()
        };

        assert_eq!(raw.resolve().unwrap().origin_path, "/builds/42");
    }

    #[test]
    fn empty_folder_path_falls_back_to_explicit() {
        let mut raw = inputs("E1ABC", "/v2");
        raw.folder_path = Some(String::new());

        assert_eq!(raw.resolve().unwrap().origin_path, "/v2");
    }

    #[test]
    fn all_problems_reported_together() {
        let raw = SwapInputs {
            distribution_id: Some(String::new()),
            origin_index: Some("-1".to_string()),
            ..SwapInputs::default()
        };

        match raw.resolve() {
            Err(Error::Validation(problems)) => {
                assert_eq!(problems.len(), 3, "{:?}", problems);
                assert!(problems[0].contains("AWS_DISTRIBUTION_ID"));
                assert!(problems[1].contains("ORIGIN_PATH is required"));
                assert!(problems[2].contains("ORIGIN_PATH_INDEX"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn index_and_region_are_parsed() {
        let mut raw = inputs("E1ABC", "/v2");
        raw.origin_index = Some(" 3 ".to_string());
        raw.region = Some("cn-north-1".to_string());

        let config = raw.resolve().unwrap();
        assert_eq!(config.origin_index, 3);
        assert_eq!(config.region, "cn-north-1");
    }

    #[test]
    fn validate_collects_problems() {
        let config = SwapConfig::new("", "").with_region(" ");
        match config.validate() {
            Err(Error::Validation(problems)) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(SwapConfig::new("E1ABC", "/v2").with_origin_index(1).validate().is_ok());
    }
}
