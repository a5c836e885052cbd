// # originswap - CloudFront origin swap
//
// This binary is a THIN integration layer:
// - Reads the action inputs from environment variables
// - Builds one explicit `SwapConfig` and hands it to originswap-core
// - Maps the outcome to an exit code, a workflow error command and the
//   action state file
//
// All swap logic lives in originswap-core; all AWS calls in
// originswap-provider-cloudfront.
//
// ## Configuration
//
// Inputs follow the GitHub Actions conventions: `INPUT_*` values are trimmed
// and empty values count as unset.
//
// ### Swap
// - `INPUT_AWS_DISTRIBUTION_ID`: Target distribution (required)
// - `INPUT_ORIGIN_PATH`: New origin path (required unless `FOLDER_PATH` is set)
// - `FOLDER_PATH`: Computed origin path, takes precedence over `INPUT_ORIGIN_PATH`
// - `INPUT_ORIGIN_PATH_INDEX`: Origin to mutate (default: 0)
// - `INPUT_AWS_REGION`: Service region (default: us-east-1)
//
// ### Credentials
// Resolved by the AWS SDK default chain: `AWS_ACCESS_KEY_ID` /
// `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`, shared profiles, web
// identity (`AWS_ROLE_ARN` + `AWS_WEB_IDENTITY_TOKEN_FILE`), container and
// instance roles.
//
// ### Runtime
// - `ORIGINSWAP_MODE`: `live` (default) or `dry-run`
// - `ORIGINSWAP_LOG_LEVEL`: Log level (default: info, debug when `RUNNER_DEBUG=1`)
// - `AWS_S3_PATH`: Logged for diagnostics only
// - `GITHUB_STATE`: Action state file, receives `done=done` on success
//
// ## Example
//
// ```bash
// export INPUT_AWS_DISTRIBUTION_ID=E2QWRUHAPOMQZL
// export INPUT_ORIGIN_PATH=/releases/v2
// export AWS_PROFILE=deploy
//
// originswap
// ```

use anyhow::Result;
use originswap_core::{OriginSwap, SwapConfig, SwapError, SwapInputs};
use originswap_provider_cloudfront::CloudFrontProvider;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes of a run
///
/// - 0: Origin swapped and cache invalidated
/// - 1: Configuration error (no remote call made)
/// - 2: Run failed at or before the configuration write (nothing changed)
/// - 3: Configuration updated but the invalidation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapExitCode {
    /// Both steps succeeded
    Done = 0,
    /// Configuration or validation error
    ConfigError = 1,
    /// Remote failure, distribution unchanged
    RunFailed = 2,
    /// Distribution updated, cache not invalidated
    PartialUpdate = 3,
}

impl From<SwapExitCode> for ExitCode {
    fn from(code: SwapExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&SwapError> for SwapExitCode {
    fn from(err: &SwapError) -> Self {
        if err.is_partial() {
            SwapExitCode::PartialUpdate
        } else if err.error().is_validation() {
            SwapExitCode::ConfigError
        } else {
            SwapExitCode::RunFailed
        }
    }
}

/// Application configuration
struct Config {
    inputs: SwapInputs,
    access_key_defined: bool,
    s3_path: Option<String>,
    mode: String,
    log_level: String,
    state_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let input = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let default_level = if var("RUNNER_DEBUG").as_deref() == Some("1") {
            "debug"
        } else {
            "info"
        };

        Self {
            inputs: SwapInputs {
                distribution_id: input("INPUT_AWS_DISTRIBUTION_ID"),
                origin_path: input("INPUT_ORIGIN_PATH"),
                folder_path: var("FOLDER_PATH"),
                origin_index: input("INPUT_ORIGIN_PATH_INDEX"),
                region: input("INPUT_AWS_REGION"),
            },
            access_key_defined: var("AWS_ACCESS_KEY_ID").is_some(),
            s3_path: var("AWS_S3_PATH"),
            mode: var("ORIGINSWAP_MODE").unwrap_or_else(|| "live".to_string()),
            log_level: var("ORIGINSWAP_LOG_LEVEL").unwrap_or_else(|| default_level.to_string()),
            state_file: var("GITHUB_STATE").map(PathBuf::from),
        }
    }

    /// Validate every setting and build the swap configuration
    ///
    /// All problems (swap inputs, mode, log level) are reported together in
    /// one `Error::Validation`, before anything talks to AWS.
    fn resolve(&self) -> originswap_core::Result<SwapConfig> {
        let (swap_config, mut problems) = match self.inputs.resolve() {
            Ok(swap_config) => (Some(swap_config), Vec::new()),
            Err(originswap_core::Error::Validation(problems)) => (None, problems),
            Err(e) => (None, vec![e.to_string()]),
        };

        if !matches!(self.mode.as_str(), "live" | "dry-run") {
            problems.push(format!(
                "ORIGINSWAP_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ));
        }

        if self.tracing_level().is_none() {
            problems.push(format!(
                "ORIGINSWAP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ));
        }

        match swap_config {
            Some(swap_config) if problems.is_empty() => Ok(swap_config),
            _ => Err(originswap_core::Error::validation(problems)),
        }
    }

    fn tracing_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    fn is_dry_run(&self) -> bool {
        self.mode == "dry-run"
    }
}

fn main() -> ExitCode {
    let config = Config::from_env();

    let swap_config = match config.resolve() {
        Ok(swap_config) => swap_config,
        Err(e) => {
            println!(
                "{}",
                workflow_error(&format!("Configuration validation error:\n{}", e))
            );
            return SwapExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level().unwrap_or(Level::INFO))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SwapExitCode::ConfigError.into();
    }

    if let Err(e) = log_working_directory() {
        warn!("Unable to list working directory: {}", e);
    }
    info!("AWS_ACCESS_KEY_ID: is defined? {}", config.access_key_defined);
    if let Some(s3_path) = &config.s3_path {
        debug!("S3 path: {}", s3_path);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            println!(
                "{}",
                workflow_error(&format!("Failed to create tokio runtime: {}", e))
            );
            return SwapExitCode::RunFailed.into();
        }
    };

    let code = rt.block_on(run_swap(swap_config, config.is_dry_run()));

    if code == SwapExitCode::Done {
        println!("Done...");
        if let Some(path) = &config.state_file
            && let Err(e) = write_action_state(path, "done", "done")
        {
            warn!("Failed to record action state: {}", e);
        }
    }

    code.into()
}

/// Run the swap against CloudFront
async fn run_swap(config: SwapConfig, dry_run: bool) -> SwapExitCode {
    let provider = CloudFrontProvider::from_env(&config.region, dry_run).await;

    if dry_run {
        info!("Running in dry-run mode: the distribution will not be changed");
    }
    info!(
        "Swapping origin {} of distribution {} to '{}'",
        config.origin_index, config.distribution_id, config.origin_path
    );

    let swap = match OriginSwap::new(provider, config) {
        Ok(swap) => swap,
        Err(e) => {
            println!("{}", workflow_error(&format!("Invalid configuration: {}", e)));
            return SwapExitCode::ConfigError;
        }
    };

    match swap.run().await {
        Ok(report) => {
            info!(
                "Invalidation {} created ({})",
                report.invalidation.invalidation_id, report.invalidation.status
            );
            SwapExitCode::Done
        }
        Err(e) => {
            println!("{}", workflow_error(&format!("{} failed: {}", e.step(), e)));
            SwapExitCode::from(&e)
        }
    }
}

/// Format a message as a workflow `error` command
///
/// The runner turns `::error::<message>` on stdout into a failure
/// annotation. `%`, CR and LF are percent-encoded so a multi-line message
/// stays one command.
fn workflow_error(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{}", escaped)
}

/// Log the entries of the working directory (debug level only)
///
/// Runs before the swap so build output problems show up in the job log.
fn log_working_directory() -> Result<()> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(());
    }

    let cwd = env::current_dir()?;
    let mut entries = std::fs::read_dir(&cwd)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    entries.sort();

    debug!("Working directory {}:", cwd.display());
    for entry in entries {
        debug!("  {}", entry);
    }
    Ok(())
}

/// Append `key=value` to the action state file
fn write_action_state(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    writeln!(file, "{}={}", key, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use originswap_core::{Error, MutationOutcome, UpdateResult, VersionToken};
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            ("INPUT_AWS_DISTRIBUTION_ID", "E2QWRUHAPOMQZL"),
            ("INPUT_ORIGIN_PATH", "/v2"),
        ]
    }

    fn problems(config: &Config) -> Vec<String> {
        match config.resolve() {
            Err(Error::Validation(problems)) => problems,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn complete_environment_resolves() {
        let config = config_from(&complete());

        let swap = config.resolve().unwrap();
        assert_eq!(swap, SwapConfig::new("E2QWRUHAPOMQZL", "/v2"));
        assert!(!config.is_dry_run());
        assert_eq!(config.log_level, "info");
        assert!(config.state_file.is_none());
    }

    #[test]
    fn web_identity_without_static_keys_resolves() {
        let mut vars = complete();
        vars.push(("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/deploy"));
        vars.push(("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/secrets/token"));
        let config = config_from(&vars);

        assert!(config.resolve().is_ok());
        assert!(!config.access_key_defined);

        let mut vars = complete();
        vars.push(("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"));
        assert!(config_from(&vars).access_key_defined);
    }

    #[test]
    fn empty_environment_reports_every_problem_at_once() {
        let config = config_from(&[
            ("INPUT_ORIGIN_PATH_INDEX", "first"),
            ("ORIGINSWAP_MODE", "yolo"),
            ("ORIGINSWAP_LOG_LEVEL", "loud"),
        ]);

        let problems = problems(&config);
        assert_eq!(problems.len(), 5, "{:?}", problems);

        let message = config.resolve().unwrap_err().to_string();
        for expected in [
            "AWS_DISTRIBUTION_ID is required",
            "ORIGIN_PATH is required",
            "ORIGIN_PATH_INDEX must be a non-negative integer. Got: first",
            "ORIGINSWAP_MODE 'yolo'",
            "ORIGINSWAP_LOG_LEVEL 'loud'",
        ] {
            assert!(message.contains(expected), "missing {:?} in {:?}", expected, message);
        }

        let nothing = config_from(&[]);
        assert_eq!(
            self::problems(&nothing),
            vec![
                "AWS_DISTRIBUTION_ID is required".to_string(),
                "ORIGIN_PATH is required".to_string(),
            ]
        );
    }

    #[test]
    fn empty_values_count_as_unset() {
        let mut vars = complete();
        vars.push(("FOLDER_PATH", ""));
        vars.push(("INPUT_ORIGIN_PATH_INDEX", ""));
        vars.push(("AWS_ACCESS_KEY_ID", ""));
        let config = config_from(&vars);

        assert!(!config.access_key_defined);
        let swap = config.resolve().unwrap();
        assert_eq!(swap.origin_path, "/v2");
        assert_eq!(swap.origin_index, 0);
    }

    #[test]
    fn action_inputs_are_trimmed() {
        let config = config_from(&[
            ("INPUT_AWS_DISTRIBUTION_ID", "  E2QWRUHAPOMQZL\n"),
            ("INPUT_ORIGIN_PATH", " /v2 "),
            ("INPUT_ORIGIN_PATH_INDEX", " 1 "),
            ("INPUT_AWS_REGION", "eu-west-1 "),
        ]);

        let swap = config.resolve().unwrap();
        assert_eq!(swap.distribution_id, "E2QWRUHAPOMQZL");
        assert_eq!(swap.origin_path, "/v2");
        assert_eq!(swap.origin_index, 1);
        assert_eq!(swap.region, "eu-west-1");

        let blank = config_from(&[("INPUT_AWS_DISTRIBUTION_ID", "   "), ("INPUT_ORIGIN_PATH", "/v2")]);
        assert_eq!(problems(&blank), vec!["AWS_DISTRIBUTION_ID is required".to_string()]);
    }

    #[test]
    fn folder_path_overrides_explicit_path() {
        let mut vars = complete();
        vars.push(("FOLDER_PATH", "/builds/42"));

        let swap = config_from(&vars).resolve().unwrap();
        assert_eq!(swap.origin_path, "/builds/42");
    }

    #[test]
    fn runner_debug_raises_default_level() {
        let mut vars = complete();
        vars.push(("RUNNER_DEBUG", "1"));
        assert_eq!(config_from(&vars).log_level, "debug");

        vars.push(("ORIGINSWAP_LOG_LEVEL", "warn"));
        let config = config_from(&vars);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.tracing_level(), Some(Level::WARN));
    }

    #[test]
    fn dry_run_mode_is_accepted() {
        let mut vars = complete();
        vars.push(("ORIGINSWAP_MODE", "dry-run"));
        let config = config_from(&vars);
        config.resolve().unwrap();
        assert!(config.is_dry_run());
    }

    #[test]
    fn workflow_error_is_one_escaped_command() {
        assert_eq!(workflow_error("origin update failed"), "::error::origin update failed");
        assert_eq!(
            workflow_error("Configuration validation error:\nA\r\nB 100%"),
            "::error::Configuration validation error:%0AA%0D%0AB 100%25"
        );
    }

    #[test]
    fn exit_codes_follow_failed_step() {
        let outcome = MutationOutcome {
            previous_path: "/v1".to_string(),
            new_path: "/v2".to_string(),
            update: UpdateResult {
                etag: VersionToken::new("E2"),
                http_status: 200,
            },
        };

        let partial = SwapError::Invalidation {
            outcome,
            source: Error::transient("connection reset"),
        };
        assert_eq!(SwapExitCode::from(&partial), SwapExitCode::PartialUpdate);

        let conflict = SwapError::Mutation(Error::version_conflict("E1"));
        assert_eq!(SwapExitCode::from(&conflict), SwapExitCode::RunFailed);

        let invalid = SwapError::Mutation(Error::validation(vec!["ORIGIN_PATH is required".into()]));
        assert_eq!(SwapExitCode::from(&invalid), SwapExitCode::ConfigError);

        assert_eq!(SwapExitCode::PartialUpdate as u8, 3);
    }

    #[test]
    fn action_state_is_appended() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "previous=1\n").unwrap();

        write_action_state(file.path(), "done", "done").unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "previous=1\ndone=done\n");
    }
}
