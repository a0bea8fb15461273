//! Configuration (§6, SPEC_FULL §D): a single validated struct assembled
//! once from environment variables and CLI flags, then passed by reference
//! to everything downstream. The shape — `Default`/constructor split, one
//! validated struct — follows the teacher's `config.rs`; unlike the
//! teacher, there is no on-disk TOML file, so `directories`/`toml` are not
//! used here (this tool is env/flag-only, see DESIGN.md).

use clap::Parser;
use tracing::{info, warn};

use crate::error::Error;

const MIN_TOKEN_LEN: usize = 10;

/// CLI flags, parsed with `clap`.
#[derive(Parser, Debug)]
#[command(name = "gh-profile-stats")]
#[command(about = "Generate a self-updating GitHub profile README")]
pub struct Args {
    /// Exclude forked repositories from aggregation.
    #[arg(long, default_value = "true")]
    pub exclude_forks: String,

    /// Deprecated; ignored except for the self-equality check against
    /// `GITHUB_USERNAME`.
    #[arg(long)]
    pub username: Option<String>,

    /// Perform every step through README rewriting, but skip commit/push.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory charts and the README are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// Bounded fan-out cap for the Parallel Orchestrator.
    #[arg(long, default_value_t = crate::orchestrator::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

/// Resolved, validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub token_read: String,
    pub token_write: String,
    pub username: String,
    pub exclude_forks: bool,
    pub dry_run: bool,
    pub output_dir: String,
    pub concurrency: usize,
    pub log_level: String,
    pub deprecated_username_flag: Option<String>,
}

/// Mask a secret for diagnostics: first 4 + `...` + last 4 characters, or a
/// placeholder for strings too short to mask safely (SPEC_FULL §B, §F.4).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "(short token)".to_string();
    }
    format!("{}...{}", &token[..4], &token[token.len() - 4..])
}

fn parse_bool_flag(raw: &str, flag_name: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        other => {
            warn!(flag = flag_name, value = other, "malformed boolean flag, defaulting to true");
            true
        }
    }
}

impl Config {
    /// Resolve the log level env var into a `tracing_subscriber::EnvFilter`
    /// directive. Called from `main` before the subscriber is installed.
    pub fn resolve_log_directive(raw: Option<&str>) -> String {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            Some(ref s) if s == "DEBUG" => "debug".to_string(),
            Some(ref s) if s == "INFO" => "info".to_string(),
            Some(ref s) if s == "WARNING" || s == "WARN" => "warn".to_string(),
            Some(ref s) if s == "ERROR" => "error".to_string(),
            None => "info".to_string(),
            Some(other) => {
                warn!(value = %other, "unrecognized LOG_LEVEL, defaulting to info");
                "info".to_string()
            }
        }
    }

    /// Assemble and validate configuration from the environment and parsed
    /// CLI flags (§6).
    pub fn from_env_and_args(args: Args) -> Result<Self, Error> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| Error::Authorization("GITHUB_TOKEN is required".to_string()))?;
        if token.len() < MIN_TOKEN_LEN {
            return Err(Error::Authorization(format!(
                "GITHUB_TOKEN must be at least {MIN_TOKEN_LEN} characters"
            )));
        }

        let token_read = match std::env::var("GITHUB_TOKEN_READ") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                info!(token = %mask_token(&token), "GITHUB_TOKEN_READ not set, falling back to GITHUB_TOKEN");
                token.clone()
            }
        };
        let token_write = match std::env::var("GITHUB_TOKEN_WRITE") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                info!(token = %mask_token(&token), "GITHUB_TOKEN_WRITE not set, falling back to GITHUB_TOKEN");
                token
            }
        };

        let username = std::env::var("GITHUB_USERNAME")
            .map_err(|_| Error::Authorization("GITHUB_USERNAME is required".to_string()))?;
        if username.trim().is_empty() {
            return Err(Error::Validation("GITHUB_USERNAME must not be empty".to_string()));
        }

        let log_level = Self::resolve_log_directive(std::env::var("LOG_LEVEL").ok().as_deref());

        let exclude_forks = parse_bool_flag(&args.exclude_forks, "--exclude-forks");

        Ok(Config {
            token_read,
            token_write,
            username,
            exclude_forks,
            dry_run: args.dry_run,
            output_dir: args.output_dir,
            concurrency: args.concurrency.max(1),
            log_level,
            deprecated_username_flag: args.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize every test that
    // touches them so they don't trample each other under `cargo test`'s
    // default multi-threaded runner.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn base_args() -> Args {
        Args {
            exclude_forks: "true".to_string(),
            username: None,
            dry_run: false,
            output_dir: ".".to_string(),
            concurrency: 5,
        }
    }

    fn clear_env() {
        for key in [
            "GITHUB_TOKEN",
            "GITHUB_TOKEN_READ",
            "GITHUB_TOKEN_WRITE",
            "GITHUB_USERNAME",
            "LOG_LEVEL",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn missing_token_is_an_authorization_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("GITHUB_USERNAME", "octocat") };
        let result = Config::from_env_and_args(base_args());
        assert!(matches!(result, Err(Error::Authorization(_))));
        clear_env();
    }

    #[test]
    fn short_token_is_an_authorization_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("GITHUB_TOKEN", "short") };
        unsafe { std::env::set_var("GITHUB_USERNAME", "octocat") };
        let result = Config::from_env_and_args(base_args());
        assert!(matches!(result, Err(Error::Authorization(_))));
        clear_env();
    }

    #[test]
    fn read_and_write_tokens_fall_back_to_the_primary_token() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("GITHUB_TOKEN", "0123456789abcdef") };
        unsafe { std::env::set_var("GITHUB_USERNAME", "octocat") };
        let config = Config::from_env_and_args(base_args()).unwrap();
        assert_eq!(config.token_read, "0123456789abcdef");
        assert_eq!(config.token_write, "0123456789abcdef");
        clear_env();
    }

    #[test]
    fn split_role_tokens_are_honored_when_present() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("GITHUB_TOKEN", "0123456789abcdef") };
        unsafe { std::env::set_var("GITHUB_TOKEN_READ", "read-0123456789") };
        unsafe { std::env::set_var("GITHUB_TOKEN_WRITE", "write-0123456789") };
        unsafe { std::env::set_var("GITHUB_USERNAME", "octocat") };
        let config = Config::from_env_and_args(base_args()).unwrap();
        assert_eq!(config.token_read, "read-0123456789");
        assert_eq!(config.token_write, "write-0123456789");
        clear_env();
    }

    #[test]
    fn malformed_exclude_forks_flag_defaults_to_true() {
        assert!(parse_bool_flag("not-a-bool", "--exclude-forks"));
        assert!(!parse_bool_flag("false", "--exclude-forks"));
    }

    #[test]
    fn log_level_resolution_matches_the_known_values() {
        assert_eq!(Config::resolve_log_directive(Some("debug")), "debug");
        assert_eq!(Config::resolve_log_directive(Some("WARN")), "warn");
        assert_eq!(Config::resolve_log_directive(Some("WARNING")), "warn");
        assert_eq!(Config::resolve_log_directive(Some("ERROR")), "error");
        assert_eq!(Config::resolve_log_directive(None), "info");
        assert_eq!(Config::resolve_log_directive(Some("nonsense")), "info");
    }

    #[test]
    fn mask_token_shows_only_the_first_and_last_four_characters() {
        assert_eq!(mask_token("0123456789abcdef"), "0123...cdef");
        assert_eq!(mask_token("short"), "(short token)");
    }
}
