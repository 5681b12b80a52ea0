//! Configuration for the SimpleFlow bot.
//!
//! All configuration is read from the environment once at startup and
//! validated before any component is constructed. Missing required values
//! fail the process immediately; nothing is re-read at runtime.

use std::env;

use thiserror::Error;

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_BUCKET_NAME: &str = "simpleflowdata";
const DEFAULT_TRIGGER: &str = "!sf";

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Bot configuration, immutable after [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// GitHub API token.
    pub github_token: String,
    /// GitHub API base URL (overridable for tests).
    pub github_api_url: String,
    /// Webhook signing secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: Option<String>,
    /// Comment substring that activates issue processing.
    pub trigger: String,
    /// Content bucket settings.
    pub bucket: BucketConfig,
    /// Remote function invocation settings.
    pub functions: FunctionsConfig,
    /// Retry policy applied to remote function calls.
    pub retry: RetryConfig,
    /// Enable debug-level logging.
    pub verbose: bool,
}

/// Blob bucket the remote functions read stored file content from.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// Base URL of the object storage HTTP API.
    pub base_url: String,
    /// Bucket name.
    pub name: String,
    /// Bearer token for the storage API, if required.
    pub token: Option<String>,
}

/// How remote functions are addressed.
#[derive(Debug, Clone)]
pub enum InvokerConfig {
    /// All functions behind one API gateway, authenticated with an API key.
    Gateway(GatewayConfig),
    /// Each function has its own URL.
    Direct(DirectConfig),
}

/// API-gateway-backed invocation settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
}

/// URL-backed invocation settings, one address per function.
#[derive(Debug, Clone)]
pub struct DirectConfig {
    pub analyze: String,
    pub summarize: String,
    pub document: String,
    pub issue_create: String,
    pub issue_update: String,
    /// Optional bearer token sent with every call.
    pub token: Option<String>,
}

/// Remote function invocation settings.
#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    pub invoker: InvokerConfig,
    /// Default per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Retry policy settings for remote function calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Config {
    /// Load and validate configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let github_token = required("GITHUB_TOKEN")
            .or_else(|_| required("GH_TOKEN"))
            .map_err(|_| ConfigError::Missing("GITHUB_TOKEN"))?;

        let config = Self {
            port: parsed("SIMPLEFLOW_PORT", 8080)?,
            github_token,
            github_api_url: optional("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            webhook_secret: optional("SIMPLEFLOW_WEBHOOK_SECRET"),
            trigger: optional("SIMPLEFLOW_TRIGGER").unwrap_or_else(|| DEFAULT_TRIGGER.to_string()),
            bucket: BucketConfig {
                base_url: required("SIMPLEFLOW_BUCKET_URL")?,
                name: optional("SIMPLEFLOW_BUCKET")
                    .unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string()),
                token: optional("SIMPLEFLOW_BUCKET_TOKEN"),
            },
            functions: FunctionsConfig {
                invoker: invoker_from_env()?,
                timeout_ms: parsed("SIMPLEFLOW_TIMEOUT_MS", 30_000)?,
            },
            retry: RetryConfig {
                max_attempts: parsed("SIMPLEFLOW_RETRY_MAX_ATTEMPTS", 3)?,
                base_delay_ms: parsed("SIMPLEFLOW_RETRY_BASE_DELAY_MS", 500)?,
            },
            verbose: optional("SIMPLEFLOW_VERBOSE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "SIMPLEFLOW_RETRY_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.functions.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "SIMPLEFLOW_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn invoker_from_env() -> Result<InvokerConfig, ConfigError> {
    let mode = optional("SIMPLEFLOW_INVOKER").unwrap_or_else(|| "gateway".to_string());
    match mode.as_str() {
        "gateway" => Ok(InvokerConfig::Gateway(GatewayConfig {
            base_url: required("SIMPLEFLOW_GATEWAY_URL")?,
            api_key: required("SIMPLEFLOW_GATEWAY_API_KEY")?,
        })),
        "direct" => Ok(InvokerConfig::Direct(DirectConfig {
            analyze: required("SIMPLEFLOW_FN_ANALYZE_URL")?,
            summarize: required("SIMPLEFLOW_FN_SUMMARIZE_URL")?,
            document: required("SIMPLEFLOW_FN_DOCUMENT_URL")?,
            issue_create: required("SIMPLEFLOW_FN_ISSUE_CREATE_URL")?,
            issue_update: required("SIMPLEFLOW_FN_ISSUE_UPDATE_URL")?,
            token: optional("SIMPLEFLOW_FN_TOKEN"),
        })),
        other => Err(ConfigError::Invalid {
            name: "SIMPLEFLOW_INVOKER",
            reason: format!("expected `gateway` or `direct`, got `{other}`"),
        }),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "GITHUB_TOKEN",
            "GH_TOKEN",
            "SIMPLEFLOW_PORT",
            "SIMPLEFLOW_WEBHOOK_SECRET",
            "SIMPLEFLOW_TRIGGER",
            "SIMPLEFLOW_BUCKET_URL",
            "SIMPLEFLOW_BUCKET",
            "SIMPLEFLOW_BUCKET_TOKEN",
            "SIMPLEFLOW_INVOKER",
            "SIMPLEFLOW_GATEWAY_URL",
            "SIMPLEFLOW_GATEWAY_API_KEY",
            "SIMPLEFLOW_FN_ANALYZE_URL",
            "SIMPLEFLOW_FN_SUMMARIZE_URL",
            "SIMPLEFLOW_FN_DOCUMENT_URL",
            "SIMPLEFLOW_FN_ISSUE_CREATE_URL",
            "SIMPLEFLOW_FN_ISSUE_UPDATE_URL",
            "SIMPLEFLOW_FN_TOKEN",
            "SIMPLEFLOW_TIMEOUT_MS",
            "SIMPLEFLOW_RETRY_MAX_ATTEMPTS",
            "SIMPLEFLOW_RETRY_BASE_DELAY_MS",
            "SIMPLEFLOW_VERBOSE",
        ] {
            env::remove_var(name);
        }
    }

    fn set_minimal_gateway_env() {
        env::set_var("GITHUB_TOKEN", "ghp_test");
        env::set_var("SIMPLEFLOW_BUCKET_URL", "https://storage.example.com");
        env::set_var("SIMPLEFLOW_GATEWAY_URL", "https://gw.example.com/prod");
        env::set_var("SIMPLEFLOW_GATEWAY_API_KEY", "key");
    }

    #[test]
    #[serial]
    fn loads_gateway_config_with_defaults() {
        clear_env();
        set_minimal_gateway_env();

        let config = Config::from_env().expect("config should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.trigger, "!sf");
        assert_eq!(config.bucket.name, "simpleflowdata");
        assert_eq!(config.functions.timeout_ms, 30_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(matches!(
            config.functions.invoker,
            InvokerConfig::Gateway(_)
        ));
    }

    #[test]
    #[serial]
    fn missing_github_token_is_fatal() {
        clear_env();
        env::set_var("SIMPLEFLOW_BUCKET_URL", "https://storage.example.com");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_TOKEN")));
    }

    #[test]
    #[serial]
    fn direct_mode_requires_all_function_urls() {
        clear_env();
        env::set_var("GITHUB_TOKEN", "ghp_test");
        env::set_var("SIMPLEFLOW_BUCKET_URL", "https://storage.example.com");
        env::set_var("SIMPLEFLOW_INVOKER", "direct");
        env::set_var("SIMPLEFLOW_FN_ANALYZE_URL", "https://fn.example.com/analyze");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing("SIMPLEFLOW_FN_SUMMARIZE_URL")
        ));
    }

    #[test]
    #[serial]
    fn unknown_invoker_mode_is_rejected() {
        clear_env();
        set_minimal_gateway_env();
        env::set_var("SIMPLEFLOW_INVOKER", "lambda");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SIMPLEFLOW_INVOKER",
                ..
            }
        ));
    }

    #[test]
    #[serial]
    fn zero_max_attempts_is_rejected() {
        clear_env();
        set_minimal_gateway_env();
        env::set_var("SIMPLEFLOW_RETRY_MAX_ATTEMPTS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SIMPLEFLOW_RETRY_MAX_ATTEMPTS",
                ..
            }
        ));
    }
}
