//! Runtime configuration, resolved once at startup.
//!
//! Precedence, highest first: command-line flags and environment variables
//! (through [`Cli`]), then an optional YAML settings file, then built-in
//! defaults. The resulting [`Config`] is handed to the scraper and the
//! summarizer at construction; nothing below `main` reads the environment.
//!
//! # Settings file
//!
//! ```yaml
//! api_base: https://api.groq.com/openai/v1
//! models:
//!   - llama-3.1-8b-instant
//!   - llama3-70b-8192
//! completion_timeout_secs: 20
//! temperature: 0.5
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::ModelChain;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_SOURCE_URL: &str = "https://economictimes.indiatimes.com/markets";
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Provider credential. Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingApiKey`] if nothing is left after trimming.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(key))
    }

    /// The raw key, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Optional overrides read from a YAML file. Unset fields fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub source_url: Option<String>,
    pub api_base: Option<String>,
    pub user_agent: Option<String>,
    pub models: Option<Vec<String>>,
    pub listing_timeout_secs: Option<u64>,
    pub completion_timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub overview_max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl SettingsFile {
    #[instrument(level = "info", skip_all, fields(%path))]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(path, &raw)
    }

    /// Parse settings already read from `path`; `path` is only used in errors.
    pub fn from_yaml(path: &str, raw: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }
}

/// Everything the pipeline needs to run one cycle.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: ApiKey,
    pub api_base: Url,
    pub source_url: Url,
    pub user_agent: String,
    pub model_chain: ModelChain,
    /// Bound on the listing and article page requests.
    pub listing_timeout: Duration,
    /// Bound on each individual model call.
    pub completion_timeout: Duration,
    /// Completion budget for one article summary.
    pub max_tokens: u32,
    /// Completion budget for the market overview.
    pub overview_max_tokens: u32,
    pub temperature: f32,
}

impl Config {
    /// Defaults for everything except the credential.
    pub fn with_api_key(api_key: ApiKey) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key,
            api_base: parse_url(DEFAULT_API_BASE)?,
            source_url: parse_url(DEFAULT_SOURCE_URL)?,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            model_chain: ModelChain::default(),
            listing_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(30),
            max_tokens: 200,
            overview_max_tokens: 1000,
            temperature: 0.7,
        })
    }

    /// Merge CLI/env values over the settings file over defaults.
    pub fn resolve(cli: &Cli, file: SettingsFile) -> Result<Self, ConfigError> {
        let api_key = ApiKey::new(cli.api_key.clone().ok_or(ConfigError::MissingApiKey)?)?;
        let mut config = Self::with_api_key(api_key)?;

        if let Some(url) = cli.source_url.as_deref().or(file.source_url.as_deref()) {
            config.source_url = parse_url(url)?;
        }
        if let Some(url) = cli.api_base.as_deref().or(file.api_base.as_deref()) {
            config.api_base = parse_url(url)?;
        }
        if let Some(ua) = file.user_agent {
            config.user_agent = ua;
        }

        // An explicitly configured but empty chain is an error, not a reason
        // to fall back to the default order.
        if let Some(list) = cli.models.as_deref() {
            config.model_chain = ModelChain::parse_list(list)?;
        } else if let Some(models) = file.models {
            config.model_chain = ModelChain::new(models)?;
        }

        if let Some(secs) = file.listing_timeout_secs {
            config.listing_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.completion_timeout_secs {
            config.completion_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.max_tokens {
            config.max_tokens = n;
        }
        if let Some(n) = file.overview_max_tokens {
            config.overview_max_tokens = n;
        }
        if let Some(t) = file.temperature {
            config.temperature = t;
        }

        debug!(
            source_url = %config.source_url,
            api_base = %config.api_base,
            models = ?config.model_chain,
            "Resolved configuration"
        );
        Ok(config)
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
