//! Engine configuration, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::composer::{DEFAULT_ENGLISH_PERSONA, PromptTemplates};
use crate::dedup::DEFAULT_RETENTION;
use crate::error::ConfigError;
use crate::llm::CredentialPool;
use crate::llm::gemini::DEFAULT_MODEL;
use crate::monitor::{DEFAULT_POLL_INTERVAL, MonitorSettings};

/// Default location of the processed-id file.
pub const DEFAULT_PROCESSED_FILE: &str = "processed_items.json";

/// Everything the engine needs that is not asked interactively.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Comma-separated API keys, in rotation order.
    pub api_keys: Vec<SecretString>,
    pub model: String,
    pub templates: PromptTemplates,
    pub poll_interval: Duration,
    pub retention: usize,
    pub processed_file: PathBuf,
    /// Recorded feed snapshot for the dry-run surface.
    pub replay_file: Option<PathBuf>,
    pub community_url: Option<String>,
    /// Fixed seed for all randomness. Unset means entropy.
    pub rng_seed: Option<u64>,
    pub max_cycles: Option<u64>,
}

impl EngineConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_keys = get("GEMINI_API_KEY").ok_or_else(|| ConfigError::MissingRequired {
            key: "GEMINI_API_KEY".to_string(),
            hint: "Set one or more comma-separated API keys".to_string(),
        })?;
        let api_keys = split_csv(&raw_keys)
            .into_iter()
            .map(SecretString::from)
            .collect::<Vec<_>>();
        if api_keys.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "GEMINI_API_KEY".to_string(),
                hint: "No usable key in the comma-separated list".to_string(),
            });
        }

        let respond_persona = get("GEMINI_SYSTEM_PROMPT")
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_SYSTEM_PROMPT".to_string()))?;
        let templates = PromptTemplates {
            respond_persona,
            requote_persona: get("GEMINI_QUOTE_PROMPT"),
            english_persona: get("GEMINI_ENGLISH_PERSONA")
                .unwrap_or_else(|| DEFAULT_ENGLISH_PERSONA.to_string()),
        };

        let poll_secs: f64 = parse_or(
            &get,
            "FEED_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs_f64(),
        )?;
        if !(poll_secs.is_finite() && poll_secs >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "FEED_POLL_INTERVAL_SECS".to_string(),
                message: "must be a non-negative number of seconds".to_string(),
            });
        }

        let retention: usize = parse_or(&get, "FEED_RETENTION", DEFAULT_RETENTION)?;
        if retention == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FEED_RETENTION".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_keys,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            templates,
            poll_interval: Duration::from_secs_f64(poll_secs),
            retention,
            processed_file: get("FEED_PROCESSED_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROCESSED_FILE)),
            replay_file: get("FEED_REPLAY_FILE").map(PathBuf::from),
            community_url: get("FEED_COMMUNITY_URL"),
            rng_seed: parse_opt(&get, "FEED_RNG_SEED")?,
            max_cycles: parse_opt(&get, "FEED_MAX_CYCLES")?,
        })
    }

    pub fn credential_pool(&self) -> Result<CredentialPool, ConfigError> {
        CredentialPool::new(self.api_keys.clone())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: self.poll_interval,
            retention: self.retention,
            max_cycles: self.max_cycles,
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_opt<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
