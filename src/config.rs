// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase web API key (Identity Toolkit requests)
    pub firebase_api_key: String,
    /// GCP project ID backing Firestore
    pub gcp_project_id: String,
    /// Storage bucket for profile photos
    pub storage_bucket: String,
    /// Local API port
    pub port: u16,

    // --- Location session ---
    /// Seconds between two last-known-position reads while connected
    pub poll_interval_secs: u64,
    /// Maximum number of remote users rendered at once
    pub presence_fanout: u32,
    /// Attempts per presence write before the failure is surfaced
    pub publish_max_attempts: u32,
    /// Initial backoff between presence write attempts (doubles each retry)
    pub publish_backoff_ms: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            port: 8080,
            poll_interval_secs: 3,
            presence_fanout: 100,
            publish_max_attempts: 3,
            publish_backoff_ms: 250,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());
        let storage_bucket = env::var("FIREBASE_STORAGE_BUCKET")
            .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id));

        let config = Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            gcp_project_id,
            storage_bucket,
            port: parse_or("PORT", 8080)?,
            poll_interval_secs: parse_or("POLL_INTERVAL_SECS", 3)?,
            presence_fanout: parse_or("PRESENCE_FANOUT", 100)?,
            publish_max_attempts: parse_or("PUBLISH_MAX_ATTEMPTS", 3)?,
            publish_backoff_ms: parse_or("PUBLISH_BACKOFF_MS", 250)?,
        };

        if config.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("POLL_INTERVAL_SECS", "0".to_string()));
        }
        if config.presence_fanout == 0 {
            return Err(ConfigError::Invalid("PRESENCE_FANOUT", "0".to_string()));
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn publish_backoff(&self) -> Duration {
        Duration::from_millis(self.publish_backoff_ms)
    }
}

/// Read an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
