// src/config.rs
use anyhow::{Context, Result};
use std::env;

/// Credentials for the Kaggle dataset hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub username: String,
    pub key: String,
}

/// Target project and service-account key for BigQuery.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub project_id: String,
    /// JSON service-account key, passed through the environment as a blob.
    pub sa_key_json: String,
}

/// Everything an uploader binary needs, built once at startup and passed by
/// reference. No other module reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub hub: HubConfig,
    pub warehouse: WarehouseConfig,
}

fn require(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("missing required environment variable {}", name))
}

impl HubConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|name| env::var(name).ok())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            username: require(lookup, "KAGGLE_USERNAME")?,
            key: require(lookup, "KAGGLE_KEY")?,
        })
    }
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|name| env::var(name).ok())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            project_id: require(lookup, "GCP_PROJECT_ID")?,
            sa_key_json: require(lookup, "GCP_SA_KEY")?,
        })
    }
}

impl AppConfig {
    /// Read the full configuration, failing before any client is built if a
    /// variable is absent.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            hub: HubConfig::from_env()?,
            warehouse: WarehouseConfig::from_env()?,
        })
    }
}
