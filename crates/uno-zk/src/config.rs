//! runtime configuration
//!
//! loaded from toml, every field has a default so a partial file works.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub prover: ProverConfig,
    pub aggregation: AggregationConfig,
    pub verifier: VerifierConfig,
}

/// per-game state policy
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    /// fail instead of double counting when a consumed card is consumed again
    pub reject_double_consume: bool,
}

/// external proving service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProverConfig {
    /// base url of the prover http service
    pub url: String,
    /// per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8787".into(),
            timeout_secs: 120,
        }
    }
}

/// proof aggregation service, polled after submission
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregationConfig {
    pub url: String,
    /// polls before giving up
    pub max_attempts: u32,
    /// fixed delay between polls
    pub poll_interval_ms: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8788".into(),
            max_attempts: 30,
            poll_interval_ms: 2_000,
        }
    }
}

/// verifier contract, pinned to the chain it is deployed on
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// rpc used for read-only verification, independent of any signer
    pub rpc_url: String,
    pub chain_id: u64,
    /// hex contract address, empty when not deployed
    pub contract_address: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://sepolia.base.org".into(),
            chain_id: 84532,
            contract_address: String::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
