// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::SnapshotError;

/// Consensus chain parameters needed to convert between slots, epochs and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub genesis_time: u64,
    pub genesis_epoch: u64,
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
    pub seconds_per_epoch: u64,
    /// Chain ID of the deposit contract the beacon node follows.
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Prater,
    Holesky,
}

impl Network {
    pub fn from_chain_id(chain_id: u64) -> Result<Self, SnapshotError> {
        match chain_id {
            1 => Ok(Network::Mainnet),
            5 => Ok(Network::Prater),
            17000 => Ok(Network::Holesky),
            _ => Err(SnapshotError::ChainIdentificationFailure { chain_id }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Prater => "prater",
            Network::Holesky => "holesky",
        };
        f.write_str(name)
    }
}

pub mod defaults {
    /// Expected peak of simultaneous execution client requests issued by tree generation.
    pub const MAX_CONCURRENT_EXECUTION_REQUESTS: usize = 200;

    /// Block span of a single `eth_getLogs` request.
    pub const LOG_QUERY_CHUNK_SIZE: u64 = 5000;

    pub fn max_concurrent_requests() -> usize {
        MAX_CONCURRENT_EXECUTION_REQUESTS
    }

    pub fn log_query_chunk_size() -> u64 {
        LOG_QUERY_CHUNK_SIZE
    }
}

/// Tool settings, optionally loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Connection pool size handed to the execution client.
    #[serde(default = "defaults::max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "defaults::log_query_chunk_size")]
    pub log_query_chunk_size: u64,
    /// First execution block scanned when searching for commitment events.
    #[serde(default)]
    pub commitment_search_from_block: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: defaults::max_concurrent_requests(),
            log_query_chunk_size: defaults::log_query_chunk_size(),
            commitment_search_from_block: 0,
        }
    }
}

impl Settings {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&data)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_concurrent_requests > 0,
            "max_concurrent_requests must be non-zero"
        );
        anyhow::ensure!(self.log_query_chunk_size > 0, "log_query_chunk_size must be non-zero");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn identifies_known_networks() {
        assert_eq!(Network::from_chain_id(1).unwrap(), Network::Mainnet);
        assert_eq!(Network::from_chain_id(5).unwrap(), Network::Prater);
        assert_eq!(Network::from_chain_id(17000).unwrap(), Network::Holesky);
        assert_eq!(Network::Holesky.to_string(), "holesky");
    }

    #[test]
    fn unknown_chain_id_is_rejected() {
        let err = Network::from_chain_id(1337803).unwrap_err();
        assert!(matches!(err, SnapshotError::ChainIdentificationFailure { chain_id: 1337803 }));
    }

    #[tokio::test]
    async fn load_partial_settings_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "commitment_search_from_block = 13325233").unwrap();

        let settings = Settings::load(file.path()).await.unwrap();
        assert_eq!(settings.commitment_search_from_block, 13325233);
        assert_eq!(settings.max_concurrent_requests, defaults::MAX_CONCURRENT_EXECUTION_REQUESTS);
        assert_eq!(settings.log_query_chunk_size, defaults::LOG_QUERY_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn load_rejects_zero_chunk_size() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log_query_chunk_size = 0").unwrap();

        let err = Settings::load(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("log_query_chunk_size"));
    }
}
