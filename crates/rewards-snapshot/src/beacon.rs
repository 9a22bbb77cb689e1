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

//! Client for the standard beacon node REST API.

use anyhow::{bail, ensure, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use url::Url;

use crate::{
    config::ChainConfig,
    ports::ConsensusClient,
    types::{ConsensusBlock, ConsensusHead},
};

/// Beacon API integers are JSON strings.
fn quoted_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct GenesisData {
    #[serde(deserialize_with = "quoted_u64")]
    genesis_time: u64,
}

#[derive(Deserialize)]
struct SpecData {
    #[serde(rename = "SECONDS_PER_SLOT", deserialize_with = "quoted_u64")]
    seconds_per_slot: u64,
    #[serde(rename = "SLOTS_PER_EPOCH", deserialize_with = "quoted_u64")]
    slots_per_epoch: u64,
}

#[derive(Deserialize)]
struct DepositContractData {
    #[serde(deserialize_with = "quoted_u64")]
    chain_id: u64,
}

#[derive(Deserialize)]
struct Checkpoint {
    #[serde(deserialize_with = "quoted_u64")]
    epoch: u64,
}

#[derive(Deserialize)]
struct FinalityCheckpoints {
    finalized: Checkpoint,
}

#[derive(Deserialize)]
struct SignedBlock {
    message: BlockMessage,
}

#[derive(Deserialize)]
struct BlockMessage {
    #[serde(deserialize_with = "quoted_u64")]
    slot: u64,
    body: BlockBody,
}

#[derive(Deserialize)]
struct BlockBody {
    /// Absent on phase0 and altair blocks.
    #[serde(default)]
    execution_payload: Option<ExecutionPayload>,
}

#[derive(Deserialize)]
struct ExecutionPayload {
    #[serde(deserialize_with = "quoted_u64")]
    block_number: u64,
}

#[derive(Clone, Debug)]
pub struct BeaconClient {
    client: Client,
    base_url: Url,
}

impl BeaconClient {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("treegen/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// GET `path`, returning `None` on 404.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.base_url.join(path).context("Failed to build URL")?;
        let url_str = url.to_string();
        tracing::debug!("Requesting {}", url_str);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url_str))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("Beacon API error from {}: {}", url_str, response.status());
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url_str))?;
        Ok(Some(envelope.data))
    }

    async fn get_required<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get(path).await?.with_context(|| format!("Beacon node returned 404 for {path}"))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let data: DepositContractData = self.get_required("eth/v1/config/deposit_contract").await?;
        Ok(data.chain_id)
    }
}

#[async_trait]
impl ConsensusClient for BeaconClient {
    async fn get_block(&self, slot: u64) -> Result<Option<ConsensusBlock>> {
        let block: Option<SignedBlock> = self.get(&format!("eth/v2/beacon/blocks/{slot}")).await?;
        Ok(block.map(|block| ConsensusBlock {
            slot: block.message.slot,
            execution_block_number: block
                .message
                .body
                .execution_payload
                .map(|payload| payload.block_number)
                .unwrap_or_default(),
        }))
    }

    async fn get_head(&self) -> Result<ConsensusHead> {
        let checkpoints: FinalityCheckpoints =
            self.get_required("eth/v1/beacon/states/head/finality_checkpoints").await?;
        Ok(ConsensusHead { finalized_epoch: checkpoints.finalized.epoch })
    }

    async fn get_chain_config(&self) -> Result<ChainConfig> {
        let genesis: GenesisData = self.get_required("eth/v1/beacon/genesis").await?;
        let spec: SpecData = self.get_required("eth/v1/config/spec").await?;
        let chain_id = self.chain_id().await?;

        ensure!(spec.slots_per_epoch > 0, "Beacon node reports SLOTS_PER_EPOCH of 0");
        ensure!(spec.seconds_per_slot > 0, "Beacon node reports SECONDS_PER_SLOT of 0");
        let seconds_per_epoch =
            spec.seconds_per_slot.checked_mul(spec.slots_per_epoch).with_context(|| {
                format!(
                    "Epoch length overflows: {} slots of {} seconds",
                    spec.slots_per_epoch, spec.seconds_per_slot
                )
            })?;

        Ok(ChainConfig {
            genesis_time: genesis.genesis_time,
            genesis_epoch: 0,
            slots_per_epoch: spec.slots_per_epoch,
            seconds_per_slot: spec.seconds_per_slot,
            seconds_per_epoch,
            chain_id,
        })
    }
}
