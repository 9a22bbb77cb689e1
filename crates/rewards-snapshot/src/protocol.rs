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

//! Reader for the rewards pool contract.

use alloy::{
    primitives::{keccak256, Address, B256, U256},
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter},
    sol,
    sol_types::SolEvent,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::Settings, epoch::unix_to_datetime, ports::ProtocolStateReader, types::CommitmentEvent,
};

sol! {
    #[sol(rpc)]
    interface IProtocolStorage {
        function getAddress(bytes32 key) external view returns (address);
    }

    struct RewardSubmission {
        uint256 rewardIndex;
        uint256 executionBlock;
        uint256 consensusBlock;
        bytes32 merkleRoot;
        string merkleTreeCID;
        uint256 intervalsPassed;
        uint256 treasuryRPL;
        uint256[] trustedNodeRPL;
        uint256[] nodeRPL;
        uint256[] nodeETH;
        uint256 userETH;
    }

    #[sol(rpc)]
    interface IRewardsPool {
        function getRewardIndex() external view returns (uint256);
        function getClaimIntervalTimeStart() external view returns (uint256);
        function getClaimIntervalTime() external view returns (uint256);

        event RewardSnapshot(
            uint256 indexed rewardIndex,
            RewardSubmission submission,
            uint256 intervalStartTime,
            uint256 intervalEndTime,
            uint256 time
        );
    }
}

/// Name the rewards pool is registered under in the storage contract.
pub const REWARDS_POOL_CONTRACT_NAME: &str = "rocketRewardsPool";

/// Storage key of a registered contract's address.
pub fn contract_address_key(name: &str) -> B256 {
    keccak256([b"contract.address".as_slice(), name.as_bytes()].concat())
}

fn to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value).with_context(|| format!("{field} does not fit in 64 bits: {value}"))
}

fn to_datetime(value: U256, field: &str) -> Result<DateTime<Utc>> {
    let seconds = to_u64(value, field)?;
    unix_to_datetime(seconds).with_context(|| format!("{field} is not a valid time: {seconds}"))
}

impl TryFrom<IRewardsPool::RewardSnapshot> for CommitmentEvent {
    type Error = anyhow::Error;

    fn try_from(event: IRewardsPool::RewardSnapshot) -> Result<Self> {
        let submission = event.submission;
        Ok(CommitmentEvent {
            index: to_u64(event.rewardIndex, "rewardIndex")?,
            consensus_block: to_u64(submission.consensusBlock, "consensusBlock")?,
            execution_block: to_u64(submission.executionBlock, "executionBlock")?,
            start_time: to_datetime(event.intervalStartTime, "intervalStartTime")?,
            end_time: to_datetime(event.intervalEndTime, "intervalEndTime")?,
            intervals_elapsed: to_u64(submission.intervalsPassed, "intervalsPassed")?,
            canonical_root: submission.merkleRoot,
        })
    }
}

/// Block ranges of at most `chunk_size` blocks covering `from..=to`, newest first.
fn chunks_newest_first(from: u64, to: u64, chunk_size: u64) -> impl Iterator<Item = (u64, u64)> {
    let mut next_to = (from <= to).then_some(to);
    std::iter::from_fn(move || {
        let current_to = next_to?;
        let current_from = current_to.saturating_sub(chunk_size - 1).max(from);
        next_to = current_from.checked_sub(1).filter(|block| *block >= from);
        Some((current_from, current_to))
    })
}

pub struct RewardsPoolReader<P> {
    provider: P,
    pool_address: Address,
    search_from_block: u64,
    chunk_size: u64,
}

impl<P> RewardsPoolReader<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, pool_address: Address, settings: &Settings) -> Self {
        Self {
            provider,
            pool_address,
            search_from_block: settings.commitment_search_from_block,
            chunk_size: settings.log_query_chunk_size.max(1),
        }
    }

    /// Looks up the rewards pool address registered in the storage contract.
    pub async fn from_storage(
        provider: P,
        storage_address: Address,
        settings: &Settings,
    ) -> Result<Self> {
        let storage = IProtocolStorage::new(storage_address, provider.clone());
        let pool_address = storage
            .getAddress(contract_address_key(REWARDS_POOL_CONTRACT_NAME))
            .call()
            .await
            .with_context(|| {
                format!("Failed to resolve rewards pool from storage {storage_address}")
            })?;
        anyhow::ensure!(
            pool_address != Address::ZERO,
            "Storage contract {storage_address} has no rewards pool registered"
        );
        tracing::debug!("Rewards pool is at {}", pool_address);

        Ok(Self::new(provider, pool_address, settings))
    }

    pub fn pool_address(&self) -> Address {
        self.pool_address
    }

    fn pool(&self) -> IRewardsPool::IRewardsPoolInstance<P> {
        IRewardsPool::new(self.pool_address, self.provider.clone())
    }
}

#[async_trait]
impl<P> ProtocolStateReader for RewardsPoolReader<P>
where
    P: Provider + Clone + Send + Sync,
{
    async fn current_interval_index(&self) -> Result<u64> {
        let index = self.pool().getRewardIndex().call().await.context("getRewardIndex failed")?;
        to_u64(index, "rewardIndex")
    }

    async fn current_interval_start_time(&self) -> Result<DateTime<Utc>> {
        let start = self
            .pool()
            .getClaimIntervalTimeStart()
            .call()
            .await
            .context("getClaimIntervalTimeStart failed")?;
        to_datetime(start, "claimIntervalTimeStart")
    }

    async fn interval_duration(&self) -> Result<u64> {
        let duration =
            self.pool().getClaimIntervalTime().call().await.context("getClaimIntervalTime failed")?;
        to_u64(duration, "claimIntervalTime")
    }

    async fn commitment_event(&self, index: u64) -> Result<Option<CommitmentEvent>> {
        let latest = self.provider.get_block_number().await.context("Failed to get block number")?;
        let filter = Filter::new()
            .address(self.pool_address)
            .event_signature(IRewardsPool::RewardSnapshot::SIGNATURE_HASH)
            .topic1(B256::from(U256::from(index).to_be_bytes::<32>()));

        for (from, to) in chunks_newest_first(self.search_from_block, latest, self.chunk_size) {
            let chunk_filter = filter
                .clone()
                .from_block(BlockNumberOrTag::Number(from))
                .to_block(BlockNumberOrTag::Number(to));
            let logs = self
                .provider
                .get_logs(&chunk_filter)
                .await
                .with_context(|| {
                    format!("Failed to get RewardSnapshot logs for blocks {from}-{to}")
                })?;

            if let Some(log) = logs.into_iter().next() {
                let decoded = log
                    .log_decode::<IRewardsPool::RewardSnapshot>()
                    .context("Failed to decode RewardSnapshot log")?;
                return CommitmentEvent::try_from(decoded.inner.data).map(Some);
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(index: u64) -> IRewardsPool::RewardSnapshot {
        IRewardsPool::RewardSnapshot {
            rewardIndex: U256::from(index),
            submission: RewardSubmission {
                rewardIndex: U256::from(index),
                executionBlock: U256::from(15_400_000),
                consensusBlock: U256::from(4_600_000),
                merkleRoot: B256::repeat_byte(0x11),
                merkleTreeCID: String::new(),
                intervalsPassed: U256::from(1),
                treasuryRPL: U256::ZERO,
                trustedNodeRPL: vec![],
                nodeRPL: vec![],
                nodeETH: vec![],
                userETH: U256::ZERO,
            },
            intervalStartTime: U256::from(1_659_591_339u64),
            intervalEndTime: U256::from(1_662_010_539u64),
            time: U256::from(1_662_011_000u64),
        }
    }

    #[test]
    fn test_contract_address_key() {
        let expected = keccak256(b"contract.addressrocketRewardsPool");
        assert_eq!(contract_address_key(REWARDS_POOL_CONTRACT_NAME), expected);
    }

    #[test]
    fn test_commitment_event_from_snapshot() {
        let event = CommitmentEvent::try_from(snapshot(4)).unwrap();
        assert_eq!(event.index, 4);
        assert_eq!(event.consensus_block, 4_600_000);
        assert_eq!(event.execution_block, 15_400_000);
        assert_eq!(event.start_time.timestamp(), 1_659_591_339);
        assert_eq!(event.end_time.timestamp(), 1_662_010_539);
        assert_eq!(event.intervals_elapsed, 1);
        assert_eq!(event.canonical_root, B256::repeat_byte(0x11));
    }

    #[test]
    fn test_commitment_event_rejects_oversized_fields() {
        let mut oversized = snapshot(4);
        oversized.submission.consensusBlock = U256::MAX;
        let err = CommitmentEvent::try_from(oversized).unwrap_err();
        assert!(err.to_string().contains("consensusBlock"));
    }

    #[test]
    fn test_chunks_newest_first() {
        let chunks: Vec<_> = chunks_newest_first(100, 12_000, 5000).collect();
        assert_eq!(chunks, vec![(7001, 12_000), (2001, 7000), (100, 2000)]);

        let chunks: Vec<_> = chunks_newest_first(0, 4999, 5000).collect();
        assert_eq!(chunks, vec![(0, 4999)]);

        assert_eq!(chunks_newest_first(10, 9, 5000).count(), 0);
    }
}
