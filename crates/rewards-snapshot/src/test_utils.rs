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

//! In-memory chains and tree stages for tests.
//!
//! The fixtures share one layout: genesis at time 0 and slot 0, 32 slots per epoch,
//! 12 seconds per slot, and the execution block paired with slot `s` is
//! `EXECUTION_OFFSET + s` with the same timestamp as the slot.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use alloy::primitives::{keccak256, B256};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::ChainConfig,
    ports::{
        ConsensusClient, ExecutionClient, NetworkStateSource, ProtocolStateReader,
        TreeConstructionEngine,
    },
    types::{
        CommitmentEvent, ConsensusBlock, ConsensusHead, ExecutionHeader, SnapshotCoordinate,
        TreeArtifact,
    },
};

pub const EXECUTION_OFFSET: u64 = 10_000;
pub const SECONDS_PER_SLOT: u64 = 12;

pub fn test_chain_config() -> ChainConfig {
    ChainConfig {
        genesis_time: 0,
        genesis_epoch: 0,
        slots_per_epoch: 32,
        seconds_per_slot: SECONDS_PER_SLOT,
        seconds_per_epoch: 32 * SECONDS_PER_SLOT,
        chain_id: 1,
    }
}

pub fn datetime(seconds: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds as i64, 0).unwrap()
}

pub fn header_for_block(number: u64, timestamp: u64) -> ExecutionHeader {
    ExecutionHeader { number, hash: B256::left_padding_from(&number.to_be_bytes()), timestamp }
}

/// Header paired with `slot` under the fixture layout.
pub fn header_for_slot(slot: u64) -> ExecutionHeader {
    header_for_block(EXECUTION_OFFSET + slot, slot * SECONDS_PER_SLOT)
}

pub struct MockConsensus {
    config: ChainConfig,
    finalized_epoch: u64,
    blocks: BTreeMap<u64, ConsensusBlock>,
    fail_at: Option<u64>,
    queried: Mutex<Vec<u64>>,
}

impl MockConsensus {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            finalized_epoch: 0,
            blocks: BTreeMap::new(),
            fail_at: None,
            queried: Mutex::new(Vec::new()),
        }
    }

    /// Adds a block at each slot, paired with `execution_block(slot)`.
    pub fn with_blocks(
        mut self,
        slots: impl IntoIterator<Item = u64>,
        execution_block: impl Fn(u64) -> u64,
    ) -> Self {
        for slot in slots {
            let block = ConsensusBlock { slot, execution_block_number: execution_block(slot) };
            self.blocks.insert(slot, block);
        }
        self
    }

    /// Blocks at every slot of the range, paired according to the fixture layout.
    pub fn with_post_merge_blocks(self, slots: impl IntoIterator<Item = u64>) -> Self {
        self.with_blocks(slots, |slot| EXECUTION_OFFSET + slot)
    }

    pub fn without_slots(mut self, slots: impl IntoIterator<Item = u64>) -> Self {
        for slot in slots {
            self.blocks.remove(&slot);
        }
        self
    }

    pub fn with_finalized_epoch(mut self, epoch: u64) -> Self {
        self.finalized_epoch = epoch;
        self
    }

    pub fn failing_at(mut self, slot: u64) -> Self {
        self.fail_at = Some(slot);
        self
    }

    /// Slots requested so far, in request order.
    pub fn queried_slots(&self) -> Vec<u64> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConsensusClient for MockConsensus {
    async fn get_block(&self, slot: u64) -> Result<Option<ConsensusBlock>> {
        self.queried.lock().unwrap().push(slot);
        if self.fail_at == Some(slot) {
            bail!("beacon node unavailable");
        }
        Ok(self.blocks.get(&slot).copied())
    }

    async fn get_head(&self) -> Result<ConsensusHead> {
        Ok(ConsensusHead { finalized_epoch: self.finalized_epoch })
    }

    async fn get_chain_config(&self) -> Result<ChainConfig> {
        Ok(self.config)
    }
}

#[derive(Default)]
pub struct MockExecution {
    headers: BTreeMap<u64, ExecutionHeader>,
    time_queries: Mutex<Vec<u64>>,
}

impl MockExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers paired with each slot of the range under the fixture layout.
    pub fn with_slot_headers(mut self, slots: impl IntoIterator<Item = u64>) -> Self {
        for slot in slots {
            let header = header_for_slot(slot);
            self.headers.insert(header.number, header);
        }
        self
    }

    pub fn with_header(mut self, header: ExecutionHeader) -> Self {
        self.headers.insert(header.number, header);
        self
    }

    pub fn time_queries(&self) -> Vec<u64> {
        self.time_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionClient for MockExecution {
    async fn header_by_number(&self, number: Option<u64>) -> Result<Option<ExecutionHeader>> {
        Ok(match number {
            Some(number) => self.headers.get(&number).copied(),
            None => self.headers.values().next_back().copied(),
        })
    }

    async fn header_by_time(&self, timestamp: u64) -> Result<ExecutionHeader> {
        self.time_queries.lock().unwrap().push(timestamp);
        self.headers
            .values()
            .rev()
            .find(|header| header.timestamp <= timestamp)
            .copied()
            .ok_or_else(|| anyhow!("no execution block at or before {timestamp}"))
    }
}

pub struct MockProtocol {
    pub index: u64,
    pub start_time: DateTime<Utc>,
    pub duration: u64,
    pub events: HashMap<u64, CommitmentEvent>,
}

impl MockProtocol {
    pub fn new(index: u64, start_time: DateTime<Utc>, duration: u64) -> Self {
        Self { index, start_time, duration, events: HashMap::new() }
    }

    pub fn with_event(mut self, event: CommitmentEvent) -> Self {
        self.events.insert(event.index, event);
        self
    }
}

#[async_trait]
impl ProtocolStateReader for MockProtocol {
    async fn current_interval_index(&self) -> Result<u64> {
        Ok(self.index)
    }

    async fn current_interval_start_time(&self) -> Result<DateTime<Utc>> {
        Ok(self.start_time)
    }

    async fn interval_duration(&self) -> Result<u64> {
        Ok(self.duration)
    }

    async fn commitment_event(&self, index: u64) -> Result<Option<CommitmentEvent>> {
        Ok(self.events.get(&index).cloned())
    }
}

/// State source whose state is simply the slot it was taken at.
#[derive(Default)]
pub struct MockStateSource {
    requested: Mutex<Vec<u64>>,
}

impl MockStateSource {
    pub fn requested_slots(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkStateSource for MockStateSource {
    type State = u64;

    async fn state_for_slot(&self, slot: u64) -> Result<u64> {
        self.requested.lock().unwrap().push(slot);
        Ok(slot)
    }
}

/// Deterministic stand-in for tree generation: the root commits to the snapshot boundary.
pub struct DigestTreeEngine;

impl DigestTreeEngine {
    pub fn root_for(interval_index: u64, consensus_slot: u64, execution_block: u64) -> B256 {
        let mut preimage = Vec::with_capacity(24);
        preimage.extend_from_slice(&interval_index.to_be_bytes());
        preimage.extend_from_slice(&consensus_slot.to_be_bytes());
        preimage.extend_from_slice(&execution_block.to_be_bytes());
        keccak256(preimage)
    }
}

#[async_trait]
impl TreeConstructionEngine<u64> for DigestTreeEngine {
    async fn generate(&self, coordinate: &SnapshotCoordinate, state: &u64) -> Result<TreeArtifact> {
        if *state != coordinate.consensus_slot {
            bail!("state taken at slot {state}, snapshot is at {}", coordinate.consensus_slot);
        }
        let root = Self::root_for(
            coordinate.interval_index,
            coordinate.consensus_slot,
            coordinate.execution_header.number,
        );
        Ok(TreeArtifact { root, payload: root.to_vec() })
    }
}
