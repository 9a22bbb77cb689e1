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

//! Interfaces to the chains and to the external tree generation stages.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::ChainConfig,
    types::{
        CommitmentEvent, ConsensusBlock, ConsensusHead, ExecutionHeader, SnapshotCoordinate,
        TreeArtifact,
    },
};

#[async_trait]
pub trait ConsensusClient: Send + Sync {
    /// Returns `None` when no block was proposed at `slot`.
    async fn get_block(&self, slot: u64) -> Result<Option<ConsensusBlock>>;

    async fn get_head(&self) -> Result<ConsensusHead>;

    async fn get_chain_config(&self) -> Result<ChainConfig>;
}

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Header of block `number`, or of the latest block when `None`.
    async fn header_by_number(&self, number: Option<u64>) -> Result<Option<ExecutionHeader>>;

    /// Header of the latest block produced at or before `timestamp`.
    async fn header_by_time(&self, timestamp: u64) -> Result<ExecutionHeader>;
}

/// Read access to the rewards protocol contracts.
#[async_trait]
pub trait ProtocolStateReader: Send + Sync {
    async fn current_interval_index(&self) -> Result<u64>;

    async fn current_interval_start_time(&self) -> Result<DateTime<Utc>>;

    /// Configured interval length in seconds.
    async fn interval_duration(&self) -> Result<u64>;

    /// The commitment published for interval `index`, if it has been closed.
    async fn commitment_event(&self, index: u64) -> Result<Option<CommitmentEvent>>;
}

/// Supplies the validator and balance snapshot a tree is built from.
#[async_trait]
pub trait NetworkStateSource: Send + Sync {
    type State: Send + Sync;

    async fn state_for_slot(&self, slot: u64) -> Result<Self::State>;
}

#[async_trait]
pub trait TreeConstructionEngine<S>: Send + Sync
where
    S: Send + Sync,
{
    async fn generate(&self, coordinate: &SnapshotCoordinate, state: &S) -> Result<TreeArtifact>;
}
