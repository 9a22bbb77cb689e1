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

//! Backward search for the nearest slot that actually has a proposed block.

use anyhow::Context;

use crate::{
    epoch::EpochTimeConverter,
    errors::{Result, SnapshotError},
    ports::ConsensusClient,
    types::{ConsensusBlock, PairingMode},
};

/// A slot with a proposed block, and where its execution data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedSlot {
    pub slot: u64,
    /// 0 when the block predates the merge.
    pub execution_block_number: u64,
    pub slot_time: u64,
}

impl LocatedSlot {
    pub fn is_pre_merge(&self) -> bool {
        self.execution_block_number == 0
    }

    pub fn pairing(&self) -> PairingMode {
        if self.is_pre_merge() {
            PairingMode::DeriveByTime(self.slot_time)
        } else {
            PairingMode::DirectByNumber(self.execution_block_number)
        }
    }
}

pub struct FinalizedSlotLocator<'a, C> {
    consensus: &'a C,
    converter: EpochTimeConverter,
}

impl<'a, C> FinalizedSlotLocator<'a, C>
where
    C: ConsensusClient,
{
    pub fn new(consensus: &'a C, converter: EpochTimeConverter) -> Self {
        Self { consensus, converter }
    }

    /// Walks down from `upper_bound` until a slot with a block is found.
    ///
    /// The only lower bound is the genesis slot.
    pub async fn locate(&self, upper_bound: u64) -> Result<LocatedSlot> {
        let genesis_slot = self.converter.genesis_slot();
        if upper_bound < genesis_slot {
            return Err(SnapshotError::InvalidSlot { slot: upper_bound });
        }

        for slot in (genesis_slot..=upper_bound).rev() {
            match self.fetch_block(slot).await? {
                Some(block) => return self.located(block),
                None => {
                    tracing::info!("Slot {} was missing, trying the previous one...", slot);
                }
            }
        }

        Err(SnapshotError::NoProposedBlockSinceGenesis { upper_bound })
    }

    /// Latest block of `target_epoch`, or of the latest finalized epoch when `None`.
    pub async fn latest_finalized(&self, target_epoch: Option<u64>) -> Result<LocatedSlot> {
        let head = self.consensus.get_head().await.context("Failed to get beacon head")?;
        let finalized_epoch = head.finalized_epoch;

        let epoch = match target_epoch {
            Some(target_epoch) if target_epoch > finalized_epoch => {
                return Err(SnapshotError::EpochNotFinalized { target_epoch, finalized_epoch });
            }
            Some(target_epoch) => target_epoch,
            None => finalized_epoch,
        };

        self.locate(self.converter.epoch_end_slot(epoch)?).await
    }

    /// Latest block within `epoch`, never looking into earlier epochs.
    pub async fn last_proposed_block_in_epoch(&self, epoch: u64) -> Result<LocatedSlot> {
        let range = self.converter.epoch_to_slot_range(epoch)?;

        for slot in range.descending() {
            match self.fetch_block(slot).await? {
                Some(block) => return self.located(block),
                None => {
                    tracing::info!(
                        "No proposal in epoch {} at slot {}...",
                        epoch,
                        slot - range.first
                    );
                }
            }
        }

        Err(SnapshotError::NoProposedBlockInEpoch { epoch })
    }

    async fn fetch_block(&self, slot: u64) -> Result<Option<ConsensusBlock>> {
        self.consensus
            .get_block(slot)
            .await
            .with_context(|| format!("Failed to get beacon block {slot}"))
            .map_err(SnapshotError::from)
    }

    fn located(&self, block: ConsensusBlock) -> Result<LocatedSlot> {
        Ok(LocatedSlot {
            slot: block.slot,
            execution_block_number: block.execution_block_number,
            slot_time: self.converter.slot_to_time(block.slot)?,
        })
    }
}
