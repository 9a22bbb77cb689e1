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

//! Snapshot resolution for the interval that is still open.

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;

use crate::{
    epoch::{datetime_to_unix, EpochTimeConverter},
    errors::{Result, SnapshotError},
    locator::{FinalizedSlotLocator, LocatedSlot},
    overrider::BoundaryOverrider,
    ports::{ConsensusClient, ExecutionClient, ProtocolStateReader},
    types::{ExecutionHeader, PairingMode, SnapshotCoordinate},
};

/// Summary of the current interval, as printed by `treegen --network-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub current: SnapshotCoordinate,
    /// First slot after the previous interval's snapshot, if there was one.
    pub start_slot: Option<u64>,
    /// First execution block after the previous interval's snapshot, if there was one.
    pub start_execution_block: Option<u64>,
}

pub struct SnapshotResolver<'a, C, E, P> {
    consensus: &'a C,
    execution: &'a E,
    protocol: &'a P,
    converter: EpochTimeConverter,
}

impl<'a, C, E, P> SnapshotResolver<'a, C, E, P>
where
    C: ConsensusClient,
    E: ExecutionClient,
    P: ProtocolStateReader,
{
    pub fn new(
        consensus: &'a C,
        execution: &'a E,
        protocol: &'a P,
        converter: EpochTimeConverter,
    ) -> Self {
        Self { consensus, execution, protocol, converter }
    }

    /// Resolves the open interval against the latest finalized slot, with `now` as its end.
    pub async fn resolve_current(&self) -> Result<SnapshotCoordinate> {
        let interval_index = self
            .protocol
            .current_interval_index()
            .await
            .context("Failed to get current reward index")?;
        let start_time = self
            .protocol
            .current_interval_start_time()
            .await
            .context("Failed to get claim interval start time")?;
        let duration = self
            .protocol
            .interval_duration()
            .await
            .context("Failed to get claim interval time")?;
        if duration == 0 {
            return Err(SnapshotError::ZeroIntervalDuration);
        }

        let head = self
            .execution
            .header_by_number(None)
            .await
            .context("Failed to get latest block header")?
            .context("Execution client returned no latest block")?;
        let intervals_elapsed =
            head.timestamp.saturating_sub(datetime_to_unix(&start_time)) / duration;
        let end_time = Utc::now();

        let located = FinalizedSlotLocator::new(self.consensus, self.converter)
            .latest_finalized(None)
            .await?;
        let execution_header = self.paired_header(&located).await?;

        Ok(SnapshotCoordinate {
            interval_index,
            start_time,
            end_time,
            consensus_slot: located.slot,
            execution_header,
            intervals_elapsed,
        })
    }

    /// Like [Self::resolve_current], ending the interval at `target_epoch` when given.
    pub async fn resolve_current_with_target(
        &self,
        target_epoch: Option<u64>,
    ) -> Result<SnapshotCoordinate> {
        let coordinate = self.resolve_current().await?;
        let Some(target_epoch) = target_epoch else {
            return Ok(coordinate);
        };

        tracing::info!("Overriding the target epoch of the current interval to {}", target_epoch);
        BoundaryOverrider::new(self.consensus, self.execution, self.converter)
            .override_coordinate(coordinate, target_epoch)
            .await
    }

    pub async fn network_info(&self) -> Result<NetworkInfo> {
        let current = self.resolve_current().await?;

        let (start_slot, start_execution_block) = if current.interval_index > 0 {
            let previous = current.interval_index - 1;
            let event = self
                .protocol
                .commitment_event(previous)
                .await
                .with_context(|| {
                    format!("Failed to get rewards submission event for interval {previous}")
                })?
                .ok_or(SnapshotError::UnknownInterval { index: previous })?;
            (Some(event.consensus_block + 1), Some(event.execution_block + 1))
        } else {
            (None, None)
        };

        Ok(NetworkInfo { current, start_slot, start_execution_block })
    }

    async fn paired_header(&self, located: &LocatedSlot) -> Result<ExecutionHeader> {
        match located.pairing() {
            PairingMode::DeriveByTime(timestamp) => {
                // No EL data, the merge hadn't happened yet at this slot
                tracing::debug!(
                    "Slot {} is pre-merge, matching the EL block by time {}",
                    located.slot,
                    timestamp
                );
                Ok(self
                    .execution
                    .header_by_time(timestamp)
                    .await
                    .with_context(|| format!("Failed to get EL block for time {timestamp}"))?)
            }
            PairingMode::DirectByNumber(number) => self
                .execution
                .header_by_number(Some(number))
                .await
                .with_context(|| format!("Failed to get EL block {number}"))?
                .ok_or(SnapshotError::MissingExecutionPairing {
                    slot: located.slot,
                    execution_block: number,
                }),
        }
    }
}
