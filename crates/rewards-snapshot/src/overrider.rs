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

//! Moves the end of an interval back to an earlier epoch inside it.

use alloy::primitives::B256;
use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::{
    epoch::{datetime_to_unix, EpochTimeConverter},
    errors::{Result, SnapshotError},
    locator::{FinalizedSlotLocator, LocatedSlot},
    ports::{ConsensusClient, ExecutionClient},
    types::{CommitmentEvent, SnapshotCoordinate},
};

/// Where a target epoch falls relative to an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// The target is the interval's own end epoch, nothing to rewrite.
    NaturalEnd,
    Interior,
}

/// The part of an interval boundary an override is checked against.
struct IntervalBounds {
    start_time: u64,
    end_slot: u64,
    end_time: u64,
}

pub struct BoundaryOverrider<'a, C, E> {
    locator: FinalizedSlotLocator<'a, C>,
    execution: &'a E,
    converter: EpochTimeConverter,
}

impl<'a, C, E> BoundaryOverrider<'a, C, E>
where
    C: ConsensusClient,
    E: ExecutionClient,
{
    pub fn new(consensus: &'a C, execution: &'a E, converter: EpochTimeConverter) -> Self {
        Self { locator: FinalizedSlotLocator::new(consensus, converter), execution, converter }
    }

    /// Ends a closed interval at the last proposed block of `target_epoch`.
    ///
    /// The derived event keeps `index`, `start_time` and `intervals_elapsed`; its root is
    /// cleared since no commitment was ever published for the shortened interval.
    pub async fn override_event(
        &self,
        event: CommitmentEvent,
        target_epoch: u64,
    ) -> Result<CommitmentEvent> {
        let bounds = IntervalBounds {
            start_time: datetime_to_unix(&event.start_time),
            end_slot: event.consensus_block,
            end_time: datetime_to_unix(&event.end_time),
        };
        if self.placement(&bounds, target_epoch)? == Placement::NaturalEnd {
            tracing::info!(
                "Target epoch {} is the end of interval {}, using the full interval",
                target_epoch,
                event.index
            );
            return Ok(event);
        }

        let located = self.relocate(&bounds, target_epoch).await?;

        Ok(CommitmentEvent {
            index: event.index,
            consensus_block: located.slot,
            execution_block: located.execution_block_number,
            start_time: event.start_time,
            end_time: self.end_time(&located)?,
            intervals_elapsed: event.intervals_elapsed,
            canonical_root: B256::ZERO,
        })
    }

    /// Ends a resolved snapshot at the last proposed block of `target_epoch`.
    pub async fn override_coordinate(
        &self,
        coordinate: SnapshotCoordinate,
        target_epoch: u64,
    ) -> Result<SnapshotCoordinate> {
        let bounds = IntervalBounds {
            start_time: datetime_to_unix(&coordinate.start_time),
            end_slot: coordinate.consensus_slot,
            end_time: datetime_to_unix(&coordinate.end_time),
        };
        if self.placement(&bounds, target_epoch)? == Placement::NaturalEnd {
            return Ok(coordinate);
        }

        let located = self.relocate(&bounds, target_epoch).await?;
        let execution_header = self
            .execution
            .header_by_number(Some(located.execution_block_number))
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch target epoch {}'s EL block header for EL block {}",
                    target_epoch, located.execution_block_number
                )
            })?
            .ok_or(SnapshotError::MissingExecutionPairing {
                slot: located.slot,
                execution_block: located.execution_block_number,
            })?;

        Ok(SnapshotCoordinate {
            end_time: self.end_time(&located)?,
            consensus_slot: located.slot,
            execution_header,
            ..coordinate
        })
    }

    fn placement(&self, bounds: &IntervalBounds, target_epoch: u64) -> Result<Placement> {
        let start_epoch = self.converter.time_to_epoch(bounds.start_time)?;
        let end_epoch = self.converter.slot_to_epoch(bounds.end_slot)?;
        let outside = SnapshotError::TargetOutsideInterval { target_epoch, start_epoch, end_epoch };

        if target_epoch == end_epoch {
            return Ok(Placement::NaturalEnd);
        }
        // A target in the start epoch would leave an empty interval
        if target_epoch <= start_epoch || target_epoch > end_epoch {
            return Err(outside);
        }

        let last_slot_time =
            self.converter.slot_to_time(self.converter.epoch_end_slot(target_epoch)?)?;
        if last_slot_time <= bounds.start_time || last_slot_time > bounds.end_time {
            return Err(outside);
        }
        Ok(Placement::Interior)
    }

    async fn relocate(&self, bounds: &IntervalBounds, target_epoch: u64) -> Result<LocatedSlot> {
        let located = self.locator.last_proposed_block_in_epoch(target_epoch).await?;
        if located.is_pre_merge() {
            return Err(SnapshotError::PreMergeTargetUnsupported {
                epoch: target_epoch,
                slot: located.slot,
            });
        }
        if located.slot_time <= bounds.start_time {
            return Err(SnapshotError::TargetOutsideInterval {
                target_epoch,
                start_epoch: self.converter.time_to_epoch(bounds.start_time)?,
                end_epoch: self.converter.slot_to_epoch(bounds.end_slot)?,
            });
        }

        tracing::info!(
            "Overriding interval end to slot {} (EL block {}) in epoch {}",
            located.slot,
            located.execution_block_number,
            target_epoch
        );
        Ok(located)
    }

    fn end_time(&self, located: &LocatedSlot) -> Result<DateTime<Utc>> {
        self.converter.slot_datetime(located.slot)
    }
}
