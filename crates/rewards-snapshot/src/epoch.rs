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

//! Epoch, slot and timestamp conversions for the consensus chain.
//!
//! The consensus chain defines time as follows:
//! - `first_slot(epoch) = epoch * SLOTS_PER_EPOCH`
//! - `slot_time(slot) = genesis_time + (slot - genesis_epoch * SLOTS_PER_EPOCH) * SECONDS_PER_SLOT`
//! - `epoch_at(t) = (t - genesis_time) / SECONDS_PER_EPOCH + genesis_epoch`

use chrono::{DateTime, Utc};

use crate::{
    config::ChainConfig,
    errors::{Result, SnapshotError},
};

/// Inclusive range of slots covered by one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub first: u64,
    pub last: u64,
}

impl SlotRange {
    /// Slots of the range from the last one down to the first.
    pub fn descending(&self) -> impl Iterator<Item = u64> {
        (self.first..=self.last).rev()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTimeConverter {
    genesis_time: u64,
    genesis_epoch: u64,
    genesis_slot: u64,
    slots_per_epoch: u64,
    seconds_per_slot: u64,
    seconds_per_epoch: u64,
}

fn non_zero(field: &'static str, value: u64) -> Result<u64> {
    match value {
        0 => Err(SnapshotError::InvalidChainConfig { field, value }),
        value => Ok(value),
    }
}

impl EpochTimeConverter {
    /// Fails if the config has a zero-length slot or epoch, or a genesis slot past `u64::MAX`.
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let slots_per_epoch = non_zero("slots_per_epoch", config.slots_per_epoch)?;
        let genesis_slot = config.genesis_epoch.checked_mul(slots_per_epoch).ok_or(
            SnapshotError::InvalidChainConfig {
                field: "genesis_epoch",
                value: config.genesis_epoch,
            },
        )?;

        Ok(Self {
            genesis_time: config.genesis_time,
            genesis_epoch: config.genesis_epoch,
            genesis_slot,
            slots_per_epoch,
            seconds_per_slot: non_zero("seconds_per_slot", config.seconds_per_slot)?,
            seconds_per_epoch: non_zero("seconds_per_epoch", config.seconds_per_epoch)?,
        })
    }

    /// First slot of the genesis epoch.
    pub fn genesis_slot(&self) -> u64 {
        self.genesis_slot
    }

    pub fn epoch_to_slot_range(&self, epoch: u64) -> Result<SlotRange> {
        let first = epoch
            .checked_mul(self.slots_per_epoch)
            .ok_or(SnapshotError::InvalidSlot { slot: u64::MAX })?;
        let last = self
            .slots_per_epoch
            .checked_sub(1)
            .and_then(|offset| first.checked_add(offset))
            .ok_or(SnapshotError::InvalidSlot { slot: first })?;
        Ok(SlotRange { first, last })
    }

    /// Last slot of the epoch, the natural upper bound for a finalized-block scan.
    pub fn epoch_end_slot(&self, epoch: u64) -> Result<u64> {
        Ok(self.epoch_to_slot_range(epoch)?.last)
    }

    pub fn slot_to_epoch(&self, slot: u64) -> Result<u64> {
        slot.checked_div(self.slots_per_epoch).ok_or(SnapshotError::InvalidSlot { slot })
    }

    pub fn slot_to_time(&self, slot: u64) -> Result<u64> {
        slot.checked_sub(self.genesis_slot)
            .and_then(|slots| slots.checked_mul(self.seconds_per_slot))
            .and_then(|seconds| seconds.checked_add(self.genesis_time))
            .ok_or(SnapshotError::InvalidSlot { slot })
    }

    pub fn slot_datetime(&self, slot: u64) -> Result<DateTime<Utc>> {
        let time = self.slot_to_time(slot)?;
        unix_to_datetime(time).ok_or(SnapshotError::InvalidSlot { slot })
    }

    /// Epoch containing timestamp `t`.
    pub fn time_to_epoch(&self, t: u64) -> Result<u64> {
        let elapsed = t
            .checked_sub(self.genesis_time)
            .ok_or(SnapshotError::TimestampBeforeGenesis { timestamp: t })?;
        elapsed
            .checked_div(self.seconds_per_epoch)
            .and_then(|epochs| epochs.checked_add(self.genesis_epoch))
            .ok_or(SnapshotError::TimestampBeforeGenesis { timestamp: t })
    }
}

pub(crate) fn unix_to_datetime(seconds: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

/// Seconds since the unix epoch, clamped at zero for pre-1970 instants.
pub(crate) fn datetime_to_unix(time: &DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodedError;
    use proptest::prelude::*;

    fn converter(genesis_time: u64) -> EpochTimeConverter {
        EpochTimeConverter::new(&ChainConfig {
            genesis_time,
            genesis_epoch: 0,
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            seconds_per_epoch: 384,
            chain_id: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_epoch_to_slot_range() {
        let conv = converter(0);
        assert_eq!(conv.epoch_to_slot_range(0).unwrap(), SlotRange { first: 0, last: 31 });
        assert_eq!(conv.epoch_to_slot_range(10).unwrap(), SlotRange { first: 320, last: 351 });
        assert_eq!(conv.epoch_end_slot(10).unwrap(), 351);

        let slots: Vec<_> = conv.epoch_to_slot_range(10).unwrap().descending().take(3).collect();
        assert_eq!(slots, vec![351, 350, 349]);
    }

    #[test]
    fn test_slot_to_time() {
        // Mainnet genesis
        let conv = converter(1606824023);
        assert_eq!(conv.slot_to_time(0).unwrap(), 1606824023);
        assert_eq!(conv.slot_to_time(1).unwrap(), 1606824035);
        assert_eq!(conv.slot_to_time(4_700_013).unwrap(), 1606824023 + 4_700_013 * 12);
    }

    #[test]
    fn test_slot_before_genesis_epoch_is_invalid() {
        let conv = EpochTimeConverter::new(&ChainConfig {
            genesis_time: 1000,
            genesis_epoch: 5,
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            seconds_per_epoch: 384,
            chain_id: 1,
        })
        .unwrap();
        assert_eq!(conv.genesis_slot(), 160);
        assert_eq!(conv.slot_to_time(160).unwrap(), 1000);
        assert!(matches!(conv.slot_to_time(159), Err(SnapshotError::InvalidSlot { slot: 159 })));
    }

    #[test]
    fn test_time_to_epoch() {
        let conv = converter(1000);
        assert_eq!(conv.time_to_epoch(1000).unwrap(), 0);
        assert_eq!(conv.time_to_epoch(1000 + 383).unwrap(), 0);
        assert_eq!(conv.time_to_epoch(1000 + 384).unwrap(), 1);
        assert!(matches!(
            conv.time_to_epoch(999),
            Err(SnapshotError::TimestampBeforeGenesis { timestamp: 999 })
        ));
    }

    #[test]
    fn test_time_to_epoch_inverts_slot_to_time() {
        let conv = converter(1606824023);
        for epoch in [0u64, 1, 100, 194_048] {
            let range = conv.epoch_to_slot_range(epoch).unwrap();
            assert_eq!(conv.time_to_epoch(conv.slot_to_time(range.first).unwrap()).unwrap(), epoch);
            assert_eq!(conv.time_to_epoch(conv.slot_to_time(range.last).unwrap()).unwrap(), epoch);
        }
    }

    #[test]
    fn test_zero_length_slots_and_epochs_are_rejected() {
        let valid = ChainConfig {
            genesis_time: 0,
            genesis_epoch: 0,
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            seconds_per_epoch: 384,
            chain_id: 1,
        };

        let err =
            EpochTimeConverter::new(&ChainConfig { slots_per_epoch: 0, ..valid }).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::InvalidChainConfig { field: "slots_per_epoch", value: 0 }
        ));
        assert_eq!(err.code(), "[R-SNP-0012]");

        let err =
            EpochTimeConverter::new(&ChainConfig { seconds_per_slot: 0, ..valid }).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidChainConfig { field: "seconds_per_slot", .. }));

        let err =
            EpochTimeConverter::new(&ChainConfig { seconds_per_epoch: 0, ..valid }).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::InvalidChainConfig { field: "seconds_per_epoch", .. }
        ));

        let err = EpochTimeConverter::new(&ChainConfig { genesis_epoch: u64::MAX, ..valid })
            .unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidChainConfig { field: "genesis_epoch", .. }));
    }

    #[test]
    fn test_conversions_near_u64_max_return_errors() {
        let conv = converter(0);
        assert!(matches!(
            conv.epoch_to_slot_range(u64::MAX),
            Err(SnapshotError::InvalidSlot { slot: u64::MAX })
        ));
        assert_eq!(conv.epoch_end_slot(u64::MAX / 32).unwrap(), u64::MAX);
        assert_eq!(conv.slot_to_epoch(u64::MAX).unwrap(), u64::MAX / 32);
        assert!(matches!(conv.slot_to_time(u64::MAX), Err(SnapshotError::InvalidSlot { .. })));
        assert_eq!(conv.time_to_epoch(u64::MAX).unwrap(), u64::MAX / 384);
    }

    #[test]
    fn test_slot_datetime() {
        let conv = converter(1606824023);
        assert_eq!(conv.slot_datetime(0).unwrap().timestamp(), 1606824023);
    }

    proptest! {
        #[test]
        fn epoch_start_time_is_strictly_increasing(
            genesis_time in 0u64..2_000_000_000,
            slots_per_epoch in 1u64..64,
            seconds_per_slot in 1u64..30,
            epoch in 0u64..10_000_000,
        ) {
            let conv = EpochTimeConverter::new(&ChainConfig {
                genesis_time,
                genesis_epoch: 0,
                slots_per_epoch,
                seconds_per_slot,
                seconds_per_epoch: slots_per_epoch * seconds_per_slot,
                chain_id: 1,
            })
            .unwrap();
            let first_slot = |epoch| conv.epoch_to_slot_range(epoch).unwrap().first;
            let this = conv.slot_to_time(first_slot(epoch)).unwrap();
            let next = conv.slot_to_time(first_slot(epoch + 1)).unwrap();
            prop_assert!(next > this);
        }
    }
}
