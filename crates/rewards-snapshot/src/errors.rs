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

use thiserror::Error;

pub trait CodedError: std::error::Error {
    fn code(&self) -> &str;
}

/// Implements `Debug` as `"<code> <display>"` for a [CodedError].
#[macro_export]
macro_rules! impl_coded_debug {
    ($name:ident) => {
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", $crate::errors::CodedError::code(self), self)
            }
        }
    };
}

#[derive(Error)]
pub enum SnapshotError {
    #[error("Beacon node is configured for an unknown network with chain ID [{chain_id}]")]
    ChainIdentificationFailure { chain_id: u64 },

    #[error("Epoch {epoch} appears to have had no blocks proposed, or all are missing from the beacon node")]
    NoProposedBlockInEpoch { epoch: u64 },

    #[error("No proposed block found between genesis and slot {upper_bound}")]
    NoProposedBlockSinceGenesis { upper_bound: u64 },

    #[error("Slot {slot} is outside the range addressable from genesis")]
    InvalidSlot { slot: u64 },

    #[error("Timestamp {timestamp} predates the consensus chain genesis")]
    TimestampBeforeGenesis { timestamp: u64 },

    #[error("Target epoch {target_epoch} is not finalized yet; latest finalized epoch is {finalized_epoch}")]
    EpochNotFinalized { target_epoch: u64, finalized_epoch: u64 },

    #[error("Target epoch {target_epoch} not in interval range {start_epoch} - {end_epoch}")]
    TargetOutsideInterval { target_epoch: u64, start_epoch: u64, end_epoch: u64 },

    #[error("Target epoch {epoch} block {slot} doesn't have an execution block, pre-merge?")]
    PreMergeTargetUnsupported { epoch: u64, slot: u64 },

    #[error("No rewards commitment event found for interval {index}")]
    UnknownInterval { index: u64 },

    #[error("Execution block {execution_block} paired with slot {slot} could not be retrieved")]
    MissingExecutionPairing { slot: u64, execution_block: u64 },

    #[error("Protocol reports an interval duration of zero")]
    ZeroIntervalDuration,

    #[error("Chain config has an unusable {field} of {value}")]
    InvalidChainConfig { field: &'static str, value: u64 },

    #[error("Error: {0:#}")]
    Collaborator(#[from] anyhow::Error),
}

impl_coded_debug!(SnapshotError);

impl CodedError for SnapshotError {
    fn code(&self) -> &str {
        match self {
            SnapshotError::ChainIdentificationFailure { .. } => "[R-SNP-0001]",
            SnapshotError::NoProposedBlockInEpoch { .. } => "[R-SNP-0002]",
            SnapshotError::NoProposedBlockSinceGenesis { .. } => "[R-SNP-0003]",
            SnapshotError::InvalidSlot { .. } => "[R-SNP-0004]",
            SnapshotError::TimestampBeforeGenesis { .. } => "[R-SNP-0005]",
            SnapshotError::EpochNotFinalized { .. } => "[R-SNP-0006]",
            SnapshotError::TargetOutsideInterval { .. } => "[R-SNP-0007]",
            SnapshotError::PreMergeTargetUnsupported { .. } => "[R-SNP-0008]",
            SnapshotError::UnknownInterval { .. } => "[R-SNP-0009]",
            SnapshotError::MissingExecutionPairing { .. } => "[R-SNP-0010]",
            SnapshotError::ZeroIntervalDuration => "[R-SNP-0011]",
            SnapshotError::InvalidChainConfig { .. } => "[R-SNP-0012]",
            SnapshotError::Collaborator(_) => "[R-SNP-0500]",
        }
    }
}

pub type Result<T, E = SnapshotError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_includes_code_and_context() {
        let err = SnapshotError::TargetOutsideInterval {
            target_epoch: 250,
            start_epoch: 100,
            end_epoch: 200,
        };
        assert_eq!(
            format!("{err:?}"),
            "[R-SNP-0007] Target epoch 250 not in interval range 100 - 200"
        );
    }

    #[test]
    fn collaborator_errors_keep_their_context_chain() {
        let err: SnapshotError =
            anyhow::anyhow!("connection refused").context("Failed to query beacon head").into();
        assert_eq!(err.code(), "[R-SNP-0500]");
        assert!(err.to_string().contains("connection refused"));
    }
}
