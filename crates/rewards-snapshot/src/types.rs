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

//! Value types shared by the resolution engine and its collaborators.

use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header fields of an execution chain block that the snapshot depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHeader {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
}

/// A proposed consensus chain block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusBlock {
    pub slot: u64,
    /// Paired execution block number, 0 for blocks proposed before the merge.
    pub execution_block_number: u64,
}

/// Subset of the consensus chain head that the locator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusHead {
    pub finalized_epoch: u64,
}

/// How the execution block paired with a consensus slot is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMode {
    /// The consensus block carries the execution block number.
    DirectByNumber(u64),
    /// Pre-merge: match an execution block by the slot timestamp.
    DeriveByTime(u64),
}

/// The resolved boundary of a rewards interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCoordinate {
    pub interval_index: u64,
    pub start_time: DateTime<Utc>,
    /// Provisional (wall clock at resolution) for the open interval.
    pub end_time: DateTime<Utc>,
    pub consensus_slot: u64,
    pub execution_header: ExecutionHeader,
    pub intervals_elapsed: u64,
}

/// A boundary previously committed on chain for a closed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentEvent {
    pub index: u64,
    pub consensus_block: u64,
    pub execution_block: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub intervals_elapsed: u64,
    pub canonical_root: B256,
}

/// Output of the external tree construction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeArtifact {
    pub root: B256,
    /// Serialized reward artifact, opaque to this crate.
    pub payload: Vec<u8>,
}

/// Outcome of comparing a regenerated root against the canonical one.
///
/// A mismatch is advisory: the artifact is still returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootValidation {
    /// A target epoch was supplied, so the result is not comparable to the full interval root.
    Skipped,
    Matched(B256),
    Mismatched { canonical: B256, candidate: B256 },
}

impl RootValidation {
    pub fn is_match(&self) -> bool {
        matches!(self, RootValidation::Matched(_))
    }
}
