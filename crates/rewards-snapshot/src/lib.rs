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

//! Resolution of rewards interval snapshots across the consensus and execution chains.
//!
//! A rewards interval ends at a snapshot: a finalized consensus slot paired with the
//! execution block it carries. This crate finds that boundary for the interval that is
//! still open ([SnapshotResolver]), recovers it for intervals already committed on chain
//! ([PastIntervalReconstructor]), and can cut either short at an earlier epoch
//! ([BoundaryOverrider]). Building the rewards tree itself is left to a
//! [TreeConstructionEngine].

pub mod beacon;
pub mod config;
pub mod diagnostics;
pub mod epoch;
pub mod errors;
pub mod execution;
pub mod locator;
pub mod overrider;
pub mod ports;
pub mod protocol;
pub mod reconstructor;
pub mod resolver;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use beacon::BeaconClient;
pub use config::{ChainConfig, Network, Settings};
pub use epoch::{EpochTimeConverter, SlotRange};
pub use errors::{CodedError, SnapshotError};
pub use execution::RpcExecutionClient;
pub use locator::{FinalizedSlotLocator, LocatedSlot};
pub use overrider::BoundaryOverrider;
pub use ports::{
    ConsensusClient, ExecutionClient, NetworkStateSource, ProtocolStateReader,
    TreeConstructionEngine,
};
pub use protocol::RewardsPoolReader;
pub use reconstructor::{GeneratedInterval, PastIntervalReconstructor, Reconstruction};
pub use resolver::{NetworkInfo, SnapshotResolver};
pub use types::{
    CommitmentEvent, ConsensusBlock, ConsensusHead, ExecutionHeader, PairingMode, RootValidation,
    SnapshotCoordinate, TreeArtifact,
};
