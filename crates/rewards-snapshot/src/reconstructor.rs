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

//! Rebuilds the snapshot boundary of an interval that was already committed on chain.
//!
//! Reconstruction starts from the interval's commitment event. Without a target epoch
//! the regenerated tree is expected to reproduce the committed root exactly, which makes
//! this the regression check for tree generation. With a target epoch the interval is
//! cut short by [BoundaryOverrider] and there is nothing canonical to compare against.

use std::time::Instant;

use alloy::primitives::B256;
use anyhow::Context;

use crate::{
    epoch::EpochTimeConverter,
    errors::{Result, SnapshotError},
    overrider::BoundaryOverrider,
    ports::{
        ConsensusClient, ExecutionClient, NetworkStateSource, ProtocolStateReader,
        TreeConstructionEngine,
    },
    types::{CommitmentEvent, RootValidation, SnapshotCoordinate, TreeArtifact},
};

/// A past interval's boundary, ready to feed tree generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub coordinate: SnapshotCoordinate,
    /// The committed event, or the one derived from it when a target epoch was given.
    pub event: CommitmentEvent,
    /// Root to validate against. `None` when the interval was overridden.
    pub canonical_root: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedInterval {
    pub reconstruction: Reconstruction,
    pub artifact: TreeArtifact,
    pub validation: RootValidation,
}

pub struct PastIntervalReconstructor<'a, C, E, P> {
    overrider: BoundaryOverrider<'a, C, E>,
    execution: &'a E,
    protocol: &'a P,
}

impl<'a, C, E, P> PastIntervalReconstructor<'a, C, E, P>
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
        Self {
            overrider: BoundaryOverrider::new(consensus, execution, converter),
            execution,
            protocol,
        }
    }

    pub async fn reconstruct(
        &self,
        index: u64,
        target_epoch: Option<u64>,
    ) -> Result<Reconstruction> {
        let event = self
            .protocol
            .commitment_event(index)
            .await
            .with_context(|| {
                format!("Failed to get rewards submission event for interval {index}")
            })?
            .ok_or(SnapshotError::UnknownInterval { index })?;
        tracing::info!(
            "Found rewards submission event: Beacon block {}, execution block {}",
            event.consensus_block,
            event.execution_block
        );

        let (event, canonical_root) = match target_epoch {
            Some(target_epoch) => (self.overrider.override_event(event, target_epoch).await?, None),
            None => {
                let root = event.canonical_root;
                (event, Some(root))
            }
        };

        let execution_header = self
            .execution
            .header_by_number(Some(event.execution_block))
            .await
            .with_context(|| format!("Failed to get EL block {}", event.execution_block))?
            .ok_or(SnapshotError::MissingExecutionPairing {
                slot: event.consensus_block,
                execution_block: event.execution_block,
            })?;

        let coordinate = SnapshotCoordinate {
            interval_index: event.index,
            start_time: event.start_time,
            end_time: event.end_time,
            consensus_slot: event.consensus_block,
            execution_header,
            intervals_elapsed: event.intervals_elapsed,
        };

        Ok(Reconstruction { coordinate, event, canonical_root })
    }

    /// Compares a regenerated root with the committed one. Never fails.
    pub fn validate(&self, reconstruction: &Reconstruction, candidate: B256) -> RootValidation {
        let Some(canonical) = reconstruction.canonical_root else {
            tracing::info!(
                "Interval {} was overridden, skipping root validation",
                reconstruction.coordinate.interval_index
            );
            return RootValidation::Skipped;
        };

        if canonical == candidate {
            tracing::info!("Merkle root matches the canonical root");
            RootValidation::Matched(candidate)
        } else {
            tracing::warn!(
                "Merkle root mismatch for interval {}: canonical root {}, generated root {}",
                reconstruction.coordinate.interval_index,
                canonical,
                candidate
            );
            RootValidation::Mismatched { canonical, candidate }
        }
    }

    /// Reconstructs interval `index` and runs tree generation at its boundary.
    pub async fn generate<S, G>(
        &self,
        index: u64,
        target_epoch: Option<u64>,
        state_source: &S,
        engine: &G,
    ) -> Result<GeneratedInterval>
    where
        S: NetworkStateSource,
        G: TreeConstructionEngine<S::State>,
    {
        let started = Instant::now();
        let reconstruction = self.reconstruct(index, target_epoch).await?;

        let slot = reconstruction.coordinate.consensus_slot;
        tracing::info!("Getting network state for slot {}", slot);
        let state = state_source
            .state_for_slot(slot)
            .await
            .with_context(|| format!("Failed to get network state for slot {slot}"))?;

        let artifact = engine
            .generate(&reconstruction.coordinate, &state)
            .await
            .with_context(|| format!("Failed to generate tree for interval {index}"))?;
        let validation = self.validate(&reconstruction, artifact.root);

        tracing::info!("Finished in {:?}", started.elapsed());
        Ok(GeneratedInterval { reconstruction, artifact, validation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        datetime, header_for_slot, test_chain_config, DigestTreeEngine, MockConsensus,
        MockExecution, MockProtocol, MockStateSource, EXECUTION_OFFSET,
    };
    use tracing_test::traced_test;

    const START_SLOT: u64 = 100 * 32;
    const END_SLOT: u64 = 200 * 32 + 31;

    fn interval_five() -> CommitmentEvent {
        CommitmentEvent {
            index: 5,
            consensus_block: END_SLOT,
            execution_block: EXECUTION_OFFSET + END_SLOT,
            start_time: datetime(START_SLOT * 12),
            end_time: datetime(END_SLOT * 12),
            intervals_elapsed: 1,
            canonical_root: DigestTreeEngine::root_for(5, END_SLOT, EXECUTION_OFFSET + END_SLOT),
        }
    }

    struct Fixture {
        consensus: MockConsensus,
        execution: MockExecution,
        protocol: MockProtocol,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                consensus: MockConsensus::new(test_chain_config())
                    .with_finalized_epoch(210)
                    .with_post_merge_blocks(START_SLOT..=END_SLOT),
                execution: MockExecution::new().with_slot_headers(START_SLOT..=END_SLOT),
                protocol: MockProtocol::new(6, datetime(END_SLOT * 12), 86_400)
                    .with_event(interval_five()),
            }
        }

        fn reconstructor(
            &self,
        ) -> PastIntervalReconstructor<'_, MockConsensus, MockExecution, MockProtocol> {
            PastIntervalReconstructor::new(
                &self.consensus,
                &self.execution,
                &self.protocol,
                EpochTimeConverter::new(&test_chain_config()).unwrap(),
            )
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_reconstruct_without_target() {
        let fixture = Fixture::new();

        let reconstruction = fixture.reconstructor().reconstruct(5, None).await.unwrap();
        assert_eq!(reconstruction.event, interval_five());
        assert_eq!(reconstruction.canonical_root, Some(interval_five().canonical_root));
        assert_eq!(reconstruction.coordinate.consensus_slot, END_SLOT);
        assert_eq!(reconstruction.coordinate.execution_header, header_for_slot(END_SLOT));
        assert_eq!(reconstruction.coordinate.start_time, datetime(START_SLOT * 12));
        assert_eq!(reconstruction.coordinate.end_time, datetime(END_SLOT * 12));
        assert!(logs_contain("Found rewards submission event"));
    }

    #[tokio::test]
    async fn test_reconstruct_with_target_epoch() {
        let fixture = Fixture::new();

        let reconstruction = fixture.reconstructor().reconstruct(5, Some(150)).await.unwrap();
        let last_slot = 150 * 32 + 31;
        assert_eq!(reconstruction.canonical_root, None);
        assert_eq!(reconstruction.event.consensus_block, last_slot);
        assert_eq!(reconstruction.event.canonical_root, B256::ZERO);
        assert_eq!(reconstruction.coordinate.consensus_slot, last_slot);
        assert_eq!(reconstruction.coordinate.execution_header, header_for_slot(last_slot));
        assert!(reconstruction.coordinate.end_time < interval_five().end_time);
        assert_eq!(reconstruction.coordinate.intervals_elapsed, 1);
    }

    #[tokio::test]
    async fn test_reconstruct_natural_end_target_disables_validation() {
        let fixture = Fixture::new();
        let reconstructor = fixture.reconstructor();

        let reconstruction = reconstructor.reconstruct(5, Some(200)).await.unwrap();
        assert_eq!(reconstruction.coordinate.consensus_slot, END_SLOT);
        assert_eq!(reconstruction.canonical_root, None);
        assert_eq!(
            reconstructor.validate(&reconstruction, interval_five().canonical_root),
            RootValidation::Skipped
        );
    }

    #[tokio::test]
    async fn test_reconstruct_unknown_interval() {
        let fixture = Fixture::new();

        let err = fixture.reconstructor().reconstruct(9, None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownInterval { index: 9 }));
    }

    #[tokio::test]
    async fn test_reconstruct_missing_execution_header() {
        let mut fixture = Fixture::new();
        fixture.execution = MockExecution::new().with_slot_headers(START_SLOT..END_SLOT);

        let err = fixture.reconstructor().reconstruct(5, None).await.unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::MissingExecutionPairing { slot: END_SLOT, execution_block }
                if execution_block == EXECUTION_OFFSET + END_SLOT
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_validate_mismatch_is_advisory() {
        let fixture = Fixture::new();
        let reconstructor = fixture.reconstructor();
        let reconstruction = reconstructor.reconstruct(5, None).await.unwrap();

        let candidate = B256::repeat_byte(0xab);
        let validation = reconstructor.validate(&reconstruction, candidate);
        assert_eq!(
            validation,
            RootValidation::Mismatched { canonical: interval_five().canonical_root, candidate }
        );
        assert!(!validation.is_match());
        assert!(logs_contain("Merkle root mismatch for interval 5"));
    }

    #[tokio::test]
    async fn test_generate_reproduces_canonical_root() {
        let fixture = Fixture::new();
        let state_source = MockStateSource::default();

        let generated = fixture
            .reconstructor()
            .generate(5, None, &state_source, &DigestTreeEngine)
            .await
            .unwrap();
        assert_eq!(generated.validation, RootValidation::Matched(interval_five().canonical_root));
        assert_eq!(generated.artifact.root, interval_five().canonical_root);
        assert_eq!(state_source.requested_slots(), vec![END_SLOT]);
    }

    #[tokio::test]
    async fn test_generate_with_override_skips_validation() {
        let fixture = Fixture::new();
        let state_source = MockStateSource::default();

        let generated = fixture
            .reconstructor()
            .generate(5, Some(150), &state_source, &DigestTreeEngine)
            .await
            .unwrap();
        assert_eq!(generated.validation, RootValidation::Skipped);
        assert_ne!(generated.artifact.root, interval_five().canonical_root);
        assert_eq!(state_source.requested_slots(), vec![150 * 32 + 31]);
    }
}
