//! Projection runner utilities (read model builders).
//!
//! Tracks the last applied sequence number per aggregate so redelivered or
//! out-of-order envelopes are rejected before they reach the projection.

use std::collections::HashMap;

use thiserror::Error;

use tablefront_core::AggregateId;

use crate::{EventEnvelope, Projection};

/// Projection progress across all aggregates it has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionCursor {
    last_sequence_numbers: HashMap<AggregateId, u64>,
    applied: u64,
}

impl ProjectionCursor {
    pub fn last_sequence_number(&self, aggregate_id: AggregateId) -> Option<u64> {
        self.last_sequence_numbers.get(&aggregate_id).copied()
    }

    /// Total number of envelopes applied.
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("non-monotonic sequence for aggregate {aggregate_id}: last {last}, found {found}")]
    NonMonotonicSequence {
        aggregate_id: AggregateId,
        last: u64,
        found: u64,
    },
}

/// Runs envelopes through a projection and tracks progress.
#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    cursor: ProjectionCursor,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    pub fn new(projection: P) -> Self {
        Self {
            projection,
            cursor: ProjectionCursor::default(),
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut P {
        &mut self.projection
    }

    pub fn into_projection(self) -> P {
        self.projection
    }

    pub fn cursor(&self) -> &ProjectionCursor {
        &self.cursor
    }

    /// Apply a single envelope, enforcing monotonic sequencing per aggregate.
    pub fn apply(&mut self, envelope: &EventEnvelope<P::Ev>) -> Result<(), ProjectionError> {
        let aggregate_id = envelope.aggregate_id();
        let found = envelope.sequence_number();

        if let Some(last) = self.cursor.last_sequence_number(aggregate_id) {
            if found <= last {
                return Err(ProjectionError::NonMonotonicSequence {
                    aggregate_id,
                    last,
                    found,
                });
            }
        }

        self.projection.apply(envelope);
        self.cursor.last_sequence_numbers.insert(aggregate_id, found);
        self.cursor.applied += 1;
        Ok(())
    }

    /// Apply many envelopes in order.
    pub fn run<'a>(
        &mut self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(), ProjectionError>
    where
        P::Ev: 'a,
    {
        for env in envelopes {
            self.apply(env)?;
        }
        Ok(())
    }

    /// Rebuild a projection from scratch by replaying envelopes.
    pub fn rebuild_from_scratch<'a>(
        factory: impl FnOnce() -> P,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(P, ProjectionCursor), ProjectionError>
    where
        P::Ev: 'a,
    {
        let mut runner = ProjectionRunner::new(factory());
        runner.run(envelopes)?;
        Ok((runner.projection, runner.cursor))
    }
}
