use crate::EventEnvelope;

/// A projection builds a read model from published events.
///
/// Read models are **disposable** views; aggregate state is the source of
/// truth. Projections must be **idempotent** because delivery is
/// at-least-once. `ProjectionRunner` skips envelopes whose per-aggregate
/// sequence number was already seen, but upserts and set semantics in the
/// read model are still expected.
///
/// Events that are irrelevant to a projection are ignored, not errors.
pub trait Projection {
    type Ev;

    /// Apply a single event to the read model.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);
}
