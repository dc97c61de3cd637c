//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// A pending sale keeps its local identifier while its `synced` flag flips,
/// so anything keyed by identity (queues, reports) can rely on `id()`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
