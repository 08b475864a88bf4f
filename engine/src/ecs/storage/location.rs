use crate::ecs::storage::{Row, archetype};

/// The location an entity's data is stored at: its archetype and its row in
/// that archetype's table. Gives near constant time lookups for any entity.
///
/// Invariant: for a live entity, `archetype.table().entities()[row]` is the
/// entity itself. Every swap-remove re-establishes this for the entity that
/// was moved into the vacated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// The archetype holding this entity.
    archetype: archetype::Id,

    /// The table row the entity is stored at.
    row: Row,
}

impl Location {
    /// Create a new Location with the given archetype and row.
    #[inline]
    pub const fn new(archetype: archetype::Id, row: Row) -> Self {
        Self { archetype, row }
    }

    /// Get the archetype id for this location.
    #[inline]
    pub fn archetype(&self) -> archetype::Id {
        self.archetype
    }

    /// Get the table row for this location.
    #[inline]
    pub fn row(&self) -> Row {
        self.row
    }
}
