use crate::ecs::{
    entity::{Entity, Generation},
    storage::Location,
};

/// The location index: tracks which entities are spawned and where their data
/// lives, densely indexed by entity id.
///
/// Each slot stores the generation that is currently live for its id, so a
/// stale handle (same id, older generation) resolves to nothing instead of
/// aliasing the slot's current occupant.
#[derive(Default)]
pub struct Entities {
    /// One slot per entity id: the live generation and its location.
    slots: Vec<Option<(Generation, Location)>>,

    /// The number of live entities.
    alive: usize,
}

impl Entities {
    /// Create an empty location index.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly spawned entity at the given location.
    pub fn spawn_at(&mut self, entity: Entity, location: Location) {
        let index = entity.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        debug_assert!(
            self.slots[index].is_none(),
            "entity slot already occupied on spawn"
        );
        self.slots[index] = Some((entity.generation(), location));
        self.alive += 1;
    }

    /// Get the location for an entity, if it is spawned and the handle is not
    /// stale.
    pub fn location(&self, entity: Entity) -> Option<Location> {
        match self.slots.get(entity.index())? {
            Some((generation, location)) if *generation == entity.generation() => Some(*location),
            _ => None,
        }
    }

    /// Update the location of a live entity. Called after every structural
    /// change that moved the entity's row.
    pub fn set_location(&mut self, entity: Entity, location: Location) {
        match self.slots.get_mut(entity.index()) {
            Some(Some((generation, slot))) if *generation == entity.generation() => {
                *slot = location;
            }
            _ => debug_assert!(false, "set_location on entity with no live slot"),
        }
    }

    /// Clear the slot for a despawned entity. No-op for stale handles.
    pub fn despawn(&mut self, entity: Entity) {
        if let Some(slot) = self.slots.get_mut(entity.index())
            && matches!(slot, Some((generation, _)) if *generation == entity.generation())
        {
            *slot = None;
            self.alive -= 1;
        }
    }

    /// Check whether an entity is currently spawned.
    #[inline]
    pub fn is_spawned(&self, entity: Entity) -> bool {
        self.location(entity).is_some()
    }

    /// The number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.alive
    }

    /// Check whether no entities are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alive == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::ecs::{
        entity::Allocator,
        storage::{Row, archetype},
    };

    use super::*;

    fn loc(archetype: u32, row: usize) -> Location {
        Location::new(archetype::Id::new(archetype), Row::new(row))
    }

    #[test]
    fn spawn_lookup_despawn() {
        // Given
        let allocator = Allocator::default();
        let mut entities = Entities::new();
        let entity = allocator.alloc();

        // When
        entities.spawn_at(entity, loc(0, 3));

        // Then
        assert!(entities.is_spawned(entity));
        assert_eq!(entities.location(entity), Some(loc(0, 3)));
        assert_eq!(entities.len(), 1);

        // When
        entities.despawn(entity);

        // Then
        assert!(!entities.is_spawned(entity));
        assert_eq!(entities.location(entity), None);
        assert_eq!(entities.len(), 0);
    }

    #[test]
    fn stale_generation_resolves_to_nothing() {
        // Given - an id that was freed and reissued
        let allocator = Allocator::default();
        let mut entities = Entities::new();
        let old = allocator.alloc();
        entities.spawn_at(old, loc(0, 0));
        entities.despawn(old);
        allocator.free(old);

        let new = allocator.alloc();
        assert_eq!(new.id(), old.id());
        entities.spawn_at(new, loc(1, 0));

        // Then - the stale handle sees nothing, the new one resolves
        assert_eq!(entities.location(old), None);
        assert_eq!(entities.location(new), Some(loc(1, 0)));

        // And a stale despawn is a no-op
        entities.despawn(old);
        assert!(entities.is_spawned(new));
    }

    #[test]
    fn set_location_moves_entity() {
        // Given
        let allocator = Allocator::default();
        let mut entities = Entities::new();
        let entity = allocator.alloc();
        entities.spawn_at(entity, loc(0, 5));

        // When
        entities.set_location(entity, loc(2, 0));

        // Then
        assert_eq!(entities.location(entity), Some(loc(2, 0)));
    }
}
