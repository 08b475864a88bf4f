//! Columnar storage for the ECS: archetypes, tables, and the location index.
//!
//! # Architecture
//!
//! Storage is the central authority for entity and component data:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Storage (this module)                                   │
//! │  - spawn/despawn and archetype migration                 │
//! │  - coordinates signature → archetype routing             │
//! └──────────┬──────────────────┬─────────────────┬──────────┘
//!            │                  │                 │
//! ┌──────────▼───────┐ ┌────────▼────────┐ ┌─────▼──────────┐
//! │  Archetypes      │ │  Entities       │ │  Resources     │
//! │  - Spec → slot   │ │  - Entity →     │ │  - singleton   │
//! │  - one Table per │ │    Location     │ │    values      │
//! │    signature     │ │  - generations  │ │                │
//! └──────────┬───────┘ └─────────────────┘ └────────────────┘
//!            │
//! ┌──────────▼───────┐
//! │  Table           │
//! │  - entity array  │
//! │  - Columns (SoA) │
//! └──────────────────┘
//! ```
//!
//! Entities with the exact same component signature share one archetype, so
//! iterating a component type reads a dense array with no holes and no
//! per-entity branching. The price is that changing an entity's signature
//! moves its whole row between archetypes; [`Storage::migrate`] implements
//! that move and is shared by component add, remove and batch-set.
//!
//! # Invariants
//!
//! - An entity's `Location` always points at the row holding its data, and
//!   `table.entities()[row]` is the entity itself. Swap-removal breaks this
//!   for the entity moved into the vacated row; every structural operation
//!   repairs it before returning.
//! - Each signature maps to at most one live archetype.
//! - A migration either completes fully or (for validation failures detected
//!   up front) mutates nothing.

pub use location::Location;
pub use row::Row;

use log::trace;

use crate::ecs::{
    component::{self, Component},
    entity::Entity,
    storage::table::Table,
    world,
};

pub(crate) mod archetype;
pub(crate) mod column;
pub(crate) mod entities;
pub(crate) mod location;
pub(crate) mod resource;
pub(crate) mod row;
pub(crate) mod table;

/// Central storage container: owns the archetype registry, the entity
/// location index, and the resource store.
pub struct Storage {
    /// Registry of archetypes, each owning its columnar table.
    archetypes: archetype::Archetypes,

    /// Tracks spawned entities and their storage locations.
    entities: entities::Entities,

    /// Singleton resources for the world.
    resources: resource::Resources,
}

impl Storage {
    /// Create a new empty storage.
    #[inline]
    pub fn new() -> Self {
        Self {
            archetypes: archetype::Archetypes::new(),
            entities: entities::Entities::new(),
            resources: resource::Resources::new(),
        }
    }

    #[inline]
    pub fn archetypes(&self) -> &archetype::Archetypes {
        &self.archetypes
    }

    #[inline]
    pub fn entities(&self) -> &entities::Entities {
        &self.entities
    }

    /// Get access to the resource store.
    #[inline]
    pub fn resources(&self) -> &resource::Resources {
        &self.resources
    }

    /// Get mutable access to the resource store.
    #[inline]
    pub fn resources_mut(&mut self) -> &mut resource::Resources {
        &mut self.resources
    }

    /// Spawn a new entity with the given set of components.
    pub fn spawn_entity<S: component::Set>(
        &mut self,
        entity: Entity,
        values: S,
        types: &world::TypeRegistry,
    ) {
        let spec = S::into_spec(types);
        let archetype_id = self.archetypes.get_or_create(&spec, types);
        let row = self.archetypes.table_mut(archetype_id).push(entity, values, types);
        self.entities
            .spawn_at(entity, Location::new(archetype_id, row));
    }

    /// Spawn multiple entities sharing the same component signature in a
    /// batch. The destination table is resolved once and pre-sized for the
    /// whole batch.
    pub fn spawn_entities<S: component::Set>(
        &mut self,
        batch: Vec<(Entity, S)>,
        types: &world::TypeRegistry,
    ) {
        if batch.is_empty() {
            return;
        }
        let spec = S::into_spec(types);
        let archetype_id = self.archetypes.get_or_create(&spec, types);
        let table = self.archetypes.table_mut(archetype_id);
        table.reserve(batch.len());
        for (entity, values) in batch {
            let row = table.push(entity, values, types);
            self.entities
                .spawn_at(entity, Location::new(archetype_id, row));
        }
    }

    /// Despawn an entity, removing its row and fixing up the entity swapped
    /// into its place. No-op (returning false) if the entity is not spawned.
    pub fn despawn_entity(&mut self, entity: Entity) -> bool {
        let Some(location) = self.entities.location(entity) else {
            return false;
        };

        let table = self.archetypes.table_mut(location.archetype());
        let moved = table.swap_remove_row(location.row());

        // If another entity was moved into the vacated row, update its location.
        if let Some(moved) = moved {
            self.entities.set_location(moved, location);
        }
        self.entities.despawn(entity);

        self.prune_if_empty(location.archetype());
        true
    }

    /// Move an entity to the archetype for `target` (created lazily),
    /// carrying over every component present in both signatures and applying
    /// `additions` for the rest.
    ///
    /// The caller has already decided the signature actually changes;
    /// same-signature updates are in-place writes, not migrations.
    ///
    /// # Process
    /// 1. Resolve or create the target archetype
    /// 2. Extract shared component values from the source row (moved, not
    ///    cloned) and swap-remove it
    /// 3. Re-point the entity that was swapped into the vacated row
    /// 4. Append extract + additions to the target table
    /// 5. Update the migrated entity's location
    /// 6. Prune the source archetype if the move emptied it
    pub fn migrate<S: component::Set>(
        &mut self,
        entity: Entity,
        source: Location,
        target: &component::Spec,
        additions: S,
        types: &world::TypeRegistry,
    ) {
        let target_id = self.archetypes.get_or_create(target, types);
        debug_assert_ne!(
            source.archetype(),
            target_id,
            "migration source and target must differ"
        );

        let source_spec = self.archetypes.spec_of(source.archetype()).clone();
        let shared = source_spec.intersection(target);
        trace!(
            "migrating entity {:?}: {:?} -> {:?} ({} shared)",
            entity,
            source.archetype(),
            target_id,
            shared.len()
        );

        let (extracted, moved) = self
            .archetypes
            .table_mut(source.archetype())
            .extract_and_swap_row(source.row(), &shared);

        if let Some(moved) = moved {
            self.entities.set_location(moved, source);
        }

        let row = self
            .archetypes
            .table_mut(target_id)
            .push_ordered(entity, extracted, additions, types);
        self.entities
            .set_location(entity, Location::new(target_id, row));

        self.prune_if_empty(source.archetype());
    }

    /// Overwrite one component of a live row in place (no migration).
    pub fn write_value<C: Component>(
        &mut self,
        location: Location,
        id: world::TypeId,
        value: C,
    ) {
        self.archetypes
            .table_mut(location.archetype())
            .write_value::<C>(id, location.row(), value);
    }

    /// Overwrite several components of a live row in place (no migration).
    pub fn write_set<S: component::Set>(
        &mut self,
        location: Location,
        values: S,
        types: &world::TypeRegistry,
    ) {
        self.archetypes
            .table_mut(location.archetype())
            .write_set(location.row(), values, types);
    }

    /// Get the storage location for the given entity, if it's spawned.
    #[inline]
    pub fn location_for(&self, entity: Entity) -> Option<Location> {
        self.entities.location(entity)
    }

    /// Get a component value for a spawned entity.
    pub fn get<C: Component>(&self, entity: Entity, id: world::TypeId) -> Option<&C> {
        let location = self.entities.location(entity)?;
        self.archetypes
            .table(location.archetype())
            .get::<C>(id, location.row())
    }

    /// Get a mutable component value for a spawned entity.
    pub fn get_mut<C: Component>(&mut self, entity: Entity, id: world::TypeId) -> Option<&mut C> {
        let location = self.entities.location(entity)?;
        self.archetypes
            .table_mut(location.archetype())
            .get_mut::<C>(id, location.row())
    }

    /// Get a read-only view of a table by archetype id.
    ///
    /// # Panics
    /// - if the id does not name a live archetype
    #[inline]
    pub fn table(&self, id: archetype::Id) -> &Table {
        self.archetypes.table(id)
    }

    /// Destroy the archetype if the last structural change emptied it.
    fn prune_if_empty(&mut self, id: archetype::Id) {
        if self.archetypes.get(id).is_some_and(|a| a.is_empty()) {
            self.archetypes.prune(id);
        }
    }
}

impl Default for Storage {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use crate::ecs::{component::IntoSpec, entity::Allocator, world};

    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Health {
        hp: i32,
    }

    #[test]
    fn spawn_creates_archetype_lazily() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();

        // When
        storage.spawn_entity(entity, Position { x: 1.0, y: 2.0 }, &types);

        // Then
        assert!(storage.entities().is_spawned(entity));
        assert_eq!(storage.archetypes().len(), 1);
        let id = types.get::<Position>().unwrap();
        assert_eq!(
            storage.get::<Position>(entity, id),
            Some(&Position { x: 1.0, y: 2.0 })
        );
    }

    #[test]
    fn spawn_batch_lands_in_one_archetype() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();

        // When
        let batch: Vec<_> = (0..3)
            .map(|i| (allocator.alloc(), Position { x: i as f32, y: 0.0 }))
            .collect();
        let spawned: Vec<_> = batch.iter().map(|(e, _)| *e).collect();
        storage.spawn_entities(batch, &types);

        // Then
        assert_eq!(storage.archetypes().len(), 1);
        for (i, entity) in spawned.iter().enumerate() {
            assert_eq!(
                storage.location_for(*entity).unwrap().row(),
                Row::new(i)
            );
        }
    }

    #[test]
    fn despawn_updates_swapped_entity_location() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();

        let e1 = allocator.alloc();
        let e2 = allocator.alloc();
        let e3 = allocator.alloc();
        storage.spawn_entity(e1, Position { x: 1.0, y: 1.0 }, &types);
        storage.spawn_entity(e2, Position { x: 2.0, y: 2.0 }, &types);
        storage.spawn_entity(e3, Position { x: 3.0, y: 3.0 }, &types);

        // When - despawn e1 (e3 should swap into row 0)
        assert!(storage.despawn_entity(e1));

        // Then
        assert!(!storage.entities().is_spawned(e1));
        assert_eq!(storage.location_for(e2).unwrap().row(), Row::new(1));
        assert_eq!(storage.location_for(e3).unwrap().row(), Row::new(0));
    }

    #[test]
    fn despawn_last_entity_prunes_archetype() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();
        storage.spawn_entity(entity, Position { x: 0.0, y: 0.0 }, &types);
        assert_eq!(storage.archetypes().len(), 1);

        // When
        storage.despawn_entity(entity);

        // Then - the emptied archetype is destroyed
        assert_eq!(storage.archetypes().len(), 0);
    }

    #[test]
    fn despawn_nonexistent_entity_is_noop() {
        // Given
        let mut storage = Storage::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();

        // When / Then
        assert!(!storage.despawn_entity(entity));
    }

    #[test]
    fn migrate_add_preserves_unrelated_data() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();
        storage.spawn_entity(
            entity,
            (Position { x: 1.0, y: 2.0 }, Velocity { dx: 0.5, dy: 0.3 }),
            &types,
        );

        // When - widen the signature with Health
        let source = storage.location_for(entity).unwrap();
        let target = storage
            .archetypes()
            .spec_of(source.archetype())
            .union(&<Health>::into_spec(&types));
        storage.migrate(entity, source, &target, Health { hp: 100 }, &types);

        // Then - original values intact, new value present
        let pos_id = types.get::<Position>().unwrap();
        let vel_id = types.get::<Velocity>().unwrap();
        let hp_id = types.get::<Health>().unwrap();
        assert_eq!(
            storage.get::<Position>(entity, pos_id),
            Some(&Position { x: 1.0, y: 2.0 })
        );
        assert_eq!(
            storage.get::<Velocity>(entity, vel_id),
            Some(&Velocity { dx: 0.5, dy: 0.3 })
        );
        assert_eq!(storage.get::<Health>(entity, hp_id), Some(&Health { hp: 100 }));
    }

    #[test]
    fn migrate_updates_swapped_entity_location() {
        // Given - two entities in the same archetype
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let e1 = allocator.alloc();
        let e2 = allocator.alloc();
        storage.spawn_entity(e1, Position { x: 1.0, y: 1.0 }, &types);
        storage.spawn_entity(e2, Position { x: 2.0, y: 2.0 }, &types);

        // When - migrate e1 away (e2 swaps into row 0)
        let source = storage.location_for(e1).unwrap();
        let target = storage
            .archetypes()
            .spec_of(source.archetype())
            .union(&<Velocity>::into_spec(&types));
        storage.migrate(e1, source, &target, Velocity { dx: 0.0, dy: 0.0 }, &types);

        // Then
        assert_eq!(storage.location_for(e2).unwrap().row(), Row::new(0));
        let pos_id = types.get::<Position>().unwrap();
        assert_eq!(
            storage.get::<Position>(e2, pos_id),
            Some(&Position { x: 2.0, y: 2.0 })
        );
    }

    #[test]
    fn migrate_narrowing_drops_removed_component() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();
        storage.spawn_entity(
            entity,
            (Position { x: 1.0, y: 2.0 }, Velocity { dx: 0.5, dy: 0.3 }),
            &types,
        );

        // When - migrate to Position-only
        let source = storage.location_for(entity).unwrap();
        let target = storage
            .archetypes()
            .spec_of(source.archetype())
            .difference(&<Velocity>::into_spec(&types));
        storage.migrate(entity, source, &target, (), &types);

        // Then
        let pos_id = types.get::<Position>().unwrap();
        let vel_id = types.get::<Velocity>().unwrap();
        assert_eq!(
            storage.get::<Position>(entity, pos_id),
            Some(&Position { x: 1.0, y: 2.0 })
        );
        assert_eq!(storage.get::<Velocity>(entity, vel_id), None);
        // The emptied source archetype was pruned; Position-only remains.
        assert_eq!(storage.archetypes().len(), 1);
    }

    #[test]
    fn in_place_writes_do_not_move_rows() {
        // Given
        let mut storage = Storage::new();
        let types = world::TypeRegistry::new();
        let allocator = Allocator::default();
        let entity = allocator.alloc();
        storage.spawn_entity(entity, Position { x: 1.0, y: 1.0 }, &types);
        let before = storage.location_for(entity).unwrap();

        // When
        let id = types.get::<Position>().unwrap();
        storage.write_value(before, id, Position { x: 5.0, y: 5.0 });

        // Then
        assert_eq!(storage.location_for(entity), Some(before));
        assert_eq!(
            storage.get::<Position>(entity, id),
            Some(&Position { x: 5.0, y: 5.0 })
        );
    }
}
