//! The World is the central container for all entities, components and
//! systems in the ECS.
//!
//! A `World` owns the entity allocator, the type registry, the archetype
//! storage, the query cache, the hook registry and the deferred-command
//! queue, and exposes the public mutation/query API on top of them.
//!
//! # Data flow
//!
//! A mutation (spawn / add / remove / set / destroy) computes the entity's
//! new component signature, resolves or creates the destination archetype,
//! performs the data move and updates the location index. A query normalizes
//! its filter into a cache key, consults the query cache, then iterates the
//! matching archetypes' columns directly.
//!
//! # Example
//!
//! ```ignore
//! use strata_engine::ecs::World;
//! use strata_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new();
//! let entity = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }))?;
//!
//! world.query::<(&mut Position, &Velocity)>().chunks(|_entities, (positions, velocities)| {
//!     for (pos, vel) in positions.iter_mut().zip(velocities) {
//!         pos.x += vel.dx;
//!     }
//! });
//!
//! world.destroy(entity);
//! ```

mod registry;

use std::marker::PhantomData;

use crate::ecs::{
    component::{self, Component, Spec},
    entity::{self, Entity},
    error::{Error, Result},
    event::Hooks,
    query,
    storage::{Storage, archetype, resource::Resource},
    system::{CommandBuffer, System},
};

pub use registry::{TypeId, TypeInfo, TypeRegistry};

/// Configuration for a world's validation and identity behavior.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// When true, a spawn set naming the same component type twice fails
    /// with [`Error::DuplicateComponentType`] before any mutation. When
    /// false, the last occurrence silently wins.
    pub strict_components: bool,

    /// When true, destroyed entity ids are recycled (with a bumped
    /// generation). When false, ids are retired forever.
    pub recycle_ids: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_components: false,
            recycle_ids: true,
        }
    }
}

/// A read-only snapshot of one archetype's shape, for debugging and
/// benchmarking. No parsing format is promised.
#[derive(Debug, Clone)]
pub struct ArchetypeStats {
    /// The component type names in the archetype's signature.
    pub components: Vec<&'static str>,

    /// The number of entities currently stored.
    pub rows: usize,
}

/// The central container for all entities, components and their
/// relationships.
///
/// Single-writer, single-threaded by design: no operation suspends, and the
/// structure carries no internal synchronization. The `!Send` marker keeps a
/// world on the thread that created it.
pub struct World {
    /// Validation and identity configuration.
    config: Config,

    /// The world's entity id allocator.
    allocator: entity::Allocator,

    /// The registry of all component types known to this world.
    types: TypeRegistry,

    /// Archetype storage, the location index and resources.
    pub(crate) storage: Storage,

    /// Memoized filter → matching-archetype lists.
    pub(crate) cache: query::QueryCache,

    /// Component lifecycle hooks.
    hooks: Hooks,

    /// Registered systems, run in order by `tick`.
    systems: Vec<System>,

    /// The world's own deferred-command queue.
    commands: CommandBuffer,

    /// Marker to make World !Send. The world stays on its creating thread.
    _not_send: PhantomData<*mut ()>,
}

impl World {
    /// Create a world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a world with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            allocator: entity::Allocator::new(config.recycle_ids),
            types: TypeRegistry::new(),
            storage: Storage::new(),
            cache: query::QueryCache::new(),
            hooks: Hooks::default(),
            systems: Vec::new(),
            commands: CommandBuffer::new(),
            _not_send: PhantomData,
        }
    }

    /// The world's configuration.
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    /// The registry of component types known to this world.
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register a component type ahead of first use.
    pub fn register_component<C: Component>(&mut self) -> TypeId {
        self.types.register_component::<C>()
    }

    // ------------------------------------------------------------------
    // Spawning and destruction
    // ------------------------------------------------------------------

    /// Spawn a new entity with the given set of components.
    ///
    /// Under strict validation, a set naming the same component type twice
    /// fails before any id is allocated or archetype touched; in lenient
    /// mode the last occurrence wins.
    pub fn spawn<S: component::Set>(&mut self, values: S) -> Result<Entity> {
        let ids = self.validate_set::<S>()?;

        let entity = self.allocator.alloc();
        self.storage.spawn_entity(entity, values, &self.types);

        self.notify_spawned(entity, &ids);
        Ok(entity)
    }

    /// Spawn `count` entities, each receiving an independent copy of the
    /// prototype set.
    ///
    /// Behaves as `count` sequential spawns, but ids are batch-allocated and
    /// the destination columns are pre-sized once. Components are
    /// value-duplicated: mutating one spawned entity's component is never
    /// observable through another's.
    pub fn spawn_many<S: component::Set + Clone>(
        &mut self,
        count: usize,
        prototype: S,
    ) -> Result<Vec<Entity>> {
        let ids = self.validate_set::<S>()?;

        let entities = self.allocator.alloc_many(count);
        let batch: Vec<_> = entities
            .iter()
            .map(|entity| (*entity, prototype.clone()))
            .collect();
        self.storage.spawn_entities(batch, &self.types);

        for entity in &entities {
            self.notify_spawned(*entity, &ids);
        }
        Ok(entities)
    }

    /// Spawn one entity per value set. All sets share a signature (they are
    /// the same type), so the whole batch lands in one archetype.
    pub fn spawn_batch<S: component::Set>(
        &mut self,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Vec<Entity>> {
        let ids = self.validate_set::<S>()?;

        let sets: Vec<S> = values.into_iter().collect();
        let entities = self.allocator.alloc_many(sets.len());
        let batch: Vec<_> = entities.iter().copied().zip(sets).collect();
        self.storage.spawn_entities(batch, &self.types);

        for entity in &entities {
            self.notify_spawned(*entity, &ids);
        }
        Ok(entities)
    }

    /// Destroy an entity: removed-hooks fire, its row is swap-removed (with
    /// location fixup for the entity moved into its place), its id is freed
    /// and its location cleared. Destroying a dead entity is a no-op, so
    /// destroying twice is safe.
    pub fn destroy(&mut self, entity: Entity) {
        let Some(location) = self.storage.location_for(entity) else {
            return;
        };

        // Removed hooks run before the row leaves storage.
        let spec = self.storage.archetypes().spec_of(location.archetype()).clone();
        for &id in spec.ids() {
            self.hooks.run_removed(self, entity, id);
        }

        self.storage.despawn_entity(entity);
        self.allocator.free(entity);
    }

    /// Destroy every entity in the iterator. Dead entities are skipped.
    pub fn destroy_many(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.destroy(entity);
        }
    }

    // ------------------------------------------------------------------
    // Component mutation
    // ------------------------------------------------------------------

    /// Add a component to an entity, overwriting any existing value of the
    /// same type (upsert).
    ///
    /// If the entity already has the component, this is an in-place column
    /// write with no archetype move; otherwise the entity migrates to the
    /// widened signature in a single move.
    ///
    /// Returns false if the entity does not exist.
    pub fn add_component<C: Component>(&mut self, entity: Entity, value: C) -> bool {
        let Some(location) = self.storage.location_for(entity) else {
            return false;
        };
        let id = self.types.register_component::<C>();

        if self.storage.archetypes().spec_of(location.archetype()).contains(id) {
            self.storage.write_value(location, id, value);
            self.hooks.run_changed(self, entity, id);
        } else {
            let target = self
                .storage
                .archetypes()
                .spec_of(location.archetype())
                .union(&Spec::new(vec![id]));
            self.storage.migrate(entity, location, &target, value, &self.types);
            self.hooks.run_added(self, entity, id);
        }
        true
    }

    /// Remove a component from an entity, migrating it to the narrowed
    /// signature.
    ///
    /// Returns false if the entity does not exist or does not currently have
    /// the component (a no-op, not an error). The removed-hook fires before
    /// the value leaves storage.
    pub fn remove_component<C: Component>(&mut self, entity: Entity) -> bool {
        let Some(location) = self.storage.location_for(entity) else {
            return false;
        };
        let Some(id) = self.types.get::<C>() else {
            return false;
        };

        let target = {
            let source = self.storage.archetypes().spec_of(location.archetype());
            if !source.contains(id) {
                return false;
            }
            source.difference(&Spec::new(vec![id]))
        };

        self.hooks.run_removed(self, entity, id);
        self.storage.migrate(entity, location, &target, (), &self.types);
        true
    }

    /// Remove several components at once, in a single migration.
    ///
    /// All-or-nothing: returns false (and removes nothing) unless the entity
    /// currently has every named component.
    pub fn remove_components<S: component::IntoSpec>(&mut self, entity: Entity) -> bool {
        let Some(location) = self.storage.location_for(entity) else {
            return false;
        };
        let remove = S::into_spec(&self.types);
        if remove.is_empty() {
            return false;
        }

        let target = {
            let source = self.storage.archetypes().spec_of(location.archetype());
            if !source.contains_all(&remove) {
                return false;
            }
            source.difference(&remove)
        };

        for &id in remove.ids() {
            self.hooks.run_removed(self, entity, id);
        }
        self.storage.migrate(entity, location, &target, (), &self.types);
        true
    }

    /// Set several components in one operation: add the missing ones and
    /// overwrite the present ones, with at most one archetype migration.
    ///
    /// The final state is identical to applying `add_component` per value
    /// sequentially; the batching only avoids the intermediate moves.
    ///
    /// Returns false if the entity does not exist.
    pub fn set_components<S: component::Set>(&mut self, entity: Entity, values: S) -> bool {
        let Some(location) = self.storage.location_for(entity) else {
            return false;
        };

        let incoming = S::into_spec(&self.types);
        if incoming.is_empty() {
            return true;
        }

        let source = self.storage.archetypes().spec_of(location.archetype()).clone();
        if source.contains_all(&incoming) {
            // Signature unchanged: plain in-place column writes.
            self.storage.write_set(location, values, &self.types);
            for &id in incoming.ids() {
                self.hooks.run_changed(self, entity, id);
            }
        } else {
            let target = source.union(&incoming);
            self.storage.migrate(entity, location, &target, values, &self.types);
            for &id in incoming.ids() {
                if source.contains(id) {
                    self.hooks.run_changed(self, entity, id);
                } else {
                    self.hooks.run_added(self, entity, id);
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    /// Get a component of an entity, if the entity is alive and has it.
    pub fn get_component<C: Component>(&self, entity: Entity) -> Option<&C> {
        let id = self.types.get::<C>()?;
        self.storage.get::<C>(entity, id)
    }

    /// Get a mutable component of an entity, if the entity is alive and has
    /// it. Writes through this reference do not fire changed-hooks.
    pub fn get_component_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        let id = self.types.get::<C>()?;
        self.storage.get_mut::<C>(entity, id)
    }

    /// Check whether an entity is alive and has the given component.
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        let Some(id) = self.types.get::<C>() else {
            return false;
        };
        let Some(location) = self.storage.location_for(entity) else {
            return false;
        };
        self.storage.archetypes().spec_of(location.archetype()).contains(id)
    }

    /// Check whether an entity is currently alive.
    #[inline]
    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.storage.entities().is_spawned(entity)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Start a query for the given data. See [`query::QueryBuilder`].
    pub fn query<Q: query::QueryData>(&mut self) -> query::QueryBuilder<'_, Q> {
        query::QueryBuilder::new(self)
    }

    /// Build a persistent query that owns its resolved archetype list. See
    /// [`query::Query`].
    pub fn query_for<Q: query::QueryData>(&mut self) -> query::Query<Q> {
        self.query::<Q>().into_query()
    }

    /// Resolve a filter to its matching archetypes through the query cache.
    pub(crate) fn matched_archetypes(&mut self, filter: &query::Filter) -> Vec<archetype::Id> {
        self.cache.matched(filter, self.storage.archetypes()).to_vec()
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Insert a resource, replacing any previous value of the same type.
    #[inline]
    pub fn insert_resource<R: Resource>(&mut self, value: R) {
        self.storage.resources_mut().insert(value);
    }

    /// Get a resource, if present.
    #[inline]
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.storage.resources().get::<R>()
    }

    /// Get a mutable resource, if present.
    #[inline]
    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.storage.resources_mut().get_mut::<R>()
    }

    /// Remove a resource, returning it if it existed.
    #[inline]
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.storage.resources_mut().remove::<R>()
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Register a hook invoked after a `C` value is fully written for an
    /// entity that did not have one (spawn or widening migration).
    pub fn on_component_added<C: Component>(
        &mut self,
        hook: impl Fn(&World, Entity, &C) + 'static,
    ) {
        let id = self.types.register_component::<C>();
        self.hooks.on_added::<C>(id, hook);
    }

    /// Register a hook invoked after an existing `C` value is overwritten,
    /// in place or through a migration.
    pub fn on_component_changed<C: Component>(
        &mut self,
        hook: impl Fn(&World, Entity, &C) + 'static,
    ) {
        let id = self.types.register_component::<C>();
        self.hooks.on_changed::<C>(id, hook);
    }

    /// Register a hook invoked before a `C` value is removed from an entity
    /// (explicit removal or destroy), while the value is still readable.
    pub fn on_component_removed<C: Component>(
        &mut self,
        hook: impl Fn(&World, Entity, &C) + 'static,
    ) {
        let id = self.types.register_component::<C>();
        self.hooks.on_removed::<C>(id, hook);
    }

    // ------------------------------------------------------------------
    // Deferred mutation
    // ------------------------------------------------------------------

    /// Enqueue a callback on the world's own deferred queue, to run at the
    /// next [`flush_deferred`](World::flush_deferred).
    pub fn defer(&self, command: impl FnOnce(&mut World) + Send + 'static) {
        self.commands.defer(command);
    }

    /// Run all currently queued deferred callbacks, in enqueue order.
    ///
    /// Callbacks enqueued while the flush runs wait for the next flush;
    /// flushing an empty queue is a no-op.
    pub fn flush_deferred(&mut self) {
        let commands = std::mem::take(&mut self.commands);
        commands.flush(self);
    }

    // ------------------------------------------------------------------
    // Systems and the tick entry point
    // ------------------------------------------------------------------

    /// Register a named system, run by `tick` in registration order.
    pub fn add_system(
        &mut self,
        name: impl Into<String>,
        run: impl FnMut(&mut World, &CommandBuffer) + 'static,
    ) {
        self.systems.push(System::new(name, run));
    }

    /// Enable a system by name. Returns false if no such system exists.
    pub fn enable_system(&mut self, name: &str) -> bool {
        self.set_system_enabled(name, true)
    }

    /// Disable a system by name. Returns false if no such system exists.
    pub fn disable_system(&mut self, name: &str) -> bool {
        self.set_system_enabled(name, false)
    }

    fn set_system_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.systems.iter_mut().find(|system| system.name == name) {
            Some(system) => {
                system.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Run every enabled system once, in registration order, flushing the
    /// per-tick command buffer and the world's deferred queue after each.
    pub fn tick(&mut self) {
        let mut systems = std::mem::take(&mut self.systems);
        let commands = CommandBuffer::new();

        for system in systems.iter_mut() {
            if !system.enabled {
                continue;
            }
            (system.run)(self, &commands);
            commands.flush(self);
            self.flush_deferred();
        }

        // Systems registered from inside a system land behind the existing ones.
        let registered_during = std::mem::take(&mut self.systems);
        systems.extend(registered_during);
        self.systems = systems;
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.storage.entities().len()
    }

    /// The number of live archetypes.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.storage.archetypes().len()
    }

    /// A read-only snapshot of each archetype's signature and row count.
    pub fn archetype_stats(&self) -> Vec<ArchetypeStats> {
        self.storage
            .archetypes()
            .iter()
            .map(|archetype| ArchetypeStats {
                components: archetype
                    .spec()
                    .ids()
                    .iter()
                    .map(|id| self.types.name_of(*id))
                    .collect(),
                rows: archetype.len(),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolve a set's ids in declaration order, rejecting duplicates when
    /// strict validation is on. Runs before any id allocation or mutation.
    fn validate_set<S: component::IntoSpec>(&self) -> Result<Vec<TypeId>> {
        let mut ids = Vec::new();
        S::collect(&self.types, &mut ids);
        if self.config.strict_components
            && let Some(duplicate) = Spec::find_duplicate(&ids)
        {
            return Err(Error::DuplicateComponentType(self.types.name_of(duplicate)));
        }
        Ok(ids)
    }

    /// Fire added-hooks for each distinct component of a fresh spawn.
    fn notify_spawned(&self, entity: Entity, ids: &[TypeId]) {
        let spec = Spec::new(ids.to_vec());
        for &id in spec.ids() {
            self.hooks.run_added(self, entity, id);
        }
    }
}

impl Default for World {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
