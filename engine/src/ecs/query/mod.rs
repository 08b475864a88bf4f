//! Query API: iterate entities across every archetype matching a component
//! filter.
//!
//! # Architecture
//!
//! - **[`QueryData`]**: what a query fetches — a `&C`/`&mut C` parameter or a
//!   tuple of them. Fetched components arrive in parameter order regardless
//!   of archetype layout; the reordering is resolved once per archetype, not
//!   per entity.
//! - **[`Filter`]**: which archetypes match — the fetched components plus any
//!   extra `with` requirements, `without` exclusions and `any_of` sets. The
//!   filter is also the query-cache key.
//! - **[`QueryBuilder`]**: the transient form returned by `world.query()`.
//!   Consumed by one of the iteration or convenience methods; resolution
//!   goes through the world's query cache.
//! - **[`Query`]**: the persistent form returned by `world.query_for()` (or
//!   `QueryBuilder::into_query`). Holds its own resolved archetype list and
//!   revalidates it against the archetype-set generation, amortizing lookup
//!   cost across a hot loop.
//!
//! # Iteration forms
//!
//! Two distinct operations, not one polymorphic method:
//!
//! - [`QueryBuilder::chunks`] — the throughput form. Invokes the callback
//!   once per matching non-empty archetype with the parallel entity array
//!   and one column slice per requested component.
//! - [`QueryBuilder::iter`] / [`QueryBuilder::each`] — the ergonomic form.
//!   A lazy per-entity walk over the same matching set.
//!
//! # Usage
//!
//! ```rust,ignore
//! // Chunked iteration: tight, allocation-free
//! world.query::<(&mut Position, &Velocity)>().chunks(|_entities, (positions, velocities)| {
//!     for (pos, vel) in positions.iter_mut().zip(velocities) {
//!         pos.x += vel.dx;
//!         pos.y += vel.dy;
//!     }
//! });
//!
//! // Filters
//! let frozen_free = world.query::<&Position>().without::<Frozen>().count();
//!
//! // Persistent query for a per-tick hot loop
//! let mut movers = world.query_for::<(&mut Position, &Velocity)>();
//! movers.each(&mut world, |_entity, (pos, vel)| { pos.x += vel.dx; });
//! ```
//!
//! # Aliasing
//!
//! Requesting the same component twice in one query (`(&C, &mut C)`) panics
//! at query construction; every access must target a distinct column.

use std::marker::PhantomData;

use crate::ecs::{
    component::{IntoSpec, Spec},
    entity::Entity,
    query::param::validate_accesses,
    storage::{Row, archetype},
    world::{self, World},
};

mod filter;
mod iter;
mod param;

pub use filter::{Filter, QueryCache};
pub use iter::QueryIter;
pub use param::{Access, Param, QueryData};

/// A transient query, bound to a mutable borrow of the world.
///
/// Built by `world.query::<Q>()`, refined with [`with`](QueryBuilder::with) /
/// [`without`](QueryBuilder::without) / [`any_of`](QueryBuilder::any_of),
/// then consumed by an iteration or convenience method.
pub struct QueryBuilder<'w, Q: QueryData> {
    world: &'w mut World,
    filter: Filter,
    ids: Vec<world::TypeId>,
    _marker: PhantomData<Q>,
}

impl<'w, Q: QueryData> QueryBuilder<'w, Q> {
    /// Resolve the query's accesses against the world's registry.
    ///
    /// # Panics
    /// - if the query requests the same component more than once
    pub(crate) fn new(world: &'w mut World) -> Self {
        let mut accesses = Vec::new();
        Q::accesses(world.types(), &mut accesses);
        validate_accesses(&accesses);

        let ids: Vec<_> = accesses.iter().map(|access| access.id).collect();
        let filter = Filter::new(Spec::new(ids.clone()));

        Self {
            world,
            filter,
            ids,
            _marker: PhantomData,
        }
    }

    /// Require additional components beyond the fetched ones.
    pub fn with<S: IntoSpec>(mut self) -> Self {
        let spec = S::into_spec(self.world.types());
        self.filter.require(&spec);
        self
    }

    /// Exclude archetypes containing any of the given components.
    pub fn without<S: IntoSpec>(mut self) -> Self {
        let spec = S::into_spec(self.world.types());
        self.filter.exclude(&spec);
        self
    }

    /// Require at least one of the given components.
    pub fn any_of<S: IntoSpec>(mut self) -> Self {
        let spec = S::into_spec(self.world.types());
        self.filter.any_of(&spec);
        self
    }

    /// Chunked iteration: invoke the callback once per matching non-empty
    /// archetype with the entity array and one column slice per requested
    /// component, in request order.
    ///
    /// The slices are live views into archetype storage, not snapshots. The
    /// world is exclusively borrowed for the duration, so structural
    /// mutation from inside the callback must go through a command buffer.
    pub fn chunks(self, mut f: impl FnMut(&[Entity], Q::Slices<'_>)) {
        let matched = self.world.matched_archetypes(&self.filter);
        for archetype_id in matched {
            let table = self.world.storage.table(archetype_id);
            if table.is_empty() {
                continue;
            }
            let mut cursor = 0;
            // SAFETY: the builder holds the world exclusively and the
            // accesses were validated disjoint at construction.
            let slices = unsafe { Q::slices(table, &self.ids, &mut cursor) }
                .expect("matched archetype missing query column");
            f(table.entities(), slices);
        }
    }

    /// Per-entity iteration over all matching rows.
    pub fn each(self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        for (entity, item) in self.iter() {
            f(entity, item);
        }
    }

    /// A lazy per-entity iterator over the matching set.
    pub fn iter(self) -> QueryIter<'w, Q> {
        let matched = self.world.matched_archetypes(&self.filter);
        let world = self.world;
        QueryIter::new(&mut world.storage, matched, self.ids)
    }

    /// Invoke the callback with each matching entity id (no component fetch).
    pub fn each_entity(self, mut f: impl FnMut(Entity)) {
        let matched = self.world.matched_archetypes(&self.filter);
        for archetype_id in matched {
            for entity in self.world.storage.table(archetype_id).entities() {
                f(*entity);
            }
        }
    }

    /// Count the matching entities. Exact, since archetype membership is.
    pub fn count(self) -> usize {
        let matched = self.world.matched_archetypes(&self.filter);
        matched
            .into_iter()
            .map(|id| self.world.storage.table(id).len())
            .sum()
    }

    /// Collect the matching entity ids.
    pub fn ids(self) -> Vec<Entity> {
        let matched = self.world.matched_archetypes(&self.filter);
        let mut ids = Vec::new();
        for archetype_id in matched {
            ids.extend_from_slice(self.world.storage.table(archetype_id).entities());
        }
        ids
    }

    /// Get the first matching entity in archetype iteration order, if any.
    /// The order is unspecified beyond membership in the matching set.
    pub fn first_entity(self) -> Option<Entity> {
        let matched = self.world.matched_archetypes(&self.filter);
        matched
            .into_iter()
            .find_map(|id| self.world.storage.table(id).entities().first().copied())
    }

    /// Convert into a persistent [`Query`] that owns the resolved filter and
    /// can be reused across frames without re-deriving it.
    pub fn into_query(self) -> Query<Q> {
        Query::new(self.filter, self.ids)
    }
}

/// A persistent query: holds its resolved matching-archetype list across
/// uses.
///
/// The list is revalidated against the world's archetype-set generation on
/// every use, so archetypes created (or pruned) after the query was built are
/// picked up automatically. A query must not be carried from one world to
/// another; its component ids are only meaningful in the registry that issued
/// them.
pub struct Query<Q: QueryData> {
    filter: Filter,
    ids: Vec<world::TypeId>,
    matched: Vec<archetype::Id>,
    generation: u64,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: QueryData> Query<Q> {
    pub(crate) fn new(filter: Filter, ids: Vec<world::TypeId>) -> Self {
        Self {
            filter,
            ids,
            matched: Vec::new(),
            generation: u64::MAX,
            _marker: PhantomData,
        }
    }

    /// Re-resolve the matching archetypes if the world's archetype set has
    /// changed since the last use. Called automatically by every accessor.
    pub fn refresh(&mut self, world: &World) {
        let archetypes = world.storage.archetypes();
        if self.generation != archetypes.generation() {
            self.matched = filter::matching(&self.filter, archetypes);
            self.generation = archetypes.generation();
        }
    }

    /// Chunked iteration; see [`QueryBuilder::chunks`].
    pub fn chunks(&mut self, world: &mut World, mut f: impl FnMut(&[Entity], Q::Slices<'_>)) {
        self.refresh(world);
        for archetype_id in &self.matched {
            let table = world.storage.table(*archetype_id);
            if table.is_empty() {
                continue;
            }
            let mut cursor = 0;
            // SAFETY: the caller hands us the world exclusively and the
            // accesses were validated disjoint at construction.
            let slices = unsafe { Q::slices(table, &self.ids, &mut cursor) }
                .expect("matched archetype missing query column");
            f(table.entities(), slices);
        }
    }

    /// Per-entity iteration; see [`QueryBuilder::each`].
    pub fn each(&mut self, world: &mut World, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        self.refresh(world);
        for archetype_id in &self.matched {
            let table = world.storage.table(*archetype_id);
            for index in 0..table.len() {
                let row = Row::new(index);
                let entity = table.entity(row).expect("row in bounds");
                let mut cursor = 0;
                // SAFETY: as in chunks; rows are visited once each.
                let item = unsafe { Q::fetch(table, &self.ids, &mut cursor, row) }
                    .expect("matched archetype missing query column");
                f(entity, item);
            }
        }
    }

    /// A lazy per-entity iterator; see [`QueryBuilder::iter`].
    pub fn iter<'w>(&mut self, world: &'w mut World) -> QueryIter<'w, Q> {
        self.refresh(world);
        QueryIter::new(&mut world.storage, self.matched.clone(), self.ids.clone())
    }

    /// Count the matching entities.
    pub fn count(&mut self, world: &World) -> usize {
        self.refresh(world);
        self.matched
            .iter()
            .map(|id| world.storage.table(*id).len())
            .sum()
    }

    /// Collect the matching entity ids.
    pub fn ids(&mut self, world: &World) -> Vec<Entity> {
        self.refresh(world);
        let mut ids = Vec::new();
        for archetype_id in &self.matched {
            ids.extend_from_slice(world.storage.table(*archetype_id).entities());
        }
        ids
    }

    /// Get the first matching entity, if any.
    pub fn first_entity(&mut self, world: &World) -> Option<Entity> {
        self.refresh(world);
        self.matched
            .iter()
            .find_map(|id| world.storage.table(*id).entities().first().copied())
    }
}
