//! Entity identity management for the ECS (Entity Component System).
//!
//! Entities are lightweight handles that tie component data together. An
//! [`Entity`] combines an [`Id`] with a [`Generation`]: the id names a slot,
//! the generation counts how many times that slot has been reissued. A stale
//! handle (freed and reallocated id) fails the generation check in the
//! location index instead of silently aliasing a different entity.
//!
//! The [`Allocator`] hands out ids and recycles freed ones through a dead
//! pool. Recycling can be switched off entirely, in which case freed ids are
//! retired forever — useful for callers that cache raw ids across frames and
//! would rather pay address-space growth than risk ABA confusion.

use std::sync::{
    RwLock,
    atomic::{AtomicU32, Ordering},
};

use crossbeam::queue::SegQueue;

/// The generation of an entity slot. Starts at `FIRST` and is incremented
/// each time the slot's id is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    /// The first generation of an entity.
    pub(crate) const FIRST: Self = Self(0);
}

/// An entity identifier. This is a unique identifier for an entity slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// An entity in the ECS. The world contains at most one live entity for a
/// given `id`; the `generation` tells whether this handle still refers to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    /// The unique identifier of the entity.
    id: Id,

    /// The generation of the entity.
    generation: Generation,
}

impl Entity {
    /// Construct a new entity with just an id, defaulting to the first generation.
    ///
    /// This is primarily used for testing.
    #[inline]
    #[allow(dead_code)]
    pub(crate) fn new(id: impl Into<Id>) -> Self {
        Self::new_with_generation(id.into(), Generation::FIRST)
    }

    /// Construct a new entity with an id and a known generation.
    #[inline]
    pub(crate) const fn new_with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the id of this entity.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the generation of this entity.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec).
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }
}

/// Implement ordering for Entity based on id and generation.
impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Implement ordering for Entity based on id and generation.
impl Ord for Entity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.id.cmp(&other.id) {
            std::cmp::Ordering::Equal => self.generation.cmp(&other.generation),
            ord => ord,
        }
    }
}

const CHUNK_SIZE: usize = 4096;

/// Growable array of atomic generations, mapping an entity id to its current
/// generation. Chunked so existing slots never move when the array grows.
#[derive(Default, Debug)]
struct Generations {
    chunks: RwLock<Vec<Box<[AtomicU32; CHUNK_SIZE]>>>,
}

impl Generations {
    const fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn get(&self, id: Id) -> Generation {
        let id = id.0;
        let chunk_idx = id as usize / CHUNK_SIZE;
        let slot_idx = id as usize % CHUNK_SIZE;

        let chunks = self.chunks.read().unwrap();
        Generation(if chunk_idx < chunks.len() {
            chunks[chunk_idx][slot_idx].load(Ordering::Acquire)
        } else {
            0 // Fresh ID, generation 0
        })
    }

    fn increment(&self, id: Id) {
        self.ensure_capacity(id);
        let id = id.0;
        let chunk_idx = id as usize / CHUNK_SIZE;
        let slot_idx = id as usize % CHUNK_SIZE;

        let chunks = self.chunks.read().unwrap();
        chunks[chunk_idx][slot_idx].fetch_add(1, Ordering::Release);
    }

    fn ensure_capacity(&self, id: Id) {
        let id = id.0;
        let chunk_idx = id as usize / CHUNK_SIZE;
        let chunks_len = self.chunks.read().unwrap().len();

        if chunk_idx >= chunks_len {
            let mut chunks = self.chunks.write().unwrap();
            while chunks.len() <= chunk_idx {
                chunks.push(Box::new(std::array::from_fn(|_| AtomicU32::new(0))));
            }
        }
    }
}

/// An allocator for entity ids.
///
/// Allocates unique ids and, when recycling is enabled, reuses freed ids from
/// a dead pool. A freed id's generation is incremented before it becomes
/// eligible for reuse, invalidating stale handles. With recycling disabled,
/// `free` retires the id permanently and every allocation draws a fresh id
/// from the monotonic counter.
#[derive(Debug)]
pub struct Allocator {
    /// Generation counter for each id slot.
    generations: Generations,

    /// Pool of ids available for reuse (just the id, not the full Entity).
    dead_pool: SegQueue<Id>,

    /// Next fresh id to allocate.
    next_id: AtomicU32,

    /// Whether freed ids are returned to the dead pool for reuse.
    recycle: bool,
}

impl Allocator {
    /// Construct a new entity allocator starting from id 0.
    #[inline]
    pub const fn new(recycle: bool) -> Self {
        Self {
            generations: Generations::new(),
            dead_pool: SegQueue::new(),
            next_id: AtomicU32::new(0),
            recycle,
        }
    }

    /// Allocate a new entity, either by reusing a freed id from the dead pool
    /// or by drawing a fresh id from the counter.
    pub fn alloc(&self) -> Entity {
        // Try to reuse from the dead pool first
        if let Some(id) = self.dead_pool.pop() {
            return Entity::new_with_generation(id, self.generations.get(id));
        }

        // Allocate fresh id
        let id = Id(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.generations.ensure_capacity(id);
        Entity::new_with_generation(id, self.generations.get(id))
    }

    /// Allocate many entities at once.
    ///
    /// Equivalent to `count` sequential `alloc` calls: ids are drawn from the
    /// dead pool until it runs dry, then the remainder comes from a single
    /// counter bump, avoiding per-id overhead for bulk spawns.
    pub fn alloc_many(&self, count: usize) -> Vec<Entity> {
        let mut alloced = Vec::with_capacity(count);
        // Pull as many as we can from the dead pool.
        while alloced.len() < count
            && let Some(id) = self.dead_pool.pop()
        {
            alloced.push(Entity::new_with_generation(id, self.generations.get(id)));
        }

        // Allocate remaining as new sequential ids
        let remaining = (count - alloced.len()) as u32;
        if remaining > 0 {
            let start_id = self.next_id.fetch_add(remaining, Ordering::Relaxed);
            let last_id = start_id + remaining;
            self.generations.ensure_capacity(Id(last_id - 1));

            alloced.extend(
                (start_id..last_id).map(|id| Entity::new_with_generation(Id(id), Generation::FIRST)),
            );
        }

        alloced
    }

    /// Free an entity id.
    ///
    /// The slot generation is bumped so stale handles can be detected. The id
    /// goes back to the dead pool only when recycling is enabled; otherwise it
    /// is retired and never reissued.
    pub fn free(&self, entity: Entity) {
        let id = entity.id();
        self.generations.increment(id);
        if self.recycle {
            self.dead_pool.push(id);
        }
    }
}

impl Default for Allocator {
    #[inline]
    fn default() -> Self {
        Self::new(true)
    }
}

#[test]
fn allocator_uniqueness() {
    // Given
    let allocator = Allocator::default();

    // When
    let mut entities = Vec::new();
    for _ in 0..200 {
        entities.push(allocator.alloc());
    }

    // Then - No dupes generated
    let pre_len = entities.len();
    entities.sort();
    entities.dedup();
    assert_eq!(pre_len, entities.len());
}

#[test]
fn allocator_reuse() {
    // Given
    let allocator = Allocator::default();

    // When
    let mut entities = Vec::new();
    for _ in 0..10 {
        entities.push(allocator.alloc());
    }

    for e in entities.drain(..) {
        allocator.free(e);
    }

    let mut reused = Vec::new();
    for _ in 0..10 {
        reused.push(allocator.alloc());
    }

    // Then - Entities should be reused with an incremented generation
    reused.sort();
    for (i, e) in reused.iter().enumerate() {
        assert_eq!(e.id.0, i as u32);
        assert_eq!(e.generation.0, 1);
    }
}

#[test]
fn allocator_no_recycle_never_reuses() {
    // Given
    let allocator = Allocator::new(false);

    // When
    let e1 = allocator.alloc();
    allocator.free(e1);
    let e2 = allocator.alloc();

    // Then - freed id is retired, a fresh one is drawn
    assert_ne!(e1.id, e2.id);
    assert_eq!(e2.id.0, 1);
}

#[test]
fn allocator_alloc_many_from_empty() {
    // Given
    let allocator = Allocator::default();

    // When
    let entities = allocator.alloc_many(5);

    // Then - Should get sequential new ids
    assert_eq!(entities.len(), 5);
    for (i, e) in entities.iter().enumerate() {
        assert_eq!(e.id.0, i as u32);
        assert_eq!(e.generation.0, 0);
    }
    assert_eq!(allocator.next_id.load(Ordering::Relaxed), 5);
}

#[test]
fn allocator_alloc_many_drains_pool_first() {
    // Given
    let allocator = Allocator::default();
    for e in allocator.alloc_many(3) {
        allocator.free(e);
    }
    assert_eq!(allocator.dead_pool.len(), 3);

    // When - Allocate 5 (more than pool size)
    let entities = allocator.alloc_many(5);

    // Then - Should get 3 reused + 2 new, no duplicates
    assert_eq!(entities.len(), 5);
    let reused: Vec<_> = entities.iter().filter(|e| e.generation.0 == 1).collect();
    let fresh: Vec<_> = entities.iter().filter(|e| e.generation.0 == 0).collect();
    assert_eq!(reused.len(), 3);
    assert_eq!(fresh.len(), 2);

    let mut ids: Vec<_> = entities.iter().map(|e| e.id.0).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);

    assert_eq!(allocator.dead_pool.len(), 0);
    assert_eq!(allocator.next_id.load(Ordering::Relaxed), 5);
}

#[test]
fn allocator_multiple_generations() {
    // Given
    let allocator = Allocator::default();
    let entity = allocator.alloc();
    let original_id = entity.id;

    // When - Free and reallocate multiple times
    allocator.free(entity);
    let gen1 = allocator.alloc();

    allocator.free(gen1);
    let gen2 = allocator.alloc();

    // Then - Same id, incrementing generations
    assert_eq!(gen1.id, original_id);
    assert_eq!(gen1.generation.0, 1);
    assert_eq!(gen2.id, original_id);
    assert_eq!(gen2.generation.0, 2);
}

#[test]
fn entity_ordering() {
    // Given
    let e1 = Entity::new(Id(1));
    let e2 = Entity::new(Id(2));
    let e1_gen1 = Entity::new_with_generation(Id(1), Generation(1));

    // Then - Ordered by id first, then generation
    assert!(e1 < e2);
    assert!(e1 < e1_gen1);
    assert!(e1_gen1 < e2);
}
