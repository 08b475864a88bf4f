//! World-scoped registry of component types.
//!
//! Every component type used with a world gets a dense numeric [`TypeId`]
//! issued on first registration. The numeric id serves two purposes: it is
//! the total order used when normalizing component signatures, and it indexes
//! the bitset masks used for query matching. Registration is idempotent and
//! uses lock-free reads via `DashMap`, so hot paths that re-resolve an
//! already-registered type never contend.
//!
//! The registry also records, per type, how to construct an empty storage
//! column. Archetype tables are created for signatures that are only known at
//! runtime (e.g. the target of a component removal), so the constructor is
//! captured as a plain function pointer at registration time, when the
//! concrete Rust type is still in scope.

use std::{
    any::TypeId as StdTypeId,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::ecs::{
    component::{Component, Spec},
    storage::column::{AnyStore, new_store},
};

/// A unique identifier for a registered component type.
///
/// Ids are issued densely from zero in registration order. The numeric value
/// is the canonical total order over component types: signatures normalize by
/// sorting on it, and archetype masks index bitsets with it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a new id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this id for use in indexable storage (e.g. Vec, bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TypeId {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Metadata about a registered component type.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// The dense id issued for the type.
    id: TypeId,

    /// The Rust TypeId, for runtime type checking.
    type_id: StdTypeId,

    /// The type name, for diagnostics and archetype stats.
    name: &'static str,

    /// Constructor for an empty storage column holding this type.
    pub(crate) new_store: fn() -> Box<dyn AnyStore>,
}

impl TypeInfo {
    /// Get the dense id for this type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the Rust TypeId for this type.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// Get the type name. This is `std::any::type_name` output, stable enough
    /// for diagnostics but not a parsing format.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of all component types known to a world.
#[derive(Default)]
pub struct TypeRegistry {
    /// Type metadata keyed by the Rust TypeId.
    infos: DashMap<StdTypeId, TypeInfo>,

    /// Type metadata keyed by the dense id.
    by_id: DashMap<TypeId, TypeInfo>,

    /// The next dense id to issue.
    next_id: AtomicU32,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            infos: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type, returning its dense id. Registration is
    /// idempotent: re-registering an existing type returns the original id.
    pub fn register_component<C: Component>(&self) -> TypeId {
        let std_id = StdTypeId::of::<C>();
        if let Some(info) = self.infos.get(&std_id) {
            return info.id();
        }

        let info = *self.infos.entry(std_id).or_insert_with(|| TypeInfo {
            id: TypeId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            type_id: std_id,
            name: std::any::type_name::<C>(),
            new_store: new_store::<C>,
        });
        self.by_id.insert(info.id(), info);
        info.id()
    }

    /// Get the id for a component type, if it has been registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<TypeId> {
        self.infos.get(&StdTypeId::of::<C>()).map(|info| info.id())
    }

    /// Get the metadata for a component type, if it has been registered.
    #[inline]
    pub fn info_of<C: Component>(&self) -> Option<TypeInfo> {
        self.infos.get(&StdTypeId::of::<C>()).map(|info| *info)
    }

    /// Get the metadata for a dense id, if it has been issued.
    #[inline]
    pub fn info(&self, id: TypeId) -> Option<TypeInfo> {
        self.by_id.get(&id).map(|info| *info)
    }

    /// Get the type name for a dense id.
    ///
    /// # Panics
    /// - if the id was never issued by this registry
    pub fn name_of(&self, id: TypeId) -> &'static str {
        self.info(id).expect("type id not issued by this registry").name
    }

    /// Get the metadata for every type in a signature, in signature order.
    ///
    /// # Panics
    /// - if any id in the spec was never issued by this registry
    pub fn infos_for_spec(&self, spec: &Spec) -> Vec<TypeInfo> {
        spec.ids()
            .iter()
            .map(|id| self.info(*id).expect("type id not issued by this registry"))
            .collect()
    }

    /// The number of types registered so far.
    #[inline]
    pub fn type_count(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }
}
