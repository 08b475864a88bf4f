use fixedbitset::FixedBitSet;

use crate::{
    all_tuples,
    ecs::{component::Component, world},
};

/// A specification for the components attached to an entity or archetype.
///
/// This is a sorted, deduplicated vector of component ids. Two specs built
/// from the same set of types compare equal regardless of input order, which
/// makes a spec usable as a hash key identifying an archetype or a query's
/// requirement set. Specs are immutable after construction; every set
/// operation returns a new spec.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<world::TypeId>,
}

impl Spec {
    /// An empty component specification.
    pub const EMPTY: Self = Spec { ids: Vec::new() };

    /// Construct a new Spec from the given component ids. The ids are sorted
    /// and silently deduplicated; callers that need to reject duplicates
    /// check with [`Spec::find_duplicate`] first.
    #[inline]
    pub fn new(ids: impl Into<Vec<world::TypeId>>) -> Self {
        let mut ids = ids.into();
        ids.sort();
        ids.dedup();
        ids.shrink_to_fit();

        Self { ids }
    }

    /// Find the first component id that appears more than once in the given
    /// (unsorted) id list, if any.
    pub fn find_duplicate(ids: &[world::TypeId]) -> Option<world::TypeId> {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
    }

    /// Get the component ids in this specification.
    #[inline]
    pub fn ids(&self) -> &[world::TypeId] {
        &self.ids
    }

    /// Determine if this specification contains the given component id.
    #[inline]
    pub fn contains(&self, id: world::TypeId) -> bool {
        // Binary search since the ids are sorted.
        self.ids.binary_search(&id).is_ok()
    }

    /// Determine if this specification contains all ids in the other spec.
    #[inline]
    pub fn contains_all(&self, other: &Spec) -> bool {
        other.ids.iter().all(|id| self.contains(*id))
    }

    /// Determine if this specification contains any id in the other spec.
    #[inline]
    pub fn contains_any(&self, other: &Spec) -> bool {
        other.ids.iter().any(|id| self.contains(*id))
    }

    /// Create a new spec that is the union with the other spec.
    #[inline]
    pub fn union(&self, other: &Spec) -> Self {
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        Self::new(ids)
    }

    /// Get the components in self that are not in other (set difference).
    #[inline]
    pub fn difference(&self, other: &Spec) -> Self {
        let ids: Vec<_> = self
            .ids
            .iter()
            .copied()
            .filter(|id| !other.contains(*id))
            .collect();
        Self { ids } // Already sorted
    }

    /// Get the components in both self and other (set intersection).
    #[inline]
    pub fn intersection(&self, other: &Spec) -> Self {
        let ids: Vec<_> = self
            .ids
            .iter()
            .copied()
            .filter(|id| other.contains(*id))
            .collect();
        Self { ids } // Already sorted
    }

    /// Returns true if this spec is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of component ids in this spec.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Lower this spec to a bitset mask indexed by component id. Used for
    /// fast superset/disjoint tests during query matching.
    pub fn mask(&self) -> FixedBitSet {
        let bits = self.ids.last().map(|id| id.index() + 1).unwrap_or(0);
        let mut mask = FixedBitSet::with_capacity(bits);
        for id in &self.ids {
            mask.insert(id.index());
        }
        mask
    }
}

impl From<Vec<world::TypeId>> for Spec {
    #[inline]
    fn from(value: Vec<world::TypeId>) -> Self {
        Spec::new(value)
    }
}

/// Trait for resolving a type into a component specification.
///
/// Implemented for single component types and tuples thereof. [`collect`]
/// appends the ids in declaration order without deduplication, which is what
/// lets strict spawn validation see duplicates before they are normalized
/// away.
///
/// [`collect`]: IntoSpec::collect
pub trait IntoSpec<Marker = ()> {
    /// Append the component ids for this type in declaration order,
    /// registering them as needed.
    fn collect(registry: &world::TypeRegistry, out: &mut Vec<world::TypeId>);

    /// Resolve the type into a normalized component specification.
    fn into_spec(registry: &world::TypeRegistry) -> Spec {
        let mut ids = Vec::new();
        Self::collect(registry, &mut ids);
        Spec::new(ids)
    }
}

/// [`IntoSpec`] implementation for the empty tuple.
impl IntoSpec for () {
    fn collect(_registry: &world::TypeRegistry, _out: &mut Vec<world::TypeId>) {}
}

/// [`IntoSpec`] implementation for single component types.
impl<C: Component> IntoSpec for C {
    fn collect(registry: &world::TypeRegistry, out: &mut Vec<world::TypeId>) {
        out.push(registry.register_component::<C>());
    }
}

/// [`IntoSpec`] implementation for tuples of other [`IntoSpec`] types.
macro_rules! tuple_spec {
    ($($name: ident),*) => {
        impl<$($name: IntoSpec),*> IntoSpec for ($($name,)*) {
            fn collect(registry: &world::TypeRegistry, out: &mut Vec<world::TypeId>) {
                $(
                    <$name>::collect(registry, out);
                )*
            }
        }
    }
}

// Implement the tuple -> Spec for all tuples up to 26 elements.
all_tuples!(tuple_spec);
