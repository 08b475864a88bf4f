use std::collections::HashMap;

use crate::ecs::{
    component::Spec,
    storage::archetype::{self, Archetypes},
};

/// A query's archetype filter: the normalized required / excluded / any-of
/// component sets. Doubles as the query cache key.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    /// Signatures must contain every one of these.
    required: Spec,

    /// Signatures must contain none of these.
    without: Spec,

    /// Signatures must contain at least one of these (when non-empty).
    any_of: Spec,
}

impl Filter {
    /// Create a filter requiring the given signature.
    #[inline]
    pub fn new(required: Spec) -> Self {
        Self {
            required,
            ..Self::default()
        }
    }

    /// Add further required components.
    #[inline]
    pub fn require(&mut self, spec: &Spec) {
        self.required = self.required.union(spec);
    }

    /// Add excluded components.
    #[inline]
    pub fn exclude(&mut self, spec: &Spec) {
        self.without = self.without.union(spec);
    }

    /// Add any-of components.
    #[inline]
    pub fn any_of(&mut self, spec: &Spec) {
        self.any_of = self.any_of.union(spec);
    }

    /// The required signature.
    #[inline]
    pub fn required(&self) -> &Spec {
        &self.required
    }

    /// The excluded signature.
    #[inline]
    pub fn without(&self) -> &Spec {
        &self.without
    }

    /// The any-of signature.
    #[inline]
    pub fn any(&self) -> &Spec {
        &self.any_of
    }
}

/// Collect the archetypes whose signatures satisfy a filter.
///
/// A signature matches when it is a superset of the required set, disjoint
/// from the excluded set, and intersects the any-of set (if one was given).
/// Population is irrelevant here; empty archetypes still match structurally
/// and are skipped at iteration time.
pub(crate) fn matching(filter: &Filter, archetypes: &Archetypes) -> Vec<archetype::Id> {
    let required = filter.required().mask();
    let without = filter.without().mask();
    let any_of = filter.any().mask();

    archetypes
        .iter()
        .filter(|archetype| {
            let mask = archetype.mask();
            required.is_subset(mask)
                && without.is_disjoint(mask)
                && (any_of.is_clear() || !any_of.is_disjoint(mask))
        })
        .map(|archetype| archetype.id())
        .collect()
}

/// Memoizes filter → matching-archetype lists.
///
/// Each entry is stamped with the archetype-set generation it was computed
/// at. Creating or pruning an archetype bumps that generation, so the next
/// lookup recomputes the entry — a new archetype can newly satisfy a cached
/// query, including one that previously matched nothing. Row-count changes
/// never touch the cache.
#[derive(Default)]
pub struct QueryCache {
    entries: HashMap<Filter, CacheEntry>,
}

struct CacheEntry {
    matched: Vec<archetype::Id>,
    generation: u64,
}

impl QueryCache {
    /// Create an empty cache.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the archetypes matching a filter, recomputing the entry if the
    /// archetype set has changed since it was cached.
    pub fn matched(&mut self, filter: &Filter, archetypes: &Archetypes) -> &[archetype::Id] {
        let generation = archetypes.generation();
        let entry = self
            .entries
            .entry(filter.clone())
            .or_insert_with(|| CacheEntry {
                matched: Vec::new(),
                generation: u64::MAX,
            });
        if entry.generation != generation {
            entry.matched = matching(filter, archetypes);
            entry.generation = generation;
        }
        &entry.matched
    }

    /// The number of cached filters.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use crate::ecs::{component::IntoSpec, world};

    use super::*;

    #[derive(Component)]
    struct Position;
    #[derive(Component)]
    struct Tag;
    #[derive(Component)]
    struct Frozen;

    #[test]
    fn matching_applies_required_without_and_any() {
        // Given - archetypes {Position}, {Position, Tag}, {Position, Frozen}
        let types = world::TypeRegistry::new();
        let mut archetypes = Archetypes::new();
        let plain = archetypes.get_or_create(&<Position>::into_spec(&types), &types);
        let tagged = archetypes.get_or_create(&<(Position, Tag)>::into_spec(&types), &types);
        let frozen = archetypes.get_or_create(&<(Position, Frozen)>::into_spec(&types), &types);

        // When - Position without Frozen
        let mut filter = Filter::new(<Position>::into_spec(&types));
        filter.exclude(&<Frozen>::into_spec(&types));
        let ids = matching(&filter, &archetypes);

        // Then - exactly the first two
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&plain));
        assert!(ids.contains(&tagged));

        // When - Position any-of [Tag]
        let mut filter = Filter::new(<Position>::into_spec(&types));
        filter.any_of(&<Tag>::into_spec(&types));
        let ids = matching(&filter, &archetypes);

        // Then - exactly the tagged archetype
        assert_eq!(ids, vec![tagged]);

        // When - empty required matches everything
        let ids = matching(&Filter::default(), &archetypes);

        // Then
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&frozen));
    }

    #[test]
    fn cache_recomputes_when_archetype_set_changes() {
        // Given - a filter that matches nothing yet
        let types = world::TypeRegistry::new();
        let mut archetypes = Archetypes::new();
        let mut cache = QueryCache::new();
        let filter = Filter::new(<Tag>::into_spec(&types));

        // When - cache the negative result
        assert!(cache.matched(&filter, &archetypes).is_empty());

        // And a brand-new matching archetype appears
        let id = archetypes.get_or_create(&<(Position, Tag)>::into_spec(&types), &types);

        // Then - the same filter now sees it
        assert_eq!(cache.matched(&filter, &archetypes), &[id]);

        // And pruning invalidates again
        archetypes.prune(id);
        assert!(cache.matched(&filter, &archetypes).is_empty());
    }
}
