use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::debug;

use crate::ecs::{component, storage::table::Table, world};

/// A unique identifier for an archetype.
///
/// Ids index the registry's slot array. A pruned archetype's slot (and id)
/// may be reused for a later archetype; any cached id list is validated
/// against the registry generation before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the index of the Id as a usize to be used in collections.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// An archetype: the storage for all entities sharing one exact component
/// signature. Owns the signature, its bitset mask, and the columnar table
/// holding the rows.
pub struct Archetype {
    /// The archetype's unique identifier.
    id: Id,

    /// The normalized component signature. Never mutated after creation.
    spec: component::Spec,

    /// The signature lowered to a bitset, for query matching.
    mask: FixedBitSet,

    /// The columnar storage for this archetype's entities.
    table: Table,
}

impl Archetype {
    /// Get the Id of this archetype.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the component signature of this archetype.
    #[inline]
    pub fn spec(&self) -> &component::Spec {
        &self.spec
    }

    /// Get the signature mask of this archetype.
    #[inline]
    pub fn mask(&self) -> &FixedBitSet {
        &self.mask
    }

    /// Get the storage table of this archetype.
    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Get mutable access to the storage table of this archetype.
    #[inline]
    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// The number of entities currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check whether the archetype currently stores no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Central registry of archetypes, keyed by normalized component signature.
///
/// Archetypes are created lazily on first use and destroyed when their row
/// count returns to zero. Every change to the archetype *set* (create or
/// prune) bumps a generation counter; query caches and persistent queries
/// compare against it to know when their matched lists are stale.
#[derive(Default)]
pub struct Archetypes {
    /// Archetype slots indexed by id. Pruned slots are `None` until reused.
    slots: Vec<Option<Archetype>>,

    /// The archetypes indexed by their component signature.
    by_spec: HashMap<component::Spec, Id>,

    /// Slot ids freed by pruning, available for reuse.
    free: Vec<Id>,

    /// Bumped whenever the set of archetypes changes.
    generation: u64,
}

impl Archetypes {
    /// Create an empty archetype registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the archetype for a signature, creating it (and its table) lazily.
    ///
    /// The spec must already be normalized; it is used as the map key
    /// directly. Creation bumps the registry generation.
    pub fn get_or_create(&mut self, spec: &component::Spec, types: &world::TypeRegistry) -> Id {
        if let Some(id) = self.by_spec.get(spec) {
            return *id;
        }

        let table = Table::new(&types.infos_for_spec(spec));
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(None);
                Id((self.slots.len() - 1) as u32)
            }
        };
        debug!("created archetype {:?} with {} component type(s)", id, spec.len());

        self.slots[id.index()] = Some(Archetype {
            id,
            spec: spec.clone(),
            mask: spec.mask(),
            table,
        });
        self.by_spec.insert(spec.clone(), id);
        self.generation += 1;

        id
    }

    /// Get an archetype by id, if it is live.
    #[inline]
    pub fn get(&self, id: Id) -> Option<&Archetype> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Get a mutable archetype by id, if it is live.
    #[inline]
    pub fn get_mut(&mut self, id: Id) -> Option<&mut Archetype> {
        self.slots.get_mut(id.index()).and_then(|slot| slot.as_mut())
    }

    /// Get the table for a live archetype.
    ///
    /// # Panics
    /// - if the id does not name a live archetype
    #[inline]
    pub fn table(&self, id: Id) -> &Table {
        self.get(id).expect("archetype id out of bounds").table()
    }

    /// Get the mutable table for a live archetype.
    ///
    /// # Panics
    /// - if the id does not name a live archetype
    #[inline]
    pub fn table_mut(&mut self, id: Id) -> &mut Table {
        self.get_mut(id)
            .expect("archetype id out of bounds")
            .table_mut()
    }

    /// Get the signature for a live archetype.
    ///
    /// # Panics
    /// - if the id does not name a live archetype
    #[inline]
    pub fn spec_of(&self, id: Id) -> &component::Spec {
        self.get(id).expect("archetype id out of bounds").spec()
    }

    /// Destroy an emptied archetype, freeing its slot for reuse.
    ///
    /// Must only be called once the structural operation that emptied the
    /// archetype has fully completed; the registry generation is bumped so
    /// cached archetype lists stop referencing the slot.
    ///
    /// # Panics
    /// - if the archetype still holds rows
    pub fn prune(&mut self, id: Id) {
        let archetype = self
            .slots
            .get_mut(id.index())
            .and_then(|slot| slot.take())
            .expect("archetype id out of bounds");
        assert!(archetype.is_empty(), "pruned archetype still has rows");

        debug!("pruned empty archetype {:?}", id);
        self.by_spec.remove(archetype.spec());
        self.free.push(id);
        self.generation += 1;
    }

    /// Iterate over all live archetypes.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// The number of live archetypes.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_spec.len()
    }

    /// Check whether no archetypes are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_spec.is_empty()
    }

    /// The current archetype-set generation. Changes whenever an archetype is
    /// created or pruned.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use crate::ecs::component::IntoSpec;

    use super::*;

    #[derive(Component)]
    struct Comp1;
    #[derive(Component)]
    struct Comp2;

    #[test]
    fn get_or_create_is_keyed_by_signature() {
        // Given
        let types = world::TypeRegistry::new();
        let mut archetypes = Archetypes::new();

        // When - two permutations of the same type set
        let id1 = archetypes.get_or_create(&<(Comp1, Comp2)>::into_spec(&types), &types);
        let id2 = archetypes.get_or_create(&<(Comp2, Comp1)>::into_spec(&types), &types);
        let id3 = archetypes.get_or_create(&<Comp1>::into_spec(&types), &types);

        // Then - one archetype per unique signature
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(archetypes.len(), 2);
    }

    #[test]
    fn generation_bumps_on_create_and_prune() {
        // Given
        let types = world::TypeRegistry::new();
        let mut archetypes = Archetypes::new();
        let gen0 = archetypes.generation();

        // When
        let id = archetypes.get_or_create(&<Comp1>::into_spec(&types), &types);
        let gen1 = archetypes.generation();
        archetypes.prune(id);
        let gen2 = archetypes.generation();

        // Then
        assert_ne!(gen0, gen1);
        assert_ne!(gen1, gen2);
        assert_eq!(archetypes.len(), 0);
        assert!(archetypes.get(id).is_none());
    }

    #[test]
    fn pruned_slot_is_reused() {
        // Given
        let types = world::TypeRegistry::new();
        let mut archetypes = Archetypes::new();
        let id = archetypes.get_or_create(&<Comp1>::into_spec(&types), &types);
        archetypes.prune(id);

        // When - a different signature arrives
        let id2 = archetypes.get_or_create(&<Comp2>::into_spec(&types), &types);

        // Then - the freed slot is handed out again
        assert_eq!(id, id2);
        assert_eq!(archetypes.len(), 1);
    }
}
