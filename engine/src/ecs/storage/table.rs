use std::any::Any;

use crate::ecs::{
    component::{self, Component, Target},
    entity::Entity,
    storage::{Row, column::Column},
    world,
};

/// A table stores entities and their component data in columnar format.
///
/// Each column holds all instances of a single component type, so iterating
/// one component touches sequential memory. Columns are kept in signature
/// order (sorted by component id), which lets migrations merge-walk a table
/// positionally instead of searching per column.
///
/// # Invariants
/// - `entities.len()` equals the length of every column
/// - row `i` across all columns plus `entities[i]` describes exactly one
///   entity's full component data
pub struct Table {
    /// The entities stored in this table (one per row).
    entities: Vec<Entity>,

    /// The component columns, sorted by component id.
    columns: Vec<Column>,
}

/// Writer used when appending a row: each value either fills the row's slot
/// in its column or, if the slot was already filled by an earlier value of
/// the same type in the set, overwrites it (last occurrence wins).
struct RowWriter<'a> {
    columns: &'a mut [Column],
    row: usize,
}

impl Target for RowWriter<'_> {
    fn apply<C: Component>(&mut self, id: world::TypeId, value: C) {
        let column = column_by_id_mut(self.columns, id).expect("component not in table");
        if column.len() == self.row + 1 {
            // The set already wrote this column for this row; last wins.
            column.write::<C>(Row::new(self.row), value);
        } else {
            debug_assert_eq!(column.len(), self.row, "column out of sync with row append");
            column.push_value::<C>(value);
        }
    }
}

/// Writer used when overwriting components of an existing row in place.
struct InPlaceWriter<'a> {
    columns: &'a mut [Column],
    row: usize,
}

impl Target for InPlaceWriter<'_> {
    fn apply<C: Component>(&mut self, id: world::TypeId, value: C) {
        let column = column_by_id_mut(self.columns, id).expect("component not in table");
        column.write::<C>(Row::new(self.row), value);
    }
}

fn column_by_id(columns: &[Column], id: world::TypeId) -> Option<&Column> {
    columns
        .binary_search_by_key(&id, |col| col.info().id())
        .ok()
        .map(|idx| &columns[idx])
}

fn column_by_id_mut(columns: &mut [Column], id: world::TypeId) -> Option<&mut Column> {
    columns
        .binary_search_by_key(&id, |col| col.info().id())
        .ok()
        .map(|idx| &mut columns[idx])
}

impl Table {
    /// Create a new table with one column per component info.
    ///
    /// The infos must arrive in signature order (sorted by id), which is what
    /// the registry produces for a normalized spec.
    pub fn new(components: &[component::Info]) -> Self {
        debug_assert!(
            components.windows(2).all(|w| w[0].id() < w[1].id()),
            "table columns must be in signature order"
        );
        Self {
            entities: Vec::new(),
            columns: components.iter().map(|info| Column::new(*info)).collect(),
        }
    }

    /// Get the number of entities (rows) in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get the entities stored in this table.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Get the entity stored at a specific row, if the row is in this table.
    #[inline]
    pub fn entity(&self, row: Row) -> Option<Entity> {
        self.entities.get(row.index()).copied()
    }

    /// Reserve space for additional rows across the entity array and every
    /// column. Used by batch spawns to avoid repeated growth.
    pub fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for column in self.columns.iter_mut() {
            column.reserve(additional);
        }
    }

    /// Get a reference to the column for a component id.
    #[inline]
    pub fn column(&self, id: world::TypeId) -> Option<&Column> {
        column_by_id(&self.columns, id)
    }

    /// Get a mutable reference to the column for a component id.
    #[inline]
    pub fn column_mut(&mut self, id: world::TypeId) -> Option<&mut Column> {
        column_by_id_mut(&mut self.columns, id)
    }

    /// Check whether this table has a column for the given component id.
    #[inline]
    pub fn has_column(&self, id: world::TypeId) -> bool {
        self.column(id).is_some()
    }

    /// Get the component ids for all columns, in signature order.
    #[inline]
    pub fn component_ids(&self) -> impl Iterator<Item = world::TypeId> + '_ {
        self.columns.iter().map(|col| col.info().id())
    }

    /// Get a component reference for a specific row.
    ///
    /// Returns `None` if the component is not in this table, the type doesn't
    /// match, or the row is out of bounds.
    #[inline]
    pub fn get<C: Component>(&self, id: world::TypeId, row: Row) -> Option<&C> {
        self.column(id)?.get::<C>(row)
    }

    /// Get a mutable component reference for a specific row.
    #[inline]
    pub fn get_mut<C: Component>(&mut self, id: world::TypeId, row: Row) -> Option<&mut C> {
        self.column_mut(id)?.get_mut::<C>(row)
    }

    /// Append one entity's components from a value set (keyed path).
    ///
    /// Each value is routed to its column by component id. The set must cover
    /// exactly this table's columns; a duplicated type within the set
    /// overwrites its earlier occurrence (last wins).
    ///
    /// Returns the new row, always `len - 1` immediately after.
    pub fn push<S: component::Set>(
        &mut self,
        entity: Entity,
        values: S,
        registry: &world::TypeRegistry,
    ) -> Row {
        let row = Row::new(self.entities.len());
        self.entities.push(entity);

        let mut writer = RowWriter {
            columns: &mut self.columns,
            row: row.index(),
        };
        values.apply(registry, &mut writer);

        // Verify we have kept the entity/column lengths consistent.
        #[cfg(debug_assertions)]
        self.verify_invariants();

        row
    }

    /// Append one entity's components from a migration extract plus any new
    /// values (ordered fast path).
    ///
    /// `moved` holds type-erased values already in signature order, as
    /// produced by [`extract_and_swap_row`](Table::extract_and_swap_row);
    /// they are merge-walked against the columns with no per-column search.
    /// `additions` then fills (or overwrites) the remaining columns through
    /// the keyed writer. Together they must cover every column.
    pub fn push_ordered<S: component::Set>(
        &mut self,
        entity: Entity,
        moved: Vec<(world::TypeId, Box<dyn Any>)>,
        additions: S,
        registry: &world::TypeRegistry,
    ) -> Row {
        let row = Row::new(self.entities.len());
        self.entities.push(entity);

        // Positional walk: both the extract and the columns are in signature
        // order, so a single cursor pass lines them up.
        let mut cursor = 0;
        for (id, value) in moved {
            while cursor < self.columns.len() && self.columns[cursor].info().id() < id {
                cursor += 1;
            }
            debug_assert!(
                cursor < self.columns.len() && self.columns[cursor].info().id() == id,
                "extracted value has no column in target table"
            );
            self.columns[cursor].push_boxed(value);
            cursor += 1;
        }

        let mut writer = RowWriter {
            columns: &mut self.columns,
            row: row.index(),
        };
        additions.apply(registry, &mut writer);

        // Verify we have kept the entity/column lengths consistent.
        #[cfg(debug_assertions)]
        self.verify_invariants();

        row
    }

    /// Overwrite a single component of an existing row in place.
    ///
    /// # Panics
    /// - if the component is not in this table or the row is out of bounds
    pub fn write_value<C: Component>(&mut self, id: world::TypeId, row: Row, value: C) {
        let column = self.column_mut(id).expect("component not in table");
        column.write::<C>(row, value);
    }

    /// Overwrite several components of an existing row in place from a value
    /// set. Every type in the set must already be a column of this table.
    pub fn write_set<S: component::Set>(
        &mut self,
        row: Row,
        values: S,
        registry: &world::TypeRegistry,
    ) {
        debug_assert!(row.index() < self.entities.len(), "row index out of bounds");
        let mut writer = InPlaceWriter {
            columns: &mut self.columns,
            row: row.index(),
        };
        values.apply(registry, &mut writer);
    }

    /// Remove an entity and its components at the given row using swap-remove.
    ///
    /// If the removed row was not the last, the last row is moved into its
    /// place and the moved entity is returned so the caller can fix that
    /// entity's location. Removing the last (or sole) row moves nothing and
    /// returns `None`.
    ///
    /// # Panics
    /// In debug builds, panics if the row is out of bounds.
    pub fn swap_remove_row(&mut self, row: Row) -> Option<Entity> {
        let index = row.index();
        debug_assert!(index < self.entities.len(), "row index out of bounds");

        // Capture the last index for fixing the moved entity later
        let last_index = self.entities.len() - 1;

        self.entities.swap_remove(index);
        for column in self.columns.iter_mut() {
            column.swap_remove(row);
        }

        if last_index == index {
            // Removed the last entity, nothing was moved
            return None;
        }
        let moved_entity = self.entities[index];

        // Verify we have kept the entity/column lengths consistent.
        #[cfg(debug_assertions)]
        self.verify_invariants();

        Some(moved_entity)
    }

    /// Extract the values named by `keep` out of a row (moved, not cloned),
    /// drop everything else, and swap-remove the row.
    ///
    /// The extracted values come back in signature order, ready for
    /// [`push_ordered`](Table::push_ordered) on the migration target. If an
    /// entity was moved into the vacated row it is returned for location
    /// fixup.
    ///
    /// # Panics
    /// In debug builds, panics if the row is out of bounds.
    pub fn extract_and_swap_row(
        &mut self,
        row: Row,
        keep: &component::Spec,
    ) -> (Vec<(world::TypeId, Box<dyn Any>)>, Option<Entity>) {
        let index = row.index();
        debug_assert!(index < self.entities.len(), "row index out of bounds");

        let last_index = self.entities.len() - 1;
        self.entities.swap_remove(index);

        let mut extracted: Vec<(world::TypeId, Box<dyn Any>)> = Vec::with_capacity(keep.len());
        for column in self.columns.iter_mut() {
            let id = column.info().id();
            if keep.contains(id) {
                // Kept component - moved to the target table, not dropped.
                extracted.push((id, column.swap_take(row)));
            } else {
                // Removed component - dropped here.
                column.swap_remove(row);
            }
        }

        if last_index == index {
            // Removed the last entity, nothing was moved
            return (extracted, None);
        }
        let moved_entity = self.entities[index];

        // Verify we have kept the entity/column lengths consistent.
        #[cfg(debug_assertions)]
        self.verify_invariants();

        (extracted, Some(moved_entity))
    }

    /// Verify that all columns have the same length as the entity array.
    ///
    /// # Panics
    /// Panics if any column length doesn't match the entity count.
    #[cfg(debug_assertions)]
    pub fn verify_invariants(&self) {
        let expected_len = self.entities.len();
        for (i, col) in self.columns.iter().enumerate() {
            assert_eq!(
                col.len(),
                expected_len,
                "Column {} length {} doesn't match entity count {}",
                i,
                col.len(),
                expected_len
            );
        }
    }
}
