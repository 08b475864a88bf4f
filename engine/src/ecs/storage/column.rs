use std::any::Any;

use crate::ecs::{
    component::{Component, Info},
    storage::Row,
};

/// Type-erased storage backing a single column.
///
/// Each implementation wraps a plain `Vec<C>` for one concrete component
/// type. The erased surface carries the operations the storage layer needs
/// for structural changes: append, in-place replace, swap-remove with drop,
/// and swap-take (remove without drop, handing the value back for a
/// migration). Typed access goes through `as_any` downcasts.
pub(crate) trait AnyStore: Send + Sync {
    /// The number of values stored.
    fn len(&self) -> usize;

    /// Reserve space for additional values.
    fn reserve(&mut self, additional: usize);

    /// Append a boxed value.
    ///
    /// # Panics
    /// - if the value's type does not match the column's component type
    fn push(&mut self, value: Box<dyn Any>);

    /// Replace the value at `row`, dropping the old one.
    ///
    /// # Panics
    /// - if the value's type does not match, or the row is out of bounds
    fn replace(&mut self, row: usize, value: Box<dyn Any>);

    /// Swap-remove the value at `row`, dropping it.
    fn swap_remove(&mut self, row: usize);

    /// Swap-remove the value at `row` and return it (no drop).
    fn swap_take(&mut self, row: usize) -> Box<dyn Any>;

    /// Access the store as `Any` for typed downcasts.
    fn as_any(&self) -> &dyn Any;

    /// Mutable access to the store as `Any` for typed downcasts.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The concrete store for component type `C`: a dense, insertion-ordered Vec.
struct TypedStore<C: Component> {
    values: Vec<C>,
}

impl<C: Component> AnyStore for TypedStore<C> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    fn push(&mut self, value: Box<dyn Any>) {
        let value = value.downcast::<C>().expect("column value type mismatch");
        self.values.push(*value);
    }

    fn replace(&mut self, row: usize, value: Box<dyn Any>) {
        let value = value.downcast::<C>().expect("column value type mismatch");
        self.values[row] = *value;
    }

    fn swap_remove(&mut self, row: usize) {
        self.values.swap_remove(row);
    }

    fn swap_take(&mut self, row: usize) -> Box<dyn Any> {
        Box::new(self.values.swap_remove(row))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Construct an empty erased store for component type `C`.
///
/// Captured as a function pointer in the type registry so tables for
/// runtime-computed signatures can build their columns without the concrete
/// type in scope.
pub(crate) fn new_store<C: Component>() -> Box<dyn AnyStore> {
    Box::new(TypedStore::<C> { values: Vec::new() })
}

/// A single component column: one dense array of values for one component
/// type, parallel to its table's entity array.
pub struct Column {
    /// Metadata for the component type stored here.
    info: Info,

    /// The type-erased value storage.
    store: Box<dyn AnyStore>,
}

impl Column {
    /// Create an empty column for the given component type.
    #[inline]
    pub fn new(info: Info) -> Self {
        Self {
            info,
            store: (info.new_store)(),
        }
    }

    /// Get the component type metadata for this column.
    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Get the number of values in this column.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the column is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Reserve space for additional values.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.store.reserve(additional);
    }

    /// Append a typed value. This is the fast path used by row writers; no
    /// boxing happens.
    ///
    /// # Panics
    /// - if `C` does not match the column's component type
    pub fn push_value<C: Component>(&mut self, value: C) {
        self.typed_mut::<C>().values.push(value);
    }

    /// Append a boxed value, as produced by a migration extract.
    ///
    /// # Panics
    /// - if the boxed type does not match the column's component type
    #[inline]
    pub fn push_boxed(&mut self, value: Box<dyn Any>) {
        self.store.push(value);
    }

    /// Overwrite the value at `row` in place, dropping the previous value.
    ///
    /// # Panics
    /// - if `C` does not match the column's component type
    /// - if the row is out of bounds
    pub fn write<C: Component>(&mut self, row: Row, value: C) {
        self.typed_mut::<C>().values[row.index()] = value;
    }

    /// Get a reference to the value at `row`.
    ///
    /// Returns `None` if `C` does not match this column or the row is out of
    /// bounds.
    #[inline]
    pub fn get<C: Component>(&self, row: Row) -> Option<&C> {
        self.typed::<C>()?.values.get(row.index())
    }

    /// Get a mutable reference to the value at `row`.
    ///
    /// Returns `None` if `C` does not match this column or the row is out of
    /// bounds.
    #[inline]
    pub fn get_mut<C: Component>(&mut self, row: Row) -> Option<&mut C> {
        self.store
            .as_any_mut()
            .downcast_mut::<TypedStore<C>>()?
            .values
            .get_mut(row.index())
    }

    /// Swap-remove the value at `row`, dropping it.
    #[inline]
    pub fn swap_remove(&mut self, row: Row) {
        self.store.swap_remove(row.index());
    }

    /// Swap-remove the value at `row` and return it without dropping.
    #[inline]
    pub fn swap_take(&mut self, row: Row) -> Box<dyn Any> {
        self.store.swap_take(row.index())
    }

    /// Get a raw pointer to the start of the value array, for query fetches.
    ///
    /// Returns `None` if `C` does not match this column's component type.
    /// The pointer is only valid until the column is structurally mutated.
    pub(crate) fn data_ptr<C: Component>(&self) -> Option<*mut C> {
        let store = self.store.as_any().downcast_ref::<TypedStore<C>>()?;
        Some(store.values.as_ptr() as *mut C)
    }

    fn typed_mut<C: Component>(&mut self) -> &mut TypedStore<C> {
        self.store
            .as_any_mut()
            .downcast_mut::<TypedStore<C>>()
            .expect("column value type mismatch")
    }

    fn typed<C: Component>(&self) -> Option<&TypedStore<C>> {
        self.store.as_any().downcast_ref::<TypedStore<C>>()
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use crate::ecs::world;

    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Health {
        value: i32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Tag;

    fn column_of<C: Component>(registry: &world::TypeRegistry) -> Column {
        registry.register_component::<C>();
        Column::new(registry.info_of::<C>().unwrap())
    }

    #[test]
    fn push_and_get() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut column = column_of::<Health>(&registry);

        // When
        column.push_value(Health { value: 100 });
        column.push_boxed(Box::new(Health { value: 75 }));

        // Then
        assert_eq!(column.len(), 2);
        assert_eq!(column.get::<Health>(Row::new(0)), Some(&Health { value: 100 }));
        assert_eq!(column.get::<Health>(Row::new(1)), Some(&Health { value: 75 }));
        assert_eq!(column.get::<Health>(Row::new(2)), None);
        // Wrong type yields None rather than garbage
        assert_eq!(column.get::<Tag>(Row::new(0)), None);
    }

    #[test]
    fn write_overwrites_in_place() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut column = column_of::<Health>(&registry);
        column.push_value(Health { value: 1 });

        // When
        column.write(Row::new(0), Health { value: 2 });

        // Then
        assert_eq!(column.len(), 1);
        assert_eq!(column.get::<Health>(Row::new(0)), Some(&Health { value: 2 }));
    }

    #[test]
    fn swap_take_moves_value_out() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut column = column_of::<Health>(&registry);
        column.push_value(Health { value: 1 });
        column.push_value(Health { value: 2 });
        column.push_value(Health { value: 3 });

        // When - take the first value; the last should fill its slot
        let taken = column.swap_take(Row::new(0));

        // Then
        assert_eq!(taken.downcast_ref::<Health>(), Some(&Health { value: 1 }));
        assert_eq!(column.len(), 2);
        assert_eq!(column.get::<Health>(Row::new(0)), Some(&Health { value: 3 }));
        assert_eq!(column.get::<Health>(Row::new(1)), Some(&Health { value: 2 }));
    }

    #[test]
    #[should_panic(expected = "column value type mismatch")]
    fn push_wrong_type_panics() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut column = column_of::<Health>(&registry);

        // When
        column.push_boxed(Box::new(Tag));
    }
}
