use std::slice;

use crate::{
    all_tuples,
    ecs::{
        component::Component,
        storage::{Row, table::Table},
        world,
    },
};

/// One component access made by a query: which column, and whether the query
/// needs to write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub(crate) id: world::TypeId,
    pub(crate) mutable: bool,
}

/// A single query parameter: `&C` or `&mut C`.
///
/// # Safety
///
/// Implementations hand out references derived from raw column pointers. The
/// caller (the query machinery) must guarantee exclusive access to the world
/// for the duration of the borrow and that the parameter list was validated
/// to contain no aliasing accesses.
pub unsafe trait Param: 'static {
    /// The per-entity item this parameter produces.
    type Item<'w>;

    /// The per-archetype column slice this parameter produces.
    type Slice<'w>;

    /// Resolve (registering if needed) the component access for this parameter.
    fn access(registry: &world::TypeRegistry) -> Access;

    /// Fetch the whole column of a matched table as a slice.
    ///
    /// # Safety
    /// - The caller must hold exclusive access to the table's storage.
    /// - `id` must be the access id resolved by [`Param::access`].
    unsafe fn slice<'w>(table: &'w Table, id: world::TypeId) -> Option<Self::Slice<'w>>;

    /// Fetch one row of a matched table.
    ///
    /// # Safety
    /// - The caller must hold exclusive access to the table's storage.
    /// - `id` must be the access id resolved by [`Param::access`].
    /// - `row` must be in bounds for the table.
    unsafe fn item<'w>(table: &'w Table, id: world::TypeId, row: Row) -> Option<Self::Item<'w>>;
}

// SAFETY: shared access only; the aliasing check still rejects a shared
// borrow next to a mutable borrow of the same column.
unsafe impl<C: Component> Param for &'static C {
    type Item<'w> = &'w C;
    type Slice<'w> = &'w [C];

    fn access(registry: &world::TypeRegistry) -> Access {
        Access {
            id: registry.register_component::<C>(),
            mutable: false,
        }
    }

    unsafe fn slice<'w>(table: &'w Table, id: world::TypeId) -> Option<Self::Slice<'w>> {
        let column = table.column(id)?;
        let ptr = column.data_ptr::<C>()?;
        // SAFETY: the pointer spans `len` initialized values and the caller
        // guarantees no concurrent structural mutation.
        Some(unsafe { slice::from_raw_parts(ptr, column.len()) })
    }

    unsafe fn item<'w>(table: &'w Table, id: world::TypeId, row: Row) -> Option<Self::Item<'w>> {
        let column = table.column(id)?;
        let ptr = column.data_ptr::<C>()?;
        debug_assert!(row.index() < column.len());
        // SAFETY: row is in bounds per the caller contract.
        Some(unsafe { &*ptr.add(row.index()) })
    }
}

// SAFETY: mutable access; the aliasing check rejects any second access to
// the same column, so this borrow is unique within the query.
unsafe impl<C: Component> Param for &'static mut C {
    type Item<'w> = &'w mut C;
    type Slice<'w> = &'w mut [C];

    fn access(registry: &world::TypeRegistry) -> Access {
        Access {
            id: registry.register_component::<C>(),
            mutable: true,
        }
    }

    unsafe fn slice<'w>(table: &'w Table, id: world::TypeId) -> Option<Self::Slice<'w>> {
        let column = table.column(id)?;
        let ptr = column.data_ptr::<C>()?;
        // SAFETY: the caller holds exclusive world access and the aliasing
        // check guarantees this is the only borrow of the column.
        Some(unsafe { slice::from_raw_parts_mut(ptr, column.len()) })
    }

    unsafe fn item<'w>(table: &'w Table, id: world::TypeId, row: Row) -> Option<Self::Item<'w>> {
        let column = table.column(id)?;
        let ptr = column.data_ptr::<C>()?;
        debug_assert!(row.index() < column.len());
        // SAFETY: row is in bounds and this is the only borrow of the value.
        Some(unsafe { &mut *ptr.add(row.index()) })
    }
}

/// A complete query data specification: a parameter or a tuple of parameters.
///
/// The flat access list drives both matching (the required signature) and
/// fetching: `slices`/`fetch` walk the list with a cursor so nested tuples
/// line up with their resolved ids.
///
/// # Safety
///
/// Same contract as [`Param`]: the caller guarantees exclusive world access
/// and a validated (alias-free) access list.
pub unsafe trait QueryData: 'static {
    /// The per-entity item tuple this query produces.
    type Item<'w>;

    /// The per-archetype slice tuple this query produces.
    type Slices<'w>;

    /// Append this query's component accesses in parameter order.
    fn accesses(registry: &world::TypeRegistry, out: &mut Vec<Access>);

    /// Fetch all columns of a matched table, in parameter order.
    ///
    /// # Safety
    /// See [`Param::slice`]; `ids` must be the resolved access ids and
    /// `cursor` the position of this datum's first id.
    unsafe fn slices<'w>(
        table: &'w Table,
        ids: &[world::TypeId],
        cursor: &mut usize,
    ) -> Option<Self::Slices<'w>>;

    /// Fetch one row of a matched table, in parameter order.
    ///
    /// # Safety
    /// See [`Param::item`]; `ids` must be the resolved access ids and
    /// `cursor` the position of this datum's first id.
    unsafe fn fetch<'w>(
        table: &'w Table,
        ids: &[world::TypeId],
        cursor: &mut usize,
        row: Row,
    ) -> Option<Self::Item<'w>>;
}

// SAFETY: delegates directly to the parameter implementation.
unsafe impl<P: Param> QueryData for P {
    type Item<'w> = P::Item<'w>;
    type Slices<'w> = P::Slice<'w>;

    fn accesses(registry: &world::TypeRegistry, out: &mut Vec<Access>) {
        out.push(P::access(registry));
    }

    unsafe fn slices<'w>(
        table: &'w Table,
        ids: &[world::TypeId],
        cursor: &mut usize,
    ) -> Option<Self::Slices<'w>> {
        let id = ids[*cursor];
        *cursor += 1;
        unsafe { P::slice(table, id) }
    }

    unsafe fn fetch<'w>(
        table: &'w Table,
        ids: &[world::TypeId],
        cursor: &mut usize,
        row: Row,
    ) -> Option<Self::Item<'w>> {
        let id = ids[*cursor];
        *cursor += 1;
        unsafe { P::item(table, id, row) }
    }
}

// SAFETY: the unit query accesses nothing.
unsafe impl QueryData for () {
    type Item<'w> = ();
    type Slices<'w> = ();

    fn accesses(_registry: &world::TypeRegistry, _out: &mut Vec<Access>) {}

    unsafe fn slices<'w>(
        _table: &'w Table,
        _ids: &[world::TypeId],
        _cursor: &mut usize,
    ) -> Option<Self::Slices<'w>> {
        Some(())
    }

    unsafe fn fetch<'w>(
        _table: &'w Table,
        _ids: &[world::TypeId],
        _cursor: &mut usize,
        _row: Row,
    ) -> Option<Self::Item<'w>> {
        Some(())
    }
}

/// Implement QueryData for tuples of other QueryData.
macro_rules! tuple_query_data {
    ($($name: ident),*) => {
        // SAFETY: each element fetches a distinct, validated access.
        unsafe impl<$($name: QueryData),*> QueryData for ($($name,)*) {
            type Item<'w> = ($($name::Item<'w>,)*);
            type Slices<'w> = ($($name::Slices<'w>,)*);

            fn accesses(registry: &world::TypeRegistry, out: &mut Vec<Access>) {
                $(<$name>::accesses(registry, out);)*
            }

            unsafe fn slices<'w>(
                table: &'w Table,
                ids: &[world::TypeId],
                cursor: &mut usize,
            ) -> Option<Self::Slices<'w>> {
                Some(($(unsafe { <$name>::slices(table, ids, cursor) }?,)*))
            }

            unsafe fn fetch<'w>(
                table: &'w Table,
                ids: &[world::TypeId],
                cursor: &mut usize,
                row: Row,
            ) -> Option<Self::Item<'w>> {
                Some(($(unsafe { <$name>::fetch(table, ids, cursor, row) }?,)*))
            }
        }
    }
}

// Implement for all tuples up to 26 elements.
all_tuples!(tuple_query_data);

/// Reject queries that borrow the same component column more than once.
///
/// # Panics
/// - if any two accesses target the same component, regardless of mutability
pub(crate) fn validate_accesses(accesses: &[Access]) {
    for (i, access) in accesses.iter().enumerate() {
        for other in &accesses[i + 1..] {
            assert!(
                access.id != other.id,
                "query aliasing violation: same component requested multiple times"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use super::*;

    #[derive(Component)]
    struct Comp1;
    #[derive(Component)]
    struct Comp2;

    #[test]
    fn accesses_resolve_in_parameter_order() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let mut accesses = Vec::new();
        <(&Comp2, &mut Comp1)>::accesses(&registry, &mut accesses);

        // Then - Comp2 registered first, mutability tracked per parameter
        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].id, world::TypeId::new(0));
        assert!(!accesses[0].mutable);
        assert_eq!(accesses[1].id, world::TypeId::new(1));
        assert!(accesses[1].mutable);
    }

    #[test]
    fn validation_accepts_disjoint_accesses() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut accesses = Vec::new();
        <(&Comp1, &mut Comp2)>::accesses(&registry, &mut accesses);

        // Then - no panic
        validate_accesses(&accesses);
    }

    #[test]
    #[should_panic(expected = "query aliasing violation")]
    fn validation_rejects_duplicate_component() {
        // Given
        let registry = world::TypeRegistry::new();
        let mut accesses = Vec::new();
        <(&Comp1, &mut Comp1)>::accesses(&registry, &mut accesses);

        // When
        validate_accesses(&accesses);
    }
}
