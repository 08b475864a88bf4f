use std::marker::PhantomData;

use crate::ecs::{
    entity::Entity,
    query::param::QueryData,
    storage::{Row, Storage, archetype, table::Table},
    world,
};

/// A lazy, per-entity iterator over a query's matching archetypes.
///
/// Yields `(Entity, item)` pairs one row at a time. This is the ergonomic
/// form: it exists for call sites that want a plain iterator, not for tight
/// loops — the chunked form hands out whole column slices instead. The
/// iterator is restartable in the sense that rebuilding it (from the same
/// builder expression or persistent query) walks the matching set again from
/// the start.
///
/// The iterator holds the world's storage exclusively for its lifetime, so
/// structural mutation during iteration is rejected at compile time; queue
/// such work on a command buffer and flush it afterwards.
pub struct QueryIter<'w, Q: QueryData> {
    /// Exclusive hold on storage for the duration of the iteration.
    storage: &'w mut Storage,

    /// The archetypes this query walks.
    matched: Vec<archetype::Id>,

    /// Resolved access ids, in parameter order.
    ids: Vec<world::TypeId>,

    /// Index into `matched` of the archetype currently being walked.
    archetype_cursor: usize,

    /// Next row to yield within the current archetype.
    row: usize,

    /// Marker tying the query data type to the iterator.
    _marker: PhantomData<Q>,
}

impl<'w, Q: QueryData> QueryIter<'w, Q> {
    pub(crate) fn new(
        storage: &'w mut Storage,
        matched: Vec<archetype::Id>,
        ids: Vec<world::TypeId>,
    ) -> Self {
        Self {
            storage,
            matched,
            ids,
            archetype_cursor: 0,
            row: 0,
            _marker: PhantomData,
        }
    }
}

impl<'w, Q: QueryData> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let archetype_id = *self.matched.get(self.archetype_cursor)?;

            // SAFETY: we hold storage exclusively for 'w; each row is
            // yielded at most once and the query's accesses were validated
            // to be disjoint, so handed-out borrows never alias.
            let table: &'w Table =
                unsafe { &*(self.storage.table(archetype_id) as *const Table) };

            if self.row < table.len() {
                let row = Row::new(self.row);
                self.row += 1;

                let entity = table.entity(row).expect("row in bounds");
                let mut cursor = 0;
                // SAFETY: see above; the archetype matched the query, so
                // every access id has a column here.
                let item = unsafe { Q::fetch(table, &self.ids, &mut cursor, row) }
                    .expect("matched archetype missing query column");
                return Some((entity, item));
            }

            self.archetype_cursor += 1;
            self.row = 0;
        }
    }
}
