//! Type-erased storage for singleton resource values.
//!
//! Resources are global values owned by the world but not attached to any
//! entity: game clocks, settings, shared services. Each resource type has at
//! most one instance. They never interact with archetype storage; this is a
//! typed global variable with a map behind it.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

/// A trait representing a singleton resource stored in the world.
///
/// Derive it with `#[derive(Resource)]`.
pub trait Resource: 'static + Send + Sync {}

/// Type-erased storage for singleton resources, keyed by Rust `TypeId`.
///
/// Keying directly on `TypeId` (rather than a registry id) means access never
/// needs a registry lookup; resources trade a little map overhead for zero
/// coupling to the component machinery.
#[derive(Default)]
pub struct Resources {
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    /// Creates a new, empty resource store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource, replacing (and dropping) any previous value of the
    /// same type.
    #[inline]
    pub fn insert<R: Resource>(&mut self, value: R) {
        self.data.insert(TypeId::of::<R>(), Box::new(value));
    }

    /// Returns a reference to a resource, if present.
    #[inline]
    pub fn get<R: Resource>(&self) -> Option<&R> {
        self.data
            .get(&TypeId::of::<R>())
            .and_then(|stored| stored.downcast_ref::<R>())
    }

    /// Returns a mutable reference to a resource, if present.
    #[inline]
    pub fn get_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.data
            .get_mut(&TypeId::of::<R>())
            .and_then(|stored| stored.downcast_mut::<R>())
    }

    /// Removes a resource, returning it if it existed.
    #[inline]
    pub fn remove<R: Resource>(&mut self) -> Option<R> {
        self.data
            .remove(&TypeId::of::<R>())
            .and_then(|stored| stored.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    /// Checks whether a resource of the given type is present.
    #[inline]
    pub fn contains<R: Resource>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<R>())
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Resource;

    use super::*;

    #[derive(Resource, Debug, PartialEq)]
    struct Score(u32);

    #[derive(Resource, Debug, PartialEq)]
    struct Clock {
        elapsed: f32,
    }

    #[test]
    fn insert_get_remove() {
        // Given
        let mut resources = Resources::new();

        // When
        resources.insert(Score(100));
        resources.insert(Clock { elapsed: 0.5 });

        // Then
        assert!(resources.contains::<Score>());
        assert_eq!(resources.get::<Score>(), Some(&Score(100)));
        assert_eq!(resources.get::<Clock>(), Some(&Clock { elapsed: 0.5 }));

        // When - mutate
        resources.get_mut::<Score>().unwrap().0 += 50;

        // Then
        assert_eq!(resources.get::<Score>(), Some(&Score(150)));

        // When - remove
        let removed = resources.remove::<Score>();

        // Then
        assert_eq!(removed, Some(Score(150)));
        assert!(!resources.contains::<Score>());
        assert_eq!(resources.remove::<Score>(), None);
    }

    #[test]
    fn insert_replaces_previous_value() {
        // Given
        let mut resources = Resources::new();
        resources.insert(Score(1));

        // When
        resources.insert(Score(2));

        // Then
        assert_eq!(resources.get::<Score>(), Some(&Score(2)));
    }
}
