use crate::{
    all_tuples,
    ecs::{
        component::{Component, IntoSpec},
        world,
    },
};

/// Trait describing a target that can have component values applied to it
/// from a [`Set`].
pub trait Target {
    fn apply<C: Component>(&mut self, id: world::TypeId, value: C);
}

/// A trait describing a bundle of component values for one entity.
///
/// A set can be a single component value or a tuple of them (nested tuples
/// flatten). Applying a set walks the values in declaration order and hands
/// each one, with its registered id, to a [`Target`] — the table row writer
/// on spawn, the in-place writer on `set_components`. Declaration order is
/// what gives "last occurrence wins" semantics when a lenient world receives
/// a duplicate type.
pub trait Set: IntoSpec + Sized + 'static {
    /// Apply the component values in this set to the given target. This takes
    /// ownership of self.
    fn apply<T: Target>(self, registry: &world::TypeRegistry, target: &mut T);
}

/// Implement Set for single component types.
impl<C: Component> Set for C {
    fn apply<T: Target>(self, registry: &world::TypeRegistry, target: &mut T) {
        target.apply::<C>(registry.register_component::<C>(), self);
    }
}

impl Set for () {
    fn apply<T: Target>(self, _registry: &world::TypeRegistry, _target: &mut T) {
        // No components to apply.
    }
}

/// Implement Set for tuples of component types.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {

            /// Apply each component in the tuple to the target.
            fn apply<CT: Target>(self, registry: &world::TypeRegistry, target: &mut CT) {
                 #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                $(<$name as Set>::apply($name, registry, target);)*
            }
        }
    }
}

// Implement the tuple Set for all tuples up to 26 elements.
all_tuples!(tuple_set);

#[cfg(test)]
mod tests {
    use std::any::Any;

    use strata_macros::Component;

    use crate::ecs::component::Spec;

    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Comp1 {
        value: u32,
    }

    #[derive(Component, Debug, PartialEq)]
    struct Comp2 {
        value: u32,
    }

    struct MockTarget {
        ids: Vec<world::TypeId>,
        vals: Vec<Box<dyn Any>>,
    }

    impl Target for MockTarget {
        fn apply<C: Component>(&mut self, id: world::TypeId, value: C) {
            self.ids.push(id);
            self.vals.push(Box::new(value));
        }
    }

    fn apply_set<S: Set>(set: S, registry: &world::TypeRegistry) -> MockTarget {
        let mut target = MockTarget {
            ids: Vec::new(),
            vals: Vec::new(),
        };
        set.apply(registry, &mut target);
        target
    }

    #[test]
    fn single_component_set() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let target = apply_set(Comp1 { value: 42 }, &registry);

        // Then
        assert_eq!(target.ids, vec![world::TypeId::new(0)]);
        assert_eq!(
            target.vals[0].downcast_ref::<Comp1>(),
            Some(&Comp1 { value: 42 })
        );
        assert_eq!(
            <Comp1>::into_spec(&registry),
            Spec::new(vec![world::TypeId::new(0)])
        );
    }

    #[test]
    fn tuple_set_applies_in_declaration_order() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let target = apply_set((Comp2 { value: 1 }, Comp1 { value: 2 }), &registry);

        // Then - Comp2 registered first, values arrive in declaration order
        assert_eq!(target.ids, vec![world::TypeId::new(0), world::TypeId::new(1)]);
        assert_eq!(
            target.vals[0].downcast_ref::<Comp2>(),
            Some(&Comp2 { value: 1 })
        );
        assert_eq!(
            target.vals[1].downcast_ref::<Comp1>(),
            Some(&Comp1 { value: 2 })
        );
    }

    #[test]
    fn nested_tuple_set_flattens() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let target = apply_set((Comp1 { value: 1 }, (Comp2 { value: 2 },)), &registry);

        // Then
        assert_eq!(target.ids.len(), 2);
        assert_eq!(
            <(Comp1, (Comp2,))>::into_spec(&registry),
            <(Comp1, Comp2)>::into_spec(&registry)
        );
    }

    #[test]
    fn empty_set_is_empty() {
        // Given
        let registry = world::TypeRegistry::new();

        // When
        let target = apply_set((), &registry);

        // Then
        assert!(target.ids.is_empty());
        assert!(<()>::into_spec(&registry).is_empty());
    }
}
