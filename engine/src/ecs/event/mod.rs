//! Hook (observer) dispatch for component lifecycle events.
//!
//! Callers can register callbacks for three well-defined points in a
//! component's life on an entity:
//!
//! - **added** — after the row is fully written (spawn, or a migration that
//!   introduced the component)
//! - **changed** — after an in-place or migrated overwrite of an existing
//!   component
//! - **removed** — before the row leaves storage, while the value is still
//!   readable
//!
//! Hooks receive `(&World, Entity, &C)`. The shared world borrow is the
//! reentrancy guard: a hook can read anything but cannot issue structural
//! mutations mid-operation; that work goes through a command buffer instead.

use std::collections::HashMap;

use crate::ecs::{component::Component, entity::Entity, world};

/// A type-erased hook. The wrapper closure re-fetches the typed value from
/// the world, which is valid at every dispatch point (for `removed`, the
/// hook runs before the value leaves storage).
type HookFn = Box<dyn Fn(&world::World, Entity)>;

/// Registered hooks, keyed by component id per event kind.
#[derive(Default)]
pub(crate) struct Hooks {
    added: HashMap<world::TypeId, Vec<HookFn>>,
    changed: HashMap<world::TypeId, Vec<HookFn>>,
    removed: HashMap<world::TypeId, Vec<HookFn>>,
}

fn erase<C: Component>(hook: impl Fn(&world::World, Entity, &C) + 'static) -> HookFn {
    Box::new(move |world, entity| {
        if let Some(value) = world.get_component::<C>(entity) {
            hook(world, entity, value);
        }
    })
}

impl Hooks {
    pub fn on_added<C: Component>(
        &mut self,
        id: world::TypeId,
        hook: impl Fn(&world::World, Entity, &C) + 'static,
    ) {
        self.added.entry(id).or_default().push(erase(hook));
    }

    pub fn on_changed<C: Component>(
        &mut self,
        id: world::TypeId,
        hook: impl Fn(&world::World, Entity, &C) + 'static,
    ) {
        self.changed.entry(id).or_default().push(erase(hook));
    }

    pub fn on_removed<C: Component>(
        &mut self,
        id: world::TypeId,
        hook: impl Fn(&world::World, Entity, &C) + 'static,
    ) {
        self.removed.entry(id).or_default().push(erase(hook));
    }

    pub fn run_added(&self, world: &world::World, entity: Entity, id: world::TypeId) {
        if let Some(hooks) = self.added.get(&id) {
            for hook in hooks {
                hook(world, entity);
            }
        }
    }

    pub fn run_changed(&self, world: &world::World, entity: Entity, id: world::TypeId) {
        if let Some(hooks) = self.changed.get(&id) {
            for hook in hooks {
                hook(world, entity);
            }
        }
    }

    pub fn run_removed(&self, world: &world::World, entity: Entity, id: world::TypeId) {
        if let Some(hooks) = self.removed.get(&id) {
            for hook in hooks {
                hook(world, entity);
            }
        }
    }
}
