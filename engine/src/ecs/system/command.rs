//! Deferred command buffer for structural mutations.
//!
//! Archetype columns must not be resized while a query is walking them by
//! index; a swap-remove mid-iteration would corrupt the row correspondence.
//! The command buffer is the sanctioned escape hatch: queue the mutation
//! while iterating, flush it afterwards.
//!
//! # Contract
//!
//! - Commands run exactly once, in FIFO enqueue order, when the owner calls
//!   [`CommandBuffer::flush`].
//! - A flush drains a snapshot of the queue first, then executes it. A
//!   command that enqueues further commands does not extend the current
//!   flush; the new work waits for the next one. This keeps a self-feeding
//!   command from flushing recursively without bound.
//! - Flushing an empty buffer is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! let commands = CommandBuffer::new();
//! world.query::<&Lifetime>().each(|entity, lifetime| {
//!     if lifetime.remaining == 0 {
//!         commands.destroy(entity);
//!     }
//! });
//! commands.flush(&mut world);
//! ```

use crossbeam::queue::SegQueue;
use log::warn;

use crate::ecs::{component, entity::Entity, world::World};

/// A deferred structural mutation: an owned callback run against the world
/// at flush time.
type Command = Box<dyn FnOnce(&mut World) + Send>;

/// A buffer of deferred commands.
///
/// Pushing goes through `&self` (the queue is lock-free), so a buffer can be
/// filled from inside query closures while the world itself is mutably
/// borrowed by the iteration.
#[derive(Default)]
pub struct CommandBuffer {
    commands: SegQueue<Command>,
}

impl CommandBuffer {
    /// Create a new empty command buffer.
    pub fn new() -> Self {
        Self {
            commands: SegQueue::new(),
        }
    }

    /// Queue an arbitrary callback to run at the next flush.
    pub fn defer(&self, command: impl FnOnce(&mut World) + Send + 'static) {
        self.commands.push(Box::new(command));
    }

    /// Queue spawning an entity with the given components.
    ///
    /// If the world rejects the set at flush time (strict duplicate
    /// validation), the failure is logged and the flush continues.
    pub fn spawn<S: component::Set + Send>(&self, values: S) {
        self.defer(move |world| {
            if let Err(error) = world.spawn(values) {
                warn!("deferred spawn dropped: {error}");
            }
        });
    }

    /// Queue destroying an entity.
    pub fn destroy(&self, entity: Entity) {
        self.defer(move |world| world.destroy(entity));
    }

    /// Queue adding (or overwriting) a component on an entity.
    pub fn add_component<C: component::Component>(&self, entity: Entity, value: C) {
        self.defer(move |world| {
            world.add_component(entity, value);
        });
    }

    /// Queue removing a component from an entity.
    pub fn remove_component<C: component::Component>(&self, entity: Entity) {
        self.defer(move |world| {
            world.remove_component::<C>(entity);
        });
    }

    /// Queue setting several components on an entity in one migration.
    pub fn set_components<S: component::Set + Send>(&self, entity: Entity, values: S) {
        self.defer(move |world| {
            world.set_components(entity, values);
        });
    }

    /// The number of commands currently queued.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check whether no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drain all queued commands in FIFO order.
    fn drain(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(self.commands.len());
        while let Some(command) = self.commands.pop() {
            commands.push(command);
        }
        commands
    }

    /// Run all queued commands against the world, in enqueue order.
    ///
    /// Only the commands present when the flush starts are executed;
    /// commands enqueued by a running command wait for the next flush.
    pub fn flush(&self, world: &mut World) {
        for command in self.drain() {
            command(world);
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_macros::Component;

    use crate::ecs::world::World;

    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn commands_run_once_in_fifo_order() {
        // Given
        let mut world = World::new();
        let entity = world.spawn(Marker(0)).unwrap();
        let buffer = CommandBuffer::new();

        buffer.add_component(entity, Marker(1));
        buffer.add_component(entity, Marker(2));
        assert_eq!(buffer.len(), 2);

        // When
        buffer.flush(&mut world);

        // Then - the later command won
        assert_eq!(world.get_component::<Marker>(entity), Some(&Marker(2)));
        assert!(buffer.is_empty());

        // And a second flush re-runs nothing
        world.add_component(entity, Marker(7));
        buffer.flush(&mut world);
        assert_eq!(world.get_component::<Marker>(entity), Some(&Marker(7)));
    }

    #[test]
    fn commands_enqueued_during_flush_wait_for_next_flush() {
        // Given
        let mut world = World::new();
        let entity = world.spawn(Marker(0)).unwrap();
        let buffer = CommandBuffer::new();

        buffer.defer(move |world| {
            world.add_component(entity, Marker(1));
            // Self-feeding command: must NOT run in the same flush.
            world.defer(move |world| {
                world.add_component(entity, Marker(2));
            });
        });

        // When - first flush runs only the outer command
        buffer.flush(&mut world);

        // Then
        assert_eq!(world.get_component::<Marker>(entity), Some(&Marker(1)));

        // When - the world's own queue holds the nested command
        world.flush_deferred();

        // Then
        assert_eq!(world.get_component::<Marker>(entity), Some(&Marker(2)));
    }

    #[test]
    fn deferred_spawn_and_destroy() {
        // Given
        let mut world = World::new();
        let victim = world.spawn(Marker(9)).unwrap();
        let buffer = CommandBuffer::new();

        buffer.spawn(Marker(1));
        buffer.destroy(victim);

        // Nothing happens until the flush
        assert!(world.entity_exists(victim));
        assert_eq!(world.entity_count(), 1);

        // When
        buffer.flush(&mut world);

        // Then
        assert!(!world.entity_exists(victim));
        assert_eq!(world.entity_count(), 1);
    }
}
