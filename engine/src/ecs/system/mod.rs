//! System registration and the tick entry point.
//!
//! The core is a data store, not a scheduler: systems here are plain named
//! callbacks run in registration order, with no dependency resolution or
//! run-condition machinery. `world.tick()` exists so a frame driver has a
//! single entry point that runs every enabled system and flushes deferred
//! mutations between them; scheduling policy beyond that belongs to the
//! caller.

pub(crate) mod command;

pub use command::CommandBuffer;

use crate::ecs::world::World;

/// A registered system: a named callback invoked once per tick while
/// enabled.
///
/// The callback receives the world and a command buffer. Structural
/// mutations issued from inside query iteration go on the buffer; the tick
/// driver flushes it after the system returns.
pub struct System {
    /// The system's name, used to toggle it.
    pub(crate) name: String,

    /// Disabled systems are skipped by the tick driver.
    pub(crate) enabled: bool,

    /// The system callback.
    pub(crate) run: Box<dyn FnMut(&mut World, &CommandBuffer)>,
}

impl System {
    pub(crate) fn new(
        name: impl Into<String>,
        run: impl FnMut(&mut World, &CommandBuffer) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            run: Box::new(run),
        }
    }

    /// The system's registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the tick driver currently runs this system.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
