//! Component types and signatures.
//!
//! A component is a plain Rust type attached to entities to give them data.
//! This module provides:
//!
//! - [`Component`]: the trait all component types must implement
//! - [`Spec`]: a normalized signature identifying a set of component types
//! - [`Set`]: a bundle of component values (a single value or a tuple)
//! - [`IntoSpec`]: type-level resolution of a bundle into its signature

mod set;
mod spec;

pub use set::{Set, Target};
pub use spec::{IntoSpec, Spec};

use crate::ecs::world;

/// A trait representing a component in the ECS (Entity Component System).
///
/// At present this only sets the required trait bounds for a type to be used
/// as a component. Derive it with `#[derive(Component)]`.
pub trait Component: 'static + Sized + Send + Sync {}

/// Export convenience type for component type information.
pub type Info = world::TypeInfo;
