//! Common component types used across benchmarks.
//!
//! These components are designed to be representative of real game
//! components in terms of size and access patterns.

use strata_macros::Component;

// =============================================================================
// Transform Components (common in most games)
// =============================================================================

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Rotation as euler angles (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 transformation matrix (64 bytes).
#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

// =============================================================================
// Gameplay Components
// =============================================================================

/// Hit points (8 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

/// Zero-sized marker for filter benchmarks.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Frozen;
