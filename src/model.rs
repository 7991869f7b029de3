pub mod avatar;
pub mod blend_shapes;
pub mod scene;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use avatar::*;
pub use blend_shapes::BlendShapeTable;
pub use scene::{NodeRegistry, SceneNode};

/// A plain 3-component vector for configuration data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }
}

impl Display for Vector3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Where the avatar's root node should be placed on load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3,
    pub euler_angles: Vector3,
    pub scale: Vector3,
}
