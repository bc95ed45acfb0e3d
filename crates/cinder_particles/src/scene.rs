//! What a particle system may ask of the world it lives in.

use cinder_core::Matrix3D;

use crate::ids::{DrawableId, ObjectId};

/// Read-only view of the scene, supplied to every update.
pub trait SceneQuery {
    /// World transform of a game object, or `None` once it is gone.
    fn object_transform(&self, object: ObjectId) -> Option<Matrix3D>;

    /// World transform of a drawable, or `None` once it is gone.
    fn drawable_transform(&self, drawable: DrawableId) -> Option<Matrix3D>;

    /// Terrain height under `(x, y)`.
    fn ground_height(&self, x: f32, y: f32) -> f32;
}

/// A scene without objects or drawables over flat ground at height zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyScene;

impl SceneQuery for EmptyScene {
    fn object_transform(&self, _object: ObjectId) -> Option<Matrix3D> {
        None
    }

    fn drawable_transform(&self, _drawable: DrawableId) -> Option<Matrix3D> {
        None
    }

    fn ground_height(&self, _x: f32, _y: f32) -> f32 {
        0.0
    }
}
