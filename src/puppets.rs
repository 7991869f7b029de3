pub mod avatar;
pub mod head;
pub mod shape_key_animator;

/// Where blend shape weights end up. Usually the morpher of the avatar's mesh.
pub trait MorphSink {
    fn set_weight(&mut self, index: usize, weight: f32);
}

impl<T: MorphSink + ?Sized> MorphSink for &mut T {
    fn set_weight(&mut self, index: usize, weight: f32) {
        (**self).set_weight(index, weight);
    }
}

/// Where the head bone's rotation ends up. Angles are radians relative to the
/// rest pose.
pub trait HeadSink {
    fn set_head_rotation(&mut self, pitch: f32, yaw: f32);
}

impl<T: HeadSink + ?Sized> HeadSink for &mut T {
    fn set_head_rotation(&mut self, pitch: f32, yaw: f32) {
        (**self).set_head_rotation(pitch, yaw);
    }
}

/// An in-memory morpher. Out of range indices are ignored and weights are
/// clamped to 0.0-1.0.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MorphWeights {
    weights: Vec<f32>,
}

impl MorphWeights {
    pub fn new(count: usize) -> Self {
        Self {
            weights: vec![0.0; count],
        }
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.weights.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}

impl MorphSink for MorphWeights {
    fn set_weight(&mut self, index: usize, weight: f32) {
        if let Some(v) = self.weights.get_mut(index) {
            *v = weight.clamp(0.0, 1.0);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub pitch: f32,
    pub yaw: f32,
}

impl HeadSink for HeadPose {
    fn set_head_rotation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch;
        self.yaw = yaw;
    }
}
