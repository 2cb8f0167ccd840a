//! Math types and helpers for PetalSonic FX
//!
//! The host reports 3D attributes in a left-handed space (+Z forward). The
//! engine works in a right-handed space (-Z ahead), so every vector crossing
//! that boundary goes through [`convert_vector`].

pub use glam::Vec3;

const MIN_VECTOR_LENGTH: f32 = 1e-2;

/// Position and orientation of an emitter or listener as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes3d {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Attributes3d {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        velocity: Vec3::ZERO,
        forward: Vec3::Z,
        up: Vec3::Y,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for Attributes3d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Orthonormal basis plus origin in engine space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSpace {
    pub right: Vec3,
    pub up: Vec3,
    pub ahead: Vec3,
    pub origin: Vec3,
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            up: Vec3::Y,
            ahead: Vec3::NEG_Z,
            origin: Vec3::ZERO,
        }
    }
}

impl CoordinateSpace {
    pub fn from_attributes(attributes: &Attributes3d) -> Self {
        let ahead = convert_vector(attributes.forward);
        let up = convert_vector(attributes.up);
        Self {
            right: unit_vector(ahead.cross(up)),
            up,
            ahead,
            origin: convert_vector(attributes.position),
        }
    }

    /// Expresses a world-space direction in this space (x right, y up, -z ahead).
    pub fn to_local(&self, direction: Vec3) -> Vec3 {
        Vec3::new(
            direction.dot(self.right),
            direction.dot(self.up),
            -direction.dot(self.ahead),
        )
    }

    /// Inverse of [`CoordinateSpace::to_local`].
    pub fn to_world(&self, direction: Vec3) -> Vec3 {
        self.right * direction.x + self.up * direction.y - self.ahead * direction.z
    }

    /// Unit direction from this space's origin toward `target`, in local coordinates.
    pub fn direction_to(&self, target: Vec3) -> Vec3 {
        unit_vector(self.to_local(target - self.origin))
    }
}

/// Converts a host vector into engine space.
pub fn convert_vector(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

/// Normalizes `v`, treating lengths below 1e-2 as 1e-2.
pub fn unit_vector(v: Vec3) -> Vec3 {
    v / v.length().max(MIN_VECTOR_LENGTH)
}

pub fn num_samples_for_duration(duration: f32, sampling_rate: u32) -> usize {
    (duration * sampling_rate as f32).ceil() as usize
}

/// Applies a linear gain ramp from `start` to `end` across `buffer`.
pub fn apply_volume_ramp(start: f32, end: f32, buffer: &mut [f32]) {
    let n = buffer.len() as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let fraction = i as f32 / n;
        *sample *= fraction * end + (1.0 - fraction) * start;
    }
}
