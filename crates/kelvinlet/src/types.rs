//! Core brush types.
//!
//! A brush is tagged by kind (which force shape it carries) and mode (how it
//! lives over time). Per-frame evaluation works on flat `#[repr(C)]` samples
//! that can be copied straight into a dispatch buffer.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Shape of deformation a brush produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BrushKind {
    /// Translate the neighbourhood along a force vector
    #[default]
    Grab = 0,
    /// Uniform expansion or contraction
    Scale = 1,
    /// Rotation about an axis through the anchor
    Twist = 2,
    /// Squeeze along one axis while stretching along another
    Pinch = 3,
}

impl BrushKind {
    /// Affine kinds carry a 3×3 tensor instead of a vector.
    pub fn is_affine(self) -> bool {
        !matches!(self, BrushKind::Grab)
    }
}

/// Temporal behaviour of a brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BrushMode {
    /// Transient impulse, discarded after the pulse lifetime
    #[default]
    Pulse = 0,
    /// Persistent force, kept until removed by its owner
    Push = 1,
}

/// Lifecycle state of a placed brush at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushState {
    /// Triggered in the future; contributes nothing yet
    Pending,
    /// Contributing to the displacement field
    Active,
    /// Pulse lifetime elapsed; pruned before the next frame
    Expired,
}

/// Opaque identifier returned when a brush is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrushHandle(pub u64);

/// Force carried by a brush: a vector for Grab, a tensor for affine kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushForce {
    Vector(Vec3),
    Tensor(Mat3),
}

impl BrushForce {
    /// Build the raw force an input device would produce for `kind`.
    ///
    /// `normal` is the surface normal at the hit point and only matters for
    /// Grab (push direction) and Twist (rotation axis).
    pub fn from_strength(kind: BrushKind, strength: f32, normal: Vec3) -> Self {
        match kind {
            BrushKind::Grab => BrushForce::Vector(normal * strength),
            BrushKind::Scale => BrushForce::Tensor(Mat3::IDENTITY * strength),
            BrushKind::Pinch => BrushForce::Tensor(Mat3::from_diagonal(Vec3::new(
                2.0 * strength,
                -2.0 * strength,
                0.0,
            ))),
            BrushKind::Twist => BrushForce::Tensor(skew_symmetric(
                normal * (strength * 0.5 * std::f32::consts::PI),
            )),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            BrushForce::Vector(v) => v.is_finite(),
            BrushForce::Tensor(m) => m.is_finite(),
        }
    }
}

/// Matrix `[q]×` such that `[q]× · x == q × x`.
pub fn skew_symmetric(q: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, q.z, -q.y),
        Vec3::new(-q.z, 0.0, q.x),
        Vec3::new(q.y, -q.x, 0.0),
    )
}

/// Axial vector of the antisymmetric part of `m`.
pub fn axial_vector(m: &Mat3) -> Vec3 {
    // glam is column-major: element (row, col) is m.col(col)[row]
    0.5 * Vec3::new(
        m.y_axis.z - m.z_axis.y,
        m.z_axis.x - m.x_axis.z,
        m.x_axis.y - m.y_axis.x,
    )
}

/// Per-frame record of a point-force (Grab) brush.
///
/// Layout matches a GPU structured buffer: 8 floats.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PointSample {
    /// Anchor in mesh-local coordinates
    pub position: [f32; 3],
    /// Regularization radius
    pub eps: f32,
    /// Calibrated force
    pub force: [f32; 3],
    /// Elapsed time since trigger
    pub dt: f32,
}

impl PointSample {
    pub fn new(position: Vec3, eps: f32, force: Vec3, dt: f32) -> Self {
        Self {
            position: position.to_array(),
            eps,
            force: force.to_array(),
            dt,
        }
    }

    pub fn is_active(&self) -> bool {
        self.dt > 0.0
    }
}

/// Per-frame record of an affine (Scale/Twist/Pinch) brush.
///
/// Layout matches a GPU structured buffer: 14 floats, tensor column-major.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct AffineSample {
    /// Anchor in mesh-local coordinates
    pub position: [f32; 3],
    /// Regularization radius
    pub eps: f32,
    /// Calibrated tensor, column-major
    pub force: [f32; 9],
    /// Elapsed time since trigger
    pub dt: f32,
}

impl AffineSample {
    pub fn new(position: Vec3, eps: f32, force: Mat3, dt: f32) -> Self {
        Self {
            position: position.to_array(),
            eps,
            force: force.to_cols_array(),
            dt,
        }
    }

    pub fn is_active(&self) -> bool {
        self.dt > 0.0
    }
}

/// A brush reduced to what the kernels need for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushSample {
    /// Grab pulse: elastodynamic point Kelvinlet
    PulsePoint(PointSample),
    /// Grab push: elastostatic point Kelvinlet
    PushPoint(PointSample),
    /// Scale/Twist/Pinch pulse
    Affine(AffineSample),
}
