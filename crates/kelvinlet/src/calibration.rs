//! Brush force calibration.
//!
//! Raw input forces are rescaled once, when a brush is placed, so that a unit
//! strength yields a displacement amplitude consistent with the material and
//! the brush radius. The constants come from the closed-form derivation in
//! de Goes & James (2017, 2018) and are not tuning knobs.

use glam::{Mat3, Vec3};

use crate::error::{KelvinletError, Result};
use crate::material::Material;
use crate::types::{axial_vector, skew_symmetric, BrushForce, BrushKind, BrushMode};

/// Calibrate a raw brush force for the given kind, mode and radius.
///
/// Fails when the force shape does not match the kind, or when the
/// kind/mode combination has no calibration (affine push).
pub fn calibrate(
    kind: BrushKind,
    mode: BrushMode,
    force: BrushForce,
    eps: f32,
    material: &Material,
) -> Result<BrushForce> {
    match (kind, mode, force) {
        (BrushKind::Grab, BrushMode::Pulse, BrushForce::Vector(f)) => {
            Ok(BrushForce::Vector(grab_pulse(f, eps, material)))
        }
        (BrushKind::Grab, BrushMode::Push, BrushForce::Vector(f)) => {
            Ok(BrushForce::Vector(grab_push(f, eps, material)))
        }
        (BrushKind::Grab, _, BrushForce::Tensor(_)) => Err(KelvinletError::ForceMismatch {
            kind,
            expected: "vector",
        }),
        (_, _, BrushForce::Vector(_)) => Err(KelvinletError::ForceMismatch {
            kind,
            expected: "tensor",
        }),
        (_, BrushMode::Push, BrushForce::Tensor(_)) => {
            Err(KelvinletError::UnsupportedMode { kind, mode })
        }
        (BrushKind::Scale, BrushMode::Pulse, BrushForce::Tensor(m)) => {
            Ok(BrushForce::Tensor(scale(m, eps, material)))
        }
        (BrushKind::Pinch, BrushMode::Pulse, BrushForce::Tensor(m)) => {
            Ok(BrushForce::Tensor(pinch(m, eps, material)))
        }
        (BrushKind::Twist, BrushMode::Pulse, BrushForce::Tensor(m)) => {
            Ok(BrushForce::Tensor(twist(m, eps, material)))
        }
    }
}

/// `f · 10·β·ε²`
pub fn grab_pulse(force: Vec3, eps: f32, material: &Material) -> Vec3 {
    force * (10.0 * material.beta() * eps * eps)
}

/// `f · 2ε / (3a − 2b)`: unit displacement at the anchor of a static Kelvinlet.
pub fn grab_push(force: Vec3, eps: f32, material: &Material) -> Vec3 {
    let (a, b) = material.static_coefficients();
    force * (2.0 * eps / (3.0 * a - 2.0 * b))
}

/// Isotropic part `s·I` with `s = tr(F)/3 · (−10·α·ε⁴)/5`.
///
/// An incompressible material has no volumetric response, so `s = 0`.
pub fn scale(force: Mat3, eps: f32, material: &Material) -> Mat3 {
    let mut s = trace(&force) / 3.0;
    if material.is_incompressible() {
        s = 0.0;
    } else {
        let s_factor = -10.0 * material.alpha() * eps.powi(4);
        s *= s_factor / 5.0;
    }
    Mat3::IDENTITY * s
}

/// Symmetric part `½(F + Fᵀ)` scaled by a blend of both wave speeds.
pub fn pinch(force: Mat3, eps: f32, material: &Material) -> Mat3 {
    let p = (force + force.transpose()) * 0.5;
    let e4 = eps.powi(4);
    let t_factor = -10.0 * material.beta() * e4;
    let factor = if material.is_incompressible() {
        t_factor / 2.0
    } else {
        let s_factor = -10.0 * material.alpha() * e4;
        1.0 / (2.0 / t_factor + 3.0 / s_factor)
    };
    p * factor
}

/// Antisymmetric part, as an axial vector scaled by `(−10·β·ε⁴)/5`.
pub fn twist(force: Mat3, eps: f32, material: &Material) -> Mat3 {
    let q = axial_vector(&force);
    let t_factor = -10.0 * material.beta() * eps.powi(4);
    skew_symmetric(q * (t_factor / 5.0))
}

/// Force applied by a preview brush: `f · 5·α·ε²`.
///
/// Falls back to beta when alpha sits at the incompressible sentinel.
pub fn preview(force: Vec3, eps: f32, material: &Material) -> Vec3 {
    let speed = if material.is_incompressible() {
        material.beta()
    } else {
        material.alpha()
    };
    force * (5.0 * speed * eps * eps)
}

pub(crate) fn trace(m: &Mat3) -> f32 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}
