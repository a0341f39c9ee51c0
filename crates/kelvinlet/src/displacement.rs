//! Displacement field evaluation.
//!
//! Combines kernel outputs into a displacement vector at a query point, for
//! each brush family:
//!
//! - **Grab pulse**: Eq. 9 of de Goes & James 2018. The radius fed to the
//!   kernels is the *squared* distance `|x|²`.
//! - **Affine pulse** (Scale/Twist/Pinch): gradient/Hessian form of the same
//!   field, with the plain distance `|x|`.
//! - **Grab push**: the time-independent regularized Kelvinlet of
//!   de Goes & James 2017.
//!
//! Every field is integrated with a fixed four-stage RK4 step, re-evaluating
//! the field at the partially displaced point. This damps the overshoot a
//! single evaluation produces close to a strong, narrow brush.

use glam::{DMat3, DVec3, Mat3, Vec3};
use kelvinlet_config::KernelLimits;

use crate::kernel::{RadialField, RegularizedKernel};
use crate::material::Material;
use crate::types::{AffineSample, BrushSample, PointSample};

/// Frame-constant material data shared by every brush evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext {
    pub alpha: f64,
    pub beta: f64,
    /// Static Kelvinlet coefficient `a = 1/(4πμ)`
    pub static_a: f64,
    /// Static Kelvinlet coefficient `b = a/(4(1-ν))`
    pub static_b: f64,
    pub limits: KernelLimits,
}

impl FieldContext {
    pub fn new(material: &Material, limits: &KernelLimits) -> Self {
        let (a, b) = material.static_coefficients();
        Self {
            alpha: material.alpha() as f64,
            beta: material.beta() as f64,
            static_a: a as f64,
            static_b: b as f64,
            limits: *limits,
        }
    }

    fn kernel(&self, eps: f32) -> RegularizedKernel {
        RegularizedKernel::new(eps, &self.limits)
    }
}

/// One fixed-size RK4 step through the field `eval`.
///
/// Returns `(v0 + 2v1 + 2v2 + v3) / 6` where each stage re-evaluates the
/// field at the query offset by the previous stage.
pub fn integrate_rk4<F>(query: DVec3, eval: F) -> DVec3
where
    F: Fn(DVec3) -> DVec3,
{
    let v0 = eval(query);
    let v1 = eval(query + 0.5 * v0);
    let v2 = eval(query + 0.5 * v1);
    let v3 = eval(query + v2);
    (v0 + 2.0 * v1 + 2.0 * v2 + v3) / 6.0
}

/// Single evaluation of a Grab pulse brush.
pub fn grab_pulse(sample: &PointSample, query: DVec3, ctx: &FieldContext) -> DVec3 {
    let t = sample.dt as f64;
    if t <= 0.0 {
        return DVec3::ZERO;
    }
    let kernel = ctx.kernel(sample.eps);
    let force = DVec3::from(sample.force.map(f64::from));
    let x = query - DVec3::from(sample.position.map(f64::from));
    // Grab kernels are fed the squared distance
    let r = x.length_squared();

    let ua = kernel.potential(r, t, ctx.alpha);
    let ub = kernel.potential(r, t, ctx.beta);
    let a = ua.value + 2.0 * ub.value + r * ub.grad;
    let b = coefficient_b(&ua, &ub, r, kernel.min_value());
    a * force + b * force.dot(x) * x
}

/// Single evaluation of an affine (Scale/Twist/Pinch) pulse brush.
pub fn affine_pulse(sample: &AffineSample, query: DVec3, ctx: &FieldContext) -> DVec3 {
    let t = sample.dt as f64;
    if t <= 0.0 {
        return DVec3::ZERO;
    }
    let kernel = ctx.kernel(sample.eps);
    let x = query - DVec3::from(sample.position.map(f64::from));
    let r = x.length();
    // An affine field vanishes at its anchor
    if r < kernel.min_value() {
        return DVec3::ZERO;
    }
    let force = Mat3::from_cols_array(&sample.force).as_dmat3();

    let ua = kernel.derivatives(r, t, ctx.alpha);
    let ub = kernel.derivatives(r, t, ctx.beta);
    let b = coefficient_b(&ua, &ub, r, kernel.min_value());
    let grad_a = ua.grad + 3.0 * ub.grad + r * ub.hess;
    let grad_b = (ua.hess - ub.hess - b) / r;

    let fx = force * x;
    let transposed = force.transpose() * x + dmat3_trace(&force) * x;
    grad_a * (fx / r) + grad_b * x.dot(fx) * (x / r) + b * transposed
}

/// Single evaluation of a Grab push brush (elastostatic Kelvinlet).
pub fn grab_push(sample: &PointSample, query: DVec3, ctx: &FieldContext) -> DVec3 {
    if sample.dt <= 0.0 {
        return DVec3::ZERO;
    }
    let eps = sample.eps as f64;
    let force = DVec3::from(sample.force.map(f64::from));
    let x = query - DVec3::from(sample.position.map(f64::from));
    let r_eps = (x.length_squared() + eps * eps).sqrt();
    let r_eps3 = r_eps * r_eps * r_eps;
    let (a, b) = (ctx.static_a, ctx.static_b);

    let isotropic = (a - b) / r_eps + a * eps * eps / (2.0 * r_eps3);
    isotropic * force + (b / r_eps3) * x.dot(force) * x
}

/// RK4-integrated displacement of any brush sample at `query`.
pub fn displacement(sample: &BrushSample, query: Vec3, ctx: &FieldContext) -> Vec3 {
    let q = query.as_dvec3();
    let d = match sample {
        BrushSample::PulsePoint(s) => integrate_rk4(q, |p| grab_pulse(s, p, ctx)),
        BrushSample::PushPoint(s) => integrate_rk4(q, |p| grab_push(s, p, ctx)),
        BrushSample::Affine(s) => integrate_rk4(q, |p| affine_pulse(s, p, ctx)),
    };
    d.as_vec3()
}

/// Eq. 9b, zeroed in the near field.
fn coefficient_b(ua: &RadialField, ub: &RadialField, r: f64, min_value: f64) -> f64 {
    if r < min_value {
        0.0
    } else {
        (ua.grad - ub.grad) / r
    }
}

fn dmat3_trace(m: &DMat3) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}
