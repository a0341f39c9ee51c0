//! Regularized Kelvinlet kernel library.
//!
//! Closed-form building blocks from de Goes & James, "Dynamic Kelvinlets"
//! (2018): the regularized potential `W(r, R)`, its radial derivatives, and
//! the retarded combinations `U`, `∇U`, `∇²U` obtained by evaluating them on
//! the outgoing and incoming wave fronts `R = r ± a·t`.
//!
//! All math runs in `f64`. The `1/r³` denominators cancel a numerator that
//! itself vanishes like `r³`, and the derivatives cancel even harder (`1/r⁵`
//! for the Hessian). Below [`SERIES_RADIUS`]` · sqrt((a·t)² + ε²)` the
//! closed forms are replaced by the even Taylor series of `U` in `r`, whose
//! coefficients are exact rational functions of `a·t` and `ε`.
//!
//! Degenerate inputs are branches, never errors:
//! - `r < min_value`: the analytic `r → 0` limit (`U0`) for the potential,
//!   zero for the derivatives;
//! - `a >= max_value` (incompressible) or `t >= max_time`: zero.

use std::f64::consts::PI;

use kelvinlet_config::KernelLimits;

/// Fraction of `sqrt((a·t)² + ε²)` below which the small-`r` series is used.
///
/// At this radius the series (through `r⁶`) and the closed form agree to a
/// few parts in `10⁶` while `a·t` stays within about `15·ε`.
pub const SERIES_RADIUS: f64 = 0.03;

/// Value and first two radial derivatives of a retarded potential.
///
/// Grab brushes only need `value`/`grad`, affine brushes `grad`/`hess`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadialField {
    pub value: f64,
    pub grad: f64,
    pub hess: f64,
}

/// Kernel evaluator bound to one brush radius.
#[derive(Debug, Clone, Copy)]
pub struct RegularizedKernel {
    eps: f64,
    eps2: f64,
    min_value: f64,
    max_value: f64,
    max_time: f64,
}

impl RegularizedKernel {
    pub fn new(eps: f32, limits: &KernelLimits) -> Self {
        let eps = eps as f64;
        Self {
            eps,
            eps2: eps * eps,
            min_value: limits.min_value as f64,
            max_value: limits.max_value as f64,
            max_time: limits.max_time as f64,
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Eq. 8b: `W(r, R)`.
    pub fn w(&self, r: f64, big_r: f64) -> f64 {
        let r2 = big_r * big_r;
        let re2 = r2 + self.eps2;
        let re = re2.sqrt();
        (self.eps2 + 2.0 * r2 - r * big_r * (3.0 - r2 / re2)) / re
    }

    /// Appendix C: `∂W`.
    pub fn grad_w(&self, r: f64, big_r: f64) -> f64 {
        let re2 = big_r * big_r + self.eps2;
        let re = re2.sqrt();
        -3.0 * self.eps2 * self.eps2 * r / (re2 * re2 * re)
    }

    /// Appendix C: `∂²W`.
    pub fn hess_w(&self, r: f64, big_r: f64) -> f64 {
        let re2 = big_r * big_r + self.eps2;
        let re = re2.sqrt();
        -3.0 * self.eps2 * self.eps2 * (re2 - 5.0 * r * big_r) / (re2 * re2 * re2 * re)
    }

    /// Shared denominator `16π·a·r³`.
    pub fn den(&self, r: f64, a: f64) -> f64 {
        16.0 * PI * a * r * r * r
    }

    /// Eq. 10: the `r → 0` limit of `U`.
    pub fn u0(&self, t: f64, a: f64) -> f64 {
        let at = a * t;
        let num = 5.0 * t * self.eps2 * self.eps2;
        let den = 8.0 * PI * (at * at + self.eps2).powi(7).sqrt();
        num / den
    }

    fn is_quiescent(&self, t: f64, a: f64) -> bool {
        a >= self.max_value || t >= self.max_time
    }

    /// Radius below which [`Self::series`] replaces the closed forms.
    pub fn series_radius(&self, t: f64, a: f64) -> f64 {
        let at = a * t;
        SERIES_RADIUS * (at * at + self.eps2).sqrt()
    }

    /// Small-`r` expansion `U ≈ (c3 + c5·r² + c7·r⁴ + c9·r⁶) / (16π·a)`
    /// with its first two radial derivatives.
    ///
    /// `c3` reproduces `U0`.
    pub fn series(&self, r: f64, t: f64, a: f64) -> RadialField {
        let s = a * t;
        let s2 = s * s;
        let e2 = self.eps2;
        let e4 = e2 * e2;
        let p2 = s2 + e2;
        let p4 = p2 * p2;
        let p7 = p4 * p2 * p2.sqrt();

        let c3 = 10.0 * e4 * s / p7;
        let c5 = 21.0 * e4 * s * (2.0 * s2 - e2) / (p7 * p4);
        let c7 = 9.0 * e4 * s * (15.0 * e4 - 80.0 * e2 * s2 + 48.0 * s2 * s2)
            / (4.0 * p7 * p4 * p4);
        let c9 = 55.0
            * e4
            * s
            * (-7.0 * e4 * e2 + 70.0 * e4 * s2 - 112.0 * e2 * s2 * s2 + 32.0 * s2 * s2 * s2)
            / (8.0 * p7 * p4 * p4 * p4);

        let k = 16.0 * PI * a;
        let r2 = r * r;
        RadialField {
            value: (c3 + r2 * (c5 + r2 * (c7 + r2 * c9))) / k,
            grad: r * (2.0 * c5 + r2 * (4.0 * c7 + r2 * 6.0 * c9)) / k,
            hess: (2.0 * c5 + r2 * (12.0 * c7 + r2 * 30.0 * c9)) / k,
        }
    }

    /// Eq. 8a: retarded potential `U(r, t)` for wave speed `a`.
    pub fn u(&self, r: f64, t: f64, a: f64) -> f64 {
        if self.is_quiescent(t, a) {
            return 0.0;
        }
        if r < self.min_value {
            return self.u0(t, a);
        }
        if r < self.series_radius(t, a) {
            return self.series(r, t, a).value;
        }
        let at = a * t;
        let f_p = self.w(r, r + at);
        let f_n = self.w(r, r - at);
        (f_p - f_n) / self.den(r, a)
    }

    /// First radial derivative of `U`.
    pub fn grad_u(&self, r: f64, t: f64, a: f64) -> f64 {
        if self.is_quiescent(t, a) || r < self.min_value {
            return 0.0;
        }
        if r < self.series_radius(t, a) {
            return self.series(r, t, a).grad;
        }
        let at = a * t;
        let f_p = self.w(r, r + at);
        let f_n = self.w(r, r - at);
        let g_p = self.grad_w(r, r + at);
        let g_n = self.grad_w(r, r - at);
        ((g_p - g_n) - 3.0 * (f_p - f_n) / r) / self.den(r, a)
    }

    /// Second radial derivative of `U`.
    pub fn hess_u(&self, r: f64, t: f64, a: f64) -> f64 {
        if self.is_quiescent(t, a) || r < self.min_value {
            return 0.0;
        }
        if r < self.series_radius(t, a) {
            return self.series(r, t, a).hess;
        }
        let at = a * t;
        let f_p = self.w(r, r + at);
        let f_n = self.w(r, r - at);
        let g_p = self.grad_w(r, r + at);
        let g_n = self.grad_w(r, r - at);
        let h_p = self.hess_w(r, r + at);
        let h_n = self.hess_w(r, r - at);
        ((h_p - h_n) - 6.0 * (g_p - g_n) / r + 12.0 * (f_p - f_n) / (r * r)) / self.den(r, a)
    }

    /// Potential and gradient, as used by Grab brushes.
    pub fn potential(&self, r: f64, t: f64, a: f64) -> RadialField {
        RadialField {
            value: self.u(r, t, a),
            grad: self.grad_u(r, t, a),
            hess: 0.0,
        }
    }

    /// Gradient and Hessian, as used by affine brushes.
    pub fn derivatives(&self, r: f64, t: f64, a: f64) -> RadialField {
        RadialField {
            value: 0.0,
            grad: self.grad_u(r, t, a),
            hess: self.hess_u(r, t, a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHA: f64 = 14.491_376_746_189_438;
    const BETA: f64 = 7.745_966_692_414_834;

    fn kernel(eps: f32) -> RegularizedKernel {
        RegularizedKernel::new(eps, &KernelLimits::default())
    }

    fn rel(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn test_near_field_branch_uses_u0() {
        let k = kernel(0.5);
        assert_eq!(k.u(0.0, 0.05, BETA), k.u0(0.05, BETA));
        assert_eq!(k.u(5e-5, 0.05, BETA), k.u0(0.05, BETA));
        assert_eq!(k.grad_u(5e-5, 0.05, BETA), 0.0);
        assert_eq!(k.hess_u(5e-5, 0.05, BETA), 0.0);
    }

    #[test]
    fn test_near_field_continuity() {
        let k = kernel(0.5);
        for &a in &[ALPHA, BETA] {
            for &t in &[0.01, 0.05] {
                let u0 = k.u0(t, a);
                for &r in &[1.01e-4, 1e-3] {
                    let u = k.u(r, t, a);
                    assert!(rel(u, u0) < 1e-3, "a={a} t={t} r={r}: {u} vs {u0}");
                }
            }
        }
    }

    #[test]
    fn test_incompressible_and_late_time_are_zero() {
        let k = kernel(0.5);
        let max_value = KernelLimits::default().max_value as f64;
        let max_time = KernelLimits::default().max_time as f64;
        assert_eq!(k.u(0.3, 0.05, max_value), 0.0);
        assert_eq!(k.u(0.0, 0.05, max_value), 0.0);
        assert_eq!(k.grad_u(0.3, max_time, BETA), 0.0);
        assert_eq!(k.hess_u(0.3, max_time + 1.0, BETA), 0.0);
        assert_eq!(k.potential(0.3, max_time, ALPHA), RadialField::default());
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let k = kernel(0.5);
        let h = 1e-5;
        for &t in &[0.02, 0.05] {
            for &r in &[0.1, 0.3, 0.6] {
                let fd_grad = (k.u(r + h, t, BETA) - k.u(r - h, t, BETA)) / (2.0 * h);
                let fd_hess = (k.grad_u(r + h, t, BETA) - k.grad_u(r - h, t, BETA)) / (2.0 * h);
                assert!(rel(k.grad_u(r, t, BETA), fd_grad) < 1e-5, "grad t={t} r={r}");
                assert!(rel(k.hess_u(r, t, BETA), fd_hess) < 1e-5, "hess t={t} r={r}");
            }
        }
    }

    #[test]
    fn test_small_radius_derivatives_match_finite_differences() {
        let k = kernel(0.5);
        for &a in &[ALPHA, BETA] {
            for &t in &[0.02, 0.05] {
                for &r in &[1.01e-4, 2e-4, 5e-4, 1e-3, 3e-3, 1e-2, 2e-2, 5e-2] {
                    let h = 1e-3 * r;
                    let fd_grad = (k.u(r + h, t, a) - k.u(r - h, t, a)) / (2.0 * h);
                    let fd_hess = (k.grad_u(r + h, t, a) - k.grad_u(r - h, t, a)) / (2.0 * h);
                    let grad = k.grad_u(r, t, a);
                    let hess = k.hess_u(r, t, a);
                    assert!(rel(grad, fd_grad) < 1e-4, "grad a={a} t={t} r={r}: {grad} vs {fd_grad}");
                    assert!(rel(hess, fd_hess) < 1e-4, "hess a={a} t={t} r={r}: {hess} vs {fd_hess}");
                }
            }
        }
    }

    #[test]
    fn test_series_matches_closed_form_at_switch() {
        for &eps in &[0.1_f32, 0.5, 2.0] {
            let k = kernel(eps);
            for &a in &[ALPHA, BETA] {
                for &t in &[0.001, 0.02, 0.05] {
                    let radius = k.series_radius(t, a);
                    assert!(radius > k.min_value());
                    let (below, above) = (radius * (1.0 - 1e-9), radius * (1.0 + 1e-9));
                    assert!(rel(k.u(below, t, a), k.u(above, t, a)) < 1e-5);
                    assert!(rel(k.grad_u(below, t, a), k.grad_u(above, t, a)) < 1e-5);
                    assert!(rel(k.hess_u(below, t, a), k.hess_u(above, t, a)) < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_series_leading_term_is_u0() {
        let k = kernel(0.5);
        for &a in &[ALPHA, BETA] {
            for &t in &[0.001, 0.05, 0.5] {
                let s = k.series(0.0, t, a);
                assert!(rel(s.value, k.u0(t, a)) < 1e-12);
                assert_eq!(s.grad, 0.0);
            }
        }
    }

    #[test]
    fn test_potential_is_finite_across_radii() {
        let k = kernel(0.5);
        for i in 0..200 {
            let r = i as f64 * 0.01;
            for &t in &[0.001, 0.05, 0.5, 3.9] {
                let p = k.potential(r, t, BETA);
                let d = k.derivatives(r, t, ALPHA);
                assert!(p.value.is_finite() && p.grad.is_finite());
                assert!(d.grad.is_finite() && d.hess.is_finite());
            }
        }
    }

    #[test]
    fn test_u0_peaks_then_decays() {
        let k = kernel(0.5);
        let early = k.u0(0.001, BETA);
        let mid = k.u0(0.02, BETA);
        let late = k.u0(1.0, BETA);
        assert!(mid > early);
        assert!(late < mid * 1e-3);
    }
}
