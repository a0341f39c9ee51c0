//! Elastic material model.
//!
//! Converts stiffness (`mu`) and compressibility (`nu`) into the two wave
//! speeds driving the elastodynamic kernels: `beta` (shear) and `alpha`
//! (pressure). An incompressible material has an infinite pressure-wave
//! speed, represented by the finite `max_value` sentinel.

use kelvinlet_config::{KernelLimits, MaterialConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{KelvinletError, Result};

/// Validated material with its derived wave speeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    mu: f32,
    nu: f32,
    alpha: f32,
    beta: f32,
    max_value: f32,
}

impl Material {
    /// Build a material, rejecting `mu <= 0` and `nu` outside `[0, 0.5]`.
    pub fn new(mu: f32, nu: f32, limits: &KernelLimits) -> Result<Self> {
        validate_mu(mu)?;
        validate_nu(nu)?;
        let mut material = Self {
            mu,
            nu,
            alpha: 0.0,
            beta: 0.0,
            max_value: limits.max_value,
        };
        material.recompute();
        Ok(material)
    }

    pub fn from_config(config: &MaterialConfig, limits: &KernelLimits) -> Result<Self> {
        Self::new(config.mu, config.nu, limits)
    }

    /// Update the shear modulus and rederive the wave speeds.
    pub fn set_mu(&mut self, mu: f32) -> Result<()> {
        validate_mu(mu)?;
        self.mu = mu;
        self.recompute();
        Ok(())
    }

    /// Update the Poisson ratio and rederive the wave speeds.
    pub fn set_nu(&mut self, nu: f32) -> Result<()> {
        validate_nu(nu)?;
        self.nu = nu;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.beta = self.mu.sqrt();
        self.alpha = if self.nu >= 0.5 {
            self.max_value
        } else {
            self.beta * (1.0 + 1.0 / (1.0 - 2.0 * self.nu)).sqrt()
        };
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn nu(&self) -> f32 {
        self.nu
    }

    /// Pressure (P) wave speed.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Shear (S) wave speed.
    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn alpha_beta(&self) -> (f32, f32) {
        (self.alpha, self.beta)
    }

    /// `(mu, nu, alpha, beta)` readout.
    pub fn parameters(&self) -> (f32, f32, f32, f32) {
        (self.mu, self.nu, self.alpha, self.beta)
    }

    /// True when alpha sits at the incompressible sentinel.
    pub fn is_incompressible(&self) -> bool {
        self.alpha >= self.max_value
    }

    /// Coefficients `(a, b)` of the elastostatic Kelvinlet,
    /// `a = 1/(4πμ)` and `b = a/(4(1-ν))`.
    pub fn static_coefficients(&self) -> (f32, f32) {
        let a = 1.0 / (4.0 * std::f32::consts::PI * self.mu);
        let b = a / (4.0 * (1.0 - self.nu));
        (a, b)
    }
}

fn validate_mu(mu: f32) -> Result<()> {
    if mu.is_finite() && mu > 0.0 {
        Ok(())
    } else {
        warn!("Rejected shear modulus {}", mu);
        Err(KelvinletError::InvalidMu(mu))
    }
}

fn validate_nu(nu: f32) -> Result<()> {
    if (0.0..=0.5).contains(&nu) {
        Ok(())
    } else {
        warn!("Rejected Poisson ratio {}", nu);
        Err(KelvinletError::InvalidNu(nu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> KernelLimits {
        KernelLimits::default()
    }

    #[test]
    fn test_reference_material() {
        let m = Material::new(60.0, 0.30, &limits()).unwrap();
        assert!((m.beta() - 7.745_967).abs() < 1e-4);
        assert!((m.alpha() - 14.4914).abs() < 1e-3);
        assert!(!m.is_incompressible());
    }

    #[test]
    fn test_alpha_dominates_beta() {
        for &mu in &[0.001_f32, 0.5, 5.0, 60.0, 200.0] {
            for i in 0..=10 {
                let nu = i as f32 * 0.05;
                let m = Material::new(mu, nu, &limits()).unwrap();
                assert!(m.beta() > 0.0);
                assert!(m.alpha() >= m.beta(), "mu={mu} nu={nu}");
                assert_eq!(m.alpha() == limits().max_value, nu == 0.5);
            }
        }
    }

    #[test]
    fn test_incompressible_uses_sentinel() {
        let m = Material::new(10.0, 0.5, &limits()).unwrap();
        assert_eq!(m.alpha(), kelvinlet_config::MAX_SENTINEL);
        assert!(m.alpha().is_finite());
        assert!(m.is_incompressible());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            Material::new(0.0, 0.3, &limits()),
            Err(KelvinletError::InvalidMu(_))
        ));
        assert!(matches!(
            Material::new(-1.0, 0.3, &limits()),
            Err(KelvinletError::InvalidMu(_))
        ));
        assert!(matches!(
            Material::new(1.0, 0.6, &limits()),
            Err(KelvinletError::InvalidNu(_))
        ));
        assert!(Material::new(1.0, f32::NAN, &limits()).is_err());
    }

    #[test]
    fn test_setters_round_trip_and_recompute() {
        let mut m = Material::new(60.0, 0.3, &limits()).unwrap();
        for &mu in &[0.25_f32, 1.0, 42.0, 199.5] {
            m.set_mu(mu).unwrap();
            assert_eq!(m.parameters().0, mu);
            assert!((m.beta() - mu.sqrt()).abs() < 1e-6);
        }
        m.set_nu(0.5).unwrap();
        assert!(m.is_incompressible());
        m.set_nu(0.0).unwrap();
        assert!((m.alpha() - m.beta() * 2.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let mut m = Material::new(60.0, 0.3, &limits()).unwrap();
        let before = m;
        assert!(m.set_mu(-3.0).is_err());
        assert!(m.set_nu(0.75).is_err());
        assert_eq!(m, before);
    }
}
