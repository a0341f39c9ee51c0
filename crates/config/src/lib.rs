//! Shared configuration for the Kelvinlet deformation engine
//!
//! This crate provides the single source of truth for material defaults,
//! the kernel branch limits (near-field radius, incompressible sentinel,
//! pulse lifetime) and the per-frame dispatch settings used by the
//! deformable surface controller.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default shear modulus (stiffness)
pub const DEFAULT_MU: f32 = 60.0;

/// Default Poisson ratio (compressibility)
pub const DEFAULT_NU: f32 = 0.30;

/// Range exposed to material sliders for mu
pub const MU_RANGE: RangeInclusive<f32> = 0.001..=200.0;

/// Valid range for the Poisson ratio
pub const NU_RANGE: RangeInclusive<f32> = 0.0..=0.5;

/// Finite stand-in for an infinite P-wave speed (incompressible material)
pub const MAX_SENTINEL: f32 = 1.0e8;

/// Below this radius kernels switch to their analytic near-field branch
pub const MIN_RADIUS: f32 = 1.0e-4;

/// Lifetime of a pulse brush in seconds, also the kernel far-time cutoff
pub const DEFAULT_MAX_TIME: f32 = 4.0;

/// Vertices per workgroup in the batched dispatch
pub const DEFAULT_WORKGROUP_SIZE: usize = 16;

/// Fixed elapsed time at which preview brushes are sampled
pub const PREVIEW_ELAPSED: f32 = 0.01;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Shear modulus must be positive and finite, got {0}")]
    InvalidMu(f32),
    #[error("Poisson ratio must lie in [0, 0.5], got {0}")]
    InvalidNu(f32),
    #[error("Invalid kernel limits: {0}")]
    InvalidLimits(String),
    #[error("Workgroup size must be non-zero")]
    InvalidWorkgroupSize,
}

/// Elastic material parameters as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Shear modulus, controls stiffness
    pub mu: f32,
    /// Poisson ratio, controls compressibility
    pub nu: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            nu: DEFAULT_NU,
        }
    }
}

impl MaterialConfig {
    /// Create a material config without validation
    pub fn new(mu: f32, nu: f32) -> Self {
        Self { mu, nu }
    }

    /// Check that mu > 0 and nu lies in [0, 0.5]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return Err(ConfigError::InvalidMu(self.mu));
        }
        if !NU_RANGE.contains(&self.nu) {
            return Err(ConfigError::InvalidNu(self.nu));
        }
        Ok(())
    }

    /// Clamp both parameters into the slider ranges.
    ///
    /// NaN inputs fall back to the defaults.
    pub fn clamped(&self) -> Self {
        let mu = if self.mu.is_nan() {
            DEFAULT_MU
        } else {
            self.mu.clamp(*MU_RANGE.start(), *MU_RANGE.end())
        };
        let nu = if self.nu.is_nan() {
            DEFAULT_NU
        } else {
            self.nu.clamp(*NU_RANGE.start(), *NU_RANGE.end())
        };
        Self { mu, nu }
    }
}

/// Thresholds used by the kernels to branch on degenerate inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelLimits {
    /// Near-field radius below which the analytic limit is used
    pub min_value: f32,
    /// Wave speed at or above which the material is treated as incompressible
    pub max_value: f32,
    /// Pulse lifetime; kernels evaluate to zero at or beyond it
    pub max_time: f32,
}

impl Default for KernelLimits {
    fn default() -> Self {
        Self {
            min_value: MIN_RADIUS,
            max_value: MAX_SENTINEL,
            max_time: DEFAULT_MAX_TIME,
        }
    }
}

impl KernelLimits {
    /// Check that every limit is positive and finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("min_value", self.min_value),
            ("max_value", self.max_value),
            ("max_time", self.max_time),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidLimits(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.min_value >= self.max_value {
            return Err(ConfigError::InvalidLimits(format!(
                "min_value {} must be below max_value {}",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}

/// How brush contributions are accumulated onto the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationStrategy {
    /// Vertex-by-vertex loop on the calling thread
    Sequential,
    /// Flat brush buffers dispatched over parallel vertex workgroups
    #[default]
    Batched,
}

/// Defaults used when turning a surface hit into a brush request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushDefaults {
    /// Input strength multiplier
    pub strength: f32,
    /// Distance the anchor is lifted off the surface along the hit normal
    pub offset: f32,
    /// Regularization radius (epsilon)
    pub radius: f32,
}

impl Default for BrushDefaults {
    fn default() -> Self {
        Self {
            strength: 1.0,
            offset: 0.2,
            radius: 0.5,
        }
    }
}

/// Configuration for a deformable surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct SurfaceConfig {
    /// Initial material
    pub material: MaterialConfig,
    /// Kernel branch thresholds
    pub limits: KernelLimits,
    /// Accumulation strategy
    pub strategy: AccumulationStrategy,
    /// Vertices per workgroup for the batched strategy
    pub workgroup_size: usize,
    /// Elapsed time used to sample preview brushes
    pub preview_elapsed: f32,
    /// Recompute vertex normals after every frame (requires indices)
    pub recompute_normals: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            material: MaterialConfig::default(),
            limits: KernelLimits::default(),
            strategy: AccumulationStrategy::default(),
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            preview_elapsed: PREVIEW_ELAPSED,
            recompute_normals: true,
        }
    }
}

impl SurfaceConfig {
    /// Create a config with the given strategy and default everything else
    pub fn with_strategy(strategy: AccumulationStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every nested section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.material.validate()?;
        self.limits.validate()?;
        if self.workgroup_size == 0 {
            return Err(ConfigError::InvalidWorkgroupSize);
        }
        if !(self.preview_elapsed.is_finite() && self.preview_elapsed > 0.0) {
            return Err(ConfigError::InvalidLimits(format!(
                "preview_elapsed must be positive, got {}",
                self.preview_elapsed
            )));
        }
        // A preview at or past the cutoff would always evaluate to zero
        if self.preview_elapsed >= self.limits.max_time {
            return Err(ConfigError::InvalidLimits(format!(
                "preview_elapsed {} must be below max_time {}",
                self.preview_elapsed, self.limits.max_time
            )));
        }
        Ok(())
    }
}
