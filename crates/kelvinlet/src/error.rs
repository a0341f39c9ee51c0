//! Errors surfaced at the engine boundary.
//!
//! Only placement requests, material updates and surface construction can
//! fail. Kernel evaluation has no error path: every degenerate input maps to
//! a closed-form branch.

use thiserror::Error;

use crate::types::{BrushHandle, BrushKind, BrushMode};

#[derive(Debug, Error)]
pub enum KelvinletError {
    #[error("Shear modulus must be positive and finite, got {0}")]
    InvalidMu(f32),
    #[error("Poisson ratio must lie in [0, 0.5], got {0}")]
    InvalidNu(f32),
    #[error("Brush epsilon must be positive and finite, got {0}")]
    InvalidEpsilon(f32),
    #[error("Brush force contains non-finite components")]
    NonFiniteForce,
    #[error("Brush anchor contains non-finite components")]
    NonFiniteAnchor,
    #[error("{kind:?} brushes take a {expected} force")]
    ForceMismatch {
        kind: BrushKind,
        expected: &'static str,
    },
    #[error("{kind:?} brushes do not support {mode:?} mode")]
    UnsupportedMode { kind: BrushKind, mode: BrushMode },
    #[error("No brush with handle {0:?}")]
    UnknownBrush(BrushHandle),
    #[error("Index buffer length {0} is not a multiple of 3")]
    IndexCount(usize),
    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("Invalid configuration: {0}")]
    Config(#[from] kelvinlet_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, KelvinletError>;
