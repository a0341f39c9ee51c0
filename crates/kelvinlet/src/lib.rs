//! Real-time Kelvinlet surface deformation.
//!
//! This crate deforms a mesh under localized brush interactions using the
//! closed-form regularized Kelvinlets of de Goes & James instead of a full
//! finite-element solve:
//! - Grab brushes (point forces), elastodynamic pulses or elastostatic pushes
//! - Scale, Twist and Pinch brushes (affine force tensors)
//! - RK4-stabilized displacement evaluation
//! - Sequential or workgroup-parallel accumulation over all vertices
//!
//! # Architecture
//!
//! A [`DeformableSurface`] owns an immutable rest pose and a set of brushes.
//! Every frame the displaced pose is rebuilt from scratch as the rest pose
//! plus the sum of every active brush field, so no state carries over
//! between frames except the brush set itself.
//!
//! ## Key Components
//!
//! - **Material**: stiffness and compressibility to wave speeds
//! - **Kernel**: regularized potentials and their radial derivatives
//! - **Calibration**: per-kind force rescaling at placement time
//! - **Brush**: placement requests, lifetimes, per-frame plans
//! - **Displacement**: per-brush fields integrated with RK4
//! - **Dispatch**: field accumulation strategies
//! - **Surface**: frame orchestration and vertex normals

pub mod brush;
pub mod calibration;
pub mod dispatch;
pub mod displacement;
pub mod error;
pub mod kernel;
pub mod material;
pub mod normals;
pub mod surface;
pub mod types;

pub use brush::{Brush, BrushRequest, BrushSet, FramePlan};
pub use dispatch::{BatchedAccumulator, FieldAccumulator, SequentialAccumulator};
pub use displacement::FieldContext;
pub use error::{KelvinletError, Result};
pub use material::Material;
pub use surface::{DeformableSurface, FrameStats};
pub use types::{
    AffineSample, BrushForce, BrushHandle, BrushKind, BrushMode, BrushSample, BrushState,
    PointSample,
};

pub use kelvinlet_config as config;
