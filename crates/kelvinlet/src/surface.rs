//! Deformable surface controller.
//!
//! Owns the rest pose, the displaced scratch buffer and the brush set, and
//! recomputes the whole displaced pose from scratch on every
//! [`DeformableSurface::update`]:
//!
//! 1. Advance the clock and prune expired pulses
//! 2. Reduce active brushes to a [`FramePlan`](crate::brush::FramePlan)
//! 3. Reset displaced vertices to the rest pose
//! 4. Accumulate the plan with the configured strategy
//! 5. Recompute vertex normals (if an index buffer was supplied)
//!
//! Brushes are only added or removed between updates.

use std::fmt;

#[cfg(feature = "bevy")]
use bevy::prelude::Component;
use glam::Vec3;
use kelvinlet_config::{AccumulationStrategy, SurfaceConfig};
use tracing::{debug, warn};

use crate::brush::{Brush, BrushRequest, BrushSet};
use crate::calibration;
use crate::dispatch::{create_accumulator, FieldAccumulator};
use crate::displacement::FieldContext;
use crate::error::Result;
use crate::material::Material;
use crate::normals::{compute_vertex_normals, validate_indices};
use crate::types::{BrushHandle, BrushKind, PointSample};

/// Summary of one [`DeformableSurface::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Pulse brushes pruned at the start of the frame
    pub expired: usize,
    /// Point-force samples evaluated (push, pulse and preview)
    pub point_brushes: usize,
    /// Affine samples evaluated
    pub affine_brushes: usize,
    /// Whether a preview brush was applied this frame
    pub preview: bool,
}

/// A mesh surface deformed by Kelvinlet brushes.
#[cfg_attr(feature = "bevy", derive(Component))]
pub struct DeformableSurface {
    rest: Vec<Vec3>,
    displaced: Vec<Vec3>,
    indices: Option<Vec<u32>>,
    normals: Vec<Vec3>,
    material: Material,
    config: SurfaceConfig,
    brushes: BrushSet,
    preview: Option<PointSample>,
    clock: f32,
    accumulator: Box<dyn FieldAccumulator>,
}

impl fmt::Debug for DeformableSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeformableSurface")
            .field("vertices", &self.rest.len())
            .field("material", &self.material)
            .field("brushes", &self.brushes.len())
            .field("preview", &self.preview.is_some())
            .field("clock", &self.clock)
            .field("strategy", &self.accumulator.name())
            .finish()
    }
}

impl DeformableSurface {
    /// Create a surface from its rest pose.
    pub fn new(rest: Vec<Vec3>, config: SurfaceConfig) -> Result<Self> {
        config.validate()?;
        let material = Material::from_config(&config.material, &config.limits)?;
        let accumulator = create_accumulator(config.strategy, config.workgroup_size);
        debug!(
            "Created surface: {} vertices, mu={}, nu={}, strategy={}",
            rest.len(),
            material.mu(),
            material.nu(),
            accumulator.name()
        );
        Ok(Self {
            displaced: rest.clone(),
            rest,
            indices: None,
            normals: Vec::new(),
            material,
            config,
            brushes: BrushSet::new(),
            preview: None,
            clock: 0.0,
            accumulator,
        })
    }

    /// Attach a triangle index buffer so normals follow the deformation.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self> {
        validate_indices(&indices, self.rest.len())?;
        compute_vertex_normals(&self.displaced, &indices, &mut self.normals);
        self.indices = Some(indices);
        Ok(self)
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// `(alpha, beta)` wave speeds, for display.
    pub fn alpha_beta(&self) -> (f32, f32) {
        self.material.alpha_beta()
    }

    /// Update stiffness. Brushes already placed keep their calibration.
    pub fn set_mu(&mut self, mu: f32) -> Result<()> {
        self.material.set_mu(mu)?;
        self.config.material.mu = mu;
        debug!(
            "Material mu={} -> alpha={}, beta={}",
            mu,
            self.material.alpha(),
            self.material.beta()
        );
        Ok(())
    }

    /// Update compressibility. Brushes already placed keep their calibration.
    pub fn set_nu(&mut self, nu: f32) -> Result<()> {
        self.material.set_nu(nu)?;
        self.config.material.nu = nu;
        debug!(
            "Material nu={} -> alpha={}, beta={}",
            nu,
            self.material.alpha(),
            self.material.beta()
        );
        Ok(())
    }

    /// Switch between sequential and batched accumulation.
    pub fn set_strategy(&mut self, strategy: AccumulationStrategy) {
        if strategy != self.config.strategy {
            self.config.strategy = strategy;
            self.accumulator = create_accumulator(strategy, self.config.workgroup_size);
            debug!("Accumulation strategy set to {}", self.accumulator.name());
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.accumulator.name()
    }

    /// Time of the last update; new brushes trigger here.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Place a brush triggered at the current clock.
    pub fn place_brush(&mut self, request: BrushRequest) -> Result<BrushHandle> {
        self.place_brush_at(request, self.clock)
    }

    /// Place a brush with an explicit trigger time. A future trigger keeps it
    /// pending until the clock reaches it.
    pub fn place_brush_at(
        &mut self,
        request: BrushRequest,
        trigger_time: f32,
    ) -> Result<BrushHandle> {
        let handle = self.brushes.place(
            &request,
            &self.material,
            trigger_time,
            self.config.limits.max_time,
        )?;
        if request.kind == BrushKind::Grab && self.preview.take().is_some() {
            debug!("Cleared pending preview brush");
        }
        Ok(handle)
    }

    /// Queue a preview Grab brush for the next update only.
    ///
    /// It never enters the brush set and is evaluated at a fixed elapsed time.
    pub fn place_preview_brush(&mut self, anchor: Vec3, force: Vec3, eps: f32) -> Result<()> {
        let request = BrushRequest::grab(anchor, force, eps);
        if let Err(e) = request.validate() {
            warn!("Rejected preview brush: {}", e);
            return Err(e);
        }
        let force = calibration::preview(force, eps, &self.material);
        self.preview = Some(PointSample::new(
            anchor,
            eps,
            force,
            self.config.preview_elapsed,
        ));
        Ok(())
    }

    /// Remove a brush by handle (the only way a push brush ends).
    pub fn remove_brush(&mut self, handle: BrushHandle) -> Result<()> {
        self.brushes.remove(handle).map(|_| ())
    }

    pub fn brush(&self, handle: BrushHandle) -> Option<&Brush> {
        self.brushes.get(handle)
    }

    /// Lifetime progress of a brush at the current clock, in `[0, 1]`, for
    /// progress readouts. Push brushes stay at 0.
    pub fn brush_life(&self, handle: BrushHandle) -> Option<f32> {
        self.brushes.get(handle).map(|brush| brush.life(self.clock))
    }

    pub fn brushes(&self) -> impl Iterator<Item = &Brush> {
        self.brushes.iter()
    }

    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    /// Drop every brush and any pending preview.
    pub fn clear_brushes(&mut self) {
        self.brushes.clear();
        self.preview = None;
    }

    /// Recompute the displaced pose at time `now`.
    pub fn update(&mut self, now: f32) -> FrameStats {
        self.clock = now;
        let expired = self.brushes.prune_expired(now);

        let mut plan = self.brushes.plan(now);
        plan.preview = self.preview.take();

        self.displaced.copy_from_slice(&self.rest);

        if !plan.is_empty() {
            let ctx = FieldContext::new(&self.material, &self.config.limits);
            self.accumulator
                .accumulate(&self.rest, &plan, &ctx, &mut self.displaced);
        }

        if self.config.recompute_normals {
            if let Some(indices) = &self.indices {
                compute_vertex_normals(&self.displaced, indices, &mut self.normals);
            }
        }

        let stats = FrameStats {
            expired,
            point_brushes: plan.point_count(),
            affine_brushes: plan.affine_count(),
            preview: plan.preview.is_some(),
        };
        debug!("Frame t={:.3}: {:?}", now, stats);
        stats
    }

    pub fn rest_vertices(&self) -> &[Vec3] {
        &self.rest
    }

    pub fn displaced_vertices(&self) -> &[Vec3] {
        &self.displaced
    }

    /// Vertex normals of the displaced pose; empty without an index buffer.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.rest.len()
    }
}
