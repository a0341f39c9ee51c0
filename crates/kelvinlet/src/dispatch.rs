//! Field accumulation strategies.
//!
//! Both strategies evaluate the same [`FramePlan`] against the rest pose and
//! add every brush contribution into the displaced buffer. They differ only
//! in how the work is laid out:
//!
//! - [`SequentialAccumulator`]: one vertex at a time, every brush in turn.
//! - [`BatchedAccumulator`]: samples are uploaded as flat `f32` buffers and
//!   each brush set is dispatched over fixed-size vertex workgroups in
//!   parallel, one dispatch per set.
//!
//! Per vertex, both add sets in plan order and brushes in set order, so their
//! outputs are bitwise identical.

use glam::Vec3;
use kelvinlet_config::{AccumulationStrategy, DEFAULT_WORKGROUP_SIZE};
use rayon::prelude::*;
use tracing::trace;

use crate::brush::FramePlan;
use crate::displacement::{displacement, FieldContext};
use crate::types::{AffineSample, BrushSample, PointSample};

/// Strategy that accumulates a frame's brush field into vertex positions.
pub trait FieldAccumulator: Send + Sync {
    /// Human-readable strategy name.
    fn name(&self) -> &str;

    /// Add every active contribution in `plan` to `displaced`.
    ///
    /// `displaced` must already hold the rest pose and have the same length
    /// as `rest`; queries are always made at the rest position.
    fn accumulate(
        &mut self,
        rest: &[Vec3],
        plan: &FramePlan,
        ctx: &FieldContext,
        displaced: &mut [Vec3],
    );
}

/// Build the accumulator for a configured strategy.
pub fn create_accumulator(
    strategy: AccumulationStrategy,
    workgroup_size: usize,
) -> Box<dyn FieldAccumulator> {
    match strategy {
        AccumulationStrategy::Sequential => Box::new(SequentialAccumulator),
        AccumulationStrategy::Batched => Box::new(BatchedAccumulator::new(workgroup_size)),
    }
}

/// Number of workgroups needed to cover `vertex_count` vertices.
pub fn workgroup_count(vertex_count: usize, workgroup_size: usize) -> usize {
    vertex_count.div_ceil(workgroup_size.max(1))
}

/// Sum the samples of one set into a single vertex, in set order.
#[inline]
fn accumulate_vertex(
    position: &mut Vec3,
    query: Vec3,
    samples: impl Iterator<Item = BrushSample>,
    ctx: &FieldContext,
) {
    for sample in samples {
        *position += displacement(&sample, query, ctx);
    }
}

/// Single-threaded vertex loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialAccumulator;

impl FieldAccumulator for SequentialAccumulator {
    fn name(&self) -> &str {
        "sequential"
    }

    fn accumulate(
        &mut self,
        rest: &[Vec3],
        plan: &FramePlan,
        ctx: &FieldContext,
        displaced: &mut [Vec3],
    ) {
        for (position, &query) in displaced.iter_mut().zip(rest) {
            accumulate_vertex(
                position,
                query,
                plan.push.iter().map(|s| BrushSample::PushPoint(*s)),
                ctx,
            );
            accumulate_vertex(
                position,
                query,
                plan.preview.iter().map(|s| BrushSample::PulsePoint(*s)),
                ctx,
            );
            accumulate_vertex(
                position,
                query,
                plan.pulse.iter().map(|s| BrushSample::PulsePoint(*s)),
                ctx,
            );
            accumulate_vertex(
                position,
                query,
                plan.affine.iter().map(|s| BrushSample::Affine(*s)),
                ctx,
            );
        }
    }
}

/// Which flat buffer a dispatch reads and how to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetKind {
    Push,
    Pulse,
    Affine,
}

/// Workgroup-parallel accumulation over flat sample buffers.
#[derive(Debug)]
pub struct BatchedAccumulator {
    workgroup_size: usize,
    /// Staging buffers, reused across frames
    point_staging: Vec<f32>,
    affine_staging: Vec<f32>,
}

impl Default for BatchedAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_WORKGROUP_SIZE)
    }
}

impl BatchedAccumulator {
    pub fn new(workgroup_size: usize) -> Self {
        Self {
            workgroup_size: workgroup_size.max(1),
            point_staging: Vec::new(),
            affine_staging: Vec::new(),
        }
    }

    pub fn workgroup_size(&self) -> usize {
        self.workgroup_size
    }

    /// Upload a set of Pod samples into a staging buffer.
    fn upload<T: bytemuck::Pod>(staging: &mut Vec<f32>, samples: &[T]) {
        staging.clear();
        staging.extend_from_slice(bytemuck::cast_slice(samples));
    }

    /// Run one dispatch: every workgroup adds the whole set to its vertices.
    fn dispatch(
        &self,
        kind: SetKind,
        staging: &[f32],
        rest: &[Vec3],
        ctx: &FieldContext,
        displaced: &mut [Vec3],
    ) {
        let brush_count = match kind {
            SetKind::Push | SetKind::Pulse => staging.len() / POINT_FLOATS,
            SetKind::Affine => staging.len() / AFFINE_FLOATS,
        };
        if brush_count == 0 {
            return;
        }
        let size = self.workgroup_size;
        trace!(
            "Dispatch {:?}: {} workgroups x {} brushes",
            kind,
            workgroup_count(rest.len(), size),
            brush_count
        );

        displaced
            .par_chunks_mut(size)
            .zip(rest.par_chunks(size))
            .for_each(|(out, queries)| {
                for (position, &query) in out.iter_mut().zip(queries) {
                    match kind {
                        SetKind::Push => {
                            let samples: &[PointSample] = bytemuck::cast_slice(staging);
                            accumulate_vertex(
                                position,
                                query,
                                samples.iter().map(|s| BrushSample::PushPoint(*s)),
                                ctx,
                            );
                        }
                        SetKind::Pulse => {
                            let samples: &[PointSample] = bytemuck::cast_slice(staging);
                            accumulate_vertex(
                                position,
                                query,
                                samples.iter().map(|s| BrushSample::PulsePoint(*s)),
                                ctx,
                            );
                        }
                        SetKind::Affine => {
                            let samples: &[AffineSample] = bytemuck::cast_slice(staging);
                            accumulate_vertex(
                                position,
                                query,
                                samples.iter().map(|s| BrushSample::Affine(*s)),
                                ctx,
                            );
                        }
                    }
                }
            });
    }
}

const POINT_FLOATS: usize = std::mem::size_of::<PointSample>() / std::mem::size_of::<f32>();
const AFFINE_FLOATS: usize = std::mem::size_of::<AffineSample>() / std::mem::size_of::<f32>();

impl FieldAccumulator for BatchedAccumulator {
    fn name(&self) -> &str {
        "batched"
    }

    fn accumulate(
        &mut self,
        rest: &[Vec3],
        plan: &FramePlan,
        ctx: &FieldContext,
        displaced: &mut [Vec3],
    ) {
        let mut point_staging = std::mem::take(&mut self.point_staging);
        let mut affine_staging = std::mem::take(&mut self.affine_staging);

        Self::upload(&mut point_staging, &plan.push);
        self.dispatch(SetKind::Push, &point_staging, rest, ctx, displaced);

        // Preview goes first so it is summed before the pulses
        point_staging.clear();
        if let Some(preview) = &plan.preview {
            point_staging.extend_from_slice(bytemuck::cast_slice(std::slice::from_ref(preview)));
        }
        point_staging.extend_from_slice(bytemuck::cast_slice(&plan.pulse));
        self.dispatch(SetKind::Pulse, &point_staging, rest, ctx, displaced);

        Self::upload(&mut affine_staging, &plan.affine);
        self.dispatch(SetKind::Affine, &affine_staging, rest, ctx, displaced);

        self.point_staging = point_staging;
        self.affine_staging = affine_staging;
    }
}
