//! Brush placement and lifetime bookkeeping.
//!
//! A [`BrushRequest`] is what the input layer produces. Placing it validates
//! the request, calibrates its force against the current material and turns
//! it into a [`Brush`] owned by a [`BrushSet`]. Each frame the set prunes
//! expired pulses and reduces the remaining brushes to flat samples.

use glam::Vec3;
use kelvinlet_config::BrushDefaults;
use tracing::{debug, warn};

use crate::calibration;
use crate::error::{KelvinletError, Result};
use crate::material::Material;
use crate::types::{
    AffineSample, BrushForce, BrushHandle, BrushKind, BrushMode, BrushSample, BrushState,
    PointSample,
};

/// Request to place a brush on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushRequest {
    pub kind: BrushKind,
    pub mode: BrushMode,
    /// Anchor in mesh-local coordinates
    pub anchor: Vec3,
    /// Raw (uncalibrated) force
    pub force: BrushForce,
    /// Regularization radius, must be > 0
    pub epsilon: f32,
}

impl BrushRequest {
    pub fn new(
        kind: BrushKind,
        mode: BrushMode,
        anchor: Vec3,
        force: BrushForce,
        epsilon: f32,
    ) -> Self {
        Self {
            kind,
            mode,
            anchor,
            force,
            epsilon,
        }
    }

    /// Grab pulse with a vector force.
    pub fn grab(anchor: Vec3, force: Vec3, epsilon: f32) -> Self {
        Self::new(
            BrushKind::Grab,
            BrushMode::Pulse,
            anchor,
            BrushForce::Vector(force),
            epsilon,
        )
    }

    /// Build a request from a surface hit in mesh-local space.
    ///
    /// The anchor is lifted off the surface by `defaults.offset` along the
    /// normal, and the force is the preset for `kind` at `defaults.strength`.
    pub fn from_surface_hit(
        kind: BrushKind,
        mode: BrushMode,
        point: Vec3,
        normal: Vec3,
        defaults: &BrushDefaults,
    ) -> Self {
        let normal = normal.normalize_or_zero();
        Self::new(
            kind,
            mode,
            point + normal * defaults.offset,
            BrushForce::from_strength(kind, defaults.strength, normal),
            defaults.radius,
        )
    }

    /// Check the request before any calibration math sees it.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(KelvinletError::InvalidEpsilon(self.epsilon));
        }
        if !self.anchor.is_finite() {
            return Err(KelvinletError::NonFiniteAnchor);
        }
        if !self.force.is_finite() {
            return Err(KelvinletError::NonFiniteForce);
        }
        Ok(())
    }
}

/// A placed, calibrated brush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    handle: BrushHandle,
    kind: BrushKind,
    mode: BrushMode,
    anchor: Vec3,
    eps: f32,
    force: BrushForce,
    trigger_time: f32,
    max_time: f32,
}

impl Brush {
    /// Validate and calibrate a request into a brush triggered at `trigger_time`.
    pub fn from_request(
        handle: BrushHandle,
        request: &BrushRequest,
        material: &Material,
        trigger_time: f32,
        max_time: f32,
    ) -> Result<Self> {
        request.validate()?;
        let force = calibration::calibrate(
            request.kind,
            request.mode,
            request.force,
            request.epsilon,
            material,
        )?;
        Ok(Self {
            handle,
            kind: request.kind,
            mode: request.mode,
            anchor: request.anchor,
            eps: request.epsilon,
            force,
            trigger_time,
            max_time,
        })
    }

    pub fn handle(&self) -> BrushHandle {
        self.handle
    }

    pub fn kind(&self) -> BrushKind {
        self.kind
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn epsilon(&self) -> f32 {
        self.eps
    }

    /// Calibrated force.
    pub fn force(&self) -> BrushForce {
        self.force
    }

    pub fn trigger_time(&self) -> f32 {
        self.trigger_time
    }

    pub fn elapsed(&self, now: f32) -> f32 {
        now - self.trigger_time
    }

    /// Pending before the trigger, expired once a pulse outlives `max_time`.
    pub fn state(&self, now: f32) -> BrushState {
        let elapsed = self.elapsed(now);
        if elapsed <= 0.0 {
            BrushState::Pending
        } else if self.mode == BrushMode::Pulse && elapsed >= self.max_time {
            BrushState::Expired
        } else {
            BrushState::Active
        }
    }

    pub fn is_active(&self, now: f32) -> bool {
        self.state(now) == BrushState::Active
    }

    pub fn is_expired(&self, now: f32) -> bool {
        self.state(now) == BrushState::Expired
    }

    /// Fraction of the pulse lifetime consumed, in `[0, 1]`. Push brushes
    /// report 0.
    pub fn life(&self, now: f32) -> f32 {
        match self.mode {
            BrushMode::Push => 0.0,
            BrushMode::Pulse => (self.elapsed(now) / self.max_time).clamp(0.0, 1.0),
        }
    }

    /// Reduce to the flat per-frame sample, or `None` if not active.
    pub fn sample(&self, now: f32) -> Option<BrushSample> {
        if !self.is_active(now) {
            return None;
        }
        let dt = self.elapsed(now);
        let sample = match (self.mode, self.force) {
            (BrushMode::Pulse, BrushForce::Vector(f)) => {
                BrushSample::PulsePoint(PointSample::new(self.anchor, self.eps, f, dt))
            }
            (BrushMode::Push, BrushForce::Vector(f)) => {
                BrushSample::PushPoint(PointSample::new(self.anchor, self.eps, f, dt))
            }
            (_, BrushForce::Tensor(m)) => {
                BrushSample::Affine(AffineSample::new(self.anchor, self.eps, m, dt))
            }
        };
        Some(sample)
    }
}

/// Active brushes split by evaluation path, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    /// Elastostatic point brushes
    pub push: Vec<PointSample>,
    /// Single-frame preview sample
    pub preview: Option<PointSample>,
    /// Elastodynamic point brushes
    pub pulse: Vec<PointSample>,
    /// Affine tensor brushes
    pub affine: Vec<AffineSample>,
}

impl FramePlan {
    pub fn is_empty(&self) -> bool {
        self.push.is_empty()
            && self.preview.is_none()
            && self.pulse.is_empty()
            && self.affine.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.push.len() + self.pulse.len() + usize::from(self.preview.is_some())
    }

    pub fn affine_count(&self) -> usize {
        self.affine.len()
    }

    pub fn push_sample(&mut self, sample: BrushSample) {
        match sample {
            BrushSample::PushPoint(s) => self.push.push(s),
            BrushSample::PulsePoint(s) => self.pulse.push(s),
            BrushSample::Affine(s) => self.affine.push(s),
        }
    }
}

/// Brush collection owned by a surface.
///
/// Only mutated between frames; iteration order is placement order.
#[derive(Debug, Default)]
pub struct BrushSet {
    brushes: Vec<Brush>,
    next_handle: u64,
}

impl BrushSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrate and store a brush. Returns its handle.
    pub fn place(
        &mut self,
        request: &BrushRequest,
        material: &Material,
        trigger_time: f32,
        max_time: f32,
    ) -> Result<BrushHandle> {
        let handle = BrushHandle(self.next_handle);
        let brush = match Brush::from_request(handle, request, material, trigger_time, max_time) {
            Ok(brush) => brush,
            Err(e) => {
                warn!("Rejected {:?} {:?} brush: {}", request.kind, request.mode, e);
                return Err(e);
            }
        };
        self.next_handle += 1;
        debug!(
            "Placed {:?} {:?} brush {:?} at {:?} (eps={})",
            brush.kind, brush.mode, handle, brush.anchor, brush.eps
        );
        self.brushes.push(brush);
        Ok(handle)
    }

    /// Remove a brush explicitly (the only way a push brush ends).
    pub fn remove(&mut self, handle: BrushHandle) -> Result<Brush> {
        let index = self
            .brushes
            .iter()
            .position(|b| b.handle == handle)
            .ok_or(KelvinletError::UnknownBrush(handle))?;
        debug!("Removed brush {:?}", handle);
        Ok(self.brushes.remove(index))
    }

    pub fn get(&self, handle: BrushHandle) -> Option<&Brush> {
        self.brushes.iter().find(|b| b.handle == handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brush> {
        self.brushes.iter()
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }

    pub fn clear(&mut self) {
        self.brushes.clear();
    }

    /// Drop every pulse whose lifetime has run out. Returns how many.
    pub fn prune_expired(&mut self, now: f32) -> usize {
        let before = self.brushes.len();
        self.brushes.retain(|b| !b.is_expired(now));
        let pruned = before - self.brushes.len();
        if pruned > 0 {
            debug!("Pruned {} expired brushes", pruned);
        }
        pruned
    }

    /// Classify active brushes into a dispatch plan.
    pub fn plan(&self, now: f32) -> FramePlan {
        let mut plan = FramePlan::default();
        for sample in self.brushes.iter().filter_map(|b| b.sample(now)) {
            plan.push_sample(sample);
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat3;
    use kelvinlet_config::KernelLimits;

    const MAX_TIME: f32 = 4.0;

    fn material() -> Material {
        Material::new(60.0, 0.3, &KernelLimits::default()).unwrap()
    }

    fn pulse(anchor: Vec3) -> BrushRequest {
        BrushRequest::grab(anchor, Vec3::Y, 0.5)
    }

    #[test]
    fn test_pulse_lifecycle() {
        let mut set = BrushSet::new();
        let handle = set.place(&pulse(Vec3::ZERO), &material(), 1.0, MAX_TIME).unwrap();
        let brush = *set.get(handle).unwrap();

        assert_eq!(brush.state(0.5), BrushState::Pending);
        assert_eq!(brush.state(1.0), BrushState::Pending);
        assert_eq!(brush.state(1.001), BrushState::Active);
        assert_eq!(brush.state(4.9), BrushState::Active);
        assert_eq!(brush.state(5.0), BrushState::Expired);
        assert_eq!(brush.state(50.0), BrushState::Expired);
    }

    #[test]
    fn test_pulse_active_strictly_inside_lifetime() {
        let brush =
            Brush::from_request(BrushHandle(0), &pulse(Vec3::ZERO), &material(), 0.0, MAX_TIME)
                .unwrap();
        for i in 1..400 {
            let t = i as f32 * 0.01;
            assert!(brush.is_active(t), "t={t}");
        }
        for t in [MAX_TIME, MAX_TIME + 0.001, 10.0] {
            assert!(!brush.is_active(t));
        }
        assert!(!brush.is_active(0.0));
    }

    #[test]
    fn test_push_never_expires() {
        let request = BrushRequest::new(
            BrushKind::Grab,
            BrushMode::Push,
            Vec3::ZERO,
            BrushForce::Vector(Vec3::X),
            0.5,
        );
        let mut set = BrushSet::new();
        let handle = set.place(&request, &material(), 0.0, MAX_TIME).unwrap();
        assert_eq!(set.prune_expired(1000.0), 0);
        assert!(set.get(handle).unwrap().is_active(1000.0));
        assert_eq!(set.get(handle).unwrap().life(1000.0), 0.0);

        set.remove(handle).unwrap();
        assert!(set.is_empty());
        assert!(matches!(
            set.remove(handle),
            Err(KelvinletError::UnknownBrush(_))
        ));
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let mut set = BrushSet::new();
        set.place(&pulse(Vec3::ZERO), &material(), 0.0, MAX_TIME).unwrap();
        let late = set.place(&pulse(Vec3::X), &material(), 3.0, MAX_TIME).unwrap();
        assert_eq!(set.prune_expired(4.5), 1);
        assert_eq!(set.len(), 1);
        assert!(set.get(late).is_some());
    }

    #[test]
    fn test_rejects_degenerate_epsilon() {
        let mut set = BrushSet::new();
        for eps in [0.0_f32, -0.5, f32::NAN, f32::INFINITY] {
            let request = BrushRequest::grab(Vec3::ZERO, Vec3::Y, eps);
            assert!(matches!(
                set.place(&request, &material(), 0.0, MAX_TIME),
                Err(KelvinletError::InvalidEpsilon(_))
            ));
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_rejects_non_finite_inputs() {
        let request = BrushRequest::grab(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), 0.5);
        assert!(matches!(
            request.validate(),
            Err(KelvinletError::NonFiniteForce)
        ));
        let request = BrushRequest::grab(Vec3::splat(f32::INFINITY), Vec3::Y, 0.5);
        assert!(matches!(
            request.validate(),
            Err(KelvinletError::NonFiniteAnchor)
        ));
    }

    #[test]
    fn test_handles_are_unique_after_rejection() {
        let mut set = BrushSet::new();
        let a = set.place(&pulse(Vec3::ZERO), &material(), 0.0, MAX_TIME).unwrap();
        let bad = BrushRequest::grab(Vec3::ZERO, Vec3::Y, 0.0);
        assert!(set.place(&bad, &material(), 0.0, MAX_TIME).is_err());
        let b = set.place(&pulse(Vec3::ZERO), &material(), 0.0, MAX_TIME).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plan_classifies_brushes() {
        let m = material();
        let mut set = BrushSet::new();
        set.place(&pulse(Vec3::ZERO), &m, 0.0, MAX_TIME).unwrap();
        set.place(
            &BrushRequest::new(
                BrushKind::Grab,
                BrushMode::Push,
                Vec3::ZERO,
                BrushForce::Vector(Vec3::X),
                0.5,
            ),
            &m,
            0.0,
            MAX_TIME,
        )
        .unwrap();
        set.place(
            &BrushRequest::new(
                BrushKind::Scale,
                BrushMode::Pulse,
                Vec3::ZERO,
                BrushForce::Tensor(Mat3::IDENTITY),
                0.5,
            ),
            &m,
            0.0,
            MAX_TIME,
        )
        .unwrap();
        // Triggered later, still pending at t = 0.5
        set.place(&pulse(Vec3::ONE), &m, 1.0, MAX_TIME).unwrap();

        let plan = set.plan(0.5);
        assert_eq!(plan.pulse.len(), 1);
        assert_eq!(plan.push.len(), 1);
        assert_eq!(plan.affine.len(), 1);
        assert_eq!(plan.point_count(), 2);
        assert!((plan.pulse[0].dt - 0.5).abs() < 1e-6);
        assert!(set.plan(0.0).is_empty());
    }

    #[test]
    fn test_surface_hit_request() {
        let defaults = BrushDefaults::default();
        let request = BrushRequest::from_surface_hit(
            BrushKind::Grab,
            BrushMode::Pulse,
            Vec3::ZERO,
            Vec3::new(0.0, 2.0, 0.0),
            &defaults,
        );
        assert!((request.anchor - Vec3::new(0.0, defaults.offset, 0.0)).length() < 1e-6);
        assert_eq!(request.epsilon, defaults.radius);
        assert_eq!(request.force, BrushForce::Vector(Vec3::Y * defaults.strength));
    }

    #[test]
    fn test_sample_carries_calibrated_force() {
        let brush =
            Brush::from_request(BrushHandle(7), &pulse(Vec3::ZERO), &material(), 0.0, MAX_TIME)
                .unwrap();
        match brush.sample(0.25) {
            Some(BrushSample::PulsePoint(s)) => {
                assert!((s.force[1] - 19.3649).abs() < 1e-3);
                assert_eq!(s.dt, 0.25);
            }
            other => panic!("unexpected sample {other:?}"),
        }
        assert!(brush.sample(MAX_TIME).is_none());
    }
}
