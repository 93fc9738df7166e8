//! Viewport module for pan/zoom transforms.

use crate::config::ViewportConfig;
use kurbo::{Affine, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Viewport errors.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ViewportError {
    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
    #[error("Invalid pan delta: ({0}, {1})")]
    InvalidDelta(f64, f64),
}

/// The interactive canvas transform.
///
/// Serialized with the field names the persisted workspace uses
/// (`scale`, `translateX`, `translateY`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for Transform {
    /// The baseline view (displayed as 100%).
    fn default() -> Self {
        Self::new(crate::config::BASELINE_SCALE, 0.0, 0.0)
    }
}

impl Transform {
    pub fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// Current translation as a vector.
    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.translate_x, self.translate_y)
    }

    /// Affine transform from canvas space to viewport space.
    pub fn affine(&self) -> Affine {
        Affine::translate(self.translation()) * Affine::scale(self.scale)
    }

    /// Inverse of [`Transform::affine`].
    pub fn inverse_affine(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.translation())
    }
}

/// Clamp translation so scaled content cannot be dragged past its own edge.
///
/// At or below `threshold` the translation is forced to zero.
pub fn constrain_pan(transform: Transform, canvas: Size, threshold: f64) -> Transform {
    if transform.scale <= threshold {
        return Transform::new(transform.scale, 0.0, 0.0);
    }

    let max_x = ((canvas.width * transform.scale - canvas.width) / 2.0).max(0.0);
    let max_y = ((canvas.height * transform.scale - canvas.height) / 2.0).max(0.0);

    Transform::new(
        transform.scale,
        transform.translate_x.clamp(-max_x, max_x),
        transform.translate_y.clamp(-max_y, max_y),
    )
}

fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Viewport owns the interactive transform and keeps it inside its bounds.
#[derive(Debug, Clone)]
pub struct Viewport {
    transform: Transform,
    /// Minimum allowed scale.
    pub min_zoom: f64,
    /// Maximum allowed scale.
    pub max_zoom: f64,
    /// Scale presented to the user as 100%.
    pub baseline: f64,
    /// Increment used by zoom in/out.
    pub zoom_step: f64,
    /// Scale at or below which panning is disabled.
    pub pan_disabled_threshold: f64,
    canvas_size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl Viewport {
    /// Create a viewport at the baseline scale.
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            transform: Transform::new(config.baseline_scale, 0.0, 0.0),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            baseline: config.baseline_scale,
            zoom_step: config.zoom_step,
            pan_disabled_threshold: config.pan_disabled_threshold,
            canvas_size: config.canvas_size,
        }
    }

    /// Current transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Current scale.
    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    /// Canvas dimensions used for pan clamping.
    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Update the canvas dimensions and re-clamp the current pan.
    pub fn set_canvas_size(&mut self, size: Size) {
        if !(is_valid_scale(size.width) && is_valid_scale(size.height)) {
            log::debug!("Ignoring invalid canvas size {:?}", size);
            return;
        }
        self.canvas_size = size;
        self.transform = self.constrained(self.transform);
    }

    /// Clamp a scale to the zoom bounds.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_zoom, self.max_zoom)
    }

    fn constrained(&self, transform: Transform) -> Transform {
        constrain_pan(transform, self.canvas_size, self.pan_disabled_threshold)
    }

    /// Set the scale, rejecting non-finite or non-positive values.
    pub fn try_zoom_to(&mut self, scale: f64) -> Result<(), ViewportError> {
        if !is_valid_scale(scale) {
            return Err(ViewportError::InvalidScale(scale));
        }
        let next = Transform {
            scale: self.clamp_scale(scale),
            ..self.transform
        };
        self.transform = self.constrained(next);
        Ok(())
    }

    /// Set the scale. Invalid input leaves the transform unchanged.
    pub fn zoom_to(&mut self, scale: f64) {
        if let Err(e) = self.try_zoom_to(scale) {
            log::debug!("zoom_to rejected: {}", e);
        }
    }

    /// Change the scale by `step`.
    pub fn zoom_by(&mut self, step: f64) {
        self.zoom_to(self.transform.scale + step);
    }

    /// Zoom in by one step.
    pub fn zoom_in(&mut self) {
        self.zoom_by(self.zoom_step);
    }

    /// Zoom out by one step.
    pub fn zoom_out(&mut self) {
        self.zoom_by(-self.zoom_step);
    }

    /// Pan by a delta in viewport pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        let start = self.transform;
        self.pan_from(start, delta);
    }

    /// Apply `delta` to a transform captured earlier (e.g. at drag start).
    ///
    /// The scale is taken from the current transform so a zoom during the
    /// gesture is not undone.
    pub fn pan_from(&mut self, start: Transform, delta: Vec2) {
        if !(delta.x.is_finite() && delta.y.is_finite()) {
            log::debug!("pan rejected: {}", ViewportError::InvalidDelta(delta.x, delta.y));
            return;
        }
        let next = Transform::new(
            self.transform.scale,
            start.translate_x + delta.x,
            start.translate_y + delta.y,
        );
        self.transform = self.constrained(next);
    }

    /// Replace the transform (e.g. on restore), clamping it into bounds.
    pub fn set_transform(&mut self, transform: Transform) -> Result<(), ViewportError> {
        if !is_valid_scale(transform.scale) {
            return Err(ViewportError::InvalidScale(transform.scale));
        }
        if !(transform.translate_x.is_finite() && transform.translate_y.is_finite()) {
            return Err(ViewportError::InvalidDelta(transform.translate_x, transform.translate_y));
        }
        let next = Transform {
            scale: self.clamp_scale(transform.scale),
            ..transform
        };
        self.transform = self.constrained(next);
        Ok(())
    }

    /// Reset to the baseline scale with no pan.
    pub fn reset(&mut self) {
        self.transform = Transform::new(self.clamp_scale(self.baseline), 0.0, 0.0);
    }

    /// Fit the viewport to show the given bounding box.
    ///
    /// The result is pan-clamped like every other transform, so at low scales
    /// the bounds end up anchored at the canvas centre instead.
    pub fn zoom_to_fit(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() || !bounds.is_finite() {
            self.reset();
            return;
        }

        let padded = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );
        let fit = (padded.width / bounds.width()).min(padded.height / bounds.height());
        if !is_valid_scale(fit) {
            log::debug!("zoom_to_fit rejected: {}", ViewportError::InvalidScale(fit));
            return;
        }
        let scale = self.clamp_scale(fit);

        // Center the bounds in the viewport
        let center = bounds.center();
        let next = Transform::new(
            scale,
            viewport.width / 2.0 - center.x * scale,
            viewport.height / 2.0 - center.y * scale,
        );
        self.transform = self.constrained(next);
    }

    /// User-facing zoom percentage (baseline = 100%).
    pub fn zoom_percent(&self) -> f64 {
        self.transform.scale / self.baseline * 100.0
    }
}
