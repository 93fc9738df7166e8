//! Conversion between pointer coordinates and logical canvas coordinates.
//!
//! Pointer events arrive in client space (relative to the page). The canvas
//! container sits at `origin` within that space, the interactive
//! [`Transform`] maps canvas space into the container, and the diagram layer
//! may carry its own fixed `layer_scale` on top of that.

use crate::viewport::Transform;
use kurbo::{Point, Size, Vec2};

/// Maps points between client space and canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    /// Top-left of the canvas container in client space.
    pub origin: Point,
    /// Size of the canvas container.
    pub size: Size,
    /// Fixed scale of the inner diagram layer.
    pub layer_scale: f64,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self {
            origin: Point::ZERO,
            size: Size::new(
                crate::config::DEFAULT_CANVAS_WIDTH,
                crate::config::DEFAULT_CANVAS_HEIGHT,
            ),
            layer_scale: crate::config::LAYER_SCALE,
        }
    }
}

impl CoordinateConverter {
    pub fn new(origin: Point, size: Size, layer_scale: f64) -> Self {
        Self {
            origin,
            size,
            layer_scale,
        }
    }

    /// Follow a container move/resize.
    pub fn set_bounds(&mut self, origin: Point, size: Size) {
        self.origin = origin;
        self.size = size;
    }

    /// Convert a client-space point to canvas coordinates.
    pub fn to_canvas(&self, transform: &Transform, client: Point) -> Point {
        let local = client - self.origin.to_vec2();
        let canvas = transform.inverse_affine() * local;
        Point::new(canvas.x / self.layer_scale, canvas.y / self.layer_scale)
    }

    /// Convert a canvas point to client-space coordinates.
    pub fn to_viewport(&self, transform: &Transform, canvas: Point) -> Point {
        self.to_local(transform, canvas) + self.origin.to_vec2()
    }

    /// Project a canvas point into container-local coordinates.
    pub fn to_local(&self, transform: &Transform, canvas: Point) -> Point {
        let layer = Point::new(canvas.x * self.layer_scale, canvas.y * self.layer_scale);
        transform.affine() * layer
    }

    /// Convert a client-space delta to a canvas-space delta.
    pub fn delta_to_canvas(&self, transform: &Transform, delta: Vec2) -> Vec2 {
        delta / (transform.scale * self.layer_scale)
    }

    /// Whether a canvas point projects inside the container, expanded by `margin`.
    pub fn is_visible(&self, transform: &Transform, canvas: Point, margin: f64) -> bool {
        let local = self.to_local(transform, canvas);
        local.x >= -margin
            && local.y >= -margin
            && local.x <= self.size.width + margin
            && local.y <= self.size.height + margin
    }
}
