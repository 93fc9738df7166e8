//! Editor configuration.
//!
//! The constants are the built-in defaults. A host can override any of them at
//! startup by deserializing an [`EditorConfig`]; missing fields fall back to the
//! defaults.

use kurbo::{Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Smallest internal scale the viewport accepts.
pub const MIN_ZOOM: f64 = 1.0;
/// Largest internal scale the viewport accepts.
pub const MAX_ZOOM: f64 = 5.0;
/// Scale increment used by the zoom in/out buttons.
pub const ZOOM_STEP: f64 = 0.1;
/// Scale change per wheel delta unit during a pinch/ctrl-wheel gesture.
pub const ZOOM_SENSITIVITY: f64 = 0.001;
/// Internal scale that the UI presents as "100%".
///
/// Deliberately above [`MIN_ZOOM`] so the user can zoom out below 100%.
pub const BASELINE_SCALE: f64 = 1.5;
/// At or below this scale the content fits the viewport and panning is disabled.
pub const PAN_DISABLED_THRESHOLD: f64 = 1.0;
/// Fixed scale of the diagram layer inside the zoomable canvas.
pub const LAYER_SCALE: f64 = 1.0;

/// Default canvas dimensions used for pan clamping until the host reports a size.
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Side length of a node's square footprint in canvas units.
pub const NODE_SIZE: f64 = 55.0;
/// Output port offset from the node centre (right edge, vertically centred).
pub const OUTPUT_PORT_OFFSET_X: f64 = NODE_SIZE / 2.0;
pub const OUTPUT_PORT_OFFSET_Y: f64 = 0.0;
/// Input port offset from the node centre (left edge, vertically centred).
pub const INPUT_PORT_OFFSET_X: f64 = -NODE_SIZE / 2.0;
pub const INPUT_PORT_OFFSET_Y: f64 = 0.0;

/// Pointer travel in screen pixels below which a drag counts as stationary.
pub const DRAG_THRESHOLD: f64 = 2.0;
/// Padding kept around content by zoom-to-fit, in viewport pixels.
pub const ZOOM_TO_FIT_PADDING: f64 = 50.0;

/// Maximum number of annotation snapshots kept for undo/redo.
pub const HISTORY_LIMIT: usize = 50;
/// Coalescing window for debounced history saves.
pub const HISTORY_DEBOUNCE: Duration = Duration::from_millis(300);
/// Upper bound on how long an annotation restore may take before it is
/// treated as complete.
pub const RESTORE_TIMEOUT: Duration = Duration::from_millis(300);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Zoom bounds out of order: min {min} > max {max}")]
    ZoomBounds { min: f64, max: f64 },
    #[error("Baseline scale {baseline} outside [{min}, {max}]")]
    Baseline { baseline: f64, min: f64, max: f64 },
    #[error("{0} must be a positive finite number")]
    NotPositive(&'static str),
}

/// Zoom and pan limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub zoom_sensitivity: f64,
    pub baseline_scale: f64,
    pub pan_disabled_threshold: f64,
    pub layer_scale: f64,
    pub canvas_size: Size,
    pub zoom_to_fit_padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_step: ZOOM_STEP,
            zoom_sensitivity: ZOOM_SENSITIVITY,
            baseline_scale: BASELINE_SCALE,
            pan_disabled_threshold: PAN_DISABLED_THRESHOLD,
            layer_scale: LAYER_SCALE,
            canvas_size: Size::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT),
            zoom_to_fit_padding: ZOOM_TO_FIT_PADDING,
        }
    }
}

/// Node footprint and port anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeGeometry {
    pub size: f64,
    pub output_port: Vec2,
    pub input_port: Vec2,
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self {
            size: NODE_SIZE,
            output_port: Vec2::new(OUTPUT_PORT_OFFSET_X, OUTPUT_PORT_OFFSET_Y),
            input_port: Vec2::new(INPUT_PORT_OFFSET_X, INPUT_PORT_OFFSET_Y),
        }
    }
}

/// Pointer gesture tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub drag_threshold: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: DRAG_THRESHOLD,
        }
    }
}

/// Annotation history settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub limit: usize,
    #[serde(with = "millis")]
    pub debounce: Duration,
    #[serde(with = "millis")]
    pub restore_timeout: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: HISTORY_LIMIT,
            debounce: HISTORY_DEBOUNCE,
            restore_timeout: RESTORE_TIMEOUT,
        }
    }
}

/// Top-level editor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub viewport: ViewportConfig,
    pub nodes: NodeGeometry,
    pub interaction: InteractionConfig,
    pub history: HistoryConfig,
}

impl EditorConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a usable viewport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vp = &self.viewport;
        for (name, value) in [
            ("min_zoom", vp.min_zoom),
            ("max_zoom", vp.max_zoom),
            ("baseline_scale", vp.baseline_scale),
            ("layer_scale", vp.layer_scale),
            ("canvas_size.width", vp.canvas_size.width),
            ("canvas_size.height", vp.canvas_size.height),
            ("nodes.size", self.nodes.size),
        ] {
            if !is_positive(value) {
                return Err(ConfigError::NotPositive(name));
            }
        }
        if vp.min_zoom > vp.max_zoom {
            return Err(ConfigError::ZoomBounds {
                min: vp.min_zoom,
                max: vp.max_zoom,
            });
        }
        if vp.baseline_scale < vp.min_zoom || vp.baseline_scale > vp.max_zoom {
            return Err(ConfigError::Baseline {
                baseline: vp.baseline_scale,
                min: vp.min_zoom,
                max: vp.max_zoom,
            });
        }
        if self.history.limit == 0 {
            return Err(ConfigError::NotPositive("history.limit"));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
