//! Annotation tools.

use serde::{Deserialize, Serialize};

/// Available annotation tools.
///
/// `Select` is the neutral tool: with it active, pointer input drives the
/// diagram (pan, drag, connect). Every other tool hands pointer input to the
/// annotation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTool {
    #[default]
    Select,
    Rectangle,
    Circle,
    Freedraw,
    Arrow,
    Line,
    Text,
}

impl AnnotationTool {
    pub const ALL: [AnnotationTool; 7] = [
        AnnotationTool::Select,
        AnnotationTool::Rectangle,
        AnnotationTool::Circle,
        AnnotationTool::Freedraw,
        AnnotationTool::Arrow,
        AnnotationTool::Line,
        AnnotationTool::Text,
    ];

    /// Whether this is the neutral select tool.
    pub fn is_neutral(self) -> bool {
        self == AnnotationTool::Select
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            AnnotationTool::Select => "Select",
            AnnotationTool::Rectangle => "Rectangle",
            AnnotationTool::Circle => "Circle",
            AnnotationTool::Freedraw => "Draw",
            AnnotationTool::Arrow => "Arrow",
            AnnotationTool::Line => "Line",
            AnnotationTool::Text => "Text",
        }
    }
}
