//! Element records: the drawing primitives stored in the repository.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Element type enumeration.
///
/// The type is set at creation and never changes afterwards; an update that
/// tries to retype an element is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Rectangle,
    Ellipse,
    Diamond,
    Text,
    Arrow,
    Line,
    Freedraw,
    Image,
    Frame,
    Embeddable,
}

impl ElementType {
    /// Parse a type name as it appears in the Excalidraw format.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rectangle" => Some(Self::Rectangle),
            "ellipse" => Some(Self::Ellipse),
            "diamond" => Some(Self::Diamond),
            "text" => Some(Self::Text),
            "arrow" => Some(Self::Arrow),
            "line" => Some(Self::Line),
            "freedraw" => Some(Self::Freedraw),
            "image" => Some(Self::Image),
            "frame" => Some(Self::Frame),
            "embeddable" => Some(Self::Embeddable),
            _ => None,
        }
    }

    /// The type name as written to disk.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Diamond => "diamond",
            Self::Text => "text",
            Self::Arrow => "arrow",
            Self::Line => "line",
            Self::Freedraw => "freedraw",
            Self::Image => "image",
            Self::Frame => "frame",
            Self::Embeddable => "embeddable",
        }
    }

    /// Linear elements carry a point list and must always have at least two
    /// points.
    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Arrow | Self::Line)
    }
}

/// Map a font family name to its integer code.
///
/// Case-insensitive; unrecognized names return `None` and the caller decides
/// the fallback (create defaults to 1, update keeps the existing code).
pub fn font_family_code(name: &str) -> Option<i64> {
    match name.to_ascii_lowercase().as_str() {
        "virgil" => Some(1),
        "helvetica" => Some(2),
        "cascadia" => Some(3),
        _ => None,
    }
}

/// A complete, normalized drawing element.
///
/// Known fields are typed; unknown caller-supplied attributes are kept in the
/// flattened `extra` map so forward-compatible fields round-trip through the
/// document format. Optional fields use `None` as the absent marker and are
/// omitted from the serialized record entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub stroke_color: String,
    pub background_color: String,
    pub fill_style: String,
    pub stroke_width: f64,
    pub stroke_style: String,
    pub roughness: f64,
    /// Opacity on the 0-100 integer scale.
    pub opacity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,
    pub text: String,
    pub font_size: f64,
    pub font_family: i64,
    pub text_align: String,
    pub vertical_align: String,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_arrowhead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_arrowhead: Option<String>,
    pub locked: bool,
    pub is_deleted: bool,
    pub group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_elements: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Rendering seed, generated once at creation.
    pub seed: i64,
    /// Starts at 1, incremented by exactly 1 on every successful update.
    pub version: u64,
    /// Regenerated on every create and every update.
    pub version_nonce: i64,
    /// Milliseconds since the Unix epoch, refreshed on create/update.
    pub updated: u64,
    pub scale: [f64; 2],
    pub status: String,
    /// Unknown attributes passed through by callers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    /// Project the element to its external JSON record.
    ///
    /// Absent optional fields do not appear as keys, matching the on-disk
    /// document format.
    pub fn to_record(&self) -> Value {
        // Element always serializes to an object.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_round_trip() {
        for name in [
            "rectangle",
            "ellipse",
            "diamond",
            "text",
            "arrow",
            "line",
            "freedraw",
            "image",
            "frame",
            "embeddable",
        ] {
            let kind = ElementType::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(ElementType::from_name("polygon").is_none());
    }

    #[test]
    fn test_linear_types() {
        assert!(ElementType::Arrow.is_linear());
        assert!(ElementType::Line.is_linear());
        assert!(!ElementType::Rectangle.is_linear());
        assert!(!ElementType::Freedraw.is_linear());
    }

    #[test]
    fn test_font_family_mapping() {
        assert_eq!(font_family_code("virgil"), Some(1));
        assert_eq!(font_family_code("Helvetica"), Some(2));
        assert_eq!(font_family_code("CASCADIA"), Some(3));
        assert_eq!(font_family_code("comic sans"), None);
    }
}
