//! Element normalization: turns partial caller input into complete records.

use crate::element::{Element, ElementType, font_family_code};
use crate::error::{CoreError, CoreResult};
use crate::ident::IdentitySource;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Field defaults applied at creation time. The serializer mirrors these in
/// the document's current-item block, so they live in one place.
pub const DEFAULT_SIZE: f64 = 10.0;
pub const DEFAULT_BACKGROUND_COLOR: &str = "transparent";
pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;
pub const DEFAULT_STROKE_STYLE: &str = "solid";
pub const DEFAULT_FILL_STYLE: &str = "hachure";
pub const DEFAULT_ROUGHNESS: f64 = 1.0;
pub const DEFAULT_OPACITY: u8 = 100;
pub const DEFAULT_FONT_SIZE: f64 = 20.0;
pub const DEFAULT_FONT_FAMILY: i64 = 1;
pub const DEFAULT_TEXT_ALIGN: &str = "center";
pub const DEFAULT_VERTICAL_ALIGN: &str = "middle";
pub const DEFAULT_END_ARROWHEAD: &str = "arrow";

/// System-managed or fixed fields that callers may never set directly.
/// Stripped from update patches before merging: `scale` and `status` are
/// fixed literals, `groupIds` belongs to the group registry.
const RESERVED_FIELDS: &[&str] = &[
    "id",
    "seed",
    "version",
    "versionNonce",
    "updated",
    "createdAt",
    "updatedAt",
    "isDeleted",
    "scale",
    "status",
    "groupIds",
];

/// Typed element fields that creation input does not model. A creation
/// payload carrying one of these keys would land in the extras bag and
/// shadow the typed field in the serialized record, so they are stripped
/// alongside the reserved set.
const SHADOWED_FIELDS: &[&str] = &["originalText", "boundElements", "fileId"];

/// Font family argument: either an integer code or a font name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FontFamilyInput {
    Code(i64),
    Name(String),
}

/// Raw creation arguments, already schema-validated by the transport layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub points: Option<Vec<[f64; 2]>>,
    pub background_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<String>,
    pub fill_style: Option<String>,
    pub roughness: Option<f64>,
    /// Fractional 0-1 opacity; rescaled to the internal 0-100 scale.
    pub opacity: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<FontFamilyInput>,
    pub text_align: Option<String>,
    pub vertical_align: Option<String>,
    pub start_arrowhead: Option<String>,
    pub end_arrowhead: Option<String>,
    pub locked: Option<bool>,
    pub angle: Option<f64>,
    pub link: Option<String>,
    pub frame_id: Option<String>,
    pub container_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rescale a fractional 0-1 opacity to the internal 0-100 integer scale,
/// clamped to the closed interval.
pub fn scale_opacity(value: f64) -> u8 {
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Build a complete element record from creation arguments.
///
/// Applies, in order: font family name mapping, field defaults, opacity
/// rescale, point synthesis for linear elements, and arrowhead defaults for
/// arrows. Absent optional attributes stay absent (their keys are omitted
/// from the external record).
pub fn normalize_create(
    input: CreateInput,
    ids: &mut dyn IdentitySource,
) -> CoreResult<Element> {
    let kind = ElementType::from_name(&input.kind)
        .ok_or_else(|| CoreError::Validation(format!("unknown element type: {}", input.kind)))?;

    let font_family = match input.font_family {
        None => DEFAULT_FONT_FAMILY,
        Some(FontFamilyInput::Code(code)) => code,
        Some(FontFamilyInput::Name(name)) => {
            font_family_code(&name).unwrap_or(DEFAULT_FONT_FAMILY)
        }
    };

    let opacity = match input.opacity {
        None => DEFAULT_OPACITY,
        Some(value) => scale_opacity(value),
    };

    // Linear elements always carry at least two points. The synthesized
    // second point uses the raw width/height inputs: a missing height gives
    // a horizontal segment even though the height field itself defaults.
    let points = if kind.is_linear() {
        match input.points {
            Some(points) if points.len() >= 2 => Some(points),
            _ => Some(vec![
                [0.0, 0.0],
                [
                    input.width.unwrap_or(DEFAULT_SIZE),
                    input.height.unwrap_or(0.0),
                ],
            ]),
        }
    } else {
        input.points
    };

    let end_arrowhead = if kind == ElementType::Arrow {
        Some(
            input
                .end_arrowhead
                .unwrap_or_else(|| DEFAULT_END_ARROWHEAD.to_string()),
        )
    } else {
        input.end_arrowhead
    };

    let text = input.text.unwrap_or_default();
    let mut extra = input.extra;
    sanitize_extra(&mut extra);

    Ok(Element {
        id: ids.next_id(),
        kind,
        x: input.x,
        y: input.y,
        width: input.width.unwrap_or(DEFAULT_SIZE),
        height: input.height.unwrap_or(DEFAULT_SIZE),
        angle: input.angle.unwrap_or(0.0),
        stroke_color: input
            .stroke_color
            .unwrap_or_else(|| DEFAULT_STROKE_COLOR.to_string()),
        background_color: input
            .background_color
            .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string()),
        fill_style: input
            .fill_style
            .unwrap_or_else(|| DEFAULT_FILL_STYLE.to_string()),
        stroke_width: input.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
        stroke_style: input
            .stroke_style
            .unwrap_or_else(|| DEFAULT_STROKE_STYLE.to_string()),
        roughness: input.roughness.unwrap_or(DEFAULT_ROUGHNESS),
        opacity,
        points,
        original_text: text.clone(),
        text,
        font_size: input.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        font_family,
        text_align: input
            .text_align
            .unwrap_or_else(|| DEFAULT_TEXT_ALIGN.to_string()),
        vertical_align: input
            .vertical_align
            .unwrap_or_else(|| DEFAULT_VERTICAL_ALIGN.to_string()),
        start_arrowhead: input.start_arrowhead,
        end_arrowhead,
        locked: input.locked.unwrap_or(false),
        is_deleted: false,
        group_ids: Vec::new(),
        frame_id: input.frame_id,
        container_id: input.container_id,
        bound_elements: None,
        link: input.link,
        file_id: None,
        seed: ids.next_seed(),
        version: 1,
        version_nonce: ids.next_seed(),
        updated: ids.now_ms(),
        scale: [1.0, 1.0],
        status: "saved".to_string(),
        extra,
    })
}

/// Normalize an update patch against the existing record.
///
/// Only the font mapping and opacity rescale re-apply on update; point
/// synthesis is never re-run retroactively. An unrecognized font name keeps
/// the element's current code instead of resetting to the default.
pub fn normalize_patch(mut patch: Map<String, Value>, existing: &Element) -> Map<String, Value> {
    for field in RESERVED_FIELDS {
        patch.remove(*field);
    }

    let font_name = patch
        .get("fontFamily")
        .and_then(Value::as_str)
        .map(str::to_owned);
    if let Some(name) = font_name {
        let code = font_family_code(&name).unwrap_or(existing.font_family);
        patch.insert("fontFamily".to_string(), json!(code));
    }

    let opacity = patch.get("opacity").and_then(Value::as_f64);
    if let Some(value) = opacity {
        patch.insert("opacity".to_string(), json!(scale_opacity(value)));
    }

    patch
}

/// Drop reserved keys, typed-field shadows and explicit nulls from a
/// passthrough attribute bag.
fn sanitize_extra(extra: &mut Map<String, Value>) {
    for field in RESERVED_FIELDS.iter().chain(SHADOWED_FIELDS) {
        extra.remove(*field);
    }
    extra.retain(|_, value| !value.is_null());
}
