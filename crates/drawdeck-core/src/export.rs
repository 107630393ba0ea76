//! Scene serialization to the `.excalidraw` document format.

use crate::error::{CoreError, CoreResult};
use crate::normalize;
use crate::repository::ElementRepository;
use crate::scene::{SceneState, Theme};
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Required filename suffix for persisted scenes.
pub const SCENE_EXTENSION: &str = ".excalidraw";

/// The `source` marker written into every document.
pub const DOCUMENT_SOURCE: &str = "drawdeck";

const DOCUMENT_VERSION: u32 = 2;

/// Named output sink for serialized documents.
///
/// The serializer only needs "write text to a named sink"; where the bytes
/// land (filesystem, memory, object store) is the implementation's business.
pub trait DocumentSink: Send + Sync {
    fn write(&self, filename: &str, contents: &str) -> std::io::Result<()>;
}

/// Filesystem sink writing into a base directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// failed write never leaves a truncated document behind.
pub struct FileSink {
    base_path: PathBuf,
}

impl FileSink {
    /// Create a sink rooted at the given directory, creating it if needed.
    pub fn new(base_path: PathBuf) -> std::io::Result<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn target_path(&self, filename: &str) -> PathBuf {
        // Sanitize to keep writes inside the base directory.
        let safe: String = filename
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(safe)
    }
}

impl DocumentSink for FileSink {
    fn write(&self, filename: &str, contents: &str) -> std::io::Result<()> {
        let path = self.target_path(filename);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory sink for tests and ephemeral use.
#[derive(Default)]
pub struct MemorySink {
    files: RwLock<HashMap<String, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a previously written document.
    pub fn get(&self, filename: &str) -> Option<String> {
        self.files.read().ok()?.get(filename).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSink for MemorySink {
    fn write(&self, filename: &str, contents: &str) -> std::io::Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        files.insert(filename.to_string(), contents.to_string());
        Ok(())
    }
}

#[derive(Serialize)]
struct Zoom {
    value: f64,
}

/// The persisted appState block: view state plus the current default tool
/// fields, which mirror the normalizer's creation defaults.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppState {
    view_background_color: String,
    scroll_x: f64,
    scroll_y: f64,
    zoom: Zoom,
    theme: Theme,
    selected_element_ids: Map<String, Value>,
    current_item_stroke_color: &'static str,
    current_item_background_color: &'static str,
    current_item_fill_style: &'static str,
    current_item_stroke_width: f64,
    current_item_stroke_style: &'static str,
    current_item_roughness: f64,
    current_item_opacity: u8,
    current_item_font_family: i64,
    current_item_font_size: f64,
    current_item_text_align: &'static str,
    /// Serialized as an explicit null; consumers expect the key.
    current_item_start_arrowhead: Option<&'static str>,
    current_item_end_arrowhead: &'static str,
}

#[derive(Serialize)]
struct SceneDocument {
    #[serde(rename = "type")]
    doc_type: &'static str,
    version: u32,
    source: &'static str,
    elements: Vec<Value>,
    #[serde(rename = "appState")]
    app_state: AppState,
    files: Map<String, Value>,
}

/// Project the repository and scene state into the document value.
pub fn build_document(repo: &ElementRepository, scene: &SceneState) -> CoreResult<Value> {
    let mut elements = Vec::with_capacity(repo.len());
    for mut element in repo.list() {
        if element.kind.is_linear() {
            let valid = element
                .points
                .as_ref()
                .map(|p| p.len() >= 2)
                .unwrap_or(false);
            if !valid {
                warn!(
                    "element {} ({}) has an invalid point list, repairing for export",
                    element.id,
                    element.kind.name()
                );
                element.points = Some(vec![[0.0, 0.0], [element.width, element.height]]);
            }
        }
        let record = serde_json::to_value(&element)
            .map_err(|e| CoreError::Io(format!("failed to serialize element: {e}")))?;
        elements.push(record);
    }

    let selected_element_ids: Map<String, Value> = scene
        .selected_elements
        .iter()
        .map(|id| (id.clone(), Value::Bool(true)))
        .collect();

    let document = SceneDocument {
        doc_type: "excalidraw",
        version: DOCUMENT_VERSION,
        source: DOCUMENT_SOURCE,
        elements,
        app_state: AppState {
            view_background_color: scene.view_background_color.clone(),
            scroll_x: scene.viewport.x,
            scroll_y: scene.viewport.y,
            zoom: Zoom {
                value: scene.viewport.zoom,
            },
            theme: scene.theme,
            selected_element_ids,
            current_item_stroke_color: normalize::DEFAULT_STROKE_COLOR,
            current_item_background_color: normalize::DEFAULT_BACKGROUND_COLOR,
            current_item_fill_style: normalize::DEFAULT_FILL_STYLE,
            current_item_stroke_width: normalize::DEFAULT_STROKE_WIDTH,
            current_item_stroke_style: normalize::DEFAULT_STROKE_STYLE,
            current_item_roughness: normalize::DEFAULT_ROUGHNESS,
            current_item_opacity: normalize::DEFAULT_OPACITY,
            current_item_font_family: normalize::DEFAULT_FONT_FAMILY,
            current_item_font_size: normalize::DEFAULT_FONT_SIZE,
            current_item_text_align: normalize::DEFAULT_TEXT_ALIGN,
            current_item_start_arrowhead: None,
            current_item_end_arrowhead: normalize::DEFAULT_END_ARROWHEAD,
        },
        files: Map::new(),
    };

    serde_json::to_value(&document).map_err(|e| CoreError::Io(format!("failed to serialize scene: {e}")))
}

/// Serialize the scene and write it through the sink.
///
/// The filename must carry the `.excalidraw` suffix; nothing is written
/// otherwise. Sink failures surface as `CoreError::Io` with the underlying
/// message.
pub fn save_scene(
    sink: &dyn DocumentSink,
    filename: &str,
    repo: &ElementRepository,
    scene: &SceneState,
) -> CoreResult<String> {
    if !filename.ends_with(SCENE_EXTENSION) {
        return Err(CoreError::Validation(format!(
            "filename must end with {SCENE_EXTENSION}: {filename}"
        )));
    }

    let document = build_document(repo, scene)?;
    let contents = serde_json::to_string_pretty(&document)
        .map_err(|e| CoreError::Io(format!("failed to serialize scene: {e}")))?;
    sink.write(filename, &contents)
        .map_err(|e| CoreError::Io(e.to_string()))?;

    Ok(format!(
        "Scene saved to {filename} ({} elements)",
        repo.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::SequentialIdentity;
    use crate::normalize::CreateInput;
    use serde_json::{from_value, json};
    use tempfile::tempdir;

    fn populated() -> (ElementRepository, SceneState, SequentialIdentity) {
        let mut repo = ElementRepository::new();
        let mut ids = SequentialIdentity::new();
        for args in [
            json!({"type": "rectangle", "x": 0.0, "y": 0.0, "width": 30.0, "height": 20.0}),
            json!({"type": "arrow", "x": 5.0, "y": 5.0, "width": 40.0}),
            json!({"type": "text", "x": 10.0, "y": 10.0, "text": "hi"}),
        ] {
            let input: CreateInput = from_value(args).unwrap();
            repo.create(input, &mut ids).unwrap();
        }
        (repo, SceneState::new(), ids)
    }

    #[test]
    fn test_rejects_wrong_extension_without_writing() {
        let (repo, scene, _) = populated();
        let sink = MemorySink::new();
        let err = save_scene(&sink, "scene.json", &repo, &scene).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_document_shape() {
        let (repo, scene, _) = populated();
        let sink = MemorySink::new();
        let message = save_scene(&sink, "scene.excalidraw", &repo, &scene).unwrap();
        assert!(message.contains("scene.excalidraw"));

        let doc: Value = serde_json::from_str(&sink.get("scene.excalidraw").unwrap()).unwrap();
        assert_eq!(doc["type"], "excalidraw");
        assert_eq!(doc["version"], 2);
        assert_eq!(doc["source"], DOCUMENT_SOURCE);
        assert_eq!(doc["elements"].as_array().unwrap().len(), 3);
        assert_eq!(doc["files"], json!({}));

        let app_state = doc["appState"].as_object().unwrap();
        assert_eq!(app_state["viewBackgroundColor"], "#ffffff");
        assert_eq!(app_state["scrollX"], 0.0);
        assert_eq!(app_state["scrollY"], 0.0);
        assert_eq!(app_state["zoom"], json!({"value": 1.0}));
        assert_eq!(app_state["theme"], "light");
        assert_eq!(app_state["selectedElementIds"], json!({}));
        assert_eq!(app_state["currentItemStrokeColor"], "#000000");
        assert_eq!(app_state["currentItemBackgroundColor"], "transparent");
        assert_eq!(app_state["currentItemFillStyle"], "hachure");
        assert_eq!(app_state["currentItemStrokeWidth"], 1.0);
        assert_eq!(app_state["currentItemStrokeStyle"], "solid");
        assert_eq!(app_state["currentItemRoughness"], 1.0);
        assert_eq!(app_state["currentItemOpacity"], 100);
        assert_eq!(app_state["currentItemFontFamily"], 1);
        assert_eq!(app_state["currentItemFontSize"], 20.0);
        assert_eq!(app_state["currentItemTextAlign"], "center");
        assert!(app_state.contains_key("currentItemStartArrowhead"));
        assert_eq!(app_state["currentItemStartArrowhead"], Value::Null);
        assert_eq!(app_state["currentItemEndArrowhead"], "arrow");
    }

    #[test]
    fn test_selection_becomes_id_map() {
        let (repo, mut scene, _) = populated();
        let first = repo.list().remove(0);
        scene.selected_elements.insert(first.id.clone());
        let doc = build_document(&repo, &scene).unwrap();
        assert_eq!(
            doc["appState"]["selectedElementIds"][&first.id],
            Value::Bool(true)
        );
    }

    #[test]
    fn test_round_trip_preserves_elements() {
        let (repo, scene, _) = populated();
        let sink = MemorySink::new();
        save_scene(&sink, "out.excalidraw", &repo, &scene).unwrap();
        let doc: Value = serde_json::from_str(&sink.get("out.excalidraw").unwrap()).unwrap();
        let expected: Vec<Value> = repo.list().iter().map(|e| e.to_record()).collect();
        assert_eq!(doc["elements"], Value::Array(expected));
    }

    #[test]
    fn test_invalid_linear_points_repaired_on_export() {
        let (mut repo, scene, mut ids) = populated();
        let arrow = repo
            .list()
            .into_iter()
            .find(|e| e.kind.name() == "arrow")
            .unwrap();
        // Updates never re-synthesize points, so a broken list can exist.
        repo.update(&arrow.id, from_value(json!({"points": [[1.0, 1.0]]})).unwrap(), &mut ids)
            .unwrap();

        let doc = build_document(&repo, &scene).unwrap();
        let exported = doc["elements"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"] == arrow.id.as_str())
            .unwrap();
        assert_eq!(
            exported["points"],
            json!([[0.0, 0.0], [arrow.width, arrow.height]])
        );
        // The stored record itself is untouched.
        assert_eq!(
            repo.get(&arrow.id).unwrap().points,
            Some(vec![[1.0, 1.0]])
        );
    }

    #[test]
    fn test_file_sink_writes_and_replaces() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf()).unwrap();
        sink.write("scene.excalidraw", "{\"a\":1}").unwrap();
        sink.write("scene.excalidraw", "{\"a\":2}").unwrap();
        let contents = fs::read_to_string(dir.path().join("scene.excalidraw")).unwrap();
        assert_eq!(contents, "{\"a\":2}");
        // No temp file left behind.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_sink_sanitizes_filename() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf()).unwrap();
        sink.write("../escape.excalidraw", "{}").unwrap();
        assert!(dir.path().join(".._escape.excalidraw").exists());
    }

    #[test]
    fn test_save_through_file_sink() {
        let (repo, scene, _) = populated();
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf()).unwrap();
        save_scene(&sink, "scene.excalidraw", &repo, &scene).unwrap();
        let contents = fs::read_to_string(dir.path().join("scene.excalidraw")).unwrap();
        let doc: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(doc["type"], "excalidraw");
    }
}
