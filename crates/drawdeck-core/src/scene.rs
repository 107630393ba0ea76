//! Document-level scene state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Color theme for the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Pan/zoom state of the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Document-level state: theme, background, viewport, selection and the
/// group registry.
///
/// Constructed once per workspace and mutated in place by scene and
/// organization operations; it only survives the process through the
/// serializer.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub theme: Theme,
    pub view_background_color: String,
    pub viewport: Viewport,
    pub selected_elements: BTreeSet<String>,
    /// Group id to member element ids. A group is a pure association; it
    /// does not own its elements.
    pub groups: HashMap<String, Vec<String>>,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            view_background_color: "#ffffff".to_string(),
            viewport: Viewport::default(),
            selected_elements: BTreeSet::new(),
            groups: HashMap::new(),
        }
    }
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }
}
