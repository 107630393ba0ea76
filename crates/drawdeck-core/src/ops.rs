//! Operations façade: validated argument bags in, result payloads out.
//!
//! Each function corresponds to one logical tool call. Request structs
//! describe the argument shape; response structs describe the exact success
//! payload. Failures are `CoreError` values, never panics.

use crate::element::Element;
use crate::error::{CoreError, CoreResult};
use crate::export::{self, DocumentSink};
use crate::normalize::CreateInput;
use crate::organize::{self, Alignment, Direction};
use crate::query;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Default output filename for `save_scene`.
pub const DEFAULT_SCENE_FILENAME: &str = "scene.excalidraw";

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub id: String,
    #[serde(flatten)]
    pub patch: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub filter: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceRequest {
    pub resource: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub element_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UngroupRequest {
    pub group_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignRequest {
    pub element_ids: Vec<String>,
    pub alignment: Alignment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeRequest {
    pub element_ids: Vec<String>,
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    pub element_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveSceneRequest {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub id: String,
    pub updated: bool,
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grouped {
    pub group_id: String,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ungrouped {
    pub group_id: String,
    pub ungrouped: bool,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aligned {
    pub aligned: bool,
    pub element_ids: Vec<String>,
    pub alignment: Alignment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distributed {
    pub distributed: bool,
    pub element_ids: Vec<String>,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Locked {
    pub locked: bool,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unlocked {
    pub unlocked: bool,
    pub element_ids: Vec<String>,
}

/// Create a new element from partial attributes.
pub fn create(ws: &mut Workspace, input: CreateInput) -> CoreResult<Created> {
    let element = ws.repository.create(input, ws.ids.as_mut())?;
    Ok(Created {
        id: element.id,
        kind: element.kind.name(),
        created: true,
    })
}

/// Merge a partial attribute patch over an existing element.
pub fn update(ws: &mut Workspace, request: UpdateRequest) -> CoreResult<Updated> {
    let element = ws
        .repository
        .update(&request.id, request.patch, ws.ids.as_mut())?;
    Ok(Updated {
        id: element.id,
        updated: true,
        version: element.version,
    })
}

/// Remove an element.
pub fn delete(ws: &mut Workspace, request: DeleteRequest) -> CoreResult<Deleted> {
    ws.repository.delete(&request.id)?;
    Ok(Deleted {
        id: request.id,
        deleted: true,
    })
}

/// Filter elements by type and/or attribute equality.
pub fn query(ws: &Workspace, request: QueryRequest) -> Vec<Element> {
    query::query(
        &ws.repository,
        request.kind.as_deref(),
        request.filter.as_ref(),
    )
}

/// Read a named resource view of the workspace.
pub fn get_resource(ws: &Workspace, request: ResourceRequest) -> CoreResult<Value> {
    match request.resource.as_str() {
        "scene" => Ok(json!({
            "theme": ws.scene.theme,
            "viewport": ws.scene.viewport,
            "selectedElements": ws.scene.selected_elements,
        })),
        "library" | "elements" => {
            let elements: Vec<Value> = ws.repository.list().iter().map(Element::to_record).collect();
            Ok(json!({ "elements": elements }))
        }
        "theme" => Ok(json!({ "theme": ws.scene.theme })),
        other => Err(CoreError::Validation(format!("unknown resource: {other}"))),
    }
}

/// Group a set of element ids under a fresh group id.
pub fn group(ws: &mut Workspace, request: GroupRequest) -> CoreResult<Grouped> {
    let element_ids = request.element_ids;
    let group_id = organize::group(
        &mut ws.repository,
        &mut ws.scene,
        ws.ids.as_mut(),
        element_ids.clone(),
    );
    Ok(Grouped {
        group_id,
        element_ids,
    })
}

/// Dissolve a group.
pub fn ungroup(ws: &mut Workspace, request: UngroupRequest) -> CoreResult<Ungrouped> {
    let element_ids = organize::ungroup(
        &mut ws.repository,
        &mut ws.scene,
        ws.ids.as_mut(),
        &request.group_id,
    )?;
    Ok(Ungrouped {
        group_id: request.group_id,
        ungrouped: true,
        element_ids,
    })
}

/// Align elements along an edge or center line.
pub fn align(ws: &mut Workspace, request: AlignRequest) -> CoreResult<Aligned> {
    organize::align(
        &mut ws.repository,
        ws.ids.as_mut(),
        &request.element_ids,
        request.alignment,
    )?;
    Ok(Aligned {
        aligned: true,
        element_ids: request.element_ids,
        alignment: request.alignment,
    })
}

/// Distribute elements with equal gaps.
pub fn distribute(ws: &mut Workspace, request: DistributeRequest) -> CoreResult<Distributed> {
    organize::distribute(
        &mut ws.repository,
        ws.ids.as_mut(),
        &request.element_ids,
        request.direction,
    )?;
    Ok(Distributed {
        distributed: true,
        element_ids: request.element_ids,
        direction: request.direction,
    })
}

/// Lock elements against editing.
pub fn lock(ws: &mut Workspace, request: LockRequest) -> CoreResult<Locked> {
    organize::set_locked(&mut ws.repository, ws.ids.as_mut(), &request.element_ids, true);
    Ok(Locked {
        locked: true,
        element_ids: request.element_ids,
    })
}

/// Unlock elements.
pub fn unlock(ws: &mut Workspace, request: LockRequest) -> CoreResult<Unlocked> {
    organize::set_locked(&mut ws.repository, ws.ids.as_mut(), &request.element_ids, false);
    Ok(Unlocked {
        unlocked: true,
        element_ids: request.element_ids,
    })
}

/// Serialize the scene and write it through the sink.
pub fn save_scene(
    ws: &Workspace,
    sink: &dyn DocumentSink,
    request: SaveSceneRequest,
) -> CoreResult<String> {
    let filename = request
        .filename
        .unwrap_or_else(|| DEFAULT_SCENE_FILENAME.to_string());
    export::save_scene(sink, &filename, &ws.repository, &ws.scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemorySink;
    use crate::ident::SequentialIdentity;
    use serde_json::from_value;

    fn workspace() -> Workspace {
        Workspace::with_identity(Box::new(SequentialIdentity::new()))
    }

    fn create_rect(ws: &mut Workspace, x: f64) -> String {
        let input: CreateInput =
            from_value(json!({"type": "rectangle", "x": x, "y": 0.0})).unwrap();
        create(ws, input).unwrap().id
    }

    #[test]
    fn test_create_response_shape() {
        let mut ws = workspace();
        let input: CreateInput =
            from_value(json!({"type": "ellipse", "x": 1.0, "y": 2.0})).unwrap();
        let response = create(&mut ws, input).unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "ellipse");
        assert_eq!(value["created"], true);
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_update_response_carries_version() {
        let mut ws = workspace();
        let id = create_rect(&mut ws, 0.0);
        let request: UpdateRequest = from_value(json!({"id": id, "x": 9.0})).unwrap();
        let response = update(&mut ws, request).unwrap();
        assert!(response.updated);
        assert_eq!(response.version, 2);
    }

    #[test]
    fn test_delete_then_query() {
        let mut ws = workspace();
        let id = create_rect(&mut ws, 0.0);
        delete(&mut ws, DeleteRequest { id: id.clone() }).unwrap();
        assert!(query(&ws, QueryRequest::default()).is_empty());
        let err = delete(&mut ws, DeleteRequest { id }).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_get_resource_payloads() {
        let mut ws = workspace();
        create_rect(&mut ws, 0.0);

        let scene = get_resource(&ws, ResourceRequest { resource: "scene".into() }).unwrap();
        assert_eq!(scene["theme"], "light");
        assert_eq!(scene["viewport"], json!({"x": 0.0, "y": 0.0, "zoom": 1.0}));
        assert_eq!(scene["selectedElements"], json!([]));

        let library = get_resource(&ws, ResourceRequest { resource: "library".into() }).unwrap();
        assert_eq!(library["elements"].as_array().unwrap().len(), 1);
        let elements = get_resource(&ws, ResourceRequest { resource: "elements".into() }).unwrap();
        assert_eq!(library, elements);

        let theme = get_resource(&ws, ResourceRequest { resource: "theme".into() }).unwrap();
        assert_eq!(theme, json!({"theme": "light"}));

        let err =
            get_resource(&ws, ResourceRequest { resource: "minimap".into() }).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_group_and_ungroup_round_trip() {
        let mut ws = workspace();
        let a = create_rect(&mut ws, 0.0);
        let b = create_rect(&mut ws, 20.0);

        let grouped = group(
            &mut ws,
            GroupRequest { element_ids: vec![a.clone(), b.clone()] },
        )
        .unwrap();
        assert_eq!(grouped.element_ids, vec![a.clone(), b.clone()]);

        let ungrouped = ungroup(
            &mut ws,
            UngroupRequest { group_id: grouped.group_id.clone() },
        )
        .unwrap();
        assert!(ungrouped.ungrouped);
        assert_eq!(ungrouped.element_ids, vec![a, b]);

        let err = ungroup(&mut ws, UngroupRequest { group_id: grouped.group_id }).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_align_echoes_arguments() {
        let mut ws = workspace();
        let a = create_rect(&mut ws, 10.0);
        let b = create_rect(&mut ws, 50.0);
        let response = align(
            &mut ws,
            AlignRequest {
                element_ids: vec![a.clone(), b.clone()],
                alignment: Alignment::Left,
            },
        )
        .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["aligned"], true);
        assert_eq!(value["alignment"], "left");
        assert_eq!(ws.repository.get(&b).unwrap().x, 10.0);
    }

    #[test]
    fn test_distribute_echoes_direction() {
        let mut ws = workspace();
        let ids = vec![
            create_rect(&mut ws, 0.0),
            create_rect(&mut ws, 10.0),
            create_rect(&mut ws, 100.0),
        ];
        let response = distribute(
            &mut ws,
            DistributeRequest {
                element_ids: ids.clone(),
                direction: Direction::Horizontal,
            },
        )
        .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["distributed"], true);
        assert_eq!(value["direction"], "horizontal");
        assert_eq!(ws.repository.get(&ids[1]).unwrap().x, 50.0);
    }

    #[test]
    fn test_lock_and_unlock_payloads() {
        let mut ws = workspace();
        let id = create_rect(&mut ws, 0.0);
        let locked = lock(&mut ws, LockRequest { element_ids: vec![id.clone()] }).unwrap();
        assert!(locked.locked);
        assert!(ws.repository.get(&id).unwrap().locked);
        let unlocked = unlock(&mut ws, LockRequest { element_ids: vec![id.clone()] }).unwrap();
        assert!(unlocked.unlocked);
        assert!(!ws.repository.get(&id).unwrap().locked);
    }

    #[test]
    fn test_save_scene_uses_default_filename() {
        let mut ws = workspace();
        create_rect(&mut ws, 0.0);
        let sink = MemorySink::new();
        let message = save_scene(&ws, &sink, SaveSceneRequest::default()).unwrap();
        assert!(message.contains(DEFAULT_SCENE_FILENAME));
        assert!(sink.get(DEFAULT_SCENE_FILENAME).is_some());
    }

    #[test]
    fn test_save_scene_rejects_bad_filename() {
        let ws = workspace();
        let sink = MemorySink::new();
        let err = save_scene(
            &ws,
            &sink,
            SaveSceneRequest { filename: Some("scene.svg".into()) },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(sink.is_empty());
    }
}
