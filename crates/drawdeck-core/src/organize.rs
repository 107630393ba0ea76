//! Organization service: grouping, alignment, distribution, locking.

use crate::element::Element;
use crate::error::{CoreError, CoreResult};
use crate::ident::IdentitySource;
use crate::repository::ElementRepository;
use crate::scene::SceneState;
use serde::{Deserialize, Serialize};

/// Edge or center line to align elements against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    fn is_horizontal(&self) -> bool {
        matches!(self, Alignment::Left | Alignment::Center | Alignment::Right)
    }
}

/// Axis along which to distribute elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Horizontal,
    Vertical,
}

/// Create a group over the given element ids.
///
/// The member list is stored verbatim in the registry (no dedup, no
/// existence check). Members that do exist in the repository additionally
/// get the new group id appended to their `groupIds`.
pub fn group(
    repo: &mut ElementRepository,
    scene: &mut SceneState,
    ids: &mut dyn IdentitySource,
    element_ids: Vec<String>,
) -> String {
    let group_id = ids.next_id();
    for member in &element_ids {
        let id = group_id.clone();
        // Unknown members have no record to annotate; the registry still
        // keeps them.
        let _ = repo.modify(member, ids, |element| {
            if !element.group_ids.contains(&id) {
                element.group_ids.push(id);
            }
        });
    }
    scene.groups.insert(group_id.clone(), element_ids);
    group_id
}

/// Dissolve a group, returning the element ids it held.
pub fn ungroup(
    repo: &mut ElementRepository,
    scene: &mut SceneState,
    ids: &mut dyn IdentitySource,
    group_id: &str,
) -> CoreResult<Vec<String>> {
    let members = scene
        .groups
        .remove(group_id)
        .ok_or_else(|| CoreError::NotFound(format!("group not found: {group_id}")))?;
    for member in &members {
        let _ = repo.modify(member, ids, |element| {
            element.group_ids.retain(|g| g != group_id);
        });
    }
    Ok(members)
}

fn extent(element: &Element, horizontal: bool) -> (f64, f64) {
    if horizontal {
        (element.x, element.width)
    } else {
        (element.y, element.height)
    }
}

/// Align the named elements along an edge or center line.
///
/// The target coordinate comes from the bounding extents of the whole set;
/// every element is repositioned so its corresponding edge/center matches,
/// keeping width and height. Fewer than two elements is a successful no-op.
/// Fails with not-found if any id is unknown.
pub fn align(
    repo: &mut ElementRepository,
    ids: &mut dyn IdentitySource,
    element_ids: &[String],
    alignment: Alignment,
) -> CoreResult<()> {
    let mut elements = Vec::with_capacity(element_ids.len());
    for id in element_ids {
        elements.push(repo.get(id)?);
    }
    if elements.len() < 2 {
        return Ok(());
    }

    let horizontal = alignment.is_horizontal();
    let min = elements
        .iter()
        .map(|e| extent(e, horizontal).0)
        .fold(f64::INFINITY, f64::min);
    let max = elements
        .iter()
        .map(|e| {
            let (pos, size) = extent(e, horizontal);
            pos + size
        })
        .fold(f64::NEG_INFINITY, f64::max);

    for element in &elements {
        let (_, size) = extent(element, horizontal);
        let target = match alignment {
            Alignment::Left | Alignment::Top => min,
            Alignment::Right | Alignment::Bottom => max - size,
            Alignment::Center | Alignment::Middle => (min + max) / 2.0 - size / 2.0,
        };
        repo.modify(&element.id, ids, |e| {
            if horizontal {
                e.x = target;
            } else {
                e.y = target;
            }
        })?;
    }
    Ok(())
}

/// Spread the named elements so the gaps between consecutive bounding
/// extents are equal, holding the first and last element fixed.
///
/// Fewer than three elements is a successful no-op. Fails with not-found if
/// any id is unknown.
pub fn distribute(
    repo: &mut ElementRepository,
    ids: &mut dyn IdentitySource,
    element_ids: &[String],
    direction: Direction,
) -> CoreResult<()> {
    let mut elements = Vec::with_capacity(element_ids.len());
    for id in element_ids {
        elements.push(repo.get(id)?);
    }
    if elements.len() < 3 {
        return Ok(());
    }

    let horizontal = direction == Direction::Horizontal;
    elements.sort_by(|a, b| {
        extent(a, horizontal)
            .0
            .total_cmp(&extent(b, horizontal).0)
    });

    let (first_pos, _) = extent(&elements[0], horizontal);
    let (last_pos, last_size) = extent(&elements[elements.len() - 1], horizontal);
    let span = last_pos + last_size - first_pos;
    let total: f64 = elements.iter().map(|e| extent(e, horizontal).1).sum();
    let gap = (span - total) / (elements.len() - 1) as f64;

    let mut cursor = first_pos;
    for element in &elements {
        let (pos, size) = extent(element, horizontal);
        let target = cursor;
        cursor += size + gap;
        // The first and last elements anchor the span; skip the version
        // bookkeeping for anything already in place.
        if pos == target {
            continue;
        }
        repo.modify(&element.id, ids, |e| {
            if horizontal {
                e.x = target;
            } else {
                e.y = target;
            }
        })?;
    }
    Ok(())
}

/// Set the locked flag on every named element that exists. Unknown ids are
/// skipped silently rather than failing the batch.
pub fn set_locked(
    repo: &mut ElementRepository,
    ids: &mut dyn IdentitySource,
    element_ids: &[String],
    locked: bool,
) {
    for id in element_ids {
        let _ = repo.modify(id, ids, |element| element.locked = locked);
    }
}
