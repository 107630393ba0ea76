//! Element repository: owns all element records.

use crate::element::Element;
use crate::error::{CoreError, CoreResult};
use crate::ident::IdentitySource;
use crate::normalize::{self, CreateInput};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The single owner of element records.
///
/// Elements are keyed by id; a separate order vector preserves creation
/// order so enumeration (and therefore serialization) is deterministic.
/// Every read hands out a value copy, never a reference into storage.
#[derive(Debug, Default)]
pub struct ElementRepository {
    elements: HashMap<String, Element>,
    order: Vec<String>,
}

impl ElementRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the input and store a new element. Returns a copy of the
    /// stored record.
    pub fn create(
        &mut self,
        input: CreateInput,
        ids: &mut dyn IdentitySource,
    ) -> CoreResult<Element> {
        let element = normalize::normalize_create(input, ids)?;
        self.order.push(element.id.clone());
        self.elements.insert(element.id.clone(), element.clone());
        Ok(element)
    }

    /// Get a copy of an element by id.
    pub fn get(&self, id: &str) -> CoreResult<Element> {
        self.elements
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("element not found: {id}")))
    }

    /// Check whether an element exists.
    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Merge a partial attribute patch over an existing element.
    ///
    /// The patch is normalized first (font mapping, opacity rescale, reserved
    /// fields stripped), then merged and re-validated against the element
    /// schema. On any failure the stored record is left untouched. A patch
    /// that changes the element's type is rejected.
    pub fn update(
        &mut self,
        id: &str,
        patch: Map<String, Value>,
        ids: &mut dyn IdentitySource,
    ) -> CoreResult<Element> {
        let existing = self.get(id)?;

        if let Some(kind) = patch.get("type").and_then(Value::as_str) {
            if kind != existing.kind.name() {
                return Err(CoreError::Validation(format!(
                    "cannot change element type from {} to {kind}",
                    existing.kind.name()
                )));
            }
        }

        let patch = normalize::normalize_patch(patch, &existing);

        let mut record = match serde_json::to_value(&existing) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(CoreError::Validation(format!(
                    "element {id} is not representable as an object"
                )));
            }
        };
        for (key, value) in patch {
            record.insert(key, value);
        }

        let mut merged: Element = serde_json::from_value(Value::Object(record))
            .map_err(|e| CoreError::Validation(format!("invalid update for element {id}: {e}")))?;

        merged.id = existing.id;
        merged.kind = existing.kind;
        merged.seed = existing.seed;
        merged.version = existing.version + 1;
        merged.version_nonce = ids.next_seed();
        merged.updated = ids.now_ms();
        merged.is_deleted = false;
        merged.extra.retain(|_, value| !value.is_null());

        self.elements.insert(id.to_string(), merged.clone());
        Ok(merged)
    }

    /// Remove an element. Deletion removes the record outright; live
    /// elements are never tombstoned.
    pub fn delete(&mut self, id: &str) -> CoreResult<()> {
        if self.elements.remove(id).is_none() {
            return Err(CoreError::NotFound(format!("element not found: {id}")));
        }
        self.order.retain(|existing| existing != id);
        Ok(())
    }

    /// All elements as copies, in creation order.
    pub fn list(&self) -> Vec<Element> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id).cloned())
            .collect()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the repository holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Apply an in-place mutation with version bookkeeping.
    ///
    /// Used by the organization service; every mutation bumps the version,
    /// regenerates the nonce and refreshes the updated timestamp, same as an
    /// update through the patch path.
    pub(crate) fn modify<F>(
        &mut self,
        id: &str,
        ids: &mut dyn IdentitySource,
        mutate: F,
    ) -> CoreResult<()>
    where
        F: FnOnce(&mut Element),
    {
        let element = self
            .elements
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("element not found: {id}")))?;
        mutate(element);
        element.version += 1;
        element.version_nonce = ids.next_seed();
        element.updated = ids.now_ms();
        Ok(())
    }
}
