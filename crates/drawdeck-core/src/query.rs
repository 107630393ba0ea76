//! Query engine: type and attribute-equality filtering.

use crate::element::Element;
use crate::repository::ElementRepository;
use serde_json::{Map, Value};

/// Filter the repository contents.
///
/// Both predicates compose with logical AND: an element must match the type
/// (when given) and carry every filter key with an equal value. Results come
/// back in the repository's enumeration order.
pub fn query(
    repo: &ElementRepository,
    kind: Option<&str>,
    filter: Option<&Map<String, Value>>,
) -> Vec<Element> {
    repo.list()
        .into_iter()
        .filter(|element| {
            if let Some(kind) = kind {
                if element.kind.name() != kind {
                    return false;
                }
            }
            if let Some(filter) = filter {
                return matches_filter(element, filter);
            }
            true
        })
        .collect()
}

fn matches_filter(element: &Element, filter: &Map<String, Value>) -> bool {
    let record = element.to_record();
    let Some(record) = record.as_object() else {
        return false;
    };
    filter.iter().all(|(key, expected)| {
        record
            .get(key)
            .map(|actual| json_eq(actual, expected))
            .unwrap_or(false)
    })
}

/// Strict equality, except numbers compare by value so an integer filter
/// matches a float-stored attribute.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}
