//! Flat `id -> {status, text}` events from remote app versions that predate checklists.
//!
//! Flat entries live in their own store and never touch checklist state.

use std::collections::BTreeMap;

use serde_json::Value;
use shared::{
    domain::{LegacyEntry, LegacyKey},
    protocol::{is_truthy, text_from_json},
};
use tracing::debug;

use crate::model::ReconciliationState;

pub const LEGACY_TEXT_VARIABLE_PREFIX: &str = "actiontext";

/// Walks a flat payload the way the old clients did: object values, or array elements.
/// Entries without an `id` field are skipped; flat events mix metadata with actions.
pub fn flat_entries(payload: &Value) -> Vec<(LegacyKey, LegacyEntry)> {
    let entries: Box<dyn Iterator<Item = &Value>> = match payload {
        Value::Object(fields) => Box::new(fields.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return Vec::new(),
    };

    entries
        .filter_map(|entry| {
            let Value::Object(fields) = entry else {
                return None;
            };
            let Some(raw_id) = fields.get("id") else {
                debug!("legacy: skipping entry without id");
                return None;
            };
            let id = LegacyKey::from_json(raw_id);
            let entry = LegacyEntry {
                status: fields.get("status").is_some_and(is_truthy),
                text: fields.get("text").map(text_from_json).unwrap_or_default(),
            };
            Some((id, entry))
        })
        .collect()
}

/// Upserts every flat entry and returns how many were written.
pub fn merge_flat_update(state: &mut ReconciliationState, payload: &Value) -> usize {
    let entries = flat_entries(payload);
    let merged = entries.len();
    for (id, entry) in entries {
        state.upsert_legacy(id, entry);
    }
    merged
}

/// Vacuously true when nothing is known, unlike the checklist-mode readiness.
pub fn overall_ready(state: &ReconciliationState) -> bool {
    state.legacy_entries().values().all(|entry| entry.status)
}

pub fn status_of(state: &ReconciliationState, id: &LegacyKey) -> bool {
    state
        .legacy_entries()
        .get(id)
        .is_some_and(|entry| entry.status)
}

pub fn text_variables(state: &ReconciliationState) -> BTreeMap<String, String> {
    state
        .legacy_entries()
        .iter()
        .map(|(id, entry)| text_variable(id, &entry.text))
        .collect()
}

pub fn text_variable_name(id: &LegacyKey) -> String {
    format!("{LEGACY_TEXT_VARIABLE_PREFIX}{id}")
}

fn text_variable(id: &LegacyKey, text: &str) -> (String, String) {
    (text_variable_name(id), text.to_string())
}

#[cfg(test)]
#[path = "tests/legacy_tests.rs"]
mod tests;
