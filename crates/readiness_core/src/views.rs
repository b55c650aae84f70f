//! Read-only queries over a [`ReconciliationState`].
//!
//! Nothing here caches: every call reflects the state it is handed. Missing context
//! always resolves to a fallback value, never an error.

use std::collections::BTreeMap;

use shared::domain::{ActionRecord, NormalisedIndex};

use crate::{legacy, model::ReconciliationState};

pub const NO_CHECKLIST_TEXT: &str = "No Checklist";
pub const UNKNOWN_CHECKLIST_NAME: &str = "Unknown";
pub const NOT_APPLICABLE: &str = "N/A";
pub const POSITION_TEXT_VARIABLE_PREFIX: &str = "actiontext_pos";

fn current_action(state: &ReconciliationState, position: NormalisedIndex) -> Option<&ActionRecord> {
    state.current_actions()?.get(&position)
}

/// `false` when the checklist, the slot, or the current selection is unknown.
pub fn status_at_position(state: &ReconciliationState, position: NormalisedIndex) -> bool {
    current_action(state, position).is_some_and(|action| action.status)
}

/// Raw slot text; empty whenever anything along the lookup is missing.
pub fn text_at_position(state: &ReconciliationState, position: NormalisedIndex) -> String {
    current_action(state, position)
        .map(|action| action.text.clone())
        .unwrap_or_default()
}

/// Display text for a slot. Unlike [`text_at_position`], a missing checklist context
/// renders as [`NO_CHECKLIST_TEXT`]; an empty slot in a known checklist is still `""`.
pub fn action_name_display(state: &ReconciliationState, position: NormalisedIndex) -> String {
    match state.current_actions() {
        Some(actions) => actions
            .get(&position)
            .map(|action| action.text.clone())
            .unwrap_or_default(),
        None => NO_CHECKLIST_TEXT.to_string(),
    }
}

/// True only for a non-empty current checklist whose actions are all ready.
pub fn overall_ready(state: &ReconciliationState) -> bool {
    state
        .current_actions()
        .is_some_and(|actions| !actions.is_empty() && actions.values().all(|action| action.status))
}

/// Flat-mode readiness. Vacuously true for an empty store.
pub fn legacy_overall_ready(state: &ReconciliationState) -> bool {
    legacy::overall_ready(state)
}

/// 0-based position of the current checklist in the directory.
pub fn current_checklist_rank(state: &ReconciliationState) -> Option<usize> {
    let current = state.current_checklist_id()?;
    state
        .checklists()
        .iter()
        .position(|checklist| &checklist.id == current)
}

pub fn current_checklist_name(state: &ReconciliationState) -> String {
    current_checklist_rank(state)
        .map(|rank| state.checklists()[rank].name.clone())
        .unwrap_or_else(|| UNKNOWN_CHECKLIST_NAME.to_string())
}

/// `"rank/total"` with a 1-based rank, or [`NOT_APPLICABLE`].
pub fn current_checklist_index(state: &ReconciliationState) -> String {
    match current_checklist_rank(state) {
        Some(rank) => format!("{}/{}", rank + 1, state.checklists().len()),
        None => NOT_APPLICABLE.to_string(),
    }
}

pub fn position_text_variable_name(position: NormalisedIndex) -> String {
    format!("{POSITION_TEXT_VARIABLE_PREFIX}{position}")
}

/// `actiontext_pos<N>` for each slot of the current checklist plus `actiontext<id>` for
/// every flat-mode entry.
pub fn export_action_text_variables(state: &ReconciliationState) -> BTreeMap<String, String> {
    let mut variables: BTreeMap<String, String> = state
        .current_actions()
        .into_iter()
        .flat_map(|actions| actions.iter())
        .map(|(position, action)| (position_text_variable_name(*position), action.text.clone()))
        .collect();
    variables.extend(legacy::text_variables(state));
    variables
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
