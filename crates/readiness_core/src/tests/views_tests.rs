use super::*;
use serde_json::json;
use shared::domain::{ActionId, Checklist, ChecklistId};

use crate::reconcile::Reconciler;

fn action(id: i64, checklist: &str, position: u32, status: bool, text: &str) -> ActionRecord {
    ActionRecord {
        id: ActionId::from(id),
        checklist_id: ChecklistId::from(checklist),
        normalised_index: position,
        text: text.to_string(),
        order: Some(i64::from(position)),
        status,
    }
}

fn directory() -> Vec<Checklist> {
    vec![
        Checklist {
            id: ChecklistId::from("A"),
            name: "Pre-Race".into(),
        },
        Checklist {
            id: ChecklistId::from("B"),
            name: "Post-Race".into(),
        },
    ]
}

#[test]
fn nothing_known_resolves_to_fallbacks() {
    let state = ReconciliationState::default();
    assert!(!status_at_position(&state, 1));
    assert_eq!(text_at_position(&state, 1), "");
    assert_eq!(action_name_display(&state, 1), NO_CHECKLIST_TEXT);
    assert!(!overall_ready(&state));
    assert_eq!(current_checklist_name(&state), UNKNOWN_CHECKLIST_NAME);
    assert_eq!(current_checklist_index(&state), NOT_APPLICABLE);
    assert!(export_action_text_variables(&state).is_empty());
}

#[test]
fn unknown_position_in_known_checklist_is_false_and_empty() {
    let mut reconciler = Reconciler::new();
    reconciler.on_full_snapshot(vec![action(1, "A", 1, true, "Fuel")]);
    let state = reconciler.state();

    assert!(!status_at_position(state, 42));
    assert_eq!(text_at_position(state, 42), "");
    assert_eq!(action_name_display(state, 42), "");
    assert_eq!(action_name_display(state, 1), "Fuel");
}

#[test]
fn current_checklist_without_store_entry_shows_sentinel() {
    let mut reconciler = Reconciler::new();
    reconciler.on_full_snapshot(vec![action(1, "A", 1, true, "Fuel")]);
    reconciler.on_current_checklist_changed(Some(ChecklistId::from("B")));
    let state = reconciler.state();

    assert_eq!(action_name_display(state, 1), NO_CHECKLIST_TEXT);
    assert_eq!(text_at_position(state, 1), "");
    assert!(!status_at_position(state, 1));
}

#[test]
fn overall_readiness_needs_every_action_ready() {
    let mut reconciler = Reconciler::new();
    reconciler.on_current_checklist_changed(Some(ChecklistId::from("A")));
    assert!(!overall_ready(reconciler.state()));

    reconciler.on_full_snapshot(vec![
        action(1, "A", 1, true, "Fuel"),
        action(2, "A", 2, false, "Tyres"),
    ]);
    assert!(!overall_ready(reconciler.state()));

    reconciler.on_partial_update(vec![action(2, "A", 2, true, "Tyres")]);
    assert!(overall_ready(reconciler.state()));
}

#[test]
fn overall_readiness_only_looks_at_the_current_checklist() {
    let mut reconciler = Reconciler::new();
    reconciler.on_partial_update(vec![action(1, "A", 1, false, "Fuel")]);
    reconciler.on_partial_update(vec![action(2, "B", 1, true, "Debrief")]);
    assert!(overall_ready(reconciler.state()));
}

#[test]
fn legacy_and_checklist_readiness_disagree_on_empty() {
    let state = ReconciliationState::default();
    assert!(legacy_overall_ready(&state));
    assert!(!overall_ready(&state));
}

#[test]
fn directory_name_and_rank() {
    let mut reconciler = Reconciler::new();
    reconciler.on_checklists_received(directory());
    reconciler.on_current_checklist_changed(Some(ChecklistId::from("B")));

    let state = reconciler.state();
    assert_eq!(current_checklist_name(state), "Post-Race");
    assert_eq!(current_checklist_index(state), "2/2");
    assert_eq!(current_checklist_rank(state), Some(1));
}

#[test]
fn current_checklist_missing_from_directory() {
    let mut reconciler = Reconciler::new();
    reconciler.on_checklists_received(directory());
    reconciler.on_current_checklist_changed(Some(ChecklistId::from("Z")));

    let state = reconciler.state();
    assert_eq!(current_checklist_name(state), UNKNOWN_CHECKLIST_NAME);
    assert_eq!(current_checklist_index(state), NOT_APPLICABLE);
}

#[test]
fn exported_text_variables_cover_current_checklist_and_legacy() {
    let mut reconciler = Reconciler::new();
    reconciler.on_full_snapshot(vec![
        action(10, "A", 1, true, "Fuel"),
        action(11, "A", 2, false, "Tyres"),
    ]);
    reconciler.on_partial_update(vec![action(12, "B", 1, false, "Debrief")]);
    reconciler.on_legacy_flat_update("update", &json!({"k": {"id": 7, "text": "Old"}}));

    let variables = export_action_text_variables(reconciler.state());
    let names: Vec<&str> = variables.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["actiontext7", "actiontext_pos1"]);
    assert_eq!(variables["actiontext_pos1"], "Debrief");
}

#[test]
fn zero_or_empty_current_checklist_means_nothing_selected() {
    for falsy in [ChecklistId::from(0), ChecklistId::from("")] {
        let mut reconciler = Reconciler::new();
        reconciler.on_current_checklist_changed(Some(falsy.clone()));
        reconciler.on_partial_update(vec![ActionRecord {
            id: ActionId::from(1),
            checklist_id: falsy.clone(),
            normalised_index: 1,
            text: "Fuel".into(),
            order: None,
            status: true,
        }]);

        let state = reconciler.state();
        assert_eq!(state.current_checklist_id(), Some(&falsy));
        assert!(state.current_actions().is_none());
        assert!(!status_at_position(state, 1));
        assert!(!overall_ready(state));
        assert_eq!(text_at_position(state, 1), "");
        assert_eq!(action_name_display(state, 1), NO_CHECKLIST_TEXT);
        assert!(export_action_text_variables(state).is_empty());
    }
}

#[test]
fn zero_is_still_looked_up_in_the_directory() {
    let mut reconciler = Reconciler::new();
    reconciler.on_checklists_received(vec![Checklist {
        id: ChecklistId::from(0),
        name: "Warm-up".into(),
    }]);
    reconciler.on_current_checklist_changed(Some(ChecklistId::from(0)));

    assert_eq!(current_checklist_name(reconciler.state()), "Warm-up");
    assert_eq!(current_checklist_index(reconciler.state()), "1/1");
}
