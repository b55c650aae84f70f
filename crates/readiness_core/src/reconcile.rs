use shared::{
    domain::{ActionRecord, Checklist, ChecklistId},
    protocol::{InboundEvent, OutboundRequest},
};
use tracing::{debug, info, warn};

use crate::{
    catalog::{self, FeedbackKind},
    legacy,
    model::ReconciliationState,
};

/// Work the runtime must carry out after a handler has mutated the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Outbound(OutboundRequest),
    CheckFeedbacks(Vec<FeedbackKind>),
    RefreshVariableDefinitions,
    PublishVariables,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub effects: Vec<Effect>,
}

impl Reaction {
    fn push(&mut self, effect: Effect) -> &mut Self {
        self.effects.push(effect);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn outbound(&self) -> impl Iterator<Item = OutboundRequest> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Outbound(request) => Some(*request),
            _ => None,
        })
    }

    pub fn checked_feedbacks(&self) -> impl Iterator<Item = FeedbackKind> + '_ {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::CheckFeedbacks(kinds) => Some(kinds.iter().copied()),
                _ => None,
            })
            .flatten()
    }
}

const DIRECTORY_FEEDBACKS: [FeedbackKind; 2] = [
    FeedbackKind::CurrentChecklistName,
    FeedbackKind::CurrentChecklistIndex,
];

const LEGACY_FEEDBACKS: [FeedbackKind; 2] = [
    FeedbackKind::RaceReadyState,
    FeedbackKind::RaceReadyOverallState,
];

/// Owns the model and applies inbound events to it, one at a time.
#[derive(Debug, Default)]
pub struct Reconciler {
    state: ReconciliationState,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    /// Single mutation entry point.
    pub fn apply(&mut self, event: InboundEvent) -> Reaction {
        match event {
            InboundEvent::Checklists(list) => self.on_checklists_received(list),
            InboundEvent::CurrentChecklist(checklist_id) => {
                self.on_current_checklist_changed(checklist_id)
            }
            InboundEvent::AllData(actions) => self.on_full_snapshot(actions),
            InboundEvent::PartialData(actions) => self.on_partial_update(actions),
            InboundEvent::Rejected { event, reason } => {
                warn!(%event, reason, "reconcile: ignoring malformed event");
                Reaction::default()
            }
            InboundEvent::Legacy { event, payload } => {
                self.on_legacy_flat_update(&event, &payload)
            }
        }
    }

    /// Every (re)connect starts a fresh snapshot cycle.
    pub fn on_connected(&self) -> Reaction {
        let mut reaction = Reaction::default();
        reaction
            .push(Effect::Outbound(OutboundRequest::RequestAllData))
            .push(Effect::Outbound(OutboundRequest::GetCurrentChecklist));
        reaction
    }

    pub fn on_checklists_received(&mut self, list: Vec<Checklist>) -> Reaction {
        info!(count = list.len(), "reconcile: checklist directory replaced");
        self.state.replace_checklists(list);

        let mut reaction = Reaction::default();
        reaction
            .push(Effect::CheckFeedbacks(DIRECTORY_FEEDBACKS.to_vec()))
            .push(Effect::RefreshVariableDefinitions)
            .push(Effect::PublishVariables);
        reaction
    }

    pub fn on_current_checklist_changed(&mut self, checklist_id: Option<ChecklistId>) -> Reaction {
        match &checklist_id {
            Some(id) => info!(checklist_id = %id, "reconcile: current checklist changed"),
            None => info!("reconcile: current checklist cleared"),
        }
        let defined = self.defined_variables();
        self.state.set_current_checklist(checklist_id);

        let mut reaction = Reaction::default();
        reaction
            .push(Effect::Outbound(OutboundRequest::RequestAllData))
            .push(Effect::CheckFeedbacks(FeedbackKind::ALL.to_vec()));
        self.finish_variables(&mut reaction, defined);
        reaction
    }

    /// Destructive replace: nothing from an earlier snapshot survives unless re-sent.
    pub fn on_full_snapshot(&mut self, actions: Vec<ActionRecord>) -> Reaction {
        let count = actions.len();
        let inferred = actions.first().map(|action| action.checklist_id.clone());
        let defined = self.defined_variables();

        self.state.clear_store();
        for action in actions {
            self.insert(action);
        }

        // The remote only ever snapshots the active checklist.
        if self.state.selected_checklist_id().is_none() {
            if let Some(checklist_id) = inferred {
                info!(checklist_id = %checklist_id, "reconcile: inferred current checklist from snapshot");
                self.state.set_current_checklist(Some(checklist_id));
            }
        }
        info!(count, "reconcile: applied full snapshot");

        let mut reaction = Reaction::default();
        if self.state.checklists().is_empty() {
            reaction.push(Effect::Outbound(OutboundRequest::GetChecklists));
        }
        reaction.push(Effect::CheckFeedbacks(FeedbackKind::ALL.to_vec()));
        self.finish_variables(&mut reaction, defined);
        reaction
    }

    /// Non-destructive merge. Updates may arrive for a checklist the remote has switched
    /// to before the explicit change event, so the owning checklist is adopted as current.
    pub fn on_partial_update(&mut self, actions: Vec<ActionRecord>) -> Reaction {
        let count = actions.len();
        let defined = self.defined_variables();
        for action in actions {
            if self.state.current_checklist_id() != Some(&action.checklist_id) {
                info!(
                    checklist_id = %action.checklist_id,
                    "reconcile: partial update switched current checklist"
                );
                self.state
                    .set_current_checklist(Some(action.checklist_id.clone()));
            }
            self.insert(action);
        }
        debug!(count, "reconcile: merged partial update");

        let mut reaction = Reaction::default();
        reaction.push(Effect::CheckFeedbacks(FeedbackKind::ALL.to_vec()));
        self.finish_variables(&mut reaction, defined);
        reaction
    }

    pub fn on_legacy_flat_update(&mut self, event: &str, payload: &serde_json::Value) -> Reaction {
        let defined = self.defined_variables();
        let merged = legacy::merge_flat_update(&mut self.state, payload);
        debug!(event, merged, "legacy: merged flat update");

        let mut reaction = Reaction::default();
        reaction.push(Effect::CheckFeedbacks(LEGACY_FEEDBACKS.to_vec()));
        self.finish_variables(&mut reaction, defined);
        reaction
    }

    fn defined_variables(&self) -> Vec<String> {
        catalog::variable_definitions(&self.state)
            .into_iter()
            .map(|definition| definition.variable_id)
            .collect()
    }

    /// Definitions go out before values whenever a slot or flat entry appeared or vanished.
    fn finish_variables(&self, reaction: &mut Reaction, defined_before: Vec<String>) {
        if self.defined_variables() != defined_before {
            reaction.push(Effect::RefreshVariableDefinitions);
        }
        reaction.push(Effect::PublishVariables);
    }

    fn insert(&mut self, action: ActionRecord) {
        let checklist_id = action.checklist_id.clone();
        let position = action.normalised_index;
        if let Some(previous) = self.state.upsert_action(action) {
            debug!(
                checklist_id = %checklist_id,
                position,
                action_id = %previous.id,
                "reconcile: replaced action at position"
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
