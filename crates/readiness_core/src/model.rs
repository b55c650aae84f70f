use std::collections::BTreeMap;

use shared::domain::{
    ActionId, ActionRecord, Checklist, ChecklistId, LegacyEntry, LegacyKey, NormalisedIndex,
};

pub type ChecklistActions = BTreeMap<NormalisedIndex, ActionRecord>;

/// Everything the remote app has told us during the current connection.
///
/// Readers only ever see this through shared references (usually an `Arc` snapshot
/// published by the runtime); mutation is confined to the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationState {
    store: BTreeMap<ChecklistId, ChecklistActions>,
    legacy_store: BTreeMap<LegacyKey, LegacyEntry>,
    checklists: Vec<Checklist>,
    current_checklist_id: Option<ChecklistId>,
}

impl ReconciliationState {
    pub fn checklists(&self) -> &[Checklist] {
        &self.checklists
    }

    pub fn current_checklist_id(&self) -> Option<&ChecklistId> {
        self.current_checklist_id.as_ref()
    }

    pub fn actions_for(&self, checklist_id: &ChecklistId) -> Option<&ChecklistActions> {
        self.store.get(checklist_id)
    }

    /// The current checklist id unless it is `0` or `""`, which the remote uses for
    /// "nothing selected".
    pub fn selected_checklist_id(&self) -> Option<&ChecklistId> {
        self.current_checklist_id
            .as_ref()
            .filter(|checklist_id| checklist_id.is_truthy())
    }

    pub fn current_actions(&self) -> Option<&ChecklistActions> {
        self.selected_checklist_id()
            .and_then(|checklist_id| self.store.get(checklist_id))
    }

    pub fn action_at(
        &self,
        checklist_id: &ChecklistId,
        position: NormalisedIndex,
    ) -> Option<&ActionRecord> {
        self.store.get(checklist_id)?.get(&position)
    }

    /// Looks an action up by its remote id inside one checklist.
    pub fn find_action(
        &self,
        checklist_id: &ChecklistId,
        action_id: &ActionId,
    ) -> Option<&ActionRecord> {
        self.store
            .get(checklist_id)?
            .values()
            .find(|action| &action.id == action_id)
    }

    pub fn checklist_ids_in_store(&self) -> impl Iterator<Item = &ChecklistId> {
        self.store.keys()
    }

    pub fn action_count(&self) -> usize {
        self.store.values().map(BTreeMap::len).sum()
    }

    pub fn legacy_entries(&self) -> &BTreeMap<LegacyKey, LegacyEntry> {
        &self.legacy_store
    }

    pub(crate) fn replace_checklists(&mut self, checklists: Vec<Checklist>) {
        self.checklists = checklists;
    }

    pub(crate) fn set_current_checklist(&mut self, checklist_id: Option<ChecklistId>) {
        self.current_checklist_id = checklist_id;
    }

    pub(crate) fn clear_store(&mut self) {
        self.store.clear();
    }

    /// Last write wins per `(checklist_id, normalised_index)`.
    pub(crate) fn upsert_action(&mut self, action: ActionRecord) -> Option<ActionRecord> {
        self.store
            .entry(action.checklist_id.clone())
            .or_default()
            .insert(action.normalised_index, action)
    }

    pub(crate) fn upsert_legacy(&mut self, id: LegacyKey, entry: LegacyEntry) {
        self.legacy_store.insert(id, entry);
    }
}
