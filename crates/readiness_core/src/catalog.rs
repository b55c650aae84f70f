//! Feedbacks, variables and operator actions exposed to the presentation layer.

use std::collections::BTreeMap;

use serde::Serialize;
use shared::{
    domain::{ActionId, NormalisedIndex},
    protocol::Command,
};

use crate::{error::CommandError, legacy, model::ReconciliationState, views};

pub const MIN_POSITION: NormalisedIndex = 1;
pub const MAX_POSITION: NormalisedIndex = 50;

pub fn clamp_position(position: NormalisedIndex) -> NormalisedIndex {
    position.clamp(MIN_POSITION, MAX_POSITION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackStyle {
    pub background: Rgb,
    pub foreground: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Boolean,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FeedbackKind {
    RaceReadyState,
    RaceReadyOverallState,
    CurrentChecklistName,
    CurrentChecklistIndex,
    ActionNameByPosition,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 5] = [
        FeedbackKind::RaceReadyState,
        FeedbackKind::RaceReadyOverallState,
        FeedbackKind::CurrentChecklistName,
        FeedbackKind::CurrentChecklistIndex,
        FeedbackKind::ActionNameByPosition,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::RaceReadyState => "RaceReadyState",
            Self::RaceReadyOverallState => "RaceReadyOverallState",
            Self::CurrentChecklistName => "CurrentChecklistName",
            Self::CurrentChecklistIndex => "CurrentChecklistIndex",
            Self::ActionNameByPosition => "ActionNameByPosition",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RaceReadyState => "Race Ready Action State by Position",
            Self::RaceReadyOverallState => "Race Ready Overall State (Current Checklist)",
            Self::CurrentChecklistName => "Current Checklist Name",
            Self::CurrentChecklistIndex => "Current Checklist Index",
            Self::ActionNameByPosition => "Action Name by Position",
        }
    }

    pub fn feedback_type(self) -> FeedbackType {
        match self {
            Self::RaceReadyState | Self::RaceReadyOverallState => FeedbackType::Boolean,
            Self::CurrentChecklistName | Self::CurrentChecklistIndex | Self::ActionNameByPosition => {
                FeedbackType::Advanced
            }
        }
    }

    pub fn takes_position(self) -> bool {
        matches!(self, Self::RaceReadyState | Self::ActionNameByPosition)
    }

    pub fn default_style(self) -> FeedbackStyle {
        let (background, foreground) = match self {
            Self::RaceReadyState | Self::RaceReadyOverallState => (Rgb(0, 255, 0), Rgb(0, 0, 0)),
            Self::CurrentChecklistName => (Rgb(0, 0, 255), Rgb(255, 255, 255)),
            Self::CurrentChecklistIndex => (Rgb(128, 0, 128), Rgb(255, 255, 255)),
            Self::ActionNameByPosition => (Rgb(64, 64, 64), Rgb(255, 255, 255)),
        };
        FeedbackStyle {
            background,
            foreground,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeedbackValue {
    Bool(bool),
    Text(String),
}

/// Computes one feedback. `position` is ignored by kinds that do not take one and is
/// clamped into the accepted range otherwise.
pub fn evaluate_feedback(
    state: &ReconciliationState,
    kind: FeedbackKind,
    position: NormalisedIndex,
) -> FeedbackValue {
    let position = if kind.takes_position() {
        clamp_position(position)
    } else {
        MIN_POSITION
    };
    match kind {
        FeedbackKind::RaceReadyState => FeedbackValue::Bool(views::status_at_position(state, position)),
        FeedbackKind::RaceReadyOverallState => FeedbackValue::Bool(views::overall_ready(state)),
        FeedbackKind::CurrentChecklistName => {
            FeedbackValue::Text(views::current_checklist_name(state))
        }
        FeedbackKind::CurrentChecklistIndex => {
            FeedbackValue::Text(views::current_checklist_index(state))
        }
        FeedbackKind::ActionNameByPosition => {
            FeedbackValue::Text(views::action_name_display(state, position))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub variable_id: String,
    pub name: String,
}

impl VariableDefinition {
    fn new(variable_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            variable_id: variable_id.into(),
            name: name.into(),
        }
    }
}

pub const CURRENT_CHECKLIST_NAME_VARIABLE: &str = "current_checklist_name";
pub const CURRENT_CHECKLIST_INDEX_VARIABLE: &str = "current_checklist_index";
pub const TOTAL_CHECKLISTS_VARIABLE: &str = "total_checklists";

pub fn variable_definitions(state: &ReconciliationState) -> Vec<VariableDefinition> {
    let mut definitions = vec![
        VariableDefinition::new(CURRENT_CHECKLIST_NAME_VARIABLE, "Name of the current checklist"),
        VariableDefinition::new(
            CURRENT_CHECKLIST_INDEX_VARIABLE,
            "Index of the current checklist (0-based)",
        ),
        VariableDefinition::new(TOTAL_CHECKLISTS_VARIABLE, "Total number of checklists"),
    ];
    if let Some(actions) = state.current_actions() {
        definitions.extend(actions.keys().map(|position| {
            VariableDefinition::new(
                views::position_text_variable_name(*position),
                format!("Action text at position {position}"),
            )
        }));
    }
    definitions.extend(state.legacy_entries().keys().map(|id| {
        VariableDefinition::new(legacy::text_variable_name(id), format!("Action text for {id}"))
    }));
    definitions
}

pub fn variable_values(state: &ReconciliationState) -> BTreeMap<String, String> {
    let mut values = views::export_action_text_variables(state);
    values.insert(
        CURRENT_CHECKLIST_NAME_VARIABLE.to_string(),
        views::current_checklist_name(state),
    );
    values.insert(
        CURRENT_CHECKLIST_INDEX_VARIABLE.to_string(),
        views::current_checklist_rank(state)
            .map(|rank| rank.to_string())
            .unwrap_or_default(),
    );
    values.insert(
        TOTAL_CHECKLISTS_VARIABLE.to_string(),
        state.checklists().len().to_string(),
    );
    values
}

/// Operator actions and the remote command each one sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Toggle,
    ToggleById,
    ResetAll,
    NextChecklist,
    PreviousChecklist,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Toggle,
        ActionKind::ToggleById,
        ActionKind::ResetAll,
        ActionKind::NextChecklist,
        ActionKind::PreviousChecklist,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::ToggleById => "toggle_by_id",
            Self::ResetAll => "reset_all",
            Self::NextChecklist => "next_checklist",
            Self::PreviousChecklist => "previous_checklist",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toggle => "Toggle Action by Position",
            Self::ToggleById => "Toggle Action by Id",
            Self::ResetAll => "Reset All",
            Self::NextChecklist => "Next Checklist",
            Self::PreviousChecklist => "Previous Checklist",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Builds the command for this action. `argument` is the position for `toggle` and
    /// the action id for `toggle_by_id`; the other actions ignore it.
    pub fn command(self, argument: Option<&str>) -> Result<Command, CommandError> {
        match self {
            Self::Toggle => {
                let raw = argument.ok_or(CommandError::MissingArgument {
                    action: "toggle",
                    expected: "a position",
                })?;
                let position = raw.trim().parse::<NormalisedIndex>().map_err(|source| {
                    CommandError::InvalidPosition {
                        raw: raw.to_string(),
                        source,
                    }
                })?;
                if !(MIN_POSITION..=MAX_POSITION).contains(&position) {
                    return Err(CommandError::PositionOutOfRange {
                        position,
                        min: MIN_POSITION,
                        max: MAX_POSITION,
                    });
                }
                Ok(Command::ToggleByPosition {
                    normalised_index: position,
                })
            }
            Self::ToggleById => {
                let raw = argument
                    .map(str::trim)
                    .filter(|raw| !raw.is_empty())
                    .ok_or(CommandError::MissingArgument {
                        action: "toggle_by_id",
                        expected: "an action id",
                    })?;
                let id = match raw.parse::<i64>() {
                    Ok(int) => ActionId::from(int),
                    Err(_) => ActionId::from(raw),
                };
                Ok(Command::ToggleById { id })
            }
            Self::ResetAll => Ok(Command::ResetAll),
            Self::NextChecklist => Ok(Command::NextChecklist),
            Self::PreviousChecklist => Ok(Command::PreviousChecklist),
        }
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
