use std::fmt::Write as _;

use readiness_core::{
    catalog::{
        evaluate_feedback, FeedbackStyle, FeedbackType, Rgb, MAX_POSITION, MIN_POSITION,
    },
    legacy, FeedbackKind, FeedbackValue, ReconciliationState,
};

fn mark(ready: bool) -> &'static str {
    if ready {
        "[x]"
    } else {
        "[ ]"
    }
}

/// One feedback as board text. With `colour`, an active feedback is painted in its
/// default style: boolean feedbacks only while true, text feedbacks always.
fn paint(state: &ReconciliationState, kind: FeedbackKind, position: u32, colour: bool) -> String {
    let value = evaluate_feedback(state, kind, position);
    let active = match kind.feedback_type() {
        FeedbackType::Boolean => value == FeedbackValue::Bool(true),
        FeedbackType::Advanced => true,
    };
    let text = match value {
        FeedbackValue::Bool(ready) => mark(ready).to_string(),
        FeedbackValue::Text(text) => text,
    };
    if !colour || !active {
        return text;
    }
    let FeedbackStyle {
        background: Rgb(br, bg, bb),
        foreground: Rgb(fr, fg, fb),
    } = kind.default_style();
    format!("\x1b[48;2;{br};{bg};{bb}m\x1b[38;2;{fr};{fg};{fb}m{text}\x1b[0m")
}

/// Plain-text view of one model snapshot, computed through the feedback catalog.
pub fn render(state: &ReconciliationState, colour: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {} ({}) ==",
        paint(state, FeedbackKind::CurrentChecklistName, MIN_POSITION, colour),
        paint(state, FeedbackKind::CurrentChecklistIndex, MIN_POSITION, colour)
    );

    match state.current_actions() {
        Some(actions) => {
            // Feedbacks only address positions 1..=50.
            for position in actions
                .keys()
                .copied()
                .filter(|position| (MIN_POSITION..=MAX_POSITION).contains(position))
            {
                let _ = writeln!(
                    out,
                    "{position:>3} {} {}",
                    paint(state, FeedbackKind::RaceReadyState, position, colour),
                    paint(state, FeedbackKind::ActionNameByPosition, position, colour)
                );
            }
            let _ = writeln!(
                out,
                "ready: {}",
                paint(state, FeedbackKind::RaceReadyOverallState, MIN_POSITION, colour)
            );
        }
        None => {
            let _ = writeln!(
                out,
                "{}",
                paint(state, FeedbackKind::ActionNameByPosition, MIN_POSITION, colour)
            );
        }
    }

    let entries = state.legacy_entries();
    if !entries.is_empty() {
        let _ = writeln!(out, "-- legacy --");
        for (id, entry) in entries {
            let _ = writeln!(out, "{id:>3} {} {}", mark(entry.status), entry.text);
        }
        let _ = writeln!(out, "legacy ready: {}", mark(legacy::overall_ready(state)));
    }
    out
}
