use serde_json::{json, Value};
use tracing::warn;

use crate::{
    domain::{ActionId, ActionRecord, Checklist, ChecklistId, NormalisedIndex},
    error::ProtocolError,
};

pub const CHECKLISTS_EVENT: &str = "checklists";
pub const CURRENT_CHECKLIST_EVENT: &str = "current_checklist";
pub const ALL_DATA_EVENT: &str = "all_data";
pub const PARTIAL_DATA_EVENT: &str = "partial_data";

/// Engine.IO pong, sent in answer to every server ping.
pub const ENGINE_PONG_FRAME: &str = "3";
/// Socket.IO connect request for the default namespace.
pub const SOCKET_CONNECT_FRAME: &str = "40";

/// JavaScript truthiness over a JSON value.
///
/// The remote app and its older clients coerce `status` with `!!`, so `"0"`, `"false"`,
/// `[]` and `{}` are all true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a payload `text` field. Missing or null text is empty; other scalars keep
/// their JSON spelling.
pub fn text_from_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn decode_position(value: &Value) -> Option<NormalisedIndex> {
    let position = match value {
        Value::Number(number) => match number.as_u64() {
            Some(int) => int,
            None => {
                let float = number.as_f64()?;
                if float.fract() != 0.0 || float < 0.0 {
                    return None;
                }
                float as u64
            }
        },
        Value::String(text) => text.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    NormalisedIndex::try_from(position)
        .ok()
        .filter(|position| *position >= 1)
}

fn decode_action(entry: &Value) -> Result<ActionRecord, &'static str> {
    let Value::Object(fields) = entry else {
        return Err("entry is not an object");
    };
    let id = fields
        .get("id")
        .and_then(ActionId::from_json)
        .ok_or("missing or invalid id")?;
    let checklist_id = fields
        .get("checklist_id")
        .and_then(ChecklistId::from_json)
        .ok_or("missing or invalid checklist_id")?;
    let normalised_index = fields
        .get("normalised_index")
        .and_then(decode_position)
        .ok_or("missing or invalid normalised_index")?;
    Ok(ActionRecord {
        id,
        checklist_id,
        normalised_index,
        text: fields.get("text").map(text_from_json).unwrap_or_default(),
        order: fields.get("order").and_then(Value::as_i64),
        status: fields.get("status").is_some_and(is_truthy),
    })
}

fn decode_actions(event: &str, payload: &Value) -> Option<Vec<ActionRecord>> {
    let Value::Array(entries) = payload else {
        return None;
    };
    let actions = entries
        .iter()
        .enumerate()
        .filter_map(|(slot, entry)| match decode_action(entry) {
            Ok(action) => Some(action),
            Err(reason) => {
                warn!(event, slot, reason, "protocol: skipping malformed action entry");
                None
            }
        })
        .collect();
    Some(actions)
}

fn decode_checklists(payload: &Value) -> Vec<Checklist> {
    let Value::Array(entries) = payload else {
        warn!(
            event = CHECKLISTS_EVENT,
            "protocol: checklist list is not a sequence; treating as empty"
        );
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(slot, entry)| {
            let id = entry.get("id").and_then(ChecklistId::from_json);
            let Some(id) = id else {
                warn!(slot, "protocol: skipping checklist entry without a valid id");
                return None;
            };
            let name = entry.get("name").map(text_from_json).unwrap_or_default();
            Some(Checklist { id, name })
        })
        .collect()
}

/// A named inbound event, decoded into the shape its handler consumes.
///
/// Decoding never fails: malformed entries are dropped with a diagnostic and any event
/// name outside the checklist-aware set falls through to [`InboundEvent::Legacy`].
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Checklists(Vec<Checklist>),
    CurrentChecklist(Option<ChecklistId>),
    AllData(Vec<ActionRecord>),
    PartialData(Vec<ActionRecord>),
    /// A checklist-aware event whose payload had the wrong overall shape.
    Rejected {
        event: String,
        reason: &'static str,
    },
    Legacy {
        event: String,
        payload: Value,
    },
}

impl InboundEvent {
    pub fn decode(name: &str, payload: Value) -> Self {
        match name {
            CHECKLISTS_EVENT => Self::Checklists(decode_checklists(&payload)),
            CURRENT_CHECKLIST_EVENT => match &payload {
                Value::Object(fields) => Self::CurrentChecklist(
                    fields
                        .get("current_checklist_id")
                        .and_then(ChecklistId::from_json),
                ),
                _ => Self::Rejected {
                    event: name.to_string(),
                    reason: "current checklist payload is not an object",
                },
            },
            ALL_DATA_EVENT => match decode_actions(name, &payload) {
                Some(actions) => Self::AllData(actions),
                None => Self::Rejected {
                    event: name.to_string(),
                    reason: "snapshot payload is not a sequence",
                },
            },
            PARTIAL_DATA_EVENT => match decode_actions(name, &payload) {
                Some(actions) => Self::PartialData(actions),
                None => Self::Rejected {
                    event: name.to_string(),
                    reason: "partial update payload is not a sequence",
                },
            },
            _ => Self::Legacy {
                event: name.to_string(),
                payload,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Checklists(_) => CHECKLISTS_EVENT,
            Self::CurrentChecklist(_) => CURRENT_CHECKLIST_EVENT,
            Self::AllData(_) => ALL_DATA_EVENT,
            Self::PartialData(_) => PARTIAL_DATA_EVENT,
            Self::Rejected { event, .. } | Self::Legacy { event, .. } => event,
        }
    }
}

/// Data requests the model issues to the remote app. None carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundRequest {
    RequestAllData,
    GetCurrentChecklist,
    GetChecklists,
}

impl OutboundRequest {
    pub fn event_name(self) -> &'static str {
        match self {
            Self::RequestAllData => "request_all_data",
            Self::GetCurrentChecklist => "get_current_checklist",
            Self::GetChecklists => "get_checklists",
        }
    }
}

/// Operator commands forwarded to the remote app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleByPosition { normalised_index: NormalisedIndex },
    ToggleById { id: ActionId },
    ResetAll,
    NextChecklist,
    PreviousChecklist,
}

impl Command {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ToggleByPosition { .. } => "toggle_state_by_normalised",
            Self::ToggleById { .. } => "toggle_state",
            Self::ResetAll => "reset_all",
            Self::NextChecklist => "next_checklist",
            Self::PreviousChecklist => "previous_checklist",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub event: &'static str,
    pub payload: Option<Value>,
}

impl OutboundMessage {
    pub fn encode(&self) -> String {
        encode_event(self.event, self.payload.as_ref())
    }
}

impl From<OutboundRequest> for OutboundMessage {
    fn from(request: OutboundRequest) -> Self {
        Self {
            event: request.event_name(),
            payload: None,
        }
    }
}

impl From<Command> for OutboundMessage {
    fn from(command: Command) -> Self {
        let event = command.event_name();
        let payload = match command {
            Command::ToggleByPosition { normalised_index } => {
                Some(json!({ "normalised_index": normalised_index }))
            }
            Command::ToggleById { id } => Some(json!({ "id": id })),
            Command::ResetAll | Command::NextChecklist | Command::PreviousChecklist => None,
        };
        Self { event, payload }
    }
}

/// One decoded websocket text frame of the socket.io (Engine.IO v4) protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Value),
    Close,
    Ping(String),
    Pong(String),
    Noop,
    Connect(Value),
    Disconnect,
    Event { name: String, payload: Value },
    Ack,
    ConnectError(Value),
}

pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    let mut chars = text.chars();
    let packet_type = chars.next().ok_or(ProtocolError::EmptyFrame)?;
    let rest = chars.as_str();
    match packet_type {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping(rest.to_string())),
        '3' => Ok(Frame::Pong(rest.to_string())),
        '4' => decode_socket_packet(rest),
        '6' => Ok(Frame::Noop),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn decode_socket_packet(text: &str) -> Result<Frame, ProtocolError> {
    let mut chars = text.chars();
    let packet_type = chars.next().ok_or(ProtocolError::EmptyFrame)?;
    let body = strip_namespace(chars.as_str());
    match packet_type {
        '0' => Ok(Frame::Connect(parse_optional_json(body)?)),
        '1' => Ok(Frame::Disconnect),
        '2' => decode_event(body),
        '3' => Ok(Frame::Ack),
        '4' => Ok(Frame::ConnectError(parse_optional_json(body)?)),
        other => Err(ProtocolError::UnknownSocketPacket(other)),
    }
}

fn strip_namespace(body: &str) -> &str {
    if !body.starts_with('/') {
        return body;
    }
    match body.find(',') {
        Some(comma) => &body[comma + 1..],
        None => "",
    }
}

fn parse_optional_json(body: &str) -> Result<Value, ProtocolError> {
    if body.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

fn decode_event(body: &str) -> Result<Frame, ProtocolError> {
    // An ack id, when present, sits between the packet type and the array.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let Value::Array(items) = serde_json::from_str::<Value>(body)? else {
        return Err(ProtocolError::MalformedEvent("event body is not an array"));
    };
    let mut items = items.into_iter();
    let Some(Value::String(name)) = items.next() else {
        return Err(ProtocolError::MalformedEvent(
            "event array does not start with a name",
        ));
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok(Frame::Event { name, payload })
}

pub fn encode_event(name: &str, payload: Option<&Value>) -> String {
    let mut items = vec![Value::String(name.to_string())];
    if let Some(payload) = payload {
        items.push(payload.clone());
    }
    format!("42{}", Value::Array(items))
}
