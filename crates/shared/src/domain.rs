use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier exactly as the remote app sends it: a JSON integer or a string.
///
/// `1` and `"1"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueId {
    Int(i64),
    Text(String),
}

impl OpaqueId {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    return Some(Self::Int(int));
                }
                let float = number.as_f64()?;
                if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
                    Some(Self::Int(float as i64))
                } else {
                    None
                }
            }
            Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }

    /// `0` and `""` stand for "nothing selected" on the remote side.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Text(value) => !value.is_empty(),
        }
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub OpaqueId);

        impl $name {
            pub fn from_json(value: &Value) -> Option<Self> {
                OpaqueId::from_json(value).map(Self)
            }

            pub fn is_truthy(&self) -> bool {
                self.0.is_truthy()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(OpaqueId::Int(value))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(OpaqueId::Text(value.to_string()))
            }
        }
    };
}

id_newtype!(ActionId);
id_newtype!(ChecklistId);

/// Key of a flat-mode entry: the id spelled as a JavaScript property key.
///
/// Old clients kept flat entries in a plain object, so `1`, `1.0` and `"1"` all name the
/// same entry and `null` names the entry `"null"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyKey(pub String);

impl LegacyKey {
    pub fn from_json(value: &Value) -> Self {
        Self(property_key(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for LegacyKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for LegacyKey {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

fn property_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return int.to_string();
            }
            if let Some(uint) = number.as_u64() {
                return uint.to_string();
            }
            match number.as_f64() {
                Some(float) if float == 0.0 => "0".to_string(),
                Some(float) if float.fract() == 0.0 && float.abs() < 1e21 => format!("{float:.0}"),
                Some(float) => float.to_string(),
                None => number.to_string(),
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => property_key(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// 1-based position of an action inside its checklist.
pub type NormalisedIndex = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub checklist_id: ChecklistId,
    pub normalised_index: NormalisedIndex,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub name: String,
}

/// Flat-mode action state, keyed externally by [`LegacyKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEntry {
    pub status: bool,
    pub text: String,
}
