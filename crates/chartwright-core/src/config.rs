use crate::error::{Error, Result};
use crate::geom::{Size, size};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tunables of the editing engine.
///
/// Settings are usually built from JSON: user overrides are deep-merged onto
/// [`EditorConfig::defaults_value`] before deserializing, so partial objects such as
/// `{"history": {"depth": 20}}` are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Distance between an initial pseudostate and the state it points to.
    pub initial_state_offset: f64,
    pub paste_offset_step: f64,
    pub history: HistoryConfig,
    pub state_size: Size,
    pub pseudo_state_size: Size,
    pub note_width: f64,
    pub initial_transition_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of undo groups kept; the oldest group is evicted first.
    pub depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_state_offset: 100.0,
            paste_offset_step: 10.0,
            history: HistoryConfig { depth: 100 },
            state_size: size(450.0, 100.0),
            pseudo_state_size: size(50.0, 50.0),
            note_width: 200.0,
            initial_transition_color: "#0000FF".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn defaults_value() -> Value {
        // `Size` serializes as a `[w, h]` pair.
        json!({
            "initialStateOffset": 100.0,
            "pasteOffsetStep": 10.0,
            "history": { "depth": 100 },
            "stateSize": [450.0, 100.0],
            "pseudoStateSize": [50.0, 50.0],
            "noteWidth": 200.0,
            "initialTransitionColor": "#0000FF",
        })
    }

    /// Builds a config from a (possibly partial) JSON object.
    pub fn from_value(overrides: &Value) -> Result<Self> {
        if !overrides.is_object() && !overrides.is_null() {
            return Err(Error::InvalidConfig {
                message: "expected a JSON object".to_string(),
            });
        }
        let mut merged = Self::defaults_value();
        deep_merge_value(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        if config.history.depth == 0 {
            return Err(Error::InvalidConfig {
                message: "history.depth must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
