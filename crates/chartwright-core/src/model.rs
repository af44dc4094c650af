//! Serializable data model of a diagram document.
//!
//! Entities live in flat, id-keyed tables per state machine. Containment between states is
//! expressed through `parent_id` lookups only; no entity owns another.

use crate::geom::{Point, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub machines: IndexMap<String, StateMachine>,
}

impl Document {
    pub fn machine(&self, machine_id: &str) -> Option<&StateMachine> {
        self.machines.get(machine_id)
    }

    pub fn machine_mut(&mut self, machine_id: &str) -> Option<&mut StateMachine> {
        self.machines.get_mut(machine_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub meta: IndexMap<String, String>,
    #[serde(default)]
    pub nodes: IndexMap<String, Node>,
    #[serde(default)]
    pub transitions: IndexMap<String, Transition>,
    #[serde(default)]
    pub notes: IndexMap<String, Note>,
    /// Keyed by component name.
    #[serde(default)]
    pub components: IndexMap<String, Component>,
}

/// Machine-level attributes that are edited as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub meta: IndexMap<String, String>,
}

impl StateMachine {
    pub fn header(&self) -> MachineHeader {
        MachineHeader {
            name: self.name.clone(),
            platform: self.platform.clone(),
            meta: self.meta.clone(),
        }
    }

    pub fn set_header(&mut self, header: MachineHeader) {
        self.name = header.name;
        self.platform = header.platform;
        self.meta = header.meta;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Parent-relative when `parent_id` is set, absolute otherwise.
    pub position: Point,
    pub dimensions: Size,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selection: bool,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    State(StateData),
    Initial,
    Final,
    Choice,
}

/// Payload-free discriminant of [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKindTag {
    State,
    Initial,
    Final,
    Choice,
}

impl NodeKind {
    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::State(_) => NodeKindTag::State,
            NodeKind::Initial => NodeKindTag::Initial,
            NodeKind::Final => NodeKindTag::Final,
            NodeKind::Choice => NodeKindTag::Choice,
        }
    }
}

impl Node {
    pub fn tag(&self) -> NodeKindTag {
        self.kind.tag()
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, NodeKind::State(_))
    }

    pub fn is_initial(&self) -> bool {
        matches!(self.kind, NodeKind::Initial)
    }

    pub fn as_state(&self) -> Option<&StateData> {
        match &self.kind {
            NodeKind::State(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_state_mut(&mut self) -> Option<&mut StateData> {
        match &mut self.kind {
            NodeKind::State(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub events: Vec<EventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_selection: Option<EventSelection>,
}

/// Sub-entity selection inside a state's event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSelection {
    pub event_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub trigger: Trigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(rename = "do", default)]
    pub actions: Vec<Action>,
}

/// A component method invocation, e.g. `timer.start(5)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub component: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, String>,
}

impl Call {
    pub fn new(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            method: method.into(),
            args: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Call(Call),
    /// Raw text the external mini-language could not structure.
    Text(String),
}

pub type Trigger = Action;

impl Action {
    pub fn component(&self) -> Option<&str> {
        match self {
            Action::Call(call) => Some(&call.component),
            Action::Text(_) => None,
        }
    }

    fn rename_component(&mut self, from: &str, to: &str) {
        if let Action::Call(call) = self {
            if call.component == from {
                call.component = to.to_string();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Equals(Vec<Condition>),
    NotEquals(Vec<Condition>),
    Greater(Vec<Condition>),
    GreaterOrEqual(Vec<Condition>),
    Less(Vec<Condition>),
    LessOrEqual(Vec<Condition>),
    Value(Literal),
    Component(Call),
    Text(String),
}

impl Condition {
    fn operands(&self) -> &[Condition] {
        match self {
            Condition::And(v)
            | Condition::Or(v)
            | Condition::Equals(v)
            | Condition::NotEquals(v)
            | Condition::Greater(v)
            | Condition::GreaterOrEqual(v)
            | Condition::Less(v)
            | Condition::LessOrEqual(v) => v,
            Condition::Value(_) | Condition::Component(_) | Condition::Text(_) => &[],
        }
    }

    fn operands_mut(&mut self) -> &mut [Condition] {
        match self {
            Condition::And(v)
            | Condition::Or(v)
            | Condition::Equals(v)
            | Condition::NotEquals(v)
            | Condition::Greater(v)
            | Condition::GreaterOrEqual(v)
            | Condition::Less(v)
            | Condition::LessOrEqual(v) => v,
            Condition::Value(_) | Condition::Component(_) | Condition::Text(_) => &mut [],
        }
    }

    pub fn references_component(&self, name: &str) -> bool {
        match self {
            Condition::Component(call) => call.component == name,
            _ => self.operands().iter().any(|c| c.references_component(name)),
        }
    }

    pub fn rename_component(&mut self, from: &str, to: &str) {
        match self {
            Condition::Component(call) => {
                if call.component == from {
                    call.component = to.to_string();
                }
            }
            _ => {
                for operand in self.operands_mut() {
                    operand.rename_component(from, to);
                }
            }
        }
    }
}

impl EventData {
    pub fn references_component(&self, name: &str) -> bool {
        self.trigger.component() == Some(name)
            || self
                .condition
                .as_ref()
                .is_some_and(|c| c.references_component(name))
            || self.actions.iter().any(|a| a.component() == Some(name))
    }

    pub fn rename_component(&mut self, from: &str, to: &str) {
        self.trigger.rename_component(from, to);
        if let Some(condition) = &mut self.condition {
            condition.rename_component(from, to);
        }
        for action in &mut self.actions {
            action.rename_component(from, to);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<TransitionLabel>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLabel {
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(rename = "do", default)]
    pub actions: Vec<Action>,
}

impl TransitionLabel {
    pub fn references_component(&self, name: &str) -> bool {
        self.trigger.as_ref().and_then(Action::component) == Some(name)
            || self
                .condition
                .as_ref()
                .is_some_and(|c| c.references_component(name))
            || self.actions.iter().any(|a| a.component() == Some(name))
    }

    pub fn rename_component(&mut self, from: &str, to: &str) {
        if let Some(trigger) = &mut self.trigger {
            trigger.rename_component(from, to);
        }
        if let Some(condition) = &mut self.condition {
            condition.rename_component(from, to);
        }
        for action in &mut self.actions {
            action.rename_component(from, to);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub text: String,
    pub position: Point,
    #[serde(default)]
    pub style: NoteStyle,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStyle {
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            text_color: None,
            background_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Platform catalog entry this component instantiates.
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selection: bool,
}
