//! Copy buffer contents.
//!
//! A copy is a deep snapshot of entities taken from one machine. Pasting re-creates them under
//! fresh ids; [`IdMap`] rewrites the references between copied entities.

use crate::geom::Point;
use crate::model::{Component, EventData, Node, Note, StateMachine, Transition};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum CopiedEntity {
    Node {
        id: String,
        node: Node,
        /// Canvas position at copy time.
        absolute: Point,
        /// Whether the node was its scope's initial target.
        initial_target: bool,
    },
    Transition { id: String, transition: Transition },
    Note { id: String, note: Note },
    Component { name: String, component: Component },
    Event { state_id: String, event: EventData },
}

impl CopiedEntity {
    fn key(&self) -> (&'static str, &str) {
        match self {
            CopiedEntity::Node { id, .. } => ("node", id.as_str()),
            CopiedEntity::Transition { id, .. } => ("transition", id.as_str()),
            CopiedEntity::Note { id, .. } => ("note", id.as_str()),
            CopiedEntity::Component { name, .. } => ("component", name.as_str()),
            CopiedEntity::Event { state_id, .. } => ("event", state_id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyBuffer {
    pub machine_id: String,
    pub entities: Vec<CopiedEntity>,
    /// Number of pastes since the content was copied; drives the paste offset.
    pub pastes: u32,
}

impl CopyBuffer {
    pub fn new(machine_id: String, entities: Vec<CopiedEntity>) -> Self {
        Self {
            machine_id,
            entities,
            pastes: 0,
        }
    }

    /// Whether `other` holds the same source entities; re-copying them keeps the paste offset.
    pub fn same_source(&self, other: &CopyBuffer) -> bool {
        self.machine_id == other.machine_id
            && self.entities.len() == other.entities.len()
            && self
                .entities
                .iter()
                .zip(&other.entities)
                .all(|(a, b)| a.key() == b.key())
    }
}

/// Old id -> new id, for entities re-created by a paste.
#[derive(Debug, Default)]
pub struct IdMap {
    map: FxHashMap<String, String>,
}

impl IdMap {
    pub fn insert(&mut self, old: &str, new: &str) {
        self.map.insert(old.to_string(), new.to_string());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.map.get(old).map(String::as_str)
    }

    /// A mapped id when `old` was pasted, otherwise `old` itself if it still exists in `sm`.
    pub fn resolve(&self, sm: &StateMachine, old: &str) -> Option<String> {
        match self.get(old) {
            Some(new) => Some(new.to_string()),
            None => sm.contains_id(old).then(|| old.to_string()),
        }
    }
}

/// Snapshot of the given entities of `sm`.
///
/// Selected states bring their descendants along. Initial pseudostates and the transitions
/// leaving them are never copied; scope anchors are rebuilt on paste. Transitions between two
/// copied entities come along as well.
pub fn snapshot(
    sm: &StateMachine,
    node_ids: &[String],
    transition_ids: &[String],
    note_ids: &[String],
    component_names: &[String],
    events: &[(String, usize)],
) -> Vec<CopiedEntity> {
    let mut out = Vec::new();

    // Parents before children: breadth-first from the selected roots.
    let mut nodes: Vec<String> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut queue: std::collections::VecDeque<String> = node_ids.iter().cloned().collect();
    while let Some(id) = queue.pop_front() {
        let Some(node) = sm.nodes.get(&id) else {
            continue;
        };
        if node.is_initial() || !seen.insert(id.clone()) {
            continue;
        }
        if node.is_state() {
            queue.extend(sm.children(Some(id.as_str())));
        }
        nodes.push(id);
    }
    // Copied ancestors first; the sort is stable.
    nodes.sort_by_key(|id| depth_in(sm, id, &seen));
    for id in &nodes {
        let (Some(node), Some(absolute)) = (sm.nodes.get(id), sm.absolute_position(id)) else {
            continue;
        };
        out.push(CopiedEntity::Node {
            id: id.clone(),
            node: node.clone(),
            absolute,
            initial_target: sm.initial_transition_to(id).is_some(),
        });
    }

    for id in note_ids {
        if let Some(note) = sm.notes.get(id) {
            seen.insert(id.clone());
            out.push(CopiedEntity::Note {
                id: id.clone(),
                note: note.clone(),
            });
        }
    }

    let explicit: FxHashSet<&str> = transition_ids.iter().map(String::as_str).collect();
    for (id, t) in &sm.transitions {
        if sm.nodes.get(&t.source_id).is_some_and(Node::is_initial) {
            continue;
        }
        let internal = seen.contains(&t.source_id) && seen.contains(&t.target_id);
        if explicit.contains(id.as_str()) || internal {
            out.push(CopiedEntity::Transition {
                id: id.clone(),
                transition: t.clone(),
            });
        }
    }

    for name in component_names {
        if let Some(component) = sm.components.get(name) {
            out.push(CopiedEntity::Component {
                name: name.clone(),
                component: component.clone(),
            });
        }
    }

    for (state_id, index) in events {
        let event = sm
            .nodes
            .get(state_id)
            .and_then(|n| n.as_state())
            .and_then(|s| s.events.get(*index));
        if let Some(event) = event {
            out.push(CopiedEntity::Event {
                state_id: state_id.clone(),
                event: event.clone(),
            });
        }
    }

    out
}

/// Number of copied ancestors above `id`.
fn depth_in(sm: &StateMachine, id: &str, copied: &FxHashSet<String>) -> usize {
    let mut depth = 0;
    let mut cur = sm.nodes.get(id).and_then(|n| n.parent_id.as_deref());
    while let Some(parent) = cur {
        if !copied.contains(parent) || depth > sm.nodes.len() {
            break;
        }
        depth += 1;
        cur = sm.nodes.get(parent).and_then(|n| n.parent_id.as_deref());
    }
    depth
}
