//! Structural checks over a whole document.
//!
//! The editor keeps these true after every public call; loading uses them to reject documents
//! before they replace the current one.

use crate::model::{Document, NodeKindTag, StateMachine};
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub machine_id: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.machine_id, self.message)
    }
}

pub fn check_document(doc: &Document) -> Vec<Violation> {
    let mut out = Vec::new();
    for (machine_id, machine) in &doc.machines {
        for message in check_machine(machine) {
            out.push(Violation {
                machine_id: machine_id.clone(),
                message,
            });
        }
    }
    out
}

pub fn check_machine(sm: &StateMachine) -> Vec<String> {
    let mut out = Vec::new();

    for id in sm.transitions.keys() {
        if sm.nodes.contains_key(id) || sm.notes.contains_key(id) {
            out.push(format!("id {id} is used by more than one entity"));
        }
    }
    for id in sm.notes.keys() {
        if sm.nodes.contains_key(id) {
            out.push(format!("id {id} is used by more than one entity"));
        }
    }

    // Parent links.
    for (id, node) in &sm.nodes {
        let Some(parent_id) = node.parent_id.as_deref() else {
            continue;
        };
        match sm.nodes.get(parent_id) {
            None => out.push(format!("node {id} has missing parent {parent_id}")),
            Some(parent) if !parent.is_state() => {
                out.push(format!("node {id} has non-state parent {parent_id}"))
            }
            Some(_) => {
                if sm.is_descendant(parent_id, id) || parent_id == id {
                    out.push(format!("node {id} is part of a parent cycle"));
                }
            }
        }
    }

    // Transition endpoints.
    for (id, t) in &sm.transitions {
        if !sm.nodes.contains_key(&t.source_id) && !sm.notes.contains_key(&t.source_id) {
            out.push(format!("transition {id} has missing source {}", t.source_id));
        }
        if !sm.contains_id(&t.target_id) {
            out.push(format!("transition {id} has missing target {}", t.target_id));
        }
    }

    // Scope anchoring.
    let mut scopes: FxHashMap<Option<&str>, (usize, Vec<&str>, usize)> = FxHashMap::default();
    for (id, node) in &sm.nodes {
        let entry = scopes.entry(node.parent_id.as_deref()).or_default();
        match node.tag() {
            NodeKindTag::State => entry.0 += 1,
            NodeKindTag::Initial => entry.1.push(id),
            NodeKindTag::Final => entry.2 += 1,
            NodeKindTag::Choice => {}
        }
    }
    let mut keys: Vec<_> = scopes.keys().copied().collect();
    keys.sort();
    for scope in keys {
        let (states, initials, finals) = &scopes[&scope];
        let scope_name = scope.unwrap_or("<root>");
        if *finals > 1 {
            out.push(format!("scope {scope_name} has {finals} final states"));
        }
        if *states == 0 {
            if !initials.is_empty() {
                out.push(format!("scope {scope_name} has an initial state but no states"));
            }
            continue;
        }
        if initials.len() != 1 {
            out.push(format!(
                "scope {scope_name} has {} initial states, expected exactly one",
                initials.len()
            ));
            continue;
        }
        let initial_id = initials[0];
        let outgoing = sm.outgoing_transitions(initial_id);
        if outgoing.len() != 1 {
            out.push(format!(
                "initial state {initial_id} has {} outgoing transitions, expected exactly one",
                outgoing.len()
            ));
            continue;
        }
        let target_id = &sm.transitions[&outgoing[0]].target_id;
        let in_scope = sm
            .nodes
            .get(target_id)
            .is_some_and(|n| n.is_state() && n.parent_id.as_deref() == scope);
        if !in_scope {
            out.push(format!(
                "initial state {initial_id} targets {target_id}, \
                 which is not a state of scope {scope_name}"
            ));
        }
    }

    out
}
