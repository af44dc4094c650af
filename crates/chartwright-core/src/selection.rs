//! Selection tracking.
//!
//! The manager's set and the per-entity `selection` flags stored in the document always agree:
//! every change goes through [`SelectionManager`], which flips the flag and the set together and
//! reports only the flags that actually flipped.

use crate::model::{Document, EventSelection};
use indexmap::IndexSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selectable {
    pub machine_id: String,
    pub target: SelectTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectTarget {
    Node(String),
    Transition(String),
    Note(String),
    Component(String),
    /// One event (and optionally one of its actions) inside a state.
    Event {
        state_id: String,
        selection: EventSelection,
    },
}

impl Selectable {
    pub fn new(machine_id: impl Into<String>, target: SelectTarget) -> Self {
        Self {
            machine_id: machine_id.into(),
            target,
        }
    }

    pub fn node(machine_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(machine_id, SelectTarget::Node(id.into()))
    }

    pub fn transition(machine_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(machine_id, SelectTarget::Transition(id.into()))
    }

    pub fn note(machine_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(machine_id, SelectTarget::Note(id.into()))
    }

    pub fn component(machine_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(machine_id, SelectTarget::Component(name.into()))
    }

    pub fn event(
        machine_id: impl Into<String>,
        state_id: impl Into<String>,
        event_index: usize,
        action_index: Option<usize>,
    ) -> Self {
        Self::new(
            machine_id,
            SelectTarget::Event {
                state_id: state_id.into(),
                selection: EventSelection {
                    event_index,
                    action_index,
                },
            },
        )
    }

    /// Whether the referenced entity (or event/action slot) exists in `doc`.
    pub fn exists_in(&self, doc: &Document) -> bool {
        let Some(sm) = doc.machine(&self.machine_id) else {
            return false;
        };
        match &self.target {
            SelectTarget::Node(id) => sm.nodes.contains_key(id),
            SelectTarget::Transition(id) => sm.transitions.contains_key(id),
            SelectTarget::Note(id) => sm.notes.contains_key(id),
            SelectTarget::Component(name) => sm.components.contains_key(name),
            SelectTarget::Event { state_id, selection } => sm
                .nodes
                .get(state_id)
                .and_then(|n| n.as_state())
                .and_then(|s| s.events.get(selection.event_index))
                .is_some_and(|ev| selection.action_index.is_none_or(|i| i < ev.actions.len())),
        }
    }

    fn is_flagged(&self, doc: &Document) -> bool {
        let Some(sm) = doc.machine(&self.machine_id) else {
            return false;
        };
        match &self.target {
            SelectTarget::Node(id) => sm.nodes.get(id).is_some_and(|n| n.selection),
            SelectTarget::Transition(id) => sm.transitions.get(id).is_some_and(|t| t.selection),
            SelectTarget::Note(id) => sm.notes.get(id).is_some_and(|n| n.selection),
            SelectTarget::Component(name) => sm.components.get(name).is_some_and(|c| c.selection),
            SelectTarget::Event { state_id, selection } => sm
                .nodes
                .get(state_id)
                .and_then(|n| n.as_state())
                .is_some_and(|s| s.event_selection == Some(*selection)),
        }
    }

    /// Writes the flag; returns whether it changed. Missing entities are left alone.
    fn write_flag(&self, doc: &mut Document, value: bool) -> bool {
        let Some(sm) = doc.machine_mut(&self.machine_id) else {
            return false;
        };
        let flag = match &self.target {
            SelectTarget::Node(id) => sm.nodes.get_mut(id).map(|n| &mut n.selection),
            SelectTarget::Transition(id) => sm.transitions.get_mut(id).map(|t| &mut t.selection),
            SelectTarget::Note(id) => sm.notes.get_mut(id).map(|n| &mut n.selection),
            SelectTarget::Component(name) => sm.components.get_mut(name).map(|c| &mut c.selection),
            SelectTarget::Event { state_id, selection } => {
                let Some(state) = sm.nodes.get_mut(state_id).and_then(|n| n.as_state_mut()) else {
                    return false;
                };
                let next = if value {
                    Some(*selection)
                } else if state.event_selection == Some(*selection) {
                    None
                } else {
                    state.event_selection
                };
                let changed = state.event_selection != next;
                state.event_selection = next;
                return changed;
            }
        };
        match flag {
            Some(flag) if *flag != value => {
                *flag = value;
                true
            }
            _ => false,
        }
    }
}

/// The selected set, kept in agreement with the document's flags.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: IndexSet<Selectable>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> impl Iterator<Item = &Selectable> {
        self.selected.iter()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, item: &Selectable) -> bool {
        self.selected.contains(item)
    }

    /// Adds `item` to the set. Returns `None` when the target does not exist, otherwise the
    /// flips it caused (empty when it was already selected).
    pub fn add(&mut self, doc: &mut Document, item: Selectable) -> Option<Vec<(Selectable, bool)>> {
        if !item.exists_in(doc) {
            return None;
        }
        let mut flips = Vec::new();
        // A state holds at most one event sub-selection.
        if let SelectTarget::Event { state_id, .. } = &item.target {
            let displaced: Vec<Selectable> = self
                .selected
                .iter()
                .filter(|s| {
                    **s != item
                        && s.machine_id == item.machine_id
                        && matches!(
                            &s.target,
                            SelectTarget::Event { state_id: other, .. } if other == state_id
                        )
                })
                .cloned()
                .collect();
            for old in displaced {
                self.selected.shift_remove(&old);
                flips.push((old, false));
            }
        }
        let changed = item.write_flag(doc, true);
        self.selected.insert(item.clone());
        if changed {
            flips.push((item, true));
        }
        Some(flips)
    }

    /// Removes `item` from the set. Returns `None` when the target does not exist.
    pub fn remove(
        &mut self,
        doc: &mut Document,
        item: &Selectable,
    ) -> Option<Vec<(Selectable, bool)>> {
        if !item.exists_in(doc) {
            return None;
        }
        self.selected.shift_remove(item);
        if item.write_flag(doc, false) {
            Some(vec![(item.clone(), false)])
        } else {
            Some(Vec::new())
        }
    }

    /// Deselects everything except the items in `except`.
    pub fn clear(&mut self, doc: &mut Document, except: &[Selectable]) -> Vec<(Selectable, bool)> {
        let mut flips = Vec::new();
        let dropped: Vec<Selectable> = self
            .selected
            .iter()
            .filter(|s| !except.contains(s))
            .cloned()
            .collect();
        for item in dropped {
            self.selected.shift_remove(&item);
            if item.write_flag(doc, false) {
                flips.push((item, false));
            }
        }
        flips
    }

    /// Clears everything else, then selects only `item`.
    pub fn select(
        &mut self,
        doc: &mut Document,
        item: Selectable,
    ) -> Option<Vec<(Selectable, bool)>> {
        if !item.exists_in(doc) {
            return None;
        }
        let mut flips = self.clear(doc, std::slice::from_ref(&item));
        flips.extend(self.add(doc, item)?);
        Some(flips)
    }

    /// Drops entries whose targets vanished, and resynchronises with the document's flags.
    pub fn prune(&mut self, doc: &mut Document) -> Vec<(Selectable, bool)> {
        let mut flips = Vec::new();
        let stale: Vec<Selectable> = self
            .selected
            .iter()
            .filter(|s| !s.exists_in(doc) || !s.is_flagged(doc))
            .cloned()
            .collect();
        for item in stale {
            self.selected.shift_remove(&item);
            item.write_flag(doc, false);
            flips.push((item, false));
        }
        flips
    }

    /// Forgets everything without touching any document (used after a load).
    pub fn reset(&mut self) {
        self.selected.clear();
    }

    /// Rebuilds the set from the flags stored in `doc`.
    pub fn sync_from(&mut self, doc: &Document) {
        self.selected.clear();
        for (machine_id, sm) in &doc.machines {
            for (id, node) in &sm.nodes {
                if node.selection {
                    self.selected.insert(Selectable::node(machine_id, id));
                }
                if let Some(sel) = node.as_state().and_then(|s| s.event_selection) {
                    self.selected.insert(Selectable::new(
                        machine_id.clone(),
                        SelectTarget::Event {
                            state_id: id.clone(),
                            selection: sel,
                        },
                    ));
                }
            }
            for (id, t) in &sm.transitions {
                if t.selection {
                    self.selected.insert(Selectable::transition(machine_id, id));
                }
            }
            for (id, n) in &sm.notes {
                if n.selection {
                    self.selected.insert(Selectable::note(machine_id, id));
                }
            }
            for (name, c) in &sm.components {
                if c.selection {
                    self.selected.insert(Selectable::component(machine_id, name));
                }
            }
        }
    }
}
