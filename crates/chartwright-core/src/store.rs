//! Per-entity primitives over a [`StateMachine`]'s tables.
//!
//! Nothing here keeps cross-entity consistency; that is the editor's job. Inserts return `None`
//! when the id is taken, setters return `false` for unknown ids, removals never cascade.
//! Setters leave selection flags alone: those belong to the selection manager.

use crate::geom::{Point, vector};
use crate::model::{
    Component, Document, MachineHeader, Node, Note, StateData, StateMachine, Transition,
};

fn insert_at<V>(
    map: &mut indexmap::IndexMap<String, V>,
    id: String,
    index: usize,
    value: V,
) -> Option<String> {
    if map.contains_key(&id) {
        return None;
    }
    let index = index.min(map.len());
    map.shift_insert(index, id.clone(), value);
    Some(id)
}

fn remove_indexed<V>(map: &mut indexmap::IndexMap<String, V>, id: &str) -> Option<(usize, V)> {
    let index = map.get_index_of(id)?;
    let value = map.shift_remove(id)?;
    Some((index, value))
}

impl StateMachine {
    /// Whether `id` names any node, transition or note in this machine.
    pub fn contains_id(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
            || self.transitions.contains_key(id)
            || self.notes.contains_key(id)
    }

    pub fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string();
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    pub fn insert_node(&mut self, id: String, index: usize, node: Node) -> Option<String> {
        if self.contains_id(&id) {
            return None;
        }
        insert_at(&mut self.nodes, id, index, node)
    }

    pub fn remove_node(&mut self, id: &str) -> Option<(usize, Node)> {
        remove_indexed(&mut self.nodes, id)
    }

    pub fn set_node_position(&mut self, id: &str, position: Point) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.position = position;
        true
    }

    pub fn set_node_parent(
        &mut self,
        id: &str,
        parent_id: Option<String>,
        position: Point,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.parent_id = parent_id;
        node.position = position;
        true
    }

    pub fn set_state_data(&mut self, id: &str, mut data: StateData) -> bool {
        let Some(current) = self.nodes.get_mut(id).and_then(Node::as_state_mut) else {
            return false;
        };
        data.event_selection = current.event_selection;
        *current = data;
        true
    }

    pub fn insert_transition(
        &mut self,
        id: String,
        index: usize,
        transition: Transition,
    ) -> Option<String> {
        if self.contains_id(&id) {
            return None;
        }
        insert_at(&mut self.transitions, id, index, transition)
    }

    pub fn remove_transition(&mut self, id: &str) -> Option<(usize, Transition)> {
        remove_indexed(&mut self.transitions, id)
    }

    pub fn set_transition(&mut self, id: &str, mut transition: Transition) -> bool {
        let Some(current) = self.transitions.get_mut(id) else {
            return false;
        };
        transition.selection = current.selection;
        *current = transition;
        true
    }

    pub fn insert_note(&mut self, id: String, index: usize, note: Note) -> Option<String> {
        if self.contains_id(&id) {
            return None;
        }
        insert_at(&mut self.notes, id, index, note)
    }

    pub fn remove_note(&mut self, id: &str) -> Option<(usize, Note)> {
        remove_indexed(&mut self.notes, id)
    }

    pub fn set_note(&mut self, id: &str, mut note: Note) -> bool {
        let Some(current) = self.notes.get_mut(id) else {
            return false;
        };
        note.selection = current.selection;
        *current = note;
        true
    }

    pub fn insert_component(
        &mut self,
        name: String,
        index: usize,
        component: Component,
    ) -> Option<String> {
        insert_at(&mut self.components, name, index, component)
    }

    pub fn remove_component(&mut self, name: &str) -> Option<(usize, Component)> {
        remove_indexed(&mut self.components, name)
    }

    pub fn set_component(&mut self, name: &str, mut component: Component) -> bool {
        let Some(current) = self.components.get_mut(name) else {
            return false;
        };
        component.selection = current.selection;
        *current = component;
        true
    }

    /// Re-keys a component in place, keeping its table position. References are not touched.
    pub fn rename_component_key(&mut self, from: &str, to: &str) -> bool {
        if from == to || self.components.contains_key(to) {
            return false;
        }
        let Some((index, component)) = remove_indexed(&mut self.components, from) else {
            return false;
        };
        self.components.shift_insert(index, to.to_string(), component);
        true
    }

    pub fn next_component_order(&self) -> u32 {
        self.components
            .values()
            .map(|c| c.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Ordinary states whose parent is `parent_id`, in table order.
    pub fn scope_states(&self, parent_id: Option<&str>) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_state() && n.parent_id.as_deref() == parent_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Every node whose parent is `parent_id`, in table order.
    pub fn children(&self, parent_id: Option<&str>) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent_id.as_deref() == parent_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn initial_nodes_of_scope(&self, parent_id: Option<&str>) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_initial() && n.parent_id.as_deref() == parent_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn outgoing_transitions(&self, source_id: &str) -> Vec<String> {
        self.transitions
            .iter()
            .filter(|(_, t)| t.source_id == source_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// The transition leaving the scope's initial pseudostate, with that pseudostate's id.
    pub fn initial_transition_of_scope(&self, parent_id: Option<&str>) -> Option<(String, String)> {
        self.initial_nodes_of_scope(parent_id).into_iter().find_map(|initial_id| {
            let transition_id = self.outgoing_transitions(&initial_id).into_iter().next()?;
            Some((initial_id, transition_id))
        })
    }

    /// The initial transition whose target is `state_id`, if any.
    pub fn initial_transition_to(&self, state_id: &str) -> Option<String> {
        self.transitions
            .iter()
            .find(|(_, t)| {
                t.target_id == state_id
                    && self.nodes.get(&t.source_id).is_some_and(Node::is_initial)
            })
            .map(|(id, _)| id.clone())
    }

    /// Transitions having `id` as source or target.
    pub fn transitions_touching(&self, id: &str) -> Vec<String> {
        self.transitions
            .iter()
            .filter(|(_, t)| t.source_id == id || t.target_id == id)
            .map(|(tid, _)| tid.clone())
            .collect()
    }

    pub fn absolute_position(&self, id: &str) -> Option<Point> {
        let node = self.nodes.get(id)?;
        let mut position = node.position;
        let mut parent = node.parent_id.as_deref();
        let mut hops = 0usize;
        while let Some(parent_id) = parent {
            let p = self.nodes.get(parent_id)?;
            position += vector(p.position.x, p.position.y);
            parent = p.parent_id.as_deref();
            hops += 1;
            if hops > self.nodes.len() {
                return None;
            }
        }
        Some(position)
    }

    /// Whether `ancestor_id` appears in the parent chain of `id`.
    pub fn is_descendant(&self, id: &str, ancestor_id: &str) -> bool {
        let mut cur = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        let mut hops = 0usize;
        while let Some(parent_id) = cur {
            if parent_id == ancestor_id {
                return true;
            }
            hops += 1;
            if hops > self.nodes.len() {
                return false;
            }
            cur = self.nodes.get(parent_id).and_then(|n| n.parent_id.as_deref());
        }
        false
    }
}

impl Document {
    pub fn insert_machine(
        &mut self,
        id: String,
        index: usize,
        machine: StateMachine,
    ) -> Option<String> {
        insert_at(&mut self.machines, id, index, machine)
    }

    pub fn remove_machine(&mut self, id: &str) -> Option<(usize, StateMachine)> {
        remove_indexed(&mut self.machines, id)
    }

    pub fn set_machine_header(&mut self, id: &str, header: MachineHeader) -> bool {
        let Some(machine) = self.machines.get_mut(id) else {
            return false;
        };
        machine.set_header(header);
        true
    }

    pub fn fresh_machine_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string();
            if !self.machines.contains_key(&id) {
                return id;
            }
        }
    }
}
