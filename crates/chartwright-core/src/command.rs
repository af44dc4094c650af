//! Invertible primitive mutations.
//!
//! Every edit the engine records is one of these variants. Each carries the data needed both to
//! replay and to reverse itself, so history never has to consult the document to undo.
//! Table positions are recorded so that undoing a delete puts the entity back where it was.

use crate::bus::ChangeEvent;
use crate::geom::Point;
use crate::model::{
    Component, Document, MachineHeader, Node, Note, StateData, StateMachine, Transition,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateNode {
        machine_id: String,
        id: String,
        index: usize,
        node: Node,
    },
    DeleteNode {
        machine_id: String,
        id: String,
        index: usize,
        node: Node,
    },
    /// Reparenting always rewrites the position, since it is relative to the parent.
    SetParent {
        machine_id: String,
        id: String,
        from: Option<String>,
        to: Option<String>,
        from_position: Point,
        to_position: Point,
    },
    MoveNode {
        machine_id: String,
        id: String,
        from: Point,
        to: Point,
    },
    ChangeState {
        machine_id: String,
        id: String,
        before: StateData,
        after: StateData,
    },
    CreateTransition {
        machine_id: String,
        id: String,
        index: usize,
        transition: Transition,
    },
    DeleteTransition {
        machine_id: String,
        id: String,
        index: usize,
        transition: Transition,
    },
    ChangeTransition {
        machine_id: String,
        id: String,
        before: Transition,
        after: Transition,
    },
    CreateNote {
        machine_id: String,
        id: String,
        index: usize,
        note: Note,
    },
    DeleteNote {
        machine_id: String,
        id: String,
        index: usize,
        note: Note,
    },
    ChangeNote {
        machine_id: String,
        id: String,
        before: Note,
        after: Note,
    },
    AddComponent {
        machine_id: String,
        name: String,
        index: usize,
        component: Component,
    },
    DeleteComponent {
        machine_id: String,
        name: String,
        index: usize,
        component: Component,
    },
    ChangeComponent {
        machine_id: String,
        name: String,
        before: Component,
        after: Component,
    },
    /// Re-keys the component only; references are rewritten by separate commands.
    RenameComponent {
        machine_id: String,
        from: String,
        to: String,
    },
    CreateMachine {
        machine_id: String,
        index: usize,
        machine: StateMachine,
    },
    DeleteMachine {
        machine_id: String,
        index: usize,
        machine: StateMachine,
    },
    ChangeMachine {
        machine_id: String,
        before: MachineHeader,
        after: MachineHeader,
    },
}

impl Command {
    pub fn machine_id(&self) -> &str {
        match self {
            Command::CreateNode { machine_id, .. }
            | Command::DeleteNode { machine_id, .. }
            | Command::SetParent { machine_id, .. }
            | Command::MoveNode { machine_id, .. }
            | Command::ChangeState { machine_id, .. }
            | Command::CreateTransition { machine_id, .. }
            | Command::DeleteTransition { machine_id, .. }
            | Command::ChangeTransition { machine_id, .. }
            | Command::CreateNote { machine_id, .. }
            | Command::DeleteNote { machine_id, .. }
            | Command::ChangeNote { machine_id, .. }
            | Command::AddComponent { machine_id, .. }
            | Command::DeleteComponent { machine_id, .. }
            | Command::ChangeComponent { machine_id, .. }
            | Command::RenameComponent { machine_id, .. }
            | Command::CreateMachine { machine_id, .. }
            | Command::DeleteMachine { machine_id, .. }
            | Command::ChangeMachine { machine_id, .. } => machine_id,
        }
    }

    /// Strips selection state from entity snapshots, so replaying history never resurrects a
    /// selection the selection manager does not know about.
    pub fn without_selection(mut self) -> Self {
        match &mut self {
            Command::CreateNode { node, .. } | Command::DeleteNode { node, .. } => {
                clear_node_selection(node)
            }
            Command::CreateTransition { transition, .. }
            | Command::DeleteTransition { transition, .. } => {
                transition.selection = false;
            }
            Command::CreateNote { note, .. } | Command::DeleteNote { note, .. } => {
                note.selection = false
            }
            Command::AddComponent { component, .. }
            | Command::DeleteComponent { component, .. } => {
                component.selection = false;
            }
            Command::CreateMachine { machine, .. } | Command::DeleteMachine { machine, .. } => {
                machine.nodes.values_mut().for_each(clear_node_selection);
                machine.transitions.values_mut().for_each(|t| t.selection = false);
                machine.notes.values_mut().for_each(|n| n.selection = false);
                machine.components.values_mut().for_each(|c| c.selection = false);
            }
            _ => {}
        }
        self
    }

    /// The command that exactly reverses `self`.
    pub fn invert(&self) -> Command {
        match self.clone() {
            Command::CreateNode {
                machine_id,
                id,
                index,
                node,
            } => Command::DeleteNode {
                machine_id,
                id,
                index,
                node,
            },
            Command::DeleteNode {
                machine_id,
                id,
                index,
                node,
            } => Command::CreateNode {
                machine_id,
                id,
                index,
                node,
            },
            Command::SetParent {
                machine_id,
                id,
                from,
                to,
                from_position,
                to_position,
            } => Command::SetParent {
                machine_id,
                id,
                from: to,
                to: from,
                from_position: to_position,
                to_position: from_position,
            },
            Command::MoveNode {
                machine_id,
                id,
                from,
                to,
            } => Command::MoveNode {
                machine_id,
                id,
                from: to,
                to: from,
            },
            Command::ChangeState {
                machine_id,
                id,
                before,
                after,
            } => Command::ChangeState {
                machine_id,
                id,
                before: after,
                after: before,
            },
            Command::CreateTransition {
                machine_id,
                id,
                index,
                transition,
            } => Command::DeleteTransition {
                machine_id,
                id,
                index,
                transition,
            },
            Command::DeleteTransition {
                machine_id,
                id,
                index,
                transition,
            } => Command::CreateTransition {
                machine_id,
                id,
                index,
                transition,
            },
            Command::ChangeTransition {
                machine_id,
                id,
                before,
                after,
            } => Command::ChangeTransition {
                machine_id,
                id,
                before: after,
                after: before,
            },
            Command::CreateNote {
                machine_id,
                id,
                index,
                note,
            } => Command::DeleteNote {
                machine_id,
                id,
                index,
                note,
            },
            Command::DeleteNote {
                machine_id,
                id,
                index,
                note,
            } => Command::CreateNote {
                machine_id,
                id,
                index,
                note,
            },
            Command::ChangeNote {
                machine_id,
                id,
                before,
                after,
            } => Command::ChangeNote {
                machine_id,
                id,
                before: after,
                after: before,
            },
            Command::AddComponent {
                machine_id,
                name,
                index,
                component,
            } => Command::DeleteComponent {
                machine_id,
                name,
                index,
                component,
            },
            Command::DeleteComponent {
                machine_id,
                name,
                index,
                component,
            } => Command::AddComponent {
                machine_id,
                name,
                index,
                component,
            },
            Command::ChangeComponent {
                machine_id,
                name,
                before,
                after,
            } => Command::ChangeComponent {
                machine_id,
                name,
                before: after,
                after: before,
            },
            Command::RenameComponent { machine_id, from, to } => Command::RenameComponent {
                machine_id,
                from: to,
                to: from,
            },
            Command::CreateMachine {
                machine_id,
                index,
                machine,
            } => Command::DeleteMachine {
                machine_id,
                index,
                machine,
            },
            Command::DeleteMachine {
                machine_id,
                index,
                machine,
            } => Command::CreateMachine {
                machine_id,
                index,
                machine,
            },
            Command::ChangeMachine {
                machine_id,
                before,
                after,
            } => Command::ChangeMachine {
                machine_id,
                before: after,
                after: before,
            },
        }
    }

    /// Applies the command. Returns `false`, leaving `doc` untouched, when the document is not in
    /// the state the command expects (missing entity, taken id, stale parent).
    pub fn apply(&self, doc: &mut Document) -> bool {
        match self {
            Command::CreateMachine {
                machine_id,
                index,
                machine,
            } => return doc.insert_machine(machine_id.clone(), *index, machine.clone()).is_some(),
            Command::DeleteMachine { machine_id, .. } => {
                return doc.remove_machine(machine_id).is_some();
            }
            Command::ChangeMachine { machine_id, after, .. } => {
                return doc.set_machine_header(machine_id, after.clone());
            }
            _ => {}
        }

        let Some(sm) = doc.machine_mut(self.machine_id()) else {
            return false;
        };
        match self {
            Command::CreateNode { id, index, node, .. } => {
                sm.insert_node(id.clone(), *index, node.clone()).is_some()
            }
            Command::DeleteNode { id, .. } => sm.remove_node(id).is_some(),
            Command::SetParent {
                id,
                from,
                to,
                to_position,
                ..
            } => {
                let matches = sm.nodes.get(id).is_some_and(|n| n.parent_id == *from);
                if !matches {
                    return false;
                }
                if let Some(parent) = to {
                    let parent_ok = sm.nodes.get(parent).is_some_and(Node::is_state);
                    if !parent_ok || parent == id || sm.is_descendant(parent, id) {
                        return false;
                    }
                }
                sm.set_node_parent(id, to.clone(), *to_position)
            }
            Command::MoveNode { id, to, .. } => sm.set_node_position(id, *to),
            Command::ChangeState { id, after, .. } => sm.set_state_data(id, after.clone()),
            Command::CreateTransition {
                id,
                index,
                transition,
                ..
            } => sm.insert_transition(id.clone(), *index, transition.clone()).is_some(),
            Command::DeleteTransition { id, .. } => sm.remove_transition(id).is_some(),
            Command::ChangeTransition { id, after, .. } => sm.set_transition(id, after.clone()),
            Command::CreateNote { id, index, note, .. } => {
                sm.insert_note(id.clone(), *index, note.clone()).is_some()
            }
            Command::DeleteNote { id, .. } => sm.remove_note(id).is_some(),
            Command::ChangeNote { id, after, .. } => sm.set_note(id, after.clone()),
            Command::AddComponent {
                name,
                index,
                component,
                ..
            } => sm.insert_component(name.clone(), *index, component.clone()).is_some(),
            Command::DeleteComponent { name, .. } => sm.remove_component(name).is_some(),
            Command::ChangeComponent { name, after, .. } => sm.set_component(name, after.clone()),
            Command::RenameComponent { from, to, .. } => sm.rename_component_key(from, to),
            Command::CreateMachine { .. }
            | Command::DeleteMachine { .. }
            | Command::ChangeMachine { .. } => {
                false
            }
        }
    }

    /// The bus notification announcing this command once applied.
    pub fn event(&self) -> ChangeEvent {
        let machine_id = self.machine_id().to_string();
        match self {
            Command::CreateNode { id, node, .. } => ChangeEvent::CreateState {
                machine_id,
                id: id.clone(),
                kind: node.tag(),
                parent_id: node.parent_id.clone(),
            },
            Command::DeleteNode { id, node, .. } => ChangeEvent::DeleteState {
                machine_id,
                id: id.clone(),
                kind: node.tag(),
            },
            Command::SetParent { id, to: Some(parent), .. } => ChangeEvent::LinkState {
                machine_id,
                id: id.clone(),
                parent_id: parent.clone(),
            },
            Command::SetParent { id, to: None, .. } => ChangeEvent::UnlinkState {
                machine_id,
                id: id.clone(),
            },
            Command::MoveNode { id, to, .. } => ChangeEvent::ChangeStatePosition {
                machine_id,
                id: id.clone(),
                position: *to,
            },
            Command::ChangeState { id, .. } => ChangeEvent::ChangeState {
                machine_id,
                id: id.clone(),
            },
            Command::CreateTransition { id, .. } => ChangeEvent::CreateTransition {
                machine_id,
                id: id.clone(),
            },
            Command::DeleteTransition { id, .. } => ChangeEvent::DeleteTransition {
                machine_id,
                id: id.clone(),
            },
            Command::ChangeTransition { id, .. } => ChangeEvent::ChangeTransition {
                machine_id,
                id: id.clone(),
            },
            Command::CreateNote { id, .. } => ChangeEvent::CreateNote {
                machine_id,
                id: id.clone(),
            },
            Command::DeleteNote { id, .. } => ChangeEvent::DeleteNote {
                machine_id,
                id: id.clone(),
            },
            Command::ChangeNote { id, .. } => ChangeEvent::ChangeNote {
                machine_id,
                id: id.clone(),
            },
            Command::AddComponent { name, .. } => ChangeEvent::AddComponent {
                machine_id,
                name: name.clone(),
            },
            Command::DeleteComponent { name, .. } => ChangeEvent::DeleteComponent {
                machine_id,
                name: name.clone(),
            },
            Command::ChangeComponent { name, .. } => ChangeEvent::ChangeComponent {
                machine_id,
                name: name.clone(),
            },
            Command::RenameComponent { from, to, .. } => ChangeEvent::RenameComponent {
                machine_id,
                from: from.clone(),
                to: to.clone(),
            },
            Command::CreateMachine { .. } => ChangeEvent::CreateStateMachine { machine_id },
            Command::DeleteMachine { .. } => ChangeEvent::DeleteStateMachine { machine_id },
            Command::ChangeMachine { .. } => ChangeEvent::ChangeStateMachine { machine_id },
        }
    }
}

fn clear_node_selection(node: &mut Node) {
    node.selection = false;
    if let Some(state) = node.as_state_mut() {
        state.event_selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, size};
    use crate::model::NodeKind;

    fn doc_with_machine() -> Document {
        let mut doc = Document::default();
        doc.insert_machine("m".into(), 0, StateMachine::default());
        doc
    }

    fn state_node(parent: Option<&str>) -> Node {
        Node {
            parent_id: parent.map(str::to_string),
            position: point(5.0, 5.0),
            dimensions: size(10.0, 10.0),
            selection: false,
            kind: NodeKind::State(StateData::default()),
        }
    }

    #[test]
    fn invert_of_invert_is_identity() {
        let cmd = Command::SetParent {
            machine_id: "m".into(),
            id: "a".into(),
            from: None,
            to: Some("b".into()),
            from_position: point(1.0, 2.0),
            to_position: point(3.0, 4.0),
        };
        assert_eq!(cmd.invert().invert(), cmd);
    }

    #[test]
    fn apply_then_inverse_restores_document() {
        let mut doc = doc_with_machine();
        let before = doc.clone();
        let cmd = Command::CreateNode {
            machine_id: "m".into(),
            id: "a".into(),
            index: 0,
            node: state_node(None),
        };
        assert!(cmd.apply(&mut doc));
        assert!(!cmd.apply(&mut doc), "id is already taken");
        assert!(cmd.invert().apply(&mut doc));
        assert_eq!(doc, before);
    }

    #[test]
    fn set_parent_refuses_stale_source_and_cycles() {
        let mut doc = doc_with_machine();
        let sm = doc.machine_mut("m").unwrap();
        sm.insert_node("a".into(), 0, state_node(None));
        sm.insert_node("b".into(), 1, state_node(Some("a")));
        let stale = Command::SetParent {
            machine_id: "m".into(),
            id: "b".into(),
            from: None,
            to: Some("a".into()),
            from_position: point(0.0, 0.0),
            to_position: point(0.0, 0.0),
        };
        assert!(!stale.apply(&mut doc));
        let cycle = Command::SetParent {
            machine_id: "m".into(),
            id: "a".into(),
            from: None,
            to: Some("b".into()),
            from_position: point(0.0, 0.0),
            to_position: point(0.0, 0.0),
        };
        assert!(!cycle.apply(&mut doc));
    }

    #[test]
    fn unknown_machine_is_rejected() {
        let mut doc = Document::default();
        let cmd = Command::MoveNode {
            machine_id: "nope".into(),
            id: "a".into(),
            from: point(0.0, 0.0),
            to: point(1.0, 1.0),
        };
        assert!(!cmd.apply(&mut doc));
    }
}
