use super::{Editor, NodeRef};
use crate::command::Command;
use crate::geom::{Point, midpoint};
use crate::model::{
    Action, Condition, Node, NodeKind, StateMachine, Transition, TransitionLabel, Trigger,
};
use serde::{Deserialize, Serialize};

/// Label payload; a missing position is resolved when the transition is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelParams {
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(rename = "do", default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransitionParams {
    pub machine_id: String,
    #[serde(default)]
    pub id: Option<String>,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<LabelParams>,
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTransitionParams {
    pub machine_id: String,
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<LabelParams>,
    /// Drops the label entirely; wins over `label`.
    #[serde(default)]
    pub remove_label: bool,
}

fn valid_source(sm: &StateMachine, id: &str) -> bool {
    match sm.nodes.get(id) {
        Some(node) => matches!(node.kind, NodeKind::State(_) | NodeKind::Choice),
        None => sm.notes.contains_key(id),
    }
}

fn valid_target(sm: &StateMachine, id: &str) -> bool {
    match sm.nodes.get(id) {
        Some(node) => !node.is_initial(),
        None => sm.notes.contains_key(id) || sm.transitions.contains_key(id),
    }
}

/// Where an endpoint sits on the canvas, for default label placement.
fn anchor_point(sm: &StateMachine, id: &str) -> Option<Point> {
    if sm.nodes.contains_key(id) {
        return sm.absolute_position(id);
    }
    if let Some(note) = sm.notes.get(id) {
        return Some(note.position);
    }
    let transition = sm.transitions.get(id)?;
    match &transition.label {
        Some(label) => Some(label.position),
        None => sm.absolute_position(&transition.source_id),
    }
}

fn resolve_label(
    sm: &StateMachine,
    source_id: &str,
    target_id: &str,
    label: LabelParams,
) -> Option<TransitionLabel> {
    let position = match label.position {
        Some(position) => position,
        None => midpoint(anchor_point(sm, source_id)?, anchor_point(sm, target_id)?),
    };
    Some(TransitionLabel {
        position,
        trigger: label.trigger,
        condition: label.condition,
        actions: label.actions,
    })
}

impl Editor {
    fn is_initial_transition(&self, machine_id: &str, id: &str) -> bool {
        self.machine(machine_id)
            .and_then(|sm| {
                let t = sm.transitions.get(id)?;
                sm.nodes.get(&t.source_id).map(Node::is_initial)
            })
            .unwrap_or(false)
    }

    /// Creates a transition from a state, choice state or note. Targets may be any node but an
    /// initial pseudostate, a note, or another transition.
    pub fn create_transition(&mut self, params: CreateTransitionParams) -> Option<String> {
        let CreateTransitionParams {
            machine_id,
            id,
            source_id,
            target_id,
            color,
            label,
        } = params;
        let id = self.claim_id(&machine_id, id)?;
        let sm = self.machine(&machine_id)?;
        if !valid_source(sm, &source_id) || !valid_target(sm, &target_id) {
            tracing::debug!(
                %machine_id,
                %source_id,
                %target_id,
                "create transition: invalid endpoints"
            );
            return None;
        }
        let label = match label {
            Some(label) => Some(resolve_label(sm, &source_id, &target_id, label)?),
            None => None,
        };
        let index = sm.transitions.len();
        let transition = Transition {
            source_id,
            target_id,
            color,
            label,
            selection: false,
        };
        self.transact("Create transition", |ed| {
            ed.exec(Command::CreateTransition {
                machine_id: machine_id.clone(),
                id: id.clone(),
                index,
                transition,
            })
            .then_some(id)
        })
    }

    /// Updates a transition. Initial transitions only accept colour changes; their target is
    /// managed through [`Editor::set_initial_state`].
    pub fn change_transition(&mut self, params: ChangeTransitionParams) -> bool {
        let ChangeTransitionParams {
            machine_id,
            id,
            source_id,
            target_id,
            color,
            label,
            remove_label,
        } = params;
        let initial = self.is_initial_transition(&machine_id, &id);
        if initial
            && (source_id.is_some() || target_id.is_some() || label.is_some() || remove_label)
        {
            return false;
        }
        let Some(sm) = self.machine(&machine_id) else {
            return false;
        };
        let Some(before) = sm.transitions.get(&id).cloned() else {
            return false;
        };
        let mut after = before.clone();
        if let Some(source_id) = source_id {
            if !valid_source(sm, &source_id) {
                return false;
            }
            after.source_id = source_id;
        }
        if let Some(target_id) = target_id {
            if target_id == id || !valid_target(sm, &target_id) {
                return false;
            }
            after.target_id = target_id;
        }
        if color.is_some() {
            after.color = color;
        }
        if remove_label {
            after.label = None;
        } else if let Some(mut label) = label {
            // Keep the current label position unless a new one is given.
            if label.position.is_none() {
                label.position = before.label.as_ref().map(|l| l.position);
            }
            let Some(resolved) = resolve_label(sm, &after.source_id, &after.target_id, label) else {
                return false;
            };
            after.label = Some(resolved);
        }
        if after == before {
            return true;
        }
        self.transact("Change transition", |ed| {
            ed.exec(Command::ChangeTransition {
                machine_id: machine_id.clone(),
                id: id.clone(),
                before,
                after,
            })
            .then_some(())
        })
        .is_some()
    }

    /// Moves a transition's label.
    pub fn change_transition_position(&mut self, params: super::ChangePositionParams) -> bool {
        let Some(before) = self
            .machine(&params.machine_id)
            .and_then(|sm| sm.transitions.get(&params.id))
            .cloned()
        else {
            return false;
        };
        let Some(label) = before.label.as_ref() else {
            return false;
        };
        if label.position == params.position {
            return true;
        }
        let mut after = before.clone();
        if let Some(label) = after.label.as_mut() {
            label.position = params.position;
        }
        self.transact("Move transition", |ed| {
            ed.exec(Command::ChangeTransition {
                machine_id: params.machine_id.clone(),
                id: params.id.clone(),
                before,
                after,
            })
            .then_some(())
        })
        .is_some()
    }

    /// Deletes a transition along with transitions attached to it. Initial transitions are
    /// owned by their scope and cannot be deleted directly.
    pub fn delete_transition(&mut self, params: NodeRef) -> bool {
        let NodeRef { machine_id, id } = params;
        let exists = self
            .machine(&machine_id)
            .is_some_and(|sm| sm.transitions.contains_key(&id));
        if !exists || self.is_initial_transition(&machine_id, &id) {
            return false;
        }
        self.transact("Delete transition", |ed| {
            ed.delete_transitions_touching(&machine_id, std::slice::from_ref(&id))?;
            ed.remove_transition_record(&machine_id, &id)
        })
        .is_some()
    }
}
