use super::Editor;
use crate::command::Command;
use crate::geom::{Point, Size, point};
use crate::model::{EventData, Node, NodeKind, NodeKindTag, StateData, StateMachine, Transition};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStateParams {
    pub machine_id: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    /// Absolute canvas position; converted to parent-relative when `parent_id` is set.
    pub position: Point,
    #[serde(default)]
    pub dimensions: Option<Size>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub events: Vec<EventData>,
}

/// Final and choice pseudostates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePseudoStateParams {
    pub machine_id: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Absolute canvas position.
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStateParams {
    pub machine_id: String,
    pub parent_id: String,
    pub child_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    pub machine_id: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(machine_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStateNameParams {
    pub machine_id: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStateColorParams {
    pub machine_id: String,
    pub id: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Moves a node, or a note, within its own coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePositionParams {
    pub machine_id: String,
    pub id: String,
    pub position: Point,
}

fn relative_to(sm: &StateMachine, absolute: Point, parent_id: Option<&str>) -> Option<Point> {
    match parent_id {
        None => Some(absolute),
        Some(parent_id) => {
            let origin = sm.absolute_position(parent_id)?;
            Some((absolute - origin).to_point())
        }
    }
}

impl Editor {
    fn sm(&self, machine_id: &str) -> Option<&StateMachine> {
        self.doc.machine(machine_id)
    }

    fn node(&self, machine_id: &str, id: &str) -> Option<&Node> {
        self.sm(machine_id)?.nodes.get(id)
    }

    fn is_state(&self, machine_id: &str, id: &str) -> bool {
        self.node(machine_id, id).is_some_and(Node::is_state)
    }

    /// A caller-supplied id must be unused; otherwise a fresh one is generated.
    pub(super) fn claim_id(&self, machine_id: &str, requested: Option<String>) -> Option<String> {
        let sm = self.sm(machine_id)?;
        match requested {
            Some(id) if sm.contains_id(&id) || id.is_empty() => {
                tracing::debug!(machine_id, %id, "id already taken");
                None
            }
            Some(id) => Some(id),
            None => Some(sm.fresh_id()),
        }
    }

    pub(super) fn insert_node(&mut self, machine_id: &str, id: &str, node: Node) -> Option<()> {
        let index = self.sm(machine_id)?.nodes.len();
        self.exec(Command::CreateNode {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            index,
            node,
        })
        .then_some(())
    }

    pub fn create_state(&mut self, params: CreateStateParams) -> Option<String> {
        let CreateStateParams {
            machine_id,
            id,
            parent_id,
            name,
            position,
            dimensions,
            color,
            events,
        } = params;
        let id = self.claim_id(&machine_id, id)?;
        if let Some(parent_id) = parent_id.as_deref() {
            if !self.is_state(&machine_id, parent_id) {
                tracing::debug!(%machine_id, parent_id, "create state: parent is not a state");
                return None;
            }
        }
        let node = Node {
            parent_id: None,
            position,
            dimensions: dimensions.unwrap_or(self.config.state_size),
            selection: false,
            kind: NodeKind::State(StateData {
                name,
                color,
                events,
                event_selection: None,
            }),
        };
        self.transact("Create state", |ed| {
            ed.insert_node(&machine_id, &id, node)?;
            match parent_id {
                Some(parent_id) => ed.link_inner(&machine_id, &parent_id, &id)?,
                None => ed.ensure_scope_anchor(&machine_id, None, Some(id.as_str()))?,
            }
            Some(id)
        })
    }

    fn create_pseudo_state(
        &mut self,
        params: CreatePseudoStateParams,
        kind: NodeKind,
    ) -> Option<String> {
        let CreatePseudoStateParams {
            machine_id,
            id,
            parent_id,
            position,
        } = params;
        let id = self.claim_id(&machine_id, id)?;
        let sm = self.sm(&machine_id)?;
        if let Some(parent_id) = parent_id.as_deref() {
            if !sm.nodes.get(parent_id).is_some_and(Node::is_state) {
                return None;
            }
        }
        if matches!(kind, NodeKind::Final)
            && self.scope_has_final(&machine_id, parent_id.as_deref(), None)
        {
            tracing::debug!(%machine_id, ?parent_id, "scope already has a final state");
            return None;
        }
        let position = relative_to(sm, position, parent_id.as_deref())?;
        let node = Node {
            parent_id,
            position,
            dimensions: self.config.pseudo_state_size,
            selection: false,
            kind,
        };
        let description = match node.tag() {
            NodeKindTag::Final => "Create final state",
            _ => "Create choice state",
        };
        self.transact(description, |ed| {
            ed.insert_node(&machine_id, &id, node)?;
            Some(id)
        })
    }

    pub fn create_final_state(&mut self, params: CreatePseudoStateParams) -> Option<String> {
        self.create_pseudo_state(params, NodeKind::Final)
    }

    pub fn create_choice_state(&mut self, params: CreatePseudoStateParams) -> Option<String> {
        self.create_pseudo_state(params, NodeKind::Choice)
    }

    fn scope_has_final(&self, machine_id: &str, scope: Option<&str>, except: Option<&str>) -> bool {
        self.sm(machine_id).is_some_and(|sm| {
            sm.nodes.iter().any(|(id, n)| {
                matches!(n.kind, NodeKind::Final)
                    && n.parent_id.as_deref() == scope
                    && Some(id.as_str()) != except
            })
        })
    }

    pub fn change_state_name(&mut self, params: ChangeStateNameParams) -> bool {
        self.change_state_data(&params.machine_id, &params.id, "Rename state", |data| {
            data.name = params.name.clone();
        })
    }

    pub fn change_state_color(&mut self, params: ChangeStateColorParams) -> bool {
        self.change_state_data(&params.machine_id, &params.id, "Change state color", |data| {
            data.color = params.color.clone();
        })
    }

    /// Edits the payload of an ordinary state through one `ChangeState` command.
    pub(super) fn change_state_data(
        &mut self,
        machine_id: &str,
        id: &str,
        description: &str,
        edit: impl FnOnce(&mut StateData),
    ) -> bool {
        self.transact(description, |ed| ed.change_state_data_inner(machine_id, id, edit))
            .is_some()
    }

    pub(super) fn change_state_data_inner(
        &mut self,
        machine_id: &str,
        id: &str,
        edit: impl FnOnce(&mut StateData),
    ) -> Option<()> {
        let before = self.node(machine_id, id)?.as_state()?.clone();
        let mut after = before.clone();
        edit(&mut after);
        if after == before {
            return Some(());
        }
        self.exec(Command::ChangeState {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            before,
            after,
        })
        .then_some(())
    }

    /// Moves any node within its parent's coordinate space.
    pub fn change_state_position(&mut self, params: ChangePositionParams) -> bool {
        let ChangePositionParams {
            machine_id,
            id,
            position,
        } = params;
        self.transact("Move state", |ed| ed.move_node(&machine_id, &id, position))
            .is_some()
    }

    pub(super) fn move_node(&mut self, machine_id: &str, id: &str, to: Point) -> Option<()> {
        let from = self.node(machine_id, id)?.position;
        if from == to {
            return Some(());
        }
        self.exec(Command::MoveNode {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            from,
            to,
        })
        .then_some(())
    }

    /// Reparents `child_id` under `parent_id`.
    ///
    /// Ordinary states, final and choice states can be linked; initial pseudostates are owned
    /// by their scope. Linking into an empty scope makes the child that scope's initial target.
    pub fn link_state(&mut self, params: LinkStateParams) -> bool {
        let LinkStateParams {
            machine_id,
            parent_id,
            child_id,
        } = params;
        self.transact("Link state", |ed| ed.link_inner(&machine_id, &parent_id, &child_id))
            .is_some()
    }

    pub(super) fn link_inner(
        &mut self,
        machine_id: &str,
        parent_id: &str,
        child_id: &str,
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let child = sm.nodes.get(child_id)?;
        if child.is_initial() || parent_id == child_id {
            return None;
        }
        if !sm.nodes.get(parent_id).is_some_and(Node::is_state)
            || sm.is_descendant(parent_id, child_id)
        {
            tracing::debug!(machine_id, parent_id, child_id, "link would break the hierarchy");
            return None;
        }
        if child.parent_id.as_deref() == Some(parent_id) {
            return None;
        }
        let is_state = child.is_state();
        if matches!(child.kind, NodeKind::Final)
            && self.scope_has_final(machine_id, Some(parent_id), Some(child_id))
        {
            return None;
        }

        let old_parent = child.parent_id.clone();
        let from_position = child.position;
        let absolute = sm.absolute_position(child_id)?;
        let scope_was_empty = sm.scope_states(Some(parent_id)).is_empty();

        if is_state {
            self.reanchor_away(machine_id, old_parent.as_deref(), child_id)?;
        }

        let sm = self.sm(machine_id)?;
        let offset = self.config.initial_state_offset;
        let to_position = if is_state && scope_was_empty {
            point(offset, offset)
        } else {
            relative_to(sm, absolute, Some(parent_id))?
        };
        self.exec(Command::SetParent {
            machine_id: machine_id.to_string(),
            id: child_id.to_string(),
            from: old_parent,
            to: Some(parent_id.to_string()),
            from_position,
            to_position,
        })
        .then_some(())?;

        if is_state && scope_was_empty {
            self.ensure_scope_anchor(machine_id, Some(parent_id), Some(child_id))?;
        }
        Some(())
    }

    /// Moves a nested node to the top level, keeping its absolute position.
    pub fn unlink_state(&mut self, params: NodeRef) -> bool {
        self.transact("Unlink state", |ed| ed.unlink_inner(&params.machine_id, &params.id))
            .is_some()
    }

    pub(super) fn unlink_inner(&mut self, machine_id: &str, id: &str) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let node = sm.nodes.get(id)?;
        let old_parent = node.parent_id.clone()?;
        if node.is_initial() {
            return None;
        }
        let is_state = node.is_state();
        if matches!(node.kind, NodeKind::Final)
            && self.scope_has_final(machine_id, None, Some(id))
        {
            return None;
        }
        let from_position = node.position;
        let absolute = sm.absolute_position(id)?;

        if is_state {
            self.reanchor_away(machine_id, Some(old_parent.as_str()), id)?;
        }
        self.exec(Command::SetParent {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            from: Some(old_parent),
            to: None,
            from_position,
            to_position: absolute,
        })
        .then_some(())?;
        if is_state {
            self.ensure_scope_anchor(machine_id, None, Some(id))?;
        }
        Some(())
    }

    /// Deletes an ordinary, final or choice state with every dependent entity.
    pub fn delete_state(&mut self, params: NodeRef) -> bool {
        let allowed = self
            .node(&params.machine_id, &params.id)
            .is_some_and(|n| !n.is_initial());
        if !allowed {
            return false;
        }
        self.transact("Delete state", |ed| ed.delete_node_inner(&params.machine_id, &params.id))
            .is_some()
    }

    pub(super) fn delete_node_inner(&mut self, machine_id: &str, id: &str) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let node = sm.nodes.get(id)?;
        let scope = node.parent_id.clone();
        let is_state = node.is_state();

        if is_state {
            // Nested pseudostates go first, each with its own transitions.
            let nested_pseudo: Vec<String> = sm
                .children(Some(id))
                .into_iter()
                .filter(|c| sm.nodes.get(c).is_some_and(|n| !n.is_state()))
                .collect();
            for child in nested_pseudo {
                self.delete_node_inner(machine_id, &child)?;
            }

            // Nested states move up one level.
            let nested_states = self.sm(machine_id)?.scope_states(Some(id));
            for child in nested_states {
                match scope.as_deref() {
                    Some(grandparent) => self.link_inner(machine_id, grandparent, &child)?,
                    None => self.unlink_inner(machine_id, &child)?,
                }
            }

            self.reanchor_away(machine_id, scope.as_deref(), id)?;
        }

        self.delete_transitions_touching(machine_id, &[id.to_string()])?;

        let sm = self.sm(machine_id)?;
        let index = sm.nodes.get_index_of(id)?;
        let node = sm.nodes.get(id)?.clone();
        self.exec(Command::DeleteNode {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            index,
            node,
        })
        .then_some(())?;

        if is_state {
            self.ensure_scope_anchor(machine_id, scope.as_deref(), None)?;
        }
        Some(())
    }

    /// Makes `state_id` the target of its scope's initial transition.
    ///
    /// Returns `false` when the scope has no initial pseudostate. When `state_id` already is the
    /// target the call succeeds without recording anything.
    pub fn set_initial_state(&mut self, params: NodeRef) -> bool {
        let NodeRef { machine_id, id } = params;
        let Some(node) = self.node(&machine_id, &id) else {
            return false;
        };
        if !node.is_state() {
            return false;
        }
        let scope = node.parent_id.clone();
        let Some((initial_id, transition_id)) = self
            .sm(&machine_id)
            .and_then(|sm| sm.initial_transition_of_scope(scope.as_deref()))
        else {
            return false;
        };
        let already = self
            .sm(&machine_id)
            .and_then(|sm| sm.transitions.get(&transition_id))
            .is_some_and(|t| t.target_id == id);
        if already {
            return true;
        }
        self.transact("Set initial state", |ed| {
            ed.retarget_initial(&machine_id, &initial_id, &transition_id, &id)
        })
        .is_some()
    }

    fn initial_position_for(&self, sm: &StateMachine, target_id: &str) -> Option<Point> {
        let target = sm.nodes.get(target_id)?;
        let offset = self.config.initial_state_offset;
        let mut position = point(target.position.x - offset, target.position.y - offset);
        if target.parent_id.is_some() {
            position = point(position.x.max(0.0), position.y.max(0.0));
        }
        Some(position)
    }

    fn retarget_initial(
        &mut self,
        machine_id: &str,
        initial_id: &str,
        transition_id: &str,
        target_id: &str,
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let before = sm.transitions.get(transition_id)?.clone();
        let position = self.initial_position_for(sm, target_id)?;
        let mut after = before.clone();
        after.target_id = target_id.to_string();
        self.exec(Command::ChangeTransition {
            machine_id: machine_id.to_string(),
            id: transition_id.to_string(),
            before,
            after,
        })
        .then_some(())?;
        self.move_node(machine_id, initial_id, position)
    }

    /// Re-anchors `scope` before `leaving_id` leaves it.
    ///
    /// When `leaving_id` is the initial target, the transition moves to the first other state
    /// of the scope in table order; with no other state left, the initial pseudostate and its
    /// transition are deleted.
    fn reanchor_away(
        &mut self,
        machine_id: &str,
        scope: Option<&str>,
        leaving_id: &str,
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let Some((initial_id, transition_id)) = sm.initial_transition_of_scope(scope) else {
            return Some(());
        };
        if sm.transitions.get(&transition_id)?.target_id != leaving_id {
            return Some(());
        }
        let successor = sm
            .scope_states(scope)
            .into_iter()
            .find(|candidate| candidate != leaving_id);
        match successor {
            Some(successor) => {
                tracing::debug!(machine_id, ?scope, %successor, "re-anchoring initial state");
                self.retarget_initial(machine_id, &initial_id, &transition_id, &successor)
            }
            None => {
                tracing::debug!(machine_id, ?scope, "scope emptied; removing initial state");
                self.delete_node_inner(machine_id, &initial_id)
            }
        }
    }

    /// Restores "one initial pseudostate per populated scope" for `scope`.
    ///
    /// Creates the pair when states exist but no anchor does, targeting `preferred` when it is
    /// a state of the scope, otherwise the first state. Removes a leftover anchor from a scope
    /// without states.
    pub(super) fn ensure_scope_anchor(
        &mut self,
        machine_id: &str,
        scope: Option<&str>,
        preferred: Option<&str>,
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let states = sm.scope_states(scope);
        let initials = sm.initial_nodes_of_scope(scope);
        if states.is_empty() {
            for initial_id in initials {
                self.delete_node_inner(machine_id, &initial_id)?;
            }
            return Some(());
        }
        if !initials.is_empty() {
            return Some(());
        }
        let target = preferred
            .filter(|p| states.iter().any(|s| s == p))
            .map(str::to_string)
            .unwrap_or_else(|| states[0].clone());
        self.create_initial_pair(machine_id, scope, &target)
    }

    fn create_initial_pair(
        &mut self,
        machine_id: &str,
        scope: Option<&str>,
        target_id: &str,
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let position = self.initial_position_for(sm, target_id)?;
        let initial_id = sm.fresh_id();
        let node = Node {
            parent_id: scope.map(str::to_string),
            position,
            dimensions: self.config.pseudo_state_size,
            selection: false,
            kind: NodeKind::Initial,
        };
        self.insert_node(machine_id, &initial_id, node)?;
        let sm = self.sm(machine_id)?;
        let transition_id = sm.fresh_id();
        let index = sm.transitions.len();
        self.exec(Command::CreateTransition {
            machine_id: machine_id.to_string(),
            id: transition_id,
            index,
            transition: Transition {
                source_id: initial_id,
                target_id: target_id.to_string(),
                color: Some(self.config.initial_transition_color.clone()),
                label: None,
                selection: false,
            },
        })
        .then_some(())
    }

    /// Deletes every transition attached to one of `ids`, including transitions attached to
    /// those transitions. Transitions listed in `ids` are left for the caller, even when they
    /// are reachable from each other.
    pub(super) fn delete_transitions_touching(
        &mut self,
        machine_id: &str,
        ids: &[String],
    ) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let mut seen: FxHashSet<String> = ids.iter().cloned().collect();
        let mut order = Vec::new();
        let mut frontier: Vec<String> = ids.to_vec();
        while let Some(id) = frontier.pop() {
            for tid in sm.transitions_touching(&id) {
                if seen.insert(tid.clone()) {
                    frontier.push(tid.clone());
                    order.push(tid);
                }
            }
        }
        // Dependents were discovered last; remove them first.
        for tid in order.into_iter().rev() {
            self.remove_transition_record(machine_id, &tid)?;
        }
        Some(())
    }

    pub(super) fn remove_transition_record(&mut self, machine_id: &str, id: &str) -> Option<()> {
        let sm = self.sm(machine_id)?;
        let index = sm.transitions.get_index_of(id)?;
        let transition = sm.transitions.get(id)?.clone();
        self.exec(Command::DeleteTransition {
            machine_id: machine_id.to_string(),
            id: id.to_string(),
            index,
            transition,
        })
        .then_some(())
    }
}
