use super::Editor;
use super::components::vacant_component_name;
use crate::clipboard::{self, CopiedEntity, CopyBuffer, IdMap};
use crate::command::Command;
use crate::geom::{Point, vector};
use crate::model::{Node, NodeKind, Transition};
use crate::selection::SelectTarget;
use rustc_hash::{FxHashMap, FxHashSet};

impl Editor {
    /// Snapshots the selection of the first selected entity's machine.
    ///
    /// Copying different content resets the paste offset; copying the same content again keeps
    /// stepping it.
    pub fn copy_selected(&mut self) -> bool {
        let Some(machine_id) = self.selection.selected().next().map(|s| s.machine_id.clone()) else {
            return false;
        };
        let mut nodes = Vec::new();
        let mut transitions = Vec::new();
        let mut notes = Vec::new();
        let mut components = Vec::new();
        let mut events = Vec::new();
        for item in self.selection.selected().filter(|s| s.machine_id == machine_id) {
            match &item.target {
                SelectTarget::Node(id) => nodes.push(id.clone()),
                SelectTarget::Transition(id) => transitions.push(id.clone()),
                SelectTarget::Note(id) => notes.push(id.clone()),
                SelectTarget::Component(name) => components.push(name.clone()),
                SelectTarget::Event { state_id, selection } => {
                    events.push((state_id.clone(), selection.event_index))
                }
            }
        }
        // A selected event means "copy the event", not its state.
        nodes.retain(|id| !events.iter().any(|(state_id, _)| state_id == id));
        let Some(sm) = self.machine(&machine_id) else {
            return false;
        };
        let entities = clipboard::snapshot(sm, &nodes, &transitions, &notes, &components, &events);
        if entities.is_empty() {
            return false;
        }
        let mut buffer = CopyBuffer::new(machine_id, entities);
        if let Some(previous) = &self.clipboard {
            if previous.same_source(&buffer) {
                buffer.pastes = previous.pastes;
            }
        }
        tracing::debug!(entities = buffer.entities.len(), "copied selection");
        self.clipboard = Some(buffer);
        true
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Pastes into the machine the content was copied from.
    pub fn paste(&mut self) -> Option<Vec<String>> {
        let machine_id = self.clipboard.as_ref()?.machine_id.clone();
        self.paste_into(&machine_id)
    }

    /// Re-creates the copied entities in `machine_id` under fresh ids, shifted by the paste
    /// offset. Returns the ids (or component names) of everything created, or `None` when every
    /// copied entity was skipped; the offset only steps on a successful paste.
    pub fn paste_into(&mut self, machine_id: &str) -> Option<Vec<String>> {
        let buffer = self.clipboard.clone()?;
        self.machine(machine_id)?;
        let pastes = buffer.pastes + 1;
        let step = self.config.paste_offset_step * f64::from(pastes);
        let offset = vector(step, step);
        let same_machine = buffer.machine_id == machine_id;
        // Events land in the selected state when there is one.
        let event_target = self.selection.selected().find_map(|s| match &s.target {
            SelectTarget::Node(id) if s.machine_id == machine_id => {
                self.machine(machine_id)?.nodes.get(id)?.is_state().then(|| id.clone())
            }
            _ => None,
        });

        let created = self.transact("Paste", |ed| {
            ed.paste_entities(machine_id, &buffer, same_machine, offset, event_target)
        })?;
        if let Some(current) = self.clipboard.as_mut() {
            current.pastes = pastes;
        }
        Some(created)
    }

    fn paste_entities(
        &mut self,
        machine_id: &str,
        buffer: &CopyBuffer,
        same_machine: bool,
        offset: crate::geom::Vector,
        event_target: Option<String>,
    ) -> Option<Vec<String>> {
        let mut ids = IdMap::default();
        let mut created = Vec::new();
        let mut scopes: Vec<Option<String>> = Vec::new();
        let mut preferred: FxHashMap<Option<String>, String> = FxHashMap::default();
        let mut pending: Vec<(&String, &Transition)> = Vec::new();
        let mut pasted_events = 0usize;

        for entity in &buffer.entities {
            match entity {
                CopiedEntity::Node {
                    id,
                    node,
                    absolute,
                    initial_target,
                } => {
                    let Some((new_id, scope)) =
                        self.paste_node(machine_id, &ids, same_machine, offset, node, *absolute)?
                    else {
                        continue;
                    };
                    ids.insert(id, &new_id);
                    if node.is_state() {
                        if *initial_target {
                            preferred.entry(scope.clone()).or_insert_with(|| new_id.clone());
                        }
                        if !scopes.contains(&scope) {
                            scopes.push(scope);
                        }
                    }
                    created.push(new_id);
                }
                CopiedEntity::Note { id, note } => {
                    let sm = self.machine(machine_id)?;
                    let new_id = sm.fresh_id();
                    let index = sm.notes.len();
                    let mut note = note.clone();
                    note.position += offset;
                    self.exec(Command::CreateNote {
                        machine_id: machine_id.to_string(),
                        id: new_id.clone(),
                        index,
                        note,
                    })
                    .then_some(())?;
                    ids.insert(id, &new_id);
                    created.push(new_id);
                }
                CopiedEntity::Component { name, component } => {
                    let sm = self.machine(machine_id)?;
                    let new_name = if sm.components.contains_key(name) {
                        vacant_component_name(sm, name)
                    } else {
                        name.clone()
                    };
                    let mut component = component.clone();
                    component.order = sm.next_component_order();
                    let index = sm.components.len();
                    self.add_component_inner(machine_id, &new_name, index, component)?;
                    created.push(new_name);
                }
                CopiedEntity::Event { state_id, event } => {
                    let sm = self.machine(machine_id)?;
                    let owner = event_target
                        .clone()
                        .or_else(|| ids.resolve(sm, state_id))
                        .filter(|owner| sm.nodes.get(owner).is_some_and(Node::is_state));
                    let Some(owner) = owner else {
                        continue;
                    };
                    self.change_state_data_inner(machine_id, &owner, |data| {
                        data.events.push(event.clone())
                    })?;
                    pasted_events += 1;
                }
                CopiedEntity::Transition { id, transition } => pending.push((id, transition)),
            }
        }

        // Transitions may target other copied transitions; place those first.
        let copied_transitions: FxHashSet<&str> =
            pending.iter().map(|(id, _)| id.as_str()).collect();
        loop {
            let mut progressed = false;
            let mut waiting = Vec::new();
            for (id, transition) in pending {
                let sm = self.machine(machine_id)?;
                let resolve = |old: &str| {
                    if copied_transitions.contains(old) && ids.get(old).is_none() {
                        return None;
                    }
                    if !same_machine && ids.get(old).is_none() {
                        return None;
                    }
                    ids.resolve(sm, old)
                };
                let (Some(source_id), Some(target_id)) =
                    (resolve(&transition.source_id), resolve(&transition.target_id))
                else {
                    waiting.push((id, transition));
                    continue;
                };
                let new_id = sm.fresh_id();
                let index = sm.transitions.len();
                let mut transition = transition.clone();
                transition.source_id = source_id;
                transition.target_id = target_id;
                if let Some(label) = transition.label.as_mut() {
                    label.position += offset;
                }
                self.exec(Command::CreateTransition {
                    machine_id: machine_id.to_string(),
                    id: new_id.clone(),
                    index,
                    transition,
                })
                .then_some(())?;
                ids.insert(id, &new_id);
                created.push(new_id);
                progressed = true;
            }
            pending = waiting;
            if pending.is_empty() || !progressed {
                break;
            }
        }
        if !pending.is_empty() {
            tracing::debug!(
                skipped = pending.len(),
                "paste: transitions with unresolved endpoints skipped"
            );
        }

        if created.is_empty() && pasted_events == 0 {
            tracing::debug!("paste: every copied entity was skipped");
            return None;
        }

        for scope in scopes {
            let preferred_id = preferred.get(&scope).cloned();
            self.ensure_scope_anchor(machine_id, scope.as_deref(), preferred_id.as_deref())?;
        }
        Some(created)
    }

    /// Inserts one copied node, returning its new id and scope. `Some(None)` means the node was
    /// skipped because its scope already has a final state.
    fn paste_node(
        &mut self,
        machine_id: &str,
        ids: &IdMap,
        same_machine: bool,
        offset: crate::geom::Vector,
        node: &Node,
        absolute: Point,
    ) -> Option<Option<(String, Option<String>)>> {
        let sm = self.machine(machine_id)?;
        let mut node = node.clone();
        let (parent_id, position) = match node.parent_id.as_deref() {
            Some(parent) if ids.get(parent).is_some() => {
                (ids.get(parent).map(str::to_string), node.position)
            }
            Some(parent) if same_machine && sm.nodes.get(parent).is_some_and(Node::is_state) => {
                (Some(parent.to_string()), node.position + offset)
            }
            _ => (None, absolute + offset),
        };
        if matches!(node.kind, NodeKind::Final) {
            let taken = sm
                .nodes
                .values()
                .any(|n| matches!(n.kind, NodeKind::Final) && n.parent_id == parent_id);
            if taken {
                return Some(None);
            }
        }
        node.parent_id = parent_id.clone();
        node.position = position;
        let new_id = sm.fresh_id();
        self.insert_node(machine_id, &new_id, node)?;
        Some(Some((new_id, parent_id)))
    }

    /// Copies the selection and pastes it right away.
    pub fn duplicate_selected(&mut self) -> Option<Vec<String>> {
        if !self.copy_selected() {
            return None;
        }
        self.paste()
    }
}
