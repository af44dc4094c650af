use super::Editor;
use crate::command::Command;
use crate::model::{Component, StateMachine};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddComponentParams {
    pub machine_id: String,
    /// An empty name asks for a generated one derived from the type.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeComponentParams {
    pub machine_id: String,
    pub name: String,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub parameters: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapComponentsParams {
    pub machine_id: String,
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteComponentParams {
    pub machine_id: String,
    pub name: String,
    /// Also remove every transition, event and action that calls the component.
    #[serde(default)]
    pub purge: bool,
}

/// First free name of the form `{base}{n}`, counting from 1.
pub(super) fn vacant_component_name(sm: &StateMachine, base: &str) -> String {
    let base = if base.is_empty() { "component" } else { base };
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !sm.components.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

impl Editor {
    pub fn add_component(&mut self, params: AddComponentParams) -> Option<String> {
        let AddComponentParams {
            machine_id,
            name,
            component_type,
            parameters,
        } = params;
        let sm = self.machine(&machine_id)?;
        let name = if name.is_empty() {
            vacant_component_name(sm, &component_type.to_lowercase())
        } else if sm.components.contains_key(&name) {
            tracing::debug!(%machine_id, %name, "component name taken");
            return None;
        } else {
            name
        };
        let index = sm.components.len();
        let component = Component {
            component_type,
            parameters,
            order: sm.next_component_order(),
            selection: false,
        };
        self.transact("Add component", |ed| {
            ed.add_component_inner(&machine_id, &name, index, component)
        })?;
        Some(name)
    }

    pub(super) fn add_component_inner(
        &mut self,
        machine_id: &str,
        name: &str,
        index: usize,
        component: Component,
    ) -> Option<()> {
        self.exec(Command::AddComponent {
            machine_id: machine_id.to_string(),
            name: name.to_string(),
            index,
            component,
        })
        .then_some(())
    }

    /// Updates parameters and/or renames a component. A rename is propagated to every trigger,
    /// condition and action in the machine that calls it.
    pub fn change_component(&mut self, params: ChangeComponentParams) -> bool {
        let ChangeComponentParams {
            machine_id,
            name,
            new_name,
            parameters,
        } = params;
        let Some(sm) = self.machine(&machine_id) else {
            return false;
        };
        let Some(before) = sm.components.get(&name).cloned() else {
            return false;
        };
        let new_name = new_name.filter(|n| *n != name);
        if let Some(new_name) = &new_name {
            if new_name.is_empty() || sm.components.contains_key(new_name) {
                return false;
            }
        }
        self.transact("Change component", |ed| {
            if let Some(parameters) = parameters {
                if parameters != before.parameters {
                    let mut after = before.clone();
                    after.parameters = parameters;
                    ed.exec(Command::ChangeComponent {
                        machine_id: machine_id.clone(),
                        name: name.clone(),
                        before,
                        after,
                    })
                    .then_some(())?;
                }
            }
            if let Some(new_name) = new_name {
                ed.rename_references(&machine_id, &name, &new_name)?;
                ed.exec(Command::RenameComponent {
                    machine_id: machine_id.clone(),
                    from: name.clone(),
                    to: new_name,
                })
                .then_some(())?;
            }
            Some(())
        })
        .is_some()
    }

    fn rename_references(&mut self, machine_id: &str, from: &str, to: &str) -> Option<()> {
        let sm = self.machine(machine_id)?;
        let states: Vec<String> = sm
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.as_state()
                    .is_some_and(|s| s.events.iter().any(|e| e.references_component(from)))
            })
            .map(|(id, _)| id.clone())
            .collect();
        let transitions: Vec<String> = sm
            .transitions
            .iter()
            .filter(|(_, t)| t.label.as_ref().is_some_and(|l| l.references_component(from)))
            .map(|(id, _)| id.clone())
            .collect();
        for id in states {
            self.change_state_data_inner(machine_id, &id, |data| {
                for event in &mut data.events {
                    event.rename_component(from, to);
                }
            })?;
        }
        for id in transitions {
            let before = self.machine(machine_id)?.transitions.get(&id)?.clone();
            let mut after = before.clone();
            if let Some(label) = after.label.as_mut() {
                label.rename_component(from, to);
            }
            self.exec(Command::ChangeTransition {
                machine_id: machine_id.to_string(),
                id,
                before,
                after,
            })
            .then_some(())?;
        }
        Some(())
    }

    /// Exchanges the display order of two components.
    pub fn swap_components(&mut self, params: SwapComponentsParams) -> bool {
        let SwapComponentsParams { machine_id, a, b } = params;
        if a == b {
            return false;
        }
        let Some(sm) = self.machine(&machine_id) else {
            return false;
        };
        let (Some(first), Some(second)) =
            (sm.components.get(&a).cloned(), sm.components.get(&b).cloned())
        else {
            return false;
        };
        self.transact("Swap components", |ed| {
            let mut first_after = first.clone();
            first_after.order = second.order;
            let mut second_after = second.clone();
            second_after.order = first.order;
            ed.exec(Command::ChangeComponent {
                machine_id: machine_id.clone(),
                name: a.clone(),
                before: first,
                after: first_after,
            })
            .then_some(())?;
            ed.exec(Command::ChangeComponent {
                machine_id: machine_id.clone(),
                name: b.clone(),
                before: second,
                after: second_after,
            })
            .then_some(())
        })
        .is_some()
    }

    pub fn delete_component(&mut self, params: DeleteComponentParams) -> bool {
        let DeleteComponentParams {
            machine_id,
            name,
            purge,
        } = params;
        let exists = self
            .machine(&machine_id)
            .is_some_and(|sm| sm.components.contains_key(&name));
        if !exists {
            return false;
        }
        self.transact("Delete component", |ed| {
            if purge {
                ed.purge_component_references(&machine_id, &name)?;
            }
            let sm = ed.machine(&machine_id)?;
            let index = sm.components.get_index_of(&name)?;
            let component = sm.components.get(&name)?.clone();
            ed.exec(Command::DeleteComponent {
                machine_id: machine_id.clone(),
                name: name.clone(),
                index,
                component,
            })
            .then_some(())
        })
        .is_some()
    }

    /// Removes transitions whose label calls `name`, events triggered by or conditioned on it,
    /// and its actions from the remaining events.
    fn purge_component_references(&mut self, machine_id: &str, name: &str) -> Option<()> {
        let sm = self.machine(machine_id)?;
        let transitions: Vec<String> = sm
            .transitions
            .iter()
            .filter(|(_, t)| t.label.as_ref().is_some_and(|l| l.references_component(name)))
            .map(|(id, _)| id.clone())
            .collect();
        let states: Vec<String> = sm
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.as_state()
                    .is_some_and(|s| s.events.iter().any(|e| e.references_component(name)))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in transitions {
            if self.machine(machine_id)?.transitions.contains_key(&id) {
                self.delete_transitions_touching(machine_id, std::slice::from_ref(&id))?;
                self.remove_transition_record(machine_id, &id)?;
            }
        }
        for id in states {
            self.change_state_data_inner(machine_id, &id, |data| {
                data.events.retain(|e| {
                    e.trigger.component() != Some(name)
                        && !e.condition.as_ref().is_some_and(|c| c.references_component(name))
                });
                for event in &mut data.events {
                    event.actions.retain(|a| a.component() != Some(name));
                }
            })?;
        }
        Some(())
    }
}
