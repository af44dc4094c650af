//! Editing of the event lists owned by ordinary states.
//!
//! Every operation here rewrites the owning state's payload through one `ChangeState` command.

use super::Editor;
use crate::model::{Action, Condition, EventData, EventSelection, Trigger};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStateEventsParams {
    pub machine_id: String,
    pub id: String,
    pub events: Vec<EventData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventParams {
    pub machine_id: String,
    pub state_id: String,
    pub event: EventData,
    /// Insert position; appends when absent.
    #[serde(default)]
    pub event_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventTriggerParams {
    pub machine_id: String,
    pub state_id: String,
    pub event_index: usize,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventConditionParams {
    pub machine_id: String,
    pub state_id: String,
    pub event_index: usize,
    #[serde(default)]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventActionParams {
    pub machine_id: String,
    pub state_id: String,
    pub event_index: usize,
    pub action: Action,
    #[serde(default)]
    pub action_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventActionParams {
    pub machine_id: String,
    pub state_id: String,
    pub event_index: usize,
    pub action_index: usize,
    pub action: Action,
}

/// Deletes one action when `event.action_index` is set, the whole event otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventParams {
    pub machine_id: String,
    pub state_id: String,
    pub event: EventSelection,
}

impl Editor {
    /// Replaces the full event list of a state.
    pub fn change_state_events(&mut self, params: ChangeStateEventsParams) -> bool {
        let ChangeStateEventsParams { machine_id, id, events } = params;
        self.change_state_data(&machine_id, &id, "Change state events", |data| data.events = events)
    }

    fn event_slot(
        &self,
        machine_id: &str,
        state_id: &str,
        event_index: usize,
    ) -> Option<&EventData> {
        self.machine(machine_id)?
            .nodes
            .get(state_id)?
            .as_state()?
            .events
            .get(event_index)
    }

    pub fn create_event(&mut self, params: CreateEventParams) -> bool {
        let CreateEventParams {
            machine_id,
            state_id,
            event,
            event_index,
        } = params;
        let Some(len) = self
            .machine(&machine_id)
            .and_then(|sm| sm.nodes.get(&state_id))
            .and_then(|n| n.as_state())
            .map(|s| s.events.len())
        else {
            return false;
        };
        let index = event_index.unwrap_or(len);
        if index > len {
            return false;
        }
        self.change_state_data(&machine_id, &state_id, "Create event", |data| {
            data.events.insert(index, event);
        })
    }

    pub fn change_event_trigger(&mut self, params: ChangeEventTriggerParams) -> bool {
        let ChangeEventTriggerParams {
            machine_id,
            state_id,
            event_index,
            trigger,
        } = params;
        if self.event_slot(&machine_id, &state_id, event_index).is_none() {
            return false;
        }
        self.change_state_data(&machine_id, &state_id, "Change event", |data| {
            data.events[event_index].trigger = trigger;
        })
    }

    pub fn change_event_condition(&mut self, params: ChangeEventConditionParams) -> bool {
        let ChangeEventConditionParams {
            machine_id,
            state_id,
            event_index,
            condition,
        } = params;
        if self.event_slot(&machine_id, &state_id, event_index).is_none() {
            return false;
        }
        self.change_state_data(&machine_id, &state_id, "Change event condition", |data| {
            data.events[event_index].condition = condition;
        })
    }

    pub fn create_event_action(&mut self, params: CreateEventActionParams) -> bool {
        let CreateEventActionParams {
            machine_id,
            state_id,
            event_index,
            action,
            action_index,
        } = params;
        let Some(len) = self
            .event_slot(&machine_id, &state_id, event_index)
            .map(|e| e.actions.len())
        else {
            return false;
        };
        let index = action_index.unwrap_or(len);
        if index > len {
            return false;
        }
        self.change_state_data(&machine_id, &state_id, "Create action", |data| {
            data.events[event_index].actions.insert(index, action);
        })
    }

    pub fn change_event_action(&mut self, params: ChangeEventActionParams) -> bool {
        let ChangeEventActionParams {
            machine_id,
            state_id,
            event_index,
            action_index,
            action,
        } = params;
        let in_range = self
            .event_slot(&machine_id, &state_id, event_index)
            .is_some_and(|e| action_index < e.actions.len());
        if !in_range {
            return false;
        }
        self.change_state_data(&machine_id, &state_id, "Change action", |data| {
            data.events[event_index].actions[action_index] = action;
        })
    }

    /// Removing the last action of an event removes the event too.
    pub fn delete_event(&mut self, params: DeleteEventParams) -> bool {
        let DeleteEventParams {
            machine_id,
            state_id,
            event,
        } = params;
        let Some(slot) = self.event_slot(&machine_id, &state_id, event.event_index) else {
            return false;
        };
        if event.action_index.is_some_and(|i| i >= slot.actions.len()) {
            return false;
        }
        self.transact("Delete event", |ed| {
            ed.change_state_data_inner(&machine_id, &state_id, |data| {
                let EventSelection {
                    event_index,
                    action_index,
                } = event;
                match action_index {
                    Some(action_index) => {
                        let actions = &mut data.events[event_index].actions;
                        actions.remove(action_index);
                        if actions.is_empty() {
                            data.events.remove(event_index);
                        }
                    }
                    None => {
                        data.events.remove(event_index);
                    }
                }
            })
        })
        .is_some()
    }
}
