use super::Editor;
use crate::command::Command;
use crate::model::{MachineHeader, StateMachine};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStateMachineParams {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: String,
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStateMachineParams {
    pub machine_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMetaParams {
    pub machine_id: String,
    pub meta: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStateMachineParams {
    pub machine_id: String,
}

impl Editor {
    pub fn create_state_machine(&mut self, params: CreateStateMachineParams) -> Option<String> {
        let CreateStateMachineParams { id, name, platform } = params;
        let machine_id = match id {
            Some(id) if id.is_empty() || self.doc.machines.contains_key(&id) => return None,
            Some(id) => id,
            None => self.doc.fresh_machine_id(),
        };
        let index = self.doc.machines.len();
        let machine = StateMachine {
            name,
            platform,
            ..StateMachine::default()
        };
        self.transact("Create state machine", |ed| {
            ed.exec(Command::CreateMachine {
                machine_id: machine_id.clone(),
                index,
                machine,
            })
            .then_some(machine_id)
        })
    }

    fn change_header(
        &mut self,
        machine_id: &str,
        description: &str,
        edit: impl FnOnce(&mut MachineHeader),
    ) -> bool {
        let Some(before) = self.machine(machine_id).map(StateMachine::header) else {
            return false;
        };
        let mut after = before.clone();
        edit(&mut after);
        if after == before {
            return true;
        }
        self.transact(description, |ed| {
            ed.exec(Command::ChangeMachine {
                machine_id: machine_id.to_string(),
                before,
                after,
            })
            .then_some(())
        })
        .is_some()
    }

    pub fn change_state_machine(&mut self, params: ChangeStateMachineParams) -> bool {
        let ChangeStateMachineParams {
            machine_id,
            name,
            platform,
        } = params;
        self.change_header(&machine_id, "Change state machine", |header| {
            if name.is_some() {
                header.name = name;
            }
            if let Some(platform) = platform {
                header.platform = platform;
            }
        })
    }

    pub fn set_meta(&mut self, params: SetMetaParams) -> bool {
        let SetMetaParams { machine_id, meta } = params;
        self.change_header(&machine_id, "Change meta", |header| header.meta = meta)
    }

    /// Removes a machine with everything in it as one undoable step.
    pub fn delete_state_machine(&mut self, params: DeleteStateMachineParams) -> bool {
        let DeleteStateMachineParams { machine_id } = params;
        let Some(index) = self.doc.machines.get_index_of(&machine_id) else {
            return false;
        };
        let Some(machine) = self.doc.machines.get(&machine_id).cloned() else {
            return false;
        };
        self.transact("Delete state machine", |ed| {
            ed.exec(Command::DeleteMachine {
                machine_id: machine_id.clone(),
                index,
                machine,
            })
            .then_some(())
        })
        .is_some()
    }
}
