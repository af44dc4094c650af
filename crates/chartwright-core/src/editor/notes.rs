use super::{ChangePositionParams, Editor, NodeRef};
use crate::command::Command;
use crate::geom::Point;
use crate::model::{Note, NoteStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteParams {
    pub machine_id: String,
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    pub position: Point,
    #[serde(default)]
    pub style: Option<NoteStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNoteParams {
    pub machine_id: String,
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub style: Option<NoteStyle>,
}

impl Editor {
    pub fn create_note(&mut self, params: CreateNoteParams) -> Option<String> {
        let CreateNoteParams {
            machine_id,
            id,
            text,
            position,
            style,
        } = params;
        let id = self.claim_id(&machine_id, id)?;
        let index = self.machine(&machine_id)?.notes.len();
        let note = Note {
            text,
            position,
            style: style.unwrap_or_default(),
            selection: false,
        };
        self.transact("Create note", |ed| {
            ed.exec(Command::CreateNote {
                machine_id: machine_id.clone(),
                id: id.clone(),
                index,
                note,
            })
            .then_some(id)
        })
    }

    fn change_note_with(
        &mut self,
        machine_id: &str,
        id: &str,
        description: &str,
        edit: impl FnOnce(&mut Note),
    ) -> bool {
        let Some(before) = self.machine(machine_id).and_then(|sm| sm.notes.get(id)).cloned() else {
            return false;
        };
        let mut after = before.clone();
        edit(&mut after);
        if after == before {
            return true;
        }
        self.transact(description, |ed| {
            ed.exec(Command::ChangeNote {
                machine_id: machine_id.to_string(),
                id: id.to_string(),
                before,
                after,
            })
            .then_some(())
        })
        .is_some()
    }

    /// Changes the text and/or style of a note.
    pub fn change_note(&mut self, params: ChangeNoteParams) -> bool {
        let ChangeNoteParams {
            machine_id,
            id,
            text,
            style,
        } = params;
        self.change_note_with(&machine_id, &id, "Change note", |note| {
            if let Some(text) = text {
                note.text = text;
            }
            if let Some(style) = style {
                note.style = style;
            }
        })
    }

    pub fn change_note_position(&mut self, params: ChangePositionParams) -> bool {
        let ChangePositionParams {
            machine_id,
            id,
            position,
        } = params;
        self.change_note_with(&machine_id, &id, "Move note", |note| note.position = position)
    }

    /// Deletes a note and every transition attached to it.
    pub fn delete_note(&mut self, params: NodeRef) -> bool {
        let NodeRef { machine_id, id } = params;
        let Some(sm) = self.machine(&machine_id) else {
            return false;
        };
        let Some(index) = sm.notes.get_index_of(&id) else {
            return false;
        };
        let Some(note) = sm.notes.get(&id).cloned() else {
            return false;
        };
        self.transact("Delete note", |ed| {
            ed.delete_transitions_touching(&machine_id, std::slice::from_ref(&id))?;
            ed.exec(Command::DeleteNote {
                machine_id: machine_id.clone(),
                id: id.clone(),
                index,
                note,
            })
            .then_some(())
        })
        .is_some()
    }
}
