//! Scripted edits: a JSON array of operations replayed against an [`Editor`].

use chartwright_core::Editor;
use chartwright_core::Selectable;
use chartwright_core::editor::{
    AddComponentParams, ChangeComponentParams, ChangeEventActionParams, ChangeEventConditionParams,
    ChangeEventTriggerParams, ChangeNoteParams, ChangePositionParams, ChangeStateColorParams,
    ChangeStateEventsParams, ChangeStateMachineParams, ChangeStateNameParams,
    ChangeTransitionParams, CreateEventActionParams, CreateEventParams, CreateNoteParams,
    CreatePseudoStateParams, CreateStateMachineParams, CreateStateParams, CreateTransitionParams,
    DeleteComponentParams, DeleteEventParams, DeleteStateMachineParams, LinkStateParams, NodeRef,
    SetMetaParams, SwapComponentsParams,
};
use serde::{Deserialize, Serialize};

/// One scripted operation, e.g. `{"op": "createState", "machineId": "m", "name": "Idle",
/// "position": [0, 0]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptOp {
    CreateStateMachine(CreateStateMachineParams),
    ChangeStateMachine(ChangeStateMachineParams),
    SetMeta(SetMetaParams),
    DeleteStateMachine(DeleteStateMachineParams),
    CreateState(CreateStateParams),
    CreateFinalState(CreatePseudoStateParams),
    CreateChoiceState(CreatePseudoStateParams),
    ChangeStateName(ChangeStateNameParams),
    ChangeStateColor(ChangeStateColorParams),
    ChangeStatePosition(ChangePositionParams),
    ChangeStateEvents(ChangeStateEventsParams),
    LinkState(LinkStateParams),
    UnlinkState(NodeRef),
    SetInitialState(NodeRef),
    DeleteState(NodeRef),
    CreateEvent(CreateEventParams),
    ChangeEventTrigger(ChangeEventTriggerParams),
    ChangeEventCondition(ChangeEventConditionParams),
    CreateEventAction(CreateEventActionParams),
    ChangeEventAction(ChangeEventActionParams),
    DeleteEvent(DeleteEventParams),
    CreateTransition(CreateTransitionParams),
    ChangeTransition(ChangeTransitionParams),
    ChangeTransitionPosition(ChangePositionParams),
    DeleteTransition(NodeRef),
    CreateNote(CreateNoteParams),
    ChangeNote(ChangeNoteParams),
    ChangeNotePosition(ChangePositionParams),
    DeleteNote(NodeRef),
    AddComponent(AddComponentParams),
    ChangeComponent(ChangeComponentParams),
    SwapComponents(SwapComponentsParams),
    DeleteComponent(DeleteComponentParams),
    /// Adds a state, pseudostate, note or transition to the selection.
    Select(NodeRef),
    ClearSelection,
    DeleteSelected,
    CopySelected,
    Paste,
    Undo,
    Redo,
}

/// Result of one replayed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub op: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<String>,
}

impl ScriptOp {
    /// The `op` tag this operation is written with.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::CreateStateMachine(_) => "createStateMachine",
            ScriptOp::ChangeStateMachine(_) => "changeStateMachine",
            ScriptOp::SetMeta(_) => "setMeta",
            ScriptOp::DeleteStateMachine(_) => "deleteStateMachine",
            ScriptOp::CreateState(_) => "createState",
            ScriptOp::CreateFinalState(_) => "createFinalState",
            ScriptOp::CreateChoiceState(_) => "createChoiceState",
            ScriptOp::ChangeStateName(_) => "changeStateName",
            ScriptOp::ChangeStateColor(_) => "changeStateColor",
            ScriptOp::ChangeStatePosition(_) => "changeStatePosition",
            ScriptOp::ChangeStateEvents(_) => "changeStateEvents",
            ScriptOp::LinkState(_) => "linkState",
            ScriptOp::UnlinkState(_) => "unlinkState",
            ScriptOp::SetInitialState(_) => "setInitialState",
            ScriptOp::DeleteState(_) => "deleteState",
            ScriptOp::CreateEvent(_) => "createEvent",
            ScriptOp::ChangeEventTrigger(_) => "changeEventTrigger",
            ScriptOp::ChangeEventCondition(_) => "changeEventCondition",
            ScriptOp::CreateEventAction(_) => "createEventAction",
            ScriptOp::ChangeEventAction(_) => "changeEventAction",
            ScriptOp::DeleteEvent(_) => "deleteEvent",
            ScriptOp::CreateTransition(_) => "createTransition",
            ScriptOp::ChangeTransition(_) => "changeTransition",
            ScriptOp::ChangeTransitionPosition(_) => "changeTransitionPosition",
            ScriptOp::DeleteTransition(_) => "deleteTransition",
            ScriptOp::CreateNote(_) => "createNote",
            ScriptOp::ChangeNote(_) => "changeNote",
            ScriptOp::ChangeNotePosition(_) => "changeNotePosition",
            ScriptOp::DeleteNote(_) => "deleteNote",
            ScriptOp::AddComponent(_) => "addComponent",
            ScriptOp::ChangeComponent(_) => "changeComponent",
            ScriptOp::SwapComponents(_) => "swapComponents",
            ScriptOp::DeleteComponent(_) => "deleteComponent",
            ScriptOp::Select(_) => "select",
            ScriptOp::ClearSelection => "clearSelection",
            ScriptOp::DeleteSelected => "deleteSelected",
            ScriptOp::CopySelected => "copySelected",
            ScriptOp::Paste => "paste",
            ScriptOp::Undo => "undo",
            ScriptOp::Redo => "redo",
        }
    }
}

fn created(id: Option<String>) -> (bool, Vec<String>) {
    match id {
        Some(id) => (true, vec![id]),
        None => (false, Vec::new()),
    }
}

/// Whatever entity `id` names in `machine_id`, as a selection target.
fn selectable(editor: &Editor, r: &NodeRef) -> Option<Selectable> {
    let sm = editor.machine(&r.machine_id)?;
    let id = r.id.as_str();
    if sm.nodes.contains_key(id) {
        Some(Selectable::node(&r.machine_id, id))
    } else if sm.transitions.contains_key(id) {
        Some(Selectable::transition(&r.machine_id, id))
    } else if sm.notes.contains_key(id) {
        Some(Selectable::note(&r.machine_id, id))
    } else if sm.components.contains_key(id) {
        Some(Selectable::component(&r.machine_id, id))
    } else {
        None
    }
}

pub fn apply(editor: &mut Editor, index: usize, op: ScriptOp) -> StepReport {
    let name = op.name();
    let (applied, created) = match op {
        ScriptOp::CreateStateMachine(p) => created(editor.create_state_machine(p)),
        ScriptOp::ChangeStateMachine(p) => (editor.change_state_machine(p), Vec::new()),
        ScriptOp::SetMeta(p) => (editor.set_meta(p), Vec::new()),
        ScriptOp::DeleteStateMachine(p) => (editor.delete_state_machine(p), Vec::new()),
        ScriptOp::CreateState(p) => created(editor.create_state(p)),
        ScriptOp::CreateFinalState(p) => created(editor.create_final_state(p)),
        ScriptOp::CreateChoiceState(p) => created(editor.create_choice_state(p)),
        ScriptOp::ChangeStateName(p) => (editor.change_state_name(p), Vec::new()),
        ScriptOp::ChangeStateColor(p) => (editor.change_state_color(p), Vec::new()),
        ScriptOp::ChangeStatePosition(p) => (editor.change_state_position(p), Vec::new()),
        ScriptOp::ChangeStateEvents(p) => (editor.change_state_events(p), Vec::new()),
        ScriptOp::LinkState(p) => (editor.link_state(p), Vec::new()),
        ScriptOp::UnlinkState(p) => (editor.unlink_state(p), Vec::new()),
        ScriptOp::SetInitialState(p) => (editor.set_initial_state(p), Vec::new()),
        ScriptOp::DeleteState(p) => (editor.delete_state(p), Vec::new()),
        ScriptOp::CreateEvent(p) => (editor.create_event(p), Vec::new()),
        ScriptOp::ChangeEventTrigger(p) => (editor.change_event_trigger(p), Vec::new()),
        ScriptOp::ChangeEventCondition(p) => (editor.change_event_condition(p), Vec::new()),
        ScriptOp::CreateEventAction(p) => (editor.create_event_action(p), Vec::new()),
        ScriptOp::ChangeEventAction(p) => (editor.change_event_action(p), Vec::new()),
        ScriptOp::DeleteEvent(p) => (editor.delete_event(p), Vec::new()),
        ScriptOp::CreateTransition(p) => created(editor.create_transition(p)),
        ScriptOp::ChangeTransition(p) => (editor.change_transition(p), Vec::new()),
        ScriptOp::ChangeTransitionPosition(p) => (editor.change_transition_position(p), Vec::new()),
        ScriptOp::DeleteTransition(p) => (editor.delete_transition(p), Vec::new()),
        ScriptOp::CreateNote(p) => created(editor.create_note(p)),
        ScriptOp::ChangeNote(p) => (editor.change_note(p), Vec::new()),
        ScriptOp::ChangeNotePosition(p) => (editor.change_note_position(p), Vec::new()),
        ScriptOp::DeleteNote(p) => (editor.delete_note(p), Vec::new()),
        ScriptOp::AddComponent(p) => created(editor.add_component(p)),
        ScriptOp::ChangeComponent(p) => (editor.change_component(p), Vec::new()),
        ScriptOp::SwapComponents(p) => (editor.swap_components(p), Vec::new()),
        ScriptOp::DeleteComponent(p) => (editor.delete_component(p), Vec::new()),
        ScriptOp::Select(r) => match selectable(editor, &r) {
            Some(item) => (editor.add_selection(item), Vec::new()),
            None => (false, Vec::new()),
        },
        ScriptOp::ClearSelection => {
            editor.clear_selection(&[]);
            (true, Vec::new())
        }
        ScriptOp::DeleteSelected => (editor.delete_selected(), Vec::new()),
        ScriptOp::CopySelected => (editor.copy_selected(), Vec::new()),
        ScriptOp::Paste => match editor.paste() {
            Some(ids) => (true, ids),
            None => (false, Vec::new()),
        },
        ScriptOp::Undo => (editor.undo(), Vec::new()),
        ScriptOp::Redo => (editor.redo(), Vec::new()),
    };
    if !applied {
        tracing::warn!(index, op = name, "operation rejected");
    }
    StepReport {
        index,
        op: name.to_string(),
        applied,
        created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_operations() {
        let ops: Vec<ScriptOp> = serde_json::from_value(json!([
            { "op": "createStateMachine", "id": "m", "platform": "ArduinoUno" },
            {
                "op": "createState", "machineId": "m", "id": "A", "name": "Idle",
                "position": [0, 0]
            },
            { "op": "deleteStateMachine", "machineId": "m" },
            { "op": "undo" }
        ]))
        .unwrap();
        assert_eq!(ops.len(), 4);
        assert!(matches!(&ops[2], ScriptOp::DeleteStateMachine(p) if p.machine_id == "m"));
        assert_eq!(ops[1].name(), "createState");
        assert_eq!(ops[3].name(), "undo");
    }

    #[test]
    fn reports_created_ids_and_rejections() {
        let mut editor = Editor::default();
        let ops: Vec<ScriptOp> = serde_json::from_value(json!([
            { "op": "createStateMachine", "id": "m" },
            {
                "op": "createState", "machineId": "m", "id": "A", "name": "Idle",
                "position": [0, 0]
            },
            { "op": "deleteState", "machineId": "m", "id": "ghost" }
        ]))
        .unwrap();
        let reports: Vec<StepReport> = ops
            .into_iter()
            .enumerate()
            .map(|(i, op)| apply(&mut editor, i, op))
            .collect();
        assert_eq!(reports[0].created, vec!["m".to_string()]);
        assert_eq!(reports[1].created, vec!["A".to_string()]);
        assert!(!reports[2].applied);
    }
}
