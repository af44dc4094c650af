use super::*;
use crate::editor::{
    ChangeEventActionParams, ChangeEventConditionParams, ChangeEventTriggerParams,
    ChangeStateEventsParams, CreateEventActionParams, CreateEventParams, DeleteEventParams,
};
use crate::model::{Action, Call, Condition, EventData, EventSelection, Literal};

fn call(component: &str, method: &str) -> Action {
    Action::Call(Call::new(component, method))
}

fn event(trigger: Action, actions: Vec<Action>) -> EventData {
    EventData {
        trigger,
        condition: None,
        actions,
    }
}

fn events_of(ed: &Editor, id: &str) -> Vec<EventData> {
    ed.machine(M).unwrap().nodes[id].as_state().unwrap().events.clone()
}

#[test]
fn events_are_inserted_at_the_requested_index() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let create = |trigger: &str, event_index: Option<usize>| CreateEventParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event: event(call("button", trigger), Vec::new()),
        event_index,
    };
    assert!(ed.create_event(create("a", None)));
    assert!(ed.create_event(create("c", None)));
    assert!(ed.create_event(create("b", Some(1))));
    assert!(!ed.create_event(create("z", Some(9))));
    let triggers: Vec<Action> = events_of(&ed, "A").into_iter().map(|e| e.trigger).collect();
    assert_eq!(triggers, vec![call("button", "a"), call("button", "b"), call("button", "c")]);
}

#[test]
fn events_only_live_in_ordinary_states() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let initial = ed.machine(M).unwrap().initial_nodes_of_scope(None)[0].clone();
    assert!(!ed.create_event(CreateEventParams {
        machine_id: M.into(),
        state_id: initial,
        event: event(call("x", "y"), Vec::new()),
        event_index: None,
    }));
}

#[test]
fn trigger_condition_and_actions_are_editable() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    assert!(ed.create_event(CreateEventParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event: event(call("button", "isPressed"), vec![call("led", "on")]),
        event_index: None,
    }));
    assert!(ed.change_event_trigger(ChangeEventTriggerParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event_index: 0,
        trigger: call("button", "isReleased"),
    }));
    let condition = Condition::Equals(vec![
        Condition::Component(Call::new("counter", "value")),
        Condition::Value(Literal::Number(3.0)),
    ]);
    assert!(ed.change_event_condition(ChangeEventConditionParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event_index: 0,
        condition: Some(condition.clone()),
    }));
    assert!(ed.create_event_action(CreateEventActionParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event_index: 0,
        action: call("led", "toggle"),
        action_index: Some(0),
    }));
    assert!(ed.change_event_action(ChangeEventActionParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event_index: 0,
        action_index: 1,
        action: Action::Text("blink(2)".into()),
    }));
    assert!(!ed.change_event_action(ChangeEventActionParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event_index: 0,
        action_index: 5,
        action: Action::Text("nope".into()),
    }));

    let events = events_of(&ed, "A");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trigger, call("button", "isReleased"));
    assert_eq!(events[0].condition, Some(condition));
    assert_eq!(
        events[0].actions,
        vec![call("led", "toggle"), Action::Text("blink(2)".into())]
    );
}

#[test]
fn deleting_the_last_action_removes_the_event() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    assert!(ed.change_state_events(ChangeStateEventsParams {
        machine_id: M.into(),
        id: "A".into(),
        events: vec![
            event(call("button", "isPressed"), vec![call("led", "on"), call("led", "off")]),
            event(call("timer", "timeout"), vec![call("led", "off")]),
        ],
    }));
    let delete = |event_index: usize, action_index: Option<usize>| DeleteEventParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event: EventSelection {
            event_index,
            action_index,
        },
    };

    assert!(ed.delete_event(delete(0, Some(1))));
    assert_eq!(events_of(&ed, "A")[0].actions, vec![call("led", "on")]);
    assert!(ed.delete_event(delete(0, Some(0))));
    let events = events_of(&ed, "A");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trigger, call("timer", "timeout"));

    assert!(!ed.delete_event(delete(0, Some(3))));
    assert!(ed.delete_event(delete(0, None)));
    assert!(events_of(&ed, "A").is_empty());
    assert!(!ed.delete_event(delete(0, None)));
}

#[test]
fn each_event_edit_is_one_undo_step() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let depth = ed.history().undo_depth();
    assert!(ed.create_event(CreateEventParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event: event(call("button", "isPressed"), vec![call("led", "on")]),
        event_index: None,
    }));
    assert!(ed.delete_event(DeleteEventParams {
        machine_id: M.into(),
        state_id: "A".into(),
        event: EventSelection {
            event_index: 0,
            action_index: Some(0),
        },
    }));
    assert_eq!(ed.history().undo_depth(), depth + 2);
    assert!(ed.undo());
    assert_eq!(events_of(&ed, "A")[0].actions, vec![call("led", "on")]);
    assert!(ed.undo());
    assert!(events_of(&ed, "A").is_empty());
}
