use super::*;
use crate::bus::ChangeEvent;
use crate::codec::JsonCodec;
use crate::config::{EditorConfig, HistoryConfig};
use crate::editor::{ChangePositionParams, ChangeStateNameParams, LinkStateParams, NodeRef};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn a_cascade_is_undone_by_a_single_undo() {
    let mut ed = editor();
    state(&mut ed, "A", None, 300.0, 300.0);
    state(&mut ed, "B", Some("A"), 350.0, 350.0);
    let before = ed.document().clone();
    let depth = ed.history().undo_depth();

    assert!(ed.delete_state(NodeRef::new(M, "A")));
    assert_eq!(ed.history().undo_depth(), depth + 1);
    let group = ed.history().peek_undo().unwrap();
    assert_eq!(group.description, "Delete state");
    assert!(group.connected_actions() > 0);

    assert!(ed.undo());
    assert_eq!(ed.document(), &before);
    assert_valid(&ed);

    assert!(ed.redo());
    assert!(!ed.machine(M).unwrap().nodes.contains_key("A"));
    assert_valid(&ed);
}

#[test]
fn undo_everything_then_redo_everything_round_trips() {
    let mut ed = editor();
    let empty = ed.document().clone();
    state(&mut ed, "A", None, 0.0, 0.0);
    state(&mut ed, "B", None, 600.0, 0.0);
    state(&mut ed, "C", Some("A"), 50.0, 50.0);
    assert!(ed.link_state(LinkStateParams {
        machine_id: M.into(),
        parent_id: "A".into(),
        child_id: "B".into(),
    }));
    assert!(ed.set_initial_state(NodeRef::new(M, "B")));
    assert!(ed.unlink_state(NodeRef::new(M, "C")));
    assert!(ed.delete_state(NodeRef::new(M, "A")));
    let full = ed.document().clone();

    let mut undone = 0;
    while ed.history().undo_depth() > 1 {
        assert!(ed.undo());
        assert_valid(&ed);
        undone += 1;
    }
    assert_eq!(ed.document(), &empty);
    for _ in 0..undone {
        assert!(ed.redo());
        assert_valid(&ed);
    }
    assert_eq!(ed.document(), &full);
    assert!(!ed.can_redo());
}

#[test]
fn undo_restores_table_order() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    state(&mut ed, "B", None, 600.0, 0.0);
    state(&mut ed, "C", None, 1200.0, 0.0);
    let order: Vec<String> = ed.machine(M).unwrap().nodes.keys().cloned().collect();
    assert!(ed.delete_state(NodeRef::new(M, "B")));
    assert!(ed.undo());
    let restored: Vec<String> = ed.machine(M).unwrap().nodes.keys().cloned().collect();
    assert_eq!(restored, order);
}

#[test]
fn new_edits_clear_the_redo_stack() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    assert!(ed.change_state_name(ChangeStateNameParams {
        machine_id: M.into(),
        id: "A".into(),
        name: "Idle".into(),
    }));
    assert!(ed.undo());
    assert!(ed.can_redo());
    assert!(ed.change_state_position(ChangePositionParams {
        machine_id: M.into(),
        id: "A".into(),
        position: point(5.0, 5.0),
    }));
    assert!(!ed.can_redo());
    assert!(!ed.redo());
}

#[test]
fn history_depth_is_bounded() {
    let config = EditorConfig {
        history: HistoryConfig { depth: 3 },
        ..EditorConfig::default()
    };
    let mut ed = Editor::new(config);
    ed.create_state_machine(CreateStateMachineParams {
        id: Some(M.into()),
        ..CreateStateMachineParams::default()
    })
    .unwrap();
    state(&mut ed, "A", None, 0.0, 0.0);
    for i in 0..10 {
        assert!(ed.change_state_position(ChangePositionParams {
            machine_id: M.into(),
            id: "A".into(),
            position: point(f64::from(i), 0.0),
        }));
    }
    assert_eq!(ed.history().undo_depth(), 3);
    for _ in 0..3 {
        assert!(ed.undo());
    }
    assert!(!ed.undo());
    assert_eq!(ed.machine(M).unwrap().nodes["A"].position, point(6.0, 0.0));
}

#[test]
fn no_op_changes_record_nothing() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let depth = ed.history().undo_depth();
    assert!(ed.change_state_name(ChangeStateNameParams {
        machine_id: M.into(),
        id: "A".into(),
        name: "A".into(),
    }));
    assert!(ed.change_state_position(ChangePositionParams {
        machine_id: M.into(),
        id: "A".into(),
        position: point(0.0, 0.0),
    }));
    assert_eq!(ed.history().undo_depth(), depth);
}

#[test]
fn mutations_publish_events_and_mark_the_document_dirty() {
    let mut ed = editor();
    ed.take_dirty();
    let log: Rc<RefCell<Vec<ChangeEvent>>> = Rc::default();
    let sink = Rc::clone(&log);
    let subscription = ed.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    state(&mut ed, "A", None, 0.0, 0.0);
    assert!(ed.take_dirty());
    assert!(!ed.take_dirty());
    {
        let events = log.borrow();
        assert!(matches!(
            &events[0],
            ChangeEvent::CreateState { id, parent_id: None, .. } if id == "A"
        ));
        assert!(events.iter().any(|e| matches!(e, ChangeEvent::CreateTransition { .. })));
        assert_eq!(
            events.last(),
            Some(&ChangeEvent::HistoryChanged {
                can_undo: true,
                can_redo: false,
            })
        );
    }

    log.borrow_mut().clear();
    assert!(ed.undo());
    assert!(
        log.borrow()
            .iter()
            .any(|e| matches!(e, ChangeEvent::DeleteState { id, .. } if id == "A"))
    );
    assert!(ed.take_dirty());

    drop(subscription);
    log.borrow_mut().clear();
    assert!(ed.redo());
    assert!(log.borrow().is_empty());
}

#[test]
fn rejected_operations_publish_nothing() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    ed.take_dirty();
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    let _subscription = ed.subscribe(move |_| *counter.borrow_mut() += 1);

    assert!(!ed.delete_state(NodeRef::new(M, "ghost")));
    assert!(!ed.link_state(LinkStateParams {
        machine_id: M.into(),
        parent_id: "A".into(),
        child_id: "A".into(),
    }));
    assert_eq!(*hits.borrow(), 0);
    assert!(!ed.take_dirty());
}

#[test]
fn descriptions_name_the_edits() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    assert!(ed.delete_state(NodeRef::new(M, "A")));
    assert_eq!(
        ed.history().undo_descriptions(2),
        vec!["Delete state", "Create state"]
    );
    assert!(ed.undo());
    assert_eq!(ed.history().redo_descriptions(5), vec!["Delete state"]);
}

#[test]
fn undoing_back_to_the_saved_point_clears_the_modified_flag() {
    let mut ed = Editor::default();
    assert!(!ed.is_modified());
    ed.create_state_machine(CreateStateMachineParams {
        id: Some(M.into()),
        ..CreateStateMachineParams::default()
    })
    .unwrap();
    assert!(ed.is_modified());

    state(&mut ed, "A", None, 0.0, 0.0);
    ed.save_with(&JsonCodec::default()).unwrap();
    assert!(!ed.is_modified());

    // Selection is not an edit.
    ed.select(crate::Selectable::node(M, "A"));
    assert!(!ed.is_modified());

    state(&mut ed, "B", None, 600.0, 0.0);
    assert!(ed.is_modified());
    assert!(ed.undo());
    assert!(!ed.is_modified());
    assert!(ed.undo());
    assert!(ed.is_modified());
    assert!(ed.redo());
    assert!(!ed.is_modified());

    // A new edit below the saved point replaces the saved branch for good.
    assert!(ed.undo());
    state(&mut ed, "C", None, 600.0, 0.0);
    assert!(ed.undo());
    assert!(ed.is_modified());

    let doc = ed.document().clone();
    ed.load(doc).unwrap();
    assert!(!ed.is_modified());
}

#[test]
fn the_saved_point_survives_history_eviction() {
    let config = EditorConfig {
        history: HistoryConfig { depth: 2 },
        ..EditorConfig::default()
    };
    let mut ed = Editor::new(config);
    ed.create_state_machine(CreateStateMachineParams {
        id: Some(M.into()),
        ..CreateStateMachineParams::default()
    })
    .unwrap();
    ed.mark_saved();
    state(&mut ed, "A", None, 0.0, 0.0);
    state(&mut ed, "B", None, 600.0, 0.0);
    // The machine's own group was evicted; undoing everything kept lands on the save.
    assert!(ed.undo());
    assert!(ed.undo());
    assert!(!ed.can_undo());
    assert!(!ed.is_modified());
}
