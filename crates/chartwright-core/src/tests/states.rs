use super::*;
use crate::editor::{CreatePseudoStateParams, LinkStateParams, NodeRef};
use crate::geom::point;
use crate::model::NodeKindTag;

#[test]
fn first_state_of_a_scope_is_anchored_automatically() {
    let mut ed = editor();
    state(&mut ed, "A", None, 300.0, 300.0);
    assert_valid(&ed);
    assert_eq!(initial_target(&ed, None).as_deref(), Some("A"));

    let sm = ed.machine(M).unwrap();
    let initial = sm.initial_nodes_of_scope(None);
    assert_eq!(initial.len(), 1);
    assert_eq!(sm.nodes[&initial[0]].position, point(200.0, 200.0));

    state(&mut ed, "B", None, 900.0, 300.0);
    assert_eq!(initial_target(&ed, None).as_deref(), Some("A"));
    assert_eq!(ed.machine(M).unwrap().initial_nodes_of_scope(None).len(), 1);
}

#[test]
fn deleting_a_parent_promotes_its_child_to_top_level_initial() {
    let mut ed = editor();
    state(&mut ed, "A", None, 300.0, 300.0);
    state(&mut ed, "B", Some("A"), 350.0, 350.0);
    assert_valid(&ed);
    assert_eq!(initial_target(&ed, Some("A")).as_deref(), Some("B"));

    let b_absolute = ed.machine(M).unwrap().absolute_position("B").unwrap();
    assert!(ed.delete_state(NodeRef::new(M, "A")));
    assert_valid(&ed);

    let sm = ed.machine(M).unwrap();
    assert!(!sm.nodes.contains_key("A"));
    let b = &sm.nodes["B"];
    assert_eq!(b.parent_id, None);
    assert_eq!(b.position, b_absolute);
    assert_eq!(initial_target(&ed, None).as_deref(), Some("B"));
    assert!(
        sm.nodes.values().all(|n| n.parent_id.as_deref() != Some("A")),
        "nothing may still point at the deleted parent"
    );
}

#[test]
fn linking_into_an_empty_parent_moves_the_child_inside_and_anchors_it() {
    let mut ed = editor();
    state(&mut ed, "P", None, 0.0, 0.0);
    state(&mut ed, "C", None, 800.0, 800.0);
    assert!(ed.link_state(LinkStateParams {
        machine_id: M.into(),
        parent_id: "P".into(),
        child_id: "C".into(),
    }));
    assert_valid(&ed);
    let sm = ed.machine(M).unwrap();
    assert_eq!(sm.nodes["C"].parent_id.as_deref(), Some("P"));
    assert_eq!(sm.nodes["C"].position, point(100.0, 100.0));
    assert_eq!(initial_target(&ed, Some("P")).as_deref(), Some("C"));
    let nested_initial = &sm.initial_nodes_of_scope(Some("P"))[0];
    assert_eq!(sm.nodes[nested_initial].position, point(0.0, 0.0));
}

#[test]
fn linking_into_a_populated_parent_keeps_the_absolute_position() {
    let mut ed = editor();
    state(&mut ed, "P", None, 100.0, 100.0);
    state(&mut ed, "C1", Some("P"), 0.0, 0.0);
    state(&mut ed, "C2", None, 700.0, 400.0);
    assert!(ed.link_state(LinkStateParams {
        machine_id: M.into(),
        parent_id: "P".into(),
        child_id: "C2".into(),
    }));
    let sm = ed.machine(M).unwrap();
    assert_eq!(sm.absolute_position("C2"), Some(point(700.0, 400.0)));
    assert_eq!(initial_target(&ed, Some("P")).as_deref(), Some("C1"));
    assert_valid(&ed);
}

#[test]
fn linking_rejects_self_cycles_and_pseudostate_parents() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    state(&mut ed, "B", Some("A"), 0.0, 0.0);
    let before = ed.document().clone();
    let undo_depth = ed.history().undo_depth();

    let link = |parent: &str, child: &str| LinkStateParams {
        machine_id: M.into(),
        parent_id: parent.into(),
        child_id: child.into(),
    };
    assert!(!ed.link_state(link("A", "A")));
    assert!(!ed.link_state(link("B", "A")));
    assert!(!ed.link_state(link("missing", "A")));
    let initial = ed.machine(M).unwrap().initial_nodes_of_scope(None)[0].clone();
    assert!(!ed.link_state(link(&initial, "A")));
    assert!(!ed.link_state(link("A", &initial)));

    assert_eq!(ed.document(), &before);
    assert_eq!(ed.history().undo_depth(), undo_depth);
}

#[test]
fn unlinking_the_sole_child_removes_the_nested_anchor() {
    let mut ed = editor();
    state(&mut ed, "P", None, 100.0, 100.0);
    state(&mut ed, "C", Some("P"), 0.0, 0.0);
    assert!(ed.unlink_state(NodeRef::new(M, "C")));
    assert_valid(&ed);
    let sm = ed.machine(M).unwrap();
    assert!(sm.initial_nodes_of_scope(Some("P")).is_empty());
    assert_eq!(sm.nodes["C"].parent_id, None);
    assert_eq!(sm.nodes["C"].position, point(200.0, 200.0));
    assert!(
        sm.transitions
            .values()
            .all(|t| sm.nodes.contains_key(&t.source_id) && sm.contains_id(&t.target_id))
    );
}

#[test]
fn unlinking_the_initial_target_reanchors_to_the_remaining_sibling() {
    let mut ed = editor();
    state(&mut ed, "P", None, 0.0, 0.0);
    state(&mut ed, "C1", Some("P"), 0.0, 0.0);
    state(&mut ed, "C2", Some("P"), 400.0, 400.0);
    assert_eq!(initial_target(&ed, Some("P")).as_deref(), Some("C1"));
    assert!(ed.unlink_state(NodeRef::new(M, "C1")));
    assert_valid(&ed);
    assert_eq!(initial_target(&ed, Some("P")).as_deref(), Some("C2"));
}

#[test]
fn reanchoring_prefers_creation_order() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    state(&mut ed, "B", None, 600.0, 0.0);
    state(&mut ed, "C", None, 1200.0, 0.0);
    // The successor is always the earliest created state still in the scope.
    assert!(ed.set_initial_state(NodeRef::new(M, "C")));
    assert!(ed.delete_state(NodeRef::new(M, "C")));
    assert_eq!(initial_target(&ed, None).as_deref(), Some("A"));
    assert!(ed.set_initial_state(NodeRef::new(M, "B")));
    assert!(ed.delete_state(NodeRef::new(M, "B")));
    assert_eq!(initial_target(&ed, None).as_deref(), Some("A"));
    assert_valid(&ed);
}

#[test]
fn set_initial_state_moves_the_pseudostate_and_is_a_no_op_when_already_set() {
    let mut ed = editor();
    state(&mut ed, "A", None, 300.0, 300.0);
    state(&mut ed, "B", None, 1000.0, 500.0);
    let depth = ed.history().undo_depth();
    ed.take_dirty();
    assert!(ed.set_initial_state(NodeRef::new(M, "A")));
    assert_eq!(ed.history().undo_depth(), depth);
    assert!(!ed.take_dirty());

    assert!(ed.set_initial_state(NodeRef::new(M, "B")));
    assert_eq!(initial_target(&ed, None).as_deref(), Some("B"));
    let sm = ed.machine(M).unwrap();
    let initial = &sm.initial_nodes_of_scope(None)[0];
    assert_eq!(sm.nodes[initial].position, point(900.0, 400.0));
    assert_eq!(ed.history().undo_depth(), depth + 1);
}

#[test]
fn nested_initial_positions_are_clamped() {
    let mut ed = editor();
    state(&mut ed, "P", None, 0.0, 0.0);
    state(&mut ed, "C1", Some("P"), 0.0, 0.0);
    state(&mut ed, "C2", Some("P"), 30.0, 250.0);
    assert!(ed.set_initial_state(NodeRef::new(M, "C2")));
    let sm = ed.machine(M).unwrap();
    let initial = &sm.initial_nodes_of_scope(Some("P"))[0];
    assert_eq!(sm.nodes[initial].position, point(0.0, 150.0));
}

#[test]
fn delete_cascades_through_descendants_pseudostates_and_transitions() {
    let mut ed = editor();
    state(&mut ed, "Root", None, 0.0, 0.0);
    state(&mut ed, "A", Some("Root"), 0.0, 0.0);
    state(&mut ed, "A1", Some("A"), 0.0, 0.0);
    state(&mut ed, "A2", Some("A"), 500.0, 0.0);
    let fin = ed
        .create_final_state(CreatePseudoStateParams {
            machine_id: M.into(),
            id: None,
            parent_id: Some("A".into()),
            position: point(900.0, 100.0),
        })
        .unwrap();
    let t = ed
        .create_transition(crate::editor::CreateTransitionParams {
            machine_id: M.into(),
            id: None,
            source_id: "A1".into(),
            target_id: fin.clone(),
            color: None,
            label: None,
        })
        .unwrap();

    assert!(ed.delete_state(NodeRef::new(M, "A")));
    assert_valid(&ed);
    let sm = ed.machine(M).unwrap();
    assert!(!sm.nodes.contains_key("A"));
    assert!(!sm.nodes.contains_key(&fin));
    assert!(!sm.transitions.contains_key(&t));
    // The children moved up to Root, which is still anchored on one of its own states.
    assert_eq!(sm.nodes["A1"].parent_id.as_deref(), Some("Root"));
    assert_eq!(sm.nodes["A2"].parent_id.as_deref(), Some("Root"));
    assert!(initial_target(&ed, Some("Root")).is_some());
    for t in sm.transitions.values() {
        assert_ne!(t.source_id, "A");
        assert_ne!(t.target_id, "A");
    }
}

#[test]
fn one_final_state_per_scope() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let params = |parent: Option<&str>| CreatePseudoStateParams {
        machine_id: M.into(),
        id: None,
        parent_id: parent.map(str::to_string),
        position: point(50.0, 50.0),
    };
    assert!(ed.create_final_state(params(None)).is_some());
    assert!(ed.create_final_state(params(None)).is_none());
    assert!(ed.create_final_state(params(Some("A"))).is_some());
    assert!(ed.create_choice_state(params(None)).is_some());
    assert!(ed.create_choice_state(params(None)).is_some());
    assert_valid(&ed);
}

#[test]
fn initial_pseudostates_cannot_be_deleted_directly() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let initial = ed.machine(M).unwrap().initial_nodes_of_scope(None)[0].clone();
    assert!(!ed.delete_state(NodeRef::new(M, initial.as_str())));
    assert_valid(&ed);
}

#[test]
fn missing_ids_are_rejected_without_recording() {
    let mut ed = editor();
    let depth = ed.history().undo_depth();
    assert!(!ed.delete_state(NodeRef::new(M, "ghost")));
    assert!(!ed.unlink_state(NodeRef::new(M, "ghost")));
    assert!(!ed.set_initial_state(NodeRef::new("nope", "ghost")));
    assert!(!ed.change_state_name(crate::editor::ChangeStateNameParams {
        machine_id: M.into(),
        id: "ghost".into(),
        name: "x".into(),
    }));
    assert_eq!(ed.history().undo_depth(), depth);
}

#[test]
fn duplicate_caller_ids_are_rejected() {
    let mut ed = editor();
    state(&mut ed, "A", None, 0.0, 0.0);
    let again = ed.create_state(CreateStateParams {
        machine_id: M.into(),
        id: Some("A".into()),
        parent_id: None,
        name: "dup".into(),
        position: point(0.0, 0.0),
        dimensions: None,
        color: None,
        events: Vec::new(),
    });
    assert!(again.is_none());
}

#[test]
fn created_pseudostates_have_their_kind() {
    let mut ed = editor();
    let id = ed
        .create_choice_state(CreatePseudoStateParams {
            machine_id: M.into(),
            id: Some("ch".into()),
            parent_id: None,
            position: point(10.0, 10.0),
        })
        .unwrap();
    assert_eq!(ed.machine(M).unwrap().nodes[&id].tag(), NodeKindTag::Choice);
    // Choice states alone do not populate a scope.
    assert!(ed.machine(M).unwrap().initial_nodes_of_scope(None).is_empty());
    assert_valid(&ed);
}
