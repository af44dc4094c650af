//! Random edit sequences keep every structural invariant, and undo/redo replays them exactly.

use chartwright_core::editor::{
    CreatePseudoStateParams, CreateStateMachineParams, CreateStateParams, CreateTransitionParams,
    LinkStateParams, NodeRef,
};
use chartwright_core::geom::point;
use chartwright_core::{Editor, Selectable, invariants};
use proptest::prelude::*;

const M: &str = "m";

#[derive(Debug, Clone)]
enum Op {
    CreateState { parent: Option<usize>, x: i32, y: i32 },
    CreateFinal { parent: Option<usize> },
    Link { parent: usize, child: usize },
    Unlink(usize),
    Delete(usize),
    SetInitial(usize),
    Connect { source: usize, target: usize },
    DeleteSelection(usize),
    Duplicate(usize),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (proptest::option::of(0usize..16), -500i32..1500, -500i32..1500)
            .prop_map(|(parent, x, y)| Op::CreateState { parent, x, y }),
        1 => proptest::option::of(0usize..16).prop_map(|parent| Op::CreateFinal { parent }),
        2 => (0usize..16, 0usize..16).prop_map(|(parent, child)| Op::Link { parent, child }),
        1 => (0usize..16).prop_map(Op::Unlink),
        2 => (0usize..16).prop_map(Op::Delete),
        1 => (0usize..16).prop_map(Op::SetInitial),
        2 => (0usize..16, 0usize..16).prop_map(|(source, target)| Op::Connect { source, target }),
        1 => (0usize..16).prop_map(Op::DeleteSelection),
        1 => (0usize..16).prop_map(Op::Duplicate),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

/// Non-initial node ids in table order.
fn nodes(ed: &Editor) -> Vec<String> {
    ed.machine(M)
        .map(|sm| {
            sm.nodes
                .iter()
                .filter(|(_, n)| !n.is_initial())
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn pick(ids: &[String], i: usize) -> Option<String> {
    if ids.is_empty() { None } else { Some(ids[i % ids.len()].clone()) }
}

fn apply(ed: &mut Editor, op: &Op) {
    let ids = nodes(ed);
    match op {
        Op::CreateState { parent, x, y } => {
            ed.create_state(CreateStateParams {
                machine_id: M.into(),
                id: None,
                parent_id: parent.and_then(|p| pick(&ids, p)),
                name: "s".into(),
                position: point(f64::from(*x), f64::from(*y)),
                dimensions: None,
                color: None,
                events: Vec::new(),
            });
        }
        Op::CreateFinal { parent } => {
            ed.create_final_state(CreatePseudoStateParams {
                machine_id: M.into(),
                id: None,
                parent_id: parent.and_then(|p| pick(&ids, p)),
                position: point(10.0, 10.0),
            });
        }
        Op::Link { parent, child } => {
            if let (Some(parent_id), Some(child_id)) = (pick(&ids, *parent), pick(&ids, *child)) {
                ed.link_state(LinkStateParams {
                    machine_id: M.into(),
                    parent_id,
                    child_id,
                });
            }
        }
        Op::Unlink(i) => {
            if let Some(id) = pick(&ids, *i) {
                ed.unlink_state(NodeRef::new(M, id));
            }
        }
        Op::Delete(i) => {
            if let Some(id) = pick(&ids, *i) {
                ed.delete_state(NodeRef::new(M, id));
            }
        }
        Op::SetInitial(i) => {
            if let Some(id) = pick(&ids, *i) {
                ed.set_initial_state(NodeRef::new(M, id));
            }
        }
        Op::Connect { source, target } => {
            if let (Some(source_id), Some(target_id)) = (pick(&ids, *source), pick(&ids, *target)) {
                ed.create_transition(CreateTransitionParams {
                    machine_id: M.into(),
                    id: None,
                    source_id,
                    target_id,
                    color: None,
                    label: None,
                });
            }
        }
        Op::DeleteSelection(i) => {
            if let Some(id) = pick(&ids, *i) {
                ed.select(Selectable::node(M, id));
                ed.delete_selected();
            }
        }
        Op::Duplicate(i) => {
            if let Some(id) = pick(&ids, *i) {
                ed.select(Selectable::node(M, id));
                ed.duplicate_selected();
            }
        }
        Op::Undo => {
            ed.undo();
        }
        Op::Redo => {
            ed.redo();
        }
    }
}

fn fresh_editor() -> Editor {
    let mut ed = Editor::default();
    ed.create_state_machine(CreateStateMachineParams {
        id: Some(M.into()),
        ..CreateStateMachineParams::default()
    })
    .unwrap();
    ed
}

/// Selection flags are outside history; clear them before comparing documents.
fn unselected(ed: &mut Editor) -> chartwright_core::Document {
    ed.clear_selection(&[]);
    ed.document().clone()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn edits_preserve_invariants(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut ed = fresh_editor();
        for op in &ops {
            apply(&mut ed, op);
            let violations = invariants::check_document(ed.document());
            prop_assert!(violations.is_empty(), "after {:?}: {:#?}", op, violations);
        }
    }

    #[test]
    fn undo_all_then_redo_all_round_trips(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let mut ed = fresh_editor();
        for op in &ops {
            apply(&mut ed, op);
        }
        // Redo what is still on the redo stack so the final document is fully recorded.
        while ed.redo() {}
        let end = unselected(&mut ed);

        let mut undone = 0usize;
        while ed.undo() {
            undone += 1;
            prop_assert!(invariants::check_document(ed.document()).is_empty());
        }
        prop_assert!(ed.document().machines.is_empty());
        for _ in 0..undone {
            prop_assert!(ed.redo());
        }
        prop_assert_eq!(unselected(&mut ed), end);
    }
}
