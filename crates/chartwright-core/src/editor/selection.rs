use super::{DeleteComponentParams, DeleteEventParams, Editor, NodeRef};
use crate::selection::{SelectTarget, Selectable};

impl Editor {
    pub fn selected(&self) -> impl Iterator<Item = &Selectable> {
        self.selection.selected()
    }

    /// Clears the current selection and selects only `item`.
    pub fn select(&mut self, item: Selectable) -> bool {
        match self.selection.select(&mut self.doc, item) {
            Some(flips) => {
                self.publish_flips(flips);
                true
            }
            None => false,
        }
    }

    /// Adds `item` to a multi-selection.
    pub fn add_selection(&mut self, item: Selectable) -> bool {
        match self.selection.add(&mut self.doc, item) {
            Some(flips) => {
                self.publish_flips(flips);
                true
            }
            None => false,
        }
    }

    pub fn unselect(&mut self, item: &Selectable) -> bool {
        match self.selection.remove(&mut self.doc, item) {
            Some(flips) => {
                self.publish_flips(flips);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self, except: &[Selectable]) {
        let flips = self.selection.clear(&mut self.doc, except);
        self.publish_flips(flips);
    }

    /// Deletes every selected entity as one undo step.
    ///
    /// A selected event inside a state deletes that event rather than the state. Entities that
    /// an earlier cascade already removed are skipped.
    pub fn delete_selected(&mut self) -> bool {
        let items: Vec<Selectable> = self.selection.selected().cloned().collect();
        if items.is_empty() {
            return false;
        }
        let event_owners: Vec<(String, String)> = items
            .iter()
            .filter_map(|s| match &s.target {
                SelectTarget::Event { state_id, .. } => {
                    Some((s.machine_id.clone(), state_id.clone()))
                }
                _ => None,
            })
            .collect();
        self.transact("Delete selection", |ed| {
            for item in items {
                if !item.exists_in(&ed.doc) {
                    continue;
                }
                let Selectable { machine_id, target } = item;
                match target {
                    SelectTarget::Event { state_id, selection } => {
                        ed.delete_event(DeleteEventParams {
                            machine_id,
                            state_id,
                            event: selection,
                        });
                    }
                    SelectTarget::Node(id) => {
                        if event_owners.iter().any(|(m, s)| *m == machine_id && *s == id) {
                            continue;
                        }
                        ed.delete_state(NodeRef::new(machine_id, id));
                    }
                    SelectTarget::Transition(id) => {
                        ed.delete_transition(NodeRef::new(machine_id, id));
                    }
                    SelectTarget::Note(id) => {
                        ed.delete_note(NodeRef::new(machine_id, id));
                    }
                    SelectTarget::Component(name) => {
                        ed.delete_component(DeleteComponentParams {
                            machine_id,
                            name,
                            purge: false,
                        });
                    }
                }
            }
            Some(())
        })
        .is_some()
    }
}
