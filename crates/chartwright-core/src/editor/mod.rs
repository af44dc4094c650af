//! The editing context.
//!
//! [`Editor`] owns one [`Document`] together with its history, selection, change bus and
//! clipboard. Every public mutator validates its preconditions against the store, applies
//! primitive [`Command`]s inside one history transaction, and publishes each applied command
//! on the bus. Mutators return the new id or `true` on success; a rejected call returns
//! `None`/`false`, changes nothing, records nothing and publishes nothing.
//!
//! Events of a transaction are held back until the outermost commit, so subscribers only ever
//! see edits that stuck. Setting a value equal to the current one succeeds but records nothing.
//!
//! The editor remembers the history point of the last save. [`Editor::is_modified`] compares
//! against it, so undoing back to the saved point makes the document unmodified again.

mod clipboard;
mod components;
mod events;
mod machines;
mod notes;
mod selection;
mod states;
mod transitions;

pub use components::{
    AddComponentParams, ChangeComponentParams, DeleteComponentParams, SwapComponentsParams,
};
pub use events::{
    ChangeEventActionParams, ChangeEventConditionParams, ChangeEventTriggerParams,
    ChangeStateEventsParams, CreateEventActionParams, CreateEventParams, DeleteEventParams,
};
pub use machines::{
    ChangeStateMachineParams, CreateStateMachineParams, DeleteStateMachineParams, SetMetaParams,
};
pub use notes::{ChangeNoteParams, CreateNoteParams};
pub use states::{
    ChangePositionParams, ChangeStateColorParams, ChangeStateNameParams, CreatePseudoStateParams,
    CreateStateParams, LinkStateParams, NodeRef,
};
pub use transitions::{ChangeTransitionParams, CreateTransitionParams, LabelParams};

use crate::bus::{ChangeBus, ChangeEvent, Subscription};
use crate::clipboard::CopyBuffer;
use crate::codec::DocumentCodec;
use crate::command::Command;
use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::history::History;
use crate::invariants;
use crate::model::{Document, StateMachine};
use crate::selection::{Selectable, SelectionManager};

#[derive(Debug)]
pub struct Editor {
    doc: Document,
    history: History,
    selection: SelectionManager,
    bus: ChangeBus,
    clipboard: Option<CopyBuffer>,
    config: EditorConfig,
    /// Events of the open transaction, published on the outermost commit.
    pending: Vec<ChangeEvent>,
    /// History head at the last save or load.
    saved: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let history = History::new(config.history.depth);
        let saved = history.head();
        Self {
            doc: Document::default(),
            history,
            selection: SelectionManager::new(),
            bus: ChangeBus::new(),
            clipboard: None,
            config,
            pending: Vec::new(),
            saved,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn machine(&self, machine_id: &str) -> Option<&StateMachine> {
        self.doc.machine(machine_id)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn subscribe(&mut self, callback: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.bus.subscribe(callback)
    }

    /// Consumes the "needs re-render" flag set by any published change.
    pub fn take_dirty(&mut self) -> bool {
        self.bus.take_dirty()
    }

    /// Whether the document differs from the last save or load.
    ///
    /// Selection changes never count. Undo and redo move back and forth across the saved point.
    pub fn is_modified(&self) -> bool {
        self.history.head() != self.saved
    }

    /// Records the current history point as saved.
    pub fn mark_saved(&mut self) {
        self.saved = self.history.head();
    }

    /// Replaces the document after checking every structural invariant.
    ///
    /// On failure the current document, history and selection are left untouched.
    pub fn load(&mut self, doc: Document) -> Result<()> {
        let violations = invariants::check_document(&doc);
        if !violations.is_empty() {
            tracing::debug!(count = violations.len(), "rejecting document");
            return Err(Error::InvalidDocument {
                violations: violations.iter().map(ToString::to_string).collect(),
            });
        }
        self.doc = doc;
        self.history.clear();
        self.saved = self.history.head();
        self.selection.sync_from(&self.doc);
        self.clipboard = None;
        self.bus.publish(ChangeEvent::DocumentLoaded);
        self.publish_history();
        Ok(())
    }

    pub fn load_with(&mut self, codec: &dyn DocumentCodec, text: &str) -> Result<()> {
        let doc = codec.decode(text)?;
        self.load(doc)
    }

    /// Encodes the document and marks it saved.
    pub fn save_with(&mut self, codec: &dyn DocumentCodec) -> Result<String> {
        let text = codec.encode(&self.doc)?;
        self.mark_saved();
        Ok(text)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.in_transaction() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.in_transaction() && self.history.can_redo()
    }

    /// Reverts the newest undo group as one step.
    ///
    /// The whole group is first replayed on a scratch copy; the document is only replaced when
    /// every step applies, otherwise nothing changes and `false` is returned.
    pub fn undo(&mut self) -> bool {
        if self.history.in_transaction() {
            return false;
        }
        let Some(group) = self.history.peek_undo() else {
            return false;
        };
        let steps = group.inverse();
        let description = group.description.clone();
        if !self.install(&steps) {
            tracing::warn!(%description, "undo group no longer applies; history left unchanged");
            return false;
        }
        self.history.shift_undo();
        tracing::debug!(%description, steps = steps.len(), "undo");
        self.after_replay();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history.in_transaction() {
            return false;
        }
        let Some(group) = self.history.peek_redo() else {
            return false;
        };
        let steps = group.commands.clone();
        let description = group.description.clone();
        if !self.install(&steps) {
            tracing::warn!(%description, "redo group no longer applies; history left unchanged");
            return false;
        }
        self.history.shift_redo();
        tracing::debug!(%description, steps = steps.len(), "redo");
        self.after_replay();
        true
    }

    fn install(&mut self, steps: &[Command]) -> bool {
        let mut scratch = self.doc.clone();
        if !steps.iter().all(|step| step.apply(&mut scratch)) {
            return false;
        }
        self.doc = scratch;
        for step in steps {
            self.bus.publish(step.event());
        }
        true
    }

    fn after_replay(&mut self) {
        self.prune_selection();
        self.publish_history();
    }

    /// Applies `command` to the document and records it in the open transaction.
    fn exec(&mut self, command: Command) -> bool {
        let command = command.without_selection();
        if !command.apply(&mut self.doc) {
            tracing::debug!(?command, "command rejected");
            return false;
        }
        tracing::trace!(?command, "applied");
        self.emit(command.event());
        self.history.record(command);
        true
    }

    fn emit(&mut self, event: ChangeEvent) {
        if self.history.in_transaction() {
            self.pending.push(event);
        } else {
            self.bus.publish(event);
        }
    }

    /// Runs `f` as one undo group. When `f` returns `None`, everything it applied is reverted
    /// and none of its events are published.
    fn transact<T>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        self.history.begin(description);
        let mark = self.history.mark();
        let event_mark = self.pending.len();
        match f(self) {
            Some(value) => {
                let pushed = self.history.commit();
                if !self.history.in_transaction() {
                    for event in std::mem::take(&mut self.pending) {
                        self.bus.publish(event);
                    }
                    if pushed {
                        self.publish_history();
                    }
                    self.prune_selection();
                }
                Some(value)
            }
            None => {
                let applied = self.history.rollback_to(mark);
                self.pending.truncate(event_mark);
                if !applied.is_empty() {
                    tracing::warn!(description, steps = applied.len(), "rolling back partial edit");
                }
                for command in applied {
                    let inverse = command.invert();
                    if !inverse.apply(&mut self.doc) {
                        tracing::warn!(?inverse, "rollback step failed");
                    }
                }
                None
            }
        }
    }

    fn publish_history(&mut self) {
        self.bus.publish(ChangeEvent::HistoryChanged {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    fn publish_flips(&mut self, flips: Vec<(Selectable, bool)>) {
        for (target, selected) in flips {
            self.emit(ChangeEvent::SelectionChanged { target, selected });
        }
    }

    fn prune_selection(&mut self) {
        let flips = self.selection.prune(&mut self.doc);
        self.publish_flips(flips);
    }
}
