//! Synchronous change notifications.
//!
//! Every committed mutation is announced as a [`ChangeEvent`] to all live subscribers, in
//! registration order, before the mutating call returns. Subscribers hold no handle to the
//! editor; a subscriber that reaches back into it through shared ownership (e.g.
//! `Rc<RefCell<Editor>>`) will panic on the second borrow.
//!
//! Rendering is decoupled through the dirty flag: any publish sets it and the render loop
//! consumes it once per tick with [`ChangeBus::take_dirty`].

use crate::geom::Point;
use crate::model::NodeKindTag;
use crate::selection::Selectable;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    CreateState {
        machine_id: String,
        id: String,
        kind: NodeKindTag,
        parent_id: Option<String>,
    },
    DeleteState {
        machine_id: String,
        id: String,
        kind: NodeKindTag,
    },
    LinkState {
        machine_id: String,
        id: String,
        parent_id: String,
    },
    UnlinkState {
        machine_id: String,
        id: String,
    },
    ChangeStatePosition {
        machine_id: String,
        id: String,
        position: Point,
    },
    ChangeState {
        machine_id: String,
        id: String,
    },
    CreateTransition {
        machine_id: String,
        id: String,
    },
    ChangeTransition {
        machine_id: String,
        id: String,
    },
    DeleteTransition {
        machine_id: String,
        id: String,
    },
    CreateNote {
        machine_id: String,
        id: String,
    },
    ChangeNote {
        machine_id: String,
        id: String,
    },
    DeleteNote {
        machine_id: String,
        id: String,
    },
    AddComponent {
        machine_id: String,
        name: String,
    },
    ChangeComponent {
        machine_id: String,
        name: String,
    },
    RenameComponent {
        machine_id: String,
        from: String,
        to: String,
    },
    DeleteComponent {
        machine_id: String,
        name: String,
    },
    CreateStateMachine {
        machine_id: String,
    },
    ChangeStateMachine {
        machine_id: String,
    },
    DeleteStateMachine {
        machine_id: String,
    },
    SelectionChanged {
        target: Selectable,
        selected: bool,
    },
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    DocumentLoaded,
}

type Callback = Rc<dyn Fn(&ChangeEvent)>;

/// Keeps a bus callback alive; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Callback,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ChangeBus {
    subscribers: Vec<Weak<dyn Fn(&ChangeEvent)>>,
    dirty: bool,
    published: u64,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscriber_count", &self.subscribers.len())
            .field("dirty", &self.dirty)
            .field("published", &self.published)
            .finish()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        let strong: Callback = Rc::new(callback);
        self.subscribers.push(Rc::downgrade(&strong));
        Subscription { _guard: strong }
    }

    pub fn publish(&mut self, event: ChangeEvent) {
        self.dirty = true;
        self.published += 1;
        self.subscribers.retain(|w| w.strong_count() > 0);
        let live: Vec<Callback> = self.subscribers.iter().filter_map(Weak::upgrade).collect();
        tracing::trace!(?event, subscribers = live.len(), "publish");
        for callback in live {
            callback(&event);
        }
    }

    /// Returns whether anything was published since the last call, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Total number of events published so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|w| w.strong_count() > 0).count()
    }
}
