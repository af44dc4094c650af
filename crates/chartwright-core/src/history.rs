//! Undo/redo stacks of grouped commands.
//!
//! One user-perceived edit is one [`Transaction`]: the editor opens it with [`History::begin`],
//! records every primitive [`Command`] it applies, and closes it with [`History::commit`].
//! Transactions nest; only the outermost commit produces an undo entry, so cascades triggered
//! from inside another operation join their caller's group.
//!
//! ```text
//! commit(t3)            undo()                commit(t4)
//! undo: [t1, t2, t3]    undo: [t1, t2]        undo: [t1, t2, t4]
//! redo: []              redo: [t3]            redo: []
//! ```
//!
//! The undo stack never exceeds the configured depth; the oldest group is evicted first.
//!
//! Every pushed group gets a serial number, and [`History::head`] names the document state the
//! stacks currently sit at. Two equal heads mean the same state, which is how the editor tells
//! whether it is back at its last save.

use crate::command::Command;
use std::collections::VecDeque;

/// A group of commands undone and redone as a single step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub description: String,
    pub commands: Vec<Command>,
    /// Assigned when the group is pushed onto the undo stack.
    pub serial: u64,
}

impl Transaction {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
            serial: 0,
        }
    }

    /// Number of commands recorded in addition to the first one.
    pub fn connected_actions(&self) -> usize {
        self.commands.len().saturating_sub(1)
    }

    /// The commands that revert this group, in the order they must be applied.
    pub fn inverse(&self) -> Vec<Command> {
        self.commands.iter().rev().map(Command::invert).collect()
    }
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Transaction>,
    redo_stack: VecDeque<Transaction>,
    open: Option<Transaction>,
    depth: usize,
    max_depth: usize,
    next_serial: u64,
    /// Head once the undo stack is empty: the state before the oldest group still kept.
    base: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            open: None,
            depth: 0,
            max_depth: max_depth.max(1),
            next_serial: 1,
            base: 0,
        }
    }

    /// The document state the stacks sit at.
    pub fn head(&self) -> u64 {
        self.undo_stack.back().map_or(self.base, |t| t.serial)
    }

    /// Opens a transaction, or joins the one already open.
    pub fn begin(&mut self, description: &str) {
        if self.open.is_none() {
            self.open = Some(Transaction::new(description));
        }
        self.depth += 1;
    }

    /// Number of commands in the open transaction; a rollback target for [`History::rollback_to`].
    pub fn mark(&self) -> usize {
        self.open.as_ref().map_or(0, |t| t.commands.len())
    }

    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    /// Appends an already applied command to the open transaction.
    ///
    /// Commands recorded outside a transaction become single-command groups.
    pub fn record(&mut self, command: Command) {
        match &mut self.open {
            Some(t) => t.commands.push(command),
            None => {
                let mut t = Transaction::new(describe(&command));
                t.commands.push(command);
                self.push(t);
            }
        }
    }

    /// Closes one nesting level. Returns `true` when the outermost level closed and a non-empty
    /// group was pushed.
    pub fn commit(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return false;
        }
        match self.open.take() {
            Some(t) if !t.commands.is_empty() => {
                self.push(t);
                true
            }
            _ => false,
        }
    }

    /// Closes one nesting level and hands back the commands recorded after `mark`, newest first,
    /// so the caller can revert them. The outer transaction, if any, stays open.
    pub fn rollback_to(&mut self, mark: usize) -> Vec<Command> {
        self.depth = self.depth.saturating_sub(1);
        let undone = match &mut self.open {
            Some(t) if mark <= t.commands.len() => {
                let mut tail = t.commands.split_off(mark);
                tail.reverse();
                tail
            }
            _ => Vec::new(),
        };
        if self.depth == 0 {
            self.open = None;
        }
        undone
    }

    fn push(&mut self, mut transaction: Transaction) {
        transaction.serial = self.next_serial;
        self.next_serial += 1;
        tracing::trace!(
            description = %transaction.description,
            connected_actions = transaction.connected_actions(),
            "history push"
        );
        self.undo_stack.push_back(transaction);
        self.redo_stack.clear();
        self.enforce_limits();
    }

    fn enforce_limits(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            if let Some(evicted) = self.undo_stack.pop_front() {
                self.base = evicted.serial;
            }
        }
    }

    pub fn peek_undo(&self) -> Option<&Transaction> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&Transaction> {
        self.redo_stack.back()
    }

    /// Moves the newest undo group onto the redo stack.
    pub fn shift_undo(&mut self) -> Option<&Transaction> {
        let t = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(t);
        self.redo_stack.back()
    }

    /// Moves the newest redo group back onto the undo stack.
    pub fn shift_redo(&mut self) -> Option<&Transaction> {
        let t = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(t);
        self.enforce_limits();
        self.undo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Descriptions of the undo stack, newest first.
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|t| t.description.as_str())
            .collect()
    }

    /// Descriptions of the redo stack, next redo first.
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.redo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|t| t.description.as_str())
            .collect()
    }

    /// Drops both stacks. The head moves to a state no earlier head can match.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.depth = 0;
        self.base = self.next_serial;
        self.next_serial += 1;
    }
}

fn describe(command: &Command) -> String {
    match command {
        Command::CreateNode { id, .. } => format!("Create state {id}"),
        Command::DeleteNode { id, .. } => format!("Delete state {id}"),
        Command::SetParent { id, to: Some(p), .. } => format!("Link state {id} to {p}"),
        Command::SetParent { id, to: None, .. } => format!("Unlink state {id}"),
        Command::MoveNode { id, .. } => format!("Move state {id}"),
        Command::ChangeState { id, .. } => format!("Change state {id}"),
        Command::CreateTransition { id, .. } => format!("Create transition {id}"),
        Command::DeleteTransition { id, .. } => format!("Delete transition {id}"),
        Command::ChangeTransition { id, .. } => format!("Change transition {id}"),
        Command::CreateNote { id, .. } => format!("Create note {id}"),
        Command::DeleteNote { id, .. } => format!("Delete note {id}"),
        Command::ChangeNote { id, .. } => format!("Change note {id}"),
        Command::AddComponent { name, .. } => format!("Add component {name}"),
        Command::DeleteComponent { name, .. } => format!("Delete component {name}"),
        Command::ChangeComponent { name, .. } => format!("Change component {name}"),
        Command::RenameComponent { from, to, .. } => format!("Rename component {from} to {to}"),
        Command::CreateMachine { machine_id, .. } => format!("Create state machine {machine_id}"),
        Command::DeleteMachine { machine_id, .. } => format!("Delete state machine {machine_id}"),
        Command::ChangeMachine { machine_id, .. } => format!("Change state machine {machine_id}"),
    }
}
