#![forbid(unsafe_code)]

//! Hierarchical state-machine diagram model with an edit/undo engine (headless).
//!
//! Design goals:
//! - structural invariants hold after every public edit (one initial pseudostate per populated
//!   scope, no dangling references, acyclic nesting)
//! - every edit is one undoable group of invertible commands
//! - no hidden global state: an [`Editor`] is an explicit context object

pub mod bus;
pub mod clipboard;
pub mod codec;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod geom;
pub mod history;
pub mod invariants;
pub mod model;
pub mod selection;
mod store;

pub use bus::{ChangeBus, ChangeEvent, Subscription};
pub use codec::{DocumentCodec, JsonCodec};
pub use command::Command;
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{Error, Result};
pub use history::{History, Transaction};
pub use model::{Document, Node, NodeKind, NodeKindTag, StateMachine};
pub use selection::{SelectTarget, Selectable};
