//! View state controller for the account-statement screen.
//!
//! The screen toggles between a resident picker and a single resident's
//! account detail. `StatementController` owns that choice, persists it in a
//! `SessionStore` so a remount resumes where the administrator left off,
//! and makes sure at most one snapshot fetch is outstanding at a time.
//!
//! The controller performs no I/O. Every operation returns the `Command`s
//! the host must run; the host reports results back through the `on_*`
//! methods on the UI thread.

pub mod command;
pub mod controller;
pub mod error;
pub mod persist;

pub use command::{ActionKind, ActionOutcome, Command, Ticket};
pub use controller::{ControllerSettings, Notice, NoticeLevel, StatementController, ViewState};
pub use error::StatementError;
pub use persist::PersistedSelection;
