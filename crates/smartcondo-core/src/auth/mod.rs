//! Login session and stored credentials for the console.
//!
//! - `Session` / `SessionData`: bearer token persisted in the cache
//!   directory, valid for 8 hours
//! - `Role`: backend role of the logged-in user; only administrators may
//!   open account statements
//! - `CredentialStore`: OS keychain passwords via `keyring`

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Role, Session, SessionData};
