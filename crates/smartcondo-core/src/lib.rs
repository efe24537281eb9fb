//! Core library for the Smart Condominium admin console.
//!
//! - `api`: REST client for the condominium backend
//! - `auth`: login session and keychain credentials
//! - `cache`: timestamped cache entries and the persisted session store
//! - `config`: user configuration
//! - `models`: residents, charges, payments and account snapshots
//! - `statement`: view state controller for the account-statement screen
//! - `utils`: formatting helpers

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod statement;
pub mod utils;
