//! REST API client module for the Smart Condominium backend.
//!
//! This module provides the `ApiClient` for fetching the resident
//! directory and account statements, and for registering payments,
//! cancelling charges and downloading receipts.
//!
//! The API uses bearer token authentication obtained from the
//! `/auth/login/` endpoint.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
