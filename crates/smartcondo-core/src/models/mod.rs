//! Data models for Smart Condominium entities.
//!
//! - `ResidentSummary`: directory entry shown in the resident picker
//! - `AccountSnapshot`: one resident's charges, payments and alerts
//! - `Charge`, `Payment`, `Alert`, `Receipt`: snapshot line items
//! - `Money`: integer-cent amounts parsed from the backend's decimals

pub mod account;
pub mod money;
pub mod resident;

pub use account::{
    AccountSnapshot, AccountSummary, Alert, Charge, ChargeStatus, Payment, PaymentMethod, Receipt,
};
pub use money::Money;
pub use resident::{ResidentId, ResidentSummary};
