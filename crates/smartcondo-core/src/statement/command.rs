use std::path::PathBuf;

use crate::models::{Receipt, ResidentId};

/// Request token issued for each snapshot fetch.
///
/// Tickets increase monotonically per controller; a response carrying
/// anything but the latest in-flight ticket is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub(crate) u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Work the host must perform on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load the resident directory for the picker
    FetchResidents,
    /// Load one resident's account snapshot
    FetchSnapshot {
        resident_id: ResidentId,
        ticket: Ticket,
    },
    /// Register a payment for a charge
    PayCharge {
        resident_id: ResidentId,
        charge_id: i64,
        reference: String,
        notes: String,
    },
    /// Cancel an open charge
    CancelCharge {
        resident_id: ResidentId,
        charge_id: i64,
    },
    /// Download the receipt PDF for a paid charge
    FetchReceipt {
        resident_id: ResidentId,
        charge_id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Pay,
    Cancel,
    Receipt,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Pay => "Payment",
            ActionKind::Cancel => "Cancellation",
            ActionKind::Receipt => "Receipt",
        }
    }
}

/// Result of a pay/cancel/receipt command, reported back by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Paid {
        charge_id: i64,
        receipt: Receipt,
    },
    Cancelled {
        charge_id: i64,
    },
    ReceiptSaved {
        charge_id: i64,
        path: PathBuf,
    },
    Failed {
        kind: ActionKind,
        charge_id: i64,
        message: String,
    },
}

impl ActionOutcome {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionOutcome::Paid { .. } => ActionKind::Pay,
            ActionOutcome::Cancelled { .. } => ActionKind::Cancel,
            ActionOutcome::ReceiptSaved { .. } => ActionKind::Receipt,
            ActionOutcome::Failed { kind, .. } => *kind,
        }
    }
}
