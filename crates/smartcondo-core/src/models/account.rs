use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, ResidentId};

/// Lifecycle state of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    #[serde(rename = "pendiente", alias = "pending")]
    Pending,
    #[serde(rename = "pagado", alias = "paid")]
    Paid,
    #[serde(rename = "vencido", alias = "overdue")]
    Overdue,
    #[serde(rename = "cancelado", alias = "cancelled")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ChargeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "Pending",
            ChargeStatus::Paid => "Paid",
            ChargeStatus::Overdue => "Overdue",
            ChargeStatus::Cancelled => "Cancelled",
            ChargeStatus::Unknown => "Unknown",
        }
    }

    /// Pending and overdue charges can still be paid or cancelled.
    pub fn is_open(&self) -> bool {
        matches!(self, ChargeStatus::Pending | ChargeStatus::Overdue)
    }
}

/// A billable line item (fee, fine, ...) on a resident's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: i64,
    #[serde(default, alias = "concepto", alias = "descripcion")]
    pub concept: String,
    #[serde(alias = "monto")]
    pub amount: Money,
    #[serde(default, alias = "fecha_vencimiento")]
    pub due_date: Option<String>,
    #[serde(alias = "estado")]
    pub status: ChargeStatus,
    #[serde(default, alias = "tipo")]
    pub kind: Option<String>,
}

/// A registered payment in the resident's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "cargo", alias = "cargo_id")]
    pub charge_id: Option<i64>,
    #[serde(default, alias = "concepto")]
    pub concept: Option<String>,
    #[serde(alias = "monto", alias = "monto_pagado")]
    pub amount: Money,
    #[serde(default, alias = "fecha_pago")]
    pub paid_at: Option<String>,
    #[serde(default, alias = "metodo_pago", alias = "metodo")]
    pub method: Option<String>,
    #[serde(default, alias = "referencia")]
    pub reference: Option<String>,
}

/// A notice attached to the account (overdue warnings, blocks, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, alias = "tipo")]
    pub kind: String,
    #[serde(alias = "mensaje")]
    pub message: String,
}

/// Totals computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    #[serde(default, alias = "total_pendiente")]
    pub total_pending: Money,
    #[serde(default, alias = "total_vencido")]
    pub total_overdue: Money,
    #[serde(default, alias = "total_pagado")]
    pub total_paid: Money,
}

/// Point-in-time account statement for one resident.
///
/// Replaced wholesale on every fetch; the controller never edits one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub resident_id: ResidentId,
    #[serde(default, alias = "cargos_pendientes")]
    pub pending_charges: Vec<Charge>,
    #[serde(default, alias = "cargos_vencidos")]
    pub overdue_charges: Vec<Charge>,
    #[serde(default, alias = "historial_pagos")]
    pub payments: Vec<Payment>,
    #[serde(default, alias = "alertas")]
    pub alerts: Vec<Alert>,
    #[serde(default, alias = "resumen")]
    pub summary: AccountSummary,
}

impl AccountSnapshot {
    /// Charges that can still be acted on, overdue first.
    pub fn open_charges(&self) -> Vec<&Charge> {
        self.overdue_charges
            .iter()
            .chain(self.pending_charges.iter())
            .filter(|c| c.status.is_open())
            .collect()
    }

    pub fn find_charge(&self, charge_id: i64) -> Option<&Charge> {
        self.overdue_charges
            .iter()
            .chain(self.pending_charges.iter())
            .find(|c| c.id == charge_id)
    }

    /// Total owed, falling back to the line items when the backend sent no summary.
    pub fn balance_due(&self) -> Money {
        let from_summary = self.summary.total_pending + self.summary.total_overdue;
        if !from_summary.is_zero() {
            return from_summary;
        }
        self.open_charges().iter().map(|c| c.amount).sum()
    }

    /// Whether a payment for the given charge appears in the history.
    pub fn has_payment_for(&self, charge_id: i64) -> bool {
        self.payments.iter().any(|p| p.charge_id == Some(charge_id))
    }
}

/// Receipt returned after registering a payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default, alias = "numero_recibo", alias = "numero")]
    pub number: Option<String>,
    #[serde(default, alias = "cargo", alias = "cargo_id")]
    pub charge_id: Option<i64>,
    #[serde(default, alias = "monto")]
    pub amount: Option<Money>,
}

/// How the administrator recorded a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Card, PaymentMethod::Cash, PaymentMethod::Transfer];

    /// Wire value expected by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "tarjeta",
            PaymentMethod::Cash => "efectivo",
            PaymentMethod::Transfer => "transferencia",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Transfer => "Bank transfer",
        }
    }

    /// Payment reference in the form `TARJETA-42-20260101120000`.
    pub fn reference(&self, charge_id: i64, at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}",
            self.as_str().to_uppercase(),
            charge_id,
            at.format("%Y%m%d%H%M%S")
        )
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tarjeta" | "card" => Ok(PaymentMethod::Card),
            "efectivo" | "cash" => Ok(PaymentMethod::Cash),
            "transferencia" | "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SNAPSHOT_JSON: &str = r#"{
        "cargos_pendientes": [
            {"id": 42, "concepto": "Cuota de mantenimiento", "monto": "150.00", "fecha_vencimiento": "2026-11-01", "estado": "pendiente"}
        ],
        "cargos_vencidos": [
            {"id": 17, "concepto": "Multa por ruido", "monto": 50, "estado": "vencido", "tipo": "multa"}
        ],
        "historial_pagos": [
            {"id": 3, "cargo": 9, "monto": "80.50", "fecha_pago": "2026-09-30", "metodo": "efectivo"}
        ],
        "alertas": [{"tipo": "morosidad", "mensaje": "1 cargo vencido"}],
        "resumen": {"total_pendiente": "150.00", "total_vencido": "50.00", "total_pagado": "80.50"}
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let snapshot: AccountSnapshot = serde_json::from_str(SNAPSHOT_JSON).expect("snapshot json");
        assert_eq!(snapshot.resident_id, 0);
        assert_eq!(snapshot.pending_charges[0].amount, Money::from_cents(15000));
        assert_eq!(snapshot.overdue_charges[0].status, ChargeStatus::Overdue);
        assert_eq!(snapshot.overdue_charges[0].kind.as_deref(), Some("multa"));
        assert_eq!(snapshot.payments[0].charge_id, Some(9));
        assert_eq!(snapshot.alerts[0].message, "1 cargo vencido");
        assert_eq!(snapshot.summary.total_paid, Money::from_cents(8050));
    }

    #[test]
    fn test_open_charges_overdue_first() {
        let snapshot: AccountSnapshot = serde_json::from_str(SNAPSHOT_JSON).expect("snapshot json");
        let ids: Vec<i64> = snapshot.open_charges().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![17, 42]);
        assert_eq!(snapshot.balance_due(), Money::from_cents(20000));
        assert!(snapshot.find_charge(42).is_some());
        assert!(snapshot.has_payment_for(9));
    }

    #[test]
    fn test_balance_due_without_summary() {
        let mut snapshot: AccountSnapshot = serde_json::from_str(SNAPSHOT_JSON).expect("snapshot json");
        snapshot.summary = AccountSummary::default();
        assert_eq!(snapshot.balance_due(), Money::from_cents(20000));
    }

    #[test]
    fn test_unknown_status() {
        let charge: Charge =
            serde_json::from_str(r#"{"id": 1, "monto": "1.00", "estado": "en_revision"}"#).expect("charge json");
        assert_eq!(charge.status, ChargeStatus::Unknown);
        assert!(!charge.status.is_open());
    }

    #[test]
    fn test_payment_method_reference() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 0).unwrap();
        assert_eq!(PaymentMethod::Card.reference(42, at), "TARJETA-42-20261018090500");
        assert_eq!("Efectivo".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
