use serde::{Deserialize, Serialize};

use crate::utils::contains_ignore_case;

/// Backend primary key of a resident user.
pub type ResidentId = i64;

/// A resident as listed by the directory endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentSummary {
    pub id: ResidentId,
    #[serde(default, alias = "nombre", alias = "first_name")]
    pub name: String,
    #[serde(default, alias = "apellido", alias = "last_name")]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "unidad", alias = "unidad_habitacional")]
    pub unit: Option<String>,
    #[serde(default = "default_active", alias = "activo", alias = "is_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ResidentSummary {
    pub fn full_name(&self) -> String {
        match self.surname.as_deref() {
            Some(surname) if !surname.is_empty() => format!("{} {}", self.name, surname),
            _ => self.name.clone(),
        }
    }

    /// Name with the unit label appended when known.
    pub fn display_name(&self) -> String {
        match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => format!("{} ({})", self.full_name(), unit),
            _ => self.full_name(),
        }
    }

    /// Case-insensitive match against name, unit and email.
    pub fn matches_search(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        contains_ignore_case(&self.full_name(), query)
            || self.unit.as_deref().is_some_and(|u| contains_ignore_case(u, query))
            || self.email.as_deref().is_some_and(|e| contains_ignore_case(e, query))
    }
}
