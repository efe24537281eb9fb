//! Persisted layout of the statement screen inside a `SessionStore`.
//!
//! Every key lives under `statement.` so the whole screen can be wiped
//! with a single prefix removal.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CachedData, SessionStore};
use crate::models::{AccountSnapshot, ResidentId};

pub const NAMESPACE: &str = "statement.";
pub const KEY_SELECTED_RESIDENT: &str = "statement.selected_resident";
pub const KEY_SHOW_PICKER: &str = "statement.show_picker";
pub const KEY_INIT_GUARD: &str = "statement.init_guard";
const SNAPSHOT_PREFIX: &str = "statement.snapshot.";

pub fn snapshot_key(resident_id: ResidentId) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, resident_id)
}

/// Durable mirror of the selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedSelection {
    pub selected_resident: Option<ResidentId>,
    pub show_picker: bool,
}

impl Default for PersistedSelection {
    fn default() -> Self {
        Self {
            selected_resident: None,
            show_picker: true,
        }
    }
}

impl PersistedSelection {
    pub fn read<S: SessionStore>(store: &S) -> Result<Self> {
        let selected_resident = store.get_json::<ResidentId>(KEY_SELECTED_RESIDENT)?;
        let show_picker = store.get_json::<bool>(KEY_SHOW_PICKER)?.unwrap_or(true);
        Ok(Self {
            selected_resident,
            show_picker: show_picker || selected_resident.is_none(),
        })
    }

    pub fn write<S: SessionStore>(&self, store: &mut S) -> Result<()> {
        match self.selected_resident {
            Some(id) => store.set_json(KEY_SELECTED_RESIDENT, &id)?,
            None => store.remove(KEY_SELECTED_RESIDENT)?,
        }
        store.set_json(KEY_SHOW_PICKER, &self.show_picker)
    }
}

pub fn read_snapshot<S: SessionStore>(
    store: &S,
    resident_id: ResidentId,
) -> Result<Option<CachedData<AccountSnapshot>>> {
    let cached = store.get_json::<CachedData<AccountSnapshot>>(&snapshot_key(resident_id))?;
    // A snapshot filed under the wrong key is worthless
    Ok(cached.filter(|c| c.data.resident_id == resident_id))
}

pub fn write_snapshot<S: SessionStore>(
    store: &mut S,
    snapshot: &AccountSnapshot,
    at: DateTime<Utc>,
) -> Result<()> {
    store.set_json(
        &snapshot_key(snapshot.resident_id),
        &CachedData::at(snapshot, at),
    )
}

/// Remove every key belonging to the screen, the guard included.
pub fn clear<S: SessionStore>(store: &mut S) -> Result<usize> {
    store.remove_prefix(NAMESPACE)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitGuard {
    pub expires_at: DateTime<Utc>,
}

impl InitGuard {
    pub fn read<S: SessionStore>(store: &S) -> Result<Option<Self>> {
        store.get_json(KEY_INIT_GUARD)
    }

    pub fn write<S: SessionStore>(&self, store: &mut S) -> Result<()> {
        store.set_json(KEY_INIT_GUARD, self)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use chrono::Duration;

    #[test]
    fn test_selection_round_trip_and_invariant() {
        let mut store = MemoryStore::new();
        assert_eq!(PersistedSelection::read(&store).expect("read"), PersistedSelection::default());

        let selection = PersistedSelection {
            selected_resident: Some(5),
            show_picker: false,
        };
        selection.write(&mut store).expect("write");
        assert_eq!(PersistedSelection::read(&store).expect("read"), selection);

        // A stray flag without a resident still reads as picker
        store.remove(KEY_SELECTED_RESIDENT).expect("remove");
        assert!(PersistedSelection::read(&store).expect("read").show_picker);
    }

    #[test]
    fn test_snapshot_under_wrong_key_ignored() {
        let mut store = MemoryStore::new();
        let snapshot = AccountSnapshot {
            resident_id: 9,
            ..AccountSnapshot::default()
        };
        write_snapshot(&mut store, &snapshot, Utc::now()).expect("write");
        assert!(read_snapshot(&store, 9).expect("read").is_some());

        let raw = store.get(&snapshot_key(9)).expect("get").expect("raw snapshot");
        store.set(&snapshot_key(10), &raw).expect("set");
        assert!(read_snapshot(&store, 10).expect("read").is_none());
    }

    #[test]
    fn test_init_guard_expiry() {
        let now = Utc::now();
        let guard = InitGuard {
            expires_at: now + Duration::seconds(10),
        };
        assert!(guard.is_active(now));
        assert!(!guard.is_active(now + Duration::seconds(10)));
    }
}
