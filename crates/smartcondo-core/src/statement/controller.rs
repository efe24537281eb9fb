use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::auth::Role;
use crate::cache::{CachedData, SessionStore};
use crate::config::Config;
use crate::models::{AccountSnapshot, Charge, PaymentMethod, ResidentId, ResidentSummary};

use super::command::{ActionKind, ActionOutcome, Command, Ticket};
use super::error::StatementError;
use super::persist::{self, InitGuard, PersistedSelection};

// ============================================================================
// Constants
// ============================================================================

/// A second initialization inside this window is treated as a double mount.
const INIT_GUARD_TTL_SECS: i64 = 10;

/// After unmount the guard lingers this long, then a remount re-initializes.
const UNMOUNT_GRACE_MS: i64 = 500;

const DEFAULT_SNAPSHOT_MAX_AGE_MINUTES: i64 = 30;

const DEFAULT_NOTICE_SECS: i64 = 4;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Cached snapshots older than this are refetched; `None` never trusts the cache.
    pub snapshot_max_age: Option<Duration>,
    pub notice_ttl: Duration,
    pub init_guard_ttl: Duration,
    pub unmount_grace: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            snapshot_max_age: Some(Duration::minutes(DEFAULT_SNAPSHOT_MAX_AGE_MINUTES)),
            notice_ttl: Duration::seconds(DEFAULT_NOTICE_SECS),
            init_guard_ttl: Duration::seconds(INIT_GUARD_TTL_SECS),
            unmount_grace: Duration::milliseconds(UNMOUNT_GRACE_MS),
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_max_age: config.snapshot_max_age(),
            notice_ttl: config.notice_ttl(),
            ..Self::default()
        }
    }
}

/// Which of the two screen modes is showing, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Picker,
    Loading,
    Detail,
    /// Picker variant shown after a failed snapshot fetch
    ErrorNoData,
}

impl ViewState {
    pub fn shows_picker(&self) -> bool {
        matches!(self, ViewState::Picker | ViewState::ErrorNoData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    resident_id: ResidentId,
    ticket: Ticket,
}

/// State machine behind the account-statement screen.
pub struct StatementController<S: SessionStore> {
    store: S,
    settings: ControllerSettings,
    clock: Clock,
    /// Role the current mount was initialized for; `None` while unmounted.
    mounted_as: Option<Role>,

    view: ViewState,
    selected_resident: Option<ResidentId>,
    snapshot: Option<AccountSnapshot>,
    snapshot_cached_at: Option<DateTime<Utc>>,
    in_flight: Option<InFlight>,
    last_ticket: u64,

    residents: Vec<ResidentSummary>,
    residents_loading: bool,
    pending_action: Option<(ActionKind, i64)>,

    error: Option<StatementError>,
    storage_error: Option<StatementError>,
    notice: Option<Notice>,
}

impl<S: SessionStore> StatementController<S> {
    pub fn new(store: S, settings: ControllerSettings) -> Self {
        Self {
            store,
            settings,
            clock: Arc::new(Utc::now),
            mounted_as: None,
            view: ViewState::Picker,
            selected_resident: None,
            snapshot: None,
            snapshot_cached_at: None,
            in_flight: None,
            last_ticket: 0,
            residents: Vec::new(),
            residents_loading: false,
            pending_action: None,
            error: None,
            storage_error: None,
            notice: None,
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn show_picker(&self) -> bool {
        self.view.shows_picker()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted_as.is_some()
    }

    pub fn selected_resident(&self) -> Option<ResidentId> {
        self.selected_resident
    }

    /// Directory entry for the selected resident, when the list is loaded.
    pub fn selected_resident_summary(&self) -> Option<&ResidentSummary> {
        let id = self.selected_resident?;
        self.residents.iter().find(|r| r.id == id)
    }

    pub fn snapshot(&self) -> Option<&AccountSnapshot> {
        self.snapshot.as_ref()
    }

    /// When the held snapshot was fetched (or originally cached, if restored).
    pub fn snapshot_cached_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot_cached_at
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn residents(&self) -> &[ResidentSummary] {
        &self.residents
    }

    pub fn residents_loading(&self) -> bool {
        self.residents_loading
    }

    /// Active residents matching the search query, for the picker.
    pub fn picker_residents(&self, query: &str) -> Vec<&ResidentSummary> {
        self.residents
            .iter()
            .filter(|r| r.active && r.matches_search(query))
            .collect()
    }

    pub fn pending_action(&self) -> Option<(ActionKind, i64)> {
        self.pending_action
    }

    pub fn error(&self) -> Option<&StatementError> {
        self.error.as_ref()
    }

    /// Last failure writing the session store; state still works in memory.
    pub fn storage_error(&self) -> Option<&StatementError> {
        self.storage_error.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn is_locked_out(&self) -> bool {
        self.error.as_ref().is_some_and(StatementError::is_fatal)
    }

    // =========================================================================
    // Mount lifecycle
    // =========================================================================

    /// Derive the initial state for a new mount.
    ///
    /// A mount absorbed by a fresh initialization guard still rebuilds the
    /// visible state from the session store; it only skips the directory
    /// fetch and any snapshot fetch this controller already has outstanding.
    pub fn initialize(&mut self, role: Role) -> Vec<Command> {
        match self.mounted_as {
            Some(mounted_role) if mounted_role == role => {
                debug!("Statement controller already mounted, skipping initialization");
                return Vec::new();
            }
            Some(mounted_role) => {
                // A different user took over the session
                info!(from = %mounted_role, to = %role, "Role changed while mounted, re-initializing");
                self.reset();
            }
            None => {}
        }

        let now = self.now();
        let absorbed = match InitGuard::read(&self.store) {
            Ok(Some(guard)) if guard.is_active(now) => {
                debug!(expires_at = %guard.expires_at, "Recent initialization guard active");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read initialization guard");
                false
            }
        };

        self.mounted_as = Some(role);
        if !absorbed {
            let guard = InitGuard {
                expires_at: now + self.settings.init_guard_ttl,
            };
            if let Err(e) = guard.write(&mut self.store) {
                self.record_storage_error("initialization guard", e);
            }
        }

        if !role.is_admin() {
            warn!(%role, "Account statements require an administrator");
            self.reset();
            self.error = Some(StatementError::Unauthorized);
            return Vec::new();
        }

        let persisted = match PersistedSelection::read(&self.store) {
            Ok(selection) => selection,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted selection, starting fresh");
                PersistedSelection::default()
            }
        };

        let Some(resident_id) = persisted.selected_resident else {
            self.view = ViewState::Picker;
            // A fetch for a resident that is no longer selected is worthless
            self.in_flight = None;
            if absorbed {
                return Vec::new();
            }
            return self.request_residents();
        };
        self.selected_resident = Some(resident_id);

        if !persisted.show_picker {
            if let Some(cached) = self.restorable_snapshot(resident_id, now) {
                info!(resident_id, absorbed, "Restoring account statement from session store");
                self.in_flight = None;
                self.snapshot_cached_at = Some(cached.cached_at);
                self.snapshot = Some(cached.data);
                self.view = ViewState::Detail;
                if absorbed {
                    return Vec::new();
                }
                // The picker needs the directory if the user navigates back
                return self.request_residents();
            }
        }

        debug!(resident_id, absorbed, "Restoring selection, snapshot must be fetched");
        self.view = ViewState::Loading;
        if self.in_flight.is_some_and(|f| f.resident_id != resident_id) {
            self.in_flight = None;
        }
        // Dedupes against a fetch issued before the last unmount
        self.load_snapshot(resident_id)
    }

    /// Tear down in-memory state. A remount after the grace period starts over.
    ///
    /// An outstanding snapshot fetch survives so its response can still be
    /// cached and picked up by the next mount.
    pub fn unmount(&mut self) {
        let grace_expiry = self.now() + self.settings.unmount_grace;
        match InitGuard::read(&self.store) {
            Ok(Some(guard)) if guard.expires_at > grace_expiry => {
                let shortened = InitGuard {
                    expires_at: grace_expiry,
                };
                if let Err(e) = shortened.write(&mut self.store) {
                    self.record_storage_error("initialization guard", e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read initialization guard on unmount"),
        }

        let in_flight = self.in_flight;
        self.reset();
        self.in_flight = in_flight;
        self.mounted_as = None;
        debug!("Statement controller unmounted");
    }

    fn reset(&mut self) {
        self.view = ViewState::Picker;
        self.selected_resident = None;
        self.snapshot = None;
        self.snapshot_cached_at = None;
        self.in_flight = None;
        self.residents.clear();
        self.residents_loading = false;
        self.pending_action = None;
        self.error = None;
        self.notice = None;
    }

    /// The host could not run `command` (no session). Undo whatever the
    /// controller recorded for it so a retry is not refused.
    pub fn on_command_dropped(&mut self, command: Command) {
        debug!(?command, "Command dropped by host");
        match command {
            Command::FetchResidents => self.residents_loading = false,
            Command::FetchSnapshot { ticket, .. } => {
                self.on_snapshot_loaded(ticket, Err("request was not sent".to_string()));
            }
            Command::PayCharge { charge_id, .. } => {
                self.fail_dropped_action(ActionKind::Pay, charge_id);
            }
            Command::CancelCharge { charge_id, .. } => {
                self.fail_dropped_action(ActionKind::Cancel, charge_id);
            }
            Command::FetchReceipt { charge_id, .. } => {
                self.fail_dropped_action(ActionKind::Receipt, charge_id);
            }
        }
    }

    fn fail_dropped_action(&mut self, kind: ActionKind, charge_id: i64) {
        self.on_action_finished(ActionOutcome::Failed {
            kind,
            charge_id,
            message: "request was not sent".to_string(),
        });
    }

    fn restorable_snapshot(
        &self,
        resident_id: ResidentId,
        now: DateTime<Utc>,
    ) -> Option<CachedData<AccountSnapshot>> {
        let max_age = self.settings.snapshot_max_age?;
        match persist::read_snapshot(&self.store, resident_id) {
            Ok(Some(cached)) if !cached.is_older_than(max_age, now) => Some(cached),
            Ok(Some(cached)) => {
                debug!(resident_id, age = %cached.age_display_at(now), "Cached snapshot too old to restore");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(resident_id, error = %e, "Failed to read cached snapshot");
                None
            }
        }
    }

    // =========================================================================
    // Resident directory
    // =========================================================================

    fn request_residents(&mut self) -> Vec<Command> {
        if self.residents_loading {
            return Vec::new();
        }
        self.residents_loading = true;
        vec![Command::FetchResidents]
    }

    /// Reload the directory on demand.
    pub fn reload_residents(&mut self) -> Vec<Command> {
        if self.is_locked_out() {
            return Vec::new();
        }
        self.request_residents()
    }

    pub fn on_residents_loaded(&mut self, result: Result<Vec<ResidentSummary>, String>) {
        self.residents_loading = false;
        match result {
            Ok(mut residents) => {
                residents.sort_by_key(|r| r.full_name().to_lowercase());
                debug!(count = residents.len(), "Resident directory loaded");
                self.residents = residents;
            }
            Err(message) => {
                warn!(error = %message, "Failed to load resident directory");
                self.post_error(format!("Could not load residents: {}", message));
            }
        }
    }

    // =========================================================================
    // Selection and snapshot loading
    // =========================================================================

    /// Request the snapshot for `resident_id` unless a fetch is already
    /// outstanding or the held snapshot already belongs to that resident.
    pub fn load_snapshot(&mut self, resident_id: ResidentId) -> Vec<Command> {
        if let Some(flight) = self.in_flight {
            if flight.resident_id == resident_id {
                debug!(resident_id, "Snapshot fetch already in flight");
            } else {
                debug!(resident_id, busy_with = flight.resident_id, "Another snapshot fetch in flight");
            }
            return Vec::new();
        }
        if self.snapshot.as_ref().is_some_and(|s| s.resident_id == resident_id) {
            debug!(resident_id, "Snapshot already held");
            return Vec::new();
        }

        self.last_ticket += 1;
        let ticket = Ticket(self.last_ticket);
        self.in_flight = Some(InFlight { resident_id, ticket });
        debug!(resident_id, ticket = ticket.value(), "Requesting account snapshot");
        vec![Command::FetchSnapshot {
            resident_id,
            ticket,
        }]
    }

    /// Apply a snapshot response. Responses for superseded tickets are dropped.
    pub fn on_snapshot_loaded(&mut self, ticket: Ticket, result: Result<AccountSnapshot, String>) {
        let flight = match self.in_flight {
            Some(flight) if flight.ticket == ticket => flight,
            _ => {
                debug!(ticket = ticket.value(), "Discarding stale snapshot response");
                return;
            }
        };
        self.in_flight = None;

        if !self.is_mounted() {
            self.cache_unmounted_result(flight, result);
            return;
        }

        if self.selected_resident != Some(flight.resident_id) {
            debug!(resident_id = flight.resident_id, "Resident no longer selected, dropping snapshot");
            return;
        }

        match result {
            Ok(mut snapshot) => {
                snapshot.resident_id = flight.resident_id;
                let now = self.now();
                if let Err(e) = persist::write_snapshot(&mut self.store, &snapshot, now) {
                    self.record_storage_error("account snapshot", e);
                }
                self.persist_selection(false);

                info!(resident_id = flight.resident_id, "Account statement loaded");
                self.snapshot = Some(snapshot);
                self.snapshot_cached_at = Some(now);
                self.view = ViewState::Detail;
                self.error = None;
            }
            Err(message) => {
                warn!(resident_id = flight.resident_id, error = %message, "Account statement fetch failed");
                self.snapshot = None;
                self.snapshot_cached_at = None;
                self.view = ViewState::ErrorNoData;
                self.persist_selection(true);
                self.post_error(format!("Could not load account statement: {}", message));
                self.error = Some(StatementError::Fetch(message));
            }
        }
    }

    /// A response landing between unmount and remount is cached for the next
    /// mount if its resident is still the persisted selection.
    fn cache_unmounted_result(&mut self, flight: InFlight, result: Result<AccountSnapshot, String>) {
        let Ok(mut snapshot) = result else {
            debug!(resident_id = flight.resident_id, "Snapshot fetch failed while unmounted");
            return;
        };
        let selected = match PersistedSelection::read(&self.store) {
            Ok(selection) => selection.selected_resident,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted selection");
                None
            }
        };
        if selected != Some(flight.resident_id) {
            debug!(resident_id = flight.resident_id, "Dropping snapshot for a deselected resident");
            return;
        }
        snapshot.resident_id = flight.resident_id;
        let now = self.now();
        match persist::write_snapshot(&mut self.store, &snapshot, now) {
            Ok(()) => debug!(resident_id = flight.resident_id, "Cached snapshot received while unmounted"),
            Err(e) => self.record_storage_error("account snapshot", e),
        }
    }

    /// Show a resident's account, fetching it unless it is already held or loading.
    pub fn select_resident(&mut self, resident_id: ResidentId) -> Vec<Command> {
        if self.is_locked_out() {
            return Vec::new();
        }
        if self.selected_resident == Some(resident_id) {
            if self.snapshot.as_ref().is_some_and(|s| s.resident_id == resident_id) {
                debug!(resident_id, "Resident already selected and loaded");
                return Vec::new();
            }
            if self.in_flight.is_some_and(|f| f.resident_id == resident_id) {
                debug!(resident_id, "Resident already selected and loading");
                return Vec::new();
            }
        }

        if let Some(superseded) = self.in_flight.take() {
            debug!(
                resident_id = superseded.resident_id,
                ticket = superseded.ticket.value(),
                "Superseding in-flight snapshot fetch"
            );
        }

        self.selected_resident = Some(resident_id);
        self.snapshot = None;
        self.snapshot_cached_at = None;
        self.view = ViewState::Loading;
        self.error = None;
        self.persist_selection(false);

        self.load_snapshot(resident_id)
    }

    /// Go back to the picker and forget everything persisted for the screen.
    pub fn return_to_list(&mut self) -> Vec<Command> {
        if self.is_locked_out() {
            return Vec::new();
        }

        self.selected_resident = None;
        self.snapshot = None;
        self.snapshot_cached_at = None;
        self.in_flight = None;
        self.pending_action = None;
        self.view = ViewState::Picker;
        self.error = None;

        match persist::clear(&mut self.store) {
            Ok(removed) => debug!(removed, "Cleared persisted statement state"),
            Err(e) => self.record_storage_error("statement state", e),
        }

        if self.residents.is_empty() {
            return self.request_residents();
        }
        Vec::new()
    }

    /// Drop the held snapshot and fetch it again for the current resident.
    pub fn refresh_snapshot(&mut self) -> Vec<Command> {
        let Some(resident_id) = self.selected_resident else {
            return Vec::new();
        };
        if self.is_locked_out() {
            return Vec::new();
        }
        self.snapshot = None;
        self.snapshot_cached_at = None;
        self.view = ViewState::Loading;
        self.load_snapshot(resident_id)
    }

    // =========================================================================
    // Charge actions
    // =========================================================================

    /// Resident the action applies to, or `None` (with a notice) if the action
    /// cannot start now.
    fn action_target(&mut self) -> Option<ResidentId> {
        if self.is_locked_out() {
            return None;
        }
        let resident_id = match (self.view, self.selected_resident) {
            (ViewState::Detail, Some(id)) => id,
            _ => {
                self.post_error("Select a resident with a loaded statement first".to_string());
                return None;
            }
        };
        if let Some((kind, charge_id)) = self.pending_action {
            self.post_error(format!(
                "{} for charge #{} is still in progress",
                kind.label(),
                charge_id
            ));
            return None;
        }
        Some(resident_id)
    }

    pub fn pay_charge(&mut self, charge: &Charge, method: PaymentMethod) -> Vec<Command> {
        let Some(resident_id) = self.action_target() else {
            return Vec::new();
        };
        if !charge.status.is_open() {
            self.post_error(format!(
                "Charge #{} is {} and cannot be paid",
                charge.id,
                charge.status.label().to_lowercase()
            ));
            return Vec::new();
        }

        let reference = method.reference(charge.id, self.now());
        info!(resident_id, charge_id = charge.id, method = method.as_str(), "Registering payment");
        self.pending_action = Some((ActionKind::Pay, charge.id));
        vec![Command::PayCharge {
            resident_id,
            charge_id: charge.id,
            reference,
            notes: format!("Registered from the admin console, method: {}", method.as_str()),
        }]
    }

    pub fn cancel_charge(&mut self, charge: &Charge) -> Vec<Command> {
        let Some(resident_id) = self.action_target() else {
            return Vec::new();
        };
        if !charge.status.is_open() {
            self.post_error(format!(
                "Charge #{} is {} and cannot be cancelled",
                charge.id,
                charge.status.label().to_lowercase()
            ));
            return Vec::new();
        }

        info!(resident_id, charge_id = charge.id, "Cancelling charge");
        self.pending_action = Some((ActionKind::Cancel, charge.id));
        vec![Command::CancelCharge {
            resident_id,
            charge_id: charge.id,
        }]
    }

    pub fn generate_receipt(&mut self, charge_id: i64) -> Vec<Command> {
        let Some(resident_id) = self.action_target() else {
            return Vec::new();
        };
        let paid = self.snapshot.as_ref().is_some_and(|s| {
            s.has_payment_for(charge_id)
                || s.find_charge(charge_id)
                    .is_some_and(|c| c.status == crate::models::ChargeStatus::Paid)
        });
        if !paid {
            self.post_error(format!("No payment registered for charge #{}", charge_id));
            return Vec::new();
        }

        self.pending_action = Some((ActionKind::Receipt, charge_id));
        vec![Command::FetchReceipt {
            resident_id,
            charge_id,
        }]
    }

    /// Report an action result. Success always refetches the snapshot.
    pub fn on_action_finished(&mut self, outcome: ActionOutcome) -> Vec<Command> {
        let kind = outcome.kind();
        match self.pending_action.take() {
            Some((pending, _)) if pending == kind => {}
            other => debug!(kind = kind.label(), pending = ?other, "Action result without a matching pending action"),
        }
        match outcome {
            ActionOutcome::Paid { charge_id, receipt } => {
                let text = match receipt.number {
                    Some(number) => format!("Payment registered for charge #{} (receipt {})", charge_id, number),
                    None => format!("Payment registered for charge #{}", charge_id),
                };
                self.post_success(text);
            }
            ActionOutcome::Cancelled { charge_id } => {
                self.post_success(format!("Charge #{} cancelled", charge_id));
            }
            ActionOutcome::ReceiptSaved { charge_id, path } => {
                self.post_success(format!("Receipt for charge #{} saved to {}", charge_id, path.display()));
            }
            ActionOutcome::Failed {
                kind,
                charge_id,
                message,
            } => {
                let err = StatementError::Action(format!(
                    "{} failed for charge #{}: {}",
                    kind.label(),
                    charge_id,
                    message
                ));
                warn!(charge_id, error = %err, "Charge action failed");
                self.post_error(err.to_string());
                return Vec::new();
            }
        }
        self.refresh_snapshot()
    }

    // =========================================================================
    // Notices and persistence helpers
    // =========================================================================

    fn post_success(&mut self, text: String) {
        self.notice = Some(Notice {
            level: NoticeLevel::Success,
            text,
            created_at: self.now(),
        });
    }

    fn post_error(&mut self, text: String) {
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            text,
            created_at: self.now(),
        });
    }

    /// Clear the notice once it has been visible long enough. Returns true if cleared.
    pub fn expire_notice(&mut self) -> bool {
        let now = self.now();
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| now - n.created_at >= self.settings.notice_ttl);
        if expired {
            self.notice = None;
        }
        expired
    }

    fn persist_selection(&mut self, show_picker: bool) {
        let selection = PersistedSelection {
            selected_resident: self.selected_resident,
            show_picker: show_picker || self.selected_resident.is_none(),
        };
        if let Err(e) = selection.write(&mut self.store) {
            self.record_storage_error("selection", e);
        }
    }

    fn record_storage_error(&mut self, what: &str, e: anyhow::Error) {
        warn!(what, error = %e, "Failed to persist statement state");
        self.storage_error = Some(StatementError::Storage(format!("{}: {}", what, e)));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::models::{ChargeStatus, Money, Payment, Receipt};
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn new() -> Self {
            TestClock(Arc::new(Mutex::new(
                Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            )))
        }

        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    fn controller(store: MemoryStore, clock: &TestClock) -> StatementController<MemoryStore> {
        let clock = clock.clone();
        StatementController::new(store, ControllerSettings::default()).with_clock(move || clock.now())
    }

    fn charge(id: i64, status: ChargeStatus) -> Charge {
        Charge {
            id,
            concept: format!("Charge {}", id),
            amount: Money::from_cents(15000),
            due_date: Some("2026-11-01".to_string()),
            status,
            kind: None,
        }
    }

    fn snapshot_for(resident_id: ResidentId, pending: Vec<Charge>) -> AccountSnapshot {
        AccountSnapshot {
            resident_id,
            pending_charges: pending,
            ..AccountSnapshot::default()
        }
    }

    fn resident(id: ResidentId, name: &str, active: bool) -> ResidentSummary {
        ResidentSummary {
            id,
            name: name.to_string(),
            surname: None,
            email: None,
            unit: None,
            active,
        }
    }

    fn fetches(commands: &[Command]) -> Vec<(ResidentId, Ticket)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::FetchSnapshot { resident_id, ticket } => Some((*resident_id, *ticket)),
                _ => None,
            })
            .collect()
    }

    fn single_fetch(commands: &[Command]) -> (ResidentId, Ticket) {
        let found = fetches(commands);
        assert_eq!(found.len(), 1, "expected exactly one fetch, got {:?}", commands);
        found[0]
    }

    /// Controller mounted as admin and showing resident `id` in detail.
    fn loaded(store: MemoryStore, clock: &TestClock, id: ResidentId, pending: Vec<Charge>) -> StatementController<MemoryStore> {
        let mut c = controller(store, clock);
        c.initialize(Role::Admin);
        c.on_residents_loaded(Ok(vec![resident(id, "Juan Pérez", true)]));
        let (_, ticket) = single_fetch(&c.select_resident(id));
        c.on_snapshot_loaded(ticket, Ok(snapshot_for(id, pending)));
        assert_eq!(c.view(), ViewState::Detail);
        c
    }

    fn persisted_snapshot_keys(store: &MemoryStore) -> Vec<String> {
        store
            .keys()
            .unwrap()
            .into_iter()
            .filter(|k| k.starts_with("statement.snapshot."))
            .collect()
    }

    #[test]
    fn test_initialize_without_selection_loads_residents() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        let commands = c.initialize(Role::Admin);
        assert_eq!(commands, vec![Command::FetchResidents]);
        assert_eq!(c.view(), ViewState::Picker);
        assert!(c.show_picker());
        assert!(c.selected_resident().is_none());
    }

    #[test]
    fn test_initialize_requires_admin() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        assert!(c.initialize(Role::Resident).is_empty());
        assert_eq!(c.error(), Some(&StatementError::Unauthorized));
        assert!(c.select_resident(1).is_empty());
        assert!(c.return_to_list().is_empty());
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        assert_eq!(c.initialize(Role::Admin).len(), 1);
        clock.advance(Duration::seconds(2));
        assert!(c.initialize(Role::Admin).is_empty());
    }

    #[test]
    fn test_rapid_remount_within_guard_is_noop() {
        let clock = TestClock::new();
        let store = MemoryStore::new();
        let mut first = controller(store.clone(), &clock);
        assert_eq!(first.initialize(Role::Admin), vec![Command::FetchResidents]);

        // Second mount of the same screen while the first never unmounted
        clock.advance(Duration::seconds(5));
        let mut second = controller(store.clone(), &clock);
        assert!(second.initialize(Role::Admin).is_empty());

        clock.advance(Duration::seconds(6));
        let mut third = controller(store, &clock);
        assert_eq!(third.initialize(Role::Admin), vec![Command::FetchResidents]);
    }

    #[test]
    fn test_unmount_allows_genuine_remount() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);

        c.unmount();
        assert!(!c.is_mounted());
        assert!(c.snapshot().is_none());

        // Within the grace period the remount is absorbed but still restored
        clock.advance(Duration::milliseconds(100));
        assert!(c.initialize(Role::Admin).is_empty());
        assert_eq!(c.view(), ViewState::Detail);
        assert_eq!(c.selected_resident(), Some(5));
        c.unmount();

        clock.advance(Duration::seconds(1));
        let commands = c.initialize(Role::Admin);
        assert_eq!(commands, vec![Command::FetchResidents]);
        assert_eq!(c.view(), ViewState::Detail);
        assert_eq!(c.snapshot().map(|s| s.resident_id), Some(5));
    }

    #[test]
    fn test_restore_cached_snapshot_without_fetch() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();
        persist::write_snapshot(&mut store, &snapshot_for(7, vec![]), clock.now()).unwrap();

        let mut c = controller(store, &clock);
        let commands = c.initialize(Role::Admin);
        assert!(fetches(&commands).is_empty());
        assert_eq!(commands, vec![Command::FetchResidents]);
        assert_eq!(c.view(), ViewState::Detail);
        assert_eq!(c.selected_resident(), Some(7));
        assert_eq!(c.snapshot_cached_at(), Some(clock.now()));
    }

    #[test]
    fn test_restore_without_cached_snapshot_fetches_once() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();

        let mut c = controller(store, &clock);
        let commands = c.initialize(Role::Admin);
        assert_eq!(commands.len(), 1);
        assert_eq!(single_fetch(&commands).0, 7);
        assert_eq!(c.view(), ViewState::Loading);
        assert!(!c.show_picker());
    }

    #[test]
    fn test_restore_ignores_snapshot_older_than_max_age() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();
        persist::write_snapshot(&mut store, &snapshot_for(7, vec![]), clock.now() - Duration::hours(2)).unwrap();

        let mut c = controller(store, &clock);
        assert_eq!(single_fetch(&c.initialize(Role::Admin)).0, 7);
    }

    #[test]
    fn test_restore_never_trusts_cache_when_disabled() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();
        persist::write_snapshot(&mut store, &snapshot_for(7, vec![]), clock.now()).unwrap();

        let settings = ControllerSettings {
            snapshot_max_age: None,
            ..ControllerSettings::default()
        };
        let now = clock.clone();
        let mut c = StatementController::new(store, settings).with_clock(move || now.now());
        assert_eq!(single_fetch(&c.initialize(Role::Admin)).0, 7);
    }

    #[test]
    fn test_restore_with_picker_flag_refetches() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: true,
        }
        .write(&mut store)
        .unwrap();
        persist::write_snapshot(&mut store, &snapshot_for(7, vec![]), clock.now()).unwrap();

        let mut c = controller(store, &clock);
        assert_eq!(single_fetch(&c.initialize(Role::Admin)).0, 7);
    }

    #[test]
    fn test_load_snapshot_twice_issues_one_fetch() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);

        let first = c.load_snapshot(3);
        let second = c.load_snapshot(3);
        assert_eq!(fetches(&first).len(), 1);
        assert!(second.is_empty());

        // A different resident is refused as well while the first is outstanding
        assert!(c.load_snapshot(4).is_empty());
    }

    #[test]
    fn test_stale_response_discarded_after_switching_resident() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);

        let (_, ticket_a) = single_fetch(&c.select_resident(1));
        let (_, ticket_b) = single_fetch(&c.select_resident(2));
        assert_ne!(ticket_a, ticket_b);

        c.on_snapshot_loaded(ticket_a, Ok(snapshot_for(1, vec![charge(10, ChargeStatus::Pending)])));
        assert!(c.snapshot().is_none());
        assert_eq!(c.view(), ViewState::Loading);

        c.on_snapshot_loaded(ticket_b, Ok(snapshot_for(2, vec![charge(20, ChargeStatus::Pending)])));
        assert_eq!(c.snapshot().map(|s| s.resident_id), Some(2));
        assert_eq!(c.view(), ViewState::Detail);
    }

    #[test]
    fn test_stale_response_after_newer_one_is_ignored() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);

        let (_, ticket_a) = single_fetch(&c.select_resident(1));
        let (_, ticket_b) = single_fetch(&c.select_resident(2));

        c.on_snapshot_loaded(ticket_b, Ok(snapshot_for(2, vec![])));
        c.on_snapshot_loaded(ticket_a, Err("timeout".to_string()));
        assert_eq!(c.snapshot().map(|s| s.resident_id), Some(2));
        assert_eq!(c.view(), ViewState::Detail);
        assert!(c.notice().is_none());
    }

    #[test]
    fn test_select_same_resident_twice_is_idempotent() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![]);
        assert!(c.select_resident(5).is_empty());
        assert!(c.select_resident(5).is_empty());
    }

    #[test]
    fn test_select_while_loading_same_resident_does_not_refetch() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        assert_eq!(fetches(&c.select_resident(5)).len(), 1);
        assert!(c.select_resident(5).is_empty());
    }

    #[test]
    fn test_select_persists_selection() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        c.select_resident(8);

        let persisted = PersistedSelection::read(c.store()).unwrap();
        assert_eq!(persisted.selected_resident, Some(8));
        assert!(!persisted.show_picker);
    }

    #[test]
    fn test_success_persists_snapshot() {
        let clock = TestClock::new();
        let c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);
        let cached = persist::read_snapshot(c.store(), 5).unwrap().expect("cached snapshot");
        assert_eq!(cached.data.pending_charges[0].id, 42);
        assert_eq!(cached.cached_at, clock.now());
    }

    #[test]
    fn test_fetch_failure_enters_error_no_data() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);

        let (_, ticket) = single_fetch(&c.select_resident(9));
        c.on_snapshot_loaded(ticket, Err("500 Internal Server Error".to_string()));

        assert_eq!(c.view(), ViewState::ErrorNoData);
        assert!(c.show_picker());
        assert!(c.snapshot().is_none());
        assert!(!c.is_fetching());
        assert!(matches!(c.error(), Some(StatementError::Fetch(_))));
        assert_eq!(c.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(PersistedSelection::read(c.store()).unwrap().show_picker);

        // Retrying is a re-selection
        assert_eq!(single_fetch(&c.select_resident(9)).0, 9);
        assert_eq!(c.view(), ViewState::Loading);
    }

    #[test]
    fn test_return_to_list_clears_everything() {
        let clock = TestClock::new();
        let store = MemoryStore::new();
        let mut c = loaded(store.clone(), &clock, 5, vec![]);
        let (_, ticket) = single_fetch(&c.select_resident(6));
        c.on_snapshot_loaded(ticket, Ok(snapshot_for(6, vec![])));
        assert_eq!(persisted_snapshot_keys(&store).len(), 2);

        let commands = c.return_to_list();
        assert!(commands.is_empty(), "directory already loaded");
        assert!(c.show_picker());
        assert_eq!(c.view(), ViewState::Picker);
        assert!(c.selected_resident().is_none());
        assert!(c.snapshot().is_none());
        assert!(persisted_snapshot_keys(&store).is_empty());
        assert!(store.keys().unwrap().iter().all(|k| !k.starts_with("statement.")));
    }

    #[test]
    fn test_return_to_list_reloads_empty_directory() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();

        let mut c = controller(store, &clock);
        let (_, ticket) = single_fetch(&c.initialize(Role::Admin));
        c.on_snapshot_loaded(ticket, Ok(snapshot_for(7, vec![])));
        assert!(c.residents().is_empty());

        assert_eq!(c.return_to_list(), vec![Command::FetchResidents]);
        // A second return while the directory is loading does not duplicate it
        assert!(c.return_to_list().is_empty());
    }

    #[test]
    fn test_return_to_list_discards_in_flight_response() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        let (_, ticket) = single_fetch(&c.select_resident(3));

        c.return_to_list();
        c.on_snapshot_loaded(ticket, Ok(snapshot_for(3, vec![])));
        assert!(c.snapshot().is_none());
        assert_eq!(c.view(), ViewState::Picker);
    }

    #[test]
    fn test_return_to_list_from_any_state() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        let (_, ticket) = single_fetch(&c.select_resident(3));
        c.on_snapshot_loaded(ticket, Err("boom".to_string()));

        c.return_to_list();
        assert!(c.show_picker());
        assert!(c.selected_resident().is_none());
        assert!(c.error().is_none());
    }

    #[test]
    fn test_picker_excludes_inactive_residents() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        c.on_residents_loaded(Ok(vec![
            resident(1, "Juan Pérez", true),
            resident(2, "Ana Ruiz", false),
        ]));

        let ids: Vec<ResidentId> = c.picker_residents("").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(c.residents().len(), 2);
        assert!(c.picker_residents("ruiz").is_empty());
        assert!(!c.residents_loading());
    }

    #[test]
    fn test_pay_charge_refetches_and_replaces_snapshot() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);
        let target = c.snapshot().unwrap().pending_charges[0].clone();

        let commands = c.pay_charge(&target, PaymentMethod::Card);
        match commands.as_slice() {
            [Command::PayCharge {
                resident_id,
                charge_id,
                reference,
                ..
            }] => {
                assert_eq!(*resident_id, 5);
                assert_eq!(*charge_id, 42);
                assert!(reference.starts_with("TARJETA-42-"));
            }
            other => panic!("unexpected commands: {:?}", other),
        }
        assert_eq!(c.pending_action(), Some((ActionKind::Pay, 42)));

        let refresh = c.on_action_finished(ActionOutcome::Paid {
            charge_id: 42,
            receipt: Receipt::default(),
        });
        let (resident_id, ticket) = single_fetch(&refresh);
        assert_eq!(resident_id, 5);
        assert!(c.snapshot().is_none(), "old snapshot discarded");
        assert_eq!(c.notice().map(|n| n.level), Some(NoticeLevel::Success));

        let mut updated = snapshot_for(5, vec![]);
        updated.payments.push(Payment {
            id: Some(1),
            charge_id: Some(42),
            concept: None,
            amount: Money::from_cents(15000),
            paid_at: Some("2026-10-18".to_string()),
            method: Some("tarjeta".to_string()),
            reference: None,
        });
        c.on_snapshot_loaded(ticket, Ok(updated));
        let snapshot = c.snapshot().unwrap();
        assert!(snapshot.pending_charges.is_empty());
        assert!(snapshot.has_payment_for(42));
        assert!(c.pending_action().is_none());
    }

    #[test]
    fn test_action_failure_keeps_view_and_snapshot() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);
        let target = c.snapshot().unwrap().pending_charges[0].clone();
        c.cancel_charge(&target);

        let commands = c.on_action_finished(ActionOutcome::Failed {
            kind: ActionKind::Cancel,
            charge_id: 42,
            message: "Rejected by server".to_string(),
        });
        assert!(commands.is_empty());
        assert_eq!(c.view(), ViewState::Detail);
        assert_eq!(c.snapshot().map(|s| s.pending_charges.len()), Some(1));
        assert_eq!(c.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(c.pending_action().is_none());
    }

    #[test]
    fn test_actions_validated() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);

        assert!(c.pay_charge(&charge(1, ChargeStatus::Paid), PaymentMethod::Cash).is_empty());
        assert!(c.cancel_charge(&charge(2, ChargeStatus::Cancelled)).is_empty());
        assert!(c.generate_receipt(42).is_empty(), "charge 42 is unpaid");

        let target = c.snapshot().unwrap().pending_charges[0].clone();
        assert_eq!(c.pay_charge(&target, PaymentMethod::Cash).len(), 1);
        // Only one action at a time
        assert!(c.cancel_charge(&target).is_empty());
        assert_eq!(c.pending_action(), Some((ActionKind::Pay, 42)));
    }

    #[test]
    fn test_actions_require_detail_view() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        assert!(c.pay_charge(&charge(42, ChargeStatus::Pending), PaymentMethod::Card).is_empty());
        assert_eq!(c.notice().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_generate_receipt_for_paid_charge_refreshes() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![charge(42, ChargeStatus::Paid)]);
        assert_eq!(
            c.generate_receipt(42),
            vec![Command::FetchReceipt {
                resident_id: 5,
                charge_id: 42
            }]
        );
        let refresh = c.on_action_finished(ActionOutcome::ReceiptSaved {
            charge_id: 42,
            path: std::path::PathBuf::from("/tmp/receipt_42.pdf"),
        });
        assert_eq!(single_fetch(&refresh).0, 5);
    }

    #[test]
    fn test_notice_expires() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        c.on_residents_loaded(Err("offline".to_string()));
        assert!(c.notice().is_some());

        clock.advance(Duration::seconds(1));
        assert!(!c.expire_notice());
        clock.advance(Duration::seconds(4));
        assert!(c.expire_notice());
        assert!(c.notice().is_none());
    }

    #[test]
    fn test_absorbed_remount_restores_persisted_selection() {
        let clock = TestClock::new();
        let store = MemoryStore::new();
        let mut c = loaded(store.clone(), &clock, 5, vec![charge(42, ChargeStatus::Pending)]);

        c.unmount();
        clock.advance(Duration::milliseconds(100));
        let commands = c.initialize(Role::Admin);

        assert!(fetches(&commands).is_empty());
        assert!(c.is_mounted());
        assert_eq!(c.view(), ViewState::Detail);
        assert_eq!(c.selected_resident(), Some(5));
        assert_eq!(c.snapshot().map(|s| s.resident_id), Some(5));
        let persisted = PersistedSelection::read(&store).unwrap();
        assert_eq!(persisted.selected_resident, c.selected_resident());
        assert_eq!(persisted.show_picker, c.show_picker());
    }

    #[test]
    fn test_absorbed_remount_reuses_outstanding_fetch() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();

        let mut c = controller(store, &clock);
        let (_, ticket) = single_fetch(&c.initialize(Role::Admin));
        c.unmount();

        clock.advance(Duration::milliseconds(100));
        assert!(c.initialize(Role::Admin).is_empty());
        assert_eq!(c.view(), ViewState::Loading);
        assert_eq!(c.selected_resident(), Some(7));
        assert!(c.is_fetching());

        c.on_snapshot_loaded(ticket, Ok(snapshot_for(7, vec![])));
        assert_eq!(c.view(), ViewState::Detail);
    }

    #[test]
    fn test_response_while_unmounted_is_cached_for_next_mount() {
        let clock = TestClock::new();
        let mut store = MemoryStore::new();
        PersistedSelection {
            selected_resident: Some(7),
            show_picker: false,
        }
        .write(&mut store)
        .unwrap();

        let mut c = controller(store.clone(), &clock);
        let (_, ticket) = single_fetch(&c.initialize(Role::Admin));
        c.unmount();
        c.on_snapshot_loaded(ticket, Ok(snapshot_for(7, vec![])));
        assert!(!c.is_fetching());
        assert_eq!(persisted_snapshot_keys(&store), vec!["statement.snapshot.7".to_string()]);

        clock.advance(Duration::seconds(1));
        let commands = c.initialize(Role::Admin);
        assert_eq!(commands, vec![Command::FetchResidents]);
        assert_eq!(c.view(), ViewState::Detail);
    }

    #[test]
    fn test_role_change_while_mounted_rechecks_admin() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![]);

        assert!(c.initialize(Role::Resident).is_empty());
        assert_eq!(c.error(), Some(&StatementError::Unauthorized));
        assert_eq!(c.view(), ViewState::Picker);
        assert!(c.selected_resident().is_none());
        assert!(c.snapshot().is_none());
    }

    #[test]
    fn test_remount_after_session_expiry_rechecks_admin() {
        let clock = TestClock::new();
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![]);

        // Host unmounts on a rejected token, then another user logs in quickly
        c.unmount();
        clock.advance(Duration::milliseconds(100));
        assert!(c.initialize(Role::Staff).is_empty());
        assert_eq!(c.error(), Some(&StatementError::Unauthorized));
        assert!(c.snapshot().is_none());
        assert!(c.select_resident(5).is_empty());
    }

    #[test]
    fn test_dropped_fetch_can_be_retried() {
        let clock = TestClock::new();
        let mut c = controller(MemoryStore::new(), &clock);
        c.initialize(Role::Admin);
        c.on_residents_loaded(Ok(vec![resident(5, "Juan Pérez", true)]));

        for command in c.select_resident(5) {
            c.on_command_dropped(command);
        }
        assert!(!c.is_fetching());
        assert_eq!(c.view(), ViewState::ErrorNoData);
        assert_eq!(c.selected_resident(), Some(5));

        assert_eq!(single_fetch(&c.select_resident(5)).0, 5);
        assert_eq!(c.view(), ViewState::Loading);
    }

    #[test]
    fn test_dropped_action_releases_pending_slot() {
        let clock = TestClock::new();
        let pending = charge(42, ChargeStatus::Pending);
        let mut c = loaded(MemoryStore::new(), &clock, 5, vec![pending.clone()]);

        for command in c.pay_charge(&pending, PaymentMethod::Card) {
            c.on_command_dropped(command);
        }
        assert!(c.pending_action().is_none());
        assert_eq!(c.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert_eq!(c.view(), ViewState::Detail);

        let commands = c.cancel_charge(&pending);
        assert!(matches!(commands.as_slice(), [Command::CancelCharge { charge_id: 42, .. }]));
    }
}
