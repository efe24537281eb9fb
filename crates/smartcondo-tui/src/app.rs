//! Application state management for the Smart Condominium console.
//!
//! `App` owns the UI state, the login session and the statement controller.
//! The controller decides what needs fetching; `App` runs those commands on
//! background tokio tasks and feeds the results back through an mpsc channel
//! that the main loop drains every tick.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use smartcondo_core::api::{ApiClient, ApiError};
use smartcondo_core::auth::{CredentialStore, Session};
use smartcondo_core::cache::FileStore;
use smartcondo_core::config::Config;
use smartcondo_core::models::{
    AccountSnapshot, Charge, Payment, PaymentMethod, ResidentId, ResidentSummary,
};
use smartcondo_core::statement::{
    ActionKind, ActionOutcome, Command, ControllerSettings, StatementController, Ticket,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

const USERNAME_ENV: &str = "SMARTCONDO_USERNAME";
const PASSWORD_ENV: &str = "SMARTCONDO_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Statement,
    Directory,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Statement => "Statement",
            Tab::Directory => "Directory",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Statement => Tab::Directory,
            Tab::Directory => Tab::Statement,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        self.next()
    }
}

/// Which panel of the statement detail has the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Open charges
    List,
    /// Payment history
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    LoggingIn,
    ChoosingPaymentMethod,
    ConfirmingCancel,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background tasks back to the UI loop.
enum TaskResult {
    /// Resident directory fetched (or failed)
    Residents(Result<Vec<ResidentSummary>, String>),
    /// Account snapshot for the request carrying this ticket
    Snapshot(Ticket, Result<AccountSnapshot, String>),
    /// A pay/cancel/receipt command finished
    Action(ActionOutcome),
    /// The backend rejected our token
    SessionExpired,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub statement: StatementController<FileStore>,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub focus: Focus,
    pub search_query: String,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Selection indices
    pub picker_selection: usize,
    pub charge_selection: usize,
    pub history_selection: usize,
    pub directory_selection: usize,
    pub payment_method_selection: usize,

    /// Full directory (inactive residents included) for the Directory tab
    pub directory: Vec<ResidentSummary>,
    pub directory_loading: bool,

    receipts_dir: PathBuf,

    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,

    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub async fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir.clone());
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to load session"),
        }

        let api = ApiClient::new(&config.api_base_url())?;
        info!(base_url = api.base_url(), "API client configured");

        let store_dir = config
            .session_store_dir()
            .unwrap_or_else(|_| cache_dir.join("session_store"));
        let store = FileStore::new(store_dir)?;
        let statement = StatementController::new(store, ControllerSettings::from_config(&config));

        let receipts_dir = config
            .receipts_dir()
            .unwrap_or_else(|_| cache_dir.join("receipts"));

        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV)
            .ok()
            .or_else(|| saved_password(&login_username))
            .unwrap_or_default();

        Ok(Self {
            config,
            session,
            api,
            statement,

            state: AppState::Normal,
            current_tab: Tab::Statement,
            focus: Focus::List,
            search_query: String::new(),

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,

            picker_selection: 0,
            charge_selection: 0,
            history_selection: 0,
            directory_selection: 0,
            payment_method_selection: 0,

            directory: Vec::new(),
            directory_loading: false,

            receipts_dir,

            task_rx,
            task_tx,

            status_message: None,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;

        match self.api.authenticate(&username, &password).await {
            Ok(session_data) => {
                if is_user_switch(self.config.last_username.as_deref(), &username) {
                    // The previous user's selection and snapshots are not ours to show
                    info!("Different user logged in, clearing statement state");
                    if let Err(e) = self.statement.store_mut().clear() {
                        warn!(error = %e, "Failed to clear session store");
                    }
                }
                if let Err(e) = CredentialStore::store(&username, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }

                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                info!(user_id = session_data.user_id, role = %session_data.role, "Login successful");
                self.session.update(session_data);
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }

                self.login_password.clear();
                self.state = AppState::Normal;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let user_message = match e.downcast_ref::<ApiError>() {
                    Some(ApiError::Unauthorized) | Some(ApiError::Rejected(_)) => {
                        "Invalid username or password".to_string()
                    }
                    Some(api_error) => api_error.user_message(),
                    None if e.to_string().to_lowercase().contains("send") => {
                        "Unable to connect to server. Check your connection.".to_string()
                    }
                    None => format!("Login failed: {}", e),
                };
                self.login_error = Some(user_message);
                Err(e)
            }
        }
    }

    /// Show the login overlay
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Unmount the statement screen and ask for a new login. The next
    /// `mount_statement` re-runs initialization, role check included.
    fn require_login(&mut self, message: Option<String>) {
        self.statement.unmount();
        self.start_login();
        self.login_error = message;
    }

    /// Forget the session and everything persisted for it.
    pub fn logout(&mut self) {
        self.statement.unmount();
        if let Err(e) = self.statement.store_mut().clear() {
            warn!(error = %e, "Failed to clear session store");
        }
        if let Some(username) = self.session.data.as_ref().map(|d| d.username.clone()) {
            match CredentialStore::forget(&username) {
                Ok(removed) => debug!(removed, "Keychain password forgotten"),
                Err(e) => warn!(error = %e, "Failed to remove keychain password"),
            }
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.directory.clear();
        self.search_query.clear();
        self.picker_selection = 0;
        self.directory_selection = 0;
        info!("Logged out");
        self.start_login();
    }

    // =========================================================================
    // Statement screen lifecycle
    // =========================================================================

    /// Mount the statement screen for the current session.
    pub fn mount_statement(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        self.picker_selection = 0;
        self.charge_selection = 0;
        self.history_selection = 0;
        self.focus = Focus::List;

        let mut commands = self.statement.initialize(self.session.role());
        if !commands.contains(&Command::FetchResidents)
            && self.statement.residents().is_empty()
            && !self.statement.residents_loading()
        {
            // Remounted inside the guard window; names and the picker still need the directory
            commands.extend(self.statement.reload_residents());
        }
        self.dispatch(commands);
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if tab == self.current_tab {
            return;
        }
        if self.current_tab == Tab::Statement {
            self.statement.unmount();
        }
        self.current_tab = tab;
        self.search_query.clear();
        self.focus = Focus::List;

        match tab {
            Tab::Statement => self.mount_statement(),
            Tab::Directory => {
                if self.directory.is_empty() {
                    self.fetch_directory();
                }
            }
        }
    }

    // =========================================================================
    // Command dispatch
    // =========================================================================

    /// Helper to send task results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send task result - channel closed");
        }
    }

    /// Token-bearing client for a background task, or `None` if logged out.
    fn authed_api(&self) -> Option<ApiClient> {
        self.session
            .token()
            .map(|token| self.api.with_token(token.to_string()))
    }

    /// Run controller commands on background tasks.
    ///
    /// Without a valid session every command is handed back to the
    /// controller as dropped, so nothing stays marked in flight.
    pub fn dispatch(&mut self, commands: Vec<Command>) {
        if commands.is_empty() {
            return;
        }
        let Some(authed) = self.authed_api() else {
            warn!(count = commands.len(), "No valid session for background requests");
            for command in commands {
                self.statement.on_command_dropped(command);
            }
            self.require_login(Some("Session expired - please log in again".to_string()));
            return;
        };

        for command in commands {
            let api = authed.clone();
            let tx = self.task_tx.clone();

            match command {
                Command::FetchResidents => {
                    self.directory_loading = true;
                    tokio::spawn(async move {
                        let result = api.fetch_residents().await;
                        Self::send_outcome(&tx, &result).await;
                        Self::send_result(&tx, TaskResult::Residents(result.map_err(|e| describe_error(&e)))).await;
                    });
                }
                Command::FetchSnapshot { resident_id, ticket } => {
                    tokio::spawn(async move {
                        let result = api.fetch_account_snapshot(resident_id).await;
                        Self::send_outcome(&tx, &result).await;
                        Self::send_result(&tx, TaskResult::Snapshot(ticket, result.map_err(|e| describe_error(&e)))).await;
                    });
                }
                Command::PayCharge {
                    charge_id,
                    reference,
                    notes,
                    ..
                } => {
                    tokio::spawn(async move {
                        let result = api.pay_charge(charge_id, &reference, &notes).await;
                        Self::send_outcome(&tx, &result).await;
                        let outcome = match result {
                            Ok(receipt) => ActionOutcome::Paid { charge_id, receipt },
                            Err(e) => failed(ActionKind::Pay, charge_id, &e),
                        };
                        Self::send_result(&tx, TaskResult::Action(outcome)).await;
                    });
                }
                Command::CancelCharge { charge_id, .. } => {
                    tokio::spawn(async move {
                        let result = api.cancel_charge(charge_id).await;
                        Self::send_outcome(&tx, &result).await;
                        let outcome = match result {
                            Ok(()) => ActionOutcome::Cancelled { charge_id },
                            Err(e) => failed(ActionKind::Cancel, charge_id, &e),
                        };
                        Self::send_result(&tx, TaskResult::Action(outcome)).await;
                    });
                }
                Command::FetchReceipt { charge_id, .. } => {
                    let path = receipt_path(&self.receipts_dir, charge_id);
                    tokio::spawn(async move {
                        let result = Self::download_receipt(&api, charge_id, &path).await;
                        Self::send_outcome(&tx, &result).await;
                        let outcome = match result {
                            Ok(()) => ActionOutcome::ReceiptSaved { charge_id, path },
                            Err(e) => failed(ActionKind::Receipt, charge_id, &e),
                        };
                        Self::send_result(&tx, TaskResult::Action(outcome)).await;
                    });
                }
            }
        }
    }

    /// Report a rejected token separately so the UI can ask for a new login.
    async fn send_outcome<T>(tx: &mpsc::Sender<TaskResult>, result: &Result<T>) {
        if let Err(e) = result {
            if matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)) {
                Self::send_result(tx, TaskResult::SessionExpired).await;
            }
        }
    }

    async fn download_receipt(api: &ApiClient, charge_id: i64, path: &Path) -> Result<()> {
        let bytes = api.fetch_receipt(charge_id).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        info!(charge_id, path = %path.display(), bytes = bytes.len(), "Receipt saved");
        Ok(())
    }

    /// Load the directory for the Directory tab (outside the statement screen).
    pub fn fetch_directory(&mut self) {
        if self.directory_loading {
            return;
        }
        self.dispatch(vec![Command::FetchResidents]);
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.task_rx.try_recv() {
            results.push(result);
        }

        for result in results {
            self.process_task_result(result);
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Residents(result) => {
                self.directory_loading = false;
                if let Ok(ref residents) = result {
                    self.directory = residents.clone();
                    self.directory.sort_by_key(|r| r.full_name().to_lowercase());
                    self.directory_selection = self
                        .directory_selection
                        .min(self.directory.len().saturating_sub(1));
                } else if self.current_tab == Tab::Directory {
                    if let Err(ref message) = result {
                        self.status_message = Some(format!("Could not load residents: {}", message));
                    }
                }
                if self.statement.is_mounted() {
                    self.statement.on_residents_loaded(result);
                    self.clamp_picker_selection();
                }
            }
            TaskResult::Snapshot(ticket, result) => {
                self.statement.on_snapshot_loaded(ticket, result);
                self.clamp_detail_selection();
            }
            TaskResult::Action(outcome) => {
                let commands = self.statement.on_action_finished(outcome);
                self.dispatch(commands);
            }
            TaskResult::SessionExpired => {
                if self.state != AppState::LoggingIn {
                    warn!("Session rejected by server, asking for login");
                    if let Err(e) = self.session.clear() {
                        warn!(error = %e, "Failed to clear session");
                    }
                    self.require_login(Some("Session expired - please log in again".to_string()));
                }
            }
        }
    }

    /// Periodic housekeeping from the main loop.
    pub fn tick(&mut self) {
        self.statement.expire_notice();
    }

    // =========================================================================
    // Statement: picker
    // =========================================================================

    pub fn picker_residents(&self) -> Vec<&ResidentSummary> {
        self.statement.picker_residents(&self.search_query)
    }

    fn clamp_picker_selection(&mut self) {
        let len = self.picker_residents().len();
        self.picker_selection = self.picker_selection.min(len.saturating_sub(1));
    }

    /// Open the account of the resident under the picker cursor.
    pub fn select_highlighted_resident(&mut self) {
        let id = self
            .picker_residents()
            .get(self.picker_selection)
            .map(|r| r.id);
        if let Some(id) = id {
            self.open_resident(id);
        }
    }

    pub fn open_resident(&mut self, resident_id: ResidentId) {
        self.charge_selection = 0;
        self.history_selection = 0;
        self.focus = Focus::List;
        let commands = self.statement.select_resident(resident_id);
        self.dispatch(commands);
    }

    pub fn back_to_list(&mut self) {
        self.search_query.clear();
        let commands = self.statement.return_to_list();
        self.dispatch(commands);
        self.clamp_picker_selection();
    }

    /// `u`: refetch whatever the current view shows.
    pub fn refresh_current_view(&mut self) {
        let commands = match self.current_tab {
            Tab::Statement if self.statement.show_picker() => self.statement.reload_residents(),
            Tab::Statement => self.statement.refresh_snapshot(),
            Tab::Directory => {
                self.fetch_directory();
                Vec::new()
            }
        };
        self.dispatch(commands);
    }

    // =========================================================================
    // Statement: detail and actions
    // =========================================================================

    pub fn open_charges(&self) -> Vec<&Charge> {
        self.statement
            .snapshot()
            .map(|s| s.open_charges())
            .unwrap_or_default()
    }

    pub fn payments(&self) -> &[Payment] {
        self.statement
            .snapshot()
            .map(|s| s.payments.as_slice())
            .unwrap_or(&[])
    }

    fn clamp_detail_selection(&mut self) {
        self.charge_selection = self
            .charge_selection
            .min(self.open_charges().len().saturating_sub(1));
        self.history_selection = self
            .history_selection
            .min(self.payments().len().saturating_sub(1));
    }

    pub fn highlighted_charge(&self) -> Option<Charge> {
        self.open_charges()
            .get(self.charge_selection)
            .map(|c| (*c).clone())
    }

    pub fn begin_payment(&mut self) {
        if self.highlighted_charge().is_some() {
            self.payment_method_selection = 0;
            self.state = AppState::ChoosingPaymentMethod;
        } else {
            self.status_message = Some("No open charge selected".to_string());
        }
    }

    pub fn confirm_payment(&mut self) {
        self.state = AppState::Normal;
        let Some(charge) = self.highlighted_charge() else {
            return;
        };
        let method = PaymentMethod::ALL
            .get(self.payment_method_selection)
            .copied()
            .unwrap_or(PaymentMethod::Card);
        let commands = self.statement.pay_charge(&charge, method);
        self.dispatch(commands);
    }

    pub fn begin_cancel(&mut self) {
        if self.highlighted_charge().is_some() {
            self.state = AppState::ConfirmingCancel;
        } else {
            self.status_message = Some("No open charge selected".to_string());
        }
    }

    pub fn confirm_cancel(&mut self) {
        self.state = AppState::Normal;
        if let Some(charge) = self.highlighted_charge() {
            let commands = self.statement.cancel_charge(&charge);
            self.dispatch(commands);
        }
    }

    /// Download the receipt for the highlighted payment history entry.
    pub fn request_receipt(&mut self) {
        let charge_id = self
            .payments()
            .get(self.history_selection)
            .and_then(|p| p.charge_id);
        match charge_id {
            Some(charge_id) => {
                let commands = self.statement.generate_receipt(charge_id);
                self.dispatch(commands);
            }
            None => {
                self.status_message = Some("Select a payment linked to a charge".to_string());
            }
        }
    }

    // =========================================================================
    // Directory
    // =========================================================================

    pub fn directory_residents(&self) -> Vec<&ResidentSummary> {
        self.directory
            .iter()
            .filter(|r| r.matches_search(&self.search_query))
            .collect()
    }

    /// Jump from the directory to the highlighted resident's statement.
    pub fn open_directory_resident(&mut self) {
        let target = self
            .directory_residents()
            .get(self.directory_selection)
            .map(|r| (r.id, r.active));
        match target {
            Some((id, true)) => {
                self.switch_tab(Tab::Statement);
                self.open_resident(id);
            }
            Some((_, false)) => {
                self.status_message = Some("Inactive residents have no statement".to_string());
            }
            None => {}
        }
    }
}

/// Whether `username` differs from the last user who logged in here.
fn is_user_switch(previous: Option<&str>, username: &str) -> bool {
    previous.is_some_and(|previous| !previous.eq_ignore_ascii_case(username))
}

/// Keychain password for the pre-filled username, if any.
fn saved_password(username: &str) -> Option<String> {
    if username.is_empty() {
        return None;
    }
    match CredentialStore::password(username) {
        Ok(password) => password,
        Err(e) => {
            debug!(error = %e, "Keychain unavailable");
            None
        }
    }
}

/// Message for the status line, preferring the API error's own wording.
fn describe_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(api_error) => api_error.user_message(),
        None => e.to_string(),
    }
}

fn failed(kind: ActionKind, charge_id: i64, e: &anyhow::Error) -> ActionOutcome {
    ActionOutcome::Failed {
        kind,
        charge_id,
        message: describe_error(e),
    }
}

pub fn receipt_path(dir: &Path, charge_id: i64) -> PathBuf {
    dir.join(format!("receipt_{}.pdf", charge_id))
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
