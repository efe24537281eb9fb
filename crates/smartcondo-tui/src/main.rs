//! Smart Condominium console - a terminal UI for resident account statements.
//!
//! Administrators pick a resident, review charges and payment history, and
//! register payments, cancellations and receipts against the condominium
//! backend.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartcondo_core::api::ApiClient;
use smartcondo_core::auth::{CredentialStore, Session};
use smartcondo_core::config::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "smartcondo.log";

fn env_filter() -> EnvFilter {
    // RUST_LOG controls the level (e.g., RUST_LOG=smartcondo_core=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to a daily file; the alternate screen owns stdout/stderr.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config
        .log_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(env_filter())
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::sink))
                .with(env_filter())
                .init();
            None
        }
    }
}

/// CLI subcommands log to stderr.
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--residents") => {
            init_cli_tracing();
            return dump_residents().await;
        }
        Some("--statement") => {
            init_cli_tracing();
            let resident_id = args
                .get(2)
                .context("Usage: smartcondo --statement <resident-id>")?
                .parse::<i64>()
                .context("Resident id must be a number")?;
            return dump_statement(resident_id).await;
        }
        Some("--help") | Some("-h") => {
            println!("Usage: smartcondo [--residents | --statement <resident-id>]");
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load().unwrap_or_default();
    let _log_guard = init_tracing(&config);
    info!("Smart Condominium console starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new().await {
        Ok(mut app) => {
            if app.is_authenticated() {
                app.mount_statement();
            } else {
                app.start_login();
            }
            run_app(&mut terminal, &mut app).await
        }
        Err(e) => Err(e),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Smart Condominium console shutting down");
    Ok(())
}

// ============================================================================
// CLI
// ============================================================================

/// Authenticated client for CLI commands, prompting for a login if needed.
async fn cli_api() -> Result<ApiClient> {
    let mut config = Config::load()?;
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let mut session = Session::new(cache_dir);
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load saved session");
    }

    let mut api = ApiClient::new(&config.api_base_url())?;

    if !session.is_valid() {
        eprintln!("\n=== Smart Condominium Login ===\n");
        let username = prompt_username(config.last_username.as_deref())?;
        let password = match CredentialStore::password(&username) {
            Ok(Some(stored)) => stored,
            Ok(None) => rpassword::prompt_password("Password: ")?,
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                rpassword::prompt_password("Password: ")?
            }
        };

        eprintln!("Authenticating...");
        let session_data = api.authenticate(&username, &password).await?;
        if let Err(e) = CredentialStore::store(&username, &password) {
            warn!(error = %e, "Failed to store credentials");
        }
        config.last_username = Some(username);
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
        session.update(session_data);
        session.save()?;
    }

    if !session.role().is_admin() {
        bail!("Administrator privileges are required (logged in as {})", session.role());
    }

    let token = session
        .token()
        .context("No valid session. Please log in again.")?
        .to_string();
    api.set_token(token);
    Ok(api)
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => eprint!("Username [{}]: ", last),
        None => eprint!("Username: "),
    }
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Username required"),
        (false, _) => Ok(input.to_string()),
    }
}

/// Print active residents as JSON
async fn dump_residents() -> Result<()> {
    let api = cli_api().await?;
    let residents: Vec<_> = api
        .fetch_residents()
        .await?
        .into_iter()
        .filter(|r| r.active)
        .collect();
    eprintln!("{} active residents", residents.len());
    println!("{}", serde_json::to_string_pretty(&residents)?);
    Ok(())
}

/// Print one resident's account statement as JSON
async fn dump_statement(resident_id: i64) -> Result<()> {
    let api = cli_api().await?;
    let snapshot = api.fetch_account_snapshot(resident_id).await?;
    eprintln!(
        "{} open charges, balance due {}",
        snapshot.open_charges().len(),
        snapshot.balance_due()
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

// ============================================================================
// Main loop
// ============================================================================

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();
        app.tick();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
