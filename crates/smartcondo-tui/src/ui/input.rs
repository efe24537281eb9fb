//! Keyboard input handling for the TUI.
//!
//! Translates key events into `App` calls. Overlays (login, help, modal
//! confirmations) take every key while they are open.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use smartcondo_core::models::PaymentMethod;

use crate::app::{
    can_add_password_char, can_add_username_char, App, AppState, Focus, LoginFocus, Tab,
    PAGE_SCROLL_SIZE,
};

/// New cursor position if `code` is a navigation key, `None` otherwise.
fn navigate(code: KeyCode, selection: usize, len: usize) -> Option<usize> {
    let last = len.saturating_sub(1);
    let next = match code {
        KeyCode::Up | KeyCode::Char('k') => selection.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => selection.saturating_add(1),
        KeyCode::PageUp => selection.saturating_sub(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => selection.saturating_add(PAGE_SCROLL_SIZE),
        KeyCode::Home => 0,
        KeyCode::End => last,
        _ => return None,
    };
    Some(next.min(last))
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ChoosingPaymentMethod => {
            handle_payment_method_input(app, key);
            return Ok(false);
        }
        AppState::ConfirmingCancel => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_cancel(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Searching => {
            handle_search_input(app, key);
            return Ok(false);
        }
        AppState::Normal | AppState::Quitting => {}
    }

    // Any key press dismisses a stale status message
    app.status_message = None;

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('1') => {
            app.switch_tab(Tab::Statement);
            return Ok(false);
        }
        KeyCode::Char('2') => {
            app.switch_tab(Tab::Directory);
            return Ok(false);
        }
        KeyCode::Left | KeyCode::Right => {
            let tab = if key.code == KeyCode::Left {
                app.current_tab.prev()
            } else {
                app.current_tab.next()
            };
            app.switch_tab(tab);
            return Ok(false);
        }
        KeyCode::Char('u') => {
            app.refresh_current_view();
            return Ok(false);
        }
        KeyCode::Char('L') => {
            app.logout();
            return Ok(false);
        }
        _ => {}
    }

    match app.current_tab {
        Tab::Statement if app.statement.show_picker() => handle_picker_input(app, key),
        Tab::Statement => handle_detail_input(app, key),
        Tab::Directory => handle_directory_input(app, key),
    }
    Ok(false)
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.search_query.clear();
        }
        KeyCode::Enter => {
            // Keep the filter applied
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => {
            app.search_query.pop();
        }
        KeyCode::Char(c) if !c.is_control() => {
            app.search_query.push(c);
            app.picker_selection = 0;
            app.directory_selection = 0;
        }
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                // Failure leaves the overlay open with login_error set
                if app.attempt_login().await.is_ok() && app.current_tab == Tab::Statement {
                    app.mount_statement();
                }
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_payment_method_input(app: &mut App, key: KeyEvent) {
    let count = PaymentMethod::ALL.len();
    if let Some(next) = navigate(key.code, app.payment_method_selection, count) {
        app.payment_method_selection = next;
        return;
    }
    match key.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if index < count {
                app.payment_method_selection = index;
                app.confirm_payment();
            }
        }
        KeyCode::Enter => app.confirm_payment(),
        KeyCode::Esc => app.state = AppState::Normal,
        _ => {}
    }
}

fn handle_picker_input(app: &mut App, key: KeyEvent) {
    let len = app.picker_residents().len();
    if let Some(next) = navigate(key.code, app.picker_selection, len) {
        app.picker_selection = next;
        return;
    }
    match key.code {
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.search_query.clear();
            app.picker_selection = 0;
        }
        KeyCode::Enter => app.select_highlighted_resident(),
        KeyCode::Esc => {
            app.search_query.clear();
            app.picker_selection = 0;
        }
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, key: KeyEvent) {
    let (selection, len) = match app.focus {
        Focus::List => (app.charge_selection, app.open_charges().len()),
        Focus::Detail => (app.history_selection, app.payments().len()),
    };
    if let Some(next) = navigate(key.code, selection, len) {
        match app.focus {
            Focus::List => app.charge_selection = next,
            Focus::Detail => app.history_selection = next,
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => app.back_to_list(),
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        KeyCode::Char('p') if app.focus == Focus::List => app.begin_payment(),
        KeyCode::Char('x') if app.focus == Focus::List => app.begin_cancel(),
        KeyCode::Char('r') if app.focus == Focus::Detail => app.request_receipt(),
        KeyCode::Char('p') | KeyCode::Char('x') => {
            app.status_message = Some("Switch to the charges panel with Tab".to_string());
        }
        KeyCode::Char('r') => {
            app.status_message = Some("Switch to the payment history with Tab".to_string());
        }
        _ => {}
    }
}

fn handle_directory_input(app: &mut App, key: KeyEvent) {
    let len = app.directory_residents().len();
    if let Some(next) = navigate(key.code, app.directory_selection, len) {
        app.directory_selection = next;
        return;
    }
    match key.code {
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.search_query.clear();
            app.directory_selection = 0;
        }
        KeyCode::Enter => app.open_directory_resident(),
        KeyCode::Esc => {
            app.search_query.clear();
            app.directory_selection = 0;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_clamps_to_list() {
        assert_eq!(navigate(KeyCode::Down, 0, 3), Some(1));
        assert_eq!(navigate(KeyCode::Down, 2, 3), Some(2));
        assert_eq!(navigate(KeyCode::Up, 0, 3), Some(0));
        assert_eq!(navigate(KeyCode::PageDown, 1, 5), Some(4));
        assert_eq!(navigate(KeyCode::End, 0, 5), Some(4));
        assert_eq!(navigate(KeyCode::Home, 4, 5), Some(0));
    }

    #[test]
    fn test_navigate_empty_list() {
        assert_eq!(navigate(KeyCode::Down, 0, 0), Some(0));
    }

    #[test]
    fn test_navigate_ignores_other_keys() {
        assert_eq!(navigate(KeyCode::Enter, 1, 3), None);
        assert_eq!(navigate(KeyCode::Char('p'), 1, 3), None);
    }
}
