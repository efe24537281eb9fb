use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use smartcondo_core::models::PaymentMethod;

use crate::app::{App, AppState, LoginFocus, Tab};

use super::styles;
use super::tabs::{directory, statement};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(2), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ChoosingPaymentMethod => render_payment_method_overlay(frame, app),
        AppState::ConfirmingCancel => render_cancel_overlay(frame, app),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Smart Condominium · Accounts";
    let user = match app.session.data {
        Some(ref data) => format!(
            "{} ({}) · {}m left  [?] Help",
            data.username,
            data.role,
            data.minutes_until_expiry()
        ),
        None => "[?] Help".to_string(),
    };
    let padding = (area.width as usize).saturating_sub(title.chars().count() + user.chars().count() + 2);

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(user, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in [Tab::Statement, Tab::Directory].iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        spans.push(Span::styled(label, styles::tab_style(app.current_tab == *tab)));
    }

    if app.state == AppState::Searching || !app.search_query.is_empty() {
        spans.push(Span::raw("    "));
        spans.push(Span::styled(format!("/{}", app.search_query), styles::search_style()));
        if app.state == AppState::Searching {
            spans.push(Span::styled("▌", styles::search_style()));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Statement => statement::render(frame, app, area),
        Tab::Directory => directory::render(frame, app, area),
    }
}

/// Shortcut hints for whatever the user is looking at.
fn shortcut_hint(app: &App) -> &'static str {
    match app.current_tab {
        Tab::Statement if app.statement.show_picker() => "[/]search [Enter]open [u]pdate [q]uit",
        Tab::Statement => "[p]ay [x]cancel [r]eceipt [Tab]panel [b]ack [u]pdate",
        Tab::Directory => "[/]search [Enter]statement [u]pdate [q]uit",
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (left, left_style) = if let Some(notice) = app.statement.notice() {
        (format!(" {} ", notice.text), styles::notice_style(notice.level))
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::muted_style())
    } else if let Some(warning) = app.statement.storage_error() {
        (format!(" {} ", warning), styles::error_style())
    } else if let Some((kind, charge_id)) = app.statement.pending_action() {
        (format!(" {} for charge #{} in progress... ", kind.label(), charge_id), styles::muted_style())
    } else {
        (" Ready ".to_string(), styles::muted_style())
    };

    let right = format!(" {} ", shortcut_hint(app));
    let padding = (area.width as usize)
        .saturating_sub(left.chars().count())
        .saturating_sub(right.chars().count());

    let line = Line::from(vec![
        Span::styled(left, left_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(right, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn overlay_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::key_style()),
        Span::styled(desc, styles::list_item_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(54, 24, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            format!("  smartcondo {}", env!("CARGO_PKG_VERSION")),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::heading_style())),
        help_line("1/2 ←/→", "Switch tabs"),
        help_line("↑/↓ j/k", "Move selection"),
        help_line("PgUp/PgDn", "Scroll a page"),
        help_line("Enter", "Open resident statement"),
        help_line("b / Esc", "Back to the resident list"),
        help_line("Tab", "Charges ↔ payment history"),
        Line::from(""),
        Line::from(Span::styled(" Statement", styles::heading_style())),
        help_line("p", "Register payment for charge"),
        help_line("x", "Cancel charge"),
        help_line("r", "Save receipt for payment"),
        Line::from(""),
        Line::from(Span::styled(" General", styles::heading_style())),
        help_line("/", "Search residents"),
        help_line("u", "Reload from server"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("?", styles::key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(overlay_block("Help")), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(48, height, frame.area());
    frame.render_widget(Clear, area);

    let field_style = |focused: bool| {
        if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        }
    };

    let username_focused = app.login_focus == LoginFocus::Username;
    let password_focused = app.login_focus == LoginFocus::Password;
    let button_focused = app.login_focus == LoginFocus::Button;
    let cursor = |focused: bool| if focused { "▌" } else { "" };
    let masked = "*".repeat(app.login_password.chars().count().min(20));

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  {}", app.api.base_url()),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Username: [", styles::muted_style()),
            Span::styled(
                format!("{:<20}{}", app.login_username, cursor(username_focused)),
                field_style(username_focused),
            ),
            Span::styled("]", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("  Password: [", styles::muted_style()),
            Span::styled(
                format!("{:<20}{}", masked, cursor(password_focused)),
                field_style(password_focused),
            ),
            Span::styled("]", styles::muted_style()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("              ["),
            Span::styled(
                if button_focused { " ▶ Log in ◀ " } else { "   Log in   " },
                field_style(button_focused),
            ),
            Span::raw("]"),
        ]),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    frame.render_widget(Paragraph::new(lines).block(overlay_block("Administrator login")), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Are you sure you want to quit?", styles::heading_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(overlay_block("Quit")), area);
}

fn render_payment_method_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(50, 11, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    if let Some(charge) = app.highlighted_charge() {
        lines.push(Line::from(Span::styled(
            format!("  #{} {}", charge.id, charge.concept),
            styles::list_item_style(),
        )));
        lines.push(Line::from(vec![
            Span::styled("  Amount: ", styles::muted_style()),
            Span::styled(charge.amount.to_string(), styles::amount_style(true)),
        ]));
    }
    lines.push(Line::from(""));

    for (i, method) in PaymentMethod::ALL.iter().enumerate() {
        let selected = i == app.payment_method_selection;
        let marker = if selected { "▶" } else { " " };
        let style = if selected {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        lines.push(Line::from(Span::styled(
            format!("  {} [{}] {}", marker, i + 1, method.label()),
            style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [Enter]", styles::key_style()),
        Span::styled(" register  ", styles::muted_style()),
        Span::styled("[Esc]", styles::key_style()),
        Span::styled(" back", styles::muted_style()),
    ]));

    frame.render_widget(Paragraph::new(lines).block(overlay_block("Register payment")), area);
}

fn render_cancel_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(50, 8, frame.area());
    frame.render_widget(Clear, area);

    let description = app
        .highlighted_charge()
        .map(|c| format!("  #{} {} ({})", c.id, c.concept, c.amount))
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled("  Cancel this charge?", styles::heading_style())),
        Line::from(Span::styled(description, styles::list_item_style())),
        Line::from(""),
        Line::from(Span::styled("  The resident will no longer owe it.", styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  [Y]", styles::key_style()),
            Span::styled(" cancel charge  ", styles::muted_style()),
            Span::styled("[N]", styles::key_style()),
            Span::styled(" keep it", styles::muted_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(overlay_block("Cancel charge")), area);
}
