use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use smartcondo_core::models::AccountSnapshot;
use smartcondo_core::statement::{StatementError, ViewState};
use smartcondo_core::utils::{format_age, format_date, truncate_string};

use crate::app::{App, Focus};
use crate::ui::styles;

/// Render the Statement tab: resident picker or one resident's account
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(StatementError::Unauthorized) = app.statement.error() {
        render_denied(frame, area);
        return;
    }

    match app.statement.view() {
        ViewState::Picker | ViewState::ErrorNoData => render_picker(frame, app, area),
        ViewState::Loading => render_loading(frame, app, area),
        ViewState::Detail => match app.statement.snapshot() {
            Some(snapshot) => render_detail(frame, app, snapshot, area),
            None => render_loading(frame, app, area),
        },
    }
}

fn render_denied(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            StatementError::Unauthorized.to_string(),
            styles::error_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Log in with an administrator account to continue ([L] to log out).",
            styles::muted_style(),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
    frame.render_widget(paragraph, area);
}

fn render_picker(frame: &mut Frame, app: &App, area: Rect) {
    let (banner_area, list_area) = if app.statement.view() == ViewState::ErrorNoData {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(3)])
            .split(area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, area)
    };

    if let (Some(banner), Some(error)) = (banner_area, app.statement.error()) {
        let line = Line::from(vec![
            Span::styled(format!(" {}", error), styles::error_style()),
            Span::styled("  Select the resident again to retry.", styles::muted_style()),
        ]);
        frame.render_widget(Paragraph::new(line), banner);
    }

    let residents = app.picker_residents();

    let header = Row::new(vec![
        Cell::from("Resident"),
        Cell::from("Unit"),
        Cell::from("Email"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = residents
        .iter()
        .enumerate()
        .map(|(i, resident)| {
            let style = if i == app.picker_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(resident.full_name()),
                Cell::from(resident.unit.clone().unwrap_or_default()),
                Cell::from(resident.email.clone().unwrap_or_default()),
            ])
            .style(style)
        })
        .collect();

    let title = if app.statement.residents_loading() && residents.is_empty() {
        " Residents - loading... ".to_string()
    } else {
        format!(" Residents ({}) - select one to view the account ", residents.len())
    };

    let widths = [
        Constraint::Percentage(40),
        Constraint::Length(12),
        Constraint::Fill(1),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !residents.is_empty() {
        state.select(Some(app.picker_selection));
    }
    frame.render_stateful_widget(table, list_area, &mut state);
}

/// Name of the resident being shown, falling back to the id.
fn resident_label(app: &App) -> String {
    match (app.statement.selected_resident_summary(), app.statement.selected_resident()) {
        (Some(resident), _) => resident.display_name(),
        (None, Some(id)) => format!("Resident #{}", id),
        (None, None) => String::new(),
    }
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(resident_label(app), styles::title_style())),
        Line::from(""),
        Line::from(Span::styled("Loading account statement...", styles::muted_style())),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
    frame.render_widget(paragraph, area);
}

fn render_detail(frame: &mut Frame, app: &App, snapshot: &AccountSnapshot, area: Rect) {
    let alert_height = if snapshot.alerts.is_empty() {
        0
    } else {
        snapshot.alerts.len().min(4) as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(alert_height),
            Constraint::Min(6),
        ])
        .split(area);

    render_summary(frame, app, snapshot, chunks[0]);
    if alert_height > 0 {
        render_alerts(frame, snapshot, chunks[1]);
    }

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    render_charges(frame, app, panels[0]);
    render_history(frame, app, panels[1]);
}

fn render_summary(frame: &mut Frame, app: &App, snapshot: &AccountSnapshot, area: Rect) {
    let balance = snapshot.balance_due();
    let age = app
        .statement
        .snapshot_cached_at()
        .map(|at| format_age(at, Utc::now()))
        .unwrap_or_default();

    let lines = vec![
        Line::from(vec![
            Span::styled(resident_label(app), styles::title_style()),
            Span::styled(format!("   updated {}", age), styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("Balance due:  ", styles::muted_style()),
            Span::styled(balance.to_string(), styles::amount_style(!balance.is_zero())),
        ]),
        Line::from(vec![
            Span::styled("Pending ", styles::muted_style()),
            Span::raw(snapshot.summary.total_pending.to_string()),
            Span::styled("   Overdue ", styles::muted_style()),
            Span::styled(
                snapshot.summary.total_overdue.to_string(),
                styles::amount_style(!snapshot.summary.total_overdue.is_zero()),
            ),
            Span::styled("   Paid ", styles::muted_style()),
            Span::styled(snapshot.summary.total_paid.to_string(), styles::success_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Account statement - [b] back to list ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_alerts(frame: &mut Frame, snapshot: &AccountSnapshot, area: Rect) {
    let lines: Vec<Line> = snapshot
        .alerts
        .iter()
        .map(|alert| {
            Line::from(vec![
                Span::styled("! ", styles::error_style()),
                Span::styled(alert.message.clone(), styles::heading_style()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Alerts ")
        .title_style(styles::error_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), area);
}

fn render_charges(frame: &mut Frame, app: &App, area: Rect) {
    let charges = app.open_charges();
    let focused = app.focus == Focus::List;

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Concept"),
        Cell::from("Due"),
        Cell::from("Status"),
        Cell::from("Amount"),
    ])
    .style(styles::title_style());

    let rows: Vec<Row> = charges
        .iter()
        .enumerate()
        .map(|(i, charge)| {
            let row_style = if focused && i == app.charge_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(charge.id.to_string()),
                Cell::from(truncate_string(&charge.concept, 28)),
                Cell::from(charge.due_date.as_deref().map(format_date).unwrap_or_default()),
                Cell::from(Span::styled(
                    charge.status.label(),
                    styles::charge_status_style(charge.status),
                )),
                Cell::from(format!("{:>12}", charge.amount)),
            ])
            .style(row_style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Fill(1),
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(12),
    ];

    let title = if charges.is_empty() {
        " Open charges - nothing owed ".to_string()
    } else {
        format!(" Open charges ({}) - [p]ay [x] cancel ", charges.len())
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        );

    let mut state = TableState::default();
    if focused && !charges.is_empty() {
        state.select(Some(app.charge_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let payments = app.payments();
    let focused = app.focus == Focus::Detail;

    let header = Row::new(vec![
        Cell::from("Date"),
        Cell::from("Concept"),
        Cell::from("Method"),
        Cell::from("Amount"),
    ])
    .style(styles::title_style());

    let rows: Vec<Row> = payments
        .iter()
        .enumerate()
        .map(|(i, payment)| {
            let style = if focused && i == app.history_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let concept = payment
                .concept
                .clone()
                .or_else(|| payment.charge_id.map(|id| format!("Charge #{}", id)))
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(payment.paid_at.as_deref().map(format_date).unwrap_or_default()),
                Cell::from(truncate_string(&concept, 22)),
                Cell::from(payment.method.clone().unwrap_or_default()),
                Cell::from(Span::styled(format!("{:>11}", payment.amount), styles::success_style())),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Fill(1),
        Constraint::Length(13),
        Constraint::Length(11),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" Payment history ({}) - [r]eceipt ", payments.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        );

    let mut state = TableState::default();
    if focused && !payments.is_empty() {
        state.select(Some(app.history_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
