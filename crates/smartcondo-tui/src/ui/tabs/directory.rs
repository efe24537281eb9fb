use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

/// Render the Directory tab - every resident, active or not
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let residents = app.directory_residents();

    let header = Row::new(vec![
        Cell::from("ID"),
        Cell::from("Name"),
        Cell::from("Unit"),
        Cell::from("Email"),
        Cell::from("Status"),
    ])
    .style(styles::title_style());

    let rows: Vec<Row> = residents
        .iter()
        .enumerate()
        .map(|(i, resident)| {
            let style = if i == app.directory_selection {
                styles::selected_style()
            } else if resident.active {
                styles::list_item_style()
            } else {
                styles::muted_style()
            };
            let status = if resident.active {
                Span::styled("Active", styles::success_style())
            } else {
                Span::styled("Inactive", styles::muted_style())
            };
            Row::new(vec![
                Cell::from(resident.id.to_string()),
                Cell::from(resident.full_name()),
                Cell::from(resident.unit.clone().unwrap_or_default()),
                Cell::from(resident.email.clone().unwrap_or_default()),
                Cell::from(status),
            ])
            .style(style)
        })
        .collect();

    let active = app.directory.iter().filter(|r| r.active).count();
    let title = if app.directory_loading && app.directory.is_empty() {
        " Directory - loading... ".to_string()
    } else {
        format!(" Directory ({} residents, {} active) ", app.directory.len(), active)
    };

    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(35),
        Constraint::Length(12),
        Constraint::Fill(1),
        Constraint::Length(9),
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
        state.select(Some(app.directory_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
