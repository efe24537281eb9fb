use ratatui::style::{Color, Modifier, Style};

use smartcondo_core::models::ChargeStatus;
use smartcondo_core::statement::NoticeLevel;

// Color palette
pub const PRIMARY: Color = Color::Rgb(48, 150, 160);
pub const PAID: Color = Color::Rgb(96, 170, 96);
pub const DUE: Color = Color::Rgb(210, 160, 60);
pub const OVERDUE: Color = Color::Rgb(200, 70, 70);
pub const MUTED: Color = Color::Rgb(120, 120, 130);
pub const HIGHLIGHT: Color = Color::Rgb(40, 52, 60);
pub const STATUS_BG: Color = Color::Rgb(28, 32, 38);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

/// Section headings inside panels
pub fn heading_style() -> Style {
    Style::default().fg(DUE)
}

pub fn success_style() -> Style {
    Style::default().fg(PAID)
}

pub fn error_style() -> Style {
    Style::default().fg(OVERDUE)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(PRIMARY)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        muted_style()
    }
}

pub fn search_style() -> Style {
    Style::default().fg(DUE).add_modifier(Modifier::ITALIC)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(STATUS_BG).fg(Color::White)
}

pub fn key_style() -> Style {
    Style::default().fg(DUE).add_modifier(Modifier::BOLD)
}

pub fn amount_style(owed: bool) -> Style {
    if owed {
        Style::default().fg(DUE).add_modifier(Modifier::BOLD)
    } else {
        success_style()
    }
}

pub fn charge_status_style(status: ChargeStatus) -> Style {
    match status {
        ChargeStatus::Overdue => error_style(),
        ChargeStatus::Pending => Style::default().fg(DUE),
        ChargeStatus::Paid => success_style(),
        ChargeStatus::Cancelled | ChargeStatus::Unknown => muted_style(),
    }
}

pub fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Success => success_style().add_modifier(Modifier::BOLD),
        NoticeLevel::Error => error_style().add_modifier(Modifier::BOLD),
    }
}
