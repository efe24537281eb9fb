//! ratatui front end.
//!
//! `render` draws the frame and modal overlays, `input` maps keys onto
//! `App` calls, `tabs` holds the Statement and Directory views and
//! `styles` the palette.

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
