//! HTML rendering: askama view models and display helpers.

pub mod format;
pub mod views;
