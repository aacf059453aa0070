//! UI components and application module
//!
//! This module provides the egui/eframe-based user interface. Views are
//! pure functions of the session snapshot; user intents go back to the
//! session controller.

mod app;
pub mod components;
mod theme;

pub use app::SommelierApp;
pub use components::{CameraAction, IdleAction, ResultAction};
pub use theme::Theme;
