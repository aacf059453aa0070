//! UI components module
//!
//! One panel per session state, plus the palette strip they share.

pub mod error_panel;
pub mod idle;
pub mod loading;
pub mod palette;
pub mod result_card;
pub mod viewfinder;

pub use error_panel::ErrorPanel;
pub use idle::{IdleAction, IdlePanel};
pub use loading::LoadingPanel;
pub use palette::{parse_hex_color, CopyFeedback, PaletteStrip};
pub use result_card::{ResultAction, ResultCard};
pub use viewfinder::{CameraAction, Viewfinder};
