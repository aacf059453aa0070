//! Idle panel: choose between the live camera and a file from disk

use crate::ui::theme::Theme;
use egui::{Button, RichText, TextEdit, Vec2};
use std::path::PathBuf;

/// What the user picked on the idle panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdleAction {
    None,
    LiveView,
    OpenFile(PathBuf),
}

pub struct IdlePanel<'a> {
    path: &'a mut String,
    theme: &'a Theme,
}

impl<'a> IdlePanel<'a> {
    /// `path` is the archive path field, kept by the caller across frames
    pub fn new(path: &'a mut String, theme: &'a Theme) -> Self {
        Self { path, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) -> IdleAction {
        let mut action = IdleAction::None;
        let theme = self.theme;

        ui.vertical_centered(|ui| {
            ui.label(
                RichText::new("Commence the Tasting")
                    .size(24.0)
                    .italics()
                    .color(theme.text_primary),
            );
            ui.label(theme.section_label("Choose your capture method"));
            ui.add_space(theme.spacing_lg);

            let tile = Vec2::new(220.0, 96.0);
            ui.horizontal(|ui| {
                let live = Button::new(
                    RichText::new("Live View")
                        .size(16.0)
                        .strong()
                        .color(theme.text_primary),
                )
                .min_size(tile)
                .rounding(theme.card_rounding);
                if ui
                    .add(live)
                    .on_hover_text("Real-time capture")
                    .clicked()
                {
                    action = IdleAction::LiveView;
                }

                ui.add_space(theme.spacing);

                let archive = Button::new(
                    RichText::new("Archive")
                        .size(16.0)
                        .strong()
                        .color(theme.text_primary),
                )
                .min_size(tile)
                .rounding(theme.card_rounding);
                if ui
                    .add(archive)
                    .on_hover_text("From your library")
                    .clicked()
                {
                    if let Some(path) = archive_path(self.path) {
                        action = IdleAction::OpenFile(path);
                    }
                }
            });

            ui.add_space(theme.spacing);
            let response = ui.add(
                TextEdit::singleline(&mut *self.path)
                    .hint_text("Path to an image, or drop one here")
                    .desired_width(456.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                if let Some(path) = archive_path(self.path) {
                    action = IdleAction::OpenFile(path);
                }
            }
        });

        action
    }
}

fn archive_path(text: &str) -> Option<PathBuf> {
    let trimmed = text.trim().trim_matches('"');
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
