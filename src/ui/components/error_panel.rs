//! Error panel with the way back to idle

use crate::ui::theme::Theme;
use egui::{Button, RichText, Stroke, Vec2};

pub struct ErrorPanel<'a> {
    message: &'a str,
    theme: &'a Theme,
}

impl<'a> ErrorPanel<'a> {
    pub fn new(message: &'a str, theme: &'a Theme) -> Self {
        Self { message, theme }
    }

    /// Show the panel; returns true when "Return to Cellar" is clicked
    pub fn show(self, ui: &mut egui::Ui) -> bool {
        let mut back = false;

        ui.vertical_centered(|ui| {
            ui.add_space(self.theme.spacing);
            ui.label(RichText::new("!").size(40.0).color(self.theme.error));
            ui.add_space(self.theme.spacing);
            ui.label(
                RichText::new(format!("\"{}\"", self.message))
                    .size(19.0)
                    .italics()
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_lg);

            let button = Button::new(RichText::new("Return to Cellar").color(self.theme.text_primary))
                .stroke(Stroke::new(1.0, self.theme.accent_muted))
                .min_size(Vec2::new(200.0, 40.0));
            back = ui.add(button).clicked();
        });

        back
    }
}
