//! Loading panel shown while a scene is being tasted

use crate::ui::theme::Theme;
use egui::{RichText, Spinner};

pub struct LoadingPanel<'a> {
    theme: &'a Theme,
}

impl<'a> LoadingPanel<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(self.theme.spacing_lg);
            ui.add(Spinner::new().size(48.0).color(self.theme.accent));
            ui.add_space(self.theme.spacing_lg);
            ui.label(
                RichText::new("Analyzing the Atmosphere")
                    .size(22.0)
                    .italics()
                    .color(self.theme.text_primary),
            );
            ui.label(
                RichText::new("Consulting the aesthetic registers...")
                    .size(11.0)
                    .color(self.theme.text_muted),
            );
            ui.add_space(self.theme.spacing_lg);
        });
    }
}
