//! Theme and styling for the cellar look
//!
//! Near-black panels, warm parchment text and a single gold accent.

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Vec2, Visuals};

/// Application theme configuration
#[derive(Clone, Debug)]
pub struct Theme {
    /// Gold accent for primary actions
    pub accent: Color32,
    /// Dimmed accent for borders and chips
    pub accent_muted: Color32,
    /// Playlist button color
    pub playlist: Color32,
    pub error: Color32,

    pub bg_primary: Color32,
    pub bg_secondary: Color32,
    pub bg_tertiary: Color32,

    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub text_muted: Color32,

    pub button_rounding: Rounding,
    pub card_rounding: Rounding,
    /// Rounding for mood/intensity/genre chips
    pub chip_rounding: Rounding,

    pub spacing: f32,
    pub spacing_lg: f32,
    pub spacing_sm: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::cellar()
    }
}

impl Theme {
    /// The dark cellar theme
    pub fn cellar() -> Self {
        Self {
            accent: Color32::from_rgb(212, 175, 55),       // Gold
            accent_muted: Color32::from_rgb(120, 100, 45), // Tarnished gold
            playlist: Color32::from_rgb(30, 215, 96),      // Green
            error: Color32::from_rgb(196, 76, 76),         // Muted red

            bg_primary: Color32::from_rgb(8, 8, 8),
            bg_secondary: Color32::from_rgb(20, 19, 18),
            bg_tertiary: Color32::from_rgb(36, 34, 31),

            text_primary: Color32::from_rgb(245, 240, 230), // Parchment
            text_secondary: Color32::from_rgb(190, 182, 168),
            text_muted: Color32::from_rgb(115, 110, 102),

            button_rounding: Rounding::same(10.0),
            card_rounding: Rounding::same(24.0),
            chip_rounding: Rounding::same(12.0),

            spacing: 16.0,
            spacing_lg: 32.0,
            spacing_sm: 8.0,
        }
    }

    /// Apply this theme to egui
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = Visuals::dark();

        visuals.panel_fill = self.bg_primary;
        visuals.window_fill = self.bg_secondary;
        visuals.extreme_bg_color = self.bg_tertiary;

        visuals.widgets.noninteractive.bg_fill = self.bg_secondary;
        visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, self.text_muted);

        visuals.widgets.inactive.bg_fill = self.bg_tertiary;
        visuals.widgets.inactive.weak_bg_fill = self.bg_tertiary;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, self.text_secondary);
        visuals.widgets.inactive.rounding = self.button_rounding;

        visuals.widgets.hovered.bg_fill = self.accent_muted;
        visuals.widgets.hovered.weak_bg_fill = self.accent_muted;
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, self.text_primary);
        visuals.widgets.hovered.rounding = self.button_rounding;

        visuals.widgets.active.bg_fill = self.accent;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, self.bg_primary);
        visuals.widgets.active.rounding = self.button_rounding;

        visuals.selection.bg_fill = self.accent.gamma_multiply(0.3);
        visuals.selection.stroke = Stroke::new(1.0, self.accent);
        visuals.hyperlink_color = self.accent;

        visuals.window_rounding = self.card_rounding;
        visuals.window_stroke = Stroke::new(1.0, self.bg_tertiary);

        ctx.set_visuals(visuals);

        let mut style = (*ctx.style()).clone();
        style.spacing.item_spacing = Vec2::splat(self.spacing_sm);
        style.spacing.window_margin = egui::Margin::same(self.spacing);
        style.spacing.button_padding = Vec2::new(self.spacing, self.spacing_sm);

        style.text_styles.insert(
            egui::TextStyle::Heading,
            FontId::new(30.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Body,
            FontId::new(15.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Monospace,
            FontId::new(13.0, FontFamily::Monospace),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            FontId::new(14.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Small,
            FontId::new(11.0, FontFamily::Proportional),
        );

        ctx.set_style(style);
    }

    /// Frame for the main card
    pub fn card_frame(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.bg_secondary)
            .rounding(self.card_rounding)
            .stroke(Stroke::new(1.0, self.bg_tertiary))
            .inner_margin(egui::Margin::same(self.spacing_lg))
    }

    /// Small caps-style section label ("SONIC PAIRINGS")
    pub fn section_label(&self, text: &str) -> egui::RichText {
        egui::RichText::new(text.to_uppercase())
            .size(10.0)
            .strong()
            .color(self.text_muted)
    }
}
