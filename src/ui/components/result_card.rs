//! Result card
//!
//! Renders a tasting note:
//! - Source image with mood and intensity chips
//! - Playlist title and the sommelier's note
//! - Genre chips and the palette strip
//! - Registry stamp and the playlist/share actions

use super::palette::PaletteStrip;
use crate::analysis::AnalysisResult;
use crate::platform::RegistryStamp;
use crate::ui::theme::Theme;
use egui::{Button, Frame, Margin, RichText, Stroke, TextureHandle, Vec2};

/// What the user did on the result card
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultAction {
    None,
    Close,
    DiscoverPlaylist,
    ShareNote,
    CopyColor(String),
}

pub struct ResultCard<'a> {
    result: &'a AnalysisResult,
    image: Option<&'a TextureHandle>,
    stamp: Option<&'a RegistryStamp>,
    copied: Option<&'a str>,
    notice: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> ResultCard<'a> {
    pub fn new(result: &'a AnalysisResult, theme: &'a Theme) -> Self {
        Self {
            result,
            image: None,
            stamp: None,
            copied: None,
            notice: None,
            theme,
        }
    }

    /// Captured image to show above the note
    pub fn image(mut self, image: Option<&'a TextureHandle>) -> Self {
        self.image = image;
        self
    }

    pub fn stamp(mut self, stamp: Option<&'a RegistryStamp>) -> Self {
        self.stamp = stamp;
        self
    }

    /// Swatch currently showing "Copied!"
    pub fn copied(mut self, color: Option<&'a str>) -> Self {
        self.copied = color;
        self
    }

    /// Inline notice under the actions (e.g. share unsupported)
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> ResultAction {
        let mut action = ResultAction::None;
        let theme = self.theme;

        ui.horizontal(|ui| {
            self.chip(ui, &self.result.mood);
            self.chip(ui, &self.result.intensity);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Close").clicked() {
                    action = ResultAction::Close;
                }
            });
        });

        if let Some(texture) = self.image {
            let width = ui.available_width().min(720.0);
            ui.add(
                egui::Image::new(texture)
                    .max_width(width)
                    .max_height(320.0)
                    .maintain_aspect_ratio(true)
                    .rounding(theme.card_rounding),
            );
        }

        ui.add_space(theme.spacing);
        ui.label(theme.section_label("Aesthetic Title"));
        ui.label(
            RichText::new(&self.result.playlist_title)
                .size(34.0)
                .strong()
                .color(theme.text_primary),
        );

        ui.add_space(theme.spacing);
        ui.separator();

        ui.columns(2, |columns| {
            let left = &mut columns[0];
            left.label(theme.section_label("Sommelier's Note"));
            left.label(
                RichText::new(format!("\"{}\"", self.result.note))
                    .size(17.0)
                    .italics()
                    .color(theme.text_secondary),
            );
            left.add_space(theme.spacing);

            let playlist = Button::new(
                RichText::new("Discover Playlist")
                    .strong()
                    .color(theme.bg_primary),
            )
            .fill(theme.playlist)
            .min_size(Vec2::new(200.0, 36.0));
            if left.add(playlist).clicked() {
                action = ResultAction::DiscoverPlaylist;
            }

            let share = Button::new(RichText::new("Share Note").color(theme.text_primary))
                .stroke(Stroke::new(1.0, theme.accent_muted))
                .min_size(Vec2::new(200.0, 36.0));
            if left.add(share).clicked() {
                action = ResultAction::ShareNote;
            }

            if let Some(notice) = self.notice {
                left.label(RichText::new(notice).size(12.0).color(theme.accent));
            }

            let right = &mut columns[1];
            right.label(theme.section_label("Sonic Pairings"));
            right.horizontal_wrapped(|ui| {
                for genre in &self.result.genres {
                    self.chip(ui, genre);
                }
            });

            right.add_space(theme.spacing);
            right.label(theme.section_label("Palette Map"));
            let copied = PaletteStrip::new(&self.result.color_palette, theme)
                .copied(self.copied)
                .show(right);
            if let Some(color) = copied {
                action = ResultAction::CopyColor(color);
            }

            if let Some(stamp) = self.stamp {
                right.add_space(theme.spacing);
                right.label(theme.section_label("Vibe Registry"));
                right.label(
                    RichText::new(stamp.to_string())
                        .monospace()
                        .color(theme.text_muted),
                );
            }
        });

        action
    }

    fn chip(&self, ui: &mut egui::Ui, text: &str) {
        Frame::none()
            .fill(self.theme.bg_tertiary)
            .stroke(Stroke::new(1.0, self.theme.accent_muted))
            .rounding(self.theme.chip_rounding)
            .inner_margin(Margin::symmetric(10.0, 4.0))
            .show(ui, |ui| {
                ui.label(
                    RichText::new(text.to_uppercase())
                        .size(11.0)
                        .color(self.theme.text_secondary),
                );
            });
    }
}
