//! Palette strip
//!
//! Five clickable swatches; clicking one copies its hex code and shows
//! "Copied!" under it for a couple of seconds.

use crate::ui::theme::Theme;
use egui::{Color32, RichText, Sense, Stroke, Vec2, WidgetInfo, WidgetType};
use std::time::{Duration, Instant};

/// How long the "Copied!" label stays up
pub const COPY_FEEDBACK_DURATION: Duration = Duration::from_secs(2);

/// Parse "#rrggbb", "rrggbb" or "#rgb" into a color
pub fn parse_hex_color(text: &str) -> Option<Color32> {
    let hex = text.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        6 => Some(Color32::from_rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color32::from_rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// Which swatch was copied, and when
#[derive(Clone, Debug)]
pub struct CopyFeedback {
    pub color: String,
    pub copied_at: Instant,
}

impl CopyFeedback {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            copied_at: Instant::now(),
        }
    }

    /// Check if the label should still show at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.copied_at) < COPY_FEEDBACK_DURATION
    }
}

/// Row of palette swatches
pub struct PaletteStrip<'a> {
    colors: &'a [String],
    copied: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> PaletteStrip<'a> {
    pub fn new(colors: &'a [String], theme: &'a Theme) -> Self {
        Self {
            colors,
            copied: None,
            theme,
        }
    }

    /// Mark a swatch as just copied
    pub fn copied(mut self, color: Option<&'a str>) -> Self {
        self.copied = color;
        self
    }

    /// Show the strip; returns the hex code of a clicked swatch
    pub fn show(self, ui: &mut egui::Ui) -> Option<String> {
        let mut clicked = None;

        ui.horizontal(|ui| {
            for color in self.colors {
                ui.vertical(|ui| {
                    if self.swatch(ui, color).clicked() {
                        clicked = Some(color.clone());
                    }

                    let is_copied = self.copied == Some(color.as_str());
                    let label = if is_copied { "Copied!" } else { color.as_str() };
                    ui.label(
                        RichText::new(label)
                            .size(10.0)
                            .monospace()
                            .color(if is_copied {
                                self.theme.accent
                            } else {
                                self.theme.text_muted
                            }),
                    );
                });
            }
        });

        clicked
    }

    fn swatch(&self, ui: &mut egui::Ui, color: &str) -> egui::Response {
        let size = Vec2::new(56.0, 56.0);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click());
        response.widget_info(|| {
            WidgetInfo::labeled(WidgetType::Button, true, format!("Copy {}", color))
        });

        if ui.is_rect_visible(rect) {
            let fill = parse_hex_color(color).unwrap_or(self.theme.bg_tertiary);
            let stroke = if response.hovered() {
                Stroke::new(2.0, self.theme.accent)
            } else {
                Stroke::new(1.0, self.theme.bg_tertiary)
            };
            let painter = ui.painter();
            painter.rect_filled(rect, self.theme.chip_rounding, fill);
            painter.rect_stroke(rect.shrink(0.5), self.theme.chip_rounding, stroke);
        }

        response.on_hover_text("Copy hex code")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit_hex() {
        assert_eq!(
            parse_hex_color("#1a2b3c"),
            Some(Color32::from_rgb(0x1a, 0x2b, 0x3c))
        );
        assert_eq!(
            parse_hex_color("FFFFFF"),
            Some(Color32::from_rgb(255, 255, 255))
        );
    }

    #[test]
    fn test_parse_three_digit_hex() {
        assert_eq!(parse_hex_color("#f80"), Some(Color32::from_rgb(255, 136, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_hex_color("midnight"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
        assert_eq!(parse_hex_color(""), None);
    }

    #[test]
    fn test_parse_rejects_non_ascii() {
        // Byte lengths of 6 and 3 but not on char boundaries
        assert_eq!(parse_hex_color("€abc"), None);
        assert_eq!(parse_hex_color("#éa"), None);
        assert_eq!(parse_hex_color("fé"), None);
    }

    #[test]
    fn test_copy_feedback_expires() {
        let feedback = CopyFeedback::new("#000000");
        assert!(feedback.is_active(feedback.copied_at));
        assert!(feedback.is_active(feedback.copied_at + Duration::from_millis(1999)));
        assert!(!feedback.is_active(feedback.copied_at + COPY_FEEDBACK_DURATION));
    }
}
