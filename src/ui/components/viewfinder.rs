//! Viewfinder with shutter button
//!
//! Paints the camera preview and a round shutter styled after a film
//! camera release.

use crate::ui::theme::Theme;
use egui::{Color32, RichText, Sense, Stroke, TextureHandle, Vec2, WidgetInfo, WidgetType};

/// What the user did on the viewfinder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraAction {
    None,
    Capture,
    Back,
}

pub struct Viewfinder<'a> {
    preview: Option<&'a TextureHandle>,
    device: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> Viewfinder<'a> {
    pub fn new(preview: Option<&'a TextureHandle>, theme: &'a Theme) -> Self {
        Self {
            preview,
            device: None,
            theme,
        }
    }

    /// Name of the device, shown in the badge
    pub fn device(mut self, label: Option<&'a str>) -> Self {
        self.device = label;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> CameraAction {
        let mut action = CameraAction::None;

        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                action = CameraAction::Back;
            }
            let badge = match self.device {
                Some(device) => format!("Viewfinder Active · {}", device),
                None => "Viewfinder Active".to_string(),
            };
            ui.label(
                RichText::new(badge.to_uppercase())
                    .size(10.0)
                    .color(self.theme.accent),
            );
        });

        ui.add_space(self.theme.spacing_sm);

        let available = ui.available_width();
        let frame_size = Vec2::new(available, available * 9.0 / 16.0).min(Vec2::new(720.0, 405.0));
        ui.vertical_centered(|ui| {
            match self.preview {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .fit_to_exact_size(frame_size)
                            .maintain_aspect_ratio(true)
                            .rounding(self.theme.card_rounding),
                    );
                }
                None => {
                    let (rect, _) = ui.allocate_exact_size(frame_size, Sense::hover());
                    ui.painter()
                        .rect_filled(rect, self.theme.card_rounding, Color32::BLACK);
                }
            }

            ui.add_space(self.theme.spacing);
            if self.shutter(ui).clicked() {
                action = CameraAction::Capture;
            }
        });

        action
    }

    fn shutter(&self, ui: &mut egui::Ui) -> egui::Response {
        let size = Vec2::splat(72.0);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click());
        response.widget_info(|| WidgetInfo::labeled(WidgetType::Button, true, "Capture"));

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            let center = rect.center();
            let ring = if response.hovered() {
                self.theme.accent
            } else {
                Color32::from_white_alpha(180)
            };
            painter.circle_stroke(center, 34.0, Stroke::new(3.0, ring));

            let inner = if response.is_pointer_button_down_on() {
                24.0
            } else {
                28.0
            };
            painter.circle_filled(center, inner, Color32::WHITE);
        }

        response.on_hover_text("Capture the scene")
    }
}
