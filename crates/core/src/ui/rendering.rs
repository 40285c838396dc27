//! UI rendering helpers.
//!
//! Small drawing utilities for the editor window: image previews scaled to
//! fit their panel and the round hat-colour swatches.

use crate::hat::HatColor;
use eframe::egui;
use image::DynamicImage;

/// Radius of a colour swatch in points.
pub const SWATCH_RADIUS: f32 = 16.0;

/// Scales `image_size` to fit inside `available`, keeping its proportions.
///
/// Images are never scaled up beyond their natural size.
pub fn fit_size(image_size: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let scale = (available.x / image_size.x)
        .min(available.y / image_size.y)
        .min(1.0)
        .max(0.0);
    image_size * scale
}

/// Converts a decoded image into a texture-ready [`egui::ColorImage`].
pub fn to_color_image(image: &DynamicImage) -> egui::ColorImage {
    let image_buffer = image.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = image_buffer.as_flat_samples();
    egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice())
}

pub fn hat_color32(color: HatColor) -> egui::Color32 {
    let [r, g, b] = color.rgb();
    egui::Color32::from_rgb(r, g, b)
}

/// Draws a texture centred in the remaining space of `ui`, scaled to fit.
pub fn draw_preview(ui: &mut egui::Ui, texture: &egui::TextureHandle, max_height: f32) {
    let available = egui::vec2(ui.available_width(), max_height);
    let size = fit_size(texture.size_vec2(), available);

    ui.vertical_centered(|ui| {
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    });
}

/// Draws one round swatch; returns `true` when it was clicked.
pub fn draw_swatch(ui: &mut egui::Ui, color: HatColor, selected: bool) -> bool {
    let size = egui::vec2(SWATCH_RADIUS * 2.0 + 6.0, SWATCH_RADIUS * 2.0 + 6.0);
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
    let painter = ui.painter();

    let radius = if selected || response.hovered() {
        SWATCH_RADIUS + 1.0
    } else {
        SWATCH_RADIUS
    };
    painter.circle_filled(rect.center(), radius, hat_color32(color));

    if selected {
        painter.circle_stroke(
            rect.center(),
            SWATCH_RADIUS + 3.0,
            egui::Stroke::new(2.0, egui::Color32::LIGHT_GRAY),
        );
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "✔",
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );
    }

    response.on_hover_text(color.name()).clicked()
}
