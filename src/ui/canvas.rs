// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for the active source.
//!
//! Shows the source frame (or the tracking feed) in the display box, turns
//! pointer drags into samples relative to that box and draws the zone
//! overlay on top, aligned to the same box.

use crate::app::Tool;
use crate::models::source::DrawingSurface;
use crate::models::zone::Zone;
use crate::state::drawing::PointerSample;
use crate::ui::overlay::{render_zones, PainterTarget};
use crate::util::geometry::{fit_within, DisplaySize, NativeRect};

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    PointerDown(PointerSample),
    PointerMove(PointerSample),
    PointerUp(PointerSample),
}

/// What the canvas shows this frame.
pub struct CanvasView<'a> {
    pub tool: Tool,
    /// Latest source frame, or the tracking feed while it streams
    pub texture: Option<&'a egui::TextureHandle>,
    pub surface: Option<&'a DrawingSurface>,
    pub zones: &'a [Zone],
    pub preview: Option<NativeRect>,
    pub status: &'a str,
}

/// Display the canvas area and handle pointer drags.
pub fn show(ui: &mut egui::Ui, view: CanvasView<'_>) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let Some(surface) = view.surface else {
            action = show_empty(ui);
            return;
        };

        // The display box is capped by the configured width, then shrunk
        // further if the panel is smaller.
        let available = ui.available_size();
        let shown = fit_within(surface.display, DisplaySize::new(available.x, available.y));
        let x_offset = ((available.x - shown.width) / 2.0).max(0.0);
        let y_offset = ((available.y - shown.height) / 2.0).max(0.0);
        let box_rect = egui::Rect::from_min_size(
            ui.min_rect().min + egui::vec2(x_offset, y_offset),
            egui::vec2(shown.width, shown.height),
        );

        match view.texture {
            Some(texture) => {
                ui.painter().image(
                    texture.id(),
                    box_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                ui.painter().rect_filled(box_rect, 0.0, egui::Color32::from_gray(20));
            }
        }

        let sense = match view.tool {
            Tool::Draw => egui::Sense::drag(),
            Tool::View => egui::Sense::hover(),
        };
        let response = ui.allocate_rect(box_rect, sense);

        // Offsets are taken against the box as rendered this frame.
        let sample = |pos: egui::Pos2| {
            PointerSample::new(
                pos.x - box_rect.min.x,
                pos.y - box_rect.min.y,
                DisplaySize::new(box_rect.width(), box_rect.height()),
            )
        };
        let pointer = response
            .interact_pointer_pos()
            .or_else(|| ui.ctx().pointer_latest_pos());

        if let Some(pos) = pointer {
            if response.drag_started() {
                action = CanvasAction::PointerDown(sample(pos));
            } else if response.drag_stopped() {
                action = CanvasAction::PointerUp(sample(pos));
            } else if response.dragged() {
                action = CanvasAction::PointerMove(sample(pos));
            }
        }

        if view.tool == Tool::Draw {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        }

        let mut target = PainterTarget::new(ui.painter(), box_rect, surface.buffer);
        render_zones(&mut target, view.zones, view.preview.as_ref());
    });

    ui.separator();
    ui.horizontal(|ui| {
        ui.label(format!("Mode: {:?}", view.tool));
        ui.separator();
        match view.surface {
            Some(surface) => {
                ui.label(format!("{}x{}", surface.buffer.width, surface.buffer.height));
                ui.separator();
            }
            None => {
                ui.label("No source");
                ui.separator();
            }
        }
        ui.label(view.status);
    });

    action
}

/// Welcome text when no source is active. A press here still reaches the
/// drawing machine so the operator is told why nothing happens.
fn show_empty(ui: &mut egui::Ui) -> CanvasAction {
    let rect = ui.available_rect_before_wrap();
    let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());

    ui.allocate_ui_at_rect(rect, |ui| {
        ui.centered_and_justified(|ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(20.0);
                ui.heading(
                    egui::RichText::new("Zonewatch")
                        .size(32.0)
                        .color(egui::Color32::from_gray(200)),
                );
                ui.label(
                    egui::RichText::new("Crowd monitoring zone editor")
                        .size(14.0)
                        .color(egui::Color32::from_gray(150)),
                );
                ui.add_space(20.0);
                ui.label(
                    egui::RichText::new("Upload a video or start the camera to begin")
                        .color(egui::Color32::from_gray(180)),
                );
            });
        });
    });

    if response.drag_started() || response.clicked() {
        return CanvasAction::PointerDown(PointerSample::new(0.0, 0.0, DisplaySize::new(0.0, 0.0)));
    }
    CanvasAction::None
}
