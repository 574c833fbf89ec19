// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with source controls and mode selection.

use crate::app::Tool;

/// Button pressed on the toolbar this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    UploadVideo,
    StartCamera,
    CloseSource,
    /// The operator picked a mode
    SelectTool(Tool),
    StartTracking,
    StopTracking,
}

/// Display the toolbar.
pub fn show(ui: &mut egui::Ui, current_tool: Tool, has_source: bool, can_track: bool, tracking: bool) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.button("📂 Upload Video").clicked() {
            action = ToolbarAction::UploadVideo;
        }
        if ui.button("📷 Start Camera").clicked() {
            action = ToolbarAction::StartCamera;
        }
        if ui.add_enabled(has_source, egui::Button::new("⏹ Close")).clicked() {
            action = ToolbarAction::CloseSource;
        }

        ui.separator();

        if ui.selectable_label(current_tool == Tool::View, "👁 Preview Zones").clicked() {
            action = ToolbarAction::SelectTool(Tool::View);
        }
        if ui.selectable_label(current_tool == Tool::Draw, "▭ Draw Zones").clicked() {
            action = ToolbarAction::SelectTool(Tool::Draw);
        }

        ui.separator();

        if tracking {
            if ui.button("Stop Tracking").clicked() {
                action = ToolbarAction::StopTracking;
            }
        } else if ui
            .add_enabled(can_track, egui::Button::new("▶ Start Tracking"))
            .on_disabled_hover_text("Tracking needs an uploaded video")
            .clicked()
        {
            action = ToolbarAction::StartTracking;
        }

        ui.separator();

        let tool_text = match current_tool {
            Tool::View => "Playback with the saved zones drawn on top",
            Tool::Draw => "Drag on the video to draw a zone, then name it",
        };
        ui.label(egui::RichText::new(tool_text).italics().weak());
    });

    action
}
