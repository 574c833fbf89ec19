// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zone list panel.
//!
//! Lists the cached zones with their save status and, while tracking, the
//! live people count against each zone's threshold. Offers the
//! label-keyed edits: rename, delete and the per-zone population
//! threshold.

use crate::models::zone::ZoneStatus;
use crate::state::zones::ZoneStore;

/// Result of panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    None,
    Refresh,
    Rename { old_label: String, new_label: String },
    Delete(String),
    SetThreshold { label: String, value: u32 },
    Export,
}

/// Inputs typed into the panel, kept across frames.
#[derive(Debug, Default)]
pub struct PanelState {
    selected: Option<String>,
    new_label: String,
    threshold: String,
    threshold_error: bool,
}

impl PanelState {
    /// Forget the selection when the label is no longer cached.
    fn sync(&mut self, zones: &ZoneStore) {
        if let Some(label) = &self.selected {
            if !zones.contains_label(label) {
                self.selected = None;
                self.new_label.clear();
                self.threshold.clear();
            }
        }
    }

    fn select(&mut self, label: &str, zones: &ZoneStore) {
        self.selected = Some(label.to_string());
        self.new_label = label.to_string();
        self.threshold = zones
            .thresholds()
            .get(label)
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.threshold_error = false;
    }
}

/// Live people count of a zone, against its threshold when one is set.
fn live_count_text(zones: &ZoneStore, label: &str) -> Option<String> {
    let count = zones.count(label)?;
    Some(match zones.thresholds().get(label) {
        Some(threshold) => format!("{} / {}", count, threshold),
        None => count.to_string(),
    })
}

/// Display the zone panel.
pub fn show(ui: &mut egui::Ui, state: &mut PanelState, zones: &ZoneStore, has_source: bool) -> PanelAction {
    let mut action = PanelAction::None;
    state.sync(zones);

    ui.horizontal(|ui| {
        ui.heading("Zones");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.add_enabled(has_source, egui::Button::new("⟳")).on_hover_text("Refresh").clicked() {
                action = PanelAction::Refresh;
            }
        });
    });
    ui.separator();

    if zones.entries().is_empty() {
        ui.label(egui::RichText::new("No zones yet").weak());
    }

    egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
        for entry in zones.entries() {
            let label = &entry.zone.label;
            let selected = state.selected.as_deref() == Some(label.as_str());
            let mut text = egui::RichText::new(format!(
                "{}  ({}x{})",
                label,
                entry.zone.width(),
                entry.zone.height()
            ));
            if entry.status == ZoneStatus::Pending {
                text = text.italics().weak();
            }
            let over = zones.exceeds_threshold(label);
            if over {
                text = text.color(egui::Color32::LIGHT_RED).strong();
            }
            ui.horizontal(|ui| {
                let response = ui.selectable_label(selected, text);
                let response = match entry.status {
                    ZoneStatus::Pending => response.on_hover_text("Saving..."),
                    ZoneStatus::Committed => response,
                };
                if response.clicked() {
                    state.select(label, zones);
                }
                if let Some(live) = live_count_text(zones, label) {
                    if over {
                        ui.colored_label(egui::Color32::LIGHT_RED, format!("⚠ {}", live))
                            .on_hover_text("Over the threshold");
                    } else {
                        ui.label(egui::RichText::new(live).weak());
                    }
                }
            });
        }
    });

    if ui
        .add_enabled(!zones.entries().is_empty(), egui::Button::new("Export zones..."))
        .clicked()
    {
        action = PanelAction::Export;
    }
    ui.separator();

    let Some(selected) = state.selected.clone() else {
        ui.label(egui::RichText::new("Select a zone to edit it").weak());
        return action;
    };

    if let Some(entry) = zones.get(&selected) {
        let z = &entry.zone;
        ui.label(format!(
            "({}, {}) to ({}, {})",
            z.top_left_x, z.top_left_y, z.bottom_right_x, z.bottom_right_y
        ));
    }

    ui.horizontal(|ui| {
        ui.label("Name:");
        ui.text_edit_singleline(&mut state.new_label);
    });
    ui.horizontal(|ui| {
        if ui.button("Rename").clicked() {
            action = PanelAction::Rename {
                old_label: selected.clone(),
                new_label: state.new_label.clone(),
            };
        }
        if ui.button("🗑 Delete").clicked() {
            action = PanelAction::Delete(selected.clone());
        }
    });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.label("Threshold:");
        let edit = ui.add(egui::TextEdit::singleline(&mut state.threshold).desired_width(60.0));
        if edit.changed() {
            state.threshold_error = false;
        }
        if ui.button("Set").clicked() {
            match state.threshold.trim().parse::<u32>() {
                Ok(value) => {
                    action = PanelAction::SetThreshold {
                        label: selected.clone(),
                        value,
                    }
                }
                Err(_) => state.threshold_error = true,
            }
        }
    });
    if state.threshold_error {
        ui.colored_label(egui::Color32::LIGHT_RED, "Enter a whole number of people");
    }

    action
}
