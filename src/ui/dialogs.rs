// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label prompt and operator notifications.

use crate::state::Notice;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const NOTICE_LIFETIME: Duration = Duration::from_secs(6);
const MAX_NOTICES: usize = 5;

/// Result of the label prompt this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAction {
    None,
    Submit(String),
    Cancel,
}

/// Modal asking for the label of a freshly drawn zone.
#[derive(Debug, Default)]
pub struct LabelPrompt {
    open: bool,
    text: String,
    focus: bool,
}

impl LabelPrompt {
    pub fn open(&mut self) {
        self.open = true;
        self.focus = true;
    }

    pub fn show(&mut self, ctx: &egui::Context) -> PromptAction {
        if !self.open {
            return PromptAction::None;
        }
        let mut action = PromptAction::None;

        egui::Window::new("Name this zone")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Enter a label for the zone:");
                let edit = ui.text_edit_singleline(&mut self.text);
                if self.focus {
                    edit.request_focus();
                    self.focus = false;
                }
                let entered = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() || entered {
                        action = PromptAction::Submit(self.text.clone());
                    }
                    if ui.button("Cancel").clicked() {
                        action = PromptAction::Cancel;
                    }
                });
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            action = PromptAction::Cancel;
        }
        if action != PromptAction::None {
            self.open = false;
            self.text.clear();
        }
        action
    }
}

/// Recent notices shown at the bottom of the window.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    entries: VecDeque<(Notice, Instant)>,
}

impl NoticeBoard {
    pub fn push(&mut self, notice: Notice) {
        match &notice {
            Notice::Info(message) => log::info!("{}", message),
            Notice::Error(err) => log::warn!("Shown to operator: {}", err),
        }
        self.entries.push_back((notice, Instant::now()));
        while self.entries.len() > MAX_NOTICES {
            self.entries.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.entries.retain(|(_, at)| at.elapsed() < NOTICE_LIFETIME);
        let mut dismissed = None;
        for (i, (notice, _)) in self.entries.iter().enumerate() {
            ui.horizontal(|ui| {
                match notice {
                    Notice::Info(_) => ui.label(notice.to_string()),
                    Notice::Error(_) => ui.colored_label(egui::Color32::LIGHT_RED, notice.to_string()),
                };
                if ui.small_button("✖").clicked() {
                    dismissed = Some(i);
                }
            });
        }
        if let Some(i) = dismissed {
            self.entries.remove(i);
        }
    }
}
