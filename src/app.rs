// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app is the event loop of the zone editor. Every frame it drains
//! what background threads sent over channels (service replies, tracking
//! feed frames, zone statistics), feeds it to the [`Workbench`] and
//! carries out the effects it answers with.

use crate::config::AppConfig;
use crate::error::Error;
use crate::io::client::{ServiceClient, ZoneService};
use crate::io::feed::{spawn_feed, FeedEvent, FeedHandle};
use crate::io::media::{default_backend, supported_extensions, VideoFrame};
use crate::io::request::{Dispatcher, ServiceReply};
use crate::io::serialization::{self, ZoneExport};
use crate::io::stats::{spawn_stats, StatsEvent};
use crate::state::tracking::TrackingState;
use crate::state::{Command, Effect, Notice, Workbench};
use crate::ui::{canvas, dialogs, toolbar, zones_panel};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Canvas interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Playback with the zones drawn over it
    View,
    /// Playback paused, drags draw zones
    Draw,
}

/// Main application state.
pub struct ZoneApp {
    workbench: Workbench,

    /// Kept for opening the tracking feed
    client: ServiceClient,
    dispatcher: Dispatcher,
    replies: Receiver<ServiceReply>,

    feed_sender: Sender<FeedEvent>,
    feed_events: Receiver<FeedEvent>,
    feed: Option<FeedHandle>,

    stats_sender: Sender<StatsEvent>,
    stats_events: Receiver<StatsEvent>,
    stats: Option<FeedHandle>,

    /// Latest frame of the active source
    frame_texture: Option<egui::TextureHandle>,
    /// Latest frame of the tracking feed
    feed_texture: Option<egui::TextureHandle>,

    notices: dialogs::NoticeBoard,
    prompt: dialogs::LabelPrompt,
    panel: zones_panel::PanelState,
}

impl ZoneApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &AppConfig, client: ServiceClient) -> Self {
        let (reply_sender, replies) = channel();
        let (feed_sender, feed_events) = channel();
        let (stats_sender, stats_events) = channel();

        let ctx = cc.egui_ctx.clone();
        let wake: Arc<dyn Fn() + Send + Sync> = Arc::new(move || ctx.request_repaint());
        let dispatcher = Dispatcher::new(Arc::new(client.clone()), reply_sender, wake);
        let workbench = Workbench::new(default_backend(), config, client.feed_endpoint());

        Self {
            workbench,
            client,
            dispatcher,
            replies,
            feed_sender,
            feed_events,
            feed: None,
            stats_sender,
            stats_events,
            stats: None,
            frame_texture: None,
            feed_texture: None,
            notices: dialogs::NoticeBoard::default(),
            prompt: dialogs::LabelPrompt::default(),
            panel: zones_panel::PanelState::default(),
        }
    }

    fn handle(&mut self, ctx: &egui::Context, command: Command) {
        let effects = self.workbench.handle(command);
        self.execute(ctx, effects);
    }

    fn execute(&mut self, ctx: &egui::Context, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render => ctx.request_repaint(),
                Effect::Request(request) => self.dispatcher.dispatch(request),
                Effect::PromptLabel => self.prompt.open(),
                Effect::Notify(notice) => self.notices.push(notice),
                Effect::OpenFeed { endpoint, generation } => {
                    log::info!("Opening tracking feed {} at {}", generation, endpoint);
                    let wake_ctx = ctx.clone();
                    self.feed = Some(spawn_feed(
                        self.client.clone(),
                        generation,
                        self.feed_sender.clone(),
                        move || wake_ctx.request_repaint(),
                    ));
                    let wake_ctx = ctx.clone();
                    self.stats = Some(spawn_stats(
                        self.client.clone(),
                        generation,
                        self.stats_sender.clone(),
                        move || wake_ctx.request_repaint(),
                    ));
                }
                Effect::CloseFeed => {
                    if let Some(feed) = self.feed.take() {
                        feed.close();
                    }
                    self.close_stats();
                    self.feed_texture = None;
                }
            }
        }
    }

    /// Apply everything the background threads sent since the last frame.
    fn drain_channels(&mut self, ctx: &egui::Context) {
        while let Ok(reply) = self.replies.try_recv() {
            self.handle(ctx, Command::Reply(reply));
        }

        while let Ok(event) = self.feed_events.try_recv() {
            match event {
                FeedEvent::Frame { generation, frame } => {
                    // Frames from an abandoned session are dropped.
                    if self.workbench.tracking().streaming_generation() == Some(generation) {
                        upload_frame(ctx, &mut self.feed_texture, "tracking_feed", &frame);
                    }
                }
                FeedEvent::Ended { generation, error } => {
                    self.handle(ctx, Command::FeedEnded { generation, error });
                    if !self.workbench.tracking().is_streaming() {
                        self.close_stats();
                    }
                }
            }
        }

        while let Ok(event) = self.stats_events.try_recv() {
            match event {
                StatsEvent::Update { generation, stats } => {
                    self.handle(ctx, Command::LiveStats { generation, stats });
                }
                // Tracking goes on without counts.
                StatsEvent::Ended { generation, error } => match error {
                    Some(e) => log::warn!("Stats stream {} ended: {}", generation, e),
                    None => log::info!("Stats stream {} ended", generation),
                },
            }
        }
    }

    fn close_stats(&mut self) {
        if let Some(stats) = self.stats.take() {
            stats.close();
        }
    }

    fn upload_video(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Videos", supported_extensions())
            .pick_file()
        {
            self.notices
                .push(Notice::Info(format!("Uploading {}...", path.display())));
            self.handle(ctx, Command::OpenVideo(path));
        }
    }

    fn export_zones(&mut self) {
        let Some(surface) = self.workbench.surface() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("YAML", &["yaml", "yml"])
            .add_filter("JSON", &["json"])
            .set_file_name("zones.yaml")
            .save_file()
        else {
            return;
        };

        let zones = self.workbench.zones().zones();
        let data = ZoneExport::new(&surface.source_id, surface.buffer, &zones);
        let result = serialization::export(&data, &path);
        if result.is_ok() {
            log::info!("Exported {} zones to {}", zones.len(), path.display());
        }
        self.notices.push(export_notice(&path, result));
    }

    fn status_text(&self) -> String {
        match self.workbench.tracking().state() {
            TrackingState::NotStarted => {
                if self.workbench.drawing().is_committing() {
                    "Waiting for a zone label".into()
                } else {
                    format!("{} zones", self.workbench.zones().entries().len())
                }
            }
            TrackingState::Starting { source_path, .. } => format!("Starting tracking for {}...", source_path),
            TrackingState::Streaming { session, .. } => format!("Tracking {}", session.source_path),
        }
    }
}

/// Operator notice for the outcome of an export.
fn export_notice(path: &Path, result: anyhow::Result<()>) -> Notice {
    match result {
        Ok(()) => Notice::Info(format!("Exported zones to {}", path.display())),
        Err(e) => {
            log::error!("Failed to export zones: {:#}", e);
            Notice::Error(Error::Export(format!("{:#}", e)))
        }
    }
}

/// Create or update a texture from a decoded frame.
fn upload_frame(ctx: &egui::Context, texture: &mut Option<egui::TextureHandle>, name: &str, frame: &VideoFrame) {
    let size = [frame.size.width as usize, frame.size.height as usize];
    if frame.rgba.len() != size[0] * size[1] * 4 {
        log::warn!("Dropping malformed {} frame", name);
        return;
    }
    let image = egui::ColorImage::from_rgba_unmultiplied(size, &frame.rgba);
    match texture {
        Some(handle) => handle.set(image, egui::TextureOptions::LINEAR),
        None => *texture = Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR)),
    }
}

impl eframe::App for ZoneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels(ctx);
        self.handle(ctx, Command::Tick);

        if let Some(frame) = self.workbench.poll_frame() {
            upload_frame(ctx, &mut self.frame_texture, "source_frame", &frame);
        }
        if self.workbench.surface().is_none() {
            self.frame_texture = None;
        } else if !self.workbench.sources().is_paused() {
            ctx.request_repaint_after(Duration::from_millis(15));
        }
        if !self.notices.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        let has_source = self.workbench.surface().is_some();
        let can_track = self.workbench.can_track();
        let tracking = !matches!(self.workbench.tracking().state(), TrackingState::NotStarted);
        let tool = if self.workbench.drawing_enabled() {
            Tool::Draw
        } else {
            Tool::View
        };

        // Top menu bar
        let mut menu_action = toolbar::ToolbarAction::None;
        let mut export_requested = false;
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Video...").clicked() {
                        menu_action = toolbar::ToolbarAction::UploadVideo;
                        ui.close_menu();
                    }
                    if ui.button("Start Camera").clicked() {
                        menu_action = toolbar::ToolbarAction::StartCamera;
                        ui.close_menu();
                    }
                    if ui.add_enabled(has_source, egui::Button::new("Close Source")).clicked() {
                        menu_action = toolbar::ToolbarAction::CloseSource;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.add_enabled(has_source, egui::Button::new("Export Zones...")).clicked() {
                        export_requested = true;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, tool, has_source, can_track, tracking))
            .inner;

        for action in [menu_action, toolbar_action] {
            match action {
                toolbar::ToolbarAction::None => {}
                toolbar::ToolbarAction::UploadVideo => self.upload_video(ctx),
                toolbar::ToolbarAction::StartCamera => self.handle(ctx, Command::StartCamera),
                toolbar::ToolbarAction::CloseSource => self.handle(ctx, Command::CloseSource),
                toolbar::ToolbarAction::SelectTool(Tool::Draw) => self.handle(ctx, Command::EnableDrawing),
                toolbar::ToolbarAction::SelectTool(Tool::View) => self.handle(ctx, Command::PreviewZones),
                toolbar::ToolbarAction::StartTracking => self.handle(ctx, Command::StartTracking),
                toolbar::ToolbarAction::StopTracking => self.handle(ctx, Command::StopTracking),
            }
        }

        // Zone panel (right side)
        let panel_action = egui::SidePanel::right("zones")
            .default_width(250.0)
            .show(ctx, |ui| zones_panel::show(ui, &mut self.panel, self.workbench.zones(), has_source))
            .inner;

        match panel_action {
            zones_panel::PanelAction::None => {}
            zones_panel::PanelAction::Refresh => self.handle(ctx, Command::RefreshZones),
            zones_panel::PanelAction::Rename { old_label, new_label } => {
                self.handle(ctx, Command::RenameZone { old_label, new_label })
            }
            zones_panel::PanelAction::Delete(label) => self.handle(ctx, Command::DeleteZone { label }),
            zones_panel::PanelAction::SetThreshold { label, value } => {
                self.handle(ctx, Command::SetThreshold { label, value })
            }
            zones_panel::PanelAction::Export => export_requested = true,
        }
        if export_requested {
            self.export_zones();
        }

        // Notifications (bottom)
        if !self.notices.is_empty() {
            egui::TopBottomPanel::bottom("notices").show(ctx, |ui| self.notices.show(ui));
        }

        // Main canvas (center)
        let status = self.status_text();
        let zones = self.workbench.zones().zones();
        let texture = match self.workbench.tracking().state() {
            TrackingState::Streaming { .. } => self.feed_texture.as_ref().or(self.frame_texture.as_ref()),
            _ => self.frame_texture.as_ref(),
        };
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    canvas::CanvasView {
                        tool,
                        texture,
                        surface: self.workbench.surface(),
                        zones: &zones,
                        preview: self.workbench.preview_rect(),
                        status: &status,
                    },
                )
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::None => {}
            canvas::CanvasAction::PointerDown(sample) => self.handle(ctx, Command::PointerDown(sample)),
            canvas::CanvasAction::PointerMove(sample) => self.handle(ctx, Command::PointerMove(sample)),
            canvas::CanvasAction::PointerUp(sample) => self.handle(ctx, Command::PointerUp(sample)),
        }

        // Label prompt
        match self.prompt.show(ctx) {
            dialogs::PromptAction::None => {}
            dialogs::PromptAction::Submit(label) => self.handle(ctx, Command::LabelProvided(label)),
            dialogs::PromptAction::Cancel => self.handle(ctx, Command::LabelCancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::geometry::NativeSize;

    #[test]
    fn test_failed_export_is_an_error_notice() {
        let path = Path::new("zones.txt");
        let data = ZoneExport::new("/static/uploads/hall.mp4", NativeSize::new(1920, 1080), &[]);
        let notice = export_notice(path, serialization::export(&data, path));

        match notice {
            Notice::Error(Error::Export(message)) => assert!(message.contains("Unsupported file extension")),
            other => panic!("expected an export error, got {:?}", other),
        }
    }

    #[test]
    fn test_successful_export_is_info() {
        let notice = export_notice(Path::new("zones.yaml"), Ok(()));
        assert_eq!(notice, Notice::Info("Exported zones to zones.yaml".into()));
    }
}
