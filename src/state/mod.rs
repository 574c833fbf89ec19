// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Workbench state.
//!
//! The [`Workbench`] owns the source selector, the drawing machine, the
//! zone store and the tracking preview. Operator actions and service
//! replies enter as [`Command`]s; the workbench answers with [`Effect`]s
//! the app carries out (repaint, run a request, ask for a label, show a
//! message, open or close the tracking feed). Nothing in here touches the
//! network or the screen directly.

pub mod drawing;
pub mod source;
pub mod tracking;
pub mod zones;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::AppConfig;
use crate::error::{Error, MediaAcquisitionError};
use crate::io::media::{MediaBackend, VideoFrame};
use crate::io::request::{ServiceReply, ServiceRequest};
use crate::io::stats::LiveStats;
use crate::models::source::{DrawingSurface, SourceKind};
use crate::util::geometry::NativeRect;
use crate::util::sequence::RequestSequence;
use drawing::{DrawingMachine, PointerSample};
use source::SourceSelector;
use std::fmt;
use std::path::PathBuf;
use tracking::TrackingPreview;
use zones::ZoneStore;

/// A message for the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(Error),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Info(message) => write!(f, "{}", message),
            Notice::Error(err) => write!(f, "{}", err),
        }
    }
}

/// Something the app must do on behalf of the workbench.
///
/// The statistics stream follows the tracking feed: it is opened and
/// closed together with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Redraw the canvas and overlay
    Render,
    /// Run a request against the zone service
    Request(ServiceRequest),
    /// Ask the operator for a zone label
    PromptLabel,
    Notify(Notice),
    /// Start reading the tracking feed
    OpenFeed { endpoint: String, generation: u64 },
    CloseFeed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Upload a local video and make it the active source
    OpenVideo(PathBuf),
    StartCamera,
    CloseSource,
    /// Pause playback and let pointer drags draw zones
    EnableDrawing,
    /// Resume playback and refresh the zones shown over it
    PreviewZones,
    StartTracking,
    StopTracking,
    PointerDown(PointerSample),
    PointerMove(PointerSample),
    PointerUp(PointerSample),
    LabelProvided(String),
    LabelCancelled,
    RefreshZones,
    RenameZone { old_label: String, new_label: String },
    DeleteZone { label: String },
    SetThreshold { label: String, value: u32 },
    Reply(ServiceReply),
    FeedEnded { generation: u64, error: Option<String> },
    /// Statistics snapshot read for tracking session `generation`
    LiveStats { generation: u64, stats: LiveStats },
    /// Called once per frame
    Tick,
}

fn notify_error(err: impl Into<Error>) -> Vec<Effect> {
    vec![Effect::Notify(Notice::Error(err.into()))]
}

pub struct Workbench {
    sources: SourceSelector,
    drawing: DrawingMachine,
    zones: ZoneStore,
    tracking: TrackingPreview,
    upload_seq: RequestSequence,
    drawing_enabled: bool,
}

impl Workbench {
    pub fn new(backend: Box<dyn MediaBackend>, config: &AppConfig, feed_endpoint: String) -> Self {
        Self {
            sources: SourceSelector::new(backend, config.camera_source_id.clone(), config.max_display_width),
            drawing: DrawingMachine::new(),
            zones: ZoneStore::new(),
            tracking: TrackingPreview::new(feed_endpoint),
            upload_seq: RequestSequence::new(),
            drawing_enabled: false,
        }
    }

    pub fn sources(&self) -> &SourceSelector {
        &self.sources
    }

    pub fn zones(&self) -> &ZoneStore {
        &self.zones
    }

    pub fn tracking(&self) -> &TrackingPreview {
        &self.tracking
    }

    pub fn drawing(&self) -> &DrawingMachine {
        &self.drawing
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.sources.get_active_surface()
    }

    pub fn drawing_enabled(&self) -> bool {
        self.drawing_enabled
    }

    /// Whether tracking can be started for the active source.
    pub fn can_track(&self) -> bool {
        self.surface().is_some_and(|s| s.kind == SourceKind::VideoFile)
    }

    pub fn preview_rect(&self) -> Option<NativeRect> {
        self.drawing.preview_rect()
    }

    pub fn poll_frame(&mut self) -> Option<VideoFrame> {
        self.sources.poll_frame()
    }

    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::OpenVideo(local_path) => {
                let seq = self.upload_seq.next();
                log::info!("Uploading {} (#{})", local_path.display(), seq);
                vec![Effect::Request(ServiceRequest::UploadVideo { seq, local_path })]
            }
            Command::StartCamera => {
                let mut effects = self.release_source();
                let result = self.sources.activate_camera();
                effects.extend(self.after_activation(result));
                effects
            }
            Command::CloseSource => {
                let mut effects = self.release_source();
                effects.push(Effect::Render);
                effects
            }
            Command::EnableDrawing => {
                if let Err(e) = self.sources.require_surface() {
                    return notify_error(e);
                }
                self.drawing_enabled = true;
                self.sources.pause();
                vec![Effect::Render]
            }
            Command::PreviewZones => self.preview_zones(),
            Command::StartTracking => {
                let surface = match self.sources.require_surface() {
                    Ok(surface) => surface,
                    Err(e) => return notify_error(e),
                };
                // The tracker opens sources by path; the camera has none.
                if surface.kind != SourceKind::VideoFile {
                    return vec![Effect::Notify(Notice::Info("Upload a video first.".into()))];
                }
                let (path, native) = (surface.source_id.clone(), surface.buffer);
                self.tracking.start(&path, native)
            }
            Command::StopTracking => {
                let mut effects = self.tracking.stop();
                self.zones.clear_counts();
                self.sources.play();
                effects.push(Effect::Render);
                effects
            }
            Command::PointerDown(sample) => {
                let surface = self.sources.get_active_surface();
                if surface.is_some() && !self.drawing_enabled {
                    return Vec::new();
                }
                match self.drawing.pointer_down(sample, surface) {
                    Ok(effects) => effects,
                    Err(e) => notify_error(e),
                }
            }
            Command::PointerMove(sample) => self.drawing.pointer_move(sample, self.sources.get_active_surface()),
            Command::PointerUp(sample) => self.drawing.pointer_up(sample, self.sources.get_active_surface()),
            Command::LabelProvided(label) => self.drawing.label_provided(&label, &mut self.zones),
            Command::LabelCancelled => self.drawing.label_cancelled(),
            Command::RefreshZones => {
                if let Err(e) = self.sources.require_surface() {
                    return notify_error(e);
                }
                vec![
                    Effect::Request(self.zones.fetch_all()),
                    Effect::Request(self.zones.fetch_thresholds()),
                ]
            }
            Command::RenameZone { old_label, new_label } => match self.zones.rename(&old_label, &new_label) {
                Ok(request) => vec![Effect::Request(request)],
                Err(e) => notify_error(e),
            },
            Command::DeleteZone { label } => {
                if label.is_empty() {
                    return vec![Effect::Notify(Notice::Info("Please select a zone to delete.".into()))];
                }
                vec![Effect::Request(self.zones.remove(&label))]
            }
            Command::SetThreshold { label, value } => vec![Effect::Request(self.zones.set_threshold(&label, value))],
            Command::Reply(reply) => self.apply_reply(reply),
            Command::FeedEnded { generation, error } => {
                let effects = self.tracking.on_feed_ended(generation, error);
                if !self.tracking.is_streaming() {
                    self.zones.clear_counts();
                }
                effects
            }
            Command::LiveStats { generation, stats } => {
                if self.tracking.streaming_generation() != Some(generation) {
                    log::debug!("Discarding stats for tracking session {}", generation);
                    return Vec::new();
                }
                self.zones.apply_live_stats(stats);
                vec![Effect::Render]
            }
            Command::Tick => self.poll_surface(),
        }
    }

    fn apply_reply(&mut self, reply: ServiceReply) -> Vec<Effect> {
        match reply {
            ServiceReply::VideoUploaded {
                seq,
                local_path,
                result,
            } => {
                if !self.upload_seq.is_current(seq) {
                    log::debug!("Discarding stale upload #{}", seq);
                    return Vec::new();
                }
                match result {
                    Ok(remote_path) => {
                        let mut effects = self.release_source();
                        let result = self.sources.activate_video_file(local_path, remote_path);
                        effects.extend(self.after_activation(result));
                        effects
                    }
                    Err(e) => {
                        log::error!("Upload of {} failed: {}", local_path.display(), e);
                        notify_error(e)
                    }
                }
            }
            ServiceReply::TrackingStarted {
                seq,
                video_path,
                warmup,
                result,
            } => {
                let effects = self.tracking.on_started(seq, &video_path, warmup, result);
                if self.tracking.is_streaming() && !effects.is_empty() {
                    // The feed replaces the local picture.
                    self.sources.pause();
                }
                effects
            }
            ServiceReply::TrackingStopped { result } => {
                match result {
                    Ok(_) => log::debug!("Tracking session stopped"),
                    Err(e) => log::warn!("Stopping tracking failed: {}", e),
                }
                Vec::new()
            }
            other => self.zones.apply(other),
        }
    }

    /// Stop tracking, drop any gesture and zone cache, and release the
    /// active source. Uploads still in flight can no longer activate.
    fn release_source(&mut self) -> Vec<Effect> {
        self.upload_seq.invalidate();
        let effects = self.tracking.stop();
        self.drawing.reset();
        self.drawing_enabled = false;
        self.zones.bind_source(None);
        self.sources.deactivate();
        effects
    }

    fn after_activation(&mut self, result: Result<(), MediaAcquisitionError>) -> Vec<Effect> {
        match result {
            Ok(()) => {
                self.zones.bind_source(self.sources.source_id());
                let mut effects = vec![Effect::Render];
                effects.extend(self.poll_surface());
                effects
            }
            Err(e) => {
                log::error!("Source activation failed: {}", e);
                let mut effects = vec![Effect::Render];
                effects.extend(notify_error(e));
                effects
            }
        }
    }

    /// Once the source's size is known, fetch what is drawn over it.
    fn poll_surface(&mut self) -> Vec<Effect> {
        if !self.sources.poll_metadata() {
            return Vec::new();
        }
        vec![
            Effect::Request(self.zones.fetch_all()),
            Effect::Request(self.zones.fetch_thresholds()),
            Effect::Render,
        ]
    }

    fn preview_zones(&mut self) -> Vec<Effect> {
        let surface = match self.sources.require_surface() {
            Ok(surface) => surface,
            Err(e) => return notify_error(e),
        };
        let warm_path = (surface.kind == SourceKind::VideoFile).then(|| surface.source_id.clone());
        self.drawing.reset();
        self.drawing_enabled = false;
        if !self.tracking.is_streaming() {
            self.sources.play();
        }
        let mut effects = vec![Effect::Request(self.zones.fetch_all()), Effect::Render];
        if let Some(path) = warm_path {
            effects.push(self.tracking.warm_up(&path));
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Harness;
    use super::*;
    use crate::error::NoActiveSourceError;
    use crate::models::zone::ZoneStatus;
    use crate::util::geometry::{DisplaySize, NativeSize};

    fn at(x: f32, y: f32) -> PointerSample {
        PointerSample::new(x, y, DisplaySize::new(860.0, 484.0))
    }

    fn draw(harness: &mut Harness, from: (f32, f32), to: (f32, f32), label: &str) {
        harness.run(Command::EnableDrawing);
        harness.run(Command::PointerDown(at(from.0, from.1)));
        harness.run(Command::PointerMove(at(to.0, to.1)));
        harness.run(Command::PointerUp(at(to.0, to.1)));
        harness.run(Command::LabelProvided(label.into()));
    }

    #[test]
    fn test_file_scenario_commits_native_zone() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));

        let surface = harness.workbench.surface().unwrap().clone();
        assert_eq!(surface.buffer, NativeSize::new(1920, 1080));
        assert_eq!(surface.source_id, "/static/uploads/hall.mp4");

        draw(&mut harness, (100.0, 100.0), (200.0, 150.0), "Entrance");
        assert!(harness.saw(&Effect::PromptLabel));

        let stored = harness.service.zones();
        assert_eq!(stored.len(), 1);
        let zone = &stored[0];
        // 446.51 rounds to 447 (DESIGN.md, rounding)
        assert_eq!(
            (zone.top_left_x, zone.top_left_y, zone.bottom_right_x, zone.bottom_right_y),
            (223, 223, 447, 335)
        );
        assert_eq!(zone.source_id, "/static/uploads/hall.mp4");

        let cached = harness.workbench.zones().get("Entrance").unwrap();
        assert_eq!(cached.status, ZoneStatus::Committed);
    }

    #[test]
    fn test_pointer_down_without_source_notifies() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::PointerDown(at(10.0, 10.0)));
        assert!(harness.saw(&Effect::Notify(Notice::Error(NoActiveSourceError.into()))));
        assert!(harness.workbench.preview_rect().is_none());
    }

    #[test]
    fn test_pointer_ignored_until_drawing_enabled() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::StartCamera);
        harness.run(Command::PointerDown(at(10.0, 10.0)));
        assert!(harness.workbench.preview_rect().is_none());

        harness.run(Command::EnableDrawing);
        harness.run(Command::PointerDown(at(10.0, 10.0)));
        assert!(harness.workbench.preview_rect().is_some());
        assert!(harness.workbench.sources().is_paused());
    }

    #[test]
    fn test_label_keyed_rename_and_delete() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));
        draw(&mut harness, (10.0, 10.0), (90.0, 90.0), "L1");

        harness.run(Command::RenameZone {
            old_label: "L1".into(),
            new_label: "L2".into(),
        });
        assert_eq!(harness.workbench.zones().labels(), vec!["L2".to_string()]);

        harness.run(Command::DeleteZone { label: "L2".into() });
        assert!(harness.workbench.zones().labels().is_empty());
        assert!(harness.service.zones().is_empty());
    }

    #[test]
    fn test_existing_zones_fetched_once_surface_is_sized() {
        let mut harness = Harness::new(NativeSize::new(1280, 720));
        harness.service.seed("Gate", 1, 1, 50, 50);
        harness.backend.delay_metadata();

        harness.run(Command::OpenVideo("hall.mp4".into()));
        assert!(harness.workbench.zones().entries().is_empty());

        harness.backend.load_metadata();
        harness.run(Command::Tick);
        assert_eq!(harness.workbench.zones().labels(), vec!["Gate".to_string()]);
        assert_eq!(harness.workbench.zones().entries()[0].zone.source_id, "/static/uploads/hall.mp4");
    }

    #[test]
    fn test_camera_failure_is_reported() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.backend.deny_camera();
        harness.run(Command::StartCamera);
        assert!(harness
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Notify(Notice::Error(Error::MediaAcquisition(_))))));
        assert!(harness.workbench.surface().is_none());
    }

    #[test]
    fn test_tracking_streams_and_source_switch_stops_it() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));
        harness.run(Command::StartTracking);

        assert!(harness.workbench.tracking().is_streaming());
        assert!(harness.saw(&Effect::OpenFeed {
            endpoint: harness.service.feed_url(),
            generation: 1,
        }));
        assert_eq!(harness.service.started(), vec!["/static/uploads/hall.mp4".to_string()]);

        harness.run(Command::StartCamera);
        assert!(!harness.workbench.tracking().is_streaming());
        assert!(harness.saw(&Effect::CloseFeed));
        assert_eq!(harness.service.stop_calls(), 1);
        assert_eq!(harness.workbench.sources().kind(), Some(SourceKind::Camera));
    }

    #[test]
    fn test_live_stats_follow_tracking_session() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));
        harness.run(Command::SetThreshold {
            label: "Gate".into(),
            value: 3,
        });
        let snapshot = |count| LiveStats {
            counts: [("Gate".to_string(), count)].into_iter().collect(),
            thresholds: Default::default(),
        };

        // Nothing is tracked yet
        harness.run(Command::LiveStats {
            generation: 1,
            stats: snapshot(5),
        });
        assert_eq!(harness.workbench.zones().count("Gate"), None);

        harness.run(Command::StartTracking);
        harness.run(Command::LiveStats {
            generation: 1,
            stats: snapshot(5),
        });
        assert_eq!(harness.workbench.zones().count("Gate"), Some(5));
        assert!(harness.workbench.zones().exceeds_threshold("Gate"));

        harness.run(Command::LiveStats {
            generation: 0,
            stats: snapshot(1),
        });
        assert_eq!(harness.workbench.zones().count("Gate"), Some(5));

        harness.run(Command::StopTracking);
        assert_eq!(harness.workbench.zones().count("Gate"), None);
    }

    #[test]
    fn test_preview_warms_up_file_sources_only() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));
        harness.run(Command::PreviewZones);
        assert_eq!(harness.service.started(), vec!["/static/uploads/hall.mp4".to_string()]);
        assert!(!harness.workbench.tracking().is_streaming());

        harness.run(Command::StartCamera);
        harness.run(Command::PreviewZones);
        assert_eq!(harness.service.started().len(), 1);
    }

    #[test]
    fn test_stale_upload_is_ignored() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        let first = harness.workbench.handle(Command::OpenVideo("a.mp4".into()));
        let second = harness.workbench.handle(Command::OpenVideo("b.mp4".into()));

        harness.deliver(second);
        harness.deliver(first);
        assert_eq!(
            harness.workbench.sources().source_id().as_deref(),
            Some("/static/uploads/b.mp4")
        );
    }

    #[test]
    fn test_camera_started_during_upload_wins() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        let upload = harness.workbench.handle(Command::OpenVideo("a.mp4".into()));
        harness.run(Command::StartCamera);

        harness.deliver(upload);
        assert_eq!(harness.workbench.sources().kind(), Some(SourceKind::Camera));
        assert_eq!(harness.workbench.sources().source_id().as_deref(), Some("webcam_feed"));
        assert!(harness.backend.camera_held());
    }

    #[test]
    fn test_close_during_upload_stays_closed() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        let upload = harness.workbench.handle(Command::OpenVideo("a.mp4".into()));
        harness.run(Command::CloseSource);

        harness.deliver(upload);
        assert!(harness.workbench.sources().kind().is_none());
        assert!(harness.workbench.surface().is_none());
    }

    #[test]
    fn test_upload_after_close_still_activates() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::StartCamera);
        harness.run(Command::CloseSource);
        harness.run(Command::OpenVideo("b.mp4".into()));
        assert_eq!(harness.workbench.sources().kind(), Some(SourceKind::VideoFile));
    }

    #[test]
    fn test_tracking_refused_for_camera() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::StartCamera);
        assert!(!harness.workbench.can_track());

        harness.run(Command::StartTracking);
        assert!(harness.saw(&Effect::Notify(Notice::Info("Upload a video first.".into()))));
        assert!(harness.service.started().is_empty());
        assert!(!harness.workbench.tracking().is_streaming());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let mut harness = Harness::new(NativeSize::new(1920, 1080));
        harness.run(Command::OpenVideo("hall.mp4".into()));
        harness.service.fail_saves();
        draw(&mut harness, (10.0, 10.0), (90.0, 90.0), "Gate");

        assert!(harness.workbench.zones().entries().is_empty());
        assert!(harness
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Notify(Notice::Error(Error::ZoneService(_))))));
    }

    #[test]
    fn test_thresholds_round_trip_through_service() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::StartCamera);
        harness.run(Command::SetThreshold {
            label: "Gate".into(),
            value: 7,
        });
        harness.run(Command::RefreshZones);
        assert_eq!(harness.workbench.zones().thresholds().get("Gate"), Some(&7));
    }

    #[test]
    fn test_close_source_clears_everything() {
        let mut harness = Harness::new(NativeSize::new(640, 480));
        harness.run(Command::StartCamera);
        harness.run(Command::CloseSource);
        assert!(harness.workbench.surface().is_none());
        assert!(harness.workbench.sources().kind().is_none());
        assert!(!harness.backend.camera_held());
    }
}
