// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Fakes for driving the workbench without a camera or a server.

use super::{Command, Effect, Workbench};
use crate::config::AppConfig;
use crate::error::{MediaAcquisitionError, ZoneServiceError};
use crate::io::client::{Thresholds, ZoneService};
use crate::io::media::{MediaBackend, MediaStream, VideoFrame};
use crate::io::request::execute;
use crate::models::zone::Zone;
use crate::util::geometry::NativeSize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct BackendLog {
    events: Vec<String>,
    native: NativeSize,
    metadata_ready: bool,
    camera_denied: bool,
    camera_held: bool,
}

/// Media backend that records every open, pause and stop.
#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
    log: Rc<RefCell<BackendLog>>,
}

impl FakeBackend {
    pub fn new(native: NativeSize) -> Self {
        Self {
            log: Rc::new(RefCell::new(BackendLog {
                events: Vec::new(),
                native,
                metadata_ready: true,
                camera_denied: false,
                camera_held: false,
            })),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.borrow().events.clone()
    }

    pub fn camera_held(&self) -> bool {
        self.log.borrow().camera_held
    }

    pub fn deny_camera(&self) {
        self.log.borrow_mut().camera_denied = true;
    }

    pub fn delay_metadata(&self) {
        self.log.borrow_mut().metadata_ready = false;
    }

    pub fn load_metadata(&self) {
        self.log.borrow_mut().metadata_ready = true;
    }
}

impl MediaBackend for FakeBackend {
    fn open_file(&mut self, _path: &Path) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
        self.log.borrow_mut().events.push("file:open".into());
        Ok(Box::new(FakeStream {
            kind: "file",
            log: self.log.clone(),
            paused: true,
        }))
    }

    fn open_camera(&mut self) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
        let mut log = self.log.borrow_mut();
        if log.camera_denied {
            return Err(MediaAcquisitionError::CameraUnavailable {
                reason: "permission denied".into(),
            });
        }
        if log.camera_held {
            return Err(MediaAcquisitionError::CameraBusy);
        }
        log.camera_held = true;
        log.events.push("camera:open".into());
        Ok(Box::new(FakeStream {
            kind: "camera",
            log: self.log.clone(),
            paused: true,
        }))
    }
}

struct FakeStream {
    kind: &'static str,
    log: Rc<RefCell<BackendLog>>,
    paused: bool,
}

impl MediaStream for FakeStream {
    fn intrinsic_size(&self) -> Option<NativeSize> {
        let log = self.log.borrow();
        log.metadata_ready.then_some(log.native)
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
        self.log.borrow_mut().events.push(format!("{}:pause", self.kind));
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        None
    }

    fn stop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.events.push(format!("{}:stop", self.kind));
        if self.kind == "camera" {
            log.camera_held = false;
        }
    }
}

#[derive(Debug, Default)]
struct ServiceState {
    zones: Vec<Zone>,
    thresholds: Thresholds,
    started: Vec<String>,
    stop_calls: usize,
    fail_saves: bool,
}

/// Zone service kept in memory, answering like the real one.
#[derive(Debug, Default)]
pub(crate) struct MemoryService {
    state: Mutex<ServiceState>,
}

impl MemoryService {
    pub fn zones(&self) -> Vec<Zone> {
        self.state.lock().unwrap().zones.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().unwrap().stop_calls
    }

    pub fn fail_saves(&self) {
        self.state.lock().unwrap().fail_saves = true;
    }

    pub fn feed_url(&self) -> String {
        self.feed_endpoint()
    }

    pub fn seed(&self, label: &str, left: u32, top: u32, right: u32, bottom: u32) {
        self.state.lock().unwrap().zones.push(Zone {
            label: label.into(),
            top_left_x: left,
            top_left_y: top,
            bottom_right_x: right,
            bottom_right_y: bottom,
            source_id: String::new(),
        });
    }
}

impl ZoneService for MemoryService {
    fn upload_video(&self, path: &Path) -> Result<String, ZoneServiceError> {
        let name = path
            .file_name()
            .ok_or_else(|| ZoneServiceError::new("No selected file"))?;
        Ok(format!("/static/uploads/{}", name.to_string_lossy()))
    }

    fn start_tracking(&self, video_path: &str) -> Result<String, ZoneServiceError> {
        self.state.lock().unwrap().started.push(video_path.to_string());
        Ok("Tracking started".into())
    }

    fn stop_tracking(&self) -> Result<String, ZoneServiceError> {
        self.state.lock().unwrap().stop_calls += 1;
        Ok("Tracking stopped".into())
    }

    fn save_zone(&self, zone: &Zone) -> Result<String, ZoneServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_saves {
            return Err(ZoneServiceError::new("Missing zone data"));
        }
        state.zones.push(zone.clone());
        Ok("Zone saved successfully".into())
    }

    fn list_zones(&self) -> Result<Vec<Zone>, ZoneServiceError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .zones
            .iter()
            .map(|zone| Zone {
                source_id: String::new(),
                ..zone.clone()
            })
            .collect())
    }

    fn rename_zone(&self, old_label: &str, new_label: &str) -> Result<String, ZoneServiceError> {
        let mut state = self.state.lock().unwrap();
        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.label == old_label)
            .ok_or_else(|| ZoneServiceError::new("Zone not found"))?;
        zone.label = new_label.to_string();
        Ok("Zone updated successfully".into())
    }

    fn delete_zone(&self, label: &str) -> Result<String, ZoneServiceError> {
        let mut state = self.state.lock().unwrap();
        let before = state.zones.len();
        state.zones.retain(|z| z.label != label);
        if state.zones.len() == before {
            return Err(ZoneServiceError::new("Zone not found"));
        }
        state.thresholds.remove(label);
        Ok("Zone deleted successfully".into())
    }

    fn get_thresholds(&self) -> Result<Thresholds, ZoneServiceError> {
        Ok(self.state.lock().unwrap().thresholds.clone())
    }

    fn set_thresholds(&self, thresholds: &Thresholds) -> Result<String, ZoneServiceError> {
        let mut state = self.state.lock().unwrap();
        state
            .thresholds
            .extend(thresholds.iter().map(|(k, v)| (k.clone(), *v)));
        Ok("Thresholds updated".into())
    }

    fn feed_endpoint(&self) -> String {
        "http://zones.test/zm_feed".into()
    }
}

/// Runs commands to completion, answering every request synchronously.
pub(crate) struct Harness {
    pub workbench: Workbench,
    pub service: Arc<MemoryService>,
    pub backend: FakeBackend,
    /// Every effect other than requests, in order
    pub effects: Vec<Effect>,
}

impl Harness {
    pub fn new(native: NativeSize) -> Self {
        let backend = FakeBackend::new(native);
        let service = Arc::new(MemoryService::default());
        let workbench = Workbench::new(
            Box::new(backend.clone()),
            &AppConfig::default(),
            service.feed_endpoint(),
        );
        Self {
            workbench,
            service,
            backend,
            effects: Vec::new(),
        }
    }

    pub fn run(&mut self, command: Command) {
        let effects = self.workbench.handle(command);
        self.deliver(effects);
    }

    pub fn deliver(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Request(request) => {
                    let reply = execute(self.service.as_ref(), request);
                    queue.extend(self.workbench.handle(Command::Reply(reply)));
                }
                other => self.effects.push(other),
            }
        }
    }

    pub fn saw(&self, effect: &Effect) -> bool {
        self.effects.contains(effect)
    }
}
