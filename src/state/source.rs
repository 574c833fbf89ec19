// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Source selection.
//!
//! Exactly one source is active at a time. Activating a source first
//! releases the previous one (camera tracks stopped, file playback paused
//! and cleared), so the camera is never acquired twice. Once the new
//! source reports its intrinsic size, the drawing buffer is sized to it and
//! the display box to the width-capped size, in that order.

use crate::error::{MediaAcquisitionError, NoActiveSourceError};
use crate::io::media::{MediaBackend, MediaStream, VideoFrame};
use crate::models::source::{DrawingSurface, SourceKind};
use crate::util::geometry::{constrained_display_size, NativeSize};
use std::path::PathBuf;

/// The live source variant.
#[derive(Default)]
pub enum ActiveSource {
    #[default]
    None,
    VideoFile {
        local_path: PathBuf,
        /// Path the zone service knows the upload by
        remote_path: String,
        stream: Box<dyn MediaStream>,
    },
    Camera {
        stream: Box<dyn MediaStream>,
    },
}

impl ActiveSource {
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            ActiveSource::None => None,
            ActiveSource::VideoFile { .. } => Some(SourceKind::VideoFile),
            ActiveSource::Camera { .. } => Some(SourceKind::Camera),
        }
    }

    fn stream(&self) -> Option<&dyn MediaStream> {
        match self {
            ActiveSource::None => None,
            ActiveSource::VideoFile { stream, .. } | ActiveSource::Camera { stream } => Some(stream.as_ref()),
        }
    }

    fn stream_mut(&mut self) -> Option<&mut Box<dyn MediaStream>> {
        match self {
            ActiveSource::None => None,
            ActiveSource::VideoFile { stream, .. } | ActiveSource::Camera { stream } => Some(stream),
        }
    }
}

pub struct SourceSelector {
    backend: Box<dyn MediaBackend>,
    active: ActiveSource,
    surface: Option<DrawingSurface>,
    camera_source_id: String,
    max_display_width: f32,
}

impl SourceSelector {
    pub fn new(backend: Box<dyn MediaBackend>, camera_source_id: String, max_display_width: f32) -> Self {
        Self {
            backend,
            active: ActiveSource::None,
            surface: None,
            camera_source_id,
            max_display_width,
        }
    }

    pub fn kind(&self) -> Option<SourceKind> {
        self.active.kind()
    }

    /// Identifier zones and tracking sessions use for the active source.
    pub fn source_id(&self) -> Option<String> {
        match &self.active {
            ActiveSource::None => None,
            ActiveSource::VideoFile { remote_path, .. } => Some(remote_path.clone()),
            ActiveSource::Camera { .. } => Some(self.camera_source_id.clone()),
        }
    }

    /// The drawing surface, once the source's native size is known.
    pub fn get_active_surface(&self) -> Option<&DrawingSurface> {
        self.surface.as_ref()
    }

    pub fn require_surface(&self) -> Result<&DrawingSurface, NoActiveSourceError> {
        self.surface.as_ref().ok_or(NoActiveSourceError)
    }

    /// Release the active source's resources. Returns whether anything was
    /// active.
    pub fn deactivate(&mut self) -> bool {
        self.surface = None;
        match std::mem::take(&mut self.active) {
            ActiveSource::None => false,
            ActiveSource::Camera { mut stream } => {
                stream.stop();
                log::info!("Camera released");
                true
            }
            ActiveSource::VideoFile {
                local_path,
                mut stream,
                ..
            } => {
                stream.pause();
                stream.stop();
                log::info!("Closed {}", local_path.display());
                true
            }
        }
    }

    pub fn activate_video_file(&mut self, local_path: PathBuf, remote_path: String) -> Result<(), MediaAcquisitionError> {
        self.deactivate();
        let stream = self.backend.open_file(&local_path)?;
        log::info!("Activated {} (service path {})", local_path.display(), remote_path);
        self.active = ActiveSource::VideoFile {
            local_path,
            remote_path,
            stream,
        };
        Ok(())
    }

    pub fn activate_camera(&mut self) -> Result<(), MediaAcquisitionError> {
        self.deactivate();
        let stream = self.backend.open_camera()?;
        log::info!("Activated camera");
        self.active = ActiveSource::Camera { stream };
        Ok(())
    }

    /// Size the surface once the stream's metadata is available. Returns
    /// true on the call that makes the surface ready.
    pub fn poll_metadata(&mut self) -> bool {
        if self.surface.is_some() {
            return false;
        }
        let (Some(kind), Some(source_id)) = (self.kind(), self.source_id()) else {
            return false;
        };
        let Some(native) = self.active.stream().and_then(|s| s.intrinsic_size()) else {
            return false;
        };
        if native.is_empty() {
            return false;
        }
        self.size_surface(kind, source_id, native);
        if let Some(stream) = self.active.stream_mut() {
            stream.play();
        }
        true
    }

    fn size_surface(&mut self, kind: SourceKind, source_id: String, native: NativeSize) {
        // Buffer first: the native resolution, never the display size.
        let buffer = native;
        let display = constrained_display_size(buffer, self.max_display_width);
        log::info!(
            "Surface ready: buffer {}x{}, display {:.0}x{:.0}",
            buffer.width,
            buffer.height,
            display.width,
            display.height
        );
        self.surface = Some(DrawingSurface {
            kind,
            source_id,
            buffer,
            display,
        });
    }

    pub fn play(&mut self) {
        if let Some(stream) = self.active.stream_mut() {
            stream.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(stream) = self.active.stream_mut() {
            stream.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.active.stream().map_or(true, |s| s.is_paused())
    }

    pub fn poll_frame(&mut self) -> Option<VideoFrame> {
        self.active.stream_mut()?.poll_frame()
    }
}
