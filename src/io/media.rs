// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media sources (files and camera).
//!
//! This module defines the capability the source selector uses to open
//! and release media, plus the backends that implement it. The default
//! build only reads the frame size from the video container (`mp4` crate
//! for mp4/mov, the RIFF header for avi); the `video-opencv` feature adds
//! local playback and the camera through OpenCV.

use crate::error::MediaAcquisitionError;
use crate::util::geometry::NativeSize;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// A decoded RGBA frame at the source's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub size: NativeSize,
    pub rgba: Vec<u8>,
}

/// An open file or camera stream.
pub trait MediaStream {
    /// Intrinsic frame size, `None` until the metadata is known.
    fn intrinsic_size(&self) -> Option<NativeSize>;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Next frame due for display, if any.
    fn poll_frame(&mut self) -> Option<VideoFrame>;

    /// Stop every track and release the file or device.
    fn stop(&mut self);
}

/// Opens media streams. The camera is exclusive: a second camera stream
/// may only be opened after the first one was stopped.
pub trait MediaBackend {
    fn open_file(&mut self, path: &Path) -> Result<Box<dyn MediaStream>, MediaAcquisitionError>;

    fn open_camera(&mut self) -> Result<Box<dyn MediaStream>, MediaAcquisitionError>;
}

/// Backend for builds without a video decoder.
///
/// Only the intrinsic frame size is read, from the container header; the
/// canvas shows a blank box of that size until the tracking feed provides
/// the picture. There is no camera.
#[derive(Debug, Default)]
#[cfg_attr(feature = "video-opencv", allow(dead_code))]
pub struct ContainerBackend;

impl MediaBackend for ContainerBackend {
    fn open_file(&mut self, path: &Path) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
        let size = container_frame_size(path).map_err(|reason| MediaAcquisitionError::FileUnreadable {
            path: path.display().to_string(),
            reason,
        })?;
        log::info!("Opened {} ({}x{}, no local decoding)", path.display(), size.width, size.height);
        Ok(Box::new(BlankStream::new(size)))
    }

    fn open_camera(&mut self) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
        Err(MediaAcquisitionError::CameraUnavailable {
            reason: "this build has no camera support (enable the video-opencv feature)".into(),
        })
    }
}

/// Frame size stored in a video container's header.
pub fn container_frame_size(path: &Path) -> Result<NativeSize, String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let file = File::open(path).map_err(|e| e.to_string())?;
    let size = match extension.as_str() {
        "mp4" | "mov" => {
            let len = file.metadata().map_err(|e| e.to_string())?.len();
            mp4_frame_size(BufReader::new(file), len)?
        }
        "avi" => avi_frame_size(BufReader::new(file))?,
        other => return Err(format!("unsupported video type {:?}", other)),
    };
    if size.is_empty() {
        return Err("the container reports an empty frame size".into());
    }
    Ok(size)
}

/// Size of the first video track of an ISO media (mp4/mov) file.
fn mp4_frame_size<R: Read + Seek>(reader: R, len: u64) -> Result<NativeSize, String> {
    let mp4 = mp4::Mp4Reader::read_header(reader, len).map_err(|e| e.to_string())?;
    let mut tracks: Vec<&mp4::Mp4Track> = mp4
        .tracks()
        .values()
        .filter(|t| matches!(t.track_type(), Ok(mp4::TrackType::Video)))
        .collect();
    tracks.sort_by_key(|t| t.track_id());
    let track = tracks.first().ok_or("no video track")?;
    Ok(NativeSize::new(u32::from(track.width()), u32::from(track.height())))
}

const AVI_HEADER_SCAN: u64 = 64 * 1024;

/// Size from the `avih` main header of a RIFF AVI file.
fn avi_frame_size<R: Read>(reader: R) -> Result<NativeSize, String> {
    let mut head = Vec::new();
    reader
        .take(AVI_HEADER_SCAN)
        .read_to_end(&mut head)
        .map_err(|e| e.to_string())?;
    if head.len() < 12 || &head[0..4] != b"RIFF" || &head[8..12] != b"AVI " {
        return Err("not a RIFF AVI file".into());
    }
    let at = head
        .windows(4)
        .position(|w| w == b"avih")
        .ok_or("missing AVI main header")?;
    // dwWidth and dwHeight follow eight other dwords in the chunk body.
    let field = |offset: usize| -> Option<u32> {
        let start = at + 8 + offset;
        let bytes = head.get(start..start + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    };
    match (field(32), field(36)) {
        (Some(width), Some(height)) => Ok(NativeSize::new(width, height)),
        _ => Err("truncated AVI main header".into()),
    }
}

/// A stream with a known size that never yields a frame.
pub struct BlankStream {
    size: NativeSize,
    paused: bool,
}

impl BlankStream {
    pub fn new(size: NativeSize) -> Self {
        Self { size, paused: true }
    }
}

impl MediaStream for BlankStream {
    fn intrinsic_size(&self) -> Option<NativeSize> {
        Some(self.size)
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        None
    }

    fn stop(&mut self) {
        self.paused = true;
    }
}

/// Default backend for this build.
pub fn default_backend() -> Box<dyn MediaBackend> {
    #[cfg(feature = "video-opencv")]
    {
        Box::new(capture::OpenCvBackend::new(0))
    }
    #[cfg(not(feature = "video-opencv"))]
    {
        Box::new(ContainerBackend)
    }
}

/// File extensions offered in the open dialog; the zone service accepts
/// no others.
pub fn supported_extensions() -> &'static [&'static str] {
    &["mp4", "avi", "mov"]
}

#[cfg(feature = "video-opencv")]
pub mod capture {
    //! OpenCV-backed video files and camera.

    use super::{MediaBackend, MediaStream, VideoFrame};
    use crate::error::MediaAcquisitionError;
    use crate::util::geometry::NativeSize;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    pub struct OpenCvBackend {
        camera_index: i32,
        camera_held: Rc<Cell<bool>>,
    }

    impl OpenCvBackend {
        pub fn new(camera_index: i32) -> Self {
            Self {
                camera_index,
                camera_held: Rc::new(Cell::new(false)),
            }
        }
    }

    impl MediaBackend for OpenCvBackend {
        fn open_file(&mut self, path: &Path) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
            let unreadable = |reason: String| MediaAcquisitionError::FileUnreadable {
                path: path.display().to_string(),
                reason,
            };
            let cap = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
                .map_err(|e| unreadable(e.to_string()))?;
            if !cap.is_opened().map_err(|e| unreadable(e.to_string()))? {
                return Err(unreadable("no decoder accepted the file".into()));
            }
            Ok(Box::new(CaptureStream::new(cap, None)))
        }

        fn open_camera(&mut self) -> Result<Box<dyn MediaStream>, MediaAcquisitionError> {
            if self.camera_held.get() {
                return Err(MediaAcquisitionError::CameraBusy);
            }
            let unavailable = |reason: String| MediaAcquisitionError::CameraUnavailable { reason };
            let cap = VideoCapture::new(self.camera_index, videoio::CAP_ANY)
                .map_err(|e| unavailable(e.to_string()))?;
            if !cap.is_opened().map_err(|e| unavailable(e.to_string()))? {
                return Err(unavailable(format!("camera {} did not open", self.camera_index)));
            }
            self.camera_held.set(true);
            Ok(Box::new(CaptureStream::new(cap, Some(self.camera_held.clone()))))
        }
    }

    struct CaptureStream {
        cap: VideoCapture,
        size: Option<NativeSize>,
        interval: Duration,
        last_frame: Option<Instant>,
        paused: bool,
        camera_held: Option<Rc<Cell<bool>>>,
    }

    impl CaptureStream {
        fn new(cap: VideoCapture, camera_held: Option<Rc<Cell<bool>>>) -> Self {
            let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
            let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
            let fps = cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
            let fps = if fps > 0.0 { fps } else { 25.0 };
            let size = NativeSize::new(width, height);
            Self {
                cap,
                size: (!size.is_empty()).then_some(size),
                interval: Duration::from_secs_f64(1.0 / fps),
                last_frame: None,
                paused: true,
                camera_held,
            }
        }

        fn read(&mut self) -> opencv::Result<Option<VideoFrame>> {
            let mut mat = Mat::default();
            if !self.cap.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }
            let mut rgba = Mat::default();
            imgproc::cvt_color(&mat, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)?;
            let size = NativeSize::new(rgba.cols() as u32, rgba.rows() as u32);
            if self.size.is_none() {
                self.size = Some(size);
            }
            Ok(Some(VideoFrame {
                size,
                rgba: rgba.data_bytes()?.to_vec(),
            }))
        }
    }

    impl MediaStream for CaptureStream {
        fn intrinsic_size(&self) -> Option<NativeSize> {
            self.size
        }

        fn play(&mut self) {
            self.paused = false;
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn poll_frame(&mut self) -> Option<VideoFrame> {
            // The first frame is shown even while paused so there is
            // something to draw on.
            let due = match self.last_frame {
                None => true,
                Some(at) => !self.paused && at.elapsed() >= self.interval,
            };
            if !due {
                return None;
            }
            self.last_frame = Some(Instant::now());
            match self.read() {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Frame read failed: {}", e);
                    None
                }
            }
        }

        fn stop(&mut self) {
            self.paused = true;
            if let Err(e) = self.cap.release() {
                log::warn!("Failed to release capture: {}", e);
            }
            if let Some(held) = self.camera_held.take() {
                held.set(false);
            }
        }
    }
}
