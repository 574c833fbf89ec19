// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Source and session descriptions shared between the state machines.

use crate::util::geometry::{DisplaySize, NativeSize};

/// Which kind of source backs a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    VideoFile,
    Camera,
}

/// The drawing surface of the active source.
///
/// `buffer` is fixed to the source's intrinsic resolution; `display` is the
/// box the source is rendered into. Both are set once the source's metadata
/// is known, buffer first.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSurface {
    pub kind: SourceKind,
    /// Path sent to the zone service (the camera sentinel for live sources)
    pub source_id: String,
    pub buffer: NativeSize,
    pub display: DisplaySize,
}

/// A tracking session acknowledged by the analytics service.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    pub source_path: String,
    pub feed_endpoint: String,
    pub native: NativeSize,
}
