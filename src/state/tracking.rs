// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tracking preview controller.
//!
//! `NotStarted -> Starting -> Streaming`. Starting issues a start-session
//! request for the source path; the acknowledgement opens the annotated
//! feed, which the canvas shows in the same box as the zone overlay.
//! Switching sources stops the remote session and closes the feed.

use super::{Effect, Notice};
use crate::error::ZoneServiceError;
use crate::io::request::ServiceRequest;
use crate::models::source::TrackingSession;
use crate::util::geometry::NativeSize;
use crate::util::sequence::RequestSequence;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrackingState {
    #[default]
    NotStarted,
    Starting {
        source_path: String,
        native: NativeSize,
    },
    Streaming {
        session: TrackingSession,
        generation: u64,
    },
}

/// Sequence number used by warm-up starts; their acknowledgements never
/// change state.
const WARMUP_SEQ: u64 = 0;

#[derive(Debug)]
pub struct TrackingPreview {
    state: TrackingState,
    feed_endpoint: String,
    start_seq: RequestSequence,
    generation: u64,
}

impl TrackingPreview {
    pub fn new(feed_endpoint: String) -> Self {
        Self {
            state: TrackingState::NotStarted,
            feed_endpoint,
            start_seq: RequestSequence::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, TrackingState::Streaming { .. })
    }

    /// Feed generation currently shown, if streaming.
    pub fn streaming_generation(&self) -> Option<u64> {
        match &self.state {
            TrackingState::Streaming { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// Fire-and-forget start so the session is warm before the operator
    /// asks for it. The service treats repeated starts as no-ops.
    pub fn warm_up(&mut self, source_path: &str) -> Effect {
        log::debug!("Warming up tracker for {}", source_path);
        Effect::Request(ServiceRequest::StartTracking {
            seq: WARMUP_SEQ,
            video_path: source_path.to_string(),
            warmup: true,
        })
    }

    /// Start a session for `source_path`.
    pub fn start(&mut self, source_path: &str, native: NativeSize) -> Vec<Effect> {
        let seq = self.start_seq.next();
        log::info!("Starting tracking #{} for {}", seq, source_path);
        self.state = TrackingState::Starting {
            source_path: source_path.to_string(),
            native,
        };
        vec![Effect::Request(ServiceRequest::StartTracking {
            seq,
            video_path: source_path.to_string(),
            warmup: false,
        })]
    }

    /// Handle a start-session acknowledgement.
    pub fn on_started(
        &mut self,
        seq: u64,
        video_path: &str,
        warmup: bool,
        result: Result<String, ZoneServiceError>,
    ) -> Vec<Effect> {
        if warmup {
            match result {
                Ok(_) => log::debug!("Tracker warm for {}", video_path),
                Err(e) => log::warn!("Tracker warm-up failed (non-blocking): {}", e),
            }
            return Vec::new();
        }
        if !self.start_seq.is_current(seq) {
            log::debug!("Discarding stale tracking acknowledgement #{}", seq);
            return Vec::new();
        }
        let TrackingState::Starting { source_path, native } = &self.state else {
            return Vec::new();
        };
        match result {
            Ok(message) => {
                self.generation += 1;
                let session = TrackingSession {
                    source_path: source_path.clone(),
                    feed_endpoint: self.feed_endpoint.clone(),
                    native: *native,
                };
                log::info!("Tracking streaming ({}) from {}", message, session.feed_endpoint);
                let effects = vec![
                    Effect::OpenFeed {
                        endpoint: session.feed_endpoint.clone(),
                        generation: self.generation,
                    },
                    Effect::Render,
                ];
                self.state = TrackingState::Streaming {
                    session,
                    generation: self.generation,
                };
                effects
            }
            Err(e) => {
                log::error!("Failed to start tracking: {}", e);
                self.state = TrackingState::NotStarted;
                vec![Effect::Notify(Notice::Error(e.into()))]
            }
        }
    }

    /// Leave the current session: close the feed and ask the service to
    /// stop. Outstanding acknowledgements become stale.
    pub fn stop(&mut self) -> Vec<Effect> {
        self.start_seq.invalidate();
        match std::mem::take(&mut self.state) {
            TrackingState::NotStarted => Vec::new(),
            TrackingState::Starting { .. } => {
                log::info!("Tracking start abandoned");
                vec![Effect::Request(ServiceRequest::StopTracking)]
            }
            TrackingState::Streaming { session, .. } => {
                log::info!("Tracking stopped for {}", session.source_path);
                vec![Effect::CloseFeed, Effect::Request(ServiceRequest::StopTracking), Effect::Render]
            }
        }
    }

    /// The feed reader for `generation` ended on its own.
    pub fn on_feed_ended(&mut self, generation: u64, error: Option<String>) -> Vec<Effect> {
        if self.streaming_generation() != Some(generation) {
            return Vec::new();
        }
        self.state = TrackingState::NotStarted;
        match error {
            Some(message) => {
                log::warn!("Tracking feed ended: {}", message);
                let err = ZoneServiceError::new(format!("Tracking feed ended: {}", message));
                vec![Effect::Notify(Notice::Error(err.into())), Effect::Render]
            }
            None => vec![Effect::Render],
        }
    }
}
