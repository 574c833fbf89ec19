// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Service requests as values.
//!
//! The state machines never call the network themselves. They emit a
//! `ServiceRequest`; the app runs it on a background thread with
//! [`execute`] and feeds the `ServiceReply` back into the event loop.
//! Requests whose replies can race carry a sequence number.

use super::client::{Thresholds, ZoneService};
use crate::error::ZoneServiceError;
use crate::models::zone::Zone;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    UploadVideo { seq: u64, local_path: PathBuf },
    ListZones { seq: u64 },
    SaveZone { zone: Zone },
    RenameZone { old_label: String, new_label: String },
    DeleteZone { label: String },
    StartTracking { seq: u64, video_path: String, warmup: bool },
    StopTracking,
    GetThresholds { seq: u64 },
    SetThresholds { thresholds: Thresholds },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    VideoUploaded {
        seq: u64,
        local_path: PathBuf,
        result: Result<String, ZoneServiceError>,
    },
    ZonesListed {
        seq: u64,
        result: Result<Vec<Zone>, ZoneServiceError>,
    },
    ZoneSaved {
        label: String,
        result: Result<String, ZoneServiceError>,
    },
    ZoneRenamed {
        old_label: String,
        new_label: String,
        result: Result<String, ZoneServiceError>,
    },
    ZoneDeleted {
        label: String,
        result: Result<String, ZoneServiceError>,
    },
    TrackingStarted {
        seq: u64,
        video_path: String,
        warmup: bool,
        result: Result<String, ZoneServiceError>,
    },
    TrackingStopped {
        result: Result<String, ZoneServiceError>,
    },
    ThresholdsFetched {
        seq: u64,
        result: Result<Thresholds, ZoneServiceError>,
    },
    ThresholdsSaved {
        result: Result<String, ZoneServiceError>,
    },
}

/// Run one request against a service, blocking until it answers.
pub fn execute(service: &dyn ZoneService, request: ServiceRequest) -> ServiceReply {
    log::debug!("Executing {:?}", request);
    match request {
        ServiceRequest::UploadVideo { seq, local_path } => {
            let result = service.upload_video(&local_path);
            ServiceReply::VideoUploaded {
                seq,
                local_path,
                result,
            }
        }
        ServiceRequest::ListZones { seq } => ServiceReply::ZonesListed {
            seq,
            result: service.list_zones(),
        },
        ServiceRequest::SaveZone { zone } => ServiceReply::ZoneSaved {
            result: service.save_zone(&zone),
            label: zone.label,
        },
        ServiceRequest::RenameZone {
            old_label,
            new_label,
        } => ServiceReply::ZoneRenamed {
            result: service.rename_zone(&old_label, &new_label),
            old_label,
            new_label,
        },
        ServiceRequest::DeleteZone { label } => ServiceReply::ZoneDeleted {
            result: service.delete_zone(&label),
            label,
        },
        ServiceRequest::StartTracking {
            seq,
            video_path,
            warmup,
        } => ServiceReply::TrackingStarted {
            seq,
            result: service.start_tracking(&video_path),
            video_path,
            warmup,
        },
        ServiceRequest::StopTracking => ServiceReply::TrackingStopped {
            result: service.stop_tracking(),
        },
        ServiceRequest::GetThresholds { seq } => ServiceReply::ThresholdsFetched {
            seq,
            result: service.get_thresholds(),
        },
        ServiceRequest::SetThresholds { thresholds } => ServiceReply::ThresholdsSaved {
            result: service.set_thresholds(&thresholds),
        },
    }
}

/// Runs requests on background threads and delivers replies to a channel.
pub struct Dispatcher {
    service: Arc<dyn ZoneService>,
    replies: Sender<ServiceReply>,
    wake: Arc<dyn Fn() + Send + Sync>,
}

impl Dispatcher {
    pub fn new(
        service: Arc<dyn ZoneService>,
        replies: Sender<ServiceReply>,
        wake: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            service,
            replies,
            wake,
        }
    }

    /// Start a request without waiting for it.
    pub fn dispatch(&self, request: ServiceRequest) {
        let service = self.service.clone();
        let replies = self.replies.clone();
        let wake = self.wake.clone();
        std::thread::spawn(move || {
            let reply = execute(service.as_ref(), request);
            if replies.send(reply).is_ok() {
                wake();
            }
        });
    }
}
