// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Client-side zone cache, synchronized with the zone service.
//!
//! Every mutation is keyed by label. New zones are shown immediately as
//! `Pending` and become `Committed` once the service accepts them; a
//! rejected save removes the pending entry again. Renames and deletes are
//! not applied locally, they trigger a refetch instead.

use super::{Effect, Notice};
use crate::error::ZoneServiceError;
use crate::io::client::Thresholds;
use crate::io::request::{ServiceReply, ServiceRequest};
use crate::models::zone::{Zone, ZoneStatus};
use crate::io::stats::LiveStats;
use crate::util::sequence::RequestSequence;
use std::collections::BTreeMap;

/// A zone in the local cache together with its persistence status.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedZone {
    pub zone: Zone,
    pub status: ZoneStatus,
}

#[derive(Debug, Default)]
pub struct ZoneStore {
    entries: Vec<CachedZone>,
    source_id: Option<String>,
    fetch_seq: RequestSequence,
    threshold_seq: RequestSequence,
    thresholds: Thresholds,
    /// Live people counts while tracking streams
    counts: BTreeMap<String, u32>,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CachedZone] {
        &self.entries
    }

    /// Snapshot of the zones to draw, in cache order.
    pub fn zones(&self) -> Vec<Zone> {
        self.entries.iter().map(|e| e.zone.clone()).collect()
    }

    #[cfg(test)]
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.zone.label.clone()).collect()
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.zone.label == label)
    }

    pub fn get(&self, label: &str) -> Option<&CachedZone> {
        self.entries.iter().find(|e| e.zone.label == label)
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn count(&self, label: &str) -> Option<u32> {
        self.counts.get(label).copied()
    }

    /// Whether the live count of `label` is above its threshold.
    pub fn exceeds_threshold(&self, label: &str) -> bool {
        match (self.count(label), self.thresholds.get(label)) {
            (Some(count), Some(&threshold)) => count > threshold,
            _ => false,
        }
    }

    /// Take in a statistics snapshot. Counts are replaced; thresholds the
    /// operator has not set here are filled in from the service.
    pub fn apply_live_stats(&mut self, stats: LiveStats) {
        let already_over: Vec<String> = self
            .counts
            .keys()
            .filter(|label| self.exceeds_threshold(label))
            .cloned()
            .collect();
        self.counts = stats.counts;
        for (label, value) in stats.thresholds {
            self.thresholds.entry(label).or_insert(value);
        }
        for (label, count) in &self.counts {
            if self.exceeds_threshold(label) && !already_over.contains(label) {
                log::warn!("Zone '{}' is over its threshold with {} people", label, count);
            }
        }
    }

    pub fn clear_counts(&mut self) {
        self.counts.clear();
    }

    /// Attach the cache to a new source (or none). The old cache is dropped
    /// and replies still in flight for it are ignored.
    pub fn bind_source(&mut self, source_id: Option<String>) {
        if !self.entries.is_empty() {
            log::info!("Dropping {} cached zones on source switch", self.entries.len());
        }
        self.entries.clear();
        self.thresholds.clear();
        self.counts.clear();
        self.fetch_seq.invalidate();
        self.threshold_seq.invalidate();
        self.source_id = source_id;
    }

    /// Request the server's full zone set.
    pub fn fetch_all(&mut self) -> ServiceRequest {
        ServiceRequest::ListZones {
            seq: self.fetch_seq.next(),
        }
    }

    /// Add a zone optimistically and request it be saved.
    pub fn create(&mut self, zone: Zone) -> ServiceRequest {
        log::info!(
            "Zone '{}' drawn at ({}, {})-({}, {})",
            zone.label,
            zone.top_left_x,
            zone.top_left_y,
            zone.bottom_right_x,
            zone.bottom_right_y
        );
        self.entries.push(CachedZone {
            zone: zone.clone(),
            status: ZoneStatus::Pending,
        });
        ServiceRequest::SaveZone { zone }
    }

    /// Request a label replacement. The cache is reconciled by the refetch
    /// that follows a successful rename.
    pub fn rename(&mut self, old_label: &str, new_label: &str) -> Result<ServiceRequest, ZoneServiceError> {
        let new_label = new_label.trim();
        if old_label.is_empty() || new_label.is_empty() {
            return Err(ZoneServiceError::new("Please select a zone and enter a new name."));
        }
        if old_label == new_label {
            return Err(ZoneServiceError::new("The new name is the same as the old one."));
        }
        if self.contains_label(new_label) {
            return Err(ZoneServiceError::new(format!("A zone named '{}' already exists.", new_label)));
        }
        Ok(ServiceRequest::RenameZone {
            old_label: old_label.to_string(),
            new_label: new_label.to_string(),
        })
    }

    /// Request deletion. The cache is reconciled by the refetch that follows.
    pub fn remove(&mut self, label: &str) -> ServiceRequest {
        ServiceRequest::DeleteZone {
            label: label.to_string(),
        }
    }

    pub fn fetch_thresholds(&mut self) -> ServiceRequest {
        ServiceRequest::GetThresholds {
            seq: self.threshold_seq.next(),
        }
    }

    /// Set one zone's population threshold.
    pub fn set_threshold(&mut self, label: &str, value: u32) -> ServiceRequest {
        self.thresholds.insert(label.to_string(), value);
        let mut thresholds = Thresholds::new();
        thresholds.insert(label.to_string(), value);
        ServiceRequest::SetThresholds { thresholds }
    }

    /// Replace committed entries with the server's set, keeping pending
    /// entries the server does not know about yet.
    fn replace_all(&mut self, zones: Vec<Zone>) {
        let source_id = self.source_id.clone().unwrap_or_default();
        let mut entries: Vec<CachedZone> = zones
            .into_iter()
            .map(|mut zone| {
                if zone.source_id.is_empty() {
                    zone.source_id = source_id.clone();
                }
                CachedZone {
                    zone,
                    status: ZoneStatus::Committed,
                }
            })
            .collect();
        let pending: Vec<CachedZone> = self
            .entries
            .drain(..)
            .filter(|e| e.status == ZoneStatus::Pending)
            .filter(|e| !entries.iter().any(|c| c.zone.label == e.zone.label))
            .collect();
        entries.extend(pending);
        self.entries = entries;
    }

    /// Apply a zone-related service reply.
    pub fn apply(&mut self, reply: ServiceReply) -> Vec<Effect> {
        match reply {
            ServiceReply::ZonesListed { seq, result } => {
                if !self.fetch_seq.is_current(seq) {
                    log::debug!("Discarding stale zone list #{}", seq);
                    return Vec::new();
                }
                match result {
                    Ok(zones) => {
                        log::info!("Fetched {} zones", zones.len());
                        self.replace_all(zones);
                        vec![Effect::Render]
                    }
                    Err(e) => {
                        log::error!("Failed to fetch zones: {}", e);
                        vec![Effect::Notify(Notice::Error(e.into()))]
                    }
                }
            }
            ServiceReply::ZoneSaved { label, result } => {
                let index = self
                    .entries
                    .iter()
                    .position(|e| e.zone.label == label && e.status == ZoneStatus::Pending);
                match result {
                    Ok(message) => {
                        log::info!("Zone '{}' saved: {}", label, message);
                        if let Some(i) = index {
                            self.entries[i].status = ZoneStatus::Committed;
                        }
                        vec![Effect::Render]
                    }
                    Err(e) => {
                        log::error!("Failed to save zone '{}': {}", label, e);
                        if let Some(i) = index {
                            self.entries.remove(i);
                        }
                        let err = ZoneServiceError::new(format!("Error saving zone '{}': {}", label, e.message));
                        vec![Effect::Render, Effect::Notify(Notice::Error(err.into()))]
                    }
                }
            }
            ServiceReply::ZoneRenamed {
                old_label,
                new_label,
                result,
            } => match result {
                Ok(message) => {
                    log::info!("Zone '{}' renamed to '{}'", old_label, new_label);
                    vec![Effect::Notify(Notice::Info(message)), Effect::Request(self.fetch_all())]
                }
                Err(e) => vec![Effect::Notify(Notice::Error(e.into()))],
            },
            ServiceReply::ZoneDeleted { label, result } => match result {
                Ok(message) => {
                    log::info!("Zone '{}' deleted", label);
                    self.thresholds.remove(&label);
                    vec![Effect::Notify(Notice::Info(message)), Effect::Request(self.fetch_all())]
                }
                Err(e) => vec![Effect::Notify(Notice::Error(e.into()))],
            },
            ServiceReply::ThresholdsFetched { seq, result } => {
                if !self.threshold_seq.is_current(seq) {
                    log::debug!("Discarding stale thresholds #{}", seq);
                    return Vec::new();
                }
                match result {
                    Ok(thresholds) => {
                        self.thresholds = thresholds;
                        Vec::new()
                    }
                    Err(e) => vec![Effect::Notify(Notice::Error(e.into()))],
                }
            }
            ServiceReply::ThresholdsSaved { result } => match result {
                Ok(_) => Vec::new(),
                Err(e) => vec![Effect::Notify(Notice::Error(e.into()))],
            },
            other => {
                log::warn!("Zone store ignoring unrelated reply {:?}", other);
                Vec::new()
            }
        }
    }
}
