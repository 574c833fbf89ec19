// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zone records.
//!
//! A zone is an operator-drawn rectangle identified by its label. Its
//! coordinates are always native pixels of the source it was drawn on.

use crate::util::geometry::NativeRect;
use serde::{Deserialize, Deserializer, Serialize};

/// A rectangular zone of interest, as stored by the zone service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub label: String,
    #[serde(rename = "topLeftX", deserialize_with = "pixel")]
    pub top_left_x: u32,
    #[serde(rename = "topLeftY", deserialize_with = "pixel")]
    pub top_left_y: u32,
    #[serde(rename = "bottomRightX", deserialize_with = "pixel")]
    pub bottom_right_x: u32,
    #[serde(rename = "bottomRightY", deserialize_with = "pixel")]
    pub bottom_right_y: u32,
    /// Path of the source the zone was drawn on (the camera sentinel for
    /// live sources). The list endpoint omits it.
    #[serde(rename = "video_path", default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,
}

/// Older records were saved with fractional pixels.
fn pixel<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().max(0.0) as u32)
}

impl Zone {
    /// Create a zone from a native rectangle, snapping edges to whole pixels.
    pub fn from_rect(label: String, rect: &NativeRect, source_id: String) -> Self {
        let rect = rect.rounded();
        Self {
            label,
            top_left_x: rect.left as u32,
            top_left_y: rect.top as u32,
            bottom_right_x: rect.right as u32,
            bottom_right_y: rect.bottom as u32,
            source_id,
        }
    }

    pub fn rect(&self) -> NativeRect {
        NativeRect {
            left: self.top_left_x as f64,
            top: self.top_left_y as f64,
            right: self.bottom_right_x as f64,
            bottom: self.bottom_right_y as f64,
        }
    }

    pub fn width(&self) -> u32 {
        self.bottom_right_x.saturating_sub(self.top_left_x)
    }

    pub fn height(&self) -> u32 {
        self.bottom_right_y.saturating_sub(self.top_left_y)
    }
}

/// Local persistence status of a cached zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    /// Drawn locally, save request still in flight
    Pending,
    /// Known to the zone service
    Committed,
}
