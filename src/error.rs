// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types surfaced to the operator.
//!
//! Every error is caught at the component that issued the call and shown
//! as a single notification. Nothing here is retried automatically.

use thiserror::Error;

/// Drawing or preview was attempted with no source activated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No active video or camera feed. Please upload a video or start the camera.")]
pub struct NoActiveSourceError;

/// A remote zone/tracking call failed or returned an error payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ZoneServiceError {
    pub message: String,
}

impl ZoneServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ZoneServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new("The zone service did not answer in time.")
        } else if err.is_connect() {
            Self::new("Could not reach the zone service.")
        } else {
            Self::new(format!("Zone service request failed: {}", err))
        }
    }
}

/// The camera (or a video file) could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAcquisitionError {
    /// Permission denied or no device present
    #[error("Could not access the camera: {reason}")]
    CameraUnavailable { reason: String },

    /// The camera is still held by another stream
    #[error("The camera is already in use")]
    #[cfg_attr(not(any(test, feature = "video-opencv")), allow(dead_code))]
    CameraBusy,

    /// The file could not be opened or its header read
    #[error("Could not open {path}: {reason}")]
    FileUnreadable { path: String, reason: String },
}

/// Any error the workbench reports back to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    NoActiveSource(#[from] NoActiveSourceError),

    #[error(transparent)]
    ZoneService(#[from] ZoneServiceError),

    #[error(transparent)]
    MediaAcquisition(#[from] MediaAcquisitionError),

    /// Writing the zone export failed; holds the rendered cause chain
    #[error("Export failed: {0}")]
    Export(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_operator_facing() {
        let err: Error = ZoneServiceError::new("Zone not found").into();
        assert_eq!(err.to_string(), "Zone not found");

        let err: Error = MediaAcquisitionError::CameraUnavailable {
            reason: "permission denied".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Could not access the camera: permission denied");

        let err: Error = NoActiveSourceError.into();
        assert!(err.to_string().starts_with("No active video"));

        let err: Error = MediaAcquisitionError::CameraBusy.into();
        assert_eq!(err.to_string(), "The camera is already in use");
    }
}
