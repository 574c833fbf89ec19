// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! HTTP client for the remote zone and tracking service.
//!
//! Calls are blocking and are made from background threads; see
//! `io::request` for how they are dispatched and answered.

use crate::config::AppConfig;
use crate::error::ZoneServiceError;
use crate::models::zone::Zone;
use reqwest::blocking::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Zone thresholds keyed by zone label.
pub type Thresholds = BTreeMap<String, u32>;

/// The remote operations the workbench relies on.
pub trait ZoneService: Send + Sync {
    /// Upload a local video, returning the path the service stored it under.
    fn upload_video(&self, path: &Path) -> Result<String, ZoneServiceError>;

    fn start_tracking(&self, video_path: &str) -> Result<String, ZoneServiceError>;

    fn stop_tracking(&self) -> Result<String, ZoneServiceError>;

    fn save_zone(&self, zone: &Zone) -> Result<String, ZoneServiceError>;

    fn list_zones(&self) -> Result<Vec<Zone>, ZoneServiceError>;

    fn rename_zone(&self, old_label: &str, new_label: &str) -> Result<String, ZoneServiceError>;

    fn delete_zone(&self, label: &str) -> Result<String, ZoneServiceError>;

    fn get_thresholds(&self) -> Result<Thresholds, ZoneServiceError>;

    fn set_thresholds(&self, thresholds: &Thresholds) -> Result<String, ZoneServiceError>;

    /// Endpoint of the continuous tracking image stream.
    fn feed_endpoint(&self) -> String;
}

/// `{message}` / `{error}` body returned by every mutating endpoint.
#[derive(Debug, Default, Deserialize)]
struct StatusReply {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    video_path: String,
}

#[derive(Serialize)]
struct VideoPathBody<'a> {
    video_path: &'a str,
}

#[derive(Serialize)]
struct RenameBody<'a> {
    old_label: &'a str,
    new_label: &'a str,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    label: &'a str,
}

/// Blocking HTTP implementation of [`ZoneService`].
///
/// The underlying client keeps a cookie store, so one login covers every
/// clone of the client.
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ServiceClient {
    pub fn new(config: &AppConfig) -> Result<Self, ZoneServiceError> {
        // No client-wide timeout: the tracking feed never ends. Regular
        // calls set their own.
        let http = Client::builder()
            .cookie_store(true)
            .timeout(None::<Duration>)
            .user_agent(concat!("zonewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in with a username and password form post.
    pub fn login(&self, username: &str, password: &str) -> Result<(), ZoneServiceError> {
        let response = self
            .http
            .post(self.url("/login"))
            .timeout(self.timeout)
            .form(&[("username", username), ("password", password)])
            .send()?;
        let response = check(response)?;
        // A successful login redirects away from the login page.
        if response.url().path().trim_end_matches('/') == "/login" {
            return Err(ZoneServiceError::new("Invalid username/password."));
        }
        log::info!("Logged in to {} as {}", self.base_url, username);
        Ok(())
    }

    /// Open the tracking feed, returning its content type and body reader.
    pub fn open_feed(&self) -> Result<(String, Response), ZoneServiceError> {
        let response = check(self.http.get(self.feed_endpoint()).send()?)?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok((content_type, response))
    }

    /// Open the live zone statistics event stream.
    pub fn open_stats(&self) -> Result<Response, ZoneServiceError> {
        let response = self
            .http
            .get(self.url("/stats_stream"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()?;
        check(response)
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ZoneServiceError> {
        let response = self
            .http
            .post(self.url(path))
            .timeout(self.timeout)
            .json(body)
            .send()?;
        status_message(check(response)?)
    }
}

/// Turn a non-success response into a `ZoneServiceError`, preferring the
/// service's own `{error}` text.
fn check(response: Response) -> Result<Response, ZoneServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

fn error_from_body(status: u16, body: &str) -> ZoneServiceError {
    let message = serde_json::from_str::<StatusReply>(body)
        .ok()
        .and_then(|reply| reply.error)
        .unwrap_or_else(|| format!("Zone service returned status {}", status));
    ZoneServiceError::new(message)
}

fn status_message(response: Response) -> Result<String, ZoneServiceError> {
    let reply: StatusReply = response.json().unwrap_or_default();
    match reply.error {
        Some(error) => Err(ZoneServiceError::new(error)),
        None => Ok(reply.message.unwrap_or_default()),
    }
}

impl ZoneService for ServiceClient {
    fn upload_video(&self, path: &Path) -> Result<String, ZoneServiceError> {
        let form = multipart::Form::new().file("video", path).map_err(|e| {
            ZoneServiceError::new(format!("Could not read {}: {}", path.display(), e))
        })?;
        // Uploads are large; give them far longer than a regular call.
        let response = self
            .http
            .post(self.url("/upload-video"))
            .timeout(self.timeout * 30)
            .multipart(form)
            .send()?;
        let reply: UploadReply = check(response)?.json()?;
        log::info!("Uploaded {} as {}", path.display(), reply.video_path);
        Ok(reply.video_path)
    }

    fn start_tracking(&self, video_path: &str) -> Result<String, ZoneServiceError> {
        self.post_json("/zm_start_tracking", &VideoPathBody { video_path })
    }

    fn stop_tracking(&self) -> Result<String, ZoneServiceError> {
        self.post_json("/zm_stop_tracking", &serde_json::json!({}))
    }

    fn save_zone(&self, zone: &Zone) -> Result<String, ZoneServiceError> {
        self.post_json("/save_zone", zone)
    }

    fn list_zones(&self) -> Result<Vec<Zone>, ZoneServiceError> {
        let response = self
            .http
            .get(self.url("/get_zones"))
            .timeout(self.timeout)
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn rename_zone(&self, old_label: &str, new_label: &str) -> Result<String, ZoneServiceError> {
        self.post_json("/edit_zone", &RenameBody { old_label, new_label })
    }

    fn delete_zone(&self, label: &str) -> Result<String, ZoneServiceError> {
        self.post_json("/delete_zone", &DeleteBody { label })
    }

    fn get_thresholds(&self) -> Result<Thresholds, ZoneServiceError> {
        let response = self
            .http
            .get(self.url("/get_thresholds"))
            .timeout(self.timeout)
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn set_thresholds(&self, thresholds: &Thresholds) -> Result<String, ZoneServiceError> {
        self.post_json("/set_thresholds", thresholds)
    }

    fn feed_endpoint(&self) -> String {
        self.url("/zm_feed")
    }
}
