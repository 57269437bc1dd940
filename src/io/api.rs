// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Segmentation backend client.
//!
//! Wraps the backend's HTTP endpoints (video upload, single-frame and
//! full-video mask computation, stored mask retrieval) behind the
//! [`SegmentationBackend`] trait. Masks are decoded into
//! [`FrameMasks`] here, so nothing past this module ever sees the
//! backend's ambiguous mask encodings or its 0-based object indices.

use crate::models::histogram::Histograms;
use crate::models::mask::{FrameMasks, MaskError, WireFrameMasks};
use crate::models::object::{PointLabel, PromptPoint};
use crate::models::video::VideoSession;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("backend error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The backend answered but reported a failure.
    #[error("{operation} failed: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// A mask in the response could not be decoded.
    #[error("invalid mask in response: {0}")]
    Mask(#[from] MaskError),

    #[error("{} is not a video file", .0.display())]
    NotVideo(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid backend URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },
}

/// A prompt point as the backend expects it, with a 0-based object index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WirePrompt {
    pub x: f64,
    pub y: f64,
    pub label: PointLabel,
    pub obj_id: u32,
    pub frame_idx: usize,
}

impl From<&PromptPoint> for WirePrompt {
    fn from(point: &PromptPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            label: point.label,
            obj_id: point.object_id.saturating_sub(1),
            frame_idx: point.frame_index,
        }
    }
}

/// Body of `POST /process-frame`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessFrameRequest {
    pub frame_idx: usize,
    pub prompts: Vec<WirePrompt>,
}

/// Body of `POST /process-video`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessVideoRequest {
    pub filename: String,
    pub prompts: Vec<WirePrompt>,
}

/// Response of `POST /upload`.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    filename: Option<String>,
    frames: Option<usize>,
    fps: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

impl UploadResponse {
    fn into_session(self) -> Result<VideoSession, ApiError> {
        if self.status != "success" {
            return Err(rejected("Upload", self.message));
        }
        match (self.filename, self.frames, self.fps, self.width, self.height) {
            (Some(filename), Some(frame_count), Some(fps), Some(width), Some(height)) => {
                Ok(VideoSession {
                    filename,
                    frame_count,
                    fps,
                    width,
                    height,
                })
            }
            _ => Err(rejected(
                "Upload",
                Some("response is missing video metadata".to_string()),
            )),
        }
    }
}

/// Response of `POST /process-frame` and `POST /process-video`.
#[derive(Debug, Deserialize)]
struct MaskResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    masks: WireFrameMasks,
    #[serde(default)]
    histograms: Option<Histograms>,
}

/// Response of `GET /get-masks/:filename`.
#[derive(Debug, Deserialize)]
struct StoredMasksResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    masks: WireFrameMasks,
}

/// Masks for every frame of the video, plus optional histograms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingResult {
    pub masks: FrameMasks,
    pub histograms: Option<Histograms>,
}

fn rejected(operation: &'static str, message: Option<String>) -> ApiError {
    ApiError::Rejected {
        operation,
        message: message.unwrap_or_else(|| "unknown error".to_string()),
    }
}

/// Operations the client needs from a segmentation backend.
pub trait SegmentationBackend: Send + Sync {
    /// Upload a video file and return its metadata.
    fn upload(&self, path: &Path) -> Result<VideoSession, ApiError>;

    /// Compute masks from the given prompts.
    fn process_frame(&self, request: &ProcessFrameRequest) -> Result<FrameMasks, ApiError>;

    /// Propagate prompts through the whole video.
    fn process_video(&self, request: &ProcessVideoRequest) -> Result<TrackingResult, ApiError>;

    /// Masks the backend stored for a video.
    fn stored_masks(&self, filename: &str) -> Result<FrameMasks, ApiError>;

    /// Where the backend serves the uploaded video.
    fn video_url(&self, filename: &str) -> String;
}

/// Check the file looks like a video before sending it anywhere.
pub fn ensure_video(path: &Path) -> Result<(), ApiError> {
    let is_video = mime_guess::from_path(path)
        .iter_raw()
        .any(|mime| mime.starts_with("video/"));
    if is_video {
        Ok(())
    } else {
        Err(ApiError::NotVideo(path.to_path_buf()))
    }
}

/// HTTP client for a segmentation backend.
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`, e.g. `http://host:8080`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Ensure the response has a success status code, turning anything
    /// else into [`ApiError::Status`] with the body text.
    fn ensure_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn parse_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response)?;
        Ok(response.json::<T>()?)
    }
}

impl SegmentationBackend for HttpBackend {
    fn upload(&self, path: &Path) -> Result<VideoSession, ApiError> {
        ensure_video(path)?;
        let form = multipart::Form::new()
            .file("file", path)
            .map_err(|source| ApiError::File {
                path: path.to_path_buf(),
                source,
            })?;

        log::info!("Uploading {}", path.display());
        let response = self
            .client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()?;

        let session = Self::parse_response::<UploadResponse>(response)?.into_session()?;
        log::info!("Upload accepted as {}", session.filename);
        Ok(session)
    }

    fn process_frame(&self, request: &ProcessFrameRequest) -> Result<FrameMasks, ApiError> {
        log::debug!(
            "Processing frame {} with {} prompts",
            request.frame_idx,
            request.prompts.len()
        );
        let response = self
            .client
            .post(self.endpoint(&["process-frame"]))
            .json(request)
            .send()?;

        let body: MaskResponse = Self::parse_response(response)?;
        if let Some(status) = body.status.as_deref() {
            if status != "success" {
                return Err(rejected("Frame processing", body.message));
            }
        }
        Ok(FrameMasks::from_wire(&body.masks)?)
    }

    fn process_video(&self, request: &ProcessVideoRequest) -> Result<TrackingResult, ApiError> {
        log::info!(
            "Tracking {} prompts through {}",
            request.prompts.len(),
            request.filename
        );
        let response = self
            .client
            .post(self.endpoint(&["process-video"]))
            .json(request)
            .send()?;

        let body: MaskResponse = Self::parse_response(response)?;
        if body.status.as_deref() != Some("success") {
            return Err(rejected("Processing", body.message));
        }
        Ok(TrackingResult {
            masks: FrameMasks::from_wire(&body.masks)?,
            histograms: body.histograms,
        })
    }

    fn stored_masks(&self, filename: &str) -> Result<FrameMasks, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["get-masks", filename]))
            .send()?;

        let body: StoredMasksResponse = Self::parse_response(response)?;
        if !body.success {
            return Err(rejected("Fetching masks", body.message));
        }
        Ok(FrameMasks::from_wire(&body.masks)?)
    }

    fn video_url(&self, filename: &str) -> String {
        self.endpoint(&["static", "videos", filename]).to_string()
    }
}
