// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Uploaded video metadata and frame/time conversions.

use serde::{Deserialize, Serialize};

/// Metadata of a video accepted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSession {
    pub filename: String,
    pub frame_count: usize,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoSession {
    /// Index of the last frame.
    pub fn last_frame(&self) -> usize {
        self.frame_count.saturating_sub(1)
    }

    /// Presentation time of a frame in seconds.
    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        frame as f64 / self.fps
    }

    /// Frame shown at a playback time.
    pub fn seconds_to_frame(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.fps).floor() as usize;
        frame.min(self.last_frame())
    }

    /// Time display for a frame, e.g. `0:02`.
    pub fn frame_label(&self, frame: usize) -> String {
        format_time(self.frame_to_seconds(frame))
    }
}

/// Format seconds as `M:SS`.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> VideoSession {
        VideoSession {
            filename: "clip.mp4".to_string(),
            frame_count: 100,
            fps: 25.0,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_frame_label() {
        let video = session();
        assert_eq!(video.frame_label(0), "0:00");
        assert_eq!(video.frame_label(50), "0:02");
        assert_eq!(video.frame_label(99), "0:03");
    }

    #[test]
    fn test_format_time_minutes() {
        assert_eq!(format_time(61.9), "1:01");
        assert_eq!(format_time(600.0), "10:00");
    }

    #[test]
    fn test_seconds_to_frame_clamps() {
        let video = session();
        assert_eq!(video.seconds_to_frame(1.0), 25);
        assert_eq!(video.seconds_to_frame(100.0), 99);
        assert_eq!(video.seconds_to_frame(-1.0), 0);
    }
}
