// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video frame decoding.
//!
//! This module handles extracting individual frames from the local copy
//! of an uploaded video and converting them to RGBA buffers for the
//! renderer. Real decoding needs the `video-opencv` feature; without it
//! frames are flat placeholders at the video's resolution so prompts and
//! masks can still be worked with.

use crate::models::video::VideoSession;
use anyhow::Context;
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Errors from frame decoding.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(not(feature = "video-opencv"), allow(dead_code))]
pub enum MediaError {
    #[error("cannot open video {0}")]
    Open(String),

    #[error("frame {0} could not be decoded")]
    Frame(usize),

    #[cfg(feature = "video-opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A source of decoded video frames.
pub trait FrameSource {
    /// Decode one frame as RGBA at the video's native resolution.
    fn frame(&mut self, index: usize) -> Result<RgbaImage, MediaError>;
}

/// Neutral gray frames used when no decoder is available.
pub struct PlaceholderFrames {
    width: u32,
    height: u32,
}

const PLACEHOLDER_GRAY: u8 = 40;

impl PlaceholderFrames {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for PlaceholderFrames {
    fn frame(&mut self, _index: usize) -> Result<RgbaImage, MediaError> {
        Ok(RgbaImage::from_pixel(
            self.width.max(1),
            self.height.max(1),
            Rgba([PLACEHOLDER_GRAY, PLACEHOLDER_GRAY, PLACEHOLDER_GRAY, 255]),
        ))
    }
}

/// Open the best available frame source for a local video file.
pub fn open_frames(path: &Path, video: &VideoSession) -> Box<dyn FrameSource> {
    #[cfg(feature = "video-opencv")]
    {
        match opencv_frames::OpenCvFrames::open(path) {
            Ok(frames) => return Box::new(frames),
            Err(e) => log::error!("Falling back to placeholder frames: {}", e),
        }
    }
    #[cfg(not(feature = "video-opencv"))]
    log::info!(
        "Built without a video decoder, showing placeholder frames for {}",
        path.display()
    );
    Box::new(PlaceholderFrames::new(video.width, video.height))
}

/// Write a composited frame as PNG.
pub fn save_frame(image: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Exported frame to {}", path.display());
    Ok(())
}

#[cfg(feature = "video-opencv")]
mod opencv_frames {
    use super::{FrameSource, MediaError};
    use image::RgbaImage;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{imgproc, videoio};
    use std::path::Path;

    /// Frames decoded with OpenCV's video I/O.
    pub struct OpenCvFrames {
        capture: videoio::VideoCapture,
        /// Index of the frame the next `read` returns
        position: usize,
    }

    impl OpenCvFrames {
        pub fn open(path: &Path) -> Result<Self, MediaError> {
            let name = path.to_string_lossy();
            let capture = videoio::VideoCapture::from_file(&name, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(MediaError::Open(name.into_owned()));
            }
            log::info!("Decoding frames from {}", name);
            Ok(Self {
                capture,
                position: 0,
            })
        }
    }

    impl FrameSource for OpenCvFrames {
        fn frame(&mut self, index: usize) -> Result<RgbaImage, MediaError> {
            if index != self.position {
                self.capture
                    .set(videoio::CAP_PROP_POS_FRAMES, index as f64)?;
            }
            let mut bgr = Mat::default();
            if !self.capture.read(&mut bgr)? || bgr.empty() {
                return Err(MediaError::Frame(index));
            }
            self.position = index + 1;

            let mut rgba = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)?;
            let (width, height) = (rgba.cols() as u32, rgba.rows() as u32);
            let bytes = rgba.data_bytes()?.to_vec();
            RgbaImage::from_raw(width, height, bytes).ok_or(MediaError::Frame(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_matches_video_size() {
        let mut frames = PlaceholderFrames::new(32, 18);
        let frame = frames.frame(7).unwrap();
        assert_eq!(frame.dimensions(), (32, 18));
        assert_eq!(frame.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_save_frame_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let frame = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));

        save_frame(&frame, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, frame);
    }
}
