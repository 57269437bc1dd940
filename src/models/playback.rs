// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame-accurate playback clock.

use super::video::VideoSession;
use std::time::Instant;

/// Play/pause state. While playing, every UI tick maps elapsed wall
/// time to a frame; playback stops by itself on the last frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Playback {
    started: Option<(Instant, usize)>,
}

impl Playback {
    pub fn is_playing(&self) -> bool {
        self.started.is_some()
    }

    /// Start playing from `frame`. Starting on the last frame rewinds.
    pub fn play(&mut self, video: &VideoSession, frame: usize, now: Instant) {
        let from = if frame >= video.last_frame() { 0 } else { frame };
        self.started = Some((now, from));
        log::debug!("Playback started at frame {}", from);
    }

    pub fn pause(&mut self) {
        self.started = None;
    }

    /// Frame to show at `now`, or `None` when paused.
    pub fn tick(&mut self, video: &VideoSession, now: Instant) -> Option<usize> {
        let (start, from) = self.started?;
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        let frame = video.seconds_to_frame(video.frame_to_seconds(from) + elapsed);
        if frame >= video.last_frame() {
            self.pause();
            log::debug!("Playback reached the last frame");
        }
        Some(frame)
    }
}
