// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session state management.
//!
//! This module owns everything the user builds up while working on a
//! video: the uploaded video's metadata, the tracked objects and their
//! prompt points, the masks returned by the backend and the current
//! view. All mutations are synchronous; network work happens elsewhere
//! and feeds its results back through [`SessionState::store_masks`] and
//! friends.

use super::histogram::Histograms;
use super::mask::FrameMasks;
use super::object::{PointLabel, PromptPoint, TrackedObject};
use super::video::VideoSession;

/// Errors from state store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("no video is loaded")]
    NoVideo,

    #[error("object {0} does not exist")]
    UnknownObject(u32),

    #[error("cannot remove the last object, use Start Over to reset all objects")]
    LastObject,

    #[error("points can only be placed while selecting objects")]
    NotEditable,
}

/// What the workspace is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Placing prompt points; masks preview per frame.
    Setup,
    /// Reviewing tracked masks and histograms; placement disabled.
    Inspection,
}

/// Outcome of a canvas click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointEdit {
    Added(PromptPoint),
    Removed(PromptPoint),
}

/// Complete in-memory state of one working session.
#[derive(Debug, Clone)]
pub struct SessionState {
    video: Option<VideoSession>,
    objects: Vec<TrackedObject>,
    masks: FrameMasks,
    histograms: Option<Histograms>,
    current_frame: usize,
    active_object: Option<u32>,
    mode: ViewMode,
    /// Set while a backend request is in flight
    pub is_processing: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create an empty session with a single default object.
    pub fn new() -> Self {
        let mut state = Self {
            video: None,
            objects: Vec::new(),
            masks: FrameMasks::new(),
            histograms: None,
            current_frame: 0,
            active_object: None,
            mode: ViewMode::Setup,
            is_processing: false,
        };
        state.reset();
        state
    }

    /// Clear objects, points, masks and histograms, keeping the video.
    pub fn reset(&mut self) {
        self.objects = vec![TrackedObject::new(1)];
        self.masks.clear();
        self.histograms = None;
        self.current_frame = 0;
        self.active_object = Some(1);
        self.mode = ViewMode::Setup;
    }

    /// Start working on a freshly uploaded video.
    pub fn open_video(&mut self, video: VideoSession) {
        log::info!(
            "Opened {} ({} frames @ {:.2} fps, {}x{})",
            video.filename,
            video.frame_count,
            video.fps,
            video.width,
            video.height
        );
        self.video = Some(video);
        self.reset();
    }

    /// Forget the video and everything built on it.
    pub fn close_video(&mut self) {
        self.video = None;
        self.reset();
    }

    pub fn video(&self) -> Option<&VideoSession> {
        self.video.as_ref()
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn object(&self, id: u32) -> Option<&TrackedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn active_object(&self) -> Option<u32> {
        self.active_object
    }

    pub fn masks(&self) -> &FrameMasks {
        &self.masks
    }

    pub fn histograms(&self) -> Option<&Histograms> {
        self.histograms.as_ref()
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Append an object with the next sequential id and make it active.
    pub fn add_object(&mut self) -> u32 {
        let id = self.objects.len() as u32 + 1;
        self.objects.push(TrackedObject::new(id));
        self.active_object = Some(id);
        log::info!("Added object {}, total: {}", id, self.objects.len());
        id
    }

    /// Remove an object and renumber the rest so ids stay `1..=N`.
    pub fn remove_object(&mut self, id: u32) -> Result<(), SessionError> {
        let index = self
            .objects
            .iter()
            .position(|o| o.id == id)
            .ok_or(SessionError::UnknownObject(id))?;
        if self.objects.len() <= 1 {
            return Err(SessionError::LastObject);
        }

        self.objects.remove(index);
        for (i, object) in self.objects.iter_mut().enumerate() {
            object.renumber(i as u32 + 1);
        }
        self.masks.remove_object(id);

        self.active_object = match self.active_object {
            Some(active) if active > id => Some(active - 1),
            Some(active) if active != id => Some(active),
            _ => Some(1),
        };

        log::info!("Removed object {}, total: {}", id, self.objects.len());
        Ok(())
    }

    /// Make an object the target of new points.
    pub fn select_object(&mut self, id: u32) -> Result<(), SessionError> {
        if self.object(id).is_none() {
            return Err(SessionError::UnknownObject(id));
        }
        self.active_object = Some(id);
        Ok(())
    }

    /// Add a point for the active object on the current frame, or remove
    /// the active object's nearest point on this frame if one lies
    /// strictly within `hit_radius`.
    pub fn place_point(
        &mut self,
        x: f64,
        y: f64,
        label: PointLabel,
        hit_radius: f64,
    ) -> Result<PointEdit, SessionError> {
        if self.video.is_none() {
            return Err(SessionError::NoVideo);
        }
        if self.mode != ViewMode::Setup {
            return Err(SessionError::NotEditable);
        }

        let active = self.active_object;
        let id = match active {
            Some(id) if self.object(id).is_some() => id,
            _ => self.add_object(),
        };
        let frame = self.current_frame;
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(SessionError::UnknownObject(id))?;

        let hit = object
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.frame_index == frame)
            .map(|(i, p)| (i, p.distance_to(x, y)))
            .filter(|(_, distance)| *distance < hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let edit = match hit {
            Some(index) => PointEdit::Removed(object.points.remove(index)),
            None => {
                let point = PromptPoint {
                    x,
                    y,
                    label,
                    object_id: id,
                    frame_index: frame,
                };
                object.points.push(point);
                PointEdit::Added(point)
            }
        };
        log::debug!("Point edit on frame {}: {:?}", frame, edit);
        Ok(edit)
    }

    /// Every prompt point across objects, in object order.
    pub fn all_points(&self) -> impl Iterator<Item = &PromptPoint> {
        self.objects.iter().flat_map(|o| o.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.objects.iter().map(|o| o.points.len()).sum()
    }

    /// Merge masks from a single-frame request.
    pub fn store_masks(&mut self, masks: FrameMasks) {
        self.masks.merge(masks);
    }

    /// Replace all masks with a full tracking result.
    pub fn replace_masks(&mut self, masks: FrameMasks) {
        log::info!("Stored masks for {} frames", masks.frame_count());
        self.masks = masks;
    }

    pub fn set_histograms(&mut self, histograms: Option<Histograms>) {
        self.histograms = histograms;
    }

    /// Move to a frame, clamped to the video length.
    pub fn set_frame(&mut self, frame: usize) {
        self.current_frame = match &self.video {
            Some(video) => frame.min(video.last_frame()),
            None => 0,
        };
    }

    /// Replace all objects, e.g. from an imported prompt file. Objects
    /// are renumbered in order; existing masks no longer apply.
    pub fn replace_objects(&mut self, objects: Vec<TrackedObject>) {
        if objects.is_empty() {
            self.reset();
            return;
        }
        self.objects = objects;
        for (i, object) in self.objects.iter_mut().enumerate() {
            object.renumber(i as u32 + 1);
        }
        self.masks.clear();
        self.histograms = None;
        self.active_object = Some(1);
    }

    pub fn enter_inspection(&mut self) {
        self.mode = ViewMode::Inspection;
    }

    pub fn back_to_selection(&mut self) {
        self.mode = ViewMode::Setup;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mask::MaskGrid;
    use assert_matches::assert_matches;

    fn with_video() -> SessionState {
        let mut state = SessionState::new();
        state.open_video(VideoSession {
            filename: "clip.mp4".to_string(),
            frame_count: 100,
            fps: 25.0,
            width: 640,
            height: 480,
        });
        state
    }

    fn mask(value: f32) -> MaskGrid {
        MaskGrid::new(1, 1, vec![value]).unwrap()
    }

    #[test]
    fn test_new_session_has_default_object() {
        let state = SessionState::new();
        assert!(state.video().is_none());
        assert_eq!(state.objects().len(), 1);
        assert_eq!(state.objects()[0].id, 1);
        assert_eq!(state.objects()[0].label, "Object 1");
        assert_eq!(state.active_object(), Some(1));
    }

    #[test]
    fn test_remove_object_keeps_ids_dense() {
        let mut state = with_video();
        state.add_object();
        state.add_object();
        state.add_object();
        state.select_object(2).unwrap();
        state.place_point(10.0, 10.0, PointLabel::Positive, 10.0).unwrap();
        state.select_object(4).unwrap();
        state.place_point(20.0, 20.0, PointLabel::Negative, 10.0).unwrap();

        let mut masks = FrameMasks::new();
        masks.insert(0, 1, mask(0.1));
        masks.insert(0, 2, mask(0.2));
        masks.insert(0, 4, mask(0.4));
        state.store_masks(masks);

        state.remove_object(2).unwrap();

        let ids: Vec<u32> = state.objects().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(state.objects()[2].label, "Object 3");
        assert_eq!(state.objects()[2].points[0].object_id, 3);
        assert_eq!(state.masks().get(0, 3), Some(&mask(0.4)));
        assert_eq!(state.masks().get(0, 2), None);
        assert_eq!(state.active_object(), Some(3));
    }

    #[test]
    fn test_remove_active_object_selects_first() {
        let mut state = with_video();
        state.add_object();
        state.remove_object(2).unwrap();
        assert_eq!(state.active_object(), Some(1));
    }

    #[test]
    fn test_remove_last_object_fails() {
        let mut state = with_video();
        assert_matches!(state.remove_object(1), Err(SessionError::LastObject));
        assert_matches!(state.remove_object(9), Err(SessionError::UnknownObject(9)));
    }

    #[test]
    fn test_click_toggles_nearby_point() {
        let mut state = with_video();

        let added = state.place_point(100.0, 100.0, PointLabel::Positive, 10.0).unwrap();
        assert_matches!(added, PointEdit::Added(p) if p.label == PointLabel::Positive);

        let other = state.place_point(150.0, 100.0, PointLabel::Negative, 10.0).unwrap();
        assert_matches!(other, PointEdit::Added(p) if p.label == PointLabel::Negative);
        assert_eq!(state.point_count(), 2);

        let removed = state.place_point(104.0, 103.0, PointLabel::Negative, 10.0).unwrap();
        assert_matches!(removed, PointEdit::Removed(p) if p.x == 100.0);
        assert_eq!(state.point_count(), 1);
    }

    #[test]
    fn test_hit_radius_is_exclusive_and_per_frame() {
        let mut state = with_video();
        state.place_point(0.0, 0.0, PointLabel::Positive, 10.0).unwrap();

        // Exactly on the radius adds a new point
        let edge = state.place_point(10.0, 0.0, PointLabel::Positive, 10.0).unwrap();
        assert_matches!(edge, PointEdit::Added(_));

        // Same spot on another frame adds too
        state.set_frame(5);
        let elsewhere = state.place_point(0.0, 0.0, PointLabel::Positive, 10.0).unwrap();
        assert_matches!(elsewhere, PointEdit::Added(p) if p.frame_index == 5);
        assert_eq!(state.point_count(), 3);
    }

    #[test]
    fn test_place_point_requires_setup_mode() {
        let mut state = SessionState::new();
        assert_matches!(
            state.place_point(0.0, 0.0, PointLabel::Positive, 10.0),
            Err(SessionError::NoVideo)
        );

        let mut state = with_video();
        state.enter_inspection();
        assert_matches!(
            state.place_point(0.0, 0.0, PointLabel::Positive, 10.0),
            Err(SessionError::NotEditable)
        );
        state.back_to_selection();
        assert!(state.place_point(0.0, 0.0, PointLabel::Positive, 10.0).is_ok());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = with_video();
        state.add_object();
        state.place_point(5.0, 5.0, PointLabel::Positive, 10.0).unwrap();
        let mut masks = FrameMasks::new();
        masks.insert(3, 2, mask(1.0));
        state.replace_masks(masks);
        state.set_frame(40);
        state.enter_inspection();

        state.reset();

        assert_eq!(state.objects().len(), 1);
        assert_eq!(state.objects()[0].id, 1);
        assert_eq!(state.point_count(), 0);
        assert!(state.masks().is_empty());
        assert_eq!(state.current_frame(), 0);
        assert_eq!(state.mode(), ViewMode::Setup);
        assert!(state.video().is_some());
    }

    #[test]
    fn test_set_frame_clamps() {
        let mut state = with_video();
        state.set_frame(500);
        assert_eq!(state.current_frame(), 99);
    }

    #[test]
    fn test_replace_objects_renumbers() {
        let mut state = with_video();
        let mut imported = vec![TrackedObject::new(7), TrackedObject::new(9)];
        imported[1].points.push(PromptPoint {
            x: 1.0,
            y: 1.0,
            label: PointLabel::Positive,
            object_id: 9,
            frame_index: 0,
        });

        state.replace_objects(imported);

        let ids: Vec<u32> = state.objects().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(state.objects()[1].points[0].object_id, 2);
    }
}
