// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Command processing and background backend tasks.
//!
//! The UI turns user input into [`Command`]s. Each command mutates the
//! [`SessionState`] synchronously and may start a backend task on a
//! worker thread. Task results come back over a channel and are applied
//! by [`Controller::poll`] on the UI thread, so the state only ever has
//! one owner. Every task is tagged with the generation it was started
//! in; cancelling bumps the generation and late results are dropped.

use crate::io::api::{
    ensure_video, ApiError, ProcessFrameRequest, ProcessVideoRequest, SegmentationBackend,
    TrackingResult, WirePrompt,
};
use crate::io::serialization::{self, PromptSet};
use crate::models::mask::FrameMasks;
use crate::models::object::PointLabel;
use crate::models::session::{PointEdit, SessionState, SessionError};
use crate::models::video::VideoSession;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// A user action.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload(PathBuf),
    PlacePoint { x: f64, y: f64, label: PointLabel },
    AddObject,
    RemoveObject(u32),
    SelectObject(u32),
    SeekFrame(usize),
    TrackObjects,
    FetchMasks,
    BackToSelection,
    StartOver,
    BackToUpload,
    ImportPrompts(PathBuf),
    ExportPrompts(PathBuf),
    Cancel,
}

/// Something the UI must react to beyond redrawing.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// A video was accepted; frames should be read from this local file.
    VideoOpened(PathBuf),
    VideoClosed,
}

/// A message for the user, shown until dismissed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

enum TaskOutput {
    Uploaded {
        path: PathBuf,
        result: Result<VideoSession, ApiError>,
    },
    FrameProcessed(Result<FrameMasks, ApiError>),
    Tracked(Result<TrackingResult, ApiError>),
    StoredMasks(Result<FrameMasks, ApiError>),
}

struct TaskEvent {
    generation: u64,
    output: TaskOutput,
}

/// Owns the session state and runs backend work off the UI thread.
pub struct Controller {
    state: SessionState,
    backend: Arc<dyn SegmentationBackend>,
    hit_radius: f64,
    generation: u64,
    revision: u64,
    sender: Sender<TaskEvent>,
    receiver: Receiver<TaskEvent>,
    local_video: Option<PathBuf>,
    updates: Vec<Update>,
    notices: Vec<Notice>,
}

impl Controller {
    pub fn new(backend: Arc<dyn SegmentationBackend>, hit_radius: f64) -> Self {
        let (sender, receiver) = channel();
        Self {
            state: SessionState::new(),
            backend,
            hit_radius,
            generation: 0,
            revision: 0,
            sender,
            receiver,
            local_video: None,
            updates: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Changes whenever the state does; used to skip redundant redraws.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_processing
    }

    /// Local file the current video was uploaded from.
    pub fn local_video(&self) -> Option<&PathBuf> {
        self.local_video.as_ref()
    }

    /// URL the backend serves the current video from.
    pub fn video_url(&self) -> Option<String> {
        self.state
            .video()
            .map(|video| self.backend.video_url(&video.filename))
    }

    pub fn take_updates(&mut self) -> Vec<Update> {
        std::mem::take(&mut self.updates)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.first()
    }

    pub fn dismiss_notice(&mut self) {
        if !self.notices.is_empty() {
            self.notices.remove(0);
        }
    }

    /// Apply a user action.
    pub fn dispatch(&mut self, command: Command) {
        log::debug!("Command: {:?}", command);
        self.revision += 1;

        // In-flight results are keyed by the current object ids
        let blocked_while_busy = matches!(
            command,
            Command::Upload(_)
                | Command::PlacePoint { .. }
                | Command::TrackObjects
                | Command::FetchMasks
                | Command::RemoveObject(_)
                | Command::ImportPrompts(_)
        );
        if blocked_while_busy && self.state.is_processing {
            log::debug!("Ignoring {:?} while a request is in flight", command);
            return;
        }

        match command {
            Command::Upload(path) => self.upload(path),
            Command::PlacePoint { x, y, label } => self.place_point(x, y, label),
            Command::AddObject => {
                self.state.add_object();
            }
            Command::RemoveObject(id) => {
                if let Err(e) = self.state.remove_object(id) {
                    self.report("Cannot remove object", &e);
                }
            }
            Command::SelectObject(id) => {
                if let Err(e) = self.state.select_object(id) {
                    self.report("Cannot select object", &e);
                }
            }
            Command::SeekFrame(frame) => self.state.set_frame(frame),
            Command::TrackObjects => self.track_objects(),
            Command::FetchMasks => self.fetch_masks(),
            Command::BackToSelection => self.state.back_to_selection(),
            Command::StartOver => {
                self.cancel();
                self.state.reset();
                log::info!("Started over");
            }
            Command::BackToUpload => {
                self.cancel();
                self.state.close_video();
                self.local_video = None;
                self.updates.push(Update::VideoClosed);
                log::info!("Returned to upload");
            }
            Command::ImportPrompts(path) => self.import_prompts(path),
            Command::ExportPrompts(path) => self.export_prompts(path),
            Command::Cancel => self.cancel(),
        }
    }

    /// Apply finished background tasks. Call once per UI frame.
    pub fn poll(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
        }
    }

    fn cancel(&mut self) {
        if self.state.is_processing {
            log::info!("Cancelled pending request");
        }
        self.generation += 1;
        self.state.is_processing = false;
    }

    fn upload(&mut self, path: PathBuf) {
        if let Err(e) = ensure_video(&path) {
            self.report("Please select a valid video file", &e);
            return;
        }
        self.spawn(move |backend| {
            let result = backend.upload(&path);
            TaskOutput::Uploaded { path, result }
        });
    }

    fn place_point(&mut self, x: f64, y: f64, label: PointLabel) {
        match self.state.place_point(x, y, label, self.hit_radius) {
            Ok(PointEdit::Added(p)) => log::info!("Added point at ({:.1}, {:.1})", p.x, p.y),
            Ok(PointEdit::Removed(p)) => log::info!("Removed point at ({:.1}, {:.1})", p.x, p.y),
            Err(SessionError::NotEditable) => return,
            Err(e) => {
                self.report("Cannot place point", &e);
                return;
            }
        }

        let request = ProcessFrameRequest {
            frame_idx: self.state.current_frame(),
            prompts: self.wire_prompts(),
        };
        self.spawn(move |backend| TaskOutput::FrameProcessed(backend.process_frame(&request)));
    }

    fn track_objects(&mut self) {
        let Some(video) = self.state.video() else {
            self.report("Cannot track objects", &SessionError::NoVideo);
            return;
        };
        let request = ProcessVideoRequest {
            filename: video.filename.clone(),
            prompts: self.wire_prompts(),
        };
        self.state.enter_inspection();
        self.spawn(move |backend| TaskOutput::Tracked(backend.process_video(&request)));
    }

    fn fetch_masks(&mut self) {
        let Some(video) = self.state.video() else {
            self.report("Cannot fetch masks", &SessionError::NoVideo);
            return;
        };
        let filename = video.filename.clone();
        self.spawn(move |backend| TaskOutput::StoredMasks(backend.stored_masks(&filename)));
    }

    fn import_prompts(&mut self, path: PathBuf) {
        match serialization::import(&path) {
            Ok(set) => {
                if let Some(video) = self.state.video() {
                    if video.filename != set.video {
                        log::warn!(
                            "Prompts in {} were placed on {}, applying to {}",
                            path.display(),
                            set.video,
                            video.filename
                        );
                    }
                }
                self.state.replace_objects(set.objects);
                log::info!(
                    "Imported {} objects from {}",
                    self.state.objects().len(),
                    path.display()
                );
            }
            Err(e) => self.report("Failed to import prompts", &e),
        }
    }

    fn export_prompts(&mut self, path: PathBuf) {
        let video = self
            .state
            .video()
            .map(|v| v.filename.clone())
            .unwrap_or_default();
        let set = PromptSet::new(video, self.state.objects().to_vec());
        match serialization::export(&set, &path) {
            Ok(()) => log::info!("Exported prompts to {}", path.display()),
            Err(e) => self.report("Failed to export prompts", &e),
        }
    }

    fn wire_prompts(&self) -> Vec<WirePrompt> {
        self.state.all_points().map(WirePrompt::from).collect()
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn SegmentationBackend) -> TaskOutput + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let sender = self.sender.clone();
        let generation = self.generation;
        self.state.is_processing = true;

        std::thread::spawn(move || {
            let output = job(backend.as_ref());
            // The controller may be gone by now; nothing to deliver to then.
            let _ = sender.send(TaskEvent { generation, output });
        });
    }

    fn apply(&mut self, event: TaskEvent) {
        if event.generation != self.generation {
            log::debug!("Dropping result of cancelled request");
            return;
        }
        self.state.is_processing = false;
        self.revision += 1;

        match event.output {
            TaskOutput::Uploaded { path, result } => match result {
                Ok(video) => {
                    self.state.open_video(video);
                    self.local_video = Some(path.clone());
                    self.updates.push(Update::VideoOpened(path));
                }
                Err(e) => self.report("Upload failed", &e),
            },
            TaskOutput::FrameProcessed(result) => match result {
                Ok(masks) if masks.is_empty() => log::warn!("Backend returned no masks"),
                Ok(masks) => {
                    log::debug!("Received masks for {} frames", masks.frame_count());
                    self.state.store_masks(masks);
                }
                Err(e) => self.report("Error processing frame", &e),
            },
            TaskOutput::Tracked(result) => match result {
                Ok(TrackingResult { masks, histograms }) => {
                    self.state.replace_masks(masks);
                    self.state.set_histograms(histograms);
                }
                Err(e) => {
                    self.state.back_to_selection();
                    self.report("Error processing video", &e);
                }
            },
            TaskOutput::StoredMasks(result) => match result {
                Ok(masks) => self.state.replace_masks(masks),
                Err(e) => self.report("Error fetching masks", &e),
            },
        }
    }

    /// Log an error and queue it for the user.
    pub fn report(&mut self, title: &str, error: &dyn std::fmt::Display) {
        log::error!("{}: {}", title, error);
        self.notices.push(Notice {
            title: title.to_string(),
            message: error.to_string(),
        });
    }

    /// Block until no request is in flight, applying results as they come.
    #[cfg(test)]
    fn wait_idle(&mut self) {
        use std::time::Duration;
        while self.state.is_processing {
            match self.receiver.recv_timeout(Duration::from_secs(5)) {
                Ok(event) => self.apply(event),
                Err(_) => panic!("backend task did not finish"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mask::MaskGrid;
    use crate::models::session::ViewMode;
    use std::path::Path;
    use std::sync::Mutex;

    /// In-memory backend that records requests.
    #[derive(Default)]
    struct FakeBackend {
        fail: bool,
        frame_requests: Mutex<Vec<ProcessFrameRequest>>,
        video_requests: Mutex<Vec<ProcessVideoRequest>>,
    }

    impl FakeBackend {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn error(&self) -> ApiError {
            ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            }
        }

        fn mask_for(prompts: &[WirePrompt]) -> FrameMasks {
            let mut masks = FrameMasks::new();
            for prompt in prompts {
                masks.insert(
                    prompt.frame_idx,
                    prompt.obj_id + 1,
                    MaskGrid::new(1, 1, vec![1.0]).unwrap(),
                );
            }
            masks
        }
    }

    impl SegmentationBackend for FakeBackend {
        fn upload(&self, path: &Path) -> Result<VideoSession, ApiError> {
            if self.fail {
                return Err(self.error());
            }
            Ok(VideoSession {
                filename: path.file_name().unwrap().to_string_lossy().into_owned(),
                frame_count: 100,
                fps: 25.0,
                width: 640,
                height: 480,
            })
        }

        fn process_frame(&self, request: &ProcessFrameRequest) -> Result<FrameMasks, ApiError> {
            self.frame_requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(self.error());
            }
            Ok(Self::mask_for(&request.prompts))
        }

        fn process_video(&self, request: &ProcessVideoRequest) -> Result<TrackingResult, ApiError> {
            self.video_requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(self.error());
            }
            let mut masks = FrameMasks::new();
            for frame in 0..100 {
                masks.insert(frame, 1, MaskGrid::new(1, 1, vec![1.0]).unwrap());
            }
            Ok(TrackingResult {
                masks,
                histograms: None,
            })
        }

        fn stored_masks(&self, _filename: &str) -> Result<FrameMasks, ApiError> {
            if self.fail {
                return Err(self.error());
            }
            let mut masks = FrameMasks::new();
            masks.insert(7, 1, MaskGrid::new(1, 1, vec![1.0]).unwrap());
            Ok(masks)
        }

        fn video_url(&self, filename: &str) -> String {
            format!("http://backend/static/videos/{}", filename)
        }
    }

    fn uploaded(backend: Arc<FakeBackend>) -> Controller {
        let mut controller = Controller::new(backend, 10.0);
        controller.dispatch(Command::Upload(PathBuf::from("/tmp/clip.mp4")));
        controller.wait_idle();
        controller
    }

    #[test]
    fn test_upload_opens_video() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));

        let video = controller.state().video().unwrap();
        assert_eq!(video.filename, "clip.mp4");
        assert_eq!(video.frame_label(50), "0:02");
        assert_eq!(
            controller.take_updates(),
            vec![Update::VideoOpened(PathBuf::from("/tmp/clip.mp4"))]
        );
        assert_eq!(
            controller.video_url().unwrap(),
            "http://backend/static/videos/clip.mp4"
        );
    }

    #[test]
    fn test_failed_upload_leaves_no_session() {
        let mut controller = uploaded(Arc::new(FakeBackend::failing()));

        assert!(controller.state().video().is_none());
        assert!(controller.take_updates().is_empty());
        assert!(!controller.is_busy());
        assert_eq!(controller.notice().unwrap().title, "Upload failed");
        controller.dismiss_notice();
        assert!(controller.notice().is_none());
    }

    #[test]
    fn test_non_video_rejected_before_upload() {
        let mut controller = Controller::new(Arc::new(FakeBackend::default()), 10.0);
        controller.dispatch(Command::Upload(PathBuf::from("notes.txt")));

        assert!(!controller.is_busy());
        assert!(controller.state().video().is_none());
        assert!(controller.notice().is_some());
    }

    #[test]
    fn test_point_sends_all_prompts_zero_based() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = uploaded(backend.clone());

        controller.dispatch(Command::PlacePoint {
            x: 10.0,
            y: 10.0,
            label: PointLabel::Positive,
        });
        controller.wait_idle();
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::SeekFrame(4));
        controller.dispatch(Command::PlacePoint {
            x: 50.0,
            y: 50.0,
            label: PointLabel::Negative,
        });
        controller.wait_idle();

        let requests = backend.frame_requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].frame_idx, 4);
        let ids: Vec<u32> = requests[1].prompts.iter().map(|p| p.obj_id).collect();
        assert_eq!(ids, vec![0, 1]);

        let masks = controller.state().masks();
        assert!(masks.get(0, 1).is_some());
        assert!(masks.get(4, 2).is_some());
    }

    #[test]
    fn test_failed_frame_keeps_masks() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = uploaded(backend);
        controller.dispatch(Command::FetchMasks);
        controller.wait_idle();
        assert!(controller.state().masks().get(7, 1).is_some());

        // Swap to a failing backend while keeping the session
        controller.backend = Arc::new(FakeBackend::failing());
        controller.dispatch(Command::PlacePoint {
            x: 1.0,
            y: 1.0,
            label: PointLabel::Positive,
        });
        controller.wait_idle();

        assert!(controller.state().masks().get(7, 1).is_some());
        assert_eq!(controller.state().point_count(), 1);
        assert_eq!(controller.notice().unwrap().title, "Error processing frame");
    }

    #[test]
    fn test_track_objects_enters_inspection() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = uploaded(backend.clone());
        controller.dispatch(Command::PlacePoint {
            x: 10.0,
            y: 10.0,
            label: PointLabel::Positive,
        });
        controller.wait_idle();

        controller.dispatch(Command::TrackObjects);
        assert_eq!(controller.state().mode(), ViewMode::Inspection);
        controller.wait_idle();

        assert_eq!(controller.state().masks().frame_count(), 100);
        let requests = backend.video_requests.lock().unwrap();
        assert_eq!(requests[0].filename, "clip.mp4");
        assert_eq!(requests[0].prompts.len(), 1);
        drop(requests);

        // Placement is disabled until going back
        controller.dispatch(Command::PlacePoint {
            x: 90.0,
            y: 90.0,
            label: PointLabel::Positive,
        });
        assert!(!controller.is_busy());
        assert_eq!(controller.state().point_count(), 1);

        controller.dispatch(Command::BackToSelection);
        assert_eq!(controller.state().mode(), ViewMode::Setup);
        assert_eq!(controller.state().masks().frame_count(), 100);
    }

    #[test]
    fn test_failed_tracking_returns_to_selection() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.backend = Arc::new(FakeBackend::failing());

        controller.dispatch(Command::TrackObjects);
        controller.wait_idle();

        assert_eq!(controller.state().mode(), ViewMode::Setup);
        assert_eq!(controller.notice().unwrap().title, "Error processing video");
    }

    #[test]
    fn test_remove_waits_for_pending_masks() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::PlacePoint {
            x: 10.0,
            y: 10.0,
            label: PointLabel::Positive,
        });
        assert!(controller.is_busy());

        // Renumbering now would leave the pending mask on a stale id
        controller.dispatch(Command::RemoveObject(1));
        controller.wait_idle();

        let state = controller.state();
        assert_eq!(state.objects().len(), 3);
        assert!(state.masks().get(0, 3).is_some());

        controller.dispatch(Command::RemoveObject(1));
        let state = controller.state();
        let ids: Vec<u32> = state.objects().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(state.masks().get(0, 2).is_some());
        assert!(state.masks().get(0, 3).is_none());
        assert_eq!(state.objects()[1].points[0].object_id, 2);
    }

    #[test]
    fn test_import_ignored_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.yaml");
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::ExportPrompts(path.clone()));
        controller.dispatch(Command::StartOver);

        controller.dispatch(Command::FetchMasks);
        controller.dispatch(Command::ImportPrompts(path.clone()));
        controller.wait_idle();
        assert_eq!(controller.state().objects().len(), 1);

        controller.dispatch(Command::ImportPrompts(path));
        assert_eq!(controller.state().objects().len(), 2);
    }

    #[test]
    fn test_start_over_restores_default_object() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::PlacePoint {
            x: 10.0,
            y: 10.0,
            label: PointLabel::Positive,
        });
        controller.wait_idle();
        assert!(!controller.state().masks().is_empty());

        controller.dispatch(Command::StartOver);

        let state = controller.state();
        assert_eq!(state.objects().len(), 1);
        assert_eq!(state.objects()[0].id, 1);
        assert_eq!(state.point_count(), 0);
        assert!(state.masks().is_empty());
        assert!(state.video().is_some());
    }

    #[test]
    fn test_cancel_drops_late_result() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.dispatch(Command::FetchMasks);
        assert!(controller.is_busy());
        controller.dispatch(Command::Cancel);
        assert!(!controller.is_busy());

        // Let the worker finish, then apply whatever it sent
        std::thread::sleep(std::time::Duration::from_millis(100));
        controller.poll();
        assert!(controller.state().masks().is_empty());
    }

    #[test]
    fn test_back_to_upload_clears_session() {
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.take_updates();

        controller.dispatch(Command::BackToUpload);

        assert!(controller.state().video().is_none());
        assert!(controller.local_video().is_none());
        assert_eq!(controller.take_updates(), vec![Update::VideoClosed]);
    }

    #[test]
    fn test_prompts_export_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        let mut controller = uploaded(Arc::new(FakeBackend::default()));
        controller.dispatch(Command::AddObject);
        controller.dispatch(Command::PlacePoint {
            x: 3.0,
            y: 4.0,
            label: PointLabel::Negative,
        });
        controller.wait_idle();
        controller.dispatch(Command::ExportPrompts(path.clone()));

        controller.dispatch(Command::StartOver);
        controller.dispatch(Command::ImportPrompts(path));

        let state = controller.state();
        assert_eq!(state.objects().len(), 2);
        assert_eq!(state.objects()[1].points[0].label, PointLabel::Negative);
        assert!(controller.notice().is_none());
    }
}
