// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It forwards user input to the [`Controller`],
//! drives playback and keeps the frame texture in sync with the session.

use crate::config::Config;
use crate::controller::{Command, Controller, Update};
use crate::io::media::{self, FrameSource};
use crate::models::playback::Playback;
use crate::models::session::ViewMode;
use crate::ui::{canvas, properties, timeline, toolbar};
use crate::util::composite::{compose_frame, OverlayStyle};
use image::RgbaImage;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];

/// What the current texture was rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RenderKey {
    revision: u64,
    frame: usize,
    opacity: f32,
}

/// Main application state.
pub struct SegtrackApp {
    controller: Controller,

    /// Overlay drawing settings
    style: OverlayStyle,

    playback: Playback,

    /// Decoder for the local copy of the uploaded video
    frames: Option<Box<dyn FrameSource>>,

    /// Texture showing the composited frame
    frame_texture: Option<egui::TextureHandle>,

    /// Last composited frame, kept for export
    composed: Option<RgbaImage>,

    rendered: Option<RenderKey>,
}

impl SegtrackApp {
    /// Create the application, optionally uploading a video right away.
    pub fn new(controller: Controller, config: &Config, video: Option<PathBuf>) -> Self {
        let mut app = Self {
            controller,
            style: OverlayStyle {
                opacity: config.mask_opacity,
                marker_radius: config.marker_radius,
            },
            playback: Playback::default(),
            frames: None,
            frame_texture: None,
            composed: None,
            rendered: None,
        };
        if let Some(path) = video {
            app.controller.dispatch(Command::Upload(path));
        }
        app
    }

    fn apply_updates(&mut self) {
        for update in self.controller.take_updates() {
            self.playback.pause();
            self.frame_texture = None;
            self.composed = None;
            self.rendered = None;
            match update {
                Update::VideoOpened(path) => {
                    self.frames = self
                        .controller
                        .state()
                        .video()
                        .map(|video| media::open_frames(&path, video));
                    if let Some(url) = self.controller.video_url() {
                        log::info!("Backend serves the video at {}", url);
                    }
                }
                Update::VideoClosed => self.frames = None,
            }
        }
    }

    /// Re-composite the frame when the session, frame or opacity changed.
    fn refresh_frame(&mut self, ctx: &egui::Context) {
        let state = self.controller.state();
        let key = RenderKey {
            revision: self.controller.revision(),
            frame: state.current_frame(),
            opacity: self.style.opacity,
        };
        if self.rendered == Some(key) {
            return;
        }
        let Some(frames) = self.frames.as_mut() else {
            return;
        };

        let decoded = match frames.frame(key.frame) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to decode frame {}: {}", key.frame, e);
                self.rendered = Some(key);
                return;
            }
        };
        let composed = compose_frame(&decoded, state, &self.style);

        let size = [composed.width() as usize, composed.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, composed.as_raw());
        match self.frame_texture.as_mut() {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.frame_texture =
                    Some(ctx.load_texture("video_frame", color_image, egui::TextureOptions::LINEAR));
            }
        }
        self.composed = Some(composed);
        self.rendered = Some(key);
    }

    fn toggle_playback(&mut self) {
        if self.playback.is_playing() {
            self.playback.pause();
            return;
        }
        let state = self.controller.state();
        if let Some(video) = state.video() {
            self.playback.play(video, state.current_frame(), Instant::now());
        }
    }

    fn tick_playback(&mut self, ctx: &egui::Context) {
        let Some(video) = self.controller.state().video().cloned() else {
            self.playback.pause();
            return;
        };
        if let Some(frame) = self.playback.tick(&video, Instant::now()) {
            if frame != self.controller.state().current_frame() {
                self.controller.dispatch(Command::SeekFrame(frame));
            }
            ctx.request_repaint();
        }
    }

    fn open_video_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Videos", VIDEO_EXTENSIONS)
            .pick_file()
        {
            self.controller.dispatch(Command::Upload(path));
        }
    }

    fn export_frame(&mut self) {
        let Some(image) = self.composed.as_ref() else {
            return;
        };
        let stem = self
            .controller
            .local_video()
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let name = format!("{}_{:05}.png", stem, self.controller.state().current_frame());
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(name)
            .save_file()
        {
            if let Err(e) = media::save_frame(image, &path) {
                self.controller.report("Failed to export frame", &e);
            }
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let has_video = self.controller.state().video().is_some();
        let idle = !self.controller.is_busy();

        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui
                    .add_enabled(idle, egui::Button::new("Open Video..."))
                    .clicked()
                {
                    self.open_video_dialog();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(has_video, egui::Button::new("Back to Upload"))
                    .clicked()
                {
                    self.controller.dispatch(Command::BackToUpload);
                    ui.close_menu();
                }
                ui.separator();
                if ui
                    .add_enabled(has_video && idle, egui::Button::new("Import Prompts..."))
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Prompts", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.controller.dispatch(Command::ImportPrompts(path));
                    }
                    ui.close_menu();
                }
                ui.menu_button("Export Prompts", |ui| {
                    for (label, filter, extensions, file_name) in [
                        ("Export as YAML...", "YAML", &["yaml", "yml"][..], "prompts.yaml"),
                        ("Export as JSON...", "JSON", &["json"][..], "prompts.json"),
                    ] {
                        if ui.button(label).clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter(filter, extensions)
                                .set_file_name(file_name)
                                .save_file()
                            {
                                self.controller.dispatch(Command::ExportPrompts(path));
                            }
                            ui.close_menu();
                        }
                    }
                });
                if ui
                    .add_enabled(self.composed.is_some(), egui::Button::new("Export Frame..."))
                    .clicked()
                {
                    self.export_frame();
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.controller.notice().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new(notice.title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(notice.message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.controller.dismiss_notice();
        }
    }
}

impl eframe::App for SegtrackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll();
        self.apply_updates();

        // Keep polling while a request is in flight
        if self.controller.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        self.tick_playback(ctx);

        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.controller.dispatch(Command::Upload(path));
        }

        if !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.toggle_playback();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, self.controller.state(), &mut self.style.opacity)
            })
            .inner;

        match toolbar_action {
            toolbar::ToolbarAction::AddObject => self.controller.dispatch(Command::AddObject),
            toolbar::ToolbarAction::StartOver => self.controller.dispatch(Command::StartOver),
            toolbar::ToolbarAction::TrackObjects => {
                self.playback.pause();
                self.controller.dispatch(Command::TrackObjects);
            }
            toolbar::ToolbarAction::FetchMasks => self.controller.dispatch(Command::FetchMasks),
            toolbar::ToolbarAction::BackToSelection => {
                self.controller.dispatch(Command::BackToSelection)
            }
            toolbar::ToolbarAction::Cancel => self.controller.dispatch(Command::Cancel),
            toolbar::ToolbarAction::None => {}
        }

        if let Some(video) = self.controller.state().video().cloned() {
            let frame = self.controller.state().current_frame();
            let timeline_action = egui::TopBottomPanel::bottom("timeline")
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    timeline::show(ui, &video, frame, self.playback.is_playing())
                })
                .inner;

            match timeline_action {
                timeline::TimelineAction::TogglePlay => self.toggle_playback(),
                timeline::TimelineAction::Seek(frame) => {
                    self.playback.pause();
                    self.controller.dispatch(Command::SeekFrame(frame));
                }
                timeline::TimelineAction::None => {}
            }

            let properties_action = egui::SidePanel::right("properties")
                .default_width(250.0)
                .show(ctx, |ui| properties::show(ui, self.controller.state()))
                .inner;

            match properties_action {
                properties::PropertiesAction::Select(id) => {
                    self.controller.dispatch(Command::SelectObject(id))
                }
                properties::PropertiesAction::Remove(id) => {
                    self.controller.dispatch(Command::RemoveObject(id))
                }
                properties::PropertiesAction::None => {}
            }
        }

        self.refresh_frame(ctx);

        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(ui, self.controller.state(), self.frame_texture.as_ref())
            })
            .inner;

        if let canvas::CanvasAction::Place { x, y, label } = canvas_action {
            if self.controller.state().mode() == ViewMode::Setup {
                self.playback.pause();
                self.controller.dispatch(Command::PlacePoint { x, y, label });
            }
        }

        self.notice_window(ctx);
    }
}
