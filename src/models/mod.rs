// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: video metadata, objects, prompts, masks and session state.

pub mod histogram;
pub mod mask;
pub mod object;
pub mod playback;
pub mod session;
pub mod video;
