// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: backend API, video frames and prompt files.

pub mod api;
pub mod media;
pub mod serialization;
