// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate mapping and frame compositing helpers.

pub mod composite;
pub mod geometry;
