// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Prompt set serialization and deserialization.
//!
//! This module handles exporting and importing the tracked objects and
//! their prompt points in YAML and JSON formats, so a set of prompts can
//! be reapplied to the same video later.

use crate::models::object::TrackedObject;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Objects and prompts of one session, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    /// Backend filename of the video the prompts were placed on
    pub video: String,
    pub objects: Vec<TrackedObject>,
}

impl PromptSet {
    pub fn new(video: String, objects: Vec<TrackedObject>) -> Self {
        Self { video, objects }
    }
}

/// File formats a prompt set can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|s| s.to_str());
        match extension {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => bail!("Unsupported file extension: {:?}", extension),
        }
    }
}

/// Export a prompt set, choosing the format by extension.
pub fn export(data: &PromptSet, path: &Path) -> Result<()> {
    match Format::from_path(path)? {
        Format::Yaml => export_yaml(data, path),
        Format::Json => export_json(data, path),
    }
}

/// Import a prompt set, choosing the format by extension.
pub fn import(path: &Path) -> Result<PromptSet> {
    match Format::from_path(path)? {
        Format::Yaml => import_yaml(path),
        Format::Json => import_json(path),
    }
}

/// Export a prompt set to YAML format.
pub fn export_yaml(data: &PromptSet, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a prompt set to JSON format.
pub fn export_json(data: &PromptSet, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import a prompt set from YAML format.
pub fn import_yaml(path: &Path) -> Result<PromptSet> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import a prompt set from JSON format.
pub fn import_json(path: &Path) -> Result<PromptSet> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}
