// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Segmentation masks.
//!
//! The backend encodes a mask as a 3D stack indexed by object, a 2D
//! grid, or a flattened square grid. [`WireMask`] captures those three
//! shapes exactly as they arrive; they are decoded once into the dense
//! row-major [`MaskGrid`] that the rest of the client works with.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Errors produced while decoding backend masks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaskError {
    #[error("mask is empty")]
    Empty,

    #[error("mask row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("flat mask of {len} cells is not a square grid")]
    NotSquare { len: usize },

    #[error("object index {0} is out of range")]
    ObjectIndex(u32),

    #[error("mask data has {len} cells, expected {width}x{height}")]
    SizeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },
}

/// A single mask cell. Backends send numbers or booleans.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "CellRepr")]
pub struct Cell(pub f32);

#[derive(Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Number(f32),
    Flag(bool),
}

impl From<CellRepr> for Cell {
    fn from(repr: CellRepr) -> Self {
        match repr {
            CellRepr::Number(value) => Cell(value),
            CellRepr::Flag(true) => Cell(1.0),
            CellRepr::Flag(false) => Cell(0.0),
        }
    }
}

/// A mask exactly as the backend encoded it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireMask {
    /// `[object][row][col]`
    Stack(Vec<Vec<Vec<Cell>>>),
    /// `[row][col]`
    Grid(Vec<Vec<Cell>>),
    /// `[row * side + col]`, square
    Flat(Vec<Cell>),
}

/// Dense occupancy/probability grid in source video resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl MaskGrid {
    /// Build a grid from row-major data.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty);
        }
        if data.len() != width * height {
            return Err(MaskError::SizeMismatch {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode a wire mask. `object_index` is the 0-based layer used for
    /// stacked masks; a missing layer falls back to the first one.
    pub fn from_wire(wire: &WireMask, object_index: usize) -> Result<Self, MaskError> {
        match wire {
            WireMask::Stack(layers) => {
                let layer = layers
                    .get(object_index)
                    .or_else(|| layers.first())
                    .ok_or(MaskError::Empty)?;
                Self::from_rows(layer)
            }
            WireMask::Grid(rows) => Self::from_rows(rows),
            WireMask::Flat(cells) => {
                let side = (cells.len() as f64).sqrt().floor() as usize;
                if cells.is_empty() {
                    return Err(MaskError::Empty);
                }
                if side * side != cells.len() {
                    return Err(MaskError::NotSquare { len: cells.len() });
                }
                Self::new(side, side, cells.iter().map(|c| c.0).collect())
            }
        }
    }

    fn from_rows(rows: &[Vec<Cell>]) -> Result<Self, MaskError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(width * rows.len());
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(MaskError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            data.extend(cells.iter().map(|c| c.0));
        }
        Self::new(width, rows.len(), data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at a cell, zero outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[y * self.width + x]
    }

    /// Whether the cell belongs to the object.
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.get(x, y) > 0.0
    }

    /// Number of occupied cells.
    pub fn coverage(&self) -> usize {
        self.data.iter().filter(|v| **v > 0.0).count()
    }
}

/// Masks as they arrive on the wire: frame -> 0-based object index -> mask.
pub type WireFrameMasks = BTreeMap<usize, BTreeMap<u32, WireMask>>;

/// Decoded masks keyed by frame, then by 1-based object id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMasks {
    frames: BTreeMap<usize, BTreeMap<u32, MaskGrid>>,
}

impl FrameMasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a backend mask batch, converting wire object indices to ids.
    pub fn from_wire(wire: &WireFrameMasks) -> Result<Self, MaskError> {
        let mut masks = Self::new();
        for (&frame, objects) in wire {
            for (&index, mask) in objects {
                let id = index.checked_add(1).ok_or(MaskError::ObjectIndex(index))?;
                let grid = MaskGrid::from_wire(mask, index as usize)?;
                log::debug!(
                    "Decoded mask for frame {}, object {}: {}x{}, {} cells set",
                    frame,
                    id,
                    grid.width(),
                    grid.height(),
                    grid.coverage()
                );
                masks.insert(frame, id, grid);
            }
        }
        Ok(masks)
    }

    pub fn insert(&mut self, frame: usize, object_id: u32, grid: MaskGrid) {
        self.frames.entry(frame).or_default().insert(object_id, grid);
    }

    /// Overlay another batch, replacing masks for the same frame and object.
    pub fn merge(&mut self, other: FrameMasks) {
        for (frame, objects) in other.frames {
            self.frames.entry(frame).or_default().extend(objects);
        }
    }

    pub fn get(&self, frame: usize, object_id: u32) -> Option<&MaskGrid> {
        self.frames.get(&frame)?.get(&object_id)
    }

    /// All masks on a frame, ordered by object id.
    pub fn frame(&self, frame: usize) -> impl Iterator<Item = (u32, &MaskGrid)> {
        self.frames
            .get(&frame)
            .into_iter()
            .flat_map(|objects| objects.iter().map(|(id, grid)| (*id, grid)))
    }

    /// Drop `removed` and shift every higher object id down by one.
    pub fn remove_object(&mut self, removed: u32) {
        for objects in self.frames.values_mut() {
            let shifted = std::mem::take(objects)
                .into_iter()
                .filter(|(id, _)| *id != removed)
                .map(|(id, grid)| if id > removed { (id - 1, grid) } else { (id, grid) })
                .collect();
            *objects = shifted;
        }
        self.frames.retain(|_, objects| !objects.is_empty());
    }

    /// Number of frames with at least one mask.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireMask {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decode_shapes_agree() {
        let grid = MaskGrid::from_wire(&wire("[[0, 1], [1, 0]]"), 0).unwrap();
        let stack = MaskGrid::from_wire(&wire("[[[0, 1], [1, 0]]]"), 0).unwrap();
        let flat = MaskGrid::from_wire(&wire("[0, 1, 1, 0]"), 0).unwrap();

        assert_eq!(grid, stack);
        assert_eq!(grid, flat);
        assert_eq!(grid.coverage(), 2);
        assert!(grid.is_set(1, 0));
        assert!(!grid.is_set(0, 0));
    }

    #[test]
    fn test_stack_selects_object_layer() {
        let mask = wire("[[[1, 0]], [[0, 1]]]");
        assert!(MaskGrid::from_wire(&mask, 1).unwrap().is_set(1, 0));
        // Missing layer falls back to the first
        assert!(MaskGrid::from_wire(&mask, 7).unwrap().is_set(0, 0));
    }

    #[test]
    fn test_boolean_cells() {
        let grid = MaskGrid::from_wire(&wire("[[true, false]]"), 0).unwrap();
        assert_eq!(grid.coverage(), 1);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            MaskGrid::from_wire(&wire("[0, 1, 1]"), 0),
            Err(MaskError::NotSquare { len: 3 })
        );
        assert_eq!(
            MaskGrid::from_wire(&wire("[[0, 1], [1]]"), 0),
            Err(MaskError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(MaskGrid::from_wire(&wire("[]"), 0), Err(MaskError::Empty));
    }

    #[test]
    fn test_frame_masks_from_wire_uses_one_based_ids() {
        let batch: WireFrameMasks =
            serde_json::from_str(r#"{"3": {"0": [[1]], "1": [[0]]}}"#).unwrap();
        let masks = FrameMasks::from_wire(&batch).unwrap();

        assert!(masks.get(3, 1).unwrap().is_set(0, 0));
        assert!(masks.get(3, 2).is_some());
        assert!(masks.get(3, 0).is_none());
    }

    #[test]
    fn test_from_wire_rejects_max_object_index() {
        let batch: WireFrameMasks =
            serde_json::from_str(r#"{"0": {"4294967295": [[1]]}}"#).unwrap();
        assert_eq!(
            FrameMasks::from_wire(&batch),
            Err(MaskError::ObjectIndex(u32::MAX))
        );
    }

    #[test]
    fn test_remove_object_shifts_ids() {
        let one = MaskGrid::new(1, 1, vec![1.0]).unwrap();
        let two = MaskGrid::new(1, 1, vec![0.5]).unwrap();
        let three = MaskGrid::new(1, 1, vec![0.25]).unwrap();
        let mut masks = FrameMasks::new();
        masks.insert(0, 1, one.clone());
        masks.insert(0, 2, two);
        masks.insert(0, 3, three.clone());
        masks.insert(5, 2, MaskGrid::new(1, 1, vec![1.0]).unwrap());

        masks.remove_object(2);

        let ids: Vec<u32> = masks.frame(0).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(masks.get(0, 1), Some(&one));
        assert_eq!(masks.get(0, 2), Some(&three));
        assert_eq!(masks.frame_count(), 1);
    }

    #[test]
    fn test_merge_replaces_same_key() {
        let mut masks = FrameMasks::new();
        masks.insert(0, 1, MaskGrid::new(1, 1, vec![0.0]).unwrap());
        let mut update = FrameMasks::new();
        update.insert(0, 1, MaskGrid::new(1, 1, vec![1.0]).unwrap());
        update.insert(1, 1, MaskGrid::new(1, 1, vec![1.0]).unwrap());

        masks.merge(update);

        assert!(masks.get(0, 1).unwrap().is_set(0, 0));
        assert_eq!(masks.frame_count(), 2);
    }
}
