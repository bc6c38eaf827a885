//! Color grid: a square board of cells that collect mixed results.
//!
//! Each filled cell remembers the color placed on it and the triadic
//! harmony of that color. Its label is drawn in one of the two companions,
//! alternating by cell index.

use crate::color::{ColorHarmony, Hsl, Rgb};

pub const DEFAULT_GRID_SIZE: usize = 6;

/// Largest accepted side length.
pub const MAX_GRID_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("cell {index} is outside a grid of {cells} cells")]
    OutOfBounds { index: usize, cells: usize },
    #[error("a grid of size {size} exceeds the maximum of {MAX_GRID_SIZE}")]
    TooLarge { size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub color: Rgb,
    pub harmony: ColorHarmony,
    pub label_color: Hsl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGrid {
    size: usize,
    cells: Vec<Option<GridCell>>,
}

impl Default for ColorGrid {
    fn default() -> Self {
        Self::square(DEFAULT_GRID_SIZE)
    }
}

impl ColorGrid {
    /// A `size` x `size` grid. A size of 0 falls back to
    /// [`DEFAULT_GRID_SIZE`]; anything above [`MAX_GRID_SIZE`] is refused.
    pub fn new(size: usize) -> Result<Self, GridError> {
        match size {
            0 => Ok(Self::default()),
            s if s > MAX_GRID_SIZE => Err(GridError::TooLarge { size }),
            s => Ok(Self::square(s)),
        }
    }

    fn square(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Display label of a cell, numbered from 1.
    pub fn label(index: usize) -> String {
        format!("Box {}", index + 1)
    }

    /// Paint `color` onto a cell, replacing whatever was there.
    pub fn place(&mut self, index: usize, color: Rgb) -> Result<&GridCell, GridError> {
        let cells = self.cells.len();
        let slot = self
            .cells
            .get_mut(index)
            .ok_or(GridError::OutOfBounds { index, cells })?;
        let harmony = ColorHarmony::of(color);
        Ok(slot.insert(GridCell {
            color,
            harmony,
            label_color: harmony.label_color(index),
        }))
    }

    pub fn cell(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    /// Filled cells with their index, in index order.
    pub fn filled(&self) -> impl Iterator<Item = (usize, &GridCell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i, c)))
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}
