//! SourceGrid - the flat structured grid a forest is built from.
//!
//! Cell arrays are row-major with `x` fastest:
//! `index = x + nx * (y + ny * z)`.

use crate::bounds::DAabb3;
use crate::error::{HyperTreeError, Result};

/// One named per-cell scalar array of a source grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceArray {
  pub name: String,
  pub values: Vec<f64>,
}

/// Flat structured grid: per-axis cell counts, physical bounds and named
/// per-cell arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceGrid {
  /// Cells along x, y and z. Unused axes are 1.
  pub cell_counts: [usize; 3],
  /// Physical extent of the whole grid.
  pub bounds: DAabb3,
  /// Named per-cell arrays.
  pub arrays: Vec<SourceArray>,
}

impl SourceGrid {
  /// Grid without arrays.
  pub fn new(cell_counts: [usize; 3], bounds: DAabb3) -> Self {
    Self {
      cell_counts,
      bounds,
      arrays: Vec::new(),
    }
  }

  /// Attach an array given explicit values.
  pub fn with_array(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
    self.arrays.push(SourceArray {
      name: name.into(),
      values,
    });
    self
  }

  /// Attach an array computed from each cell's flat index.
  pub fn with_array_fn(self, name: impl Into<String>, f: impl Fn(usize) -> f64) -> Self {
    let values = (0..self.cell_count()).map(f).collect();
    self.with_array(name, values)
  }

  /// Total number of source cells.
  #[inline]
  pub fn cell_count(&self) -> usize {
    self.cell_counts.iter().product()
  }

  /// Flat index of cell `(x, y, z)`.
  #[inline]
  pub fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
    let [nx, ny, _] = self.cell_counts;
    x + nx * (y + ny * z)
  }

  /// Fail with `DimensionMismatch` if any array does not have one value per
  /// cell.
  pub fn check_arrays(&self) -> Result<()> {
    let expected = self.cell_count();
    match self.arrays.iter().find(|a| a.values.len() != expected) {
      Some(array) => Err(HyperTreeError::DimensionMismatch {
        name: array.name.clone(),
        expected,
        actual: array.values.len(),
      }),
      None => Ok(()),
    }
  }
}
