//! CellCoord - immutable value type for a cell's logical position in its tree.
//!
//! Coordinates are at the cell's own level, not the finest level. Level 0 is
//! the tree root (coarsest), higher levels are finer.

/// Tree-local logical position of a cell.
///
/// Axes beyond the tree dimension stay 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CellCoord {
  /// X position at this cell's level
  pub x: u32,
  /// Y position at this cell's level
  pub y: u32,
  /// Z position at this cell's level
  pub z: u32,
  /// Depth below the tree root (0 = root)
  pub level: u32,
}

impl CellCoord {
  /// Tree root coordinate.
  pub const ROOT: Self = Self {
    x: 0,
    y: 0,
    z: 0,
    level: 0,
  };

  pub fn new(x: u32, y: u32, z: u32, level: u32) -> Self {
    Self { x, y, z, level }
  }

  /// Position as an array, indexed by axis.
  #[inline]
  pub fn axes(&self) -> [u32; 3] {
    [self.x, self.y, self.z]
  }

  /// Get child coordinate (finer detail: level + 1).
  ///
  /// Child index layout is x fastest: `index = cx + B*cy + B*B*cz`.
  /// For `B = 2` this matches octant bits 0 (X), 1 (Y), 2 (Z).
  pub fn child(&self, index: usize, branch_factor: usize) -> Self {
    let [cx, cy, cz] = child_offsets(index, branch_factor);
    let b = branch_factor as u32;
    Self {
      x: self.x * b + cx,
      y: self.y * b + cy,
      z: self.z * b + cz,
      level: self.level + 1,
    }
  }

  /// Get parent coordinate (coarser: level - 1).
  ///
  /// Returns None at the root.
  pub fn parent(&self, branch_factor: usize) -> Option<Self> {
    if self.level == 0 {
      return None;
    }
    let b = branch_factor as u32;
    Some(Self {
      x: self.x / b,
      y: self.y / b,
      z: self.z / b,
      level: self.level - 1,
    })
  }

  /// Index of this cell among its parent's children.
  pub fn child_index(&self, branch_factor: usize) -> Option<usize> {
    if self.level == 0 {
      return None;
    }
    let b = branch_factor as u32;
    let [x, y, z] = self.axes().map(|v| (v % b) as usize);
    Some(x + branch_factor * (y + branch_factor * z))
  }
}

/// Per-axis offsets of child `index` inside its parent.
#[inline]
pub fn child_offsets(index: usize, branch_factor: usize) -> [u32; 3] {
  let b = branch_factor;
  [
    (index % b) as u32,
    ((index / b) % b) as u32,
    ((index / (b * b)) % b) as u32,
  ]
}

/// Number of children of a subdivided cell: `B^D`.
#[inline]
pub fn children_per_cell(branch_factor: usize, dimension: usize) -> usize {
  branch_factor.pow(dimension as u32)
}

#[cfg(test)]
#[path = "coord_test.rs"]
mod coord_test;
