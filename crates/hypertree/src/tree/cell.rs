//! Cell - one arena slot of a tree.

use std::ops::Range;

use super::CellCoord;

/// A cell slot. Children are referenced by the index of the first slot of
/// their contiguous block, the parent by slot index. No owning pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
  pub(crate) coord: CellCoord,
  pub(crate) parent: Option<usize>,
  pub(crate) children_base: Option<usize>,
}

impl Cell {
  pub(crate) fn root() -> Self {
    Self {
      coord: CellCoord::ROOT,
      parent: None,
      children_base: None,
    }
  }

  /// Depth below the tree root.
  #[inline]
  pub fn level(&self) -> u32 {
    self.coord.level
  }

  #[inline]
  pub fn coord(&self) -> CellCoord {
    self.coord
  }

  #[inline]
  pub fn parent(&self) -> Option<usize> {
    self.parent
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.children_base.is_none()
  }

  /// First child slot, None for leaves.
  #[inline]
  pub fn children_base(&self) -> Option<usize> {
    self.children_base
  }

  /// Child slot range given the tree's children-per-cell count.
  #[inline]
  pub fn children(&self, child_count: usize) -> Option<Range<usize>> {
    self.children_base.map(|base| base..base + child_count)
  }
}
