//! Neighbor-locating traversal across cell and tree boundaries.
//!
//! A cell at level `L` has a global logical coordinate at that level:
//! `global = tree_position * B^L + local` on every active axis. Stepping by an
//! offset, mapping back to a tree and descending from that tree's root along
//! the base-`B` digits of the local coordinate finds the same-or-coarser cell
//! on the other side of the boundary.

use smallvec::SmallVec;

use crate::forest::Forest;
use crate::tree::child_offsets;

/// Per-axis step to a neighboring cell, each component in `-1..=1`.
pub type Offset = [i32; 3];

/// Which surrounding cells count as neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NeighborStencil {
  /// Cells sharing a face (2·D neighbors).
  #[default]
  VonNeumann,
  /// Cells sharing a face, edge or corner (3^D − 1 neighbors).
  Moore,
}

impl NeighborStencil {
  /// Offsets of this stencil in `dimension` dimensions.
  pub fn offsets(&self, dimension: usize) -> SmallVec<[Offset; 26]> {
    let span = |axis: usize| if axis < dimension { -1..=1 } else { 0..=0 };
    let mut offsets = SmallVec::new();
    for dz in span(2) {
      for dy in span(1) {
        for dx in span(0) {
          let nonzero = [dx, dy, dz].iter().filter(|&&d| d != 0).count();
          let keep = match self {
            Self::VonNeumann => nonzero == 1,
            Self::Moore => nonzero > 0,
          };
          if keep {
            offsets.push([dx, dy, dz]);
          }
        }
      }
    }
    offsets
  }
}

/// Cell located by a neighbor query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborRef {
  pub tree: usize,
  pub slot: usize,
  pub level: u32,
  pub is_leaf: bool,
}

impl Forest {
  /// Number of cells along `axis` of one tree at `level`.
  #[inline]
  fn cells_per_tree(&self, axis: usize, level: u32) -> i64 {
    if axis < self.config().dimension {
      (self.config().branch_factor as i64).pow(level)
    } else {
      1
    }
  }

  /// Global logical coordinate of a cell at its own level.
  pub fn global_coord(&self, tree: usize, slot: usize) -> Option<[i64; 3]> {
    let cell = self.tree(tree)?.cell(slot)?;
    let position = self.geometry().tree_position(tree);
    let local = cell.coord().axes();
    let level = cell.level();
    Some(std::array::from_fn(|axis| {
      position[axis] as i64 * self.cells_per_tree(axis, level) + local[axis] as i64
    }))
  }

  /// Same-or-coarser cell across `offset` from `(tree, slot)`.
  ///
  /// Returns None when the step leaves the forest domain. If the returned
  /// cell is not a leaf it sits at the same level as the source cell and
  /// finer leaves lie below it.
  pub fn neighbor(&self, tree: usize, slot: usize, offset: Offset) -> Option<NeighborRef> {
    let level = self.tree(tree)?.cell(slot)?.level();
    let global = self.global_coord(tree, slot)?;
    let counts = self.geometry().tree_counts;

    let mut position = [0usize; 3];
    let mut local = [0i64; 3];
    for axis in 0..3 {
      let per_tree = self.cells_per_tree(axis, level);
      let stepped = global[axis] + offset[axis] as i64;
      if stepped < 0 || stepped >= counts[axis] as i64 * per_tree {
        return None;
      }
      position[axis] = (stepped / per_tree) as usize;
      local[axis] = stepped % per_tree;
    }

    let target = self.geometry().tree_index(position)?;
    let target_tree = self.tree(target)?;
    let branch_factor = self.config().branch_factor as i64;
    let mut current = 0usize;
    for depth in 0..level {
      if target_tree.is_leaf(current) {
        break;
      }
      let shift = branch_factor.pow(level - depth - 1);
      let digit = |axis: usize| {
        if axis < self.config().dimension {
          ((local[axis] / shift) % branch_factor) as usize
        } else {
          0
        }
      };
      let b = branch_factor as usize;
      let index = digit(0) + b * (digit(1) + b * digit(2));
      current = target_tree.child_slot(current, index)?;
    }

    let cell = target_tree.cell(current)?;
    Some(NeighborRef {
      tree: target,
      slot: current,
      level: cell.level(),
      is_leaf: cell.is_leaf(),
    })
  }

  /// Deepest leaf level among the leaves across `offset` that touch the
  /// shared boundary of `(tree, slot)`.
  pub fn finest_level_across(&self, tree: usize, slot: usize, offset: Offset) -> Option<u32> {
    let neighbor = self.neighbor(tree, slot, offset)?;
    if neighbor.is_leaf {
      return Some(neighbor.level);
    }

    let target = self.tree(neighbor.tree)?;
    let branch_factor = self.config().branch_factor;
    // A child touches the boundary when its digit on every stepped axis sits
    // on the side facing the source cell.
    let touches = |index: usize| {
      let digits = child_offsets(index, branch_factor);
      (0..3).all(|axis| match offset[axis] {
        1 => digits[axis] == 0,
        -1 => digits[axis] as usize == branch_factor - 1,
        _ => true,
      })
    };

    let mut finest = neighbor.level;
    let mut stack = vec![neighbor.slot];
    while let Some(current) = stack.pop() {
      let Some(children) = target.children(current) else {
        finest = finest.max(target.cell(current)?.level());
        continue;
      };
      stack.extend(children.enumerate().filter(|(i, _)| touches(*i)).map(|(_, c)| c));
    }
    Some(finest)
  }

  /// Neighbors of a cell under `stencil`, skipping offsets outside the
  /// domain.
  pub fn neighbors(
    &self,
    tree: usize,
    slot: usize,
    stencil: NeighborStencil,
  ) -> SmallVec<[(Offset, NeighborRef); 6]> {
    stencil
      .offsets(self.config().dimension)
      .into_iter()
      .filter_map(|offset| self.neighbor(tree, slot, offset).map(|n| (offset, n)))
      .collect()
  }
}

#[cfg(test)]
#[path = "neighbors_test.rs"]
mod neighbors_test;
