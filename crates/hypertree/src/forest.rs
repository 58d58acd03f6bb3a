//! Forest - ordered trees tiling a coarse structured domain.
//!
//! Each cell of the source grid becomes one tree root. Trees are stored in
//! the source grid's row-major order (`x` fastest), so tree index and source
//! cell index coincide.

use glam::DVec3;
use log::debug;

use crate::bounds::DAabb3;
use crate::config::ForestConfig;
use crate::error::{HyperTreeError, Result};
use crate::source::SourceGrid;
use crate::tree::{CellCoord, Tree};

/// Placement of the trees in space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForestGeometry {
  /// Trees along x, y and z. Axes beyond the dimension are 1.
  pub tree_counts: [usize; 3],
  /// Physical extent of the whole forest.
  pub bounds: DAabb3,
  /// Physical size of one tree root along each axis.
  pub tree_scale: DVec3,
}

impl ForestGeometry {
  /// Total number of trees.
  #[inline]
  pub fn tree_count(&self) -> usize {
    self.tree_counts.iter().product()
  }

  /// Grid position of tree `index`.
  #[inline]
  pub fn tree_position(&self, index: usize) -> [usize; 3] {
    let [nx, ny, _] = self.tree_counts;
    [index % nx, (index / nx) % ny, index / (nx * ny)]
  }

  /// Tree index at grid position, None outside the domain.
  #[inline]
  pub fn tree_index(&self, position: [usize; 3]) -> Option<usize> {
    let [nx, ny, nz] = self.tree_counts;
    let [x, y, z] = position;
    (x < nx && y < ny && z < nz).then(|| x + nx * (y + ny * z))
  }
}

/// A leaf as seen from the forest query surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafRef {
  /// Owning tree index.
  pub tree: usize,
  /// Slot inside the owning tree.
  pub slot: usize,
  /// Depth below the tree root.
  pub level: u32,
  /// Tree-local logical position.
  pub coord: CellCoord,
}

/// Collection of independently rooted trees over a coarse grid.
#[derive(Clone, Debug)]
pub struct Forest {
  config: ForestConfig,
  geometry: ForestGeometry,
  trees: Vec<Tree>,
}

impl Forest {
  /// Build one unrefined tree per source cell and copy every source array
  /// into the matching root slot.
  ///
  /// Fails before building any tree if an array length does not match the
  /// source cell count.
  pub fn from_source(source: &SourceGrid, config: ForestConfig) -> Result<Self> {
    let geometry = Self::check_geometry(source.cell_counts, source.bounds, &config)?;
    source.check_arrays()?;

    let trees = (0..geometry.tree_count())
      .map(|index| {
        let mut tree = Tree::new(config);
        for array in &source.arrays {
          tree.add_array(&array.name, array.values[index]);
        }
        tree
      })
      .collect::<Vec<_>>();

    debug!(
      "built forest of {} trees ({}x{}x{}), B={}, D={}, {} arrays",
      trees.len(),
      geometry.tree_counts[0],
      geometry.tree_counts[1],
      geometry.tree_counts[2],
      config.branch_factor,
      config.dimension,
      source.arrays.len()
    );

    Ok(Self {
      config,
      geometry,
      trees,
    })
  }

  /// Forest with root-only trees and no arrays.
  pub fn uniform(config: ForestConfig, cell_counts: [usize; 3], bounds: DAabb3) -> Result<Self> {
    Self::from_source(&SourceGrid::new(cell_counts, bounds), config)
  }

  fn check_geometry(
    cell_counts: [usize; 3],
    bounds: DAabb3,
    config: &ForestConfig,
  ) -> Result<ForestGeometry> {
    config.validate()?;
    let size = bounds.size();
    for axis in 0..3 {
      let count = cell_counts[axis];
      if count == 0 {
        return Err(HyperTreeError::InvalidConfiguration(format!(
          "axis {axis} has no cells"
        )));
      }
      if axis >= config.dimension && count != 1 {
        return Err(HyperTreeError::InvalidConfiguration(format!(
          "axis {axis} has {count} cells but the forest is {}-dimensional",
          config.dimension
        )));
      }
      if axis < config.dimension && !(size[axis] > 0.0) {
        return Err(HyperTreeError::InvalidConfiguration(format!(
          "bounds are degenerate along axis {axis}"
        )));
      }
    }
    let counts = DVec3::new(
      cell_counts[0] as f64,
      cell_counts[1] as f64,
      cell_counts[2] as f64,
    );
    Ok(ForestGeometry {
      tree_counts: cell_counts,
      bounds,
      tree_scale: size / counts,
    })
  }

  #[inline]
  pub fn config(&self) -> &ForestConfig {
    &self.config
  }

  #[inline]
  pub fn geometry(&self) -> &ForestGeometry {
    &self.geometry
  }

  #[inline]
  pub fn tree_count(&self) -> usize {
    self.trees.len()
  }

  pub fn tree(&self, index: usize) -> Option<&Tree> {
    self.trees.get(index)
  }

  pub fn tree_mut(&mut self, index: usize) -> Option<&mut Tree> {
    self.trees.get_mut(index)
  }

  pub fn trees(&self) -> &[Tree] {
    &self.trees
  }

  /// Mutable access to every tree, for per-tree cursors and sharding.
  pub fn trees_mut(&mut self) -> &mut [Tree] {
    &mut self.trees
  }

  /// Attach an array to every tree, filled with `fill`.
  pub fn add_array(&mut self, name: &str, fill: f64) {
    for tree in &mut self.trees {
      tree.add_array(name, fill);
    }
  }

  /// Physical box covered by tree `index`.
  pub fn tree_bounds(&self, index: usize) -> Option<DAabb3> {
    if index >= self.trees.len() {
      return None;
    }
    let [x, y, z] = self.geometry.tree_position(index);
    let min = self.geometry.bounds.min
      + DVec3::new(x as f64, y as f64, z as f64) * self.geometry.tree_scale;
    Some(DAabb3::new(min, min + self.geometry.tree_scale))
  }

  /// Physical box of a cell, from its tree's box and logical coordinate.
  pub fn cell_bounds(&self, tree: usize, slot: usize) -> Option<DAabb3> {
    let tree_bounds = self.tree_bounds(tree)?;
    let coord = self.trees[tree].cell(slot)?.coord();
    let cells = (self.config.branch_factor as f64).powi(coord.level as i32);
    let axes = coord.axes();
    let mut min = tree_bounds.min;
    let mut max = tree_bounds.max;
    for axis in 0..self.config.dimension {
      let step = self.geometry.tree_scale[axis] / cells;
      min[axis] = tree_bounds.min[axis] + axes[axis] as f64 * step;
      max[axis] = min[axis] + step;
    }
    Some(DAabb3::new(min, max))
  }

  /// Total number of leaves over all trees.
  pub fn leaf_count(&self) -> usize {
    self.trees.iter().map(Tree::leaf_count).sum()
  }

  /// Deepest level reached by any tree.
  pub fn depth(&self) -> u32 {
    self.trees.iter().map(Tree::depth).max().unwrap_or(0)
  }

  /// Every leaf in stable order: tree order, then pre-order within a tree.
  pub fn leaves(&self) -> impl Iterator<Item = LeafRef> + '_ {
    self.trees.iter().enumerate().flat_map(|(tree_index, tree)| {
      tree.leaves().map(move |slot| {
        let cell = tree.cells_slice()[slot];
        LeafRef {
          tree: tree_index,
          slot,
          level: cell.level(),
          coord: cell.coord(),
        }
      })
    })
  }

  /// Attribute value of a leaf.
  pub fn leaf_value(&self, leaf: &LeafRef, name: &str) -> Result<f64> {
    let tree = self.trees.get(leaf.tree).ok_or_else(|| {
      HyperTreeError::cursor("leaf_value", format!("tree {} does not exist", leaf.tree))
    })?;
    tree.value(name, leaf.slot)
  }

  /// Values of `name` over all leaves, in `leaves()` order.
  pub fn flatten(&self, name: &str) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(self.leaf_count());
    for tree in &self.trees {
      let array = tree.attributes().array(name)?;
      values.extend(tree.leaves().map(|slot| array[slot]));
    }
    Ok(values)
  }

  /// Levels of all leaves, in `leaves()` order.
  pub fn leaf_levels(&self) -> Vec<u32> {
    self.leaves().map(|leaf| leaf.level).collect()
  }

  /// Validate every tree's structural invariants.
  pub fn validate(&self) -> Result<()> {
    self.trees.iter().try_for_each(Tree::validate)
  }
}

#[cfg(test)]
#[path = "forest_test.rs"]
mod forest_test;
