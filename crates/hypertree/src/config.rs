//! ForestConfig - branching, dimension and depth limits shared by all trees.

use crate::error::{HyperTreeError, Result};
use crate::tree::children_per_cell;

/// Hard ceiling on tree depth. Keeps `B^level` inside `u32` coordinates for
/// every supported branch factor.
pub const MAX_SUPPORTED_LEVEL: u32 = 20;

/// Structural parameters of a forest. Uniform across all its trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForestConfig {
  /// Number of parts each axis of a cell splits into on subdivision.
  pub branch_factor: usize,

  /// Number of spatial axes (1..=3). A cell has `B^D` children.
  pub dimension: usize,

  /// Deepest level any cell may reach. Root is level 0.
  pub max_level: u32,
}

impl ForestConfig {
  pub fn new(branch_factor: usize, dimension: usize) -> Self {
    Self {
      branch_factor,
      dimension,
      ..Self::default()
    }
  }

  /// Same config with a different depth limit.
  pub fn with_max_level(mut self, max_level: u32) -> Self {
    self.max_level = max_level;
    self
  }

  /// Children per subdivided cell: `B^D`.
  #[inline]
  pub fn child_count(&self) -> usize {
    children_per_cell(self.branch_factor, self.dimension)
  }

  /// Reject parameters the engine cannot represent.
  pub fn validate(&self) -> Result<()> {
    if self.branch_factor < 2 {
      return Err(HyperTreeError::InvalidConfiguration(format!(
        "branch factor must be at least 2, got {}",
        self.branch_factor
      )));
    }
    if !(1..=3).contains(&self.dimension) {
      return Err(HyperTreeError::InvalidConfiguration(format!(
        "dimension must be 1, 2 or 3, got {}",
        self.dimension
      )));
    }
    let finest = (self.branch_factor as u64).checked_pow(self.max_level);
    if self.max_level > MAX_SUPPORTED_LEVEL || finest.map_or(true, |n| n > u32::MAX as u64) {
      return Err(HyperTreeError::InvalidConfiguration(format!(
        "max level {} is too deep for branch factor {}",
        self.max_level, self.branch_factor
      )));
    }
    Ok(())
  }
}

impl Default for ForestConfig {
  fn default() -> Self {
    Self {
      branch_factor: 2,
      dimension: 3,
      max_level: 16,
    }
  }
}
