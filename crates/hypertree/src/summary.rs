//! Forest statistics for reporting.

use std::fmt;

use crate::forest::Forest;

/// Value range of one attribute over the leaves.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRange {
  pub name: String,
  pub min: f64,
  pub max: f64,
}

/// Snapshot of a forest's shape.
#[derive(Clone, Debug, PartialEq)]
pub struct ForestSummary {
  pub tree_count: usize,
  pub leaf_count: usize,
  /// Allocated cells over all trees, leaves included.
  pub cell_count: usize,
  pub depth: u32,
  /// `leaves_per_level[l]` = number of leaves at level `l`.
  pub leaves_per_level: Vec<usize>,
  /// Leaf value range per attribute, in store order. Attributes missing from
  /// any tree are skipped.
  pub ranges: Vec<AttributeRange>,
}

impl Forest {
  /// Collect tree, leaf and level statistics.
  pub fn summary(&self) -> ForestSummary {
    let depth = self.depth();
    let mut leaves_per_level = vec![0usize; depth as usize + 1];
    for leaf in self.leaves() {
      leaves_per_level[leaf.level as usize] += 1;
    }

    let names: Vec<String> = self
      .trees()
      .first()
      .map(|tree| tree.attributes().names().map(str::to_owned).collect())
      .unwrap_or_default();
    let ranges = names
      .into_iter()
      .filter_map(|name| {
        let values = self.flatten(&name).ok()?;
        let (min, max) = values
          .iter()
          .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(AttributeRange { name, min, max })
      })
      .collect();

    ForestSummary {
      tree_count: self.tree_count(),
      leaf_count: leaves_per_level.iter().sum(),
      cell_count: self.trees().iter().map(|tree| tree.slot_count()).sum(),
      depth,
      leaves_per_level,
      ranges,
    }
  }
}

impl fmt::Display for ForestSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "{} trees, {} leaves, {} cells, depth {}",
      self.tree_count, self.leaf_count, self.cell_count, self.depth
    )?;
    for (level, count) in self.leaves_per_level.iter().enumerate() {
      writeln!(f, "  level {level}: {count} leaves")?;
    }
    for range in &self.ranges {
      writeln!(f, "  {}: [{}, {}]", range.name, range.min, range.max)?;
    }
    Ok(())
  }
}
