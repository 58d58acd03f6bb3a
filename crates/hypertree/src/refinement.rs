//! Refinement engine - depth-first, top-down, predicate driven.
//!
//! Starting at the cursor's cell with a depth budget `d`:
//! 1. `d == 0`: stop.
//! 2. Predicate fails for the cell's value: stop. No further descent.
//! 3. Otherwise subdivide (leaves only; an already subdivided cell is
//!    descended into as is) and recurse into every child with `d - 1`.
//!
//! Cells at the tree's maximum level end the recursion without error.

use std::ops::AddAssign;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::forest::Forest;

/// Decides whether a cell gets refined.
pub trait RefinePredicate {
  /// `value` is the cell's attribute value, `level` its depth.
  fn should_refine(&self, value: f64, level: u32) -> bool;
}

impl<F: Fn(f64, u32) -> bool> RefinePredicate for F {
  #[inline]
  fn should_refine(&self, value: f64, level: u32) -> bool {
    self(value, level)
  }
}

/// Refine unconditionally (uniform refinement).
#[derive(Clone, Copy, Debug, Default)]
pub struct Always;

impl RefinePredicate for Always {
  #[inline]
  fn should_refine(&self, _value: f64, _level: u32) -> bool {
    true
  }
}

/// Refine cells whose value is strictly greater than the threshold.
#[derive(Clone, Copy, Debug)]
pub struct AboveThreshold(pub f64);

impl RefinePredicate for AboveThreshold {
  #[inline]
  fn should_refine(&self, value: f64, _level: u32) -> bool {
    value > self.0
  }
}

/// Refine cells shallower than the given level.
#[derive(Clone, Copy, Debug)]
pub struct BelowLevel(pub u32);

impl RefinePredicate for BelowLevel {
  #[inline]
  fn should_refine(&self, _value: f64, level: u32) -> bool {
    level < self.0
  }
}

/// Statistics from a refinement run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementStats {
  /// Cells split by the engine.
  pub subdivisions: usize,
  /// Cells where the predicate held.
  pub accepted: usize,
  /// Cells where the predicate failed.
  pub rejected: usize,
}

impl AddAssign for RefinementStats {
  fn add_assign(&mut self, other: Self) {
    self.subdivisions += other.subdivisions;
    self.accepted += other.accepted;
    self.rejected += other.rejected;
  }
}

/// Refine the subtree under the cursor. The cursor ends where it started.
pub fn refine<P>(
  cursor: &mut Cursor<'_>,
  attribute: &str,
  depth: u32,
  predicate: &P,
) -> Result<RefinementStats>
where
  P: RefinePredicate + ?Sized,
{
  let mut stats = RefinementStats::default();
  // Resolve the name once so a bad name fails even when depth is 0.
  cursor.tree().attributes().require(attribute)?;
  refine_recursive(cursor, attribute, depth, predicate, &mut stats)?;
  Ok(stats)
}

fn refine_recursive<P>(
  cursor: &mut Cursor<'_>,
  attribute: &str,
  depth: u32,
  predicate: &P,
  stats: &mut RefinementStats,
) -> Result<()>
where
  P: RefinePredicate + ?Sized,
{
  if depth == 0 {
    return Ok(());
  }
  if !predicate.should_refine(cursor.value(attribute)?, cursor.level()) {
    stats.rejected += 1;
    return Ok(());
  }
  stats.accepted += 1;

  if cursor.is_leaf() {
    if cursor.level() >= cursor.tree().max_level() {
      return Ok(());
    }
    cursor.subdivide_leaf()?;
    stats.subdivisions += 1;
  }

  for child in 0..cursor.child_count() {
    cursor.to_child(child)?;
    refine_recursive(cursor, attribute, depth - 1, predicate, stats)?;
    cursor.to_parent()?;
  }
  Ok(())
}

/// Uniformly split every leaf under the cursor `depth` times, regardless of
/// any attribute.
pub fn refine_uniform(cursor: &mut Cursor<'_>, depth: u32) -> Result<RefinementStats> {
  let mut stats = RefinementStats::default();
  refine_uniform_recursive(cursor, depth, &mut stats)?;
  Ok(stats)
}

fn refine_uniform_recursive(
  cursor: &mut Cursor<'_>,
  depth: u32,
  stats: &mut RefinementStats,
) -> Result<()> {
  if depth == 0 {
    return Ok(());
  }
  stats.accepted += 1;
  if cursor.is_leaf() {
    if cursor.level() >= cursor.tree().max_level() {
      return Ok(());
    }
    cursor.subdivide_leaf()?;
    stats.subdivisions += 1;
  }
  for child in 0..cursor.child_count() {
    cursor.to_child(child)?;
    refine_uniform_recursive(cursor, depth - 1, stats)?;
    cursor.to_parent()?;
  }
  Ok(())
}

impl Forest {
  /// Run the refinement engine from every tree root.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "forest::refine"))]
  pub fn refine<P>(&mut self, attribute: &str, depth: u32, predicate: &P) -> Result<RefinementStats>
  where
    P: RefinePredicate + ?Sized,
  {
    let mut total = RefinementStats::default();
    for tree in self.trees_mut() {
      total += refine(&mut tree.cursor(), attribute, depth, predicate)?;
    }
    log::debug!(
      "refine `{attribute}` depth {depth}: {} subdivisions, {} leaves",
      total.subdivisions,
      self.leaf_count()
    );
    Ok(total)
  }

  /// Uniformly refine every tree `depth` levels.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "forest::refine_uniform"))]
  pub fn refine_uniform(&mut self, depth: u32) -> Result<RefinementStats> {
    let mut total = RefinementStats::default();
    for tree in self.trees_mut() {
      total += refine_uniform(&mut tree.cursor(), depth)?;
    }
    Ok(total)
  }
}

#[cfg(test)]
#[path = "refinement_test.rs"]
mod refinement_test;
