//! Coarsening engine - depth-first, bottom-up (post-order).
//!
//! Children are resolved before their parent, because `collapse_leaf` needs
//! every child to already be a leaf. Once the children are processed, the
//! merge predicate looks at their values; if it holds, each attribute array is
//! reduced with an explicit [`MergePolicy`] and the cell is collapsed.

use std::ops::AddAssign;

use smallvec::SmallVec;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::forest::Forest;
use crate::tree::Tree;

/// Decides whether a group of sibling leaves merges into their parent.
pub trait MergePredicate {
  /// `children` holds the driving attribute of every child in child order,
  /// `level` is the parent's depth.
  fn should_merge(&self, children: &[f64], level: u32) -> bool;
}

impl<F: Fn(&[f64], u32) -> bool> MergePredicate for F {
  #[inline]
  fn should_merge(&self, children: &[f64], level: u32) -> bool {
    self(children, level)
  }
}

/// Merge when every child is strictly below the threshold.
#[derive(Clone, Copy, Debug)]
pub struct AllBelow(pub f64);

impl MergePredicate for AllBelow {
  fn should_merge(&self, children: &[f64], _level: u32) -> bool {
    children.iter().all(|&v| v < self.0)
  }
}

/// Merge when every child carries the same value.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllIdentical;

impl MergePredicate for AllIdentical {
  fn should_merge(&self, children: &[f64], _level: u32) -> bool {
    children.windows(2).all(|pair| pair[0] == pair[1])
  }
}

/// Reduction producing the merged cell's value from its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePolicy {
  /// The common value; no value if the children differ.
  #[default]
  Identical,
  /// Arithmetic mean.
  Mean,
  /// Value of child 0.
  First,
  /// Smallest value.
  Min,
  /// Largest value.
  Max,
}

impl MergePolicy {
  /// Reduce `values`. None when the policy cannot produce a value (empty
  /// input, or `Identical` over differing values).
  pub fn reduce(&self, values: &[f64]) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    match self {
      Self::Identical => rest.iter().all(|&v| v == first).then_some(first),
      Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
      Self::First => Some(first),
      Self::Min => Some(rest.iter().copied().fold(first, f64::min)),
      Self::Max => Some(rest.iter().copied().fold(first, f64::max)),
    }
  }
}

/// Statistics from a coarsening run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoarseningStats {
  /// Cells collapsed back into leaves.
  pub collapses: usize,
  /// Candidates whose children failed the merge predicate.
  pub rejected: usize,
  /// Candidates that passed the predicate but whose values the policy could
  /// not reduce.
  pub unresolved: usize,
}

impl AddAssign for CoarseningStats {
  fn add_assign(&mut self, other: Self) {
    self.collapses += other.collapses;
    self.rejected += other.rejected;
    self.unresolved += other.unresolved;
  }
}

/// Outcome of evaluating one candidate cell.
enum Merge {
  Collapse(SmallVec<[f64; 4]>),
  Rejected,
  Unresolved,
}

/// Evaluate predicate and policy for the cell at `slot`, whose children must
/// all be leaves.
fn evaluate<P>(tree: &Tree, slot: usize, driver: usize, predicate: &P, policy: MergePolicy) -> Merge
where
  P: MergePredicate + ?Sized,
{
  let Some(children) = tree.children(slot) else {
    return Merge::Rejected;
  };
  let attributes = tree.attributes();
  let level = tree.cells_slice()[slot].level();
  if !predicate.should_merge(&attributes.array_at(driver)[children.clone()], level) {
    return Merge::Rejected;
  }
  let mut merged = SmallVec::new();
  for index in 0..attributes.array_count() {
    match policy.reduce(&attributes.array_at(index)[children.clone()]) {
      Some(value) => merged.push(value),
      None => return Merge::Unresolved,
    }
  }
  Merge::Collapse(merged)
}

/// Coarsen the subtree under the cursor with a depth budget. The cursor ends
/// where it started.
pub fn coarsen<P>(
  cursor: &mut Cursor<'_>,
  attribute: &str,
  depth: u32,
  predicate: &P,
  policy: MergePolicy,
) -> Result<CoarseningStats>
where
  P: MergePredicate + ?Sized,
{
  let driver = cursor.tree().attributes().require(attribute)?;
  let mut stats = CoarseningStats::default();
  coarsen_recursive(cursor, driver, depth, predicate, policy, &mut stats)?;
  Ok(stats)
}

fn coarsen_recursive<P>(
  cursor: &mut Cursor<'_>,
  driver: usize,
  depth: u32,
  predicate: &P,
  policy: MergePolicy,
  stats: &mut CoarseningStats,
) -> Result<()>
where
  P: MergePredicate + ?Sized,
{
  if depth == 0 || cursor.is_leaf() {
    return Ok(());
  }
  for child in 0..cursor.child_count() {
    cursor.to_child(child)?;
    coarsen_recursive(cursor, driver, depth - 1, predicate, policy, stats)?;
    cursor.to_parent()?;
  }

  // Grandchildren beyond the budget keep the cell refined.
  if !cursor.children_are_leaves() {
    return Ok(());
  }
  match evaluate(cursor.tree(), cursor.slot(), driver, predicate, policy) {
    Merge::Collapse(values) => {
      cursor.collapse_leaf(&values)?;
      stats.collapses += 1;
    }
    Merge::Rejected => stats.rejected += 1,
    Merge::Unresolved => stats.unresolved += 1,
  }
  Ok(())
}

/// Bottom-up sweep over a whole tree without a depth budget.
///
/// Repeatedly collects every cell whose children are all leaves and
/// collapses the ones that merge, until a sweep collapses nothing.
pub fn coarsen_sweep<P>(
  tree: &mut Tree,
  attribute: &str,
  predicate: &P,
  policy: MergePolicy,
) -> Result<CoarseningStats>
where
  P: MergePredicate + ?Sized,
{
  let driver = tree.attributes().require(attribute)?;
  let mut stats = CoarseningStats::default();
  loop {
    let candidates: Vec<usize> = (0..tree.slot_count())
      .filter(|&slot| {
        tree
          .children(slot)
          .is_some_and(|mut children| children.all(|c| tree.is_leaf(c)))
      })
      .collect();

    let mut collapsed = 0;
    let mut sweep = CoarseningStats::default();
    // Highest slots first: a collapse only shifts slots above its own block.
    for &slot in candidates.iter().rev() {
      match evaluate(tree, slot, driver, predicate, policy) {
        Merge::Collapse(values) => {
          tree.cursor_at(slot)?.collapse_leaf(&values)?;
          collapsed += 1;
        }
        Merge::Rejected => sweep.rejected += 1,
        Merge::Unresolved => sweep.unresolved += 1,
      }
    }
    stats.collapses += collapsed;
    if collapsed == 0 {
      stats.rejected += sweep.rejected;
      stats.unresolved += sweep.unresolved;
      return Ok(stats);
    }
  }
}

impl Forest {
  /// Run the coarsening engine from every tree root.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "forest::coarsen"))]
  pub fn coarsen<P>(
    &mut self,
    attribute: &str,
    depth: u32,
    predicate: &P,
    policy: MergePolicy,
  ) -> Result<CoarseningStats>
  where
    P: MergePredicate + ?Sized,
  {
    let mut total = CoarseningStats::default();
    for tree in self.trees_mut() {
      total += coarsen(&mut tree.cursor(), attribute, depth, predicate, policy)?;
    }
    log::debug!(
      "coarsen `{attribute}` depth {depth} ({policy:?}): {} collapses, {} leaves",
      total.collapses,
      self.leaf_count()
    );
    Ok(total)
  }

  /// Bottom-up sweep of every tree until nothing merges.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "forest::coarsen_sweep"))]
  pub fn coarsen_sweep<P>(
    &mut self,
    attribute: &str,
    predicate: &P,
    policy: MergePolicy,
  ) -> Result<CoarseningStats>
  where
    P: MergePredicate + ?Sized,
  {
    let mut total = CoarseningStats::default();
    for tree in self.trees_mut() {
      total += coarsen_sweep(tree, attribute, predicate, policy)?;
    }
    Ok(total)
  }
}

#[cfg(test)]
#[path = "coarsening_test.rs"]
mod coarsening_test;
