//! Per-tree parallel drivers.
//!
//! Refinement and coarsening never look across tree boundaries, so every tree
//! can be processed as an independent rayon task. Balance needs neighbor
//! lookups into other trees and stays on the calling thread.

use rayon::prelude::*;
use web_time::Instant;

use crate::coarsening::{coarsen, coarsen_sweep, CoarseningStats, MergePolicy, MergePredicate};
use crate::error::Result;
use crate::forest::Forest;
use crate::refinement::{refine, refine_uniform, RefinePredicate, RefinementStats};
use crate::tree::Tree;

/// Wall-clock cost of a sharded run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShardTiming {
  /// Trees processed.
  pub trees: usize,
  /// Sum of per-tree times in microseconds.
  pub total_us: u64,
  /// Slowest single tree in microseconds.
  pub slowest_us: u64,
}

/// Run `work` on every tree in parallel, timing each tree.
fn shard<S, F>(forest: &mut Forest, work: F) -> Result<(Vec<S>, ShardTiming)>
where
  S: Send,
  F: Fn(&mut Tree) -> Result<S> + Sync,
{
  let results: Vec<(S, u64)> = forest
    .trees_mut()
    .par_iter_mut()
    .map(|tree| {
      let start = Instant::now();
      let stats = work(tree)?;
      Ok((stats, start.elapsed().as_micros() as u64))
    })
    .collect::<Result<Vec<_>>>()?;

  let mut timing = ShardTiming {
    trees: results.len(),
    ..ShardTiming::default()
  };
  let stats = results
    .into_iter()
    .map(|(stats, us)| {
      timing.total_us += us;
      timing.slowest_us = timing.slowest_us.max(us);
      stats
    })
    .collect();
  Ok((stats, timing))
}

/// Parallel [`Forest::refine`]. Produces the same forest as the serial run.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "parallel::refine_forest"))]
pub fn refine_forest<P>(
  forest: &mut Forest,
  attribute: &str,
  depth: u32,
  predicate: &P,
) -> Result<(RefinementStats, ShardTiming)>
where
  P: RefinePredicate + Sync + ?Sized,
{
  let (per_tree, timing) = shard(forest, |tree| refine(&mut tree.cursor(), attribute, depth, predicate))?;
  let mut total = RefinementStats::default();
  for stats in per_tree {
    total += stats;
  }
  log::debug!(
    "parallel refine over {} trees: {} subdivisions, slowest tree {}us",
    timing.trees,
    total.subdivisions,
    timing.slowest_us
  );
  Ok((total, timing))
}

/// Parallel [`Forest::refine_uniform`].
pub fn refine_uniform_forest(forest: &mut Forest, depth: u32) -> Result<(RefinementStats, ShardTiming)> {
  let (per_tree, timing) = shard(forest, |tree| refine_uniform(&mut tree.cursor(), depth))?;
  let mut total = RefinementStats::default();
  for stats in per_tree {
    total += stats;
  }
  Ok((total, timing))
}

/// Parallel [`Forest::coarsen`].
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "parallel::coarsen_forest"))]
pub fn coarsen_forest<P>(
  forest: &mut Forest,
  attribute: &str,
  depth: u32,
  predicate: &P,
  policy: MergePolicy,
) -> Result<(CoarseningStats, ShardTiming)>
where
  P: MergePredicate + Sync + ?Sized,
{
  let (per_tree, timing) = shard(forest, |tree| {
    coarsen(&mut tree.cursor(), attribute, depth, predicate, policy)
  })?;
  let mut total = CoarseningStats::default();
  for stats in per_tree {
    total += stats;
  }
  log::debug!(
    "parallel coarsen over {} trees: {} collapses, slowest tree {}us",
    timing.trees,
    total.collapses,
    timing.slowest_us
  );
  Ok((total, timing))
}

/// Parallel [`Forest::coarsen_sweep`].
pub fn coarsen_sweep_forest<P>(
  forest: &mut Forest,
  attribute: &str,
  predicate: &P,
  policy: MergePolicy,
) -> Result<(CoarseningStats, ShardTiming)>
where
  P: MergePredicate + Sync + ?Sized,
{
  let (per_tree, timing) = shard(forest, |tree| coarsen_sweep(tree, attribute, predicate, policy))?;
  let mut total = CoarseningStats::default();
  for stats in per_tree {
    total += stats;
  }
  Ok((total, timing))
}

#[cfg(test)]
#[path = "parallel_test.rs"]
mod parallel_test;
