use glam::DVec3;

use super::*;
use crate::bounds::DAabb3;
use crate::coarsening::AllIdentical;
use crate::config::ForestConfig;
use crate::error::HyperTreeError;
use crate::refinement::AboveThreshold;
use crate::source::SourceGrid;

fn modulo_forest() -> Forest {
  let source = SourceGrid::new([4, 4, 4], DAabb3::new(DVec3::ZERO, DVec3::splat(4.0)))
    .with_array_fn("CellData", |i| (i % 25) as f64);
  Forest::from_source(&source, ForestConfig::default()).unwrap()
}

/// Sharded refinement yields exactly the serial result.
#[test]
fn test_parallel_refine_matches_serial() {
  let mut serial = modulo_forest();
  let mut parallel = serial.clone();

  let expected = serial.refine("CellData", 2, &AboveThreshold(10.0)).unwrap();
  let (stats, timing) = refine_forest(&mut parallel, "CellData", 2, &AboveThreshold(10.0)).unwrap();

  assert_eq!(stats, expected);
  assert_eq!(timing.trees, 64);
  assert!(timing.slowest_us <= timing.total_us);
  assert_eq!(parallel.leaf_levels(), serial.leaf_levels());
  assert_eq!(
    parallel.flatten("CellData").unwrap(),
    serial.flatten("CellData").unwrap()
  );
}

/// Sharded coarsening undoes a uniform refinement like the serial engine.
#[test]
fn test_parallel_coarsen_matches_serial() {
  let mut serial = modulo_forest();
  serial.refine_uniform(2).unwrap();
  let mut parallel = serial.clone();

  let expected = serial
    .coarsen("CellData", 2, &AllIdentical, MergePolicy::Identical)
    .unwrap();
  let (stats, _) =
    coarsen_forest(&mut parallel, "CellData", 2, &AllIdentical, MergePolicy::Identical).unwrap();

  assert_eq!(stats, expected);
  assert_eq!(parallel.leaf_count(), 64);
  assert_eq!(parallel.leaf_levels(), serial.leaf_levels());
}

#[test]
fn test_parallel_sweep_restores_roots() {
  let mut forest = modulo_forest();
  forest.refine_uniform(3).unwrap();
  let (stats, _) =
    coarsen_sweep_forest(&mut forest, "CellData", &AllIdentical, MergePolicy::First).unwrap();
  assert_eq!(stats.collapses, 64 * (1 + 8 + 64));
  assert_eq!(forest.leaf_count(), 64);
  assert!(forest.validate().is_ok());
}

/// Errors from any shard surface to the caller.
#[test]
fn test_parallel_error_propagates() {
  let mut forest = modulo_forest();
  let err = refine_forest(&mut forest, "missing", 1, &AboveThreshold(0.0)).unwrap_err();
  assert_eq!(err, HyperTreeError::UnknownAttribute("missing".into()));
}

/// Sharded uniform refinement splits every tree like the serial driver.
#[test]
fn test_parallel_uniform_matches_serial() {
  let mut serial = modulo_forest();
  let mut parallel = serial.clone();

  let expected = serial.refine_uniform(2).unwrap();
  let (stats, timing) = refine_uniform_forest(&mut parallel, 2).unwrap();

  assert_eq!(stats, expected);
  assert_eq!(timing.trees, 64);
  assert_eq!(parallel.leaf_count(), 64 * 64);
  assert_eq!(parallel.leaf_levels(), serial.leaf_levels());
}
