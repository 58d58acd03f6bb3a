use glam::DVec3;

use super::*;
use crate::bounds::DAabb3;
use crate::config::ForestConfig;

/// Two binary octree roots side by side along x.
fn pair() -> Forest {
  Forest::uniform(
    ForestConfig::default(),
    [2, 1, 1],
    DAabb3::new(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0)),
  )
  .unwrap()
}

fn subdivide(forest: &mut Forest, tree: usize, slot: usize) {
  forest.trees_mut()[tree].cursor_at(slot).unwrap().subdivide_leaf().unwrap();
}

// =========================================================================
// Stencils
// =========================================================================

#[test]
fn test_von_neumann_offset_counts() {
  assert_eq!(NeighborStencil::VonNeumann.offsets(1).len(), 2);
  assert_eq!(NeighborStencil::VonNeumann.offsets(2).len(), 4);
  assert_eq!(NeighborStencil::VonNeumann.offsets(3).len(), 6);
}

#[test]
fn test_moore_offset_counts() {
  assert_eq!(NeighborStencil::Moore.offsets(1).len(), 2);
  assert_eq!(NeighborStencil::Moore.offsets(2).len(), 8);
  assert_eq!(NeighborStencil::Moore.offsets(3).len(), 26);
  assert!(NeighborStencil::Moore
    .offsets(2)
    .iter()
    .all(|o| o[2] == 0 && *o != [0, 0, 0]));
}

// =========================================================================
// Lookup
// =========================================================================

/// Root neighbors cross into the adjacent tree and stop at the domain edge.
#[test]
fn test_root_neighbor_crosses_tree_boundary() {
  let forest = pair();
  let right = forest.neighbor(0, 0, [1, 0, 0]).unwrap();
  assert_eq!(
    right,
    NeighborRef {
      tree: 1,
      slot: 0,
      level: 0,
      is_leaf: true
    }
  );
  assert!(forest.neighbor(0, 0, [-1, 0, 0]).is_none());
  assert!(forest.neighbor(0, 0, [0, 1, 0]).is_none());
}

/// A fine cell at a tree edge finds the coarser root of the next tree.
#[test]
fn test_fine_cell_finds_coarser_neighbor() {
  let mut forest = pair();
  subdivide(&mut forest, 0, 0);
  let child = forest.tree(0).unwrap().child_slot(0, 1).unwrap(); // x = 1
  let neighbor = forest.neighbor(0, child, [1, 0, 0]).unwrap();
  assert_eq!(neighbor.tree, 1);
  assert_eq!(neighbor.level, 0);

  // Toward -x the sibling at x = 0 is found at the same level.
  let sibling = forest.neighbor(0, child, [-1, 0, 0]).unwrap();
  assert_eq!(sibling.tree, 0);
  assert_eq!(sibling.slot, forest.tree(0).unwrap().child_slot(0, 0).unwrap());
  assert_eq!(sibling.level, 1);
}

/// finest_level_across only looks at the children touching the shared face.
#[test]
fn test_finest_level_across_uses_touching_children() {
  let mut forest = pair();
  subdivide(&mut forest, 1, 0);
  let far = forest.tree(1).unwrap().child_slot(0, 1).unwrap(); // x = 1, far side
  subdivide(&mut forest, 1, far);
  assert_eq!(forest.finest_level_across(0, 0, [1, 0, 0]), Some(1));

  let near = forest.tree(1).unwrap().child_slot(0, 0).unwrap(); // x = 0, touching
  subdivide(&mut forest, 1, near);
  let near_grandchild = forest.tree(1).unwrap().child_slot(near, 2).unwrap(); // x = 0
  subdivide(&mut forest, 1, near_grandchild);
  assert_eq!(forest.finest_level_across(0, 0, [1, 0, 0]), Some(3));
}

/// Global coordinates combine tree position and local coordinate.
#[test]
fn test_global_coord() {
  let mut forest = pair();
  subdivide(&mut forest, 1, 0);
  let slot = forest.tree(1).unwrap().child_slot(0, 7).unwrap();
  assert_eq!(forest.global_coord(1, slot), Some([3, 1, 1]));
  assert_eq!(forest.global_coord(1, 0), Some([1, 0, 0]));
  assert_eq!(forest.global_coord(5, 0), None);
}

/// Diagonal Moore neighbors are found across tree corners.
#[test]
fn test_moore_diagonal_neighbor() {
  let forest = Forest::uniform(
    ForestConfig::new(2, 2),
    [2, 2, 1],
    DAabb3::new(DVec3::ZERO, DVec3::new(2.0, 2.0, 0.0)),
  )
  .unwrap();
  let diagonal = forest.neighbor(0, 0, [1, 1, 0]).unwrap();
  assert_eq!(diagonal.tree, 3);
  assert_eq!(forest.neighbors(0, 0, NeighborStencil::Moore).len(), 3);
  assert_eq!(forest.neighbors(3, 0, NeighborStencil::VonNeumann).len(), 2);
}

/// Ternary splits place the touching children at digit B - 1 on the low side.
#[test]
fn test_ternary_touching_children() {
  let mut forest = Forest::uniform(
    ForestConfig::new(3, 1),
    [2, 1, 1],
    DAabb3::new(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0)),
  )
  .unwrap();
  subdivide(&mut forest, 0, 0);
  let last = forest.tree(0).unwrap().child_slot(0, 2).unwrap();
  subdivide(&mut forest, 0, last);
  assert_eq!(forest.finest_level_across(1, 0, [-1, 0, 0]), Some(2));

  let first = forest.tree(0).unwrap().child_slot(0, 0).unwrap();
  assert_eq!(forest.neighbor(0, first, [1, 0, 0]).unwrap().level, 1);
}
