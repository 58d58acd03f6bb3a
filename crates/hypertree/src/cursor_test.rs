use super::*;
use crate::config::ForestConfig;

fn tree_with_value(value: f64) -> Tree {
  let mut tree = Tree::new(ForestConfig::default());
  tree.add_array("value", value);
  tree
}

// =========================================================================
// Navigation
// =========================================================================

/// to_child on a leaf fails and leaves the cursor in place.
#[test]
fn test_to_child_on_leaf_fails() {
  let mut tree = tree_with_value(1.0);
  let mut cursor = tree.cursor();
  let err = cursor.to_child(0).unwrap_err();
  assert!(matches!(
    err,
    HyperTreeError::InvalidCursorOperation { operation: "to_child", .. }
  ));
  assert_eq!(cursor.slot(), 0);
}

/// Child index must be below B^D.
#[test]
fn test_to_child_out_of_range_fails() {
  let mut tree = tree_with_value(1.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  assert!(cursor.to_child(8).is_err());
  assert!(cursor.to_child(7).is_ok());
}

/// to_parent at the traversal root fails.
#[test]
fn test_to_parent_at_root_fails() {
  let mut tree = tree_with_value(1.0);
  let mut cursor = tree.cursor();
  assert!(cursor.is_root());
  assert!(cursor.to_parent().is_err());
}

/// Descending and ascending tracks level and slot.
#[test]
fn test_child_parent_round_trip() {
  let mut tree = tree_with_value(1.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  cursor.to_child(3).unwrap();
  assert_eq!(cursor.level(), 1);
  assert_eq!(cursor.slot(), 4);
  assert_eq!(cursor.coord(), CellCoord::new(1, 1, 0, 1));
  cursor.subdivide_leaf().unwrap();
  cursor.to_child(0).unwrap();
  assert_eq!(cursor.level(), 2);
  cursor.to_parent().unwrap();
  cursor.to_parent().unwrap();
  assert!(cursor.is_root());
  assert_eq!(cursor.level(), 0);
}

/// cursor_at rebuilds the ancestor path so to_parent walks back to the root.
#[test]
fn test_cursor_at_rebuilds_path() {
  let mut tree = tree_with_value(1.0);
  {
    let mut cursor = tree.cursor();
    cursor.subdivide_leaf().unwrap();
    cursor.to_child(2).unwrap();
    cursor.subdivide_leaf().unwrap();
  }
  let deep = tree.child_slot(3, 5).unwrap();
  let mut cursor = tree.cursor_at(deep).unwrap();
  assert_eq!(cursor.level(), 2);
  cursor.to_parent().unwrap();
  assert_eq!(cursor.slot(), 3);
  cursor.to_parent().unwrap();
  assert!(cursor.is_root());
  assert!(tree.cursor_at(10_000).is_err());
}

// =========================================================================
// Subdivide / collapse
// =========================================================================

/// Subdivide copies the parent's value into every child.
#[test]
fn test_subdivide_copies_parent_value() {
  let mut tree = tree_with_value(2.5);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  assert!(!cursor.is_leaf());
  assert_eq!(cursor.child_values("value").unwrap().as_slice(), &[2.5; 8]);
  assert_eq!(tree.attributes().len(), tree.slot_count());
}

/// Subdividing a non-leaf fails.
#[test]
fn test_subdivide_non_leaf_fails() {
  let mut tree = tree_with_value(0.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  assert!(matches!(
    cursor.subdivide_leaf(),
    Err(HyperTreeError::InvalidCursorOperation { .. })
  ));
}

/// Collapsing a leaf fails.
#[test]
fn test_collapse_leaf_on_leaf_fails() {
  let mut tree = tree_with_value(0.0);
  let mut cursor = tree.cursor();
  assert!(cursor.collapse_leaf(&[0.0]).is_err());
}

/// Collapsing a cell with non-leaf children fails instead of recursing.
#[test]
fn test_collapse_with_inner_children_fails() {
  let mut tree = tree_with_value(0.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  cursor.to_child(0).unwrap();
  cursor.subdivide_leaf().unwrap();
  cursor.to_parent().unwrap();
  assert!(!cursor.children_are_leaves());

  let err = cursor.collapse_leaf(&[0.0]).unwrap_err();
  assert!(matches!(err, HyperTreeError::InvalidCursorOperation { .. }));
  assert_eq!(tree.slot_count(), 17);
  assert!(tree.validate().is_ok());
}

/// Refine then collapse restores leaf count and value.
#[test]
fn test_subdivide_collapse_round_trip() {
  let mut tree = tree_with_value(6.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  let value = cursor.value("value").unwrap();
  cursor.collapse_leaf(&[value]).unwrap();
  assert!(cursor.is_leaf());
  assert_eq!(tree.leaf_count(), 1);
  assert_eq!(tree.slot_count(), 1);
  assert_eq!(tree.value("value", 0).unwrap(), 6.0);
}

/// Collapse writes the caller's value, not an aggregate.
#[test]
fn test_collapse_writes_supplied_value() {
  let mut tree = tree_with_value(1.0);
  let mut cursor = tree.cursor();
  cursor.subdivide_leaf().unwrap();
  cursor.to_child(1).unwrap();
  cursor.set_value("value", 9.0).unwrap();
  cursor.to_parent().unwrap();
  cursor.collapse_leaf(&[-3.0]).unwrap();
  assert_eq!(cursor.value("value").unwrap(), -3.0);
}

/// Unknown attribute names are reported.
#[test]
fn test_unknown_attribute() {
  let mut tree = tree_with_value(1.0);
  let cursor = tree.cursor();
  assert_eq!(
    cursor.value("pressure"),
    Err(HyperTreeError::UnknownAttribute("pressure".into()))
  );
}
