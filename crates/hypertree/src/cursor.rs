//! Cursor - stateful traversal handle over one tree.
//!
//! The cursor is the only way to change tree topology (`subdivide_leaf`,
//! `collapse_leaf`) and to write attribute values. It holds the tree's unique
//! mutable borrow, so no other cursor can change the structure underneath it.

use smallvec::SmallVec;

use crate::error::{HyperTreeError, Result};
use crate::tree::{Cell, CellCoord, Tree};

/// Traversal position: current slot plus the stack of ancestor slots.
pub struct Cursor<'a> {
  tree: &'a mut Tree,
  ancestors: Vec<usize>,
  slot: usize,
}

impl<'a> Cursor<'a> {
  pub(crate) fn new(tree: &'a mut Tree) -> Self {
    Self {
      tree,
      ancestors: Vec::new(),
      slot: 0,
    }
  }

  pub(crate) fn with_path(tree: &'a mut Tree, ancestors: Vec<usize>, slot: usize) -> Self {
    Self {
      tree,
      ancestors,
      slot,
    }
  }

  /// Read-only view of the tree being traversed.
  #[inline]
  pub fn tree(&self) -> &Tree {
    self.tree
  }

  /// Current slot index.
  #[inline]
  pub fn slot(&self) -> usize {
    self.slot
  }

  #[inline]
  pub fn level(&self) -> u32 {
    self.current().level()
  }

  #[inline]
  pub fn coord(&self) -> CellCoord {
    self.current().coord()
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.current().is_leaf()
  }

  /// True when there is no ancestor to return to.
  #[inline]
  pub fn is_root(&self) -> bool {
    self.ancestors.is_empty()
  }

  /// Children per subdivided cell: `B^D`.
  #[inline]
  pub fn child_count(&self) -> usize {
    self.tree.child_count()
  }

  fn current(&self) -> &Cell {
    // The cursor owns the tree borrow, so `slot` always stays allocated.
    &self.tree.cells_slice()[self.slot]
  }

  /// Move to child `index`.
  pub fn to_child(&mut self, index: usize) -> Result<()> {
    let child_count = self.tree.child_count();
    if index >= child_count {
      return Err(HyperTreeError::cursor(
        "to_child",
        format!("child index {index} out of range 0..{child_count}"),
      ));
    }
    let Some(child) = self.tree.child_slot(self.slot, index) else {
      return Err(HyperTreeError::cursor(
        "to_child",
        format!("slot {} is a leaf", self.slot),
      ));
    };
    self.ancestors.push(self.slot);
    self.slot = child;
    Ok(())
  }

  /// Move back to the parent of the current cell.
  pub fn to_parent(&mut self) -> Result<()> {
    match self.ancestors.pop() {
      Some(parent) => {
        self.slot = parent;
        Ok(())
      }
      None => Err(HyperTreeError::cursor(
        "to_parent",
        "cursor is at the root of its traversal",
      )),
    }
  }

  /// Return to the tree root, clearing the ancestor path.
  pub fn to_root(&mut self) {
    self.ancestors.clear();
    self.slot = 0;
  }

  /// Value of attribute `name` at the current cell.
  pub fn value(&self, name: &str) -> Result<f64> {
    self.tree.attributes().value(name, self.slot)
  }

  /// Overwrite attribute `name` at the current cell.
  pub fn set_value(&mut self, name: &str, value: f64) -> Result<()> {
    let slot = self.slot;
    self.tree.attributes_mut().set_value(name, slot, value)
  }

  /// Values of attribute `name` over the current cell's children, in child
  /// order.
  pub fn child_values(&self, name: &str) -> Result<SmallVec<[f64; 8]>> {
    let array = self.tree.attributes().array(name)?;
    let Some(children) = self.tree.children(self.slot) else {
      return Err(HyperTreeError::cursor(
        "child_values",
        format!("slot {} is a leaf", self.slot),
      ));
    };
    Ok(array[children].iter().copied().collect())
  }

  /// True when the current cell is subdivided and every child is a leaf.
  pub fn children_are_leaves(&self) -> bool {
    self
      .tree
      .children(self.slot)
      .is_some_and(|mut children| children.all(|c| self.tree.is_leaf(c)))
  }

  /// Split the current leaf into `B^D` children one level finer.
  ///
  /// Each child starts with a copy of every attribute value of the parent.
  /// Callers that need a different split policy overwrite the children
  /// afterwards. The cursor stays on the (now subdivided) cell.
  pub fn subdivide_leaf(&mut self) -> Result<()> {
    self.tree.subdivide(self.slot).map(|_| ())
  }

  /// Merge the current cell's children back into it.
  ///
  /// Every child must already be a leaf. `values` holds the value the cell
  /// takes for each attribute array, in store order; the primitive performs
  /// no aggregation of its own.
  pub fn collapse_leaf(&mut self, values: &[f64]) -> Result<()> {
    self.tree.collapse(self.slot, values)
  }
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;
