//! Tree module - one hierarchical cell structure stored as a slot arena.
//!
//! # Storage
//!
//! Cells live in a contiguous `Vec<Cell>`. Subdividing a leaf appends a block
//! of `B^D` child slots at the end of the arena, so a child always has a
//! larger slot index than its parent. Collapsing removes the child block and
//! shifts every later slot down, fixing up indices. The arena therefore never
//! holds dead slots and every attribute array has exactly one value per cell.
//!
//! # Module Structure
//!
//! - [`coord`]: `CellCoord` - logical position of a cell in its tree
//! - [`cell`]: `Cell` - one arena slot

pub mod cell;
pub mod coord;

pub use cell::Cell;
pub use coord::{child_offsets, children_per_cell, CellCoord};

use std::ops::Range;

use crate::attributes::AttributeStore;
use crate::config::ForestConfig;
use crate::cursor::Cursor;
use crate::error::{HyperTreeError, Result};

/// A single tree of the forest. Owns its cells and their attributes.
#[derive(Clone, Debug)]
pub struct Tree {
  cells: Vec<Cell>,
  attributes: AttributeStore,
  config: ForestConfig,
  child_count: usize,
}

impl Tree {
  /// Create an unrefined tree (root only) with no attribute arrays.
  pub fn new(config: ForestConfig) -> Self {
    Self {
      cells: vec![Cell::root()],
      attributes: AttributeStore::with_len(1),
      child_count: config.child_count(),
      config,
    }
  }

  /// Cursor positioned at the root.
  pub fn cursor(&mut self) -> Cursor<'_> {
    Cursor::new(self)
  }

  /// Cursor positioned at `slot`, with the ancestor path rebuilt from the
  /// parent links.
  pub fn cursor_at(&mut self, slot: usize) -> Result<Cursor<'_>> {
    if slot >= self.cells.len() {
      return Err(HyperTreeError::cursor(
        "cursor_at",
        format!("slot {slot} is not allocated"),
      ));
    }
    let mut path = Vec::new();
    let mut current = self.cells[slot].parent;
    while let Some(parent) = current {
      path.push(parent);
      current = self.cells[parent].parent;
    }
    path.reverse();
    Ok(Cursor::with_path(self, path, slot))
  }

  #[inline]
  pub fn config(&self) -> &ForestConfig {
    &self.config
  }

  #[inline]
  pub fn branch_factor(&self) -> usize {
    self.config.branch_factor
  }

  #[inline]
  pub fn dimension(&self) -> usize {
    self.config.dimension
  }

  #[inline]
  pub fn max_level(&self) -> u32 {
    self.config.max_level
  }

  /// Children per subdivided cell: `B^D`.
  #[inline]
  pub fn child_count(&self) -> usize {
    self.child_count
  }

  /// Number of allocated slots (equal to the number of live cells).
  #[inline]
  pub fn slot_count(&self) -> usize {
    self.cells.len()
  }

  pub fn cell(&self, slot: usize) -> Option<&Cell> {
    self.cells.get(slot)
  }

  /// True when `slot` is allocated and has no children.
  pub fn is_leaf(&self, slot: usize) -> bool {
    self.cells.get(slot).is_some_and(Cell::is_leaf)
  }

  /// Child slot range of `slot`, None for leaves.
  pub fn children(&self, slot: usize) -> Option<Range<usize>> {
    self.cells.get(slot)?.children(self.child_count)
  }

  /// Slot of child `index` of `slot`.
  pub fn child_slot(&self, slot: usize, index: usize) -> Option<usize> {
    if index >= self.child_count {
      return None;
    }
    self.children(slot).map(|range| range.start + index)
  }

  pub fn leaf_count(&self) -> usize {
    self.cells.iter().filter(|c| c.is_leaf()).count()
  }

  /// Deepest level of any cell.
  pub fn depth(&self) -> u32 {
    self.cells.iter().map(Cell::level).max().unwrap_or(0)
  }

  /// Leaf slots in pre-order (children visited in child-index order).
  pub fn leaves(&self) -> Leaves<'_> {
    Leaves {
      tree: self,
      stack: vec![0],
    }
  }

  pub fn attributes(&self) -> &AttributeStore {
    &self.attributes
  }

  /// Add an attribute array covering every current slot.
  pub fn add_array(&mut self, name: &str, fill: f64) {
    self.attributes.add_array(name, fill);
  }

  /// Value of `name` at `slot`.
  pub fn value(&self, name: &str, slot: usize) -> Result<f64> {
    self.check_slot("value", slot)?;
    self.attributes.value(name, slot)
  }

  fn check_slot(&self, operation: &'static str, slot: usize) -> Result<()> {
    if slot < self.cells.len() {
      Ok(())
    } else {
      Err(HyperTreeError::cursor(
        operation,
        format!("slot {slot} is not allocated"),
      ))
    }
  }

  #[inline]
  pub(crate) fn cells_slice(&self) -> &[Cell] {
    &self.cells
  }

  pub(crate) fn attributes_mut(&mut self) -> &mut AttributeStore {
    &mut self.attributes
  }

  /// Append a child block under leaf `slot`. Returns the new children base.
  pub(crate) fn subdivide(&mut self, slot: usize) -> Result<usize> {
    let cell = self.cells[slot];
    if !cell.is_leaf() {
      return Err(HyperTreeError::cursor(
        "subdivide_leaf",
        format!("slot {slot} is already subdivided"),
      ));
    }
    if cell.level() >= self.config.max_level {
      return Err(HyperTreeError::cursor(
        "subdivide_leaf",
        format!(
          "slot {slot} is at the maximum level {}",
          self.config.max_level
        ),
      ));
    }

    let base = self.cells.len();
    let branch_factor = self.config.branch_factor;
    self.cells.extend((0..self.child_count).map(|index| Cell {
      coord: cell.coord.child(index, branch_factor),
      parent: Some(slot),
      children_base: None,
    }));
    self.cells[slot].children_base = Some(base);
    self.attributes.extend_from_parent(slot, self.child_count);
    Ok(base)
  }

  /// Remove the (all-leaf) child block of `slot` and write its new values.
  pub(crate) fn collapse(&mut self, slot: usize, values: &[f64]) -> Result<()> {
    let Some(children) = self.children(slot) else {
      return Err(HyperTreeError::cursor(
        "collapse_leaf",
        format!("slot {slot} is a leaf"),
      ));
    };
    if let Some(inner) = children.clone().find(|&c| !self.cells[c].is_leaf()) {
      return Err(HyperTreeError::cursor(
        "collapse_leaf",
        format!("child slot {inner} of slot {slot} is not a leaf"),
      ));
    }
    if values.len() != self.attributes.array_count() {
      return Err(HyperTreeError::cursor(
        "collapse_leaf",
        format!(
          "expected {} merged values, got {}",
          self.attributes.array_count(),
          values.len()
        ),
      ));
    }

    let base = children.start;
    let count = self.child_count;
    let end = base + count;
    self.cells.drain(base..end);
    for cell in &mut self.cells {
      if let Some(parent) = cell.parent.as_mut() {
        if *parent >= end {
          *parent -= count;
        }
      }
      if let Some(first) = cell.children_base.as_mut() {
        if *first >= end {
          *first -= count;
        }
      }
    }
    self.cells[slot].children_base = None;
    self.attributes.remove_range(base, count);
    for (index, value) in values.iter().enumerate() {
      self.attributes.set_at(index, slot, *value);
    }
    Ok(())
  }

  /// Check every structural invariant. Returns the first violation found.
  pub fn validate(&self) -> Result<()> {
    let violation = |slot: usize, reason: String| HyperTreeError::InvariantViolation { slot, reason };

    let root = self.cells.first().ok_or_else(|| violation(0, "root is missing".into()))?;
    if root.parent.is_some() || root.level() != 0 {
      return Err(violation(0, "root must have level 0 and no parent".into()));
    }
    if self.attributes.len() != self.cells.len() {
      return Err(violation(
        0,
        format!(
          "attribute length {} differs from slot count {}",
          self.attributes.len(),
          self.cells.len()
        ),
      ));
    }

    let mut reached = 0usize;
    let mut stack = vec![0usize];
    while let Some(slot) = stack.pop() {
      reached += 1;
      let cell = &self.cells[slot];
      let Some(children) = cell.children(self.child_count) else {
        continue;
      };
      if children.end > self.cells.len() || children.start <= slot {
        return Err(violation(slot, format!("child block {children:?} out of range")));
      }
      for (index, child_slot) in children.enumerate() {
        let child = &self.cells[child_slot];
        if child.parent != Some(slot) {
          return Err(violation(child_slot, format!("parent link is not {slot}")));
        }
        if child.level() != cell.level() + 1 {
          return Err(violation(child_slot, "level is not parent level + 1".into()));
        }
        if child.coord != cell.coord.child(index, self.config.branch_factor) {
          return Err(violation(child_slot, "coordinate disagrees with parent".into()));
        }
        stack.push(child_slot);
      }
    }
    if reached != self.cells.len() {
      return Err(violation(
        0,
        format!("{} slots are unreachable from the root", self.cells.len() - reached),
      ));
    }
    Ok(())
  }
}

/// Pre-order leaf iterator over a tree.
pub struct Leaves<'a> {
  tree: &'a Tree,
  stack: Vec<usize>,
}

impl Iterator for Leaves<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    while let Some(slot) = self.stack.pop() {
      match self.tree.children(slot) {
        Some(children) => self.stack.extend(children.rev()),
        None => return Some(slot),
      }
    }
    None
  }
}
