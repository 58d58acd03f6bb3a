//! AttributeStore - named scalar arrays indexed by cell slot.
//!
//! Every array holds exactly one value per allocated slot of the owning tree.
//! The tree grows and shrinks all arrays together; callers only read and
//! write individual values.

use crate::error::{HyperTreeError, Result};

/// Dense, named `f64` arrays sharing one slot index space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeStore {
  names: Vec<String>,
  arrays: Vec<Vec<f64>>,
  len: usize,
}

impl AttributeStore {
  /// Create an empty store sized for `len` slots.
  pub fn with_len(len: usize) -> Self {
    Self {
      names: Vec::new(),
      arrays: Vec::new(),
      len,
    }
  }

  /// Number of slots every array covers.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Number of named arrays.
  #[inline]
  pub fn array_count(&self) -> usize {
    self.arrays.len()
  }

  /// Array names in insertion order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  /// Add an array filled with `fill`. Replaces the contents of an existing
  /// array with the same name.
  pub fn add_array(&mut self, name: &str, fill: f64) {
    match self.index_of(name) {
      Some(index) => self.arrays[index].fill(fill),
      None => {
        self.names.push(name.to_owned());
        self.arrays.push(vec![fill; self.len]);
      }
    }
  }

  /// Position of the array in store order.
  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }

  /// Resolve a name or fail with `UnknownAttribute`.
  pub fn require(&self, name: &str) -> Result<usize> {
    self
      .index_of(name)
      .ok_or_else(|| HyperTreeError::UnknownAttribute(name.to_owned()))
  }

  /// Whole array by name.
  pub fn array(&self, name: &str) -> Result<&[f64]> {
    let index = self.require(name)?;
    Ok(&self.arrays[index])
  }

  /// Whole array by store index.
  #[inline]
  pub fn array_at(&self, index: usize) -> &[f64] {
    &self.arrays[index]
  }

  /// Value of `name` at `slot`.
  pub fn value(&self, name: &str, slot: usize) -> Result<f64> {
    let index = self.require(name)?;
    Ok(self.arrays[index][slot])
  }

  /// Overwrite the value of `name` at `slot`.
  pub fn set_value(&mut self, name: &str, slot: usize, value: f64) -> Result<()> {
    let index = self.require(name)?;
    self.arrays[index][slot] = value;
    Ok(())
  }

  #[inline]
  pub(crate) fn set_at(&mut self, index: usize, slot: usize, value: f64) {
    self.arrays[index][slot] = value;
  }

  /// Append `count` slots, each copying the values of `parent`.
  pub(crate) fn extend_from_parent(&mut self, parent: usize, count: usize) {
    for array in &mut self.arrays {
      let value = array[parent];
      array.resize(array.len() + count, value);
    }
    self.len += count;
  }

  /// Remove the slot range `base..base + count`, shifting later slots down.
  pub(crate) fn remove_range(&mut self, base: usize, count: usize) {
    for array in &mut self.arrays {
      array.drain(base..base + count);
    }
    self.len -= count;
  }
}
