//! Error type shared by every engine operation.

use thiserror::Error;

/// Errors raised by forest construction, cursor primitives and the engines.
///
/// All of these are local and synchronous. None of them is recoverable by
/// retrying; the caller has to fix its input or its call sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HyperTreeError {
  /// A source array does not have one value per source cell.
  #[error("attribute array `{name}` has {actual} values, expected {expected}")]
  DimensionMismatch {
    name: String,
    expected: usize,
    actual: usize,
  },

  /// A cursor precondition was violated.
  #[error("invalid cursor operation `{operation}`: {reason}")]
  InvalidCursorOperation {
    operation: &'static str,
    reason: String,
  },

  /// The balance fixpoint loop hit its pass limit.
  #[error("2:1 balance did not converge after {passes} passes")]
  BalanceDidNotConverge { passes: usize },

  /// No attribute array with this name exists.
  #[error("unknown attribute array `{0}`")]
  UnknownAttribute(String),

  /// Forest parameters or source geometry are unusable.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// A structural invariant does not hold (reported by `Tree::validate`).
  #[error("invariant violated at slot {slot}: {reason}")]
  InvariantViolation { slot: usize, reason: String },
}

impl HyperTreeError {
  pub(crate) fn cursor(operation: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidCursorOperation {
      operation,
      reason: reason.into(),
    }
  }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HyperTreeError>;
