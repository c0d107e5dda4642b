//! Construction errors.
//!
//! Every fallible construction call returns a [`Result`]. Errors are not retryable: they point at the composition
//! call that introduced the mistake, the same way a compiler error points at a line.

use std::fmt;

/// Coarse classification of a [`KslError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
  TypeMismatch,
  InvariantViolation,
  IllegalControlFlow,
  InvalidTarget,
  NameCollision,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum KslError {
  /// An operand doesn’t satisfy the constraint of the operation it’s passed to.
  #[error("type mismatch in `{op}`: {operand} must be {expected}, found {found}")]
  TypeMismatch {
    op: String,
    operand: String,
    expected: String,
    found: String,
  },

  /// A component or element index is out of the source range.
  #[error("index out of range in `{op}`: {index} is not below {len}")]
  IndexOutOfRange { op: String, index: usize, len: usize },

  #[error("output port `{port}` of block `{block}` was never assigned")]
  UnassignedOutput { block: String, port: String },

  #[error("output port `{port}` of block `{block}` was assigned {count} times")]
  OutputReassigned {
    block: String,
    port: String,
    count: usize,
  },

  #[error("input port `{port}` of block `{block}` is not wired and has no default")]
  UnwiredInput { block: String, port: String },

  /// A fixed-size resource cannot hold the requested element.
  #[error("{what}: requested {requested}, capacity is {capacity}")]
  CapacityExceeded {
    what: String,
    requested: usize,
    capacity: usize,
  },

  #[error("`{statement}` is not allowed here: {reason}")]
  IllegalControlFlow { statement: String, reason: String },

  #[error("invalid assignment target `{target}`: {reason}")]
  InvalidTarget { target: String, reason: String },

  /// An expression refers to a variable declared outside of the scope chain it is used in.
  #[error("variable `{var}` declared in scope {declared} is not visible from scope {scope}")]
  OutOfScope {
    var: String,
    declared: String,
    scope: String,
  },

  #[error("name `{name}` is already taken")]
  NameCollision { name: String },

  #[error("{item} requires the {expected} stage, used in the {found} stage")]
  StageMismatch {
    item: String,
    expected: String,
    found: String,
  },
}

impl KslError {
  pub(crate) fn type_mismatch(
    op: impl fmt::Display,
    operand: impl fmt::Display,
    expected: impl fmt::Display,
    found: impl fmt::Display,
  ) -> Self {
    KslError::TypeMismatch {
      op: op.to_string(),
      operand: operand.to_string(),
      expected: expected.to_string(),
      found: found.to_string(),
    }
  }

  pub(crate) fn illegal_control_flow(statement: &str, reason: impl Into<String>) -> Self {
    KslError::IllegalControlFlow {
      statement: statement.to_owned(),
      reason: reason.into(),
    }
  }

  pub(crate) fn invalid_target(target: impl fmt::Display, reason: impl Into<String>) -> Self {
    KslError::InvalidTarget {
      target: target.to_string(),
      reason: reason.into(),
    }
  }

  /// Map the error to its taxonomy class.
  ///
  /// Block port mistakes and capacity violations are invariant violations; swizzle and index bound errors belong to
  /// the type mismatch class; stage misuse is an illegal control flow. Reading an out-of-scope variable is an invalid
  /// target, like writing one.
  pub fn kind(&self) -> ErrorKind {
    match self {
      KslError::TypeMismatch { .. } | KslError::IndexOutOfRange { .. } => ErrorKind::TypeMismatch,
      KslError::UnassignedOutput { .. }
      | KslError::OutputReassigned { .. }
      | KslError::UnwiredInput { .. }
      | KslError::CapacityExceeded { .. } => ErrorKind::InvariantViolation,
      KslError::IllegalControlFlow { .. } | KslError::StageMismatch { .. } => ErrorKind::IllegalControlFlow,
      KslError::InvalidTarget { .. } | KslError::OutOfScope { .. } => ErrorKind::InvalidTarget,
      KslError::NameCollision { .. } => ErrorKind::NameCollision,
    }
  }
}

pub type Result<T> = std::result::Result<T, KslError>;
