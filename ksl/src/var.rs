//! Variables: named, typed state slots.

use crate::{
  builtin::BuiltIn,
  erased::Erased,
  expr::{ErasedExpr, Expr},
  types::Type,
};
use std::{fmt, ops::Deref, sync::Arc};

/// Program-unique variable identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(pub(crate) u32);

/// Program-unique scope identifier.
///
/// Scope `0` is the program scope, holding uniforms and inter-stage values; every stage also owns a root scope for
/// its attributes, outputs and built-ins.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
  pub const PROGRAM: ScopeId = ScopeId(0);
}

impl fmt::Display for ScopeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// What kind of state a [`Variable`] designates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StateKind {
  /// Local variable declared in a function, branch, loop or block body.
  Local,
  Uniform,
  VertexAttribute,
  InstanceAttribute,
  /// Value written by the vertex stage and read, interpolated, by the fragment stage.
  InterStage,
  FragmentOutput,
  BuiltIn(BuiltIn),
  FunctionArg,
  BlockInput,
  BlockOutput,
}

impl StateKind {
  /// Read-only state rejects assignments whatever the stage.
  pub fn is_read_only(&self) -> bool {
    match self {
      StateKind::Uniform
      | StateKind::VertexAttribute
      | StateKind::InstanceAttribute
      | StateKind::BlockInput => true,
      StateKind::BuiltIn(b) => !b.is_writable(),
      _ => false,
    }
  }
}

impl fmt::Display for StateKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StateKind::Local => f.write_str("local"),
      StateKind::Uniform => f.write_str("uniform"),
      StateKind::VertexAttribute => f.write_str("vertex attribute"),
      StateKind::InstanceAttribute => f.write_str("instance attribute"),
      StateKind::InterStage => f.write_str("inter-stage value"),
      StateKind::FragmentOutput => f.write_str("fragment output"),
      StateKind::BuiltIn(_) => f.write_str("built-in"),
      StateKind::FunctionArg => f.write_str("function argument"),
      StateKind::BlockInput => f.write_str("block input"),
      StateKind::BlockOutput => f.write_str("block output"),
    }
  }
}

/// A named, typed storage slot declared in exactly one scope.
///
/// Variables are cheap to clone: expressions hold them as shared read-only handles.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
  pub(crate) id: VarId,
  pub(crate) name: Arc<str>,
  pub(crate) ty: Type,
  pub(crate) scope: ScopeId,
  pub(crate) kind: StateKind,
}

impl Variable {
  pub fn id(&self) -> VarId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn ty(&self) -> Type {
    self.ty
  }

  /// Identity of the declaring scope.
  pub fn scope(&self) -> ScopeId {
    self.scope
  }

  pub fn kind(&self) -> StateKind {
    self.kind
  }
}

impl fmt::Display for Variable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

/// Typed mutable variable.
///
/// A [`Var<T>`] is an [`Expr<T>`] that can also be the target of [`Scope::set`](crate::scope::Scope::set).
#[derive(Debug)]
pub struct Var<T> {
  expr: Expr<T>,
  variable: Variable,
}

impl<T> Var<T> {
  pub(crate) fn new(variable: Variable) -> Self {
    Self {
      expr: Expr::new(ErasedExpr::var(&variable)),
      variable,
    }
  }

  pub fn variable(&self) -> &Variable {
    &self.variable
  }

  /// Expression reading this variable.
  pub fn to_expr(&self) -> Expr<T> {
    self.expr.clone()
  }
}

impl<T> Clone for Var<T> {
  fn clone(&self) -> Self {
    Self {
      expr: self.expr.clone(),
      variable: self.variable.clone(),
    }
  }
}

impl<T> Deref for Var<T> {
  type Target = Expr<T>;

  fn deref(&self) -> &Self::Target {
    &self.expr
  }
}

impl<T> From<Var<T>> for Expr<T> {
  fn from(v: Var<T>) -> Self {
    v.expr
  }
}

impl<'a, T> From<&'a Var<T>> for Expr<T> {
  fn from(v: &'a Var<T>) -> Self {
    v.expr.clone()
  }
}

impl<T> Erased for Var<T> {
  type Erased = ErasedExpr;

  fn to_erased(self) -> Self::Erased {
    self.expr.erased
  }

  fn erased(&self) -> &Self::Erased {
    &self.expr.erased
  }
}
