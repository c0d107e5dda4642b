//! Statements and their read / write sets.

use crate::{
  block::ErasedBlock,
  expr::{BinaryOp, ErasedExpr, ExprNode},
  fun::FunSignature,
  scope::ErasedScope,
  var::{VarId, Variable},
};
use std::{collections::BTreeMap, sync::Arc};

/// Ordered set of variables, keyed by identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VarSet(BTreeMap<VarId, Variable>);

impl VarSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, var: &Variable) {
    self.0.entry(var.id).or_insert_with(|| var.clone());
  }

  pub fn extend(&mut self, other: &VarSet) {
    for var in other.iter() {
      self.insert(var);
    }
  }

  pub fn remove(&mut self, var: &Variable) {
    self.0.remove(&var.id);
  }

  pub fn contains(&self, var: &Variable) -> bool {
    self.0.contains_key(&var.id)
  }

  /// Whether a variable with the given name is in the set.
  pub fn contains_name(&self, name: &str) -> bool {
    self.0.values().any(|v| v.name() == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Variable> {
    self.0.values()
  }

  pub fn names(&self) -> Vec<&str> {
    self.0.values().map(Variable::name).collect()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Operator of an augmented assignment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MutateBinOp {
  /// Add, as in `+=`.
  Add,

  /// Subtract, as in `-=`.
  Sub,

  /// Multiply, as in `*=`.
  Mul,

  /// Divide, as in `/=`.
  Div,

  /// Remainder of the division, as in `%=`.
  Rem,
}

impl MutateBinOp {
  /// Binary operator combining the old value with the operand.
  pub fn binary_op(self) -> BinaryOp {
    match self {
      MutateBinOp::Add => BinaryOp::Add,
      MutateBinOp::Sub => BinaryOp::Sub,
      MutateBinOp::Mul => BinaryOp::Mul,
      MutateBinOp::Div => BinaryOp::Div,
      MutateBinOp::Rem => BinaryOp::Rem,
    }
  }

  pub fn symbol(self) -> &'static str {
    match self {
      MutateBinOp::Add => "+=",
      MutateBinOp::Sub => "-=",
      MutateBinOp::Mul => "*=",
      MutateBinOp::Div => "/=",
      MutateBinOp::Rem => "%=",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
  Declare {
    var: Variable,
    init: Option<ErasedExpr>,
  },

  Assign {
    target: ErasedExpr,
    value: ErasedExpr,
  },

  AugmentedAssign {
    target: ErasedExpr,
    op: MutateBinOp,
    value: ErasedExpr,
  },

  /// `if`, followed by zero or more `else if` and an optional `else`.
  If {
    condition: ErasedExpr,
    then: ErasedScope,
    else_ifs: Vec<(ErasedExpr, ErasedScope)>,
    otherwise: Option<ErasedScope>,
  },

  /// `for (var = init; condition; var = update) body`; `var` is declared in `body`.
  For {
    var: Variable,
    init: ErasedExpr,
    condition: ErasedExpr,
    update: ErasedExpr,
    body: ErasedScope,
  },

  While {
    condition: ErasedExpr,
    body: ErasedScope,
  },

  Break,

  Continue,

  Discard,

  Return(Option<ErasedExpr>),

  /// Raw text passed through to the code generator.
  InlineCode(String),

  Block(ErasedBlock),

  /// Call of a user-defined function as a statement.
  Call {
    fun: Arc<FunSignature>,
    args: Vec<ErasedExpr>,
  },
}

/// A statement, with the variables it reads and writes.
///
/// The sets are transitive through sub-expressions and nested scopes. Variables declared inside a nested scope are
/// internal to it and never escape to the enclosing statement’s sets.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
  pub(crate) kind: StatementKind,
  reads: VarSet,
  writes: VarSet,
}

impl Statement {
  pub(crate) fn new(kind: StatementKind) -> Self {
    let mut stmt = Statement {
      kind,
      reads: VarSet::new(),
      writes: VarSet::new(),
    };
    stmt.refresh();
    stmt
  }

  /// Recompute the read and write sets after `kind` was changed in place.
  pub(crate) fn refresh(&mut self) {
    let mut reads = VarSet::new();
    let mut writes = VarSet::new();

    match &self.kind {
      StatementKind::Declare { var, init } => {
        if let Some(init) = init {
          init.collect_reads(&mut reads);
        }
        writes.insert(var);
      }

      StatementKind::Assign { target, value } => {
        value.collect_reads(&mut reads);
        target_effects(target, false, &mut reads, &mut writes);
      }

      StatementKind::AugmentedAssign { target, value, .. } => {
        value.collect_reads(&mut reads);
        target_effects(target, true, &mut reads, &mut writes);
      }

      StatementKind::If {
        condition,
        then,
        else_ifs,
        otherwise,
      } => {
        condition.collect_reads(&mut reads);
        merge_scope(then, &mut reads, &mut writes);

        for (condition, scope) in else_ifs {
          condition.collect_reads(&mut reads);
          merge_scope(scope, &mut reads, &mut writes);
        }

        if let Some(scope) = otherwise {
          merge_scope(scope, &mut reads, &mut writes);
        }
      }

      StatementKind::For {
        var,
        init,
        condition,
        update,
        body,
      } => {
        init.collect_reads(&mut reads);
        condition.collect_reads(&mut reads);
        update.collect_reads(&mut reads);
        merge_scope(body, &mut reads, &mut writes);
        reads.remove(var);
        writes.remove(var);
      }

      StatementKind::While { condition, body } => {
        condition.collect_reads(&mut reads);
        merge_scope(body, &mut reads, &mut writes);
      }

      StatementKind::Return(Some(value)) => value.collect_reads(&mut reads),

      StatementKind::Block(block) => {
        for port in block.inputs() {
          if let Some(value) = port.value() {
            value.collect_reads(&mut reads);
          }
        }

        merge_scope(block.body(), &mut reads, &mut writes);

        // outputs are declared by the block
        for port in block.outputs() {
          writes.insert(port.var());
        }
      }

      StatementKind::Call { args, .. } => {
        for arg in args {
          arg.collect_reads(&mut reads);
        }
      }

      StatementKind::Break
      | StatementKind::Continue
      | StatementKind::Discard
      | StatementKind::Return(None)
      | StatementKind::InlineCode(_) => (),
    }

    self.reads = reads;
    self.writes = writes;
  }

  pub fn kind(&self) -> &StatementKind {
    &self.kind
  }

  /// Variables this statement depends on.
  pub fn reads(&self) -> &VarSet {
    &self.reads
  }

  /// Variables this statement mutates.
  pub fn writes(&self) -> &VarSet {
    &self.writes
  }
}

// An lvalue writes its root variable; indices in it are reads. Augmented assignments also read the old value.
fn target_effects(target: &ErasedExpr, reads_old: bool, reads: &mut VarSet, writes: &mut VarSet) {
  match target.node() {
    ExprNode::Var(v) => {
      writes.insert(v);
      if reads_old {
        reads.insert(v);
      }
    }

    ExprNode::Swizzle(inner, _) => target_effects(inner, reads_old, reads, writes),

    ExprNode::ArrayLookup { object, index } => {
      index.collect_reads(reads);
      target_effects(object, reads_old, reads, writes);
    }

    _ => (),
  }
}

fn merge_scope(scope: &ErasedScope, reads: &mut VarSet, writes: &mut VarSet) {
  reads.extend(&scope.reads());
  writes.extend(&scope.writes());
}
