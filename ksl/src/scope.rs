//! Scopes and control flow.
//!
//! A [`Scope`] is the builder of one lexical scope. Nested scopes (branches, loops, blocks, function bodies) are
//! built by closures receiving their own `&mut Scope`: the closure runs once, synchronously, and the nested scope is
//! closed when it returns, so appending to a closed scope cannot be expressed.
//!
//! Every expression a scope takes in may only read variables declared in that scope or one of its ancestors, or
//! declared at the program or stage level. Infallible calls such as [`Scope::var`] report a violation when their
//! scope closes.

use crate::{
  error::{KslError, Result},
  expr::{expect_class, ErasedExpr, Expr},
  fun::FunSignature,
  stage::{StageBuilder, StageKind},
  stmt::{MutateBinOp, Statement, StatementKind, VarSet},
  types::{ToType, Type, TypeClass},
  var::{ScopeId, StateKind, Var, Variable},
};
use std::{mem, sync::Arc};
use tracing::trace;

/// Kind of a scope, used to validate control flow.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScopeKind {
  /// Function body, with its return type.
  Function { ret: Option<Type> },
  /// Block body.
  Block,
  /// Branch of a conditional.
  Branch,
  /// Loop body.
  Loop,
}

/// A finished scope.
#[derive(Clone, Debug, PartialEq)]
pub struct ErasedScope {
  id: ScopeId,
  kind: ScopeKind,
  pub(crate) statements: Vec<Statement>,
  pub(crate) declared: Vec<Variable>,
}

impl ErasedScope {
  pub(crate) fn new(id: ScopeId, kind: ScopeKind) -> Self {
    Self {
      id,
      kind,
      statements: Vec::new(),
      declared: Vec::new(),
    }
  }

  pub fn id(&self) -> ScopeId {
    self.id
  }

  pub fn kind(&self) -> ScopeKind {
    self.kind
  }

  pub fn statements(&self) -> &[Statement] {
    &self.statements
  }

  /// Variables declared directly in this scope.
  pub fn declared(&self) -> &[Variable] {
    &self.declared
  }

  /// Variables read by the statements of this scope and declared outside of it.
  pub fn reads(&self) -> VarSet {
    self.collect(Statement::reads)
  }

  /// Variables written by the statements of this scope and declared outside of it.
  pub fn writes(&self) -> VarSet {
    self.collect(Statement::writes)
  }

  fn collect(&self, f: impl Fn(&Statement) -> &VarSet) -> VarSet {
    let mut set = VarSet::new();

    for stmt in &self.statements {
      set.extend(f(stmt));
    }

    for var in &self.declared {
      set.remove(var);
    }

    set
  }
}

/// Frame of the scope chain being built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Frame {
  pub(crate) id: ScopeId,
  pub(crate) kind: ScopeKind,
}

/// Builder of a lexical scope.
#[derive(Debug)]
pub struct Scope {
  pub(crate) stage: StageBuilder,
  pub(crate) erased: ErasedScope,
  // first error of an infallible call, reported on exit
  deferred: Option<KslError>,
}

impl Scope {
  pub(crate) fn enter(mut stage: StageBuilder, id: ScopeId, kind: ScopeKind) -> Self {
    stage.frames.push(Frame { id, kind });

    Scope {
      stage,
      erased: ErasedScope::new(id, kind),
      deferred: None,
    }
  }

  pub(crate) fn exit(mut self) -> (StageBuilder, Result<ErasedScope>) {
    self.stage.frames.pop();

    let erased = match self.deferred {
      Some(err) => Err(err),
      None => Ok(self.erased),
    };

    (self.stage, erased)
  }

  /// Build a nested scope with `body`.
  pub(crate) fn nested(
    &mut self,
    kind: ScopeKind,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<ErasedScope> {
    let id = self.stage.program.next_scope_id();
    let mut child = Scope::enter(mem::take(&mut self.stage), id, kind);
    let res = body(&mut child);
    let (stage, erased) = child.exit();
    self.stage = stage;

    res.and(erased)
  }

  pub(crate) fn push(&mut self, kind: StatementKind) {
    self.erased.statements.push(Statement::new(kind));
  }

  pub fn id(&self) -> ScopeId {
    self.erased.id
  }

  pub fn kind(&self) -> ScopeKind {
    self.erased.kind
  }

  pub fn statements(&self) -> &[Statement] {
    &self.erased.statements
  }

  /// Stage this scope belongs to, to declare stage and program resources.
  pub fn stage(&mut self) -> &mut StageBuilder {
    &mut self.stage
  }

  pub fn stage_kind(&self) -> StageKind {
    self.stage.kind()
  }

  /// Check that every variable read by `expr` is visible from this scope.
  pub fn check_reads(&self, expr: &ErasedExpr) -> Result<()> {
    match expr.reads().iter().find(|var| !self.stage.is_visible(var)) {
      Some(var) => Err(KslError::OutOfScope {
        var: var.name().to_owned(),
        declared: var.scope().to_string(),
        scope: self.erased.id.to_string(),
      }),
      None => Ok(()),
    }
  }

  fn defer(&mut self, res: Result<()>) {
    if let Err(err) = res {
      self.deferred.get_or_insert(err);
    }
  }

  /// Declare a new variable, with an optional initializer and an optional explicit name.
  ///
  /// Without a name, a fresh one derived from the type is allocated from the program name pool.
  pub fn declare_variable(&mut self, ty: Type, init: Option<ErasedExpr>, name: Option<&str>) -> Result<Variable> {
    if let Some(init) = &init {
      expect_class("declaration", "initializer", &init.ty(), TypeClass::Exactly(ty))?;
      self.check_reads(init)?;
    }

    let name = match name {
      Some(name) => self.stage.program.names.reserve(name)?,
      None => self.stage.program.names.next_name(&ty.name_prefix()),
    };

    Ok(self.declare(name, ty, init))
  }

  fn declare(&mut self, name: Arc<str>, ty: Type, init: Option<ErasedExpr>) -> Variable {
    let var = self.stage.program.new_variable(name, ty, self.erased.id, StateKind::Local);
    trace!(var = %var, ty = %ty, scope = %self.erased.id, "declared variable");

    self.erased.declared.push(var.clone());
    self.push(StatementKind::Declare {
      var: var.clone(),
      init,
    });

    var
  }

  /// Bind an expression to a fresh variable.
  pub fn var<T>(&mut self, init: impl Into<Expr<T>>) -> Var<T>
  where
    T: ToType,
  {
    let init = init.into().erased;
    let visible = self.check_reads(&init);
    self.defer(visible);

    let ty = T::ty();
    let name = self.stage.program.names.next_name(&ty.name_prefix());
    Var::new(self.declare(name, ty, Some(init)))
  }

  /// Declare a fresh variable without initializer.
  pub fn var_uninit<T>(&mut self) -> Var<T>
  where
    T: ToType,
  {
    let ty = T::ty();
    let name = self.stage.program.names.next_name(&ty.name_prefix());
    Var::new(self.declare(name, ty, None))
  }

  /// Bind an expression to a variable with an explicit name.
  pub fn named_var<T>(&mut self, name: &str, init: impl Into<Expr<T>>) -> Result<Var<T>>
  where
    T: ToType,
  {
    let init = init.into().erased;
    self.check_reads(&init)?;

    let name = self.stage.program.names.reserve(name)?;
    Ok(Var::new(self.declare(name, T::ty(), Some(init))))
  }

  /// Assign a value to an lvalue.
  pub fn assign(&mut self, target: ErasedExpr, value: ErasedExpr) -> Result<()> {
    self.check_target(&target)?;
    expect_class("=", "value", &value.ty(), TypeClass::Exactly(target.ty()))?;
    self.check_reads(&value)?;

    self.push(StatementKind::Assign { target, value });
    Ok(())
  }

  /// Combine an lvalue with a value and write the result back.
  pub fn augmented_assign(&mut self, target: ErasedExpr, op: MutateBinOp, value: ErasedExpr) -> Result<()> {
    self.check_target(&target)?;

    let ty = op.binary_op().result_type(&target.ty(), &value.ty())?;
    if ty != target.ty() {
      return Err(KslError::type_mismatch(
        op.symbol(),
        "value",
        format!("operand keeping the {} target type", target.ty()),
        value.ty(),
      ));
    }
    self.check_reads(&value)?;

    self.push(StatementKind::AugmentedAssign { target, op, value });
    Ok(())
  }

  /// Mutate a variable, swizzled variable or array element, optionally combining with its current value.
  pub fn set<T>(
    &mut self,
    target: impl Into<Expr<T>>,
    bin_op: impl Into<Option<MutateBinOp>>,
    value: impl Into<Expr<T>>,
  ) -> Result<()> {
    let target = target.into().erased;
    let value = value.into().erased;

    match bin_op.into() {
      None => self.assign(target, value),
      Some(op) => self.augmented_assign(target, op, value),
    }
  }

  // the target root must be visible and writable; indices of the target are plain reads
  fn check_target(&self, target: &ErasedExpr) -> Result<()> {
    let var = target
      .lvalue_root()
      .ok_or_else(|| KslError::invalid_target(target, "not an assignable expression"))?;

    if !self.stage.is_visible(var) {
      return Err(KslError::invalid_target(
        var,
        format!(
          "declared in scope {}, which does not enclose scope {}",
          var.scope(),
          self.erased.id
        ),
      ));
    }

    self.stage.check_writable(var)?;
    self.check_reads(target)
  }

  /// Conditionally run a block of statements.
  ///
  /// The returned [`When`] chains `else if` and `else` branches.
  pub fn when(
    &mut self,
    condition: impl Into<Expr<bool>>,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<When<'_>> {
    self.if_erased(condition.into().erased, body)
  }

  /// Run a block of statements when the condition is false.
  pub fn unless(
    &mut self,
    condition: impl Into<Expr<bool>>,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<When<'_>> {
    self.if_erased((!condition.into()).erased, body)
  }

  pub fn if_erased(
    &mut self,
    condition: ErasedExpr,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<When<'_>> {
    expect_class("if", "condition", &condition.ty(), TypeClass::Bool)?;
    self.check_reads(&condition)?;

    let then = self.nested(ScopeKind::Branch, body)?;
    self.push(StatementKind::If {
      condition,
      then,
      else_ifs: Vec::new(),
      otherwise: None,
    });
    let index = self.erased.statements.len() - 1;

    Ok(When { scope: self, index })
  }

  /// Loop with an explicit loop variable.
  ///
  /// The loop variable is declared in the loop scope and initialized with `init`; `condition` and `iter_fold` map
  /// the loop variable to the continuation condition and to its next value.
  pub fn loop_for<T>(
    &mut self,
    init: impl Into<Expr<T>>,
    condition: impl FnOnce(&Expr<T>) -> Expr<bool>,
    iter_fold: impl FnOnce(&Expr<T>) -> Expr<T>,
    body: impl FnOnce(&mut Scope, &Expr<T>) -> Result<()>,
  ) -> Result<()>
  where
    T: ToType,
  {
    let init = init.into().erased;
    self.check_reads(&init)?;
    let mut header = None;

    let body = self.nested(ScopeKind::Loop, |s| {
      let ty = T::ty();
      let name = s.stage.program.names.next_name(&ty.name_prefix());
      let var = s.stage.program.new_variable(name, ty, s.erased.id, StateKind::Local);
      s.erased.declared.push(var.clone());

      let expr = Expr::new(ErasedExpr::var(&var));
      let (condition, update) = (condition(&expr).erased, iter_fold(&expr).erased);
      s.check_reads(&condition)?;
      s.check_reads(&update)?;
      header = Some((var, condition, update));

      body(s, &expr)
    })?;

    if let Some((var, condition, update)) = header {
      self.push(StatementKind::For {
        var,
        init,
        condition,
        update,
        body,
      });
    }

    Ok(())
  }

  /// Loop over `from..to` with an `int` counter.
  pub fn fori(
    &mut self,
    from: impl Into<Expr<i32>>,
    to: impl Into<Expr<i32>>,
    body: impl FnOnce(&mut Scope, &Expr<i32>) -> Result<()>,
  ) -> Result<()> {
    let to = to.into();
    self.loop_for(from, |i| i.lt(to), |i| i + 1, body)
  }

  /// Loop while a condition holds.
  pub fn loop_while(
    &mut self,
    condition: impl Into<Expr<bool>>,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<()> {
    let condition = condition.into().erased;
    expect_class("while", "condition", &condition.ty(), TypeClass::Bool)?;
    self.check_reads(&condition)?;

    let body = self.nested(ScopeKind::Loop, body)?;

    self.push(StatementKind::While { condition, body });
    Ok(())
  }

  /// Whether a loop encloses this scope within the current function.
  pub fn is_in_loop(&self) -> bool {
    for frame in self.stage.frames.iter().rev() {
      match frame.kind {
        ScopeKind::Loop => return true,
        ScopeKind::Function { .. } => return false,
        _ => (),
      }
    }

    false
  }

  pub fn loop_continue(&mut self) -> Result<()> {
    self.loop_jump("continue", StatementKind::Continue)
  }

  pub fn loop_break(&mut self) -> Result<()> {
    self.loop_jump("break", StatementKind::Break)
  }

  fn loop_jump(&mut self, statement: &str, kind: StatementKind) -> Result<()> {
    if !self.is_in_loop() {
      return Err(KslError::illegal_control_flow(
        statement,
        "no enclosing loop in the current function",
      ));
    }

    self.push(kind);
    Ok(())
  }

  /// Discard the current fragment.
  pub fn discard(&mut self) -> Result<()> {
    let stage = self.stage.kind();

    if stage != StageKind::Fragment {
      return Err(KslError::illegal_control_flow(
        "discard",
        format!("only allowed in the fragment stage, not the {} stage", stage),
      ));
    }

    self.push(StatementKind::Discard);
    Ok(())
  }

  /// Early-return a value from the current function.
  pub fn leave<T>(&mut self, ret: impl Into<Expr<T>>) -> Result<()> {
    self.return_erased(Some(ret.into().erased))
  }

  /// Early-return from the current void function.
  pub fn abort(&mut self) -> Result<()> {
    self.return_erased(None)
  }

  pub fn return_erased(&mut self, value: Option<ErasedExpr>) -> Result<()> {
    let ret = self
      .stage
      .frames
      .iter()
      .rev()
      .find_map(|frame| match frame.kind {
        ScopeKind::Function { ret } => Some(ret),
        _ => None,
      })
      .ok_or_else(|| KslError::illegal_control_flow("return", "outside of a function"))?;

    match (ret, &value) {
      (Some(expected), Some(value)) if value.ty() != expected => {
        return Err(KslError::type_mismatch("return", "value", expected, value.ty()))
      }
      (Some(expected), None) => return Err(KslError::type_mismatch("return", "value", expected, "nothing")),
      (None, Some(value)) => return Err(KslError::type_mismatch("return", "value", "nothing", value.ty())),
      _ => (),
    }

    if let Some(value) = &value {
      self.check_reads(value)?;
    }

    self.push(StatementKind::Return(value));
    Ok(())
  }

  /// Pass raw code through to the code generator.
  pub fn inline_code(&mut self, code: impl Into<String>) {
    self.push(StatementKind::InlineCode(code.into()));
  }

  /// Call a user-defined function as a statement.
  pub fn invoke(&mut self, fun: &Arc<FunSignature>, args: Vec<ErasedExpr>) -> Result<()> {
    let arg_types: Vec<_> = args.iter().map(ErasedExpr::ty).collect();
    fun.check_args(&arg_types)?;

    for arg in &args {
      self.check_reads(arg)?;
    }

    self.push(StatementKind::Call {
      fun: fun.clone(),
      args,
    });
    Ok(())
  }
}

/// Conditional chain under construction.
///
/// Returned by [`Scope::when`], it adds `else if` branches with [`When::or_else`] and closes the chain with an
/// `else` branch with [`When::or`].
#[derive(Debug)]
pub struct When<'a> {
  scope: &'a mut Scope,
  index: usize,
}

impl When<'_> {
  /// Add an `else if` branch.
  pub fn or_else(
    self,
    condition: impl Into<Expr<bool>>,
    body: impl FnOnce(&mut Scope) -> Result<()>,
  ) -> Result<Self> {
    self.or_else_erased(condition.into().erased, body)
  }

  pub fn or_else_erased(mut self, condition: ErasedExpr, body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<Self> {
    expect_class("else if", "condition", &condition.ty(), TypeClass::Bool)?;
    self.scope.check_reads(&condition)?;

    let branch = self.scope.nested(ScopeKind::Branch, body)?;
    self.update(|kind| {
      if let StatementKind::If { else_ifs, .. } = kind {
        else_ifs.push((condition, branch));
      }
    });

    Ok(self)
  }

  /// Add the final `else` branch.
  pub fn or(mut self, body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<()> {
    let branch = self.scope.nested(ScopeKind::Branch, body)?;
    self.update(|kind| {
      if let StatementKind::If { otherwise, .. } = kind {
        *otherwise = Some(branch);
      }
    });

    Ok(())
  }

  fn update(&mut self, f: impl FnOnce(&mut StatementKind)) {
    if let Some(stmt) = self.scope.erased.statements.get_mut(self.index) {
      f(&mut stmt.kind);
      stmt.refresh();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{error::ErrorKind, lit, program::Program, stage::StageKind};

  fn vertex_main(body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<Program> {
    let mut program = Program::new("scopes");
    program.vertex_stage(|stage| stage.main(body))?;
    Ok(program)
  }

  fn main_statements(program: &Program) -> &[Statement] {
    program
      .stage(StageKind::Vertex)
      .and_then(|stage| stage.main())
      .map(|main| main.scope().statements())
      .unwrap_or_default()
  }

  #[test]
  fn loop_variable_lives_in_the_loop() {
    let program = vertex_main(|s| {
      let acc = s.named_var::<i32>("acc", 0i32)?;
      s.fori(0i32, 4i32, |s, i| s.set(&acc, MutateBinOp::Add, i))
    })
    .unwrap();

    let stmts = main_statements(&program);
    let StatementKind::For { var, body, .. } = stmts[1].kind() else {
      panic!("for expected");
    };

    assert_eq!(body.kind(), ScopeKind::Loop);
    assert_eq!(var.scope(), body.id());
    assert!(body.declared().contains(var));
    assert!(!stmts[1].reads().contains(var));
    assert!(!stmts[1].writes().contains(var));
    assert_eq!(stmts[1].reads().names(), ["acc"]);
    assert_eq!(stmts[1].writes().names(), ["acc"]);
  }

  #[test]
  fn loop_header_reads_outer_variables() {
    let program = vertex_main(|s| {
      let limit = s.named_var::<f32>("limit", 8f32)?;
      let step = s.named_var::<f32>("step", 0.5f32)?;
      s.loop_for::<f32>(0f32, |x| x.lt(&limit), |x| x + &step, |_, _| Ok(()))
    })
    .unwrap();

    let stmt = &main_statements(&program)[2];
    assert!(matches!(stmt.kind(), StatementKind::For { .. }));
    assert_eq!(stmt.reads().names(), ["limit", "step"]);
    assert!(stmt.writes().is_empty());
  }

  #[test]
  fn continue_needs_a_loop() {
    let err = vertex_main(|s| s.loop_continue()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalControlFlow);

    let program = vertex_main(|s| {
      s.fori(0i32, 4i32, |s, i| {
        s.when(i.eq(2i32), |s| s.loop_continue())?;
        Ok(())
      })
    })
    .unwrap();

    let StatementKind::For { body, .. } = main_statements(&program)[0].kind() else {
      panic!("for expected");
    };
    let StatementKind::If { then, .. } = body.statements()[0].kind() else {
      panic!("if expected");
    };
    assert_eq!(then.statements()[0].kind(), &StatementKind::Continue);
  }

  #[test]
  fn when_chains_else_branches() {
    let program = vertex_main(|s| {
      let x = s.named_var::<f32>("x", 0f32)?;
      let y = s.named_var::<f32>("y", 0f32)?;
      let z = s.named_var::<f32>("z", 0f32)?;

      s.when(x.lt(1f32), |s| s.set(&y, None, 1f32))?
        .or_else(x.lt(2f32), |s| s.set(&y, None, 2f32))?
        .or(|s| s.set(&z, None, 3f32))
    })
    .unwrap();

    let stmt = &main_statements(&program)[3];
    let StatementKind::If {
      else_ifs, otherwise, ..
    } = stmt.kind()
    else {
      panic!("if expected");
    };

    assert_eq!(else_ifs.len(), 1);
    assert!(otherwise.is_some());
    assert_eq!(stmt.reads().names(), ["x"]);
    assert_eq!(stmt.writes().names(), ["y", "z"]);
  }

  #[test]
  fn while_merges_its_body() {
    let program = vertex_main(|s| {
      let x = s.named_var::<f32>("x", 0f32)?;
      let y = s.named_var::<f32>("y", 0f32)?;

      s.loop_while(x.lt(4f32), |s| {
        let tmp = s.var(&y * 2f32);
        s.set(&x, MutateBinOp::Add, &tmp)
      })
    })
    .unwrap();

    let stmt = &main_statements(&program)[2];
    let StatementKind::While { body, .. } = stmt.kind() else {
      panic!("while expected");
    };

    let tmp = &body.declared()[0];
    assert!(!stmt.reads().contains(tmp));
    assert!(!stmt.writes().contains(tmp));
    assert_eq!(stmt.reads().names(), ["x", "y"]);
    assert_eq!(stmt.writes().names(), ["x"]);
  }

  fn float_function(body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<Program> {
    let mut program = Program::new("scopes");
    program.vertex_stage(|stage| {
      stage.function(None, vec![], Some(f32::ty()), |s, _| {
        body(s)?;
        Ok(None)
      })?;
      Ok(())
    })?;
    Ok(program)
  }

  #[test]
  fn returned_values_match_the_signature() {
    float_function(|s| s.leave(1f32)).unwrap();

    let err = float_function(|s| s.leave(1i32)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let err = float_function(|s| s.abort()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let err = vertex_main(|s| s.leave(1f32)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
  }

  #[test]
  fn nested_scopes_assign_ancestor_variables() {
    let program = vertex_main(|s| {
      let x = s.named_var::<f32>("x", 0f32)?;

      s.when(lit!(true), |s| {
        s.fori(0i32, 2i32, |s, _| {
          s.when(x.lt(1f32), |s| s.set(&x, MutateBinOp::Add, 1f32))?;
          Ok(())
        })
      })?;
      Ok(())
    })
    .unwrap();

    assert_eq!(main_statements(&program)[1].writes().names(), ["x"]);
  }

  #[test]
  fn escaped_variables_cannot_be_read() {
    let err = vertex_main(|s| {
      let mut escaped = None;

      s.when(lit!(true), |s| {
        escaped = Some(s.var(1f32));
        Ok(())
      })?;

      if let Some(escaped) = escaped {
        s.var(escaped + 1f32);
      }

      Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, KslError::OutOfScope { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidTarget);

    let err = vertex_main(|s| {
      let mut escaped = None;

      s.fori(0i32, 2i32, |_, i| {
        escaped = Some(i.clone());
        Ok(())
      })?;

      match escaped {
        Some(i) => s.when(i.eq(1i32), |_| Ok(())).map(|_| ()),
        None => Ok(()),
      }
    })
    .unwrap_err();

    assert!(matches!(err, KslError::OutOfScope { .. }));
  }

  #[test]
  fn stage_locals_do_not_cross_stages() {
    let mut program = Program::new("scopes");
    let mut local = None;

    program
      .vertex_stage(|stage| {
        stage.main(|s| {
          local = Some(s.var(1f32));
          Ok(())
        })
      })
      .unwrap();

    let err = program
      .fragment_stage(|stage| {
        stage.main(|s| match &local {
          Some(local) => s.named_var::<f32>("copy", local).map(|_| ()),
          None => Ok(()),
        })
      })
      .unwrap_err();

    assert!(matches!(err, KslError::OutOfScope { .. }));
  }

  #[test]
  fn functions_do_not_see_caller_locals() {
    let err = vertex_main(|s| {
      let local = s.var(0f32);

      s.stage().function(None, vec![], None, |f, _| {
        f.set(&local, None, 5f32)?;
        Ok(None)
      })?;

      Ok(())
    })
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidTarget);

    let err = vertex_main(|s| {
      let local = s.var(0f32);

      s.stage().function(None, vec![], Some(f32::ty()), |_, _| Ok(Some(local.to_expr().into_erased())))?;

      Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, KslError::OutOfScope { .. }));
  }
}
