//! Shader stages.
//!
//! A [`StageBuilder`] declares the resources of one stage (attributes, outputs, built-ins, uniforms, inter-stage
//! values), its user-defined functions and its main function. Built by [`Program::vertex_stage`] and
//! [`Program::fragment_stage`], it yields a read-only [`Stage`].
//!
//! [`Program::vertex_stage`]: crate::program::Program::vertex_stage
//! [`Program::fragment_stage`]: crate::program::Program::fragment_stage

use crate::{
  builtin::{BuiltIn, FragmentBuiltIn, VertexBuiltIn},
  data::{ArmatureData, DataBlock, DataBlockKind, MorphWeightData},
  error::{KslError, Result},
  expr::{expect_class, ErasedExpr, Expr},
  fun::{ErasedFun, FunHandle, FunReturn, FunSignature, ToFun},
  program::ProgramData,
  scope::{ErasedScope, Frame, Scope, ScopeKind},
  types::{ToType, Type, TypeClass, V2, V4},
  var::{ScopeId, StateKind, Var, Variable},
};
use indexmap::IndexMap;
use std::{fmt, mem, sync::Arc};
use tracing::debug;

/// Pipeline stage.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum StageKind {
  #[default]
  Vertex,
  Fragment,
}

impl StageKind {
  /// Root scope of the stage, holding its attributes, outputs and built-ins.
  pub fn root_scope(self) -> ScopeId {
    match self {
      StageKind::Vertex => ScopeId(1),
      StageKind::Fragment => ScopeId(2),
    }
  }
}

impl fmt::Display for StageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageKind::Vertex => f.write_str("vertex"),
      StageKind::Fragment => f.write_str("fragment"),
    }
  }
}

/// A finished stage.
#[derive(Clone, Debug)]
pub struct Stage {
  kind: StageKind,
  attributes: Vec<Variable>,
  outputs: Vec<Variable>,
  builtins: Vec<Variable>,
  functions: Vec<ErasedFun>,
  main: Option<ErasedFun>,
}

impl Stage {
  pub fn kind(&self) -> StageKind {
    self.kind
  }

  /// Vertex and instance attributes, in declaration order.
  pub fn attributes(&self) -> &[Variable] {
    &self.attributes
  }

  /// Fragment outputs, in declaration order.
  pub fn outputs(&self) -> &[Variable] {
    &self.outputs
  }

  pub fn builtins(&self) -> &[Variable] {
    &self.builtins
  }

  /// User-defined functions, in definition order.
  pub fn functions(&self) -> &[ErasedFun] {
    &self.functions
  }

  pub fn main(&self) -> Option<&ErasedFun> {
    self.main.as_ref()
  }
}

/// Stage builder.
///
/// Resources shared by both stages (uniforms, inter-stage values, data blocks) are program-level: declaring them from
/// either stage yields the same variable.
#[derive(Debug, Default)]
pub struct StageBuilder {
  pub(crate) program: ProgramData,
  kind: StageKind,
  pub(crate) frames: Vec<Frame>,
  attributes: IndexMap<Arc<str>, Variable>,
  outputs: Vec<Variable>,
  builtins: IndexMap<BuiltIn, Variable>,
  functions: Vec<ErasedFun>,
  main: Option<ErasedFun>,
}

impl StageBuilder {
  pub(crate) fn new(kind: StageKind, program: ProgramData) -> Self {
    Self {
      program,
      kind,
      ..Self::default()
    }
  }

  pub(crate) fn finish(self) -> (ProgramData, Stage) {
    let stage = Stage {
      kind: self.kind,
      attributes: self.attributes.into_values().collect(),
      outputs: self.outputs,
      builtins: self.builtins.into_values().collect(),
      functions: self.functions,
      main: self.main,
    };

    (self.program, stage)
  }

  pub fn kind(&self) -> StageKind {
    self.kind
  }

  /// Whether a variable can be referred to from the scope being built.
  pub(crate) fn is_visible(&self, var: &Variable) -> bool {
    let scope = var.scope();
    scope == ScopeId::PROGRAM || scope == self.kind.root_scope() || self.frames.iter().any(|frame| frame.id == scope)
  }

  pub(crate) fn check_writable(&self, var: &Variable) -> Result<()> {
    let kind = var.kind();

    if kind.is_read_only() {
      return Err(KslError::invalid_target(var, format!("{} is read-only", kind)));
    }

    if kind == StateKind::InterStage && self.kind != StageKind::Vertex {
      return Err(KslError::invalid_target(
        var,
        format!("inter-stage values are read-only in the {} stage", self.kind),
      ));
    }

    Ok(())
  }

  fn expect_stage(&self, item: impl fmt::Display, expected: StageKind) -> Result<()> {
    if self.kind == expected {
      Ok(())
    } else {
      Err(KslError::StageMismatch {
        item: item.to_string(),
        expected: expected.to_string(),
        found: self.kind.to_string(),
      })
    }
  }

  /// Look up or declare a program-level uniform.
  pub fn uniform<T>(&mut self, name: &str) -> Result<Expr<T>>
  where
    T: ToType,
  {
    let var = self.declare_uniform(name, T::ty())?;
    Ok(Expr::new(ErasedExpr::var(&var)))
  }

  pub fn declare_uniform(&mut self, name: &str, ty: Type) -> Result<Variable> {
    self.program.declare_uniform(name, ty)
  }

  /// Look up or declare a per-vertex attribute.
  pub fn vertex_attrib<T>(&mut self, name: &str) -> Result<Expr<T>>
  where
    T: ToType,
  {
    let var = self.declare_attribute(name, T::ty(), StateKind::VertexAttribute)?;
    Ok(Expr::new(ErasedExpr::var(&var)))
  }

  /// Look up or declare a per-instance attribute.
  pub fn instance_attrib<T>(&mut self, name: &str) -> Result<Expr<T>>
  where
    T: ToType,
  {
    let var = self.declare_attribute(name, T::ty(), StateKind::InstanceAttribute)?;
    Ok(Expr::new(ErasedExpr::var(&var)))
  }

  pub fn declare_attribute(&mut self, name: &str, ty: Type, kind: StateKind) -> Result<Variable> {
    self.expect_stage(format_args!("attribute `{}`", name), StageKind::Vertex)?;

    if let Some(var) = self.attributes.get(name) {
      if var.ty() != ty || var.kind() != kind {
        return Err(KslError::NameCollision { name: name.to_owned() });
      }

      return Ok(var.clone());
    }

    let name = self.program.names.reserve(name)?;
    let var = self.program.new_variable(name.clone(), ty, self.kind.root_scope(), kind);
    self.attributes.insert(name, var.clone());

    Ok(var)
  }

  /// Declare a fragment output.
  pub fn fragment_output<T>(&mut self, name: &str) -> Result<Var<T>>
  where
    T: ToType,
  {
    Ok(Var::new(self.declare_fragment_output(name, T::ty())?))
  }

  pub fn declare_fragment_output(&mut self, name: &str, ty: Type) -> Result<Variable> {
    self.expect_stage(format_args!("fragment output `{}`", name), StageKind::Fragment)?;

    let name = self.program.names.reserve(name)?;
    let var = self
      .program
      .new_variable(name, ty, self.kind.root_scope(), StateKind::FragmentOutput);
    self.outputs.push(var.clone());

    Ok(var)
  }

  /// Look up or declare a stage built-in.
  pub fn builtin(&mut self, builtin: BuiltIn) -> Result<Variable> {
    self.expect_stage(format_args!("built-in `{}`", builtin.name()), builtin.stage())?;

    if let Some(var) = self.builtins.get(&builtin) {
      return Ok(var.clone());
    }

    let name = self.program.names.reserve(builtin.name())?;
    let var = self
      .program
      .new_variable(name, builtin.ty(), self.kind.root_scope(), StateKind::BuiltIn(builtin));
    self.builtins.insert(builtin, var.clone());

    Ok(var)
  }

  /// Clip-space vertex position.
  pub fn position(&mut self) -> Result<Var<V4<f32>>> {
    self.builtin(BuiltIn::Vertex(VertexBuiltIn::Position)).map(Var::new)
  }

  pub fn point_size(&mut self) -> Result<Var<f32>> {
    self.builtin(BuiltIn::Vertex(VertexBuiltIn::PointSize)).map(Var::new)
  }

  pub fn vertex_index(&mut self) -> Result<Expr<i32>> {
    self.builtin_expr(BuiltIn::Vertex(VertexBuiltIn::VertexIndex))
  }

  pub fn instance_index(&mut self) -> Result<Expr<i32>> {
    self.builtin_expr(BuiltIn::Vertex(VertexBuiltIn::InstanceIndex))
  }

  pub fn frag_coord(&mut self) -> Result<Expr<V4<f32>>> {
    self.builtin_expr(BuiltIn::Fragment(FragmentBuiltIn::FragCoord))
  }

  pub fn front_facing(&mut self) -> Result<Expr<bool>> {
    self.builtin_expr(BuiltIn::Fragment(FragmentBuiltIn::FrontFacing))
  }

  pub fn point_coord(&mut self) -> Result<Expr<V2<f32>>> {
    self.builtin_expr(BuiltIn::Fragment(FragmentBuiltIn::PointCoord))
  }

  pub fn frag_depth(&mut self) -> Result<Var<f32>> {
    self.builtin(BuiltIn::Fragment(FragmentBuiltIn::FragDepth)).map(Var::new)
  }

  fn builtin_expr<T>(&mut self, builtin: BuiltIn) -> Result<Expr<T>> {
    let var = self.builtin(builtin)?;
    Ok(Expr::new(ErasedExpr::var(&var)))
  }

  /// Look up or declare a value written by the vertex stage and read by the fragment stage.
  pub fn inter_stage<T>(&mut self, name: &str) -> Result<Var<T>>
  where
    T: ToType,
  {
    Ok(Var::new(self.program.declare_inter_stage(name, T::ty())?))
  }

  /// Look up or create the armature data block, holding at least `max_bones` joint transforms.
  pub fn armature_data(&mut self, max_bones: usize) -> Result<Arc<ArmatureData>> {
    self.program.armature_data(max_bones)
  }

  /// Look up or create the morph weight data block.
  pub fn morph_weight_data(&mut self) -> Result<Arc<MorphWeightData>> {
    self.program.morph_weight_data()
  }

  /// Look up or create the data block of the given kind.
  pub fn program_level_data(&mut self, kind: DataBlockKind) -> Result<DataBlock> {
    self.program.program_level_data(kind)
  }

  /// Define a user function with an erased signature.
  ///
  /// `body` receives the function scope and the argument variables, and returns the value returned at the end of
  /// the body, if any.
  pub fn function(
    &mut self,
    name: Option<&str>,
    params: Vec<Type>,
    ret: Option<Type>,
    body: impl FnOnce(&mut Scope, &[Variable]) -> Result<Option<ErasedExpr>>,
  ) -> Result<Arc<FunSignature>> {
    let name = match name {
      Some(name) => self.program.names.reserve(name)?,
      None => self.program.names.next_name("fun"),
    };

    let fun = self.define(name, params, ret, body)?;
    let signature = fun.signature.clone();

    debug!(stage = %self.kind, fun = %signature.name, "defined function");
    self.functions.push(fun);

    Ok(signature)
  }

  /// Define a typed user function.
  pub fn fun<F, R, A>(&mut self, f: F) -> Result<FunHandle<R, A>>
  where
    F: ToFun<R, A>,
    R: FunReturn,
  {
    self.typed_fun(None, f)
  }

  /// Define a typed user function with an explicit name.
  pub fn fun_named<F, R, A>(&mut self, name: &str, f: F) -> Result<FunHandle<R, A>>
  where
    F: ToFun<R, A>,
    R: FunReturn,
  {
    self.typed_fun(Some(name), f)
  }

  fn typed_fun<F, R, A>(&mut self, name: Option<&str>, f: F) -> Result<FunHandle<R, A>>
  where
    F: ToFun<R, A>,
    R: FunReturn,
  {
    let signature = self.function(name, F::param_types(), R::ret_ty(), |scope, args| {
      Ok(f.build_fn(scope, args)?.into_return())
    })?;

    Ok(FunHandle::new(signature))
  }

  /// Define the main function of the stage.
  pub fn main(&mut self, body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<()> {
    if self.main.is_some() {
      return Err(KslError::NameCollision {
        name: "main".to_owned(),
      });
    }

    let main = self.define("main".into(), Vec::new(), None, |scope, _| {
      body(scope)?;
      Ok(None)
    })?;

    debug!(stage = %self.kind, statements = main.scope.statements().len(), "defined main");
    self.main = Some(main);

    Ok(())
  }

  fn define(
    &mut self,
    name: Arc<str>,
    params: Vec<Type>,
    ret: Option<Type>,
    body: impl FnOnce(&mut Scope, &[Variable]) -> Result<Option<ErasedExpr>>,
  ) -> Result<ErasedFun> {
    let id = self.program.next_scope_id();
    // a function body only sees its own frames, even when defined from within another scope
    let frames = mem::take(&mut self.frames);
    let mut scope = Scope::enter(mem::take(self), id, ScopeKind::Function { ret });

    let args: Vec<_> = params
      .iter()
      .map(|ty| {
        let program = &mut scope.stage.program;
        let arg_name = program.names.next_name("arg");
        program.new_variable(arg_name, *ty, id, StateKind::FunctionArg)
      })
      .collect();
    scope.erased.declared.extend(args.iter().cloned());

    let res = body(&mut scope, &args).and_then(|value| match value {
      Some(value) => scope.check_reads(&value).map(|()| Some(value)),
      None => Ok(None),
    });
    let (stage, erased) = scope.exit();
    *self = stage;
    self.frames = frames;

    let ret_value = res?;
    let erased = erased?;

    check_return(&name, ret, ret_value.as_ref(), &erased)?;

    Ok(ErasedFun {
      signature: Arc::new(FunSignature { name, params, ret }),
      args,
      scope: erased,
      ret: ret_value,
    })
  }
}

// A function returning a value either ends with that value or ends with a return statement.
fn check_return(name: &str, ret: Option<Type>, value: Option<&ErasedExpr>, body: &ErasedScope) -> Result<()> {
  match (ret, value) {
    (Some(ty), Some(value)) => expect_class(name, "returned value", &value.ty(), TypeClass::Exactly(ty)),
    (None, Some(value)) => Err(KslError::type_mismatch(name, "returned value", "nothing", value.ty())),
    (Some(ty), None) => {
      let ends_with_return = matches!(
        body.statements().last().map(|stmt| stmt.kind()),
        Some(crate::stmt::StatementKind::Return(Some(_)))
      );

      if ends_with_return {
        Ok(())
      } else {
        Err(KslError::type_mismatch(name, "returned value", ty, "nothing"))
      }
    }
    (None, None) => Ok(()),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{error::ErrorKind, lit, program::Program, stmt::StatementKind, types::V3};

  #[test]
  fn attributes_are_vertex_only() {
    let mut program = Program::new("attribs");

    let err = program
      .fragment_stage(|stage| stage.vertex_attrib::<V3<f32>>("attrib_positions").map(|_| ()))
      .unwrap_err();

    assert_eq!(
      err,
      KslError::StageMismatch {
        item: "attribute `attrib_positions`".to_owned(),
        expected: "vertex".to_owned(),
        found: "fragment".to_owned()
      }
    );
  }

  #[test]
  fn attributes_are_looked_up() {
    let mut program = Program::new("attribs");

    program
      .vertex_stage(|stage| {
        let a = stage.vertex_attrib::<V3<f32>>("attrib_positions")?;
        let b = stage.vertex_attrib::<V3<f32>>("attrib_positions")?;
        assert_eq!(a.erased.as_variable(), b.erased.as_variable());

        let err = stage.vertex_attrib::<V4<f32>>("attrib_positions").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameCollision);
        Ok(())
      })
      .unwrap();

    assert_eq!(program.stage(StageKind::Vertex).unwrap().attributes().len(), 1);
  }

  #[test]
  fn functions() {
    let mut program = Program::new("functions");

    program
      .vertex_stage(|stage| {
        let add = stage.fun(|_: &mut Scope, a: Expr<f32>, b: Expr<f32>| -> Result<Expr<f32>> { Ok(a + b) })?;
        let reset = stage.fun_named("reset", |s: &mut Scope| -> Result<()> {
          s.abort()?;
          Ok(())
        })?;

        stage.main(|s| {
          let _ = s.var(add.call(1f32, 2f32));
          reset.invoke(s)
        })
      })
      .unwrap();

    let stage = program.stage(StageKind::Vertex).unwrap();
    assert_eq!(stage.functions().len(), 2);
    assert_eq!(stage.functions()[0].name(), "fun_1");
    assert_eq!(stage.functions()[0].args().len(), 2);
    assert!(stage.functions()[0].ret().is_some());
    assert_eq!(stage.functions()[1].name(), "reset");

    let main = stage.main().unwrap().scope().statements();
    assert!(matches!(main[1].kind(), StatementKind::Call { .. }));
  }

  #[test]
  fn erased_function_return_types() {
    let mut program = Program::new("functions");

    let err = program
      .vertex_stage(|stage| {
        stage
          .function(None, vec![], Some(Type::float(crate::types::Dim::Scalar)), |_, _| {
            Ok(Some(lit!(1i32).into_erased()))
          })
          .map(|_| ())
      })
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
  }

  #[test]
  fn one_main_per_stage() {
    let mut program = Program::new("main");

    let err = program
      .vertex_stage(|stage| {
        stage.main(|_| Ok(()))?;
        stage.main(|_| Ok(()))
      })
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NameCollision);
  }

  #[test]
  fn builtins_belong_to_their_stage() {
    let mut program = Program::new("builtins");

    program
      .vertex_stage(|stage| {
        let pos = stage.position()?;
        assert_eq!(pos.variable().name(), "outPosition");
        assert!(stage.frag_coord().is_err());
        stage.main(|s| s.set(&pos, None, lit!(0., 0., 0., 1.)))
      })
      .unwrap();

    program
      .fragment_stage(|stage| {
        let coord = stage.frag_coord()?;
        stage.main(|s| {
          let err = s.set(coord, None, lit!(0., 0., 0., 1.)).unwrap_err();
          assert_eq!(err.kind(), ErrorKind::InvalidTarget);
          Ok(())
        })
      })
      .unwrap();
  }
}
