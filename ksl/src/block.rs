//! Blocks: named, reusable sub-graphs with typed input and output ports.
//!
//! A block kind is any type implementing [`BlockKind`]. [`Scope::block`] opens a uniquely named block scope, lets the
//! kind declare its ports and body through a [`BlockBuilder`], checks that every output port was assigned exactly
//! once and finally returns the typed outputs to the enclosing scope.

use crate::{
  error::{KslError, Result},
  expr::{expect_class, ErasedExpr, Expr},
  scope::{ErasedScope, Scope, ScopeKind},
  stage::StageBuilder,
  stmt::StatementKind,
  types::{ToType, Type, TypeClass},
  var::{ScopeId, StateKind, Var, Variable},
};
use std::{
  mem,
  ops::{Deref, DerefMut},
  sync::Arc,
};
use tracing::debug;

/// A kind of block.
pub trait BlockKind {
  /// Typed handles to the output ports, returned to the enclosing scope.
  type Outputs;

  /// Prefix of the generated block names.
  const NAME: &'static str;

  /// Declare the ports and build the body.
  fn build(self, block: &mut BlockBuilder) -> Result<Self::Outputs>;
}

/// Typed, named port of a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
  name: Arc<str>,
  var: Variable,
  value: Option<ErasedExpr>,
}

impl Port {
  /// Port name, as declared by the block kind.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Variable carrying the port value.
  pub fn var(&self) -> &Variable {
    &self.var
  }

  /// Value wired into an input port; `None` for output ports.
  pub fn value(&self) -> Option<&ErasedExpr> {
    self.value.as_ref()
  }

  pub fn ty(&self) -> Type {
    self.var.ty()
  }
}

/// A finished block.
#[derive(Clone, Debug, PartialEq)]
pub struct ErasedBlock {
  name: Arc<str>,
  kind: &'static str,
  inputs: Vec<Port>,
  outputs: Vec<Port>,
  body: ErasedScope,
}

impl ErasedBlock {
  /// Program-unique block name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Name of the block kind.
  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn inputs(&self) -> &[Port] {
    &self.inputs
  }

  pub fn outputs(&self) -> &[Port] {
    &self.outputs
  }

  pub fn body(&self) -> &ErasedScope {
    &self.body
  }

  // every output must be the target of exactly one plain, whole-variable assignment at the top level of the body,
  // and of no other write at any depth
  fn check_outputs(&self) -> Result<()> {
    for port in &self.outputs {
      let (plain, other) = self
        .body
        .statements()
        .iter()
        .filter(|stmt| stmt.writes().contains(&port.var))
        .partition::<Vec<_>, _>(|stmt| match stmt.kind() {
          StatementKind::Assign { target, .. } => target.as_variable().map(Variable::id) == Some(port.var.id()),
          _ => false,
        });

      match (plain.len(), other.len()) {
        (1, 0) => (),
        (0, _) => {
          return Err(KslError::UnassignedOutput {
            block: self.name.to_string(),
            port: port.name.to_string(),
          })
        }
        (plain, other) => {
          return Err(KslError::OutputReassigned {
            block: self.name.to_string(),
            port: port.name.to_string(),
            count: plain + other,
          })
        }
      }
    }

    Ok(())
  }
}

/// Builder of a block, handed to [`BlockKind::build`].
///
/// It dereferences to the [`Scope`] of the block body.
#[derive(Debug)]
pub struct BlockBuilder {
  scope: Scope,
  name: Arc<str>,
  kind: &'static str,
  parent: ScopeId,
  inputs: Vec<Port>,
  outputs: Vec<Port>,
}

impl Deref for BlockBuilder {
  type Target = Scope;

  fn deref(&self) -> &Self::Target {
    &self.scope
  }
}

impl DerefMut for BlockBuilder {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.scope
  }
}

impl BlockBuilder {
  /// Program-unique name of the block being built.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Declare an input port, wired to an expression or falling back to a default value.
  pub fn input<T>(&mut self, port: &str, wired: Option<Expr<T>>, default: Option<Expr<T>>) -> Result<Expr<T>>
  where
    T: ToType,
  {
    let value = wired.or(default).map(Expr::into_erased);
    let var = self.input_erased(port, T::ty(), value)?;
    Ok(Expr::new(ErasedExpr::var(&var)))
  }

  pub fn input_erased(&mut self, port: &str, ty: Type, value: Option<ErasedExpr>) -> Result<Variable> {
    let value = value.ok_or_else(|| KslError::UnwiredInput {
      block: self.name.to_string(),
      port: port.to_owned(),
    })?;
    expect_class(port, "wired value", &value.ty(), TypeClass::Exactly(ty))?;
    self.scope.check_reads(&value)?;

    let var = self.port_variable(port, ty, self.scope.erased.id(), StateKind::BlockInput)?;
    self.scope.erased.declared.push(var.clone());
    self.inputs.push(Port {
      name: port.into(),
      var: var.clone(),
      value: Some(value),
    });

    Ok(var)
  }

  /// Declare an output port.
  ///
  /// The returned variable lives in the enclosing scope and must be assigned exactly once in the block body.
  pub fn output<T>(&mut self, port: &str) -> Result<Var<T>>
  where
    T: ToType,
  {
    Ok(Var::new(self.output_erased(port, T::ty())?))
  }

  pub fn output_erased(&mut self, port: &str, ty: Type) -> Result<Variable> {
    let var = self.port_variable(port, ty, self.parent, StateKind::BlockOutput)?;
    self.outputs.push(Port {
      name: port.into(),
      var: var.clone(),
      value: None,
    });

    Ok(var)
  }

  fn port_variable(&mut self, port: &str, ty: Type, scope: ScopeId, kind: StateKind) -> Result<Variable> {
    let program = &mut self.scope.stage.program;
    let name = program.names.reserve(&format!("{}_{}", self.name, port))?;
    Ok(program.new_variable(name, ty, scope, kind))
  }

  fn finish(self) -> (StageBuilder, Result<ErasedBlock>) {
    let (stage, body) = self.scope.exit();

    let block = body.map(|body| ErasedBlock {
      name: self.name,
      kind: self.kind,
      inputs: self.inputs,
      outputs: self.outputs,
      body,
    });

    (stage, block)
  }
}

impl Scope {
  /// Instantiate a block in this scope.
  pub fn block<K>(&mut self, kind: K) -> Result<K::Outputs>
  where
    K: BlockKind,
  {
    let program = &mut self.stage.program;
    let name = program.names.next_name(K::NAME);
    let id = program.next_scope_id();

    let mut builder = BlockBuilder {
      scope: Scope::enter(mem::take(&mut self.stage), id, ScopeKind::Block),
      name,
      kind: K::NAME,
      parent: self.erased.id(),
      inputs: Vec::new(),
      outputs: Vec::new(),
    };

    let res = kind.build(&mut builder);
    let (stage, block) = builder.finish();
    self.stage = stage;

    let outputs = res?;
    let block = block?;
    block.check_outputs()?;

    debug!(
      block = block.name(),
      kind = block.kind(),
      inputs = block.inputs().len(),
      outputs = block.outputs().len(),
      "built block"
    );

    self
      .erased
      .declared
      .extend(block.outputs().iter().map(|port| port.var().clone()));
    self.push(StatementKind::Block(block));

    Ok(outputs)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    error::ErrorKind,
    lit,
    program::Program,
    stage::StageKind,
    stmt::MutateBinOp,
    types::{V3, V4},
  };

  struct Scale {
    value: Option<Expr<V3<f32>>>,
    assignments: usize,
  }

  impl BlockKind for Scale {
    type Outputs = Var<V3<f32>>;

    const NAME: &'static str = "scaleBlock";

    fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
      let input = b.input("inValue", self.value, None)?;
      let out = b.output::<V3<f32>>("outValue")?;

      for _ in 0..self.assignments {
        b.set(&out, None, &input * 2.)?;
      }

      Ok(out)
    }
  }

  fn build(scale: Scale) -> Result<Program> {
    let mut program = Program::new("blocks");
    program.vertex_stage(|stage| {
      stage.main(|s| {
        let scaled = s.block(scale)?;
        let _ = s.var(scaled.to_expr());
        Ok(())
      })
    })?;
    Ok(program)
  }

  #[test]
  fn outputs_are_visible_after_the_block() {
    let program = build(Scale {
      value: Some(lit!(1., 2., 3.)),
      assignments: 1,
    })
    .unwrap();

    let main = program.stage(StageKind::Vertex).unwrap().main().unwrap();
    let stmts = main.scope().statements();
    assert_eq!(stmts.len(), 2);

    let StatementKind::Block(block) = stmts[0].kind() else {
      panic!("block expected");
    };
    assert_eq!(block.name(), "scaleBlock_1");
    assert_eq!(block.outputs()[0].var().name(), "scaleBlock_1_outValue");
    assert!(stmts[0].writes().contains(block.outputs()[0].var()));
    assert!(stmts[1].reads().contains(block.outputs()[0].var()));

    // the input variable is internal to the block
    assert!(!stmts[0].reads().contains(block.inputs()[0].var()));
  }

  #[test]
  fn unassigned_output() {
    let err = build(Scale {
      value: Some(lit!(1., 2., 3.)),
      assignments: 0,
    })
    .unwrap_err();

    assert_eq!(
      err,
      KslError::UnassignedOutput {
        block: "scaleBlock_1".to_owned(),
        port: "outValue".to_owned()
      }
    );
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
  }

  #[test]
  fn reassigned_output() {
    let err = build(Scale {
      value: Some(lit!(1., 2., 3.)),
      assignments: 2,
    })
    .unwrap_err();

    assert!(matches!(err, KslError::OutputReassigned { count: 2, .. }));
  }

  #[test]
  fn unwired_input() {
    let err = build(Scale {
      value: None,
      assignments: 1,
    })
    .unwrap_err();

    assert_eq!(
      err,
      KslError::UnwiredInput {
        block: "scaleBlock_1".to_owned(),
        port: "inValue".to_owned()
      }
    );
  }

  #[test]
  fn inputs_are_read_only() {
    struct Poke;

    impl BlockKind for Poke {
      type Outputs = ();

      const NAME: &'static str = "pokeBlock";

      fn build(self, b: &mut BlockBuilder) -> Result<()> {
        let input = b.input::<V4<f32>>("inColor", None, Some(lit!(1., 1., 1., 1.)))?;
        b.set(input, None, lit!(0., 0., 0., 0.))
      }
    }

    let mut program = Program::new("poke");
    let err = program
      .fragment_stage(|stage| stage.main(|s| s.block(Poke)))
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidTarget);
  }
  struct LateWrite {
    write: fn(&mut BlockBuilder, &Var<f32>) -> Result<()>,
  }

  impl BlockKind for LateWrite {
    type Outputs = Var<f32>;

    const NAME: &'static str = "lateBlock";

    fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
      let out = b.output::<f32>("outValue")?;
      b.set(&out, None, 1f32)?;
      (self.write)(b, &out)?;
      Ok(out)
    }
  }

  fn build_late(write: fn(&mut BlockBuilder, &Var<f32>) -> Result<()>) -> Result<Program> {
    let mut program = Program::new("blocks");
    program.vertex_stage(|stage| stage.main(|s| s.block(LateWrite { write }).map(|_| ())))?;
    Ok(program)
  }

  #[test]
  fn outputs_are_not_written_again() {
    build_late(|_, _| Ok(())).unwrap();

    let err = build_late(|b, out| b.when(lit!(true), |s| s.set(out, None, 2f32)).map(|_| ())).unwrap_err();
    assert!(matches!(err, KslError::OutputReassigned { count: 2, .. }));

    let err = build_late(|b, out| b.set(out, MutateBinOp::Add, 2f32)).unwrap_err();
    assert!(matches!(err, KslError::OutputReassigned { count: 2, .. }));

    let err = build_late(|b, out| b.fori(0i32, 2i32, |s, _| s.set(out, MutateBinOp::Mul, 2f32))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
  }

  #[test]
  fn wired_values_are_visible_from_the_block() {
    let mut program = Program::new("blocks");
    let err = program
      .vertex_stage(|stage| {
        stage.main(|s| {
          let mut escaped = None;
          s.when(lit!(true), |s| {
            escaped = Some(s.var(lit!(1f32, 1., 1.)));
            Ok(())
          })?;

          s.block(Scale {
            value: escaped.map(|v| v.to_expr()),
            assignments: 1,
          })
          .map(|_| ())
        })
      })
      .unwrap_err();

    assert!(matches!(err, KslError::OutOfScope { .. }));
  }
}
