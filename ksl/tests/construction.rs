use ksl::{
  block::{BlockBuilder, BlockKind},
  error::{ErrorKind, KslError, Result},
  expr::{BinaryOp, ErasedExpr, Expr, Literal},
  fun::ErasedFunHandle,
  lit,
  program::Program,
  scope::Scope,
  stage::StageKind,
  stmt::{MutateBinOp, Statement, StatementKind},
  swizzle::Swizzle,
  types::{V2, V3, V4},
  var::Var,
};
use std::collections::HashSet;

fn vertex_main(body: impl FnOnce(&mut Scope) -> Result<()>) -> Result<Program> {
  let mut program = Program::new("test");
  program.vertex_stage(|stage| stage.main(body))?;
  Ok(program)
}

#[test]
fn mixed_scalar_kinds_are_rejected() {
  let a = ErasedExpr::lit(Literal::Float(1.));
  let b = ErasedExpr::lit(Literal::Int(1));

  let err = ErasedExpr::binary(BinaryOp::Add, a, b).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn builtin_arguments_are_checked() {
  let err = ErasedExpr::builtin(ErasedFunHandle::Sin, vec![ErasedExpr::lit(Literal::Int(1))]).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn assignment_types_must_match() {
  let err = vertex_main(|s| {
    let v = s.var(lit!(0f32, 0., 0.));
    s.assign(v.to_expr().into_erased(), ErasedExpr::lit(Literal::Float(1.)))
  })
  .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn swizzles_stay_within_the_source() {
  let v: Expr<V2<f32>> = lit!(1f32, 2.);
  let mask = Swizzle::parse("xyzw").unwrap();

  let err = ErasedExpr::swizzle(v.into_erased(), mask).unwrap_err();
  assert!(matches!(err, KslError::IndexOutOfRange { index: 4, len: 2, .. }));
  assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn explicit_names_are_unique() {
  let err = vertex_main(|s| {
    s.named_var::<f32>("weight", 1f32)?;
    s.named_var::<f32>("weight", 2f32)?;
    Ok(())
  })
  .unwrap_err();

  assert_eq!(err, KslError::NameCollision { name: "weight".to_owned() });
}

#[test]
fn uniforms_are_shared_by_name_and_type() {
  let mut program = Program::new("test");

  program
    .vertex_stage(|stage| {
      stage.uniform::<V4<f32>>("uColor")?;
      Ok(())
    })
    .unwrap();
  program
    .fragment_stage(|stage| {
      stage.uniform::<V4<f32>>("uColor")?;
      Ok(())
    })
    .unwrap();
  assert_eq!(program.uniforms().count(), 1);

  let mut other = Program::new("other");
  let err = other
    .vertex_stage(|stage| {
      stage.uniform::<V4<f32>>("uColor")?;
      stage.uniform::<V3<f32>>("uColor")?;
      Ok(())
    })
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NameCollision);
}

#[test]
fn branch_variables_do_not_escape() {
  let err = vertex_main(|s| {
    let mut escaped: Option<Var<f32>> = None;

    s.when(lit!(true), |s| {
      escaped = Some(s.var(1f32));
      Ok(())
    })?;

    let escaped = escaped.unwrap();
    s.set(&escaped, None, 2f32)
  })
  .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::InvalidTarget);
}

#[test]
fn uniforms_are_read_only() {
  let err = vertex_main(|s| {
    let scale = s.stage().uniform::<f32>("uScale")?;
    s.set(scale, None, 1f32)
  })
  .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::InvalidTarget);
}

#[test]
fn break_needs_a_loop() {
  let err = vertex_main(|s| s.loop_break()).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::IllegalControlFlow);

  vertex_main(|s| {
    s.loop_while(lit!(true), |s| {
      s.when(lit!(false), |s| s.loop_break())?;
      Ok(())
    })
  })
  .unwrap();
}

#[test]
fn discard_is_fragment_only() {
  let err = vertex_main(|s| s.discard()).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::IllegalControlFlow);

  let mut program = Program::new("test");
  program.fragment_stage(|stage| stage.main(|s| s.discard())).unwrap();
}

#[test]
fn statements_record_reads_and_writes() {
  let program = vertex_main(|s| {
    let offset = s.stage().uniform::<V3<f32>>("uOffset")?;
    let v = s.named_var::<V3<f32>>("moved", lit!(0f32, 0., 0.))?;
    s.set(&v, None, &v + offset)
  })
  .unwrap();

  let main = program.stage(StageKind::Vertex).unwrap().main().unwrap();
  let stmts = main.scope().statements();

  assert!(stmts[0].reads().is_empty());
  assert_eq!(stmts[0].writes().names(), ["moved"]);
  assert_eq!(stmts[1].reads().names(), ["uOffset", "moved"]);
  assert_eq!(stmts[1].writes().names(), ["moved"]);
}

struct Forgetful;

impl BlockKind for Forgetful {
  type Outputs = Var<f32>;

  const NAME: &'static str = "forgetful";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    b.output("outValue")
  }
}

struct Stubborn;

impl BlockKind for Stubborn {
  type Outputs = Var<f32>;

  const NAME: &'static str = "stubborn";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let out = b.output::<f32>("outValue")?;
    b.set(&out, None, 1f32)?;
    b.set(&out, None, 2f32)?;
    Ok(out)
  }
}

struct Scale {
  value: Option<Expr<f32>>,
}

impl BlockKind for Scale {
  type Outputs = Var<f32>;

  const NAME: &'static str = "scale";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let value = b.input("inValue", self.value, None)?;
    let out = b.output::<f32>("outValue")?;
    b.set(&out, None, value * 2f32)?;
    Ok(out)
  }
}

#[test]
fn outputs_are_assigned_exactly_once() {
  let err = vertex_main(|s| s.block(Forgetful).map(|_| ())).unwrap_err();
  assert!(matches!(err, KslError::UnassignedOutput { .. }));
  assert_eq!(err.kind(), ErrorKind::InvariantViolation);

  let err = vertex_main(|s| s.block(Stubborn).map(|_| ())).unwrap_err();
  assert!(matches!(err, KslError::OutputReassigned { count: 2, .. }));
  assert_eq!(err.kind(), ErrorKind::InvariantViolation);
}

#[test]
fn inputs_must_be_wired() {
  let err = vertex_main(|s| s.block(Scale { value: None }).map(|_| ())).unwrap_err();
  assert!(matches!(err, KslError::UnwiredInput { .. }));
}

#[test]
fn blocks_read_inputs_and_write_outputs() {
  let program = vertex_main(|s| {
    let scale = s.stage().uniform::<f32>("uScale")?;
    let out = s.block(Scale { value: Some(scale) })?;
    s.var(out.to_expr());
    Ok(())
  })
  .unwrap();

  let main = program.stage(StageKind::Vertex).unwrap().main().unwrap();
  let stmt = &main.scope().statements()[0];
  let StatementKind::Block(block) = stmt.kind() else {
    panic!("block expected");
  };

  assert_eq!(block.kind(), "scale");
  assert!(stmt.reads().contains_name("uScale"));
  assert!(stmt.writes().contains(block.outputs()[0].var()));

  // the next statement consumes the block output
  assert!(main.scope().statements()[1].reads().contains(block.outputs()[0].var()));
}

struct Nest {
  depth: usize,
}

impl BlockKind for Nest {
  type Outputs = Var<f32>;

  const NAME: &'static str = "nest";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let out = b.output::<f32>("outValue")?;
    let acc = b.var(0f32);

    b.fori(0i32, 3i32, |s, _| {
      let step = s.var(1f32);
      s.when(acc.lt(2f32), |s| {
        let half = s.var(&step * 0.5f32);
        s.set(&acc, MutateBinOp::Add, &half)
      })?
      .or(|s| {
        let twice = s.var(&step * 2f32);
        s.set(&acc, MutateBinOp::Add, &twice)
      })
    })?;

    if self.depth > 0 {
      let inner = b.block(Nest { depth: self.depth - 1 })?;
      b.set(&acc, MutateBinOp::Add, &inner)?;
    }

    b.set(&out, None, &acc)?;
    Ok(out)
  }
}

fn declared_names<'a>(stmts: &'a [Statement], names: &mut Vec<&'a str>) {
  for stmt in stmts {
    match stmt.kind() {
      StatementKind::Declare { var, .. } => names.push(var.name()),
      StatementKind::If {
        then,
        else_ifs,
        otherwise,
        ..
      } => {
        declared_names(then.statements(), names);
        for (_, scope) in else_ifs {
          declared_names(scope.statements(), names);
        }
        if let Some(scope) = otherwise {
          declared_names(scope.statements(), names);
        }
      }
      StatementKind::For { var, body, .. } => {
        names.push(var.name());
        declared_names(body.statements(), names);
      }
      StatementKind::While { body, .. } => declared_names(body.statements(), names),
      StatementKind::Block(block) => {
        names.extend(block.inputs().iter().map(|port| port.var().name()));
        names.extend(block.outputs().iter().map(|port| port.var().name()));
        declared_names(block.body().statements(), names);
      }
      _ => (),
    }
  }
}

#[test]
fn generated_names_are_unique_across_scopes() {
  let program = vertex_main(|s| {
    for _ in 0..3 {
      let out = s.block(Nest { depth: 3 })?;
      s.var(out.to_expr());
    }
    Ok(())
  })
  .unwrap();

  let main = program.stage(StageKind::Vertex).unwrap().main().unwrap();
  let mut names = Vec::new();
  declared_names(main.scope().statements(), &mut names);

  // 3 blocks nested 4 deep, each with 5 declarations and 1 output, plus 3 top-level copies
  assert_eq!(names.len(), 3 * 4 * 6 + 3);

  let unique: HashSet<_> = names.iter().collect();
  assert_eq!(unique.len(), names.len());
  assert!(names.iter().all(|name| program.name_pool().contains(name)));
}
