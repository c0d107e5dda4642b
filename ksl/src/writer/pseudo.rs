//! Pseudocode writer.
//!
//! The output is C-like and deterministic: the same program always renders to the same text. It is not meant to be
//! compiled by anything. With [`Annotations::Dependencies`], every statement is followed by a comment listing the
//! variables it reads and writes.

use crate::{
  block::ErasedBlock,
  erased::Erased,
  expr::{ErasedExpr, Expr, ExprNode, Literal},
  fun::ErasedFun,
  program::Program,
  scope::ErasedScope,
  stage::Stage,
  stmt::{Statement, StatementKind, VarSet},
  types::Type,
  var::{Var, Variable},
};
use std::fmt;

// Number of space an indent level represents.
const INDENT_SPACES: usize = 2;

/// Extra information added to the output.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Annotations {
  #[default]
  None,
  /// Reads and writes of each statement.
  Dependencies,
}

/// Write a [`Program`] to a [`String`].
pub fn write_program_to_str(program: &Program, annotations: Annotations) -> Result<String, fmt::Error> {
  let mut output = String::new();
  write_program(&mut output, program, annotations)?;
  Ok(output)
}

/// Write a [`Program`] to a [`fmt::Write`](std::fmt::Write).
pub fn write_program(f: &mut impl fmt::Write, program: &Program, annotations: Annotations) -> Result<(), fmt::Error> {
  writeln!(f, "program {}", program.name())?;

  for uniform in program.uniforms() {
    write_decl(f, "uniform", uniform)?;
  }

  for value in program.inter_stage() {
    write_decl(f, "varying", value)?;
  }

  for stage in program.stages() {
    f.write_str("\n")?;
    write_stage(f, stage, annotations)?;
  }

  Ok(())
}

fn write_decl(f: &mut impl fmt::Write, qualifier: &str, var: &Variable) -> Result<(), fmt::Error> {
  writeln!(f, "{} {} {};", qualifier, var.ty(), var)
}

/// Write a [`Stage`] to a [`fmt::Write`](std::fmt::Write).
pub fn write_stage(f: &mut impl fmt::Write, stage: &Stage, annotations: Annotations) -> Result<(), fmt::Error> {
  writeln!(f, "{} stage {{", stage.kind())?;

  for attribute in stage.attributes() {
    write_indent(f, 1)?;
    write_decl(f, "in", attribute)?;
  }

  for output in stage.outputs() {
    write_indent(f, 1)?;
    write_decl(f, "out", output)?;
  }

  for builtin in stage.builtins() {
    write_indent(f, 1)?;
    write_decl(f, "builtin", builtin)?;
  }

  for fun in stage.functions() {
    f.write_str("\n")?;
    write_fun(f, fun, 1, annotations)?;
  }

  if let Some(main) = stage.main() {
    f.write_str("\n")?;
    write_fun(f, main, 1, annotations)?;
  }

  f.write_str("}\n")
}

fn write_fun(
  f: &mut impl fmt::Write,
  fun: &ErasedFun,
  indent_lvl: usize,
  annotations: Annotations,
) -> Result<(), fmt::Error> {
  write_indent(f, indent_lvl)?;
  write_ret_type(f, fun.signature().ret.as_ref())?;
  write!(f, " {}(", fun.name())?;

  for (i, arg) in fun.args().iter().enumerate() {
    if i > 0 {
      f.write_str(", ")?;
    }

    write!(f, "{} {}", arg.ty(), arg)?;
  }

  f.write_str(") {\n")?;
  write_scope(f, fun.scope(), indent_lvl + 1, annotations)?;

  if let Some(ret) = fun.ret() {
    write_indent(f, indent_lvl + 1)?;
    writeln!(f, "return {};", ret)?;
  }

  write_indented(f, indent_lvl, "}\n")
}

fn write_ret_type(f: &mut impl fmt::Write, ret: Option<&Type>) -> Result<(), fmt::Error> {
  match ret {
    Some(ty) => write!(f, "{}", ty),
    None => f.write_str("void"),
  }
}

/// Write the statements of a scope, one per line, at the given indent level.
pub fn write_scope(
  f: &mut impl fmt::Write,
  scope: &ErasedScope,
  indent_lvl: usize,
  annotations: Annotations,
) -> Result<(), fmt::Error> {
  for stmt in scope.statements() {
    write_statement(f, stmt, indent_lvl, annotations)?;
  }

  Ok(())
}

/// Write a statement, terminated by a new line.
pub fn write_statement(
  f: &mut impl fmt::Write,
  stmt: &Statement,
  indent_lvl: usize,
  annotations: Annotations,
) -> Result<(), fmt::Error> {
  write_indent(f, indent_lvl)?;

  match stmt.kind() {
    StatementKind::Declare { var, init } => {
      write!(f, "{} {}", var.ty(), var)?;

      if let Some(init) = init {
        write!(f, " = {}", init)?;
      }

      f.write_str(";")?;
    }

    StatementKind::Assign { target, value } => {
      write!(f, "{} = {};", target, value)?;
    }

    StatementKind::AugmentedAssign { target, op, value } => {
      write!(f, "{} {} {};", target, op.symbol(), value)?;
    }

    StatementKind::If {
      condition,
      then,
      else_ifs,
      otherwise,
    } => {
      writeln!(f, "if ({}) {{", condition)?;
      write_scope(f, then, indent_lvl + 1, annotations)?;
      write_indent(f, indent_lvl)?;
      f.write_str("}")?;

      for (condition, scope) in else_ifs {
        writeln!(f, " else if ({}) {{", condition)?;
        write_scope(f, scope, indent_lvl + 1, annotations)?;
        write_indent(f, indent_lvl)?;
        f.write_str("}")?;
      }

      if let Some(scope) = otherwise {
        f.write_str(" else {\n")?;
        write_scope(f, scope, indent_lvl + 1, annotations)?;
        write_indent(f, indent_lvl)?;
        f.write_str("}")?;
      }
    }

    StatementKind::For {
      var,
      init,
      condition,
      update,
      body,
    } => {
      // the update is a fold: the next value of the loop variable computed from its current value
      writeln!(
        f,
        "for ({} {} = {}; {}; {} = {}) {{",
        var.ty(),
        var,
        init,
        condition,
        var,
        update
      )?;
      write_scope(f, body, indent_lvl + 1, annotations)?;
      write_indent(f, indent_lvl)?;
      f.write_str("}")?;
    }

    StatementKind::While { condition, body } => {
      writeln!(f, "while ({}) {{", condition)?;
      write_scope(f, body, indent_lvl + 1, annotations)?;
      write_indent(f, indent_lvl)?;
      f.write_str("}")?;
    }

    StatementKind::Break => f.write_str("break;")?,

    StatementKind::Continue => f.write_str("continue;")?,

    StatementKind::Discard => f.write_str("discard;")?,

    StatementKind::Return(None) => f.write_str("return;")?,

    StatementKind::Return(Some(value)) => write!(f, "return {};", value)?,

    StatementKind::InlineCode(code) => f.write_str(code)?,

    StatementKind::Block(block) => write_block(f, block, indent_lvl, annotations)?,

    StatementKind::Call { fun, args } => {
      write!(f, "{}(", fun.name)?;
      write_args(f, args)?;
      f.write_str(");")?;
    }
  }

  if annotations == Annotations::Dependencies {
    f.write_str(" // reads: ")?;
    write_var_set(f, stmt.reads())?;
    f.write_str(" writes: ")?;
    write_var_set(f, stmt.writes())?;
  }

  f.write_str("\n")
}

// outputs are declared in the enclosing scope, inputs at the top of the block body
fn write_block(
  f: &mut impl fmt::Write,
  block: &ErasedBlock,
  indent_lvl: usize,
  annotations: Annotations,
) -> Result<(), fmt::Error> {
  writeln!(f, "// block {} ({})", block.name(), block.kind())?;

  for output in block.outputs() {
    write_indent(f, indent_lvl)?;
    writeln!(f, "{} {};", output.ty(), output.var())?;
  }

  write_indent(f, indent_lvl)?;
  f.write_str("{\n")?;

  for input in block.inputs() {
    write_indent(f, indent_lvl + 1)?;
    write!(f, "{} {}", input.ty(), input.var())?;

    if let Some(value) = input.value() {
      write!(f, " = {}", value)?;
    }

    f.write_str(";\n")?;
  }

  write_scope(f, block.body(), indent_lvl + 1, annotations)?;
  write_indent(f, indent_lvl)?;
  f.write_str("}")
}

fn write_var_set(f: &mut impl fmt::Write, set: &VarSet) -> Result<(), fmt::Error> {
  if set.is_empty() {
    return f.write_str("-");
  }

  f.write_str(&set.names().join(", "))
}

fn write_args(f: &mut impl fmt::Write, args: &[ErasedExpr]) -> Result<(), fmt::Error> {
  for (i, arg) in args.iter().enumerate() {
    if i > 0 {
      f.write_str(", ")?;
    }

    write_expr(f, arg)?;
  }

  Ok(())
}

/// Write an expression.
///
/// Every unary and binary operation is parenthesized, so the output never depends on operator precedence.
pub fn write_expr(f: &mut impl fmt::Write, expr: &ErasedExpr) -> Result<(), fmt::Error> {
  match expr.node() {
    ExprNode::Lit(lit) => write_lit(f, lit),

    ExprNode::Var(var) => write!(f, "{}", var),

    ExprNode::Unary(op, a) => {
      write!(f, "{}(", op.symbol())?;
      write_expr(f, a)?;
      f.write_str(")")
    }

    ExprNode::Binary(op, a, b) => {
      f.write_str("(")?;
      write_expr(f, a)?;
      write!(f, " {} ", op.symbol())?;
      write_expr(f, b)?;
      f.write_str(")")
    }

    ExprNode::FunCall(handle, args) => {
      write!(f, "{}(", handle)?;
      write_args(f, args)?;
      f.write_str(")")
    }

    ExprNode::Swizzle(e, sw) => {
      write_expr(f, e)?;
      write!(f, "{}", sw)
    }

    ExprNode::ArrayLookup { object, index } => {
      write_expr(f, object)?;
      f.write_str("[")?;
      write_expr(f, index)?;
      f.write_str("]")
    }
  }
}

fn write_lit(f: &mut impl fmt::Write, lit: &Literal) -> Result<(), fmt::Error> {
  match lit {
    Literal::Int(x) => write!(f, "{}", x),
    Literal::UInt(x) => write!(f, "{}u", x),
    Literal::Float(x) => f.write_str(&write_f32(*x)),
    Literal::Bool(x) => write!(f, "{}", x),

    Literal::Int2(a) => write_vec(f, "int2", a, |x| x.to_string()),
    Literal::UInt2(a) => write_vec(f, "uint2", a, |x| format!("{}u", x)),
    Literal::Float2(a) => write_vec(f, "float2", a, |x| write_f32(*x)),
    Literal::Bool2(a) => write_vec(f, "bool2", a, |x| x.to_string()),

    Literal::Int3(a) => write_vec(f, "int3", a, |x| x.to_string()),
    Literal::UInt3(a) => write_vec(f, "uint3", a, |x| format!("{}u", x)),
    Literal::Float3(a) => write_vec(f, "float3", a, |x| write_f32(*x)),
    Literal::Bool3(a) => write_vec(f, "bool3", a, |x| x.to_string()),

    Literal::Int4(a) => write_vec(f, "int4", a, |x| x.to_string()),
    Literal::UInt4(a) => write_vec(f, "uint4", a, |x| format!("{}u", x)),
    Literal::Float4(a) => write_vec(f, "float4", a, |x| write_f32(*x)),
    Literal::Bool4(a) => write_vec(f, "bool4", a, |x| x.to_string()),

    Literal::M22(m) => write_matrix(f, "mat2", m),
    Literal::M33(m) => write_matrix(f, "mat3", m),
    Literal::M44(m) => write_matrix(f, "mat4", m),
  }
}

fn write_vec<T>(
  f: &mut impl fmt::Write,
  ty: &str,
  components: &[T],
  show: impl Fn(&T) -> String,
) -> Result<(), fmt::Error> {
  let components: Vec<_> = components.iter().map(show).collect();
  write!(f, "{}({})", ty, components.join(", "))
}

// matrices are column-major
fn write_matrix<const N: usize>(f: &mut impl fmt::Write, ty: &str, m: &[[f32; N]; N]) -> Result<(), fmt::Error> {
  let components: Vec<_> = m.iter().flatten().map(|x| write_f32(*x)).collect();
  write!(f, "{}({})", ty, components.join(", "))
}

fn write_f32(f: f32) -> String {
  if f == 0. {
    return "0.".to_owned();
  }

  let s = f.to_string();

  if f.fract() == 0. {
    s + "."
  } else if let Some(fract) = s.strip_prefix("0.") {
    format!(".{}", fract)
  } else if let Some(fract) = s.strip_prefix("-0.") {
    format!("-.{}", fract)
  } else {
    s
  }
}

fn write_indent(f: &mut impl fmt::Write, indent_lvl: usize) -> Result<(), fmt::Error> {
  write!(f, "{:indent$}", "", indent = indent_lvl * INDENT_SPACES)
}

fn write_indented(f: &mut impl fmt::Write, indent_lvl: usize, t: &str) -> Result<(), fmt::Error> {
  write_indent(f, indent_lvl)?;
  f.write_str(t)
}

impl fmt::Display for ErasedExpr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_expr(f, self)
  }
}

/// Write a typed expression or variable.
pub fn write_typed(f: &mut impl fmt::Write, e: &impl Erased<Erased = ErasedExpr>) -> Result<(), fmt::Error> {
  write_expr(f, e.erased())
}

impl<T> fmt::Display for Expr<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_typed(f, self)
  }
}

impl<T> fmt::Display for Var<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_typed(f, self)
  }
}

impl fmt::Display for Statement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_statement(f, self, 0, Annotations::None)
  }
}

impl fmt::Display for ErasedScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_scope(f, self, 0, Annotations::None)
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_program(f, self, Annotations::None)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    expr::{BinaryOp, Expr},
    lit,
    scope::Scope,
    stage::StageKind,
    stmt::MutateBinOp,
    types::{V3, V4},
    vec4,
  };

  #[test]
  fn f32_literals() {
    assert_eq!(write_f32(0.), "0.");
    assert_eq!(write_f32(1.), "1.");
    assert_eq!(write_f32(-3.), "-3.");
    assert_eq!(write_f32(0.5), ".5");
    assert_eq!(write_f32(-0.25), "-.25");
    assert_eq!(write_f32(1.5), "1.5");
  }

  #[test]
  fn expressions() {
    let a = lit!(1f32) + lit!(2f32);
    assert_eq!(a.to_string(), "(1. + 2.)");
    assert_eq!(a.into_erased().to_string(), "(1. + 2.)");

    let v: Expr<V4<f32>> = vec4!(lit!(1f32, 2., 3.), 1f32);
    assert_eq!(v.into_erased().to_string(), "vec4(float3(1., 2., 3.), 1.)");

    let c = ErasedExpr::binary(BinaryOp::Lt, lit!(1i32).into_erased(), lit!(2i32).into_erased()).unwrap();
    assert_eq!((!Expr::<bool>::new(c)).into_erased().to_string(), "!((1 < 2))");
  }

  #[test]
  fn program_with_dependencies() {
    let mut program = Program::new("pseudo");

    program
      .vertex_stage(|stage| {
        let offset = stage.uniform::<V3<f32>>("uOffset")?;
        let position = stage.position()?;

        stage.main(|s: &mut Scope| {
          let p = s.var(lit!(0f32, 0., 0.));
          s.set(&p, MutateBinOp::Add, offset)?;
          s.when(p.eq(lit!(0f32, 0., 0.)), |s| s.set(&p, None, lit!(1f32, 1., 1.)))?;

          let moved: Expr<V4<f32>> = vec4!(p, 1f32);
          s.set(&position, None, moved)
        })
      })
      .unwrap();

    let output = write_program_to_str(&program, Annotations::Dependencies).unwrap();
    let position = program.stage(StageKind::Vertex).unwrap().builtins()[0].to_string();

    assert!(output.starts_with("program pseudo\nuniform float3 uOffset;\n"));
    assert!(output.contains("vertex stage {\n"));
    assert!(output.contains("  void main() {\n"));
    assert!(output.contains("    float3 f3_1 = float3(0., 0., 0.); // reads: - writes: f3_1\n"));
    assert!(output.contains("    f3_1 += uOffset; // reads: uOffset, f3_1 writes: f3_1\n"));
    assert!(output.contains("    if ((f3_1 == float3(0., 0., 0.))) {\n"));
    assert!(output.contains(&format!(
      "    {} = vec4(f3_1, 1.); // reads: f3_1 writes: {}\n",
      position, position
    )));

    // rendering is deterministic
    assert_eq!(output, write_program_to_str(&program, Annotations::Dependencies).unwrap());
  }
}
