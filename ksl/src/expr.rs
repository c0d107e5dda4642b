//! Expressions.
//!
//! The expression graph is made of [`ErasedExpr`] nodes: immutable, tree-shaped, each carrying its result [`Type`].
//! Variables are the only shared leaves. Every erased constructor checks its operands and returns a [`Result`];
//! the typed [`Expr<T>`] facade moves those checks to `rustc` and builds the very same nodes.

use crate::{
  erased::Erased,
  error::{KslError, Result},
  fun::{ErasedFunHandle, FunSignature},
  stmt::VarSet,
  swizzle::Swizzle,
  types::{
    Dim, MatrixDim, NumericScalar, PrimType, ToPrimType, ToType, Type, TypeClass, M22, M33, M44, V2, V3, V4,
  },
  var::{Var, Variable},
};
use std::{marker::PhantomData, ops, sync::Arc};

/// Literal values.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
  Int(i32),
  UInt(u32),
  Float(f32),
  Bool(bool),
  Int2([i32; 2]),
  UInt2([u32; 2]),
  Float2([f32; 2]),
  Bool2([bool; 2]),
  Int3([i32; 3]),
  UInt3([u32; 3]),
  Float3([f32; 3]),
  Bool3([bool; 3]),
  Int4([i32; 4]),
  UInt4([u32; 4]),
  Float4([f32; 4]),
  Bool4([bool; 4]),
  M22([[f32; 2]; 2]),
  M33([[f32; 3]; 3]),
  M44([[f32; 4]; 4]),
}

impl Literal {
  pub fn ty(&self) -> Type {
    match self {
      Literal::Int(_) => Type::int(Dim::Scalar),
      Literal::UInt(_) => Type::uint(Dim::Scalar),
      Literal::Float(_) => Type::float(Dim::Scalar),
      Literal::Bool(_) => Type::bool(Dim::Scalar),
      Literal::Int2(_) => Type::int(Dim::D2),
      Literal::UInt2(_) => Type::uint(Dim::D2),
      Literal::Float2(_) => Type::float(Dim::D2),
      Literal::Bool2(_) => Type::bool(Dim::D2),
      Literal::Int3(_) => Type::int(Dim::D3),
      Literal::UInt3(_) => Type::uint(Dim::D3),
      Literal::Float3(_) => Type::float(Dim::D3),
      Literal::Bool3(_) => Type::bool(Dim::D3),
      Literal::Int4(_) => Type::int(Dim::D4),
      Literal::UInt4(_) => Type::uint(Dim::D4),
      Literal::Float4(_) => Type::float(Dim::D4),
      Literal::Bool4(_) => Type::bool(Dim::D4),
      Literal::M22(_) => Type::mat(MatrixDim::D22),
      Literal::M33(_) => Type::mat(MatrixDim::D33),
      Literal::M44(_) => Type::mat(MatrixDim::D44),
    }
  }

  /// Constant non-negative integer value, used to bound-check constant indices.
  fn as_index(&self) -> Option<usize> {
    match *self {
      Literal::Int(i) => usize::try_from(i).ok(),
      Literal::UInt(u) => usize::try_from(u).ok(),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOp {
  Neg,
  Not,
}

impl UnaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      UnaryOp::Neg => "-",
      UnaryOp::Not => "!",
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Eq,
  Neq,
  Lt,
  Lte,
  Gt,
  Gte,
  And,
  Or,
  Xor,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
      BinaryOp::Eq => "==",
      BinaryOp::Neq => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Lte => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Gte => ">=",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
      BinaryOp::Xor => "^^",
    }
  }

  /// Result type of `a op b`, or the reason why the operands are rejected.
  pub fn result_type(self, a: &Type, b: &Type) -> Result<Type> {
    let sym = self.symbol();

    match self {
      BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
        let class = if self == BinaryOp::Rem {
          TypeClass::Numeric
        } else {
          TypeClass::Arithmetic
        };
        expect_class(sym, "left operand", a, class)?;
        expect_class(sym, "right operand", b, class)?;

        if a.scalar_kind() != b.scalar_kind() {
          return Err(KslError::type_mismatch(
            sym,
            "right operand",
            format!("of the same base kind as {}", a),
            b,
          ));
        }

        arithmetic_result(self, a, b)
          .ok_or_else(|| KslError::type_mismatch(sym, "right operand", format!("compatible with {}", a), b))
      }

      BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
        expect_class(sym, "left operand", a, TypeClass::NumericScalar)?;
        expect_class(sym, "right operand", b, TypeClass::Exactly(*a))?;
        Ok(Type::bool(Dim::Scalar))
      }

      BinaryOp::Eq | BinaryOp::Neq => {
        if !(TypeClass::Vector.accepts(a) || TypeClass::Matrix.accepts(a)) {
          return Err(KslError::type_mismatch(sym, "left operand", "scalar, vector or matrix", a));
        }
        expect_class(sym, "right operand", b, TypeClass::Exactly(*a))?;
        Ok(Type::bool(Dim::Scalar))
      }

      BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
        expect_class(sym, "left operand", a, TypeClass::Bool)?;
        expect_class(sym, "right operand", b, TypeClass::Bool)?;
        Ok(Type::bool(Dim::Scalar))
      }
    }
  }
}

fn arithmetic_result(op: BinaryOp, a: &Type, b: &Type) -> Option<Type> {
  if a == b || b.is_scalar() {
    return Some(*a);
  }

  if a.is_scalar() {
    return Some(*b);
  }

  if op != BinaryOp::Mul {
    return None;
  }

  match (a.prim_ty, b.prim_ty) {
    (PrimType::Matrix(m), PrimType::Float(d)) if m.column() == d => Some(*b),
    (PrimType::Float(d), PrimType::Matrix(m)) if m.column() == d => Some(*a),
    _ => None,
  }
}

pub(crate) fn expect_class(op: &str, operand: &str, ty: &Type, class: TypeClass) -> Result<()> {
  if class.accepts(ty) {
    Ok(())
  } else {
    Err(KslError::type_mismatch(op, operand, class, ty))
  }
}

/// Expression node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprNode {
  Lit(Literal),
  Var(Variable),
  Unary(UnaryOp, Box<ErasedExpr>),
  Binary(BinaryOp, Box<ErasedExpr>, Box<ErasedExpr>),
  FunCall(ErasedFunHandle, Vec<ErasedExpr>),
  Swizzle(Box<ErasedExpr>, Swizzle),
  ArrayLookup {
    object: Box<ErasedExpr>,
    index: Box<ErasedExpr>,
  },
}

/// Type-erased expression.
#[derive(Clone, Debug, PartialEq)]
pub struct ErasedExpr {
  ty: Type,
  node: ExprNode,
}

impl ErasedExpr {
  /// Build a node without checking it; callers guarantee `ty` is the node’s type.
  pub(crate) const fn new(ty: Type, node: ExprNode) -> Self {
    Self { ty, node }
  }

  pub(crate) fn new_fun_call(ty: Type, handle: ErasedFunHandle, args: Vec<ErasedExpr>) -> Self {
    Self::new(ty, ExprNode::FunCall(handle, args))
  }

  pub(crate) fn new_binary(ty: Type, op: BinaryOp, a: ErasedExpr, b: ErasedExpr) -> Self {
    Self::new(ty, ExprNode::Binary(op, Box::new(a), Box::new(b)))
  }

  pub fn ty(&self) -> Type {
    self.ty
  }

  pub fn node(&self) -> &ExprNode {
    &self.node
  }

  pub fn lit(lit: Literal) -> Self {
    Self::new(lit.ty(), ExprNode::Lit(lit))
  }

  pub fn var(var: &Variable) -> Self {
    Self::new(var.ty, ExprNode::Var(var.clone()))
  }

  pub fn unary(op: UnaryOp, a: ErasedExpr) -> Result<Self> {
    let class = match op {
      UnaryOp::Neg => TypeClass::Arithmetic,
      UnaryOp::Not => TypeClass::Bool,
    };
    expect_class(op.symbol(), "operand", &a.ty, class)?;

    Ok(Self::new(a.ty, ExprNode::Unary(op, Box::new(a))))
  }

  pub fn binary(op: BinaryOp, a: ErasedExpr, b: ErasedExpr) -> Result<Self> {
    let ty = op.result_type(&a.ty, &b.ty)?;
    Ok(Self::new_binary(ty, op, a, b))
  }

  /// Call a built-in function, checking its signature.
  pub fn builtin(handle: ErasedFunHandle, args: Vec<ErasedExpr>) -> Result<Self> {
    let arg_types: Vec<_> = args.iter().map(ErasedExpr::ty).collect();
    let ty = handle.check(&arg_types)?;
    Ok(Self::new_fun_call(ty, handle, args))
  }

  /// Invoke a user-defined function returning a value.
  pub fn call(fun: &Arc<FunSignature>, args: Vec<ErasedExpr>) -> Result<Self> {
    Self::builtin(ErasedFunHandle::UserDefined(fun.clone()), args)
  }

  pub fn swizzle(a: ErasedExpr, sw: Swizzle) -> Result<Self> {
    let ty = sw.result_type(&a.ty)?;
    Ok(Self::new(ty, ExprNode::Swizzle(Box::new(a), sw)))
  }

  /// Index an array (yielding an element) or a matrix (yielding a column).
  pub fn index(object: ErasedExpr, index: ErasedExpr) -> Result<Self> {
    expect_class("[]", "index", &index.ty, TypeClass::Index)?;

    let (ty, len) = match (object.ty.array_len, object.ty.prim_ty) {
      (Some(len), _) => (object.ty.element(), len),
      (None, PrimType::Matrix(m)) => (Type::float(m.column()), m.size()),
      _ => {
        return Err(KslError::type_mismatch(
          "[]",
          "indexed operand",
          "array or matrix",
          object.ty,
        ))
      }
    };

    if let ExprNode::Lit(lit) = &index.node {
      match lit.as_index() {
        Some(i) if i < len => (),
        i => {
          return Err(KslError::IndexOutOfRange {
            op: "[]".to_owned(),
            index: i.unwrap_or(usize::MAX),
            len,
          })
        }
      }
    }

    Ok(Self::new(
      ty,
      ExprNode::ArrayLookup {
        object: Box::new(object),
        index: Box::new(index),
      },
    ))
  }

  /// Variables read by this expression, transitively.
  pub fn reads(&self) -> VarSet {
    let mut set = VarSet::new();
    self.collect_reads(&mut set);
    set
  }

  pub(crate) fn collect_reads(&self, set: &mut VarSet) {
    match &self.node {
      ExprNode::Lit(_) => (),
      ExprNode::Var(v) => set.insert(v),
      ExprNode::Unary(_, a) | ExprNode::Swizzle(a, _) => a.collect_reads(set),
      ExprNode::Binary(_, a, b) => {
        a.collect_reads(set);
        b.collect_reads(set);
      }
      ExprNode::FunCall(_, args) => {
        for arg in args {
          arg.collect_reads(set);
        }
      }
      ExprNode::ArrayLookup { object, index } => {
        object.collect_reads(set);
        index.collect_reads(set);
      }
    }
  }

  /// Variable an lvalue expression writes to.
  ///
  /// Lvalues are variables, swizzles with distinct components of lvalues and indexed lvalues.
  pub fn lvalue_root(&self) -> Option<&Variable> {
    match &self.node {
      ExprNode::Var(v) => Some(v),
      ExprNode::Swizzle(a, sw) if sw.is_assignable() => a.lvalue_root(),
      ExprNode::ArrayLookup { object, .. } => object.lvalue_root(),
      _ => None,
    }
  }

  /// Whether the expression designates a whole variable.
  pub fn as_variable(&self) -> Option<&Variable> {
    match &self.node {
      ExprNode::Var(v) => Some(v),
      _ => None,
    }
  }
}

/// Expression representation.
///
/// This type represents an expression of type `T`: the typed facade over [`ErasedExpr`]. Operators, comparisons
/// and built-in functions are implemented only for the type combinations the shading language accepts, so their
/// results never need to be checked again.
///
/// Literals convert to expressions with [`From`], or with the [`lit!`](crate::lit) macro.
#[derive(Debug)]
pub struct Expr<T> {
  pub(crate) erased: ErasedExpr,
  _phantom: PhantomData<T>,
}

impl<T> Clone for Expr<T> {
  fn clone(&self) -> Self {
    Self::new(self.erased.clone())
  }
}

impl<T> Expr<T> {
  /// Type an erased expression; callers guarantee the type matches `T`.
  pub(crate) const fn new(erased: ErasedExpr) -> Self {
    Self {
      erased,
      _phantom: PhantomData,
    }
  }

  pub fn ty(&self) -> Type {
    self.erased.ty
  }

  pub fn into_erased(self) -> ErasedExpr {
    self.erased
  }

  /// Equality expression.
  pub fn eq(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Eq, rhs.into())
  }

  /// Inequality expression.
  pub fn neq(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Neq, rhs.into())
  }

  fn compare(&self, op: BinaryOp, rhs: Expr<T>) -> Expr<bool> {
    Expr::new(ErasedExpr::new_binary(
      Type::bool(Dim::Scalar),
      op,
      self.erased.clone(),
      rhs.erased,
    ))
  }
}

impl<T> Erased for Expr<T> {
  type Erased = ErasedExpr;

  fn to_erased(self) -> Self::Erased {
    self.erased
  }

  fn erased(&self) -> &Self::Erased {
    &self.erased
  }
}

impl<T> TryFrom<ErasedExpr> for Expr<T>
where
  T: ToType,
{
  type Error = KslError;

  fn try_from(erased: ErasedExpr) -> Result<Self> {
    let expected = T::ty();

    if erased.ty != expected {
      return Err(KslError::type_mismatch("typed conversion", "expression", expected, erased.ty));
    }

    Ok(Expr::new(erased))
  }
}

impl<'a, T> From<&'a Expr<T>> for Expr<T> {
  fn from(e: &'a Expr<T>) -> Self {
    e.clone()
  }
}

impl<T> Expr<T>
where
  T: NumericScalar,
{
  pub fn lt(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Lt, rhs.into())
  }

  pub fn lte(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Lte, rhs.into())
  }

  pub fn gt(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Gt, rhs.into())
  }

  pub fn gte(&self, rhs: impl Into<Expr<T>>) -> Expr<bool> {
    self.compare(BinaryOp::Gte, rhs.into())
  }
}

impl Expr<bool> {
  pub fn and(&self, rhs: impl Into<Expr<bool>>) -> Expr<bool> {
    self.compare(BinaryOp::And, rhs.into())
  }

  pub fn or(&self, rhs: impl Into<Expr<bool>>) -> Expr<bool> {
    self.compare(BinaryOp::Or, rhs.into())
  }

  pub fn xor(&self, rhs: impl Into<Expr<bool>>) -> Expr<bool> {
    self.compare(BinaryOp::Xor, rhs.into())
  }
}

impl<T, const N: usize> Expr<[T; N]>
where
  T: ToPrimType,
{
  /// Array element lookup.
  ///
  /// Constant indices are not bound-checked here; use [`ErasedExpr::index`] for that.
  pub fn at(&self, index: impl Into<Expr<i32>>) -> Expr<T> {
    Expr::new(ErasedExpr::new(
      T::ty(),
      ExprNode::ArrayLookup {
        object: Box::new(self.erased.clone()),
        index: Box::new(index.into().erased),
      },
    ))
  }
}

macro_rules! impl_matrix_col {
  ($m:ty, $v:ty) => {
    impl Expr<$m> {
      /// Column vector lookup.
      pub fn col(&self, index: impl Into<Expr<i32>>) -> Expr<$v> {
        Expr::new(ErasedExpr::new(
          <$v>::ty(),
          ExprNode::ArrayLookup {
            object: Box::new(self.erased.clone()),
            index: Box::new(index.into().erased),
          },
        ))
      }
    }
  };
}

impl_matrix_col!(M22, V2<f32>);
impl_matrix_col!(M33, V3<f32>);
impl_matrix_col!(M44, V4<f32>);

macro_rules! impl_From_Expr_lit {
  ($t:ident < $s:ty >, $q:ident) => {
    impl From<$t<$s>> for Expr<$t<$s>> {
      fn from(a: $t<$s>) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$q(a.0)))
      }
    }

    impl<'a> From<&'a $t<$s>> for Expr<$t<$s>> {
      fn from(a: &'a $t<$s>) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$q(a.0)))
      }
    }
  };

  ($t:ty, $q:ident) => {
    impl From<$t> for Expr<$t> {
      fn from(a: $t) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$q(a)))
      }
    }

    impl<'a> From<&'a $t> for Expr<$t> {
      fn from(a: &'a $t) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$q(*a)))
      }
    }
  };
}

impl_From_Expr_lit!(i32, Int);
impl_From_Expr_lit!(u32, UInt);
impl_From_Expr_lit!(f32, Float);
impl_From_Expr_lit!(bool, Bool);
impl_From_Expr_lit!(V2<i32>, Int2);
impl_From_Expr_lit!(V2<u32>, UInt2);
impl_From_Expr_lit!(V2<f32>, Float2);
impl_From_Expr_lit!(V2<bool>, Bool2);
impl_From_Expr_lit!(V3<i32>, Int3);
impl_From_Expr_lit!(V3<u32>, UInt3);
impl_From_Expr_lit!(V3<f32>, Float3);
impl_From_Expr_lit!(V3<bool>, Bool3);
impl_From_Expr_lit!(V4<i32>, Int4);
impl_From_Expr_lit!(V4<u32>, UInt4);
impl_From_Expr_lit!(V4<f32>, Float4);
impl_From_Expr_lit!(V4<bool>, Bool4);

macro_rules! impl_From_Expr_mat {
  ($m:ident) => {
    impl From<$m> for Expr<$m> {
      fn from(a: $m) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$m(a.0)))
      }
    }

    impl<'a> From<&'a $m> for Expr<$m> {
      fn from(a: &'a $m) -> Self {
        Expr::new(ErasedExpr::lit(Literal::$m(a.0)))
      }
    }
  };
}

impl_From_Expr_mat!(M22);
impl_From_Expr_mat!(M33);
impl_From_Expr_mat!(M44);

/// Left-hand side of typed operators.
trait Operand {
  fn into_operand(self) -> ErasedExpr;
}

impl<T> Operand for Expr<T> {
  fn into_operand(self) -> ErasedExpr {
    self.erased
  }
}

impl<'a, T> Operand for &'a Expr<T> {
  fn into_operand(self) -> ErasedExpr {
    self.erased.clone()
  }
}

impl<T> Operand for Var<T> {
  fn into_operand(self) -> ErasedExpr {
    self.to_erased()
  }
}

impl<'a, T> Operand for &'a Var<T> {
  fn into_operand(self) -> ErasedExpr {
    Erased::erased(self).clone()
  }
}

fn binop<R>(op: BinaryOp, a: impl Operand, b: ErasedExpr) -> Expr<R>
where
  R: ToType,
{
  Expr::new(ErasedExpr::new_binary(R::ty(), op, a.into_operand(), b))
}

// Implement a binary operator for every left-hand side flavor (expression or variable, owned or borrowed) and every
// right-hand side flavor, literals included.
macro_rules! impl_binop_Expr {
  ($op:ident, $meth_name:ident, $a:ty, $b:ty, $r:ty) => {
    impl_binop_Expr!(@rhs $op, $meth_name, Expr<$a>, $b, $r);
    impl_binop_Expr!(@rhs $op, $meth_name, Var<$a>, $b, $r);
    impl_binop_Expr!(@rhs_ref $op, $meth_name, Expr<$a>, $b, $r);
    impl_binop_Expr!(@rhs_ref $op, $meth_name, Var<$a>, $b, $r);
  };

  (@rhs $op:ident, $meth_name:ident, $lhs:ty, $b:ty, $r:ty) => {
    impl ops::$op<Expr<$b>> for $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: Expr<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, rhs.erased)
      }
    }

    impl<'a> ops::$op<&'a Expr<$b>> for $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: &'a Expr<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, rhs.erased.clone())
      }
    }

    impl<'a> ops::$op<&'a Var<$b>> for $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: &'a Var<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, Erased::erased(rhs).clone())
      }
    }

    impl ops::$op<$b> for $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: $b) -> Self::Output {
        binop(BinaryOp::$op, self, Expr::<$b>::from(rhs).erased)
      }
    }
  };

  (@rhs_ref $op:ident, $meth_name:ident, $lhs:ty, $b:ty, $r:ty) => {
    impl<'a> ops::$op<Expr<$b>> for &'a $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: Expr<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, rhs.erased)
      }
    }

    impl<'a> ops::$op<&'a Expr<$b>> for &'a $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: &'a Expr<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, rhs.erased.clone())
      }
    }

    impl<'a> ops::$op<&'a Var<$b>> for &'a $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: &'a Var<$b>) -> Self::Output {
        binop(BinaryOp::$op, self, Erased::erased(rhs).clone())
      }
    }

    impl<'a> ops::$op<$b> for &'a $lhs {
      type Output = Expr<$r>;

      fn $meth_name(self, rhs: $b) -> Self::Output {
        binop(BinaryOp::$op, self, Expr::<$b>::from(rhs).erased)
      }
    }
  };
}

// arithmetic on scalars and vectors of the same kind, and vectors with scalars
macro_rules! impl_arith_Expr {
  ($op:ident, $meth_name:ident, $t:ty) => {
    impl_binop_Expr!($op, $meth_name, $t, $t, $t);
    impl_binop_Expr!($op, $meth_name, V2<$t>, V2<$t>, V2<$t>);
    impl_binop_Expr!($op, $meth_name, V2<$t>, $t, V2<$t>);
    impl_binop_Expr!($op, $meth_name, V3<$t>, V3<$t>, V3<$t>);
    impl_binop_Expr!($op, $meth_name, V3<$t>, $t, V3<$t>);
    impl_binop_Expr!($op, $meth_name, V4<$t>, V4<$t>, V4<$t>);
    impl_binop_Expr!($op, $meth_name, V4<$t>, $t, V4<$t>);
  };

  ($op:ident, $meth_name:ident) => {
    impl_arith_Expr!($op, $meth_name, i32);
    impl_arith_Expr!($op, $meth_name, u32);
    impl_arith_Expr!($op, $meth_name, f32);
  };
}

impl_arith_Expr!(Add, add);
impl_arith_Expr!(Sub, sub);
impl_arith_Expr!(Mul, mul);
impl_arith_Expr!(Div, div);
impl_arith_Expr!(Rem, rem);

macro_rules! impl_matrix_ops {
  ($m:ty, $v:ty) => {
    impl_binop_Expr!(Add, add, $m, $m, $m);
    impl_binop_Expr!(Sub, sub, $m, $m, $m);
    impl_binop_Expr!(Mul, mul, $m, $m, $m);
    impl_binop_Expr!(Mul, mul, $m, f32, $m);
    impl_binop_Expr!(Mul, mul, $m, $v, $v);
    impl_binop_Expr!(Mul, mul, $v, $m, $v);
  };
}

impl_matrix_ops!(M22, V2<f32>);
impl_matrix_ops!(M33, V3<f32>);
impl_matrix_ops!(M44, V4<f32>);

macro_rules! impl_Not_Expr {
  ($t:ty) => {
    impl ops::Not for Expr<$t> {
      type Output = Self;

      fn not(self) -> Self::Output {
        Expr::new(ErasedExpr::new(self.erased.ty, ExprNode::Unary(UnaryOp::Not, Box::new(self.erased))))
      }
    }

    impl<'a> ops::Not for &'a Expr<$t> {
      type Output = Expr<$t>;

      fn not(self) -> Self::Output {
        !self.clone()
      }
    }
  };
}

impl_Not_Expr!(bool);

macro_rules! impl_Neg_Expr {
  ($t:ty) => {
    impl ops::Neg for Expr<$t> {
      type Output = Self;

      fn neg(self) -> Self::Output {
        Expr::new(ErasedExpr::new(self.erased.ty, ExprNode::Unary(UnaryOp::Neg, Box::new(self.erased))))
      }
    }

    impl<'a> ops::Neg for &'a Expr<$t> {
      type Output = Expr<$t>;

      fn neg(self) -> Self::Output {
        -self.clone()
      }
    }
  };
}

impl_Neg_Expr!(i32);
impl_Neg_Expr!(V2<i32>);
impl_Neg_Expr!(V3<i32>);
impl_Neg_Expr!(V4<i32>);
impl_Neg_Expr!(f32);
impl_Neg_Expr!(V2<f32>);
impl_Neg_Expr!(V3<f32>);
impl_Neg_Expr!(V4<f32>);
impl_Neg_Expr!(M22);
impl_Neg_Expr!(M33);
impl_Neg_Expr!(M44);

/// Easily create literal expressions.
///
/// One argument makes a scalar (or any literal convertible with [`From`]); two to four make a vector.
#[macro_export]
macro_rules! lit {
  ($e:expr) => {
    $crate::expr::Expr::from($e)
  };

  ($a:expr, $b:expr) => {
    $crate::expr::Expr::from($crate::types::V2::from([$a, $b]))
  };

  ($a:expr, $b:expr, $c:expr) => {
    $crate::expr::Expr::from($crate::types::V3::from([$a, $b, $c]))
  };

  ($a:expr, $b:expr, $c:expr, $d:expr) => {
    $crate::expr::Expr::from($crate::types::V4::from([$a, $b, $c, $d]))
  };
}

/// Create 2D vector expressions from scalar expressions, or splat one scalar.
#[macro_export]
macro_rules! vec2 {
  ($a:expr) => {{
    use $crate::types::Vec2 as _;
    $crate::expr::Expr::vec2($crate::expr::Expr::from(&$a))
  }};

  ($xy:expr, $z:expr) => {{
    use $crate::types::Vec2 as _;
    $crate::expr::Expr::vec2(($crate::expr::Expr::from(&$xy), $crate::expr::Expr::from(&$z)))
  }};
}

/// Create 3D vector expressions from scalar and vector expressions, or splat one scalar.
#[macro_export]
macro_rules! vec3 {
  ($a:expr) => {{
    use $crate::types::Vec3 as _;
    $crate::expr::Expr::vec3($crate::expr::Expr::from(&$a))
  }};

  ($a:expr, $b:expr) => {{
    use $crate::types::Vec3 as _;
    $crate::expr::Expr::vec3(($crate::expr::Expr::from(&$a), $crate::expr::Expr::from(&$b)))
  }};

  ($a:expr, $b:expr, $c:expr) => {{
    use $crate::types::Vec3 as _;
    $crate::expr::Expr::vec3((
      $crate::expr::Expr::from(&$a),
      $crate::expr::Expr::from(&$b),
      $crate::expr::Expr::from(&$c),
    ))
  }};
}

/// Create 4D vector expressions from scalar and vector expressions, or splat one scalar.
#[macro_export]
macro_rules! vec4 {
  ($a:expr) => {{
    use $crate::types::Vec4 as _;
    $crate::expr::Expr::vec4($crate::expr::Expr::from(&$a))
  }};

  ($a:expr, $b:expr) => {{
    use $crate::types::Vec4 as _;
    $crate::expr::Expr::vec4(($crate::expr::Expr::from(&$a), $crate::expr::Expr::from(&$b)))
  }};

  ($a:expr, $b:expr, $c:expr) => {{
    use $crate::types::Vec4 as _;
    $crate::expr::Expr::vec4((
      $crate::expr::Expr::from(&$a),
      $crate::expr::Expr::from(&$b),
      $crate::expr::Expr::from(&$c),
    ))
  }};

  ($a:expr, $b:expr, $c:expr, $d:expr) => {{
    use $crate::types::Vec4 as _;
    $crate::expr::Expr::vec4((
      $crate::expr::Expr::from(&$a),
      $crate::expr::Expr::from(&$b),
      $crate::expr::Expr::from(&$c),
      $crate::expr::Expr::from(&$d),
    ))
  }};
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    error::ErrorKind,
    var::{ScopeId, StateKind, VarId},
  };

  fn variable(id: u32, name: &str, ty: Type) -> Variable {
    Variable {
      id: VarId(id),
      name: name.into(),
      ty,
      scope: ScopeId(1),
      kind: StateKind::Local,
    }
  }

  #[test]
  fn literals() {
    assert_eq!(lit!(1.).erased.ty(), Type::float(Dim::Scalar));
    assert_eq!(lit!(1i32, 2, 3).erased, ErasedExpr::lit(Literal::Int3([1, 2, 3])));
    assert_eq!(
      Expr::from(M44::IDENTITY).erased.ty(),
      Type::mat(MatrixDim::D44)
    );
  }

  #[test]
  fn typed_operators() {
    let a = lit!(1., 2., 3.);
    let b = lit!(2.);
    let c = &a * &b + &a;

    assert_eq!(c.ty(), Type::float(Dim::D3));
    assert_eq!(
      c.erased,
      ErasedExpr::new_binary(
        Type::float(Dim::D3),
        BinaryOp::Add,
        ErasedExpr::new_binary(Type::float(Dim::D3), BinaryOp::Mul, a.erased.clone(), b.erased),
        a.erased,
      )
    );

    let m = Expr::from(M44::IDENTITY);
    let v = lit!(1., 2., 3., 1.);
    assert_eq!((&m * &v).ty(), Type::float(Dim::D4));
    assert_eq!((&v * &m).ty(), Type::float(Dim::D4));
    assert_eq!((&m * 2.).ty(), Type::mat(MatrixDim::D44));
  }

  #[test]
  fn typed_results_revalidate() {
    let x = lit!(1., 2.);
    let typed = &x * 3. - &x;
    let ExprNode::Binary(op, a, b) = typed.erased.node().clone() else {
      panic!("binary node expected");
    };
    let rebuilt = ErasedExpr::binary(op, *a, *b).unwrap();

    assert_eq!(rebuilt, typed.erased);
  }

  #[test]
  fn comparisons() {
    let x = lit!(1i32);
    let y = x.lt(2).and(x.neq(0));

    assert_eq!(y.ty(), Type::bool(Dim::Scalar));
    assert_eq!((!y).ty(), Type::bool(Dim::Scalar));
  }

  #[test]
  fn arithmetic_rules() {
    let f3 = Type::float(Dim::D3);
    let f1 = Type::float(Dim::Scalar);
    let i3 = Type::int(Dim::D3);
    let m3 = Type::mat(MatrixDim::D33);

    assert_eq!(BinaryOp::Add.result_type(&f3, &f3), Ok(f3));
    assert_eq!(BinaryOp::Mul.result_type(&f1, &f3), Ok(f3));
    assert_eq!(BinaryOp::Mul.result_type(&m3, &f3), Ok(f3));
    assert_eq!(BinaryOp::Mul.result_type(&m3, &m3), Ok(m3));
    assert_eq!(BinaryOp::Rem.result_type(&i3, &Type::int(Dim::Scalar)), Ok(i3));

    let err = BinaryOp::Add.result_type(&f3, &i3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    assert!(BinaryOp::Add.result_type(&f3, &Type::float(Dim::D2)).is_err());
    assert!(BinaryOp::Add.result_type(&m3, &f3).is_err());
    assert!(BinaryOp::Rem.result_type(&m3, &m3).is_err());
    assert!(BinaryOp::Add.result_type(&Type::bool(Dim::Scalar), &Type::bool(Dim::Scalar)).is_err());
  }

  #[test]
  fn logic_and_comparison_rules() {
    let b1 = Type::bool(Dim::Scalar);
    let f1 = Type::float(Dim::Scalar);

    assert_eq!(BinaryOp::Xor.result_type(&b1, &b1), Ok(b1));
    assert!(BinaryOp::And.result_type(&b1, &f1).is_err());
    assert_eq!(BinaryOp::Lt.result_type(&f1, &f1), Ok(b1));
    assert!(BinaryOp::Lt.result_type(&Type::float(Dim::D2), &Type::float(Dim::D2)).is_err());
    assert_eq!(BinaryOp::Eq.result_type(&Type::float(Dim::D2), &Type::float(Dim::D2)), Ok(b1));
  }

  #[test]
  fn unary_rules() {
    let f = ErasedExpr::lit(Literal::Float(1.));
    let b = ErasedExpr::lit(Literal::Bool(true));

    assert!(ErasedExpr::unary(UnaryOp::Neg, f.clone()).is_ok());
    assert!(ErasedExpr::unary(UnaryOp::Not, f).is_err());
    assert!(ErasedExpr::unary(UnaryOp::Neg, b.clone()).is_err());
    assert!(ErasedExpr::unary(UnaryOp::Not, b).is_ok());
  }

  #[test]
  fn indexing() {
    let joints = variable(0, "uJointTransform", Type::array(PrimType::Matrix(MatrixDim::D44), 4));
    let lookup = ErasedExpr::index(ErasedExpr::var(&joints), ErasedExpr::lit(Literal::Int(3))).unwrap();
    assert_eq!(lookup.ty(), Type::mat(MatrixDim::D44));

    let column = ErasedExpr::index(lookup, ErasedExpr::lit(Literal::UInt(0))).unwrap();
    assert_eq!(column.ty(), Type::float(Dim::D4));

    let err = ErasedExpr::index(ErasedExpr::var(&joints), ErasedExpr::lit(Literal::Int(4))).unwrap_err();
    assert_eq!(
      err,
      KslError::IndexOutOfRange {
        op: "[]".to_owned(),
        index: 4,
        len: 4
      }
    );

    let not_indexable = ErasedExpr::lit(Literal::Float3([0.; 3]));
    assert!(ErasedExpr::index(not_indexable, ErasedExpr::lit(Literal::Int(0))).is_err());

    let float_index = ErasedExpr::lit(Literal::Float(0.));
    assert!(ErasedExpr::index(ErasedExpr::var(&joints), float_index).is_err());
  }

  #[test]
  fn reads_are_transitive() {
    let a = variable(0, "a", Type::float(Dim::D3));
    let b = variable(1, "b", Type::float(Dim::Scalar));
    let e = ErasedExpr::binary(
      BinaryOp::Mul,
      ErasedExpr::var(&a),
      ErasedExpr::builtin(ErasedFunHandle::Sin, vec![ErasedExpr::var(&b)]).unwrap(),
    )
    .unwrap();

    let reads = e.reads();
    assert_eq!(reads.len(), 2);
    assert!(reads.contains(&a));
    assert!(reads.contains(&b));
  }

  #[test]
  fn try_from_checks_type() {
    let e = ErasedExpr::lit(Literal::Float2([0., 1.]));

    assert!(Expr::<V2<f32>>::try_from(e.clone()).is_ok());
    assert_eq!(
      Expr::<V3<f32>>::try_from(e).unwrap_err().kind(),
      ErrorKind::TypeMismatch
    );
  }

  #[test]
  fn vec_macros() {
    let x = lit!(1.);
    let xy = vec2!(x, 2.);
    let xyz = vec3!(xy, 3.);
    let xyzw = vec4!(xyz, 1.);
    let splat = vec4!(0.5);

    assert_eq!(xy.ty(), Type::float(Dim::D2));
    assert_eq!(xyz.ty(), Type::float(Dim::D3));
    assert_eq!(xyzw.ty(), Type::float(Dim::D4));
    assert_eq!(splat.ty(), Type::float(Dim::D4));
  }
}
