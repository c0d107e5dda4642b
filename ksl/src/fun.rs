//! Functions.
//!
//! Built-in functions are identified by an [`ErasedFunHandle`], which also knows how to check a call’s argument
//! types and compute its result type. User-defined functions are declared on a
//! [`StageBuilder`](crate::stage::StageBuilder) and referred to by a [`FunHandle`].

use crate::{
  error::{KslError, Result},
  expr::{expect_class, ErasedExpr, Expr},
  scope::{ErasedScope, Scope},
  types::{Dim, PrimType, ScalarKind, ToType, Type, TypeClass},
  var::Variable,
};
use std::{fmt, marker::PhantomData, sync::Arc};

/// Signature of a user-defined function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunSignature {
  pub name: Arc<str>,
  pub params: Vec<Type>,
  pub ret: Option<Type>,
}

impl FunSignature {
  /// Check call arguments against the parameter list.
  pub fn check_args(&self, args: &[Type]) -> Result<()> {
    arity(&self.name, args, self.params.len())?;

    for (i, (param, arg)) in self.params.iter().zip(args).enumerate() {
      expect_class(&self.name, &format!("argument {}", i), arg, TypeClass::Exactly(*param))?;
    }

    Ok(())
  }
}

/// Function handle.
#[derive(Clone, Debug, PartialEq)]
pub enum ErasedFunHandle {
  // vector and matrix constructors
  Vec2,
  Vec3,
  Vec4,
  Mat2,
  Mat3,
  Mat4,
  // conversions
  ToFloat,
  ToInt,
  ToUInt,
  // trigonometry
  Radians,
  Degrees,
  Sin,
  Cos,
  Tan,
  ASin,
  ACos,
  ATan,
  ATan2,
  SinH,
  CosH,
  TanH,
  ASinH,
  ACosH,
  ATanH,
  // exponential
  Pow,
  Exp,
  Exp2,
  Log,
  Log2,
  Sqrt,
  InverseSqrt,
  // common
  Abs,
  Sign,
  Floor,
  Trunc,
  Round,
  Ceil,
  Fract,
  Min,
  Max,
  Clamp,
  Mix,
  Step,
  SmoothStep,
  Fma,
  IsNan,
  IsInf,
  // geometry functions
  Length,
  Distance,
  Dot,
  Cross,
  Normalize,
  FaceForward,
  Reflect,
  Refract,
  // matrix functions
  Determinant,
  Transpose,
  Inverse,
  // vector relational
  Any,
  All,
  // textures
  Sample,
  SampleLod,
  SampleDepth,
  TexelFetch,
  TextureSize,
  // user-defined
  UserDefined(Arc<FunSignature>),
}

impl ErasedFunHandle {
  pub fn name(&self) -> &str {
    match self {
      ErasedFunHandle::Vec2 => "vec2",
      ErasedFunHandle::Vec3 => "vec3",
      ErasedFunHandle::Vec4 => "vec4",
      ErasedFunHandle::Mat2 => "mat2",
      ErasedFunHandle::Mat3 => "mat3",
      ErasedFunHandle::Mat4 => "mat4",
      ErasedFunHandle::ToFloat => "float",
      ErasedFunHandle::ToInt => "int",
      ErasedFunHandle::ToUInt => "uint",
      ErasedFunHandle::Radians => "radians",
      ErasedFunHandle::Degrees => "degrees",
      ErasedFunHandle::Sin => "sin",
      ErasedFunHandle::Cos => "cos",
      ErasedFunHandle::Tan => "tan",
      ErasedFunHandle::ASin => "asin",
      ErasedFunHandle::ACos => "acos",
      ErasedFunHandle::ATan => "atan",
      ErasedFunHandle::ATan2 => "atan2",
      ErasedFunHandle::SinH => "sinh",
      ErasedFunHandle::CosH => "cosh",
      ErasedFunHandle::TanH => "tanh",
      ErasedFunHandle::ASinH => "asinh",
      ErasedFunHandle::ACosH => "acosh",
      ErasedFunHandle::ATanH => "atanh",
      ErasedFunHandle::Pow => "pow",
      ErasedFunHandle::Exp => "exp",
      ErasedFunHandle::Exp2 => "exp2",
      ErasedFunHandle::Log => "log",
      ErasedFunHandle::Log2 => "log2",
      ErasedFunHandle::Sqrt => "sqrt",
      ErasedFunHandle::InverseSqrt => "inverseSqrt",
      ErasedFunHandle::Abs => "abs",
      ErasedFunHandle::Sign => "sign",
      ErasedFunHandle::Floor => "floor",
      ErasedFunHandle::Trunc => "trunc",
      ErasedFunHandle::Round => "round",
      ErasedFunHandle::Ceil => "ceil",
      ErasedFunHandle::Fract => "fract",
      ErasedFunHandle::Min => "min",
      ErasedFunHandle::Max => "max",
      ErasedFunHandle::Clamp => "clamp",
      ErasedFunHandle::Mix => "mix",
      ErasedFunHandle::Step => "step",
      ErasedFunHandle::SmoothStep => "smoothStep",
      ErasedFunHandle::Fma => "fma",
      ErasedFunHandle::IsNan => "isNan",
      ErasedFunHandle::IsInf => "isInf",
      ErasedFunHandle::Length => "length",
      ErasedFunHandle::Distance => "distance",
      ErasedFunHandle::Dot => "dot",
      ErasedFunHandle::Cross => "cross",
      ErasedFunHandle::Normalize => "normalize",
      ErasedFunHandle::FaceForward => "faceForward",
      ErasedFunHandle::Reflect => "reflect",
      ErasedFunHandle::Refract => "refract",
      ErasedFunHandle::Determinant => "determinant",
      ErasedFunHandle::Transpose => "transpose",
      ErasedFunHandle::Inverse => "inverse",
      ErasedFunHandle::Any => "any",
      ErasedFunHandle::All => "all",
      ErasedFunHandle::Sample => "sampleTexture",
      ErasedFunHandle::SampleLod => "sampleTextureLod",
      ErasedFunHandle::SampleDepth => "sampleDepthTexture",
      ErasedFunHandle::TexelFetch => "texelFetch",
      ErasedFunHandle::TextureSize => "textureSize",
      ErasedFunHandle::UserDefined(sig) => &sig.name,
    }
  }

  /// Check the argument types of a call and compute its result type.
  pub fn check(&self, args: &[Type]) -> Result<Type> {
    let name = self.name();

    match self {
      ErasedFunHandle::Vec2 => check_vec_ctor(name, Dim::D2, args),
      ErasedFunHandle::Vec3 => check_vec_ctor(name, Dim::D3, args),
      ErasedFunHandle::Vec4 => check_vec_ctor(name, Dim::D4, args),
      ErasedFunHandle::Mat2 => check_mat_ctor(name, Dim::D2, args),
      ErasedFunHandle::Mat3 => check_mat_ctor(name, Dim::D3, args),
      ErasedFunHandle::Mat4 => check_mat_ctor(name, Dim::D4, args),

      ErasedFunHandle::ToFloat => check_conversion(name, ScalarKind::Float, args),
      ErasedFunHandle::ToInt => check_conversion(name, ScalarKind::Int, args),
      ErasedFunHandle::ToUInt => check_conversion(name, ScalarKind::UInt, args),

      ErasedFunHandle::Radians
      | ErasedFunHandle::Degrees
      | ErasedFunHandle::Sin
      | ErasedFunHandle::Cos
      | ErasedFunHandle::Tan
      | ErasedFunHandle::ASin
      | ErasedFunHandle::ACos
      | ErasedFunHandle::ATan
      | ErasedFunHandle::SinH
      | ErasedFunHandle::CosH
      | ErasedFunHandle::TanH
      | ErasedFunHandle::ASinH
      | ErasedFunHandle::ACosH
      | ErasedFunHandle::ATanH
      | ErasedFunHandle::Exp
      | ErasedFunHandle::Exp2
      | ErasedFunHandle::Log
      | ErasedFunHandle::Log2
      | ErasedFunHandle::Sqrt
      | ErasedFunHandle::InverseSqrt
      | ErasedFunHandle::Floor
      | ErasedFunHandle::Trunc
      | ErasedFunHandle::Round
      | ErasedFunHandle::Ceil
      | ErasedFunHandle::Fract
      | ErasedFunHandle::Normalize => same_as_first(name, args, 1, TypeClass::Float),

      ErasedFunHandle::ATan2 | ErasedFunHandle::Pow | ErasedFunHandle::Reflect => {
        same_as_first(name, args, 2, TypeClass::Float)
      }

      ErasedFunHandle::Fma | ErasedFunHandle::FaceForward => same_as_first(name, args, 3, TypeClass::Float),

      ErasedFunHandle::Abs | ErasedFunHandle::Sign => same_as_first(name, args, 1, TypeClass::Signed),

      ErasedFunHandle::Min | ErasedFunHandle::Max => {
        arity(name, args, 2)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Numeric)?;
        same_or_scalar(name, 1, &args[1], &args[0])?;
        Ok(args[0])
      }

      ErasedFunHandle::Clamp => {
        arity(name, args, 3)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Numeric)?;
        same_or_scalar(name, 1, &args[1], &args[0])?;
        same_or_scalar(name, 2, &args[2], &args[0])?;
        Ok(args[0])
      }

      ErasedFunHandle::Mix => {
        arity(name, args, 3)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Float)?;
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(args[0]))?;
        same_or_scalar(name, 2, &args[2], &args[0])?;
        Ok(args[0])
      }

      // (edge, x)
      ErasedFunHandle::Step => {
        arity(name, args, 2)?;
        expect_class(name, "argument 1", &args[1], TypeClass::Float)?;
        same_or_scalar(name, 0, &args[0], &args[1])?;
        Ok(args[1])
      }

      // (edge0, edge1, x)
      ErasedFunHandle::SmoothStep => {
        arity(name, args, 3)?;
        expect_class(name, "argument 2", &args[2], TypeClass::Float)?;
        same_or_scalar(name, 0, &args[0], &args[2])?;
        same_or_scalar(name, 1, &args[1], &args[2])?;
        Ok(args[2])
      }

      ErasedFunHandle::IsNan | ErasedFunHandle::IsInf => {
        arity(name, args, 1)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Float)?;
        Ok(Type::bool(args[0].dim().unwrap_or(Dim::Scalar)))
      }

      ErasedFunHandle::Length => {
        arity(name, args, 1)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Float)?;
        Ok(Type::float(Dim::Scalar))
      }

      ErasedFunHandle::Distance | ErasedFunHandle::Dot => {
        same_as_first(name, args, 2, TypeClass::Float)?;
        Ok(Type::float(Dim::Scalar))
      }

      ErasedFunHandle::Cross => same_as_first(name, args, 2, TypeClass::Exactly(Type::float(Dim::D3))),

      ErasedFunHandle::Refract => {
        arity(name, args, 3)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Float)?;
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(args[0]))?;
        expect_class(name, "argument 2", &args[2], TypeClass::FloatScalar)?;
        Ok(args[0])
      }

      ErasedFunHandle::Determinant => {
        arity(name, args, 1)?;
        expect_class(name, "argument 0", &args[0], TypeClass::Matrix)?;
        Ok(Type::float(Dim::Scalar))
      }

      ErasedFunHandle::Transpose | ErasedFunHandle::Inverse => same_as_first(name, args, 1, TypeClass::Matrix),

      ErasedFunHandle::Any | ErasedFunHandle::All => {
        arity(name, args, 1)?;
        expect_class(name, "argument 0", &args[0], TypeClass::BoolVector)?;
        Ok(Type::bool(Dim::Scalar))
      }

      ErasedFunHandle::Sample => {
        arity(name, args, 2)?;
        let dim = color_sampler(name, &args[0])?;
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(Type::float(dim.coord())))?;
        Ok(Type::float(Dim::D4))
      }

      ErasedFunHandle::SampleLod => {
        arity(name, args, 3)?;
        let dim = color_sampler(name, &args[0])?;
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(Type::float(dim.coord())))?;
        expect_class(name, "argument 2", &args[2], TypeClass::FloatScalar)?;
        Ok(Type::float(Dim::D4))
      }

      // the coordinates carry the depth reference as their last component
      ErasedFunHandle::SampleDepth => {
        arity(name, args, 2)?;
        let coord = match args[0].prim_ty {
          PrimType::DepthSampler(dim) if !args[0].is_array() => {
            Dim::from_count(dim.coord().count() + 1).unwrap_or(Dim::D4)
          }
          _ => return Err(KslError::type_mismatch(name, "argument 0", TypeClass::DepthSampler, args[0])),
        };
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(Type::float(coord)))?;
        Ok(Type::float(Dim::Scalar))
      }

      ErasedFunHandle::TexelFetch => {
        arity(name, args, 3)?;
        let dim = color_sampler(name, &args[0])?;
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(Type::int(dim.texel())))?;
        expect_class(name, "argument 2", &args[2], TypeClass::Exactly(Type::int(Dim::Scalar)))?;
        Ok(Type::float(Dim::D4))
      }

      ErasedFunHandle::TextureSize => {
        arity(name, args, 2)?;
        let dim = match args[0].prim_ty {
          PrimType::Sampler(dim) | PrimType::DepthSampler(dim) if !args[0].is_array() => dim,
          _ => return Err(KslError::type_mismatch(name, "argument 0", "sampler", args[0])),
        };
        expect_class(name, "argument 1", &args[1], TypeClass::Exactly(Type::int(Dim::Scalar)))?;
        Ok(Type::int(dim.texel()))
      }

      ErasedFunHandle::UserDefined(sig) => {
        sig.check_args(args)?;
        sig
          .ret
          .ok_or_else(|| KslError::type_mismatch(name, "return value", "a value-returning function", "void"))
      }
    }
  }
}

impl fmt::Display for ErasedFunHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

fn arity(name: &str, args: &[Type], n: usize) -> Result<()> {
  if args.len() == n {
    Ok(())
  } else {
    Err(KslError::type_mismatch(
      name,
      "argument list",
      format!("{} arguments", n),
      format!("{} arguments", args.len()),
    ))
  }
}

/// `n` arguments of the first argument’s type, which must satisfy `class`.
fn same_as_first(name: &str, args: &[Type], n: usize, class: TypeClass) -> Result<Type> {
  arity(name, args, n)?;
  expect_class(name, "argument 0", &args[0], class)?;

  for (i, arg) in args.iter().enumerate().skip(1) {
    expect_class(name, &format!("argument {}", i), arg, TypeClass::Exactly(args[0]))?;
  }

  Ok(args[0])
}

fn same_or_scalar(name: &str, i: usize, ty: &Type, reference: &Type) -> Result<()> {
  let scalar = reference
    .scalar_kind()
    .map(|kind| Type::new(PrimType::new(kind, Dim::Scalar)));

  if ty == reference || Some(*ty) == scalar {
    Ok(())
  } else {
    Err(KslError::type_mismatch(
      name,
      format!("argument {}", i),
      format!("{} or its scalar", reference),
      ty,
    ))
  }
}

fn color_sampler(name: &str, ty: &Type) -> Result<crate::types::SamplerDim> {
  match ty.prim_ty {
    PrimType::Sampler(dim) if !ty.is_array() => Ok(dim),
    _ => Err(KslError::type_mismatch(name, "argument 0", TypeClass::Sampler, ty)),
  }
}

fn check_vec_ctor(name: &str, dim: Dim, args: &[Type]) -> Result<Type> {
  let kind = match args.first().map(|ty| (ty.scalar_kind(), ty.dim())) {
    Some((Some(kind), Some(_))) => kind,
    Some(_) => return Err(KslError::type_mismatch(name, "argument 0", TypeClass::Vector, args[0])),
    None => return Err(KslError::type_mismatch(name, "argument list", "at least one argument", "none")),
  };
  let mut components = 0;

  for (i, arg) in args.iter().enumerate() {
    match (arg.scalar_kind(), arg.dim()) {
      (Some(k), Some(d)) if k == kind => components += d.count(),
      _ => {
        return Err(KslError::type_mismatch(
          name,
          format!("argument {}", i),
          format!("{} scalar or vector", Type::new(PrimType::new(kind, Dim::Scalar))),
          arg,
        ))
      }
    }
  }

  // a single scalar is splatted
  let splat = args.len() == 1 && args[0].is_scalar();
  if !splat && components != dim.count() {
    return Err(KslError::type_mismatch(
      name,
      "argument list",
      format!("{} components", dim.count()),
      format!("{} components", components),
    ));
  }

  Ok(Type::new(PrimType::new(kind, dim)))
}

fn check_mat_ctor(name: &str, column: Dim, args: &[Type]) -> Result<Type> {
  arity(name, args, column.count())?;

  for (i, arg) in args.iter().enumerate() {
    expect_class(name, &format!("column {}", i), arg, TypeClass::Exactly(Type::float(column)))?;
  }

  let dim = crate::types::MatrixDim::from_size(column.count())
    .ok_or_else(|| KslError::type_mismatch(name, "column", "2 to 4 components", column.count()))?;
  Ok(Type::mat(dim))
}

fn check_conversion(name: &str, kind: ScalarKind, args: &[Type]) -> Result<Type> {
  arity(name, args, 1)?;
  expect_class(name, "argument 0", &args[0], TypeClass::Vector)?;
  Ok(Type::new(PrimType::new(kind, args[0].dim().unwrap_or(Dim::Scalar))))
}

/// A user-defined function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ErasedFun {
  pub(crate) signature: Arc<FunSignature>,
  pub(crate) args: Vec<Variable>,
  pub(crate) scope: ErasedScope,
  pub(crate) ret: Option<ErasedExpr>,
}

impl ErasedFun {
  pub fn signature(&self) -> &Arc<FunSignature> {
    &self.signature
  }

  pub fn name(&self) -> &str {
    &self.signature.name
  }

  pub fn args(&self) -> &[Variable] {
    &self.args
  }

  pub fn scope(&self) -> &ErasedScope {
    &self.scope
  }

  /// Value returned at the end of the body, if any.
  pub fn ret(&self) -> Option<&ErasedExpr> {
    self.ret.as_ref()
  }
}

/// Return type of functions.
///
/// Either `()` for a void function, or an [`Expr<T>`].
pub trait FunReturn {
  fn ret_ty() -> Option<Type>;

  fn into_return(self) -> Option<ErasedExpr>;
}

impl FunReturn for () {
  fn ret_ty() -> Option<Type> {
    None
  }

  fn into_return(self) -> Option<ErasedExpr> {
    None
  }
}

impl<T> FunReturn for Expr<T>
where
  T: ToType,
{
  fn ret_ty() -> Option<Type> {
    Some(T::ty())
  }

  fn into_return(self) -> Option<ErasedExpr> {
    Some(self.erased)
  }
}

/// Function definition.
///
/// Implemented by closures taking a [`Scope`] and the function arguments as typed expressions. `R` is the
/// [`FunReturn`] type and `A` the argument list, encoded as a tuple of expressions.
pub trait ToFun<R, A> {
  fn param_types() -> Vec<Type>;

  fn build_fn(self, scope: &mut Scope, args: &[Variable]) -> Result<R>;
}

macro_rules! impl_ToFun_args {
  ($($arg:ident : $ty:ident),*) => {
    impl<F, R, $($ty),*> ToFun<R, ($(Expr<$ty>,)*)> for F
    where
      F: FnOnce(&mut Scope, $(Expr<$ty>),*) -> Result<R>,
      R: FunReturn,
      $($ty: ToType),*
    {
      fn param_types() -> Vec<Type> {
        vec![$(<$ty as ToType>::ty()),*]
      }

      fn build_fn(self, scope: &mut Scope, args: &[Variable]) -> Result<R> {
        let [$($arg),*] = args else {
          return Err(KslError::type_mismatch(
            "function definition",
            "argument list",
            format!("{} arguments", Self::param_types().len()),
            format!("{} arguments", args.len()),
          ));
        };

        self(scope, $(Expr::new(ErasedExpr::var($arg))),*)
      }
    }
  };
}

impl_ToFun_args!();
impl_ToFun_args!(a0: A0);
impl_ToFun_args!(a0: A0, a1: A1);
impl_ToFun_args!(a0: A0, a1: A1, a2: A2);
impl_ToFun_args!(a0: A0, a1: A1, a2: A2, a3: A3);

/// Typed handle to a user-defined function.
///
/// `R` is the return type (`()` or `Expr<T>`) and `A` the argument list.
#[derive(Debug)]
pub struct FunHandle<R, A> {
  signature: Arc<FunSignature>,
  _phantom: PhantomData<(R, A)>,
}

impl<R, A> Clone for FunHandle<R, A> {
  fn clone(&self) -> Self {
    Self::new(self.signature.clone())
  }
}

impl<R, A> FunHandle<R, A> {
  pub(crate) fn new(signature: Arc<FunSignature>) -> Self {
    Self {
      signature,
      _phantom: PhantomData,
    }
  }

  pub fn signature(&self) -> &Arc<FunSignature> {
    &self.signature
  }
}

macro_rules! impl_FunCall {
  ($($arg:ident : $ty:ident),*) => {
    impl<R, $($ty),*> FunHandle<Expr<R>, ($(Expr<$ty>,)*)>
    where
      R: ToType,
    {
      /// Call the function; the result is the function’s return value.
      pub fn call(&self, $($arg: impl Into<Expr<$ty>>),*) -> Expr<R> {
        Expr::new(ErasedExpr::new_fun_call(
          R::ty(),
          ErasedFunHandle::UserDefined(self.signature.clone()),
          vec![$($arg.into().erased),*],
        ))
      }
    }

    impl<R, $($ty),*> FunHandle<R, ($(Expr<$ty>,)*)> {
      /// Invoke the function as a statement, discarding its return value if any.
      pub fn invoke(&self, scope: &mut Scope, $($arg: impl Into<Expr<$ty>>),*) -> Result<()> {
        scope.invoke(&self.signature, vec![$($arg.into().erased),*])
      }
    }
  };
}

impl_FunCall!();
impl_FunCall!(a0: A0);
impl_FunCall!(a0: A0, a1: A1);
impl_FunCall!(a0: A0, a1: A1, a2: A2);
impl_FunCall!(a0: A0, a1: A1, a2: A2, a3: A3);

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::{MatrixDim, SamplerDim};

  fn f(n: usize) -> Type {
    Type::float(Dim::from_count(n).unwrap())
  }

  #[test]
  fn trigonometry_requires_floats() {
    assert_eq!(ErasedFunHandle::Sin.check(&[f(3)]), Ok(f(3)));
    assert!(ErasedFunHandle::Sin.check(&[Type::int(Dim::D3)]).is_err());
    assert!(ErasedFunHandle::Sin.check(&[f(1), f(1)]).is_err());
    assert_eq!(ErasedFunHandle::ATan2.check(&[f(2), f(2)]), Ok(f(2)));
  }

  #[test]
  fn geometry() {
    assert_eq!(ErasedFunHandle::Dot.check(&[f(3), f(3)]), Ok(f(1)));
    assert!(ErasedFunHandle::Dot.check(&[f(3), f(2)]).is_err());
    assert_eq!(ErasedFunHandle::Cross.check(&[f(3), f(3)]), Ok(f(3)));
    assert!(ErasedFunHandle::Cross.check(&[f(4), f(4)]).is_err());
    assert_eq!(ErasedFunHandle::Length.check(&[f(4)]), Ok(f(1)));
    assert_eq!(ErasedFunHandle::Refract.check(&[f(3), f(3), f(1)]), Ok(f(3)));
  }

  #[test]
  fn common() {
    assert_eq!(ErasedFunHandle::Clamp.check(&[f(3), f(1), f(1)]), Ok(f(3)));
    assert_eq!(
      ErasedFunHandle::Max.check(&[Type::int(Dim::D2), Type::int(Dim::Scalar)]),
      Ok(Type::int(Dim::D2))
    );
    assert!(ErasedFunHandle::Min.check(&[f(2), Type::int(Dim::Scalar)]).is_err());
    assert_eq!(ErasedFunHandle::Mix.check(&[f(4), f(4), f(1)]), Ok(f(4)));
    assert_eq!(ErasedFunHandle::Step.check(&[f(1), f(3)]), Ok(f(3)));
    assert_eq!(ErasedFunHandle::IsNan.check(&[f(2)]), Ok(Type::bool(Dim::D2)));
    assert!(ErasedFunHandle::Abs.check(&[Type::uint(Dim::Scalar)]).is_err());
  }

  #[test]
  fn constructors() {
    assert_eq!(ErasedFunHandle::Vec4.check(&[f(3), f(1)]), Ok(f(4)));
    assert_eq!(ErasedFunHandle::Vec4.check(&[f(1)]), Ok(f(4)));
    assert_eq!(ErasedFunHandle::Vec3.check(&[f(1), f(1), f(1)]), Ok(f(3)));
    assert!(ErasedFunHandle::Vec3.check(&[f(2), f(2)]).is_err());
    assert!(ErasedFunHandle::Vec2.check(&[f(1), Type::int(Dim::Scalar)]).is_err());
    assert!(ErasedFunHandle::Vec2.check(&[]).is_err());
    assert_eq!(
      ErasedFunHandle::Mat3.check(&[f(3), f(3), f(3)]),
      Ok(Type::mat(MatrixDim::D33))
    );
    assert!(ErasedFunHandle::Mat3.check(&[f(3), f(3)]).is_err());
  }

  #[test]
  fn textures() {
    let tex = Type::new(PrimType::Sampler(SamplerDim::D2));
    let cube = Type::new(PrimType::Sampler(SamplerDim::Cube));
    let depth = Type::new(PrimType::DepthSampler(SamplerDim::D2));

    assert_eq!(ErasedFunHandle::Sample.check(&[tex, f(2)]), Ok(f(4)));
    assert!(ErasedFunHandle::Sample.check(&[tex, f(3)]).is_err());
    assert_eq!(ErasedFunHandle::Sample.check(&[cube, f(3)]), Ok(f(4)));
    assert_eq!(ErasedFunHandle::SampleDepth.check(&[depth, f(3)]), Ok(f(1)));
    assert!(ErasedFunHandle::Sample.check(&[depth, f(2)]).is_err());
    assert_eq!(
      ErasedFunHandle::TextureSize.check(&[tex, Type::int(Dim::Scalar)]),
      Ok(Type::int(Dim::D2))
    );
    assert_eq!(
      ErasedFunHandle::TexelFetch.check(&[tex, Type::int(Dim::D2), Type::int(Dim::Scalar)]),
      Ok(f(4))
    );
  }

  #[test]
  fn user_defined() {
    let sig = Arc::new(FunSignature {
      name: "shade".into(),
      params: vec![f(3), f(1)],
      ret: Some(f(4)),
    });
    let handle = ErasedFunHandle::UserDefined(sig.clone());

    assert_eq!(handle.check(&[f(3), f(1)]), Ok(f(4)));
    assert!(handle.check(&[f(3)]).is_err());
    assert!(handle.check(&[f(3), f(2)]).is_err());

    let void = ErasedFunHandle::UserDefined(Arc::new(FunSignature {
      name: "noop".into(),
      params: vec![],
      ret: None,
    }));
    assert!(void.check(&[]).is_err());
    assert!(sig.check_args(&[f(3), f(1)]).is_ok());
  }
}
