//! Typed built-in functions.
//!
//! Every function here builds the same node [`ErasedExpr::builtin`] would, without the run-time check: the trait
//! bounds already guarantee the signature.

use crate::{
  expr::{ErasedExpr, Expr},
  fun::ErasedFunHandle,
  types::{
    DepthSampler2D, DepthSamplerCube, FloatDomain, Sampler2D, Sampler2DArray, Sampler3D, SamplerCube, ToType, M22,
    M33, M44, V2, V3, V4,
  },
};

fn call<R>(handle: ErasedFunHandle, args: Vec<ErasedExpr>) -> Expr<R>
where
  R: ToType,
{
  Expr::new(ErasedExpr::new_fun_call(R::ty(), handle, args))
}

pub trait Trigonometry: Sized {
  fn radians(&self) -> Self;

  fn degrees(&self) -> Self;

  fn sin(&self) -> Self;

  fn cos(&self) -> Self;

  fn tan(&self) -> Self;

  fn asin(&self) -> Self;

  fn acos(&self) -> Self;

  fn atan(&self) -> Self;

  /// Arc tangent of `self / x`.
  fn atan2(&self, x: impl Into<Self>) -> Self;

  fn sinh(&self) -> Self;

  fn cosh(&self) -> Self;

  fn tanh(&self) -> Self;

  fn asinh(&self) -> Self;

  fn acosh(&self) -> Self;

  fn atanh(&self) -> Self;
}

macro_rules! unary_fn {
  ($name:ident, $handle:ident) => {
    fn $name(&self) -> Self {
      call(ErasedFunHandle::$handle, vec![self.erased.clone()])
    }
  };
}

macro_rules! binary_fn {
  ($name:ident, $handle:ident, $rhs:ident) => {
    fn $name(&self, $rhs: impl Into<Self>) -> Self {
      call(ErasedFunHandle::$handle, vec![self.erased.clone(), $rhs.into().erased])
    }
  };
}

impl<T> Trigonometry for Expr<T>
where
  T: FloatDomain,
{
  unary_fn!(radians, Radians);
  unary_fn!(degrees, Degrees);
  unary_fn!(sin, Sin);
  unary_fn!(cos, Cos);
  unary_fn!(tan, Tan);
  unary_fn!(asin, ASin);
  unary_fn!(acos, ACos);
  unary_fn!(atan, ATan);
  binary_fn!(atan2, ATan2, x);
  unary_fn!(sinh, SinH);
  unary_fn!(cosh, CosH);
  unary_fn!(tanh, TanH);
  unary_fn!(asinh, ASinH);
  unary_fn!(acosh, ACosH);
  unary_fn!(atanh, ATanH);
}

pub trait Exponential: Sized {
  fn pow(&self, p: impl Into<Self>) -> Self;

  fn exp(&self) -> Self;

  fn exp2(&self) -> Self;

  fn log(&self) -> Self;

  fn log2(&self) -> Self;

  fn sqrt(&self) -> Self;

  fn isqrt(&self) -> Self;
}

impl<T> Exponential for Expr<T>
where
  T: FloatDomain,
{
  binary_fn!(pow, Pow, p);
  unary_fn!(exp, Exp);
  unary_fn!(exp2, Exp2);
  unary_fn!(log, Log);
  unary_fn!(log2, Log2);
  unary_fn!(sqrt, Sqrt);
  unary_fn!(isqrt, InverseSqrt);
}

pub trait Relative {
  fn abs(&self) -> Self;

  fn sign(&self) -> Self;
}

macro_rules! impl_Relative {
  ($t:ty) => {
    impl Relative for Expr<$t> {
      unary_fn!(abs, Abs);
      unary_fn!(sign, Sign);
    }
  };
}

impl_Relative!(i32);
impl_Relative!(V2<i32>);
impl_Relative!(V3<i32>);
impl_Relative!(V4<i32>);
impl_Relative!(f32);
impl_Relative!(V2<f32>);
impl_Relative!(V3<f32>);
impl_Relative!(V4<f32>);

pub trait Floating {
  fn floor(&self) -> Self;

  fn trunc(&self) -> Self;

  fn round(&self) -> Self;

  fn ceil(&self) -> Self;

  fn fract(&self) -> Self;
}

impl<T> Floating for Expr<T>
where
  T: FloatDomain,
{
  unary_fn!(floor, Floor);
  unary_fn!(trunc, Trunc);
  unary_fn!(round, Round);
  unary_fn!(ceil, Ceil);
  unary_fn!(fract, Fract);
}

pub trait Bounded<RHS>: Sized {
  fn min(&self, rhs: RHS) -> Self;

  fn max(&self, rhs: RHS) -> Self;

  fn clamp(&self, min_value: RHS, max_value: RHS) -> Self;
}

macro_rules! impl_Bounded {
  ($t:ty, $rhs:ty) => {
    impl Bounded<Expr<$rhs>> for Expr<$t> {
      fn min(&self, rhs: Expr<$rhs>) -> Self {
        call(ErasedFunHandle::Min, vec![self.erased.clone(), rhs.erased])
      }

      fn max(&self, rhs: Expr<$rhs>) -> Self {
        call(ErasedFunHandle::Max, vec![self.erased.clone(), rhs.erased])
      }

      fn clamp(&self, min_value: Expr<$rhs>, max_value: Expr<$rhs>) -> Self {
        call(
          ErasedFunHandle::Clamp,
          vec![self.erased.clone(), min_value.erased, max_value.erased],
        )
      }
    }
  };

  ($t:ty) => {
    impl_Bounded!($t, $t);
    impl_Bounded!(V2<$t>, V2<$t>);
    impl_Bounded!(V2<$t>, $t);
    impl_Bounded!(V3<$t>, V3<$t>);
    impl_Bounded!(V3<$t>, $t);
    impl_Bounded!(V4<$t>, V4<$t>);
    impl_Bounded!(V4<$t>, $t);
  };
}

impl_Bounded!(i32);
impl_Bounded!(u32);
impl_Bounded!(f32);

pub trait Mix<RHS>: Sized {
  /// Linear interpolation between `self` and `y` with factor `a`.
  fn mix(&self, y: impl Into<Self>, a: RHS) -> Self;

  /// Generate a step function by comparing `self` to `edge`.
  fn step(&self, edge: RHS) -> Self;

  /// Hermite interpolation of `self` between `edge_a` and `edge_b`.
  fn smooth_step(&self, edge_a: RHS, edge_b: RHS) -> Self;
}

macro_rules! impl_Mix {
  ($t:ty, $q:ty) => {
    impl Mix<Expr<$q>> for Expr<$t> {
      fn mix(&self, y: impl Into<Self>, a: Expr<$q>) -> Self {
        call(ErasedFunHandle::Mix, vec![self.erased.clone(), y.into().erased, a.erased])
      }

      fn step(&self, edge: Expr<$q>) -> Self {
        call(ErasedFunHandle::Step, vec![edge.erased, self.erased.clone()])
      }

      fn smooth_step(&self, edge_a: Expr<$q>, edge_b: Expr<$q>) -> Self {
        call(
          ErasedFunHandle::SmoothStep,
          vec![edge_a.erased, edge_b.erased, self.erased.clone()],
        )
      }
    }
  };
}

impl_Mix!(f32, f32);
impl_Mix!(V2<f32>, V2<f32>);
impl_Mix!(V2<f32>, f32);
impl_Mix!(V3<f32>, V3<f32>);
impl_Mix!(V3<f32>, f32);
impl_Mix!(V4<f32>, V4<f32>);
impl_Mix!(V4<f32>, f32);

pub trait FloatingExt {
  type BoolExpr;

  fn fma(&self, b: &Self, c: &Self) -> Self;

  fn is_nan(&self) -> Self::BoolExpr;

  fn is_inf(&self) -> Self::BoolExpr;
}

macro_rules! impl_FloatingExt {
  ($t:ty, $bool_expr:ty) => {
    impl FloatingExt for Expr<$t> {
      type BoolExpr = Expr<$bool_expr>;

      fn fma(&self, b: &Self, c: &Self) -> Self {
        call(
          ErasedFunHandle::Fma,
          vec![self.erased.clone(), b.erased.clone(), c.erased.clone()],
        )
      }

      fn is_nan(&self) -> Self::BoolExpr {
        call(ErasedFunHandle::IsNan, vec![self.erased.clone()])
      }

      fn is_inf(&self) -> Self::BoolExpr {
        call(ErasedFunHandle::IsInf, vec![self.erased.clone()])
      }
    }
  };
}

impl_FloatingExt!(f32, bool);
impl_FloatingExt!(V2<f32>, V2<bool>);
impl_FloatingExt!(V3<f32>, V3<bool>);
impl_FloatingExt!(V4<f32>, V4<bool>);

pub trait Geometry: Sized {
  type LengthExpr;

  fn length(&self) -> Self::LengthExpr;

  fn distance(&self, other: impl Into<Self>) -> Self::LengthExpr;

  fn dot(&self, other: impl Into<Self>) -> Self::LengthExpr;

  fn normalize(&self) -> Self;

  fn face_forward(&self, normal: impl Into<Self>, reference: impl Into<Self>) -> Self;

  fn reflect(&self, normal: impl Into<Self>) -> Self;

  fn refract(&self, normal: impl Into<Self>, eta: impl Into<Expr<f32>>) -> Self;
}

impl<T> Geometry for Expr<T>
where
  T: FloatDomain,
{
  type LengthExpr = Expr<f32>;

  fn length(&self) -> Self::LengthExpr {
    call(ErasedFunHandle::Length, vec![self.erased.clone()])
  }

  fn distance(&self, other: impl Into<Self>) -> Self::LengthExpr {
    call(ErasedFunHandle::Distance, vec![self.erased.clone(), other.into().erased])
  }

  fn dot(&self, other: impl Into<Self>) -> Self::LengthExpr {
    call(ErasedFunHandle::Dot, vec![self.erased.clone(), other.into().erased])
  }

  unary_fn!(normalize, Normalize);

  fn face_forward(&self, normal: impl Into<Self>, reference: impl Into<Self>) -> Self {
    call(
      ErasedFunHandle::FaceForward,
      vec![self.erased.clone(), normal.into().erased, reference.into().erased],
    )
  }

  binary_fn!(reflect, Reflect, normal);

  fn refract(&self, normal: impl Into<Self>, eta: impl Into<Expr<f32>>) -> Self {
    call(
      ErasedFunHandle::Refract,
      vec![self.erased.clone(), normal.into().erased, eta.into().erased],
    )
  }
}

impl Expr<V3<f32>> {
  pub fn cross(&self, other: impl Into<Self>) -> Self {
    call(ErasedFunHandle::Cross, vec![self.erased.clone(), other.into().erased])
  }
}

pub trait MatrixFunctions {
  fn determinant(&self) -> Expr<f32>;

  fn transpose(&self) -> Self;

  fn inverse(&self) -> Self;
}

macro_rules! impl_MatrixFunctions {
  ($m:ty) => {
    impl MatrixFunctions for Expr<$m> {
      fn determinant(&self) -> Expr<f32> {
        call(ErasedFunHandle::Determinant, vec![self.erased.clone()])
      }

      unary_fn!(transpose, Transpose);
      unary_fn!(inverse, Inverse);
    }
  };
}

impl_MatrixFunctions!(M22);
impl_MatrixFunctions!(M33);
impl_MatrixFunctions!(M44);

macro_rules! impl_vector_relational {
  ($t:ty) => {
    impl Expr<$t> {
      pub fn any(&self) -> Expr<bool> {
        call(ErasedFunHandle::Any, vec![self.erased.clone()])
      }

      pub fn all(&self) -> Expr<bool> {
        call(ErasedFunHandle::All, vec![self.erased.clone()])
      }
    }
  };
}

impl_vector_relational!(V2<bool>);
impl_vector_relational!(V3<bool>);
impl_vector_relational!(V4<bool>);

macro_rules! impl_conversions {
  ($($src:ty),* => $f:ty, $i:ty, $u:ty) => {
    $(
      impl Expr<$src> {
        pub fn to_float(&self) -> Expr<$f> {
          call(ErasedFunHandle::ToFloat, vec![self.erased.clone()])
        }

        pub fn to_int(&self) -> Expr<$i> {
          call(ErasedFunHandle::ToInt, vec![self.erased.clone()])
        }

        pub fn to_uint(&self) -> Expr<$u> {
          call(ErasedFunHandle::ToUInt, vec![self.erased.clone()])
        }
      }
    )*
  };
}

impl_conversions!(f32, i32, u32, bool => f32, i32, u32);
impl_conversions!(V2<f32>, V2<i32>, V2<u32>, V2<bool> => V2<f32>, V2<i32>, V2<u32>);
impl_conversions!(V3<f32>, V3<i32>, V3<u32>, V3<bool> => V3<f32>, V3<i32>, V3<u32>);
impl_conversions!(V4<f32>, V4<i32>, V4<u32>, V4<bool> => V4<f32>, V4<i32>, V4<u32>);

macro_rules! impl_mat_ctor {
  ($m:ty, $v:ty, $handle:ident, $name:ident, $($col:ident),*) => {
    impl Expr<$m> {
      /// Build a matrix from its column vectors.
      pub fn $name($($col: impl Into<Expr<$v>>),*) -> Self {
        call(ErasedFunHandle::$handle, vec![$($col.into().erased),*])
      }
    }
  };
}

impl_mat_ctor!(M22, V2<f32>, Mat2, from_cols, c0, c1);
impl_mat_ctor!(M33, V3<f32>, Mat3, from_cols, c0, c1, c2);
impl_mat_ctor!(M44, V4<f32>, Mat4, from_cols, c0, c1, c2, c3);

/// Color texture sampling.
pub trait Texture {
  /// Floating sampling coordinates.
  type Coord;

  /// Integral texel coordinates, also the texture size type.
  type Texel;

  fn sample(&self, coord: impl Into<Expr<Self::Coord>>) -> Expr<V4<f32>>;

  fn sample_lod(&self, coord: impl Into<Expr<Self::Coord>>, lod: impl Into<Expr<f32>>) -> Expr<V4<f32>>;

  fn texel_fetch(&self, texel: impl Into<Expr<Self::Texel>>, lod: impl Into<Expr<i32>>) -> Expr<V4<f32>>;

  fn size(&self, lod: impl Into<Expr<i32>>) -> Expr<Self::Texel>;
}

macro_rules! impl_Texture {
  ($s:ty, $coord:ty, $texel:ty) => {
    impl Texture for Expr<$s> {
      type Coord = $coord;
      type Texel = $texel;

      fn sample(&self, coord: impl Into<Expr<$coord>>) -> Expr<V4<f32>> {
        call(ErasedFunHandle::Sample, vec![self.erased.clone(), coord.into().erased])
      }

      fn sample_lod(&self, coord: impl Into<Expr<$coord>>, lod: impl Into<Expr<f32>>) -> Expr<V4<f32>> {
        call(
          ErasedFunHandle::SampleLod,
          vec![self.erased.clone(), coord.into().erased, lod.into().erased],
        )
      }

      fn texel_fetch(&self, texel: impl Into<Expr<$texel>>, lod: impl Into<Expr<i32>>) -> Expr<V4<f32>> {
        call(
          ErasedFunHandle::TexelFetch,
          vec![self.erased.clone(), texel.into().erased, lod.into().erased],
        )
      }

      fn size(&self, lod: impl Into<Expr<i32>>) -> Expr<$texel> {
        call(ErasedFunHandle::TextureSize, vec![self.erased.clone(), lod.into().erased])
      }
    }
  };
}

impl_Texture!(Sampler2D, V2<f32>, V2<i32>);
impl_Texture!(Sampler3D, V3<f32>, V3<i32>);
impl_Texture!(SamplerCube, V3<f32>, V2<i32>);
impl_Texture!(Sampler2DArray, V3<f32>, V3<i32>);

/// Depth texture sampling with a compare reference.
pub trait DepthTexture {
  /// Sampling coordinates with the depth reference as last component.
  type CoordRef;

  fn sample_depth(&self, coord_ref: impl Into<Expr<Self::CoordRef>>) -> Expr<f32>;
}

macro_rules! impl_DepthTexture {
  ($s:ty, $coord_ref:ty) => {
    impl DepthTexture for Expr<$s> {
      type CoordRef = $coord_ref;

      fn sample_depth(&self, coord_ref: impl Into<Expr<$coord_ref>>) -> Expr<f32> {
        call(ErasedFunHandle::SampleDepth, vec![self.erased.clone(), coord_ref.into().erased])
      }
    }
  };
}

impl_DepthTexture!(DepthSampler2D, V3<f32>);
impl_DepthTexture!(DepthSamplerCube, V4<f32>);

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    expr::ExprNode,
    lit,
    types::{Dim, MatrixDim, Type},
    vec3,
  };

  // every typed call must pass the run-time signature check with the same result type
  fn revalidate<T>(e: &Expr<T>) {
    let ExprNode::FunCall(handle, args) = e.erased.node() else {
      panic!("function call expected");
    };
    let arg_types: Vec<_> = args.iter().map(ErasedExpr::ty).collect();
    assert_eq!(handle.check(&arg_types), Ok(e.ty()));
  }

  #[test]
  fn trigonometry() {
    let x = lit!(1., 2., 3.);

    revalidate(&x.sin());
    revalidate(&x.atan2(lit!(1., 1., 1.)));
    revalidate(&x.pow(x.clone()));
    revalidate(&x.isqrt());
  }

  #[test]
  fn common() {
    let x = lit!(1., 2.);

    revalidate(&x.clamp(lit!(0.), lit!(1.)));
    revalidate(&x.mix(lit!(3., 4.), lit!(0.5)));
    revalidate(&x.step(lit!(0.5)));
    revalidate(&x.smooth_step(lit!(0.), lit!(1.)));
    revalidate(&x.is_nan());
    revalidate(&lit!(-1i32).abs());
    revalidate(&x.fma(&x, &x));
  }

  #[test]
  fn geometry() {
    let n = vec3!(lit!(0.), lit!(1.), lit!(0.));
    let d = n.dot(lit!(1., 0., 0.));

    assert_eq!(d.ty(), Type::float(Dim::Scalar));
    revalidate(&d);
    revalidate(&n.cross(lit!(1., 0., 0.)));
    revalidate(&n.normalize());
    revalidate(&n.refract(n.clone(), 1.5));
  }

  #[test]
  fn matrices() {
    let m = Expr::<M33>::from_cols(lit!(1., 0., 0.), lit!(0., 1., 0.), lit!(0., 0., 1.));

    assert_eq!(m.ty(), Type::mat(MatrixDim::D33));
    revalidate(&m);
    revalidate(&m.inverse());
    revalidate(&m.determinant());
  }

  #[test]
  fn conversions() {
    let i = lit!(3i32);

    revalidate(&i.to_float());
    revalidate(&lit!(1., 2.).to_int());
  }
}
