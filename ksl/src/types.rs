//! Value types.
//!
//! Every expression, variable and block port carries a [`Type`]: a [`PrimType`] (base kind and arity, or an opaque
//! sampler) plus an optional array length. Host types implementing [`ToType`] map statically to a [`Type`], which is
//! how the typed API ([`Expr<T>`](crate::expr::Expr)) lets `rustc` reject invalid combinations before anything is
//! built. The erased API re-checks the same rules at runtime with [`TypeClass`] constraints.

use crate::{
  expr::{ErasedExpr, Expr},
  fun::ErasedFunHandle,
};
use std::fmt;

macro_rules! make_vn {
  ($t:ident, $dim:expr) => {
    /// Scalar vectors.
    ///
    /// Scalar vectors come into three flavors, based on the dimension used:
    ///
    /// - Two dimensions (2D): [`V2<T>`].
    /// - Three dimensions (3D): [`V3<T>`].
    /// - Four dimensions (4D): [`V4<T>`].
    ///
    /// Each type implements the [`From`] trait for sized array. For instance, if you want to make a `V3<f32>` from
    /// constants / literals, you can simply use the implementor `From<[f32; 3]> for V3<f32>`.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct $t<T>(pub [T; $dim]);

    impl<T> From<[T; $dim]> for $t<T> {
      fn from(a: [T; $dim]) -> Self {
        Self(a)
      }
    }
  };
}

make_vn!(V2, 2);
make_vn!(V3, 3);
make_vn!(V4, 4);

/// Matrix wrapper.
///
/// This type represents a matrix of a given dimension, deduced from the wrapped type.
///
/// > Note: matrices are expressed in column-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix<T>(pub T);

impl<T, const N: usize> From<[[T; N]; N]> for Matrix<[[T; N]; N]> {
  fn from(a: [[T; N]; N]) -> Self {
    Matrix(a)
  }
}

macro_rules! make_mat_ty {
  ($t:ident, $n:expr, $mdim:ident) => {
    pub type $t = Matrix<[[f32; $n]; $n]>;

    impl ToPrimType for Matrix<[[f32; $n]; $n]> {
      const PRIM_TYPE: PrimType = PrimType::Matrix(MatrixDim::$mdim);
    }
  };
}

make_mat_ty!(M22, 2, D22);
make_mat_ty!(M33, 3, D33);
make_mat_ty!(M44, 4, D44);

impl M44 {
  /// The 4×4 identity matrix.
  pub const IDENTITY: M44 = Matrix([
    [1., 0., 0., 0.],
    [0., 1., 0., 0.],
    [0., 0., 1., 0.],
    [0., 0., 0., 1.],
  ]);

  /// Flatten the columns, in column-major order.
  pub fn to_cols_array(&self) -> [f32; 16] {
    let mut out = [0.; 16];
    for (c, col) in self.0.iter().enumerate() {
      out[c * 4..c * 4 + 4].copy_from_slice(col);
    }
    out
  }
}

/// Dimension of a primitive type.
///
/// Primitive types currently can have one of four dimension:
///
/// - [`Dim::Scalar`]: designates a scalar value.
/// - [`Dim::D2`]: designates a 2D vector.
/// - [`Dim::D3`]: designates a 3D vector.
/// - [`Dim::D4`]: designates a 4D vector.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Dim {
  /// Scalar value.
  Scalar,

  /// 2D vector.
  D2,

  /// 3D vector.
  D3,

  /// 4D vector.
  D4,
}

impl Dim {
  /// Number of components.
  pub const fn count(self) -> usize {
    match self {
      Dim::Scalar => 1,
      Dim::D2 => 2,
      Dim::D3 => 3,
      Dim::D4 => 4,
    }
  }

  pub const fn from_count(count: usize) -> Option<Self> {
    match count {
      1 => Some(Dim::Scalar),
      2 => Some(Dim::D2),
      3 => Some(Dim::D3),
      4 => Some(Dim::D4),
      _ => None,
    }
  }
}

/// Square matrix dimension.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MatrixDim {
  /// Squared 2 dimension.
  D22,
  /// Squared 3 dimension.
  D33,
  /// Squared 4 dimension.
  D44,
}

impl MatrixDim {
  /// Number of columns (and rows).
  pub const fn size(self) -> usize {
    match self {
      MatrixDim::D22 => 2,
      MatrixDim::D33 => 3,
      MatrixDim::D44 => 4,
    }
  }

  /// Dimension of a column vector.
  pub const fn column(self) -> Dim {
    match self {
      MatrixDim::D22 => Dim::D2,
      MatrixDim::D33 => Dim::D3,
      MatrixDim::D44 => Dim::D4,
    }
  }

  pub const fn from_size(size: usize) -> Option<Self> {
    match size {
      2 => Some(MatrixDim::D22),
      3 => Some(MatrixDim::D33),
      4 => Some(MatrixDim::D44),
      _ => None,
    }
  }
}

/// Dimensionality of a sampler.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SamplerDim {
  D2,
  D3,
  Cube,
  D2Array,
}

impl SamplerDim {
  /// Dimension of the floating coordinates used to sample.
  pub const fn coord(self) -> Dim {
    match self {
      SamplerDim::D2 => Dim::D2,
      SamplerDim::D3 | SamplerDim::Cube | SamplerDim::D2Array => Dim::D3,
    }
  }

  /// Dimension of the integral texel coordinates and of the size query.
  pub const fn texel(self) -> Dim {
    match self {
      SamplerDim::D2 | SamplerDim::Cube => Dim::D2,
      SamplerDim::D3 | SamplerDim::D2Array => Dim::D3,
    }
  }
}

/// Base kind of scalar, vector and matrix types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScalarKind {
  Float,
  Int,
  UInt,
  Bool,
}

/// Primitive supported types.
///
/// Types without array dimensions are known as _primitive types_ and are exhaustively constructed thanks to
/// [`PrimType`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PrimType {
  /// An integral type.
  ///
  /// The [`Dim`] argument represents the vector dimension; do not confuse it with an array dimension.
  Int(Dim),

  /// An unsigned integral type.
  UInt(Dim),

  /// A floating type.
  Float(Dim),

  /// A boolean type.
  Bool(Dim),

  /// A N×N floating matrix.
  Matrix(MatrixDim),

  /// An opaque color texture sampler.
  Sampler(SamplerDim),

  /// An opaque depth texture sampler, sampled with a compare reference.
  DepthSampler(SamplerDim),
}

impl PrimType {
  pub const fn new(kind: ScalarKind, dim: Dim) -> Self {
    match kind {
      ScalarKind::Float => PrimType::Float(dim),
      ScalarKind::Int => PrimType::Int(dim),
      ScalarKind::UInt => PrimType::UInt(dim),
      ScalarKind::Bool => PrimType::Bool(dim),
    }
  }

  /// Base scalar kind; matrices are float, samplers have none.
  pub const fn scalar_kind(self) -> Option<ScalarKind> {
    match self {
      PrimType::Float(_) | PrimType::Matrix(_) => Some(ScalarKind::Float),
      PrimType::Int(_) => Some(ScalarKind::Int),
      PrimType::UInt(_) => Some(ScalarKind::UInt),
      PrimType::Bool(_) => Some(ScalarKind::Bool),
      PrimType::Sampler(_) | PrimType::DepthSampler(_) => None,
    }
  }

  /// Vector dimension of scalars and vectors.
  pub const fn dim(self) -> Option<Dim> {
    match self {
      PrimType::Float(d) | PrimType::Int(d) | PrimType::UInt(d) | PrimType::Bool(d) => Some(d),
      _ => None,
    }
  }
}

/// Type representation: akin to [`PrimType`] glued with an array length, if any.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Type {
  /// Primitive type, representing a type without array dimensions.
  pub prim_ty: PrimType,

  /// Array length, if any.
  pub array_len: Option<usize>,
}

impl Type {
  pub const fn new(prim_ty: PrimType) -> Self {
    Type {
      prim_ty,
      array_len: None,
    }
  }

  pub const fn array(prim_ty: PrimType, len: usize) -> Self {
    Type {
      prim_ty,
      array_len: Some(len),
    }
  }

  pub const fn float(dim: Dim) -> Self {
    Type::new(PrimType::Float(dim))
  }

  pub const fn int(dim: Dim) -> Self {
    Type::new(PrimType::Int(dim))
  }

  pub const fn uint(dim: Dim) -> Self {
    Type::new(PrimType::UInt(dim))
  }

  pub const fn bool(dim: Dim) -> Self {
    Type::new(PrimType::Bool(dim))
  }

  pub const fn mat(dim: MatrixDim) -> Self {
    Type::new(PrimType::Matrix(dim))
  }

  pub const fn is_array(&self) -> bool {
    self.array_len.is_some()
  }

  /// Type of an array element; the type itself if not an array.
  pub const fn element(&self) -> Type {
    Type::new(self.prim_ty)
  }

  /// Scalar kind of a non-array, non-sampler type.
  pub fn scalar_kind(&self) -> Option<ScalarKind> {
    if self.is_array() {
      None
    } else {
      self.prim_ty.scalar_kind()
    }
  }

  /// Vector dimension of a non-array scalar or vector.
  pub fn dim(&self) -> Option<Dim> {
    if self.is_array() {
      None
    } else {
      self.prim_ty.dim()
    }
  }

  pub fn is_scalar(&self) -> bool {
    self.dim() == Some(Dim::Scalar)
  }

  pub fn is_matrix(&self) -> bool {
    !self.is_array() && matches!(self.prim_ty, PrimType::Matrix(_))
  }

  /// Prefix used to derive fresh variable names of this type from the name pool.
  pub fn name_prefix(&self) -> String {
    let base = match self.prim_ty {
      PrimType::Float(d) => format!("f{}", d.count()),
      PrimType::Int(d) => format!("i{}", d.count()),
      PrimType::UInt(d) => format!("u{}", d.count()),
      PrimType::Bool(d) => format!("b{}", d.count()),
      PrimType::Matrix(m) => format!("m{}", m.size()),
      PrimType::Sampler(_) => "sampler".to_owned(),
      PrimType::DepthSampler(_) => "depthSampler".to_owned(),
    };

    if self.is_array() {
      base + "Array"
    } else {
      base
    }
  }
}

impl fmt::Display for PrimType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      PrimType::Float(d) => write!(f, "float{}", d.count()),
      PrimType::Int(d) => write!(f, "int{}", d.count()),
      PrimType::UInt(d) => write!(f, "uint{}", d.count()),
      PrimType::Bool(d) => write!(f, "bool{}", d.count()),
      PrimType::Matrix(m) => write!(f, "mat{}", m.size()),
      PrimType::Sampler(s) => write!(f, "sampler{}", sampler_suffix(s)),
      PrimType::DepthSampler(s) => write!(f, "depthSampler{}", sampler_suffix(s)),
    }
  }
}

fn sampler_suffix(dim: SamplerDim) -> &'static str {
  match dim {
    SamplerDim::D2 => "2d",
    SamplerDim::D3 => "3d",
    SamplerDim::Cube => "Cube",
    SamplerDim::D2Array => "2dArray",
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.array_len {
      Some(len) => write!(f, "{}[{}]", self.prim_ty, len),
      None => write!(f, "{}", self.prim_ty),
    }
  }
}

/// Type-class constraint accepted by an operation operand.
///
/// This is the runtime counterpart of the trait bounds of the typed API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeClass {
  /// Float scalar or vector.
  Float,
  /// Float vector (2 to 4 components).
  FloatVector,
  /// Float scalar.
  FloatScalar,
  /// Float, int or uint scalar or vector.
  Numeric,
  /// Float, int or uint scalar or vector, or float matrix.
  Arithmetic,
  /// Float, int or uint scalar.
  NumericScalar,
  /// Float or int scalar or vector.
  Signed,
  /// Int or uint scalar.
  Index,
  /// Bool scalar.
  Bool,
  /// Bool vector.
  BoolVector,
  /// Square float matrix.
  Matrix,
  /// Scalar or vector of any kind.
  Vector,
  /// Color sampler.
  Sampler,
  /// Depth sampler.
  DepthSampler,
  /// Any array.
  Array,
  /// Exactly the given type.
  Exactly(Type),
}

impl TypeClass {
  pub fn accepts(&self, ty: &Type) -> bool {
    let kind = ty.scalar_kind();
    let dim = ty.dim();

    match *self {
      TypeClass::Float => kind == Some(ScalarKind::Float) && dim.is_some(),
      TypeClass::FloatVector => kind == Some(ScalarKind::Float) && matches!(dim, Some(d) if d != Dim::Scalar),
      TypeClass::FloatScalar => *ty == Type::float(Dim::Scalar),
      TypeClass::Numeric => dim.is_some() && matches!(kind, Some(k) if k != ScalarKind::Bool),
      TypeClass::Arithmetic => TypeClass::Numeric.accepts(ty) || ty.is_matrix(),
      TypeClass::NumericScalar => dim == Some(Dim::Scalar) && matches!(kind, Some(k) if k != ScalarKind::Bool),
      TypeClass::Signed => dim.is_some() && matches!(kind, Some(ScalarKind::Float | ScalarKind::Int)),
      TypeClass::Index => *ty == Type::int(Dim::Scalar) || *ty == Type::uint(Dim::Scalar),
      TypeClass::Bool => *ty == Type::bool(Dim::Scalar),
      TypeClass::BoolVector => kind == Some(ScalarKind::Bool) && matches!(dim, Some(d) if d != Dim::Scalar),
      TypeClass::Matrix => ty.is_matrix(),
      TypeClass::Vector => dim.is_some(),
      TypeClass::Sampler => !ty.is_array() && matches!(ty.prim_ty, PrimType::Sampler(_)),
      TypeClass::DepthSampler => !ty.is_array() && matches!(ty.prim_ty, PrimType::DepthSampler(_)),
      TypeClass::Array => ty.is_array(),
      TypeClass::Exactly(expected) => *ty == expected,
    }
  }
}

impl fmt::Display for TypeClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypeClass::Float => f.write_str("float scalar or vector"),
      TypeClass::FloatVector => f.write_str("float vector"),
      TypeClass::FloatScalar => f.write_str("float1"),
      TypeClass::Numeric => f.write_str("numeric scalar or vector"),
      TypeClass::Arithmetic => f.write_str("numeric scalar, vector or matrix"),
      TypeClass::NumericScalar => f.write_str("numeric scalar"),
      TypeClass::Signed => f.write_str("float or int scalar or vector"),
      TypeClass::Index => f.write_str("int1 or uint1"),
      TypeClass::Bool => f.write_str("bool1"),
      TypeClass::BoolVector => f.write_str("bool vector"),
      TypeClass::Matrix => f.write_str("square matrix"),
      TypeClass::Vector => f.write_str("scalar or vector"),
      TypeClass::Sampler => f.write_str("color sampler"),
      TypeClass::DepthSampler => f.write_str("depth sampler"),
      TypeClass::Array => f.write_str("array"),
      TypeClass::Exactly(ty) => write!(f, "{}", ty),
    }
  }
}

/// Class of types that are recognized by the EDSL.
///
/// Any type implementing this type family is _representable_ in the EDSL.
pub trait ToPrimType {
  /// Mapped primitive type.
  const PRIM_TYPE: PrimType;
}

macro_rules! impl_ToPrimType {
  ($t:ty, $q:ident, $d:ident) => {
    impl ToPrimType for $t {
      const PRIM_TYPE: PrimType = PrimType::$q(Dim::$d);
    }
  };
}

impl_ToPrimType!(i32, Int, Scalar);
impl_ToPrimType!(u32, UInt, Scalar);
impl_ToPrimType!(f32, Float, Scalar);
impl_ToPrimType!(bool, Bool, Scalar);
impl_ToPrimType!(V2<i32>, Int, D2);
impl_ToPrimType!(V2<u32>, UInt, D2);
impl_ToPrimType!(V2<f32>, Float, D2);
impl_ToPrimType!(V2<bool>, Bool, D2);
impl_ToPrimType!(V3<i32>, Int, D3);
impl_ToPrimType!(V3<u32>, UInt, D3);
impl_ToPrimType!(V3<f32>, Float, D3);
impl_ToPrimType!(V3<bool>, Bool, D3);
impl_ToPrimType!(V4<i32>, Int, D4);
impl_ToPrimType!(V4<u32>, UInt, D4);
impl_ToPrimType!(V4<f32>, Float, D4);
impl_ToPrimType!(V4<bool>, Bool, D4);

macro_rules! make_sampler {
  ($t:ident, $q:ident, $d:ident, $doc:expr) => {
    #[doc = $doc]
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct $t;

    impl ToPrimType for $t {
      const PRIM_TYPE: PrimType = PrimType::$q(SamplerDim::$d);
    }
  };
}

make_sampler!(Sampler2D, Sampler, D2, "2D color texture.");
make_sampler!(Sampler3D, Sampler, D3, "3D color texture.");
make_sampler!(SamplerCube, Sampler, Cube, "Cube map color texture.");
make_sampler!(Sampler2DArray, Sampler, D2Array, "Layered 2D color texture.");
make_sampler!(DepthSampler2D, DepthSampler, D2, "2D depth texture.");
make_sampler!(DepthSamplerCube, DepthSampler, Cube, "Cube map depth texture.");

/// Represent a type (primitive type and array length) in the EDSL.
///
/// Any type implementing [`ToType`] is representable in the EDSL. Any type implementing [`ToPrimType`] automatically
/// also implements [`ToType`].
pub trait ToType {
  fn ty() -> Type;
}

impl<T> ToType for T
where
  T: ToPrimType,
{
  fn ty() -> Type {
    Type::new(T::PRIM_TYPE)
  }
}

impl<T, const N: usize> ToType for [T; N]
where
  T: ToPrimType,
{
  fn ty() -> Type {
    Type::array(T::PRIM_TYPE, N)
  }
}

/// Float scalars and vectors.
pub trait FloatDomain: ToPrimType {}

impl FloatDomain for f32 {}
impl FloatDomain for V2<f32> {}
impl FloatDomain for V3<f32> {}
impl FloatDomain for V4<f32> {}

/// Numeric (non-boolean) scalars.
pub trait NumericScalar: ToPrimType {}

impl NumericScalar for i32 {}
impl NumericScalar for u32 {}
impl NumericScalar for f32 {}

/// Trait allowing to create 2D scalar vector ([`V2`]) constructors.
///
/// 2D scalar vectors can be created from either two sole scalars or a single scalar, splatted.
///
/// The `A` type variable represents the arguments type. In the case of several arguments, tuples are used.
///
/// You are advised to use the [`vec2!`](crate::vec2) macro instead as the interface of this function is not really
/// user-friendly.
pub trait Vec2<A> {
  /// Make a [`V2`] from `A`.
  fn vec2(args: A) -> Self;
}

/// Trait allowing to create 3D scalar vector ([`V3`]) constructors.
pub trait Vec3<A> {
  /// Make a [`V3`] from `A`.
  fn vec3(args: A) -> Self;
}

/// Trait allowing to create 4D scalar vector ([`V4`]) constructors.
pub trait Vec4<A> {
  /// Make a [`V4`] from `A`.
  fn vec4(args: A) -> Self;
}

fn ctor<R>(handle: ErasedFunHandle, args: Vec<ErasedExpr>) -> Expr<R>
where
  R: ToType,
{
  Expr::new(ErasedExpr::new_fun_call(R::ty(), handle, args))
}

macro_rules! impl_vec_ctors {
  ($t:ty) => {
    impl Vec2<Expr<$t>> for Expr<V2<$t>> {
      fn vec2(x: Expr<$t>) -> Self {
        ctor(ErasedFunHandle::Vec2, vec![x.erased])
      }
    }

    impl Vec2<(Expr<$t>, Expr<$t>)> for Expr<V2<$t>> {
      fn vec2((x, y): (Expr<$t>, Expr<$t>)) -> Self {
        ctor(ErasedFunHandle::Vec2, vec![x.erased, y.erased])
      }
    }

    impl Vec3<Expr<$t>> for Expr<V3<$t>> {
      fn vec3(x: Expr<$t>) -> Self {
        ctor(ErasedFunHandle::Vec3, vec![x.erased])
      }
    }

    impl Vec3<(Expr<V2<$t>>, Expr<$t>)> for Expr<V3<$t>> {
      fn vec3((xy, z): (Expr<V2<$t>>, Expr<$t>)) -> Self {
        ctor(ErasedFunHandle::Vec3, vec![xy.erased, z.erased])
      }
    }

    impl Vec3<(Expr<$t>, Expr<$t>, Expr<$t>)> for Expr<V3<$t>> {
      fn vec3((x, y, z): (Expr<$t>, Expr<$t>, Expr<$t>)) -> Self {
        ctor(ErasedFunHandle::Vec3, vec![x.erased, y.erased, z.erased])
      }
    }

    impl Vec4<Expr<$t>> for Expr<V4<$t>> {
      fn vec4(x: Expr<$t>) -> Self {
        ctor(ErasedFunHandle::Vec4, vec![x.erased])
      }
    }

    impl Vec4<(Expr<V3<$t>>, Expr<$t>)> for Expr<V4<$t>> {
      fn vec4((xyz, w): (Expr<V3<$t>>, Expr<$t>)) -> Self {
        ctor(ErasedFunHandle::Vec4, vec![xyz.erased, w.erased])
      }
    }

    impl Vec4<(Expr<V2<$t>>, Expr<V2<$t>>)> for Expr<V4<$t>> {
      fn vec4((xy, zw): (Expr<V2<$t>>, Expr<V2<$t>>)) -> Self {
        ctor(ErasedFunHandle::Vec4, vec![xy.erased, zw.erased])
      }
    }

    impl Vec4<(Expr<V2<$t>>, Expr<$t>, Expr<$t>)> for Expr<V4<$t>> {
      fn vec4((xy, z, w): (Expr<V2<$t>>, Expr<$t>, Expr<$t>)) -> Self {
        ctor(ErasedFunHandle::Vec4, vec![xy.erased, z.erased, w.erased])
      }
    }

    impl Vec4<(Expr<$t>, Expr<$t>, Expr<$t>, Expr<$t>)> for Expr<V4<$t>> {
      fn vec4((x, y, z, w): (Expr<$t>, Expr<$t>, Expr<$t>, Expr<$t>)) -> Self {
        ctor(
          ErasedFunHandle::Vec4,
          vec![x.erased, y.erased, z.erased, w.erased],
        )
      }
    }
  };
}

impl_vec_ctors!(f32);
impl_vec_ctors!(i32);
impl_vec_ctors!(u32);
impl_vec_ctors!(bool);
