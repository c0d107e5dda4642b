//! Swizzling.

use crate::{
  error::{KslError, Result},
  expr::{ErasedExpr, Expr, ExprNode},
  types::{Dim, PrimType, ToType, Type, V2, V3, V4},
};
use std::fmt;

/// Select a channel to extract from into a swizzled expession.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwizzleSelector {
  /// Select the `.x` (or `.r`) channel.
  X,

  /// Select the `.y` (or `.g`) channel.
  Y,

  /// Select the `.z` (or `.b`) channel.
  Z,

  /// Select the `.w` (or `.a`) channel.
  W,
}

impl SwizzleSelector {
  pub fn index(self) -> usize {
    match self {
      SwizzleSelector::X => 0,
      SwizzleSelector::Y => 1,
      SwizzleSelector::Z => 2,
      SwizzleSelector::W => 3,
    }
  }

  fn parse(c: char) -> Option<Self> {
    match c {
      'x' | 'r' => Some(SwizzleSelector::X),
      'y' | 'g' => Some(SwizzleSelector::Y),
      'z' | 'b' => Some(SwizzleSelector::Z),
      'w' | 'a' => Some(SwizzleSelector::W),
      _ => None,
    }
  }

  fn as_char(self) -> char {
    match self {
      SwizzleSelector::X => 'x',
      SwizzleSelector::Y => 'y',
      SwizzleSelector::Z => 'z',
      SwizzleSelector::W => 'w',
    }
  }
}

/// Swizzle channel selector.
///
/// This type gives the dimension of the target expression (output) and dimension of the source expression (input). The
/// [`SwizzleSelector`] also allows to select a specific channel in the input expression.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Swizzle {
  /// Create a one-channel expression.
  D1(SwizzleSelector),

  /// Create a two-channel expression.
  D2(SwizzleSelector, SwizzleSelector),

  /// Create a three-channel expression.
  D3(SwizzleSelector, SwizzleSelector, SwizzleSelector),

  /// Create a four-channel expression.
  D4(
    SwizzleSelector,
    SwizzleSelector,
    SwizzleSelector,
    SwizzleSelector,
  ),
}

impl Swizzle {
  /// Parse a swizzle mask such as `"xyz"` or `"rgba"`.
  pub fn parse(mask: &str) -> Result<Self> {
    let selectors = mask
      .chars()
      .map(|c| {
        SwizzleSelector::parse(c)
          .ok_or_else(|| KslError::type_mismatch("swizzle", format!("component `{}`", c), "one of xyzw or rgba", mask))
      })
      .collect::<Result<Vec<_>>>()?;

    match selectors[..] {
      [a] => Ok(Swizzle::D1(a)),
      [a, b] => Ok(Swizzle::D2(a, b)),
      [a, b, c] => Ok(Swizzle::D3(a, b, c)),
      [a, b, c, d] => Ok(Swizzle::D4(a, b, c, d)),
      _ => Err(KslError::IndexOutOfRange {
        op: format!("swizzle .{}", mask),
        index: selectors.len(),
        len: 4,
      }),
    }
  }

  pub fn selectors(&self) -> Vec<SwizzleSelector> {
    match *self {
      Swizzle::D1(a) => vec![a],
      Swizzle::D2(a, b) => vec![a, b],
      Swizzle::D3(a, b, c) => vec![a, b, c],
      Swizzle::D4(a, b, c, d) => vec![a, b, c, d],
    }
  }

  /// Number of selected channels.
  pub fn len(&self) -> usize {
    match self {
      Swizzle::D1(..) => 1,
      Swizzle::D2(..) => 2,
      Swizzle::D3(..) => 3,
      Swizzle::D4(..) => 4,
    }
  }

  pub fn is_empty(&self) -> bool {
    false
  }

  /// A swizzle can be written to only if no channel is selected twice.
  pub fn is_assignable(&self) -> bool {
    let selectors = self.selectors();
    selectors
      .iter()
      .enumerate()
      .all(|(i, s)| !selectors[..i].contains(s))
  }

  /// Type of this swizzle applied to a source of type `source`.
  ///
  /// The source must be a vector; the channel count and every selected channel must fit its arity.
  pub fn result_type(&self, source: &Type) -> Result<Type> {
    let (kind, dim) = match (source.scalar_kind(), source.dim()) {
      (Some(kind), Some(dim)) if dim != Dim::Scalar => (kind, dim),
      _ => return Err(KslError::type_mismatch("swizzle", "source", "vector", source)),
    };
    let arity = dim.count();

    if self.len() > arity {
      return Err(KslError::IndexOutOfRange {
        op: format!("swizzle {}", self),
        index: self.len(),
        len: arity,
      });
    }

    if let Some(s) = self.selectors().into_iter().find(|s| s.index() >= arity) {
      return Err(KslError::IndexOutOfRange {
        op: format!("swizzle {}", self),
        index: s.index(),
        len: arity,
      });
    }

    let out = Dim::from_count(self.len()).unwrap_or(Dim::Scalar);
    Ok(Type::new(PrimType::new(kind, out)))
  }
}

impl fmt::Display for Swizzle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(".")?;
    for s in self.selectors() {
      write!(f, "{}", s.as_char())?;
    }
    Ok(())
  }
}

/// Interface to implement to swizzle an expression.
pub trait Swizzlable<S> {
  type Output;

  fn swizzle(&self, sw: S) -> Self::Output;
}

fn swizzled<R>(e: &ErasedExpr, sw: Swizzle) -> Expr<R>
where
  R: ToType,
{
  Expr::new(ErasedExpr::new(R::ty(), ExprNode::Swizzle(Box::new(e.clone()), sw)))
}

// 2D
impl<T> Swizzlable<SwizzleSelector> for Expr<V2<T>>
where
  T: ToType,
{
  type Output = Expr<T>;

  fn swizzle(&self, x: SwizzleSelector) -> Self::Output {
    swizzled(&self.erased, Swizzle::D1(x))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 2]> for Expr<V2<T>>
where
  V2<T>: ToType,
{
  type Output = Self;

  fn swizzle(&self, [x, y]: [SwizzleSelector; 2]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D2(x, y))
  }
}

// 3D
impl<T> Swizzlable<SwizzleSelector> for Expr<V3<T>>
where
  T: ToType,
{
  type Output = Expr<T>;

  fn swizzle(&self, x: SwizzleSelector) -> Self::Output {
    swizzled(&self.erased, Swizzle::D1(x))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 2]> for Expr<V3<T>>
where
  V2<T>: ToType,
{
  type Output = Expr<V2<T>>;

  fn swizzle(&self, [x, y]: [SwizzleSelector; 2]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D2(x, y))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 3]> for Expr<V3<T>>
where
  V3<T>: ToType,
{
  type Output = Self;

  fn swizzle(&self, [x, y, z]: [SwizzleSelector; 3]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D3(x, y, z))
  }
}

// 4D
impl<T> Swizzlable<SwizzleSelector> for Expr<V4<T>>
where
  T: ToType,
{
  type Output = Expr<T>;

  fn swizzle(&self, x: SwizzleSelector) -> Self::Output {
    swizzled(&self.erased, Swizzle::D1(x))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 2]> for Expr<V4<T>>
where
  V2<T>: ToType,
{
  type Output = Expr<V2<T>>;

  fn swizzle(&self, [x, y]: [SwizzleSelector; 2]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D2(x, y))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 3]> for Expr<V4<T>>
where
  V3<T>: ToType,
{
  type Output = Expr<V3<T>>;

  fn swizzle(&self, [x, y, z]: [SwizzleSelector; 3]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D3(x, y, z))
  }
}

impl<T> Swizzlable<[SwizzleSelector; 4]> for Expr<V4<T>>
where
  V4<T>: ToType,
{
  type Output = Self;

  fn swizzle(&self, [x, y, z, w]: [SwizzleSelector; 4]) -> Self::Output {
    swizzled(&self.erased, Swizzle::D4(x, y, z, w))
  }
}

impl<T> Expr<T> {
  /// Swizzle with a mask checked at run time.
  ///
  /// The result type `R` must match the swizzled type.
  pub fn try_swizzle<R>(&self, mask: &str) -> Result<Expr<R>>
  where
    R: ToType,
  {
    let erased = ErasedExpr::swizzle(self.erased.clone(), Swizzle::parse(mask)?)?;
    Expr::try_from(erased)
  }
}

/// Expressions having a `x` or `r` coordinate.
///
/// Akin to swizzling with `.x` or `.r`.
pub trait HasX {
  type Output;

  fn x(&self) -> Self::Output;

  fn r(&self) -> Self::Output {
    self.x()
  }
}

/// Expressions having a `y` or `g` coordinate.
pub trait HasY {
  type Output;

  fn y(&self) -> Self::Output;

  fn g(&self) -> Self::Output {
    self.y()
  }
}

/// Expressions having a `z` or `b` coordinate.
pub trait HasZ {
  type Output;

  fn z(&self) -> Self::Output;

  fn b(&self) -> Self::Output {
    self.z()
  }
}

/// Expressions having a `w` or `a` coordinate.
pub trait HasW {
  type Output;

  fn w(&self) -> Self::Output;

  fn a(&self) -> Self::Output {
    self.w()
  }
}

/// Expressions having a `xy` view.
pub trait HasXY {
  type Output;

  fn xy(&self) -> Self::Output;
}

/// Expressions having a `xyz` (or `rgb`) view.
pub trait HasXYZ {
  type Output;

  fn xyz(&self) -> Self::Output;

  fn rgb(&self) -> Self::Output {
    self.xyz()
  }
}

macro_rules! impl_has_k {
  ($trait:ident, $name:ident, $selector:ident, $t:ident) => {
    impl<T> $trait for Expr<$t<T>>
    where
      T: ToType,
    {
      type Output = Expr<T>;

      fn $name(&self) -> Self::Output {
        self.swizzle(SwizzleSelector::$selector)
      }
    }
  };
}

impl_has_k!(HasX, x, X, V2);
impl_has_k!(HasX, x, X, V3);
impl_has_k!(HasX, x, X, V4);
impl_has_k!(HasY, y, Y, V2);
impl_has_k!(HasY, y, Y, V3);
impl_has_k!(HasY, y, Y, V4);
impl_has_k!(HasZ, z, Z, V3);
impl_has_k!(HasZ, z, Z, V4);
impl_has_k!(HasW, w, W, V4);

macro_rules! impl_has_xy {
  ($t:ident) => {
    impl<T> HasXY for Expr<$t<T>>
    where
      V2<T>: ToType,
    {
      type Output = Expr<V2<T>>;

      fn xy(&self) -> Self::Output {
        self.swizzle([SwizzleSelector::X, SwizzleSelector::Y])
      }
    }
  };
}

impl_has_xy!(V3);
impl_has_xy!(V4);

impl<T> HasXYZ for Expr<V4<T>>
where
  V3<T>: ToType,
{
  type Output = Expr<V3<T>>;

  fn xyz(&self) -> Self::Output {
    self.swizzle([SwizzleSelector::X, SwizzleSelector::Y, SwizzleSelector::Z])
  }
}

/// Swizzle macro.
///
/// This macro allows to swizzle expressions to yield expressions reorganizing the vector attributes. For instance,
/// `sw!(color, .r.g.b)` will extract the RGB channels of a color and will yield a [`V3`].
#[macro_export]
macro_rules! sw {
  ($e:expr, . $a:tt) => {{
    use $crate::swizzle::Swizzlable as _;
    $e.swizzle($crate::sw_extract!($a))
  }};

  ($e:expr, . $a:tt . $b:tt) => {{
    use $crate::swizzle::Swizzlable as _;
    $e.swizzle([$crate::sw_extract!($a), $crate::sw_extract!($b)])
  }};

  ($e:expr, . $a:tt . $b:tt . $c:tt) => {{
    use $crate::swizzle::Swizzlable as _;
    $e.swizzle([
      $crate::sw_extract!($a),
      $crate::sw_extract!($b),
      $crate::sw_extract!($c),
    ])
  }};

  ($e:expr, . $a:tt . $b:tt . $c:tt . $d:tt) => {{
    use $crate::swizzle::Swizzlable as _;
    $e.swizzle([
      $crate::sw_extract!($a),
      $crate::sw_extract!($b),
      $crate::sw_extract!($c),
      $crate::sw_extract!($d),
    ])
  }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! sw_extract {
  (x) => {
    $crate::swizzle::SwizzleSelector::X
  };

  (r) => {
    $crate::swizzle::SwizzleSelector::X
  };

  (y) => {
    $crate::swizzle::SwizzleSelector::Y
  };

  (g) => {
    $crate::swizzle::SwizzleSelector::Y
  };

  (z) => {
    $crate::swizzle::SwizzleSelector::Z
  };

  (b) => {
    $crate::swizzle::SwizzleSelector::Z
  };

  (w) => {
    $crate::swizzle::SwizzleSelector::W
  };

  (a) => {
    $crate::swizzle::SwizzleSelector::W
  };
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{error::ErrorKind, expr::Literal, lit};

  #[test]
  fn parse_masks() {
    assert_eq!(
      Swizzle::parse("xyz").unwrap(),
      Swizzle::D3(SwizzleSelector::X, SwizzleSelector::Y, SwizzleSelector::Z)
    );
    assert_eq!(Swizzle::parse("a").unwrap(), Swizzle::D1(SwizzleSelector::W));
    assert_eq!(Swizzle::parse("rgb").unwrap().to_string(), ".xyz");
    assert!(Swizzle::parse("xyzwx").is_err());
    assert!(Swizzle::parse("").is_err());
    assert!(Swizzle::parse("xq").is_err());
  }

  #[test]
  fn four_components_of_a_vec2() {
    let v = ErasedExpr::lit(Literal::Float2([1., 2.]));
    let err = ErasedExpr::swizzle(v, Swizzle::parse("xyzw").unwrap()).unwrap_err();

    assert!(matches!(err, KslError::IndexOutOfRange { index: 4, len: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
  }

  #[test]
  fn component_beyond_arity() {
    let v = ErasedExpr::lit(Literal::Float3([1., 2., 3.]));
    let err = ErasedExpr::swizzle(v, Swizzle::parse("xw").unwrap()).unwrap_err();

    assert!(matches!(err, KslError::IndexOutOfRange { index: 3, len: 3, .. }));
  }

  #[test]
  fn scalar_sources_are_rejected() {
    let v = ErasedExpr::lit(Literal::Float(1.));
    let err = ErasedExpr::swizzle(v, Swizzle::parse("x").unwrap()).unwrap_err();

    assert!(matches!(err, KslError::TypeMismatch { .. }));
  }

  #[test]
  fn typed_swizzles() {
    let v = lit!(1., 2., 3., 4.);

    assert_eq!(sw!(v, .z).ty(), Type::float(Dim::Scalar));
    assert_eq!(sw!(v, .x.y).ty(), Type::float(Dim::D2));
    assert_eq!(v.xyz().ty(), Type::float(Dim::D3));
    assert_eq!(v.a().ty(), Type::float(Dim::Scalar));
    assert_eq!(v.try_swizzle::<V2<f32>>("wz").unwrap().ty(), Type::float(Dim::D2));
    assert!(v.try_swizzle::<V3<f32>>("wz").is_err());
  }

  #[test]
  fn assignable_masks() {
    assert!(Swizzle::parse("xyz").unwrap().is_assignable());
    assert!(!Swizzle::parse("xx").unwrap().is_assignable());
  }
}
