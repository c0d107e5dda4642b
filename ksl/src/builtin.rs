//! Stage built-in variables.

use crate::{
  stage::StageKind,
  types::{Dim, Type},
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BuiltIn {
  Vertex(VertexBuiltIn),
  Fragment(FragmentBuiltIn),
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum VertexBuiltIn {
  VertexIndex,
  InstanceIndex,
  Position,
  PointSize,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FragmentBuiltIn {
  FragCoord,
  FrontFacing,
  PointCoord,
  FragDepth,
}

impl BuiltIn {
  pub fn name(self) -> &'static str {
    match self {
      BuiltIn::Vertex(VertexBuiltIn::VertexIndex) => "vertexIndex",
      BuiltIn::Vertex(VertexBuiltIn::InstanceIndex) => "instanceIndex",
      BuiltIn::Vertex(VertexBuiltIn::Position) => "outPosition",
      BuiltIn::Vertex(VertexBuiltIn::PointSize) => "outPointSize",
      BuiltIn::Fragment(FragmentBuiltIn::FragCoord) => "fragCoord",
      BuiltIn::Fragment(FragmentBuiltIn::FrontFacing) => "isFrontFacing",
      BuiltIn::Fragment(FragmentBuiltIn::PointCoord) => "pointCoord",
      BuiltIn::Fragment(FragmentBuiltIn::FragDepth) => "outDepth",
    }
  }

  pub fn ty(self) -> Type {
    match self {
      BuiltIn::Vertex(VertexBuiltIn::VertexIndex) | BuiltIn::Vertex(VertexBuiltIn::InstanceIndex) => {
        Type::int(Dim::Scalar)
      }
      BuiltIn::Vertex(VertexBuiltIn::Position) | BuiltIn::Fragment(FragmentBuiltIn::FragCoord) => {
        Type::float(Dim::D4)
      }
      BuiltIn::Vertex(VertexBuiltIn::PointSize) | BuiltIn::Fragment(FragmentBuiltIn::FragDepth) => {
        Type::float(Dim::Scalar)
      }
      BuiltIn::Fragment(FragmentBuiltIn::FrontFacing) => Type::bool(Dim::Scalar),
      BuiltIn::Fragment(FragmentBuiltIn::PointCoord) => Type::float(Dim::D2),
    }
  }

  /// Stage the built-in exists in.
  pub fn stage(self) -> StageKind {
    match self {
      BuiltIn::Vertex(_) => StageKind::Vertex,
      BuiltIn::Fragment(_) => StageKind::Fragment,
    }
  }

  pub fn is_writable(self) -> bool {
    matches!(
      self,
      BuiltIn::Vertex(VertexBuiltIn::Position)
        | BuiltIn::Vertex(VertexBuiltIn::PointSize)
        | BuiltIn::Fragment(FragmentBuiltIn::FragDepth)
    )
  }
}
