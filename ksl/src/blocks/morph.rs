//! Morph target blending.

use crate::{
  block::{BlockBuilder, BlockKind},
  blocks::{NORMALS, POSITIONS, TANGENTS},
  error::Result,
  expr::Expr,
  stmt::MutateBinOp,
  swizzle::HasXYZ,
  types::{V3, V4},
  var::Var,
};
use tracing::trace;

/// Offset a vertex by its morph target attributes, weighted by the program
/// [`MorphWeightData`](crate::data::MorphWeightData).
///
/// Morph attribute `i` is weighted by morph weight `i`; its name prefix tells which vertex property it offsets
/// ([`POSITIONS`], [`NORMALS`] or [`TANGENTS`]). Attributes with another prefix are ignored.
#[derive(Debug)]
pub struct MorphBlock<'a> {
  pub attributes: &'a [String],
  pub position: Expr<V3<f32>>,
  pub normal: Expr<V3<f32>>,
  pub tangent: Expr<V4<f32>>,
}

#[derive(Debug)]
pub struct MorphOutputs {
  pub position: Var<V3<f32>>,
  pub normal: Var<V3<f32>>,
  pub tangent: Var<V4<f32>>,
}

impl BlockKind for MorphBlock<'_> {
  type Outputs = MorphOutputs;

  const NAME: &'static str = "morphBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let data = b.stage().morph_weight_data()?;

    let in_position = b.input("inPosition", Some(self.position), None)?;
    let in_normal = b.input("inNormal", Some(self.normal), None)?;
    let in_tangent = b.input("inTangent", Some(self.tangent), None)?;

    let outputs = MorphOutputs {
      position: b.output("outPosition")?,
      normal: b.output("outNormal")?,
      tangent: b.output("outTangent")?,
    };

    let position = b.var(in_position);
    let normal = b.var(in_normal);
    let tangent = b.var(in_tangent);

    for (i, attribute) in self.attributes.iter().enumerate() {
      let weight = data.weight_component(i)?;

      if attribute.starts_with(POSITIONS) {
        let offset = b.stage().vertex_attrib::<V3<f32>>(attribute)?;
        b.set(&position, MutateBinOp::Add, offset * weight)?;
      } else if attribute.starts_with(NORMALS) {
        let offset = b.stage().vertex_attrib::<V3<f32>>(attribute)?;
        b.set(&normal, MutateBinOp::Add, offset * weight)?;
      } else if attribute.starts_with(TANGENTS) {
        let offset = b.stage().vertex_attrib::<V3<f32>>(attribute)?;
        b.set(tangent.xyz(), MutateBinOp::Add, offset * weight)?;
      } else {
        trace!(attribute = attribute.as_str(), "ignoring morph attribute");
      }
    }

    b.set(&outputs.position, None, &position)?;
    b.set(&outputs.normal, None, &normal)?;
    b.set(&outputs.tangent, None, &tangent)?;

    Ok(outputs)
  }
}
