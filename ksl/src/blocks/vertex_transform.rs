//! Local to world vertex transform.

use crate::{
  block::{BlockBuilder, BlockKind},
  blocks::{ArmatureBlock, DisplacementBlock, MorphBlock, PropertyConfig, INSTANCE_MODEL_MAT, JOINTS, WEIGHTS},
  data::DEFAULT_MAX_BONES,
  error::{KslError, Result},
  expr::Expr,
  lit,
  stage::StageKind,
  stdlib::Geometry,
  stmt::MutateBinOp,
  swizzle::{HasW, HasXYZ},
  types::{M44, V3, V4},
  var::Var,
  vec4,
};

/// Vertex features to account for in the transform.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexConfig {
  /// Multiply the model matrix by the per-instance [`INSTANCE_MODEL_MAT`] attribute.
  pub is_instanced: bool,
  /// Skin vertices with the [`WEIGHTS`] and [`JOINTS`] attributes.
  pub is_armature: bool,
  pub max_bones: usize,
  /// Morph target attributes, in morph weight order.
  pub morph_attributes: Vec<String>,
  /// Displacement along the normal.
  pub displacement: PropertyConfig,
}

impl Default for VertexConfig {
  fn default() -> Self {
    Self {
      is_instanced: false,
      is_armature: false,
      max_bones: DEFAULT_MAX_BONES,
      morph_attributes: Vec::new(),
      displacement: PropertyConfig::default(),
    }
  }
}

/// Transform a vertex from local to world space.
///
/// Normal and tangent are optional; they default to zero vectors. The world tangent keeps the bitangent sign of the
/// local tangent.
#[derive(Debug)]
pub struct VertexTransformBlock<'a> {
  pub cfg: &'a VertexConfig,
  pub model_mat: Expr<M44>,
  pub position: Expr<V3<f32>>,
  pub normal: Option<Expr<V3<f32>>>,
  pub tangent: Option<Expr<V4<f32>>>,
}

#[derive(Debug)]
pub struct VertexTransformOutputs {
  pub model_mat: Var<M44>,
  pub world_pos: Var<V3<f32>>,
  pub world_normal: Var<V3<f32>>,
  pub world_tangent: Var<V4<f32>>,
}

impl BlockKind for VertexTransformBlock<'_> {
  type Outputs = VertexTransformOutputs;

  const NAME: &'static str = "vertexBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    if b.stage_kind() != StageKind::Vertex {
      return Err(KslError::StageMismatch {
        item: "vertex transform block".to_owned(),
        expected: StageKind::Vertex.to_string(),
        found: b.stage_kind().to_string(),
      });
    }

    let cfg = self.cfg;

    let in_model_mat = b.input("inModelMat", Some(self.model_mat), None)?;
    let in_position = b.input("inLocalPos", Some(self.position), None)?;
    let in_normal = b.input("inLocalNormal", self.normal, Some(lit!(0., 0., 0.)))?;
    let in_tangent = b.input("inLocalTangent", self.tangent, Some(lit!(0., 0., 0., 0.)))?;

    let outputs = VertexTransformOutputs {
      model_mat: b.output("outModelMat")?,
      world_pos: b.output("outWorldPos")?,
      world_normal: b.output("outWorldNormal")?,
      world_tangent: b.output("outWorldTangent")?,
    };

    let model_mat = b.var(in_model_mat);
    let position = b.var(in_position);
    let normal = b.var(in_normal);
    let tangent = b.var(&in_tangent);

    if cfg.is_instanced {
      let instance_mat = b.stage().instance_attrib::<M44>(INSTANCE_MODEL_MAT)?;
      b.set(&model_mat, MutateBinOp::Mul, instance_mat)?;
    }

    if cfg.is_armature {
      let weights = b.stage().vertex_attrib::<V4<f32>>(WEIGHTS)?;
      let joints = b.stage().vertex_attrib::<V4<i32>>(JOINTS)?;
      let bone_transform = b.block(ArmatureBlock {
        weights,
        joints,
        max_bones: cfg.max_bones,
      })?;

      b.set(&model_mat, MutateBinOp::Mul, &bone_transform)?;
    }

    if !cfg.morph_attributes.is_empty() {
      let morphed = b.block(MorphBlock {
        attributes: &cfg.morph_attributes,
        position: position.to_expr(),
        normal: normal.to_expr(),
        tangent: tangent.to_expr(),
      })?;

      b.set(&position, None, &morphed.position)?;
      b.set(&normal, None, &morphed.normal)?;
      b.set(&tangent, None, &morphed.tangent)?;
    }

    if !cfg.displacement.is_empty_or_const(0.) {
      let displacement = b.block(DisplacementBlock {
        cfg: &cfg.displacement,
      })?;

      b.set(&position, MutateBinOp::Add, normal.normalize() * &displacement)?;
    }

    let local_pos: Expr<V4<f32>> = vec4!(position, 1.);
    let local_normal: Expr<V4<f32>> = vec4!(normal, 0.);
    let world_pos = (&model_mat * local_pos).xyz();
    let world_normal = (&model_mat * local_normal).xyz().normalize();
    let world_tangent: Expr<V4<f32>> = vec4!((&model_mat * &tangent).xyz(), in_tangent.w());

    b.set(&outputs.model_mat, None, &model_mat)?;
    b.set(&outputs.world_pos, None, world_pos)?;
    b.set(&outputs.world_normal, None, world_normal)?;
    b.set(&outputs.world_tangent, None, world_tangent)?;

    Ok(outputs)
  }
}
