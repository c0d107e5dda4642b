//! Reusable blocks.

pub mod armature;
pub mod color;
pub mod displacement;
pub mod morph;
pub mod vertex_transform;

pub use armature::ArmatureBlock;
pub use color::{ColorBlock, ColorBlockConfig, ColorSource, ColorSourceKind, ColorVertexBlock};
pub use displacement::{DisplacementBlock, PropertyConfig, PropertySource, PropertySourceKind};
pub use morph::{MorphBlock, MorphOutputs};
pub use vertex_transform::{VertexConfig, VertexTransformBlock, VertexTransformOutputs};

use crate::stmt::MutateBinOp;

/// Vertex positions, `float3`.
pub const POSITIONS: &str = "attrib_positions";

/// Vertex normals, `float3`.
pub const NORMALS: &str = "attrib_normals";

/// Vertex tangents, `float4` with the bitangent sign in `w`.
pub const TANGENTS: &str = "attrib_tangents";

/// Vertex colors, `float4`.
pub const COLORS: &str = "attrib_colors";

/// Texture coordinates, `float2`.
pub const TEXTURE_COORDS: &str = "attrib_texture_coords";

/// Joint weights of skinned vertices, `float4`.
pub const WEIGHTS: &str = "attrib_weights";

/// Joint indices of skinned vertices, `int4`.
pub const JOINTS: &str = "attrib_joints";

/// Per-instance model matrix, `mat4`.
pub const INSTANCE_MODEL_MAT: &str = "attrib_instance_model_mat";

/// How a source value is combined with the value accumulated so far.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MixMode {
  /// Replace the accumulated value.
  #[default]
  Set,
  Multiply,
  Add,
  Subtract,
}

impl MixMode {
  /// Operator of the accumulating assignment; `None` for a plain assignment.
  pub fn mutate_op(self) -> Option<MutateBinOp> {
    match self {
      MixMode::Set => None,
      MixMode::Multiply => Some(MutateBinOp::Mul),
      MixMode::Add => Some(MutateBinOp::Add),
      MixMode::Subtract => Some(MutateBinOp::Sub),
    }
  }
}

/// Name of the inter-stage value carrying a vertex attribute to the fragment stage.
pub fn inter_stage_name(attribute: &str) -> String {
  format!("v_{}", attribute)
}
