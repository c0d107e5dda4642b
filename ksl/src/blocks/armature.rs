//! Skinning.

use crate::{
  block::{BlockBuilder, BlockKind},
  error::Result,
  expr::Expr,
  swizzle::{HasW, HasX, HasY, HasZ},
  types::{M44, V4},
  var::Var,
};

/// Blend the joint transforms of a skinned vertex into one bone transform.
///
/// The transforms come from the program [`ArmatureData`](crate::data::ArmatureData), created on first use with room
/// for `max_bones` joints.
#[derive(Debug)]
pub struct ArmatureBlock {
  pub weights: Expr<V4<f32>>,
  pub joints: Expr<V4<i32>>,
  pub max_bones: usize,
}

impl BlockKind for ArmatureBlock {
  type Outputs = Var<M44>;

  const NAME: &'static str = "armatureBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let data = b.stage().armature_data(self.max_bones)?;

    let weights = b.input("inBoneWeights", Some(self.weights), None)?;
    let joints = b.input("inBoneIndices", Some(self.joints), None)?;
    let bone_transform = b.output::<M44>("outBoneTransform")?;

    let blended = data.joint_transform(joints.x())? * weights.x()
      + data.joint_transform(joints.y())? * weights.y()
      + data.joint_transform(joints.z())? * weights.z()
      + data.joint_transform(joints.w())? * weights.w();
    b.set(&bone_transform, None, blended)?;

    Ok(bone_transform)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    blocks::{JOINTS, WEIGHTS},
    data::{DataBlockKind, JOINT_TRANSFORMS_UNIFORM},
    program::Program,
    stage::StageKind,
    stmt::StatementKind,
    types::Dim,
  };

  #[test]
  fn blends_four_joints() {
    let mut program = Program::new("skin");

    program
      .vertex_stage(|stage| {
        let weights = stage.vertex_attrib::<V4<f32>>(WEIGHTS)?;
        let joints = stage.vertex_attrib::<V4<i32>>(JOINTS)?;

        stage.main(|s| {
          let bone = s.block(ArmatureBlock {
            weights,
            joints,
            max_bones: 4,
          })?;
          let _ = s.var(bone.to_expr());
          Ok(())
        })
      })
      .unwrap();

    let data = program.data_block(DataBlockKind::Armature).unwrap().as_armature().unwrap();
    assert_eq!(data.max_bones(), 4);
    assert_eq!(program.uniform(JOINT_TRANSFORMS_UNIFORM).unwrap().ty().array_len, Some(4));

    let main = program.stage(StageKind::Vertex).unwrap().main().unwrap();
    let stmt = &main.scope().statements()[0];
    let StatementKind::Block(block) = stmt.kind() else {
      panic!("block expected");
    };

    assert_eq!(block.inputs().len(), 2);
    assert_eq!(block.outputs()[0].ty(), crate::types::Type::mat(crate::types::MatrixDim::D44));
    assert!(stmt.reads().contains(data.joint_transforms()));
    assert!(stmt.reads().contains_name(WEIGHTS));
    assert_eq!(block.inputs()[1].ty(), crate::types::Type::int(Dim::D4));
  }
}
