//! Shader programs.
//!
//! A [`Program`] is the top-level container: a vertex and a fragment [`Stage`], plus the resources they share (name
//! pool, uniforms, inter-stage values, data blocks and the shader listeners the backend must call).

use crate::{
  data::{
    ArmatureData, DataBlock, DataBlockKind, DrawContext, MorphWeightData, ShaderListener, UniformStore,
    DEFAULT_MAX_BONES, JOINT_TRANSFORMS_UNIFORM, MORPH_WEIGHTS_A_UNIFORM, MORPH_WEIGHTS_B_UNIFORM,
  },
  error::{KslError, Result},
  names::NamePool,
  stage::{Stage, StageBuilder, StageKind},
  types::Type,
  var::{ScopeId, StateKind, VarId, Variable},
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::{mem, sync::Arc};
use tracing::debug;

// scopes 0 to 2 are the program scope and the two stage root scopes
const FIRST_DYNAMIC_SCOPE: u32 = 3;

/// Program-level state, threaded through the stage and scope builders.
#[derive(Debug, Default)]
pub(crate) struct ProgramData {
  pub(crate) names: NamePool,
  uniforms: IndexMap<Arc<str>, Variable>,
  inter_stage: IndexMap<Arc<str>, Variable>,
  data_blocks: FxHashMap<DataBlockKind, DataBlock>,
  listeners: Vec<Arc<dyn ShaderListener>>,
  next_var: u32,
  next_scope: u32,
}

impl ProgramData {
  pub(crate) fn new_variable(&mut self, name: Arc<str>, ty: Type, scope: ScopeId, kind: StateKind) -> Variable {
    let id = VarId(self.next_var);
    self.next_var += 1;

    Variable {
      id,
      name,
      ty,
      scope,
      kind,
    }
  }

  pub(crate) fn next_scope_id(&mut self) -> ScopeId {
    let id = ScopeId(FIRST_DYNAMIC_SCOPE + self.next_scope);
    self.next_scope += 1;
    id
  }

  pub(crate) fn declare_uniform(&mut self, name: &str, ty: Type) -> Result<Variable> {
    Self::lookup_or_declare(name, ty, StateKind::Uniform, &mut self.uniforms, &mut self.names, &mut self.next_var)
  }

  pub(crate) fn declare_inter_stage(&mut self, name: &str, ty: Type) -> Result<Variable> {
    Self::lookup_or_declare(
      name,
      ty,
      StateKind::InterStage,
      &mut self.inter_stage,
      &mut self.names,
      &mut self.next_var,
    )
  }

  // same name and type yield the same variable; a different type is a collision
  fn lookup_or_declare(
    name: &str,
    ty: Type,
    kind: StateKind,
    vars: &mut IndexMap<Arc<str>, Variable>,
    names: &mut NamePool,
    next_var: &mut u32,
  ) -> Result<Variable> {
    if let Some(var) = vars.get(name) {
      if var.ty() != ty {
        return Err(KslError::NameCollision { name: name.to_owned() });
      }

      return Ok(var.clone());
    }

    let name = names.reserve(name)?;
    let var = Variable {
      id: VarId(*next_var),
      name: name.clone(),
      ty,
      scope: ScopeId::PROGRAM,
      kind,
    };
    *next_var += 1;
    vars.insert(name, var.clone());

    debug!(var = %var, ty = %ty, kind = %kind, "declared program variable");
    Ok(var)
  }

  pub(crate) fn armature_data(&mut self, max_bones: usize) -> Result<Arc<ArmatureData>> {
    if let Some(DataBlock::Armature(data)) = self.data_blocks.get(&DataBlockKind::Armature) {
      if max_bones > data.max_bones() {
        return Err(KslError::CapacityExceeded {
          what: "armature joint transforms".to_owned(),
          requested: max_bones,
          capacity: data.max_bones(),
        });
      }

      return Ok(data.clone());
    }

    let joint_transforms = self.declare_uniform(JOINT_TRANSFORMS_UNIFORM, ArmatureData::uniform_type(max_bones))?;
    let data = Arc::new(ArmatureData::new(max_bones, joint_transforms));

    // without joints, there is nothing to feed
    if max_bones > 0 {
      self.listeners.push(data.clone());
    }

    self
      .data_blocks
      .insert(DataBlockKind::Armature, DataBlock::Armature(data.clone()));
    debug!(max_bones, "created armature data");

    Ok(data)
  }

  pub(crate) fn morph_weight_data(&mut self) -> Result<Arc<MorphWeightData>> {
    if let Some(DataBlock::MorphWeights(data)) = self.data_blocks.get(&DataBlockKind::MorphWeights) {
      return Ok(data.clone());
    }

    let weights_a = self.declare_uniform(MORPH_WEIGHTS_A_UNIFORM, MorphWeightData::uniform_type())?;
    let weights_b = self.declare_uniform(MORPH_WEIGHTS_B_UNIFORM, MorphWeightData::uniform_type())?;
    let data = Arc::new(MorphWeightData::new(weights_a, weights_b));

    self.listeners.push(data.clone());
    self
      .data_blocks
      .insert(DataBlockKind::MorphWeights, DataBlock::MorphWeights(data.clone()));
    debug!("created morph weight data");

    Ok(data)
  }

  pub(crate) fn program_level_data(&mut self, kind: DataBlockKind) -> Result<DataBlock> {
    if let Some(block) = self.data_blocks.get(&kind) {
      return Ok(block.clone());
    }

    match kind {
      DataBlockKind::Armature => self.armature_data(DEFAULT_MAX_BONES).map(DataBlock::Armature),
      DataBlockKind::MorphWeights => self.morph_weight_data().map(DataBlock::MorphWeights),
    }
  }
}

/// A shader program.
#[derive(Debug)]
pub struct Program {
  name: String,
  data: ProgramData,
  vertex: Option<Stage>,
  fragment: Option<Stage>,
}

impl Program {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      data: ProgramData::default(),
      vertex: None,
      fragment: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Build the vertex stage.
  pub fn vertex_stage(&mut self, body: impl FnOnce(&mut StageBuilder) -> Result<()>) -> Result<()> {
    self.build_stage(StageKind::Vertex, body)
  }

  /// Build the fragment stage.
  pub fn fragment_stage(&mut self, body: impl FnOnce(&mut StageBuilder) -> Result<()>) -> Result<()> {
    self.build_stage(StageKind::Fragment, body)
  }

  fn build_stage(&mut self, kind: StageKind, body: impl FnOnce(&mut StageBuilder) -> Result<()>) -> Result<()> {
    if self.stage(kind).is_some() {
      return Err(KslError::NameCollision {
        name: format!("{} stage", kind),
      });
    }

    let mut builder = StageBuilder::new(kind, mem::take(&mut self.data));
    let res = body(&mut builder);
    let (data, stage) = builder.finish();
    self.data = data;
    res?;

    debug!(program = %self.name, stage = %kind, functions = stage.functions().len(), "built stage");

    match kind {
      StageKind::Vertex => self.vertex = Some(stage),
      StageKind::Fragment => self.fragment = Some(stage),
    }

    Ok(())
  }

  pub fn stage(&self, kind: StageKind) -> Option<&Stage> {
    match kind {
      StageKind::Vertex => self.vertex.as_ref(),
      StageKind::Fragment => self.fragment.as_ref(),
    }
  }

  /// Built stages, vertex first.
  pub fn stages(&self) -> impl Iterator<Item = &Stage> {
    self.vertex.iter().chain(self.fragment.iter())
  }

  /// Program-level uniforms, in declaration order.
  pub fn uniforms(&self) -> impl Iterator<Item = &Variable> {
    self.data.uniforms.values()
  }

  pub fn uniform(&self, name: &str) -> Option<&Variable> {
    self.data.uniforms.get(name)
  }

  /// Look up or declare a program-level uniform outside of any stage.
  pub fn declare_uniform(&mut self, name: &str, ty: Type) -> Result<Variable> {
    self.data.declare_uniform(name, ty)
  }

  /// Values passed from the vertex stage to the fragment stage, in declaration order.
  pub fn inter_stage(&self) -> impl Iterator<Item = &Variable> {
    self.data.inter_stage.values()
  }

  /// Look up or create the data block of the given kind.
  pub fn program_level_data(&mut self, kind: DataBlockKind) -> Result<DataBlock> {
    self.data.program_level_data(kind)
  }

  pub fn armature_data(&mut self, max_bones: usize) -> Result<Arc<ArmatureData>> {
    self.data.armature_data(max_bones)
  }

  pub fn morph_weight_data(&mut self) -> Result<Arc<MorphWeightData>> {
    self.data.morph_weight_data()
  }

  /// Registered data block of the given kind, if any.
  pub fn data_block(&self, kind: DataBlockKind) -> Option<&DataBlock> {
    self.data.data_blocks.get(&kind)
  }

  /// Listeners to call, in registration order.
  pub fn shader_listeners(&self) -> &[Arc<dyn ShaderListener>] {
    &self.data.listeners
  }

  pub fn name_pool(&self) -> &NamePool {
    &self.data.names
  }

  /// Forward the creation of the backend shader to every listener.
  pub fn on_shader_created(&self, uniforms: &dyn UniformStore) {
    for listener in &self.data.listeners {
      listener.on_shader_created(uniforms);
    }
  }

  /// Forward a draw call to every listener, in registration order.
  pub fn on_update(&self, ctx: &dyn DrawContext, uniforms: &mut dyn UniformStore) {
    for listener in &self.data.listeners {
      listener.on_update(ctx, uniforms);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    error::ErrorKind,
    types::{Dim, V3, V4},
  };

  #[test]
  fn uniforms_are_looked_up_by_name() {
    let mut program = Program::new("uniforms");

    let a = program.declare_uniform("uColor", Type::float(Dim::D4)).unwrap();
    let b = program.declare_uniform("uColor", Type::float(Dim::D4)).unwrap();
    assert_eq!(a, b);

    let err = program.declare_uniform("uColor", Type::float(Dim::D3)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameCollision);
    assert_eq!(program.uniforms().count(), 1);
  }

  #[test]
  fn uniforms_are_shared_by_stages() {
    let mut program = Program::new("uniforms");
    let mut ids = Vec::new();

    program
      .vertex_stage(|stage| {
        ids.push(stage.uniform::<V4<f32>>("uColor")?.erased.as_variable().map(Variable::id));
        Ok(())
      })
      .unwrap();
    program
      .fragment_stage(|stage| {
        ids.push(stage.uniform::<V4<f32>>("uColor")?.erased.as_variable().map(Variable::id));
        Ok(())
      })
      .unwrap();

    assert_eq!(ids[0], ids[1]);
  }

  #[test]
  fn one_stage_per_kind() {
    let mut program = Program::new("stages");

    program.vertex_stage(|_| Ok(())).unwrap();
    assert!(program.vertex_stage(|_| Ok(())).is_err());
    assert_eq!(program.stages().count(), 1);
  }

  #[test]
  fn data_blocks_are_singletons() {
    let mut program = Program::new("data");

    let a = program.program_level_data(DataBlockKind::MorphWeights).unwrap();
    let b = program.program_level_data(DataBlockKind::MorphWeights).unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(program.shader_listeners().len(), 1);
  }

  #[test]
  fn armature_capacity() {
    let mut program = Program::new("armature");

    let a = program.armature_data(16).unwrap();
    let b = program.armature_data(8).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    assert!(matches!(
      program.armature_data(64),
      Err(KslError::CapacityExceeded {
        requested: 64,
        capacity: 16,
        ..
      })
    ));
  }

  #[test]
  fn armature_without_bones_is_not_a_listener() {
    let mut program = Program::new("armature");

    program.armature_data(0).unwrap();
    assert!(program.shader_listeners().is_empty());
    assert!(program.data_block(DataBlockKind::Armature).is_some());
  }

  #[test]
  fn inter_stage_values() {
    let mut program = Program::new("varyings");

    program
      .vertex_stage(|stage| {
        let color = stage.inter_stage::<V3<f32>>("vColor")?;
        stage.main(|s| s.set(&color, None, crate::lit!(1., 0., 0.)))
      })
      .unwrap();

    let err = program
      .fragment_stage(|stage| {
        let color = stage.inter_stage::<V3<f32>>("vColor")?;
        stage.main(|s| s.set(&color, None, crate::lit!(0., 1., 0.)))
      })
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    assert_eq!(program.inter_stage().count(), 1);
  }
}
