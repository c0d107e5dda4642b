//! Data blocks and the shader listener protocol.
//!
//! A data block is a program-level singleton owning uniforms shared by every block that needs them. Data blocks that
//! must be fed per draw call also are [`ShaderListener`]s: the backend calls [`ShaderListener::on_shader_created`]
//! once, after compiling the program, and [`ShaderListener::on_update`] before every draw call.

use crate::{
  error::{KslError, Result},
  expr::{ErasedExpr, Expr},
  types::{Dim, MatrixDim, PrimType, ToType, Type, M44, V4},
  var::Variable,
};
use indexmap::IndexMap;
use std::{
  fmt,
  sync::{Arc, OnceLock},
};
use tracing::{trace, warn};

/// Name of the joint transform uniform array.
pub const JOINT_TRANSFORMS_UNIFORM: &str = "uJointTransform";

/// Names of the two morph weight registers.
pub const MORPH_WEIGHTS_A_UNIFORM: &str = "uMorphWeightsA";
pub const MORPH_WEIGHTS_B_UNIFORM: &str = "uMorphWeightsB";

/// Capacity used when the armature data block is requested by kind only.
pub const DEFAULT_MAX_BONES: usize = 32;

/// Number of morph weights the two `float4` registers hold.
pub const MAX_MORPH_WEIGHTS: usize = 8;

/// Location of a uniform in a backend store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct UniformLocation(pub usize);

/// Backend-side uniform storage of a compiled program.
///
/// Values are written as flat `f32` slices; matrices are column-major.
pub trait UniformStore {
  /// Location of a uniform, if the compiled program kept it.
  fn resolve(&self, name: &str) -> Option<UniformLocation>;

  /// Number of array elements at a location; `1` for non-array uniforms.
  fn array_len(&self, location: UniformLocation) -> usize;

  /// Write `values` at `location`, starting `offset` floats in.
  fn write(&mut self, location: UniformLocation, offset: usize, values: &[f32]);
}

/// Per draw call data.
pub trait DrawContext {
  /// Joint transforms of the skin of the drawn mesh, if any.
  fn joint_transforms(&self) -> Option<&[M44]>;

  /// Morph target weights of the drawn mesh, if any.
  fn morph_weights(&self) -> Option<&[f32]>;
}

/// Plain draw call data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawCommand {
  pub joint_transforms: Option<Vec<M44>>,
  pub morph_weights: Option<Vec<f32>>,
}

impl DrawContext for DrawCommand {
  fn joint_transforms(&self) -> Option<&[M44]> {
    self.joint_transforms.as_deref()
  }

  fn morph_weights(&self) -> Option<&[f32]> {
    self.morph_weights.as_deref()
  }
}

/// Hooks called by the backend on a compiled program.
pub trait ShaderListener: fmt::Debug + Send + Sync {
  /// Resolve the uniforms the listener feeds.
  ///
  /// Called once per compiled program; later calls are ignored.
  fn on_shader_created(&self, uniforms: &dyn UniformStore);

  /// Feed the uniforms for the next draw call.
  fn on_update(&self, ctx: &dyn DrawContext, uniforms: &mut dyn UniformStore);
}

/// Kinds of data blocks; a program holds at most one data block per kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataBlockKind {
  Armature,
  MorphWeights,
}

impl fmt::Display for DataBlockKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataBlockKind::Armature => f.write_str("ArmatureData"),
      DataBlockKind::MorphWeights => f.write_str("MorphWeightData"),
    }
  }
}

/// A registered data block.
#[derive(Clone, Debug)]
pub enum DataBlock {
  Armature(Arc<ArmatureData>),
  MorphWeights(Arc<MorphWeightData>),
}

impl DataBlock {
  pub fn kind(&self) -> DataBlockKind {
    match self {
      DataBlock::Armature(_) => DataBlockKind::Armature,
      DataBlock::MorphWeights(_) => DataBlockKind::MorphWeights,
    }
  }

  pub fn as_armature(&self) -> Option<&Arc<ArmatureData>> {
    match self {
      DataBlock::Armature(data) => Some(data),
      _ => None,
    }
  }

  pub fn as_morph_weights(&self) -> Option<&Arc<MorphWeightData>> {
    match self {
      DataBlock::MorphWeights(data) => Some(data),
      _ => None,
    }
  }

  /// Whether two handles designate the same data block instance.
  pub fn ptr_eq(&self, other: &DataBlock) -> bool {
    match (self, other) {
      (DataBlock::Armature(a), DataBlock::Armature(b)) => Arc::ptr_eq(a, b),
      (DataBlock::MorphWeights(a), DataBlock::MorphWeights(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

fn resolve_once(name: &str, slot: &OnceLock<Option<UniformLocation>>, uniforms: &dyn UniformStore) {
  if slot.set(uniforms.resolve(name)).is_err() {
    warn!(uniform = name, "shader already created, ignoring");
  }
}

/// Joint transforms of a skinned mesh.
///
/// Owns the `mat4[max_bones]` uniform array and feeds it from the draw call joint transforms.
#[derive(Debug)]
pub struct ArmatureData {
  max_bones: usize,
  joint_transforms: Variable,
  location: OnceLock<Option<UniformLocation>>,
}

impl ArmatureData {
  pub(crate) fn new(max_bones: usize, joint_transforms: Variable) -> Self {
    Self {
      max_bones,
      joint_transforms,
      location: OnceLock::new(),
    }
  }

  pub(crate) fn uniform_type(max_bones: usize) -> Type {
    Type::array(PrimType::Matrix(MatrixDim::D44), max_bones)
  }

  /// Capacity of the joint transform array.
  pub fn max_bones(&self) -> usize {
    self.max_bones
  }

  /// The joint transform uniform array.
  pub fn joint_transforms(&self) -> &Variable {
    &self.joint_transforms
  }

  /// Look up one joint transform.
  pub fn joint_transform(&self, index: impl Into<Expr<i32>>) -> Result<Expr<M44>> {
    let erased = ErasedExpr::index(ErasedExpr::var(&self.joint_transforms), index.into().into_erased())?;
    Ok(Expr::new(erased))
  }
}

impl ShaderListener for ArmatureData {
  fn on_shader_created(&self, uniforms: &dyn UniformStore) {
    resolve_once(self.joint_transforms.name(), &self.location, uniforms);
  }

  fn on_update(&self, ctx: &dyn DrawContext, uniforms: &mut dyn UniformStore) {
    let (Some(Some(location)), Some(joints)) = (self.location.get(), ctx.joint_transforms()) else {
      return;
    };

    let capacity = uniforms.array_len(*location);
    if joints.len() > capacity {
      warn!(joints = joints.len(), capacity, "too many joints, extra joint transforms are dropped");
    }

    for (i, joint) in joints.iter().take(capacity).enumerate() {
      uniforms.write(*location, i * 16, &joint.to_cols_array());
    }
  }
}

/// Morph target weights, packed in two `float4` registers.
#[derive(Debug)]
pub struct MorphWeightData {
  weights_a: Variable,
  weights_b: Variable,
  location_a: OnceLock<Option<UniformLocation>>,
  location_b: OnceLock<Option<UniformLocation>>,
}

impl MorphWeightData {
  pub(crate) fn new(weights_a: Variable, weights_b: Variable) -> Self {
    Self {
      weights_a,
      weights_b,
      location_a: OnceLock::new(),
      location_b: OnceLock::new(),
    }
  }

  pub(crate) fn uniform_type() -> Type {
    V4::<f32>::ty()
  }

  /// Weights of the morph targets 0 to 3.
  pub fn weights_a(&self) -> Expr<V4<f32>> {
    Expr::new(ErasedExpr::var(&self.weights_a))
  }

  /// Weights of the morph targets 4 to 7.
  pub fn weights_b(&self) -> Expr<V4<f32>> {
    Expr::new(ErasedExpr::var(&self.weights_b))
  }

  /// Weight of the morph target `index`: component `index % 4` of register A below 4, of register B otherwise.
  pub fn weight_component(&self, index: usize) -> Result<Expr<f32>> {
    if index >= MAX_MORPH_WEIGHTS {
      return Err(KslError::CapacityExceeded {
        what: "morph target weight registers".to_owned(),
        requested: index + 1,
        capacity: MAX_MORPH_WEIGHTS,
      });
    }

    let register = if index < 4 { self.weights_a() } else { self.weights_b() };
    register.try_swizzle(["x", "y", "z", "w"][index % 4])
  }
}

impl ShaderListener for MorphWeightData {
  fn on_shader_created(&self, uniforms: &dyn UniformStore) {
    resolve_once(self.weights_a.name(), &self.location_a, uniforms);
    resolve_once(self.weights_b.name(), &self.location_b, uniforms);
  }

  fn on_update(&self, ctx: &dyn DrawContext, uniforms: &mut dyn UniformStore) {
    let Some(weights) = ctx.morph_weights() else {
      return;
    };

    if weights.len() > MAX_MORPH_WEIGHTS {
      warn!(
        weights = weights.len(),
        capacity = MAX_MORPH_WEIGHTS,
        "too many morph weights, extra weights are dropped"
      );
    }

    if let Some(Some(location)) = self.location_a.get() {
      uniforms.write(*location, 0, &weights[..weights.len().min(4)]);
    }

    if let Some(Some(location)) = self.location_b.get() {
      if weights.len() > 4 {
        uniforms.write(*location, 0, &weights[4..weights.len().min(MAX_MORPH_WEIGHTS)]);
      }
    }
  }
}

/// Number of floats one element of a uniform of type `ty` takes.
fn element_floats(ty: &Type) -> usize {
  match ty.prim_ty {
    PrimType::Int(d) | PrimType::UInt(d) | PrimType::Float(d) | PrimType::Bool(d) => d.count(),
    PrimType::Matrix(m) => m.size() * m.size(),
    PrimType::Sampler(_) | PrimType::DepthSampler(_) => Dim::Scalar.count(),
  }
}

/// Host-side uniform storage, zero-initialized.
///
/// Plays the backend role: one slot per uniform, sized after its type. Writes past the end of a slot are clamped.
#[derive(Clone, Debug, Default)]
pub struct HostUniforms {
  slots: IndexMap<Arc<str>, (Type, Vec<f32>)>,
}

impl HostUniforms {
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocate a slot for every uniform of the program.
  pub fn for_program(program: &crate::program::Program) -> Self {
    let mut store = Self::new();

    for uniform in program.uniforms() {
      store.insert(uniform.name(), uniform.ty());
    }

    store
  }

  pub fn insert(&mut self, name: &str, ty: Type) {
    let len = element_floats(&ty) * ty.array_len.unwrap_or(1);
    self.slots.insert(name.into(), (ty, vec![0.; len]));
  }

  /// Drop a slot, as a compiler optimizing an unused uniform away would.
  pub fn without(mut self, name: &str) -> Self {
    self.slots.shift_remove(name);
    self
  }

  pub fn get(&self, name: &str) -> Option<&[f32]> {
    self.slots.get(name).map(|(_, values)| values.as_slice())
  }

  pub fn float4(&self, name: &str) -> Option<[f32; 4]> {
    self.get(name)?.get(..4)?.try_into().ok()
  }

  /// Matrix `index` of a `mat4` uniform array.
  pub fn mat4(&self, name: &str, index: usize) -> Option<M44> {
    let values = self.get(name)?.get(index * 16..index * 16 + 16)?;
    let mut cols = [[0.; 4]; 4];

    for (c, col) in cols.iter_mut().enumerate() {
      col.copy_from_slice(&values[c * 4..c * 4 + 4]);
    }

    Some(crate::types::Matrix(cols))
  }
}

impl UniformStore for HostUniforms {
  fn resolve(&self, name: &str) -> Option<UniformLocation> {
    self.slots.get_index_of(name).map(UniformLocation)
  }

  fn array_len(&self, location: UniformLocation) -> usize {
    self
      .slots
      .get_index(location.0)
      .map_or(0, |(_, (ty, _))| ty.array_len.unwrap_or(1))
  }

  fn write(&mut self, location: UniformLocation, offset: usize, values: &[f32]) {
    let Some((name, (_, slot))) = self.slots.get_index_mut(location.0) else {
      return;
    };

    let end = slot.len().min(offset + values.len());
    if offset < end {
      slot[offset..end].copy_from_slice(&values[..end - offset]);
    }

    trace!(uniform = %name, offset, len = values.len(), "wrote uniform");
  }
}
