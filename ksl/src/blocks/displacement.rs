//! Scalar vertex properties, such as the displacement along the normal.

use crate::{
  block::{BlockBuilder, BlockKind},
  blocks::MixMode,
  error::{KslError, Result},
  lit,
  stdlib::Texture,
  types::{Sampler2D, V2},
  var::Var,
};

/// Where a property value comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertySourceKind {
  Constant(f32),
  Uniform(String),
  VertexAttribute(String),
  /// One channel of a 2D texture, sampled at the base level with the given `float2` texture coordinate attribute.
  Texture {
    sampler: String,
    coord_attribute: String,
    channel: usize,
  },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertySource {
  pub kind: PropertySourceKind,
  pub mix: MixMode,
}

impl PropertySource {
  pub fn constant(value: f32) -> Self {
    PropertySourceKind::Constant(value).into()
  }

  pub fn uniform(name: impl Into<String>) -> Self {
    PropertySourceKind::Uniform(name.into()).into()
  }

  pub fn vertex_attribute(name: impl Into<String>) -> Self {
    PropertySourceKind::VertexAttribute(name.into()).into()
  }

  pub fn texture(sampler: impl Into<String>, coord_attribute: impl Into<String>, channel: usize) -> Self {
    PropertySourceKind::Texture {
      sampler: sampler.into(),
      coord_attribute: coord_attribute.into(),
      channel,
    }
    .into()
  }

  pub fn with_mix(self, mix: MixMode) -> Self {
    Self { mix, ..self }
  }
}

impl From<PropertySourceKind> for PropertySource {
  fn from(kind: PropertySourceKind) -> Self {
    Self {
      kind,
      mix: MixMode::Set,
    }
  }
}

/// Sources of a scalar property, applied in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyConfig {
  pub sources: Vec<PropertySource>,
}

impl PropertyConfig {
  /// Whether the property is always `value`, making it pointless to compute.
  pub fn is_empty_or_const(&self, value: f32) -> bool {
    match self.sources.as_slice() {
      [] => true,
      [source] => source.kind == PropertySourceKind::Constant(value),
      _ => false,
    }
  }
}

/// Compute a scalar vertex property from its sources.
#[derive(Debug)]
pub struct DisplacementBlock<'a> {
  pub cfg: &'a PropertyConfig,
}

impl BlockKind for DisplacementBlock<'_> {
  type Outputs = Var<f32>;

  const NAME: &'static str = "displacementBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    let out = b.output::<f32>("outProperty")?;
    let property = b.var(lit!(0f32));

    for source in &self.cfg.sources {
      let value = match &source.kind {
        PropertySourceKind::Constant(value) => lit!(*value),
        PropertySourceKind::Uniform(name) => b.stage().uniform::<f32>(name)?,
        PropertySourceKind::VertexAttribute(name) => b.stage().vertex_attrib::<f32>(name)?,
        PropertySourceKind::Texture {
          sampler,
          coord_attribute,
          channel,
        } => {
          let tex = b.stage().uniform::<Sampler2D>(sampler)?;
          let coord = b.stage().vertex_attrib::<V2<f32>>(coord_attribute)?;
          let mask = ["x", "y", "z", "w"]
            .get(*channel)
            .ok_or_else(|| KslError::IndexOutOfRange {
              op: "texture channel".to_owned(),
              index: *channel,
              len: 4,
            })?;

          tex.sample_lod(coord, 0.).try_swizzle::<f32>(mask)?
        }
      };

      b.set(&property, source.mix.mutate_op(), value)?;
    }

    b.set(&out, None, &property)?;
    Ok(out)
  }
}
