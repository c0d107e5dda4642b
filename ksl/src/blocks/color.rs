//! Fragment colors.
//!
//! A color is computed in the fragment stage by [`ColorBlock`] from a list of sources. Sources depending on vertex
//! attributes (vertex colors, texture coordinates) read inter-stage values, written in the vertex stage by
//! [`ColorVertexBlock`].

use crate::{
  block::{BlockBuilder, BlockKind},
  blocks::{inter_stage_name, MixMode, COLORS, TEXTURE_COORDS},
  error::{KslError, Result},
  expr::{ErasedExpr, Expr},
  stage::StageKind,
  stdlib::Texture,
  types::{Sampler2D, ToType, Type, V2, V4},
  var::{StateKind, Var},
};
use rustc_hash::FxHashSet;

#[derive(Clone, Debug, PartialEq)]
pub enum ColorSourceKind {
  Constant(V4<f32>),
  Uniform(String),
  /// Per-vertex color attribute, interpolated.
  VertexColor { attribute: String },
  /// 2D texture sampled at the interpolated texture coordinate attribute.
  Texture { sampler: String, coord_attribute: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorSource {
  pub kind: ColorSourceKind,
  pub mix: MixMode,
}

impl ColorSource {
  pub fn constant(color: impl Into<V4<f32>>) -> Self {
    ColorSourceKind::Constant(color.into()).into()
  }

  pub fn uniform(name: impl Into<String>) -> Self {
    ColorSourceKind::Uniform(name.into()).into()
  }

  /// Vertex colors from the [`COLORS`] attribute.
  pub fn vertex_color() -> Self {
    ColorSourceKind::VertexColor {
      attribute: COLORS.to_owned(),
    }
    .into()
  }

  /// Texture sampled with the [`TEXTURE_COORDS`] attribute.
  pub fn texture(sampler: impl Into<String>) -> Self {
    ColorSourceKind::Texture {
      sampler: sampler.into(),
      coord_attribute: TEXTURE_COORDS.to_owned(),
    }
    .into()
  }

  pub fn with_mix(self, mix: MixMode) -> Self {
    Self { mix, ..self }
  }

  /// Vertex attribute the source depends on, with its type.
  fn vertex_attribute(&self) -> Option<(&str, Type)> {
    match &self.kind {
      ColorSourceKind::VertexColor { attribute } => Some((attribute.as_str(), V4::<f32>::ty())),
      ColorSourceKind::Texture { coord_attribute, .. } => Some((coord_attribute.as_str(), V2::<f32>::ty())),
      _ => None,
    }
  }
}

impl From<ColorSourceKind> for ColorSource {
  fn from(kind: ColorSourceKind) -> Self {
    Self {
      kind,
      mix: MixMode::Set,
    }
  }
}

/// Sources of a color, applied in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorBlockConfig {
  pub sources: Vec<ColorSource>,
}

impl ColorBlockConfig {
  pub fn new(sources: impl IntoIterator<Item = ColorSource>) -> Self {
    Self {
      sources: sources.into_iter().collect(),
    }
  }
}

/// Pass the vertex attributes a color depends on to the fragment stage.
#[derive(Debug)]
pub struct ColorVertexBlock<'a> {
  pub cfg: &'a ColorBlockConfig,
}

impl BlockKind for ColorVertexBlock<'_> {
  type Outputs = ();

  const NAME: &'static str = "colorVertexBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<()> {
    let mut passed = FxHashSet::default();

    for (attribute, ty) in self.cfg.sources.iter().filter_map(ColorSource::vertex_attribute) {
      if !passed.insert(attribute) {
        continue;
      }

      let stage = b.stage();
      let value = stage.declare_attribute(attribute, ty, StateKind::VertexAttribute)?;
      let inter_stage = stage.program.declare_inter_stage(&inter_stage_name(attribute), ty)?;

      b.assign(ErasedExpr::var(&inter_stage), ErasedExpr::var(&value))?;
    }

    Ok(())
  }
}

/// Compute a color from its sources.
#[derive(Debug)]
pub struct ColorBlock<'a> {
  pub cfg: &'a ColorBlockConfig,
}

impl BlockKind for ColorBlock<'_> {
  type Outputs = Var<V4<f32>>;

  const NAME: &'static str = "colorBlock";

  fn build(self, b: &mut BlockBuilder) -> Result<Self::Outputs> {
    if b.stage_kind() != StageKind::Fragment {
      return Err(KslError::StageMismatch {
        item: "color block".to_owned(),
        expected: StageKind::Fragment.to_string(),
        found: b.stage_kind().to_string(),
      });
    }

    let out = b.output::<V4<f32>>("outColor")?;
    let color = b.var(Expr::from(V4([0., 0., 0., 0.])));

    for source in &self.cfg.sources {
      let value = match &source.kind {
        ColorSourceKind::Constant(c) => Expr::from(*c),
        ColorSourceKind::Uniform(name) => b.stage().uniform::<V4<f32>>(name)?,
        ColorSourceKind::VertexColor { attribute } => {
          b.stage().inter_stage::<V4<f32>>(&inter_stage_name(attribute))?.to_expr()
        }
        ColorSourceKind::Texture {
          sampler,
          coord_attribute,
        } => {
          let tex = b.stage().uniform::<Sampler2D>(sampler)?;
          let coord = b.stage().inter_stage::<V2<f32>>(&inter_stage_name(coord_attribute))?;
          tex.sample(&coord)
        }
      };

      b.set(&color, source.mix.mutate_op(), value)?;
    }

    b.set(&out, None, &color)?;
    Ok(out)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{error::ErrorKind, program::Program, stmt::StatementKind};

  fn cfg() -> ColorBlockConfig {
    ColorBlockConfig::new([
      ColorSource::texture("tBaseColor"),
      ColorSource::vertex_color().with_mix(MixMode::Multiply),
      ColorSource::uniform("uTint").with_mix(MixMode::Multiply),
    ])
  }

  #[test]
  fn vertex_attributes_are_passed_once() {
    let cfg = ColorBlockConfig::new([
      ColorSource::vertex_color(),
      ColorSource::vertex_color().with_mix(MixMode::Add),
    ]);
    let mut program = Program::new("color");

    program
      .vertex_stage(|stage| stage.main(|s| s.block(ColorVertexBlock { cfg: &cfg })))
      .unwrap();

    let vertex = program.stage(StageKind::Vertex).unwrap();
    assert_eq!(vertex.attributes().len(), 1);
    assert_eq!(program.inter_stage().count(), 1);
  }

  #[test]
  fn color_from_sources() {
    let cfg = cfg();
    let mut program = Program::new("color");

    program
      .vertex_stage(|stage| stage.main(|s| s.block(ColorVertexBlock { cfg: &cfg })))
      .unwrap();
    program
      .fragment_stage(|stage| {
        let frag_color = stage.fragment_output::<V4<f32>>("fragColor")?;
        stage.main(|s| {
          let color = s.block(ColorBlock { cfg: &cfg })?;
          s.set(&frag_color, None, &color)
        })
      })
      .unwrap();

    assert_eq!(program.inter_stage().count(), 2);
    assert!(program.uniform("tBaseColor").is_some());

    let main = program.stage(StageKind::Fragment).unwrap().main().unwrap();
    let stmts = main.scope().statements();
    let StatementKind::Block(block) = stmts[0].kind() else {
      panic!("block expected");
    };

    // the block reads the interpolated values and the uniforms
    assert!(stmts[0].reads().contains_name("v_attrib_colors"));
    assert!(stmts[0].reads().contains_name("uTint"));
    assert_eq!(block.body().statements().len(), 5);
  }

  #[test]
  fn colors_need_the_fragment_stage() {
    let cfg = cfg();
    let mut program = Program::new("color");

    let err = program
      .vertex_stage(|stage| {
        stage.main(|s| {
          s.block(ColorBlock { cfg: &cfg })?;
          Ok(())
        })
      })
      .unwrap_err();

    assert!(matches!(err, KslError::StageMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::IllegalControlFlow);
  }
}
