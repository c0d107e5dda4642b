//! Unlit shader.
//!
//! A complete two-stage program: vertices are transformed to world space and projected with the camera
//! view-projection matrix; fragments get their color from a [`ColorBlockConfig`], without any lighting.

use crate::{
  blocks::{
    ColorBlock, ColorBlockConfig, ColorSource, ColorVertexBlock, VertexConfig, VertexTransformBlock, NORMALS,
    POSITIONS, TANGENTS,
  },
  error::Result,
  expr::Expr,
  program::Program,
  stdlib::Exponential,
  swizzle::{HasW, HasXYZ},
  types::{M44, V3, V4},
  vec4,
};
use tracing::debug;

/// Camera view-projection matrix.
pub const VIEW_PROJ_UNIFORM: &str = "uViewProjMat";

/// Model matrix of the drawn mesh.
pub const MODEL_MAT_UNIFORM: &str = "uModelMat";

/// Fragment color output.
pub const COLOR_OUTPUT: &str = "fragColor";

/// Base color uniform used by [`UnlitShaderConfig::default`].
pub const BASE_COLOR_UNIFORM: &str = "uBaseColor";

/// How the alpha channel of the color is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AlphaMode {
  #[default]
  Blend,
  /// Alpha is forced to one.
  Opaque,
  /// Fragments with an alpha below the cutoff are discarded.
  Mask { cutoff: f32 },
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ColorSpaceConversion {
  #[default]
  AsIs,
  SrgbToLinear,
  LinearToSrgb,
}

impl ColorSpaceConversion {
  fn gamma(self) -> Option<f32> {
    match self {
      ColorSpaceConversion::AsIs => None,
      ColorSpaceConversion::SrgbToLinear => Some(2.2),
      ColorSpaceConversion::LinearToSrgb => Some(1. / 2.2),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnlitShaderConfig {
  pub vertex: VertexConfig,
  pub color: ColorBlockConfig,
  pub alpha_mode: AlphaMode,
  pub premultiplied_alpha: bool,
  pub color_space_conversion: ColorSpaceConversion,
  /// Read normals and tangents from the [`NORMALS`] and [`TANGENTS`] attributes.
  pub has_normals: bool,
}

impl Default for UnlitShaderConfig {
  fn default() -> Self {
    Self {
      vertex: VertexConfig::default(),
      color: ColorBlockConfig::new([ColorSource::uniform(BASE_COLOR_UNIFORM)]),
      alpha_mode: AlphaMode::default(),
      premultiplied_alpha: false,
      color_space_conversion: ColorSpaceConversion::default(),
      has_normals: false,
    }
  }
}

/// Build the unlit program described by `cfg`.
pub fn unlit_program(cfg: &UnlitShaderConfig) -> Result<Program> {
  let mut program = Program::new("unlit");

  program.vertex_stage(|stage| {
    let view_proj = stage.uniform::<M44>(VIEW_PROJ_UNIFORM)?;
    let model_mat = stage.uniform::<M44>(MODEL_MAT_UNIFORM)?;
    let position = stage.vertex_attrib::<V3<f32>>(POSITIONS)?;
    let (normal, tangent) = if cfg.has_normals {
      (
        Some(stage.vertex_attrib::<V3<f32>>(NORMALS)?),
        Some(stage.vertex_attrib::<V4<f32>>(TANGENTS)?),
      )
    } else {
      (None, None)
    };
    let out_position = stage.position()?;

    stage.main(|s| {
      let transformed = s.block(VertexTransformBlock {
        cfg: &cfg.vertex,
        model_mat,
        position,
        normal,
        tangent,
      })?;
      s.block(ColorVertexBlock { cfg: &cfg.color })?;

      let world_pos: Expr<V4<f32>> = vec4!(transformed.world_pos, 1.);
      s.set(&out_position, None, view_proj * world_pos)
    })
  })?;

  program.fragment_stage(|stage| {
    let frag_color = stage.fragment_output::<V4<f32>>(COLOR_OUTPUT)?;

    stage.main(|s| {
      let color = s.block(ColorBlock { cfg: &cfg.color })?;
      let base_color = s.var(&color);

      match cfg.alpha_mode {
        AlphaMode::Blend => (),
        AlphaMode::Opaque => s.set(base_color.a(), None, 1f32)?,
        AlphaMode::Mask { cutoff } => {
          s.when(base_color.a().lt(cutoff), |s| s.discard())?;
        }
      }

      let rgb = s.var(base_color.rgb());

      if cfg.premultiplied_alpha {
        s.set(&rgb, None, &rgb * base_color.a())?;
      }

      if let Some(gamma) = cfg.color_space_conversion.gamma() {
        s.set(&rgb, None, rgb.pow(vec3_splat(gamma)))?;
      }

      let color: Expr<V4<f32>> = vec4!(rgb, base_color.a());
      s.set(&frag_color, None, color)
    })
  })?;

  debug!(
    alpha_mode = ?cfg.alpha_mode,
    premultiplied_alpha = cfg.premultiplied_alpha,
    "built unlit program"
  );

  Ok(program)
}

fn vec3_splat(value: f32) -> V3<f32> {
  V3([value; 3])
}
