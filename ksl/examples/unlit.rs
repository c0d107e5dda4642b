use ksl::{
  blocks::{ColorBlockConfig, ColorSource, MixMode, VertexConfig},
  unlit::{unlit_program, AlphaMode, ColorSpaceConversion, UnlitShaderConfig},
  writer::pseudo::{write_program_to_str, Annotations},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
    .init();

  let cfg = UnlitShaderConfig {
    vertex: VertexConfig {
      is_armature: true,
      ..VertexConfig::default()
    },
    color: ColorBlockConfig::new([
      ColorSource::vertex_color(),
      ColorSource::texture("tBaseColor").with_mix(MixMode::Multiply),
    ]),
    alpha_mode: AlphaMode::Mask { cutoff: 0.5 },
    color_space_conversion: ColorSpaceConversion::SrgbToLinear,
    ..UnlitShaderConfig::default()
  };

  let program = unlit_program(&cfg)?;
  let output = write_program_to_str(&program, Annotations::Dependencies)?;
  println!("{}", output);

  Ok(())
}
