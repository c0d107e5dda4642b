use ksl::{
  blocks::{ColorBlockConfig, ColorSource, MixMode, PropertyConfig, PropertySource, VertexConfig},
  data::{DataBlockKind, DrawCommand, HostUniforms, MORPH_WEIGHTS_A_UNIFORM},
  stage::StageKind,
  types::V4,
  unlit::{unlit_program, AlphaMode, UnlitShaderConfig, COLOR_OUTPUT, VIEW_PROJ_UNIFORM},
  writer::pseudo::{write_program_to_str, Annotations},
};

fn textured() -> UnlitShaderConfig {
  UnlitShaderConfig {
    vertex: VertexConfig {
      is_armature: true,
      max_bones: 8,
      morph_attributes: vec!["attrib_positions_morph_0".to_owned()],
      displacement: PropertyConfig {
        sources: vec![PropertySource::uniform("uDisplacement")],
      },
      ..VertexConfig::default()
    },
    color: ColorBlockConfig::new([
      ColorSource::constant(V4([1., 0.5, 0.25, 1.])),
      ColorSource::texture("tBaseColor").with_mix(MixMode::Multiply),
    ]),
    alpha_mode: AlphaMode::Mask { cutoff: 0.5 },
    has_normals: true,
    ..UnlitShaderConfig::default()
  }
}

#[test]
fn renders_both_stages() {
  let program = unlit_program(&UnlitShaderConfig::default()).unwrap();
  let code = write_program_to_str(&program, Annotations::None).unwrap();

  assert!(code.starts_with("program unlit\n"));
  assert!(code.contains(&format!("uniform mat4 {};\n", VIEW_PROJ_UNIFORM)));
  assert!(code.contains("vertex stage {\n"));
  assert!(code.contains("fragment stage {\n"));
  assert!(code.contains(&format!("out float4 {};\n", COLOR_OUTPUT)));
  assert!(code.contains("(vertexBlock)"));
  assert!(code.contains("(colorBlock)"));
  assert!(!code.contains("discard"));
}

#[test]
fn full_featured_program() {
  let program = unlit_program(&textured()).unwrap();

  assert!(program.data_block(DataBlockKind::Armature).is_some());
  assert!(program.data_block(DataBlockKind::MorphWeights).is_some());
  assert_eq!(program.shader_listeners().len(), 2);

  let uniforms: Vec<_> = program.uniforms().map(|var| var.name()).collect();
  assert!(uniforms.contains(&"uDisplacement"));
  assert!(uniforms.contains(&"tBaseColor"));

  let inter_stage: Vec<_> = program.inter_stage().map(|var| var.name()).collect();
  assert_eq!(inter_stage, ["v_attrib_texture_coords"]);

  let vertex = program.stage(StageKind::Vertex).unwrap();
  for attribute in ["attrib_positions", "attrib_normals", "attrib_tangents", "attrib_joints", "attrib_weights"] {
    assert!(
      vertex.attributes().iter().any(|attr| attr.name() == attribute),
      "missing {}",
      attribute
    );
  }

  let code = write_program_to_str(&program, Annotations::Dependencies).unwrap();
  assert!(code.contains("(armatureBlock)"));
  assert!(code.contains("(morphBlock)"));
  assert!(code.contains("(displacementBlock)"));
  assert!(code.contains("discard;"));
  assert_eq!(code, write_program_to_str(&program, Annotations::Dependencies).unwrap());
}

#[test]
fn listeners_feed_the_compiled_program() {
  let program = unlit_program(&textured()).unwrap();

  let mut uniforms = HostUniforms::for_program(&program);
  program.on_shader_created(&uniforms);
  program.on_update(
    &DrawCommand {
      joint_transforms: None,
      morph_weights: Some(vec![0.75]),
    },
    &mut uniforms,
  );

  assert_eq!(uniforms.float4(MORPH_WEIGHTS_A_UNIFORM), Some([0.75, 0., 0., 0.]));
}
