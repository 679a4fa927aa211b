//! Shader programs and the program registry.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{NightfogError, Result};
use crate::uniform::{UniformLayout, UniformSlot, UniformValues};

/// Vertex stage shared by every full-screen program: one oversized triangle
/// covering the viewport, with uv (0,0) at the top-left.
pub const FULLSCREEN_VERTEX: &str = include_str!("shaders/fullscreen.wgsl");

/// Name of the generated uniform struct.
pub const PARAMS_STRUCT: &str = "Params";

/// A full-screen effect program.
///
/// The binding header is generated from the declaration: the sampler at
/// binding 0, sampled textures at `1..=n`, and the `Params` uniform block at
/// `n + 1` when the program declares any uniforms.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    id: String,
    vertex_source: Cow<'static, str>,
    fragment_source: Cow<'static, str>,
    textures: Vec<String>,
    uniforms: Vec<UniformSlot>,
}

impl ShaderProgram {
    /// Starts a program with the full-screen vertex stage.
    pub fn new(id: impl Into<String>, fragment_source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            vertex_source: Cow::Borrowed(FULLSCREEN_VERTEX),
            fragment_source: fragment_source.into(),
            textures: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    /// Replaces the vertex stage.
    pub fn with_vertex(mut self, source: impl Into<Cow<'static, str>>) -> Self {
        self.vertex_source = source.into();
        self
    }

    /// Declares a sampled texture. Textures bind in declaration order.
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.textures.push(name.into());
        self
    }

    /// Declares a uniform with its default value.
    pub fn with_uniform(mut self, slot: UniformSlot) -> Self {
        self.uniforms.push(slot);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn textures(&self) -> &[String] {
        &self.textures
    }

    pub fn uniforms(&self) -> &[UniformSlot] {
        &self.uniforms
    }

    pub fn layout(&self) -> UniformLayout {
        UniformLayout::new(&self.uniforms)
    }

    /// Fresh values initialised from the declared defaults.
    pub fn default_values(&self) -> UniformValues {
        UniformValues::from_defaults(&self.uniforms)
    }

    pub fn sampler_binding() -> u32 {
        0
    }

    pub fn texture_binding(index: usize) -> u32 {
        index as u32 + 1
    }

    /// Binding of the `Params` block, if the program has uniforms.
    pub fn uniform_binding(&self) -> Option<u32> {
        (!self.uniforms.is_empty()).then(|| Self::texture_binding(self.textures.len()))
    }

    /// Generated binding declarations.
    pub fn header(&self) -> String {
        let mut out = format!(
            "@group(0) @binding({}) var input_sampler: sampler;\n",
            Self::sampler_binding()
        );
        for (i, name) in self.textures.iter().enumerate() {
            out.push_str(&format!(
                "@group(0) @binding({}) var {name}: texture_2d<f32>;\n",
                Self::texture_binding(i)
            ));
        }
        if let Some(binding) = self.uniform_binding() {
            out.push_str(&self.layout().wgsl_struct(PARAMS_STRUCT));
            out.push_str(&format!(
                "@group(0) @binding({binding}) var<uniform> params: {PARAMS_STRUCT};\n"
            ));
        }
        out
    }

    /// Complete WGSL module: header, vertex stage, fragment stage.
    pub fn module_source(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.header(),
            self.vertex_source,
            self.fragment_source
        )
    }

    /// Parses and validates the assembled module.
    pub fn validate(&self) -> Result<()> {
        validate_wgsl(&self.id, &self.module_source())
    }
}

/// Parses and validates a WGSL module with naga.
pub fn validate_wgsl(label: &str, source: &str) -> Result<()> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| NightfogError::ShaderValidation {
            label: label.to_string(),
            message: e.emit_to_string(source),
        })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| NightfogError::ShaderValidation {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;
    Ok(())
}

/// Registered shader programs, immutable once added.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    programs: BTreeMap<String, Arc<ShaderProgram>>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in effect.
    pub fn with_builtin_effects() -> Result<Self> {
        let mut registry = Self::new();
        for program in crate::effects::builtin_programs() {
            registry.register(program)?;
        }
        Ok(registry)
    }

    /// Validates and adds a program.
    pub fn register(&mut self, program: ShaderProgram) -> Result<Arc<ShaderProgram>> {
        if self.programs.contains_key(program.id()) {
            return Err(NightfogError::ProgramExists(program.id().to_string()));
        }
        program.validate()?;
        log::debug!("registered shader program '{}'", program.id());
        let program = Arc::new(program);
        self.programs
            .insert(program.id().to_string(), Arc::clone(&program));
        Ok(program)
    }

    pub fn get(&self, id: &str) -> Result<Arc<ShaderProgram>> {
        self.programs
            .get(id)
            .cloned()
            .ok_or_else(|| NightfogError::ProgramNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.programs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const PASSTHROUGH: &str = "@fragment\nfn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {\n    return textureSampleLevel(t_input, input_sampler, in.uv, 0.0);\n}\n";

    #[test]
    fn test_header_bindings() {
        let program = ShaderProgram::new("test", PASSTHROUGH)
            .with_texture("t_input")
            .with_texture("t_other")
            .with_uniform(UniformSlot::new("amount", 0.0));
        let header = program.header();
        assert!(header.contains("@binding(0) var input_sampler: sampler;"));
        assert!(header.contains("@binding(1) var t_input: texture_2d<f32>;"));
        assert!(header.contains("@binding(2) var t_other: texture_2d<f32>;"));
        assert!(header.contains("@binding(3) var<uniform> params: Params;"));
        assert_eq!(program.uniform_binding(), Some(3));
    }

    #[test]
    fn test_no_uniform_block_without_uniforms() {
        let program = ShaderProgram::new("copy", PASSTHROUGH).with_texture("t_input");
        assert_eq!(program.uniform_binding(), None);
        assert!(!program.header().contains("Params"));
        program.validate().unwrap();
    }

    #[test]
    fn test_invalid_program_is_rejected() {
        let program = ShaderProgram::new("broken", "@fragment fn fs_main( {");
        let err = program.validate().unwrap_err();
        assert!(matches!(err, NightfogError::ShaderValidation { .. }));
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = ShaderRegistry::new();
        let program = ShaderProgram::new("copy", PASSTHROUGH).with_texture("t_input");
        registry.register(program.clone()).unwrap();
        assert!(matches!(
            registry.register(program),
            Err(NightfogError::ProgramExists(_))
        ));
    }

    #[test]
    fn test_register_rejects_invalid_source() {
        let mut registry = ShaderRegistry::new();
        let program = ShaderProgram::new("broken", "not wgsl");
        assert!(registry.register(program).is_err());
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_missing_program() {
        let registry = ShaderRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(NightfogError::ProgramNotFound(_))
        ));
    }

    #[test]
    fn test_default_values_follow_declaration() {
        let program = ShaderProgram::new("tint", PASSTHROUGH)
            .with_uniform(UniformSlot::new("tint", Vec3::new(0.0, 0.0, 1.0)));
        let values = program.default_values();
        assert_eq!(
            values.get("tint"),
            Some(crate::UniformValue::Vec3(Vec3::new(0.0, 0.0, 1.0)))
        );
    }
}
