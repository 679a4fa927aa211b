//! Built-in full-screen effect programs.

use glam::{Vec2, Vec3};

use crate::color::srgb_hex;
use crate::program::ShaderProgram;
use crate::uniform::UniformSlot;

pub const COPY: &str = "copy";
pub const FOG_TINT: &str = "fog_tint";
pub const NIGHT_TINT: &str = "night_tint";
pub const BLUR: &str = "blur";
pub const TAA_BLEND: &str = "taa_blend";
pub const FXAA: &str = "fxaa";
pub const LUMINOSITY_HIGH_PASS: &str = "luminosity_high_pass";
pub const SEPARABLE_BLUR: &str = "separable_blur";
pub const BLOOM_COMPOSITE: &str = "bloom_composite";

/// Number of blurred levels the bloom composite reads.
pub const BLOOM_LEVELS: usize = 5;

/// Straight copy of `t_diffuse`.
pub fn copy() -> ShaderProgram {
    ShaderProgram::new(COPY, include_str!("shaders/copy.wgsl")).with_texture("t_diffuse")
}

/// Mixes the frame toward `fog_color` by `1 - plane_fog`.
pub fn fog_tint() -> ShaderProgram {
    ShaderProgram::new(FOG_TINT, include_str!("shaders/fog_tint.wgsl"))
        .with_texture("t_diffuse")
        .with_uniform(UniformSlot::new("fog_color", srgb_hex(0x0044_6677)))
        .with_uniform(UniformSlot::new("plane_fog", 1.0))
}

/// Mixes the frame toward deep blue by `amount`.
pub fn night_tint() -> ShaderProgram {
    ShaderProgram::new(NIGHT_TINT, include_str!("shaders/night_tint.wgsl"))
        .with_texture("t_diffuse")
        .with_uniform(UniformSlot::new("amount", 0.0))
}

pub fn blur() -> ShaderProgram {
    ShaderProgram::new(BLUR, include_str!("shaders/blur.wgsl"))
        .with_texture("t_diffuse")
        .with_uniform(UniformSlot::new("radius", 1.0))
        .with_uniform(UniformSlot::new("resolution", Vec2::ONE))
}

/// Blends `t_current` into `t_accumulated` with weight `alpha`.
pub fn taa_blend() -> ShaderProgram {
    ShaderProgram::new(TAA_BLEND, include_str!("shaders/taa_blend.wgsl"))
        .with_texture("t_current")
        .with_texture("t_accumulated")
        .with_uniform(UniformSlot::new("alpha", 0.1))
}

pub fn fxaa() -> ShaderProgram {
    ShaderProgram::new(FXAA, include_str!("shaders/fxaa.wgsl"))
        .with_texture("t_diffuse")
        .with_uniform(UniformSlot::new("inverse_resolution", Vec2::ONE))
}

pub fn luminosity_high_pass() -> ShaderProgram {
    ShaderProgram::new(
        LUMINOSITY_HIGH_PASS,
        include_str!("shaders/luminosity_high_pass.wgsl"),
    )
    .with_texture("t_diffuse")
    .with_uniform(UniformSlot::new("threshold", 0.8))
    .with_uniform(UniformSlot::new("smooth_width", 0.01))
}

/// One direction of a gaussian blur; run twice per bloom level.
pub fn separable_blur() -> ShaderProgram {
    ShaderProgram::new(SEPARABLE_BLUR, include_str!("shaders/separable_blur.wgsl"))
        .with_texture("t_diffuse")
        .with_uniform(UniformSlot::new("direction", Vec2::X))
        .with_uniform(UniformSlot::new("texel_size", Vec2::ONE))
        .with_uniform(UniformSlot::new("kernel_radius", 3.0))
        .with_uniform(UniformSlot::new("sigma", 3.0))
}

pub fn bloom_composite() -> ShaderProgram {
    let mut program =
        ShaderProgram::new(BLOOM_COMPOSITE, include_str!("shaders/bloom_composite.wgsl"))
            .with_texture("t_diffuse");
    for level in 0..BLOOM_LEVELS {
        program = program.with_texture(format!("t_bloom_{level}"));
    }
    program
        .with_uniform(UniformSlot::new("strength", 1.0))
        .with_uniform(UniformSlot::new("radius", 0.7))
}

/// Every built-in program, in registration order.
pub fn builtin_programs() -> Vec<ShaderProgram> {
    vec![
        copy(),
        fog_tint(),
        night_tint(),
        blur(),
        taa_blend(),
        fxaa(),
        luminosity_high_pass(),
        separable_blur(),
        bloom_composite(),
    ]
}

/// CPU form of the night tint.
pub fn night_tint_color(color: Vec3, amount: f32) -> Vec3 {
    color.lerp(Vec3::new(0.0, 0.0, 0.2), amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ShaderRegistry;

    #[test]
    fn test_every_builtin_validates() {
        for program in builtin_programs() {
            if let Err(e) = program.validate() {
                panic!("{} failed: {e}", program.id());
            }
        }
    }

    #[test]
    fn test_registry_holds_all_builtins() {
        let registry = ShaderRegistry::with_builtin_effects().unwrap();
        assert_eq!(registry.len(), 9);
        for id in [
            COPY,
            FOG_TINT,
            NIGHT_TINT,
            BLUR,
            TAA_BLEND,
            FXAA,
            LUMINOSITY_HIGH_PASS,
            SEPARABLE_BLUR,
            BLOOM_COMPOSITE,
        ] {
            assert!(registry.contains(id), "missing {id}");
        }
    }

    #[test]
    fn test_taa_blend_texture_order() {
        let program = taa_blend();
        assert_eq!(program.textures(), ["t_current", "t_accumulated"]);
        assert_eq!(program.uniform_binding(), Some(3));
    }

    #[test]
    fn test_bloom_composite_reads_every_level() {
        let program = bloom_composite();
        assert_eq!(program.textures().len(), 1 + BLOOM_LEVELS);
    }

    #[test]
    fn test_night_tint_extremes() {
        let c = Vec3::new(1.0, 0.5, 0.25);
        assert_eq!(night_tint_color(c, 0.0), c);
        assert!(night_tint_color(c, 1.0).distance(Vec3::new(0.0, 0.0, 0.2)) < 1e-6);
    }
}
