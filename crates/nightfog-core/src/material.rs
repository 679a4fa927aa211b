//! Surface materials and the fog-material compiler.
//!
//! Every scene material is the standard surface template, optionally patched
//! with plane fog: a falloff above each clipping plane that pulls the final
//! color toward the fog color. Compiled materials are cached by the exact
//! tuple of their inputs, so meshes with identical appearance share one
//! shader.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::color_bits;
use crate::config::{Appearance, FogConfig};
use crate::error::Result;
use crate::program::validate_wgsl;
use crate::template::{InjectionSlot, ShaderTemplate, SlotPatch};
use crate::uniform::{UniformLayout, UniformSlot, UniformValues};

/// Name of the injected uniform struct.
pub const MATERIAL_PARAMS_STRUCT: &str = "MaterialParams";

/// Depth offset per unit of draw order, in normalized device depth.
pub const DEPTH_OFFSET_PER_DRAW_ORDER: f32 = 2.0e-6;

const STANDARD_METALNESS: f32 = 0.5;
const STANDARD_ROUGHNESS: f32 = 0.75;

/// Which faces a material draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Depth bias applied while rasterizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

/// Blend and depth state of a material.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderState {
    pub transparent: bool,
    pub depth_write: bool,
    pub depth_test: bool,
    pub polygon_offset: Option<PolygonOffset>,
}

impl RenderState {
    /// Transparent, depth-writing, depth-tested, offset by one.
    pub fn fog() -> Self {
        Self {
            transparent: true,
            depth_write: true,
            depth_test: true,
            polygon_offset: Some(PolygonOffset {
                factor: 1.0,
                units: 1.0,
            }),
        }
    }

    pub fn opaque() -> Self {
        Self {
            transparent: false,
            depth_write: true,
            depth_test: true,
            polygon_offset: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FogKey {
    depth: u32,
    color: [u32; 3],
}

/// Cache key: the exact inputs of a compile, floats by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    fog: Option<FogKey>,
    base_color: [u32; 3],
    side: Side,
}

impl MaterialKey {
    pub fn fog(base_color: Vec3, side: Side, fog_height: f32, fog_color: Vec3) -> Self {
        Self {
            fog: Some(FogKey {
                depth: fog_height.to_bits(),
                color: color_bits(fog_color),
            }),
            base_color: color_bits(base_color),
            side,
        }
    }

    pub fn base(base_color: Vec3, side: Side) -> Self {
        Self {
            fog: None,
            base_color: color_bits(base_color),
            side,
        }
    }
}

/// A compiled surface material, shared between meshes of equal key.
#[derive(Debug)]
pub struct Material {
    key: MaterialKey,
    label: String,
    source: String,
    uniforms: Vec<UniformSlot>,
    pub base_color: Vec3,
    pub side: Side,
    pub metalness: f32,
    pub roughness: f32,
    pub state: RenderState,
}

impl Material {
    pub fn key(&self) -> MaterialKey {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Assembled WGSL for the whole pipeline.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Injected uniforms; empty for unpatched materials.
    pub fn uniforms(&self) -> &[UniformSlot] {
        &self.uniforms
    }

    pub fn has_fog(&self) -> bool {
        self.key.fog.is_some()
    }

    pub fn uniform_values(&self) -> UniformValues {
        UniformValues::from_defaults(&self.uniforms)
    }
}

/// A mesh's use of a shared material.
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    pub material: Arc<Material>,
    pub opacity: f32,
    /// Emissive radiance, intensity already applied.
    pub emissive: Vec3,
    pub draw_order: u32,
}

impl MaterialInstance {
    /// Depth pulled toward the camera, growing with draw order so later
    /// surfaces win over near-coplanar earlier ones.
    pub fn depth_offset(&self) -> f32 {
        match self.material.state.polygon_offset {
            Some(offset) => self.draw_order as f32 * offset.units * DEPTH_OFFSET_PER_DRAW_ORDER,
            None => 0.0,
        }
    }
}

/// Builds and caches surface materials.
#[derive(Debug)]
pub struct FogMaterialCompiler {
    template: ShaderTemplate,
    cache: HashMap<MaterialKey, Arc<Material>>,
}

impl FogMaterialCompiler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: ShaderTemplate::standard_surface()?,
            cache: HashMap::new(),
        })
    }

    /// Number of distinct materials built so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// A fog-patched material. Equal arguments return the same instance.
    pub fn compile(
        &mut self,
        base_color: Vec3,
        side: Side,
        fog_height: f32,
        fog_color: Vec3,
    ) -> Result<Arc<Material>> {
        let key = MaterialKey::fog(base_color, side, fog_height, fog_color);
        if let Some(material) = self.cache.get(&key) {
            return Ok(Arc::clone(material));
        }

        let uniforms = vec![
            UniformSlot::new("fog_depth", fog_height),
            UniformSlot::new("fog_color", fog_color),
        ];
        let declarations = format!(
            "{}{}",
            UniformLayout::new(&uniforms).wgsl_struct(MATERIAL_PARAMS_STRUCT),
            include_str!("shaders/fog_declarations.wgsl")
        );
        let patches = [
            SlotPatch::append(InjectionSlot::Declarations, declarations),
            SlotPatch::replace(
                InjectionSlot::ClippingPlanes,
                include_str!("shaders/fog_clipping.wgsl"),
            ),
            SlotPatch::append(
                InjectionSlot::FogFragment,
                include_str!("shaders/fog_fragment.wgsl"),
            ),
        ];
        let label = format!("fog_surface_{}", self.cache.len());
        let source = self.template.assemble(&patches)?;
        self.build(key, label, source, uniforms, base_color, side, RenderState::fog())
    }

    /// The unpatched standard material. Cached like [`Self::compile`].
    pub fn compile_base(&mut self, base_color: Vec3, side: Side) -> Result<Arc<Material>> {
        let key = MaterialKey::base(base_color, side);
        if let Some(material) = self.cache.get(&key) {
            return Ok(Arc::clone(material));
        }
        let label = format!("surface_{}", self.cache.len());
        let source = self.template.assemble(&[])?;
        self.build(
            key,
            label,
            source,
            Vec::new(),
            base_color,
            side,
            RenderState::opaque(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        key: MaterialKey,
        label: String,
        source: String,
        uniforms: Vec<UniformSlot>,
        base_color: Vec3,
        side: Side,
        state: RenderState,
    ) -> Result<Arc<Material>> {
        validate_wgsl(&label, &source)?;
        log::debug!("compiled material '{label}' ({side:?})");
        let material = Arc::new(Material {
            key,
            label,
            source,
            uniforms,
            base_color,
            side,
            metalness: STANDARD_METALNESS,
            roughness: STANDARD_ROUGHNESS,
            state,
        });
        self.cache.insert(key, Arc::clone(&material));
        Ok(material)
    }

    /// Resolves a mesh's appearance to a fogged front-face material.
    ///
    /// A missing appearance falls back to [`Appearance::fallback`] with a
    /// warning rather than failing.
    pub fn assign_material(
        &mut self,
        mesh_id: &str,
        appearance: Option<&Appearance>,
        draw_order: u32,
        fog: &FogConfig,
    ) -> Result<MaterialInstance> {
        let appearance = if let Some(a) = appearance {
            *a
        } else {
            log::warn!("mesh '{mesh_id}' has no appearance, using the default");
            Appearance::fallback()
        };
        let material = self.compile(appearance.color, Side::Front, fog.height, fog.color)?;
        Ok(MaterialInstance {
            material,
            opacity: appearance.opacity,
            emissive: appearance.emissive.map_or(Vec3::ZERO, |e| e.radiance()),
            draw_order,
        })
    }
}

/// Fog visibility above a clipping plane: 0 at the plane, 1 at `fog_depth`
/// above it. `signed_distance` is positive on the clipped side.
pub fn plane_fog(signed_distance: f32, fog_depth: f32) -> f32 {
    let t = (signed_distance / -fog_depth).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Plane fog over several planes. Each plane overwrites the previous
/// value, so only the last plane has any effect.
pub fn plane_fog_last(signed_distances: &[f32], fog_depth: f32) -> f32 {
    signed_distances
        .iter()
        .fold(1.0, |_, &d| plane_fog(d, fog_depth))
}

/// `mix(color, fog_color, 1 - plane_fog)`.
pub fn apply_plane_fog(color: Vec3, fog_color: Vec3, plane_fog: f32) -> Vec3 {
    color.lerp(fog_color, 1.0 - plane_fog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::srgb_hex;
    use proptest::prelude::*;

    fn compiler() -> FogMaterialCompiler {
        FogMaterialCompiler::new().unwrap()
    }

    #[test]
    fn test_compile_is_cached() {
        let mut compiler = compiler();
        let a = compiler
            .compile(Vec3::ONE, Side::Front, 1.0, Vec3::Z)
            .unwrap();
        let b = compiler
            .compile(Vec3::ONE, Side::Front, 1.0, Vec3::Z)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn test_key_components_distinguish() {
        let mut compiler = compiler();
        let base = compiler
            .compile(Vec3::ONE, Side::Front, 1.0, Vec3::Z)
            .unwrap();
        let back = compiler.compile(Vec3::ONE, Side::Back, 1.0, Vec3::Z).unwrap();
        let deeper = compiler
            .compile(Vec3::ONE, Side::Front, 1.5, Vec3::Z)
            .unwrap();
        let tinted = compiler.compile(Vec3::ONE, Side::Front, 1.0, Vec3::X).unwrap();
        let colored = compiler.compile(Vec3::X, Side::Front, 1.0, Vec3::Z).unwrap();
        for other in [&back, &deeper, &tinted, &colored] {
            assert!(!Arc::ptr_eq(&base, other));
        }
        assert_eq!(compiler.len(), 5);
    }

    #[test]
    fn test_fog_source_is_point_patched() {
        let mut compiler = compiler();
        let material = compiler
            .compile(Vec3::ONE, Side::Front, 1.0, Vec3::Z)
            .unwrap();
        let unpatched = ShaderTemplate::standard_surface()
            .unwrap()
            .assemble(&[])
            .unwrap();
        let source = material.source();
        assert!(source.contains("struct MaterialParams"));
        assert!(source.contains("var plane_fog = 1.0;"));
        assert!(source.contains("1.0 - plane_fog"));
        // Scene distance fog still runs before the plane fog mix.
        let scene_fog = source.find("fog_factor").unwrap();
        let plane_mix = source.find("1.0 - plane_fog").unwrap();
        assert!(scene_fog < plane_mix);
        // The lighting code between the slots is untouched.
        let lit = "var radiance = globals.ambient.rgb * diffuse_color;";
        assert!(unpatched.contains(lit) && source.contains(lit));
        assert!(!source.contains("discard"));
    }

    #[test]
    fn test_fog_material_validates() {
        let mut compiler = compiler();
        let material = compiler
            .compile(srgb_hex(0x0075_4e1a), Side::Back, 1.0, srgb_hex(0x0044_6677))
            .unwrap();
        validate_wgsl("fog", material.source()).unwrap();
        assert_eq!(material.uniforms().len(), 2);
        assert!(material.state.transparent);
        assert!(material.state.depth_write);
        assert!(material.state.depth_test);
    }

    #[test]
    fn test_compile_base_is_unpatched_and_cached() {
        let mut compiler = compiler();
        let a = compiler.compile_base(Vec3::ONE, Side::Front).unwrap();
        let b = compiler.compile_base(Vec3::ONE, Side::Front).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.has_fog());
        assert!(a.uniforms().is_empty());
        assert!(a.source().contains("discard"));
        let fogged = compiler.compile(Vec3::ONE, Side::Front, 1.0, Vec3::Z).unwrap();
        assert!(!Arc::ptr_eq(&a, &fogged));
    }

    #[test]
    fn test_fog_uniform_values() {
        let mut compiler = compiler();
        let material = compiler
            .compile(Vec3::ONE, Side::Front, 1.5, Vec3::new(0.1, 0.2, 0.3))
            .unwrap();
        let words = material.uniform_values().pack();
        assert_eq!(words[0], 1.5);
        assert_eq!(&words[4..7], &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_assign_material_fallback() {
        let mut compiler = compiler();
        let fog = FogConfig::default();
        let instance = compiler.assign_material("mystery", None, 3, &fog).unwrap();
        assert_eq!(instance.material.base_color, srgb_hex(0x0000_77ff));
        assert_eq!(instance.opacity, 1.0);
        assert_eq!(instance.emissive, Vec3::ZERO);
        assert_eq!(instance.draw_order, 3);
    }

    #[test]
    fn test_assign_material_shares_equal_appearance() {
        let mut compiler = compiler();
        let fog = FogConfig::default();
        let glass = Appearance::new(Vec3::ONE, 0.5).with_emissive(Vec3::X, 10.0);
        let plain = Appearance::new(Vec3::ONE, 1.0);
        let a = compiler.assign_material("a", Some(&glass), 1, &fog).unwrap();
        let b = compiler.assign_material("b", Some(&plain), 2, &fog).unwrap();
        assert!(Arc::ptr_eq(&a.material, &b.material));
        assert_eq!(a.opacity, 0.5);
        assert_eq!(a.emissive, Vec3::new(10.0, 0.0, 0.0));
        assert!(b.depth_offset() > a.depth_offset());
    }

    #[test]
    fn test_plane_fog_profile() {
        assert_eq!(plane_fog(0.0, 1.0), 0.0);
        assert_eq!(plane_fog(-1.0, 1.0), 1.0);
        assert_eq!(plane_fog(-5.0, 1.0), 1.0);
        assert_eq!(plane_fog(2.0, 1.0), 0.0);
        assert!((plane_fog(-0.5, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_plane_fog_last_writer_wins() {
        assert_eq!(plane_fog_last(&[], 1.0), 1.0);
        assert_eq!(plane_fog_last(&[-5.0, 0.0], 1.0), 0.0);
        assert_eq!(plane_fog_last(&[0.0, -5.0], 1.0), 1.0);
    }

    #[test]
    fn test_apply_plane_fog() {
        let red = Vec3::X;
        let blue = Vec3::Z;
        assert_eq!(apply_plane_fog(red, blue, 0.0), blue);
        assert_eq!(apply_plane_fog(red, blue, 1.0), red);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_compile_cache_identity(
            r in 0.0f32..1.0, g in 0.0f32..1.0, b in 0.0f32..1.0,
            depth in 0.1f32..5.0,
            side in prop_oneof![Just(Side::Front), Just(Side::Back), Just(Side::Double)],
        ) {
            let mut compiler = compiler();
            let color = Vec3::new(r, g, b);
            let first = compiler.compile(color, side, depth, Vec3::Z).unwrap();
            let second = compiler.compile(color, side, depth, Vec3::Z).unwrap();
            prop_assert!(Arc::ptr_eq(&first, &second));
            prop_assert_eq!(compiler.len(), 1);
        }
    }
}
