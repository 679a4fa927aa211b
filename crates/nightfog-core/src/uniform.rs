//! Uniform declarations and host-side packing.
//!
//! A program declares an ordered list of [`UniformSlot`]s. The same list
//! produces both the WGSL `struct` the shader reads and the byte layout the
//! host writes, so the two cannot drift apart.

use glam::{Vec2, Vec3, Vec4};

use crate::error::{NightfogError, Result};

/// Scalar and vector types a uniform slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    /// WGSL spelling of the type.
    pub fn wgsl_type(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
        }
    }

    /// Alignment in bytes under WGSL uniform address-space rules.
    pub fn align(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 => 16,
        }
    }

    /// Size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
        }
    }
}

/// A typed uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    /// The kind of this value.
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
        }
    }

    fn components(&self) -> Vec<f32> {
        match *self {
            Self::Float(v) => vec![v],
            Self::Vec2(v) => v.to_array().to_vec(),
            Self::Vec3(v) => v.to_array().to_vec(),
            Self::Vec4(v) => v.to_array().to_vec(),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

/// A named uniform with its default value.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    pub name: String,
    pub default: UniformValue,
}

impl UniformSlot {
    pub fn new(name: impl Into<String>, default: impl Into<UniformValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LayoutEntry {
    name: String,
    kind: UniformKind,
    offset: usize,
}

/// Byte layout of a uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformLayout {
    entries: Vec<LayoutEntry>,
    size: usize,
}

impl UniformLayout {
    /// Lays out `slots` in declaration order.
    pub fn new(slots: &[UniformSlot]) -> Self {
        let mut offset = 0;
        let mut max_align = 4;
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            let kind = slot.default.kind();
            offset = round_up(offset, kind.align());
            entries.push(LayoutEntry {
                name: slot.name.clone(),
                kind,
                offset,
            });
            offset += kind.size();
            max_align = max_align.max(kind.align());
        }
        let size = if entries.is_empty() {
            0
        } else {
            round_up(offset, max_align)
        };
        Self { entries, size }
    }

    /// Size of the WGSL struct in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the backing buffer, rounded up to 16 bytes.
    pub fn buffer_size(&self) -> usize {
        round_up(self.size, 16)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte offset of the named member.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.offset)
    }

    /// Emits the WGSL struct declaration for this block.
    pub fn wgsl_struct(&self, struct_name: &str) -> String {
        let mut out = format!("struct {struct_name} {{\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "    {}: {},\n",
                entry.name,
                entry.kind.wgsl_type()
            ));
        }
        out.push_str("}\n");
        out
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Current values for a declared uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformValues {
    slots: Vec<UniformSlot>,
    values: Vec<UniformValue>,
    layout: UniformLayout,
}

impl UniformValues {
    /// Starts every slot at its declared default.
    pub fn from_defaults(slots: &[UniformSlot]) -> Self {
        Self {
            slots: slots.to_vec(),
            values: slots.iter().map(|s| s.default).collect(),
            layout: UniformLayout::new(slots),
        }
    }

    /// Overrides one value. The kind must match the declaration.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let value = value.into();
        let index = self
            .slots
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| NightfogError::UnknownUniform(name.to_string()))?;
        let expected = self.slots[index].default.kind();
        if expected != value.kind() {
            return Err(NightfogError::UniformTypeMismatch {
                name: name.to_string(),
                expected: expected.wgsl_type(),
                actual: value.kind().wgsl_type(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|i| self.values[i])
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Packs the values into a buffer of `layout().buffer_size()` bytes,
    /// expressed as f32 words.
    pub fn pack(&self) -> Vec<f32> {
        let mut words = vec![0.0_f32; self.layout.buffer_size() / 4];
        for (entry, value) in self.layout.entries.iter().zip(&self.values) {
            let start = entry.offset / 4;
            for (i, c) in value.components().into_iter().enumerate() {
                words[start + i] = c;
            }
        }
        words
    }

    /// [`UniformValues::pack`] as the raw bytes a uniform buffer holds.
    pub fn pack_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.pack()).to_vec()
    }
}
