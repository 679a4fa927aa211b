//! Structured shader templates with named insertion slots.
//!
//! A template is WGSL source split into fixed text and slots. A slot is
//! delimited by `//#slot <name>` and `//#end` marker lines; the text between
//! the markers is the slot's default content. Assembly substitutes typed
//! patches for slots instead of searching the source for include markers.

use std::fmt;

use crate::error::{NightfogError, Result};

const SLOT_MARKER: &str = "//#slot ";
const END_MARKER: &str = "//#end";

/// The insertion points a surface template exposes, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InjectionSlot {
    /// Module-scope declarations before the entry points.
    Declarations,
    /// Per-fragment clipping plane evaluation.
    ClippingPlanes,
    /// Fog applied to the lit fragment color.
    FogFragment,
}

impl InjectionSlot {
    pub const ALL: [Self; 3] = [Self::Declarations, Self::ClippingPlanes, Self::FogFragment];

    pub fn name(self) -> &'static str {
        match self {
            Self::Declarations => "declarations",
            Self::ClippingPlanes => "clipping_planes",
            Self::FogFragment => "fog_fragment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

impl fmt::Display for InjectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a patch combines with the slot's default content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// The patch replaces the default content.
    Replace,
    /// The patch follows the default content.
    Append,
}

/// Source to splice into one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPatch {
    pub slot: InjectionSlot,
    pub mode: PatchMode,
    pub source: String,
}

impl SlotPatch {
    pub fn replace(slot: InjectionSlot, source: impl Into<String>) -> Self {
        Self {
            slot,
            mode: PatchMode::Replace,
            source: source.into(),
        }
    }

    pub fn append(slot: InjectionSlot, source: impl Into<String>) -> Self {
        Self {
            slot,
            mode: PatchMode::Append,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot {
        slot: InjectionSlot,
        default: String,
    },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    label: String,
    segments: Vec<Segment>,
}

impl ShaderTemplate {
    /// The physically based surface every scene material starts from.
    pub fn standard_surface() -> Result<Self> {
        Self::parse(
            "standard_surface",
            include_str!("shaders/standard_surface.wgsl"),
        )
    }

    /// Splits `source` into text and slot segments.
    pub fn parse(label: &str, source: &str) -> Result<Self> {
        let malformed = |message: String| NightfogError::MalformedTemplate {
            template: label.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut open: Option<(InjectionSlot, String)> = None;

        for (line_no, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix(SLOT_MARKER) {
                let name = name.trim();
                if open.is_some() {
                    return Err(malformed(format!(
                        "line {}: slot '{name}' opened inside another slot",
                        line_no + 1
                    )));
                }
                let slot = InjectionSlot::from_name(name).ok_or_else(|| {
                    NightfogError::UnknownSlot {
                        template: label.to_string(),
                        slot: name.to_string(),
                    }
                })?;
                let seen = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Slot { slot: existing, .. } if *existing == slot));
                if seen {
                    return Err(malformed(format!("slot '{slot}' declared twice")));
                }
                segments.push(Segment::Text(std::mem::take(&mut text)));
                open = Some((slot, String::new()));
            } else if trimmed == END_MARKER {
                let (slot, default) = open.take().ok_or_else(|| {
                    malformed(format!("line {}: '{END_MARKER}' without a slot", line_no + 1))
                })?;
                segments.push(Segment::Slot { slot, default });
            } else if let Some((_, default)) = open.as_mut() {
                default.push_str(line);
                default.push('\n');
            } else {
                text.push_str(line);
                text.push('\n');
            }
        }

        if let Some((slot, _)) = open {
            return Err(malformed(format!("slot '{slot}' is never closed")));
        }
        segments.push(Segment::Text(text));
        segments.retain(|s| !matches!(s, Segment::Text(t) if t.is_empty()));

        Ok(Self {
            label: label.to_string(),
            segments,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Slots in source order.
    pub fn slots(&self) -> impl Iterator<Item = InjectionSlot> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot { slot, .. } => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    /// Default content of a slot.
    pub fn default_content(&self, slot: InjectionSlot) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Slot { slot: s, default } if *s == slot => Some(default.as_str()),
            _ => None,
        })
    }

    /// Produces WGSL with `patches` applied. Every other byte of the
    /// template is emitted unchanged.
    pub fn assemble(&self, patches: &[SlotPatch]) -> Result<String> {
        for (i, patch) in patches.iter().enumerate() {
            if !self.slots().any(|s| s == patch.slot) {
                return Err(NightfogError::UnknownSlot {
                    template: self.label.clone(),
                    slot: patch.slot.name().to_string(),
                });
            }
            if patches[..i].iter().any(|p| p.slot == patch.slot) {
                return Err(NightfogError::DuplicatePatch(patch.slot.name().to_string()));
            }
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot { slot, default } => {
                    match patches.iter().find(|p| p.slot == *slot) {
                        None => out.push_str(default),
                        Some(patch) => {
                            if patch.mode == PatchMode::Append {
                                out.push_str(default);
                            }
                            out.push_str(&patch.source);
                            if !patch.source.ends_with('\n') {
                                out.push('\n');
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "a\n//#slot declarations\nd0\n//#end\nb\n//#slot fog_fragment\n//#end\nc\n";

    #[test]
    fn test_parse_slots_in_order() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        let slots: Vec<_> = template.slots().collect();
        assert_eq!(
            slots,
            vec![InjectionSlot::Declarations, InjectionSlot::FogFragment]
        );
        assert_eq!(
            template.default_content(InjectionSlot::Declarations),
            Some("d0\n")
        );
        assert_eq!(template.default_content(InjectionSlot::FogFragment), Some(""));
    }

    #[test]
    fn test_assemble_without_patches_drops_markers_only() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        assert_eq!(template.assemble(&[]).unwrap(), "a\nd0\nb\nc\n");
    }

    #[test]
    fn test_replace_and_append() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        let out = template
            .assemble(&[
                SlotPatch::replace(InjectionSlot::Declarations, "r"),
                SlotPatch::append(InjectionSlot::FogFragment, "x\n"),
            ])
            .unwrap();
        assert_eq!(out, "a\nr\nb\nx\nc\n");
    }

    #[test]
    fn test_append_keeps_default() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        let out = template
            .assemble(&[SlotPatch::append(InjectionSlot::Declarations, "e")])
            .unwrap();
        assert_eq!(out, "a\nd0\ne\nb\nc\n");
    }

    #[test]
    fn test_patch_for_missing_slot() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        let err = template
            .assemble(&[SlotPatch::replace(InjectionSlot::ClippingPlanes, "")])
            .unwrap_err();
        assert!(matches!(err, NightfogError::UnknownSlot { .. }));
    }

    #[test]
    fn test_duplicate_patch() {
        let template = ShaderTemplate::parse("small", SMALL).unwrap();
        let err = template
            .assemble(&[
                SlotPatch::append(InjectionSlot::Declarations, "1"),
                SlotPatch::append(InjectionSlot::Declarations, "2"),
            ])
            .unwrap_err();
        assert!(matches!(err, NightfogError::DuplicatePatch(_)));
    }

    #[test]
    fn test_unknown_slot_name() {
        let err = ShaderTemplate::parse("bad", "//#slot lights\n//#end\n").unwrap_err();
        assert!(matches!(err, NightfogError::UnknownSlot { .. }));
    }

    #[test]
    fn test_unclosed_and_stray_markers() {
        assert!(matches!(
            ShaderTemplate::parse("bad", "//#slot declarations\nx\n"),
            Err(NightfogError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse("bad", "x\n//#end\n"),
            Err(NightfogError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse(
                "bad",
                "//#slot declarations\n//#end\n//#slot declarations\n//#end\n"
            ),
            Err(NightfogError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_standard_surface_slot_order() {
        let template = ShaderTemplate::standard_surface().unwrap();
        let slots: Vec<_> = template.slots().collect();
        assert_eq!(slots, InjectionSlot::ALL.to_vec());
    }

    #[test]
    fn test_standard_surface_validates_unpatched() {
        let template = ShaderTemplate::standard_surface().unwrap();
        let source = template.assemble(&[]).unwrap();
        crate::program::validate_wgsl("standard_surface", &source).unwrap();
    }
}
