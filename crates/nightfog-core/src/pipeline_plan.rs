//! Pass ordering.
//!
//! The post-processing chain always has the same shape; configuration only
//! decides which stages are present and whether the scene pass draws.

use std::fmt;

use crate::config::PostProcessConfig;

/// The stages of the frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Scene,
    Fxaa,
    TemporalAccumulation,
    Bloom,
    Blur,
    FogTint,
    NightTint,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scene => "scene",
            Self::Fxaa => "fxaa",
            Self::TemporalAccumulation => "taa",
            Self::Bloom => "bloom",
            Self::Blur => "blur",
            Self::FogTint => "fog_tint",
            Self::NightTint => "night_tint",
        };
        f.write_str(name)
    }
}

/// One planned stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPass {
    pub kind: PassKind,
    pub enabled: bool,
}

/// The ordered stages for a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    passes: Vec<PlannedPass>,
}

impl PassPlan {
    /// Plans the chain for `post`.
    ///
    /// The scene pass is always first. With temporal accumulation on, the
    /// scene pass stays in place but disabled, since the accumulation pass
    /// renders the scene itself, and FXAA is left out.
    pub fn new(post: &PostProcessConfig) -> Self {
        let taa = post.taa_enabled;
        if taa && post.fxaa {
            log::warn!("fxaa and temporal accumulation are exclusive, dropping fxaa");
        }

        let mut passes = vec![PlannedPass {
            kind: PassKind::Scene,
            enabled: !taa,
        }];
        let mut push = |kind, present: bool| {
            if present {
                passes.push(PlannedPass {
                    kind,
                    enabled: true,
                });
            }
        };
        push(PassKind::Fxaa, post.fxaa && !taa);
        push(PassKind::TemporalAccumulation, taa);
        push(PassKind::Bloom, post.bloom_enabled);
        push(PassKind::Blur, post.blur_radius > 0.0);
        push(PassKind::FogTint, post.fog_tint_visibility < 1.0);
        push(PassKind::NightTint, post.night_amount > 0.0);
        Self { passes }
    }

    pub fn passes(&self) -> &[PlannedPass] {
        &self.passes
    }

    pub fn kinds(&self) -> impl Iterator<Item = PassKind> + '_ {
        self.passes.iter().map(|p| p.kind)
    }

    pub fn index_of(&self, kind: PassKind) -> Option<usize> {
        self.passes.iter().position(|p| p.kind == kind)
    }

    pub fn is_enabled(&self, kind: PassKind) -> bool {
        self.passes.iter().any(|p| p.kind == kind && p.enabled)
    }
}

impl fmt::Display for PassPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pass) in self.passes.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", pass.kind)?;
            if !pass.enabled {
                f.write_str("(off)")?;
            }
        }
        Ok(())
    }
}
