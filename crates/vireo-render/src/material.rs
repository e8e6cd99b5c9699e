//! Material state and the fingerprint that decides batch compatibility.
//!
//! Two quad commands may share a draw call only when their texture, program
//! and blend mode all match. Rather than comparing the full state per
//! command, the state is hashed once at command construction into an opaque
//! [`MaterialId`]; the batching loop then compares plain integers.

use crate::blend::BlendMode;

/// Opaque handle to a texture owned by the texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

impl TextureHandle {
    /// The backend's built-in 1x1 white texture, for untextured quads.
    pub const WHITE: TextureHandle = TextureHandle(0);
}

/// Opaque handle to a shader program owned by the program cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

impl ProgramHandle {
    /// The backend's built-in textured-quad program.
    pub const DEFAULT: ProgramHandle = ProgramHandle(0);
}

/// The pipeline state a batch of quads is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub texture: TextureHandle,
    pub program: ProgramHandle,
    pub blend: BlendMode,
}

impl PipelineState {
    pub fn new(texture: TextureHandle, program: ProgramHandle, blend: BlendMode) -> Self {
        Self {
            texture,
            program,
            blend,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            texture: TextureHandle::WHITE,
            program: ProgramHandle::DEFAULT,
            blend: BlendMode::Alpha,
        }
    }
}

/// Material fingerprint: a derived key identifying texture + program + blend
/// mode, used to decide whether two quad commands can share a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(u64);

// Fixed hasher seeds so fingerprints are stable across runs and frames.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x7669_7265_6f5f_7264,
    0x6d61_7465_7269_616c,
    0x9e37_79b9_7f4a_7c15,
    0xc2b2_ae3d_27d4_eb4f,
);

impl MaterialId {
    /// Reserved fingerprint that never merges with a neighbor.
    ///
    /// Used when reordering is unsafe for a command, and by the renderer for
    /// commands whose quad count alone exceeds the shared buffer capacity.
    pub const DO_NOT_BATCH: MaterialId = MaterialId(0);

    /// Derive the fingerprint for a pipeline state.
    ///
    /// Deterministic for a given state. The zero value is reserved for
    /// [`MaterialId::DO_NOT_BATCH`] and never produced here.
    pub fn fingerprint(state: &PipelineState) -> MaterialId {
        let (s0, s1, s2, s3) = FINGERPRINT_SEEDS;
        let hash = ahash::RandomState::with_seeds(s0, s1, s2, s3).hash_one(state);
        MaterialId(hash.max(1))
    }

    /// Whether this id is the reserved non-batchable fingerprint.
    pub fn is_unbatchable(self) -> bool {
        self == Self::DO_NOT_BATCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let state = PipelineState::new(
            TextureHandle(7),
            ProgramHandle(2),
            BlendMode::Additive,
        );
        assert_eq!(MaterialId::fingerprint(&state), MaterialId::fingerprint(&state));
    }

    #[test]
    fn test_fingerprint_distinguishes_state() {
        let base = PipelineState::default();
        let textured = PipelineState {
            texture: TextureHandle(1),
            ..base
        };
        let blended = PipelineState {
            blend: BlendMode::Additive,
            ..base
        };
        let id = MaterialId::fingerprint(&base);
        assert_ne!(id, MaterialId::fingerprint(&textured));
        assert_ne!(id, MaterialId::fingerprint(&blended));
    }

    #[test]
    fn test_fingerprint_never_reserved() {
        let state = PipelineState::default();
        assert_ne!(MaterialId::fingerprint(&state), MaterialId::DO_NOT_BATCH);
        assert!(MaterialId::DO_NOT_BATCH.is_unbatchable());
        assert!(!MaterialId::fingerprint(&state).is_unbatchable());
    }
}
