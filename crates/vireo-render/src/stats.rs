//! Per-frame rendering statistics for profiling overlays.

/// Counters reset at the start of every `render()` and readable until the
/// next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// GPU draw calls issued this frame (one per flushed batch).
    pub drawn_batches: u32,
    /// Vertices referenced by those draws (four per quad).
    pub drawn_vertices: u32,
    /// Flushes forced by a material fingerprint change.
    pub flushes_due_to_material: u32,
    /// Flushes forced by shared-buffer capacity.
    pub flushes_due_to_capacity: u32,
}

impl FrameStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one flushed batch of `quad_count` quads.
    pub fn record_batch(&mut self, quad_count: usize) {
        self.drawn_batches += 1;
        self.drawn_vertices += (quad_count * crate::vertex::VERTICES_PER_QUAD) as u32;
    }
}
