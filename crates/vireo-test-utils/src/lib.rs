//! Test utilities for Vireo.
//!
//! Provides [`RecordingBackend`], a [`RenderBackend`] double that records
//! every upload and draw call without touching a GPU, so the batching
//! engine's ordering, coalescing and capacity behavior can be asserted in
//! plain unit tests.

use vireo_render::{PipelineState, QuadVertex, RenderBackend};

/// One backend call, recorded in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    BeginFrame,
    UploadVertices {
        first_vertex: usize,
        vertex_count: usize,
    },
    DrawQuads {
        state: PipelineState,
        first_quad: usize,
        quad_count: usize,
    },
    DrawExternal {
        state: PipelineState,
        vertex_count: usize,
        index_count: usize,
    },
    EndFrame,
}

/// One issued draw call, with a snapshot of the vertex data it referenced.
///
/// The snapshot is taken at draw time, before any later upload can overwrite
/// the shared-buffer region, so two renders of identical submissions can be
/// compared bit for bit.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub state: PipelineState,
    pub quad_count: usize,
    pub vertices: Vec<QuadVertex>,
    /// True for pre-batched draws that bypassed the shared buffer.
    pub external: bool,
}

/// Records render backend traffic for verification in tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    draws: Vec<DrawRecord>,
    /// Mirror of the shared vertex buffer, grown on demand.
    buffer: Vec<QuadVertex>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every backend call of the last frame, in order.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Every draw call of the last frame, in order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn draw_call_count(&self) -> usize {
        self.draws.len()
    }

    /// Total quads referenced by all draw calls.
    pub fn total_quads_drawn(&self) -> usize {
        self.draws.iter().map(|d| d.quad_count).sum()
    }

    /// Pipeline states of the issued draws, in draw order.
    pub fn draw_states(&self) -> Vec<PipelineState> {
        self.draws.iter().map(|d| d.state).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.calls.clear();
        self.draws.clear();
        self.buffer.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self) {
        self.clear();
        self.calls.push(BackendCall::BeginFrame);
    }

    fn upload_vertices(&mut self, first_vertex: usize, vertices: &[QuadVertex]) {
        let end = first_vertex + vertices.len();
        if self.buffer.len() < end {
            self.buffer
                .resize(end, QuadVertex::new([0.0; 3], vireo_render::Color::TRANSPARENT, [0.0; 2]));
        }
        self.buffer[first_vertex..end].copy_from_slice(vertices);
        self.calls.push(BackendCall::UploadVertices {
            first_vertex,
            vertex_count: vertices.len(),
        });
    }

    fn draw_quads(&mut self, state: &PipelineState, first_quad: usize, quad_count: usize) {
        let start = first_quad * 4;
        let end = start + quad_count * 4;
        assert!(
            end <= self.buffer.len(),
            "draw references vertices that were never uploaded"
        );
        self.draws.push(DrawRecord {
            state: *state,
            quad_count,
            vertices: self.buffer[start..end].to_vec(),
            external: false,
        });
        self.calls.push(BackendCall::DrawQuads {
            state: *state,
            first_quad,
            quad_count,
        });
    }

    fn draw_external(&mut self, state: &PipelineState, vertices: &[QuadVertex], indices: &[u16]) {
        self.draws.push(DrawRecord {
            state: *state,
            quad_count: vertices.len() / 4,
            vertices: vertices.to_vec(),
            external: true,
        });
        self.calls.push(BackendCall::DrawExternal {
            state: *state,
            vertex_count: vertices.len(),
            index_count: indices.len(),
        });
    }

    fn end_frame(&mut self) {
        self.calls.push(BackendCall::EndFrame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_render::{Color, PipelineState, QuadVertex};

    fn vertex(x: f32) -> QuadVertex {
        QuadVertex::new([x, 0.0, 0.0], Color::WHITE, [0.0, 0.0])
    }

    #[test]
    fn test_draw_snapshots_vertices_before_overwrite() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame();
        let first: Vec<QuadVertex> = (0..4).map(|i| vertex(i as f32)).collect();
        backend.upload_vertices(0, &first);
        backend.draw_quads(&PipelineState::default(), 0, 1);
        // Overwrite the same region, as the renderer does after a rewind.
        let second: Vec<QuadVertex> = (0..4).map(|i| vertex(100.0 + i as f32)).collect();
        backend.upload_vertices(0, &second);
        backend.draw_quads(&PipelineState::default(), 0, 1);
        backend.end_frame();

        assert_eq!(backend.draw_call_count(), 2);
        assert_eq!(backend.draws()[0].vertices, first);
        assert_eq!(backend.draws()[1].vertices, second);
    }

    #[test]
    #[should_panic(expected = "never uploaded")]
    fn test_draw_past_uploads_panics() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame();
        backend.draw_quads(&PipelineState::default(), 0, 1);
    }
}
