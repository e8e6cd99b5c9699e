//! The output boundary: logical draw operations against a graphics backend.
//!
//! The renderer never touches the GPU directly; it streams vertex data and
//! issues draw calls through this trait. The trait is object-safe so tests
//! can substitute a recording double for the real wgpu backend.

use crate::material::PipelineState;
use crate::stats::FrameStats;
use crate::vertex::QuadVertex;

/// Receiver of the renderer's upload and draw traffic.
///
/// Lifecycle per frame: `begin_frame`, any number of `upload_vertices` /
/// `draw_quads` / `draw_external` calls, `end_frame`. Uploads for a draw
/// always precede it, and a buffer region is never overwritten before the
/// draws referencing it have been issued.
pub trait RenderBackend {
    /// Called once at the start of `render()`.
    fn begin_frame(&mut self) {}

    /// Stream vertices into the shared vertex buffer starting at
    /// `first_vertex` (an offset in vertices, always a multiple of four).
    fn upload_vertices(&mut self, first_vertex: usize, vertices: &[QuadVertex]);

    /// Issue exactly one draw call covering `quad_count` quads starting at
    /// quad `first_quad` of the shared buffer, bound to `state`.
    fn draw_quads(&mut self, state: &PipelineState, first_quad: usize, quad_count: usize);

    /// Issue one draw call from externally-owned vertex data, bypassing the
    /// shared buffer (pre-batched commands).
    fn draw_external(&mut self, state: &PipelineState, vertices: &[QuadVertex], indices: &[u16]);

    /// Called once after the queue tree has been fully visited.
    fn end_frame(&mut self) {}
}

/// What a custom command's callback gets to work with.
///
/// A callback that performs its own drawing must bump the stats itself; the
/// renderer only counts the draws it issues.
pub struct CustomDrawContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub stats: &'a mut FrameStats,
}
