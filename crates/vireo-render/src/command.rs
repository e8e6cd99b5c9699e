//! Render commands: the self-contained descriptions of "what to draw" that
//! scene producers submit each frame.
//!
//! A command fixes its kind, depth key and payload at construction and is
//! never mutated after submission. The kinds form a closed sum type so the
//! batching loop dispatches with an exhaustive match; an unknown kind is
//! unrepresentable.

use std::fmt;
use std::sync::Arc;

use glam::Mat4;

use crate::backend::CustomDrawContext;
use crate::group::GroupId;
use crate::material::{MaterialId, PipelineState};
use crate::vertex::Quad;

/// One drawable unit submitted per frame.
#[derive(Debug)]
pub enum RenderCommand {
    /// One or more textured, colored quads sharing a material.
    Quad(QuadCommand),
    /// An arbitrary backend callback; never batched across.
    Custom(CustomCommand),
    /// A nested sub-queue, visited recursively.
    Group(GroupCommand),
    /// A pre-batched draw issued directly from its own vertex data.
    Batch(BatchCommand),
}

impl RenderCommand {
    /// The signed draw-order key. Commands are bucketed by its sign and the
    /// negative/positive buckets are stably sorted by it.
    pub fn depth_key(&self) -> f32 {
        match self {
            RenderCommand::Quad(c) => c.depth_key,
            RenderCommand::Custom(c) => c.depth_key,
            RenderCommand::Group(c) => c.depth_key,
            RenderCommand::Batch(c) => c.depth_key,
        }
    }
}

/// A run of quads drawn with one pipeline state.
///
/// The quad data is shared, not copied: producers keep their quads in an
/// `Arc<[Quad]>` and hand out cheap clones each frame. The model-view
/// transform is applied to each vertex when the command is streamed into the
/// shared buffer.
#[derive(Debug, Clone)]
pub struct QuadCommand {
    pub depth_key: f32,
    pub state: PipelineState,
    pub material_id: MaterialId,
    pub quads: Arc<[Quad]>,
    pub model_view: Mat4,
}

impl QuadCommand {
    /// A batchable quad command; the material fingerprint is derived from
    /// `state`.
    pub fn new(depth_key: f32, state: PipelineState, quads: Arc<[Quad]>, model_view: Mat4) -> Self {
        Self {
            depth_key,
            state,
            material_id: MaterialId::fingerprint(&state),
            quads,
            model_view,
        }
    }

    /// A quad command that never merges with its neighbors, for cases where
    /// reordering against adjacent draws is unsafe.
    pub fn new_unbatched(
        depth_key: f32,
        state: PipelineState,
        quads: Arc<[Quad]>,
        model_view: Mat4,
    ) -> Self {
        Self {
            depth_key,
            state,
            material_id: MaterialId::DO_NOT_BATCH,
            quads,
            model_view,
        }
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }
}

/// Callback signature for [`CustomCommand`].
pub type CustomCallback = Box<dyn FnMut(&mut CustomDrawContext<'_>) + 'static>;

/// An escape hatch for producers that drive the backend directly
/// (debug overlays, one-off effects).
///
/// The callback may change backend state arbitrarily, so the renderer always
/// flushes the pending batch before executing it. A callback that issues its
/// own draws is responsible for bumping the frame counters it is handed.
pub struct CustomCommand {
    pub depth_key: f32,
    callback: CustomCallback,
}

impl CustomCommand {
    pub fn new(depth_key: f32, callback: impl FnMut(&mut CustomDrawContext<'_>) + 'static) -> Self {
        Self {
            depth_key,
            callback: Box::new(callback),
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut CustomDrawContext<'_>) {
        (self.callback)(ctx);
    }
}

impl fmt::Debug for CustomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCommand")
            .field("depth_key", &self.depth_key)
            .finish_non_exhaustive()
    }
}

/// Marks where a nested render queue is drawn within its parent.
///
/// The referenced queue id must be registered with the renderer (see
/// `Renderer::create_render_queue`); producers submit the group command to
/// the parent queue and push the group id to route children into it.
#[derive(Debug, Clone, Copy)]
pub struct GroupCommand {
    pub depth_key: f32,
    pub group_id: GroupId,
}

impl GroupCommand {
    pub fn new(depth_key: f32, group_id: GroupId) -> Self {
        Self { depth_key, group_id }
    }
}

/// A pre-batched draw: the producer already coalesced its quads and the
/// renderer issues them as exactly one draw call from their own buffers,
/// bypassing the shared-buffer accumulator.
#[derive(Debug, Clone)]
pub struct BatchCommand {
    pub depth_key: f32,
    pub state: PipelineState,
    pub quads: Arc<[Quad]>,
    pub model_view: Mat4,
}

impl BatchCommand {
    pub fn new(depth_key: f32, state: PipelineState, quads: Arc<[Quad]>, model_view: Mat4) -> Self {
        Self {
            depth_key,
            state,
            quads,
            model_view,
        }
    }
}
