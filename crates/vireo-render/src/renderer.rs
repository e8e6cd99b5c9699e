//! The orchestrator: owns the render queues, the shared-buffer arena and the
//! batch accumulator, and performs the sort → batch → flush → draw cycle.
//!
//! Merging quad commands is only valid between *adjacent* commands of the
//! final sorted sequence that share a material fingerprint: reordering quads
//! across a material boundary can change which pixels end up on top. That is
//! why every queue is sorted before it is walked, and why a flush happens on
//! every material change, on every non-batchable command, and whenever the
//! shared buffer would overflow.

use ahash::AHashMap;
use tracing::trace;

use crate::arena::{QuadArena, transform_quads};
use crate::backend::{CustomDrawContext, RenderBackend};
use crate::command::{BatchCommand, QuadCommand, RenderCommand};
use crate::error::{RenderError, RenderResult};
use crate::group::{GroupCommandManager, GroupId};
use crate::material::{MaterialId, PipelineState};
use crate::queue::RenderQueue;
use crate::stats::FrameStats;
use crate::vertex::VERTICES_PER_QUAD;

/// Largest supported shared-buffer capacity in quads.
///
/// Draws are indexed with `u16`, so one buffer holds at most 65536 vertices.
pub const MAX_QUAD_CAPACITY: usize = (u16::MAX as usize + 1) / VERTICES_PER_QUAD;

/// Construction parameters for a [`Renderer`].
#[derive(Debug, Clone)]
pub struct RendererDescriptor {
    /// Shared vertex/index buffer capacity in quads.
    pub quad_capacity: usize,
}

impl Default for RendererDescriptor {
    fn default() -> Self {
        Self {
            quad_capacity: MAX_QUAD_CAPACITY,
        }
    }
}

/// The run of quads accumulated since the last flush.
#[derive(Debug)]
struct PendingBatch {
    material: MaterialId,
    state: PipelineState,
    first_quad: usize,
    quad_count: usize,
}

/// Collects render commands into queues, sorts them, and walks them once per
/// frame, coalescing material-compatible quad runs into single draw calls.
pub struct Renderer {
    queues: AHashMap<GroupId, RenderQueue>,
    group_stack: Vec<GroupId>,
    groups: GroupCommandManager,
    arena: QuadArena,
    pending: Option<PendingBatch>,
    stats: FrameStats,
}

impl Renderer {
    pub fn new(descriptor: RendererDescriptor) -> RenderResult<Self> {
        if descriptor.quad_capacity == 0 || descriptor.quad_capacity > MAX_QUAD_CAPACITY {
            return Err(RenderError::InvalidDescriptor {
                message: format!(
                    "quad_capacity must be in 1..={}, got {}",
                    MAX_QUAD_CAPACITY, descriptor.quad_capacity
                ),
            });
        }

        let mut queues = AHashMap::new();
        queues.insert(GroupId::ROOT, RenderQueue::new());

        Ok(Self {
            queues,
            group_stack: vec![GroupId::ROOT],
            groups: GroupCommandManager::new(),
            arena: QuadArena::new(descriptor.quad_capacity),
            pending: None,
            stats: FrameStats::default(),
        })
    }

    /// Shared-buffer capacity in quads.
    pub fn quad_capacity(&self) -> usize {
        self.arena.capacity()
    }

    // --- submission API ---

    /// Append a command to the queue at the top of the group stack
    /// (the root queue unless a group is pushed).
    pub fn add_command(&mut self, command: RenderCommand) {
        let id = *self
            .group_stack
            .last()
            .expect("group stack is never empty");
        self.add_command_to(command, id);
    }

    /// Append a command to an explicit queue.
    ///
    /// # Panics
    ///
    /// Panics if `group_id` is not registered; submitting to a queue that
    /// was never created is an integration bug in the producer.
    pub fn add_command_to(&mut self, command: RenderCommand, group_id: GroupId) {
        self.queues
            .get_mut(&group_id)
            .unwrap_or_else(|| panic!("render queue {} is not registered", group_id.index()))
            .push(command);
    }

    /// Route subsequent `add_command` calls into the given queue until the
    /// matching [`pop_group`](Self::pop_group).
    pub fn push_group(&mut self, group_id: GroupId) {
        assert!(
            self.queues.contains_key(&group_id),
            "render queue {} is not registered",
            group_id.index()
        );
        self.group_stack.push(group_id);
    }

    /// Leave the current group.
    ///
    /// # Panics
    ///
    /// Panics when called with no matching `push_group`; an unbalanced group
    /// stack is a fatal usage error.
    pub fn pop_group(&mut self) {
        assert!(
            self.group_stack.len() > 1,
            "pop_group without a matching push_group"
        );
        self.group_stack.pop();
    }

    /// Register a fresh (or pooled) queue for a nested pass and return its
    /// id. The queue storage is reused across frames.
    pub fn create_render_queue(&mut self) -> GroupId {
        let id = self.groups.acquire();
        self.queues.entry(id).or_default().clear();
        id
    }

    /// Return a nested queue's id to the pool. Its storage stays registered
    /// for reuse by the next `create_render_queue`.
    pub fn release_render_queue(&mut self, group_id: GroupId) {
        if let Some(queue) = self.queues.get_mut(&group_id) {
            queue.clear();
        }
        self.groups.release(group_id);
    }

    // --- observability ---

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn drawn_batches(&self) -> u32 {
        self.stats.drawn_batches
    }

    pub fn drawn_vertices(&self) -> u32 {
        self.stats.drawn_vertices
    }

    // --- render cycle ---

    /// Sort, batch, flush and draw every queued command, then clear the
    /// queues for the next frame.
    ///
    /// All submission for the frame must have completed; submission and
    /// rendering are strictly phase-separated.
    pub fn render(&mut self, backend: &mut dyn RenderBackend) {
        debug_assert_eq!(
            self.group_stack.len(),
            1,
            "render() with an unbalanced group stack"
        );
        self.stats.reset();
        self.arena.reset();
        debug_assert!(self.pending.is_none());

        backend.begin_frame();
        self.visit_queue(GroupId::ROOT, backend);
        debug_assert!(self.pending.is_none(), "pending batch leaked past a queue");
        backend.end_frame();

        self.clear_queues();
        self.group_stack.clear();
        self.group_stack.push(GroupId::ROOT);

        trace!(
            batches = self.stats.drawn_batches,
            vertices = self.stats.drawn_vertices,
            "frame rendered"
        );
    }

    /// Empty every registered queue, keeping their storage.
    pub fn clear_queues(&mut self) {
        for queue in self.queues.values_mut() {
            queue.clear();
        }
    }

    fn visit_queue(&mut self, id: GroupId, backend: &mut dyn RenderBackend) {
        // Take the queue out of the registry so nested visits can borrow the
        // registry again; its (cleared) storage is restored below.
        let slot = self
            .queues
            .get_mut(&id)
            .unwrap_or_else(|| panic!("render queue {} is not registered", id.index()));
        let mut queue = std::mem::take(slot);

        queue.sort();
        for i in 0..queue.len() {
            match queue.get_mut(i) {
                RenderCommand::Quad(quad) => self.accumulate_quads(quad, backend),
                RenderCommand::Group(group) => {
                    let child = group.group_id;
                    self.flush(backend);
                    self.visit_queue(child, backend);
                }
                RenderCommand::Custom(custom) => {
                    // The callback may change backend state arbitrarily, so
                    // nothing is allowed to batch across it.
                    self.flush(backend);
                    let mut ctx = CustomDrawContext {
                        backend: &mut *backend,
                        stats: &mut self.stats,
                    };
                    custom.execute(&mut ctx);
                }
                RenderCommand::Batch(batch) => {
                    self.flush(backend);
                    Self::draw_prebatched(&mut self.stats, batch, backend);
                }
            }
        }
        self.flush(backend);

        *self
            .queues
            .get_mut(&id)
            .expect("queue slot vanished during visit") = queue;
    }

    fn accumulate_quads(&mut self, quad: &QuadCommand, backend: &mut dyn RenderBackend) {
        let count = quad.quad_count();
        // Zero-quad commands are transparent no-ops: they must not break the
        // adjacency of the surrounding run.
        if count == 0 {
            return;
        }

        if quad.material_id.is_unbatchable() || count > self.arena.capacity() {
            self.flush(backend);
            self.draw_isolated(quad, backend);
            return;
        }

        if let Some(pending) = &self.pending
            && pending.material != quad.material_id
        {
            self.stats.flushes_due_to_material += 1;
            self.flush(backend);
        }
        if self.arena.remaining() < count {
            if self.pending.is_some() {
                self.stats.flushes_due_to_capacity += 1;
            }
            self.flush(backend);
            self.arena.rewind();
        }

        let first_quad = self.arena.append(&quad.quads, &quad.model_view);
        backend.upload_vertices(
            first_quad * VERTICES_PER_QUAD,
            self.arena.vertices_for(first_quad, count),
        );

        match &mut self.pending {
            Some(pending) => pending.quad_count += count,
            None => {
                self.pending = Some(PendingBatch {
                    material: quad.material_id,
                    state: quad.state,
                    first_quad,
                    quad_count: count,
                });
            }
        }
    }

    /// Draw a non-batchable command as its own draw calls, in chunks of at
    /// most the buffer capacity. Never leaves a pending batch behind, so
    /// equal materials on either side cannot merge across it.
    fn draw_isolated(&mut self, quad: &QuadCommand, backend: &mut dyn RenderBackend) {
        debug_assert!(self.pending.is_none());
        for chunk in quad.quads.chunks(self.arena.capacity()) {
            if self.arena.remaining() < chunk.len() {
                self.arena.rewind();
            }
            let first_quad = self.arena.append(chunk, &quad.model_view);
            backend.upload_vertices(
                first_quad * VERTICES_PER_QUAD,
                self.arena.vertices_for(first_quad, chunk.len()),
            );
            backend.draw_quads(&quad.state, first_quad, chunk.len());
            self.stats.record_batch(chunk.len());
        }
    }

    fn draw_prebatched(
        stats: &mut FrameStats,
        batch: &BatchCommand,
        backend: &mut dyn RenderBackend,
    ) {
        if batch.quads.is_empty() {
            return;
        }
        debug_assert!(
            batch.quads.len() <= MAX_QUAD_CAPACITY,
            "pre-batched command exceeds the u16 index space"
        );
        let vertices = transform_quads(&batch.quads, &batch.model_view);
        let indices = QuadArena::index_pattern(batch.quads.len());
        backend.draw_external(&batch.state, &vertices, &indices);
        stats.record_batch(batch.quads.len());
    }

    /// Issue one draw call covering the accumulated run, if any.
    fn flush(&mut self, backend: &mut dyn RenderBackend) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        debug_assert!(pending.quad_count > 0);
        backend.draw_quads(&pending.state, pending.first_quad, pending.quad_count);
        self.stats.record_batch(pending.quad_count);
    }
}
