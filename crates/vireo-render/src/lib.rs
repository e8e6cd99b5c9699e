//! Vireo: a render-command queue and quad-batching engine for 2D scenes.
//!
//! Scene producers submit self-contained [`RenderCommand`]s each frame; the
//! [`Renderer`] sorts them by depth key (stably, so coplanar siblings never
//! flicker), coalesces adjacent quad commands that share a material
//! fingerprint into single draw calls, and streams vertex data through a
//! fixed-capacity shared buffer, flushing on material changes, non-batchable
//! commands and capacity pressure.
//!
//! The GPU sits behind the object-safe [`RenderBackend`] trait:
//! [`WgpuBackend`] is the real implementation, and tests substitute a
//! recording double.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vireo_render::*;
//! use glam::{Mat4, Vec2};
//!
//! # fn demo(backend: &mut dyn RenderBackend) -> RenderResult<()> {
//! let mut renderer = Renderer::new(RendererDescriptor::default())?;
//! let quads: Arc<[Quad]> = Arc::from(vec![
//!     Quad::solid(Vec2::ZERO, Vec2::splat(32.0), Color::RED),
//! ]);
//! renderer.add_command(RenderCommand::Quad(QuadCommand::new(
//!     0.0,
//!     PipelineState::default(),
//!     quads,
//!     Mat4::IDENTITY,
//! )));
//! renderer.render(backend);
//! assert_eq!(renderer.drawn_batches(), 1);
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod backend;
pub mod blend;
pub mod color;
pub mod command;
pub mod error;
pub mod group;
pub mod logging;
pub mod material;
pub mod queue;
pub mod renderer;
pub mod stats;
pub mod vertex;
pub mod wgpu_backend;

pub use arena::QuadArena;
pub use backend::{CustomDrawContext, RenderBackend};
pub use blend::BlendMode;
pub use color::Color;
pub use command::{BatchCommand, CustomCommand, GroupCommand, QuadCommand, RenderCommand};
pub use error::{RenderError, RenderResult};
pub use group::{GroupCommandManager, GroupId};
pub use material::{MaterialId, PipelineState, ProgramHandle, TextureHandle};
pub use queue::RenderQueue;
pub use renderer::{MAX_QUAD_CAPACITY, Renderer, RendererDescriptor};
pub use stats::FrameStats;
pub use vertex::{INDICES_PER_QUAD, Quad, QuadVertex, VERTICES_PER_QUAD};
pub use wgpu_backend::{GraphicsContext, WgpuBackend};
