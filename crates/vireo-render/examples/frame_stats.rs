//! Submits a small mixed frame against the recording backend and prints the
//! resulting draw calls and frame statistics.
//!
//! Run with `cargo run --example frame_stats`.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use vireo_render::{
    BlendMode, Color, GroupCommand, PipelineState, ProgramHandle, Quad, QuadCommand,
    RenderCommand, RenderResult, Renderer, RendererDescriptor, TextureHandle,
};
use vireo_test_utils::RecordingBackend;

fn sprite_run(count: usize, x: f32) -> Arc<[Quad]> {
    Arc::from(
        (0..count)
            .map(|i| Quad::solid(Vec2::new(x + 20.0 * i as f32, 0.0), Vec2::splat(16.0), Color::WHITE))
            .collect::<Vec<_>>(),
    )
}

fn main() -> RenderResult<()> {
    vireo_render::logging::init();

    let mut renderer = Renderer::new(RendererDescriptor { quad_capacity: 64 })?;
    let mut backend = RecordingBackend::new();

    let atlas = PipelineState::new(TextureHandle(1), ProgramHandle::DEFAULT, BlendMode::Alpha);
    let glow = PipelineState::new(TextureHandle(2), ProgramHandle::DEFAULT, BlendMode::Additive);

    // A background layer behind everything, a batched sprite layer, an
    // additive effect splitting it, and an overlay queue drawn on top.
    renderer.add_command(RenderCommand::Quad(QuadCommand::new(
        -1.0,
        PipelineState::default(),
        Arc::from(vec![Quad::solid(Vec2::ZERO, Vec2::splat(480.0), Color::BLACK)]),
        Mat4::IDENTITY,
    )));
    for i in 0..3 {
        renderer.add_command(RenderCommand::Quad(QuadCommand::new(
            0.0,
            atlas,
            sprite_run(10, 200.0 * i as f32),
            Mat4::IDENTITY,
        )));
    }
    renderer.add_command(RenderCommand::Quad(QuadCommand::new(
        0.0,
        glow,
        sprite_run(5, 100.0),
        Mat4::IDENTITY,
    )));

    let overlay = renderer.create_render_queue();
    renderer.add_command(RenderCommand::Group(GroupCommand::new(1.0, overlay)));
    renderer.push_group(overlay);
    renderer.add_command(RenderCommand::Quad(QuadCommand::new(
        0.0,
        atlas,
        sprite_run(2, 0.0),
        Mat4::IDENTITY,
    )));
    renderer.pop_group();

    renderer.render(&mut backend);

    println!("draw calls:");
    for (i, draw) in backend.draws().iter().enumerate() {
        println!(
            "  #{i}: texture={} blend={:?} quads={}",
            draw.state.texture.0, draw.state.blend, draw.quad_count
        );
    }
    let stats = renderer.stats();
    println!(
        "batches={} vertices={} material_flushes={} capacity_flushes={}",
        stats.drawn_batches,
        stats.drawn_vertices,
        stats.flushes_due_to_material,
        stats.flushes_due_to_capacity
    );

    renderer.release_render_queue(overlay);
    Ok(())
}
