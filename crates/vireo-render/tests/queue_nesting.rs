//! Nested render queues, group lifecycle and custom-command behavior.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat4, Vec2};
use vireo_render::*;
use vireo_test_utils::{BackendCall, RecordingBackend};

fn state(texture: u64) -> PipelineState {
    PipelineState::new(
        TextureHandle(texture),
        ProgramHandle::DEFAULT,
        BlendMode::Alpha,
    )
}

fn quad_cmd(depth_key: f32, texture: u64, count: usize) -> RenderCommand {
    let quads: Arc<[Quad]> = Arc::from(
        (0..count)
            .map(|i| Quad::solid(Vec2::new(i as f32, 0.0), Vec2::ONE, Color::WHITE))
            .collect::<Vec<_>>(),
    );
    RenderCommand::Quad(QuadCommand::new(
        depth_key,
        state(texture),
        quads,
        Mat4::IDENTITY,
    ))
}

fn renderer() -> Renderer {
    Renderer::new(RendererDescriptor { quad_capacity: 256 }).unwrap()
}

fn draw_textures(backend: &RecordingBackend) -> Vec<u64> {
    backend.draws().iter().map(|d| d.state.texture.0).collect()
}

#[test]
fn group_flushes_parent_and_visits_child_in_place() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let child = r.create_render_queue();
    r.add_command(quad_cmd(0.0, 1, 2));
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, child)));
    r.add_command(quad_cmd(0.0, 3, 1));
    r.push_group(child);
    r.add_command(quad_cmd(0.0, 2, 4));
    r.pop_group();

    r.render(&mut backend);

    // Parent run before the group, child contents, parent run after. The
    // surrounding materials differ, so three draws in traversal order.
    assert_eq!(draw_textures(&backend), vec![1, 2, 3]);
    r.release_render_queue(child);
}

#[test]
fn group_boundary_splits_even_equal_materials() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let child = r.create_render_queue();
    r.add_command(quad_cmd(0.0, 1, 1));
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, child)));
    r.add_command_to(quad_cmd(0.0, 1, 1), child);
    r.render(&mut backend);

    // Same material on both sides of the boundary, still two draws.
    assert_eq!(backend.draw_call_count(), 2);
}

#[test]
fn nested_groups_traverse_depth_first() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let outer = r.create_render_queue();
    let inner = r.create_render_queue();

    r.add_command(quad_cmd(0.0, 1, 1));
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, outer)));
    r.push_group(outer);
    r.add_command(quad_cmd(0.0, 2, 1));
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, inner)));
    r.push_group(inner);
    r.add_command(quad_cmd(0.0, 3, 1));
    r.pop_group();
    r.add_command(quad_cmd(0.0, 4, 1));
    r.pop_group();
    r.add_command(quad_cmd(0.0, 5, 1));

    r.render(&mut backend);

    assert_eq!(draw_textures(&backend), vec![1, 2, 3, 4, 5]);
}

#[test]
fn group_command_sorts_by_depth_key_within_parent() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let child = r.create_render_queue();
    r.add_command_to(quad_cmd(0.0, 9, 1), child);
    // The group sinks below the negative-depth quad despite later submission.
    r.add_command(RenderCommand::Group(GroupCommand::new(-2.0, child)));
    r.add_command(quad_cmd(-1.0, 8, 1));
    r.render(&mut backend);

    assert_eq!(draw_textures(&backend), vec![9, 8]);
}

#[test]
fn released_queue_id_is_reused() {
    let mut r = renderer();
    let a = r.create_render_queue();
    r.release_render_queue(a);
    let b = r.create_render_queue();
    assert_eq!(a, b);
}

#[test]
fn released_queue_comes_back_empty() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let a = r.create_render_queue();
    r.add_command_to(quad_cmd(0.0, 7, 1), a);
    r.release_render_queue(a);

    let b = r.create_render_queue();
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, b)));
    r.render(&mut backend);

    assert_eq!(backend.draw_call_count(), 0);
}

#[test]
fn custom_command_runs_between_flushes() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);

    r.add_command(quad_cmd(0.0, 1, 2));
    r.add_command(RenderCommand::Custom(CustomCommand::new(0.0, move |_ctx| {
        flag.set(true);
    })));
    r.add_command(quad_cmd(0.0, 1, 2));
    r.render(&mut backend);

    assert!(ran.get());
    // The callback is a batch boundary even though it drew nothing itself.
    assert_eq!(backend.draw_call_count(), 2);
}

#[test]
fn custom_command_can_drive_the_backend_and_stats() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let quads: Arc<[Quad]> = Arc::from(vec![Quad::solid(Vec2::ZERO, Vec2::ONE, Color::BLUE)]);
    let vertices = quads[0].vertices().to_vec();
    r.add_command(RenderCommand::Custom(CustomCommand::new(0.0, move |ctx| {
        ctx.backend
            .draw_external(&PipelineState::default(), &vertices, &[0, 1, 2, 3, 2, 1]);
        ctx.stats.record_batch(1);
    })));
    r.render(&mut backend);

    assert_eq!(backend.draw_call_count(), 1);
    assert!(backend.draws()[0].external);
    assert_eq!(r.drawn_batches(), 1);
    assert_eq!(r.drawn_vertices(), 4);
}

#[test]
fn frame_brackets_every_render() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();
    r.add_command(quad_cmd(0.0, 1, 1));
    r.render(&mut backend);

    let calls = backend.calls();
    assert_eq!(calls.first(), Some(&BackendCall::BeginFrame));
    assert_eq!(calls.last(), Some(&BackendCall::EndFrame));
}

#[test]
fn render_clears_all_queues_including_nested() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();

    let child = r.create_render_queue();
    r.add_command(quad_cmd(0.0, 1, 1));
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, child)));
    r.add_command_to(quad_cmd(0.0, 2, 1), child);
    r.render(&mut backend);
    assert_eq!(backend.draw_call_count(), 2);

    // Nothing carries over into the next frame.
    r.add_command(RenderCommand::Group(GroupCommand::new(0.0, child)));
    r.render(&mut backend);
    assert_eq!(backend.draw_call_count(), 0);
}

#[test]
#[should_panic(expected = "pop_group without a matching push_group")]
fn unbalanced_pop_panics() {
    let mut r = renderer();
    r.pop_group();
}

#[test]
#[should_panic(expected = "not registered")]
fn submitting_to_released_state_is_caught_on_unknown_queue() {
    let mut r = renderer();
    let mut backend = RecordingBackend::new();
    let child = r.create_render_queue();
    // A group command naming a queue that was never registered in this
    // renderer is a producer bug; the visit panics.
    let mut other = renderer();
    other.add_command(RenderCommand::Group(GroupCommand::new(0.0, child)));
    other.render(&mut backend);
    let _ = r;
}
