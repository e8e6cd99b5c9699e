//! CPU staging arena mirroring the shared GPU quad buffer.
//!
//! Allocated once at renderer construction and never resized mid-frame. The
//! write cursor advances as quad commands are streamed in, rewinds to zero
//! when the buffer fills (only after the region's draws have been issued),
//! and resets at the start of every frame.

use glam::{Mat4, Vec3};

use crate::vertex::{INDICES_PER_QUAD, Quad, QuadVertex, VERTICES_PER_QUAD};

/// Fixed-capacity staging storage for quad vertices, addressed in quads.
#[derive(Debug)]
pub struct QuadArena {
    vertices: Vec<QuadVertex>,
    capacity: usize,
    cursor: usize,
}

impl QuadArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: vec![QuadVertex::new([0.0; 3], crate::Color::TRANSPARENT, [0.0; 2]); capacity * VERTICES_PER_QUAD],
            capacity,
            cursor: 0,
        }
    }

    /// Total capacity in quads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current write position in quads.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Quads that still fit before the cursor reaches capacity.
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// Reset the cursor for a new frame.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Rewind the cursor to zero mid-frame so the buffer region is reused.
    ///
    /// Only valid once every batch referencing the old region has been
    /// flushed; the renderer guarantees this by flushing before rewinding.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Append quads at the cursor, applying `model_view` to each vertex
    /// position, and return the quad index the run starts at.
    ///
    /// # Panics
    ///
    /// Panics if the quads do not fit; the caller must flush and rewind
    /// first. Overflowing the shared buffer is never recoverable by a
    /// partial append.
    pub fn append(&mut self, quads: &[Quad], model_view: &Mat4) -> usize {
        assert!(
            quads.len() <= self.remaining(),
            "quad arena overflow: {} quads into {} remaining",
            quads.len(),
            self.remaining()
        );
        let first_quad = self.cursor;
        let base = first_quad * VERTICES_PER_QUAD;
        let identity = *model_view == Mat4::IDENTITY;
        for (i, quad) in quads.iter().enumerate() {
            for (j, vertex) in quad.vertices().iter().enumerate() {
                let mut v = *vertex;
                if !identity {
                    v.position = model_view
                        .transform_point3(Vec3::from_array(v.position))
                        .to_array();
                }
                self.vertices[base + i * VERTICES_PER_QUAD + j] = v;
            }
        }
        self.cursor += quads.len();
        first_quad
    }

    /// The staged vertices for `count` quads starting at `first_quad`.
    pub fn vertices_for(&self, first_quad: usize, count: usize) -> &[QuadVertex] {
        let start = first_quad * VERTICES_PER_QUAD;
        &self.vertices[start..start + count * VERTICES_PER_QUAD]
    }

    /// The canonical quad index pattern for `quad_count` quads:
    /// `[0, 1, 2, 3, 2, 1]` shifted by four per quad.
    pub fn index_pattern(quad_count: usize) -> Vec<u16> {
        let mut indices = Vec::with_capacity(quad_count * INDICES_PER_QUAD);
        for quad in 0..quad_count {
            let base = (quad * VERTICES_PER_QUAD) as u16;
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 3, base + 2, base + 1]);
        }
        indices
    }
}

/// Flatten quads into transformed vertices without staging them, for draws
/// that bypass the shared buffer (pre-batched commands).
pub(crate) fn transform_quads(quads: &[Quad], model_view: &Mat4) -> Vec<QuadVertex> {
    let identity = *model_view == Mat4::IDENTITY;
    let mut vertices = Vec::with_capacity(quads.len() * VERTICES_PER_QUAD);
    for quad in quads {
        for vertex in quad.vertices() {
            let mut v = *vertex;
            if !identity {
                v.position = model_view
                    .transform_point3(Vec3::from_array(v.position))
                    .to_array();
            }
            vertices.push(v);
        }
    }
    vertices
}
