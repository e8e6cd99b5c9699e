//! Quad vertex data streamed into the shared vertex buffer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::color::Color;

/// Number of vertices a quad contributes to the shared buffer.
pub const VERTICES_PER_QUAD: usize = 4;

/// Number of indices a quad contributes (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// One corner of a textured, colored quad.
///
/// 36 bytes, `#[repr(C)]` with no padding holes, so a `&[QuadVertex]` can be
/// cast straight to bytes for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Final position after the producer's transform (z carried through).
    pub position: [f32; 3],
    /// Vertex color, multiplied with the sampled texel.
    pub color: Color,
    /// Normalized texture coordinate.
    pub tex_coord: [f32; 2],
}

impl QuadVertex {
    /// Size of one vertex in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(position: [f32; 3], color: Color, tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }

    /// Returns the wgpu vertex buffer layout for the shared quad buffer.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec3)
            0 => Float32x3,
            // location 1: color (vec4)
            1 => Float32x4,
            // location 2: tex_coord (vec2)
            2 => Float32x2,
        ];

        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

/// A textured, colored quad: four corners in bottom-left, bottom-right,
/// top-left, top-right order.
///
/// The corner order matches the canonical index pattern
/// `[0, 1, 2, 3, 2, 1]` (two counter-wound triangles per quad).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Quad {
    pub bl: QuadVertex,
    pub br: QuadVertex,
    pub tl: QuadVertex,
    pub tr: QuadVertex,
}

impl Quad {
    /// An untextured quad covering `origin..origin + size`.
    ///
    /// UVs are all zero; pair with the backend's white fallback texture.
    pub fn solid(origin: Vec2, size: Vec2, color: Color) -> Self {
        Self::textured(origin, size, color, Vec2::ZERO, Vec2::ZERO)
    }

    /// A textured quad covering `origin..origin + size`, sampling
    /// `uv_min..uv_max`.
    pub fn textured(origin: Vec2, size: Vec2, color: Color, uv_min: Vec2, uv_max: Vec2) -> Self {
        let (x0, y0) = (origin.x, origin.y);
        let (x1, y1) = (origin.x + size.x, origin.y + size.y);
        Self {
            bl: QuadVertex::new([x0, y0, 0.0], color, [uv_min.x, uv_max.y]),
            br: QuadVertex::new([x1, y0, 0.0], color, [uv_max.x, uv_max.y]),
            tl: QuadVertex::new([x0, y1, 0.0], color, [uv_min.x, uv_min.y]),
            tr: QuadVertex::new([x1, y1, 0.0], color, [uv_max.x, uv_min.y]),
        }
    }

    /// The four corners as a vertex slice.
    pub fn vertices(&self) -> &[QuadVertex; 4] {
        bytemuck::cast_ref(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_vertex_size() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 36);
        assert_eq!(QuadVertex::SIZE, 36);
    }

    #[test]
    fn test_quad_size() {
        assert_eq!(
            std::mem::size_of::<Quad>(),
            VERTICES_PER_QUAD * std::mem::size_of::<QuadVertex>()
        );
    }

    #[test]
    fn test_quad_corners() {
        let q = Quad::solid(Vec2::new(1.0, 2.0), Vec2::new(10.0, 20.0), Color::WHITE);
        assert_eq!(q.bl.position, [1.0, 2.0, 0.0]);
        assert_eq!(q.tr.position, [11.0, 22.0, 0.0]);
        assert_eq!(q.vertices()[1], q.br);
    }

    #[test]
    fn test_textured_uvs() {
        let q = Quad::textured(
            Vec2::ZERO,
            Vec2::ONE,
            Color::WHITE,
            Vec2::new(0.25, 0.5),
            Vec2::new(0.75, 1.0),
        );
        assert_eq!(q.tl.tex_coord, [0.25, 0.5]);
        assert_eq!(q.br.tex_coord, [0.75, 1.0]);
    }
}
