// Drawable primitives
//
// A primitive owns its CPU-side geometry and the GPU buffers it was last
// uploaded to. Edits only mark it dirty; the upload happens once per frame
// boundary through `upload`, never mid-recording.

use ash::vk;
use glam::Vec2;
use std::sync::Arc;

use super::color::WHITE;
use crate::backend::{GpuBuffer, VulkanDevice};
use crate::error::RenderResult;
use crate::renderer::draw::{BufferSource, DrawItem, Transform, Vertex};

/// Quad corners, in the order the fragment shader interpolates them
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangle,
    /// Four corners, colored by bilinear interpolation
    Quad,
}

impl PrimitiveKind {
    pub fn bilinear(self) -> bool {
        matches!(self, PrimitiveKind::Quad)
    }

    fn default_vertices(self) -> Vec<Vertex> {
        match self {
            PrimitiveKind::Triangle => vec![
                Vertex::new(0.0, -0.5, WHITE),
                Vertex::new(0.5, 0.5, WHITE),
                Vertex::new(-0.5, 0.5, WHITE),
            ],
            // BL, BR, TR, TL
            PrimitiveKind::Quad => vec![
                Vertex::new(-0.5, -0.5, WHITE),
                Vertex::new(0.5, -0.5, WHITE),
                Vertex::new(0.5, 0.5, WHITE),
                Vertex::new(-0.5, 0.5, WHITE),
            ],
        }
    }

    fn default_indices(self) -> Vec<u32> {
        match self {
            PrimitiveKind::Triangle => Vec::new(),
            PrimitiveKind::Quad => QUAD_INDICES.to_vec(),
        }
    }
}

pub struct Primitive {
    kind: PrimitiveKind,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    transform: Transform,
    dirty: bool,
    vertex_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self::with_vertices(kind, kind.default_vertices())
    }

    pub fn with_vertices(kind: PrimitiveKind, vertices: Vec<Vertex>) -> Self {
        Self {
            kind,
            vertices,
            indices: kind.default_indices(),
            transform: Transform::default(),
            dirty: true,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn triangle() -> Self {
        Self::new(PrimitiveKind::Triangle)
    }

    pub fn quad() -> Self {
        Self::new(PrimitiveKind::Quad)
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // Transform changes travel as push constants, so they never dirty
    pub fn set_position(&mut self, position: Vec2) {
        self.transform.position = position;
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.transform.scale = scale;
    }

    pub fn set_vertices(&mut self, vertices: Vec<Vertex>) {
        self.vertices = vertices;
        self.dirty = true;
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.dirty = true;
    }

    /// Recolor vertices in order; extra colors are ignored
    pub fn set_colors(&mut self, colors: &[u32]) {
        for (vertex, &color) in self.vertices.iter_mut().zip(colors) {
            vertex.color = color;
        }
        self.dirty = true;
    }

    /// Push dirty geometry to fresh GPU buffers.
    ///
    /// Waits for the device to go idle first when replacing buffers that
    /// earlier frames may still read. Must not be called while recording.
    pub fn upload(&mut self, device: &Arc<VulkanDevice>) -> RenderResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if self.vertex_buffer.is_some() || self.index_buffer.is_some() {
            device.wait_idle()?;
        }

        self.vertex_buffer = (!self.vertices.is_empty())
            .then(|| {
                GpuBuffer::with_data(
                    device,
                    "primitive vertices",
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                    &self.vertices,
                )
            })
            .transpose()?;
        self.index_buffer = (!self.indices.is_empty())
            .then(|| {
                GpuBuffer::with_data(
                    device,
                    "primitive indices",
                    vk::BufferUsageFlags::INDEX_BUFFER,
                    &self.indices,
                )
            })
            .transpose()?;

        log::debug!(
            "Uploaded {:?}: {} vertices, {} indices",
            self.kind,
            self.vertices.len(),
            self.indices.len()
        );
        self.dirty = false;
        Ok(())
    }

    /// Snapshot for the renderer. Nothing uploaded means nothing drawn.
    pub fn draw_item(&self) -> DrawItem {
        let source = |buffer: &GpuBuffer| BufferSource {
            buffer: buffer.handle(),
            count: buffer.count(),
        };
        DrawItem {
            vertices: self.vertex_buffer.as_ref().map_or(BufferSource::EMPTY, source),
            indices: self.index_buffer.as_ref().map(source),
            transform: self.transform,
            bilinear: self.kind.bilinear(),
            corner_colors: self.corner_colors(),
        }
    }

    fn corner_colors(&self) -> [u32; 4] {
        let mut colors = [0; 4];
        if self.vertices.len() == 4 {
            for (slot, vertex) in colors.iter_mut().zip(&self.vertices) {
                *slot = vertex.color;
            }
        }
        colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quad_is_indexed_and_bilinear() {
        let quad = Primitive::quad();
        assert_eq!(quad.vertices().len(), 4);
        assert_eq!(quad.indices(), &QUAD_INDICES);
        assert!(quad.kind().bilinear());
        assert!(quad.vertices().iter().all(|v| v.color == WHITE));
    }

    #[test]
    fn default_triangle_draws_in_order() {
        let triangle = Primitive::triangle();
        assert_eq!(triangle.vertices().len(), 3);
        assert!(triangle.indices().is_empty());
        assert!(!triangle.kind().bilinear());
    }

    #[test]
    fn geometry_edits_mark_dirty_but_transforms_do_not() {
        let mut quad = Primitive::quad();
        quad.dirty = false;

        quad.set_position(Vec2::new(0.3, 0.1));
        quad.set_scale(Vec2::splat(0.5));
        assert!(!quad.is_dirty());
        assert_eq!(quad.transform().position, Vec2::new(0.3, 0.1));

        quad.set_indices(vec![0, 1, 2]);
        assert!(quad.is_dirty());
        quad.dirty = false;
        quad.set_vertices(Vec::new());
        assert!(quad.is_dirty());
    }

    #[test]
    fn corner_colors_come_from_quad_vertices() {
        let mut quad = Primitive::quad();
        quad.set_colors(&[1, 2, 3, 4, 5]);
        let item = quad.draw_item();
        assert_eq!(item.corner_colors, [1, 2, 3, 4]);
        assert!(item.bilinear);

        let triangle = Primitive::triangle();
        assert_eq!(triangle.draw_item().corner_colors, [0; 4]);
    }

    #[test]
    fn not_uploaded_means_nothing_to_draw() {
        let item = Primitive::quad().draw_item();
        assert_eq!(item.vertices, BufferSource::EMPTY);
        assert_eq!(item.indices, None);
    }
}
