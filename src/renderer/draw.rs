// Draw submission contract
//
// A DrawItem is a read-only snapshot of one drawable: where its geometry
// lives on the GPU, how it is placed, and how it is colored. The renderer
// turns it into a single push-constant block plus one draw call.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::mem::{offset_of, size_of};

/// 2D vertex with a packed 0xAABBGGRR color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: u32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: u32) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32_UINT,
                offset: offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

/// Placement in normalized device space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
        }
    }
}

/// A GPU buffer and how many elements it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSource {
    pub buffer: vk::Buffer,
    pub count: u32,
}

impl BufferSource {
    pub const EMPTY: Self = Self {
        buffer: vk::Buffer::null(),
        count: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub vertices: BufferSource,
    /// u32 indices; `None` draws the vertices in order
    pub indices: Option<BufferSource>,
    pub transform: Transform,
    pub bilinear: bool,
    /// Bottom-left, bottom-right, top-right, top-left
    pub corner_colors: [u32; 4],
}

/// Per-draw block shared by the vertex and fragment stages
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PushConstants {
    pub position: [f32; 2],
    pub scale: [f32; 2],
    pub colors: [u32; 4],
    pub is_bilinear: i32,
    _pad: [u32; 3],
}

impl PushConstants {
    pub fn new(item: &DrawItem, extent: vk::Extent2D) -> Self {
        let scale = aspect_corrected_scale(item.transform.scale, extent);
        // Corner interpolation only makes sense for a four-corner shape
        let bilinear = item.bilinear && item.vertices.count == 4;
        Self {
            position: item.transform.position.to_array(),
            scale: scale.to_array(),
            colors: item.corner_colors,
            is_bilinear: bilinear as i32,
            _pad: [0; 3],
        }
    }
}

/// Keep shapes square on a non-square surface
pub fn aspect_corrected_scale(scale: Vec2, extent: vk::Extent2D) -> Vec2 {
    if extent.height == 0 {
        return scale;
    }
    let aspect = extent.width as f32 / extent.height as f32;
    if aspect > 1.0 {
        Vec2::new(scale.x / aspect, scale.y)
    } else {
        Vec2::new(scale.x, scale.y * aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(vertex_count: u32, bilinear: bool) -> DrawItem {
        DrawItem {
            vertices: BufferSource {
                buffer: vk::Buffer::null(),
                count: vertex_count,
            },
            indices: None,
            transform: Transform {
                position: Vec2::new(0.25, -0.5),
                scale: Vec2::new(0.5, 0.5),
            },
            bilinear,
            corner_colors: [0xFF00_00FF, 0xFF00_FF00, 0xFFFF_0000, 0xFFFF_FFFF],
        }
    }

    #[test]
    fn layouts_match_the_shaders() {
        assert_eq!(size_of::<Vertex>(), 12);
        assert_eq!(size_of::<PushConstants>(), 48);
        assert_eq!(offset_of!(PushConstants, colors), 16);
        assert_eq!(offset_of!(PushConstants, is_bilinear), 32);

        let attributes = Vertex::attribute_descriptions();
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(Vertex::binding_description().stride, 12);
    }

    #[test]
    fn wide_surface_narrows_x() {
        let scale = aspect_corrected_scale(
            Vec2::ONE,
            vk::Extent2D {
                width: 1600,
                height: 800,
            },
        );
        assert_eq!(scale, Vec2::new(0.5, 1.0));
    }

    #[test]
    fn tall_surface_shrinks_y() {
        let scale = aspect_corrected_scale(
            Vec2::ONE,
            vk::Extent2D {
                width: 400,
                height: 800,
            },
        );
        assert_eq!(scale, Vec2::new(1.0, 0.5));

        let square = vk::Extent2D {
            width: 600,
            height: 600,
        };
        assert_eq!(aspect_corrected_scale(Vec2::splat(2.0), square), Vec2::splat(2.0));
    }

    #[test]
    fn bilinear_needs_exactly_four_vertices() {
        let extent = vk::Extent2D {
            width: 800,
            height: 800,
        };
        assert_eq!(PushConstants::new(&item(4, true), extent).is_bilinear, 1);
        assert_eq!(PushConstants::new(&item(3, true), extent).is_bilinear, 0);
        assert_eq!(PushConstants::new(&item(4, false), extent).is_bilinear, 0);
    }

    #[test]
    fn push_block_carries_transform_and_colors() {
        let extent = vk::Extent2D {
            width: 1000,
            height: 500,
        };
        let push = PushConstants::new(&item(4, true), extent);
        assert_eq!(push.position, [0.25, -0.5]);
        assert_eq!(push.scale, [0.25, 0.5]);
        assert_eq!(push.colors[3], 0xFFFF_FFFF);
        assert_eq!(bytemuck::bytes_of(&push).len(), 48);
    }
}
