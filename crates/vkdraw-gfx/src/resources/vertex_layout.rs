use ash::vk;
use std::mem::offset_of;

/// 索引类型 Trait
pub trait GfxIndexType: Sized + Copy + bytemuck::Pod {
    const VK_INDEX_TYPE: vk::IndexType;
    fn byte_size() -> usize;
}

impl GfxIndexType for u32 {
    const VK_INDEX_TYPE: vk::IndexType = vk::IndexType::UINT32;
    fn byte_size() -> usize {
        size_of::<u32>()
    }
}

/// Vertex Buffer 中顶点布局的 trait 定义
pub trait GfxVertexLayout {
    fn vertex_input_bindings() -> Vec<vk::VertexInputBindingDescription>;

    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription>;

    /// 整个 Buffer 的大小
    fn buffer_size(vertex_cnt: usize) -> usize;
}

#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// 齐次坐标，w = 1
    pub position: [f32; 4],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}
impl Vertex {
    pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    /// 白色顶点
    #[inline]
    pub fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color: Self::WHITE,
            tex_coord,
        }
    }
}
impl Default for Vertex {
    fn default() -> Self {
        Self::new([0.0; 3], [0.0; 2])
    }
}

/// AoS 的顶点 buffer 布局，包含：Positions, Colors, UVs
pub struct VertexLayoutAoS;

impl GfxVertexLayout for VertexLayoutAoS {
    fn vertex_input_bindings() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            // positions
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32A32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            // colors
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
            // uvs
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, tex_coord) as u32,
            },
        ]
    }

    fn buffer_size(vertex_cnt: usize) -> usize {
        vertex_cnt * size_of::<Vertex>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 36);
        assert_eq!(VertexLayoutAoS::buffer_size(3), 108);
        assert_eq!(u32::byte_size(), 4);
    }

    #[test]
    fn attributes_follow_field_order() {
        let bindings = VertexLayoutAoS::vertex_input_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].stride, 36);

        let offsets: Vec<u32> = VertexLayoutAoS::vertex_input_attributes().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 28]);
    }

    #[test]
    fn new_vertex_is_white_and_homogeneous() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.25, 0.75]);
        assert_eq!(v.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(v.color, Vertex::WHITE);
        assert_eq!(v.tex_coord, [0.25, 0.75]);
    }
}
