//! Vertex layouts and the shape uniform block
//!
//! Each vertex type describes its own input layout; the descriptions must
//! exactly match the paired shader's input declarations. A mismatch is
//! undefined behavior in the driver, not something this engine can detect.

use ash::vk;

/// Data contract between a vertex type and the pipeline's vertex input state
pub trait VertexLayout {
    /// Binding description: stride and input rate
    fn binding_description() -> vk::VertexInputBindingDescription;
    /// Per-attribute location, format, and byte offset
    fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription>;
}

/// 2D position-only vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex2 {
    /// Position in model space
    pub position: [f32; 2],
}

unsafe impl bytemuck::Pod for Vertex2 {}
unsafe impl bytemuck::Zeroable for Vertex2 {}

impl VertexLayout for Vertex2 {
    fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex2>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![vk::VertexInputAttributeDescription {
            binding: 0,
            location: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: 0,
        }]
    }
}

/// Uniform block consumed by the shape shaders
///
/// Field order and byte size must match the shader's uniform declaration;
/// the block travels to the GPU as raw bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShapeUbo {
    /// Model transform (column-major)
    pub model: [[f32; 4]; 4],
    /// View transform (column-major)
    pub view: [[f32; 4]; 4],
    /// Projection transform (column-major)
    pub proj: [[f32; 4]; 4],
    /// Fill color (RGBA)
    pub color: [f32; 4],
}

unsafe impl bytemuck::Pod for ShapeUbo {}
unsafe impl bytemuck::Zeroable for ShapeUbo {}

impl ShapeUbo {
    /// Byte size of the uniform block
    pub const SIZE: usize = std::mem::size_of::<ShapeUbo>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn vertex2_stride_matches_layout() {
        let binding = Vertex2::binding_description();
        assert_eq!(binding.stride, 8);
        assert_eq!(binding.binding, 0);

        let attributes = Vertex2::attribute_descriptions();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[0].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn shape_ubo_layout_is_stable() {
        // Three mat4s plus one vec4, tightly packed.
        assert_eq!(ShapeUbo::SIZE, 64 * 3 + 16);
        assert_eq!(std::mem::align_of::<ShapeUbo>(), 4);
    }

    #[test]
    fn shape_ubo_bytes_round_trip() {
        let mut ubo = ShapeUbo::zeroed();
        ubo.model[0][0] = 1.5;
        ubo.color = [0.25, 0.5, 0.75, 1.0];

        // Mirror what a mapped uniform slot sees: the raw bytes written in
        // must read back unmodified.
        let bytes = bytemuck::bytes_of(&ubo).to_vec();
        let back: ShapeUbo = *bytemuck::from_bytes(&bytes);
        assert_eq!(back.model[0][0], 1.5);
        assert_eq!(back.color, ubo.color);
    }
}
