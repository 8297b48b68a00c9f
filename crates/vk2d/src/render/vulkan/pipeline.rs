//! Graphics pipeline and its uniform-set pool
//!
//! One pipeline serves every shape: a vertex/fragment pair, a single
//! uniform-buffer binding visible to both stages, dynamic viewport and
//! scissor so swapchain recreation never touches the pipeline, and no
//! culling so winding order does not matter to callers.

use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::frame_pool::FramePool;
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::shader::ShaderModule;
use crate::render::vulkan::uniform::UniformSet;
use crate::render::vulkan::vertex::VertexLayout;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::ffi::CStr;
use std::path::Path;

const SHADER_ENTRY: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Graphics pipeline with pooled uniform sets
pub struct Pipeline {
    uniform_pool: FramePool<UniformSet>,
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_set_layout: vk::DescriptorSetLayout,
    ubo_size: usize,
}

impl Pipeline {
    /// Build the pipeline from compiled SPIR-V shader files
    ///
    /// `V` supplies the vertex input layout; `ubo_size` is the byte size of
    /// the uniform block both shader stages declare at binding 0.
    pub fn new<V: VertexLayout>(
        context: &VulkanContext,
        render_pass: &RenderPass,
        vertex_shader_path: &Path,
        fragment_shader_path: &Path,
        ubo_size: usize,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();

        let vert = ShaderModule::from_file(device.clone(), vertex_shader_path)?;
        let frag = ShaderModule::from_file(device.clone(), fragment_shader_path)?;

        let stages = [
            vert.stage_info(vk::ShaderStageFlags::VERTEX, SHADER_ENTRY),
            frag.stage_info(vk::ShaderStageFlags::FRAGMENT, SHADER_ENTRY),
        ];

        let binding_descriptions = [V::binding_description()];
        let attribute_descriptions = V::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic; counts still must be declared.
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build();

        let attachments = [color_blend_attachment];
        let color_blending =
            vk::PipelineColorBlendStateCreateInfo::builder().attachments(&attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let ubo_binding = vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build();

        let bindings = [ubo_binding];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

        let descriptor_set_layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let set_layouts = [descriptor_set_layout];
        let pipeline_layout_info =
            vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);

        let layout = unsafe {
            device
                .create_pipeline_layout(&pipeline_layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass.handle())
            .subpass(0)
            .build();

        let pipeline = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| VulkanError::Api(e))?[0]
        };

        log::debug!("Graphics pipeline created ({}-byte uniform block)", ubo_size);

        Ok(Self {
            uniform_pool: FramePool::new(),
            device,
            pipeline,
            layout,
            descriptor_set_layout,
            ubo_size,
        })
    }

    /// Rewind the uniform-set pool for a new frame
    pub fn begin_frame(&mut self) {
        self.uniform_pool.reset();
    }

    /// Take the next pooled uniform set, creating one on first use
    pub fn next_uniform_set(&mut self, context: &VulkanContext) -> VulkanResult<&mut UniformSet> {
        let layout = self.descriptor_set_layout;
        let ubo_size = self.ubo_size;
        self.uniform_pool
            .acquire(|| UniformSet::new(context, layout, ubo_size))
    }

    /// Bind the pipeline for graphics work
    pub fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline,
            );
        }
    }

    /// Get the pipeline layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Get the pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Number of uniform sets ever allocated
    pub fn uniform_set_count(&self) -> usize {
        self.uniform_pool.len()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // uniform_pool is declared first, so its sets (and their descriptor
        // pools) are gone before the set layout they were allocated against
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
            self.device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}
