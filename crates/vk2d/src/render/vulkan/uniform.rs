//! Pooled uniform sets
//!
//! A `UniformSet` bundles everything one draw call needs for its uniforms:
//! a private descriptor pool, one uniform buffer per flight slot, and the
//! descriptor sets pointing at them. The buffers stay persistently mapped
//! for their whole lifetime, so a per-draw update is a single memcpy.
//!
//! Sets are recycled through a [`FramePool`](super::frame_pool::FramePool)
//! owned by the pipeline: a set handed out this frame is only rewritten once
//! the same flight slot's fence has signaled, so the GPU never reads a
//! buffer mid-update.

use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::{VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT};
use ash::{vk, Device};
use std::ffi::c_void;

/// Descriptor pool, per-flight uniform buffers, and their descriptor sets
pub struct UniformSet {
    device: Device,
    descriptor_pool: vk::DescriptorPool,
    buffers: Vec<Buffer>,
    mapped: Vec<*mut c_void>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    ubo_size: usize,
}

impl UniformSet {
    /// Create a uniform set for a uniform block of `ubo_size` bytes
    pub fn new(
        context: &VulkanContext,
        layout: vk::DescriptorSetLayout,
        ubo_size: usize,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let frame_count = MAX_FRAMES_IN_FLIGHT as u32;

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: frame_count,
        }];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(frame_count);

        let descriptor_pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut mapped = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let buffer = Buffer::new(
                device.clone(),
                context.instance().clone(),
                context.physical_device().device,
                ubo_size as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            let ptr = buffer.map_memory()?;
            buffers.push(buffer);
            mapped.push(ptr);
        }

        let layouts = vec![layout; MAX_FRAMES_IN_FLIGHT];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool)
            .set_layouts(&layouts);

        let descriptor_sets = unsafe {
            device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        for (set, buffer) in descriptor_sets.iter().zip(&buffers) {
            let buffer_info = [vk::DescriptorBufferInfo {
                buffer: buffer.handle(),
                offset: 0,
                range: ubo_size as vk::DeviceSize,
            }];
            let write = vk::WriteDescriptorSet::builder()
                .dst_set(*set)
                .dst_binding(0)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info)
                .build();

            unsafe {
                device.update_descriptor_sets(&[write], &[]);
            }
        }

        Ok(Self {
            device,
            descriptor_pool,
            buffers,
            mapped,
            descriptor_sets,
            ubo_size,
        })
    }

    /// Write the uniform block for the given flight slot
    ///
    /// `bytes` must be exactly the block size the set was created with.
    pub fn write_ubo(&self, frame_index: usize, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() != self.ubo_size {
            return Err(VulkanError::InvalidOperation(format!(
                "uniform write of {} bytes into a {}-byte block",
                bytes.len(),
                self.ubo_size
            )));
        }

        // The slot's fence wait guarantees the GPU is done with this buffer.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.mapped[frame_index] as *mut u8,
                self.ubo_size,
            );
        }
        Ok(())
    }

    /// Bind this set's descriptor set for the given flight slot
    pub fn bind(
        &self,
        command_buffer: vk::CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
        frame_index: usize,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline_layout,
                0,
                &[self.descriptor_sets[frame_index]],
                &[],
            );
        }
    }

    /// Byte size of the uniform block this set was created for
    pub fn ubo_size(&self) -> usize {
        self.ubo_size
    }
}

impl Drop for UniformSet {
    fn drop(&mut self) {
        for buffer in &self.buffers {
            buffer.unmap_memory();
        }
        unsafe {
            // Frees the descriptor sets with it
            self.device
                .destroy_descriptor_pool(self.descriptor_pool, None);
        }
    }
}
