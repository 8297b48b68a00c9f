//! Buffer management for vertex, index, and uniform data
//!
//! Memory management following RAII patterns. Two upload paths exist:
//! host-visible buffers written directly through mapped memory, and
//! device-local buffers populated once through a staging buffer and a
//! blocking copy submission.

use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device, Instance};
use std::mem;

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: Device,
        instance: Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type_index = find_memory_type(
            &instance,
            physical_device,
            mem_requirements.memory_type_bits,
            properties,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device.allocate_memory(&alloc_info, None).map_err(|e| {
                if e == vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
                    || e == vk::Result::ERROR_OUT_OF_HOST_MEMORY
                {
                    VulkanError::OutOfMemory {
                        requested: mem_requirements.size as usize,
                    }
                } else {
                    VulkanError::Api(e)
                }
            })?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Create a device-local buffer populated from `data` via staging
    ///
    /// Writes a host-visible staging buffer, records a one-time copy command,
    /// and blocks on the graphics queue until the copy completes. The
    /// returned buffer is fully populated before any draw can reference it.
    /// Blocking is acceptable here because static geometry is built rarely,
    /// not per frame.
    pub fn device_local_with_data<T: bytemuck::Pod>(
        device: Device,
        instance: Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        queue: vk::Queue,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let size = (data.len() * mem::size_of::<T>()) as vk::DeviceSize;

        let staging = Buffer::new(
            device.clone(),
            instance.clone(),
            physical_device,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(data)?;

        let buffer = Buffer::new(
            device,
            instance,
            physical_device,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        buffer.copy_from(&staging, command_pool, queue)?;
        Ok(buffer)
    }

    /// Record and submit a blocking buffer-to-buffer copy
    fn copy_from(
        &self,
        src: &Buffer,
        command_pool: &CommandPool,
        queue: vk::Queue,
    ) -> VulkanResult<()> {
        let command_buffer = command_pool.begin_one_time()?;

        let region = vk::BufferCopy::builder().size(src.size).build();
        unsafe {
            self.device
                .cmd_copy_buffer(command_buffer, src.buffer, self.buffer, &[region]);
        }

        command_pool.end_one_time(command_buffer, queue)
    }

    /// Map memory for writing
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap memory
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Write data to the buffer through a transient mapping
    pub fn write_data<T>(&self, data: &[T]) -> VulkanResult<()> {
        let data_ptr = self.map_memory()?;

        unsafe {
            let src_ptr = data.as_ptr() as *const std::ffi::c_void;
            let size = data.len() * mem::size_of::<T>();
            std::ptr::copy_nonoverlapping(src_ptr, data_ptr, size);
        }

        self.unmap_memory();
        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Find a memory type matching the filter and property requirements
pub(crate) fn find_memory_type(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let mem_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

    for i in 0..mem_properties.memory_type_count {
        if (type_filter & (1 << i)) != 0
            && mem_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
        {
            return Ok(i);
        }
    }

    Err(VulkanError::NoSuitableMemoryType)
}
