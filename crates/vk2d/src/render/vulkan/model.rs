//! Static and dynamic indexed meshes
//!
//! Static models are uploaded once to device-local memory through a staging
//! copy and never change. Dynamic models live in host-visible memory and are
//! rewritten every frame; their buffers grow to fit and never shrink, so a
//! model that has stabilized at its peak size stops allocating entirely.

use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::vertex::VertexLayout;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::marker::PhantomData;
use std::mem;

/// Anything the renderer can bind and draw as an indexed mesh
pub trait DrawModel {
    /// Bind vertex and index buffers
    fn bind(&self, command_buffer: vk::CommandBuffer);
    /// Issue the indexed draw
    fn draw(&self, command_buffer: vk::CommandBuffer);
}

/// Immutable device-local mesh
pub struct StaticModel<V: VertexLayout + bytemuck::Pod> {
    device: Device,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    _marker: PhantomData<V>,
}

impl<V: VertexLayout + bytemuck::Pod> StaticModel<V> {
    /// Upload vertices and indices to device-local memory
    ///
    /// Blocks until the staging copies complete; intended for meshes built
    /// at startup, not per frame.
    pub fn new(
        context: &VulkanContext,
        command_pool: &CommandPool,
        vertices: &[V],
        indices: &[u32],
    ) -> VulkanResult<Self> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(VulkanError::InvalidOperation(
                "static model requires non-empty vertex and index data".to_string(),
            ));
        }

        let device = context.raw_device();
        let vertex_buffer = Buffer::device_local_with_data(
            device.clone(),
            context.instance().clone(),
            context.physical_device().device,
            command_pool,
            context.graphics_queue(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            vertices,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            device.clone(),
            context.instance().clone(),
            context.physical_device().device,
            command_pool,
            context.graphics_queue(),
            vk::BufferUsageFlags::INDEX_BUFFER,
            indices,
        )?;

        Ok(Self {
            device,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            _marker: PhantomData,
        })
    }

    /// Number of indices drawn per call
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl<V: VertexLayout + bytemuck::Pod> DrawModel for StaticModel<V> {
    fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[self.vertex_buffer.handle()],
                &[0],
            );
            self.device.cmd_bind_index_buffer(
                command_buffer,
                self.index_buffer.handle(),
                0,
                vk::IndexType::UINT32,
            );
        }
    }

    fn draw(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        }
    }
}

/// Host-visible mesh rewritten every frame
///
/// Buffers are created lazily on the first update and reallocated only when
/// the incoming data outgrows them. Data is re-copied on every update even
/// when capacity is unchanged.
pub struct DynamicModel<V: VertexLayout + bytemuck::Pod> {
    device: Device,
    vertex_buffer: Option<Buffer>,
    index_buffer: Option<Buffer>,
    vertex_capacity: usize,
    index_capacity: usize,
    index_count: u32,
    _marker: PhantomData<V>,
}

impl<V: VertexLayout + bytemuck::Pod> DynamicModel<V> {
    /// Create an empty dynamic model; buffers appear on first update
    pub fn new(context: &VulkanContext) -> Self {
        Self {
            device: context.raw_device(),
            vertex_buffer: None,
            index_buffer: None,
            vertex_capacity: 0,
            index_capacity: 0,
            index_count: 0,
            _marker: PhantomData,
        }
    }

    /// Replace the mesh contents, growing buffers only when needed
    pub fn update(
        &mut self,
        context: &VulkanContext,
        vertices: &[V],
        indices: &[u32],
    ) -> VulkanResult<()> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(VulkanError::InvalidOperation(
                "dynamic model update requires non-empty vertex and index data".to_string(),
            ));
        }

        if grow_needed(vertices.len(), self.vertex_capacity) {
            self.vertex_buffer = Some(Self::host_visible_buffer(
                context,
                (vertices.len() * mem::size_of::<V>()) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER,
            )?);
            self.vertex_capacity = vertices.len();
        }
        if grow_needed(indices.len(), self.index_capacity) {
            self.index_buffer = Some(Self::host_visible_buffer(
                context,
                (indices.len() * mem::size_of::<u32>()) as vk::DeviceSize,
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?);
            self.index_capacity = indices.len();
        }

        // Capacity checks above guarantee both buffers exist here.
        if let (Some(vb), Some(ib)) = (&self.vertex_buffer, &self.index_buffer) {
            vb.write_data(vertices)?;
            ib.write_data(indices)?;
        }
        self.index_count = indices.len() as u32;
        Ok(())
    }

    fn host_visible_buffer(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Buffer> {
        Buffer::new(
            context.raw_device(),
            context.instance().clone(),
            context.physical_device().device,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
    }

    /// Vertex buffer handle, if the model has ever been updated
    pub fn vertex_buffer_handle(&self) -> Option<vk::Buffer> {
        self.vertex_buffer.as_ref().map(Buffer::handle)
    }

    /// Current vertex capacity in elements
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    /// Current index capacity in elements
    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// Number of indices from the most recent update
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl<V: VertexLayout + bytemuck::Pod> DrawModel for DynamicModel<V> {
    fn bind(&self, command_buffer: vk::CommandBuffer) {
        if let (Some(vb), Some(ib)) = (&self.vertex_buffer, &self.index_buffer) {
            unsafe {
                self.device
                    .cmd_bind_vertex_buffers(command_buffer, 0, &[vb.handle()], &[0]);
                self.device.cmd_bind_index_buffer(
                    command_buffer,
                    ib.handle(),
                    0,
                    vk::IndexType::UINT32,
                );
            }
        }
    }

    fn draw(&self, command_buffer: vk::CommandBuffer) {
        if self.index_count == 0 {
            return;
        }
        unsafe {
            self.device
                .cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        }
    }
}

/// Whether an update of `new_count` elements forces a reallocation
///
/// Buffers grow to fit and never shrink.
pub(crate) fn grow_needed(new_count: usize, capacity: usize) -> bool {
    new_count > capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_only_when_count_exceeds_capacity() {
        assert!(grow_needed(1, 0));
        assert!(grow_needed(65, 64));
        assert!(!grow_needed(64, 64));
        assert!(!grow_needed(10, 64));
    }

    #[test]
    fn shrinking_data_never_reallocates() {
        // Simulate the capacity bookkeeping across a grow-then-shrink
        // sequence of updates.
        let mut capacity = 0usize;
        let mut reallocations = 0;

        for count in [100, 40, 100, 150, 20] {
            if grow_needed(count, capacity) {
                capacity = count;
                reallocations += 1;
            }
        }

        assert_eq!(capacity, 150);
        assert_eq!(reallocations, 2);
    }
}
