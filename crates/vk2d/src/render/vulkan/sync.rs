//! Vulkan synchronization primitives
//!
//! RAII wrappers for semaphores (GPU-GPU ordering) and fences (host-GPU
//! ordering), plus the per-flight-slot bundle the frame orchestrator cycles
//! through. All host/GPU coordination in this engine goes through these two
//! primitives; there are no host-side locks.

use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// GPU-GPU synchronization primitive with automatic resource management
///
/// Signaled by one queue operation and waited on by another, e.g. image
/// acquisition signals and rendering waits, rendering signals and
/// presentation waits.
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
///
/// Host-GPU synchronization: the host blocks on `wait` until the GPU work
/// submitted with this fence has completed.
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally in the signaled state
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Wait for the fence to be signaled
    ///
    /// The frame orchestrator passes `u64::MAX`: an unfinished frame means
    /// waiting however long the GPU takes, there is no fallback.
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset the fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Frame synchronization objects for one flight slot
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready to be rendered to
    pub image_available: Semaphore,
    /// Signaled when rendering to the image has finished
    pub render_finished: Semaphore,
    /// Signaled when this slot's previous submission has fully completed
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects
    ///
    /// The fence starts signaled so the very first frame does not block.
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}
