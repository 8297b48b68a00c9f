//! Vulkan rendering backend
//!
//! Low-level Vulkan wrappers plus the frame orchestrator. Resource cleanup
//! follows RAII throughout: every wrapper owns its handles and destroys them
//! on drop, and composite types order their fields so drops run leaf-first.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod frame_pool;
pub mod framebuffer;
pub mod model;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod uniform;
pub mod vertex;
pub mod window;

pub use buffer::Buffer;
pub use commands::CommandPool;
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use frame_pool::FramePool;
pub use framebuffer::Framebuffer;
pub use model::{DrawModel, DynamicModel, StaticModel};
pub use pipeline::Pipeline;
pub use render_pass::RenderPass;
pub use renderer::Renderer;
pub use shader::ShaderModule;
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use uniform::UniformSet;
pub use vertex::{ShapeUbo, Vertex2, VertexLayout};
pub use window::{Window, WindowError};

/// Number of frames whose GPU work may be in flight concurrently.
///
/// Every per-frame-multiplexed resource (fences, semaphores, command
/// buffers, uniform buffer slots, dynamic model pools) is sized by this.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
