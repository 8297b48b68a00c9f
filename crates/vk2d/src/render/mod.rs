//! Rendering subsystem
//!
//! The only backend is Vulkan; the module split keeps the door open for the
//! day that stops being true without promising it.

pub mod vulkan;

pub use vulkan::{Renderer, VulkanError, VulkanResult, Window};
