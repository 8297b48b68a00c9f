//! # vk2d
//!
//! A thin real-time 2D rendering engine built directly on Vulkan.
//!
//! The engine manages device initialization, swapchain presentation,
//! pipeline and descriptor lifecycle, per-frame synchronization, and a small
//! immediate-mode drawing API (rectangles, ellipses, arbitrary polygons via
//! constrained Delaunay triangulation) for an interactive window loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vk2d::config::RendererConfig;
//! use vk2d::render::vulkan::{Renderer, Window};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::default();
//!     let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
//!     let mut renderer = Renderer::new(&mut window, &config)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         if renderer.begin_frame(&mut window)? {
//!             renderer.draw_rectangle(100.0, 100.0, 150.0, 100.0, 0.0, [1.0, 1.0, 0.0, 1.0])?;
//!             renderer.end_frame(&mut window)?;
//!         }
//!     }
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod geometry;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::config::{ConfigError, RendererConfig, ShaderConfig, WindowConfig};
    pub use crate::geometry::{triangulate_polygon, GeometryError};
    pub use crate::render::vulkan::{
        DrawModel, DynamicModel, Renderer, StaticModel, Vertex2, VulkanError, VulkanResult,
        Window, MAX_FRAMES_IN_FLIGHT,
    };
}
