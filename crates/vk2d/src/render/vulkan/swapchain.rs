//! Swapchain management and surface configuration
//!
//! Owns the presentable image chain, one view per image, and the matching
//! framebuffers. Format, present mode, extent, and image count are chosen by
//! pure helpers so the selection rules are testable without a device.

use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::framebuffer::Framebuffer;
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

/// Swapchain wrapper managing presentable images
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<Framebuffer>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the current surface state
    ///
    /// `window_extent` is the framebuffer size in pixels, consulted only
    /// when the surface leaves the extent up to the application. Pass the
    /// retired swapchain handle during recreation so in-flight presents can
    /// finish against it; `vk::SwapchainKHR::null()` otherwise.
    pub fn new(
        context: &VulkanContext,
        window_extent: (u32, u32),
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical_device = context.physical_device().device;
        let surface = context.surface();
        let surface_loader = context.surface_loader();

        let (capabilities, formats, present_modes) = unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(VulkanError::Api)?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(VulkanError::Api)?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(VulkanError::Api)?;
            (capabilities, formats, present_modes)
        };

        let surface_format = choose_surface_format(&formats);
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, window_extent);
        let image_count = choose_image_count(&capabilities);

        log::debug!(
            "Swapchain: {:?} {:?} {}x{} ({} images)",
            surface_format.format,
            present_mode,
            extent.width,
            extent.height,
            image_count
        );

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        // Concurrent sharing only when graphics and present are distinct
        // families; exclusive is the fast path on single-queue hardware.
        let family_indices = [context.graphics_family(), context.present_family()];
        if context.graphics_family() != context.present_family() {
            create_info = create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices);
        } else {
            create_info = create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE);
        }

        let loader = context.swapchain_loader().clone();
        let device = context.raw_device();

        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let image_views = Self::create_image_views(&device, &images, surface_format.format)?;

        Ok(Self {
            device,
            loader,
            swapchain,
            images,
            image_views,
            framebuffers: Vec::new(),
            format: surface_format.format,
            extent,
        })
    }

    fn create_image_views(
        device: &Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> VulkanResult<Vec<vk::ImageView>> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                unsafe {
                    device
                        .create_image_view(&create_info, None)
                        .map_err(VulkanError::Api)
                }
            })
            .collect()
    }

    /// Build one framebuffer per swapchain image against `render_pass`
    ///
    /// Must be called after creation and after every recreation, before the
    /// first frame is recorded.
    pub fn populate_framebuffers(&mut self, render_pass: &RenderPass) -> VulkanResult<()> {
        self.framebuffers = self
            .image_views
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    self.device.clone(),
                    render_pass.handle(),
                    view,
                    self.extent,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;
        Ok(())
    }

    /// Acquire the next presentable image
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    /// `ERROR_OUT_OF_DATE_KHR` is passed through for the caller to trigger
    /// recreation.
    pub fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        }
    }

    /// Get the swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the color format of the swapchain images
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get the swapchain extent in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of images in the chain
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Framebuffer handle for the given image index
    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize].handle()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Framebuffers reference the views, so they drop first via the
        // field ordering above.
        self.framebuffers.clear();
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Prefer B8G8R8A8_UNORM with sRGB nonlinear color space
///
/// A single `UNDEFINED` entry means the surface accepts anything, so the
/// preferred pair is used outright. Otherwise fall back to the first
/// advertised format when the preferred pair is absent.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return preferred;
    }

    formats
        .iter()
        .copied()
        .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
        .unwrap_or_else(|| formats[0])
}

/// Prefer MAILBOX, then IMMEDIATE, then the always-available FIFO
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    for preferred in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
        if modes.contains(&preferred) {
            return preferred;
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Resolve the swapchain extent from surface capabilities
///
/// Most platforms pin `current_extent`; the sentinel `u32::MAX` width means
/// the application picks, clamped to the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: window_extent.0.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.1.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image above the minimum, capped by the maximum when bounded
///
/// `max_image_count == 0` means the surface imposes no upper bound.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(
        min_count: u32,
        max_count: u32,
        current: (u32, u32),
        min_extent: (u32, u32),
        max_extent: (u32, u32),
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min_extent.0,
                height: min_extent.1,
            },
            max_image_extent: vk::Extent2D {
                width: max_extent.0,
                height: max_extent.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn preferred_format_selected_when_available() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn undefined_format_means_free_choice() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn first_format_used_when_preferred_absent() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R16G16B16A16_SFLOAT,
                color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn present_mode_preference_order() {
        let all = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(choose_present_mode(&all), vk::PresentModeKHR::MAILBOX);

        let no_mailbox = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            choose_present_mode(&no_mailbox),
            vk::PresentModeKHR::IMMEDIATE
        );

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&fifo_only), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_taken_from_surface_when_pinned() {
        let caps = capabilities(2, 8, (1024, 768), (1, 1), (4096, 4096));
        let extent = choose_extent(&caps, (640, 480));
        assert_eq!(extent.width, 1024);
        assert_eq!(extent.height, 768);
    }

    #[test]
    fn extent_clamped_when_application_chooses() {
        let caps = capabilities(2, 8, (u32::MAX, u32::MAX), (200, 200), (800, 800));

        let small = choose_extent(&caps, (100, 100));
        assert_eq!(small.width, 200);
        assert_eq!(small.height, 200);

        let large = choose_extent(&caps, (1920, 1080));
        assert_eq!(large.width, 800);
        assert_eq!(large.height, 800);

        let in_range = choose_extent(&caps, (640, 480));
        assert_eq!(in_range.width, 640);
        assert_eq!(in_range.height, 480);
    }

    #[test]
    fn image_count_is_min_plus_one_capped_by_max() {
        let caps = capabilities(2, 3, (800, 600), (1, 1), (4096, 4096));
        assert_eq!(choose_image_count(&caps), 3);

        let tight = capabilities(3, 3, (800, 600), (1, 1), (4096, 4096));
        assert_eq!(choose_image_count(&tight), 3);
    }

    #[test]
    fn zero_max_image_count_means_unbounded() {
        let caps = capabilities(2, 0, (800, 600), (1, 1), (4096, 4096));
        assert_eq!(choose_image_count(&caps), 3);
    }
}
