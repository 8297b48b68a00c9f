//! Frame orchestration and the shape drawing API
//!
//! The renderer owns the whole Vulkan stack and drives the per-frame cycle:
//! wait on the flight slot's fence, acquire a swapchain image, record draws,
//! submit, present, advance the slot. Shape calls are only legal between
//! `begin_frame` and `end_frame`; each records one indexed draw against a
//! pooled uniform set carrying that shape's transform and color.
//!
//! Coordinates are pixels with the origin at the top-left, y growing
//! downward. Rotation is in radians about the shape's center.

use crate::config::RendererConfig;
use crate::geometry::triangulate_polygon;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::frame_pool::FramePool;
use crate::render::vulkan::model::{DrawModel, DynamicModel, StaticModel};
use crate::render::vulkan::pipeline::Pipeline;
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::vertex::{ShapeUbo, Vertex2};
use crate::render::vulkan::window::Window;
use crate::render::vulkan::{VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT};
use ash::vk;
use nalgebra::Matrix4;
use std::f32::consts::TAU;
use std::path::Path;

/// Segment count for the unit circle mesh; at typical shape sizes the edges
/// are subpixel.
const CIRCLE_SEGMENTS: u32 = 64;

/// The top-level renderer owning all Vulkan state
///
/// Field order is teardown order: pooled and static resources first, then
/// the pipeline and frame plumbing, the context last.
pub struct Renderer {
    dynamic_pools: Vec<FramePool<DynamicModel<Vertex2>>>,
    unit_quad: StaticModel<Vertex2>,
    unit_circle: StaticModel<Vertex2>,
    pipeline: Pipeline,
    frame_sync: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    swapchain: Swapchain,
    render_pass: RenderPass,
    context: VulkanContext,
    clear_color: [f32; 4],
    current_frame: usize,
    image_index: u32,
    recording: bool,
}

impl Renderer {
    /// Bring up the full rendering stack against an existing window
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        config.shaders.validate().map_err(|e| {
            VulkanError::InitializationFailed(format!("shader configuration invalid: {}", e))
        })?;

        let context = VulkanContext::new(window, &config.application_name)?;

        let mut swapchain =
            Swapchain::new(&context, window.framebuffer_size(), vk::SwapchainKHR::null())?;
        let render_pass = RenderPass::new(context.raw_device(), swapchain.format())?;
        swapchain.populate_framebuffers(&render_pass)?;

        let pipeline = Pipeline::new::<Vertex2>(
            &context,
            &render_pass,
            Path::new(&config.shaders.vertex_shader_path),
            Path::new(&config.shaders.fragment_shader_path),
            ShapeUbo::SIZE,
        )?;

        let command_pool = CommandPool::new(context.raw_device(), context.graphics_family())?;
        let command_buffers =
            command_pool.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;

        let frame_sync = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(context.raw_device()))
            .collect::<VulkanResult<Vec<_>>>()?;

        let (quad_vertices, quad_indices) = unit_quad_mesh();
        let unit_quad = StaticModel::new(&context, &command_pool, &quad_vertices, &quad_indices)?;

        let (circle_vertices, circle_indices) = unit_circle_mesh(CIRCLE_SEGMENTS);
        let unit_circle =
            StaticModel::new(&context, &command_pool, &circle_vertices, &circle_indices)?;

        let dynamic_pools = (0..MAX_FRAMES_IN_FLIGHT).map(|_| FramePool::new()).collect();

        log::info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            dynamic_pools,
            unit_quad,
            unit_circle,
            pipeline,
            frame_sync,
            command_buffers,
            command_pool,
            swapchain,
            render_pass,
            context,
            clear_color: config.clear_color,
            current_frame: 0,
            image_index: 0,
            recording: false,
        })
    }

    /// Begin a frame: wait for the flight slot, acquire an image, start
    /// recording
    ///
    /// Returns `Ok(false)` when the swapchain was out of date and has been
    /// recreated; the caller skips drawing this iteration and tries again.
    pub fn begin_frame(&mut self, window: &mut Window) -> VulkanResult<bool> {
        if self.recording {
            return Err(VulkanError::InvalidOperation(
                "begin_frame called while a frame is already recording".to_string(),
            ));
        }

        self.frame_sync[self.current_frame].in_flight.wait(u64::MAX)?;

        let acquired = self
            .swapchain
            .acquire_next_image(self.frame_sync[self.current_frame].image_available.handle());

        self.image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.recreate_swapchain(window)?;
                return Ok(false);
            }
            Err(e) => return Err(VulkanError::Api(e)),
        };

        // Only reset once we know work will be submitted for this slot;
        // resetting before a bail-out would deadlock the next wait.
        self.frame_sync[self.current_frame].in_flight.reset()?;

        let device = self.context.device();
        let cmd = self.command_buffers[self.current_frame];

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;

            let begin_info = vk::CommandBufferBeginInfo::builder();
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(VulkanError::Api)?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            }];
            let extent = self.swapchain.extent();
            let render_pass_begin = vk::RenderPassBeginInfo::builder()
                .render_pass(self.render_pass.handle())
                .framebuffer(self.swapchain.framebuffer(self.image_index))
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(
                cmd,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                }],
            );
        }

        self.pipeline.bind(cmd);
        self.pipeline.begin_frame();
        self.dynamic_pools[self.current_frame].reset();
        self.recording = true;

        Ok(true)
    }

    /// Finish the frame: end recording, submit, present, advance the slot
    ///
    /// Out-of-date or suboptimal presents, and a window resize observed this
    /// frame, all trigger swapchain recreation after the submit has gone
    /// through.
    pub fn end_frame(&mut self, window: &mut Window) -> VulkanResult<()> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation(
                "end_frame called without a matching begin_frame".to_string(),
            ));
        }
        self.recording = false;

        let device = self.context.device();
        let cmd = self.command_buffers[self.current_frame];

        unsafe {
            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).map_err(VulkanError::Api)?;
        }

        let sync = &self.frame_sync[self.current_frame];
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [cmd];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            device
                .queue_submit(
                    self.context.graphics_queue(),
                    &[submit_info],
                    sync.in_flight.handle(),
                )
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [self.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let present_result = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        };

        let needs_recreation = match present_result {
            Ok(suboptimal) => suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => true,
            Err(e) => return Err(VulkanError::Api(e)),
        } || window.take_framebuffer_resized();

        if needs_recreation {
            self.recreate_swapchain(window)?;
        }

        self.current_frame = next_flight_frame(self.current_frame, MAX_FRAMES_IN_FLIGHT);
        Ok(())
    }

    /// Tear down and rebuild everything sized to the surface
    fn recreate_swapchain(&mut self, window: &mut Window) -> VulkanResult<()> {
        window.wait_nonzero_extent();
        self.context.wait_idle()?;

        let old_handle = self.swapchain.handle();
        let mut new_swapchain =
            Swapchain::new(&self.context, window.framebuffer_size(), old_handle)?;
        new_swapchain.populate_framebuffers(&self.render_pass)?;

        // The old chain is retired by the driver once its presents drain;
        // dropping our wrapper here destroys views and framebuffers too.
        self.swapchain = new_swapchain;

        log::debug!(
            "Swapchain recreated at {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }

    /// Draw a filled axis-scaled rectangle
    ///
    /// `(x, y)` is the center in pixels, `rotation` in radians about it.
    pub fn draw_rectangle(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotation: f32,
        color: [f32; 4],
    ) -> VulkanResult<()> {
        self.draw_static_shape(ShapeKind::Quad, x, y, width, height, rotation, color)
    }

    /// Draw a filled ellipse
    ///
    /// `width` and `height` are the full axis lengths, not radii.
    pub fn draw_ellipse(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotation: f32,
        color: [f32; 4],
    ) -> VulkanResult<()> {
        self.draw_static_shape(ShapeKind::Circle, x, y, width, height, rotation, color)
    }

    /// Draw a filled simple polygon from its boundary points
    ///
    /// Points are the outline in model space, in either winding order;
    /// concave outlines are fine. They go through the same transform as the
    /// other shapes: scaled by `width`/`height`, rotated, then centered at
    /// `(x, y)` in pixels. The triangulation runs on the CPU every call, so
    /// an outline reused across frames should stay fixed in model space and
    /// move through the transform arguments.
    pub fn draw_polygon(
        &mut self,
        points: &[[f32; 2]],
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotation: f32,
        color: [f32; 4],
    ) -> VulkanResult<()> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation(
                "draw_polygon called outside begin_frame/end_frame".to_string(),
            ));
        }

        let (vertices, indices) = triangulate_polygon(points).map_err(|e| {
            VulkanError::InvalidOperation(format!("polygon rejected: {}", e))
        })?;

        let cmd = self.command_buffers[self.current_frame];
        let frame = self.current_frame;
        let layout = self.pipeline.layout();

        let extent = self.swapchain.extent();
        let ubo = ShapeUbo {
            model: model_matrix(x, y, width, height, rotation).into(),
            view: Matrix4::identity().into(),
            proj: pixel_projection(extent.width as f32, extent.height as f32).into(),
            color,
        };

        let set = self.pipeline.next_uniform_set(&self.context)?;
        set.write_ubo(frame, bytemuck::bytes_of(&ubo))?;
        set.bind(cmd, layout, frame);

        let ctx = &self.context;
        let model =
            self.dynamic_pools[frame].acquire(|| VulkanResult::Ok(DynamicModel::new(ctx)))?;
        model.update(ctx, &vertices, &indices)?;
        model.bind(cmd);
        model.draw(cmd);
        Ok(())
    }

    fn draw_static_shape(
        &mut self,
        kind: ShapeKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotation: f32,
        color: [f32; 4],
    ) -> VulkanResult<()> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation(
                "shape draw called outside begin_frame/end_frame".to_string(),
            ));
        }

        let cmd = self.command_buffers[self.current_frame];
        let frame = self.current_frame;
        let layout = self.pipeline.layout();

        let extent = self.swapchain.extent();
        let ubo = ShapeUbo {
            model: model_matrix(x, y, width, height, rotation).into(),
            view: Matrix4::identity().into(),
            proj: pixel_projection(extent.width as f32, extent.height as f32).into(),
            color,
        };

        let set = self.pipeline.next_uniform_set(&self.context)?;
        set.write_ubo(frame, bytemuck::bytes_of(&ubo))?;
        set.bind(cmd, layout, frame);

        let mesh: &StaticModel<Vertex2> = match kind {
            ShapeKind::Quad => &self.unit_quad,
            ShapeKind::Circle => &self.unit_circle,
        };
        mesh.bind(cmd);
        mesh.draw(cmd);
        Ok(())
    }

    /// Block until the device is idle; call before dropping the renderer
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    /// Current flight slot index
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }
}

enum ShapeKind {
    Quad,
    Circle,
}

/// Advance the flight slot round-robin
pub(crate) fn next_flight_frame(current: usize, max_frames: usize) -> usize {
    (current + 1) % max_frames
}

/// Compose the model transform: translate to center, rotate, scale the unit
/// mesh up to the shape's dimensions
pub(crate) fn model_matrix(x: f32, y: f32, width: f32, height: f32, rotation: f32) -> Matrix4<f32> {
    Matrix4::new_translation(&nalgebra::Vector3::new(x, y, 0.0))
        * Matrix4::new_rotation(nalgebra::Vector3::new(0.0, 0.0, rotation))
        * Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(width, height, 1.0))
}

/// Orthographic projection mapping pixel coordinates to clip space
///
/// Top-left origin with y down. `new_orthographic` follows the GL
/// convention where `bottom` maps to clip -1; Vulkan's clip -1 is the top
/// of the screen, so passing `bottom = 0` puts pixel row zero at the top
/// with no axis flip needed.
pub(crate) fn pixel_projection(width: f32, height: f32) -> Matrix4<f32> {
    Matrix4::new_orthographic(0.0, width, 0.0, height, -1.0, 1.0)
}

/// Unit quad centered on the origin, 1x1
fn unit_quad_mesh() -> (Vec<Vertex2>, Vec<u32>) {
    let vertices = vec![
        Vertex2 {
            position: [-0.5, -0.5],
        },
        Vertex2 {
            position: [0.5, -0.5],
        },
        Vertex2 {
            position: [0.5, 0.5],
        },
        Vertex2 {
            position: [-0.5, 0.5],
        },
    ];
    let indices = vec![0, 1, 2, 2, 3, 0];
    (vertices, indices)
}

/// Unit circle centered on the origin, diameter 1, as a triangle fan
/// expressed with explicit indices
fn unit_circle_mesh(segments: u32) -> (Vec<Vertex2>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(segments as usize + 1);
    vertices.push(Vertex2 {
        position: [0.0, 0.0],
    });
    for i in 0..segments {
        let angle = TAU * (i as f32) / (segments as f32);
        vertices.push(Vertex2 {
            position: [0.5 * angle.cos(), 0.5 * angle.sin()],
        });
    }

    let mut indices = Vec::with_capacity(segments as usize * 3);
    for i in 0..segments {
        let next = (i + 1) % segments;
        indices.extend_from_slice(&[0, i + 1, next + 1]);
    }
    (vertices, indices)
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // GPU work must drain before any field teardown begins
        if let Err(e) = self.context.wait_idle() {
            log::error!("device wait failed during renderer teardown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn flight_frame_cycles_round_robin() {
        let mut frame = 0;
        let seen: Vec<usize> = (0..5)
            .map(|_| {
                let f = frame;
                frame = next_flight_frame(frame, MAX_FRAMES_IN_FLIGHT);
                f
            })
            .collect();
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn model_matrix_places_unit_quad_corner() {
        // A 100x50 rectangle centered at (200, 300), unrotated: the unit
        // quad corner (0.5, 0.5) lands at (250, 325).
        let m = model_matrix(200.0, 300.0, 100.0, 50.0, 0.0);
        let corner = m * Vector4::new(0.5, 0.5, 0.0, 1.0);
        assert_relative_eq!(corner.x, 250.0, epsilon = 1e-4);
        assert_relative_eq!(corner.y, 325.0, epsilon = 1e-4);
    }

    #[test]
    fn model_matrix_rotates_before_translating() {
        // Quarter turn: the point at +x on the unit mesh swings to +y,
        // scaled by the width, then offset by the center.
        let m = model_matrix(10.0, 20.0, 4.0, 4.0, std::f32::consts::FRAC_PI_2);
        let p = m * Vector4::new(0.5, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 22.0, epsilon = 1e-4);
    }

    #[test]
    fn projection_maps_pixels_to_clip_space() {
        let proj = pixel_projection(800.0, 600.0);

        // Top-left pixel corner maps to clip (-1, -1), the top-left of the
        // screen in Vulkan's downward clip-space y.
        let top_left = proj * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(top_left.x, -1.0, epsilon = 1e-4);
        assert_relative_eq!(top_left.y, -1.0, epsilon = 1e-4);

        let bottom_right = proj * Vector4::new(800.0, 600.0, 0.0, 1.0);
        assert_relative_eq!(bottom_right.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(bottom_right.y, 1.0, epsilon = 1e-4);

        let center = proj * Vector4::new(400.0, 300.0, 0.0, 1.0);
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn polygon_vertices_follow_the_shared_transform() {
        // A triangulated outline is placed by the same translate-rotate-
        // scale composition as the unit meshes: a unit-space polygon drawn
        // at (100, 50) with size 20x10 must land entirely inside that
        // rectangle's bounds.
        let outline = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [0.0, 0.5]];
        let (vertices, _) = triangulate_polygon(&outline).unwrap();

        let m = model_matrix(100.0, 50.0, 20.0, 10.0, 0.0);
        for v in &vertices {
            let p = m * Vector4::new(v.position[0], v.position[1], 0.0, 1.0);
            assert!(p.x >= 90.0 - 1e-4 && p.x <= 110.0 + 1e-4);
            assert!(p.y >= 45.0 - 1e-4 && p.y <= 55.0 + 1e-4);
        }

        // The outline's top-left corner lands exactly where a rectangle
        // corner of the same size would.
        let corner = m * Vector4::new(-0.5, -0.5, 0.0, 1.0);
        assert_relative_eq!(corner.x, 90.0, epsilon = 1e-4);
        assert_relative_eq!(corner.y, 45.0, epsilon = 1e-4);
    }

    #[test]
    fn unit_quad_spans_half_extents() {
        let (vertices, indices) = unit_quad_mesh();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        for v in &vertices {
            assert!(v.position[0].abs() <= 0.5);
            assert!(v.position[1].abs() <= 0.5);
        }
    }

    #[test]
    fn unit_circle_vertices_lie_on_radius_half() {
        let (vertices, indices) = unit_circle_mesh(CIRCLE_SEGMENTS);
        assert_eq!(vertices.len(), CIRCLE_SEGMENTS as usize + 1);
        assert_eq!(indices.len(), CIRCLE_SEGMENTS as usize * 3);

        for v in vertices.iter().skip(1) {
            let r = (v.position[0].powi(2) + v.position[1].powi(2)).sqrt();
            assert_relative_eq!(r, 0.5, epsilon = 1e-5);
        }

        // Every triangle fans out from the center vertex.
        for tri in indices.chunks(3) {
            assert_eq!(tri[0], 0);
        }
    }
}
