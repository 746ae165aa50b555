//! Vulkan implementation of the frame backend
//!
//! [`VulkanRenderer`] owns every GPU object. Objects that depend on the
//! swapchain are grouped in a [`SwapchainGeneration`] that is dropped and
//! rebuilt as a unit; everything else lives as long as the renderer.
//! Field order is destruction order.

use ash::vk;

use crate::config::CubeConfig;
use crate::render::frame::{AcquireOutcome, FrameBackend, PresentOutcome, RebuildOutcome};
use crate::render::mesh::Mesh;
use crate::render::uniform::UniformBufferObject;

use super::buffer::{upload_to_device, Buffer};
use super::commands::{CommandBuffers, CommandPool, CommandRecorder};
use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::descriptor::{DescriptorSetLayout, DescriptorSets, DescriptorTargets};
use super::framebuffer::{select_depth_format, DepthBuffer, Framebuffer, DEPTH_FORMAT_CANDIDATES};
use super::render_pass::RenderPass;
use super::shader::{GraphicsPipeline, ShaderSources};
use super::swapchain::{Swapchain, SwapchainPlan};
use super::sync::FrameSync;
use super::texture::{Texture, TexturePixels};
use super::window::Window;

/// Everything rebuilt when the swapchain is recreated
struct SwapchainGeneration {
    command_buffers: CommandBuffers,
    descriptor_sets: DescriptorSets,
    uniform_buffers: Vec<Buffer>,
    framebuffers: Vec<Framebuffer>,
    depth_buffer: Option<DepthBuffer>,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

/// Renders the cube into a window's swapchain
pub struct VulkanRenderer {
    generation: Option<SwapchainGeneration>,
    frame_sync: FrameSync,
    texture: Texture,
    index_buffer: Buffer,
    vertex_buffer: Buffer,
    descriptor_set_layout: DescriptorSetLayout,
    transfer_pool: CommandPool,
    command_pool: CommandPool,
    shaders: ShaderSources,
    index_count: u32,
    depth_format: Option<vk::Format>,
    clear_color: [f32; 4],
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Bring up the device, upload the cube and build the first swapchain
    pub fn new(window: &mut Window, config: &CubeConfig) -> VulkanResult<Self> {
        config
            .validate()
            .map_err(|e| VulkanError::InitializationFailed(format!("invalid configuration: {e}")))?;

        let context = VulkanContext::new(window, &config.application_name, config.validation_enabled())?;
        let device = context.raw_device();
        let families = context.queue_families();

        let command_pool = CommandPool::new(device.clone(), families.graphics)?;
        let transfer_pool = CommandPool::new_transient(device.clone(), families.graphics)?;

        let shaders = ShaderSources::load(
            &config.shaders.vertex_shader_path,
            &config.shaders.fragment_shader_path,
        )?;

        let depth_format = if config.depth_enabled {
            Some(select_depth_format(
                &DEPTH_FORMAT_CANDIDATES,
                vk::ImageTiling::OPTIMAL,
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
                |format| context.format_properties(format),
            )?)
        } else {
            None
        };
        log::debug!("Depth format: {depth_format:?}");

        let descriptor_set_layout = DescriptorSetLayout::new(device.clone())?;

        let mesh = Mesh::cube();
        let memory_properties = *context.memory_properties();
        let vertex_buffer = upload_to_device(
            device.clone(),
            &memory_properties,
            &transfer_pool,
            context.graphics_queue(),
            bytemuck::cast_slice(&mesh.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = upload_to_device(
            device.clone(),
            &memory_properties,
            &transfer_pool,
            context.graphics_queue(),
            bytemuck::cast_slice(&mesh.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let pixels = TexturePixels::load_or_default(config.texture_path.as_deref())?;
        let physical = context.physical_device();
        let max_anisotropy = physical
            .supports_anisotropy()
            .then(|| physical.properties.limits.max_sampler_anisotropy.min(16.0));
        let texture = Texture::upload(
            device.clone(),
            &memory_properties,
            &transfer_pool,
            context.graphics_queue(),
            &pixels,
            max_anisotropy,
        )?;

        let frame_sync = FrameSync::new(device)?;

        let mut renderer = Self {
            generation: None,
            frame_sync,
            texture,
            index_buffer,
            vertex_buffer,
            descriptor_set_layout,
            transfer_pool,
            command_pool,
            shaders,
            index_count: mesh.index_count(),
            depth_format,
            clear_color: config.clear_color,
            context,
        };

        let (width, height) = window.framebuffer_extent();
        let plan = renderer.plan(vk::Extent2D { width, height })?;
        if plan.has_area() {
            renderer.generation = Some(renderer.build_generation(&plan)?);
        } else {
            log::warn!("Surface has no area at startup; swapchain waits for the next resize");
        }

        log::info!("Vulkan renderer ready on {}", renderer.context.physical_device().name());
        Ok(renderer)
    }

    /// Swapchain decisions from fresh surface data
    fn plan(&self, window_extent: vk::Extent2D) -> VulkanResult<SwapchainPlan> {
        let support = self.context.surface_support()?;
        SwapchainPlan::new(&support, window_extent)
    }

    fn build_generation(&self, plan: &SwapchainPlan) -> VulkanResult<SwapchainGeneration> {
        let device = self.context.raw_device();
        let memory_properties = self.context.memory_properties();

        let swapchain = Swapchain::new(
            device.clone(),
            self.context.swapchain_loader().clone(),
            self.context.surface(),
            plan,
            self.context.queue_families(),
        )?;
        let extent = swapchain.extent();

        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format().format, self.depth_format)?;
        let pipeline = GraphicsPipeline::new(
            device.clone(),
            render_pass.handle(),
            &self.shaders,
            &[self.descriptor_set_layout.handle()],
            extent,
            self.depth_format.is_some(),
        )?;

        let depth_buffer = self
            .depth_format
            .map(|format| DepthBuffer::new(device.clone(), memory_properties, format, extent))
            .transpose()?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&color_view| {
                let mut attachments = vec![color_view];
                if let Some(depth) = &depth_buffer {
                    attachments.push(depth.image_view());
                }
                Framebuffer::new(device.clone(), render_pass.handle(), &attachments, extent)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let uniform_buffers = (0..swapchain.image_count())
            .map(|_| {
                Buffer::new(
                    device.clone(),
                    memory_properties,
                    UniformBufferObject::SIZE,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let targets: Vec<DescriptorTargets> = uniform_buffers
            .iter()
            .map(|buffer| DescriptorTargets {
                uniform_buffer: buffer.handle(),
                uniform_range: UniformBufferObject::SIZE,
                image_view: self.texture.image_view(),
                sampler: self.texture.sampler(),
            })
            .collect();
        let descriptor_sets = DescriptorSets::new(device.clone(), self.descriptor_set_layout.handle(), &targets)?;

        let image_count = u32::try_from(swapchain.image_count()).map_err(|_| VulkanError::InvalidOperation {
            reason: "swapchain image count exceeds u32".to_string(),
        })?;
        let command_buffers = self.command_pool.allocate_command_buffers(image_count)?;

        let clear_values = render_pass.clear_values(self.clear_color);
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        for (index, framebuffer) in framebuffers.iter().enumerate() {
            let mut recorder = CommandRecorder::new(command_buffers.get(index)?, device.clone());
            recorder.begin(vk::CommandBufferUsageFlags::empty())?;
            {
                let mut pass =
                    recorder.begin_render_pass(render_pass.handle(), framebuffer.handle(), render_area, &clear_values)?;
                pass.cmd_bind_pipeline(pipeline.handle());
                pass.cmd_bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
                pass.cmd_bind_index_buffer(self.index_buffer.handle(), 0, vk::IndexType::UINT16);
                pass.cmd_bind_descriptor_sets(pipeline.layout(), &[descriptor_sets.get(index)?]);
                pass.cmd_draw_indexed(self.index_count, 1, 0, 0, 0);
            }
            recorder.end()?;
        }

        log::debug!(
            "Swapchain generation built: {} images at {}x{}",
            image_count,
            extent.width,
            extent.height
        );

        Ok(SwapchainGeneration {
            command_buffers,
            descriptor_sets,
            uniform_buffers,
            framebuffers,
            depth_buffer,
            pipeline,
            render_pass,
            swapchain,
        })
    }

    fn generation(&self) -> VulkanResult<&SwapchainGeneration> {
        self.generation.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "no swapchain".to_string(),
        })
    }

    /// Surface format of the current swapchain
    pub fn surface_format(&self) -> Option<vk::SurfaceFormatKHR> {
        self.generation.as_ref().map(|generation| generation.swapchain.format())
    }

    /// Whether validation output is routed to the log
    pub const fn validation_enabled(&self) -> bool {
        self.context.validation_enabled()
    }
}

impl FrameBackend for VulkanRenderer {
    fn swapchain_extent(&self) -> vk::Extent2D {
        self.generation
            .as_ref()
            .map_or_else(vk::Extent2D::default, |generation| generation.swapchain.extent())
    }

    fn image_count(&self) -> usize {
        self.generation
            .as_ref()
            .map_or(0, |generation| generation.swapchain.image_count())
    }

    /// Blocks without a timeout (`u64::MAX`) until the presentation engine
    /// hands out an image, so `TIMEOUT` and `NOT_READY` never reach the loop.
    fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome> {
        let generation = self.generation()?;
        let result = unsafe {
            self.context.swapchain_loader().acquire_next_image(
                generation.swapchain.handle(),
                u64::MAX,
                self.frame_sync.image_available.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn write_uniforms(&mut self, image_index: u32, uniforms: &UniformBufferObject) -> VulkanResult<()> {
        let buffer = self
            .generation()?
            .uniform_buffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no uniform buffer for image {image_index}"),
            })?;
        buffer.write_pod(uniforms)
    }

    fn submit(&mut self, image_index: u32) -> VulkanResult<()> {
        let command_buffers = [self.generation()?.command_buffers.get(image_index as usize)?];
        let wait_semaphores = [self.frame_sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.frame_sync.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)
        }
    }

    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
        let swapchains = [self.generation()?.swapchain.handle()];
        let wait_semaphores = [self.frame_sync.render_finished.handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn wait_for_frame(&mut self) -> VulkanResult<()> {
        let device = self.context.device();
        unsafe {
            device
                .queue_wait_idle(self.context.graphics_queue())
                .map_err(VulkanError::Api)?;
            if !self.context.queue_families().is_shared() {
                device
                    .queue_wait_idle(self.context.present_queue())
                    .map_err(VulkanError::Api)?;
            }
        }
        Ok(())
    }

    fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<RebuildOutcome> {
        let plan = self.plan(window_extent)?;
        if !plan.has_area() {
            return Ok(RebuildOutcome::Deferred);
        }

        self.context.wait_idle()?;
        // The old generation must be gone before the surface gets a new swapchain
        self.generation = None;
        self.generation = Some(self.build_generation(&plan)?);
        Ok(RebuildOutcome::Rebuilt)
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        let _ = self.context.wait_idle();
        self.generation = None;
    }
}
