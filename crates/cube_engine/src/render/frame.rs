//! Per-frame state machine
//!
//! [`FrameDriver`] walks one frame through Idle -> ImageAcquired -> Submitted
//! -> Presented and back to Idle, rebuilding the swapchain when the backend
//! reports it stale or the window changed size. It knows nothing about
//! Vulkan handles; everything GPU-facing sits behind [`FrameBackend`].

use ash::vk;

use crate::render::uniform::{CubeAnimation, UniformBufferObject};
use crate::render::vulkan::VulkanResult;

/// Result of asking the swapchain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready to be rendered to once its semaphore signals
    Acquired {
        /// Index into the swapchain images
        image_index: u32,
        /// The swapchain still works but no longer matches the surface
        suboptimal: bool,
    },
    /// The swapchain can no longer be used with the surface
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Queued normally
    Presented,
    /// Out of date or suboptimal; rebuild before the next frame
    Stale,
}

/// Result of asking the backend to rebuild its swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A new swapchain generation is in place
    Rebuilt,
    /// The surface currently has no area; nothing was built
    Deferred,
}

/// What a call to [`FrameDriver::draw_frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was drawn and presented
    Presented {
        /// Swapchain image that was used
        image_index: u32,
    },
    /// The window or surface has no area; nothing was drawn
    Skipped,
    /// The swapchain was rebuilt but no image could be acquired yet
    SwapchainRebuilt,
}

/// Where the current frame is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame in progress
    Idle,
    /// An image was acquired
    ImageAcquired(u32),
    /// Its command buffer was submitted
    Submitted(u32),
    /// It was queued for presentation
    Presented(u32),
}

/// Counters kept across frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames that reached presentation
    pub frames_presented: u64,
    /// Frames skipped while the window or surface had no area
    pub frames_skipped: u64,
    /// Swapchain recreations
    pub swapchain_rebuilds: u64,
}

/// GPU-facing half of the frame loop
pub trait FrameBackend {
    /// Extent of the current swapchain images
    fn swapchain_extent(&self) -> vk::Extent2D;

    /// Number of swapchain images
    fn image_count(&self) -> usize;

    /// Acquire the next image, signaling the "image available" semaphore
    fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome>;

    /// Write this frame's matrices into the uniform buffer of `image_index`
    fn write_uniforms(&mut self, image_index: u32, uniforms: &UniformBufferObject) -> VulkanResult<()>;

    /// Submit the prerecorded commands for `image_index`
    fn submit(&mut self, image_index: u32) -> VulkanResult<()>;

    /// Queue `image_index` for presentation once rendering finishes
    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome>;

    /// Block until the submitted frame has completed
    fn wait_for_frame(&mut self) -> VulkanResult<()>;

    /// Block until the device is idle
    fn wait_idle(&self) -> VulkanResult<()>;

    /// Replace every swapchain-dependent object for `window_extent`
    ///
    /// Returns [`RebuildOutcome::Deferred`] without touching the device when
    /// the surface reports a zero extent; no zero-sized swapchain is created.
    fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<RebuildOutcome>;
}

/// Drives frames through a [`FrameBackend`]
pub struct FrameDriver<B> {
    backend: B,
    animation: CubeAnimation,
    window_extent: vk::Extent2D,
    needs_rebuild: bool,
    state: FrameState,
    stats: FrameStats,
}

impl<B: FrameBackend> FrameDriver<B> {
    /// Start with the window extent equal to the backend's swapchain extent
    pub fn new(backend: B, animation: CubeAnimation) -> Self {
        let window_extent = backend.swapchain_extent();
        Self {
            backend,
            animation,
            window_extent,
            needs_rebuild: false,
            state: FrameState::Idle,
            stats: FrameStats::default(),
        }
    }

    /// Record a new framebuffer size; the swapchain is rebuilt on the next frame
    pub fn notify_resized(&mut self, width: u32, height: u32) {
        log::debug!("Window resized to {width}x{height}");
        self.window_extent = vk::Extent2D { width, height };
        self.needs_rebuild = true;
    }

    /// Draw one frame at `elapsed` seconds since startup
    ///
    /// Errors other than swapchain staleness are returned unchanged and
    /// leave [`FrameDriver::state`] wherever the frame stopped.
    pub fn draw_frame(&mut self, elapsed: f32) -> VulkanResult<FrameStatus> {
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(self.skip());
        }

        if self.needs_rebuild && self.rebuild()? == RebuildOutcome::Deferred {
            return Ok(self.skip());
        }

        self.state = FrameState::Idle;
        let image_index = match self.backend.acquire_next_image()? {
            AcquireOutcome::Acquired { image_index, .. } => image_index,
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain out of date on acquire");
                if self.rebuild()? == RebuildOutcome::Deferred {
                    return Ok(self.skip());
                }
                match self.backend.acquire_next_image()? {
                    AcquireOutcome::Acquired { image_index, .. } => image_index,
                    AcquireOutcome::OutOfDate => {
                        self.needs_rebuild = true;
                        return Ok(FrameStatus::SwapchainRebuilt);
                    }
                }
            }
        };
        self.state = FrameState::ImageAcquired(image_index);

        let extent = self.backend.swapchain_extent();
        let uniforms = self.animation.uniforms(elapsed, extent.width, extent.height);
        self.backend.write_uniforms(image_index, &uniforms)?;

        self.backend.submit(image_index)?;
        self.state = FrameState::Submitted(image_index);

        if self.backend.present(image_index)? == PresentOutcome::Stale {
            log::debug!("Swapchain stale after present; rebuilding next frame");
            self.needs_rebuild = true;
        }
        self.state = FrameState::Presented(image_index);

        self.backend.wait_for_frame()?;
        self.state = FrameState::Idle;
        self.stats.frames_presented += 1;
        log::trace!("Frame {} presented on image {image_index}", self.stats.frames_presented);

        Ok(FrameStatus::Presented { image_index })
    }

    fn skip(&mut self) -> FrameStatus {
        self.stats.frames_skipped += 1;
        FrameStatus::Skipped
    }

    fn rebuild(&mut self) -> VulkanResult<RebuildOutcome> {
        if self.backend.recreate_swapchain(self.window_extent)? == RebuildOutcome::Deferred {
            log::debug!("Surface has no area; swapchain rebuild deferred");
            self.needs_rebuild = true;
            return Ok(RebuildOutcome::Deferred);
        }
        self.needs_rebuild = false;
        self.stats.swapchain_rebuilds += 1;
        let extent = self.backend.swapchain_extent();
        log::info!(
            "Swapchain rebuilt at {}x{} ({} images)",
            extent.width,
            extent.height,
            self.backend.image_count()
        );
        Ok(RebuildOutcome::Rebuilt)
    }

    /// Current lifecycle state
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Counters so far
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Whether a rebuild is scheduled for the next frame
    pub const fn rebuild_pending(&self) -> bool {
        self.needs_rebuild
    }

    /// Shared access to the backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
