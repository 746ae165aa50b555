//! Frame loop scenarios against a scripted backend

#[cfg(test)]
mod tests {
    use super::super::frame::*;
    use super::super::uniform::{model_rotation_degrees, CubeAnimation, UniformBufferObject};
    use crate::render::vulkan::{SurfaceSupport, SwapchainPlan, VulkanError, VulkanResult};
    use approx::assert_relative_eq;
    use ash::vk;
    use std::collections::VecDeque;

    /// Tracks the calls a real swapchain would see and asserts their order
    struct MockBackend {
        support: SurfaceSupport,
        extent: vk::Extent2D,
        image_count: usize,
        next_image: u32,
        acquired: Option<u32>,
        submitted: Option<u32>,
        presented: Option<u32>,
        out_of_date_acquires: VecDeque<bool>,
        present_outcomes: VecDeque<PresentOutcome>,
        written: Vec<(u32, UniformBufferObject)>,
        recreated_at: Vec<vk::Extent2D>,
        generation: u32,
    }

    impl MockBackend {
        fn new(width: u32, height: u32) -> Self {
            let support = SurfaceSupport {
                capabilities: vk::SurfaceCapabilitiesKHR {
                    min_image_count: 2,
                    max_image_count: 3,
                    current_extent: vk::Extent2D {
                        width: u32::MAX,
                        height: u32::MAX,
                    },
                    min_image_extent: vk::Extent2D { width: 1, height: 1 },
                    max_image_extent: vk::Extent2D {
                        width: 4096,
                        height: 4096,
                    },
                    ..Default::default()
                },
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![vk::PresentModeKHR::FIFO],
            };
            let mut backend = Self {
                support,
                extent: vk::Extent2D::default(),
                image_count: 0,
                next_image: 0,
                acquired: None,
                submitted: None,
                presented: None,
                out_of_date_acquires: VecDeque::new(),
                present_outcomes: VecDeque::new(),
                written: Vec::new(),
                recreated_at: Vec::new(),
                generation: 0,
            };
            backend.apply_plan(vk::Extent2D { width, height }).unwrap();
            backend
        }

        fn apply_plan(&mut self, window_extent: vk::Extent2D) -> VulkanResult<RebuildOutcome> {
            let plan = SwapchainPlan::new(&self.support, window_extent)?;
            if !plan.has_area() {
                return Ok(RebuildOutcome::Deferred);
            }
            self.extent = plan.extent;
            self.image_count = plan.image_count as usize;
            self.next_image = 0;
            self.generation += 1;
            Ok(RebuildOutcome::Rebuilt)
        }

        fn set_surface_extent(&mut self, width: u32, height: u32) {
            self.support.capabilities.current_extent = vk::Extent2D { width, height };
        }

        fn last_written(&self) -> &UniformBufferObject {
            &self.written.last().expect("no uniforms written").1
        }
    }

    impl FrameBackend for MockBackend {
        fn swapchain_extent(&self) -> vk::Extent2D {
            self.extent
        }

        fn image_count(&self) -> usize {
            self.image_count
        }

        fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome> {
            assert_eq!(self.acquired, None, "acquire while a frame is outstanding");
            if self.out_of_date_acquires.pop_front().unwrap_or(false) {
                return Ok(AcquireOutcome::OutOfDate);
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count as u32;
            self.acquired = Some(image_index);
            Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal: false,
            })
        }

        fn write_uniforms(&mut self, image_index: u32, uniforms: &UniformBufferObject) -> VulkanResult<()> {
            assert_eq!(self.acquired, Some(image_index), "uniforms for an unacquired image");
            assert_eq!(self.submitted, None, "uniforms written after submit");
            self.written.push((image_index, *uniforms));
            Ok(())
        }

        fn submit(&mut self, image_index: u32) -> VulkanResult<()> {
            assert_eq!(self.acquired, Some(image_index), "submit without acquire");
            self.submitted = Some(image_index);
            Ok(())
        }

        fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
            assert_eq!(self.submitted, Some(image_index), "present without submit");
            self.presented = Some(image_index);
            Ok(self.present_outcomes.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn wait_for_frame(&mut self) -> VulkanResult<()> {
            assert!(self.presented.is_some(), "wait without present");
            self.acquired = None;
            self.submitted = None;
            self.presented = None;
            Ok(())
        }

        fn wait_idle(&self) -> VulkanResult<()> {
            Ok(())
        }

        fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<RebuildOutcome> {
            assert_eq!(self.acquired, None, "recreate with a frame in flight");
            let outcome = self.apply_plan(window_extent)?;
            if outcome == RebuildOutcome::Rebuilt {
                self.recreated_at.push(window_extent);
            }
            Ok(outcome)
        }
    }

    /// Backend whose submit always fails
    struct FailingSubmit(MockBackend);

    impl FrameBackend for FailingSubmit {
        fn swapchain_extent(&self) -> vk::Extent2D {
            self.0.swapchain_extent()
        }

        fn image_count(&self) -> usize {
            self.0.image_count()
        }

        fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome> {
            self.0.acquire_next_image()
        }

        fn write_uniforms(&mut self, image_index: u32, uniforms: &UniformBufferObject) -> VulkanResult<()> {
            self.0.write_uniforms(image_index, uniforms)
        }

        fn submit(&mut self, _image_index: u32) -> VulkanResult<()> {
            Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        }

        fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
            self.0.present(image_index)
        }

        fn wait_for_frame(&mut self) -> VulkanResult<()> {
            self.0.wait_for_frame()
        }

        fn wait_idle(&self) -> VulkanResult<()> {
            self.0.wait_idle()
        }

        fn recreate_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<RebuildOutcome> {
            self.0.recreate_swapchain(window_extent)
        }
    }

    fn driver(width: u32, height: u32) -> FrameDriver<MockBackend> {
        FrameDriver::new(MockBackend::new(width, height), CubeAnimation::default())
    }

    #[test]
    fn test_one_second_of_frames_rotates_ninety_degrees() {
        let mut driver = driver(800, 600);
        assert_eq!(driver.backend().image_count(), 3);

        for frame in 0..60 {
            let elapsed = frame as f32 / 59.0;
            let status = driver.draw_frame(elapsed).unwrap();
            assert_eq!(
                status,
                FrameStatus::Presented {
                    image_index: frame % 3
                }
            );
            assert_eq!(driver.state(), FrameState::Idle);
        }

        let stats = driver.stats();
        assert_eq!(stats.frames_presented, 60);
        assert_eq!(stats.swapchain_rebuilds, 0);
        assert_relative_eq!(
            model_rotation_degrees(&driver.backend().last_written().model),
            90.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_resize_rebuilds_before_next_frame() {
        let mut driver = driver(800, 600);
        for frame in 0..10 {
            driver.draw_frame(frame as f32 / 60.0).unwrap();
        }

        driver.notify_resized(400, 300);
        assert!(driver.rebuild_pending());

        let elapsed = 10.0 / 60.0;
        let status = driver.draw_frame(elapsed).unwrap();

        // A fresh swapchain starts handing out images from zero again
        assert_eq!(status, FrameStatus::Presented { image_index: 0 });
        assert!(!driver.rebuild_pending());
        assert_eq!(driver.stats().swapchain_rebuilds, 1);

        let resized = vk::Extent2D { width: 400, height: 300 };
        for frame in 11..30 {
            let elapsed = frame as f32 / 60.0;
            assert!(matches!(driver.draw_frame(elapsed).unwrap(), FrameStatus::Presented { .. }));
            assert_eq!(driver.backend().swapchain_extent(), resized);
            assert_eq!(
                driver.backend().last_written().proj,
                CubeAnimation::default().uniforms(elapsed, 400, 300).proj
            );
        }

        assert_eq!(driver.backend().recreated_at, vec![resized]);
        assert_eq!(driver.stats().swapchain_rebuilds, 1);
        assert_eq!(driver.stats().frames_presented, 30);
    }

    #[test]
    fn test_out_of_date_acquire_recovers_in_same_frame() {
        let mut driver = driver(800, 600);
        driver.draw_frame(0.0).unwrap();

        driver.backend_mut().out_of_date_acquires.push_back(true);
        let status = driver.draw_frame(0.5).unwrap();

        assert!(matches!(status, FrameStatus::Presented { .. }));
        assert_eq!(driver.stats().swapchain_rebuilds, 1);
        assert_eq!(driver.stats().frames_presented, 2);
        assert_eq!(driver.backend().generation, 2);
        assert_relative_eq!(
            model_rotation_degrees(&driver.backend().last_written().model),
            45.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_repeated_out_of_date_reports_rebuild() {
        let mut driver = driver(800, 600);
        driver
            .backend_mut()
            .out_of_date_acquires
            .extend([true, true]);

        assert_eq!(driver.draw_frame(0.0).unwrap(), FrameStatus::SwapchainRebuilt);
        assert!(driver.rebuild_pending());
        assert_eq!(driver.stats().frames_presented, 0);

        // Next frame rebuilds again and then succeeds
        assert!(matches!(driver.draw_frame(0.1).unwrap(), FrameStatus::Presented { .. }));
        assert_eq!(driver.stats().swapchain_rebuilds, 2);
    }

    #[test]
    fn test_stale_present_schedules_rebuild() {
        let mut driver = driver(800, 600);
        driver
            .backend_mut()
            .present_outcomes
            .push_back(PresentOutcome::Stale);

        assert!(matches!(driver.draw_frame(0.0).unwrap(), FrameStatus::Presented { .. }));
        assert!(driver.rebuild_pending());
        assert_eq!(driver.stats().swapchain_rebuilds, 0);

        driver.draw_frame(0.1).unwrap();
        assert!(!driver.rebuild_pending());
        assert_eq!(driver.stats().swapchain_rebuilds, 1);
    }

    #[test]
    fn test_recreation_at_same_extent_is_idempotent() {
        let mut driver = driver(800, 600);
        driver.draw_frame(0.0).unwrap();

        driver.notify_resized(800, 600);
        driver.draw_frame(0.1).unwrap();
        driver.notify_resized(800, 600);
        driver.draw_frame(0.2).unwrap();

        let backend = driver.backend();
        assert_eq!(backend.swapchain_extent(), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(backend.image_count(), 3);
        assert_eq!(driver.stats().swapchain_rebuilds, 2);
        assert_eq!(driver.stats().frames_presented, 3);
    }

    #[test]
    fn test_minimized_window_skips_frames() {
        let mut driver = driver(800, 600);
        driver.notify_resized(0, 0);

        for frame in 0..5 {
            assert_eq!(driver.draw_frame(frame as f32).unwrap(), FrameStatus::Skipped);
        }
        assert_eq!(driver.stats().frames_skipped, 5);
        assert!(driver.backend().recreated_at.is_empty());

        driver.notify_resized(640, 480);
        assert!(matches!(driver.draw_frame(6.0).unwrap(), FrameStatus::Presented { .. }));
        assert_eq!(driver.backend().swapchain_extent(), vk::Extent2D { width: 640, height: 480 });
    }

    #[test]
    fn test_surface_minimized_before_acquire_defers_rebuild() {
        let mut driver = driver(800, 600);
        driver.draw_frame(0.0).unwrap();

        // No resize event reached the driver yet, but the surface already went to 0x0
        driver.backend_mut().set_surface_extent(0, 0);
        driver.backend_mut().out_of_date_acquires.push_back(true);

        assert_eq!(driver.draw_frame(0.1).unwrap(), FrameStatus::Skipped);
        assert!(driver.rebuild_pending());
        assert_eq!(driver.state(), FrameState::Idle);
        assert_eq!(driver.stats().swapchain_rebuilds, 0);
        assert_eq!(driver.stats().frames_skipped, 1);

        // Still minimized: keeps skipping without building anything
        assert_eq!(driver.draw_frame(0.2).unwrap(), FrameStatus::Skipped);
        let backend = driver.backend();
        assert!(backend.recreated_at.is_empty());
        assert_eq!(backend.generation, 1);
        assert_eq!(backend.swapchain_extent(), vk::Extent2D { width: 800, height: 600 });

        // Restored: the pending rebuild goes through and drawing resumes
        driver.backend_mut().set_surface_extent(u32::MAX, u32::MAX);
        assert!(matches!(driver.draw_frame(0.3).unwrap(), FrameStatus::Presented { .. }));
        assert!(!driver.rebuild_pending());
        assert_eq!(driver.stats().swapchain_rebuilds, 1);
        assert_eq!(driver.backend().swapchain_extent(), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(driver.stats().frames_presented, 2);
    }

    #[test]
    fn test_window_extent_clamped_to_surface_limits() {
        let mut driver = driver(800, 600);
        driver.notify_resized(10_000, 300);
        driver.draw_frame(0.0).unwrap();
        assert_eq!(driver.backend().swapchain_extent(), vk::Extent2D { width: 4096, height: 300 });
    }

    #[test]
    fn test_backend_error_is_returned_and_state_kept() {
        let mut driver = FrameDriver::new(FailingSubmit(MockBackend::new(800, 600)), CubeAnimation::default());
        let result = driver.draw_frame(0.0);

        assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
        assert_eq!(driver.state(), FrameState::ImageAcquired(0));
        assert_eq!(driver.stats().frames_presented, 0);
    }
}
