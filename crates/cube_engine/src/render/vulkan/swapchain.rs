//! Vulkan swapchain management
//!
//! Selection policy is kept in plain functions over surface data so it can be
//! exercised without a GPU. [`Swapchain`] owns the handle and one color view
//! per image; recreation means dropping it and building a new one.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

use super::context::{QueueFamilyIndices, VulkanError, VulkanResult};

/// Format requested when the surface offers it
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Surface properties read fresh for every swapchain build
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    /// Image count, extent and transform limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported format / color space pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Query the surface through the loader
    pub fn query(
        loader: &Surface,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        unsafe {
            Ok(Self {
                capabilities: loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                formats: loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                present_modes: loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(VulkanError::Api)?,
            })
        }
    }
}

/// Exact `preferred` pair if listed, otherwise the first reported format
pub fn select_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    preferred: vk::SurfaceFormatKHR,
) -> VulkanResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| sf.format == preferred.format && sf.color_space == preferred.color_space)
        .or_else(|| formats.first())
        .copied()
        .ok_or(VulkanError::NoSurfaceFormats)
}

/// Mailbox when available; FIFO is always supported
pub fn select_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// One more than the minimum, bounded by the maximum (0 means unbounded)
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Surface-dictated extent, or the window extent clamped to the surface limits
pub fn select_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Every decision needed to create a swapchain
#[derive(Debug, Clone, Copy)]
pub struct SwapchainPlan {
    /// Image format and color space
    pub surface_format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Minimum image count to request
    pub image_count: u32,
    /// Image size
    pub extent: vk::Extent2D,
    /// Surface transform to apply
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Apply the selection policies to fresh surface data
    pub fn new(support: &SurfaceSupport, window_extent: vk::Extent2D) -> VulkanResult<Self> {
        Ok(Self {
            surface_format: select_surface_format(&support.formats, PREFERRED_SURFACE_FORMAT)?,
            present_mode: select_present_mode(&support.present_modes),
            image_count: select_image_count(&support.capabilities),
            extent: select_extent(&support.capabilities, window_extent),
            pre_transform: support.capabilities.current_transform,
        })
    }

    /// Whether a swapchain can be created from this plan
    ///
    /// A minimized window can make the surface report a 0x0 current extent;
    /// swapchain creation with a zero image extent is invalid.
    pub const fn has_area(&self) -> bool {
        self.extent.width > 0 && self.extent.height > 0
    }
}

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create the swapchain and one 2D color view per image
    pub fn new(
        device: Device,
        swapchain_loader: SwapchainLoader,
        surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
        queue_families: QueueFamilyIndices,
    ) -> VulkanResult<Self> {
        let family_indices = [queue_families.graphics, queue_families.present];
        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(plan.image_count)
            .image_format(plan.surface_format.format)
            .image_color_space(plan.surface_format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(plan.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let create_info = if queue_families.is_shared() {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format: plan.surface_format,
            extent: plan.extent,
        };

        // Views are pushed one at a time so Drop cleans up a partial set on error
        this.images = unsafe {
            this.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };
        for &image in &this.images {
            let view = create_color_view(&this.device, image, plan.surface_format.format)?;
            this.image_views.push(view);
        }

        log::debug!(
            "Swapchain created: {} images, {}x{}, {:?}, {:?}",
            this.images.len(),
            plan.extent.width,
            plan.extent.height,
            plan.surface_format.format,
            plan.present_mode
        );

        Ok(this)
    }

    /// Get swapchain extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub const fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Number of images the driver actually created
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// 2D view over the first mip and layer of `image`
pub fn create_color_view(device: &Device, image: vk::Image, format: vk::Format) -> VulkanResult<vk::ImageView> {
    create_image_view(device, image, format, vk::ImageAspectFlags::COLOR)
}

/// 2D view with the given aspect
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None).map_err(VulkanError::Api) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: u32, max: u32, current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn test_preferred_format_chosen_when_present() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_SURFACE_FORMAT,
        ];
        let chosen = select_surface_format(&formats, PREFERRED_SURFACE_FORMAT).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_first_format_chosen_otherwise() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            // Right format, wrong color space
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        let chosen = select_surface_format(&formats, PREFERRED_SURFACE_FORMAT).unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_no_formats_is_an_error() {
        let result = select_surface_format(&[], PREFERRED_SURFACE_FORMAT);
        assert!(matches!(result, Err(VulkanError::NoSurfaceFormats)));
    }

    #[test]
    fn test_present_mode_policy() {
        let with_mailbox = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&with_mailbox), vk::PresentModeKHR::MAILBOX);

        let without = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&without), vk::PresentModeKHR::FIFO);

        assert_eq!(select_present_mode(&[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_image_count_is_min_plus_one_bounded() {
        assert_eq!(select_image_count(&capabilities(2, 8, (800, 600))), 3);
        assert_eq!(select_image_count(&capabilities(2, 2, (800, 600))), 2);
        assert_eq!(select_image_count(&capabilities(3, 0, (800, 600))), 4);
    }

    #[test]
    fn test_extent_follows_surface_when_fixed() {
        let caps = capabilities(2, 0, (1024, 768));
        let extent = select_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_extent_clamps_window_when_surface_defers() {
        let caps = capabilities(2, 0, (u32::MAX, u32::MAX));
        let extent = select_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!((extent.width, extent.height), (800, 600));

        let extent = select_extent(&caps, vk::Extent2D { width: 10_000, height: 0 });
        assert_eq!((extent.width, extent.height), (4096, 1));
    }

    #[test]
    fn test_plan_for_many_extents() {
        let support = SurfaceSupport {
            capabilities: capabilities(2, 3, (u32::MAX, u32::MAX)),
            formats: vec![PREFERRED_SURFACE_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        for (width, height) in [(1, 1), (400, 300), (800, 600), (1920, 1080)] {
            let plan = SwapchainPlan::new(&support, vk::Extent2D { width, height }).unwrap();
            assert_eq!(plan.image_count, 3);
            assert_eq!((plan.extent.width, plan.extent.height), (width, height));
            assert_eq!(plan.surface_format.format, vk::Format::B8G8R8A8_SRGB);
            assert!(plan.has_area());
        }
    }

    #[test]
    fn test_minimized_surface_plan_has_no_area() {
        let support = SurfaceSupport {
            capabilities: capabilities(2, 3, (0, 0)),
            formats: vec![PREFERRED_SURFACE_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        // The window still reports its last size, the surface already says 0x0
        let plan = SwapchainPlan::new(&support, vk::Extent2D { width: 800, height: 600 }).unwrap();
        assert_eq!(plan.extent, vk::Extent2D { width: 0, height: 0 });
        assert!(!plan.has_area());
    }
}
