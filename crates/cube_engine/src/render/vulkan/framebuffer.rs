//! Framebuffers and the depth attachment

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};
use super::image::AllocatedImage;

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, framebuffer })
    }

    /// Get the framebuffer handle
    pub const fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Depth attachment sized to the swapchain
pub struct DepthBuffer {
    image: AllocatedImage,
}

impl DepthBuffer {
    /// Create a depth image and view in `format`
    ///
    /// The render pass moves it out of UNDEFINED on first use.
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let image = AllocatedImage::new(
            device,
            memory_properties,
            extent,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;
        Ok(Self { image })
    }

    /// Get the image view handle
    pub const fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Depth format in use
    pub const fn format(&self) -> vk::Format {
        self.image.format()
    }
}

/// First candidate whose `tiling` features include `features`
///
/// `query` returns the format properties for one candidate; in practice it
/// wraps `vkGetPhysicalDeviceFormatProperties`.
pub fn select_depth_format<F>(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    query: F,
) -> VulkanResult<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatProperties,
{
    candidates
        .iter()
        .copied()
        .find(|&format| {
            let properties = query(format);
            let supported = if tiling == vk::ImageTiling::LINEAR {
                properties.linear_tiling_features
            } else {
                properties.optimal_tiling_features
            };
            supported.contains(features)
        })
        .ok_or_else(|| VulkanError::NoSuitableDepthFormat {
            candidates: candidates.to_vec(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimal(features: vk::FormatFeatureFlags) -> vk::FormatProperties {
        vk::FormatProperties {
            optimal_tiling_features: features,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_qualifying_candidate_wins() {
        let format = select_depth_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |format| {
                if format == vk::Format::D32_SFLOAT {
                    optimal(vk::FormatFeatureFlags::empty())
                } else {
                    optimal(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
                }
            },
        )
        .unwrap();
        assert_eq!(format, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn test_declared_order_is_respected() {
        let format = select_depth_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| optimal(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
        )
        .unwrap();
        assert_eq!(format, vk::Format::D32_SFLOAT);
    }

    #[test]
    fn test_linear_tiling_reads_linear_features() {
        let result = select_depth_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::LINEAR,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| optimal(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_no_candidate_is_an_error() {
        let result = select_depth_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| vk::FormatProperties::default(),
        );
        match result {
            Err(VulkanError::NoSuitableDepthFormat { candidates }) => {
                assert_eq!(candidates, DEPTH_FORMAT_CANDIDATES.to_vec());
            }
            other => panic!("expected NoSuitableDepthFormat, got {other:?}"),
        }
    }
}
