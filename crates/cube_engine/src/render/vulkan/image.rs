//! Device-local 2D images with bound memory and a view

use ash::{vk, Device};

use super::buffer::allocate;
use super::context::{VulkanError, VulkanResult};
use super::swapchain::create_image_view;

/// Image, its memory and a single 2D view, destroyed together
pub struct AllocatedImage {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl AllocatedImage {
    /// Create an optimal-tiling, single-mip image in device-local memory
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&image_create_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match allocate(&device, memory_properties, requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut this = Self {
            device,
            image,
            memory,
            view: vk::ImageView::null(),
            format,
            extent,
        };

        unsafe {
            this.device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        this.view = create_image_view(&this.device, image, format, aspect)?;

        Ok(this)
    }

    /// Image handle
    pub const fn image(&self) -> vk::Image {
        self.image
    }

    /// View handle
    pub const fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Pixel format
    pub const fn format(&self) -> vk::Format {
        self.format
    }

    /// Size in pixels
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for AllocatedImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
