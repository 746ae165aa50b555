//! Sampled textures
//!
//! Pixels are decoded to RGBA8 on the CPU, copied through a staging buffer,
//! and moved UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY exactly once.
//! Barrier masks come from [`transition_masks`], a fixed table.

use std::path::Path;

use ash::{vk, Device};

use super::buffer::staging_buffer;
use super::commands::{CommandPool, CommandRecorder};
use super::context::{VulkanError, VulkanResult};
use super::image::AllocatedImage;

/// Decoded RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexturePixels {
    /// Tightly packed RGBA rows
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TexturePixels {
    /// Decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| VulkanError::TextureLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let pixels = Self::from_rgba(img.to_rgba8());
        log::info!("Loaded texture {}x{} from {}", pixels.width, pixels.height, path.display());
        Ok(pixels)
    }

    /// Decode an in-memory image
    pub fn from_bytes(bytes: &[u8]) -> VulkanResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| VulkanError::TextureLoad {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    fn from_rgba(rgba: image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Two-tone checkerboard used when no texture file is configured
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let light = ((x / cell) + (y / cell)) % 2 == 0;
                let value = if light { 235 } else { 64 };
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }
        Self {
            data,
            width: size,
            height: size,
        }
    }

    /// Load `path` when given, otherwise generate the checkerboard
    pub fn load_or_default(path: Option<&str>) -> VulkanResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                log::info!("No texture configured, using generated checkerboard");
                Ok(Self::checkerboard(256, 8))
            }
        }
    }

    /// Image size as a Vulkan extent
    pub const fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Access masks and pipeline stages for one layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    /// Accesses that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition
    pub dst_access: vk::AccessFlags,
    /// Stage the barrier waits on
    pub src_stage: vk::PipelineStageFlags,
    /// Stage that waits on the barrier
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier parameters for `old -> new`; unlisted pairs are an error
pub fn transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<TransitionMasks> {
    use vk::ImageLayout as L;

    let masks = match (old, new) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        },
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        _ => return Err(VulkanError::UnsupportedLayoutTransition { old, new }),
    };
    Ok(masks)
}

/// Record a barrier moving every mip/layer of `image` from `old` to `new`
pub fn record_layout_transition(
    recorder: &mut CommandRecorder,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> VulkanResult<()> {
    let masks = transition_masks(old, new)?;
    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old)
        .new_layout(new)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access)
        .build();

    recorder.cmd_image_barrier(masks.src_stage, masks.dst_stage, barrier);
    Ok(())
}

/// Device-local sampled image with view and sampler
pub struct Texture {
    sampler: vk::Sampler,
    image: AllocatedImage,
    device: Device,
}

impl Texture {
    /// Upload `pixels` and create a linear, repeating sampler
    ///
    /// `max_anisotropy` enables anisotropic filtering when the device
    /// feature was turned on.
    pub fn upload(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        transfer_pool: &CommandPool,
        queue: vk::Queue,
        pixels: &TexturePixels,
        max_anisotropy: Option<f32>,
    ) -> VulkanResult<Self> {
        let expected = pixels.width as usize * pixels.height as usize * 4;
        if pixels.width == 0 || pixels.height == 0 || pixels.data.len() != expected {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "texture data is {} bytes, expected {expected} for {}x{}",
                    pixels.data.len(),
                    pixels.width,
                    pixels.height
                ),
            });
        }

        let format = vk::Format::R8G8B8A8_SRGB;
        let extent = pixels.extent();
        let staging = staging_buffer(device.clone(), memory_properties, &pixels.data)?;
        let image = AllocatedImage::new(
            device.clone(),
            memory_properties,
            extent,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        transfer_pool.submit_single_time(queue, |recorder| {
            record_layout_transition(
                recorder,
                image.image(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .build();
            recorder.cmd_copy_buffer_to_image(staging.handle(), image.image(), &[region]);

            record_layout_transition(
                recorder,
                image.image(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        })?;
        drop(staging);

        let sampler_create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(max_anisotropy.is_some())
            .max_anisotropy(max_anisotropy.unwrap_or(1.0))
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

        let sampler = unsafe {
            device
                .create_sampler(&sampler_create_info, None)
                .map_err(VulkanError::Api)?
        };

        log::debug!("Texture uploaded ({}x{}, {format:?})", extent.width, extent.height);

        Ok(Self { sampler, image, device })
    }

    /// Get the image view for descriptor binding
    pub const fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Get the sampler for descriptor binding
    pub const fn sampler(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions_are_listed() {
        let to_dst = transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(to_dst.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(to_dst.dst_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(to_dst.dst_access, vk::AccessFlags::TRANSFER_WRITE);

        let to_read =
            transition_masks(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL).unwrap();
        assert_eq!(to_read.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_read.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(to_read.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_depth_layout_left_to_render_pass() {
        // The depth attachment leaves UNDEFINED through the render pass, never a barrier
        let result = transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert!(matches!(result, Err(VulkanError::UnsupportedLayoutTransition { .. })));
    }

    #[test]
    fn test_unlisted_transition_fails() {
        let result = transition_masks(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        match result {
            Err(VulkanError::UnsupportedLayoutTransition { old, new }) => {
                assert_eq!(old, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                assert_eq!(new, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
            }
            other => panic!("expected UnsupportedLayoutTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_checkerboard_alternates() {
        let pixels = TexturePixels::checkerboard(4, 2);
        assert_eq!(pixels.data.len(), 4 * 4 * 4);
        let at = |x: usize, y: usize| pixels.data[(y * 4 + x) * 4];
        assert_eq!(at(0, 0), at(1, 1));
        assert_ne!(at(0, 0), at(2, 0));
        assert_ne!(at(0, 0), at(0, 2));
        assert_eq!(at(0, 0), at(2, 2));
    }

    #[test]
    fn test_decode_png_to_rgba8() {
        let source = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        source.write_to(&mut encoded, image::ImageFormat::Png).unwrap();

        let pixels = TexturePixels::from_bytes(encoded.get_ref()).unwrap();
        assert_eq!((pixels.width, pixels.height), (2, 3));
        assert_eq!(pixels.data.len(), 2 * 3 * 4);
        assert_eq!(&pixels.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_texture_file() {
        let result = TexturePixels::load_or_default(Some("no/such/texture.png"));
        assert!(matches!(result, Err(VulkanError::TextureLoad { .. })));
        assert!(TexturePixels::load_or_default(None).is_ok());
    }
}
