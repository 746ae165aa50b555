//! Descriptor set layout and per-image descriptor sets
//!
//! Binding 0 is the uniform buffer (vertex stage), binding 1 the texture
//! sampler (fragment stage).

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Binding of the matrices uniform buffer
pub const UNIFORM_BINDING: u32 = 0;
/// Binding of the combined image sampler
pub const SAMPLER_BINDING: u32 = 1;

/// Descriptor set layout wrapper with RAII cleanup
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Layout used by the cube shaders
    pub fn new(device: Device) -> VulkanResult<Self> {
        let bindings = layout_bindings();
        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

        let layout = unsafe {
            device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, layout })
    }

    /// Layout handle
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

fn layout_bindings() -> [vk::DescriptorSetLayoutBinding; 2] {
    [
        vk::DescriptorSetLayoutBinding::builder()
            .binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .build(),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(SAMPLER_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build(),
    ]
}

/// Resources one descriptor set points at
#[derive(Debug, Clone, Copy)]
pub struct DescriptorTargets {
    /// Uniform buffer for binding 0
    pub uniform_buffer: vk::Buffer,
    /// Bytes of the uniform buffer visible to the shader
    pub uniform_range: vk::DeviceSize,
    /// Texture view for binding 1
    pub image_view: vk::ImageView,
    /// Texture sampler for binding 1
    pub sampler: vk::Sampler,
}

/// Pool sized for one set per swapchain image, plus the sets themselves
///
/// Sets are released with the pool.
pub struct DescriptorSets {
    device: Device,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
}

impl DescriptorSets {
    /// Allocate and write one set per entry of `targets`
    pub fn new(device: Device, layout: vk::DescriptorSetLayout, targets: &[DescriptorTargets]) -> VulkanResult<Self> {
        let count = u32::try_from(targets.len()).map_err(|_| VulkanError::InvalidOperation {
            reason: format!("{} descriptor sets requested", targets.len()),
        })?;
        let pool_sizes = pool_sizes(count);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(count);

        let pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut this = Self {
            device,
            pool,
            sets: Vec::new(),
        };

        let layouts = vec![layout; targets.len()];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        this.sets = unsafe {
            this.device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        for (&set, target) in this.sets.iter().zip(targets) {
            let buffer_info = [vk::DescriptorBufferInfo {
                buffer: target.uniform_buffer,
                offset: 0,
                range: target.uniform_range,
            }];
            let image_info = [vk::DescriptorImageInfo {
                sampler: target.sampler,
                image_view: target.image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let writes = [
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(UNIFORM_BINDING)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info)
                    .build(),
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(SAMPLER_BINDING)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_info)
                    .build(),
            ];
            unsafe { this.device.update_descriptor_sets(&writes, &[]) };
        }

        Ok(this)
    }

    /// Set for swapchain image `index`
    pub fn get(&self, index: usize) -> VulkanResult<vk::DescriptorSet> {
        self.sets.get(index).copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("descriptor set {index} out of range ({})", self.sets.len()),
        })
    }
}

impl Drop for DescriptorSets {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

fn pool_sizes(set_count: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: set_count,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: set_count,
        },
    ]
}
