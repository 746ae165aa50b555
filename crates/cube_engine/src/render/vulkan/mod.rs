//! Vulkan backend
//!
//! Thin RAII wrappers over ash objects, the selection policies used to set
//! them up, and [`VulkanRenderer`], which ties them together behind the
//! [`FrameBackend`](crate::render::frame::FrameBackend) trait.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod framebuffer;
pub mod image;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex_layout;
pub mod window;

pub use buffer::Buffer;
pub use commands::{CommandBuffers, CommandPool, CommandRecorder};
pub use context::{select_queue_families, QueueFamilyIndices, VulkanContext, VulkanError, VulkanResult};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use render_pass::RenderPass;
pub use renderer::VulkanRenderer;
pub use shader::{GraphicsPipeline, ShaderSources};
pub use swapchain::{SurfaceSupport, Swapchain, SwapchainPlan};
pub use texture::{Texture, TexturePixels};
pub use window::{Window, WindowError, WindowEvent};
