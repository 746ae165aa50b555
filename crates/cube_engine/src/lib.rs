//! # Cube Engine
//!
//! A small Vulkan renderer that draws one rotating textured cube.
//!
//! The interesting part is the frame lifecycle rather than the picture:
//!
//! - **Bootstrap**: instance, surface, physical and logical device, queues
//! - **Swapchain**: pure selection policies plus RAII swapchain ownership
//! - **Pipeline**: render pass, depth buffer, framebuffers, graphics pipeline
//! - **Uploads**: staging-buffer transfers and table-driven layout transitions
//! - **Frame loop**: acquire, update, submit, present, with swapchain
//!   recreation when the surface goes stale
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cube_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CubeConfig::default();
//!     let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
//!     let renderer = VulkanRenderer::new(&mut window, &config)?;
//!     let mut driver = FrameDriver::new(renderer, CubeAnimation::from_config(&config.animation));
//!     let timer = Timer::new();
//!
//!     while !window.should_close() {
//!         for event in window.poll_events() {
//!             if let WindowEvent::Resized(width, height) = event {
//!                 driver.notify_resized(width, height);
//!             }
//!         }
//!         driver.draw_frame(timer.elapsed_seconds())?;
//!     }
//!     driver.backend().wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, CubeConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::Timer,
        },
        render::{
            frame::{FrameBackend, FrameDriver, FrameStatus, RebuildOutcome},
            mesh::Vertex,
            uniform::{CubeAnimation, UniformBufferObject},
            vulkan::{VulkanError, VulkanRenderer, VulkanResult, Window, WindowEvent},
        },
    };
}
