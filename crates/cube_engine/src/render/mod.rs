//! Rendering
//!
//! Backend-agnostic pieces (geometry, per-frame uniforms, the frame state
//! machine) live here; everything that talks to the GPU lives in [`vulkan`].

pub mod frame;
pub mod mesh;
pub mod uniform;
pub mod vulkan;

#[cfg(test)]
mod frame_tests;
