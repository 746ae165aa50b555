//! Settings for the cube demo
//!
//! Every section carries `#[serde(default)]`, so a config file only needs the
//! keys it wants to override.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Top-level demo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Application name reported to the Vulkan driver
    pub application_name: String,
    /// Window settings
    pub window: WindowConfig,
    /// SPIR-V shader locations
    pub shaders: ShaderConfig,
    /// Image to sample on the cube; a generated checkerboard is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_path: Option<String>,
    /// Request the Khronos validation layer; defaults to on in debug builds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_validation: Option<bool>,
    /// Attach a depth buffer to the render pass
    pub depth_enabled: bool,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Rotation and camera parameters
    pub animation: AnimationConfig,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            application_name: "Rotating Cube".to_string(),
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
            texture_path: None,
            enable_validation: None,
            depth_enabled: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            animation: AnimationConfig::default(),
        }
    }
}

impl Config for CubeConfig {}

impl CubeConfig {
    /// Whether validation should be requested for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Builder: set window size
    #[must_use]
    pub const fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Builder: set texture image
    #[must_use]
    pub fn with_texture(mut self, path: impl Into<String>) -> Self {
        self.texture_path = Some(path.into());
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        self.shaders.validate()?;
        self.animation.validate()
    }
}

/// Window creation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Title bar text
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan Cube".to_string(),
        }
    }
}

/// Compiled shader locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Vertex stage SPIR-V
    pub vertex_shader_path: String,
    /// Fragment stage SPIR-V
    pub fragment_shader_path: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex_shader_path: "target/shaders/cube.vert.spv".to_string(),
            fragment_shader_path: "target/shaders/cube.frag.spv".to_string(),
        }
    }
}

impl ShaderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.vertex_shader_path.is_empty() || self.fragment_shader_path.is_empty() {
            return Err(ConfigError::Invalid("shader paths must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Cube rotation and camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Rotation speed about +Z
    pub degrees_per_second: f32,
    /// Camera position
    pub eye: [f32; 3],
    /// Point the camera looks at
    pub target: [f32; 3],
    /// Camera up direction
    pub up: [f32; 3],
    /// Vertical field of view
    pub fov_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            degrees_per_second: 90.0,
            eye: [2.0, 2.0, 2.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl AnimationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::Invalid(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                self.near, self.far
            )));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be in (0, 180), got {}",
                self.fov_degrees
            )));
        }
        if self.eye == self.target {
            return Err(ConfigError::Invalid("camera eye and target coincide".to_string()));
        }
        Ok(())
    }
}
