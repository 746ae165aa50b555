//! Per-frame uniform data and the cube's fixed animation

use crate::config::AnimationConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Matrices consumed by the vertex shader at binding 0
///
/// Column-major, std140-compatible: three mat4 back to back.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBufferObject {
    /// Object to world
    pub model: [[f32; 4]; 4],
    /// World to camera
    pub view: [[f32; 4]; 4],
    /// Camera to Vulkan clip space
    pub proj: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for UniformBufferObject {}
unsafe impl bytemuck::Zeroable for UniformBufferObject {}

impl UniformBufferObject {
    /// Size in bytes as a Vulkan device size
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Fixed transform function of elapsed time and viewport aspect
#[derive(Debug, Clone, PartialEq)]
pub struct CubeAnimation {
    degrees_per_second: f32,
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y: f32,
    near: f32,
    far: f32,
}

impl Default for CubeAnimation {
    fn default() -> Self {
        Self::from_config(&AnimationConfig::default())
    }
}

impl CubeAnimation {
    /// Build from configuration values
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            degrees_per_second: config.degrees_per_second,
            eye: Vec3::from(config.eye),
            target: Vec3::from(config.target),
            up: Vec3::from(config.up),
            fov_y: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
        }
    }

    /// Rotation angle in radians after `elapsed` seconds
    pub fn angle(&self, elapsed: f32) -> f32 {
        (self.degrees_per_second * elapsed).to_radians()
    }

    /// Model matrix after `elapsed` seconds
    pub fn model(&self, elapsed: f32) -> Mat4 {
        Mat4::rotation_z(self.angle(elapsed))
    }

    /// Camera matrix
    pub fn view(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.target, self.up)
    }

    /// Projection for a `width` x `height` target
    #[allow(clippy::cast_precision_loss)]
    pub fn projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width as f32 / height.max(1) as f32;
        Mat4::vulkan_perspective(self.fov_y, aspect, self.near, self.far)
    }

    /// All three matrices for one frame
    pub fn uniforms(&self, elapsed: f32, width: u32, height: u32) -> UniformBufferObject {
        UniformBufferObject {
            model: self.model(elapsed).to_cols_array_2d(),
            view: self.view().to_cols_array_2d(),
            proj: self.projection(width, height).to_cols_array_2d(),
        }
    }
}

/// Rotation about +Z encoded in a column-major model matrix, in degrees
pub fn model_rotation_degrees(model: &[[f32; 4]; 4]) -> f32 {
    // cols[0] is the image of +X
    model[0][1].atan2(model[0][0]).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ubo_layout_is_three_mat4() {
        assert_eq!(UniformBufferObject::SIZE, 192);
    }

    #[test]
    fn test_rotation_is_ninety_degrees_per_second() {
        let animation = CubeAnimation::default();
        let ubo = animation.uniforms(1.0, 800, 600);
        assert_relative_eq!(model_rotation_degrees(&ubo.model), 90.0, epsilon = 1e-3);

        let half = animation.uniforms(0.5, 800, 600);
        assert_relative_eq!(model_rotation_degrees(&half.model), 45.0, epsilon = 1e-3);
    }

    #[test]
    fn test_model_is_identity_at_start() {
        let ubo = CubeAnimation::default().uniforms(0.0, 800, 600);
        assert_eq!(ubo.model, Mat4::identity().to_cols_array_2d());
    }

    #[test]
    fn test_projection_tracks_aspect() {
        let animation = CubeAnimation::default();
        let wide = animation.projection(800, 600);
        let square = animation.projection(400, 400);
        assert_relative_eq!(wide[(1, 1)], square[(1, 1)], epsilon = 1e-6);
        assert_relative_eq!(wide[(0, 0)] * (800.0 / 600.0), square[(0, 0)], epsilon = 1e-5);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let proj = CubeAnimation::default().projection(800, 0);
        assert!(proj.iter().all(|v| v.is_finite()));
    }
}
