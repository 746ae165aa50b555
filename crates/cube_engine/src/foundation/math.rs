//! Math utilities and types
//!
//! nalgebra aliases plus the projection helpers the renderer needs. Vulkan
//! clip space differs from OpenGL's: depth runs over [0, 1] and +Y points
//! down, so the projection here bakes in both.

pub use nalgebra::{Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Extension trait for Mat4 with graphics-specific constructors
pub trait Mat4Ext {
    /// Rotation of `angle` radians about +Z
    fn rotation_z(angle: f32) -> Mat4;

    /// Right-handed perspective projection for Vulkan clip space
    fn vulkan_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Column-major array suitable for GPU upload
    fn to_cols_array_2d(&self) -> [[f32; 4]; 4];
}

impl Mat4Ext for Mat4 {
    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn vulkan_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        // Negative: Vulkan framebuffer Y points down
        result[(1, 1)] = -1.0 / tan_half_fovy;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = (near * far) / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            for (r, value) in col.iter_mut().enumerate() {
                *value = self[(r, c)];
            }
        }
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn project_depth(proj: &Mat4, view_z: f32) -> f32 {
        let clip = proj * nalgebra::Vector4::new(0.0, 0.0, view_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn test_vulkan_perspective_depth_range() {
        let proj = Mat4::vulkan_perspective(45f32.to_radians(), 4.0 / 3.0, 0.1, 10.0);
        assert_relative_eq!(project_depth(&proj, -0.1), 0.0, epsilon = 1e-5);
        assert_relative_eq!(project_depth(&proj, -10.0), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_vulkan_perspective_flips_y() {
        let proj = Mat4::vulkan_perspective(45f32.to_radians(), 1.0, 0.1, 10.0);
        let clip = proj * nalgebra::Vector4::new(0.0, 1.0, -2.0, 1.0);
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let view = Mat4::look_at(Vec3::new(2.0, 2.0, 2.0), Vec3::zeros(), Vec3::z());
        let origin = view.transform_point(&Point3::origin());
        assert_relative_eq!(origin.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.z, -(12.0f32).sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = m.to_cols_array_2d();
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
