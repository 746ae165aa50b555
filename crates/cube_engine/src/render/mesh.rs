//! Cube geometry
//!
//! Eight shared corners and 36 indices. Triangles wind clockwise when seen
//! from outside the cube, matching the pipeline's front-face setting.

/// Vertex with position, color, and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Per-vertex tint multiplied with the texture
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

// Safety: repr(C), only f32 fields, no padding
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 3], color: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }
}

/// Indexed geometry ready for upload
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u16>,
}

impl Mesh {
    /// Unit cube centred on the origin
    pub fn cube() -> Self {
        let h = 0.5;
        let vertices = vec![
            Vertex::new([-h, -h, -h], [1.0, 0.0, 0.0], [0.0, 0.0]),
            Vertex::new([h, -h, -h], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([h, h, -h], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-h, h, -h], [1.0, 1.0, 1.0], [0.0, 1.0]),
            Vertex::new([-h, -h, h], [1.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([h, -h, h], [0.0, 1.0, 1.0], [0.0, 1.0]),
            Vertex::new([h, h, h], [1.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([-h, h, h], [1.0, 1.0, 1.0], [1.0, 0.0]),
        ];

        #[rustfmt::skip]
        let indices = vec![
            4, 6, 5,  6, 4, 7, // +Z
            1, 3, 0,  3, 1, 2, // -Z
            5, 2, 1,  2, 5, 6, // +X
            0, 7, 4,  7, 0, 3, // -X
            7, 2, 6,  2, 7, 3, // +Y
            0, 5, 1,  5, 0, 4, // -Y
        ];

        Self { vertices, indices }
    }

    /// Number of indices as the draw call expects it
    #[allow(clippy::cast_possible_truncation)]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_cube_counts() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.indices.iter().all(|&i| usize::from(i) < cube.vertices.len()));
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_cube_triangles_wind_clockwise_from_outside() {
        let cube = Mesh::cube();
        let point = |i: u16| Vec3::from(cube.vertices[usize::from(i)].position);

        for tri in cube.indices.chunks(3) {
            let (a, b, c) = (point(tri[0]), point(tri[1]), point(tri[2]));
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            // Counter-clockwise normal points inward for a clockwise triangle
            assert!(normal.dot(&centroid) < 0.0, "triangle {tri:?} faces the wrong way");
        }
    }
}
