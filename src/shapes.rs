//! Surface meshes served alongside the field
//!
//! Cube triangulation with outward winding, centred on the origin.

/// Face frames: (corner sign, u axis, v axis). u x v is the outward normal.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),   // +X
    ([-1.0, -1.0, -1.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),  // -X
    ([-1.0, 1.0, -1.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),   // +Y
    ([-1.0, -1.0, -1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),  // -Y
    ([-1.0, -1.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),   // +Z
    ([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),  // -Z
];

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// Per-triangle quantities used for quadrature
#[derive(Debug, Clone, Copy)]
pub struct TrianglePanel {
    pub centroid: [f64; 3],
    pub area: f64,
}

impl TriangleMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        if self.vertices.is_empty() {
            return None;
        }
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v[i]);
                max[i] = max[i].max(v[i]);
            }
        }
        Some((min, max))
    }

    pub fn panels(&self) -> Vec<TrianglePanel> {
        self.indices
            .chunks_exact(3)
            .map(|tri| {
                let a = to_f64(self.vertices[tri[0] as usize]);
                let b = to_f64(self.vertices[tri[1] as usize]);
                let c = to_f64(self.vertices[tri[2] as usize]);
                let ab = sub(b, a);
                let ac = sub(c, a);
                TrianglePanel {
                    centroid: [
                        (a[0] + b[0] + c[0]) / 3.0,
                        (a[1] + b[1] + c[1]) / 3.0,
                        (a[2] + b[2] + c[2]) / 3.0,
                    ],
                    area: 0.5 * norm(cross(ab, ac)),
                }
            })
            .collect()
    }

    /// Flatten to the wire layout (x0, y0, z0, x1, ...)
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.iter().copied()).collect()
    }
}

/// Cube of edge `length` centred on the origin, faces split into
/// `ceil(length / h)` cells per edge
pub fn cube(length: f32, h: f32) -> TriangleMesh {
    let n = if h > 0.0 {
        ((length / h).ceil() as usize).max(1)
    } else {
        1
    };
    let half = length / 2.0;
    let step = length / n as f32;

    let mut vertices = Vec::with_capacity(6 * (n + 1) * (n + 1));
    let mut indices = Vec::with_capacity(6 * n * n * 6);

    for (corner, u, v) in CUBE_FACES.iter() {
        let base = vertices.len() as u32;
        for j in 0..=n {
            for i in 0..=n {
                let su = i as f32 * step;
                let sv = j as f32 * step;
                vertices.push([
                    corner[0] * half + u[0] * su + v[0] * sv,
                    corner[1] * half + u[1] * su + v[1] * sv,
                    corner[2] * half + u[2] * su + v[2] * sv,
                ]);
            }
        }

        let row = (n + 1) as u32;
        for j in 0..n as u32 {
            for i in 0..n as u32 {
                let a = base + j * row + i;
                let b = a + 1;
                let c = a + row + 1;
                let d = a + row;
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
    }

    tracing::debug!(
        "Cube length={} h={}: {} vertices, {} triangles",
        length,
        h,
        vertices.len(),
        indices.len() / 3
    );

    TriangleMesh { vertices, indices }
}

fn to_f64(v: [f32; 3]) -> [f64; 3] {
    [v[0] as f64, v[1] as f64, v[2] as f64]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}
