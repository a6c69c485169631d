//! Field evaluation on a horizontal slice through a surface mesh
//!
//! Single-layer potential of a unit density spread over the surface,
//! one-point (centroid) quadrature per triangle:
//!   u(p) = sum_k area_k / (4 pi |p - c_k|)
//!
//! Samples inside the mesh's bounding box are left missing.

use crate::payload::EvaluatedField;
use crate::shapes::TriangleMesh;
use std::f64::consts::PI;

/// Where and how densely to sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceSpec {
    pub width: usize,
    pub height: usize,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// World-space height of the slice plane
    pub elevation: f64,
}

impl SliceSpec {
    /// Square slice covering the mesh footprint plus `margin` on every side,
    /// through the mesh centre
    pub fn around(mesh: &TriangleMesh, resolution: usize, margin: f64) -> Option<Self> {
        let (min, max) = mesh.bounds()?;
        Some(Self {
            width: resolution,
            height: resolution,
            x_bounds: [min[0] as f64 - margin, max[0] as f64 + margin],
            y_bounds: [min[2] as f64 - margin, max[2] as f64 + margin],
            elevation: (min[1] as f64 + max[1] as f64) / 2.0,
        })
    }

    /// World-space position of the sample at column `i`, row `j`.
    /// Field x maps to world x, field y to world z.
    pub fn sample_point(&self, i: usize, j: usize) -> [f64; 3] {
        [
            lerp_axis(self.x_bounds, i, self.width),
            self.elevation,
            lerp_axis(self.y_bounds, j, self.height),
        ]
    }
}

fn lerp_axis(bounds: [f64; 2], i: usize, n: usize) -> f64 {
    if n <= 1 {
        return (bounds[0] + bounds[1]) / 2.0;
    }
    bounds[0] + (bounds[1] - bounds[0]) * i as f64 / (n - 1) as f64
}

fn inside_box(p: [f64; 3], min: [f32; 3], max: [f32; 3]) -> bool {
    (0..3).all(|k| p[k] >= min[k] as f64 && p[k] <= max[k] as f64)
}

/// Evaluate the potential over the slice, row-major
pub fn evaluate_slice(mesh: &TriangleMesh, spec: &SliceSpec) -> EvaluatedField {
    let panels = mesh.panels();
    let bounds = mesh.bounds();

    let mut result = Vec::with_capacity(spec.width * spec.height);
    for j in 0..spec.height {
        for i in 0..spec.width {
            let p = spec.sample_point(i, j);
            if let Some((min, max)) = bounds {
                if inside_box(p, min, max) {
                    result.push(None);
                    continue;
                }
            }

            let mut u = 0.0;
            for panel in &panels {
                let dx = p[0] - panel.centroid[0];
                let dy = p[1] - panel.centroid[1];
                let dz = p[2] - panel.centroid[2];
                let r = (dx * dx + dy * dy + dz * dz).sqrt();
                if r > f64::EPSILON {
                    u += panel.area / (4.0 * PI * r);
                }
            }
            result.push(Some(u));
        }
    }

    tracing::debug!(
        "Evaluated {}x{} slice over {} panels ({} missing)",
        spec.width,
        spec.height,
        panels.len(),
        result.iter().filter(|v| v.is_none()).count()
    );

    EvaluatedField {
        width: spec.width,
        height: spec.height,
        x_bounds: spec.x_bounds,
        y_bounds: spec.y_bounds,
        result,
    }
}
