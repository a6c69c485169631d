//! Field Colorizer - scalar field to RGBA texture
//!
//! Normalizes a flat field against its own min/max and maps every sample
//! through a two-stop power blend:
//!   channel = sqrt((1 - t) * low^2 + t * high^2)
//!
//! Missing samples count as 0 before normalization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorizeError {
    #[error("Invalid dimensions: {width}x{height} field with {actual} values")]
    InvalidDimensions {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("Empty field (width * height == 0)")]
    EmptyField,
}

/// 2D grid of samples, row-major. `None` marks a missing sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub width: usize,
    pub height: usize,
    pub values: Vec<Option<f64>>,
}

impl ScalarField {
    pub fn new(width: usize, height: usize, values: Vec<Option<f64>>) -> Self {
        Self { width, height, values }
    }

    /// Field without missing samples
    #[cfg(test)]
    pub fn from_dense(width: usize, height: usize, values: &[f64]) -> Self {
        Self::new(width, height, values.iter().map(|&v| Some(v)).collect())
    }

    /// Number of missing (or non-finite) samples
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| !is_present(**v)).count()
    }
}

/// One end of the blend gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStop {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<u8>,
}

impl ColorStop {
    #[cfg(test)]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a: Some(a) }
    }
}

/// Row-major RGBA8 texels, `width * height * 4` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBuffer {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

impl TextureBuffer {
    /// Texel at column `x`, row `y`
    #[cfg(test)]
    pub fn texel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([self.bytes[i], self.bytes[i + 1], self.bytes[i + 2], self.bytes[i + 3]])
    }

    pub fn texels(&self) -> Vec<[u8; 4]> {
        self.bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect()
    }

    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width as u32, self.height as u32, self.bytes.clone())
    }
}

fn is_present(v: Option<f64>) -> bool {
    matches!(v, Some(x) if x.is_finite())
}

fn sample_value(v: Option<f64>) -> f64 {
    match v {
        Some(x) if x.is_finite() => x,
        _ => 0.0,
    }
}

/// Quadratic-mean blend of two channel values at `t` in [0, 1]
pub fn power_blend(low: u8, high: u8, t: f64) -> u8 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let lo = low as f64;
    let hi = high as f64;
    let v = ((1.0 - t) * lo * lo + t * hi * hi).sqrt();
    v.round().clamp(0.0, 255.0) as u8
}

fn blend_stops(low: &ColorStop, high: &ColorStop, t: f64) -> [u8; 4] {
    let alpha = match (low.a, high.a) {
        (Some(la), Some(ha)) => power_blend(la, ha, t),
        _ => 255,
    };
    [
        power_blend(low.r, high.r, t),
        power_blend(low.g, high.g, t),
        power_blend(low.b, high.b, t),
        alpha,
    ]
}

/// Colorize a scalar field into an RGBA texture
pub fn colorize(
    field: &ScalarField,
    low: &ColorStop,
    high: &ColorStop,
) -> Result<TextureBuffer, ColorizeError> {
    let invalid = ColorizeError::InvalidDimensions {
        width: field.width,
        height: field.height,
        actual: field.values.len(),
    };
    let expected = field.width.checked_mul(field.height).ok_or_else(|| invalid.clone())?;

    if expected == 0 {
        return Err(ColorizeError::EmptyField);
    }
    if field.values.len() != expected {
        return Err(invalid);
    }

    let values: Vec<f64> = field.values.iter().map(|&v| sample_value(v)).collect();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // Halved so max - min cannot overflow for finite extremes
    let half_range = max / 2.0 - min / 2.0;

    let mut bytes = Vec::with_capacity(expected * 4);
    for &v in &values {
        let t = if half_range == 0.0 {
            0.0
        } else {
            ((v / 2.0 - min / 2.0) / half_range).clamp(0.0, 1.0)
        };
        bytes.extend_from_slice(&blend_stops(low, high, t));
    }

    tracing::trace!(
        width = field.width,
        height = field.height,
        min,
        max,
        "Field colorized"
    );

    Ok(TextureBuffer {
        width: field.width,
        height: field.height,
        bytes,
    })
}
