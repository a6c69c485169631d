//! Grid payload - wire format for mesh + evaluated field
//!
//! Shape served by `GET /api/grid`:
//! - indices: flat triangle indices
//! - vertices: flat xyz triples
//! - evaluated: { width, height, x_bounds, y_bounds, result }
//!
//! Missing samples in `result` travel as the string "nan".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use thiserror::Error;

use crate::colorize::ScalarField;
use crate::shapes::TriangleMesh;

const MISSING_TOKEN: &str = "nan";

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed mesh: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedField {
    pub width: usize,
    pub height: usize,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    #[serde(with = "missing_sentinel")]
    pub result: Vec<Option<f64>>,
}

impl EvaluatedField {
    pub fn to_scalar_field(&self) -> ScalarField {
        ScalarField::new(self.width, self.height, self.result.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPayload {
    pub indices: Vec<u32>,
    pub vertices: Vec<f32>,
    pub evaluated: EvaluatedField,
}

impl GridPayload {
    pub fn new(mesh: &TriangleMesh, evaluated: EvaluatedField) -> Self {
        Self {
            indices: mesh.indices.clone(),
            vertices: mesh.flat_vertices(),
            evaluated,
        }
    }

    /// Rebuild the mesh, checking array shapes and index range
    pub fn mesh(&self) -> Result<TriangleMesh, PayloadError> {
        if self.vertices.len() % 3 != 0 {
            return Err(PayloadError::Shape(format!(
                "vertex array length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(PayloadError::Shape(format!(
                "index array length {} is not a multiple of 3",
                self.indices.len()
            )));
        }

        let vertices: Vec<[f32; 3]> = self
            .vertices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(PayloadError::Shape(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }

        Ok(TriangleMesh {
            vertices,
            indices: self.indices.clone(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fetch the payload over HTTP
pub async fn fetch_grid(url: &str) -> Result<GridPayload, PayloadError> {
    tracing::info!("Fetching grid from {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("User-Agent", "Sonoverse/0.1")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(PayloadError::Status(response.status()));
    }

    let text = response.text().await?;
    tracing::debug!("Downloaded {} bytes of grid JSON", text.len());

    let payload = GridPayload::from_json(&text)?;
    tracing::info!(
        "Grid received: {} vertices, {} triangles, field {}x{}",
        payload.vertices.len() / 3,
        payload.indices.len() / 3,
        payload.evaluated.width,
        payload.evaluated.height
    );
    Ok(payload)
}

/// Load the payload from a JSON file
pub fn load_grid(path: &Path) -> Result<GridPayload, PayloadError> {
    tracing::info!("Loading grid from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    GridPayload::from_json(&content)
}

/// Fetch from `url` or read `file`, whichever is given (file wins)
pub async fn obtain_grid(url: &str, file: Option<&Path>) -> Result<GridPayload, PayloadError> {
    match file {
        Some(path) => load_grid(path),
        None => fetch_grid(url).await,
    }
}

/// `Vec<Option<f64>>` with `None` encoded as "nan".
/// Decoding also accepts `null` as missing.
mod missing_sentinel {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSample {
        Number(f64),
        Text(String),
    }

    #[derive(Serialize)]
    #[serde(untagged)]
    enum OutSample<'a> {
        Number(f64),
        Text(&'a str),
    }

    pub fn serialize<S: Serializer>(values: &[Option<f64>], s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for v in values {
            match v {
                Some(x) if x.is_finite() => seq.serialize_element(&OutSample::Number(*x))?,
                _ => seq.serialize_element(&OutSample::Text(MISSING_TOKEN))?,
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<f64>>, D::Error> {
        let raw: Vec<Option<RawSample>> = Vec::deserialize(d)?;
        raw.into_iter()
            .map(|sample| match sample {
                None => Ok(None),
                Some(RawSample::Number(x)) => Ok(Some(x)),
                Some(RawSample::Text(t)) if t.eq_ignore_ascii_case(MISSING_TOKEN) => Ok(None),
                Some(RawSample::Text(t)) => Err(serde::de::Error::custom(format!(
                    "unexpected field sample {:?}",
                    t
                ))),
            })
            .collect()
    }
}
