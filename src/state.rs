//! Application State - cached grid payload shared by all requests

use crate::config::GridConfig;
use crate::payload::GridPayload;
use crate::potential::{evaluate_slice, SliceSpec};
use crate::shapes;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub grid: GridConfig,
    pub payload: Arc<RwLock<Option<Arc<GridPayload>>>>,
}

/// Build the cube mesh and its evaluated slice
pub fn generate_payload(grid: &GridConfig) -> anyhow::Result<GridPayload> {
    let mesh = shapes::cube(grid.length, grid.h);
    let spec = SliceSpec::around(&mesh, grid.resolution, grid.margin)
        .ok_or_else(|| anyhow::anyhow!("Generated mesh has no vertices"))?;
    let evaluated = evaluate_slice(&mesh, &spec);
    Ok(GridPayload::new(&mesh, evaluated))
}

impl AppState {
    pub fn new(grid: GridConfig) -> Self {
        Self {
            grid,
            payload: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the payload, generating it on first use
    pub async fn grid_payload(&self) -> anyhow::Result<Arc<GridPayload>> {
        {
            let cached = self.payload.read().await;
            if let Some(payload) = cached.as_ref() {
                tracing::debug!("Grid payload found in cache");
                return Ok(payload.clone());
            }
        }

        let mut slot = self.payload.write().await;
        // Another request may have filled it while we waited
        if let Some(payload) = slot.as_ref() {
            return Ok(payload.clone());
        }

        tracing::info!(
            "Generating grid: cube length={} h={} resolution={}",
            self.grid.length,
            self.grid.h,
            self.grid.resolution
        );
        let grid = self.grid;
        let payload = tokio::task::spawn_blocking(move || generate_payload(&grid)).await??;
        let payload = Arc::new(payload);
        *slot = Some(payload.clone());
        tracing::debug!("Grid payload cached");

        Ok(payload)
    }
}
