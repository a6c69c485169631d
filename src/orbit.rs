//! Orbit Camera Controller
//!
//! Polled once per frame with the current pointer (normalized device
//! coordinates) and the drag button state. A drag's live delta is only
//! folded into the accumulated offset when the drag is released.

use serde::{Deserialize, Serialize};

/// Pointer position in normalized device coordinates, [-1, 1] on each axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert a pixel position (origin bottom-left) into NDC
    pub fn from_pixels(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(2.0 * x / width.max(1.0) - 1.0, 2.0 * y / height.max(1.0) - 1.0)
    }
}

/// Angular offset in radians: `x` is azimuth, `y` is elevation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    Dragging { start: PointerSample },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub phase: DragPhase,
    /// Committed offset. Not wrapped into [-pi, pi].
    pub accumulated: Offset,
    pub position: [f32; 3],
}

impl OrbitState {
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    /// Per-axis orbit radius
    pub radius: [f32; 3],
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            radius: [10.0, 10.0, 10.0],
        }
    }
}

/// Live delta between drag start and the current pointer, sign inverted
fn live_delta(start: PointerSample, pointer: PointerSample) -> Offset {
    Offset {
        x: -(pointer.x - start.x),
        y: -(pointer.y - start.y),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitController {
    config: OrbitConfig,
}

impl OrbitController {
    pub fn new(config: OrbitConfig) -> Self {
        Self { config }
    }

    /// Initial state: idle, zero offset
    pub fn initial_state(&self) -> OrbitState {
        OrbitState {
            phase: DragPhase::Idle,
            accumulated: Offset::default(),
            position: self.camera_position(Offset::default()),
        }
    }

    /// Point on the orbit for an effective offset, looking at the origin
    pub fn camera_position(&self, offset: Offset) -> [f32; 3] {
        let [rx, ry, rz] = self.config.radius;
        [
            rx * offset.x.sin() * offset.y.cos(),
            ry * offset.y.sin(),
            rz * offset.x.cos() * offset.y.cos(),
        ]
    }

    /// Advance one frame
    pub fn step(
        &self,
        state: OrbitState,
        pointer: PointerSample,
        drag_active: bool,
    ) -> (OrbitState, [f32; 3]) {
        let next = match (state.phase, drag_active) {
            (DragPhase::Idle, false) => state,
            (DragPhase::Idle, true) => {
                tracing::trace!(x = pointer.x, y = pointer.y, "Drag started");
                let position = self.camera_position(state.accumulated);
                OrbitState {
                    phase: DragPhase::Dragging { start: pointer },
                    position,
                    ..state
                }
            }
            (DragPhase::Dragging { start }, true) => {
                let effective = state.accumulated + live_delta(start, pointer);
                OrbitState {
                    position: self.camera_position(effective),
                    ..state
                }
            }
            (DragPhase::Dragging { start }, false) => {
                let accumulated = state.accumulated + live_delta(start, pointer);
                tracing::debug!(
                    offset_x = accumulated.x,
                    offset_y = accumulated.y,
                    "Drag committed"
                );
                OrbitState {
                    phase: DragPhase::Idle,
                    accumulated,
                    position: self.camera_position(accumulated),
                }
            }
        };
        (next, next.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> OrbitController {
        OrbitController::new(OrbitConfig::default())
    }

    fn drag(
        ctl: &OrbitController,
        state: OrbitState,
        from: PointerSample,
        to: PointerSample,
    ) -> OrbitState {
        let (s, _) = ctl.step(state, from, true);
        let (s, _) = ctl.step(s, to, true);
        let (s, _) = ctl.step(s, to, false);
        s
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_initial_position() {
        let ctl = controller();
        let s = ctl.initial_state();
        assert_eq!(s.phase, DragPhase::Idle);
        assert!(close(s.position[0], 0.0));
        assert!(close(s.position[1], 0.0));
        assert!(close(s.position[2], 10.0));
    }

    #[test]
    fn test_drag_right_rotates_left() {
        let ctl = controller();
        let s = drag(&ctl, ctl.initial_state(), PointerSample::new(0.0, 0.0), PointerSample::new(0.5, 0.0));
        assert!(close(s.accumulated.x, -0.5));
        assert!(close(s.accumulated.y, 0.0));

        let pos = ctl.camera_position(s.accumulated);
        assert!((pos[0] - (-4.794)).abs() < 0.01);
        assert!(close(pos[1], 0.0));
        assert!((pos[2] - 8.776).abs() < 0.01);
        assert_eq!(pos, s.position);
    }

    #[test]
    fn test_offset_not_written_during_drag() {
        let ctl = controller();
        let (s, _) = ctl.step(ctl.initial_state(), PointerSample::new(0.1, 0.1), true);
        let (s, pos) = ctl.step(s, PointerSample::new(0.6, -0.2), true);
        assert_eq!(s.accumulated, Offset::default());
        assert!(s.is_dragging());

        let expected = ctl.camera_position(Offset { x: -0.5, y: 0.3 });
        assert!(close(pos[0], expected[0]));
        assert!(close(pos[1], expected[1]));
        assert!(close(pos[2], expected[2]));
    }

    #[test]
    fn test_release_commits_delta_at_release_pointer() {
        let ctl = controller();
        let (s, _) = ctl.step(ctl.initial_state(), PointerSample::new(0.0, 0.0), true);
        let (s, _) = ctl.step(s, PointerSample::new(0.2, 0.0), true);
        // Pointer moved again on the release frame
        let (s, _) = ctl.step(s, PointerSample::new(0.3, 0.1), false);
        assert_eq!(s.phase, DragPhase::Idle);
        assert!(close(s.accumulated.x, -0.3));
        assert!(close(s.accumulated.y, -0.1));
    }

    #[test]
    fn test_zero_movement_drag_is_noop() {
        let ctl = controller();
        let start = ctl.initial_state();
        let p = PointerSample::new(0.4, -0.7);
        let s = drag(&ctl, start, p, p);
        assert_eq!(s.accumulated, start.accumulated);
        assert_eq!(s.phase, DragPhase::Idle);
    }

    #[test]
    fn test_drags_compose_additively() {
        let ctl = controller();
        let origin = PointerSample::new(0.0, 0.0);

        let s = drag(&ctl, ctl.initial_state(), origin, PointerSample::new(0.3, 0.1));
        let s = drag(&ctl, s, PointerSample::new(-0.2, 0.5), PointerSample::new(0.0, 0.3));

        let once = drag(&ctl, ctl.initial_state(), origin, PointerSample::new(0.5, -0.1));
        assert!(close(s.accumulated.x, once.accumulated.x));
        assert!(close(s.accumulated.y, once.accumulated.y));
    }

    #[test]
    fn test_idle_holds_position() {
        let ctl = controller();
        let s = drag(&ctl, ctl.initial_state(), PointerSample::new(0.0, 0.0), PointerSample::new(0.5, 0.25));
        let held = s.position;
        let mut state = s;
        for i in 0..5 {
            let (next, pos) = ctl.step(state, PointerSample::new(i as f32 * 0.1, -0.3), false);
            assert_eq!(pos, held);
            assert_eq!(next, state);
            state = next;
        }
    }

    #[test]
    fn test_elevation() {
        let ctl = controller();
        let pos = ctl.camera_position(Offset { x: 0.0, y: std::f32::consts::FRAC_PI_2 });
        assert!(close(pos[0], 0.0));
        assert!(close(pos[1], 10.0));
        assert!(pos[2].abs() < 1e-3);
    }

    #[test]
    fn test_accumulator_unbounded() {
        let ctl = controller();
        let mut s = ctl.initial_state();
        for _ in 0..10 {
            s = drag(&ctl, s, PointerSample::new(1.0, 0.0), PointerSample::new(-1.0, 0.0));
        }
        assert!(close(s.accumulated.x, 20.0));
    }

    #[test]
    fn test_pointer_from_pixels() {
        let p = PointerSample::from_pixels(0.0, 600.0, 800.0, 600.0);
        assert!(close(p.x, -1.0));
        assert!(close(p.y, 1.0));
        let c = PointerSample::from_pixels(400.0, 300.0, 800.0, 600.0);
        assert!(close(c.x, 0.0) && close(c.y, 0.0));
    }
}
