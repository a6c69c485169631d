//! Native 3D viewer using three-d
//!
//! Renders the fetched mesh, overlays the colorized field on a ground
//! plane and orbits the camera with left-drag.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use three_d::*;
use tracing::{debug, info, warn};

use crate::colorize::{colorize, ColorStop, TextureBuffer};
use crate::config::Config;
use crate::orbit::{OrbitController, OrbitState, PointerSample};
use crate::payload::{obtain_grid, EvaluatedField, GridPayload, PayloadError};

/// Gap between the lowest mesh point and the ground plane
const GROUND_GAP: f32 = 0.01;

/// Where the viewer gets its grid from
#[derive(Debug, Clone)]
pub struct GridSource {
    pub url: String,
    pub file: Option<PathBuf>,
}

type FetchResult = Result<GridPayload, PayloadError>;

/// Kick off a one-shot fetch on the runtime; the result lands on `tx`
fn request_grid(handle: &tokio::runtime::Handle, source: &GridSource, tx: Sender<FetchResult>) {
    let source = source.clone();
    handle.spawn(async move {
        let result = obtain_grid(&source.url, source.file.as_deref()).await;
        if tx.send(result).is_err() {
            debug!("Viewer closed before grid arrived");
        }
    });
}

/// Pointer and drag button state accumulated from window events
#[derive(Debug, Clone, Copy, Default)]
struct PointerInput {
    pointer: PointerSample,
    pressed: bool,
}

impl PointerInput {
    fn press(&mut self, pointer: PointerSample) {
        self.pointer = pointer;
        self.pressed = true;
    }

    fn release(&mut self, pointer: PointerSample) {
        self.pointer = pointer;
        self.pressed = false;
    }

    fn motion(&mut self, pointer: PointerSample) {
        self.pointer = pointer;
    }

    fn leave(&mut self) {
        self.pressed = false;
    }

    /// Fold this frame's unhandled events into the input state
    fn handle_events(&mut self, events: &[Event], viewport: Viewport) {
        let w = viewport.width as f32;
        let h = viewport.height as f32;
        let ndc = |p: &PhysicalPoint| {
            PointerSample::from_pixels(p.x - viewport.x as f32, p.y - viewport.y as f32, w, h)
        };

        for event in events {
            match event {
                Event::MousePress {
                    button: MouseButton::Left,
                    position,
                    handled: false,
                    ..
                } => self.press(ndc(position)),
                Event::MouseRelease {
                    button: MouseButton::Left,
                    position,
                    ..
                } => self.release(ndc(position)),
                Event::MouseMotion {
                    position,
                    handled: false,
                    ..
                } => self.motion(ndc(position)),
                Event::MouseLeave => self.leave(),
                _ => {}
            }
        }
    }
}

/// Ground plane quad spanning the field bounds, facing up
#[derive(Debug, Clone, PartialEq)]
struct PlaneGeometry {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

/// Field x runs along world x, field y along world z; row 0 sits at v = 0
fn ground_plane(field: &EvaluatedField, elevation: f32) -> PlaneGeometry {
    let [x0, x1] = field.x_bounds.map(|v| v as f32);
    let [z0, z1] = field.y_bounds.map(|v| v as f32);
    PlaneGeometry {
        positions: vec![
            [x0, elevation, z0],
            [x1, elevation, z0],
            [x1, elevation, z1],
            [x0, elevation, z1],
        ],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

fn to_cpu_texture(texture: &TextureBuffer) -> CpuTexture {
    CpuTexture {
        data: TextureData::RgbaU8(texture.texels()),
        width: texture.width as u32,
        height: texture.height as u32,
        ..Default::default()
    }
}

/// GPU-side objects built from the latest payload
struct Scene {
    mesh: Option<Gm<Mesh, PhysicalMaterial>>,
    plane: Option<Gm<Mesh, ColorMaterial>>,
    status: String,
}

impl Scene {
    fn new() -> Self {
        Self {
            mesh: None,
            plane: None,
            status: "Waiting for grid...".to_string(),
        }
    }

    fn apply(
        &mut self,
        context: &Context,
        payload: &GridPayload,
        low: &ColorStop,
        high: &ColorStop,
        mesh_color: [u8; 3],
    ) {
        let mut ground = 0.0;
        match payload.mesh() {
            Ok(mesh) => {
                if let Some((min, _)) = mesh.bounds() {
                    ground = min[1] - GROUND_GAP;
                }
                let mut cpu_mesh = CpuMesh {
                    positions: Positions::F32(
                        mesh.vertices.iter().map(|v| vec3(v[0], v[1], v[2])).collect(),
                    ),
                    indices: Indices::U32(mesh.indices.clone()),
                    ..Default::default()
                };
                cpu_mesh.compute_normals();
                let material = PhysicalMaterial::new_opaque(
                    context,
                    &CpuMaterial {
                        albedo: Srgba::new(mesh_color[0], mesh_color[1], mesh_color[2], 255),
                        ..Default::default()
                    },
                );
                self.mesh = Some(Gm::new(Mesh::new(context, &cpu_mesh), material));
                info!("Mesh uploaded: {} triangles", mesh.triangle_count());
            }
            Err(e) => {
                crate::log_error!(e, stage = "mesh");
                self.status = format!("Mesh rejected: {}", e);
                return;
            }
        }

        // On failure keep whatever texture is already on the plane
        let field = payload.evaluated.to_scalar_field();
        let texture = match colorize(&field, low, high) {
            Ok(t) => t,
            Err(e) => {
                crate::log_error!(e, stage = "colorize");
                self.status = format!("Field skipped: {}", e);
                return;
            }
        };

        let geometry = ground_plane(&payload.evaluated, ground);
        let cpu_plane = CpuMesh {
            positions: Positions::F32(
                geometry.positions.iter().map(|p| vec3(p[0], p[1], p[2])).collect(),
            ),
            indices: Indices::U32(geometry.indices),
            uvs: Some(geometry.uvs.iter().map(|uv| vec2(uv[0], uv[1])).collect()),
            ..Default::default()
        };
        let material = ColorMaterial {
            texture: Some(Texture2DRef::from_cpu_texture(context, &to_cpu_texture(&texture))),
            ..Default::default()
        };
        self.plane = Some(Gm::new(Mesh::new(context, &cpu_plane), material));

        self.status = format!(
            "Field {}x{} ({} missing)",
            field.width,
            field.height,
            field.missing_count()
        );
        info!("{}", self.status);
    }
}

/// Open the viewer window and run until it is closed
pub fn run(config: Config, source: GridSource, handle: tokio::runtime::Handle) -> anyhow::Result<()> {
    let window = Window::new(WindowSettings {
        title: config.viewer.title.clone(),
        max_size: Some((config.viewer.width, config.viewer.height)),
        ..Default::default()
    })?;
    let context = window.gl();

    let controller = OrbitController::new(config.orbit);
    let mut orbit: OrbitState = controller.initial_state();
    let mut input = PointerInput::default();

    let start = orbit.position;
    let mut camera = Camera::new_perspective(
        window.viewport(),
        vec3(start[0], start[1], start[2]),
        vec3(0.0, 0.0, 0.0),
        vec3(0.0, 1.0, 0.0),
        degrees(45.0),
        0.1,
        1000.0,
    );

    let ambient = AmbientLight::new(&context, 0.4, Srgba::WHITE);
    let directional = DirectionalLight::new(&context, 2.0, Srgba::WHITE, vec3(-1.0, -1.0, -1.0));
    let axes = Axes::new(&context, 0.03, 5.0);

    let mut scene = Scene::new();
    let mut gui = GUI::new(&context);

    let (tx, rx): (Sender<FetchResult>, Receiver<FetchResult>) = mpsc::channel();
    request_grid(&handle, &source, tx.clone());

    let low = config.colors.low;
    let high = config.colors.high;
    let mesh_color = config.viewer.mesh_color;

    window.render_loop(move |mut frame_input| {
        while let Ok(result) = rx.try_recv() {
            match result {
                Ok(payload) => scene.apply(&context, &payload, &low, &high, mesh_color),
                Err(e) => {
                    crate::log_error!(e, stage = "fetch");
                    scene.status = format!("Fetch failed: {}", e);
                }
            }
        }

        let mut reload = false;
        let status = scene.status.clone();
        let accumulated = orbit.accumulated;
        let dragging = orbit.is_dragging();
        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                three_d::egui::Window::new("Field").show(gui_context, |ui| {
                    ui.label(&status);
                    ui.label(format!(
                        "Offset: {:.2}, {:.2}{}",
                        accumulated.x,
                        accumulated.y,
                        if dragging { " (dragging)" } else { "" }
                    ));
                    if ui.button("Reload").clicked() {
                        reload = true;
                    }
                });
            },
        );
        if reload {
            info!("Reloading grid");
            scene.status = "Reloading...".to_string();
            request_grid(&handle, &source, tx.clone());
        }

        input.handle_events(&frame_input.events, frame_input.viewport);
        let (next, position) = controller.step(orbit, input.pointer, input.pressed);
        orbit = next;

        camera.set_viewport(frame_input.viewport);
        camera.set_view(
            vec3(position[0], position[1], position[2]),
            vec3(0.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        );

        let lights: [&dyn Light; 2] = [&ambient, &directional];
        frame_input
            .screen()
            .clear(ClearState::color_and_depth(0.08, 0.08, 0.12, 1.0, 1.0));
        if let Some(plane) = &scene.plane {
            plane.render(&camera, &lights);
        }
        if let Some(mesh) = &scene.mesh {
            mesh.render(&camera, &lights);
        }
        axes.render(&camera, &lights);

        if let Err(e) = frame_input.screen().write(|| gui.render()) {
            warn!("GUI render failed: {}", e);
        }

        FrameOutput::default()
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> EvaluatedField {
        EvaluatedField {
            width: 2,
            height: 2,
            x_bounds: [-3.0, 3.0],
            y_bounds: [-1.0, 2.0],
            result: vec![Some(0.0); 4],
        }
    }

    #[test]
    fn test_ground_plane_spans_bounds() {
        let plane = ground_plane(&field(), -1.5);
        assert_eq!(plane.positions[0], [-3.0, -1.5, -1.0]);
        assert_eq!(plane.positions[2], [3.0, -1.5, 2.0]);
        assert!(plane.positions.iter().all(|p| p[1] == -1.5));
    }

    #[test]
    fn test_ground_plane_faces_up() {
        let plane = ground_plane(&field(), 0.0);
        for tri in plane.indices.chunks_exact(3) {
            let a = plane.positions[tri[0] as usize];
            let b = plane.positions[tri[1] as usize];
            let c = plane.positions[tri[2] as usize];
            let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let ny = ab[2] * ac[0] - ab[0] * ac[2];
            assert!(ny > 0.0);
        }
    }

    #[test]
    fn test_pointer_input_press_release_leave() {
        let mut input = PointerInput::default();
        input.press(PointerSample::new(0.1, 0.2));
        assert!(input.pressed);
        input.motion(PointerSample::new(0.4, 0.2));
        assert!(input.pressed);
        assert_eq!(input.pointer, PointerSample::new(0.4, 0.2));
        input.release(PointerSample::new(0.5, 0.2));
        assert!(!input.pressed);
        assert_eq!(input.pointer.x, 0.5);

        input.press(PointerSample::new(0.0, 0.0));
        input.leave();
        assert!(!input.pressed);
    }

    fn press(x: f32, y: f32, handled: bool) -> Event {
        Event::MousePress {
            button: MouseButton::Left,
            position: PhysicalPoint { x, y },
            modifiers: Modifiers::default(),
            handled,
        }
    }

    fn motion(x: f32, y: f32, handled: bool) -> Event {
        Event::MouseMotion {
            button: Some(MouseButton::Left),
            delta: (0.0, 0.0),
            position: PhysicalPoint { x, y },
            modifiers: Modifiers::default(),
            handled,
        }
    }

    #[test]
    fn test_handle_events_translates_window_events() {
        let viewport = Viewport {
            x: 100,
            y: 50,
            width: 200,
            height: 100,
        };
        let mut input = PointerInput::default();

        // Consumed by the overlay
        input.handle_events(&[press(200.0, 100.0, true)], viewport);
        assert!(!input.pressed);

        input.handle_events(&[press(200.0, 100.0, false)], viewport);
        assert!(input.pressed);
        assert_eq!(input.pointer, PointerSample::new(0.0, 0.0));

        input.handle_events(
            &[motion(300.0, 150.0, false), motion(100.0, 50.0, true)],
            viewport,
        );
        assert!(input.pressed);
        assert_eq!(input.pointer, PointerSample::new(1.0, 1.0));

        let release = Event::MouseRelease {
            button: MouseButton::Left,
            position: PhysicalPoint { x: 250.0, y: 100.0 },
            modifiers: Modifiers::default(),
            handled: true,
        };
        input.handle_events(&[release], viewport);
        assert!(!input.pressed);
        assert_eq!(input.pointer, PointerSample::new(0.5, 0.0));

        input.handle_events(&[press(100.0, 50.0, false), Event::MouseLeave], viewport);
        assert!(!input.pressed);
        assert_eq!(input.pointer, PointerSample::new(-1.0, -1.0));
    }

    #[test]
    fn test_pointer_input_drives_orbit() {
        let ctl = OrbitController::new(Default::default());
        let mut input = PointerInput::default();
        let mut state = ctl.initial_state();

        input.press(PointerSample::new(0.0, 0.0));
        state = ctl.step(state, input.pointer, input.pressed).0;
        input.motion(PointerSample::new(0.5, 0.0));
        state = ctl.step(state, input.pointer, input.pressed).0;
        input.leave();
        state = ctl.step(state, input.pointer, input.pressed).0;

        assert!(!state.is_dragging());
        assert!((state.accumulated.x + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cpu_texture_layout() {
        let tex = TextureBuffer {
            width: 2,
            height: 1,
            bytes: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        let cpu = to_cpu_texture(&tex);
        assert_eq!((cpu.width, cpu.height), (2, 1));
        match cpu.data {
            TextureData::RgbaU8(px) => assert_eq!(px, vec![[1, 2, 3, 4], [5, 6, 7, 8]]),
            _ => panic!("unexpected texture format"),
        }
    }
}
