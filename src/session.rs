use std::{fmt, sync::Arc};

use glam::Quat;

use crate::{
    animation::{AnimationDriver, AxisTrack, DriverEvent},
    assets::{AssetKind, LoadChain, LoadRequest, LoadResult, LoadStatus},
    camera::Camera,
    config::{Placement, SceneConfig},
    controls::OrbitControls,
    debug_panel::DebugPanel,
    lights::Lights,
    model::ModelAsset,
    scene_graph::{ObjectId, Scene},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Viewport {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Identifies one mount of the 3D view. Work tagged with an old token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(pub u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The render target a session draws into. The GPU side mirrors it while it is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub token: SessionToken,
    pub size: Viewport,
}

/// Cancellation handle for the per-frame loop; checked before every reschedule.
#[derive(Debug, Default)]
pub struct RenderLoop {
    cancelled: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn tick(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.frames += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Viewport resize subscriptions.
#[derive(Debug, Default)]
pub struct ResizeSignal {
    next_id: u64,
    listeners: Vec<(ListenerId, SessionToken)>,
}

impl ResizeSignal {
    pub fn subscribe(&mut self, token: SessionToken) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, token));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn is_subscribed(&self, token: SessionToken) -> bool {
        self.listeners.iter().any(|(_, t)| *t == token)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// What teardown released. Everything should be true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub panel_disposed: bool,
    pub loop_cancelled: bool,
    pub listener_removed: bool,
    pub canvas_detached: bool,
    pub controls_detached: bool,
}

impl TeardownReport {
    pub fn is_complete(&self) -> bool {
        self.panel_disposed
            && self.loop_cancelled
            && self.listener_removed
            && self.canvas_detached
            && self.controls_detached
    }
}

/// One live instantiation of the 3D view and everything it owns.
pub struct Session {
    pub token: SessionToken,
    pub scene: Scene,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub lights: Lights,
    pub panel: DebugPanel,
    pub driver: AnimationDriver,
    config: Arc<SceneConfig>,
    loads: LoadChain,
    socket: Option<ObjectId>,
    plug: Option<ObjectId>,
    canvas: Option<Canvas>,
    render_loop: RenderLoop,
    resize_listener: Option<ListenerId>,
}

impl Session {
    /// Builds the world for a fresh mount and returns the first asset load to issue.
    pub fn bootstrap(
        token: SessionToken,
        config: Arc<SceneConfig>,
        viewport: Viewport,
        resize: &mut ResizeSignal,
    ) -> (Self, LoadRequest) {
        let camera = Camera::perspective(&config.camera, viewport);

        let mut controls = OrbitControls::new(glam::Vec3::ZERO);
        controls.attach();
        controls.enabled = false;

        let lights = Lights::from_config(&config.lighting);
        let panel = DebugPanel::for_projector(&config.panel);

        let driver = AnimationDriver::new(
            config.animation_duration,
            AxisTrack {
                start: config.socket.start.x,
                end: config.socket.end_x,
            },
            AxisTrack {
                start: config.plug.start.x,
                end: config.plug.end_x,
            },
        );

        let (loads, first) = LoadChain::start();
        let resize_listener = Some(resize.subscribe(token));

        log::info!(
            "Bootstrapped session {} at {}x{}",
            token,
            viewport.width,
            viewport.height
        );

        let session = Self {
            token,
            scene: Scene::new(),
            camera,
            controls,
            lights,
            panel,
            driver,
            config,
            loads,
            socket: None,
            plug: None,
            canvas: Some(Canvas {
                token,
                size: viewport,
            }),
            render_loop: RenderLoop::default(),
            resize_listener,
        };

        let request = session.request_for(first);
        (session, request)
    }

    fn placement(&self, kind: AssetKind) -> &Placement {
        match kind {
            AssetKind::Socket => &self.config.socket,
            AssetKind::Plug => &self.config.plug,
        }
    }

    fn request_for(&self, kind: AssetKind) -> LoadRequest {
        LoadRequest {
            token: self.token,
            kind,
            path: self.placement(kind).path.clone(),
        }
    }

    /// Applies a finished load. Returns the next load to issue, if the chain continues.
    pub fn on_load_result(&mut self, result: LoadResult) -> Option<LoadRequest> {
        debug_assert_eq!(result.token, self.token);

        if !self.loads.expects(result.kind) {
            log::debug!("Ignoring unexpected {:?} load result", result.kind);
            return None;
        }

        match result.result {
            Ok(asset) => {
                self.attach(result.kind, &asset);
                let next = self.loads.on_loaded(result.kind)?;
                Some(self.request_for(next))
            }
            Err(error) => {
                log::error!("Loading {:?} failed: {}", result.kind, error);
                self.loads.on_failed(result.kind, error);
                None
            }
        }
    }

    fn attach(&mut self, kind: AssetKind, asset: &ModelAsset) {
        let placement = self.placement(kind).clone();
        let root = self.scene.spawn_model_asset(asset);

        self.scene.set_object_scale(root, placement.scale);
        self.scene
            .set_object_rotation(root, Quat::from_rotation_y(placement.rotation_y));
        self.scene.set_object_translation(root, placement.start);

        match kind {
            AssetKind::Socket => self.socket = Some(root),
            AssetKind::Plug => self.plug = Some(root),
        }

        log::info!(
            "Attached {:?} ({} meshes) to session {}",
            kind,
            asset.root.mesh_count(),
            self.token
        );
    }

    /// Re-issues a failed load, if there is one.
    pub fn retry_loads(&mut self) -> Option<LoadRequest> {
        let kind = self.loads.retry()?;
        log::info!("Retrying {:?} load for session {}", kind, self.token);
        Some(self.request_for(kind))
    }

    pub fn load_status(&self) -> &LoadStatus {
        self.loads.status()
    }

    pub fn socket(&self) -> Option<ObjectId> {
        self.socket
    }

    pub fn plug(&self) -> Option<ObjectId> {
        self.plug
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// Runs one frame of scene logic. Does nothing once the loop is cancelled.
    pub fn frame(&mut self, now: f64) -> DriverEvent {
        if !self.render_loop.tick() {
            return DriverEvent::Inactive;
        }

        self.controls.update(&mut self.camera);
        let event = self
            .driver
            .update(now, &mut self.scene, self.socket, self.plug);
        self.scene.late_update();

        event
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }

        self.camera.aspect = viewport.aspect();
        self.camera.update_projection_matrix();

        if let Some(canvas) = &mut self.canvas {
            canvas.size = viewport;
        }
    }

    pub fn teardown(mut self, resize: &mut ResizeSignal) -> TeardownReport {
        self.panel.dispose();
        self.render_loop.cancel();
        self.controls.detach();

        let listener_removed = match self.resize_listener.take() {
            Some(id) => resize.unsubscribe(id),
            None => false,
        };

        let canvas_detached = self.canvas.take().is_some();

        log::info!(
            "Tore down session {} after {} frames",
            self.token,
            self.render_loop.frames()
        );

        TeardownReport {
            panel_disposed: self.panel.is_disposed(),
            loop_cancelled: !self.render_loop.is_active(),
            listener_removed,
            canvas_detached,
            controls_detached: !self.controls.is_attached(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{testing::cube_asset, AssetError};
    use glam::Vec3;

    fn bootstrap() -> (Session, LoadRequest, ResizeSignal) {
        let mut resize = ResizeSignal::default();
        let (session, request) = Session::bootstrap(
            SessionToken(1),
            Arc::new(SceneConfig::default()),
            Viewport::new(1920, 1080),
            &mut resize,
        );
        (session, request, resize)
    }

    fn loaded(kind: AssetKind) -> LoadResult {
        LoadResult {
            token: SessionToken(1),
            kind,
            result: Ok(cube_asset("model")),
        }
    }

    #[test]
    fn bootstrap_builds_the_world_and_asks_for_the_socket() {
        let (session, request, resize) = bootstrap();

        assert_eq!(request.kind, AssetKind::Socket);
        assert_eq!(request.token, SessionToken(1));
        assert_eq!(
            request.path,
            std::path::PathBuf::from("models/soket/scene.gltf")
        );

        assert!(session.controls.is_attached());
        assert!(!session.controls.enabled);
        assert!(!session.panel.is_disposed());
        assert_eq!(session.canvas().unwrap().size, Viewport::new(1920, 1080));
        assert!(resize.is_subscribed(SessionToken(1)));
        assert!((session.camera.fov_y_degrees - 75.0).abs() < f32::EPSILON);
        assert_eq!(session.socket(), None);
        assert_eq!(session.plug(), None);
    }

    #[test]
    fn socket_is_placed_then_plug_requested() {
        let (mut session, _, _) = bootstrap();

        let next = session.on_load_result(loaded(AssetKind::Socket)).unwrap();
        assert_eq!(next.kind, AssetKind::Plug);

        let socket = session.socket().unwrap();
        let transform = session.scene.get_object_transform(socket).unwrap();
        assert_eq!(transform.translation(), Vec3::new(111.5, -1.6, 106.6));
        assert_eq!(transform.scale(), Vec3::new(99.7, 75.3, 58.1));
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(transform.rotation().abs_diff_eq(expected, 1e-6));

        assert_eq!(session.on_load_result(loaded(AssetKind::Plug)), None);
        let plug = session.plug().unwrap();
        let transform = session.scene.get_object_transform(plug).unwrap();
        assert_eq!(transform.translation(), Vec3::new(-11.4, 0.0, -6.5));
        assert_eq!(transform.scale(), Vec3::ONE);
        assert!(matches!(session.load_status(), LoadStatus::Ready));
    }

    #[test]
    fn plug_result_before_socket_is_ignored() {
        let (mut session, _, _) = bootstrap();
        assert_eq!(session.on_load_result(loaded(AssetKind::Plug)), None);
        assert_eq!(session.plug(), None);
    }

    #[test]
    fn failed_load_surfaces_and_retries() {
        let (mut session, _, _) = bootstrap();
        let failure = LoadResult {
            token: SessionToken(1),
            kind: AssetKind::Socket,
            result: Err(AssetError::EmptyScene {
                path: "models/soket/scene.gltf".into(),
            }),
        };

        assert_eq!(session.on_load_result(failure), None);
        assert!(session.load_status().is_failed());
        assert_eq!(session.socket(), None);

        let retry = session.retry_loads().unwrap();
        assert_eq!(retry.kind, AssetKind::Socket);
        assert!(session.retry_loads().is_none());
    }

    #[test]
    fn resize_updates_camera_and_canvas_only() {
        let (mut session, _, _) = bootstrap();
        session.driver.arm();
        let run_before = session.driver.run;

        session.resize(Viewport::new(1024, 768));

        assert!((session.camera.aspect - 1024.0 / 768.0).abs() < 1e-6);
        assert_eq!(session.canvas().unwrap().size, Viewport::new(1024, 768));
        assert_eq!(session.driver.run, run_before);

        session.resize(Viewport::new(0, 768));
        assert_eq!(session.canvas().unwrap().size, Viewport::new(1024, 768));
    }

    #[test]
    fn teardown_releases_everything() {
        let (session, _, mut resize) = bootstrap();
        let report = session.teardown(&mut resize);

        assert!(report.is_complete(), "{report:?}");
        assert_eq!(resize.len(), 0);
    }
}
