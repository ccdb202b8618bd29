use std::sync::Arc;

use crate::{
    animation::{ArmOutcome, DriverEvent},
    assets::{AssetLoader, AssetSource, LoadStatus},
    config::SceneConfig,
    session::{Canvas, ResizeSignal, Session, SessionToken, TeardownReport, Viewport},
    view::{ViewController, ViewState, ViewTransition},
};

/// What a frame produced, for whoever draws it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub view: ViewState,
    pub overlay_opacity: f32,
    pub driver: DriverEvent,
    pub transition: Option<ViewTransition>,
    /// Whether the 3D loop wants another frame.
    pub reschedule: bool,
}

/// Owns the view lifecycle and at most one live [`Session`].
pub struct Host {
    config: Arc<SceneConfig>,
    viewport: Viewport,
    view: ViewController,
    session: Option<Session>,
    resize: ResizeSignal,
    loader: AssetLoader,
    next_token: u64,
    last_teardown: Option<TeardownReport>,
}

impl Host {
    pub fn new(config: SceneConfig, source: Arc<dyn AssetSource>, viewport: Viewport) -> Self {
        let view = ViewController::new(&config.view);

        Self {
            config: Arc::new(config),
            viewport,
            view,
            session: None,
            resize: ResizeSignal::default(),
            loader: AssetLoader::new(source),
            next_token: 1,
            last_teardown: None,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn view_state(&self) -> ViewState {
        self.view.state()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.session.as_ref().and_then(Session::canvas)
    }

    pub fn load_status(&self) -> Option<&LoadStatus> {
        self.session.as_ref().map(Session::load_status)
    }

    pub fn last_teardown(&self) -> Option<TeardownReport> {
        self.last_teardown
    }

    pub fn resize_listeners(&self) -> usize {
        self.resize.len()
    }

    /// Creates a fresh session when the 3D view is showing and none is live.
    ///
    /// Nothing is mounted once the fade has begun: the run is over and the
    /// fallback swap still happens on schedule.
    pub fn mount(&mut self) -> Option<SessionToken> {
        if self.view.state() != ViewState::Showing3D {
            log::debug!("Not mounting in view state {:?}", self.view.state());
            return None;
        }

        if let Some(session) = &self.session {
            return Some(session.token);
        }

        let token = SessionToken(self.next_token);
        self.next_token += 1;

        let (session, request) =
            Session::bootstrap(token, self.config.clone(), self.viewport, &mut self.resize);
        self.session = Some(session);
        self.loader.request(request);

        Some(token)
    }

    pub fn unmount(&mut self) -> Option<TeardownReport> {
        let session = self.session.take()?;
        let report = session.teardown(&mut self.resize);
        self.last_teardown = Some(report);
        Some(report)
    }

    /// The "Start Animation" action.
    pub fn start_animation(&mut self) -> Option<ArmOutcome> {
        if self.view.state() != ViewState::Showing3D {
            return None;
        }

        let session = self.session.as_mut()?;
        let outcome = session.driver.arm();

        match outcome {
            ArmOutcome::Armed => log::info!("Animation armed in session {}", session.token),
            other => log::debug!("Start ignored: {:?}", other),
        }

        Some(outcome)
    }

    pub fn can_start(&self) -> bool {
        self.view.state() == ViewState::Showing3D
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.driver.run.can_arm())
    }

    pub fn retry_loads(&mut self) -> bool {
        let Some(request) = self.session.as_mut().and_then(Session::retry_loads) else {
            return false;
        };

        self.loader.request(request);
        true
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }

        self.viewport = viewport;

        if let Some(session) = &mut self.session {
            if self.resize.is_subscribed(session.token) {
                session.resize(viewport);
            }
        }
    }

    /// Applies every finished load whose session is still live; the rest are dropped.
    pub fn poll_assets(&mut self) {
        for result in self.loader.drain() {
            let Some(session) = self
                .session
                .as_mut()
                .filter(|session| session.token == result.token)
            else {
                log::debug!(
                    "Dropping {:?} load for stale session {}",
                    result.kind,
                    result.token
                );
                continue;
            };

            if let Some(next) = session.on_load_result(result) {
                self.loader.request(next);
            }
        }
    }

    /// One tick of the render loop at `now` seconds.
    pub fn frame(&mut self, now: f64) -> FrameOutcome {
        self.poll_assets();

        let mut transition = None;
        let driver = match &mut self.session {
            Some(session) => session.frame(now),
            None => DriverEvent::Inactive,
        };

        if driver == DriverEvent::Completed {
            transition = self.view.begin_fade(now);
            log::info!("Connection complete, fading out");
        }

        if let Some(swap) = self.view.tick(now) {
            transition = Some(swap);
            log::info!("Swapping to the fallback surface");
            self.unmount();
        }

        let reschedule = self.view.state() == ViewState::FadingOut
            || self
                .session
                .as_ref()
                .is_some_and(|session| session.render_loop().is_active());

        FrameOutcome {
            view: self.view.state(),
            overlay_opacity: self.view.overlay_opacity(now),
            driver,
            transition,
            reschedule,
        }
    }

    /// Pumps `poll_assets` until every issued load has been delivered.
    #[cfg(test)]
    fn wait_for_loads(&mut self) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);

        while self.loader.in_flight() > 0 {
            assert!(
                std::time::Instant::now() < deadline,
                "asset load timed out"
            );
            self.poll_assets();
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::assets::testing::RecordingSource;

    const SOCKET: &str = "models/soket/scene.gltf";
    const PLUG: &str = "models/plug2/PLUGmy_custom_3d_model.gltf";

    fn host() -> (Host, Arc<RecordingSource>) {
        let source = Arc::new(RecordingSource::default());
        let host = Host::new(
            SceneConfig::default(),
            source.clone(),
            Viewport::new(1920, 1080),
        );
        (host, source)
    }

    fn x_of(host: &Host, pick: fn(&Session) -> Option<crate::scene_graph::ObjectId>) -> f32 {
        let session = host.session().unwrap();
        let id = pick(session).unwrap();
        session
            .scene
            .get_object_transform(id)
            .unwrap()
            .translation()
            .x
    }

    #[test]
    fn loads_socket_before_plug() {
        let (mut host, source) = host();
        host.mount();
        host.wait_for_loads();

        assert_eq!(
            source.requested(),
            [PathBuf::from(SOCKET), PathBuf::from(PLUG)]
        );
        let session = host.session().unwrap();
        assert!(session.socket().is_some() && session.plug().is_some());
        assert!(matches!(host.load_status(), Some(LoadStatus::Ready)));
    }

    #[test]
    fn failed_socket_never_requests_plug_until_retried() {
        let (mut host, source) = host();
        source.fail(SOCKET);
        host.mount();
        host.wait_for_loads();

        assert_eq!(source.requested(), [PathBuf::from(SOCKET)]);
        assert!(host.load_status().unwrap().is_failed());

        source.heal();
        assert!(host.retry_loads());
        host.wait_for_loads();

        assert_eq!(
            source.requested(),
            [
                PathBuf::from(SOCKET),
                PathBuf::from(SOCKET),
                PathBuf::from(PLUG)
            ]
        );
        assert!(matches!(host.load_status(), Some(LoadStatus::Ready)));
    }

    #[test]
    fn full_run_fades_then_swaps_and_releases_the_session() {
        let (mut host, _) = host();
        host.mount();
        host.wait_for_loads();

        assert_eq!(host.start_animation(), Some(ArmOutcome::Armed));

        let mut fades = 0;
        for now in [0.0, 0.5, 1.0, 1.5, 2.0, 2.5] {
            let outcome = host.frame(now);
            if outcome.transition == Some(ViewTransition::FadeStarted) {
                assert_eq!(now, 2.0);
                fades += 1;
            }
            assert!(outcome.reschedule);
        }
        assert_eq!(fades, 1);
        assert_eq!(host.view_state(), ViewState::FadingOut);
        assert!(!host.can_start());
        assert_eq!(x_of(&host, Session::socket), 120.0);
        assert_eq!(x_of(&host, Session::plug), -26.2 + 11.4);

        let outcome = host.frame(3.49);
        assert_eq!(outcome.view, ViewState::FadingOut);
        assert!(host.session().is_some());

        let outcome = host.frame(3.5);
        assert_eq!(outcome.transition, Some(ViewTransition::SwappedToFallback));
        assert_eq!(outcome.view, ViewState::ShowingFallback);
        assert!(!outcome.reschedule);
        assert_eq!(outcome.overlay_opacity, 1.0);

        assert!(host.session().is_none());
        assert!(host.canvas().is_none());
        assert_eq!(host.resize_listeners(), 0);
        assert!(host.last_teardown().unwrap().is_complete());

        assert_eq!(host.mount(), None);
        assert_eq!(host.start_animation(), None);
    }

    #[test]
    fn start_is_refused_while_running() {
        let (mut host, _) = host();
        host.mount();
        host.wait_for_loads();

        host.start_animation();
        host.frame(0.0);
        host.frame(1.0);
        let before = x_of(&host, Session::socket);

        assert_eq!(host.start_animation(), Some(ArmOutcome::AlreadyRunning));
        assert!(!host.can_start());

        host.frame(1.0);
        assert_eq!(x_of(&host, Session::socket), before);
        assert_eq!(host.session().unwrap().driver.run.start_time, Some(0.0));
    }

    #[test]
    fn arming_before_assets_arrive_has_no_effect_until_loaded() {
        let (mut host, _) = host();
        host.mount();

        assert_eq!(host.start_animation(), Some(ArmOutcome::Armed));
        let outcome = host.frame(0.0);
        if host.session().unwrap().plug().is_none() {
            assert_eq!(outcome.driver, DriverEvent::Inactive);
        }

        host.wait_for_loads();
        let outcome = host.frame(10.0);
        assert_eq!(
            outcome.driver,
            DriverEvent::Advanced { t: 0.0, eased: 0.0 }
        );
        let outcome = host.frame(12.0);
        assert_eq!(outcome.driver, DriverEvent::Completed);
    }

    #[test]
    fn unmount_while_loading_drops_late_results() {
        let (mut host, source) = host();
        host.mount();
        let report = host.unmount().unwrap();
        assert!(report.is_complete());

        // The socket load lands after the session is gone.
        host.wait_for_loads();
        host.frame(1.0);

        assert!(host.session().is_none());
        assert_eq!(source.requested(), [PathBuf::from(SOCKET)]);
    }

    #[test]
    fn stale_results_do_not_reach_a_newer_session() {
        let (mut host, source) = host();
        host.mount();
        host.unmount();
        let token = host.mount().unwrap();
        assert_eq!(token, SessionToken(2));

        // Both socket loads finish; the first one belongs to the torn-down session.
        host.wait_for_loads();

        let session = host.session().unwrap();
        assert_eq!(session.token, SessionToken(2));
        assert_eq!(session.scene.objects.iter().count(), 4);
        assert!(session.socket().is_some() && session.plug().is_some());
        assert!(matches!(host.load_status(), Some(LoadStatus::Ready)));
        assert_eq!(
            source.requested(),
            [
                PathBuf::from(SOCKET),
                PathBuf::from(SOCKET),
                PathBuf::from(PLUG)
            ]
        );
        assert_eq!(host.resize_listeners(), 1);
    }

    #[test]
    fn resuming_mid_fade_does_not_remount() {
        let (mut host, source) = host();
        host.mount();
        host.wait_for_loads();
        host.start_animation();
        host.frame(0.0);
        host.frame(2.0);
        assert_eq!(host.view_state(), ViewState::FadingOut);

        host.unmount();
        assert_eq!(host.mount(), None);
        assert!(!host.can_start());

        let outcome = host.frame(2.5);
        assert_eq!(outcome.view, ViewState::FadingOut);
        assert!(outcome.reschedule);
        assert!(host.session().is_none());

        let outcome = host.frame(3.5);
        assert_eq!(outcome.transition, Some(ViewTransition::SwappedToFallback));
        assert!(!outcome.reschedule);
        assert_eq!(source.requested().len(), 2);
    }

    #[test]
    fn resize_reaches_the_live_session_without_touching_the_run() {
        let (mut host, _) = host();
        host.mount();
        host.wait_for_loads();
        host.start_animation();
        host.frame(0.0);
        host.frame(0.5);
        let run = host.session().unwrap().driver.run;

        host.resize(Viewport::new(1024, 768));

        let session = host.session().unwrap();
        assert!((session.camera.aspect - 1024.0 / 768.0).abs() < 1e-6);
        assert_eq!(session.canvas().unwrap().size, Viewport::new(1024, 768));
        assert_eq!(session.driver.run, run);
    }

    #[test]
    fn repeated_mounts_do_not_leak_listeners() {
        let (mut host, _) = host();
        for _ in 0..5 {
            host.mount();
            host.unmount();
        }
        assert_eq!(host.resize_listeners(), 0);
    }
}
