use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    assets::GltfSource,
    config::SceneConfig,
    host::Host,
    rendering::renderer::Renderer,
    session::Viewport,
    ui,
    view::ViewState,
};

const WINDOW_TITLE: &str = "plugout";
const PIXELS_PER_LINE: f32 = 40.0;

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    renderer: Option<Renderer>,
    host: Host,
    imgui: Option<ImguiState>,
    clock: Instant,
    last_frame: Instant,
}

impl App {
    fn from_host(host: Host) -> Self {
        let now = Instant::now();

        Self {
            renderer: None,
            host,
            imgui: None,
            clock: now,
            last_frame: now,
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        self.imgui = Some(ImguiState { context, platform });
    }

    fn create_renderer(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes().with_title(WINDOW_TITLE);
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;
        self.setup_imgui(&window);

        let imgui = self.imgui.as_mut().context("Imgui was not initialized")?;
        let renderer = pollster::block_on(Renderer::new(Arc::new(window), &mut imgui.context))?;
        self.renderer = Some(renderer);

        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(renderer), Some(imgui)) = (self.renderer.as_mut(), self.imgui.as_mut()) else {
            return;
        };

        let now = Instant::now();
        imgui
            .context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        let outcome = self.host.frame(self.clock.elapsed().as_secs_f64());
        renderer.sync_canvas(self.host.canvas());

        if let Err(error) = imgui
            .platform
            .prepare_frame(imgui.context.io_mut(), &renderer.window)
        {
            log::error!("Failed to prepare imgui frame: {}", error);
            return;
        }

        let frame = imgui.context.new_frame();
        ui::draw(frame, &mut self.host);
        imgui.platform.prepare_render(frame, &renderer.window);

        match renderer.render(&self.host, &outcome, &mut imgui.context) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        // The fallback surface only redraws on input; the scene keeps its loop going.
        if outcome.reschedule || outcome.transition.is_some() {
            renderer.window.request_redraw();
        }
    }

    fn wants_mouse(&self) -> bool {
        self.imgui
            .as_ref()
            .is_some_and(|imgui| imgui.context.io().want_capture_mouse)
    }

    fn forward_to_controls(&mut self, event: &WindowEvent) {
        if self.wants_mouse() {
            return;
        }

        let Some(session) = self.host.session_mut() else {
            return;
        };

        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                session
                    .controls
                    .handle_button(*state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                session
                    .controls
                    .handle_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                session.controls.handle_scroll(lines);
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() {
            if let Err(error) = self.create_renderer(event_loop) {
                log::error!("Failed to initialize renderer: {:?}", error);
                event_loop.exit();
                return;
            }
        }

        let Some(renderer) = self.renderer.as_ref() else {
            return;
        };

        if let Some(report) = self.host.last_teardown() {
            log::debug!("Remounting after teardown: {:?}", report);
        }

        self.host.resize(Viewport::from(renderer.size));
        if let Some(token) = self.host.mount() {
            log::info!(
                "Mounted session {} ({} resize listeners)",
                token,
                self.host.resize_listeners()
            );
        }
        renderer.window.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.host.unmount();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                if let Some(report) = self.host.unmount() {
                    log::debug!("Teardown on close: {:?}", report);
                }
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(*new_size);
                }
                self.host.resize(Viewport::from(*new_size));
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::MouseInput { .. }
            | WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseWheel { .. } => {
                self.forward_to_controls(&event);
            }
            _ => (),
        }

        let (Some(renderer), Some(imgui)) = (self.renderer.as_ref(), self.imgui.as_mut()) else {
            return;
        };

        let is_redraw = matches!(event, WindowEvent::RedrawRequested);
        imgui.platform.handle_event::<()>(
            imgui.context.io_mut(),
            &renderer.window,
            &Event::WindowEvent { window_id, event },
        );

        if !is_redraw && self.host.view_state() == ViewState::ShowingFallback {
            renderer.window.request_redraw();
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    let config = SceneConfig::from_env();
    log::info!("Loading assets from {}", config.asset_dir.display());
    let source = Arc::new(GltfSource::new(config.asset_dir.clone()));
    let host = Host::new(config, source, Viewport::new(1, 1));

    let mut app = App::from_host(host);
    event_loop.run_app(&mut app)?;

    Ok(())
}
