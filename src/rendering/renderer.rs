use std::sync::Arc;

use anyhow::Context;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    host::{FrameOutcome, Host},
    rendering::{
        ui_layer::{FrameBase, UiLayer},
        passes::{
            overlay_pass::{OverlayPass, OverlayTextureViews},
            pass::Pass,
            scene_pass::{ScenePass, SceneTextureViews},
        },
        render_common::RenderCommon,
        scene_renderer::SceneRenderer,
    },
    session::Canvas,
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: RenderCommon,
    scene_pass: ScenePass,
    overlay_pass: OverlayPass,
    ui_layer: UiLayer,

    scene_renderer: Option<SceneRenderer>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, imgui: &mut imgui::Context) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let common = RenderCommon::new(&device, surface_format);
        let scene_pass = ScenePass::create(&device, &common)?;
        let overlay_pass = OverlayPass::create(&device, &common)?;
        let ui_layer = UiLayer::new(&device, &queue, surface_format, imgui);

        Ok(Self {
            window,
            size,
            surface,
            surface_config,
            device,
            queue,
            common,
            scene_pass,
            overlay_pass,
            ui_layer,
            scene_renderer: None,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    /// Follows the live session's canvas: attach on mount, resize with it, drop on teardown.
    pub fn sync_canvas(&mut self, canvas: Option<&Canvas>) {
        match (canvas, &mut self.scene_renderer) {
            (Some(canvas), Some(scene_renderer)) if scene_renderer.token() == canvas.token => {
                scene_renderer.resize(&self.device, canvas.size);
            }
            (Some(canvas), _) => {
                self.scene_renderer = Some(SceneRenderer::new(&self.device, canvas));
            }
            (None, _) => {
                self.scene_renderer = None;
            }
        }
    }

    pub fn render(
        &mut self,
        host: &Host,
        outcome: &FrameOutcome,
        imgui: &mut imgui::Context,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let base = match (host.session(), &mut self.scene_renderer) {
            (Some(session), Some(scene_renderer)) => {
                scene_renderer.prepare(&self.device, &session.scene);
                self.common
                    .update(&self.queue, &session.camera, &session.lights);

                let queue = &self.queue;
                let scene_renderer = &*scene_renderer;
                self.scene_pass.render(
                    &SceneTextureViews {
                        color: view.clone(),
                        depth: scene_renderer.depth_view().clone(),
                    },
                    &mut encoder,
                    |render_pass| scene_renderer.draw(queue, render_pass),
                );

                if outcome.overlay_opacity > 0.0 {
                    self.overlay_pass
                        .set_opacity(&self.queue, outcome.overlay_opacity);
                    self.overlay_pass.render(
                        &OverlayTextureViews {
                            color: view.clone(),
                        },
                        &mut encoder,
                        |render_pass| render_pass.draw(0..3, 0..1),
                    );
                }

                FrameBase::Scene
            }
            _ => FrameBase::without_scene(outcome.view),
        };

        self.ui_layer.render(
            &view,
            base,
            imgui,
            &self.device,
            &self.queue,
            &mut encoder,
        );

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}
