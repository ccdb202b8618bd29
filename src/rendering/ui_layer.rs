use imgui_wgpu::RendererConfig;

use crate::view::ViewState;

/// What is already in the frame when the UI is composited on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameBase {
    /// The scene (and possibly the fade overlay) was drawn this frame.
    Scene,
    /// Nothing was drawn; the UI pass starts from a solid colour.
    Solid(wgpu::Color),
}

impl FrameBase {
    /// White once the fade has begun, so a frame without a scene never flashes dark.
    pub fn without_scene(view: ViewState) -> Self {
        match view {
            ViewState::Showing3D => FrameBase::Solid(wgpu::Color::BLACK),
            ViewState::FadingOut | ViewState::ShowingFallback => {
                FrameBase::Solid(wgpu::Color::WHITE)
            }
        }
    }

    fn load_op(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            FrameBase::Scene => wgpu::LoadOp::Load,
            FrameBase::Solid(color) => wgpu::LoadOp::Clear(color),
        }
    }
}

/// Last pass of every frame: the imgui widgets, and the background when there is no scene.
pub struct UiLayer {
    renderer: imgui_wgpu::Renderer,
}

impl UiLayer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_format: wgpu::TextureFormat,
        context: &mut imgui::Context,
    ) -> Self {
        let config = RendererConfig {
            texture_format,
            ..Default::default()
        };

        Self {
            renderer: imgui_wgpu::Renderer::new(context, device, queue, config),
        }
    }

    pub fn render(
        &mut self,
        view: &wgpu::TextureView,
        base: FrameBase,
        context: &mut imgui::Context,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("UI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: base.load_op(),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let draw_data = context.render();

        // imgui-wgpu crashes on empty draw data (imgui-rs#325); the clear above still applies.
        if draw_data.draw_lists_count() == 0 {
            return;
        }

        if let Err(error) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::error!("Rendering UI failed: {:?}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frames_clear_to_the_surface_the_view_is_heading_for() {
        assert_eq!(
            FrameBase::without_scene(ViewState::Showing3D),
            FrameBase::Solid(wgpu::Color::BLACK)
        );
        assert_eq!(
            FrameBase::without_scene(ViewState::FadingOut),
            FrameBase::Solid(wgpu::Color::WHITE)
        );
        assert_eq!(
            FrameBase::without_scene(ViewState::ShowingFallback),
            FrameBase::Solid(wgpu::Color::WHITE)
        );
    }

    #[test]
    fn scene_frames_keep_what_was_drawn() {
        assert_eq!(FrameBase::Scene.load_op(), wgpu::LoadOp::Load);
        assert_eq!(
            FrameBase::Solid(wgpu::Color::WHITE).load_op(),
            wgpu::LoadOp::Clear(wgpu::Color::WHITE)
        );
    }
}
