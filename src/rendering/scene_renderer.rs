use std::collections::HashMap;

use crate::{
    rendering::{instance::Instance, render_model::RenderModel, texture::DepthTexture},
    scene_graph::{Scene, SceneModelId},
    session::{Canvas, SessionToken, Viewport},
};

/// GPU side of one session's canvas. Dropped when the session detaches its canvas.
pub struct SceneRenderer {
    token: SessionToken,
    depth_texture: DepthTexture,
    render_models: HashMap<SceneModelId, RenderModel>,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, canvas: &Canvas) -> Self {
        log::info!(
            "Attaching canvas for session {} ({}x{})",
            canvas.token,
            canvas.size.width,
            canvas.size.height
        );

        Self {
            token: canvas.token,
            depth_texture: DepthTexture::new(device, canvas.size, "Depth Texture"),
            render_models: HashMap::new(),
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: Viewport) {
        self.depth_texture.resize(device, size);
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        self.depth_texture.view()
    }

    /// Uploads models that appeared since the last frame and gathers this frame's instances.
    pub fn prepare(&mut self, device: &wgpu::Device, scene: &Scene) {
        for (model_id, scene_model) in scene.models.iter() {
            self.render_models.entry(model_id).or_insert_with(|| {
                log::debug!(
                    "Uploading model {} with {} primitives",
                    scene_model.model.name,
                    scene_model.model.primitives.len()
                );
                RenderModel::from_model(device, &scene_model.model)
            });
        }

        for render_model in self.render_models.values_mut() {
            render_model.instances.clear();
        }

        for (model_id, object) in scene.drawables() {
            if let Some(render_model) = self.render_models.get_mut(&model_id) {
                render_model.instances.add(Instance {
                    model: *object.transform.get_world_matrix(),
                    normal: *object.transform.get_inverse_transpose_world_matrix(),
                });
            }
        }
    }

    pub fn draw(&self, queue: &wgpu::Queue, render_pass: &mut wgpu::RenderPass<'_>) {
        for render_model in self.render_models.values() {
            render_model.draw(queue, render_pass);
        }
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        log::info!("Detached canvas for session {}", self.token);
    }
}
