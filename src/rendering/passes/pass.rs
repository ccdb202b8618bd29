use anyhow::Context;
use pollster::block_on;
use wgpu::RenderPass;

use crate::rendering::render_common::RenderCommon;

#[derive(Debug, Clone)]
pub(crate) struct ShaderDefinition {
    pub name: &'static str,
    pub source: &'static str,
}

pub(crate) trait Pass {
    type TextureViews;

    fn create(device: &wgpu::Device, common: &RenderCommon) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn render<'a, F>(
        &self,
        texture_views: &Self::TextureViews,
        encoder: &mut wgpu::CommandEncoder,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a;
}

/// Builds a pipeline from WGSL source, turning validation errors into `Err`.
pub(crate) fn compile_pipeline<F>(
    device: &wgpu::Device,
    shader_def: &ShaderDefinition,
    build: F,
) -> anyhow::Result<wgpu::RenderPipeline>
where
    F: FnOnce(&wgpu::ShaderModule) -> wgpu::RenderPipeline,
{
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader_def.name),
        source: wgpu::ShaderSource::Wgsl(shader_def.source.into()),
    });
    let pipeline = build(&shader);

    device
        .poll(wgpu::PollType::Wait)
        .context("Failed to poll device after shader compilation.")?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(anyhow::anyhow!(
            "Shader compilation failed for {}: {}",
            shader_def.name,
            error
        ));
    }

    Ok(pipeline)
}
