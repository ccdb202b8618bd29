use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform},
    lights::{Lights, LightsUniform},
};

/// Resources shared by every pass for the lifetime of the window.
pub struct RenderCommon {
    pub surface_format: wgpu::TextureFormat,
    pub frame_bind_group_layout: wgpu::BindGroupLayout,
    pub frame_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    camera_uniform: CameraUniform,
    lights_uniform: LightsUniform,
}

impl RenderCommon {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let camera_uniform = CameraUniform::default();
        let lights_uniform = LightsUniform::default();

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Uniform Buffer"),
            contents: bytemuck::cast_slice(&[lights_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame uniforms bind group layout"),
                entries: &[uniform_entry(0), uniform_entry(1)],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame uniforms bind group"),
            layout: &frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            surface_format,
            frame_bind_group_layout,
            frame_bind_group,
            camera_buffer,
            lights_buffer,
            camera_uniform,
            lights_uniform,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &Camera, lights: &Lights) {
        self.camera_uniform.update(camera);
        self.lights_uniform.update(lights);

        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        queue.write_buffer(
            &self.lights_buffer,
            0,
            bytemuck::cast_slice(&[self.lights_uniform]),
        );
    }
}
