//! Shader program
//!
//! Group 0 holds the fragment uniform record (dynamic offset) and the
//! viewport size; group 1 holds the paint texture and its sampler.

use std::borrow::Cow;
use std::num::NonZeroU64;
use std::sync::Arc;

use stencilvg::uniforms::FRAG_UNIFORMS_SIZE;
use stencilvg::{ProgramError, ShaderProgram};

use crate::shader::shader_source;

const VIEW_UNIFORM_SIZE: u64 = 16;

pub struct WgpuProgram {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    module: Option<wgpu::ShaderModule>,
    view_buffer: Option<wgpu::Buffer>,
    pipeline_layout: Option<wgpu::PipelineLayout>,
    texture_unit: u32,
    active: bool,
}

impl WgpuProgram {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stencilvg uniforms layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(FRAG_UNIFORMS_SIZE as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(VIEW_UNIFORM_SIZE),
                    },
                    count: None,
                },
            ],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stencilvg texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            device,
            queue,
            uniform_layout,
            texture_layout,
            module: None,
            view_buffer: None,
            pipeline_layout: None,
            texture_unit: 0,
            active: false,
        }
    }

    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    /// Layout every image bind group is created against
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn module(&self) -> Option<&wgpu::ShaderModule> {
        self.module.as_ref()
    }

    pub fn view_buffer(&self) -> Option<&wgpu::Buffer> {
        self.view_buffer.as_ref()
    }

    pub fn pipeline_layout(&self) -> Option<&wgpu::PipelineLayout> {
        self.pipeline_layout.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl ShaderProgram for WgpuProgram {
    fn compile(&mut self, antialias: bool) -> Result<(), ProgramError> {
        let source = shader_source(antialias);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(if antialias {
                "stencilvg shader (edge aa)"
            } else {
                "stencilvg shader"
            }),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ProgramError::Compile {
                stage: "wgsl",
                log: err.to_string(),
            });
        }

        self.module = Some(module);
        Ok(())
    }

    fn resolve_uniform_locations(&mut self) {
        self.view_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencilvg viewport"),
            size: VIEW_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    fn bind_uniform_block(&mut self) {
        self.pipeline_layout = Some(self.device.create_pipeline_layout(
            &wgpu::PipelineLayoutDescriptor {
                label: Some("stencilvg pipeline layout"),
                bind_group_layouts: &[&self.uniform_layout, &self.texture_layout],
                push_constant_ranges: &[],
            },
        ));
    }

    fn use_program(&mut self) {
        self.active = true;
    }

    fn set_texture_unit_and_view_size(&mut self, unit: u32, view: [f32; 2]) {
        if unit != self.texture_unit {
            tracing::warn!("texture unit {} requested, images are always bound to unit 0", unit);
        }
        if let Some(buffer) = &self.view_buffer {
            let data = [view[0], view[1], 0.0, 0.0];
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&data));
        }
    }

    fn release(&mut self) {
        self.active = false;
    }
}
