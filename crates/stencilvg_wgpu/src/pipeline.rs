//! Render pipeline keys
//!
//! wgpu bakes culling, blending, color writes, stencil tests and topology
//! into immutable pipelines. The device records the GL-style state in effect
//! at each draw as a [`PipelineKey`], and pipelines are created on first use
//! and cached by key.

use stencilvg::{BlendFactor, BlendFunc, CompareFunc, Primitive, StencilOp};

/// Primitive topology after triangle fans are expanded to indexed lists
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    List,
    Strip,
}

impl Topology {
    pub fn for_primitive(primitive: Primitive) -> Self {
        match primitive {
            Primitive::TriangleStrip => Topology::Strip,
            Primitive::TriangleFan | Primitive::Triangles => Topology::List,
        }
    }
}

/// Stencil operations for one face
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceOps {
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for FaceOps {
    fn default() -> Self {
        Self {
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// Enabled stencil test state. The reference value is dynamic and not part
/// of the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilKey {
    pub compare: CompareFunc,
    pub front: FaceOps,
    pub back: FaceOps,
    pub read_mask: u32,
    pub write_mask: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub topology: Topology,
    pub cull_back: bool,
    pub color_write: bool,
    /// `None` when blending is disabled
    pub blend: Option<BlendFunc>,
    /// `None` when the stencil test is disabled
    pub stencil: Option<StencilKey>,
}

pub fn compare_function(func: CompareFunc) -> wgpu::CompareFunction {
    match func {
        CompareFunc::Never => wgpu::CompareFunction::Never,
        CompareFunc::Always => wgpu::CompareFunction::Always,
        CompareFunc::Equal => wgpu::CompareFunction::Equal,
        CompareFunc::NotEqual => wgpu::CompareFunction::NotEqual,
    }
}

pub fn stencil_operation(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Incr => wgpu::StencilOperation::IncrementClamp,
        StencilOp::IncrWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

pub fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcAlphaSaturate => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

pub fn blend_state(blend: &BlendFunc) -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: blend_factor(blend.src_rgb),
            dst_factor: blend_factor(blend.dst_rgb),
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: blend_factor(blend.src_alpha),
            dst_factor: blend_factor(blend.dst_alpha),
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn face_state(compare: CompareFunc, ops: &FaceOps) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: compare_function(compare),
        fail_op: stencil_operation(ops.fail),
        depth_fail_op: stencil_operation(ops.depth_fail),
        pass_op: stencil_operation(ops.pass),
    }
}

/// Stencil state for a key; a disabled test passes everything and writes nothing.
pub fn stencil_state(stencil: Option<&StencilKey>) -> wgpu::StencilState {
    match stencil {
        Some(s) => wgpu::StencilState {
            front: face_state(s.compare, &s.front),
            back: face_state(s.compare, &s.back),
            read_mask: s.read_mask,
            write_mask: s.write_mask,
        },
        None => wgpu::StencilState {
            front: wgpu::StencilFaceState::IGNORE,
            back: wgpu::StencilFaceState::IGNORE,
            read_mask: 0,
            write_mask: 0,
        },
    }
}

/// Index list turning the fan `first..first + count` into triangles
pub fn fan_indices(first: u32, count: u32, out: &mut Vec<u32>) {
    for i in 1..count.saturating_sub(1) {
        out.extend_from_slice(&[first, first + i, first + i + 1]);
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 8,
        shader_location: 1,
    },
];

pub(crate) struct PipelineTargets<'a> {
    pub layout: &'a wgpu::PipelineLayout,
    pub module: &'a wgpu::ShaderModule,
    pub color_format: wgpu::TextureFormat,
    pub stencil_format: wgpu::TextureFormat,
}

pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    targets: &PipelineTargets<'_>,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    tracing::debug!("creating pipeline {:?}", key);

    let color_targets = [Some(wgpu::ColorTargetState {
        format: targets.color_format,
        blend: key.blend.as_ref().map(blend_state),
        write_mask: if key.color_write {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        },
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("stencilvg pipeline"),
        layout: Some(targets.layout),
        vertex: wgpu::VertexState {
            module: targets.module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<stencilvg::Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: targets.module,
            entry_point: Some("fs_main"),
            targets: &color_targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: match key.topology {
                Topology::List => wgpu::PrimitiveTopology::TriangleList,
                Topology::Strip => wgpu::PrimitiveTopology::TriangleStrip,
            },
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: key.cull_back.then_some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: targets.stencil_format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: stencil_state(key.stencil.as_ref()),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_expands_to_triangles() {
        let mut out = Vec::new();
        fan_indices(10, 5, &mut out);
        assert_eq!(out, vec![10, 11, 12, 10, 12, 13, 10, 13, 14]);
    }

    #[test]
    fn short_fans_produce_nothing() {
        let mut out = Vec::new();
        fan_indices(0, 2, &mut out);
        fan_indices(0, 0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn disabled_stencil_writes_nothing() {
        let state = stencil_state(None);
        assert_eq!(state.write_mask, 0);
        assert_eq!(state.front, wgpu::StencilFaceState::IGNORE);
    }

    #[test]
    fn fill_stencil_pass_maps_wrapping_ops() {
        let key = StencilKey {
            compare: CompareFunc::Always,
            front: FaceOps {
                pass: StencilOp::IncrWrap,
                ..Default::default()
            },
            back: FaceOps {
                pass: StencilOp::DecrWrap,
                ..Default::default()
            },
            read_mask: 0xff,
            write_mask: 0xff,
        };
        let state = stencil_state(Some(&key));
        assert_eq!(state.front.pass_op, wgpu::StencilOperation::IncrementWrap);
        assert_eq!(state.back.pass_op, wgpu::StencilOperation::DecrementWrap);
        assert_eq!(state.front.compare, wgpu::CompareFunction::Always);
        assert_eq!(state.read_mask, 0xff);
    }

    #[test]
    fn premultiplied_over_blend() {
        let state = blend_state(&BlendFunc::PREMULTIPLIED_OVER);
        assert_eq!(state, wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING);
    }

    #[test]
    fn incr_clamps() {
        assert_eq!(
            stencil_operation(StencilOp::Incr),
            wgpu::StencilOperation::IncrementClamp
        );
    }

    #[test]
    fn keys_differ_by_state() {
        let base = PipelineKey {
            topology: Topology::List,
            cull_back: true,
            color_write: true,
            blend: Some(BlendFunc::PREMULTIPLIED_OVER),
            stencil: None,
        };
        let no_color = PipelineKey {
            color_write: false,
            ..base
        };
        assert_ne!(base, no_color);
        assert_eq!(Topology::for_primitive(Primitive::TriangleFan), Topology::List);
        assert_eq!(Topology::for_primitive(Primitive::TriangleStrip), Topology::Strip);
    }
}
