//! Stencil path rasterizer
//!
//! Executes a frame's draw list against a [`RenderDevice`]. Fills resolve
//! the nonzero winding rule in the stencil buffer: a first pass counts
//! windings with front faces incrementing and back faces decrementing, the
//! fringe is drawn where the count is zero, and a covering quad composites
//! every pixel with a nonzero count while resetting the stencil to zero.
//!
//! Redundant texture, stencil mask, stencil func and blend changes are
//! filtered through a state cache that is reset at the start of every
//! render.

use crate::blend::BlendFunc;
use crate::config::RendererConfig;
use crate::device::{CompareFunc, Primitive, RenderDevice, ShaderProgram, StencilFace, StencilOp};
use crate::frame::{CallKind, DrawCall, DrawData};
use crate::texture::{DeviceTexture, TextureId, TextureRegistry};
use crate::uniforms::FRAG_UNIFORMS_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StencilFuncState {
    func: CompareFunc,
    reference: i32,
    mask: u32,
}

const STENCIL_FUNC_RESET: StencilFuncState = StencilFuncState {
    func: CompareFunc::Always,
    reference: 0,
    mask: 0xffff_ffff,
};

/// Rasterizer options and cached device state
#[derive(Debug)]
pub struct Rasterizer {
    antialias: bool,
    stencil_strokes: bool,
    debug: bool,
    bound_texture: TextureId,
    stencil_mask: u32,
    stencil_func: StencilFuncState,
    blend: Option<BlendFunc>,
}

impl Rasterizer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            antialias: config.antialias,
            stencil_strokes: config.stencil_strokes,
            debug: config.debug,
            bound_texture: TextureId::NONE,
            stencil_mask: 0xffff_ffff,
            stencil_func: STENCIL_FUNC_RESET,
            blend: None,
        }
    }

    /// Render every call in `data`. Empty draw data issues no device
    /// commands.
    pub fn render<D, P, X>(&mut self, device: &mut D, program: &mut P, textures: &TextureRegistry<X>, data: &DrawData<'_>)
    where
        D: RenderDevice,
        P: ShaderProgram,
        X: DeviceTexture,
    {
        if data.is_empty() {
            return;
        }
        tracing::trace!(
            "render: calls={}, vertices={}, uniform_bytes={}",
            data.calls.len(),
            data.vertices.len(),
            data.uniforms.len()
        );

        program.use_program();
        device.set_culling(true);
        device.set_blending(true);
        device.set_depth_test(false);
        device.set_scissor_test(false);
        device.set_color_mask(true);
        device.set_stencil_mask(0xffff_ffff);
        device.set_stencil_op(StencilFace::FrontAndBack, StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        device.set_stencil_func(CompareFunc::Always, 0, 0xffff_ffff);
        device.bind_texture(TextureId::NONE);

        self.bound_texture = TextureId::NONE;
        self.stencil_mask = 0xffff_ffff;
        self.stencil_func = STENCIL_FUNC_RESET;
        self.blend = None;

        device.upload_uniforms(data.uniforms);
        device.upload_vertices(data.vertices);
        device.bind_vertex_input();
        program.set_texture_unit_and_view_size(0, data.view);

        let mut pass = Pass {
            rasterizer: &mut *self,
            device: &mut *device,
            textures,
            data,
        };
        for call in data.calls {
            pass.blend_func(call.blend);
            match call.kind {
                CallKind::Fill => pass.fill(call),
                CallKind::ConvexFill => pass.convex_fill(call),
                CallKind::Stroke => pass.stroke(call),
                CallKind::Triangles => pass.triangles(call),
            }
        }

        device.unbind_vertex_input();
        device.set_culling(false);
        program.release();
        self.bind_texture(device, TextureId::NONE);
    }

    fn bind_texture<D: RenderDevice>(&mut self, device: &mut D, texture: TextureId) {
        if self.bound_texture != texture {
            self.bound_texture = texture;
            device.bind_texture(texture);
        }
    }
}

/// Borrowed state for one render
struct Pass<'r, 'a, D, X> {
    rasterizer: &'r mut Rasterizer,
    device: &'r mut D,
    textures: &'r TextureRegistry<X>,
    data: &'r DrawData<'a>,
}

impl<D: RenderDevice, X: DeviceTexture> Pass<'_, '_, D, X> {
    fn fill(&mut self, call: &DrawCall) {
        let stride = self.data.uniform_stride;

        self.device.set_stencil_test(true);
        self.stencil_mask(0xff);
        self.stencil_func(CompareFunc::Always, 0, 0xff);
        self.device.set_color_mask(false);

        self.bind_slot(call.uniform_offset, TextureId::NONE, "fill simple");

        self.device
            .set_stencil_op(StencilFace::Front, StencilOp::Keep, StencilOp::Keep, StencilOp::IncrWrap);
        self.device
            .set_stencil_op(StencilFace::Back, StencilOp::Keep, StencilOp::Keep, StencilOp::DecrWrap);
        self.device.set_culling(false);
        self.draw_fills(call);
        self.device.set_culling(true);

        self.device.set_color_mask(true);
        self.bind_slot(call.uniform_offset + stride, call.image, "fill fill");

        if self.rasterizer.antialias {
            self.stencil_func(CompareFunc::Equal, 0, 0xff);
            self.stencil_op(StencilOp::Keep);
            self.draw_strokes(call);
        }

        self.stencil_func(CompareFunc::NotEqual, 0, 0xff);
        self.stencil_op(StencilOp::Zero);
        self.device
            .draw_arrays(Primitive::TriangleStrip, call.triangle_offset, call.triangle_count);

        self.device.set_stencil_test(false);
    }

    fn convex_fill(&mut self, call: &DrawCall) {
        self.bind_slot(call.uniform_offset, call.image, "convex fill");

        let data = self.data;
        for path in data.call_paths(call) {
            self.device
                .draw_arrays(Primitive::TriangleFan, path.fill_offset, path.fill_count);
            if path.stroke_count > 0 {
                self.device
                    .draw_arrays(Primitive::TriangleStrip, path.stroke_offset, path.stroke_count);
            }
        }
    }

    fn stroke(&mut self, call: &DrawCall) {
        if !self.rasterizer.stencil_strokes {
            self.bind_slot(call.uniform_offset, call.image, "stroke fill");
            self.draw_strokes(call);
            return;
        }

        let stride = self.data.uniform_stride;
        self.device.set_stencil_test(true);
        self.stencil_mask(0xff);

        // base coverage without overlap
        self.stencil_func(CompareFunc::Equal, 0, 0xff);
        self.device
            .set_stencil_op(StencilFace::FrontAndBack, StencilOp::Keep, StencilOp::Keep, StencilOp::Incr);
        self.bind_slot(call.uniform_offset + stride, call.image, "stroke fill 0");
        self.draw_strokes(call);

        // anti-aliased fringe
        self.bind_slot(call.uniform_offset, call.image, "stroke fill 1");
        self.stencil_func(CompareFunc::Equal, 0, 0xff);
        self.stencil_op(StencilOp::Keep);
        self.draw_strokes(call);

        // clear stencil
        self.device.set_color_mask(false);
        self.stencil_func(CompareFunc::Always, 0, 0xff);
        self.stencil_op(StencilOp::Zero);
        self.draw_strokes(call);
        self.device.set_color_mask(true);

        self.device.set_stencil_test(false);
    }

    fn triangles(&mut self, call: &DrawCall) {
        self.bind_slot(call.uniform_offset, call.image, "triangles fill");
        self.device
            .draw_arrays(Primitive::Triangles, call.triangle_offset, call.triangle_count);
    }

    fn draw_fills(&mut self, call: &DrawCall) {
        let data = self.data;
        for path in data.call_paths(call) {
            self.device
                .draw_arrays(Primitive::TriangleFan, path.fill_offset, path.fill_count);
        }
    }

    fn draw_strokes(&mut self, call: &DrawCall) {
        let data = self.data;
        for path in data.call_paths(call) {
            self.device
                .draw_arrays(Primitive::TriangleStrip, path.stroke_offset, path.stroke_count);
        }
    }

    /// Bind the uniform slot at `offset` together with the texture for
    /// `image`, falling back to the registry's placeholder.
    fn bind_slot(&mut self, offset: usize, image: TextureId, label: &str) {
        self.device.bind_uniforms(offset, FRAG_UNIFORMS_SIZE);
        let texture = self.textures.resolve(image);
        self.rasterizer.bind_texture(&mut *self.device, texture);

        if self.rasterizer.debug {
            while let Some(err) = self.device.take_error() {
                tracing::warn!("device error after {}: {}", label, err);
            }
        }
    }

    fn stencil_mask(&mut self, mask: u32) {
        if self.rasterizer.stencil_mask != mask {
            self.rasterizer.stencil_mask = mask;
            self.device.set_stencil_mask(mask);
        }
    }

    fn stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let state = StencilFuncState { func, reference, mask };
        if self.rasterizer.stencil_func != state {
            self.rasterizer.stencil_func = state;
            self.device.set_stencil_func(func, reference, mask);
        }
    }

    fn stencil_op(&mut self, op: StencilOp) {
        self.device.set_stencil_op(StencilFace::FrontAndBack, op, op, op);
    }

    fn blend_func(&mut self, blend: BlendFunc) {
        if self.rasterizer.blend != Some(blend) {
            self.rasterizer.blend = Some(blend);
            self.device.set_blend_func(blend);
        }
    }
}
