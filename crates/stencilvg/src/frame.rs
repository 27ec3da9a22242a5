//! Frame draw list
//!
//! A [`Frame`] accumulates fill, stroke and triangle submissions. Each
//! submission appends exactly one [`DrawCall`] or, when packing or
//! allocation fails, nothing at all. The finished frame is handed to the
//! rasterizer as a borrowed [`DrawData`] and then cleared.

use crate::arena::{GeometryArena, Pool, MIN_CALLS};
use crate::blend::{BlendFunc, CompositeOperationState};
use crate::config::RendererConfig;
use crate::geometry::{Bounds, PathSource, SubPath, Vertex};
use crate::paint::{Paint, Scissor};
use crate::texture::{TextureId, TextureLookup};
use crate::uniforms::{
    pack_paint, FragUniforms, ShaderMode, STROKE_THR_NEAR_OPAQUE, STROKE_THR_NONE,
};

/// How a draw call is rasterized
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Stencil winding pass, fringe pass, then a covering quad
    #[default]
    Fill,
    /// Single convex path drawn directly
    ConvexFill,
    Stroke,
    /// Flat triangle list
    Triangles,
}

/// One entry of the draw list.
///
/// `uniform_offset` is the byte offset of the first slot; calls with two
/// slots keep the second at `uniform_offset + stride`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawCall {
    pub kind: CallKind,
    pub image: TextureId,
    pub path_offset: usize,
    pub path_count: usize,
    pub triangle_offset: u32,
    pub triangle_count: u32,
    pub uniform_offset: usize,
    pub blend: BlendFunc,
}

/// Everything the rasterizer reads for one frame
#[derive(Clone, Copy, Debug)]
pub struct DrawData<'a> {
    pub view: [f32; 2],
    pub calls: &'a [DrawCall],
    pub uniforms: &'a [u8],
    pub vertices: &'a [Vertex],
    pub paths: &'a [SubPath],
    pub uniform_stride: usize,
}

impl DrawData<'_> {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Sub-paths referenced by `call`
    pub fn call_paths(&self, call: &DrawCall) -> &[SubPath] {
        &self.paths[call.path_offset..call.path_offset + call.path_count]
    }
}

/// Per-frame submission state
#[derive(Debug)]
pub struct Frame {
    view: [f32; 2],
    calls: Pool<DrawCall>,
    arena: GeometryArena,
    stencil_strokes: bool,
}

impl Frame {
    pub fn new(config: &RendererConfig, uniform_stride: usize) -> Self {
        Self {
            view: [0.0, 0.0],
            calls: Pool::new(1, MIN_CALLS, config.limits.clamped(uniform_stride).max_calls),
            arena: GeometryArena::new(config.limits, uniform_stride),
            stencil_strokes: config.stencil_strokes,
        }
    }

    /// Set the logical view size. The device pixel ratio is accepted for
    /// API symmetry and not used.
    pub fn set_viewport(&mut self, width: f32, height: f32, _device_pixel_ratio: f32) {
        self.view = [width, height];
    }

    pub fn view(&self) -> [f32; 2] {
        self.view
    }

    pub fn calls(&self) -> &[DrawCall] {
        self.calls.as_slice()
    }

    pub fn arena(&self) -> &GeometryArena {
        &self.arena
    }

    pub fn is_empty(&self) -> bool {
        self.calls.len() == 0
    }

    /// Reallocations of the draw-call list since creation
    pub fn call_reallocations(&self) -> usize {
        self.calls.reallocations()
    }

    pub fn draw_data(&self) -> DrawData<'_> {
        DrawData {
            view: self.view,
            calls: self.calls.as_slice(),
            uniforms: self.arena.uniform_bytes(),
            vertices: self.arena.vertices(),
            paths: self.arena.paths(),
            uniform_stride: self.arena.uniform_stride(),
        }
    }

    /// Drop every submission without rendering
    pub fn cancel(&mut self) {
        tracing::trace!("cancel frame with {} calls", self.calls.len());
        self.clear();
    }

    /// Reset lengths after a render, keeping capacity
    pub fn clear(&mut self) {
        self.calls.clear();
        self.arena.clear();
    }

    /// Submit a filled path set.
    ///
    /// A single convex path becomes a [`CallKind::ConvexFill`]; anything
    /// else is a [`CallKind::Fill`] with a covering quad over `bounds`.
    /// Returns whether a call was appended.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_fill<T: TextureLookup + ?Sized>(
        &mut self,
        textures: &T,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        bounds: Bounds,
        paths: &[PathSource<'_>],
    ) -> bool {
        let kind = if paths.len() == 1 && paths[0].convex {
            CallKind::ConvexFill
        } else {
            CallKind::Fill
        };
        let quad_len = if kind == CallKind::Fill { 4 } else { 0 };
        let max_verts = paths
            .iter()
            .map(|p| p.fill.len() + p.stroke.len())
            .sum::<usize>()
            + quad_len;

        self.build_call("fill", |frame, call| {
            call.kind = kind;
            call.triangle_count = quad_len as u32;
            call.image = paint.image;
            call.blend = composite.resolve();

            call.path_offset = frame.arena.alloc_paths(paths.len())?;
            call.path_count = paths.len();
            let mut offset = frame.arena.alloc_vertices(max_verts)?;
            frame.copy_paths(call.path_offset, &mut offset, paths, true);

            if kind == CallKind::Fill {
                call.triangle_offset = offset as u32;
                frame.arena.write_vertices(offset, &bounds.quad());

                call.uniform_offset = frame.arena.alloc_uniform_slots(2)?;
                let stride = frame.arena.uniform_stride();
                let frag = frame.pack(textures, paint, scissor, fringe, fringe, STROKE_THR_NONE)?;
                frame.arena.write_uniforms(call.uniform_offset, &FragUniforms::stencil_only());
                frame.arena.write_uniforms(call.uniform_offset + stride, &frag);
            } else {
                call.uniform_offset = frame.arena.alloc_uniform_slots(1)?;
                let frag = frame.pack(textures, paint, scissor, fringe, fringe, STROKE_THR_NONE)?;
                frame.arena.write_uniforms(call.uniform_offset, &frag);
            }
            Some(())
        })
    }

    /// Submit stroked paths. Only the stroke ranges of `paths` are used.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_stroke<T: TextureLookup + ?Sized>(
        &mut self,
        textures: &T,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: &[PathSource<'_>],
    ) -> bool {
        let max_verts = paths.iter().map(|p| p.stroke.len()).sum::<usize>();
        let stencil_strokes = self.stencil_strokes;

        self.build_call("stroke", |frame, call| {
            call.kind = CallKind::Stroke;
            call.image = paint.image;
            call.blend = composite.resolve();

            call.path_offset = frame.arena.alloc_paths(paths.len())?;
            call.path_count = paths.len();
            let mut offset = frame.arena.alloc_vertices(max_verts)?;
            frame.copy_paths(call.path_offset, &mut offset, paths, false);

            if stencil_strokes {
                call.uniform_offset = frame.arena.alloc_uniform_slots(2)?;
                let stride = frame.arena.uniform_stride();
                let aa = frame.pack(textures, paint, scissor, stroke_width, fringe, STROKE_THR_NONE)?;
                let base = frame.pack(textures, paint, scissor, stroke_width, fringe, STROKE_THR_NEAR_OPAQUE)?;
                frame.arena.write_uniforms(call.uniform_offset, &aa);
                frame.arena.write_uniforms(call.uniform_offset + stride, &base);
            } else {
                call.uniform_offset = frame.arena.alloc_uniform_slots(1)?;
                let frag = frame.pack(textures, paint, scissor, stroke_width, fringe, STROKE_THR_NONE)?;
                frame.arena.write_uniforms(call.uniform_offset, &frag);
            }
            Some(())
        })
    }

    /// Submit a flat triangle list drawn with the paint's texture.
    pub fn submit_triangles<T: TextureLookup + ?Sized>(
        &mut self,
        textures: &T,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        vertices: &[Vertex],
        fringe: f32,
    ) -> bool {
        self.build_call("triangles", |frame, call| {
            call.kind = CallKind::Triangles;
            call.image = paint.image;
            call.blend = composite.resolve();

            let offset = frame.arena.alloc_vertices(vertices.len())?;
            call.triangle_offset = offset as u32;
            call.triangle_count = vertices.len() as u32;
            frame.arena.write_vertices(offset, vertices);

            call.uniform_offset = frame.arena.alloc_uniform_slots(1)?;
            let mut frag = frame.pack(textures, paint, scissor, 1.0, fringe, STROKE_THR_NONE)?;
            frag.set_shader_mode(ShaderMode::Image);
            frame.arena.write_uniforms(call.uniform_offset, &frag);
            Some(())
        })
    }

    /// Reserve a call, let `fill` populate it, and undo everything if it
    /// bails out.
    fn build_call<F>(&mut self, what: &str, fill: F) -> bool
    where
        F: FnOnce(&mut Frame, &mut DrawCall) -> Option<()>,
    {
        let Some(index) = self.calls.alloc(1) else {
            tracing::warn!("dropping {} call: draw list is full", what);
            return false;
        };
        let mark = self.arena.mark();
        let mut call = DrawCall::default();

        match fill(self, &mut call) {
            Some(()) => {
                self.calls.as_mut_slice()[index] = call;
                true
            }
            None => {
                tracing::warn!("dropping {} call", what);
                self.calls.truncate(index);
                self.arena.rollback(mark);
                false
            }
        }
    }

    /// Copy each path's vertices at `offset`, recording its ranges in the
    /// sub-path slots starting at `path_offset`. Fill vertices are skipped
    /// unless `with_fill` is set.
    fn copy_paths(&mut self, path_offset: usize, offset: &mut usize, paths: &[PathSource<'_>], with_fill: bool) {
        for (i, path) in paths.iter().enumerate() {
            let mut sub = SubPath::default();
            if with_fill && !path.fill.is_empty() {
                sub.fill_offset = *offset as u32;
                sub.fill_count = path.fill.len() as u32;
                self.arena.write_vertices(*offset, path.fill);
                *offset += path.fill.len();
            }
            if !path.stroke.is_empty() {
                sub.stroke_offset = *offset as u32;
                sub.stroke_count = path.stroke.len() as u32;
                self.arena.write_vertices(*offset, path.stroke);
                *offset += path.stroke.len();
            }
            self.arena.paths_mut()[path_offset + i] = sub;
        }
    }

    fn pack<T: TextureLookup + ?Sized>(
        &self,
        textures: &T,
        paint: &Paint,
        scissor: &Scissor,
        width: f32,
        fringe: f32,
        stroke_thr: f32,
    ) -> Option<FragUniforms> {
        match pack_paint(textures, paint, scissor, width, fringe, stroke_thr) {
            Ok(frag) => Some(frag),
            Err(e) => {
                tracing::warn!("paint packing failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;
    use crate::texture::TextureInfo;
    use rustc_hash::FxHashMap;

    fn frame() -> Frame {
        Frame::new(&RendererConfig::default(), 256)
    }

    fn textures() -> FxHashMap<TextureId, TextureInfo> {
        FxHashMap::default()
    }

    fn square() -> Vec<Vertex> {
        vec![
            Vertex::new(0.0, 0.0, 0.5, 1.0),
            Vertex::new(10.0, 0.0, 0.5, 1.0),
            Vertex::new(10.0, 10.0, 0.5, 1.0),
            Vertex::new(0.0, 10.0, 0.5, 1.0),
        ]
    }

    #[test]
    fn convex_path_skips_quad_and_second_slot() {
        let mut f = frame();
        let fill = square();
        let paths = [PathSource::new(&fill, &[], true)];
        assert!(f.submit_fill(
            &textures(),
            &Paint::color(Color::BLACK),
            CompositeOperationState::default(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            &paths,
        ));
        let call = f.calls()[0];
        assert_eq!(call.kind, CallKind::ConvexFill);
        assert_eq!(call.triangle_count, 0);
        assert_eq!(f.arena().uniform_slot_count(), 1);
        assert_eq!(f.arena().vertex_count(), 4);
    }

    #[test]
    fn fill_writes_quad_after_paths() {
        let mut f = frame();
        let fill = square();
        let fringe = [Vertex::new(0.0, 0.0, 0.0, 1.0); 6];
        let paths = [PathSource::new(&fill, &fringe, false)];
        assert!(f.submit_fill(
            &textures(),
            &Paint::color(Color::WHITE),
            CompositeOperationState::default(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 100.0, 50.0),
            &paths,
        ));
        let call = f.calls()[0];
        assert_eq!(call.kind, CallKind::Fill);
        assert_eq!(call.triangle_offset, 10);
        assert_eq!(call.triangle_count, 4);

        let sub = f.arena().paths()[0];
        assert_eq!((sub.fill_offset, sub.fill_count), (0, 4));
        assert_eq!((sub.stroke_offset, sub.stroke_count), (4, 6));

        let quad = &f.arena().vertices()[10..14];
        assert_eq!((quad[0].x, quad[0].y), (100.0, 50.0));
        assert_eq!((quad[1].x, quad[1].y), (100.0, 0.0));
        assert_eq!((quad[2].x, quad[2].y), (0.0, 50.0));
        assert_eq!((quad[3].x, quad[3].y), (0.0, 0.0));

        let stencil = f.arena().uniforms_at(call.uniform_offset);
        assert_eq!(stencil, FragUniforms::stencil_only());
        let paint = f.arena().uniforms_at(call.uniform_offset + 256);
        assert_eq!(paint.shader_mode(), Some(ShaderMode::FillGradient));
    }

    #[test]
    fn stroke_ignores_fill_ranges() {
        let mut f = frame();
        let fill = square();
        let strip = [Vertex::default(); 8];
        let paths = [PathSource::new(&fill, &strip, false), PathSource::stroke_only(&strip)];
        assert!(f.submit_stroke(
            &textures(),
            &Paint::default(),
            CompositeOperationState::default(),
            &Scissor::none(),
            1.0,
            2.0,
            &paths,
        ));
        assert_eq!(f.arena().vertex_count(), 16);
        let subs = f.arena().paths();
        assert_eq!(subs[0].fill_count, 0);
        assert_eq!((subs[0].stroke_offset, subs[1].stroke_offset), (0, 8));

        let call = f.calls()[0];
        let aa = f.arena().uniforms_at(call.uniform_offset);
        let base = f.arena().uniforms_at(call.uniform_offset + 256);
        assert_eq!(aa.stroke_thr, STROKE_THR_NONE);
        assert_eq!(base.stroke_thr, STROKE_THR_NEAR_OPAQUE);
    }

    #[test]
    fn plain_strokes_use_one_slot() {
        let config = RendererConfig {
            stencil_strokes: false,
            ..RendererConfig::default()
        };
        let mut f = Frame::new(&config, 256);
        let strip = [Vertex::default(); 4];
        f.submit_stroke(
            &textures(),
            &Paint::default(),
            CompositeOperationState::default(),
            &Scissor::none(),
            1.0,
            1.0,
            &[PathSource::stroke_only(&strip)],
        );
        assert_eq!(f.arena().uniform_slot_count(), 1);
    }

    #[test]
    fn triangles_use_image_mode() {
        let mut f = frame();
        let verts = [Vertex::default(); 6];
        assert!(f.submit_triangles(
            &textures(),
            &Paint::default(),
            CompositeOperationState::default(),
            &Scissor::none(),
            &verts,
            1.0,
        ));
        let call = f.calls()[0];
        assert_eq!(call.kind, CallKind::Triangles);
        assert_eq!((call.triangle_offset, call.triangle_count), (0, 6));
        let frag = f.arena().uniforms_at(call.uniform_offset);
        assert_eq!(frag.shader_mode(), Some(ShaderMode::Image));
        assert_eq!(frag.stroke_mult, 1.0);
    }

    #[test]
    fn unknown_image_rolls_back() {
        let mut f = frame();
        let verts = [Vertex::default(); 3];
        let paint = Paint::image_pattern(0.0, 0.0, 1.0, 1.0, 0.0, TextureId(5), 1.0);
        assert!(!f.submit_triangles(
            &textures(),
            &paint,
            CompositeOperationState::default(),
            &Scissor::none(),
            &verts,
            1.0,
        ));
        assert!(f.is_empty());
        assert_eq!(f.arena().vertex_count(), 0);
        assert_eq!(f.arena().uniform_slot_count(), 0);
    }

    #[test]
    fn cancel_and_viewport() {
        let mut f = frame();
        f.set_viewport(640.0, 480.0, 2.0);
        let verts = [Vertex::default(); 3];
        f.submit_triangles(
            &textures(),
            &Paint::default(),
            CompositeOperationState::default(),
            &Scissor::none(),
            &verts,
            1.0,
        );
        f.cancel();
        assert!(f.is_empty());
        let data = f.draw_data();
        assert!(data.is_empty());
        assert_eq!(data.view, [640.0, 480.0]);
        assert!(data.vertices.is_empty());
    }
}
