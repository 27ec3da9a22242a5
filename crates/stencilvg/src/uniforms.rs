//! Fragment uniform records and paint packing
//!
//! One [`FragUniforms`] record per uniform slot. Records are written into the
//! frame's uniform bytes at multiples of the slot stride so a single device
//! buffer holds every slot of the frame.

use bytemuck::{Pod, Zeroable};

use crate::error::PackError;
use crate::geometry::Transform2D;
use crate::paint::{Paint, Scissor};
use crate::texture::{ImageFlags, TextureKind, TextureLookup};

/// Threshold meaning "no stroke alpha test"
pub const STROKE_THR_NONE: f32 = -1.0;

/// Threshold that admits only near-opaque stroke coverage
pub const STROKE_THR_NEAR_OPAQUE: f32 = 1.0 - 0.5 / 255.0;

/// What the fragment stage computes for a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ShaderMode {
    /// Box gradient fill (solid colors are a gradient with equal ends)
    FillGradient = 0,
    /// Image pattern fill
    FillImage = 1,
    /// Stencil-only pass; color output is masked off
    Simple = 2,
    /// Textured triangles
    Image = 3,
}

impl ShaderMode {
    pub fn from_i32(v: i32) -> Option<ShaderMode> {
        match v {
            0 => Some(ShaderMode::FillGradient),
            1 => Some(ShaderMode::FillImage),
            2 => Some(ShaderMode::Simple),
            3 => Some(ShaderMode::Image),
            _ => None,
        }
    }
}

/// How the fragment stage reconstructs color from a texel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TexType {
    PremultipliedRgba = 0,
    Rgba = 1,
    Alpha = 2,
}

impl TexType {
    pub fn for_texture(kind: TextureKind, flags: ImageFlags) -> TexType {
        match kind {
            TextureKind::Rgba if flags.contains(ImageFlags::PREMULTIPLIED) => TexType::PremultipliedRgba,
            TextureKind::Rgba => TexType::Rgba,
            TextureKind::Alpha => TexType::Alpha,
        }
    }
}

/// Per-slot fragment parameters (matches the WGSL `FragUniforms` struct)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FragUniforms {
    /// Inverse scissor transform, three padded columns
    pub scissor_mat: [f32; 12],
    /// Inverse paint transform, three padded columns
    pub paint_mat: [f32; 12],
    pub inner_color: [f32; 4],
    pub outer_color: [f32; 4],
    pub scissor_ext: [f32; 2],
    pub scissor_scale: [f32; 2],
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub stroke_mult: f32,
    pub stroke_thr: f32,
    pub tex_type: i32,
    pub shader_type: i32,
}

/// Size of one record in bytes
pub const FRAG_UNIFORMS_SIZE: usize = std::mem::size_of::<FragUniforms>();

impl FragUniforms {
    /// Record for a stencil-only pass: all zero, no threshold, mode `Simple`.
    pub fn stencil_only() -> Self {
        Self {
            stroke_thr: STROKE_THR_NONE,
            shader_type: ShaderMode::Simple as i32,
            ..Self::zeroed()
        }
    }

    pub fn shader_mode(&self) -> Option<ShaderMode> {
        ShaderMode::from_i32(self.shader_type)
    }

    pub fn set_shader_mode(&mut self, mode: ShaderMode) {
        self.shader_type = mode as i32;
    }
}

/// Slot stride for a device uniform offset alignment.
///
/// The record size rounded up to a multiple of `align`; an alignment of 0 or
/// 1 leaves the record size unchanged.
pub fn uniform_stride(align: usize) -> usize {
    if align <= 1 {
        return FRAG_UNIFORMS_SIZE;
    }
    FRAG_UNIFORMS_SIZE.div_ceil(align) * align
}

/// Pack a paint, scissor and stroke parameters into a uniform record.
///
/// `width` is the stroke width (the fringe width for fills), `fringe` the
/// anti-aliasing feather, `stroke_thr` the stroke alpha threshold stored
/// verbatim. Fails only when an image paint's handle does not resolve.
pub fn pack_paint<T: TextureLookup + ?Sized>(
    textures: &T,
    paint: &Paint,
    scissor: &Scissor,
    width: f32,
    fringe: f32,
    stroke_thr: f32,
) -> Result<FragUniforms, PackError> {
    let mut frag = FragUniforms::zeroed();

    frag.inner_color = paint.inner_color.premultiplied().to_array();
    frag.outer_color = paint.outer_color.premultiplied().to_array();

    if scissor.is_disabled() {
        frag.scissor_mat = [0.0; 12];
        frag.scissor_ext = [1.0, 1.0];
        frag.scissor_scale = [1.0, 1.0];
    } else {
        let xf = &scissor.xform;
        frag.scissor_mat = xf.inverse_or_identity().to_mat3x4();
        frag.scissor_ext = scissor.extent;
        frag.scissor_scale = [
            (xf.a * xf.a + xf.c * xf.c).sqrt() / fringe,
            (xf.b * xf.b + xf.d * xf.d).sqrt() / fringe,
        ];
    }

    frag.extent = paint.extent;
    frag.stroke_mult = (width * 0.5 + fringe * 0.5) / fringe;
    frag.stroke_thr = stroke_thr;

    let inverse = if paint.has_image() {
        let info = textures
            .texture_info(paint.image)
            .ok_or(PackError::UnknownImage(paint.image))?;

        let paint_xform = if info.flags.contains(ImageFlags::FLIP_Y) {
            let half_h = frag.extent[1] * 0.5;
            Transform2D::translate(0.0, -half_h)
                .then(&Transform2D::scale(1.0, -1.0))
                .then(&Transform2D::translate(0.0, half_h))
                .then(&paint.xform)
        } else {
            paint.xform
        };

        frag.set_shader_mode(ShaderMode::FillImage);
        frag.tex_type = TexType::for_texture(info.kind, info.flags) as i32;
        paint_xform.inverse_or_identity()
    } else {
        frag.set_shader_mode(ShaderMode::FillGradient);
        frag.radius = paint.radius;
        frag.feather = paint.feather;
        paint.xform.inverse_or_identity()
    };

    frag.paint_mat = inverse.to_mat3x4();
    Ok(frag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;
    use crate::texture::{TextureId, TextureInfo};
    use rustc_hash::FxHashMap;

    fn no_textures() -> FxHashMap<TextureId, TextureInfo> {
        FxHashMap::default()
    }

    fn one_texture(id: TextureId, info: TextureInfo) -> FxHashMap<TextureId, TextureInfo> {
        let mut map = FxHashMap::default();
        map.insert(id, info);
        map
    }

    #[test]
    fn record_is_176_bytes() {
        assert_eq!(FRAG_UNIFORMS_SIZE, 176);
        assert_eq!(FRAG_UNIFORMS_SIZE % 16, 0);
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(uniform_stride(0), 176);
        assert_eq!(uniform_stride(1), 176);
        assert_eq!(uniform_stride(16), 176);
        assert_eq!(uniform_stride(64), 192);
        assert_eq!(uniform_stride(256), 256);
    }

    #[test]
    fn colors_are_premultiplied_once() {
        let paint = Paint::linear_gradient(
            0.0,
            0.0,
            10.0,
            0.0,
            Color::new(1.0, 0.5, 0.0, 0.5),
            Color::new(0.2, 0.4, 0.8, 0.25),
        );
        let frag = pack_paint(&no_textures(), &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.inner_color, [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(frag.outer_color, [0.05, 0.1, 0.2, 0.25]);
    }

    #[test]
    fn degenerate_scissor_ignores_transform() {
        let scissor = Scissor {
            xform: Transform2D::new(3.0, 1.0, -2.0, 5.0, 40.0, 7.0),
            extent: [10.0, -0.75],
        };
        let frag = pack_paint(&no_textures(), &Paint::default(), &scissor, 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.scissor_mat, [0.0; 12]);
        assert_eq!(frag.scissor_ext, [1.0, 1.0]);
        assert_eq!(frag.scissor_scale, [1.0, 1.0]);
    }

    #[test]
    fn scissor_scale_uses_column_norms_over_fringe() {
        let scissor = Scissor {
            xform: Transform2D::new(3.0, 0.0, 4.0, 2.0, 0.0, 0.0),
            extent: [5.0, 5.0],
        };
        let frag = pack_paint(&no_textures(), &Paint::default(), &scissor, 1.0, 0.5, -1.0).unwrap();
        assert_eq!(frag.scissor_scale, [10.0, 4.0]);
        assert_eq!(frag.scissor_ext, [5.0, 5.0]);
        assert_eq!(frag.scissor_mat[10], 1.0);
    }

    #[test]
    fn stroke_mult_and_threshold() {
        let frag = pack_paint(
            &no_textures(),
            &Paint::default(),
            &Scissor::none(),
            3.0,
            1.0,
            STROKE_THR_NEAR_OPAQUE,
        )
        .unwrap();
        assert_eq!(frag.stroke_mult, 2.0);
        assert_eq!(frag.stroke_thr, STROKE_THR_NEAR_OPAQUE);
    }

    #[test]
    fn gradient_paint_packs_gradient_mode() {
        let paint = Paint::box_gradient(0.0, 0.0, 20.0, 10.0, 4.0, 2.0, Color::WHITE, Color::BLACK);
        let frag = pack_paint(&no_textures(), &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.shader_mode(), Some(ShaderMode::FillGradient));
        assert_eq!(frag.radius, 4.0);
        assert_eq!(frag.feather, 2.0);
        // inverse of translate(10, 5)
        assert_eq!(&frag.paint_mat[8..10], &[-10.0, -5.0]);
    }

    #[test]
    fn image_paint_packs_image_mode_and_tex_type() {
        let id = TextureId(7);
        let textures = one_texture(
            id,
            TextureInfo::new(4, 4, TextureKind::Rgba, ImageFlags::PREMULTIPLIED),
        );
        let paint = Paint::image_pattern(0.0, 0.0, 4.0, 4.0, 0.0, id, 1.0);
        let frag = pack_paint(&textures, &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.shader_mode(), Some(ShaderMode::FillImage));
        assert_eq!(frag.tex_type, TexType::PremultipliedRgba as i32);
        assert_eq!(frag.radius, 0.0);

        let alpha = one_texture(id, TextureInfo::new(4, 4, TextureKind::Alpha, ImageFlags::NONE));
        let frag = pack_paint(&alpha, &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.tex_type, TexType::Alpha as i32);

        let straight = one_texture(id, TextureInfo::new(4, 4, TextureKind::Rgba, ImageFlags::NONE));
        let frag = pack_paint(&straight, &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        assert_eq!(frag.tex_type, TexType::Rgba as i32);
    }

    #[test]
    fn unknown_image_fails() {
        let paint = Paint::image_pattern(0.0, 0.0, 4.0, 4.0, 0.0, TextureId(9), 1.0);
        let err = pack_paint(&no_textures(), &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap_err();
        assert_eq!(err, PackError::UnknownImage(TextureId(9)));
    }

    #[test]
    fn flip_y_mirrors_about_image_center() {
        let id = TextureId(2);
        let textures = one_texture(id, TextureInfo::new(8, 8, TextureKind::Rgba, ImageFlags::FLIP_Y));
        let paint = Paint::image_pattern(0.0, 0.0, 8.0, 8.0, 0.0, id, 1.0);
        let frag = pack_paint(&textures, &paint, &Scissor::none(), 1.0, 1.0, -1.0).unwrap();
        // y -> 8 - y
        assert_eq!(frag.paint_mat[5], -1.0);
        assert_eq!(frag.paint_mat[9], 8.0);
    }

    #[test]
    fn stencil_only_record() {
        let frag = FragUniforms::stencil_only();
        assert_eq!(frag.shader_mode(), Some(ShaderMode::Simple));
        assert_eq!(frag.stroke_thr, -1.0);
        assert_eq!(frag.inner_color, [0.0; 4]);
    }
}
