//! WGSL shader source
//!
//! One module serves every pass. The fragment stage switches on
//! `frag.shader_type`:
//!
//! - 0: rounded-box gradient fill
//! - 1: image pattern fill
//! - 2: stencil-only (color writes are masked off by the pipeline)
//! - 3: textured triangles
//!
//! `EDGE_AA` is prepended as a constant by [`shader_source`].

/// Shader body without the `EDGE_AA` constant
pub const PATH_SHADER: &str = r#"
struct Viewport {
    size: vec2<f32>,
    _pad: vec2<f32>,
}

struct FragUniforms {
    scissor_mat: mat3x3<f32>,
    paint_mat: mat3x3<f32>,
    inner_col: vec4<f32>,
    outer_col: vec4<f32>,
    scissor_ext: vec2<f32>,
    scissor_scale: vec2<f32>,
    extent: vec2<f32>,
    radius: f32,
    feather: f32,
    stroke_mult: f32,
    stroke_thr: f32,
    tex_type: i32,
    shader_type: i32,
}

@group(0) @binding(0) var<uniform> frag: FragUniforms;
@group(0) @binding(1) var<uniform> viewport: Viewport;
@group(1) @binding(0) var paint_tex: texture_2d<f32>;
@group(1) @binding(1) var paint_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tcoord: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ftcoord: vec2<f32>,
    @location(1) fpos: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.ftcoord = in.tcoord;
    out.fpos = in.position;
    out.clip_position = vec4<f32>(
        2.0 * in.position.x / viewport.size.x - 1.0,
        1.0 - 2.0 * in.position.y / viewport.size.y,
        0.0,
        1.0,
    );
    return out;
}

fn sd_round_rect(pt: vec2<f32>, ext: vec2<f32>, rad: f32) -> f32 {
    let ext2 = ext - vec2<f32>(rad, rad);
    let d = abs(pt) - ext2;
    return min(max(d.x, d.y), 0.0) + length(max(d, vec2<f32>(0.0, 0.0))) - rad;
}

// 1 inside the scissor rectangle, fading to 0 over one fringe outside it
fn scissor_mask(p: vec2<f32>) -> f32 {
    var sc = abs((frag.scissor_mat * vec3<f32>(p, 1.0)).xy) - frag.scissor_ext;
    sc = vec2<f32>(0.5, 0.5) - sc * frag.scissor_scale;
    return clamp(sc.x, 0.0, 1.0) * clamp(sc.y, 0.0, 1.0);
}

// Coverage across the stroke (u) and along the fringe (v)
fn stroke_mask(tc: vec2<f32>) -> f32 {
    return min(1.0, (1.0 - abs(tc.x * 2.0 - 1.0)) * frag.stroke_mult) * min(1.0, tc.y);
}

fn texel(uv: vec2<f32>) -> vec4<f32> {
    var color = textureSampleLevel(paint_tex, paint_sampler, uv, 0.0);
    if (frag.tex_type == 1) {
        color = vec4<f32>(color.xyz * color.w, color.w);
    }
    if (frag.tex_type == 2) {
        color = vec4<f32>(color.x);
    }
    return color;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let scissor = scissor_mask(in.fpos);
    var stroke_alpha = 1.0;
    if (EDGE_AA) {
        stroke_alpha = stroke_mask(in.ftcoord);
        if (stroke_alpha < frag.stroke_thr) {
            discard;
        }
    }

    if (frag.shader_type == 0) {
        let pt = (frag.paint_mat * vec3<f32>(in.fpos, 1.0)).xy;
        let d = clamp((sd_round_rect(pt, frag.extent, frag.radius) + frag.feather * 0.5) / frag.feather, 0.0, 1.0);
        let color = mix(frag.inner_col, frag.outer_col, d);
        return color * (stroke_alpha * scissor);
    }
    if (frag.shader_type == 1) {
        let pt = (frag.paint_mat * vec3<f32>(in.fpos, 1.0)).xy / frag.extent;
        let color = texel(pt) * frag.inner_col;
        return color * (stroke_alpha * scissor);
    }
    if (frag.shader_type == 2) {
        return vec4<f32>(1.0, 1.0, 1.0, 1.0);
    }
    let color = texel(in.ftcoord) * scissor;
    return color * frag.inner_col;
}
"#;

/// Full shader source for the edge anti-aliasing variant
pub fn shader_source(antialias: bool) -> String {
    format!("const EDGE_AA: bool = {};\n{}", antialias, PATH_SHADER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_aa_constant_is_prepended() {
        assert!(shader_source(true).starts_with("const EDGE_AA: bool = true;"));
        assert!(shader_source(false).starts_with("const EDGE_AA: bool = false;"));
    }

    #[test]
    fn wgsl_parses_for_both_variants() {
        for aa in [false, true] {
            let source = shader_source(aa);
            let module = naga::front::wgsl::parse_str(&source)
                .unwrap_or_else(|e| panic!("aa={}: {}", aa, e.emit_to_string(&source)));
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::empty(),
            );
            validator
                .validate(&module)
                .unwrap_or_else(|e| panic!("aa={}: {:?}", aa, e));
        }
    }
}
