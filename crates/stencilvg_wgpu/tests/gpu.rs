//! Rendering tests against a real adapter. Each test returns early when no
//! adapter is available.

use stencilvg::{
    Bounds, Color, CompositeOperation, CompositeOperationState, ImageFlags, Paint, PathSource, RendererConfig,
    Scissor, TextureKind, Vertex,
};
use stencilvg_wgpu::{request_device, WgpuConfig, WgpuRenderer};

fn renderer() -> Option<WgpuRenderer> {
    let (device, queue) = match pollster::block_on(request_device()) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("skipping GPU test: {}", e);
            return None;
        }
    };
    Some(WgpuRenderer::new(device, queue, RendererConfig::default(), WgpuConfig::default()).unwrap())
}

fn target(renderer: &WgpuRenderer, size: u32) -> wgpu::Texture {
    renderer.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("test target"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn over() -> CompositeOperationState {
    CompositeOperation::SourceOver.into()
}

/// Convex shapes wind counter-clockwise on screen so culling keeps them
fn fan(points: &[(f32, f32)]) -> Vec<Vertex> {
    points.iter().map(|&(x, y)| Vertex::new(x, y, 0.5, 1.0)).collect()
}

fn render(renderer: &mut WgpuRenderer, size: u32, draw: impl FnOnce(&mut WgpuRenderer)) -> Vec<u8> {
    let texture = target(renderer, size);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.set_viewport(size as f32, size as f32, 1.0);
    draw(&mut *renderer);
    renderer.flush(&view, (size, size)).unwrap();
    renderer.read_texture_rgba(&texture).unwrap()
}

#[test]
fn convex_square_is_filled() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let square = fan(&[(16.0, 16.0), (16.0, 48.0), (48.0, 48.0), (48.0, 16.0)]);
    let pixels = render(&mut renderer, 64, |r| {
        let paths = [PathSource::new(&square, &[], true)];
        assert!(r.submit_fill(
            &Paint::color(Color::rgb(1.0, 0.0, 0.0)),
            over(),
            &Scissor::none(),
            1.0,
            Bounds::new(16.0, 16.0, 48.0, 48.0),
            &paths,
        ));
    });

    assert_eq!(pixel(&pixels, 64, 32, 32), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, 64, 4, 4), [0, 0, 0, 0]);
    assert_eq!(pixel(&pixels, 64, 60, 32), [0, 0, 0, 0]);
}

#[test]
fn star_center_is_filled_by_nonzero_winding() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let star = fan(&[(50.0, 0.0), (80.0, 100.0), (0.0, 35.0), (100.0, 35.0), (20.0, 100.0)]);
    let pixels = render(&mut renderer, 100, |r| {
        let paths = [PathSource::new(&star, &[], false)];
        assert!(r.submit_fill(
            &Paint::color(Color::rgb(0.0, 0.0, 1.0)),
            over(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            &paths,
        ));
    });

    // The inner pentagon has winding number 2
    assert_eq!(pixel(&pixels, 100, 50, 55), [0, 0, 255, 255]);
    // One of the points
    assert_eq!(pixel(&pixels, 100, 50, 10), [0, 0, 255, 255]);
    assert_eq!(pixel(&pixels, 100, 2, 2), [0, 0, 0, 0]);
    assert_eq!(pixel(&pixels, 100, 97, 97), [0, 0, 0, 0]);
}

#[test]
fn image_pattern_samples_texels() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    #[rustfmt::skip]
    let texels = [
        255, 0, 0, 255,    0, 255, 0, 255,
        0, 0, 255, 255,    255, 255, 255, 255,
    ];
    let image = renderer.create_texture(2, 2, TextureKind::Rgba, ImageFlags::NEAREST, Some(&texels));
    assert_eq!(renderer.texture_size(image), Some((2, 2)));

    let quad = fan(&[(0.0, 0.0), (0.0, 64.0), (64.0, 64.0), (64.0, 0.0)]);
    let pixels = render(&mut renderer, 64, |r| {
        let paths = [PathSource::new(&quad, &[], true)];
        assert!(r.submit_fill(
            &Paint::image_pattern(0.0, 0.0, 64.0, 64.0, 0.0, image, 1.0),
            over(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 64.0, 64.0),
            &paths,
        ));
    });

    assert_eq!(pixel(&pixels, 64, 8, 8), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, 64, 56, 8), [0, 255, 0, 255]);
    assert_eq!(pixel(&pixels, 64, 8, 56), [0, 0, 255, 255]);
    assert_eq!(pixel(&pixels, 64, 56, 56), [255, 255, 255, 255]);

    assert!(renderer.delete_texture(image));
    assert_eq!(renderer.texture_size(image), None);
}

#[test]
fn repeated_frames_reuse_pipelines() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let star = fan(&[(50.0, 0.0), (80.0, 100.0), (0.0, 35.0), (100.0, 35.0), (20.0, 100.0)]);
    let mut draw = |r: &mut WgpuRenderer| {
        let paths = [PathSource::new(&star, &[], false)];
        r.submit_fill(
            &Paint::color(Color::BLACK),
            over(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            &paths,
        );
    };

    render(&mut renderer, 100, &mut draw);
    let cached = renderer.pipeline_count();
    let created = renderer.renderer().device().pipelines_created();
    assert!(cached > 0);

    render(&mut renderer, 100, &mut draw);
    assert_eq!(renderer.pipeline_count(), cached);
    assert_eq!(renderer.renderer().device().pipelines_created(), created);
}

#[test]
fn wrapping_rejects_unsupported_formats() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let make = |format| {
        renderer.device().create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: 8,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    };
    let bgra = make(wgpu::TextureFormat::Bgra8Unorm);
    let rgba = make(wgpu::TextureFormat::Rgba8Unorm);

    assert!(renderer.wrap_texture(bgra, ImageFlags::NONE).is_none());
    let id = renderer.wrap_texture(rgba, ImageFlags::NO_DELETE).unwrap();
    assert_eq!(renderer.texture_size(id), Some((8, 4)));
}

#[test]
fn empty_frame_submits_nothing() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let pixels = render(&mut renderer, 16, |_| {});
    assert!(pixels.iter().all(|&b| b == 0));
    assert_eq!(renderer.pipeline_count(), 0);
}

#[test]
fn core_flush_keeps_only_its_own_draws() {
    let Some(mut renderer) = renderer() else {
        return;
    };
    let star = fan(&[(50.0, 0.0), (80.0, 100.0), (0.0, 35.0), (100.0, 35.0), (20.0, 100.0)]);
    let square = fan(&[(16.0, 16.0), (16.0, 48.0), (48.0, 48.0), (48.0, 16.0)]);
    let fill = |core: &mut stencilvg_wgpu::CoreRenderer, points: &[Vertex], convex: bool| {
        let paths = [PathSource::new(points, &[], convex)];
        assert!(core.submit_fill(
            &Paint::color(Color::rgb(0.0, 1.0, 0.0)),
            over(),
            &Scissor::none(),
            1.0,
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            &paths,
        ));
        core.flush();
    };

    renderer.set_viewport(100.0, 100.0, 1.0);
    fill(renderer.renderer_mut(), &square, true);
    let square_draws = renderer.renderer().device().draws().to_vec();
    assert!(!square_draws.is_empty());

    fill(renderer.renderer_mut(), &star, false);
    fill(renderer.renderer_mut(), &square, true);
    assert_eq!(renderer.renderer().device().draws(), &square_draws[..]);

    // The unsubmitted square must not reach the next frame
    let pixels = render(&mut renderer, 64, |_| {});
    assert!(pixels.iter().all(|&b| b == 0));
    assert!(renderer.renderer().device().draws().is_empty());
}
