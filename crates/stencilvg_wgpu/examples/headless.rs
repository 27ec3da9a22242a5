//! Renders a few shapes offscreen and writes them to `stencilvg_headless.png`.
//!
//! Run with `RUST_LOG=stencilvg=debug,stencilvg_wgpu=debug` to see resource
//! creation and pipeline cache misses.

use stencilvg::{
    Bounds, Color, CompositeOperation, ImageFlags, Paint, PathSource, RendererConfig, Scissor, TextureKind,
    Vertex,
};
use stencilvg_wgpu::{WgpuConfig, WgpuRenderer};
use tracing_subscriber::EnvFilter;

const SIZE: u32 = 256;

fn star(cx: f32, cy: f32, r: f32) -> Vec<Vertex> {
    (0..5)
        .map(|i| {
            let a = -std::f32::consts::FRAC_PI_2 + i as f32 * 4.0 * std::f32::consts::PI / 5.0;
            Vertex::new(cx + r * a.cos(), cy + r * a.sin(), 0.5, 1.0)
        })
        .collect()
}

/// Triangle strip outlining a rectangle, alternating outer and inner corners
fn outline(x: f32, y: f32, w: f32, h: f32, width: f32) -> Vec<Vertex> {
    let hw = width * 0.5;
    let corners = [(x, y), (x, y + h), (x + w, y + h), (x + w, y), (x, y)];
    let mut strip = Vec::new();
    for (i, &(px, py)) in corners.iter().enumerate() {
        let (dx, dy) = match i % 4 {
            0 => (-hw, -hw),
            1 => (-hw, hw),
            2 => (hw, hw),
            _ => (hw, -hw),
        };
        strip.push(Vertex::new(px + dx, py + dy, 0.0, 1.0));
        strip.push(Vertex::new(px - dx, py - dy, 1.0, 1.0));
    }
    strip
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RendererConfig::default().with_env_overrides();
    let mut renderer = pollster::block_on(WgpuRenderer::headless(config, WgpuConfig::default().with_env_overrides()))?;

    let target = renderer.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("headless target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    #[rustfmt::skip]
    let checker = [
        255, 255, 255, 255,   40, 40, 40, 255,
        40, 40, 40, 255,      255, 255, 255, 255,
    ];
    let image = renderer.create_texture(
        2,
        2,
        TextureKind::Rgba,
        ImageFlags::REPEAT_X | ImageFlags::REPEAT_Y | ImageFlags::NEAREST,
        Some(&checker),
    );

    let over = CompositeOperation::SourceOver.into();
    let scissor = Scissor::none();
    renderer.set_viewport(SIZE as f32, SIZE as f32, 1.0);

    let background = [
        Vertex::new(0.0, 0.0, 0.5, 1.0),
        Vertex::new(0.0, SIZE as f32, 0.5, 1.0),
        Vertex::new(SIZE as f32, SIZE as f32, 0.5, 1.0),
        Vertex::new(SIZE as f32, 0.0, 0.5, 1.0),
    ];
    renderer.submit_fill(
        &Paint::image_pattern(0.0, 0.0, 32.0, 32.0, 0.0, image, 0.25),
        over,
        &scissor,
        1.0,
        Bounds::new(0.0, 0.0, SIZE as f32, SIZE as f32),
        &[PathSource::new(&background, &[], true)],
    );

    let shape = star(128.0, 128.0, 100.0);
    renderer.submit_fill(
        &Paint::linear_gradient(0.0, 28.0, 0.0, 228.0, Color::rgb(1.0, 0.8, 0.1), Color::rgb(0.9, 0.2, 0.1)),
        over,
        &scissor,
        1.0,
        Bounds::new(28.0, 28.0, 228.0, 228.0),
        &[PathSource::new(&shape, &[], false)],
    );

    let frame = outline(16.0, 16.0, 224.0, 224.0, 6.0);
    renderer.submit_stroke(
        &Paint::color(Color::rgb(0.1, 0.3, 0.8)),
        over,
        &Scissor::rect(0.0, 0.0, 200.0, 256.0),
        1.0,
        6.0,
        &[PathSource::stroke_only(&frame)],
    );

    renderer.flush(&view, (SIZE, SIZE))?;
    let pixels = renderer.read_texture_rgba(&target)?;

    let path = "stencilvg_headless.png";
    image::save_buffer(path, &pixels, SIZE, SIZE, image::ExtendedColorType::Rgba8)?;
    tracing::info!("wrote {}", path);
    Ok(())
}
