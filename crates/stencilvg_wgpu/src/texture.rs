//! Sampled paint textures
//!
//! Each [`WgpuTexture`] owns its texture, view, sampler and the bind group
//! that exposes them to the fragment stage, so a draw only has to set one
//! bind group per image.

use std::borrow::Cow;
use std::sync::Arc;

use stencilvg::{DeviceTexture, ImageFlags, TextureInfo, TextureKind};

pub fn texture_format(kind: TextureKind) -> wgpu::TextureFormat {
    match kind {
        TextureKind::Alpha => wgpu::TextureFormat::R8Unorm,
        TextureKind::Rgba => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Texture kind for a wrapped texture, `None` for formats the shader can't sample as paint
pub fn kind_for_format(format: wgpu::TextureFormat) -> Option<TextureKind> {
    match format {
        wgpu::TextureFormat::R8Unorm => Some(TextureKind::Alpha),
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            Some(TextureKind::Rgba)
        }
        _ => None,
    }
}

fn sampler_descriptor(flags: ImageFlags) -> wgpu::SamplerDescriptor<'static> {
    let address = |repeat: bool| {
        if repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        }
    };
    let filter = if flags.contains(ImageFlags::NEAREST) {
        wgpu::FilterMode::Nearest
    } else {
        wgpu::FilterMode::Linear
    };
    wgpu::SamplerDescriptor {
        label: Some("stencilvg image sampler"),
        address_mode_u: address(flags.contains(ImageFlags::REPEAT_X)),
        address_mode_v: address(flags.contains(ImageFlags::REPEAT_Y)),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

/// Rows `y..y + height` of columns `x..x + width`, read from an image
/// `image_width` pixels wide and padded to the copy row alignment.
///
/// Returns the padded bytes and the padded row length, or `None` when `data`
/// is too short for the rectangle.
pub fn sub_rect_rows(
    data: &[u8],
    image_width: u32,
    bytes_per_pixel: usize,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Option<(Cow<'_, [u8]>, u32)> {
    let stride = image_width as usize * bytes_per_pixel;
    let row_bytes = width as usize * bytes_per_pixel;
    let start = y as usize * stride + x as usize * bytes_per_pixel;
    if height == 0 || row_bytes == 0 {
        return None;
    }
    let end = start
        .checked_add((height as usize - 1).checked_mul(stride)?)?
        .checked_add(row_bytes)?;
    if data.len() < end {
        return None;
    }

    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    let padded_row = row_bytes.div_ceil(align) * align;
    let padded_row_u32 = u32::try_from(padded_row).ok()?;

    if padded_row == stride && x == 0 {
        return Some((Cow::Borrowed(&data[start..end]), padded_row_u32));
    }
    let mut padded = vec![0u8; padded_row * height as usize];
    for row in 0..height as usize {
        let src = start + row * stride;
        let dst = row * padded_row;
        padded[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
    }
    Some((Cow::Owned(padded), padded_row_u32))
}

pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    queue: Arc<wgpu::Queue>,
    info: TextureInfo,
}

impl WgpuTexture {
    /// Create a texture, optionally filled with `data` (tightly packed rows).
    pub fn new(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        layout: &wgpu::BindGroupLayout,
        info: TextureInfo,
        data: Option<&[u8]>,
    ) -> Self {
        if info.flags.contains(ImageFlags::GENERATE_MIPMAPS) {
            tracing::debug!("mipmap generation is not supported, sampling level 0 only");
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stencilvg image"),
            size: wgpu::Extent3d {
                width: info.width.max(1),
                height: info.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(info.kind),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let mut this = Self::from_parts(device, queue, layout, texture, info);
        if let Some(data) = data {
            this.update(0, 0, info.width, info.height, data);
        }
        this
    }

    /// Wrap a texture created elsewhere.
    ///
    /// Returns `None` for formats other than `R8Unorm` and `Rgba8Unorm(Srgb)`.
    /// Add [`ImageFlags::NO_DELETE`] to leave the texture alive when the
    /// wrapper is dropped.
    pub fn wrap(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        layout: &wgpu::BindGroupLayout,
        texture: wgpu::Texture,
        flags: ImageFlags,
    ) -> Option<Self> {
        let kind = kind_for_format(texture.format())?;
        let info = TextureInfo::new(texture.width(), texture.height(), kind, flags);
        Some(Self::from_parts(device, queue, layout, texture, info))
    }

    /// The 1×1 opaque white texture bound when a draw has no image
    pub fn dummy(device: &wgpu::Device, queue: Arc<wgpu::Queue>, layout: &wgpu::BindGroupLayout) -> Self {
        let info = TextureInfo::new(1, 1, TextureKind::Rgba, ImageFlags::NONE);
        Self::new(device, queue, layout, info, Some(&[255, 255, 255, 255]))
    }

    fn from_parts(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        layout: &wgpu::BindGroupLayout,
        texture: wgpu::Texture,
        info: TextureInfo,
    ) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor(info.flags));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stencilvg image bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        Self {
            texture,
            view,
            bind_group,
            queue,
            info,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

impl DeviceTexture for WgpuTexture {
    fn info(&self) -> TextureInfo {
        self.info
    }

    fn update(&mut self, x: u32, y: u32, width: u32, height: u32, data: &[u8]) {
        let width = width.min(self.info.width.saturating_sub(x));
        let height = height.min(self.info.height.saturating_sub(y));
        let bpp = self.info.kind.bytes_per_pixel();
        let Some((rows, bytes_per_row)) =
            sub_rect_rows(data, self.info.width, bpp, x, y, width, height)
        else {
            tracing::warn!(
                "texture update {}x{} at ({}, {}) skipped: {} bytes of data",
                width,
                height,
                x,
                y,
                data.len()
            );
            return;
        };

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            &rows,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl Drop for WgpuTexture {
    fn drop(&mut self) {
        if !self.info.flags.contains(ImageFlags::NO_DELETE) {
            self.texture.destroy();
        }
    }
}
