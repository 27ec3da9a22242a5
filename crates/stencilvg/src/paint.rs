//! Paint, color and scissor descriptions

use crate::geometry::Transform2D;
use crate::texture::TextureId;

/// RGBA color with f32 components (0.0 to 1.0)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create from u8 components (0-255)
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { a: alpha, ..self }
    }

    /// Multiply the color channels by alpha
    pub fn premultiplied(self) -> Self {
        Self {
            r: self.r * self.a,
            g: self.g * self.a,
            b: self.b * self.a,
            a: self.a,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A gradient or image fill with its own transform.
///
/// Gradients are box gradients: `inner_color` inside a rounded rectangle of
/// half-size `extent` and corner `radius`, fading to `outer_color` over
/// `feather`. Linear and radial gradients are degenerate boxes built by the
/// caller. An image paint samples `image` over a rectangle of size `extent`
/// and tints it with `inner_color`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub xform: Transform2D,
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub inner_color: Color,
    pub outer_color: Color,
    pub image: TextureId,
}

impl Default for Paint {
    fn default() -> Self {
        Self::color(Color::WHITE)
    }
}

impl Paint {
    /// A solid color paint
    pub fn color(color: Color) -> Self {
        Self {
            xform: Transform2D::identity(),
            extent: [0.0, 0.0],
            radius: 0.0,
            feather: 1.0,
            inner_color: color,
            outer_color: color,
            image: TextureId::NONE,
        }
    }

    /// A linear gradient from `(sx, sy)` to `(ex, ey)`
    pub fn linear_gradient(sx: f32, sy: f32, ex: f32, ey: f32, inner: Color, outer: Color) -> Self {
        const LARGE: f32 = 1e5;
        let mut dx = ex - sx;
        let mut dy = ey - sy;
        let d = (dx * dx + dy * dy).sqrt();
        if d > 0.0001 {
            dx /= d;
            dy /= d;
        } else {
            dx = 0.0;
            dy = 1.0;
        }
        Self {
            xform: Transform2D::new(dy, -dx, dx, dy, sx - dx * LARGE, sy - dy * LARGE),
            extent: [LARGE, LARGE + d * 0.5],
            radius: 0.0,
            feather: d.max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: TextureId::NONE,
        }
    }

    /// A radial gradient centered at `(cx, cy)`
    pub fn radial_gradient(cx: f32, cy: f32, inner_radius: f32, outer_radius: f32, inner: Color, outer: Color) -> Self {
        let r = (inner_radius + outer_radius) * 0.5;
        let f = outer_radius - inner_radius;
        Self {
            xform: Transform2D::translate(cx, cy),
            extent: [r, r],
            radius: r,
            feather: f.max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: TextureId::NONE,
        }
    }

    /// A box gradient over the rectangle `(x, y, w, h)`
    #[allow(clippy::too_many_arguments)]
    pub fn box_gradient(x: f32, y: f32, w: f32, h: f32, radius: f32, feather: f32, inner: Color, outer: Color) -> Self {
        Self {
            xform: Transform2D::translate(x + w * 0.5, y + h * 0.5),
            extent: [w * 0.5, h * 0.5],
            radius,
            feather: feather.max(1.0),
            inner_color: inner,
            outer_color: outer,
            image: TextureId::NONE,
        }
    }

    /// An image pattern with its top-left corner at `(ox, oy)`
    pub fn image_pattern(ox: f32, oy: f32, w: f32, h: f32, angle: f32, image: TextureId, alpha: f32) -> Self {
        let tint = Color::new(1.0, 1.0, 1.0, alpha);
        Self {
            xform: Transform2D::rotate(angle).then(&Transform2D::translate(ox, oy)),
            extent: [w, h],
            radius: 0.0,
            feather: 0.0,
            inner_color: tint,
            outer_color: tint,
            image,
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_none()
    }
}

/// Scissor rectangle: a transform plus half-extent.
///
/// An extent below `-0.5` on either axis disables scissoring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scissor {
    pub xform: Transform2D,
    pub extent: [f32; 2],
}

impl Default for Scissor {
    fn default() -> Self {
        Self::none()
    }
}

impl Scissor {
    pub fn none() -> Self {
        Self {
            xform: Transform2D::identity(),
            extent: [-1.0, -1.0],
        }
    }

    /// Scissor to the rectangle `(x, y, w, h)`
    pub fn rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            xform: Transform2D::translate(x + w * 0.5, y + h * 0.5),
            extent: [w * 0.5, h * 0.5],
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.extent[0] < -0.5 || self.extent[1] < -0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_scales_rgb_only() {
        let c = Color::new(1.0, 0.5, 0.25, 0.5).premultiplied();
        assert_eq!(c, Color::new(0.5, 0.25, 0.125, 0.5));
    }

    #[test]
    fn default_scissor_is_disabled() {
        assert!(Scissor::default().is_disabled());
        assert!(!Scissor::rect(0.0, 0.0, 10.0, 10.0).is_disabled());
    }

    #[test]
    fn image_pattern_carries_handle() {
        let p = Paint::image_pattern(0.0, 0.0, 32.0, 32.0, 0.0, TextureId(3), 1.0);
        assert!(p.has_image());
        assert!(!Paint::color(Color::BLACK).has_image());
    }
}
