//! Vertex, affine transform and sub-path geometry types

/// A tessellated vertex: position plus texture coordinate.
///
/// Fill vertices carry `(0.5, 1.0)`; fringe vertices carry the stroke
/// coverage coordinates the fragment stage turns into anti-aliasing alpha.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { x, y, u, v }
    }
}

/// 2D affine transform
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::identity()
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    pub fn rotate(angle: f32) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Returns the transform that applies `self` first, then `next`.
    pub fn then(&self, next: &Transform2D) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    /// Inverse transform, or `None` when the determinant is (nearly) zero.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a as f64 * self.d as f64 - self.c as f64 * self.b as f64;
        if det > -1e-6 && det < 1e-6 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            a: (self.d as f64 * inv_det) as f32,
            b: (-self.b as f64 * inv_det) as f32,
            c: (-self.c as f64 * inv_det) as f32,
            d: (self.a as f64 * inv_det) as f32,
            e: ((self.c as f64 * self.f as f64 - self.d as f64 * self.e as f64) * inv_det) as f32,
            f: ((self.b as f64 * self.e as f64 - self.a as f64 * self.f as f64) * inv_det) as f32,
        })
    }

    /// Inverse transform, falling back to identity for singular transforms.
    pub fn inverse_or_identity(&self) -> Self {
        self.inverse().unwrap_or_else(Self::identity)
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Expand into three std140 `vec4` columns: `[a b 0 0 | c d 0 0 | e f 1 0]`.
    pub fn to_mat3x4(&self) -> [f32; 12] {
        [
            self.a, self.b, 0.0, 0.0, //
            self.c, self.d, 0.0, 0.0, //
            self.e, self.f, 1.0, 0.0,
        ]
    }
}

/// Axis-aligned bounds as `[min_x, min_y, max_x, max_y]`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The four corners of the covering quad, in triangle-strip order.
    pub fn quad(&self) -> [Vertex; 4] {
        [
            Vertex::new(self.max_x, self.max_y, 0.5, 1.0),
            Vertex::new(self.max_x, self.min_y, 0.5, 1.0),
            Vertex::new(self.min_x, self.max_y, 0.5, 1.0),
            Vertex::new(self.min_x, self.min_y, 0.5, 1.0),
        ]
    }
}

impl From<[f32; 4]> for Bounds {
    fn from(b: [f32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// An already-tessellated path handed in by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathSource<'a> {
    /// Interior triangle fan
    pub fill: &'a [Vertex],
    /// Anti-aliased fringe (fills) or stroke body (strokes) as a triangle strip
    pub stroke: &'a [Vertex],
    pub convex: bool,
}

impl<'a> PathSource<'a> {
    pub fn new(fill: &'a [Vertex], stroke: &'a [Vertex], convex: bool) -> Self {
        Self {
            fill,
            stroke,
            convex,
        }
    }

    pub fn stroke_only(stroke: &'a [Vertex]) -> Self {
        Self {
            fill: &[],
            stroke,
            convex: false,
        }
    }
}

/// Vertex ranges of one sub-path inside the frame's vertex buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubPath {
    pub fill_offset: u32,
    pub fill_count: u32,
    pub stroke_offset: u32,
    pub stroke_count: u32,
}
