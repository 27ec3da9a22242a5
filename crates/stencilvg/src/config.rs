//! Renderer configuration
//!
//! Built from [`CreateFlags`] or directly, then optionally adjusted from the
//! environment:
//!
//! - `STENCILVG_MAX_VERTICES`
//! - `STENCILVG_MAX_PATHS`
//! - `STENCILVG_MAX_UNIFORM_SLOTS`
//! - `STENCILVG_MAX_CALLS`

/// Largest offset or count a draw range can carry
const MAX_RANGE: usize = u32::MAX as usize;

/// Backend creation flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CreateFlags(pub u32);

impl CreateFlags {
    pub const NONE: CreateFlags = CreateFlags(0);
    /// Draw anti-aliased fringes
    pub const ANTIALIAS: CreateFlags = CreateFlags(1 << 0);
    /// Resolve stroke overlaps through the stencil buffer
    pub const STENCIL_STROKES: CreateFlags = CreateFlags(1 << 1);
    /// Poll the device for errors after every uniform binding
    pub const DEBUG: CreateFlags = CreateFlags(1 << 2);

    pub fn contains(self, other: CreateFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CreateFlags {
    type Output = CreateFlags;

    fn bitor(self, rhs: CreateFlags) -> CreateFlags {
        CreateFlags(self.0 | rhs.0)
    }
}

/// Upper bounds on per-frame arena growth.
///
/// An allocation that would exceed a bound fails like an out-of-memory
/// reservation: the in-progress call is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaLimits {
    pub max_vertices: usize,
    pub max_paths: usize,
    pub max_uniform_slots: usize,
    pub max_calls: usize,
}

impl ArenaLimits {
    /// Bound every limit to `1..=u32::MAX` units, and the uniform slots so
    /// that a byte offset `slot * stride` still fits in a `u32`.
    pub fn clamped(self, uniform_stride: usize) -> Self {
        let clamp = |v: usize| v.clamp(1, MAX_RANGE);
        Self {
            max_vertices: clamp(self.max_vertices),
            max_paths: clamp(self.max_paths),
            max_uniform_slots: self.max_uniform_slots.clamp(1, (MAX_RANGE / uniform_stride.max(1)).max(1)),
            max_calls: clamp(self.max_calls),
        }
    }
}

impl Default for ArenaLimits {
    fn default() -> Self {
        Self {
            max_vertices: 4 * 1024 * 1024, // 64 MiB of vertices
            max_paths: 1024 * 1024,
            max_uniform_slots: 65_536,
            max_calls: 65_536,
        }
    }
}

/// Configuration for creating a renderer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Draw anti-aliased fringes around fills
    pub antialias: bool,
    /// Use the three-pass stencil technique for strokes
    pub stencil_strokes: bool,
    /// Check for device errors after each uniform binding
    pub debug: bool,
    pub limits: ArenaLimits,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::from_flags(CreateFlags::ANTIALIAS | CreateFlags::STENCIL_STROKES)
    }
}

impl RendererConfig {
    pub fn from_flags(flags: CreateFlags) -> Self {
        Self {
            antialias: flags.contains(CreateFlags::ANTIALIAS),
            stencil_strokes: flags.contains(CreateFlags::STENCIL_STROKES),
            debug: flags.contains(CreateFlags::DEBUG),
            limits: ArenaLimits::default(),
        }
    }

    pub fn flags(&self) -> CreateFlags {
        let mut flags = CreateFlags::NONE;
        if self.antialias {
            flags = flags | CreateFlags::ANTIALIAS;
        }
        if self.stencil_strokes {
            flags = flags | CreateFlags::STENCIL_STROKES;
        }
        if self.debug {
            flags = flags | CreateFlags::DEBUG;
        }
        flags
    }

    /// Apply `STENCILVG_MAX_*` environment overrides, clamped to at least 1.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `STENCILVG_MAX_*` overrides read through `lookup`.
    ///
    /// Values that don't parse as an unsigned integer are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).and_then(|v| v.trim().parse::<usize>().ok());
        let limits = &mut self.limits;
        if let Some(v) = read("STENCILVG_MAX_VERTICES") {
            limits.max_vertices = v;
        }
        if let Some(v) = read("STENCILVG_MAX_PATHS") {
            limits.max_paths = v;
        }
        if let Some(v) = read("STENCILVG_MAX_UNIFORM_SLOTS") {
            limits.max_uniform_slots = v;
        }
        if let Some(v) = read("STENCILVG_MAX_CALLS") {
            limits.max_calls = v;
        }
        self.limits = self.limits.clamped(1);
        self
    }
}

pub(crate) fn log_renderer_config(config: &RendererConfig) {
    tracing::info!(
        "stencilvg config: antialias={}, stencil_strokes={}, debug={}, max_vertices={}, max_paths={}, max_uniform_slots={}, max_calls={}",
        config.antialias,
        config.stencil_strokes,
        config.debug,
        config.limits.max_vertices,
        config.limits.max_paths,
        config.limits.max_uniform_slots,
        config.limits.max_calls
    );
}
