//! wgpu backend configuration
//!
//! Environment overrides:
//!
//! - `STENCILVG_PIPELINE_CACHE` (pipeline cache capacity)
//! - `STENCILVG_CAPTURE_ERRORS` (`1`/`true` to queue validation errors)

/// Settings for the wgpu device and its render targets
#[derive(Clone, Debug)]
pub struct WgpuConfig {
    /// Format of the color targets passed to `flush`
    pub color_format: wgpu::TextureFormat,
    /// Format of the internally owned stencil attachment
    pub stencil_format: wgpu::TextureFormat,
    /// Maximum number of distinct render pipelines kept alive
    pub pipeline_cache_size: usize,
    /// Queue uncaptured device errors so debug mode can report them per draw
    pub capture_errors: bool,
}

impl Default for WgpuConfig {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            stencil_format: wgpu::TextureFormat::Stencil8,
            pipeline_cache_size: 64,
            capture_errors: false,
        }
    }
}

impl WgpuConfig {
    pub fn with_color_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply the `STENCILVG_*` backend overrides read through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = lookup("STENCILVG_PIPELINE_CACHE").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.pipeline_cache_size = size;
        }
        if let Some(v) = lookup("STENCILVG_CAPTURE_ERRORS") {
            let v = v.trim();
            self.capture_errors = v == "1" || v.eq_ignore_ascii_case("true");
        }
        self.pipeline_cache_size = self.pipeline_cache_size.max(1);
        self
    }
}

pub(crate) fn log_wgpu_config(config: &WgpuConfig) {
    tracing::info!(
        "stencilvg wgpu config: color_format={:?}, stencil_format={:?}, pipeline_cache_size={}, capture_errors={}",
        config.color_format,
        config.stencil_format,
        config.pipeline_cache_size,
        config.capture_errors
    );
}
