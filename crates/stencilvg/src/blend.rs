//! Composite operations and blend-factor resolution
//!
//! Callers describe blending with integer factor codes (one bit each). The
//! codes are resolved once, at submission time, into a [`BlendFunc`] of
//! device factors that the rasterizer can compare and apply directly.

/// Blend factor codes accepted in a [`CompositeOperationState`]
pub mod factor {
    pub const ZERO: i32 = 1 << 0;
    pub const ONE: i32 = 1 << 1;
    pub const SRC_COLOR: i32 = 1 << 2;
    pub const ONE_MINUS_SRC_COLOR: i32 = 1 << 3;
    pub const DST_COLOR: i32 = 1 << 4;
    pub const ONE_MINUS_DST_COLOR: i32 = 1 << 5;
    pub const SRC_ALPHA: i32 = 1 << 6;
    pub const ONE_MINUS_SRC_ALPHA: i32 = 1 << 7;
    pub const DST_ALPHA: i32 = 1 << 8;
    pub const ONE_MINUS_DST_ALPHA: i32 = 1 << 9;
    pub const SRC_ALPHA_SATURATE: i32 = 1 << 10;
}

/// Blend factor as understood by the render device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    /// Map a factor code to a device factor, `None` for unknown codes.
    pub fn from_code(code: i32) -> Option<BlendFactor> {
        let f = match code {
            factor::ZERO => BlendFactor::Zero,
            factor::ONE => BlendFactor::One,
            factor::SRC_COLOR => BlendFactor::SrcColor,
            factor::ONE_MINUS_SRC_COLOR => BlendFactor::OneMinusSrcColor,
            factor::DST_COLOR => BlendFactor::DstColor,
            factor::ONE_MINUS_DST_COLOR => BlendFactor::OneMinusDstColor,
            factor::SRC_ALPHA => BlendFactor::SrcAlpha,
            factor::ONE_MINUS_SRC_ALPHA => BlendFactor::OneMinusSrcAlpha,
            factor::DST_ALPHA => BlendFactor::DstAlpha,
            factor::ONE_MINUS_DST_ALPHA => BlendFactor::OneMinusDstAlpha,
            factor::SRC_ALPHA_SATURATE => BlendFactor::SrcAlphaSaturate,
            _ => return None,
        };
        Some(f)
    }
}

/// Resolved separate blend function: `(src, dst)` for color and for alpha
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendFunc {
    /// Premultiplied source-over, also used for unrecognized factor codes
    pub const PREMULTIPLIED_OVER: BlendFunc = BlendFunc {
        src_rgb: BlendFactor::One,
        dst_rgb: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::PREMULTIPLIED_OVER
    }
}

/// Porter-Duff style composite presets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositeOperation {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    Atop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

/// Blend factor codes for color and alpha
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositeOperationState {
    pub src_rgb: i32,
    pub dst_rgb: i32,
    pub src_alpha: i32,
    pub dst_alpha: i32,
}

impl CompositeOperationState {
    /// Same factors for color and alpha
    pub fn blend(src: i32, dst: i32) -> Self {
        Self::blend_separate(src, dst, src, dst)
    }

    pub fn blend_separate(src_rgb: i32, dst_rgb: i32, src_alpha: i32, dst_alpha: i32) -> Self {
        Self {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        }
    }

    /// Resolve into device factors.
    ///
    /// If any of the four codes is unknown the whole tuple becomes
    /// [`BlendFunc::PREMULTIPLIED_OVER`]; a partially valid state is never
    /// produced.
    pub fn resolve(&self) -> BlendFunc {
        let resolved = (
            BlendFactor::from_code(self.src_rgb),
            BlendFactor::from_code(self.dst_rgb),
            BlendFactor::from_code(self.src_alpha),
            BlendFactor::from_code(self.dst_alpha),
        );
        match resolved {
            (Some(src_rgb), Some(dst_rgb), Some(src_alpha), Some(dst_alpha)) => BlendFunc {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            },
            _ => {
                tracing::trace!("unknown blend factor in {:?}, using source-over", self);
                BlendFunc::PREMULTIPLIED_OVER
            }
        }
    }
}

impl Default for CompositeOperationState {
    fn default() -> Self {
        CompositeOperation::SourceOver.into()
    }
}

impl From<CompositeOperation> for CompositeOperationState {
    fn from(op: CompositeOperation) -> Self {
        use factor::*;
        let (src, dst) = match op {
            CompositeOperation::SourceOver => (ONE, ONE_MINUS_SRC_ALPHA),
            CompositeOperation::SourceIn => (DST_ALPHA, ZERO),
            CompositeOperation::SourceOut => (ONE_MINUS_DST_ALPHA, ZERO),
            CompositeOperation::Atop => (DST_ALPHA, ONE_MINUS_SRC_ALPHA),
            CompositeOperation::DestinationOver => (ONE_MINUS_DST_ALPHA, ONE),
            CompositeOperation::DestinationIn => (ZERO, SRC_ALPHA),
            CompositeOperation::DestinationOut => (ZERO, ONE_MINUS_SRC_ALPHA),
            CompositeOperation::DestinationAtop => (ONE_MINUS_DST_ALPHA, SRC_ALPHA),
            CompositeOperation::Lighter => (ONE, ONE),
            CompositeOperation::Copy => (ONE, ZERO),
            CompositeOperation::Xor => (ONE_MINUS_DST_ALPHA, ONE_MINUS_SRC_ALPHA),
        };
        CompositeOperationState::blend(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_maps() {
        for bit in 0..=10 {
            assert!(BlendFactor::from_code(1 << bit).is_some(), "bit {}", bit);
        }
        assert_eq!(BlendFactor::from_code(0), None);
        assert_eq!(BlendFactor::from_code(1 << 11), None);
        assert_eq!(BlendFactor::from_code(factor::ONE | factor::ZERO), None);
    }

    #[test]
    fn all_unknown_codes_fall_back_to_over() {
        let state = CompositeOperationState::blend_separate(-1, 3, 1 << 20, 0);
        assert_eq!(state.resolve(), BlendFunc::PREMULTIPLIED_OVER);
    }

    #[test]
    fn single_unknown_code_replaces_whole_tuple() {
        let state = CompositeOperationState::blend_separate(factor::ZERO, factor::ZERO, factor::ZERO, 12345);
        assert_eq!(state.resolve(), BlendFunc::PREMULTIPLIED_OVER);
    }

    #[test]
    fn separate_factors_are_kept() {
        let state = CompositeOperationState::blend_separate(
            factor::SRC_ALPHA,
            factor::ONE_MINUS_SRC_ALPHA,
            factor::ONE,
            factor::ZERO,
        );
        let f = state.resolve();
        assert_eq!(f.src_rgb, BlendFactor::SrcAlpha);
        assert_eq!(f.dst_rgb, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(f.src_alpha, BlendFactor::One);
        assert_eq!(f.dst_alpha, BlendFactor::Zero);
    }

    #[test]
    fn presets_resolve() {
        let copy = CompositeOperationState::from(CompositeOperation::Copy).resolve();
        assert_eq!(copy.src_rgb, BlendFactor::One);
        assert_eq!(copy.dst_rgb, BlendFactor::Zero);

        let xor = CompositeOperationState::from(CompositeOperation::Xor).resolve();
        assert_eq!(xor.src_alpha, BlendFactor::OneMinusDstAlpha);
        assert_eq!(xor.dst_alpha, BlendFactor::OneMinusSrcAlpha);

        assert_eq!(CompositeOperationState::default().resolve(), BlendFunc::PREMULTIPLIED_OVER);
    }
}
