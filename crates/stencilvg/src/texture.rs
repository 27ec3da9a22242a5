//! Texture table
//!
//! Textures are owned by value in a [`TextureRegistry`] and referred to by
//! integer [`TextureId`] handles everywhere else. The packer and the
//! rasterizer only ever hold handles.

use rustc_hash::FxHashMap;

/// Integer texture handle. `0` means "no texture".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const NONE: TextureId = TextureId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pixel layout of a texture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Single channel coverage
    Alpha,
    #[default]
    Rgba,
}

impl TextureKind {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureKind::Alpha => 1,
            TextureKind::Rgba => 4,
        }
    }
}

/// Image creation flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageFlags(pub u32);

impl ImageFlags {
    pub const NONE: ImageFlags = ImageFlags(0);
    pub const GENERATE_MIPMAPS: ImageFlags = ImageFlags(1 << 0);
    pub const REPEAT_X: ImageFlags = ImageFlags(1 << 1);
    pub const REPEAT_Y: ImageFlags = ImageFlags(1 << 2);
    /// Flip the image vertically when sampled through a paint
    pub const FLIP_Y: ImageFlags = ImageFlags(1 << 3);
    /// Pixel data is already premultiplied by alpha
    pub const PREMULTIPLIED: ImageFlags = ImageFlags(1 << 4);
    pub const NEAREST: ImageFlags = ImageFlags(1 << 5);
    /// The underlying device texture is owned elsewhere and must not be destroyed
    pub const NO_DELETE: ImageFlags = ImageFlags(1 << 16);

    pub fn contains(self, other: ImageFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ImageFlags {
    type Output = ImageFlags;

    fn bitor(self, rhs: ImageFlags) -> ImageFlags {
        ImageFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ImageFlags {
    fn bitor_assign(&mut self, rhs: ImageFlags) {
        self.0 |= rhs.0;
    }
}

/// What the core needs to know about a texture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub flags: ImageFlags,
}

impl TextureInfo {
    pub fn new(width: u32, height: u32, kind: TextureKind, flags: ImageFlags) -> Self {
        Self {
            width,
            height,
            kind,
            flags,
        }
    }
}

/// Read-only handle resolution used while packing paints
pub trait TextureLookup {
    fn texture_info(&self, id: TextureId) -> Option<TextureInfo>;
}

/// A device texture owned by a [`TextureRegistry`]
pub trait DeviceTexture {
    fn info(&self) -> TextureInfo;

    /// Replace the `(x, y, width, height)` sub-rectangle.
    ///
    /// `data` holds the whole image at the texture's row length; only the
    /// sub-rectangle is read from it.
    fn update(&mut self, x: u32, y: u32, width: u32, height: u32, data: &[u8]);
}

/// Handle-keyed registry of device textures.
///
/// Created with a 1×1 fallback texture that is bound whenever a draw has no
/// image, or its image no longer resolves.
pub struct TextureRegistry<X> {
    textures: FxHashMap<u32, X>,
    next_id: u32,
    fallback: TextureId,
}

impl<X: DeviceTexture> TextureRegistry<X> {
    /// Create a registry whose first texture is the fallback.
    pub fn with_fallback(fallback: X) -> Self {
        let mut registry = Self {
            textures: FxHashMap::default(),
            next_id: 0,
            fallback: TextureId::NONE,
        };
        registry.fallback = registry.register(fallback);
        registry
    }

    /// Take ownership of a texture and hand out its handle
    pub fn register(&mut self, texture: X) -> TextureId {
        self.next_id += 1;
        let id = self.next_id;
        self.textures.insert(id, texture);
        tracing::debug!("registered texture {}", id);
        TextureId(id)
    }

    pub fn find(&self, id: TextureId) -> Option<&X> {
        self.textures.get(&id.0)
    }

    pub fn find_mut(&mut self, id: TextureId) -> Option<&mut X> {
        self.textures.get_mut(&id.0)
    }

    /// Remove a texture, returning it so the caller can release device memory.
    ///
    /// The fallback texture is never removed.
    pub fn remove(&mut self, id: TextureId) -> Option<X> {
        if id == self.fallback {
            tracing::warn!("refusing to delete fallback texture {}", id.0);
            return None;
        }
        self.textures.remove(&id.0)
    }

    pub fn delete(&mut self, id: TextureId) -> bool {
        self.remove(id).is_some()
    }

    /// The handle actually bound for `id`: itself when present, else the fallback.
    pub fn resolve(&self, id: TextureId) -> TextureId {
        if !id.is_none() && self.textures.contains_key(&id.0) {
            id
        } else {
            self.fallback
        }
    }

    pub fn fallback(&self) -> TextureId {
        self.fallback
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.find(id).map(|t| {
            let info = t.info();
            (info.width, info.height)
        })
    }

    pub fn update(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, data: &[u8]) -> bool {
        match self.find_mut(id) {
            Some(texture) => {
                texture.update(x, y, width, height, data);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl<X: DeviceTexture> TextureLookup for TextureRegistry<X> {
    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.find(id).map(DeviceTexture::info)
    }
}

impl TextureLookup for FxHashMap<TextureId, TextureInfo> {
    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestTexture;

    fn registry() -> TextureRegistry<TestTexture> {
        TextureRegistry::with_fallback(TestTexture::new(1, 1, TextureKind::Alpha, ImageFlags::NONE))
    }

    #[test]
    fn fallback_is_first_handle() {
        let reg = registry();
        assert_eq!(reg.fallback(), TextureId(1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn handles_are_never_reused() {
        let mut reg = registry();
        let a = reg.register(TestTexture::rgba(4, 4));
        assert!(reg.delete(a));
        let b = reg.register(TestTexture::rgba(4, 4));
        assert_ne!(a, b);
        assert!(!reg.delete(a));
    }

    #[test]
    fn resolve_falls_back_for_none_and_missing() {
        let mut reg = registry();
        let a = reg.register(TestTexture::rgba(8, 2));
        assert_eq!(reg.resolve(a), a);
        assert_eq!(reg.resolve(TextureId::NONE), reg.fallback());
        assert_eq!(reg.resolve(TextureId(99)), reg.fallback());
    }

    #[test]
    fn fallback_cannot_be_deleted() {
        let mut reg = registry();
        let fallback = reg.fallback();
        assert!(!reg.delete(fallback));
        assert!(reg.find(fallback).is_some());
    }

    #[test]
    fn update_and_size_go_through_handle() {
        let mut reg = registry();
        let a = reg.register(TestTexture::rgba(16, 8));
        assert_eq!(reg.texture_size(a), Some((16, 8)));
        assert!(reg.update(a, 1, 2, 3, 4, &[0; 16 * 8 * 4]));
        assert_eq!(reg.find(a).unwrap().updates, vec![(1, 2, 3, 4)]);
        assert!(!reg.update(TextureId(42), 0, 0, 1, 1, &[0; 4]));
    }

    #[test]
    fn flags_compose() {
        let f = ImageFlags::FLIP_Y | ImageFlags::PREMULTIPLIED;
        assert!(f.contains(ImageFlags::FLIP_Y));
        assert!(f.contains(ImageFlags::PREMULTIPLIED));
        assert!(!f.contains(ImageFlags::NEAREST));
    }
}
