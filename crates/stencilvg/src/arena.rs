//! Per-frame geometry arena
//!
//! Vertices, sub-path ranges and uniform slots for one frame live in
//! growable buffers whose lengths are reset between frames while their
//! capacity is kept. Capacity grows geometrically: when a request does not
//! fit, the new capacity is `max(len + n, minimum) + capacity / 2`.

use crate::config::ArenaLimits;
use crate::geometry::{SubPath, Vertex};
use crate::uniforms::FragUniforms;

pub const MIN_VERTICES: usize = 4096;
pub const MIN_PATHS: usize = 128;
pub const MIN_UNIFORM_SLOTS: usize = 128;
pub const MIN_CALLS: usize = 128;

/// A growable buffer measured in fixed-size units.
///
/// Capacity is tracked in units so the growth policy is exact regardless of
/// how much the allocator over-provisions.
#[derive(Debug)]
pub(crate) struct Pool<T> {
    data: Vec<T>,
    capacity: usize,
    unit: usize,
    minimum: usize,
    limit: usize,
    reallocations: usize,
}

impl<T: Clone + Default> Pool<T> {
    pub(crate) fn new(unit: usize, minimum: usize, limit: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity: 0,
            unit: unit.max(1),
            minimum,
            limit,
            reallocations: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len() / self.unit
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Append `n` default units and return the unit offset of the first one.
    pub(crate) fn alloc(&mut self, n: usize) -> Option<usize> {
        let len = self.len();
        let needed = len.checked_add(n)?;
        if needed > self.limit {
            tracing::warn!(
                "arena limit reached: {} + {} exceeds {} units",
                len,
                n,
                self.limit
            );
            return None;
        }

        if needed > self.capacity {
            let grown = needed.max(self.minimum) + self.capacity / 2;
            let new_capacity = grown.min(self.limit);
            let additional = new_capacity.checked_mul(self.unit)? - self.data.len();
            if let Err(e) = self.data.try_reserve_exact(additional) {
                tracing::warn!("arena reservation of {} units failed: {}", new_capacity, e);
                return None;
            }
            self.capacity = new_capacity;
            self.reallocations += 1;
        }

        self.data.resize(needed * self.unit, T::default());
        Some(len)
    }

    /// Drop every unit at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.unit);
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Lengths of every buffer at one point in time, used to undo a failed call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaMark {
    vertices: usize,
    paths: usize,
    uniform_slots: usize,
}

/// Vertex, sub-path and uniform storage for one frame
#[derive(Debug)]
pub struct GeometryArena {
    vertices: Pool<Vertex>,
    paths: Pool<SubPath>,
    uniforms: Pool<u8>,
    stride: usize,
}

impl GeometryArena {
    /// Create an empty arena whose uniform slots are `stride` bytes apart.
    ///
    /// Limits are clamped so every offset fits a `u32` draw range.
    pub fn new(limits: ArenaLimits, stride: usize) -> Self {
        let limits = limits.clamped(stride);
        Self {
            vertices: Pool::new(1, MIN_VERTICES, limits.max_vertices),
            paths: Pool::new(1, MIN_PATHS, limits.max_paths),
            uniforms: Pool::new(stride, MIN_UNIFORM_SLOTS, limits.max_uniform_slots),
            stride: stride.max(1),
        }
    }

    pub fn uniform_stride(&self) -> usize {
        self.stride
    }

    /// Reserve `n` vertices, returning the index of the first.
    pub fn alloc_vertices(&mut self, n: usize) -> Option<usize> {
        self.vertices.alloc(n)
    }

    /// Reserve `n` sub-path records, returning the index of the first.
    pub fn alloc_paths(&mut self, n: usize) -> Option<usize> {
        self.paths.alloc(n)
    }

    /// Reserve `n` uniform slots, returning the byte offset of the first.
    pub fn alloc_uniform_slots(&mut self, n: usize) -> Option<usize> {
        self.uniforms.alloc(n).map(|slot| slot * self.stride)
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        self.vertices.as_mut_slice()
    }

    pub fn paths(&self) -> &[SubPath] {
        self.paths.as_slice()
    }

    pub fn paths_mut(&mut self) -> &mut [SubPath] {
        self.paths.as_mut_slice()
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        self.uniforms.as_slice()
    }

    /// Copy `vertices` into the buffer starting at `offset`.
    pub fn write_vertices(&mut self, offset: usize, vertices: &[Vertex]) {
        self.vertices.as_mut_slice()[offset..offset + vertices.len()].copy_from_slice(vertices);
    }

    /// Store a record at a byte offset returned by [`Self::alloc_uniform_slots`].
    pub fn write_uniforms(&mut self, byte_offset: usize, frag: &FragUniforms) {
        let bytes = bytemuck::bytes_of(frag);
        self.uniforms.as_mut_slice()[byte_offset..byte_offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Read back the record at `byte_offset`
    pub fn uniforms_at(&self, byte_offset: usize) -> FragUniforms {
        let size = std::mem::size_of::<FragUniforms>();
        bytemuck::pod_read_unaligned(&self.uniforms.as_slice()[byte_offset..byte_offset + size])
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn uniform_slot_count(&self) -> usize {
        self.uniforms.len()
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    pub fn path_capacity(&self) -> usize {
        self.paths.capacity()
    }

    pub fn uniform_slot_capacity(&self) -> usize {
        self.uniforms.capacity()
    }

    /// Total buffer reallocations since creation
    pub fn reallocations(&self) -> usize {
        self.vertices.reallocations() + self.paths.reallocations() + self.uniforms.reallocations()
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            vertices: self.vertices.len(),
            paths: self.paths.len(),
            uniform_slots: self.uniforms.len(),
        }
    }

    /// Undo every allocation made after `mark`.
    pub fn rollback(&mut self, mark: ArenaMark) {
        self.vertices.truncate(mark.vertices);
        self.paths.truncate(mark.paths);
        self.uniforms.truncate(mark.uniform_slots);
    }

    /// Reset all lengths to zero, keeping capacity.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.paths.clear();
        self.uniforms.clear();
    }
}
