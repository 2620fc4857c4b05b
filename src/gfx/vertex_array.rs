//! Vertex array objects. A [`VertexArray`] owns the native identifier plus
//! an arena of attached buffers; records are addressed by arena index, never
//! by raw address, so growth of the collection can never invalidate an
//! attribute registration that was already issued to the context.
//!
//! The vertex-array binding is a single slot, guarded by a [`SlotLock`] so
//! same-thread re-entry errors out instead of hanging.
//!
//! [`SlotLock`]: crate::gfx::locks::SlotLock

use gl;
use gl::types::*;
use smallvec::SmallVec;

use crate::context;
use crate::errors::{Error, Result};
use crate::gfx::buffer::Buffer;
use crate::gfx::locks::{self, SlotGuard};
use crate::gfx::types::{BufferTarget, IndexKind, Primitive, UsageHint};
use crate::gfx::vertex::{AsVertexShape, TypedBuffer, VertexShape};

/// One record in the attached-buffer arena: either a vertex-attribute buffer
/// or the (at most one) index buffer. A tagged variant carrying the element
/// shape as data, not a layout-punned view.
#[derive(Debug)]
pub enum AttachedBuffer {
    Vertex {
        buffer: Buffer,
        shape: VertexShape,
        index: u32,
        stride: i32,
        offset: usize,
        count: usize,
    },
    Index {
        buffer: Buffer,
        kind: IndexKind,
        count: usize,
    },
}

/// Index element types accepted by [`VertexArrayBind::emplace_index_buffer`].
pub trait AsIndexKind: Copy {
    const KIND: IndexKind;
}

impl AsIndexKind for u16 {
    const KIND: IndexKind = IndexKind::U16;
}

impl AsIndexKind for u32 {
    const KIND: IndexKind = IndexKind::U32;
}

/// A native vertex-array object plus the buffers attached to it.
#[derive(Debug)]
pub struct VertexArray {
    id: GLuint,
    attached: SmallVec<[AttachedBuffer; 8]>,
    index_slot: Option<usize>,
}

impl Default for VertexArray {
    fn default() -> Self {
        VertexArray::new()
    }
}

impl VertexArray {
    pub fn new() -> VertexArray {
        let mut id = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut id);
        }
        debug_assert!(id != 0);

        VertexArray {
            id,
            attached: SmallVec::new(),
            index_slot: None,
        }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    /// Number of attached buffer records, the index buffer included.
    pub fn attachments(&self) -> usize {
        self.attached.len()
    }

    /// The record at arena position `slot`, as returned by the emplace
    /// operations. Positions are stable across growth.
    pub fn attachment(&self, slot: usize) -> Option<&AttachedBuffer> {
        self.attached.get(slot)
    }

    /// Blocks until the vertex-array slot is ours, then binds. Fails fast
    /// with [`Error::ReentrantBind`] if this thread already holds the slot.
    pub fn bind(&mut self) -> Result<VertexArrayBind<'_>> {
        let guard = locks::vertex_array_slot().acquire("vertex array")?;
        unsafe {
            gl::BindVertexArray(self.id);
        }

        Ok(VertexArrayBind {
            vao: self,
            _guard: guard,
        })
    }

    fn attribute_registered(&self, index: u32) -> bool {
        self.attached.iter().any(|record| match record {
            AttachedBuffer::Vertex { index: i, .. } => *i == index,
            AttachedBuffer::Index { .. } => false,
        })
    }

    /// Appends `record` to the arena and returns its position. Enforces the
    /// uniqueness invariants (one record per attribute index, at most one
    /// index buffer); pure bookkeeping, no native calls.
    fn register(&mut self, record: AttachedBuffer) -> Result<usize> {
        match record {
            AttachedBuffer::Vertex { index, .. } => {
                if self.attribute_registered(index) {
                    return Err(Error::AttributeInUse(index));
                }
            }
            AttachedBuffer::Index { .. } => {
                if self.index_slot.is_some() {
                    return Err(Error::IndexBufferAttached);
                }
            }
        }

        let slot = self.attached.len();
        if let AttachedBuffer::Index { .. } = record {
            self.index_slot = Some(slot);
        }
        self.attached.push(record);
        Ok(slot)
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe {
                gl::DeleteVertexArrays(1, &self.id);
            }
        }
    }
}

/// Number of whole vertices an attribute can address in `bytes` of storage,
/// honoring the registered layout: vertex `i` reads `shape.stride()` bytes
/// at `offset + i * stride`. A zero stride means tight packing.
fn vertex_capacity(bytes: usize, shape: VertexShape, stride: i32, offset: usize) -> usize {
    let element = shape.stride();
    let stride = if stride > 0 { stride as usize } else { element };
    let usable = bytes.saturating_sub(offset);
    if usable < element {
        0
    } else {
        1 + (usable - element) / stride
    }
}

/// Validates that a draw of `count` elements starting at `first` stays within
/// the `total` elements actually uploaded.
fn draw_bounds(first: usize, count: usize, total: usize) -> Result<()> {
    if first.checked_add(count).map_or(true, |end| end > total) {
        return Err(Error::OutOfRange(format!(
            "Draw of {} elements at offset {} exceeds the {} uploaded.",
            count, first, total
        )));
    }
    Ok(())
}

/// Scope during which the owning vertex array occupies the single
/// vertex-array slot. Attribute registration and draws happen here.
pub struct VertexArrayBind<'a> {
    vao: &'a mut VertexArray,
    _guard: SlotGuard<'static>,
}

impl<'a> VertexArrayBind<'a> {
    pub fn id(&self) -> GLuint {
        self.vao.id
    }

    /// Creates a typed vertex buffer owned by the vertex array, uploads
    /// `data` into it, registers it in the arena and issues the attribute
    /// pointer and enable calls under a nested buffer bind. Returns the
    /// arena position of the new record.
    ///
    /// Attribute indices are caller-assigned (0 = position by convention)
    /// and must be unique per vertex array.
    pub fn emplace_vertex_attribute<T: AsVertexShape>(
        &mut self,
        index: u32,
        stride: i32,
        offset: usize,
        data: &[T],
        usage: UsageHint,
    ) -> Result<usize> {
        if self.vao.attribute_registered(index) {
            return Err(Error::AttributeInUse(index));
        }

        let mut typed = TypedBuffer::<T>::new(BufferTarget::VertexAttributes);
        typed.upload_slice(data, usage)?;
        let shape = typed.shape();
        // Interleaved layouts address fewer vertices than raw elements; the
        // draw bound has to come from the registered stride and offset.
        let count = vertex_capacity(typed.buffer().size(), shape, stride, offset);

        {
            // The attribute pointer call reads the buffer binding current at
            // the time of the call; the scope only needs to outlive it.
            let _bind = typed.buffer_mut().bind();
            unsafe {
                gl::EnableVertexAttribArray(index);
                gl::VertexAttribPointer(
                    index,
                    shape.components as GLint,
                    shape.kind.into(),
                    gl::FALSE,
                    stride,
                    offset as *const GLvoid,
                );
            }
            context::check("glVertexAttribPointer")?;
        }

        self.vao.register(AttachedBuffer::Vertex {
            buffer: typed.into_inner(),
            shape,
            index,
            stride,
            offset,
            count,
        })
    }

    /// Creates and uploads the index buffer. A vertex array has at most one.
    pub fn emplace_index_buffer<T: AsIndexKind>(
        &mut self,
        data: &[T],
        usage: UsageHint,
    ) -> Result<usize> {
        if self.vao.index_slot.is_some() {
            return Err(Error::IndexBufferAttached);
        }

        let mut buffer = Buffer::new(BufferTarget::ElementArray);
        let bytes = unsafe {
            std::slice::from_raw_parts(
                data.as_ptr() as *const u8,
                data.len() * std::mem::size_of::<T>(),
            )
        };
        buffer.upload(bytes, usage)?;

        self.vao.register(AttachedBuffer::Index {
            buffer,
            kind: T::KIND,
            count: data.len(),
        })
    }

    /// Issues a draw call bounded by what was actually uploaded: indexed if
    /// an index buffer is attached, plain otherwise. `first` and `count` are
    /// in elements.
    pub fn draw(&mut self, primitive: Primitive, first: usize, count: usize) -> Result<()> {
        if let Some(slot) = self.vao.index_slot {
            let (buffer, kind, total) = match &mut self.vao.attached[slot] {
                AttachedBuffer::Index {
                    buffer,
                    kind,
                    count,
                } => (buffer, *kind, *count),
                AttachedBuffer::Vertex { .. } => unreachable!(),
            };
            draw_bounds(first, count, total)?;

            // The element-array binding is read at draw time; keep the index
            // buffer's scope alive across the call.
            let _bind = buffer.bind();
            unsafe {
                gl::DrawElements(
                    primitive.into(),
                    count as GLsizei,
                    kind.into(),
                    (first * kind.stride()) as *const GLvoid,
                );
            }
            context::check("glDrawElements")
        } else {
            let total = self
                .vao
                .attached
                .iter()
                .filter_map(|record| match record {
                    AttachedBuffer::Vertex { count, .. } => Some(*count),
                    AttachedBuffer::Index { .. } => None,
                })
                .min()
                .ok_or_else(|| {
                    Error::OutOfRange("Vertex array has no attached buffers.".into())
                })?;
            draw_bounds(first, count, total)?;

            unsafe {
                gl::DrawArrays(primitive.into(), first as GLint, count as GLsizei);
            }
            context::check("glDrawArrays")
        }
    }
}

impl<'a> Drop for VertexArrayBind<'a> {
    fn drop(&mut self) {
        unsafe {
            gl::BindVertexArray(0);
        }
    }
}
