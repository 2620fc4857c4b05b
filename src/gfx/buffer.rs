//! Buffer objects. A [`Buffer`] exclusively owns one native buffer; binding
//! it blocks on the mutex of its target classification and yields a
//! [`BufferBind`] whose drop releases both the native binding and the lock.

use std::ptr;

use gl;
use gl::types::*;

use crate::context;
use crate::errors::Result;
use crate::gfx::locks;
use crate::gfx::types::{BufferTarget, UsageHint};

/// A native buffer object. Move-only; the native object is released on drop.
#[derive(Debug)]
pub struct Buffer {
    id: GLuint,
    target: BufferTarget,
    size: usize,
}

impl Buffer {
    /// Allocates a native buffer classified against `target`. The
    /// classification selects the binding-point mutex used by every
    /// subsequent bind.
    pub fn new(target: BufferTarget) -> Buffer {
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
        }
        debug_assert!(id != 0);

        Buffer {
            id,
            target,
            size: 0,
        }
    }

    /// A handle with no native object behind it, for bookkeeping tests.
    #[cfg(test)]
    pub(crate) fn detached(target: BufferTarget) -> Buffer {
        Buffer {
            id: 0,
            target,
            size: 0,
        }
    }

    /// The raw identifier. Never pass this to a call that reads the current
    /// binding; anything context-sensitive must go through [`Buffer::bind`].
    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Byte size of the last upload.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reclassifies the buffer. A no-op when the target is unchanged; the
    /// contents are kept but not re-uploaded.
    pub fn set_target(&mut self, target: BufferTarget) {
        if self.target == target {
            return;
        }
        self.target = target;
    }

    /// Blocks until the target's binding point is ours, then binds.
    pub fn bind(&mut self) -> BufferBind<'_> {
        let guard = locks::buffer_lock(self.target).lock().unwrap();
        let raw: GLenum = self.target.into();
        unsafe {
            gl::BindBuffer(raw, self.id);
        }

        BufferBind {
            buffer: self,
            _guard: guard,
        }
    }

    /// Uploads `data`, acquiring a bind scope internally. A zero-length
    /// upload is legal and clears the storage.
    pub fn upload(&mut self, data: &[u8], usage: UsageHint) -> Result<()> {
        self.bind().upload(data, usage)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe {
                gl::DeleteBuffers(1, &self.id);
            }
        }
    }
}

/// Scope during which the owning buffer occupies its binding point.
pub struct BufferBind<'a> {
    buffer: &'a mut Buffer,
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl<'a> BufferBind<'a> {
    pub fn id(&self) -> GLuint {
        self.buffer.id
    }

    pub fn target(&self) -> BufferTarget {
        self.buffer.target
    }

    pub fn size(&self) -> usize {
        self.buffer.size
    }

    /// Replaces the buffer's storage and records the byte size for later
    /// element-count derivation.
    pub fn upload(&mut self, data: &[u8], usage: UsageHint) -> Result<()> {
        let raw: GLenum = self.buffer.target.into();
        let ptr = if data.is_empty() {
            ptr::null()
        } else {
            data.as_ptr() as *const GLvoid
        };

        unsafe {
            gl::BufferData(raw, data.len() as GLsizeiptr, ptr, usage.into());
        }
        context::check("glBufferData")?;

        self.buffer.size = data.len();
        Ok(())
    }
}

impl<'a> Drop for BufferBind<'a> {
    fn drop(&mut self) {
        let raw: GLenum = self.buffer.target.into();
        unsafe {
            gl::BindBuffer(raw, 0);
        }
    }
}
