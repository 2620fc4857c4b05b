//! 2D textures. Binding the texture target and activating a texture unit
//! are independent lock domains: [`Texture::bind`] serializes work against
//! the 2D target (uploads, parameters), while [`Texture::activate`] holds a
//! unit's dedicated lock for the whole scope and takes the target lock only
//! transiently while issuing the activation calls. Any number of units can
//! therefore be active at once, and a same-thread re-activation of a held
//! unit fails fast instead of hanging.

use gl;
use gl::types::*;

use crate::context;
use crate::errors::{Error, Result};
use crate::gfx::locks::{self, SlotGuard};
use crate::gfx::types::PixelFormat;

pub use crate::gfx::locks::MAX_TEXTURE_UNITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Clamp,
    Repeat,
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Clamp => gl::CLAMP_TO_EDGE,
            TextureWrap::Repeat => gl::REPEAT,
        }
    }
}

/// A native 2D texture object. Move-only; released on drop.
#[derive(Debug)]
pub struct Texture {
    id: GLuint,
    dimensions: Option<(u32, u32)>,
}

impl Default for Texture {
    fn default() -> Self {
        Texture::new()
    }
}

impl Texture {
    pub fn new() -> Texture {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
        }
        debug_assert!(id != 0);

        Texture {
            id,
            dimensions: None,
        }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    /// `(width, height)` of the last upload, if any.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Blocks until the 2D texture target is ours, then binds. Unit-agnostic;
    /// use this for uploads and parameter changes. Fails fast with
    /// [`Error::ReentrantBind`] if this thread already holds the target.
    pub fn bind(&mut self) -> Result<TextureBind<'_>> {
        let guard = locks::texture_lock().acquire("texture target")?;
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.id);
        }

        Ok(TextureBind {
            texture: self,
            _guard: guard,
        })
    }

    /// Selects texture unit `unit` and binds this texture to it. The range
    /// check runs before any native call: an out-of-range unit is a range
    /// error and the context is never touched.
    ///
    /// Only the unit's lock is held for the returned scope; the target lock
    /// is released as soon as the activation calls are issued, so other
    /// units stay activatable while this one is in use.
    pub fn activate(&mut self, unit: usize) -> Result<TextureActive<'_>> {
        let unit_guard = locks::unit_lock(unit)?.acquire("texture unit")?;
        {
            let _target = locks::texture_lock().acquire("texture target")?;
            unsafe {
                gl::ActiveTexture(gl::TEXTURE0 + unit as GLenum);
                gl::BindTexture(gl::TEXTURE_2D, self.id);
            }
        }

        Ok(TextureActive {
            texture: self,
            unit,
            _unit_guard: unit_guard,
        })
    }

    /// Uploads `pixels` and records the dimensions, acquiring a bind scope
    /// internally.
    pub fn upload(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        self.bind()?.upload(pixels, width, height, format)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe {
                gl::DeleteTextures(1, &self.id);
            }
        }
    }
}

/// Scope during which the owning texture occupies the 2D texture target.
pub struct TextureBind<'a> {
    texture: &'a mut Texture,
    _guard: SlotGuard<'static>,
}

impl<'a> TextureBind<'a> {
    pub fn id(&self) -> GLuint {
        self.texture.id
    }

    pub fn upload(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() < expected {
            return Err(Error::OutOfRange(format!(
                "Texture upload of {} bytes is short of the {} required for {}x{}.",
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        let (internal, layout, pixel_type) = format.gl();
        let ptr = if pixels.is_empty() {
            std::ptr::null()
        } else {
            pixels.as_ptr() as *const GLvoid
        };

        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                internal as GLint,
                width as GLsizei,
                height as GLsizei,
                0,
                layout,
                pixel_type,
                ptr,
            );
        }
        context::check("glTexImage2D")?;

        self.texture.dimensions = Some((width, height));
        Ok(())
    }

    pub fn set_filter(&mut self, filter: TextureFilter) -> Result<()> {
        let filter = match filter {
            TextureFilter::Nearest => gl::NEAREST,
            TextureFilter::Linear => gl::LINEAR,
        };

        unsafe {
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter as GLint);
        }
        context::check("glTexParameteri")
    }

    pub fn set_wrap(&mut self, wrap: TextureWrap) -> Result<()> {
        let wrap: GLenum = wrap.into();
        unsafe {
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap as GLint);
        }
        context::check("glTexParameteri")
    }
}

impl<'a> Drop for TextureBind<'a> {
    fn drop(&mut self) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }
}

/// Scope during which the owning texture is bound to an activated unit.
/// Holds only that unit's lock, so scopes for different units coexist.
pub struct TextureActive<'a> {
    texture: &'a Texture,
    unit: usize,
    _unit_guard: SlotGuard<'static>,
}

impl<'a> TextureActive<'a> {
    pub fn id(&self) -> GLuint {
        self.texture.id
    }

    /// The activated unit index, e.g. for a sampler uniform.
    pub fn unit(&self) -> usize {
        self.unit
    }
}

impl<'a> Drop for TextureActive<'a> {
    fn drop(&mut self) {
        // Transient, as during activation. A same-thread holder means the
        // target is already serialized to us; proceed without the guard.
        let _target = locks::texture_lock().acquire("texture target").ok();
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + self.unit as GLenum);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }
}
