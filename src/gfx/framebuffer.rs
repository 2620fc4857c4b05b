//! Framebuffers and renderbuffers, each following the same scoped-bind
//! pattern as the rest of the layer with their own binding-point mutexes.

use gl;
use gl::types::*;

use crate::context;
use crate::errors::{Error, Result};
use crate::gfx::locks;
use crate::gfx::texture::Texture;
use crate::gfx::types::{Attachment, RenderFormat};

/// A native renderbuffer object: raster storage usable as a framebuffer
/// attachment but never sampled.
#[derive(Debug)]
pub struct Renderbuffer {
    id: GLuint,
    dimensions: Option<(u32, u32)>,
}

impl Default for Renderbuffer {
    fn default() -> Self {
        Renderbuffer::new()
    }
}

impl Renderbuffer {
    pub fn new() -> Renderbuffer {
        let mut id = 0;
        unsafe {
            gl::GenRenderbuffers(1, &mut id);
        }
        debug_assert!(id != 0);

        Renderbuffer {
            id,
            dimensions: None,
        }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn bind(&mut self) -> RenderbufferBind<'_> {
        let guard = locks::renderbuffer_lock().lock().unwrap();
        unsafe {
            gl::BindRenderbuffer(gl::RENDERBUFFER, self.id);
        }

        RenderbufferBind {
            renderbuffer: self,
            _guard: guard,
        }
    }

    /// Allocates storage, acquiring a bind scope internally.
    pub fn storage(&mut self, width: u32, height: u32, format: RenderFormat) -> Result<()> {
        self.bind().storage(width, height, format)
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe {
                gl::DeleteRenderbuffers(1, &self.id);
            }
        }
    }
}

/// Scope during which the owning renderbuffer occupies its binding point.
pub struct RenderbufferBind<'a> {
    renderbuffer: &'a mut Renderbuffer,
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl<'a> RenderbufferBind<'a> {
    pub fn id(&self) -> GLuint {
        self.renderbuffer.id
    }

    pub fn storage(&mut self, width: u32, height: u32, format: RenderFormat) -> Result<()> {
        unsafe {
            gl::RenderbufferStorage(
                gl::RENDERBUFFER,
                format.into(),
                width as GLsizei,
                height as GLsizei,
            );
        }
        context::check("glRenderbufferStorage")?;

        self.renderbuffer.dimensions = Some((width, height));
        Ok(())
    }
}

impl<'a> Drop for RenderbufferBind<'a> {
    fn drop(&mut self) {
        unsafe {
            gl::BindRenderbuffer(gl::RENDERBUFFER, 0);
        }
    }
}

/// A native framebuffer object: a render target assembled from texture and
/// renderbuffer attachments.
#[derive(Debug)]
pub struct Framebuffer {
    id: GLuint,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        let mut id = 0;
        unsafe {
            gl::GenFramebuffers(1, &mut id);
        }
        debug_assert!(id != 0);

        Framebuffer { id }
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn bind(&mut self) -> FramebufferBind<'_> {
        let guard = locks::framebuffer_lock().lock().unwrap();
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.id);
        }

        FramebufferBind {
            _framebuffer: self,
            _guard: guard,
        }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe {
                gl::DeleteFramebuffers(1, &self.id);
            }
        }
    }
}

/// Scope during which the owning framebuffer occupies its binding point.
pub struct FramebufferBind<'a> {
    _framebuffer: &'a mut Framebuffer,
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl<'a> FramebufferBind<'a> {
    /// Attaches `renderbuffer` at `attachment`. A color attachment needs a
    /// color-renderable format and vice versa.
    pub fn attach_renderbuffer(
        &mut self,
        attachment: Attachment,
        renderbuffer: &Renderbuffer,
    ) -> Result<()> {
        unsafe {
            gl::FramebufferRenderbuffer(
                gl::FRAMEBUFFER,
                attachment.into(),
                gl::RENDERBUFFER,
                renderbuffer.id(),
            );
        }
        context::check("glFramebufferRenderbuffer")
    }

    /// Attaches mip level 0 of `texture` at `attachment`.
    pub fn attach_texture(&mut self, attachment: Attachment, texture: &Texture) -> Result<()> {
        unsafe {
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                attachment.into(),
                gl::TEXTURE_2D,
                texture.id(),
                0,
            );
        }
        context::check("glFramebufferTexture2D")
    }

    /// Queries completeness of the current attachment set.
    pub fn status(&self) -> Result<()> {
        let status = unsafe { gl::CheckFramebufferStatus(gl::FRAMEBUFFER) };
        match status {
            gl::FRAMEBUFFER_COMPLETE => Ok(()),
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Err(Error::FramebufferIncomplete(
                "at least one attachment point is attachment-incomplete",
            )),
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                Err(Error::FramebufferIncomplete("no images are attached"))
            }
            gl::FRAMEBUFFER_UNSUPPORTED => Err(Error::FramebufferIncomplete(
                "the combination of internal formats is unsupported",
            )),
            _ => Err(Error::FramebufferIncomplete("unknown status")),
        }
    }
}

impl<'a> Drop for FramebufferBind<'a> {
    fn drop(&mut self) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        }
    }
}
