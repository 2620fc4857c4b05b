//! Lumen is a small, experimental OpenGL resource layer. It wraps the raw
//! buffer, vertex array, shader, framebuffer and texture objects in move-only
//! handles whose bindings are expressed as scoped guards.
//!
//! The underlying context accepts exactly one active binding per target at a
//! time and is not thread-safe, so every `bind()` acquires a process-wide
//! mutex dedicated to that binding point before touching the context, and
//! releases both the native binding and the mutex when the returned scope is
//! dropped. Single-slot binding points (the shader program and the vertex
//! array) additionally reject same-thread re-entry instead of deadlocking.
//!
//! ```no_run
//! use lumen::prelude::*;
//!
//! # fn run(ctx: &Context) -> lumen::errors::Result<()> {
//! let _current = ctx.acquire();
//!
//! let program = Program::new(&ProgramSource::new(VS, FS))?;
//! let mut vao = VertexArray::new();
//! {
//!     let mut bind = vao.bind()?;
//!     bind.emplace_vertex_attribute(0, 0, 0, VERTICES, UsageHint::Static)?;
//!     bind.emplace_index_buffer(INDICES, UsageHint::Static)?;
//! }
//!
//! let _use = program.use_program()?;
//! vao.bind()?.draw(Primitive::Triangles, 0, 3)?;
//! # Ok(())
//! # }
//! # const VS: &str = ""; const FS: &str = "";
//! # const VERTICES: &[f32] = &[]; const INDICES: &[u32] = &[];
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod context;
pub mod errors;
pub mod gfx;
pub mod utils;

pub mod prelude {
    pub use crate::context::{check, Context, ContextCurrent};
    pub use crate::errors::{Error, Result};
    pub use crate::gfx::buffer::{Buffer, BufferBind};
    pub use crate::gfx::framebuffer::{Framebuffer, Renderbuffer};
    pub use crate::gfx::shader::{Program, ProgramSource, Stage, Uniform};
    pub use crate::gfx::texture::{Texture, TextureFilter, TextureWrap};
    pub use crate::gfx::types::{
        Attachment, BufferTarget, ElementKind, IndexKind, PixelFormat, Primitive, RenderFormat,
        UsageHint,
    };
    pub use crate::gfx::vertex::{AsVertexShape, TypedBuffer, VertexShape};
    pub use crate::gfx::vertex_array::{VertexArray, VertexArrayBind};
}
