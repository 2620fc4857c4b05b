//! The boundary between the crate's closed enums and raw `GLenum` values.
//! Inside the crate every target, hint and format is a variant, so an
//! invalid enum can only enter through the `from_gl` constructors, which
//! reject it immediately.

use gl;
use gl::types::*;

use crate::errors::{Error, Result};

/// Classification of a buffer object, selecting the binding-point mutex used
/// for all of its binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    VertexAttributes,
    ElementArray,
    Uniform,
    PixelPack,
    PixelUnpack,
    CopyRead,
    CopyWrite,
    TextureBuffer,
}

impl BufferTarget {
    /// Every classification the layer exposes, in declaration order.
    pub const ALL: [BufferTarget; 8] = [
        BufferTarget::VertexAttributes,
        BufferTarget::ElementArray,
        BufferTarget::Uniform,
        BufferTarget::PixelPack,
        BufferTarget::PixelUnpack,
        BufferTarget::CopyRead,
        BufferTarget::CopyWrite,
        BufferTarget::TextureBuffer,
    ];

    pub fn from_gl(v: GLenum) -> Result<BufferTarget> {
        match v {
            gl::ARRAY_BUFFER => Ok(BufferTarget::VertexAttributes),
            gl::ELEMENT_ARRAY_BUFFER => Ok(BufferTarget::ElementArray),
            gl::UNIFORM_BUFFER => Ok(BufferTarget::Uniform),
            gl::PIXEL_PACK_BUFFER => Ok(BufferTarget::PixelPack),
            gl::PIXEL_UNPACK_BUFFER => Ok(BufferTarget::PixelUnpack),
            gl::COPY_READ_BUFFER => Ok(BufferTarget::CopyRead),
            gl::COPY_WRITE_BUFFER => Ok(BufferTarget::CopyWrite),
            gl::TEXTURE_BUFFER => Ok(BufferTarget::TextureBuffer),
            _ => Err(Error::InvalidEnum(v)),
        }
    }
}

impl From<BufferTarget> for GLenum {
    fn from(target: BufferTarget) -> Self {
        match target {
            BufferTarget::VertexAttributes => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
            BufferTarget::Uniform => gl::UNIFORM_BUFFER,
            BufferTarget::PixelPack => gl::PIXEL_PACK_BUFFER,
            BufferTarget::PixelUnpack => gl::PIXEL_UNPACK_BUFFER,
            BufferTarget::CopyRead => gl::COPY_READ_BUFFER,
            BufferTarget::CopyWrite => gl::COPY_WRITE_BUFFER,
            BufferTarget::TextureBuffer => gl::TEXTURE_BUFFER,
        }
    }
}

/// Declared mutation frequency of a buffer's contents. A wrong hint is a
/// performance signal, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageHint {
    Static,
    Dynamic,
    Stream,
}

impl UsageHint {
    pub fn from_gl(v: GLenum) -> Result<UsageHint> {
        match v {
            gl::STATIC_DRAW => Ok(UsageHint::Static),
            gl::DYNAMIC_DRAW => Ok(UsageHint::Dynamic),
            gl::STREAM_DRAW => Ok(UsageHint::Stream),
            _ => Err(Error::InvalidEnum(v)),
        }
    }
}

impl From<UsageHint> for GLenum {
    fn from(hint: UsageHint) -> Self {
        match hint {
            UsageHint::Static => gl::STATIC_DRAW,
            UsageHint::Dynamic => gl::DYNAMIC_DRAW,
            UsageHint::Stream => gl::STREAM_DRAW,
        }
    }
}

/// Base numeric type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    F32,
    I32,
    U32,
}

impl ElementKind {
    pub fn size(self) -> usize {
        match self {
            ElementKind::F32 | ElementKind::I32 | ElementKind::U32 => 4,
        }
    }
}

impl From<ElementKind> for GLenum {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::F32 => gl::FLOAT,
            ElementKind::I32 => gl::INT,
            ElementKind::U32 => gl::UNSIGNED_INT,
        }
    }
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    U16,
    U32,
}

impl IndexKind {
    pub fn stride(self) -> usize {
        match self {
            IndexKind::U16 => 2,
            IndexKind::U32 => 4,
        }
    }
}

impl From<IndexKind> for GLenum {
    fn from(kind: IndexKind) -> Self {
        match kind {
            IndexKind::U16 => gl::UNSIGNED_SHORT,
            IndexKind::U32 => gl::UNSIGNED_INT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl From<Primitive> for GLenum {
    fn from(primitive: Primitive) -> Self {
        match primitive {
            Primitive::Points => gl::POINTS,
            Primitive::Lines => gl::LINES,
            Primitive::LineStrip => gl::LINE_STRIP,
            Primitive::Triangles => gl::TRIANGLES,
            Primitive::TriangleStrip => gl::TRIANGLE_STRIP,
        }
    }
}

/// Layout of uploaded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    /// `(internal_format, format, pixel_type)` triple for `glTexImage2D`.
    pub fn gl(self) -> (GLenum, GLenum, GLenum) {
        match self {
            PixelFormat::Rgb8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
            PixelFormat::Rgba8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        }
    }
}

/// Storage format of a renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Rgba8,
    Depth24,
    Depth24Stencil8,
}

impl RenderFormat {
    pub fn is_color(self) -> bool {
        match self {
            RenderFormat::Rgba8 => true,
            RenderFormat::Depth24 | RenderFormat::Depth24Stencil8 => false,
        }
    }
}

impl From<RenderFormat> for GLenum {
    fn from(format: RenderFormat) -> Self {
        match format {
            RenderFormat::Rgba8 => gl::RGBA8,
            RenderFormat::Depth24 => gl::DEPTH_COMPONENT24,
            RenderFormat::Depth24Stencil8 => gl::DEPTH24_STENCIL8,
        }
    }
}

/// Attachment point on a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Color(u32),
    Depth,
    DepthStencil,
}

impl From<Attachment> for GLenum {
    fn from(attachment: Attachment) -> Self {
        match attachment {
            Attachment::Color(i) => gl::COLOR_ATTACHMENT0 + i,
            Attachment::Depth => gl::DEPTH_ATTACHMENT,
            Attachment::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_hint_round_trip() {
        assert_eq!(UsageHint::from_gl(gl::STATIC_DRAW).unwrap(), UsageHint::Static);
        assert_eq!(UsageHint::from_gl(gl::STREAM_DRAW).unwrap(), UsageHint::Stream);

        match UsageHint::from_gl(0x1234) {
            Err(Error::InvalidEnum(0x1234)) => {}
            other => panic!("expected invalid-enum, got {:?}", other),
        }
    }

    #[test]
    fn buffer_target_round_trip() {
        for &target in BufferTarget::ALL.iter() {
            let raw: GLenum = target.into();
            assert_eq!(BufferTarget::from_gl(raw).unwrap(), target);
        }
        assert!(BufferTarget::from_gl(gl::TEXTURE_2D).is_err());
    }
}
