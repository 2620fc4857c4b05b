//! Typed views over buffers. A [`TypedBuffer`] pins an element shape (base
//! numeric kind plus components per element) to a [`Buffer`], so uploads and
//! attribute registration derive their native format from the element type
//! at compile time. Unsupported element types simply don't implement
//! [`AsVertexShape`] and fail to compile.

use std::marker::PhantomData;
use std::mem;
use std::slice;

use cgmath::{Vector2, Vector3};

use crate::errors::Result;
use crate::gfx::buffer::Buffer;
use crate::gfx::types::{BufferTarget, ElementKind, UsageHint};

/// Shape of one vertex element, carried as data rather than leaning on
/// memory-layout punning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexShape {
    pub kind: ElementKind,
    pub components: u32,
}

impl VertexShape {
    /// Byte size of one element.
    pub fn stride(&self) -> usize {
        self.kind.size() * self.components as usize
    }
}

/// Elements uploaded through this view per the recorded byte size.
pub fn element_count(bytes: usize, shape: VertexShape) -> usize {
    bytes / shape.stride()
}

mod sealed {
    pub trait Sealed {}
}

/// Maps an element type to its [`VertexShape`]. Sealed: the mapping is total
/// over exactly the types the layer supports.
pub trait AsVertexShape: sealed::Sealed + Copy {
    const SHAPE: VertexShape;
}

macro_rules! impl_vertex_shape {
    ($t:ty, $kind:expr, $components:expr) => {
        impl sealed::Sealed for $t {}
        impl AsVertexShape for $t {
            const SHAPE: VertexShape = VertexShape {
                kind: $kind,
                components: $components,
            };
        }
    };
}

impl_vertex_shape!(f32, ElementKind::F32, 1);
impl_vertex_shape!(i32, ElementKind::I32, 1);
impl_vertex_shape!(u32, ElementKind::U32, 1);
impl_vertex_shape!(Vector2<f32>, ElementKind::F32, 2);
impl_vertex_shape!(Vector3<f32>, ElementKind::F32, 3);

/// A buffer annotated with its element shape.
#[derive(Debug)]
pub struct TypedBuffer<T: AsVertexShape> {
    buffer: Buffer,
    _marker: PhantomData<T>,
}

impl<T: AsVertexShape> TypedBuffer<T> {
    pub fn new(target: BufferTarget) -> TypedBuffer<T> {
        TypedBuffer {
            buffer: Buffer::new(target),
            _marker: PhantomData,
        }
    }

    pub fn shape(&self) -> VertexShape {
        T::SHAPE
    }

    /// Uploads `elements` as raw bytes under an internally acquired bind.
    pub fn upload_slice(&mut self, elements: &[T], usage: UsageHint) -> Result<()> {
        let bytes = unsafe {
            slice::from_raw_parts(
                elements.as_ptr() as *const u8,
                elements.len() * mem::size_of::<T>(),
            )
        };
        self.buffer.upload(bytes, usage)
    }

    /// Uploaded byte size divided by the element stride.
    pub fn element_count(&self) -> usize {
        element_count(self.buffer.size(), T::SHAPE)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn into_inner(self) -> Buffer {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(f32::SHAPE, VertexShape { kind: ElementKind::F32, components: 1 });
        assert_eq!(i32::SHAPE, VertexShape { kind: ElementKind::I32, components: 1 });
        assert_eq!(u32::SHAPE, VertexShape { kind: ElementKind::U32, components: 1 });
        assert_eq!(
            Vector2::<f32>::SHAPE,
            VertexShape { kind: ElementKind::F32, components: 2 }
        );
        assert_eq!(
            Vector3::<f32>::SHAPE,
            VertexShape { kind: ElementKind::F32, components: 3 }
        );

        // The shape stride and the host layout must agree for raw uploads.
        assert_eq!(Vector3::<f32>::SHAPE.stride(), mem::size_of::<Vector3<f32>>());
    }

    #[test]
    fn element_counts() {
        // Three float-vec3 vertices occupy 36 bytes.
        assert_eq!(element_count(36, Vector3::<f32>::SHAPE), 3);
        assert_eq!(element_count(0, Vector3::<f32>::SHAPE), 0);
        assert_eq!(element_count(8, Vector2::<f32>::SHAPE), 1);
        assert_eq!(element_count(4, f32::SHAPE), 1);
    }
}
