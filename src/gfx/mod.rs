//! Move-only handles over the native graphics objects, each exposing its
//! binding as a scoped guard that owns the corresponding binding-point lock.

pub mod buffer;
pub mod framebuffer;
pub mod locks;
pub mod shader;
pub mod texture;
pub mod types;
pub mod vertex;
pub mod vertex_array;
