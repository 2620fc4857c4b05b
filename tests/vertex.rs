extern crate cgmath;
extern crate lumen;

use cgmath::{Vector2, Vector3};

use lumen::gfx::types::ElementKind;
use lumen::gfx::vertex::{element_count, AsVertexShape, VertexShape};

#[test]
fn supported_shapes() {
    assert_eq!(
        f32::SHAPE,
        VertexShape {
            kind: ElementKind::F32,
            components: 1
        }
    );
    assert_eq!(
        Vector2::<f32>::SHAPE,
        VertexShape {
            kind: ElementKind::F32,
            components: 2
        }
    );
    assert_eq!(
        Vector3::<f32>::SHAPE,
        VertexShape {
            kind: ElementKind::F32,
            components: 3
        }
    );
    assert_eq!(i32::SHAPE.kind, ElementKind::I32);
    assert_eq!(u32::SHAPE.kind, ElementKind::U32);
}

#[test]
fn element_count_derivation() {
    // Three float-vec3 vertices are 36 bytes.
    assert_eq!(element_count(36, Vector3::<f32>::SHAPE), 3);

    // A zero-byte upload clears the storage.
    assert_eq!(element_count(0, Vector3::<f32>::SHAPE), 0);

    assert_eq!(element_count(24, Vector2::<f32>::SHAPE), 3);
    assert_eq!(element_count(24, f32::SHAPE), 6);
}
