extern crate gl;
extern crate lumen;

use lumen::errors::Error;
use lumen::gfx::locks::{unit_lock, MAX_TEXTURE_UNITS};
use lumen::gfx::shader::Stage;
use lumen::gfx::types::UsageHint;

#[test]
fn usage_hint_boundary() {
    assert_eq!(UsageHint::from_gl(gl::STATIC_DRAW).unwrap(), UsageHint::Static);
    assert_eq!(UsageHint::from_gl(gl::DYNAMIC_DRAW).unwrap(), UsageHint::Dynamic);
    assert_eq!(UsageHint::from_gl(gl::STREAM_DRAW).unwrap(), UsageHint::Stream);

    match UsageHint::from_gl(gl::TEXTURE_2D) {
        Err(Error::InvalidEnum(v)) => assert_eq!(v, gl::TEXTURE_2D),
        other => panic!("expected invalid-enum, got {:?}", other),
    }
}

#[test]
fn texture_unit_out_of_range() {
    // Unit 40 with a maximum of 32: rejected before any native call is
    // issued, which is also why this test runs without a context.
    match unit_lock(40) {
        Err(Error::OutOfRange(msg)) => assert!(msg.contains("40")),
        Err(err) => panic!("unexpected error: {}", err),
        Ok(_) => panic!("expected range error"),
    }

    assert!(unit_lock(MAX_TEXTURE_UNITS - 1).is_ok());
    assert!(unit_lock(MAX_TEXTURE_UNITS).is_err());
}

#[test]
fn error_display() {
    let err = Error::Compile {
        stage: Stage::Fragment,
        log: "0:3(12): error: syntax error, unexpected ';'".into(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("fragment"));
    assert!(msg.contains("syntax error"));

    assert_eq!(
        format!("{}", Error::ReentrantBind("vertex array")),
        "The vertex array binding is already held by this thread."
    );

    assert_eq!(
        format!("{}", Error::Native { label: "glBufferData", code: 0x0501 }),
        "glError 0x501 after glBufferData."
    );
}
