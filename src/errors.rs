//! Failure taxonomy of the resource layer. Everything here is a local,
//! synchronous error surfaced to the immediate caller; nothing is retried.

use std::path::PathBuf;

use crate::gfx::shader::Stage;

#[derive(Debug, Fail)]
pub enum Error {
    /// An unacceptable value was specified for an enumerated argument.
    #[fail(display = "Unacceptable value 0x{:X} for an enumerated argument.", _0)]
    InvalidEnum(u32),
    /// A shader stage failed to compile. Carries the offending stage so a
    /// broken fragment shader never masquerades as a vertex problem.
    #[fail(display = "Failed to compile {} shader:\n{}", stage, log)]
    Compile { stage: Stage, log: String },
    #[fail(display = "Failed to link program:\n{}", _0)]
    Link(String),
    /// Linking requires at minimum a vertex and a fragment stage.
    #[fail(display = "Program requires a {} shader.", _0)]
    MissingStage(Stage),
    #[fail(display = "Shader source {:?} is not a readable file.", _0)]
    SourceNotFound(PathBuf),
    #[fail(display = "Uniform \"{}\" is undefined in the program.", _0)]
    UniformNotFound(String),
    #[fail(display = "{}", _0)]
    OutOfRange(String),
    #[fail(display = "Vertex attribute {} is already registered.", _0)]
    AttributeInUse(u32),
    #[fail(display = "Vertex array already has an index buffer.")]
    IndexBufferAttached,
    /// Same-thread re-entry on a single-slot binding point. Surfaced eagerly
    /// instead of letting the thread deadlock on its own lock.
    #[fail(display = "The {} binding is already held by this thread.", _0)]
    ReentrantBind(&'static str),
    #[fail(display = "Framebuffer is incomplete: {}", _0)]
    FramebufferIncomplete(&'static str),
    /// The context reported an error code after a native call. Only probed
    /// in debug builds.
    #[fail(display = "glError 0x{:X} after {}.", code, label)]
    Native { label: &'static str, code: u32 },
}

pub type Result<T> = ::std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", Error::InvalidEnum(0x88EA)),
            "Unacceptable value 0x88EA for an enumerated argument."
        );

        let err = Error::Compile {
            stage: Stage::Fragment,
            log: "0:1(1): error: syntax error".into(),
        };
        assert!(format!("{}", err).starts_with("Failed to compile fragment shader:"));

        assert_eq!(
            format!("{}", Error::ReentrantBind("shader program")),
            "The shader program binding is already held by this thread."
        );

        assert_eq!(
            format!("{}", Error::MissingStage(Stage::Vertex)),
            "Program requires a vertex shader."
        );
    }
}
