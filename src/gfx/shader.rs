//! Shader programs. A [`Program`] owns a linked native program and a
//! memoized table of uniform locations. Uniform references hold a shared
//! back-pointer to the program's current identifier instead of a snapshot,
//! so they stay valid across [`Program::reload`]: the generation counter
//! tells a stale reference to re-resolve before its next use.
//!
//! The program binding is a single slot; `use_program` rejects same-thread
//! re-entry instead of deadlocking on its own lock.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cgmath::{Matrix4, Vector2, Vector3, Vector4};
use gl;
use gl::types::*;

use crate::context;
use crate::errors::{Error, Result};
use crate::gfx::locks::{self, SlotGuard};
use crate::utils::HashValue;

/// A shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
    Geometry,
}

impl Stage {
    fn gl(self) -> GLenum {
        match self {
            Stage::Vertex => gl::VERTEX_SHADER,
            Stage::Fragment => gl::FRAGMENT_SHADER,
            Stage::Geometry => gl::GEOMETRY_SHADER,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Stage::Vertex => write!(f, "vertex"),
            Stage::Fragment => write!(f, "fragment"),
            Stage::Geometry => write!(f, "geometry"),
        }
    }
}

/// Source text for the stages of one program. Vertex and fragment are
/// mandatory, geometry optional.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

impl ProgramSource {
    pub fn new<V, F>(vertex: V, fragment: F) -> ProgramSource
    where
        V: Into<String>,
        F: Into<String>,
    {
        ProgramSource {
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    pub fn with_geometry<G: Into<String>>(mut self, geometry: G) -> ProgramSource {
        self.geometry = Some(geometry.into());
        self
    }

    /// Reads stage sources from `paths`, guessing each stage from the file
    /// extension (`.vert`, `.frag`, `.geom`). Unrecognized extensions are
    /// skipped with a warning.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<ProgramSource> {
        let mut vertex = None;
        let mut fragment = None;
        let mut geometry = None;

        for path in paths {
            let path = path.as_ref();
            let slot = match path.extension().and_then(|e| e.to_str()) {
                Some("vert") => &mut vertex,
                Some("frag") => &mut fragment,
                Some("geom") => &mut geometry,
                _ => {
                    warn!("ignoring shader source {:?}: unknown extension", path);
                    continue;
                }
            };

            let source =
                fs::read_to_string(path).map_err(|_| Error::SourceNotFound(path.into()))?;
            *slot = Some(source);
        }

        Ok(ProgramSource {
            vertex: vertex.ok_or(Error::MissingStage(Stage::Vertex))?,
            fragment: fragment.ok_or(Error::MissingStage(Stage::Fragment))?,
            geometry,
        })
    }
}

/// State shared between a program and its issued uniform references: the
/// current native identifier and the reload generation.
#[derive(Debug)]
struct ProgramShared {
    id: AtomicU32,
    generation: AtomicU64,
}

/// A linked shader program. Move-only; the native program is deleted on
/// drop, and replaced wholesale on reload.
pub struct Program {
    shared: Arc<ProgramShared>,
    locations: Mutex<HashMap<HashValue<str>, GLint>>,
}

impl Program {
    /// Compiles each supplied stage independently and links them. Stage
    /// objects are detached and deleted right after linking; on any failure
    /// nothing native is leaked.
    pub fn new(src: &ProgramSource) -> Result<Program> {
        let id = compile_and_link(src)?;
        info!("created shader program {}", id);

        Ok(Program {
            shared: Arc::new(ProgramShared {
                id: AtomicU32::new(id),
                generation: AtomicU64::new(0),
            }),
            locations: Mutex::new(HashMap::new()),
        })
    }

    /// The current native identifier. Refreshed by reloads, so don't cache
    /// it across calls.
    pub fn id(&self) -> GLuint {
        self.shared.id.load(Ordering::Acquire)
    }

    /// Reload generation, bumped each time the native program is replaced.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Blocks until the program slot is ours, then makes this the active
    /// program. Fails fast with [`Error::ReentrantBind`] if the calling
    /// thread already holds the slot.
    pub fn use_program(&self) -> Result<ProgramBind<'_>> {
        let guard = locks::program_slot().acquire("shader program")?;
        unsafe {
            gl::UseProgram(self.id());
        }

        Ok(ProgramBind {
            program: self,
            _guard: guard,
        })
    }

    /// Resolves `name` into a uniform reference, memoizing the location. A
    /// name the program doesn't define yields a sentinel reference whose
    /// writes are no-ops and whose reads return zero, so optional
    /// per-material uniforms don't crash generic draw code.
    pub fn uniform<T: UniformValue>(&self, name: &str) -> Result<Uniform<T>> {
        let location = self.resolve(name)?;

        Ok(Uniform {
            shared: Arc::clone(&self.shared),
            name: name.to_owned(),
            location: Cell::new(location),
            generation: Cell::new(self.generation()),
            _marker: PhantomData,
        })
    }

    /// As [`Program::uniform`], but a missing uniform is an error.
    pub fn uniform_required<T: UniformValue>(&self, name: &str) -> Result<Uniform<T>> {
        let uniform = self.uniform(name)?;
        if uniform.location.get() == -1 {
            return Err(Error::UniformNotFound(name.to_owned()));
        }
        Ok(uniform)
    }

    /// Compiles and links `src` as a candidate program. On any compile or
    /// link failure the active program is left untouched and the error is
    /// returned. On success the old program is deleted under the program
    /// lock, the identifier swapped, the generation bumped and the location
    /// cache cleared; previously issued uniform references re-resolve on
    /// their next use.
    pub fn reload(&mut self, src: &ProgramSource) -> Result<()> {
        self.reload_with(|| compile_and_link(src))
    }

    /// The reload protocol over an arbitrary candidate producer: nothing is
    /// swapped until `compile` has succeeded, so a failed candidate leaves
    /// the identifier, the generation and the location cache untouched.
    fn reload_with<F>(&mut self, compile: F) -> Result<()>
    where
        F: FnOnce() -> Result<GLuint>,
    {
        let new_id = compile()?;
        let old = match self.promote(new_id) {
            Ok(old) => old,
            Err(err) => {
                unsafe {
                    gl::DeleteProgram(new_id);
                }
                return Err(err);
            }
        };

        if old != 0 {
            unsafe {
                gl::DeleteProgram(old);
            }
        }

        info!("reloaded shader program {} -> {}", old, new_id);
        Ok(())
    }

    /// Installs `new_id` under the program lock: swaps the identifier, bumps
    /// the generation and clears the location cache, returning the previous
    /// identifier. Issued uniform references re-resolve on their next use.
    fn promote(&self, new_id: GLuint) -> Result<GLuint> {
        let _guard = locks::program_slot().acquire("shader program")?;
        let old = self.shared.id.swap(new_id, Ordering::AcqRel);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.locations.lock().unwrap().clear();
        Ok(old)
    }

    fn resolve(&self, name: &str) -> Result<GLint> {
        let hash = name.into();
        let mut locations = self.locations.lock().unwrap();
        if let Some(&location) = locations.get(&hash) {
            return Ok(location);
        }

        let location = resolve_location(self.id(), name)?;
        locations.insert(hash, location);
        Ok(location)
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        let id = self.shared.id.swap(0, Ordering::AcqRel);
        if id != 0 {
            unsafe {
                gl::DeleteProgram(id);
            }
        }
    }
}

/// Scope during which the owning program occupies the program slot.
pub struct ProgramBind<'a> {
    program: &'a Program,
    _guard: SlotGuard<'static>,
}

impl<'a> ProgramBind<'a> {
    pub fn id(&self) -> GLuint {
        self.program.id()
    }
}

impl<'a> Drop for ProgramBind<'a> {
    fn drop(&mut self) {
        unsafe {
            gl::UseProgram(0);
        }
    }
}

/// A host-side value readable/writable through a uniform reference. Writes
/// target the program identifier directly, so no `use_program` is required.
pub trait UniformValue: Copy {
    fn zeroed() -> Self;
    unsafe fn write(program: GLuint, location: GLint, value: Self);
    unsafe fn read(program: GLuint, location: GLint) -> Self;
}

impl UniformValue for f32 {
    fn zeroed() -> Self {
        0.0
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform1f(program, location, value);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = 0.0;
        gl::GetUniformfv(program, location, &mut out);
        out
    }
}

impl UniformValue for i32 {
    fn zeroed() -> Self {
        0
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform1i(program, location, value);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = 0;
        gl::GetUniformiv(program, location, &mut out);
        out
    }
}

impl UniformValue for u32 {
    fn zeroed() -> Self {
        0
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform1ui(program, location, value);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = 0;
        gl::GetUniformuiv(program, location, &mut out);
        out
    }
}

impl UniformValue for Vector2<f32> {
    fn zeroed() -> Self {
        Vector2::new(0.0, 0.0)
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform2f(program, location, value.x, value.y);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = [0.0f32; 2];
        gl::GetUniformfv(program, location, out.as_mut_ptr());
        Vector2::new(out[0], out[1])
    }
}

impl UniformValue for Vector3<f32> {
    fn zeroed() -> Self {
        Vector3::new(0.0, 0.0, 0.0)
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform3f(program, location, value.x, value.y, value.z);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = [0.0f32; 3];
        gl::GetUniformfv(program, location, out.as_mut_ptr());
        Vector3::new(out[0], out[1], out[2])
    }
}

impl UniformValue for Vector4<f32> {
    fn zeroed() -> Self {
        Vector4::new(0.0, 0.0, 0.0, 0.0)
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniform4f(program, location, value.x, value.y, value.z, value.w);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = [0.0f32; 4];
        gl::GetUniformfv(program, location, out.as_mut_ptr());
        Vector4::new(out[0], out[1], out[2], out[3])
    }
}

impl UniformValue for Matrix4<f32> {
    fn zeroed() -> Self {
        Matrix4::new(
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        )
    }

    unsafe fn write(program: GLuint, location: GLint, value: Self) {
        gl::ProgramUniformMatrix4fv(program, location, 1, gl::FALSE, &value.x.x);
    }

    unsafe fn read(program: GLuint, location: GLint) -> Self {
        let mut out = [0.0f32; 16];
        gl::GetUniformfv(program, location, out.as_mut_ptr());
        Matrix4::new(
            out[0], out[1], out[2], out[3], out[4], out[5], out[6], out[7], out[8], out[9],
            out[10], out[11], out[12], out[13], out[14], out[15],
        )
    }
}

/// A named uniform of one program. Holds the shared back-pointer plus a
/// cached location and the generation it was resolved against; if the
/// program has been reloaded since, the location is re-resolved before use.
///
/// A reference whose name the program doesn't define is a sentinel: `set` is
/// a no-op and `get` returns [`UniformValue::zeroed`].
pub struct Uniform<T: UniformValue> {
    shared: Arc<ProgramShared>,
    name: String,
    location: Cell<GLint>,
    generation: Cell<u64>,
    _marker: PhantomData<T>,
}

impl<T: UniformValue> Uniform<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the last resolution found no such uniform.
    pub fn is_missing(&self) -> bool {
        self.location.get() == -1
    }

    /// Writes `value` directly to the program. No `use_program` required.
    pub fn set(&self, value: T) -> Result<()> {
        let location = self.refresh()?;
        if location == -1 {
            return Ok(());
        }

        unsafe {
            T::write(self.shared.id.load(Ordering::Acquire), location, value);
        }
        context::check("glProgramUniform")
    }

    /// Reads the current value back from the program.
    pub fn get(&self) -> Result<T> {
        let location = self.refresh()?;
        if location == -1 {
            return Ok(T::zeroed());
        }

        let value = unsafe { T::read(self.shared.id.load(Ordering::Acquire), location) };
        context::check("glGetUniform")?;
        Ok(value)
    }

    fn refresh(&self) -> Result<GLint> {
        self.refresh_with(|name| {
            resolve_location(self.shared.id.load(Ordering::Acquire), name)
        })
    }

    /// The refresh decision over an arbitrary resolver: the cached location
    /// is served as long as the generation matches, and `resolve` is only
    /// consulted after the program has been replaced.
    fn refresh_with<F>(&self, resolve: F) -> Result<GLint>
    where
        F: FnOnce(&str) -> Result<GLint>,
    {
        let current = self.shared.generation.load(Ordering::Acquire);
        if self.generation.get() != current {
            self.location.set(resolve(&self.name)?);
            self.generation.set(current);
        }
        Ok(self.location.get())
    }
}

fn resolve_location(program: GLuint, name: &str) -> Result<GLint> {
    let c_name =
        CString::new(name.as_bytes()).map_err(|_| Error::UniformNotFound(name.to_owned()))?;
    let location = unsafe { gl::GetUniformLocation(program, c_name.as_ptr()) };
    context::check("glGetUniformLocation")?;
    Ok(location)
}

fn compile_and_link(src: &ProgramSource) -> Result<GLuint> {
    let vs = compile_stage(Stage::Vertex, &src.vertex)?;
    let fs = match compile_stage(Stage::Fragment, &src.fragment) {
        Ok(fs) => fs,
        Err(err) => {
            unsafe {
                gl::DeleteShader(vs);
            }
            return Err(err);
        }
    };
    let gs = match src.geometry {
        Some(ref source) => match compile_stage(Stage::Geometry, source) {
            Ok(gs) => Some(gs),
            Err(err) => {
                unsafe {
                    gl::DeleteShader(vs);
                    gl::DeleteShader(fs);
                }
                return Err(err);
            }
        },
        None => None,
    };

    link(vs, fs, gs)
}

fn compile_stage(stage: Stage, source: &str) -> Result<GLuint> {
    if source.is_empty() {
        return Err(Error::MissingStage(stage));
    }

    let c_src = CString::new(source.as_bytes()).map_err(|_| Error::Compile {
        stage,
        log: "source contains an interior NUL byte".into(),
    })?;

    unsafe {
        let shader = gl::CreateShader(stage.gl());
        gl::ShaderSource(shader, 1, &c_src.as_ptr(), ptr::null());
        gl::CompileShader(shader);

        let mut status = GLint::from(gl::FALSE);
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        if status != GLint::from(gl::TRUE) {
            let log = info_log(shader, gl::GetShaderiv, gl::GetShaderInfoLog);
            gl::DeleteShader(shader);
            return Err(Error::Compile { stage, log });
        }

        Ok(shader)
    }
}

fn link(vs: GLuint, fs: GLuint, gs: Option<GLuint>) -> Result<GLuint> {
    unsafe {
        let program = gl::CreateProgram();
        gl::AttachShader(program, vs);
        gl::AttachShader(program, fs);
        if let Some(gs) = gs {
            gl::AttachShader(program, gs);
        }

        gl::LinkProgram(program);

        // The stages are owned by the program now; release the intermediate
        // objects whether or not linking succeeded.
        gl::DetachShader(program, vs);
        gl::DeleteShader(vs);
        gl::DetachShader(program, fs);
        gl::DeleteShader(fs);
        if let Some(gs) = gs {
            gl::DetachShader(program, gs);
            gl::DeleteShader(gs);
        }

        let mut status = GLint::from(gl::FALSE);
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        if status != GLint::from(gl::TRUE) {
            let log = info_log(program, gl::GetProgramiv, gl::GetProgramInfoLog);
            gl::DeleteProgram(program);
            return Err(Error::Link(log));
        }

        Ok(program)
    }
}

unsafe fn info_log(
    object: GLuint,
    getiv: unsafe fn(GLuint, GLenum, *mut GLint),
    get_log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
) -> String {
    let mut len = 0;
    getiv(object, gl::INFO_LOG_LENGTH, &mut len);
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u8; len as usize];
    let mut written = 0;
    get_log(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinel_uniform<T: UniformValue>() -> Uniform<T> {
        // Generation matches, location resolved to "missing": the reference
        // must behave as an inert sentinel without touching the context.
        Uniform {
            shared: Arc::new(ProgramShared {
                id: AtomicU32::new(0),
                generation: AtomicU64::new(0),
            }),
            name: "u_missing".to_owned(),
            location: Cell::new(-1),
            generation: Cell::new(0),
            _marker: PhantomData,
        }
    }

    #[test]
    fn sentinel_is_inert() {
        let uniform = sentinel_uniform::<f32>();
        assert!(uniform.is_missing());
        assert!(uniform.set(1.5).is_ok());
        assert_eq!(uniform.get().unwrap(), 0.0);

        let uniform = sentinel_uniform::<Vector3<f32>>();
        assert_eq!(uniform.get().unwrap(), Vector3::new(0.0, 0.0, 0.0));
    }

    fn orphan_program(id: u32) -> Program {
        Program {
            shared: Arc::new(ProgramShared {
                id: AtomicU32::new(id),
                generation: AtomicU64::new(0),
            }),
            locations: Mutex::new(HashMap::new()),
        }
    }

    // No native program backs the fabricated identifier; detach it so drop
    // doesn't try to release it.
    fn disarm(program: &Program) {
        program.shared.id.store(0, Ordering::Release);
    }

    #[test]
    fn failed_candidate_leaves_program_untouched() {
        let mut program = orphan_program(9);
        program.locations.lock().unwrap().insert("u_color".into(), 3);

        match program.reload_with(|| {
            Err(Error::Compile {
                stage: Stage::Fragment,
                log: "0:1(1): error: syntax error".into(),
            })
        }) {
            Err(Error::Compile { stage: Stage::Fragment, .. }) => {}
            other => panic!("expected compile failure, got {:?}", other.err()),
        }

        assert_eq!(program.id(), 9);
        assert_eq!(program.generation(), 0);
        assert_eq!(program.locations.lock().unwrap().len(), 1);

        disarm(&program);
    }

    #[test]
    fn promote_bumps_generation_and_clears_cache() {
        let mut program = orphan_program(0);
        program.locations.lock().unwrap().insert("u_color".into(), 3);

        program.reload_with(|| Ok(7)).unwrap();

        assert_eq!(program.id(), 7);
        assert_eq!(program.generation(), 1);
        assert!(program.locations.lock().unwrap().is_empty());

        disarm(&program);
    }

    #[test]
    fn stale_reference_re_resolves_after_reload() {
        let shared = Arc::new(ProgramShared {
            id: AtomicU32::new(0),
            generation: AtomicU64::new(3),
        });
        let uniform = Uniform::<f32> {
            shared,
            name: "u_color".to_owned(),
            location: Cell::new(2),
            generation: Cell::new(2),
            _marker: PhantomData,
        };

        // Behind by one generation: the resolver runs and its answer sticks.
        let resolved = Cell::new(false);
        let location = uniform
            .refresh_with(|name| {
                assert_eq!(name, "u_color");
                resolved.set(true);
                Ok(5)
            })
            .unwrap();
        assert!(resolved.get());
        assert_eq!(location, 5);

        // Caught up now: served from the cache.
        let location = uniform
            .refresh_with(|_| panic!("resolved an up-to-date reference"))
            .unwrap();
        assert_eq!(location, 5);
    }

    #[test]
    fn from_paths_requires_vertex_and_fragment() {
        let empty: [&str; 0] = [];
        match ProgramSource::from_paths(&empty) {
            Err(Error::MissingStage(Stage::Vertex)) => {}
            other => panic!("expected missing vertex stage, got {:?}", other.err()),
        }
    }

    #[test]
    fn from_paths_reports_unreadable_files() {
        match ProgramSource::from_paths(&["no/such/shader.vert", "no/such/shader.frag"]) {
            Err(Error::SourceNotFound(path)) => {
                assert_eq!(path, Path::new("no/such/shader.vert"))
            }
            other => panic!("expected source-not-found, got {:?}", other.err()),
        }
    }
}
