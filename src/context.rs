//! The rendering context itself is a single shared resource: a context must
//! be current on the calling thread before any native call, and only one
//! thread may issue calls at a time. This module owns that top-level lock.
//!
//! Construction is explicit. The windowing collaborator creates the
//! [`Context`] exactly once (passing its proc-address loader), hands
//! references to whoever needs them, and drops it after the last user is
//! gone. There are no hidden init flags.

use std::os::raw::c_void;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{Error, Result};

lazy_static! {
    static ref CONTEXT_LOCK: Mutex<()> = Mutex::new(());
}

/// Witness that the native entry points have been loaded.
///
/// Every resource mutex in [`crate::gfx::locks`] is nested inside this lock's
/// critical section: a render pass acquires the context once, then the
/// per-target locks serialize individual binding points underneath it.
pub struct Context {
    _priv: (),
}

impl Context {
    /// Loads the native entry points through `loader` and returns the
    /// context witness. Must be called with the platform context already
    /// current on this thread.
    pub fn init<F>(mut loader: F) -> Context
    where
        F: FnMut(&str) -> *const c_void,
    {
        gl::load_with(|symbol| loader(symbol));
        info!("loaded OpenGL entry points");
        Context { _priv: () }
    }

    /// Blocks until this thread holds the top-level context lock.
    pub fn acquire(&self) -> ContextCurrent {
        ContextCurrent {
            _guard: CONTEXT_LOCK.lock().unwrap(),
        }
    }
}

/// Scope during which the calling thread is the context thread.
pub struct ContextCurrent {
    _guard: MutexGuard<'static, ()>,
}

/// Probes the context for a pending error code and tags it with the
/// triggering call's label. Compiled to a no-op outside debug builds.
pub fn check(label: &'static str) -> Result<()> {
    if cfg!(debug_assertions) {
        let code = unsafe { gl::GetError() };
        if code != gl::NO_ERROR {
            return Err(Error::Native { label, code });
        }
    }

    Ok(())
}
