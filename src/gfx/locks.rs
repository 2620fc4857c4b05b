//! The scoped lock registry: one process-lifetime mutex per logical binding
//! point. Holding the mutex is a precondition for issuing the corresponding
//! native bind call, and every bind scope in this crate keeps the guard alive
//! for exactly the validity window of the binding.
//!
//! The table is built once and never mutated; lookups are pure. The
//! single-slot binding points (shader program, vertex array, the 2D texture
//! target and each texture unit) use [`SlotLock`] instead of a bare mutex so
//! that same-thread re-entry fails fast with [`Error::ReentrantBind`] rather
//! than deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{Error, Result};
use crate::gfx::types::BufferTarget;

/// Number of texture units the layer exposes. Activating a unit at or above
/// this bound is a range error and performs no native call.
pub const MAX_TEXTURE_UNITS: usize = 32;

lazy_static! {
    static ref VERTEX_ATTRIBUTES: Mutex<()> = Mutex::new(());
    static ref ELEMENT_ARRAY: Mutex<()> = Mutex::new(());
    static ref UNIFORM: Mutex<()> = Mutex::new(());
    static ref PIXEL_PACK: Mutex<()> = Mutex::new(());
    static ref PIXEL_UNPACK: Mutex<()> = Mutex::new(());
    static ref COPY_READ: Mutex<()> = Mutex::new(());
    static ref COPY_WRITE: Mutex<()> = Mutex::new(());
    static ref TEXTURE_BUFFER: Mutex<()> = Mutex::new(());
    static ref TEXTURE_2D: SlotLock = SlotLock::new();
    static ref RENDERBUFFER: Mutex<()> = Mutex::new(());
    static ref FRAMEBUFFER: Mutex<()> = Mutex::new(());
    static ref TEXTURE_UNITS: Vec<SlotLock> =
        (0..MAX_TEXTURE_UNITS).map(|_| SlotLock::new()).collect();
    static ref VERTEX_ARRAY_SLOT: SlotLock = SlotLock::new();
    static ref PROGRAM_SLOT: SlotLock = SlotLock::new();
}

/// The mutex guarding `target`'s binding point. Total over the closed enum,
/// so an unrecognized raw value can only be rejected earlier, at the
/// `GLenum` boundary.
pub fn buffer_lock(target: BufferTarget) -> &'static Mutex<()> {
    match target {
        BufferTarget::VertexAttributes => &VERTEX_ATTRIBUTES,
        BufferTarget::ElementArray => &ELEMENT_ARRAY,
        BufferTarget::Uniform => &UNIFORM,
        BufferTarget::PixelPack => &PIXEL_PACK,
        BufferTarget::PixelUnpack => &PIXEL_UNPACK,
        BufferTarget::CopyRead => &COPY_READ,
        BufferTarget::CopyWrite => &COPY_WRITE,
        BufferTarget::TextureBuffer => &TEXTURE_BUFFER,
    }
}

/// The lock guarding the 2D texture target. A slot lock: a texture bind or
/// unit activation on a thread that already holds the target is surfaced as
/// `ReentrantBind`, never a hang.
pub fn texture_lock() -> &'static SlotLock {
    &TEXTURE_2D
}

pub fn renderbuffer_lock() -> &'static Mutex<()> {
    &RENDERBUFFER
}

pub fn framebuffer_lock() -> &'static Mutex<()> {
    &FRAMEBUFFER
}

/// The lock guarding one texture unit's activation, a lock domain separate
/// from the 2D-texture-target bind. Units are held for the whole activation
/// scope; the target is only ever taken transiently, so any number of units
/// can be active at once.
pub fn unit_lock(unit: usize) -> Result<&'static SlotLock> {
    TEXTURE_UNITS.get(unit).ok_or_else(|| {
        Error::OutOfRange(format!(
            "Texture unit {} is out of range (max is {}).",
            unit,
            MAX_TEXTURE_UNITS - 1
        ))
    })
}

/// The single vertex-array binding slot.
pub fn vertex_array_slot() -> &'static SlotLock {
    &VERTEX_ARRAY_SLOT
}

/// The single shader-program binding slot.
pub fn program_slot() -> &'static SlotLock {
    &PROGRAM_SLOT
}

/// Process-unique token for the calling thread. Never zero, so zero can mark
/// an unheld slot.
fn thread_token() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TOKEN: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TOKEN.with(|t| *t)
}

/// Mutex for a single-slot binding point that records its holder's thread
/// token atomically, so the re-entrancy check itself is race-free.
pub struct SlotLock {
    holder: AtomicU64,
    mutex: Mutex<()>,
}

impl Default for SlotLock {
    fn default() -> Self {
        SlotLock::new()
    }
}

impl SlotLock {
    pub fn new() -> SlotLock {
        SlotLock {
            holder: AtomicU64::new(0),
            mutex: Mutex::new(()),
        }
    }

    /// Blocks until this thread holds the slot. If the calling thread is
    /// already the holder, fails fast with `ReentrantBind` instead of
    /// deadlocking; `what` labels the slot in that error.
    pub fn acquire(&self, what: &'static str) -> Result<SlotGuard<'_>> {
        let token = thread_token();
        if self.holder.load(Ordering::Acquire) == token {
            return Err(Error::ReentrantBind(what));
        }

        let guard = self.mutex.lock().unwrap();
        self.holder.store(token, Ordering::Release);
        Ok(SlotGuard { slot: self, _guard: guard })
    }
}

/// Scope during which the calling thread owns a [`SlotLock`].
pub struct SlotGuard<'a> {
    slot: &'a SlotLock,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> Drop for SlotGuard<'a> {
    fn drop(&mut self) {
        // Clear the holder before the mutex guard releases; a waiter cannot
        // observe the slot before it acquires the mutex anyway.
        self.slot.holder.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn thread_tokens_are_unique_and_nonzero() {
        let mut tokens = HashSet::new();
        tokens.insert(thread_token());
        // Stable within a thread.
        assert_eq!(thread_token(), thread_token());

        for _ in 0..4 {
            let token = thread::spawn(thread_token).join().unwrap();
            assert_ne!(token, 0);
            assert!(tokens.insert(token));
        }
    }

    #[test]
    fn registry_is_total() {
        for &target in BufferTarget::ALL.iter() {
            let guard = buffer_lock(target).lock().unwrap();
            drop(guard);
        }

        for unit in 0..MAX_TEXTURE_UNITS {
            assert!(unit_lock(unit).is_ok());
        }
        assert!(unit_lock(MAX_TEXTURE_UNITS).is_err());
    }

    #[test]
    fn distinct_targets_do_not_contend() {
        // Were these the same mutex, the nested locks would deadlock.
        let _a = buffer_lock(BufferTarget::VertexAttributes).lock().unwrap();
        let _b = buffer_lock(BufferTarget::ElementArray).lock().unwrap();
        let _c = buffer_lock(BufferTarget::Uniform).lock().unwrap();
    }
}
