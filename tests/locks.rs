extern crate env_logger;
extern crate lumen;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use lumen::errors::Error;
use lumen::gfx::locks::{buffer_lock, texture_lock, unit_lock, MAX_TEXTURE_UNITS};
use lumen::gfx::types::BufferTarget;

fn setup() {
    let _ = env_logger::try_init();
}

#[test]
fn registry_lookup_is_total() {
    setup();

    for &target in BufferTarget::ALL.iter() {
        drop(buffer_lock(target).lock().unwrap());
    }
    for unit in 0..MAX_TEXTURE_UNITS {
        assert!(unit_lock(unit).is_ok());
    }
}

#[test]
fn texture_units_activate_independently() {
    setup();

    // An activation scope keeps only its unit's lock; the target lock is
    // taken just for the duration of the native activation calls. With the
    // first unit still held, a second unit's full acquisition sequence must
    // go through.
    let _unit0 = unit_lock(0).unwrap().acquire("texture unit").unwrap();
    drop(texture_lock().acquire("texture target").unwrap());

    let _unit1 = unit_lock(1).unwrap().acquire("texture unit").unwrap();
    drop(texture_lock().acquire("texture target").unwrap());
}

#[test]
fn same_unit_reactivation_fails_fast() {
    setup();

    let _held = unit_lock(2).unwrap().acquire("texture unit").unwrap();
    match unit_lock(2).unwrap().acquire("texture unit") {
        Err(Error::ReentrantBind("texture unit")) => {}
        Err(err) => panic!("unexpected error: {}", err),
        Ok(_) => panic!("re-entrant activation succeeded"),
    }
}

#[test]
fn same_target_class_excludes_concurrent_binds() {
    setup();

    // Each thread records the validity window during which it held the
    // binding point; the windows must never overlap.
    let mut handles = Vec::new();
    for _ in 0..4 {
        handles.push(thread::spawn(|| {
            let guard = buffer_lock(BufferTarget::PixelPack).lock().unwrap();
            let enter = Instant::now();
            thread::sleep(Duration::from_millis(25));
            let exit = Instant::now();
            drop(guard);
            (enter, exit)
        }));
    }

    let mut windows: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    windows.sort_by_key(|w| w.0);
    for pair in windows.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "validity windows overlap");
    }
}

#[test]
fn second_thread_blocks_until_scope_drops() {
    setup();

    let released = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let handle = {
        let released = Arc::clone(&released);
        thread::spawn(move || {
            let guard = buffer_lock(BufferTarget::CopyWrite).lock().unwrap();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            drop(guard);
        })
    };

    rx.recv().unwrap();
    let _guard = buffer_lock(BufferTarget::CopyWrite).lock().unwrap();
    assert!(
        released.load(Ordering::SeqCst),
        "acquired the binding point while the first scope was still alive"
    );
    handle.join().unwrap();
}
