extern crate env_logger;
extern crate lumen;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use lumen::errors::Error;
use lumen::gfx::locks::SlotLock;

fn setup() {
    let _ = env_logger::try_init();
}

#[test]
fn same_thread_reentry_fails_fast() {
    setup();

    let slot = SlotLock::new();
    let _held = slot.acquire("test slot").unwrap();

    let start = Instant::now();
    match slot.acquire("test slot") {
        Err(Error::ReentrantBind("test slot")) => {}
        Err(err) => panic!("unexpected error: {}", err),
        Ok(_) => panic!("re-entrant acquire succeeded"),
    }
    // Must fail eagerly, not time out of a deadlock.
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn release_clears_the_holder() {
    setup();

    let slot = SlotLock::new();
    drop(slot.acquire("test slot").unwrap());
    drop(slot.acquire("test slot").unwrap());
}

#[test]
fn other_threads_contend_normally() {
    setup();

    let slot = Arc::new(SlotLock::new());
    let released = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let handle = {
        let slot = Arc::clone(&slot);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            let guard = slot.acquire("test slot").unwrap();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            drop(guard);
        })
    };

    // A second thread is not re-entry: it blocks until the scope drops.
    rx.recv().unwrap();
    let _guard = slot.acquire("test slot").unwrap();
    assert!(released.load(Ordering::SeqCst));
    handle.join().unwrap();
}
