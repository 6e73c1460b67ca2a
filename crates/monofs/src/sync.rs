//! Small synchronization primitives used by [`crate::mount::MonoFs`] and
//! [`crate::session::FileSession`]. The standard library has no semaphore
//! and no reader/writer lock whose guard can outlive the call that acquired
//! it, and a `FileSession` must hold its per-file lock across many method
//! calls until the session is dropped, so both are built directly on
//! `Mutex` + `Condvar`.

use std::sync::{Condvar, Mutex};

/// A counting semaphore gating the mount/unmount/format transitions.
pub struct Semaphore {
    permits: Mutex<u32>,
    condvar: Condvar,
}

impl Semaphore {
    pub fn new(initial_permits: u32) -> Self {
        Self {
            permits: Mutex::new(initial_permits),
            condvar: Condvar::new(),
        }
    }

    /// Waits for one permit to become available and takes it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.condvar.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    /// Returns `count` permits, waking waiters.
    pub fn release(&self, count: u32) {
        if count == 0 {
            return;
        }
        let mut permits = self.permits.lock().unwrap();
        *permits += count;
        self.condvar.notify_all();
    }
}

#[derive(Default)]
struct GateState {
    readers: u32,
    writer: bool,
}

/// A reader/writer gate acquired and released through explicit calls rather
/// than RAII guards, so a [`crate::session::FileSession`] can hold it for
/// its entire lifetime without borrowing from it.
pub struct RwGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl RwGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            condvar: Condvar::new(),
        }
    }

    pub fn acquire_shared(&self) {
        let mut state = self.state.lock().unwrap();
        while state.writer {
            state = self.condvar.wait(state).unwrap();
        }
        state.readers += 1;
    }

    pub fn acquire_exclusive(&self) {
        let mut state = self.state.lock().unwrap();
        while state.writer || state.readers > 0 {
            state = self.condvar.wait(state).unwrap();
        }
        state.writer = true;
    }

    pub fn release_shared(&self) {
        let mut state = self.state.lock().unwrap();
        state.readers -= 1;
        if state.readers == 0 {
            self.condvar.notify_all();
        }
    }

    pub fn release_exclusive(&self) {
        let mut state = self.state.lock().unwrap();
        state.writer = false;
        self.condvar.notify_all();
    }
}
