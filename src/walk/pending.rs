//! Outstanding-work counter. The walk is complete exactly when it returns to zero.
//!
//! A momentarily empty queue says nothing about completion: a worker may be about to enqueue
//! children. Callers must `add` for every child before calling `done` for its parent.

use log::error;
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct Pending {
    count: Mutex<usize>,
    zero: Condvar,
}

impl Pending {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` work items about to be enqueued.
    pub fn add(&self, n: usize) {
        if n == 0 {
            return;
        }
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += n;
    }

    /// Mark one work item fully processed.
    pub fn done(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        match count.checked_sub(1) {
            Some(c) => *count = c,
            None => error!("outstanding-work counter decremented below zero"),
        }
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until the counter is zero.
    pub fn wait_zero(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .zero
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
