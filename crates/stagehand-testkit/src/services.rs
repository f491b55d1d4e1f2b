//! Services for flow conditions.

use std::sync::atomic::{AtomicBool, Ordering};

/// A boolean service a test can flip between navigations.
#[derive(Debug, Default)]
pub struct FlagService {
    flag: AtomicBool,
}

impl FlagService {
    /// Service starting at `value`.
    pub fn new(value: bool) -> Self {
        Self {
            flag: AtomicBool::new(value),
        }
    }

    /// Current value.
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Change the value.
    pub fn set(&self, value: bool) {
        self.flag.store(value, Ordering::SeqCst);
    }
}
