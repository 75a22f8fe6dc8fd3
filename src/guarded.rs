use parking_lot::{Mutex, MutexGuard};

/// Data that can only be reached while holding its mutex.
///
/// The lock is released when the returned guard goes out of scope, on every
/// exit path.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    data: Mutex<T>,
}

impl<T> Guarded<T> {
    pub fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub fn get_locked_guard(&self) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    /// Runs `f` with exclusive access and returns its result.
    pub fn do_under_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.data.lock();
        f(&mut guard)
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}
