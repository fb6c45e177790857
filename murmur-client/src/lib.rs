// Client-side synchronization layer for the Murmur social feed
pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod gate;
pub mod interaction;
pub mod logging;
pub mod media;
pub mod profile;
pub mod session;
pub mod share;

#[cfg(test)]
mod testing;

pub use error::{ClientError, ClientResult};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
/// Guards are never held across an `.await`.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
