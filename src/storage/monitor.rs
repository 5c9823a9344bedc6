//! Read-write coordination for the shared index.
//!
//! Many readers or exactly one writer hold the guarded value at a time.
//! Acquisition is expressed through scoped guards:
//!
//! - [`IndexMonitor::read`] enters a shared hold, released when the guard drops
//! - [`IndexMonitor::write`] enters the exclusive hold once all readers have left
//! - [`ReadGuard::upgrade`] leaves the shared hold and then enters the exclusive one
//! - [`WriteGuard::downgrade`] turns the exclusive hold into a shared one atomically,
//!   so no other writer can run between the two
//!
//! The commit sequence used by indexing requests is read -> upgrade -> mutate ->
//! downgrade. Guards release on drop, so an early return or error never leaves the
//! index locked.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Observable state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Reading(usize),
    Writing,
}

/// Guards a value with shared/exclusive holds and an atomic downgrade.
#[derive(Debug, Default)]
pub struct IndexMonitor<T> {
    lock: RwLock<T>,
    readers: AtomicUsize,
    writing: AtomicBool,
}

impl<T> IndexMonitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: RwLock::new(value),
            readers: AtomicUsize::new(0),
            writing: AtomicBool::new(false),
        }
    }

    /// Enter a shared hold. Blocks while a writer holds the monitor.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let guard = self.lock.read();
        ReadGuard {
            guard,
            _hold: ReaderHold::enter(&self.readers),
            monitor: self,
        }
    }

    /// Enter the exclusive hold. Blocks until the reader count is zero and no
    /// other writer holds the monitor.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let guard = self.lock.write();
        WriteGuard {
            guard,
            _hold: WriterHold::enter(&self.writing),
            monitor: self,
        }
    }

    /// Current state, for diagnostics. May be stale by the time it is inspected.
    pub fn state(&self) -> MonitorState {
        if self.writing.load(Ordering::Acquire) {
            return MonitorState::Writing;
        }
        match self.readers.load(Ordering::Acquire) {
            0 => MonitorState::Idle,
            n => MonitorState::Reading(n),
        }
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}

struct ReaderHold<'a>(&'a AtomicUsize);

impl<'a> ReaderHold<'a> {
    fn enter(readers: &'a AtomicUsize) -> Self {
        readers.fetch_add(1, Ordering::AcqRel);
        Self(readers)
    }
}

impl Drop for ReaderHold<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct WriterHold<'a>(&'a AtomicBool);

impl<'a> WriterHold<'a> {
    fn enter(writing: &'a AtomicBool) -> Self {
        writing.store(true, Ordering::Release);
        Self(writing)
    }
}

impl Drop for WriterHold<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Shared hold on the monitored value.
pub struct ReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    _hold: ReaderHold<'a>,
    monitor: &'a IndexMonitor<T>,
}

impl<'a, T> ReadGuard<'a, T> {
    /// Leave the shared hold and enter the exclusive one.
    ///
    /// This is not atomic: another writer may run between the two steps, so
    /// anything read through this guard must be re-checked after upgrading.
    pub fn upgrade(self) -> WriteGuard<'a, T> {
        let monitor = self.monitor;
        drop(self);
        monitor.write()
    }
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

/// Exclusive hold on the monitored value.
pub struct WriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    _hold: WriterHold<'a>,
    monitor: &'a IndexMonitor<T>,
}

impl<'a, T> WriteGuard<'a, T> {
    /// Release the exclusive hold and keep a single shared hold, atomically.
    pub fn downgrade(self) -> ReadGuard<'a, T> {
        let WriteGuard {
            guard,
            _hold: writer,
            monitor,
        } = self;
        let reader = ReaderHold::enter(&monitor.readers);
        let guard = RwLockWriteGuard::downgrade(guard);
        drop(writer);
        ReadGuard {
            guard,
            _hold: reader,
            monitor,
        }
    }
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
