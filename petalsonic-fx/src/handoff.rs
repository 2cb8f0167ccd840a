//! Lock-free hand-off of shared engine objects from the control thread to the
//! audio thread.
//!
//! A [`HandoffChannel`] is a depth-1 bounded channel with drop-on-overflow:
//! the control thread stages a value with [`HandoffChannel::publish`], the
//! audio thread promotes it to the active slot with [`HandoffChannel::adopt`].
//! While an update is pending, further publishes are dropped rather than
//! queued. Callers are expected to publish far less often than the audio
//! thread drains.
//!
//! Both slots are [`ArcSwapOption`]s, so the audio thread only ever performs
//! atomic loads, stores and reference count updates. The producer side is
//! serialized by a mutex; it is never taken on the audio thread.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SimulationSettings;

/// Result of a [`HandoffChannel::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The value was staged and will be adopted on the next block.
    Staged,
    /// The value is already the staged value; nothing changed.
    Unchanged,
    /// An earlier update has not been adopted yet; the value was discarded.
    Dropped,
}

/// Double-buffered slot moving one shared value at a time to the audio thread.
pub struct HandoffChannel<T> {
    name: &'static str,
    pending: AtomicBool,
    staged: ArcSwapOption<T>,
    active: ArcSwapOption<T>,
    producer: Mutex<()>,
}

impl<T> HandoffChannel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: AtomicBool::new(false),
            staged: ArcSwapOption::empty(),
            active: ArcSwapOption::empty(),
            producer: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stages `value` for adoption. Control thread only.
    ///
    /// The previously staged value is released. If an update is still pending
    /// the new value is dropped: the first publish that finds the channel idle
    /// wins, not the last one.
    pub fn publish(&self, value: Arc<T>) -> PublishOutcome {
        let _producer = self.producer.lock();
        self.stage(value, false)
    }

    /// Like [`HandoffChannel::publish`], but never waits for another producer.
    ///
    /// Returns [`PublishOutcome::Dropped`] if the producer side is busy.
    pub fn try_publish(&self, value: Arc<T>) -> PublishOutcome {
        let Some(_producer) = self.producer.try_lock() else {
            return PublishOutcome::Dropped;
        };
        self.stage(value, false)
    }

    /// Stages `value` even if an earlier update is still pending, replacing it.
    ///
    /// For channels whose producer runs on an audio thread and must supersede
    /// its own stale value. Never waits: returns [`PublishOutcome::Dropped`]
    /// if the producer side is busy, and the caller tries again later.
    pub fn try_replace(&self, value: Arc<T>) -> PublishOutcome {
        let Some(_producer) = self.producer.try_lock() else {
            return PublishOutcome::Dropped;
        };
        self.stage(value, true)
    }

    // Producer lock must be held.
    fn stage(&self, value: Arc<T>, replace_pending: bool) -> PublishOutcome {
        if let Some(staged) = self.staged.load().as_ref() {
            if Arc::ptr_eq(staged, &value) {
                return PublishOutcome::Unchanged;
            }
        }

        if !replace_pending && self.pending.load(Ordering::Acquire) {
            log::debug!(
                "{} update dropped: previous update not yet adopted",
                self.name
            );
            return PublishOutcome::Dropped;
        }

        self.staged.store(Some(value));
        self.pending.store(true, Ordering::Release);
        log::debug!("{} update staged", self.name);
        PublishOutcome::Staged
    }

    /// Promotes the staged value to the active slot if an update is pending.
    ///
    /// Audio thread, once per block. Never blocks. Returns true if a value was
    /// adopted. A publish landing between the flag swap and the slot load is
    /// picked up again on the next call, which is harmless because adopting the
    /// same value twice leaves the active slot unchanged.
    pub fn adopt(&self) -> bool {
        if self
            .pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.active.store(self.staged.load_full());
        true
    }

    /// True while a staged value is waiting to be adopted.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// The value the audio thread is currently using.
    pub fn current(&self) -> Option<Arc<T>> {
        self.active.load_full()
    }

    /// The most recently staged value, adopted or not.
    pub fn staged(&self) -> Option<Arc<T>> {
        self.staged.load_full()
    }

    /// True once any value has been staged.
    pub fn has_value(&self) -> bool {
        self.staged.load().is_some()
    }

    /// Releases both slots and clears the pending flag.
    pub fn clear(&self) {
        let _producer = self.producer.lock();
        self.pending.store(false, Ordering::Release);
        self.active.store(None);
        self.staged.store(None);
    }
}

/// Simulation settings published with a validity flag.
///
/// The settings become visible to the audio thread atomically: readers either
/// see the previous complete value or the new one.
pub struct SettingsCell {
    valid: AtomicBool,
    settings: ArcSwapOption<SimulationSettings>,
}

impl Default for SettingsCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsCell {
    pub fn new() -> Self {
        Self {
            valid: AtomicBool::new(false),
            settings: ArcSwapOption::empty(),
        }
    }

    pub fn publish(&self, settings: SimulationSettings) {
        self.settings.store(Some(Arc::new(settings)));
        self.valid.store(true, Ordering::Release);
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// The published settings, if they are currently valid.
    pub fn get(&self) -> Option<SimulationSettings> {
        if !self.is_valid() {
            return None;
        }
        self.settings.load().as_deref().copied()
    }
}
