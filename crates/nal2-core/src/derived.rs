//! Shared cache of derived engine state.
//!
//! Some calculation calls produce sequences that later calls need as
//! implicit inputs (crossover frequencies, the channel index of each
//! frequency band, compression thresholds). The cache keeps the last
//! produced value of each slot for the lifetime of the process and
//! notifies subscribers with a full snapshot after every change.
//!
//! All operations run under one exclusivity guard, including listener
//! notification. A slow listener therefore delays later writers, and a
//! listener must not call back into the cache from its callback: the guard
//! is not reentrant and doing so deadlocks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

use crate::params::ParamKind;

/// Named slot of the derived-state cache.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum DerivedSlot {
    /// Crossover frequencies
    #[strum(serialize = "CFArray")]
    #[serde(rename = "CFArray")]
    CfArray,
    /// Channel index per frequency band
    #[strum(serialize = "FreqInCh")]
    FreqInCh,
    /// Compression thresholds
    #[strum(serialize = "CT")]
    #[serde(rename = "CT")]
    Ct,
}

impl DerivedSlot {
    pub fn kind(self) -> ParamKind {
        match self {
            DerivedSlot::CfArray | DerivedSlot::Ct => ParamKind::FloatSeq,
            DerivedSlot::FreqInCh => ParamKind::IntSeq,
        }
    }
}

/// Value held by a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Ints(Vec<i32>),
    Floats(Vec<f64>),
}

impl SlotValue {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            SlotValue::Ints(values) => values.len(),
            SlotValue::Floats(values) => values.len(),
        }
    }

    fn into_floats(self) -> Vec<f64> {
        match self {
            SlotValue::Floats(values) => values,
            SlotValue::Ints(values) => values.into_iter().map(f64::from).collect(),
        }
    }

    fn into_ints(self) -> Option<Vec<i32>> {
        match self {
            SlotValue::Ints(values) => Some(values),
            SlotValue::Floats(values) => values
                .into_iter()
                .map(|v| (v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX)).then_some(v as i32))
                .collect(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("slot {slot} holds a {expected}")]
    KindMismatch { slot: DerivedSlot, expected: ParamKind },
}

/// Consistent copy of all three slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedSnapshot {
    #[serde(rename = "CFArray")]
    pub cf_array: Vec<f64>,
    #[serde(rename = "FreqInCh")]
    pub freq_in_ch: Vec<i32>,
    #[serde(rename = "CT")]
    pub ct: Vec<f64>,
}

impl DerivedSnapshot {
    pub fn get(&self, slot: DerivedSlot) -> SlotValue {
        match slot {
            DerivedSlot::CfArray => SlotValue::Floats(self.cf_array.clone()),
            DerivedSlot::FreqInCh => SlotValue::Ints(self.freq_in_ch.clone()),
            DerivedSlot::Ct => SlotValue::Floats(self.ct.clone()),
        }
    }

    fn put(&mut self, slot: DerivedSlot, value: SlotValue) -> Result<(), CacheError> {
        match slot {
            DerivedSlot::CfArray => self.cf_array = value.into_floats(),
            DerivedSlot::Ct => self.ct = value.into_floats(),
            DerivedSlot::FreqInCh => {
                self.freq_in_ch = value.into_ints().ok_or(CacheError::KindMismatch {
                    slot,
                    expected: slot.kind(),
                })?
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> DerivedStats {
        DerivedStats {
            cf_array_length: self.cf_array.len(),
            cf_array_is_empty: self.cf_array.is_empty(),
            freq_in_ch_length: self.freq_in_ch.len(),
            freq_in_ch_is_empty: self.freq_in_ch.is_empty(),
            ct_length: self.ct.len(),
            ct_is_empty: self.ct.is_empty(),
        }
    }
}

/// Per-slot length summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub cf_array_length: usize,
    pub cf_array_is_empty: bool,
    pub freq_in_ch_length: usize,
    pub freq_in_ch_is_empty: bool,
    pub ct_length: usize,
    pub ct_is_empty: bool,
}

type Listener = Arc<dyn Fn(&DerivedSnapshot) -> Result<(), String> + Send + Sync>;

/// Handle returned by [`DerivedStateCache::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Inner {
    snapshot: DerivedSnapshot,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Inner {
    fn notify(&self) {
        for (id, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&self.snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Derived state listener {:?} failed: {}", id, e),
                Err(_) => warn!("Derived state listener {:?} panicked", id),
            }
        }
    }
}

/// Process-wide derived state, shared by handle.
///
/// Values are copied on the way in and on the way out; callers never alias
/// the stored sequences.
#[derive(Default)]
pub struct DerivedStateCache {
    inner: Mutex<Inner>,
}

impl DerivedStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a slot's value and notify subscribers.
    pub fn set(&self, slot: DerivedSlot, value: SlotValue) -> Result<(), CacheError> {
        self.update([(slot, value)])
    }

    /// Replace several slots at once with a single notification.
    pub fn update(
        &self,
        values: impl IntoIterator<Item = (DerivedSlot, SlotValue)>,
    ) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let mut next = inner.snapshot.clone();
        for (slot, value) in values {
            next.put(slot, value)?;
            debug!("Derived slot {} updated", slot);
        }
        inner.snapshot = next;
        inner.notify();
        Ok(())
    }

    pub fn get(&self, slot: DerivedSlot) -> SlotValue {
        self.inner.lock().snapshot.get(slot)
    }

    /// Empty a slot and notify subscribers.
    pub fn delete(&self, slot: DerivedSlot) {
        let mut inner = self.inner.lock();
        match slot {
            DerivedSlot::CfArray => inner.snapshot.cf_array.clear(),
            DerivedSlot::FreqInCh => inner.snapshot.freq_in_ch.clear(),
            DerivedSlot::Ct => inner.snapshot.ct.clear(),
        }
        debug!("Derived slot {} deleted", slot);
        inner.notify();
    }

    /// Empty every slot with one notification.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock();
        inner.snapshot = DerivedSnapshot::default();
        debug!("All derived slots cleared");
        inner.notify();
    }

    pub fn snapshot(&self) -> DerivedSnapshot {
        self.inner.lock().snapshot.clone()
    }

    pub fn stats(&self) -> DerivedStats {
        self.inner.lock().snapshot.stats()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DerivedSnapshot) -> Result<(), String> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }
}
