// ── Observer channel ──
//
// A deliberately library-independent observer list: no reactive-streams
// dependency, just `subscribe(fn) -> handle` with replay-latest
// semantics. Observers are invoked outside internal locks so a handler
// may call back into the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::diagnostics::EmissionTracker;
use crate::emission::QuerySnapshot;

pub(crate) type ObserverFn = dyn Fn(&QuerySnapshot) + Send + Sync;

/// Lock a mutex, recovering the guard if a panicking observer poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The set of observers attached to one query.
#[derive(Default)]
pub(crate) struct ObserverList {
    observers: Mutex<Vec<(u64, Arc<ObserverFn>)>>,
    next_id: AtomicU64,
}

impl ObserverList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, observer: Arc<ObserverFn>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        lock(&self.observers).retain(|(observer_id, _)| *observer_id != id);
    }

    /// Snapshot the current observers so delivery happens lock-free.
    pub(crate) fn current(&self) -> Vec<Arc<ObserverFn>> {
        lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    pub(crate) fn clear(&self) {
        lock(&self.observers).clear();
    }
}

/// Handle binding one observer to one query's emission channel.
///
/// Unsubscribing (explicitly or by drop) detaches the observer only;
/// whether the now-idle query gets disposed is the registry's policy.
#[must_use = "dropping the subscription detaches the observer"]
pub struct QuerySubscription {
    id: u64,
    observers: Weak<ObserverList>,
    tracker: Option<Arc<EmissionTracker>>,
}

impl QuerySubscription {
    pub(crate) fn new(
        id: u64,
        observers: &Arc<ObserverList>,
        tracker: Option<Arc<EmissionTracker>>,
    ) -> Self {
        Self {
            id,
            observers: Arc::downgrade(observers),
            tracker,
        }
    }

    /// An already-detached subscription. Returned for subscriptions to
    /// disposed queries under the lenient configuration: it never
    /// observes anything.
    pub(crate) fn detached() -> Self {
        Self {
            id: 0,
            observers: Weak::new(),
            tracker: None,
        }
    }

    /// Detach the observer. Idempotent; also happens on drop.
    pub fn unsubscribe(&self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.remove(self.id);
        }
    }

    /// The diagnostic tracker for this subscription, when the store was
    /// configured with emission tracking.
    pub fn tracker(&self) -> Option<&EmissionTracker> {
        self.tracker.as_deref()
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_observer() -> Arc<ObserverFn> {
        Arc::new(|_snapshot: &QuerySnapshot| {})
    }

    #[test]
    fn add_and_remove_track_length() {
        let list = ObserverList::new();
        let a = list.add(dummy_observer());
        let b = list.add(dummy_observer());
        assert_eq!(list.len(), 2);

        list.remove(a);
        assert_eq!(list.len(), 1);
        list.remove(b);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn subscription_drop_detaches() {
        let list = Arc::new(ObserverList::new());
        let id = list.add(dummy_observer());
        let subscription = QuerySubscription::new(id, &list, None);
        assert_eq!(list.len(), 1);

        drop(subscription);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn detached_subscription_is_inert() {
        let subscription = QuerySubscription::detached();
        subscription.unsubscribe();
        assert!(subscription.tracker().is_none());
    }
}
