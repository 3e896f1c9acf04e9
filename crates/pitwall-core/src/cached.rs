//! Per-component cached state fed by background updater tasks.
//!
//! A [`Cached`] pairs the latest raw snapshot with a view derived from it
//! (usually a keyboard). Both change under one lock, so a reader never sees
//! a fresh snapshot next to a stale view.
//!
//! Fields fed by different topics are updated independently: a reader may
//! observe a standings value newer than the session info next to it. Each
//! field on its own only moves forward in publish order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broker::Subscription;

type Derive<S, V> = Box<dyn Fn(&S) -> V + Send + Sync>;

struct Slot<S, V> {
    snapshot: S,
    view: V,
}

pub struct Cached<S, V = ()> {
    slot: Mutex<Slot<S, V>>,
    derive: Derive<S, V>,
}

impl<S: Default> Cached<S, ()> {
    /// Snapshot without a derived view.
    pub fn plain() -> Self {
        Self::new(S::default(), |_| ())
    }
}

impl<S, V> Cached<S, V> {
    pub fn new(initial: S, derive: impl Fn(&S) -> V + Send + Sync + 'static) -> Self {
        let view = derive(&initial);
        Self {
            slot: Mutex::new(Slot {
                snapshot: initial,
                view,
            }),
            derive: Box::new(derive),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<S, V>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the snapshot and recomputes the view in one critical section.
    pub fn update(&self, apply: impl FnOnce(&mut S)) {
        let mut slot = self.slot();
        apply(&mut slot.snapshot);
        slot.view = (self.derive)(&slot.snapshot);
    }

    pub fn read<R>(&self, read: impl FnOnce(&S, &V) -> R) -> R {
        let slot = self.slot();
        read(&slot.snapshot, &slot.view)
    }
}

impl<S: Clone, V> Cached<S, V> {
    pub fn snapshot(&self) -> S {
        self.slot().snapshot.clone()
    }
}

impl<S, V: Clone> Cached<S, V> {
    pub fn view(&self) -> V {
        self.slot().view.clone()
    }
}

/// Drains `subscription` until it closes or `cancel` fires, handing each
/// value to `apply`.
///
/// `apply` runs synchronously; the task never awaits while it holds a
/// component lock. The subscription is released when the task ends.
pub fn spawn_updater<T, F>(
    mut subscription: Subscription<T>,
    cancel: CancellationToken,
    mut apply: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => break,
                next = subscription.recv() => next,
            };
            let Some(value) = next else {
                break;
            };
            apply(value);
        }
        debug!(topic = %subscription.topic(), "updater stopped");
    })
}

/// Owns the updater tasks of one component.
pub struct UpdaterSet {
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl UpdaterSet {
    /// Updaters stop when either this set or `parent` is cancelled.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn spawn<T, F>(&self, subscription: Subscription<T>, apply: F)
    where
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let handle = spawn_updater(subscription, self.cancel.clone(), apply);
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every updater and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::broker::Broker;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        standings: u32,
        session: u32,
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[test]
    fn reads_default_before_any_update() {
        let cached: Cached<Pair> = Cached::plain();
        assert_eq!(cached.snapshot(), Pair::default());
    }

    #[test]
    fn view_is_recomputed_with_snapshot() {
        let cached = Cached::new(Pair::default(), |pair: &Pair| {
            format!("{}/{}", pair.standings, pair.session)
        });
        assert_eq!(cached.view(), "0/0");

        cached.update(|pair| pair.standings = 3);
        cached.read(|pair, view| {
            assert_eq!(pair.standings, 3);
            assert_eq!(view, "3/0");
        });
    }

    #[test]
    fn concurrent_readers_never_see_stale_view() {
        let cached = Arc::new(Cached::new(0u64, |n: &u64| n * 2));
        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let cached = Arc::clone(&cached);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for n in 1..=200_000 {
                    cached.update(|value| *value = n);
                }
                done.store(true, Ordering::Release);
            })
        };

        loop {
            let finished = done.load(Ordering::Acquire);
            cached.read(|snapshot, view| assert_eq!(*view, snapshot * 2));
            if finished {
                break;
            }
        }
        writer.join().unwrap();
        cached.read(|snapshot, view| {
            assert_eq!(*snapshot, 200_000);
            assert_eq!(*view, 400_000);
        });
    }

    /// Two topics feed two fields independently; last value wins per field
    /// and there is no joint ordering between them.
    #[tokio::test]
    async fn independent_fields_keep_last_value_per_topic() {
        let standings = Broker::new();
        let sessions = Broker::new();
        let cached = Arc::new(Cached::<Pair>::plain());
        let updaters = UpdaterSet::new(&CancellationToken::new());

        let target = Arc::clone(&cached);
        updaters.spawn(standings.subscribe("standings-S1").unwrap(), move |v| {
            target.update(|pair| pair.standings = v);
        });
        let target = Arc::clone(&cached);
        updaters.spawn(sessions.subscribe("session-S1").unwrap(), move |v| {
            target.update(|pair| pair.session = v);
        });

        standings.publish("standings-S1", 1);
        standings.publish("standings-S1", 2);
        sessions.publish("session-S1", 10);
        settle().await;

        assert_eq!(
            cached.snapshot(),
            Pair {
                standings: 2,
                session: 10
            }
        );

        sessions.publish("session-S1", 11);
        settle().await;
        assert_eq!(cached.snapshot().standings, 2);
        assert_eq!(cached.snapshot().session, 11);

        updaters.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_subscriptions() {
        let broker = Broker::new();
        let parent = CancellationToken::new();
        let updaters = UpdaterSet::new(&parent);
        updaters.spawn(broker.subscribe("t").unwrap(), |_: u8| {});
        updaters.spawn(broker.subscribe("t").unwrap(), |_: u8| {});
        assert_eq!(updaters.len(), 2);
        assert_eq!(broker.subscriber_count("t"), 2);

        updaters.shutdown().await;
        assert!(updaters.is_empty());
        assert_eq!(broker.subscriber_count("t"), 0);
        assert_eq!(broker.publish("t", 1), 0);
    }

    #[tokio::test]
    async fn parent_cancellation_stops_updaters() {
        let broker = Broker::new();
        let parent = CancellationToken::new();
        let updaters = UpdaterSet::new(&parent);
        updaters.spawn(broker.subscribe("t").unwrap(), |_: u8| {});

        parent.cancel();
        settle().await;
        assert_eq!(broker.subscriber_count("t"), 0);
    }
}
