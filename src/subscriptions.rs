//! Subscription reference-counting registry
//!
//! Multiplexes many logical consumers onto one physical live feed per
//! query key. The feed is opened when the first consumer retains the key
//! and detached exactly when the last one releases it. The registry is
//! owned by the application session and is the only component allowed to
//! open or close a feed; a duplicate feed for the same key is a
//! correctness bug, not just wasted resources.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::Unsubscribe;

/// Canonical query keys for the live feeds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    ActiveLoans,
    UserLoans(String),
    UserWishlist(String),
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKey::ActiveLoans => write!(f, "active-loans"),
            SubscriptionKey::UserLoans(user_id) => write!(f, "user-loans:{}", user_id),
            SubscriptionKey::UserWishlist(user_id) => write!(f, "user-wishlist:{}", user_id),
        }
    }
}

struct FeedEntry {
    /// Distinguishes feed incarnations so a guard outliving a forced
    /// teardown cannot close a feed it never retained.
    feed_id: u64,
    count: usize,
    unsubscribe: Option<Unsubscribe>,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    feeds: Mutex<HashMap<SubscriptionKey, FeedEntry>>,
    next_feed_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionKey, FeedEntry>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in `key`. `open` is invoked only when no
    /// physical feed currently exists for the key and must not call back
    /// into the registry. The returned guard releases the interest when
    /// dropped or via [`SubscriptionGuard::release`]; the feed is
    /// detached exactly when the last guard for its incarnation goes.
    pub fn retain<F>(self: &Arc<Self>, key: SubscriptionKey, open: F) -> SubscriptionGuard
    where
        F: FnOnce() -> Unsubscribe,
    {
        let feed_id = {
            let mut feeds = self.lock();
            match feeds.entry(key.clone()) {
                Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    entry.count += 1;
                    entry.feed_id
                }
                Entry::Vacant(vacant) => {
                    tracing::debug!(key = %key, "opening live feed");
                    let feed_id = self.next_feed_id.fetch_add(1, Ordering::Relaxed);
                    let unsubscribe = open();
                    vacant.insert(FeedEntry {
                        feed_id,
                        count: 1,
                        unsubscribe: Some(unsubscribe),
                    });
                    feed_id
                }
            }
        };

        SubscriptionGuard {
            registry: Arc::clone(self),
            key,
            feed_id,
            released: AtomicBool::new(false),
        }
    }

    fn release(&self, key: &SubscriptionKey, feed_id: u64) {
        let detached = {
            let mut feeds = self.lock();
            match feeds.get_mut(key) {
                // feed already gone (forced teardown) or replaced by a
                // newer incarnation this guard never held
                None => None,
                Some(entry) if entry.feed_id != feed_id => None,
                Some(entry) if entry.count > 1 => {
                    entry.count -= 1;
                    None
                }
                Some(_) => feeds.remove(key).and_then(|entry| entry.unsubscribe),
            }
        };

        if let Some(unsubscribe) = detached {
            tracing::debug!(key = %key, "detaching live feed");
            unsubscribe();
        }
    }

    /// Number of physical feeds currently open
    pub fn active_feeds(&self) -> usize {
        self.lock().len()
    }

    /// Logical consumers currently retaining `key`
    pub fn ref_count(&self, key: &SubscriptionKey) -> usize {
        self.lock().get(key).map(|entry| entry.count).unwrap_or(0)
    }

    /// Detach every feed regardless of outstanding guards; those guards
    /// become no-ops when they later release. Used at session teardown so
    /// no feed or stale user data survives into the next session.
    pub fn release_all(&self) {
        let entries: Vec<(SubscriptionKey, Option<Unsubscribe>)> = self
            .lock()
            .drain()
            .map(|(key, entry)| (key, entry.unsubscribe))
            .collect();

        for (key, unsubscribe) in entries {
            if let Some(unsubscribe) = unsubscribe {
                tracing::debug!(key = %key, "detaching live feed at session teardown");
                unsubscribe();
            }
        }
    }
}

/// Reference-counted interest in a subscription key.
///
/// Release is single-fire by design: explicit release followed by drop,
/// or any double release, decrements exactly once.
pub struct SubscriptionGuard {
    registry: Arc<SubscriptionRegistry>,
    key: SubscriptionKey,
    feed_id: u64,
    released: AtomicBool,
}

impl SubscriptionGuard {
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.registry.release(&self.key, self.feed_id);
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
