use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, instrument, warn};

use crate::models::{CartItem, CartSnapshot, CartSummary, MergePolicy, NewCartItem, SnapshotRead};
use crate::repositories::{CartRepository, KeyValueStorage, StorageCartRepository};
use crate::services::notifier::{ChangeNotifier, Subscription};

/// Where a save ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Written to durable storage
    Durable,
    /// Storage unavailable; kept in process memory only
    Degraded,
}

/// The shared cart: single source of truth for the selected services.
///
/// Reads never fail. A missing or malformed stored value reads as an empty
/// cart, and when storage is unavailable the store serves the last snapshot
/// saved in this process. `save` is silent; `commit`, `clear` and the
/// mutating helpers publish exactly one change pulse.
pub struct CartStore {
    repository: Arc<dyn CartRepository>,
    notifier: ChangeNotifier,
    merge_policy: MergePolicy,
    fallback: Mutex<Option<CartSnapshot>>,
}

impl CartStore {
    /// Create a new CartStore
    pub fn new(repository: Arc<dyn CartRepository>, notifier: ChangeNotifier) -> Self {
        Self {
            repository,
            notifier,
            merge_policy: MergePolicy::default(),
            fallback: Mutex::new(None),
        }
    }

    /// Create a store persisting under `key` of the given storage
    pub fn from_storage(
        storage: Arc<dyn KeyValueStorage>,
        key: impl Into<String>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self::new(Arc::new(StorageCartRepository::new(storage, key)), notifier)
    }

    pub fn with_merge_policy(mut self, merge_policy: MergePolicy) -> Self {
        self.merge_policy = merge_policy;
        self
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Read the current snapshot
    #[instrument(skip(self))]
    pub fn load(&self) -> CartSnapshot {
        match self.repository.find_snapshot() {
            Ok(SnapshotRead::Malformed { reason }) => {
                warn!(reason = %reason, "Stored cart is malformed, reading as empty");
                CartSnapshot::empty()
            }
            Ok(read) => read.into_snapshot(),
            Err(e) => {
                let snapshot = self.fallback().clone().unwrap_or_default();
                warn!(
                    error = %e,
                    item_count = snapshot.len(),
                    "Cart storage unavailable, serving in-memory cart"
                );
                snapshot
            }
        }
    }

    /// Persist a full snapshot without publishing a change
    #[instrument(skip(self, snapshot), fields(item_count = snapshot.len()))]
    pub fn save(&self, snapshot: &CartSnapshot) -> Persistence {
        match self.repository.save_snapshot(snapshot) {
            Ok(()) => {
                *self.fallback() = None;
                Persistence::Durable
            }
            Err(e) => {
                warn!(error = %e, "Cart storage unavailable, keeping cart in memory only");
                *self.fallback() = Some(snapshot.clone());
                Persistence::Degraded
            }
        }
    }

    /// Persist a full snapshot and publish one change pulse
    pub fn commit(&self, snapshot: &CartSnapshot) -> Persistence {
        let persistence = self.save(snapshot);
        self.notifier.publish();
        persistence
    }

    /// Remove the stored cart entirely and publish one change pulse
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.discard();
        info!("Cart cleared");
        self.notifier.publish();
    }

    /// Remove the stored cart without publishing
    pub(crate) fn discard(&self) {
        if let Err(e) = self.repository.delete_snapshot() {
            warn!(error = %e, "Failed to delete stored cart");
        }
        *self.fallback() = None;
    }

    /// Count distinct non-empty service ids, optionally scoped to a studio
    pub fn count_unique_services(snapshot: &CartSnapshot, studio_filter: Option<&str>) -> usize {
        snapshot.count_unique_services(studio_filter)
    }

    /// Load and count in one step
    pub fn unique_service_count(&self, studio_filter: Option<&str>) -> usize {
        Self::count_unique_services(&self.load(), studio_filter)
    }

    /// Summary bar projection of the current cart
    pub fn summary(&self, studio_filter: Option<&str>) -> CartSummary {
        self.load().summary(studio_filter)
    }

    /// Add a service to the cart following the configured merge policy
    #[instrument(skip(self, request), fields(studio_id = %request.studio_id, merge_policy = %self.merge_policy))]
    pub fn add_item(&self, request: NewCartItem) -> CartSnapshot {
        let mut snapshot = self.load();
        let item = CartItem::from(request);
        info!(service_id = item.service_id.as_deref().unwrap_or_default(), "Adding item to cart");

        snapshot.add(item, self.merge_policy);
        self.commit(&snapshot);
        snapshot
    }

    /// Remove every line for a service; publishes only if something was removed
    #[instrument(skip(self))]
    pub fn remove_service(&self, service_id: &str, studio_filter: Option<&str>) -> usize {
        let mut snapshot = self.load();
        let removed = snapshot.remove_service(service_id, studio_filter);

        if removed > 0 {
            self.commit(&snapshot);
            info!(removed, "Service removed from cart");
        } else {
            info!("Service not in cart, nothing removed");
        }
        removed
    }

    /// Register a change listener on this store's notifier
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Async change receiver on this store's notifier
    pub fn changes(&self) -> tokio::sync::watch::Receiver<u64> {
        self.notifier.changes()
    }

    fn fallback(&self) -> MutexGuard<'_, Option<CartSnapshot>> {
        self.fallback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("merge_policy", &self.merge_policy)
            .field("notifier", &self.notifier)
            .finish()
    }
}
