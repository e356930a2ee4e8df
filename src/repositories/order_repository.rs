use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{OrderRecord, RepositoryResult};
use crate::repositories::KeyValueStorage;

/// Trait defining the order-history lookup used by the orders page and order edit
pub trait OrderHistory: Send + Sync {
    /// Find an order by its id
    fn find_order_by_id(&self, order_id: &str) -> RepositoryResult<Option<OrderRecord>>;

    /// List every known order, in stored order
    fn list_orders(&self) -> RepositoryResult<Vec<OrderRecord>>;

    /// Remove an order from the history; returns whether it existed
    fn cancel_order(&self, order_id: &str) -> RepositoryResult<bool>;
}

/// Order history stored as a JSON array of orders under one storage key
pub struct StorageOrderHistory {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl StorageOrderHistory {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Replace the stored history
    #[instrument(skip(self, orders), fields(key = %self.key, order_count = orders.len()))]
    pub fn replace_orders(&self, orders: &[OrderRecord]) -> RepositoryResult<()> {
        let encoded = serde_json::to_string(orders)?;
        self.storage.set_item(&self.key, &encoded)?;
        info!("Order history saved");
        Ok(())
    }

    /// Read the stored history; a missing or malformed value reads as empty
    fn read_orders(&self) -> RepositoryResult<Vec<OrderRecord>> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<OrderRecord>>(&raw) {
            Ok(orders) => Ok(orders),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Malformed order history, reading as empty");
                Ok(Vec::new())
            }
        }
    }
}

impl std::fmt::Debug for StorageOrderHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageOrderHistory")
            .field("key", &self.key)
            .finish()
    }
}

impl OrderHistory for StorageOrderHistory {
    #[instrument(skip(self), fields(key = %self.key))]
    fn find_order_by_id(&self, order_id: &str) -> RepositoryResult<Option<OrderRecord>> {
        let order = self
            .read_orders()?
            .into_iter()
            .find(|order| order.id == order_id);
        info!(found = order.is_some(), "Order lookup");
        Ok(order)
    }

    #[instrument(skip(self), fields(key = %self.key))]
    fn list_orders(&self) -> RepositoryResult<Vec<OrderRecord>> {
        self.read_orders()
    }

    #[instrument(skip(self), fields(key = %self.key))]
    fn cancel_order(&self, order_id: &str) -> RepositoryResult<bool> {
        let mut orders = self.read_orders()?;
        let original_len = orders.len();
        orders.retain(|order| order.id != order_id);

        if orders.len() == original_len {
            info!("Order not present, nothing to cancel");
            return Ok(false);
        }

        self.replace_orders(&orders)?;
        info!("Order cancelled");
        Ok(true)
    }
}
