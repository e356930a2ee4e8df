use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{generate_service_id, CartItem, CartSnapshot, OrderLineItem, OrderRecord};
use crate::repositories::OrderHistory;
use crate::services::cart_store::CartStore;

/// Label used for order lines that carry no service name
pub const DEFAULT_SERVICE_NAME: &str = "Service";

/// Result of an order-edit hydration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// The cart now holds exactly the order's line items
    Hydrated {
        order_id: String,
        short_id: String,
        studio_id: String,
        item_count: usize,
    },
    /// No such order; the cart was left untouched
    OrderNotFound { order_id: String },
}

/// Replaces the cart with the contents of a previously placed order
pub struct OrderEditHydrator {
    cart_store: Arc<CartStore>,
    order_history: Arc<dyn OrderHistory>,
}

impl OrderEditHydrator {
    pub fn new(cart_store: Arc<CartStore>, order_history: Arc<dyn OrderHistory>) -> Self {
        Self {
            cart_store,
            order_history,
        }
    }

    /// Load `order_id` into the cart, scoped to `studio_id` from the current page.
    ///
    /// The previous cart is removed before the order's items are written, and
    /// subscribers get one pulse after the write. An unknown order (or a
    /// failing lookup) changes nothing and publishes nothing.
    #[instrument(skip(self), fields(order_id = %order_id, studio_id = %studio_id))]
    pub fn hydrate(&self, order_id: &str, studio_id: &str) -> HydrationOutcome {
        let order = match self.order_history.find_order_by_id(order_id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                info!("Order not found, cart left unchanged");
                return HydrationOutcome::OrderNotFound {
                    order_id: order_id.to_string(),
                };
            }
            Err(e) => {
                warn!(error = %e, "Order lookup failed, cart left unchanged");
                return HydrationOutcome::OrderNotFound {
                    order_id: order_id.to_string(),
                };
            }
        };

        let snapshot = order_to_snapshot(&order, studio_id);
        let item_count = snapshot.len();

        self.cart_store.discard();
        self.cart_store.commit(&snapshot);

        info!(item_count, "Cart hydrated from order");
        HydrationOutcome::Hydrated {
            order_id: order.id.clone(),
            short_id: order.short_id().to_string(),
            studio_id: studio_id.to_string(),
            item_count,
        }
    }
}

impl std::fmt::Debug for OrderEditHydrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEditHydrator")
            .field("cart_store", &self.cart_store)
            .finish()
    }
}

/// Map every order line onto a cart item owned by `studio_id`
pub fn order_to_snapshot(order: &OrderRecord, studio_id: &str) -> CartSnapshot {
    order
        .items
        .iter()
        .map(|line| line_to_cart_item(line, studio_id))
        .collect()
}

fn line_to_cart_item(line: &OrderLineItem, studio_id: &str) -> CartItem {
    CartItem {
        service_id: Some(
            line.service_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_service_id),
        ),
        service_name: Some(
            line.service_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        ),
        studio_id: Some(studio_id.to_string()),
        price: Some(line.price.unwrap_or(Decimal::ZERO)),
        quantity: Some(line.quantity.unwrap_or(Decimal::ONE)),
    }
}
