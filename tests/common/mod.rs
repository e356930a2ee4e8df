#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use laundry_cart::models::{CartItem, CartSnapshot, OrderLineItem, OrderRecord, OrderStatus};
use laundry_cart::repositories::{InMemoryStorage, KeyValueStorage, StorageOrderHistory};
use laundry_cart::services::{CartStore, ChangeNotifier, OrderEditHydrator, Subscription};
use rust_decimal_macros::dec;

pub const CART_KEY: &str = "cartItems";
pub const ORDERS_KEY: &str = "orders";

/// A store, its order history and a pulse counter over one shared storage
pub struct TestEnvironment {
    pub storage: Arc<dyn KeyValueStorage>,
    pub store: Arc<CartStore>,
    pub order_history: Arc<StorageOrderHistory>,
    pub pulses: Arc<AtomicUsize>,
    _subscription: Subscription,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(InMemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<dyn KeyValueStorage>) -> Self {
        let store = Arc::new(CartStore::from_storage(
            storage.clone(),
            CART_KEY,
            ChangeNotifier::new(),
        ));
        let order_history = Arc::new(StorageOrderHistory::new(storage.clone(), ORDERS_KEY));

        let pulses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulses);
        let subscription = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            storage,
            store,
            order_history,
            pulses,
            _subscription: subscription,
        }
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }

    pub fn hydrator(&self) -> OrderEditHydrator {
        OrderEditHydrator::new(self.store.clone(), self.order_history.clone())
    }

    pub fn seed_orders(&self, orders: &[OrderRecord]) {
        self.order_history
            .replace_orders(orders)
            .expect("Failed to seed orders");
    }
}

pub fn create_test_snapshot() -> CartSnapshot {
    CartSnapshot::new(vec![
        CartItem::new("wash-fold", "studio-a")
            .with_name("Wash & Fold")
            .with_price(dec!(12.50))
            .with_quantity(2),
        CartItem::new("dry-clean", "studio-a")
            .with_name("Dry Cleaning")
            .with_price(dec!(8.99))
            .with_quantity(1),
    ])
}

pub fn create_test_orders() -> Vec<OrderRecord> {
    vec![
        OrderRecord::new("o1", OrderStatus::Ongoing)
            .with_studio_name("Busy Bee")
            .with_items(vec![OrderLineItem::new("y").with_price(dec!(10)).with_quantity(2)]),
        OrderRecord::new("9c1d44e2-77aa-4b61-9d1e-1f0f1a2b3c4d", OrderStatus::Completed)
            .with_studio_name("Quick Wash")
            .with_items(vec![
                OrderLineItem::new("ironing").with_quantity(3),
                OrderLineItem::default(),
            ]),
    ]
}
