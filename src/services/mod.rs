// Services module - cart state, change notification and order workflows

pub mod cart_store;
pub mod hydration;
pub mod notifier;
pub mod order_service;

pub use cart_store::{CartStore, Persistence};
pub use hydration::{order_to_snapshot, HydrationOutcome, OrderEditHydrator};
pub use notifier::{ChangeNotifier, Subscription, CART_CHANNEL};
pub use order_service::OrderService;
