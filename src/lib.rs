pub mod config;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;

pub use config::{Config, ConfigError};
pub use models::{CartItem, CartSnapshot, MergePolicy};
pub use observability::{init_observability, ObservabilityError};
pub use services::{CartStore, ChangeNotifier, HydrationOutcome, OrderEditHydrator, Subscription};
