// Repositories module - persistence layer over the storage port

pub mod cart_repository;
pub mod order_repository;
pub mod storage;


pub use cart_repository::{CartRepository, StorageCartRepository};
pub use order_repository::{OrderHistory, StorageOrderHistory};
pub use storage::{FileStorage, InMemoryStorage, KeyValueStorage, UnavailableStorage};
