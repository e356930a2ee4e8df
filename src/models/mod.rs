// Re-export all model types
pub use self::cart::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::orders::*;

mod cart;
mod enums;
mod errors;
mod lenient;
mod orders;
