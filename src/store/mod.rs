//! Persistence layer: the `BookingStore` port and an in-memory backend.

pub mod memory;
pub mod traits;

pub use memory::InMemoryStore;
pub use traits::BookingStore;
