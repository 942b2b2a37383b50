pub mod index;
pub mod store;

pub use index::{CacheIndex, Draw};
pub use store::DrawCache;
