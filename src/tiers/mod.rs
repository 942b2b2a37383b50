pub mod classifier;
pub mod table;

pub use classifier::{classify, WinPolicy};
pub use table::{PrizeTable, TierRule};
