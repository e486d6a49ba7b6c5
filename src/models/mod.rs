pub mod asset;
pub mod quote;
pub mod ticker;
