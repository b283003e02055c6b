// Domain layer - Dashboard composition model
pub mod dashboard;
pub mod error;
pub mod field;
pub mod filter;
pub mod tile;
