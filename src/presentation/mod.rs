// Presentation layer - HTTP surface over dashboard sessions
pub mod app_state;
pub mod error;
pub mod handlers;
pub mod router;
pub mod session_registry;
