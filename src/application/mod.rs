// Application layer - Tile registry, field resolution, filters, layout and the editing session
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod dashboard_session;
pub mod field_resolver;
pub mod filter_targeting;
pub mod layout;
pub mod tile_registry;

#[cfg(test)]
pub mod test_support;
