pub mod broadcast;
pub mod dashboard;
pub mod filter_state;
pub mod record_store;
pub mod theme;
