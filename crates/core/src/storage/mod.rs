pub mod cache_store;
pub mod portfolio_store;
