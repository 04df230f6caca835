pub mod aggregation_service;
pub mod lot_analysis;
pub mod quote_service;
pub mod sort;
pub mod stats_service;
