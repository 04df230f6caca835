pub mod lot;
pub mod portfolio;
pub mod position;
pub mod quote;
pub mod stats;
pub mod stock;
