pub mod allocations;
pub mod stocks;
pub mod strategies;
pub mod system;
