//! Repository pattern implementations
//!
//! Data access objects for the coffee roast table.

pub mod coffee_roast;

pub use coffee_roast::CoffeeRoastRepository;
