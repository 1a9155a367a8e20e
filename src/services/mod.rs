// Checkout pipeline
pub mod couriers;
pub mod orders;
pub mod packaging;
pub mod shipping;

// Stock
pub mod inventory;

// Money
pub mod payments;
pub mod wallet;

// Farm data
pub mod environment;
