pub mod batch_inventory;
pub mod cashout;
pub mod export_inventory;
pub mod order;
pub mod order_detail;
pub mod payment;
pub mod product;
pub mod product_serial;
pub mod transaction;
pub mod wallet;
