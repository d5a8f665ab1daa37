pub mod bill;
pub mod common;
