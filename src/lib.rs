pub mod api;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod model;
pub mod trade;
pub mod xml;

pub use client::WxPayClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::WxPayError;
pub use model::bill::{BillContent, BillType, TradeRecord};
pub use trade::TradeRecords;
