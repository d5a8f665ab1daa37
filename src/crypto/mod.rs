pub mod nonce;
pub mod sign;
