pub mod cors;
pub mod error;
