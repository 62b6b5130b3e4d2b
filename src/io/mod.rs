//! Input adapters and result export.

pub mod export;
pub mod input;
