pub mod error;
pub mod hash;
