pub mod cas;
pub mod error;
