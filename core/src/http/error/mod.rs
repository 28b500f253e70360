//! HTTP-facing error types.

pub mod cas_error;

pub use cas_error::CasError;
