//! Schema module
//!
//! Contains the validated payload shapes accepted from outside the store.

pub mod roast;

pub use roast::RoastPayload;
