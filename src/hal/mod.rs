// src/hal/mod.rs
//! Hardware Abstraction Layer for camera drivers

pub mod simulator;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use traits::*;
pub use types::*;
