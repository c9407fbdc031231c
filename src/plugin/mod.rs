// src/plugin/mod.rs
//! Named driver registry

pub mod registry;

pub use registry::{DriverConstructor, PluginRegistry};
