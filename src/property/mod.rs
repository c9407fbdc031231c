// src/property/mod.rs
//! Property registry and typed values

pub mod registry;
pub mod value;

pub use registry::{
    descriptors, find_by_name, get_descriptor, Access, Bounds, PropertyDescriptor, PropertyId,
    Unit, ValueType,
};
pub use value::PropertyValue;
