// src/property/value.rs
//! Typed property values

use crate::error::{CamError, CamResult};
use crate::property::registry::{PropertyDescriptor, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value carried by a property read or write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// String value
    Str(String),
    /// Unsigned 8-bit value
    U8(u8),
    /// Unsigned 32-bit value
    U32(u32),
    /// Signed 32-bit value
    I32(i32),
}

impl PropertyValue {
    /// Type tag of the value
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Str(_) => ValueType::String,
            PropertyValue::U8(_) => ValueType::UInt8,
            PropertyValue::U32(_) => ValueType::UInt32,
            PropertyValue::I32(_) => ValueType::Int32,
        }
    }

    /// Numeric value widened to `i64`, `None` for strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Str(_) => None,
            PropertyValue::U8(v) => Some(i64::from(*v)),
            PropertyValue::U32(v) => Some(i64::from(*v)),
            PropertyValue::I32(v) => Some(i64::from(*v)),
        }
    }

    /// The value as `u32`, if it is an unsigned integer
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::U8(v) => Some(u32::from(*v)),
            PropertyValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a string slice, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert an integer to the integer type `target` when it fits losslessly
    ///
    /// Unsuffixed literals arrive as `i32`; this lets `500` stand in for
    /// `500u32`. Values that do not fit, and strings, are returned unchanged.
    pub fn coerce_to(self, target: ValueType) -> PropertyValue {
        let Some(wide) = self.as_i64() else {
            return self;
        };
        let coerced = match target {
            ValueType::UInt8 => u8::try_from(wide).ok().map(PropertyValue::U8),
            ValueType::UInt32 => u32::try_from(wide).ok().map(PropertyValue::U32),
            ValueType::Int32 => i32::try_from(wide).ok().map(PropertyValue::I32),
            ValueType::String => None,
        };
        coerced.unwrap_or(self)
    }

    /// Check the value against a descriptor's type and bounds
    pub fn check(&self, descriptor: &PropertyDescriptor) -> CamResult<()> {
        if self.value_type() != descriptor.value_type {
            return Err(CamError::OutOfRange {
                property: descriptor.name,
                reason: format!(
                    "expected {:?}, got {:?}",
                    descriptor.value_type,
                    self.value_type()
                ),
            });
        }

        if let (Some(bounds), Some(value)) = (descriptor.bounds, self.as_i64()) {
            if !bounds.contains(value) {
                return Err(CamError::OutOfRange {
                    property: descriptor.name,
                    reason: format!("{} not in [{}, {}]", value, bounds.min, bounds.max),
                });
            }
        }

        Ok(())
    }

    /// Encode the value into a caller-supplied buffer
    ///
    /// Integers are written little-endian at their natural width, strings as
    /// raw UTF-8 followed by a NUL byte. Returns the number of bytes written.
    pub fn encode_into(&self, out: &mut [u8]) -> Option<usize> {
        fn put(out: &mut [u8], bytes: &[u8]) -> Option<usize> {
            out.get_mut(..bytes.len())?.copy_from_slice(bytes);
            Some(bytes.len())
        }

        match self {
            PropertyValue::Str(s) => {
                let len = s.len();
                if out.len() < len + 1 {
                    return None;
                }
                out[..len].copy_from_slice(s.as_bytes());
                out[len] = 0;
                Some(len + 1)
            }
            PropertyValue::U8(v) => put(out, &[*v]),
            PropertyValue::U32(v) => put(out, &v.to_le_bytes()),
            PropertyValue::I32(v) => put(out, &v.to_le_bytes()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::U8(v) => write!(f, "{}", v),
            PropertyValue::U32(v) => write!(f, "{}", v),
            PropertyValue::I32(v) => write!(f, "{}", v),
        }
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::U32(v)
    }
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        PropertyValue::U8(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::I32(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::property::PropertyId;

    #[test]
    fn test_type_mismatch_is_out_of_range() {
        let err = PropertyValue::from("wide")
            .check(PropertyId::Width.descriptor())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(PropertyValue::I32(500).coerce_to(ValueType::UInt32), PropertyValue::U32(500));
        assert_eq!(PropertyValue::U32(12).coerce_to(ValueType::UInt8), PropertyValue::U8(12));
        assert_eq!(PropertyValue::U8(3).coerce_to(ValueType::Int32), PropertyValue::I32(3));

        // Does not fit, left for the type check to reject
        assert_eq!(PropertyValue::I32(-5).coerce_to(ValueType::UInt32), PropertyValue::I32(-5));
        assert_eq!(PropertyValue::U32(300).coerce_to(ValueType::UInt8), PropertyValue::U32(300));
        assert_eq!(
            PropertyValue::I32(7).coerce_to(ValueType::String),
            PropertyValue::I32(7)
        );
        assert!(PropertyValue::I32(-5).check(PropertyId::Width.descriptor()).is_err());
    }

    #[test]
    fn test_registry_bounds() {
        let trigger = PropertyId::TriggerMode.descriptor();
        assert!(PropertyValue::U32(2).check(trigger).is_ok());
        assert!(PropertyValue::U32(3).check(trigger).is_err());
        assert!(PropertyValue::U32(0).check(PropertyId::Width.descriptor()).is_err());
    }

    #[test]
    fn test_encode_into_capacity() {
        let mut small = [0u8; 3];
        assert_eq!(PropertyValue::U32(7).encode_into(&mut small), None);

        let mut buf = [0u8; 8];
        assert_eq!(PropertyValue::U32(0x0102_0304).encode_into(&mut buf), Some(4));
        assert_eq!(&buf[..4], &[4, 3, 2, 1]);

        assert_eq!(PropertyValue::from("pco").encode_into(&mut buf), Some(4));
        assert_eq!(&buf[..4], b"pco\0");
        assert_eq!(PropertyValue::from("too long").encode_into(&mut buf), None);
    }

    #[test]
    fn test_value_serialization() {
        let value = PropertyValue::U32(5000);
        let json = serde_json::to_string(&value).expect("Failed to serialize");
        assert_eq!(json, "5000");
        let name = serde_json::to_string(&PropertyValue::from("sim")).expect("Failed to serialize");
        assert_eq!(name, "\"sim\"");
    }
}
