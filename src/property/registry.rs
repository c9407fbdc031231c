// src/property/registry.rs
//! Process-wide property table
//!
//! The table is a `static` array indexed by [`PropertyId`]; every camera
//! refers to the same descriptors and nothing is copied per instance.

use crate::error::{CamError, CamResult};
use serde::Serialize;
use std::fmt;

/// Identifier of a camera property
///
/// Discriminants are contiguous from zero, so `0..PropertyId::COUNT` walks
/// every property known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u32)]
pub enum PropertyId {
    /// Camera model name
    Name = 0,
    /// Region of interest width
    Width,
    /// Smallest allowed width
    WidthMin,
    /// Largest allowed width (sensor width)
    WidthMax,
    /// Region of interest height
    Height,
    /// Smallest allowed height
    HeightMin,
    /// Largest allowed height (sensor height)
    HeightMax,
    /// Horizontal offset of the region of interest
    OffsetX,
    /// Vertical offset of the region of interest
    OffsetY,
    /// Bits per output pixel
    BitDepth,
    /// Exposure time
    Exposure,
    /// Shortest exposure time
    ExposureMin,
    /// Longest exposure time
    ExposureMax,
    /// Delay between trigger and exposure
    Delay,
    /// Shortest delay
    DelayMin,
    /// Longest delay
    DelayMax,
    /// Time between two frames in free-run mode
    FramePeriod,
    /// Sensor temperature
    TemperatureSensor,
    /// Camera housing temperature
    TemperatureCamera,
    /// Timestamp embedding mode
    TimestampMode,
    /// Trigger source
    TriggerMode,
}

impl PropertyId {
    /// Number of properties in the registry
    pub const COUNT: usize = 21;

    /// All ids in table order
    pub const ALL: [PropertyId; PropertyId::COUNT] = [
        PropertyId::Name,
        PropertyId::Width,
        PropertyId::WidthMin,
        PropertyId::WidthMax,
        PropertyId::Height,
        PropertyId::HeightMin,
        PropertyId::HeightMax,
        PropertyId::OffsetX,
        PropertyId::OffsetY,
        PropertyId::BitDepth,
        PropertyId::Exposure,
        PropertyId::ExposureMin,
        PropertyId::ExposureMax,
        PropertyId::Delay,
        PropertyId::DelayMin,
        PropertyId::DelayMax,
        PropertyId::FramePeriod,
        PropertyId::TemperatureSensor,
        PropertyId::TemperatureCamera,
        PropertyId::TimestampMode,
        PropertyId::TriggerMode,
    ];

    /// Look up an id from its raw integer form
    pub fn from_raw(raw: u32) -> Option<PropertyId> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Descriptor for this id
    pub fn descriptor(self) -> &'static PropertyDescriptor {
        &DESCRIPTORS[self as usize]
    }

    /// Hierarchical name, e.g. `sensor.temperature`
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Whether the property describes the frame geometry cached by a camera
    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            PropertyId::Width | PropertyId::Height | PropertyId::OffsetX | PropertyId::OffsetY
        )
    }

    /// Whether the property is a device limit that is read once and cached
    pub fn is_limit(self) -> bool {
        matches!(
            self,
            PropertyId::WidthMin
                | PropertyId::WidthMax
                | PropertyId::HeightMin
                | PropertyId::HeightMax
                | PropertyId::ExposureMin
                | PropertyId::ExposureMax
                | PropertyId::DelayMin
                | PropertyId::DelayMax
        )
    }
}

impl From<PropertyId> for u32 {
    fn from(id: PropertyId) -> u32 {
        id as u32
    }
}

impl TryFrom<u32> for PropertyId {
    type Error = CamError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        PropertyId::from_raw(raw).ok_or(CamError::InvalidProperty {
            id: raw,
            reason: "unknown property id",
        })
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value type tag of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    /// UTF-8 string
    String,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 32-bit integer
    Int32,
}

/// Unit a numeric property is expressed in; display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    /// No unit
    None,
    /// Pixels
    Pixel,
    /// Bits
    Bit,
    /// Microseconds
    Microsecond,
    /// Milliseconds
    Millisecond,
    /// Degrees Celsius
    DegreeCelsius,
}

impl Unit {
    /// Short symbol for display
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Pixel => "px",
            Unit::Bit => "bit",
            Unit::Microsecond => "µs",
            Unit::Millisecond => "ms",
            Unit::DegreeCelsius => "°C",
        }
    }
}

/// Access mode of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    /// Can only be read
    ReadOnly,
    /// Can be read and, in the configurable state, written
    ReadWrite,
}

/// Inclusive numeric bounds independent of any particular device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    /// Smallest accepted value
    pub min: i64,
    /// Largest accepted value
    pub max: i64,
}

impl Bounds {
    /// Whether `value` lies within the bounds
    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Immutable description of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    /// Property id, equal to the index in the table
    pub id: PropertyId,
    /// Dotted hierarchical name
    pub name: &'static str,
    /// Value type
    pub value_type: ValueType,
    /// Display unit
    pub unit: Unit,
    /// Access mode
    pub access: Access,
    /// Registry-wide bounds, if any
    pub bounds: Option<Bounds>,
}

impl PropertyDescriptor {
    /// Nesting depth, i.e. the number of dots in the name
    pub fn depth(&self) -> usize {
        self.name.matches('.').count()
    }

    /// Whether the property may be written
    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }
}

const fn desc(
    id: PropertyId,
    name: &'static str,
    value_type: ValueType,
    unit: Unit,
    access: Access,
    bounds: Option<Bounds>,
) -> PropertyDescriptor {
    PropertyDescriptor {
        id,
        name,
        value_type,
        unit,
        access,
        bounds,
    }
}

use Access::{ReadOnly, ReadWrite};
use ValueType::{Int32, String as Str, UInt32, UInt8};

static DESCRIPTORS: [PropertyDescriptor; PropertyId::COUNT] = [
    desc(PropertyId::Name, "name", Str, Unit::None, ReadOnly, None),
    desc(PropertyId::Width, "sensor.width", UInt32, Unit::Pixel, ReadWrite, Some(Bounds { min: 1, max: u32::MAX as i64 })),
    desc(PropertyId::WidthMin, "sensor.width.min", UInt32, Unit::Pixel, ReadOnly, None),
    desc(PropertyId::WidthMax, "sensor.width.max", UInt32, Unit::Pixel, ReadOnly, None),
    desc(PropertyId::Height, "sensor.height", UInt32, Unit::Pixel, ReadWrite, Some(Bounds { min: 1, max: u32::MAX as i64 })),
    desc(PropertyId::HeightMin, "sensor.height.min", UInt32, Unit::Pixel, ReadOnly, None),
    desc(PropertyId::HeightMax, "sensor.height.max", UInt32, Unit::Pixel, ReadOnly, None),
    desc(PropertyId::OffsetX, "sensor.offset.x", UInt32, Unit::Pixel, ReadWrite, None),
    desc(PropertyId::OffsetY, "sensor.offset.y", UInt32, Unit::Pixel, ReadWrite, None),
    desc(PropertyId::BitDepth, "sensor.bitdepth", UInt8, Unit::Bit, ReadOnly, Some(Bounds { min: 1, max: 32 })),
    desc(PropertyId::Exposure, "time.exposure", UInt32, Unit::Microsecond, ReadWrite, None),
    desc(PropertyId::ExposureMin, "time.exposure.min", UInt32, Unit::Microsecond, ReadOnly, None),
    desc(PropertyId::ExposureMax, "time.exposure.max", UInt32, Unit::Microsecond, ReadOnly, None),
    desc(PropertyId::Delay, "time.delay", UInt32, Unit::Microsecond, ReadWrite, None),
    desc(PropertyId::DelayMin, "time.delay.min", UInt32, Unit::Microsecond, ReadOnly, None),
    desc(PropertyId::DelayMax, "time.delay.max", UInt32, Unit::Microsecond, ReadOnly, None),
    desc(PropertyId::FramePeriod, "time.frame_period", UInt32, Unit::Millisecond, ReadOnly, None),
    desc(PropertyId::TemperatureSensor, "sensor.temperature", Int32, Unit::DegreeCelsius, ReadOnly, None),
    desc(PropertyId::TemperatureCamera, "camera.temperature", Int32, Unit::DegreeCelsius, ReadOnly, None),
    desc(PropertyId::TimestampMode, "time.timestamp_mode", UInt32, Unit::None, ReadWrite, Some(Bounds { min: 0, max: 3 })),
    desc(PropertyId::TriggerMode, "trigger.mode", UInt32, Unit::None, ReadWrite, Some(Bounds { min: 0, max: 2 })),
];

/// Resolve a raw id to its descriptor
pub fn get_descriptor(id: u32) -> CamResult<&'static PropertyDescriptor> {
    PropertyId::try_from(id).map(PropertyId::descriptor)
}

/// Iterate over every descriptor in id order
pub fn descriptors() -> impl Iterator<Item = &'static PropertyDescriptor> {
    DESCRIPTORS.iter()
}

/// Find a descriptor by its dotted name
pub fn find_by_name(name: &str) -> Option<&'static PropertyDescriptor> {
    DESCRIPTORS.iter().find(|d| d.name == name)
}
